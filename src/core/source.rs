use crate::core::Record;
use crate::utils::error::Result;
use serde_json::{Number, Value};
use std::collections::HashMap;

/// 依整欄內容推斷型別的欄位；其餘欄位一律保留為文字
pub const TYPED_COLUMNS: &[&str] = &["is_marketing", "is_test", "has_card"];

/// 視為缺值的儲存格內容（與 dataframe 讀取 CSV 的預設 NA 記號相同）
pub const NA_TOKENS: &[&str] = &[
    "", "NULL", "null", "NaN", "nan", "-NaN", "-nan", "NA", "N/A", "n/a", "#N/A", "<NA>", "None",
];

const TRUE_LITERALS: &[&str] = &["True", "TRUE", "true"];
const FALSE_LITERALS: &[&str] = &["False", "FALSE", "false"];

/// 單一欄位的推斷型別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Bool,
    Integer,
    Float,
    Text,
}

impl ColumnType {
    fn of(raw: &str) -> Self {
        if TRUE_LITERALS.contains(&raw) || FALSE_LITERALS.contains(&raw) {
            return ColumnType::Bool;
        }

        let trimmed = raw.trim();
        if trimmed.parse::<i64>().is_ok() {
            ColumnType::Integer
        } else if trimmed.parse::<f64>().is_ok_and(f64::is_finite) {
            ColumnType::Float
        } else {
            ColumnType::Text
        }
    }

    /// 同欄出現不同型別時取能容納兩者的型別
    fn widen(self, other: ColumnType) -> Self {
        match (self, other) {
            (a, b) if a == b => a,
            (ColumnType::Integer, ColumnType::Float) | (ColumnType::Float, ColumnType::Integer) => {
                ColumnType::Float
            }
            _ => ColumnType::Text,
        }
    }

    fn convert(self, raw: String) -> Value {
        let trimmed = raw.trim();
        let typed = match self {
            ColumnType::Bool => Some(Value::Bool(TRUE_LITERALS.contains(&raw.as_str()))),
            ColumnType::Integer => trimmed.parse::<i64>().ok().map(Value::from),
            ColumnType::Float => trimmed
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
            ColumnType::Text => None,
        };
        typed.unwrap_or(Value::String(raw))
    }
}

/// 依欄內所有非缺值儲存格決定型別；整欄皆為缺值時回傳 `None`
pub fn infer_column<'a>(cells: impl IntoIterator<Item = &'a str>) -> Option<ColumnType> {
    cells
        .into_iter()
        .map(ColumnType::of)
        .reduce(ColumnType::widen)
}

pub fn is_missing(raw: &str) -> bool {
    NA_TOKENS.contains(&raw)
}

/// 解析含標頭列的 UTF-8 CSV
///
/// 空白與 NA 記號視為缺值，不放入 `Record`；較短的列其缺少的欄位亦同。
/// [`TYPED_COLUMNS`] 以整欄為單位推斷型別，其他欄位保留原始文字。
pub fn parse_csv(bytes: &[u8]) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows: Vec<HashMap<String, String>> = Vec::new();
    for row in reader.records() {
        let row = row?;
        let cells = headers
            .iter()
            .zip(row.iter())
            .filter(|(_, raw)| !is_missing(raw))
            .map(|(column, raw)| (column.clone(), raw.to_string()))
            .collect();
        rows.push(cells);
    }

    let column_types: HashMap<&str, ColumnType> = TYPED_COLUMNS
        .iter()
        .filter_map(|&column| {
            infer_column(rows.iter().filter_map(|r| r.get(column).map(String::as_str)))
                .map(|column_type| (column, column_type))
        })
        .collect();

    let records: Vec<Record> = rows
        .into_iter()
        .map(|cells| {
            let data = cells
                .into_iter()
                .map(|(column, raw)| {
                    let value = match column_types.get(column.as_str()) {
                        Some(column_type) => column_type.convert(raw),
                        None => Value::String(raw),
                    };
                    (column, value)
                })
                .collect();
            Record { data }
        })
        .collect();

    tracing::debug!(
        "Parsed {} rows with columns {:?}, typed columns {:?}",
        records.len(),
        headers,
        column_types
    );
    Ok(records)
}
