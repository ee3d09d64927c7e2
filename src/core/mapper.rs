use crate::core::{MappingOutcome, Record, SkipReason, SkippedRow, UserAttributes};
use serde_json::Value;

pub const IDENTIFIER_FIELDS: [&str; 2] = ["email", "external_id"];

/// 原樣複製的欄位
pub const PASSTHROUGH_FIELDS: [&str; 6] = [
    "first_name",
    "user_type",
    "signup_date",
    "business",
    "kdt_funnel_stage",
    "hh_funnel_stage",
];

pub const ARRAY_FIELDS: [&str; 3] = [
    "applied_business",
    "in_progress_business",
    "completed_business",
];

pub const BOOLEAN_FIELDS: [&str; 3] = ["is_marketing", "is_test", "has_card"];

pub const COUNTRY_CODE: &str = "82";

/// 前幾列輸出除錯日誌，方便抽查轉換結果
const DEBUG_PREVIEW_ROWS: usize = 5;

type ArrayStrategy = fn(&str) -> Option<Value>;

/// 依序嘗試，第一個成功者勝出；全部失敗則保留原字串
const ARRAY_STRATEGIES: &[ArrayStrategy] = &[decode_json_array, split_delimited];

/// 轉換全部列，保持輸入順序；被略過的列另外記錄
pub fn map_rows(rows: &[Record]) -> MappingOutcome {
    let mut outcome = MappingOutcome::default();

    for (index, row) in rows.iter().enumerate() {
        let row_number = index + 1;

        match map_row(row) {
            Ok(attributes) => {
                if index < DEBUG_PREVIEW_ROWS {
                    log_preview(row_number, &attributes);
                }
                outcome.records.push(attributes);
            }
            Err(reason) => {
                match &reason {
                    SkipReason::MissingIdentifier => {
                        tracing::warn!(
                            "Row {}: neither email nor external_id is set, skipping",
                            row_number
                        );
                    }
                    SkipReason::Malformed { .. } => {
                        tracing::error!("Row {}: failed to convert ({}), skipping", row_number, reason);
                    }
                }
                outcome.skipped.push(SkippedRow {
                    row: row_number,
                    reason,
                });
            }
        }
    }

    tracing::info!(
        "✅ Converted {} rows into {} user attribute records ({} skipped)",
        rows.len(),
        outcome.records.len(),
        outcome.skipped.len()
    );

    outcome
}

/// 將單列轉為使用者屬性；缺少識別碼或欄位型別不符時回傳略過原因
pub fn map_row(row: &Record) -> Result<UserAttributes, SkipReason> {
    let mut attributes = UserAttributes::new();

    for field in IDENTIFIER_FIELDS {
        if let Some(id) = identifier(row, field)? {
            attributes.insert(field, Value::String(id));
        }
    }

    if !attributes.has_identifier() {
        return Err(SkipReason::MissingIdentifier);
    }

    for field in PASSTHROUGH_FIELDS {
        if let Some(value) = row.get(field) {
            attributes.insert(field, value.clone());
        }
    }

    if let Some(phone) = row.get("phone") {
        attributes.insert("phone", Value::String(normalize_phone(&text_of(phone))));
    }

    for field in ARRAY_FIELDS {
        if let Some(value) = row.get(field) {
            attributes.insert(field, parse_array_field(value));
        }
    }

    for field in BOOLEAN_FIELDS {
        if let Some(value) = row.get(field) {
            attributes.insert(field, Value::Bool(is_truthy(value)));
        }
    }

    if let (Some(year), Some(day)) = (row.get("birthyear"), row.get("birthday")) {
        attributes.insert("dob", Value::String(compose_dob(&text_of(year), &text_of(day))));
    }

    Ok(attributes)
}

fn identifier(row: &Record, field: &str) -> Result<Option<String>, SkipReason> {
    match row.get(field) {
        None => Ok(None),
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(other) => Err(SkipReason::Malformed {
            field: field.to_string(),
            message: format!("expected text, found {}", other),
        }),
    }
}

/// 國內格式 `0` + 9-10 位數字改為 `+82...`；以 `82` 開頭者補上 `+`；其餘原樣
pub fn normalize_phone(raw: &str) -> String {
    if let Some(rest) = raw.strip_prefix('0') {
        if (9..=10).contains(&rest.len()) && rest.bytes().all(|b| b.is_ascii_digit()) {
            return format!("+{}{}", COUNTRY_CODE, rest);
        }
    }

    if raw.starts_with(COUNTRY_CODE) {
        return format!("+{}", raw);
    }

    raw.to_string()
}

/// 以 `[` 開頭的文字嘗試轉為陣列；其他值原樣回傳，永不失敗
pub fn parse_array_field(value: &Value) -> Value {
    match value {
        Value::String(text) if text.starts_with('[') => ARRAY_STRATEGIES
            .iter()
            .find_map(|strategy| strategy(text))
            .unwrap_or_else(|| value.clone()),
        other => other.clone(),
    }
}

fn decode_json_array(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

/// `[a, 'b', "c"]` -> `["a", "b", "c"]`，`[]` -> 空陣列
fn split_delimited(text: &str) -> Option<Value> {
    let inner = text.trim_matches(|c: char| c == '[' || c == ']');
    if inner.is_empty() {
        return Some(Value::Array(Vec::new()));
    }

    let items = inner
        .split(',')
        .map(|item| {
            Value::String(
                item.trim()
                    .trim_matches(|c: char| c == '"' || c == '\'')
                    .to_string(),
            )
        })
        .collect();

    Some(Value::Array(items))
}

/// 依值本身的型別判斷真偽，不解析文字內容
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// `{year}-{day 前兩字}-{day 其餘}`，固定寬度拼接，不做日期驗證
pub fn compose_dob(year: &str, day: &str) -> String {
    let split = day
        .char_indices()
        .nth(2)
        .map(|(i, _)| i)
        .unwrap_or(day.len());
    format!("{}-{}-{}", year, &day[..split], &day[split..])
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn log_preview(row_number: usize, attributes: &UserAttributes) {
    let show = |name: &str| {
        attributes
            .get(name)
            .map(Value::to_string)
            .unwrap_or_else(|| "N/A".to_string())
    };

    tracing::debug!(
        "Row {} converted: applied_business={}, in_progress_business={}, completed_business={}, dob={}",
        row_number,
        show("applied_business"),
        show("in_progress_business"),
        show("completed_business"),
        show("dob")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn row(pairs: &[(&str, Value)]) -> Record {
        let data: HashMap<String, Value> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        Record { data }
    }

    #[test]
    fn test_identifiers_are_trimmed() {
        let attrs = map_row(&row(&[
            ("email", json!("  a@example.com ")),
            ("external_id", json!(" ext-1")),
        ]))
        .unwrap();

        assert_eq!(attrs.email(), Some("a@example.com"));
        assert_eq!(attrs.external_id(), Some("ext-1"));
    }

    #[test]
    fn test_row_without_identifiers_is_skipped() {
        let result = map_row(&row(&[("first_name", json!("Nobody")), ("email", json!("   "))]));
        assert_eq!(result, Err(SkipReason::MissingIdentifier));
    }

    #[test]
    fn test_non_text_identifier_is_malformed() {
        let result = map_row(&row(&[("email", json!(42))]));
        assert!(matches!(result, Err(SkipReason::Malformed { ref field, .. }) if field == "email"));
    }

    #[test]
    fn test_map_rows_drops_only_rows_without_identifiers_and_keeps_order() {
        let rows = vec![
            row(&[("email", json!("first@example.com"))]),
            row(&[("first_name", json!("ghost"))]),
            row(&[("external_id", json!("second"))]),
            row(&[("email", json!(7))]),
            row(&[("email", json!("third@example.com")), ("external_id", json!("3"))]),
        ];

        let outcome = map_rows(&rows);

        let ids: Vec<&str> = outcome
            .records
            .iter()
            .map(|r| r.identifier().unwrap())
            .collect();
        assert_eq!(ids, vec!["first@example.com", "second", "third@example.com"]);
        assert_eq!(outcome.skipped.len(), 2);
        assert_eq!(outcome.skipped[0].row, 2);
        assert_eq!(outcome.skipped[1].row, 4);
        assert_eq!(outcome.missing_identifier_count(), 1);
        assert_eq!(outcome.malformed_count(), 1);
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("01012345678"), "+821012345678");
        assert_eq!(normalize_phone("0212345678"), "+82212345678");
        assert_eq!(normalize_phone("821012345678"), "+821012345678");
        assert_eq!(normalize_phone("+821012345678"), "+821012345678");
        assert_eq!(normalize_phone("010-1234-5678"), "010-1234-5678");
        assert_eq!(normalize_phone("0101"), "0101");
        assert_eq!(normalize_phone("1012345678"), "1012345678");
    }

    #[test]
    fn test_malformed_phone_is_kept_on_record() {
        let attrs = map_row(&row(&[
            ("external_id", json!("p-1")),
            ("phone", json!("010-1234-5678")),
        ]))
        .unwrap();

        assert_eq!(attrs.phone(), Some("010-1234-5678"));
    }

    #[test]
    fn test_parse_array_field_strict_json() {
        assert_eq!(
            parse_array_field(&json!(r#"["kdt", "hh"]"#)),
            json!(["kdt", "hh"])
        );
    }

    #[test]
    fn test_parse_array_field_falls_back_to_split() {
        assert_eq!(
            parse_array_field(&json!("[kdt, 'hh' , \"nb\"]")),
            json!(["kdt", "hh", "nb"])
        );
        assert_eq!(parse_array_field(&json!("['only']")), json!(["only"]));
    }

    #[test]
    fn test_parse_array_field_empty_brackets() {
        assert_eq!(parse_array_field(&json!("[]")), json!([]));
        assert_eq!(parse_array_field(&json!("[")), json!([]));
    }

    #[test]
    fn test_parse_array_field_passes_other_values_through() {
        assert_eq!(parse_array_field(&json!("kdt,hh")), json!("kdt,hh"));
        assert_eq!(parse_array_field(&json!(3)), json!(3));
    }

    #[test]
    fn test_boolean_fields_use_value_truthiness() {
        let attrs = map_row(&row(&[
            ("email", json!("b@example.com")),
            ("is_marketing", json!(1)),
            ("is_test", json!(0)),
            ("has_card", json!("false")),
        ]))
        .unwrap();

        assert_eq!(attrs.get("is_marketing"), Some(&json!(true)));
        assert_eq!(attrs.get("is_test"), Some(&json!(false)));
        assert_eq!(attrs.get("has_card"), Some(&json!(true)));
    }

    #[test]
    fn test_dob_requires_both_fields() {
        let with_both = map_row(&row(&[
            ("email", json!("d@example.com")),
            ("birthyear", json!("1990")),
            ("birthday", json!("0715")),
        ]))
        .unwrap();
        assert_eq!(with_both.get("dob"), Some(&json!("1990-07-15")));

        let year_only = map_row(&row(&[
            ("email", json!("d@example.com")),
            ("birthyear", json!("1990")),
        ]))
        .unwrap();
        assert!(!year_only.contains("dob"));
    }

    #[test]
    fn test_compose_dob_keeps_malformed_input() {
        assert_eq!(compose_dob("1990", "7"), "1990-7-");
        assert_eq!(compose_dob("1990", "715"), "1990-71-5");
        assert_eq!(compose_dob("1990", ""), "1990--");
    }

    #[test]
    fn test_passthrough_fields_are_copied() {
        let attrs = map_row(&row(&[
            ("external_id", json!("x")),
            ("first_name", json!("Jin")),
            ("user_type", json!("student")),
            ("kdt_funnel_stage", json!(3)),
            ("unknown_column", json!("ignored")),
        ]))
        .unwrap();

        assert_eq!(attrs.get("first_name"), Some(&json!("Jin")));
        assert_eq!(attrs.get("user_type"), Some(&json!("student")));
        assert_eq!(attrs.get("kdt_funnel_stage"), Some(&json!(3)));
        assert!(!attrs.contains("unknown_column"));
    }
}
