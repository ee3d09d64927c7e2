use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// 來源 CSV 的一列；空白儲存格不會出現在 `data` 中
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, Value>,
}

impl Record {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.data.get(column)
    }
}

/// 送往 `/users/track` 的單一使用者屬性物件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserAttributes {
    fields: Map<String, Value>,
}

impl UserAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn email(&self) -> Option<&str> {
        self.get("email").and_then(Value::as_str)
    }

    pub fn external_id(&self) -> Option<&str> {
        self.get("external_id").and_then(Value::as_str)
    }

    pub fn phone(&self) -> Option<&str> {
        self.get("phone").and_then(Value::as_str)
    }

    pub fn has_identifier(&self) -> bool {
        self.email().is_some() || self.external_id().is_some()
    }

    /// 日誌用識別碼：email 優先，其次 external_id
    pub fn identifier(&self) -> Option<&str> {
        self.email().or_else(|| self.external_id())
    }
}

/// 單列被略過的原因
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    MissingIdentifier,
    Malformed { field: String, message: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingIdentifier => write!(f, "neither email nor external_id is set"),
            SkipReason::Malformed { field, message } => write!(f, "{}: {}", field, message),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    /// 1-based，與日誌中的列號一致
    pub row: usize,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default)]
pub struct MappingOutcome {
    pub records: Vec<UserAttributes>,
    pub skipped: Vec<SkippedRow>,
}

impl MappingOutcome {
    pub fn missing_identifier_count(&self) -> usize {
        self.skipped
            .iter()
            .filter(|s| s.reason == SkipReason::MissingIdentifier)
            .count()
    }

    pub fn malformed_count(&self) -> usize {
        self.skipped.len() - self.missing_identifier_count()
    }
}

/// 連續且保序的一批記錄
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    /// 1-based 批次編號
    pub number: usize,
    /// 本批第一筆在全部記錄中的位置
    pub offset: usize,
    pub records: &'a [UserAttributes],
}

impl Batch<'_> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub total_batches: usize,
    pub succeeded_records: usize,
    pub failed_records: usize,
    pub retried_batches: usize,
    /// 重試後仍失敗的批次編號
    pub abandoned_batches: Vec<usize>,
}

impl UploadReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed_records == 0
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BackfillSummary {
    pub rows_read: usize,
    pub records_mapped: usize,
    pub rows_missing_identifier: usize,
    pub rows_malformed: usize,
    /// 沒有任何可上傳記錄時為 `None`
    pub upload: Option<UploadReport>,
}

impl BackfillSummary {
    pub fn succeeded(&self) -> bool {
        self.upload
            .as_ref()
            .is_some_and(|report| report.all_succeeded())
    }
}
