use crate::core::client::{TrackClient, TrackTransport};
use crate::core::{Batch, UploadReport, UserAttributes};
use crate::utils::validation::validate_phone_number;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// 將記錄切成連續、保序的批次；最後一批可能較小
pub fn partition(records: &[UserAttributes], batch_size: usize) -> Vec<Batch<'_>> {
    let batch_size = batch_size.max(1);

    records
        .chunks(batch_size)
        .enumerate()
        .map(|(i, chunk)| Batch {
            number: i + 1,
            offset: i * batch_size,
            records: chunk,
        })
        .collect()
}

/// `{"attributes": [...]}`
pub fn build_payload(batch: &Batch<'_>) -> Value {
    json!({ "attributes": batch.records })
}

/// 第一輪失敗、等待重試的批次
struct PendingRetry<'a> {
    batch: Batch<'a>,
    payload: Value,
}

pub struct BatchUploader<T: TrackTransport = TrackClient> {
    client: T,
    batch_size: usize,
    request_delay: Duration,
}

impl<T: TrackTransport> BatchUploader<T> {
    pub fn new(client: T, batch_size: usize, request_delay: Duration) -> Self {
        Self {
            client,
            batch_size,
            request_delay,
        }
    }

    /// 逐批上傳，第一輪結束後對失敗批次各重試一次
    ///
    /// 每次請求後（不論成敗）都會等待 `request_delay` 以符合 API 速率限制。
    /// 計數以整批為單位。
    pub async fn upload(&self, records: &[UserAttributes]) -> UploadReport {
        let batches = partition(records, self.batch_size);
        let total_batches = batches.len();
        let mut report = UploadReport {
            total_batches,
            ..Default::default()
        };
        let mut pending = Vec::new();

        for batch in batches {
            tracing::info!(
                "📤 Batch {}/{}: sending {} users",
                batch.number,
                total_batches,
                batch.len()
            );

            check_phone_numbers(&batch);
            let payload = build_payload(&batch);
            let delivery = self.client.send(&payload).await;

            if delivery.is_accepted() {
                tracing::info!("✅ Batch {} uploaded", batch.number);
                report.succeeded_records += batch.len();
            } else {
                tracing::error!("❌ Batch {} failed: {}", batch.number, delivery);
                report.failed_records += batch.len();
                pending.push(PendingRetry { batch, payload });
            }

            tokio::time::sleep(self.request_delay).await;
        }

        if !pending.is_empty() {
            self.retry_failed(pending, &mut report).await;
        }

        tracing::info!(
            "Upload finished - succeeded: {}, failed: {}",
            report.succeeded_records,
            report.failed_records
        );

        report
    }

    async fn retry_failed(&self, pending: Vec<PendingRetry<'_>>, report: &mut UploadReport) {
        tracing::info!("🔄 Retrying {} failed batches", pending.len());
        report.retried_batches = pending.len();

        let mut retry_succeeded = 0;
        let mut retry_failed = 0;

        for PendingRetry { batch, payload } in pending {
            tracing::info!("🔄 Retrying batch {} ({} users)", batch.number, batch.len());

            let delivery = self.client.send(&payload).await;

            if delivery.is_accepted() {
                tracing::info!("✅ Batch {} succeeded on retry", batch.number);
                retry_succeeded += batch.len();
                report.succeeded_records += batch.len();
                report.failed_records -= batch.len();
            } else {
                tracing::error!("❌ Batch {} failed again: {}", batch.number, delivery);
                tracing::error!(
                    "Payload of abandoned batch {}:\n{}",
                    batch.number,
                    serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string())
                );
                retry_failed += batch.len();
                report.abandoned_batches.push(batch.number);
            }

            tokio::time::sleep(self.request_delay).await;
        }

        tracing::info!(
            "Retry finished - succeeded: {}, failed: {}",
            retry_succeeded,
            retry_failed
        );
    }
}

/// 僅記錄，不影響上傳
fn check_phone_numbers(batch: &Batch<'_>) {
    for (i, record) in batch.records.iter().enumerate() {
        if let Some(phone) = record.phone() {
            let identifier = record
                .identifier()
                .map(str::to_string)
                .unwrap_or_else(|| format!("index_{}", batch.offset + i));
            validate_phone_number(phone, &identifier);
        }
    }
}
