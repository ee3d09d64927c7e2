use crate::config::BackfillConfig;
use crate::core::client::TrackClient;
use crate::core::uploader::BatchUploader;
use crate::core::{mapper, source, MappingOutcome, Pipeline, Record, Storage, UploadReport, UserAttributes};
use crate::utils::error::Result;

/// 讀取 CSV -> 轉換 -> 批次上傳
pub struct BackfillPipeline<S: Storage> {
    storage: S,
    source: String,
    uploader: BatchUploader,
}

impl<S: Storage> BackfillPipeline<S> {
    pub fn new(storage: S, source: String, uploader: BatchUploader) -> Self {
        Self {
            storage,
            source,
            uploader,
        }
    }

    pub fn from_config(storage: S, config: &BackfillConfig) -> Result<Self> {
        let client = TrackClient::new(&config.base_url, &config.api_key, config.request_timeout)?;
        let uploader = BatchUploader::new(client, config.batch_size, config.request_delay);
        Ok(Self::new(storage, config.source.clone(), uploader))
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for BackfillPipeline<S> {
    async fn extract(&self) -> Result<Vec<Record>> {
        let location = self.storage.describe(&self.source);
        tracing::info!("📥 Reading CSV from {}", location);

        let bytes = self.storage.read_file(&self.source).await.map_err(|e| {
            tracing::error!("Failed to read {}: {}", location, e);
            e
        })?;
        let rows = source::parse_csv(&bytes)?;

        tracing::info!("Read {} user rows", rows.len());
        Ok(rows)
    }

    async fn transform(&self, data: Vec<Record>) -> Result<MappingOutcome> {
        Ok(mapper::map_rows(&data))
    }

    async fn load(&self, records: Vec<UserAttributes>) -> Result<UploadReport> {
        Ok(self.uploader.upload(&records).await)
    }
}
