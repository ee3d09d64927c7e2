use crate::domain::model::{MappingOutcome, Record, UploadReport, UserAttributes};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;

    /// 日誌用的來源描述，例如 `s3://bucket/key`
    fn describe(&self, path: &str) -> String;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Record>>;
    async fn transform(&self, data: Vec<Record>) -> Result<MappingOutcome>;
    async fn load(&self, records: Vec<UserAttributes>) -> Result<UploadReport>;
}
