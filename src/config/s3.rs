use crate::domain::ports::Storage;
use crate::utils::error::{EtlError, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client as S3Client;

#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    /// 以預設憑證鏈建立客戶端；指定 profile 時改用該 profile
    pub async fn connect(bucket: &str, profile: Option<&str>, region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(profile) = profile {
            tracing::debug!("Using AWS profile: {}", profile);
            loader = loader.profile_name(profile);
        }
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }

        let sdk_config = loader.load().await;
        Self::new(S3Client::new(&sdk_config), bucket.to_string())
    }
}

impl Storage for S3Storage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| EtlError::StorageError {
                message: format!(
                    "Failed to read s3://{}/{}: {}",
                    self.bucket,
                    path,
                    DisplayErrorContext(&e)
                ),
            })?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| EtlError::StorageError {
                message: format!("Failed to collect S3 data: {}", e),
            })?;

        Ok(data.into_bytes().to_vec())
    }

    fn describe(&self, path: &str) -> String {
        format!("s3://{}/{}", self.bucket, path)
    }
}
