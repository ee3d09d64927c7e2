use std::env;

pub const API_KEY_VAR: &str = "BRAZE_API_KEY";
pub const BASE_URL_VAR: &str = "BRAZE_BASE_URL";
pub const AWS_PROFILE_VAR: &str = "AWS_PROFILE";
pub const AWS_REGION_VAR: &str = "AWS_REGION";
pub const S3_BUCKET_VAR: &str = "S3_BUCKET";

/// 環境變數提供的設定；空字串視為未設定
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub aws_profile: Option<String>,
    pub aws_region: Option<String>,
    pub s3_bucket: Option<String>,
}

impl EnvConfig {
    /// 從行程環境讀取（呼叫前可先載入 `.env`）
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            api_key: read(API_KEY_VAR),
            base_url: read(BASE_URL_VAR),
            aws_profile: read(AWS_PROFILE_VAR),
            aws_region: read(AWS_REGION_VAR),
            s3_bucket: read(S3_BUCKET_VAR),
        }
    }
}
