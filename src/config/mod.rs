pub mod cli;
pub mod env;
#[cfg(feature = "s3")]
pub mod s3;
pub mod toml_config;

use crate::core::uploader::{DEFAULT_BATCH_SIZE, DEFAULT_REQUEST_DELAY, DEFAULT_REQUEST_TIMEOUT};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::Validate;
use env::{EnvConfig, API_KEY_VAR};
use std::time::Duration;
use toml_config::TomlConfig;

pub const DEFAULT_BASE_URL: &str = "https://rest.iad-07.braze.com";
pub const DEFAULT_S3_BUCKET: &str = "sparta-braze-currents";

#[cfg(feature = "cli")]
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "user-backfill")]
#[command(about = "Backfill user attributes from a CSV export into the marketing platform")]
pub struct CliConfig {
    /// S3 object key of the CSV export, or a local path with --local
    pub source: String,

    /// Users per request (default: 50)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Read the CSV from local disk instead of S3
    #[arg(long)]
    pub local: bool,

    /// Optional TOML settings file
    #[arg(long)]
    pub config: Option<String>,

    /// Override the API base URL
    #[arg(long)]
    pub base_url: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            source: self.source.clone(),
            local: self.local,
            batch_size: self.batch_size,
            base_url: self.base_url.clone(),
        }
    }
}

/// 命令列層級的選項，優先於環境變數與設定檔
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub source: String,
    pub local: bool,
    pub batch_size: Option<usize>,
    pub base_url: Option<String>,
}

/// 合併後的最終設定
#[derive(Clone)]
pub struct BackfillConfig {
    pub source: String,
    pub from_s3: bool,
    pub batch_size: usize,
    pub api_key: String,
    pub base_url: String,
    pub s3_bucket: String,
    pub aws_profile: Option<String>,
    pub aws_region: Option<String>,
    pub request_timeout: Duration,
    pub request_delay: Duration,
}

impl std::fmt::Debug for BackfillConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackfillConfig")
            .field("source", &self.source)
            .field("from_s3", &self.from_s3)
            .field("batch_size", &self.batch_size)
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("s3_bucket", &self.s3_bucket)
            .field("aws_profile", &self.aws_profile)
            .field("aws_region", &self.aws_region)
            .field("request_timeout", &self.request_timeout)
            .field("request_delay", &self.request_delay)
            .finish()
    }
}

impl BackfillConfig {
    /// 優先順序：命令列 > 環境變數 > 設定檔 > 預設值
    ///
    /// 缺少 API 金鑰時直接回傳錯誤，不做任何其他工作。
    pub fn resolve(options: RunOptions, env: EnvConfig, file: Option<TomlConfig>) -> Result<Self> {
        let api_key = env.api_key.ok_or_else(|| EtlError::MissingConfigError {
            field: API_KEY_VAR.to_string(),
        })?;
        let file = file.unwrap_or_default();

        let base_url = options
            .base_url
            .or(env.base_url)
            .or(file.target.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let request_timeout = file
            .target
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let request_delay = file
            .target
            .request_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_REQUEST_DELAY);

        Ok(Self {
            source: options.source,
            from_s3: !options.local,
            batch_size: options
                .batch_size
                .or(file.upload.batch_size)
                .unwrap_or(DEFAULT_BATCH_SIZE),
            api_key,
            base_url,
            s3_bucket: env
                .s3_bucket
                .or(file.source.s3_bucket)
                .unwrap_or_else(|| DEFAULT_S3_BUCKET.to_string()),
            aws_profile: env.aws_profile.or(file.source.aws_profile),
            aws_region: env.aws_region.or(file.source.aws_region),
            request_timeout,
            request_delay,
        })
    }

    #[cfg(feature = "cli")]
    pub fn load(cli: &CliConfig) -> Result<Self> {
        let file = cli.config.as_deref().map(TomlConfig::from_file).transpose()?;
        Self::resolve(cli.run_options(), EnvConfig::from_env(), file)
    }

    pub fn mode(&self) -> &'static str {
        if self.from_s3 {
            "S3"
        } else {
            "local"
        }
    }
}

impl Validate for BackfillConfig {
    fn validate(&self) -> Result<()> {
        use crate::utils::validation::*;

        validate_non_empty_string(API_KEY_VAR, &self.api_key)?;
        validate_url("base_url", &self.base_url)?;
        validate_positive_number("batch_size", self.batch_size, 1)?;
        validate_path("source", &self.source)?;

        if self.from_s3 {
            validate_s3_bucket_name("s3_bucket", &self.s3_bucket)?;
        }

        if self.request_timeout.is_zero() {
            return Err(EtlError::InvalidConfigValueError {
                field: "target.timeout_seconds".to_string(),
                value: "0".to_string(),
                reason: "Timeout must be at least 1 second".to_string(),
            });
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }
}
