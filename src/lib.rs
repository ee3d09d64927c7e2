pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::cli::LocalStorage;
#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{BackfillConfig, RunOptions};

#[cfg(feature = "s3")]
pub use config::s3::S3Storage;

pub use core::{etl::EtlEngine, pipeline::BackfillPipeline};
pub use domain::model::{BackfillSummary, UploadReport, UserAttributes};
pub use utils::error::{EtlError, Result};
