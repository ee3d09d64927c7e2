pub mod client;
pub mod etl;
pub mod mapper;
pub mod pipeline;
pub mod source;
pub mod uploader;

pub use crate::domain::model::{
    BackfillSummary, Batch, MappingOutcome, Record, SkipReason, SkippedRow, UploadReport,
    UserAttributes,
};
pub use crate::domain::ports::{Pipeline, Storage};
pub use crate::utils::error::Result;
