use crate::core::{BackfillSummary, Pipeline};
use crate::utils::error::Result;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<BackfillSummary> {
        tracing::info!("Starting user backfill...");

        // Extract
        let rows = self.pipeline.extract().await?;
        let rows_read = rows.len();

        // Transform
        let outcome = self.pipeline.transform(rows).await?;
        let mut summary = BackfillSummary {
            rows_read,
            records_mapped: outcome.records.len(),
            rows_missing_identifier: outcome.missing_identifier_count(),
            rows_malformed: outcome.malformed_count(),
            upload: None,
        };

        if outcome.records.is_empty() {
            tracing::warn!("⚠️ No valid user records to upload");
            return Ok(summary);
        }

        // Load
        summary.upload = Some(self.pipeline.load(outcome.records).await?);
        Ok(summary)
    }
}
