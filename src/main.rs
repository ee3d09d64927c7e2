use clap::Parser;
use user_backfill::core::Storage;
use user_backfill::utils::error::ErrorSeverity;
use user_backfill::utils::{logger, validation::Validate};
use user_backfill::{
    BackfillConfig, BackfillPipeline, BackfillSummary, CliConfig, EtlEngine, EtlError, LocalStorage,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 載入 .env（若存在）
    dotenvy::dotenv().ok();

    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    let config = match BackfillConfig::load(&cli).and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };

    tracing::info!("🚀 Starting user backfill");
    tracing::info!(
        "Source: {}, batch size: {}, mode: {}",
        config.source,
        config.batch_size,
        config.mode()
    );
    if cli.verbose {
        tracing::debug!("Resolved config: {:?}", config);
    }

    let result = if config.from_s3 {
        run_from_s3(&config).await
    } else {
        run(LocalStorage::current_dir(), &config).await
    };

    match result {
        Ok(summary) => report(&summary),
        Err(e) => exit_with(&e),
    }

    Ok(())
}

async fn run<S: Storage>(storage: S, config: &BackfillConfig) -> user_backfill::Result<BackfillSummary> {
    let pipeline = BackfillPipeline::from_config(storage, config)?;
    EtlEngine::new(pipeline).run().await
}

#[cfg(feature = "s3")]
async fn run_from_s3(config: &BackfillConfig) -> user_backfill::Result<BackfillSummary> {
    let storage = user_backfill::S3Storage::connect(
        &config.s3_bucket,
        config.aws_profile.as_deref(),
        config.aws_region.as_deref(),
    )
    .await;
    run(storage, config).await
}

#[cfg(not(feature = "s3"))]
async fn run_from_s3(_config: &BackfillConfig) -> user_backfill::Result<BackfillSummary> {
    Err(EtlError::ConfigError {
        message: "built without the `s3` feature; pass --local to read a local file".to_string(),
    })
}

fn report(summary: &BackfillSummary) {
    tracing::info!(
        "Rows read: {}, converted: {}, skipped (no identifier): {}, skipped (malformed): {}",
        summary.rows_read,
        summary.records_mapped,
        summary.rows_missing_identifier,
        summary.rows_malformed
    );

    if summary.succeeded() {
        tracing::info!("✅ All user data uploaded successfully");
        println!("✅ All user data uploaded successfully");
        return;
    }

    match &summary.upload {
        Some(upload) => {
            tracing::error!(
                "❌ Some user data failed to upload: {} succeeded, {} failed (batches {:?})",
                upload.succeeded_records,
                upload.failed_records,
                upload.abandoned_batches
            );
            println!(
                "❌ Some user data failed to upload: {} succeeded, {} failed",
                upload.succeeded_records, upload.failed_records
            );
        }
        None => {
            tracing::error!("❌ No valid user data to upload");
            println!("❌ No valid user data to upload");
        }
    }
    std::process::exit(2);
}

fn exit_with(e: &EtlError) -> ! {
    tracing::error!(
        "❌ Backfill aborted: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::Medium | ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
