use anyhow::Result;
use httpmock::prelude::*;
use std::fmt::Write as _;
use std::time::Duration;
use tempfile::TempDir;
use user_backfill::{BackfillConfig, BackfillPipeline, EtlEngine, EtlError, LocalStorage};

fn local_config(source: &str, base_url: &str, batch_size: usize) -> BackfillConfig {
    BackfillConfig {
        source: source.to_string(),
        from_s3: false,
        batch_size,
        api_key: "test-api-key".to_string(),
        base_url: base_url.to_string(),
        s3_bucket: "unused-bucket".to_string(),
        aws_profile: None,
        aws_region: None,
        request_timeout: Duration::from_secs(5),
        request_delay: Duration::ZERO,
    }
}

fn write_csv(dir: &TempDir, name: &str, content: &str) -> Result<()> {
    std::fs::write(dir.path().join(name), content)?;
    Ok(())
}

/// `valid` 筆有效記錄；每 40 筆夾雜一列沒有識別碼的資料
fn users_csv(valid: usize) -> String {
    let mut csv = String::from("email,external_id,first_name,is_marketing\n");
    for i in 0..valid {
        writeln!(csv, ",user-{:03},User {},True", i, i).unwrap();
        if i % 40 == 0 {
            csv.push_str(",,Anonymous,False\n");
        }
    }
    csv
}

#[tokio::test]
async fn test_end_to_end_local_csv_upload() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_csv(
        &temp_dir,
        "users.csv",
        "email,external_id,first_name,phone,applied_business,birthyear,birthday,has_card\n\
         kim@example.com,ext-1,Kim,01012345678,\"[kdt, hh]\",1990,0715,1\n\
         ,,Ghost,,,,,\n\
         lee@example.com,,Lee,821098765432,[],,,0\n",
    )?;

    let server = MockServer::start();
    let track_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/users/track")
            .header("authorization", "Bearer test-api-key")
            .json_body(serde_json::json!({
                "attributes": [
                    {
                        "email": "kim@example.com",
                        "external_id": "ext-1",
                        "first_name": "Kim",
                        "phone": "+821012345678",
                        "applied_business": ["kdt", "hh"],
                        "dob": "1990-07-15",
                        "has_card": true
                    },
                    {
                        "email": "lee@example.com",
                        "first_name": "Lee",
                        "phone": "+821098765432",
                        "applied_business": [],
                        "has_card": false
                    }
                ]
            }));
        then.status(201).json_body(serde_json::json!({"message": "success"}));
    });

    let config = local_config("users.csv", &server.base_url(), 50);
    let pipeline = BackfillPipeline::from_config(LocalStorage::new(temp_dir.path()), &config)?;
    let summary = EtlEngine::new(pipeline).run().await?;

    track_mock.assert();
    assert_eq!(summary.rows_read, 3);
    assert_eq!(summary.records_mapped, 2);
    assert_eq!(summary.rows_missing_identifier, 1);
    assert!(summary.succeeded());

    Ok(())
}

#[tokio::test]
async fn test_second_batch_failing_twice_fails_the_run() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_csv(&temp_dir, "users.csv", &users_csv(120))?;

    let server = MockServer::start();
    let first = server.mock(|when, then| {
        when.method(POST).path("/users/track").body_contains("\"user-000\"");
        then.status(201);
    });
    let second = server.mock(|when, then| {
        when.method(POST).path("/users/track").body_contains("\"user-050\"");
        then.status(500).body("internal error");
    });
    let third = server.mock(|when, then| {
        when.method(POST).path("/users/track").body_contains("\"user-100\"");
        then.status(201);
    });

    let config = local_config("users.csv", &server.base_url(), 50);
    let pipeline = BackfillPipeline::from_config(LocalStorage::new(temp_dir.path()), &config)?;
    let summary = EtlEngine::new(pipeline).run().await?;

    first.assert_hits(1);
    second.assert_hits(2);
    third.assert_hits(1);

    assert_eq!(summary.rows_read, 123);
    assert_eq!(summary.records_mapped, 120);
    assert_eq!(summary.rows_missing_identifier, 3);

    let upload = summary.upload.as_ref().unwrap();
    assert_eq!(upload.total_batches, 3);
    assert_eq!(upload.succeeded_records, 70);
    assert_eq!(upload.failed_records, 50);
    assert_eq!(upload.retried_batches, 1);
    assert_eq!(upload.abandoned_batches, vec![2]);
    assert!(!upload.all_succeeded());
    assert!(!summary.succeeded());

    Ok(())
}

#[tokio::test]
async fn test_rerun_after_failed_run_succeeds() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_csv(&temp_dir, "users.csv", &users_csv(3))?;

    let server = MockServer::start();
    let mut failing = server.mock(|when, then| {
        when.method(POST).path("/users/track");
        then.status(503);
    });

    let config = local_config("users.csv", &server.base_url(), 50);
    let storage = LocalStorage::new(temp_dir.path());
    let pipeline = BackfillPipeline::from_config(storage, &config)?;
    let engine = EtlEngine::new(pipeline);

    // 端點持續失敗：首次與重試都失敗，整體結果為失敗
    let summary = engine.run().await?;
    failing.assert_hits(2);
    assert!(!summary.succeeded());
    failing.delete();

    let accepting = server.mock(|when, then| {
        when.method(POST).path("/users/track");
        then.status(201);
    });
    // 端點恢復後重新執行，首次即成功，不需重試
    let summary = engine.run().await?;

    accepting.assert_hits(1);
    assert!(summary.succeeded());
    assert_eq!(summary.upload.unwrap().retried_batches, 0);

    Ok(())
}

#[tokio::test]
async fn test_csv_without_identifiers_uploads_nothing() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_csv(&temp_dir, "users.csv", "first_name,phone\nA,01011112222\nB,\n")?;

    let server = MockServer::start();
    let track_mock = server.mock(|when, then| {
        when.method(POST).path("/users/track");
        then.status(201);
    });

    let config = local_config("users.csv", &server.base_url(), 50);
    let pipeline = BackfillPipeline::from_config(LocalStorage::new(temp_dir.path()), &config)?;
    let summary = EtlEngine::new(pipeline).run().await?;

    track_mock.assert_hits(0);
    assert_eq!(summary.rows_missing_identifier, 2);
    assert!(summary.upload.is_none());
    assert!(!summary.succeeded());

    Ok(())
}

#[tokio::test]
async fn test_missing_source_file_is_fatal() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let server = MockServer::start();
    let track_mock = server.mock(|when, then| {
        when.method(POST).path("/users/track");
        then.status(201);
    });

    let config = local_config("does-not-exist.csv", &server.base_url(), 50);
    let pipeline = BackfillPipeline::from_config(LocalStorage::new(temp_dir.path()), &config)?;
    let result = EtlEngine::new(pipeline).run().await;

    track_mock.assert_hits(0);
    assert!(matches!(result, Err(EtlError::IoError(_))));

    Ok(())
}

#[tokio::test]
async fn test_request_delay_applies_after_every_attempt() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_csv(&temp_dir, "users.csv", &users_csv(4))?;

    let server = MockServer::start();
    let track_mock = server.mock(|when, then| {
        when.method(POST).path("/users/track");
        then.status(400);
    });

    let mut config = local_config("users.csv", &server.base_url(), 2);
    config.request_delay = Duration::from_millis(50);
    let pipeline = BackfillPipeline::from_config(LocalStorage::new(temp_dir.path()), &config)?;

    let started = std::time::Instant::now();
    let summary = EtlEngine::new(pipeline).run().await?;

    // 2 批 x (首次 + 重試) = 4 次請求，每次之後都等待
    track_mock.assert_hits(4);
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert_eq!(summary.upload.unwrap().failed_records, 4);

    Ok(())
}
