use app_state::{UploadSettings, WorkerSettings};
use color_eyre::Result;
use common_services::irida_client::ProjectResolver;
use common_services::notifications::NotificationEmitter;
use common_services::testing::{
    MemoryStore, STATUS_FILE_NAME, ScriptStep, ScriptedTransport, StaticProjectApi,
};
use common_services::transfer::TransferDriver;
use common_types::{NotificationKind, UploadStatus};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use worker::handlers::JobResult;
use worker::orchestrator::UploadOrchestrator;

const EMAIL: &str = "ada@example.org";
const FOLDER: &str = "run_1";

struct Harness {
    _root: TempDir,
    store: Arc<MemoryStore>,
    transport: Arc<ScriptedTransport>,
    api: Arc<StaticProjectApi>,
    orchestrator: UploadOrchestrator,
    folder: PathBuf,
    upload_id: i64,
}

fn worker_settings() -> WorkerSettings {
    WorkerSettings {
        concurrency: 2,
        max_retries: 5,
        retry_base_seconds: 60,
        poll_interval_ms: 10,
        heartbeat_interval_seconds: 120,
        heartbeat_timeout_seconds: 300.,
        soft_time_limit_seconds: 82_800,
        hard_time_limit_seconds: 86_400,
        email_max_attempts: 3,
    }
}

async fn harness_with(
    steps: Vec<ScriptStep>,
    worker: WorkerSettings,
    paired_end: Option<bool>,
) -> Result<Harness> {
    let root = tempfile::tempdir()?;
    let uploads = UploadSettings {
        upload_root: root.path().to_path_buf(),
        manifest_file_name: "SampleList.csv".to_owned(),
        status_file_name: STATUS_FILE_NAME.to_owned(),
        log_file_name: "irida-uploader.log".to_owned(),
        sort_manifest: true,
        paired_end,
        project_name_prefix: "QIB".to_owned(),
        log_tail_lines: 200,
    };
    let folder = uploads.folder_dir(EMAIL, FOLDER);
    fs::create_dir_all(&folder)?;
    for name in ["S1_S1_R1_001.fastq.gz", "S1_S1_R2_001.fastq.gz"] {
        fs::write(folder.join(name), b"@r\nACGT\n+\nFFFF\n")?;
    }

    let store = Arc::new(MemoryStore::default());
    let user = store.add_user(EMAIL).await;
    let upload = store.insert_upload(user.id, FOLDER).await;

    let transport = Arc::new(ScriptedTransport::new(steps));
    let api = Arc::new(StaticProjectApi::with_projects(&[("1", "unrelated")]));
    let emitter = NotificationEmitter::new(store.clone(), store.clone(), store.clone(), 2);
    let orchestrator = UploadOrchestrator::new(
        store.clone(),
        emitter,
        ProjectResolver::new(api.clone()),
        TransferDriver::new(transport.clone(), "default"),
        uploads,
        worker,
    );

    Ok(Harness {
        _root: root,
        store,
        transport,
        api,
        orchestrator,
        folder,
        upload_id: upload.id,
    })
}

async fn harness(steps: Vec<ScriptStep>) -> Result<Harness> {
    harness_with(steps, worker_settings(), None).await
}

fn artifact(state: &str, uploaded: &[bool]) -> String {
    let samples: Vec<serde_json::Value> = uploaded
        .iter()
        .enumerate()
        .map(|(i, up)| {
            serde_json::json!({
                "Sample Name": format!("S{}", i + 1),
                "Project ID": "100",
                "Uploaded": if *up { "True" } else { "False" },
            })
        })
        .collect();
    serde_json::json!({
        "Run ID": "55",
        "Upload Status": state,
        "Sample Status": samples,
    })
    .to_string()
}

#[tokio::test]
async fn fresh_upload_builds_manifest_and_succeeds() -> Result<()> {
    // ARRANGE
    let h = harness(vec![ScriptStep {
        artifact: Some(artifact("complete", &[true])),
        ..ScriptedTransport::exit(0)
    }])
    .await?;

    // ACT
    let result = h.orchestrator.execute(h.upload_id, false).await;

    // ASSERT
    assert_eq!(result, JobResult::Done);
    let upload = h.store.upload(h.upload_id).await.ok_or_else(|| color_eyre::eyre::eyre!("gone"))?;
    assert_eq!(upload.status, UploadStatus::Success);
    assert_eq!(upload.remote_project_id.as_deref(), Some("100"));
    assert_eq!(upload.remote_run_id.as_deref(), Some("55"));
    assert_eq!(upload.sample_count, 1);

    let created = h.api.created().await;
    assert_eq!(created.len(), 1);
    assert!(created[0].0.starts_with("QIB-run-1-"));

    let manifest = fs::read_to_string(h.folder.join("SampleList.csv"))?;
    assert!(manifest.contains("S1, 100, S1_S1_R1_001.fastq.gz, S1_S1_R2_001.fastq.gz"));

    let calls = h.transport.calls().await;
    assert_eq!(calls.len(), 1);
    assert!(!calls[0].continue_partial);

    let notices = h.store.notifications().await;
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NotificationKind::Success);
    assert_eq!(h.store.emails().await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn complete_artifact_skips_the_transfer() -> Result<()> {
    // ARRANGE
    let h = harness(vec![]).await?;
    fs::write(h.folder.join(STATUS_FILE_NAME), artifact("complete", &[true, true]))?;

    // ACT
    let result = h.orchestrator.execute(h.upload_id, false).await;

    // ASSERT
    assert_eq!(result, JobResult::Done);
    assert!(h.transport.calls().await.is_empty());
    let upload = h.store.upload(h.upload_id).await.ok_or_else(|| color_eyre::eyre::eyre!("gone"))?;
    assert_eq!(upload.status, UploadStatus::Success);
    assert_eq!(upload.sample_count, 2);
    let notices = h.store.notifications().await;
    assert_eq!(notices.len(), 1);
    assert!(notices[0].message.contains("already completed"));
    Ok(())
}

#[tokio::test]
async fn partial_artifact_continues_with_remaining_samples() -> Result<()> {
    // ARRANGE
    let h = harness(vec![ScriptedTransport::exit(0)]).await?;
    fs::write(
        h.folder.join(STATUS_FILE_NAME),
        artifact("partial", &[true, true, false, false, false]),
    )?;
    fs::write(
        h.folder.join("SampleList.csv"),
        "[Data]\nSample_Name,Project_ID,File_Forward,File_Reverse\nS1, 42, S1_S1_R1_001.fastq.gz, S1_S1_R2_001.fastq.gz\n",
    )?;

    // ACT
    let result = h.orchestrator.execute(h.upload_id, false).await;

    // ASSERT
    assert_eq!(result, JobResult::Done);
    let calls = h.transport.calls().await;
    assert_eq!(calls.len(), 1);
    assert!(calls[0].continue_partial);
    let upload = h.store.upload(h.upload_id).await.ok_or_else(|| color_eyre::eyre::eyre!("gone"))?;
    assert_eq!(upload.sample_count, 3);
    assert_eq!(upload.remote_project_id.as_deref(), Some("42"));
    assert!(h.api.created().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn failures_back_off_then_give_up_once() -> Result<()> {
    // ARRANGE
    let h = harness((0..6).map(|_| ScriptedTransport::exit(1)).collect()).await?;

    // ACT
    let mut delays = Vec::new();
    let mut last = JobResult::Done;
    for _ in 0..6 {
        last = h.orchestrator.execute(h.upload_id, false).await;
        if let JobResult::Retry { delay_seconds, .. } = &last {
            delays.push(*delay_seconds);
        }
    }

    // ASSERT
    assert_eq!(delays, vec![60, 120, 240, 480, 960]);
    assert!(matches!(last, JobResult::Failed(_)));
    let upload = h.store.upload(h.upload_id).await.ok_or_else(|| color_eyre::eyre::eyre!("gone"))?;
    assert_eq!(upload.status, UploadStatus::Failed);
    assert_eq!(upload.retry_count, 5);

    let notices = h.store.notifications().await;
    let exhausted: Vec<_> = notices
        .iter()
        .filter(|n| n.message.contains("after 5 retries"))
        .collect();
    assert_eq!(exhausted.len(), 1);
    assert_eq!(notices.len(), 1);
    assert_eq!(h.store.emails().await.len(), 1);
    assert_eq!(h.transport.calls().await.len(), 6);
    Ok(())
}

#[tokio::test]
async fn missing_upload_is_not_retried() -> Result<()> {
    let h = harness(vec![]).await?;

    let result = h.orchestrator.execute(9_999, false).await;

    assert!(matches!(result, JobResult::Failed(_)));
    assert!(h.store.notifications().await.is_empty());
    assert!(h.transport.calls().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn vanished_folder_fails_without_retry() -> Result<()> {
    let h = harness(vec![]).await?;
    fs::remove_dir_all(&h.folder)?;

    let result = h.orchestrator.execute(h.upload_id, false).await;

    assert!(matches!(result, JobResult::Failed(_)));
    let upload = h.store.upload(h.upload_id).await.ok_or_else(|| color_eyre::eyre::eyre!("gone"))?;
    assert_eq!(upload.status, UploadStatus::Failed);
    assert_eq!(upload.retry_count, 0);
    let notices = h.store.notifications().await;
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].title, "Upload Failed");
    Ok(())
}

#[tokio::test]
async fn error_lines_become_notifications_while_running() -> Result<()> {
    // ARRANGE
    let h = harness(vec![ScriptStep {
        lines: vec![
            "2025-03-01 10:00:00 INFO     Uploading S1".to_owned(),
            "2025-03-01 10:00:01 ERROR    Sample S1 rejected by server".to_owned(),
        ],
        artifact: Some(artifact("complete", &[true])),
        ..ScriptedTransport::exit(0)
    }])
    .await?;

    // ACT
    h.orchestrator.execute(h.upload_id, false).await;

    // ASSERT
    let notices = h.store.notifications().await;
    let errors: Vec<_> = notices.iter().filter(|n| n.title == "Upload Error").collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "2025-03-01 10:00:01 ERROR    Sample S1 rejected by server");
    assert_eq!(errors[0].kind, NotificationKind::Error);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn soft_time_limit_cancels_and_retries() -> Result<()> {
    // ARRANGE
    let h = harness_with(
        vec![ScriptStep {
            delay: Some(Duration::from_secs(120)),
            ..ScriptedTransport::exit(0)
        }],
        WorkerSettings {
            soft_time_limit_seconds: 30,
            hard_time_limit_seconds: 60,
            ..worker_settings()
        },
        None,
    )
    .await?;

    // ACT
    let result = h.orchestrator.execute(h.upload_id, false).await;

    // ASSERT
    assert!(matches!(result, JobResult::Retry { delay_seconds: 60, .. }));
    let upload = h.store.upload(h.upload_id).await.ok_or_else(|| color_eyre::eyre::eyre!("gone"))?;
    assert_eq!(upload.status, UploadStatus::Failed);
    assert_eq!(upload.retry_count, 1);
    assert!(h.store.notifications().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn unpairable_read_in_forced_paired_folder_fails_without_retry() -> Result<()> {
    // ARRANGE
    let h = harness_with(vec![], worker_settings(), Some(true)).await?;
    fs::write(h.folder.join("lonely.fastq.gz"), b"@r\nACGT\n+\nFFFF\n")?;

    // ACT
    let result = h.orchestrator.execute(h.upload_id, false).await;

    // ASSERT
    assert!(matches!(result, JobResult::Failed(_)));
    let upload = h.store.upload(h.upload_id).await.ok_or_else(|| color_eyre::eyre::eyre!("gone"))?;
    assert_eq!(upload.status, UploadStatus::Failed);
    assert_eq!(upload.retry_count, 0);
    assert!(h.api.created().await.is_empty());
    assert!(h.transport.calls().await.is_empty());
    assert!(!h.folder.join("SampleList.csv").exists());
    let notices = h.store.notifications().await;
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].title, "Upload Failed");
    assert_eq!(h.store.emails().await.len(), 1);
    Ok(())
}
