//! Workflow scenarios against a wiremock service.

use crate::common::*;
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;
use updprobe_cli::constants::{APPLY_PATH, HEALTH_PATH, PACKAGE_INFO_PATH, UPLOAD_PATH};
use updprobe_cli::core::ProbeError;
use updprobe_cli::models::ApplyOutcome;
use updprobe_cli::test_utils::{ScriptedConfirm, init_test_logging, unused_local_url, write_package};
use updprobe_cli::workflow::{Target, UpdateWorkflow, WorkflowStage};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn package(temp_dir: &TempDir) -> PathBuf {
    write_package(temp_dir.path(), "update.zip", 64 * 1024).await.unwrap()
}

fn workflow(base_url: &str, package: PathBuf) -> UpdateWorkflow {
    UpdateWorkflow::new(Target::new(base_url, package))
        .unwrap()
        .with_recovery(quick_recovery(5))
}

fn count(paths: &[String], wanted: &str) -> usize {
    paths.iter().filter(|p| *p == wanted).count()
}

#[tokio::test]
async fn test_full_run_follows_the_sequence() {
    init_test_logging(None);
    let temp_dir = TempDir::new().unwrap();
    let server = healthy_service().await;
    let confirm = ScriptedConfirm::yes();

    let summary = workflow(&server.uri(), package(&temp_dir).await)
        .run(&confirm)
        .await
        .unwrap();

    assert_eq!(summary.stage(), WorkflowStage::End);
    assert_eq!(
        summary.stages,
        vec![
            WorkflowStage::Start,
            WorkflowStage::HealthChecked,
            WorkflowStage::Uploaded,
            WorkflowStage::Queried,
            WorkflowStage::Confirmed,
            WorkflowStage::Applied,
            WorkflowStage::Recovered,
            WorkflowStage::End,
        ]
    );
    assert_eq!(summary.package_bytes, 64 * 1024);
    assert!(summary.package_checksum.unwrap().starts_with("sha256:"));
    assert_eq!(summary.upload_response["version"], "1.2.3");
    assert!(matches!(summary.apply, Some(ApplyOutcome::Triggered { .. })));
    assert_eq!(summary.recovery_attempts, Some(1));
    assert_eq!(confirm.times_asked(), 1);

    assert_eq!(
        received_paths(&server).await,
        vec![
            format!("GET {HEALTH_PATH}"),
            format!("POST {UPLOAD_PATH}"),
            format!("GET {PACKAGE_INFO_PATH}"),
            format!("POST {APPLY_PATH}"),
            format!("GET {HEALTH_PATH}"),
        ]
    );
}

#[tokio::test]
async fn test_upload_is_sent_as_multipart_file_field() {
    let temp_dir = TempDir::new().unwrap();
    let server = healthy_service().await;

    workflow(&server.uri(), package(&temp_dir).await)
        .run(&ScriptedConfirm::yes())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let upload = requests
        .iter()
        .find(|r| r.url.path() == UPLOAD_PATH)
        .unwrap();
    let content_type = upload.headers.get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("multipart/form-data"));

    let body = String::from_utf8_lossy(&upload.body);
    assert!(body.contains(r#"name="file""#));
    assert!(body.contains(r#"filename="update.zip""#));
    assert!(body.contains("application/zip"));
}

#[tokio::test]
async fn test_unhealthy_service_aborts_before_upload() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_health(&server, 503).await;
    mount_upload(&server, json!({"success": true}), 0).await;
    mount_apply(&server, ResponseTemplate::new(200), 0).await;
    let confirm = ScriptedConfirm::yes();

    let err = workflow(&server.uri(), package(&temp_dir).await)
        .run(&confirm)
        .await
        .unwrap_err();

    assert!(matches!(err, ProbeError::ServiceUnreachable { .. }));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(received_paths(&server).await, vec![format!("GET {HEALTH_PATH}")]);
    assert_eq!(confirm.times_asked(), 0);
}

#[tokio::test]
async fn test_unreachable_service_aborts_before_upload() {
    let temp_dir = TempDir::new().unwrap();
    let url = unused_local_url().unwrap();

    let err = workflow(&url, package(&temp_dir).await)
        .run(&ScriptedConfirm::yes())
        .await
        .unwrap_err();

    match err {
        ProbeError::ServiceUnreachable { url: probed } => {
            assert_eq!(probed, format!("{url}{HEALTH_PATH}"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_missing_package_makes_no_calls() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    let err = workflow(&server.uri(), temp_dir.path().join("absent.zip"))
        .run(&ScriptedConfirm::yes())
        .await
        .unwrap_err();

    assert!(matches!(err, ProbeError::PackageNotFound { .. }));
    assert!(received_paths(&server).await.is_empty());
}

#[tokio::test]
async fn test_rejected_upload_is_terminal_and_not_retried() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_health(&server, 200).await;
    mount_upload(&server, json!({"success": false, "message": "not a zip"}), 1).await;
    mount_apply(&server, ResponseTemplate::new(200), 0).await;
    let confirm = ScriptedConfirm::yes();

    let err = workflow(&server.uri(), package(&temp_dir).await)
        .run(&confirm)
        .await
        .unwrap_err();

    match err {
        ProbeError::UploadFailed { message } => assert_eq!(message, "not a zip"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(confirm.times_asked(), 0);
}

#[tokio::test]
async fn test_upload_with_non_json_answer_fails() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_health(&server, 200).await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(ResponseTemplate::new(413).set_body_string("Request Entity Too Large"))
        .expect(1)
        .mount(&server)
        .await;

    let err = workflow(&server.uri(), package(&temp_dir).await)
        .run(&ScriptedConfirm::yes())
        .await
        .unwrap_err();

    match err {
        ProbeError::UploadFailed { message } => assert!(message.contains("413"), "{message}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_package_info_failure_is_only_a_warning() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_health(&server, 200).await;
    mount_upload(&server, json!({"success": true}), 1).await;
    mount_package_info(&server, 404, json!({"success": false, "message": "No package"})).await;
    mount_apply(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"success": true})),
        1,
    )
    .await;

    let summary = workflow(&server.uri(), package(&temp_dir).await)
        .run(&ScriptedConfirm::yes())
        .await
        .unwrap();

    assert!(summary.stages.contains(&WorkflowStage::QueryFailed));
    assert_eq!(summary.stage(), WorkflowStage::End);
}

#[tokio::test]
async fn test_declined_confirmation_never_calls_apply() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_health(&server, 200).await;
    mount_upload(&server, json!({"success": true}), 1).await;
    mount_package_info(&server, 200, json!({"success": true, "packageInfo": package_info()})).await;
    mount_apply(&server, ResponseTemplate::new(200), 0).await;
    let confirm = ScriptedConfirm::no();

    let err = workflow(&server.uri(), package(&temp_dir).await)
        .run(&confirm)
        .await
        .unwrap_err();

    assert!(matches!(err, ProbeError::Declined));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(confirm.times_asked(), 1);
    assert_eq!(count(&received_paths(&server).await, &format!("POST {APPLY_PATH}")), 0);
}

#[tokio::test]
async fn test_rejected_apply_surfaces_the_message() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_health(&server, 200).await;
    mount_upload(&server, json!({"success": true}), 1).await;
    mount_package_info(&server, 200, json!({"success": true, "packageInfo": package_info()})).await;
    mount_apply(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"success": false, "message": "locked"})),
        1,
    )
    .await;

    let err = workflow(&server.uri(), package(&temp_dir).await)
        .run(&ScriptedConfirm::yes())
        .await
        .unwrap_err();

    match &err {
        ProbeError::ApplyRejected { message } => assert_eq!(message, "locked"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("locked"));
    assert_eq!(err.exit_code(), 1);

    // No recovery polling after a refusal.
    assert_eq!(count(&received_paths(&server).await, &format!("GET {HEALTH_PATH}")), 1);
}

#[tokio::test]
async fn test_apply_with_non_json_answer_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_health(&server, 200).await;
    mount_upload(&server, json!({"success": true}), 1).await;
    mount_package_info(&server, 200, json!({"success": true})).await;
    mount_apply(&server, ResponseTemplate::new(502).set_body_string("Bad Gateway"), 1).await;

    let err = workflow(&server.uri(), package(&temp_dir).await)
        .run(&ScriptedConfirm::yes())
        .await
        .unwrap_err();

    match err {
        ProbeError::ApplyRejected { message } => {
            assert!(message.contains("HTTP 502"), "{message}");
            assert!(message.contains("Bad Gateway"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_recovery_times_out_within_budget() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_health_then_down(&server, 1).await;
    mount_upload(&server, json!({"success": true}), 1).await;
    mount_package_info(&server, 200, json!({"success": true})).await;
    mount_apply(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"success": true})),
        1,
    )
    .await;

    let err = UpdateWorkflow::new(Target::new(server.uri(), package(&temp_dir).await))
        .unwrap()
        .with_recovery(quick_recovery(3))
        .run(&ScriptedConfirm::yes())
        .await
        .unwrap_err();

    assert!(matches!(err, ProbeError::RecoveryTimeout { waited_secs: 3 }));
    assert_eq!(err.exit_code(), 1);

    // One pre-flight probe plus exactly the budget.
    assert_eq!(count(&received_paths(&server).await, &format!("GET {HEALTH_PATH}")), 4);
}

#[tokio::test]
async fn test_recovery_stops_at_first_healthy_probe() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    // Up for the pre-flight check, down twice while restarting, then up again.
    Mock::given(method("GET"))
        .and(path(HEALTH_PATH))
        .respond_with(ResponseTemplate::new(200))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(HEALTH_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(2)
        .mount(&server)
        .await;
    mount_health(&server, 200).await;
    mount_upload(&server, json!({"success": true}), 1).await;
    mount_package_info(&server, 200, json!({"success": true})).await;
    mount_apply(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"success": true})),
        1,
    )
    .await;

    let summary = UpdateWorkflow::new(Target::new(server.uri(), package(&temp_dir).await))
        .unwrap()
        .with_recovery(quick_recovery(10))
        .run(&ScriptedConfirm::yes())
        .await
        .unwrap();

    assert_eq!(summary.recovery_attempts, Some(3));
    assert_eq!(count(&received_paths(&server).await, &format!("GET {HEALTH_PATH}")), 4);
}

#[tokio::test]
async fn test_cleanup_runs_after_recovery() {
    let temp_dir = TempDir::new().unwrap();
    let server = healthy_service().await;
    mount_cleanup(&server, json!({"success": true, "message": "Removed 3 packages"}), 1).await;

    let summary = workflow(&server.uri(), package(&temp_dir).await)
        .with_cleanup(true)
        .run(&ScriptedConfirm::yes())
        .await
        .unwrap();

    let tail = &summary.stages[summary.stages.len() - 3..];
    assert_eq!(
        tail,
        [WorkflowStage::Recovered, WorkflowStage::CleanedUp, WorkflowStage::End]
    );
}

#[tokio::test]
async fn test_failed_cleanup_does_not_fail_the_run() {
    let temp_dir = TempDir::new().unwrap();
    let server = healthy_service().await;
    mount_cleanup(&server, json!({"success": false, "error": "package in use"}), 1).await;

    let summary = workflow(&server.uri(), package(&temp_dir).await)
        .with_cleanup(true)
        .run(&ScriptedConfirm::yes())
        .await
        .unwrap();

    assert!(summary.stages.contains(&WorkflowStage::CleanupFailed));
    assert_eq!(summary.stage(), WorkflowStage::End);
}

#[tokio::test]
async fn test_cleanup_is_skipped_by_default() {
    let temp_dir = TempDir::new().unwrap();
    let server = healthy_service().await;
    mount_cleanup(&server, json!({"success": true}), 0).await;

    workflow(&server.uri(), package(&temp_dir).await)
        .run(&ScriptedConfirm::yes())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_trailing_slash_in_base_url_is_ignored() {
    let temp_dir = TempDir::new().unwrap();
    let server = healthy_service().await;

    let summary = workflow(&format!("{}/", server.uri()), package(&temp_dir).await)
        .run(&ScriptedConfirm::yes())
        .await
        .unwrap();

    assert_eq!(summary.stage(), WorkflowStage::End);
    assert!(received_paths(&server).await.iter().all(|p| !p.contains("//")));
}

#[test]
fn test_invalid_base_url_is_rejected_up_front() {
    let err = UpdateWorkflow::new(Target::new("ftp://localhost:5000", "update.zip")).unwrap_err();
    assert!(matches!(err, ProbeError::InvalidUrl { .. }));
}
