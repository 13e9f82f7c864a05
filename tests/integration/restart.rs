//! The update takes the service down before it can answer.

use crate::common::quick_recovery;
use tempfile::TempDir;
use updprobe_cli::constants::{APPLY_PATH, HEALTH_PATH, UPLOAD_PATH};
use updprobe_cli::models::{ApplyOutcome, Disconnect};
use updprobe_cli::test_utils::{RestartingService, ScriptedConfirm, write_package};
use updprobe_cli::workflow::{Target, UpdateWorkflow, WorkflowStage};

#[tokio::test]
async fn test_dropped_apply_connection_counts_as_restart() {
    let temp_dir = TempDir::new().unwrap();
    let package = write_package(temp_dir.path(), "update.zip", 4096).await.unwrap();
    let service = RestartingService::start().await.unwrap();

    let summary = UpdateWorkflow::new(Target::new(service.url(), package))
        .unwrap()
        .with_recovery(quick_recovery(5))
        .run(&ScriptedConfirm::yes())
        .await
        .unwrap();

    match summary.apply {
        Some(ApplyOutcome::AssumedRestarting { disconnect, .. }) => {
            assert_eq!(disconnect, Disconnect::DuringExchange);
        }
        other => panic!("unexpected apply outcome: {other:?}"),
    }
    assert_eq!(summary.stage(), WorkflowStage::End);
    assert_eq!(summary.recovery_attempts, Some(1));

    assert_eq!(service.count("POST", UPLOAD_PATH), 1);
    assert_eq!(service.count("POST", APPLY_PATH), 1);
    assert_eq!(service.count("GET", HEALTH_PATH), 2);
}

#[tokio::test]
async fn test_request_apply_against_restarting_service() {
    let service = RestartingService::start().await.unwrap();
    let workflow = UpdateWorkflow::new(Target::new(service.url(), "update.zip")).unwrap();

    let outcome = workflow.client().request_apply().await;

    assert!(outcome.is_success());
    assert!(matches!(
        outcome,
        ApplyOutcome::AssumedRestarting {
            disconnect: Disconnect::DuringExchange,
            ..
        }
    ));
}

#[tokio::test]
async fn test_refused_apply_connection_is_tagged_before_request() {
    let url = updprobe_cli::test_utils::unused_local_url().unwrap();
    let workflow = UpdateWorkflow::new(Target::new(url, "update.zip")).unwrap();

    let outcome = workflow.client().request_apply().await;

    assert!(matches!(
        outcome,
        ApplyOutcome::AssumedRestarting {
            disconnect: Disconnect::BeforeRequest,
            ..
        }
    ));
}
