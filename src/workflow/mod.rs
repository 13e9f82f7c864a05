//! The update-verification workflow.
//!
//! [`UpdateWorkflow`] drives a self-update service through a fixed, linear
//! sequence and stops at the first terminal failure:
//!
//! ```text
//! START
//!   ├── preflight        package must exist locally            (terminal)
//!   ├── [1/4] health     GET  /api/self-update/health          (terminal)
//!   ├── [2/4] upload     POST /api/self-update/upload          (terminal)
//!   ├── [3/4] info       GET  /api/self-update/package-info    (warning only)
//!   ├── [4/4] confirm    operator must answer `y`              (terminal)
//!   │         apply      POST /api/self-update/apply           (terminal if rejected)
//!   ├── recovery         health once per second, bounded       (terminal on timeout)
//!   └── cleanup          POST /api/self-update/cleanup         (optional, warning only)
//! END
//! ```
//!
//! No step is retried; the operator re-runs the tool instead.
//!
//! # Example
//!
//! ```rust,no_run
//! use updprobe_cli::workflow::{StdinConfirm, Target, UpdateWorkflow};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let target = Target::new("http://localhost:5000", "update.zip");
//! let workflow = UpdateWorkflow::new(target)?;
//!
//! let summary = workflow.run(&StdinConfirm).await?;
//! println!("recovered after {:?} probe(s)", summary.recovery_attempts);
//! # Ok(())
//! # }
//! ```

mod confirm;
mod recovery;

pub use confirm::{Confirm, StdinConfirm, is_affirmative};
pub use recovery::{RecoveryOutcome, RecoveryPolicy, wait_for_recovery};

use crate::client::SelfUpdateClient;
use crate::constants::HEALTH_PATH;
use crate::core::ProbeError;
use crate::models::{ApplyOutcome, Disconnect};
use crate::utils::{Spinner, compute_sha256, file_size, format_size, output};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const TOTAL_STEPS: u8 = 4;

/// What the run operates on. Fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Base URL of the service, e.g. `http://localhost:5000`
    pub base_url: String,
    /// Local update package
    pub package_path: PathBuf,
}

impl Target {
    /// Target for the given service and package.
    pub fn new(base_url: impl Into<String>, package_path: impl Into<PathBuf>) -> Self {
        Self {
            base_url: base_url.into(),
            package_path: package_path.into(),
        }
    }
}

/// Position in the linear state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStage {
    /// Nothing has been sent yet.
    Start,
    /// The service answered its health check.
    HealthChecked,
    /// The package was accepted.
    Uploaded,
    /// Package metadata was retrieved.
    Queried,
    /// The metadata query failed; the run goes on.
    QueryFailed,
    /// The operator agreed to the update.
    Confirmed,
    /// The update was triggered or the service dropped the connection.
    Applied,
    /// The service is healthy again.
    Recovered,
    /// Old packages were removed.
    CleanedUp,
    /// The cleanup call failed; the run still succeeds.
    CleanupFailed,
    /// The run finished.
    End,
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::HealthChecked => "health-checked",
            Self::Uploaded => "uploaded",
            Self::Queried => "queried",
            Self::QueryFailed => "query-failed",
            Self::Confirmed => "confirmed",
            Self::Applied => "applied",
            Self::Recovered => "recovered",
            Self::CleanedUp => "cleaned-up",
            Self::CleanupFailed => "cleanup-failed",
            Self::End => "end",
        };
        f.write_str(name)
    }
}

/// Record of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSummary {
    /// Stages passed, in order
    pub stages: Vec<WorkflowStage>,
    /// Size of the uploaded package in bytes
    pub package_bytes: u64,
    /// `sha256:<hex>` of the package, when it could be computed
    pub package_checksum: Option<String>,
    /// Body returned by the upload endpoint
    pub upload_response: Value,
    /// How the apply call ended
    pub apply: Option<ApplyOutcome>,
    /// Health probes needed to see the service again
    pub recovery_attempts: Option<u64>,
}

impl WorkflowSummary {
    fn new() -> Self {
        Self {
            stages: vec![WorkflowStage::Start],
            package_bytes: 0,
            package_checksum: None,
            upload_response: Value::Null,
            apply: None,
            recovery_attempts: None,
        }
    }

    fn advance(&mut self, stage: WorkflowStage) {
        info!("Workflow stage: {}", stage);
        self.stages.push(stage);
    }

    /// Last stage reached.
    #[must_use]
    pub fn stage(&self) -> WorkflowStage {
        self.stages.last().copied().unwrap_or(WorkflowStage::Start)
    }
}

/// Sequential orchestrator for one update run.
#[derive(Debug, Clone)]
pub struct UpdateWorkflow {
    client: SelfUpdateClient,
    target: Target,
    recovery: RecoveryPolicy,
    cleanup: bool,
}

impl UpdateWorkflow {
    /// Workflow with the default recovery policy and no cleanup.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::InvalidUrl`] if the target's base URL is not an
    /// absolute http(s) URL.
    pub fn new(target: Target) -> Result<Self, ProbeError> {
        let client = SelfUpdateClient::new(&target.base_url)?;
        Ok(Self {
            client,
            target,
            recovery: RecoveryPolicy::default(),
            cleanup: false,
        })
    }

    /// The client used for every call of the run.
    #[must_use]
    pub fn client(&self) -> &SelfUpdateClient {
        &self.client
    }

    /// Replace the recovery policy.
    #[must_use]
    pub fn with_recovery(mut self, recovery: RecoveryPolicy) -> Self {
        self.recovery = recovery;
        self
    }

    /// Run the package cleanup after a confirmed recovery.
    #[must_use]
    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Execute the full sequence.
    ///
    /// # Errors
    ///
    /// Returns the [`ProbeError`] of the first terminal failure. Operator
    /// guidance for it is attached by [`crate::core::user_friendly_error`].
    pub async fn run<C: Confirm>(&self, confirm: &C) -> Result<WorkflowSummary, ProbeError> {
        let mut summary = WorkflowSummary::new();
        let package = self.target.package_path.as_path();

        output::header("====== Self-update smoke test ======");
        println!();
        output::field("Base URL", self.client.base_url());
        output::field("Package", &package.display().to_string());

        summary.package_bytes = preflight(package).await?;
        output::field("Size", &format_size(summary.package_bytes));
        summary.package_checksum = match compute_sha256(package).await {
            Ok(checksum) => {
                output::field("SHA-256", &checksum);
                Some(checksum)
            }
            Err(e) => {
                warn!("Could not checksum package: {:#}", e);
                None
            }
        };
        println!();

        self.check_health().await?;
        summary.advance(WorkflowStage::HealthChecked);
        println!();

        summary.upload_response = self.upload(package).await?;
        summary.advance(WorkflowStage::Uploaded);
        println!();

        let queried = self.query_package_info().await;
        summary.advance(if queried {
            WorkflowStage::Queried
        } else {
            WorkflowStage::QueryFailed
        });
        println!();

        output::step(4, TOTAL_STEPS, "Triggering update...");
        println!();
        output::warning("The service will restart and be unavailable for a while");
        println!();
        if !confirm.confirm("Continue? (y/N):").await? {
            println!("Update cancelled");
            return Err(ProbeError::Declined);
        }
        summary.advance(WorkflowStage::Confirmed);

        let outcome = self.apply().await?;
        summary.apply = Some(outcome);
        summary.advance(WorkflowStage::Applied);

        println!();
        output::info(&format!(
            "Waiting for the service to recover (up to {} seconds)...",
            self.recovery.max_wait_secs
        ));
        match wait_for_recovery(&self.client, &self.recovery).await {
            RecoveryOutcome::Recovered { attempts } => {
                summary.recovery_attempts = Some(attempts);
                summary.advance(WorkflowStage::Recovered);
                println!();
                output::success("Service recovered");
                println!("Update test complete!");
                println!();
                println!("Detailed update logs:");
                println!("  - Web logs: [web root]/logs/");
                println!("  - Updater logs: [updater dir]/logs/updater_*.txt");
            }
            RecoveryOutcome::TimedOut { attempts } => {
                debug!("No healthy answer after {} probe(s)", attempts);
                println!();
                output::failure("Service recovery timed out");
                return Err(ProbeError::RecoveryTimeout {
                    waited_secs: self.recovery.max_wait_secs,
                });
            }
        }

        if self.cleanup {
            println!();
            let stage = self.cleanup_packages().await;
            summary.advance(stage);
        }

        summary.advance(WorkflowStage::End);
        Ok(summary)
    }

    async fn check_health(&self) -> Result<(), ProbeError> {
        output::step(1, TOTAL_STEPS, "Checking service health...");

        if !self.client.check_health().await {
            return Err(ProbeError::ServiceUnreachable {
                url: self.client.endpoint(HEALTH_PATH),
            });
        }

        output::success("Service is running");
        Ok(())
    }

    async fn upload(&self, package: &Path) -> Result<Value, ProbeError> {
        output::step(2, TOTAL_STEPS, "Uploading update package...");

        let spinner = Spinner::new(format!("Uploading {}", package.display()));
        let result = self.client.upload_package(package).await;
        spinner.finish_and_clear();

        if !result.success {
            return Err(ProbeError::UploadFailed {
                message: result
                    .message
                    .unwrap_or_else(|| "service gave no reason".to_string()),
            });
        }

        output::success("Upload succeeded");
        println!("Version info:");
        output::json(&result.body);
        Ok(result.body)
    }

    /// Non-fatal: returns whether the query succeeded.
    async fn query_package_info(&self) -> bool {
        output::step(3, TOTAL_STEPS, "Querying package info...");

        let result = self.client.query_package_info().await;
        if !result.success {
            output::warning(&format!(
                "Package info query failed: {}",
                result.message.as_deref().unwrap_or("service gave no reason")
            ));
            return false;
        }

        output::success("Package info retrieved");
        if let Some(details) = result.details() {
            output::field("Package", &details.summary());
        }
        println!("Current package:");
        output::json(result.package_info.as_ref().unwrap_or(&Value::Null));
        true
    }

    async fn apply(&self) -> Result<ApplyOutcome, ProbeError> {
        let outcome = self.client.request_apply().await;

        match &outcome {
            ApplyOutcome::Triggered { message } => {
                output::success("Update triggered");
                if let Some(message) = message {
                    println!("{message}");
                }
            }
            ApplyOutcome::AssumedRestarting { disconnect, detail } => {
                output::info("Service is updating (expected connection drop)");
                if *disconnect == Disconnect::BeforeRequest {
                    warn!("Apply request may never have reached the service: {}", detail);
                    output::warning(
                        "The connection failed before the request was sent; if recovery times out, check the network",
                    );
                }
            }
            ApplyOutcome::Rejected { message } => {
                return Err(ProbeError::ApplyRejected {
                    message: message
                        .clone()
                        .unwrap_or_else(|| "service gave no reason".to_string()),
                });
            }
        }

        Ok(outcome)
    }

    async fn cleanup_packages(&self) -> WorkflowStage {
        output::info("Cleaning up old update packages...");

        let response = self.client.cleanup_packages().await;
        if response.success {
            output::success(response.reason().unwrap_or("Old packages removed"));
            WorkflowStage::CleanedUp
        } else {
            output::warning(&format!(
                "Cleanup failed: {}",
                response.reason().unwrap_or("service gave no reason")
            ));
            WorkflowStage::CleanupFailed
        }
    }
}

/// Check the package exists and return its size.
async fn preflight(package: &Path) -> Result<u64, ProbeError> {
    file_size(package).await.map_err(|e| {
        debug!("Preflight failed: {:#}", e);
        ProbeError::PackageNotFound {
            path: package.display().to_string(),
        }
    })
}
