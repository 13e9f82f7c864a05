use crate::constants::{
    APPLY_PATH, APPLY_TIMEOUT, CLEANUP_PATH, CLEANUP_TIMEOUT, DEFAULT_PACKAGE_FILE, HEALTH_PATH,
    HEALTH_TIMEOUT, PACKAGE_INFO_PATH, PACKAGE_INFO_TIMEOUT, UPLOAD_FIELD, UPLOAD_PATH,
    UPLOAD_TIMEOUT,
};
use crate::core::ProbeError;
use crate::models::{
    ApplyOutcome, Disconnect, PackageInfoResult, ServiceResponse, UploadResult,
};
use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

/// Longest body excerpt quoted back to the operator.
const BODY_SNIPPET_CHARS: usize = 200;

/// Client for one self-update service instance.
///
/// The base URL is fixed at construction. The underlying `reqwest::Client`
/// keeps no per-request state beyond its connection pool, and every request
/// sets its own timeout.
///
/// # Examples
///
/// ```rust,no_run
/// use updprobe_cli::client::SelfUpdateClient;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = SelfUpdateClient::new("http://192.168.1.100:5000/")?;
/// assert_eq!(client.base_url(), "http://192.168.1.100:5000");
///
/// if client.check_health().await {
///     println!("service is up");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SelfUpdateClient {
    http: reqwest::Client,
    base_url: String,
}

impl SelfUpdateClient {
    /// Create a client for the service at `base_url`.
    ///
    /// Trailing slashes are removed.
    ///
    /// # Errors
    ///
    /// - [`ProbeError::InvalidUrl`] if `base_url` is not an absolute http(s) URL
    /// - [`ProbeError::ConfigError`] if the HTTP client cannot be initialised
    pub fn new(base_url: &str) -> Result<Self, ProbeError> {
        let base_url = normalize_base_url(base_url)?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("updprobe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProbeError::ConfigError {
                message: format!("failed to initialise HTTP client: {e}"),
            })?;

        Ok(Self { http, base_url })
    }

    /// Normalised base URL, without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of an endpoint path such as [`HEALTH_PATH`].
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET the health endpoint (5 s timeout).
    ///
    /// Fails closed: a transport error, a timeout or any status other than
    /// 200 yields `false`.
    pub async fn check_health(&self) -> bool {
        let url = self.endpoint(HEALTH_PATH);
        debug!("Probing health at {} (timeout {:?})", url, HEALTH_TIMEOUT);

        match self.http.get(&url).timeout(HEALTH_TIMEOUT).send().await {
            Ok(response) => {
                let status = response.status();
                debug!("Health probe answered HTTP {}", status);
                status == StatusCode::OK
            }
            Err(e) => {
                debug!("Health probe failed: {}", describe(&e));
                false
            }
        }
    }

    /// POST the package as multipart field `file` (120 s timeout).
    ///
    /// The whole file is read into memory first. Read, transport and decode
    /// failures are returned as a local failure carrying the error text.
    pub async fn upload_package(&self, path: &Path) -> UploadResult {
        match self.try_upload(path).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Upload failed locally: {:#}", e);
                UploadResult::local_failure(format!("{e:#}"))
            }
        }
    }

    async fn try_upload(&self, path: &Path) -> Result<UploadResult> {
        let url = self.endpoint(UPLOAD_PATH);
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read package {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_PACKAGE_FILE.to_string());

        debug!(
            "Uploading {} ({} bytes) to {} (timeout {:?})",
            file_name,
            bytes.len(),
            url,
            UPLOAD_TIMEOUT
        );

        let part = Part::bytes(bytes).file_name(file_name).mime_str("application/zip")?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .http
            .post(&url)
            .timeout(UPLOAD_TIMEOUT)
            .multipart(form)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!(describe(&e)))
            .context("Upload request failed")?;

        let status = response.status();
        debug!("Upload answered HTTP {}", status);

        let body: Value = response
            .json()
            .await
            .with_context(|| format!("Upload response (HTTP {}) is not valid JSON", status.as_u16()))?;

        Ok(UploadResult::from_body(body))
    }

    /// GET the metadata of the uploaded package (10 s timeout).
    pub async fn query_package_info(&self) -> PackageInfoResult {
        match self.fetch_envelope(PACKAGE_INFO_PATH, PACKAGE_INFO_TIMEOUT, false).await {
            Ok(response) => PackageInfoResult::from(response),
            Err(e) => {
                warn!("Package info query failed: {:#}", e);
                PackageInfoResult::local_failure(format!("{e:#}"))
            }
        }
    }

    /// POST the cleanup endpoint (10 s timeout).
    ///
    /// Local failures come back as an unsuccessful envelope carrying the
    /// error text.
    pub async fn cleanup_packages(&self) -> ServiceResponse {
        match self.fetch_envelope(CLEANUP_PATH, CLEANUP_TIMEOUT, true).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Cleanup call failed: {:#}", e);
                ServiceResponse {
                    message: Some(format!("{e:#}")),
                    ..Default::default()
                }
            }
        }
    }

    async fn fetch_envelope(
        &self,
        path: &str,
        timeout: std::time::Duration,
        post: bool,
    ) -> Result<ServiceResponse> {
        let url = self.endpoint(path);
        debug!("Calling {} (timeout {:?})", url, timeout);

        let request = if post {
            self.http.post(&url)
        } else {
            self.http.get(&url)
        };

        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!(describe(&e)))
            .with_context(|| format!("Request to {path} failed"))?;

        let status = response.status();
        debug!("{} answered HTTP {}", path, status);

        response
            .json::<ServiceResponse>()
            .await
            .with_context(|| format!("Response from {path} (HTTP {}) is not valid JSON", status.as_u16()))
    }

    /// POST the apply endpoint (30 s timeout).
    ///
    /// A lost connection, before or after the request was delivered, is
    /// classified [`ApplyOutcome::AssumedRestarting`]. A complete response that
    /// is not a JSON envelope is [`ApplyOutcome::Rejected`].
    pub async fn request_apply(&self) -> ApplyOutcome {
        let url = self.endpoint(APPLY_PATH);
        debug!("Triggering update at {} (timeout {:?})", url, APPLY_TIMEOUT);

        let response = match self.http.post(&url).timeout(APPLY_TIMEOUT).send().await {
            Ok(response) => response,
            Err(e) => return assumed_restart(&e),
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return assumed_restart(&e),
        };
        debug!("Apply answered HTTP {}", status);

        match serde_json::from_str::<ServiceResponse>(&text) {
            Ok(envelope) => ApplyOutcome::from_response(&envelope),
            Err(e) => {
                debug!("Apply response is not an envelope: {}", e);
                ApplyOutcome::Rejected {
                    message: Some(format!(
                        "unexpected response (HTTP {}): {}",
                        status.as_u16(),
                        snippet(&text)
                    )),
                }
            }
        }
    }
}

/// Validate and normalise a service base URL.
///
/// Surrounding whitespace and trailing slashes are removed; the URL must be
/// absolute, use `http` or `https`, and name a host.
///
/// # Errors
///
/// Returns [`ProbeError::InvalidUrl`] when any of the above does not hold.
pub fn normalize_base_url(raw: &str) -> Result<String, ProbeError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let invalid = |reason: String| ProbeError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let parsed = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }

    Ok(trimmed.to_string())
}

fn assumed_restart(err: &reqwest::Error) -> ApplyOutcome {
    let disconnect = if err.is_connect() {
        Disconnect::BeforeRequest
    } else {
        Disconnect::DuringExchange
    };
    let detail = describe(err);
    info!("Apply connection lost ({}): {}", disconnect, detail);

    ApplyOutcome::AssumedRestarting { disconnect, detail }
}

/// Render an error with its source chain, `outer: inner: root`.
fn describe(err: &(dyn std::error::Error + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !text.contains(&cause_text) {
            text.push_str(": ");
            text.push_str(&cause_text);
        }
        source = cause.source();
    }
    text
}

fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    let mut excerpt: String = trimmed.chars().take(BODY_SNIPPET_CHARS).collect();
    if trimmed.chars().count() > BODY_SNIPPET_CHARS {
        excerpt.push('…');
    }
    excerpt
}
