//! Data models for the self-update service contract
//!
//! The service answers every call with the same JSON envelope
//! ([`ServiceResponse`]); the per-step result types narrow that envelope to
//! what each step of the workflow needs. Nothing here outlives a single run.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Common JSON envelope returned by the self-update endpoints.
///
/// Only `success` is interpreted. Everything the service adds beyond the
/// known fields (version information on upload, for instance) is kept in
/// `extra` so it can be shown to the operator verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse {
    /// Whether the service accepted the request. Missing means `false`.
    #[serde(default)]
    pub success: bool,

    /// Human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Error detail, set by the service on some failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Package metadata, opaque to the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_info: Option<Value>,

    /// Any other field in the body.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ServiceResponse {
    /// Message to show the operator: `message`, falling back to `error`.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.message.as_deref().or(self.error.as_deref())
    }
}

/// Outcome of the package upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadResult {
    /// Whether the package was accepted.
    pub success: bool,
    /// Server message, or the local error text when the call failed.
    pub message: Option<String>,
    /// Full decoded response body (`Null` for local failures).
    pub body: Value,
}

impl UploadResult {
    /// Build a result from a decoded response body.
    #[must_use]
    pub fn from_body(body: Value) -> Self {
        let envelope: ServiceResponse =
            serde_json::from_value(body.clone()).unwrap_or_default();
        Self {
            success: envelope.success,
            message: envelope.reason().map(str::to_string),
            body,
        }
    }

    /// A failure that happened on this side (I/O, transport, decoding).
    #[must_use]
    pub fn local_failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            body: Value::Null,
        }
    }
}

/// Outcome of the package metadata query.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageInfoResult {
    /// Whether the service returned package metadata.
    pub success: bool,
    /// Server message, or the local error text when the call failed.
    pub message: Option<String>,
    /// Package metadata, opaque.
    pub package_info: Option<Value>,
}

impl PackageInfoResult {
    /// A failure that happened on this side (transport, decoding).
    #[must_use]
    pub fn local_failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            package_info: None,
        }
    }

    /// Typed view of the metadata, when it follows the usual shape.
    #[must_use]
    pub fn details(&self) -> Option<PackageDetails> {
        self.package_info.as_ref().and_then(PackageDetails::from_value)
    }
}

impl From<ServiceResponse> for PackageInfoResult {
    fn from(response: ServiceResponse) -> Self {
        Self {
            success: response.success,
            message: response.reason().map(str::to_string),
            package_info: response.package_info,
        }
    }
}

/// Version block inside the package metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDetails {
    /// Version number, e.g. "1.2.3.0".
    #[serde(default)]
    pub version: Option<String>,
    /// Build timestamp as reported by the package.
    #[serde(default)]
    pub build_time: Option<String>,
    /// Application type, e.g. "aspnetcore".
    #[serde(default)]
    pub app_type: Option<String>,
    /// Release notes.
    #[serde(default)]
    pub release_notes: Option<String>,
}

/// Best-effort typed view of the opaque package metadata.
///
/// Only used to print a one-line summary; when the service sends something
/// else the raw JSON is still shown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDetails {
    /// Version block of the package manifest.
    #[serde(default)]
    pub version: Option<VersionDetails>,
    /// Where the service stored the package.
    #[serde(default)]
    pub package_path: Option<String>,
    /// Package size in bytes.
    #[serde(default)]
    pub package_size: Option<u64>,
    /// Upload timestamp as reported by the service.
    #[serde(default)]
    pub upload_time: Option<String>,
}

impl PackageDetails {
    /// Interpret a metadata value; `None` when it is not an object.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// One-line summary such as `v1.2.3 (aspnetcore), 2.00 MB, uploaded 2024-05-01T10:00:00`.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        if let Some(version) = &self.version {
            let mut head = match &version.version {
                Some(v) => format!("v{}", v.trim_start_matches('v')),
                None => "unknown version".to_string(),
            };
            if let Some(app_type) = &version.app_type {
                head.push_str(&format!(" ({app_type})"));
            }
            parts.push(head);
        }
        if let Some(size) = self.package_size {
            parts.push(crate::utils::format_size(size));
        }
        if let Some(uploaded) = &self.upload_time {
            parts.push(format!("uploaded {uploaded}"));
        }

        if parts.is_empty() {
            "no details".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// How the connection was lost while triggering the update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disconnect {
    /// The connection could not be established; the request was never delivered.
    BeforeRequest,
    /// The request went out but no complete response came back.
    DuringExchange,
}

impl fmt::Display for Disconnect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeforeRequest => write!(f, "connection failed before the request was sent"),
            Self::DuringExchange => write!(f, "connection dropped after the request was sent"),
        }
    }
}

/// Outcome of the update trigger.
///
/// A dropped connection is its own variant: the service is expected to go
/// down while it restarts, so losing the connection is read as success. The
/// [`Disconnect`] kind keeps the two indistinguishable-by-default cases apart:
/// a `BeforeRequest` drop may just as well be a broken network.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// The service confirmed that the updater was started.
    Triggered {
        /// Server message
        message: Option<String>,
    },
    /// The service refused, or answered with something unusable.
    Rejected {
        /// Server message or description of the unusable answer
        message: Option<String>,
    },
    /// The connection was lost; the service is assumed to be restarting.
    AssumedRestarting {
        /// Where in the exchange the connection went away
        disconnect: Disconnect,
        /// Transport error text
        detail: String,
    },
}

impl ApplyOutcome {
    /// Classify a decoded response envelope.
    #[must_use]
    pub fn from_response(response: &ServiceResponse) -> Self {
        let message = response.reason().map(str::to_string);
        if response.success {
            Self::Triggered { message }
        } else {
            Self::Rejected { message }
        }
    }

    /// `Triggered` and `AssumedRestarting` both let the run continue.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }
}
