//! Gateway error types and the uniform result envelope.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::device::DeviceError;
use crate::session::SessionState;

/// Stable, serializable error tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DeviceUnavailable,
    DeviceNotReady,
    InvalidArgument,
    InvalidIndex,
    DeviceOperationFailed,
    SettingsRejected,
    DownloadFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::DeviceUnavailable => "device_unavailable",
            ErrorKind::DeviceNotReady => "device_not_ready",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::InvalidIndex => "invalid_index",
            ErrorKind::DeviceOperationFailed => "device_operation_failed",
            ErrorKind::SettingsRejected => "settings_rejected",
            ErrorKind::DownloadFailed => "download_failed",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    #[error("Camera unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Camera session is not ready (state: {0})")]
    DeviceNotReady(SessionState),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid camera index: {0}")]
    InvalidIndex(i64),

    #[error("{0}")]
    DeviceOperationFailed(String),

    #[error("Settings rejected by device: {0}")]
    SettingsRejected(String),

    #[error("Download of {uri} failed: {message}")]
    DownloadFailed { uri: String, message: String },
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::DeviceUnavailable(_) => ErrorKind::DeviceUnavailable,
            GatewayError::DeviceNotReady(_) => ErrorKind::DeviceNotReady,
            GatewayError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            GatewayError::InvalidIndex(_) => ErrorKind::InvalidIndex,
            GatewayError::DeviceOperationFailed(_) => ErrorKind::DeviceOperationFailed,
            GatewayError::SettingsRejected(_) => ErrorKind::SettingsRejected,
            GatewayError::DownloadFailed { .. } => ErrorKind::DownloadFailed,
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        GatewayError::InvalidArgument(message.into())
    }
}

impl From<DeviceError> for GatewayError {
    fn from(err: DeviceError) -> Self {
        GatewayError::DeviceOperationFailed(err.0)
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Uniform result shape returned by every gateway capability.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Outcome<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error_kind: None,
            message: None,
        }
    }

    pub fn failure(err: &GatewayError) -> Self {
        Self {
            ok: false,
            data: None,
            error_kind: Some(err.kind()),
            message: Some(err.to_string()),
        }
    }
}

impl<T> From<GatewayResult<T>> for Outcome<T> {
    fn from(result: GatewayResult<T>) -> Self {
        match result {
            Ok(data) => Outcome::success(data),
            Err(err) => Outcome::failure(&err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_are_snake_case() {
        let err = GatewayError::DownloadFailed {
            uri: "/DCIM/a.insv".into(),
            message: "timeout".into(),
        };
        assert_eq!(err.kind(), ErrorKind::DownloadFailed);
        assert_eq!(
            serde_json::to_value(err.kind()).unwrap(),
            serde_json::json!("download_failed")
        );
        assert_eq!(ErrorKind::DeviceNotReady.as_str(), "device_not_ready");
    }

    #[test]
    fn test_device_error_passes_through_verbatim() {
        let err: GatewayError = DeviceError::new("Failed to take picture").into();
        assert_eq!(err.kind(), ErrorKind::DeviceOperationFailed);
        assert_eq!(err.to_string(), "Failed to take picture");
    }

    #[test]
    fn test_outcome_shape() {
        let ok: Outcome<u32> = Ok(7).into();
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json, serde_json::json!({"ok": true, "data": 7}));

        let failed: Outcome<u32> = Err(GatewayError::InvalidIndex(3)).into();
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["errorKind"], "invalid_index");
        assert_eq!(json["message"], "Invalid camera index: 3");
        assert!(json.get("data").is_none());
    }
}
