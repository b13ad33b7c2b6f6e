use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::ParseError;

#[derive(Debug, Error)]
pub enum VrtError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] ParseError),

    #[error("Image decode error: {0}")]
    Decode(String),

    #[error("Renderer provisioning error: {0}")]
    Provisioning(String),

    #[error("Navigation error: {0}")]
    Navigation(String),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Diff error: {0}")]
    Diff(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl VrtError {
    pub fn decode(message: impl Into<String>) -> Self {
        VrtError::Decode(message.into())
    }

    pub fn provisioning(message: impl Into<String>) -> Self {
        VrtError::Provisioning(message.into())
    }

    pub fn navigation(message: impl Into<String>) -> Self {
        VrtError::Navigation(message.into())
    }

    pub fn capture(message: impl Into<String>) -> Self {
        VrtError::Capture(message.into())
    }

    pub fn diff(message: impl Into<String>) -> Self {
        VrtError::Diff(message.into())
    }

    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            VrtError::Io(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check file paths/permissions.",
            ),
            VrtError::Network(e) => ErrorPayload::new(
                ErrorCategory::Network,
                e.to_string(),
                "Check connectivity and that the service port is reachable.",
            ),
            VrtError::InvalidUrl(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Verify URL format (e.g., https://example.com).",
            ),
            VrtError::Decode(msg) => ErrorPayload::new(
                ErrorCategory::Decode,
                msg.to_string(),
                "Verify the screenshot file exists and is a readable PNG.",
            ),
            VrtError::Provisioning(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("playwright npm package is missing") {
                    ErrorPayload::new(
                        ErrorCategory::Provisioning,
                        msg.to_string(),
                        "Install Playwright (`npm install playwright`), then retry.",
                    )
                } else if lower.contains("node") && lower.contains("not found") {
                    ErrorPayload::new(
                        ErrorCategory::Provisioning,
                        msg.to_string(),
                        "Install Node.js and ensure the node binary is on PATH.",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Provisioning,
                        msg.to_string(),
                        "Run `npx playwright install chromium` to download the browser.",
                    )
                }
            }
            VrtError::Navigation(msg) => ErrorPayload::new(
                ErrorCategory::Navigation,
                msg.to_string(),
                "Check the URL is reachable; slow pages may need a longer --nav-timeout.",
            ),
            VrtError::Capture(msg) => ErrorPayload::new(
                ErrorCategory::Capture,
                msg.to_string(),
                "Check the output path is writable and disk space is available.",
            ),
            VrtError::Diff(msg) => ErrorPayload::new(
                ErrorCategory::Diff,
                msg.to_string(),
                "Ensure both inputs decode correctly; re-run with --verbose for details.",
            ),
            VrtError::Serialization(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check JSON inputs; re-run with --verbose for details.",
            ),
            VrtError::Config(msg) => ErrorPayload::new(
                ErrorCategory::Config,
                msg.to_string(),
                "Check flags/paths (e.g., --viewport WIDTHxHEIGHT) and the config file.",
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, VrtError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Config,
    Network,
    Decode,
    Provisioning,
    Navigation,
    Capture,
    Diff,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            remediation: Some(remediation.into()),
        }
    }
}
