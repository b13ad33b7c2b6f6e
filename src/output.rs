//! Versioned JSON output schemas for the command-line surface. Every result
//! the tool prints in `--json` mode goes through these types so consumers can
//! key off `version` and `kind` instead of scraping text.

use std::path::PathBuf;

use serde::Serialize;

use crate::error::ErrorPayload;
use crate::pipeline::DiffReport;
use crate::store::CleanupSummary;
use crate::supervisor::ServiceState;

/// Bumped whenever a field changes meaning or shape.
pub const VRT_OUTPUT_VERSION: &str = "0.1.0";

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum VrtOutput {
    #[serde(rename_all = "camelCase")]
    Capture {
        version: &'static str,
        url: String,
        screenshot: PathBuf,
        width: u32,
        height: u32,
        elapsed_ms: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        published: Option<PathBuf>,
    },
    #[serde(rename_all = "camelCase")]
    Diff {
        version: &'static str,
        #[serde(flatten)]
        report: DiffReport,
        /// Whether the ratio stayed within the caller's acceptance bound.
        passed: Option<bool>,
    },
    #[serde(rename_all = "camelCase")]
    Supervise {
        version: &'static str,
        state: ServiceState,
        port: u16,
        pid: Option<u32>,
    },
    #[serde(rename_all = "camelCase")]
    Clean {
        version: &'static str,
        #[serde(flatten)]
        summary: CleanupSummary,
        total_removed: u64,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        version: &'static str,
        error: ErrorPayload,
    },
}

impl VrtOutput {
    pub fn capture(
        url: String,
        outcome: &crate::capture::CaptureOutcome,
        published: Option<PathBuf>,
    ) -> Self {
        Self::Capture {
            version: VRT_OUTPUT_VERSION,
            url,
            screenshot: outcome.path.clone(),
            width: outcome.width,
            height: outcome.height,
            elapsed_ms: outcome.elapsed.as_millis() as u64,
            published,
        }
    }

    pub fn diff(report: DiffReport, passed: Option<bool>) -> Self {
        Self::Diff {
            version: VRT_OUTPUT_VERSION,
            report,
            passed,
        }
    }

    pub fn supervise(state: ServiceState, port: u16, pid: Option<u32>) -> Self {
        Self::Supervise {
            version: VRT_OUTPUT_VERSION,
            state,
            port,
            pid,
        }
    }

    pub fn clean(summary: CleanupSummary) -> Self {
        Self::Clean {
            version: VRT_OUTPUT_VERSION,
            total_removed: summary.total(),
            summary,
        }
    }

    pub fn error(payload: ErrorPayload) -> Self {
        Self::Error {
            version: VRT_OUTPUT_VERSION,
            error: payload,
        }
    }
}
