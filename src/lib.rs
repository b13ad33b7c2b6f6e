//! Visual Regression Testing (VRT) Library
//!
//! Captures screenshots of a URL through a headless browser, normalizes pairs
//! of screenshots onto common canvases, and computes an anti-alias-aware
//! per-pixel diff. Also includes a supervisor for running the capture/diff
//! service as a managed child process in a desktop-hosting setup.
//!
//! # Module Overview
//!
//! - [`capture`] - Headless browser automation for URL screenshots
//! - [`compositor`] - Canvas normalization for mismatched screenshot sizes
//! - [`diff`] - Per-pixel comparison with anti-aliasing detection
//! - [`pipeline`] - End-to-end capture and diff operations
//! - [`store`] - On-disk artifact layout and cleanup
//! - [`supervisor`] - Child-process health orchestration
//! - [`config`] - Configuration file support
//! - [`output`] - JSON output schemas
//!
//! # Example
//!
//! ```no_run
//! use vrt_lib::{diff_canvases, composite_pair, generate_diff, DiffOptions};
//! use std::path::Path;
//!
//! # fn example() -> vrt_lib::Result<()> {
//! // Full pipeline: decode, composite, diff, write the diff image.
//! let report = generate_diff(
//!     Path::new("before.png"),
//!     Path::new("after.png"),
//!     Path::new("diff.png"),
//!     &DiffOptions::default(),
//! )?;
//! println!("changed ratio: {:.4}", report.diff_ratio);
//!
//! // Or drive the layers directly with in-memory images.
//! let a = image::RgbaImage::from_pixel(4, 4, image::Rgba([255, 255, 255, 255]));
//! let b = image::RgbaImage::from_pixel(4, 2, image::Rgba([0, 0, 0, 255]));
//! let (before, after) = composite_pair(&a, &b);
//! let result = diff_canvases(&before, &after, &DiffOptions::default())?;
//! println!("changed ratio: {:.4}", result.diff_ratio);
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod compositor;
pub mod config;
pub mod diff;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod store;
pub mod supervisor;
pub mod viewport;

pub use capture::{
    CaptureOptions, CaptureOutcome, CaptureRequest, CaptureService, DEFAULT_NAVIGATION_TIMEOUT,
    DEFAULT_PROVISIONING_TIMEOUT,
};
pub use compositor::{composite_pair, expand_to_canvas, CANVAS_BACKGROUND};
pub use config::{Config, ServiceConfig, Timeouts};
pub use diff::{diff_canvases, DiffOptions, DiffResult};
pub use error::{ErrorCategory, ErrorPayload, Result, VrtError};
pub use output::{VrtOutput, VRT_OUTPUT_VERSION};
pub use pipeline::{generate_diff, take_screenshot, DiffReport};
pub use store::{ArtifactStore, CleanupSummary};
pub use supervisor::{
    ServiceState, ServiceSupervisor, SupervisorOptions, DEFAULT_PROBE_TIMEOUT, DEFAULT_RETRY_DELAY,
    DEFAULT_SERVICE_PORT, DEFAULT_STARTUP_TIMEOUT,
};
pub use viewport::Viewport;
