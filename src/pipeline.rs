//! End-to-end operations composed from the lower layers: validate and capture
//! a URL into the store, and turn two screenshot files into a diff image plus
//! a serializable report.

use std::path::{Path, PathBuf};

use image::RgbaImage;
use serde::Serialize;
use tracing::info;
use url::Url;

use crate::capture::{CaptureOutcome, CaptureRequest, CaptureService};
use crate::compositor::composite_pair;
use crate::diff::{diff_canvases, DiffOptions};
use crate::error::{Result, VrtError};
use crate::store::ArtifactStore;

/// Summary of one comparison, written alongside the diff image.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffReport {
    pub before: PathBuf,
    pub after: PathBuf,
    pub diff_image: PathBuf,
    pub width: u32,
    pub height: u32,
    pub diff_pixels: u64,
    pub total_pixels: u64,
    pub diff_ratio: f64,
    pub threshold: f32,
}

/// Captures the requested URL to `out`, or into a fresh screenshot slot in
/// the store when no explicit destination is given. The URL is validated up
/// front so malformed input fails before a browser is launched.
pub async fn take_screenshot(
    service: &CaptureService,
    store: &ArtifactStore,
    request: &CaptureRequest,
    out: Option<&Path>,
) -> Result<CaptureOutcome> {
    let parsed = Url::parse(&request.url)?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(VrtError::Config(format!(
            "unsupported URL scheme {:?}; only http and https can be captured",
            parsed.scheme()
        )));
    }

    let output = match out {
        Some(path) => path.to_path_buf(),
        None => {
            store.ensure()?;
            store.allocate_screenshot()
        }
    };
    let request = CaptureRequest {
        url: parsed.into(),
        ..request.clone()
    };
    let outcome = service.capture(&request, &output).await?;
    info!(
        path = %outcome.path.display(),
        width = outcome.width,
        height = outcome.height,
        "screenshot captured"
    );
    Ok(outcome)
}

/// Loads two screenshots, normalizes them onto common canvases, diffs them,
/// and writes the diff image to `diff_path`.
pub fn generate_diff(
    before_path: &Path,
    after_path: &Path,
    diff_path: &Path,
    options: &DiffOptions,
) -> Result<DiffReport> {
    let before = load_rgba(before_path)?;
    let after = load_rgba(after_path)?;

    let (before_canvas, after_canvas) = composite_pair(&before, &after);
    let result = diff_canvases(&before_canvas, &after_canvas, options)?;

    if let Some(parent) = diff_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    result
        .image
        .save(diff_path)
        .map_err(|e| VrtError::diff(format!("failed to write {}: {}", diff_path.display(), e)))?;

    info!(
        diff = %diff_path.display(),
        diff_pixels = result.diff_pixels,
        ratio = result.diff_ratio,
        "diff generated"
    );

    Ok(DiffReport {
        before: before_path.to_path_buf(),
        after: after_path.to_path_buf(),
        diff_image: diff_path.to_path_buf(),
        width: result.width,
        height: result.height,
        diff_pixels: result.diff_pixels,
        total_pixels: result.total_pixels,
        diff_ratio: result.diff_ratio,
        threshold: options.threshold,
    })
}

fn load_rgba(path: &Path) -> Result<RgbaImage> {
    let img = image::open(path)
        .map_err(|e| VrtError::decode(format!("cannot decode {}: {}", path.display(), e)))?;
    Ok(img.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureOptions;
    use image::{Rgba, RgbaImage};

    fn write_png(path: &Path, width: u32, height: u32, color: [u8; 4]) {
        RgbaImage::from_pixel(width, height, Rgba(color))
            .save(path)
            .expect("write fixture png");
    }

    #[tokio::test]
    async fn take_screenshot_rejects_malformed_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = CaptureService::new(CaptureOptions::default());
        let store = ArtifactStore::new(dir.path());

        let result =
            take_screenshot(&service, &store, &CaptureRequest::new("not a url"), None).await;
        assert!(matches!(result, Err(VrtError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn take_screenshot_rejects_non_http_scheme() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = CaptureService::new(CaptureOptions::default());
        let store = ArtifactStore::new(dir.path());

        let result = take_screenshot(
            &service,
            &store,
            &CaptureRequest::new("file:///etc/passwd"),
            None,
        )
        .await;
        assert!(matches!(result, Err(VrtError::Config(_))));
    }

    #[test]
    fn generate_diff_for_identical_images_reports_zero_ratio() {
        let dir = tempfile::tempdir().expect("tempdir");
        let before = dir.path().join("before.png");
        let after = dir.path().join("after.png");
        let diff = dir.path().join("out/diff.png");
        write_png(&before, 20, 10, [120, 130, 140, 255]);
        write_png(&after, 20, 10, [120, 130, 140, 255]);

        let report =
            generate_diff(&before, &after, &diff, &DiffOptions::default()).expect("diff");
        assert_eq!(report.diff_pixels, 0);
        assert_eq!(report.total_pixels, 200);
        assert_eq!(report.diff_ratio, 0.0);
        assert_eq!(report.width, 20);
        assert_eq!(report.height, 10);
        assert!(diff.is_file(), "diff image must be written even when equal");
    }

    #[test]
    fn generate_diff_composites_mismatched_sizes() {
        // 20x10 white vs 10x20 white: the shared 10x10 corner matches, the
        // rest of each canvas is white padding on one side and white content
        // on the other, so nothing differs at all.
        let dir = tempfile::tempdir().expect("tempdir");
        let before = dir.path().join("before.png");
        let after = dir.path().join("after.png");
        let diff = dir.path().join("diff.png");
        write_png(&before, 20, 10, [255, 255, 255, 255]);
        write_png(&after, 10, 20, [255, 255, 255, 255]);

        let report =
            generate_diff(&before, &after, &diff, &DiffOptions::default()).expect("diff");
        assert_eq!(report.width, 20);
        assert_eq!(report.height, 20);
        assert_eq!(report.total_pixels, 400);
        assert_eq!(report.diff_pixels, 0);
    }

    #[test]
    fn generate_diff_counts_changed_regions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let before = dir.path().join("before.png");
        let after = dir.path().join("after.png");
        let diff = dir.path().join("diff.png");

        write_png(&before, 10, 10, [255, 255, 255, 255]);
        let mut img = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]));
        for y in 0..5 {
            for x in 0..10 {
                img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        img.save(&after).expect("write fixture png");

        let report =
            generate_diff(&before, &after, &diff, &DiffOptions::default()).expect("diff");
        assert_eq!(report.diff_pixels, 50);
        assert!((report.diff_ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn generate_diff_rejects_unreadable_input() {
        let dir = tempfile::tempdir().expect("tempdir");
        let before = dir.path().join("missing.png");
        let after = dir.path().join("after.png");
        write_png(&after, 4, 4, [0, 0, 0, 255]);

        let result = generate_diff(
            &before,
            &after,
            &dir.path().join("diff.png"),
            &DiffOptions::default(),
        );
        assert!(matches!(result, Err(VrtError::Decode(_))));
    }
}
