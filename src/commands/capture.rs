use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use vrt_lib::{ArtifactStore, CaptureOptions, CaptureRequest, CaptureService, Viewport, VrtOutput};

use crate::cli::OutputFormat;
use crate::formatting::{render_error, write_output};
use crate::settings::{load_config, resolve_capture_settings};

/// Run the capture command.
#[allow(clippy::too_many_arguments)]
pub async fn run_capture(
    raw_args: &[String],
    config_path: Option<PathBuf>,
    verbose: bool,
    url: String,
    viewport: Viewport,
    delay: u64,
    nav_timeout: u64,
    out: Option<PathBuf>,
    root: PathBuf,
    no_provision: bool,
    publish: bool,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output.clone()),
    };
    let settings = resolve_capture_settings(raw_args, viewport, nav_timeout, &config);

    if verbose {
        eprintln!(
            "Capturing {} at {}x{} (nav timeout {}s, settle {}s)",
            url,
            settings.viewport.width,
            settings.viewport.height,
            settings.navigation_timeout.as_secs(),
            delay
        );
    }

    let service = CaptureService::new(CaptureOptions {
        viewport: settings.viewport,
        navigation_timeout: settings.navigation_timeout,
        provisioning_timeout: settings.provisioning_timeout,
        auto_provision: !no_provision,
        ..CaptureOptions::default()
    });
    let store = ArtifactStore::new(root);
    let request = CaptureRequest::new(url.clone()).with_settle_delay(Duration::from_secs(delay));

    let outcome =
        match vrt_lib::take_screenshot(&service, &store, &request, out.as_deref()).await {
            Ok(outcome) => outcome,
            Err(err) => return render_error(err, format, output),
        };

    let published = if publish {
        match store.ensure().and_then(|_| store.publish(&outcome.path)) {
            Ok(path) => Some(path),
            Err(err) => return render_error(err, format, output),
        }
    } else {
        None
    };

    let body = VrtOutput::capture(url, &outcome, published);
    if let Err(err) = write_output(&body, format, output.clone()) {
        return render_error(
            vrt_lib::VrtError::Config(err.to_string()),
            format,
            output,
        );
    }
    ExitCode::SUCCESS
}
