use std::path::PathBuf;
use std::process::ExitCode;

use vrt_lib::{generate_diff, ArtifactStore, DiffOptions, VrtOutput};

use crate::cli::OutputFormat;
use crate::formatting::{exit_code_for_diff, render_error, write_output};
use crate::settings::{load_config, resolve_threshold};

/// Run the diff command.
#[allow(clippy::too_many_arguments)]
pub async fn run_diff(
    raw_args: &[String],
    config_path: Option<PathBuf>,
    verbose: bool,
    before: PathBuf,
    after: PathBuf,
    threshold: f32,
    include_aa: bool,
    out: Option<PathBuf>,
    max_ratio: Option<f64>,
    root: PathBuf,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output.clone()),
    };
    let threshold = resolve_threshold(raw_args, threshold, &config);

    let store = ArtifactStore::new(root);
    let diff_path = match out {
        Some(path) => path,
        None => {
            if let Err(err) = store.ensure() {
                return render_error(err, format, output);
            }
            store.allocate_diff()
        }
    };

    if verbose {
        eprintln!(
            "Diffing {} vs {} (threshold {:.2}) -> {}",
            before.display(),
            after.display(),
            threshold,
            diff_path.display()
        );
    }

    let options = DiffOptions {
        threshold,
        include_aa,
        ..DiffOptions::default()
    };

    let report = match generate_diff(&before, &after, &diff_path, &options) {
        Ok(report) => report,
        Err(err) => return render_error(err, format, output),
    };

    let passed = max_ratio.map(|bound| report.diff_ratio <= bound);
    let code = exit_code_for_diff(passed.unwrap_or(true));

    let body = VrtOutput::diff(report, passed);
    if let Err(err) = write_output(&body, format, output.clone()) {
        return render_error(vrt_lib::VrtError::Config(err.to_string()), format, output);
    }
    code
}
