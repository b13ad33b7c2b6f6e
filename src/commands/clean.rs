use std::path::PathBuf;
use std::process::ExitCode;

use vrt_lib::{ArtifactStore, VrtOutput};

use crate::cli::OutputFormat;
use crate::formatting::{render_error, write_output};

/// Run the clean command.
pub async fn run_clean(
    verbose: bool,
    root: PathBuf,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    let store = ArtifactStore::new(root);
    if verbose {
        eprintln!("Cleaning artifacts under {}", store.root().display());
    }

    let summary = match store.cleanup() {
        Ok(summary) => summary,
        Err(err) => return render_error(err, format, output),
    };

    let body = VrtOutput::clean(summary);
    if let Err(err) = write_output(&body, format, output.clone()) {
        return render_error(vrt_lib::VrtError::Config(err.to_string()), format, output);
    }
    ExitCode::SUCCESS
}
