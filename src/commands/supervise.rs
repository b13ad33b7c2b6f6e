use std::path::PathBuf;
use std::process::ExitCode;

use vrt_lib::{
    CaptureOptions, CaptureService, ServiceState, ServiceSupervisor, SupervisorOptions, VrtOutput,
};

use crate::cli::OutputFormat;
use crate::formatting::{render_error, write_output};
use crate::settings::{load_config, resolve_supervise_settings};

/// Run the supervise command.
#[allow(clippy::too_many_arguments)]
pub async fn run_supervise(
    raw_args: &[String],
    config_path: Option<PathBuf>,
    verbose: bool,
    service: PathBuf,
    service_args: Vec<String>,
    cwd: Option<PathBuf>,
    port: u16,
    retry_delay: u64,
    startup_timeout: u64,
    provision: bool,
    watch: bool,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output.clone()),
    };
    let settings =
        resolve_supervise_settings(raw_args, port, retry_delay, startup_timeout, &config);

    // Optional explicit provisioning phase: surface a missing browser at
    // startup instead of on the first capture request.
    if provision {
        if verbose {
            eprintln!("Checking renderer provisioning before starting the service");
        }
        let capture = CaptureService::new(CaptureOptions {
            viewport: config.viewport,
            provisioning_timeout: config.timeouts.provisioning,
            ..CaptureOptions::default()
        });
        if let Err(err) = capture.ensure_provisioned().await {
            return render_error(err, format, output);
        }
    }

    let mut supervisor = match ServiceSupervisor::new(SupervisorOptions {
        args: service_args,
        working_dir: cwd,
        port: settings.port,
        probe_timeout: settings.probe_timeout,
        retry_delay: settings.retry_delay,
        startup_timeout: settings.startup_timeout,
        ..SupervisorOptions::new(service)
    }) {
        Ok(supervisor) => supervisor,
        Err(err) => return render_error(err, format, output),
    };

    // Spawn failure is degraded mode, not fatal: report the unhealthy state
    // and exit 1 so a host can fall back to a remote service.
    let state = match supervisor.start() {
        Ok(()) => supervisor.wait_until_ready().await,
        Err(_) => supervisor.state(),
    };

    if verbose {
        eprintln!(
            "Service readiness gate finished: {:?} (port {})",
            state, settings.port
        );
    }

    let body = VrtOutput::supervise(state, settings.port, supervisor.child_pid());
    if let Err(err) = write_output(&body, format, output.clone()) {
        let _ = supervisor.shutdown().await;
        return render_error(vrt_lib::VrtError::Config(err.to_string()), format, output);
    }

    if watch && state == ServiceState::Healthy {
        if verbose {
            eprintln!("Supervising; press Ctrl-C to stop");
        }
        let _ = tokio::signal::ctrl_c().await;
    }

    if let Err(err) = supervisor.shutdown().await {
        return render_error(err, format, output);
    }

    match state {
        ServiceState::Healthy => ExitCode::SUCCESS,
        _ => ExitCode::from(1),
    }
}
