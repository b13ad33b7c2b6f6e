use std::path::Path;
use std::time::Duration;

use vrt_lib::{Config, Viewport, VrtError};

/// Checks if a flag was present in the command-line arguments.
pub fn flag_present(args: &[String], flag: &str) -> bool {
    args.iter()
        .any(|arg| arg == flag || arg.starts_with(&format!("{flag}=")))
}

/// Resolved capture settings after merging CLI args and config file.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedCaptureSettings {
    pub viewport: Viewport,
    pub navigation_timeout: Duration,
    pub provisioning_timeout: Duration,
}

/// Merge capture CLI arguments with the config file, preferring CLI values
/// when their flags were explicitly given.
pub fn resolve_capture_settings(
    raw_args: &[String],
    cli_viewport: Viewport,
    cli_nav_timeout: u64,
    config: &Config,
) -> ResolvedCaptureSettings {
    ResolvedCaptureSettings {
        viewport: if flag_present(raw_args, "--viewport") {
            cli_viewport
        } else {
            config.viewport
        },
        navigation_timeout: if flag_present(raw_args, "--nav-timeout") {
            Duration::from_secs(cli_nav_timeout)
        } else {
            config.timeouts.navigation
        },
        provisioning_timeout: config.timeouts.provisioning,
    }
}

/// Merge the diff threshold: explicit flag wins, otherwise the config value.
pub fn resolve_threshold(raw_args: &[String], cli_threshold: f32, config: &Config) -> f32 {
    if flag_present(raw_args, "--threshold") {
        cli_threshold
    } else {
        config.threshold
    }
}

/// Resolved supervisor settings after merging CLI args and config file.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedSuperviseSettings {
    pub port: u16,
    pub probe_timeout: Duration,
    pub retry_delay: Duration,
    pub startup_timeout: Duration,
}

pub fn resolve_supervise_settings(
    raw_args: &[String],
    cli_port: u16,
    cli_retry_delay: u64,
    cli_startup_timeout: u64,
    config: &Config,
) -> ResolvedSuperviseSettings {
    ResolvedSuperviseSettings {
        port: if flag_present(raw_args, "--port") {
            cli_port
        } else {
            config.service.port
        },
        probe_timeout: config.service.probe_timeout,
        retry_delay: if flag_present(raw_args, "--retry-delay") {
            Duration::from_secs(cli_retry_delay)
        } else {
            config.service.retry_delay
        },
        startup_timeout: if flag_present(raw_args, "--startup-timeout") {
            Duration::from_secs(cli_startup_timeout)
        } else {
            config.service.startup_timeout
        },
    }
}

/// Load config from a TOML file or return defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, VrtError> {
    Config::load(path)
}
