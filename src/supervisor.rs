//! Process health orchestration for the desktop-hosting mode.
//!
//! The supervisor owns the capture/diff service as a child process bound to a
//! fixed port. State lives in the supervisor instance and only its methods
//! transition it; a host gates its UI on [`ServiceSupervisor::wait_until_ready`]
//! returning `Healthy` instead of sleeping a fixed delay after spawn. An
//! unhealthy service is a degraded-mode signal for the host, never a reason to
//! terminate it.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{Result, VrtError};

pub const DEFAULT_SERVICE_PORT: u16 = 5002;
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifecycle of the supervised service process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceState {
    NotStarted,
    Starting,
    Healthy,
    Unhealthy,
    Exited,
}

#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    /// Service executable to spawn.
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Explicit working directory for the child.
    pub working_dir: Option<PathBuf>,
    pub port: u16,
    /// Extra environment entries on top of `PORT` and the mode flag.
    pub env: Vec<(String, String)>,
    pub probe_timeout: Duration,
    /// Delay before the single scheduled re-probe.
    pub retry_delay: Duration,
    /// Overall bound on the readiness gate.
    pub startup_timeout: Duration,
}

impl SupervisorOptions {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            port: DEFAULT_SERVICE_PORT,
            env: Vec::new(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
        }
    }
}

pub struct ServiceSupervisor {
    options: SupervisorOptions,
    client: reqwest::Client,
    state: ServiceState,
    child: Option<Child>,
    shutdown: CancellationToken,
}

impl ServiceSupervisor {
    pub fn new(options: SupervisorOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(options.probe_timeout)
            .build()?;
        Ok(Self {
            options,
            client,
            state: ServiceState::NotStarted,
            child: None,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn options(&self) -> &SupervisorOptions {
        &self.options
    }

    pub fn child_pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|child| child.id())
    }

    pub fn health_url(&self) -> String {
        format!("http://127.0.0.1:{}/health", self.options.port)
    }

    /// Spawns the service process with an explicit working directory and
    /// environment. Spawn failure leaves the supervisor `Unhealthy`; the host
    /// is expected to continue in degraded mode.
    pub fn start(&mut self) -> Result<()> {
        if self.child.is_some() {
            return Err(VrtError::Config(
                "service process is already running".to_string(),
            ));
        }

        let mut cmd = Command::new(&self.options.program);
        cmd.args(&self.options.args)
            .env("PORT", self.options.port.to_string())
            .env("VRT_SERVICE_MODE", "supervised")
            .kill_on_drop(true);
        if let Some(dir) = &self.options.working_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.options.env {
            cmd.env(key, value);
        }

        match cmd.spawn() {
            Ok(child) => {
                info!(
                    program = %self.options.program.display(),
                    port = self.options.port,
                    pid = child.id(),
                    "service process spawned"
                );
                self.child = Some(child);
                self.state = ServiceState::Starting;
                Ok(())
            }
            Err(err) => {
                warn!(
                    program = %self.options.program.display(),
                    error = %err,
                    "service process failed to spawn; continuing degraded"
                );
                self.state = ServiceState::Unhealthy;
                Err(VrtError::Io(err))
            }
        }
    }

    /// Single bounded-timeout liveness probe against the health endpoint.
    pub async fn probe(&self) -> bool {
        match self.client.get(self.health_url()).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Readiness gate: probe, and on failure schedule exactly one re-probe
    /// after the retry delay. The delay races the shutdown token so a
    /// shutdown before the retry fires cancels it instead of probing a dead
    /// target. The whole sequence is bounded by the startup timeout;
    /// `Unhealthy` is terminal for this launch attempt.
    pub async fn wait_until_ready(&mut self) -> ServiceState {
        let deadline = tokio::time::timeout(self.options.startup_timeout, async {
            let shutdown = self.shutdown.clone();

            for attempt in 0..2u32 {
                if self.child_exited() {
                    warn!("service process exited before becoming healthy");
                    return ServiceState::Exited;
                }

                if attempt > 0 {
                    info!(
                        delay_secs = self.options.retry_delay.as_secs(),
                        "health probe failed; scheduling one re-probe"
                    );
                    tokio::select! {
                        _ = shutdown.cancelled() => return self.state,
                        _ = tokio::time::sleep(self.options.retry_delay) => {}
                    }
                }

                if self.probe().await {
                    info!(url = %self.health_url(), "service is healthy");
                    return ServiceState::Healthy;
                }
            }

            warn!("service failed both health probes; degraded mode");
            ServiceState::Unhealthy
        })
        .await;

        self.state = match deadline {
            Ok(state) => state,
            Err(_) => {
                warn!(
                    timeout_secs = self.options.startup_timeout.as_secs(),
                    "startup gate timed out before the service became healthy"
                );
                ServiceState::Unhealthy
            }
        };
        self.state
    }

    fn child_exited(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(Some(_))),
            None => true,
        }
    }

    /// Unconditionally terminates the child and cancels any pending re-probe.
    /// Safe to call repeatedly and on a supervisor that never started.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.shutdown.cancel();
        if let Some(mut child) = self.child.take() {
            info!(pid = child.id(), "terminating service process");
            // An already-exited child makes kill a no-op; reap either way.
            let _ = child.kill().await;
            let _ = child.wait().await;
        }
        self.state = ServiceState::Exited;
        Ok(())
    }
}
