//! Screenshot capture service.
//!
//! Drives a headless Chromium through a small Playwright helper script run via
//! `node -e`, one isolated browser instance per capture call. The helper
//! navigates, waits for network idle, applies the optional settle delay, and
//! writes a full-page PNG before exiting; its `finally` block closes the
//! browser on every exit path, and the Rust side kills the helper (and with it
//! the browser) if the overall deadline passes.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::{Result, VrtError};
use crate::Viewport;

const CAPTURE_SCRIPT: &str = r#"
// With `node -e` there is no script-path slot: the first argument passed
// after the script lands at process.argv[1].
const [, url, width, height, navTimeout, settleMs, screenshotPath] = process.argv;

async function run() {
  let browser;
  try {
    const { chromium } = require('playwright');
    browser = await chromium.launch();
    const context = await browser.newContext({
      viewport: {
        width: parseInt(width, 10),
        height: parseInt(height, 10)
      },
      deviceScaleFactor: 1
    });
    const page = await context.newPage();

    await page.goto(url, { waitUntil: 'networkidle', timeout: parseInt(navTimeout, 10) });

    const settle = parseInt(settleMs, 10);
    if (settle > 0) {
      await page.waitForTimeout(settle);
    }

    await page.screenshot({ path: screenshotPath, fullPage: true });

    console.log(JSON.stringify({ status: 'ok' }));
  } catch (err) {
    const message = err && err.message ? err.message : String(err);
    console.error(JSON.stringify({ status: 'error', message }));
    process.exitCode = 1;
  } finally {
    if (browser) {
      await browser.close();
    }
  }
}

run();
"#;

const PLAYWRIGHT_CHECK_SCRIPT: &str = "require('playwright'); process.stdout.write('ok');";
const CHROMIUM_CHECK_SCRIPT: &str = "const { chromium } = require('playwright'); require('fs').accessSync(chromium.executablePath()); process.stdout.write('ok');";

pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_PROVISIONING_TIMEOUT: Duration = Duration::from_secs(300);
const DRIVER_CHECK_TIMEOUT: Duration = Duration::from_secs(5);
/// Margin on top of navigation + settle before the helper is force-killed.
const CAPTURE_GRACE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub node_command: String,
    pub npx_command: String,
    pub viewport: Viewport,
    pub navigation_timeout: Duration,
    pub provisioning_timeout: Duration,
    /// Download the Chromium build on demand when it is missing.
    pub auto_provision: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            node_command: "node".to_string(),
            npx_command: "npx".to_string(),
            viewport: Viewport::default(),
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            provisioning_timeout: DEFAULT_PROVISIONING_TIMEOUT,
            auto_provision: true,
        }
    }
}

/// One screenshot request: target URL plus the post-navigation settle delay
/// that lets client-side rendering and animations finish.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub url: String,
    pub settle_delay: Duration,
}

impl CaptureRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            settle_delay: Duration::ZERO,
        }
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }
}

#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub elapsed: Duration,
}

/// Renderer driver availability, cached across capture calls.
#[derive(Debug, Clone)]
enum DriverState {
    Unchecked,
    Ready,
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct CaptureService {
    options: CaptureOptions,
    driver: Arc<Mutex<DriverState>>,
}

impl CaptureService {
    pub fn new(options: CaptureOptions) -> Self {
        Self {
            options,
            driver: Arc::new(Mutex::new(DriverState::Unchecked)),
        }
    }

    pub fn options(&self) -> &CaptureOptions {
        &self.options
    }

    /// Driver check with on-demand provisioning.
    ///
    /// Verifies node, the Playwright npm package, and a downloaded Chromium
    /// build; when the browser build is missing and `auto_provision` is set,
    /// runs `npx playwright install chromium` once, bounded by the
    /// provisioning timeout. The mutex is held across the whole check so a
    /// concurrent call blocks and then observes the cached outcome instead of
    /// double-installing. An unavailable driver is sticky: every later
    /// request fails fast until the process restarts.
    pub async fn ensure_provisioned(&self) -> Result<()> {
        let mut driver = self.driver.lock().await;
        match &*driver {
            DriverState::Ready => Ok(()),
            DriverState::Unavailable(message) => Err(VrtError::provisioning(message.clone())),
            DriverState::Unchecked => match self.check_and_provision().await {
                Ok(()) => {
                    *driver = DriverState::Ready;
                    Ok(())
                }
                Err(err) => {
                    let message = match &err {
                        VrtError::Provisioning(msg) => msg.clone(),
                        other => other.to_string(),
                    };
                    *driver = DriverState::Unavailable(message.clone());
                    Err(VrtError::provisioning(message))
                }
            },
        }
    }

    async fn check_and_provision(&self) -> Result<()> {
        ensure_node_available(&self.options.node_command).await?;
        ensure_playwright_available(&self.options.node_command).await?;

        if self.chromium_available().await? {
            return Ok(());
        }

        if !self.options.auto_provision {
            return Err(VrtError::provisioning(
                "chromium build is missing and auto-provisioning is disabled",
            ));
        }

        info!("chromium build missing; downloading via playwright install");
        self.install_chromium().await?;

        if self.chromium_available().await? {
            Ok(())
        } else {
            Err(VrtError::provisioning(
                "chromium build is still missing after installation",
            ))
        }
    }

    async fn chromium_available(&self) -> Result<bool> {
        let mut cmd = Command::new(&self.options.node_command);
        cmd.arg("-e")
            .arg(CHROMIUM_CHECK_SCRIPT)
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let output = timeout(DRIVER_CHECK_TIMEOUT, cmd.output())
            .await
            .map_err(|_| {
                VrtError::provisioning(format!(
                    "Timed out checking chromium availability after {:?}",
                    DRIVER_CHECK_TIMEOUT
                ))
            })?
            .map_err(|err| map_spawn_error(err, &self.options.node_command))?;

        if output.status.success() {
            return Ok(true);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr
            .to_ascii_lowercase()
            .contains("cannot find module 'playwright'")
        {
            return Err(VrtError::provisioning(
                "Playwright npm package is missing; install with `npm install playwright`.",
            ));
        }
        Ok(false)
    }

    async fn install_chromium(&self) -> Result<()> {
        let mut cmd = Command::new(&self.options.npx_command);
        cmd.args(["playwright", "install", "chromium"])
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let output = timeout(self.options.provisioning_timeout, cmd.output())
            .await
            .map_err(|_| {
                VrtError::provisioning(format!(
                    "chromium download timed out after {:?}",
                    self.options.provisioning_timeout
                ))
            })?
            .map_err(|err| map_spawn_error(err, &self.options.npx_command))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VrtError::provisioning(format!(
                "`playwright install chromium` failed (exit {}): {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    /// Renders `request.url` to a full-page PNG at `output_path`.
    ///
    /// The screenshot file is fully written when this returns: the helper
    /// process exits only after its write completes, and the dimensions are
    /// decoded from the file afterwards as a final consistency check.
    pub async fn capture(
        &self,
        request: &CaptureRequest,
        output_path: &Path,
    ) -> Result<CaptureOutcome> {
        self.ensure_provisioned().await?;

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut cmd = Command::new(&self.options.node_command);
        cmd.arg("-e")
            .arg(CAPTURE_SCRIPT)
            .arg(&request.url)
            .arg(self.options.viewport.width.to_string())
            .arg(self.options.viewport.height.to_string())
            .arg(self.options.navigation_timeout.as_millis().to_string())
            .arg(request.settle_delay.as_millis().to_string())
            .arg(output_path.to_string_lossy().to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(url = %request.url, settle_ms = request.settle_delay.as_millis() as u64, "starting capture helper");

        let start = Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|err| map_spawn_error(err, &self.options.node_command))?;

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut out) = stdout_pipe {
                let _ = out.read_to_end(&mut buf).await;
            }
            buf
        });

        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut err) = stderr_pipe {
                let _ = err.read_to_end(&mut buf).await;
            }
            buf
        });

        let overall = overall_timeout(&self.options, request.settle_delay);
        let status = match timeout(overall, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(err)) => return Err(VrtError::Io(err)),
            Err(_) => {
                // Teardown guarantee: killing the helper also takes down the
                // chromium instance it launched.
                let _ = child.kill().await;
                let _ = child.wait().await;
                return Err(VrtError::capture(format!(
                    "capture helper timed out after {:?}; the browser was terminated",
                    overall
                )));
            }
        };

        let stdout = stdout_task.await.unwrap_or_else(|_| Vec::new());
        let stderr = stderr_task.await.unwrap_or_else(|_| Vec::new());

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(map_helper_error(status.to_string(), &stderr));
        }

        let stdout = String::from_utf8_lossy(&stdout);
        match serde_json::from_str::<ScriptResult>(&stdout) {
            Ok(payload) if payload.status == "ok" => {}
            Ok(payload) => {
                let detail = payload.message.unwrap_or_else(|| "no details".to_string());
                return Err(classify_helper_message(&detail));
            }
            Err(_) => {
                return Err(VrtError::capture(format!(
                    "Unexpected capture helper output: {}",
                    stdout.trim()
                )));
            }
        }

        let (width, height) = image::image_dimensions(output_path).map_err(|e| {
            VrtError::capture(format!(
                "screenshot at {} was not written correctly: {}",
                output_path.display(),
                e
            ))
        })?;

        Ok(CaptureOutcome {
            path: output_path.to_path_buf(),
            width,
            height,
            elapsed: start.elapsed(),
        })
    }
}

fn overall_timeout(options: &CaptureOptions, settle_delay: Duration) -> Duration {
    options.navigation_timeout + settle_delay + CAPTURE_GRACE
}

#[derive(Debug, serde::Deserialize)]
struct ScriptResult {
    status: String,
    message: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct ScriptError {
    #[allow(dead_code)]
    status: String,
    message: String,
}

fn map_spawn_error(err: io::Error, command: &str) -> VrtError {
    if err.kind() == io::ErrorKind::NotFound {
        VrtError::provisioning(format!(
            "Unable to spawn capture helper; '{}' was not found on PATH",
            command
        ))
    } else {
        VrtError::Io(err)
    }
}

fn map_helper_error(status_text: impl Into<String>, stderr: &str) -> VrtError {
    if let Ok(error) = serde_json::from_str::<ScriptError>(stderr) {
        return classify_helper_message(&error.message);
    }

    let lower = stderr.to_ascii_lowercase();
    if lower.contains("cannot find module 'playwright'") {
        return VrtError::provisioning(
            "Playwright npm package is missing; install with `npm install playwright`.",
        );
    }

    VrtError::capture(format!(
        "capture helper exited with status {}: {}",
        status_text.into(),
        stderr.trim()
    ))
}

/// Sorts a Playwright error message into the error taxonomy.
fn classify_helper_message(message: &str) -> VrtError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("cannot find module 'playwright'") {
        VrtError::provisioning(
            "Playwright npm package is missing; install with `npm install playwright`.",
        )
    } else if lower.contains("executable doesn't exist") || lower.contains("browsertype.launch") {
        VrtError::provisioning(message.to_string())
    } else if lower.contains("timeout")
        || lower.contains("net::err")
        || lower.contains("navigat")
        || lower.contains("dns")
    {
        VrtError::navigation(message.to_string())
    } else {
        VrtError::capture(message.to_string())
    }
}

async fn ensure_node_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let status = timeout(DRIVER_CHECK_TIMEOUT, cmd.status())
        .await
        .map_err(|_| {
            VrtError::provisioning(format!(
                "Timed out checking node availability after {:?}",
                DRIVER_CHECK_TIMEOUT
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !status.success() {
        return Err(VrtError::provisioning(format!(
            "Node command {:?} is not available (exit {})",
            node_command, status
        )));
    }

    Ok(())
}

async fn ensure_playwright_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("-e")
        .arg(PLAYWRIGHT_CHECK_SCRIPT)
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let output = timeout(DRIVER_CHECK_TIMEOUT, cmd.output())
        .await
        .map_err(|_| {
            VrtError::provisioning(format!(
                "Timed out checking Playwright availability after {:?}",
                DRIVER_CHECK_TIMEOUT
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(map_helper_error(format!("{:?}", output.status), &stderr));
    }

    Ok(())
}
