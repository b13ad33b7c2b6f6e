use std::fmt::Write as FmtWrite;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use vrt_lib::{VrtError, VrtOutput};

use crate::cli::OutputFormat;

/// Write output in the requested format.
pub fn write_output(
    body: &VrtOutput,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => write_json_output(body, output.as_deref())?,
        OutputFormat::Pretty => write_pretty_output(body, output.as_deref())?,
    };
    Ok(())
}

/// Render an error and return the appropriate exit code.
pub fn render_error(err: VrtError, format: OutputFormat, output: Option<PathBuf>) -> ExitCode {
    let payload = VrtOutput::error(err.to_payload());

    match format {
        OutputFormat::Json => {
            let content =
                serde_json::to_string(&payload).unwrap_or_else(|_| "{\"kind\":\"error\"}".into());
            if let Some(path) = output {
                if let Err(write_err) = std::fs::write(&path, &content) {
                    eprintln!("Failed to write error output: {}", write_err);
                    println!("{content}");
                }
            } else {
                println!("{content}");
            }
        }
        OutputFormat::Pretty => {
            if let Err(write_err) = write_pretty_output(&payload, output.as_deref()) {
                eprintln!("Failed to write error output: {}", write_err);
            }
        }
    };

    // Exit code 2 is reserved for fatal errors; ratio failures use 1.
    ExitCode::from(2)
}

/// Exit code for a diff run: 0 within bound, 1 over it.
pub fn exit_code_for_diff(passed: bool) -> ExitCode {
    if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

fn write_json_output(
    body: &VrtOutput,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = serde_json::to_string(body)?;
    if let Some(path) = output {
        std::fs::write(path, content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

fn write_pretty_output(body: &VrtOutput, output: Option<&Path>) -> io::Result<()> {
    let stdout_is_tty = std::io::stdout().is_terminal();
    let use_human = output.is_none() && stdout_is_tty;

    if use_human {
        let content = format_pretty(body, true);
        println!("{content}");
        return Ok(());
    }

    // Non-tty or file output: keep JSON shape for pipelines/files.
    let content =
        serde_json::to_string_pretty(body).unwrap_or_else(|_| "{\"kind\":\"error\"}".to_string());
    if let Some(path) = output {
        std::fs::write(path, &content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Format output for human consumption in a terminal.
pub fn format_pretty(body: &VrtOutput, colorize: bool) -> String {
    match body {
        VrtOutput::Capture {
            url,
            screenshot,
            width,
            height,
            elapsed_ms,
            published,
            ..
        } => {
            let mut buf = String::new();
            writeln!(buf, "Captured {url}").ok();
            writeln!(buf, "Screenshot: {} ({}x{})", screenshot.display(), width, height).ok();
            if let Some(published) = published {
                writeln!(buf, "Published: {}", published.display()).ok();
            }
            writeln!(buf, "Elapsed: {elapsed_ms}ms").ok();
            buf
        }
        VrtOutput::Diff { report, passed, .. } => {
            let mut buf = String::new();
            let pct = report.diff_ratio * 100.0;
            match passed {
                Some(true) => {
                    writeln!(buf, "{} Visual diff", color("PASS", "32", colorize)).ok();
                }
                Some(false) => {
                    writeln!(buf, "{} Visual diff", color("FAIL", "31", colorize)).ok();
                }
                None => {
                    writeln!(buf, "Visual diff").ok();
                }
            }
            writeln!(
                buf,
                "Changed: {} of {} pixels ({pct:.2}%)",
                report.diff_pixels, report.total_pixels
            )
            .ok();
            writeln!(buf, "Canvas: {}x{}", report.width, report.height).ok();
            writeln!(buf, "Diff image: {}", report.diff_image.display()).ok();
            buf
        }
        VrtOutput::Supervise {
            state, port, pid, ..
        } => {
            let state_text = match serde_json::to_value(state) {
                Ok(serde_json::Value::String(s)) => s,
                _ => format!("{state:?}"),
            };
            let mut buf = String::new();
            writeln!(buf, "Service state: {state_text} (port {port})").ok();
            if let Some(pid) = pid {
                writeln!(buf, "PID: {pid}").ok();
            }
            buf
        }
        VrtOutput::Clean {
            summary,
            total_removed,
            ..
        } => {
            let mut buf = String::new();
            writeln!(buf, "Removed {total_removed} artifact(s)").ok();
            writeln!(
                buf,
                "screenshots: {}, diffs: {}, uploads: {}",
                summary.screenshots_removed, summary.diffs_removed, summary.uploads_removed
            )
            .ok();
            buf
        }
        VrtOutput::Error { error, .. } => {
            let mut buf = String::new();
            writeln!(
                buf,
                "{} {}",
                color("[ERROR]", "31", colorize),
                error.message
            )
            .ok();
            if let Some(hint) = &error.remediation {
                writeln!(buf, "Hint: {hint}").ok();
            }
            buf
        }
    }
}

fn color(text: &str, code: &str, colorize: bool) -> String {
    if colorize {
        format!("\u{1b}[{code}m{text}\u{1b}[0m")
    } else {
        text.to_string()
    }
}
