use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use vrt_lib::Viewport;

#[derive(Parser)]
#[command(name = "vrt")]
#[command(
    version,
    about = "Visual Regression Testing - capture and compare page screenshots",
    long_about = "Visual Regression Testing (VRT)\n\nModes:\n- capture: screenshot a URL with a headless browser.\n- diff: compare two screenshots into a highlighted diff image and change ratio.\n- supervise: run the capture/diff service as a managed child process.\n- clean: delete generated screenshot/diff artifacts.\n\nUse --help on any subcommand for details."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Optional config file (TOML) to set defaults for viewport/threshold/timeouts/service; CLI flags override config"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Capture a full-page screenshot of a URL
    Capture {
        #[arg(long, help = "Page URL to capture (http or https)")]
        url: String,

        #[arg(
            long,
            default_value = "1280x800",
            help = "Viewport dimensions (WIDTHxHEIGHT)"
        )]
        viewport: Viewport,

        #[arg(
            long,
            default_value = "0",
            help = "Settle delay (seconds) after the page reaches network idle, for late-rendering content"
        )]
        delay: u64,

        #[arg(
            long,
            default_value = "60",
            help = "Navigation timeout (seconds) for page load"
        )]
        nav_timeout: u64,

        #[arg(
            long,
            value_name = "PATH",
            help = "Screenshot destination; defaults to a fresh file under <root>/screenshots"
        )]
        out: Option<PathBuf>,

        #[arg(
            long,
            default_value = ".vrt",
            value_name = "DIR",
            help = "Artifact store root; screenshots land under <DIR>/screenshots"
        )]
        root: PathBuf,

        #[arg(
            long,
            help = "Skip on-demand browser download; fail instead when chromium is missing"
        )]
        no_provision: bool,

        #[arg(
            long,
            help = "Also copy the screenshot into the store's uploads directory"
        )]
        publish: bool,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,
    },

    /// Compare two screenshots and produce a diff image
    Diff {
        #[arg(long, help = "Baseline screenshot path")]
        before: PathBuf,

        #[arg(long, help = "Candidate screenshot path")]
        after: PathBuf,

        #[arg(
            long,
            default_value = "0.1",
            help = "Per-pixel matching tolerance (0 exact .. 1 lenient)"
        )]
        threshold: f32,

        #[arg(long, help = "Count anti-aliased pixels as differences")]
        include_aa: bool,

        #[arg(
            long,
            value_name = "PATH",
            help = "Diff image destination; defaults to a fresh file under <root>/diffs"
        )]
        out: Option<PathBuf>,

        #[arg(
            long,
            value_name = "RATIO",
            help = "Fail (exit 1) when the changed-pixel ratio exceeds this bound"
        )]
        max_ratio: Option<f64>,

        #[arg(
            long,
            default_value = ".vrt",
            value_name = "DIR",
            help = "Artifact store root"
        )]
        root: PathBuf,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,
    },

    /// Run the capture/diff service as a supervised child process
    Supervise {
        #[arg(long, help = "Service executable to spawn")]
        service: PathBuf,

        #[arg(
            long = "service-arg",
            value_name = "ARG",
            allow_hyphen_values = true,
            help = "Argument passed to the service executable (repeatable)"
        )]
        service_args: Vec<String>,

        #[arg(long, value_name = "DIR", help = "Working directory for the service")]
        cwd: Option<PathBuf>,

        #[arg(long, default_value = "5002", help = "Port the service binds its health endpoint on")]
        port: u16,

        #[arg(
            long,
            default_value = "5",
            help = "Delay (seconds) before the single health re-probe"
        )]
        retry_delay: u64,

        #[arg(
            long,
            default_value = "30",
            help = "Overall startup bound (seconds) before declaring the service degraded"
        )]
        startup_timeout: u64,

        #[arg(
            long,
            help = "Run the browser provisioning check before starting the service"
        )]
        provision: bool,

        #[arg(
            long,
            help = "Keep supervising until interrupted (Ctrl-C) instead of exiting after the readiness check"
        )]
        watch: bool,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,
    },

    /// Delete generated screenshot and diff artifacts
    Clean {
        #[arg(
            long,
            default_value = ".vrt",
            value_name = "DIR",
            help = "Artifact store root"
        )]
        root: PathBuf,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Pretty,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands, OutputFormat};
    use clap::Parser;

    #[test]
    fn capture_command_uses_defaults() {
        let cli = Cli::parse_from(["vrt", "capture", "--url", "https://example.com"]);

        assert!(!cli.verbose);
        assert!(cli.config.is_none());

        match cli.command {
            Commands::Capture {
                url,
                viewport,
                delay,
                nav_timeout,
                out,
                root,
                no_provision,
                publish,
                format,
                output,
            } => {
                assert_eq!(url, "https://example.com");
                assert_eq!(viewport.width, 1280);
                assert_eq!(viewport.height, 800);
                assert_eq!(delay, 0);
                assert_eq!(nav_timeout, 60);
                assert!(out.is_none());
                assert_eq!(root, std::path::PathBuf::from(".vrt"));
                assert!(!no_provision);
                assert!(!publish);
                assert!(matches!(format, OutputFormat::Json));
                assert!(output.is_none());
            }
            _ => panic!("expected capture command"),
        }
    }

    #[test]
    fn diff_command_respects_overrides() {
        let cli = Cli::parse_from([
            "vrt",
            "diff",
            "--before",
            "a.png",
            "--after",
            "b.png",
            "--threshold",
            "0.25",
            "--include-aa",
            "--max-ratio",
            "0.02",
            "--out",
            "out/diff.png",
            "--format",
            "pretty",
            "--config",
            "vrt.toml",
        ]);

        assert!(cli.config.is_some());

        match cli.command {
            Commands::Diff {
                before,
                after,
                threshold,
                include_aa,
                out,
                max_ratio,
                format,
                ..
            } => {
                assert_eq!(before, std::path::PathBuf::from("a.png"));
                assert_eq!(after, std::path::PathBuf::from("b.png"));
                assert!((threshold - 0.25).abs() < f32::EPSILON);
                assert!(include_aa);
                assert_eq!(out, Some(std::path::PathBuf::from("out/diff.png")));
                assert_eq!(max_ratio, Some(0.02));
                assert!(matches!(format, OutputFormat::Pretty));
            }
            _ => panic!("expected diff command"),
        }
    }

    #[test]
    fn supervise_command_sets_verbose_and_watch() {
        let cli = Cli::parse_from([
            "vrt",
            "--verbose",
            "supervise",
            "--service",
            "./service",
            "--service-arg",
            "serve",
            "--service-arg",
            "--quiet",
            "--port",
            "6001",
            "--provision",
            "--watch",
        ]);

        assert!(cli.verbose);

        match cli.command {
            Commands::Supervise {
                service,
                service_args,
                cwd,
                port,
                retry_delay,
                startup_timeout,
                provision,
                watch,
                ..
            } => {
                assert_eq!(service, std::path::PathBuf::from("./service"));
                assert_eq!(service_args, vec!["serve".to_string(), "--quiet".to_string()]);
                assert!(cwd.is_none());
                assert_eq!(port, 6001);
                assert_eq!(retry_delay, 5);
                assert_eq!(startup_timeout, 30);
                assert!(provision);
                assert!(watch);
            }
            _ => panic!("expected supervise command"),
        }
    }
}
