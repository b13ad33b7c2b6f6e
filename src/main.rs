mod cli;
mod commands;
mod formatting;
mod settings;

use std::process::ExitCode;

use cli::Commands;
use commands::{run_capture, run_clean, run_diff, run_supervise};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    run().await
}

async fn run() -> ExitCode {
    let raw_args: Vec<String> = std::env::args().collect();
    let args = cli::parse();

    init_tracing(args.verbose);

    match args.command {
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
            run_capture(
                &raw_args,
                args.config,
                args.verbose,
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
            )
            .await
        }
        Commands::Diff {
            before,
            after,
            threshold,
            include_aa,
            out,
            max_ratio,
            root,
            format,
            output,
        } => {
            run_diff(
                &raw_args,
                args.config,
                args.verbose,
                before,
                after,
                threshold,
                include_aa,
                out,
                max_ratio,
                root,
                format,
                output,
            )
            .await
        }
        Commands::Supervise {
            service,
            service_args,
            cwd,
            port,
            retry_delay,
            startup_timeout,
            provision,
            watch,
            format,
            output,
        } => {
            run_supervise(
                &raw_args,
                args.config,
                args.verbose,
                service,
                service_args,
                cwd,
                port,
                retry_delay,
                startup_timeout,
                provision,
                watch,
                format,
                output,
            )
            .await
        }
        Commands::Clean {
            root,
            format,
            output,
        } => run_clean(args.verbose, root, format, output).await,
    }
}

/// Structured logging to stderr; stdout is reserved for command output.
/// `RUST_LOG` overrides the verbosity chosen by `--verbose`.
fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "vrt=debug,vrt_lib=debug"
    } else {
        "vrt=warn,vrt_lib=warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
