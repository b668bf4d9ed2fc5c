//! blaslink CLI entry point.

use std::process::ExitCode;

use blaslink::cli::{Cli, Commands};
use blaslink::flags::FlagRecorder;
use blaslink::linker::CcSymbolChecker;
use blaslink::search::run_detection;
use blaslink::shell::ShellExecutor;
use blaslink::toolchain::Toolchain;
use clap::{CommandFactory, Parser};
use console::style;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is INFO
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("blaslink=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("blaslink=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!("blaslink starting with args: {:?}", cli);

    if cli.no_color {
        std::env::set_var("NO_COLOR", "1");
    }

    if let Some(Commands::Completions(args)) = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(args.shell, &mut cmd, "blaslink", &mut std::io::stdout());
        return ExitCode::SUCCESS;
    }

    let options = cli.detect_options();
    let toolchain = Toolchain::from_env(cli.fc.clone());
    let executor = ShellExecutor::new();
    let checker = CcSymbolChecker::new(&toolchain, &executor);
    let mut flags = FlagRecorder::new();

    match run_detection(&options, &toolchain, &checker, &executor, &mut flags) {
        Ok(report) => {
            if cli.json {
                let payload = serde_json::json!({
                    "label": report.label,
                    "link_args": report.link_args,
                    "translated": report.translated,
                    "deferred": report.deferred,
                    "missing_routines": report.missing_routines,
                    "summary": report.summary,
                    "flags": flags.flags(),
                });
                println!("{payload:#}");
                return ExitCode::SUCCESS;
            }

            println!("{}", style(&report.summary).green());
            if !cli.quiet {
                println!("Link with: {}", report.link_args.join(" "));
                if report.deferred {
                    println!(
                        "{}",
                        style("Note: archives compile in the outer build phase").yellow()
                    );
                }
                if !report.missing_routines.is_empty() {
                    println!(
                        "{} {}",
                        style("Missing optional LAPACK routines:").yellow(),
                        report.missing_routines.join(", ")
                    );
                }
                if cli.verbose {
                    for flag in flags.flags() {
                        println!("define {} {}", flag.name, flag.value);
                    }
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            ExitCode::from(1)
        }
    }
}
