//! Infragram CLI entry point.

use std::{io, process, str::FromStr};

use clap::Parser;
use log::{LevelFilter, debug, error, info, warn};

use infragram::InfragramError;
use infragram_cli::{Args, ExitStatus, error_adapter::render_reports, write_summary};

fn main() {
    miette::set_panic_hook();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            if let Err(print_err) = err.print() {
                eprintln!("Failed to print usage: {print_err}");
                eprintln!("{err}");
            }
            process::exit(ExitStatus::from(&err).code());
        }
    };

    let log_level = LevelFilter::from_str(&args.log_level).unwrap_or_else(|_| {
        eprintln!(
            "Invalid log level: {}. Using 'warn' instead.",
            args.log_level
        );
        LevelFilter::Warn
    });

    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();

    info!(log_level:?; "Starting Infragram");
    debug!(args:?; "Parsed arguments");

    let result = infragram_cli::run(&args);
    let status = ExitStatus::from(&result);

    match &result {
        Ok(report) => {
            for file in report.diagnostics() {
                for rendered in render_reports(&InfragramError::Parse(file.clone())) {
                    warn!("{rendered}");
                }
            }
            for failure in report.failures() {
                for rendered in render_reports(failure) {
                    error!("{rendered}");
                }
            }
            if let Err(err) = write_summary(&mut io::stdout().lock(), report) {
                error!(err:err; "Failed to print summary");
            }
        }
        Err(err) => {
            for rendered in render_reports(err) {
                error!("{rendered}");
            }
        }
    }

    if status == ExitStatus::Success {
        info!("Completed successfully");
    }
    process::exit(status.code());
}
