mod commands;
mod config;
mod event;
mod issues;
mod logging;
mod model;
mod render;
mod sentry;
mod stacktrace;

use std::process::ExitCode;

fn main() -> ExitCode {
    match commands::Cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            for line in commands::error_report(&err) {
                eprintln!("{}", line);
            }
            ExitCode::FAILURE
        }
    }
}
