#![allow(clippy::print_stderr)]

use clap::Parser;
use kreg_cli::args::Cli;
use kreg_cli::{EXIT_FATAL, run};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_FATAL)
        },
    }
}
