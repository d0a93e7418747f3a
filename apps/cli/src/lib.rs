//! # kreg CLI
//!
//! Thin front end over the [`kreg`] facade. Exit codes: `0` success (no drift), `2` drift
//! remains, `1` fatal error.

#![allow(clippy::print_stderr, clippy::print_stdout)]

pub mod args;
pub mod handlers;

use crate::args::{Cli, Command};
use anyhow::{Context, Result};
use kreg::domain::config::KregConfig;
use kreg::kernel::config::load_kreg_config;
use kreg_logger::{LevelFilter, Logger, raise_level};
use std::process::ExitCode;

pub const EXIT_OK: u8 = 0;
pub const EXIT_FATAL: u8 = 1;
pub const EXIT_DRIFT: u8 = 2;

fn init_logging(cli: &Cli, config: &KregConfig) -> Result<Logger> {
    let mut builder = Logger::builder().name("kreg").config(&config.logging)?;
    if cli.verbose > 0 {
        builder = builder.level(raise_level(LevelFilter::INFO, cli.verbose));
    }
    Ok(builder.init()?)
}

/// Loads configuration, installs logging and runs the selected command.
pub async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_kreg_config(cli.config.as_deref()).context("Configuration is malformed")?;
    let _log = init_logging(&cli, &config).context("Logging bootstrap failed")?;

    match cli.command {
        Command::Validate(args) => handlers::validate::run(config, &args).await,
        Command::Generate(args) => handlers::generate::run(config, &args).await,
        Command::Sync(args) => handlers::sync::run(config, &args).await,
        Command::Drift(args) => handlers::drift::run(config, &args).await,
        Command::Status => handlers::status::run(&config).await,
    }
}
