mod cli;
mod commands;
mod config;
mod hosts;
mod paths;
mod progress;
mod sudo;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use declarative::CancelToken;
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub file: Option<PathBuf>,
    pub development: bool,
    pub proxy_endpoint: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        file: cli.file,
        development: cli.development,
        proxy_endpoint: cli.proxy_endpoint,
    };

    // Ctrl+C stops the run at the next resource boundary
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        log::warn!("Interrupted; stopping after the current step");
        handler_token.cancel();
    }) {
        log::debug!("Could not install Ctrl+C handler: {e}");
    }

    match cli.command {
        Command::Apply(args) => commands::apply::run(&ctx, args, &cancel),
        Command::Diff(args) => commands::diff::run(&ctx, args),
        Command::Status(args) => commands::status::run(&ctx, args),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}
