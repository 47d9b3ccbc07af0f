#![doc = include_str!("../README.md")]

use clap::{CommandFactory, Parser};
use color_eyre::eyre::Result;
use nmc_cli::install_color_eyre;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, prelude::__tracing_subscriber_SubscriberExt as _, util::SubscriberInitExt as _,
};

use crate::command::{Cli, Commands};

mod command;
mod create;
mod install;
mod output;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG overrides the default level for matching targets, --debug raises the default
    let default_level = if cli.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(cli.color.is_enabled()),
        )
        .with(filter)
        .init();

    install_color_eyre(cli.color)?;

    let Some(command) = cli.command else {
        let mut cmd = Cli::command();
        cmd.print_help()?;
        return Ok(());
    };

    match command {
        Commands::Create(args) => args.run(),
        Commands::Install(args) => args.run(),
    }
}
