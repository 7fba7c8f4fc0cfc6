//! Rigforge CLI - Procedural Rig Construction
//!
//! Command-line interface for building rigs from config files and
//! inspecting the resulting scenes.

use clap::Parser;
use env_logger::Env;
use log::info;

use rigforge::cli::{commands, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    info!("Rigforge v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(Commands::Build { config, output }) => commands::build(&config, &output)?,
        Some(Commands::Inspect { scene }) => commands::inspect(&scene)?,
        None => {
            println!("Rigforge v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
        }
    }
    Ok(())
}
