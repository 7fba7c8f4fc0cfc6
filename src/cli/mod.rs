//! CLI Module
//!
//! Command-line surface for building rigs from config files and inspecting
//! saved scenes.

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Rigforge - procedural rig construction
#[derive(Parser, Debug)]
#[command(name = "rigforge", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a rig from a JSON config and save the scene
    Build {
        /// Path to the rig config file
        config: PathBuf,
        /// Where to write the built scene
        #[arg(short, long, default_value = "scene.json")]
        output: PathBuf,
    },
    /// Print a saved scene's hierarchy and Units
    Inspect {
        /// Path to a saved scene file
        scene: PathBuf,
    },
}
