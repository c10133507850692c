//! Command-line interface for LaneSim
//!
//! Runs a scripted match headlessly and prints the result.

use clap::Parser;
use std::path::PathBuf;

/// Deterministic lane battle simulator
#[derive(Parser, Debug)]
#[command(name = "lanesim")]
#[command(about = "Deterministic lane battle simulator")]
#[command(version)]
pub struct Args {
    /// JSON match script to run (an empty script runs towers only)
    #[arg(long, value_name = "SCRIPT_FILE")]
    pub script: Option<PathBuf>,

    /// Unit catalog in RON, replacing the built-in one
    #[arg(long, value_name = "UNITS_FILE")]
    pub units: Option<PathBuf>,

    /// Match rules in RON, replacing the defaults
    #[arg(long, value_name = "RULES_FILE")]
    pub rules: Option<PathBuf>,

    /// Output path for the combat log
    #[arg(long, value_name = "OUTPUT_PATH")]
    pub output: Option<PathBuf>,

    /// Maximum match duration in seconds, overriding the script
    #[arg(long)]
    pub max_duration: Option<f32>,

    /// Random seed, overriding the script
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

pub fn parse_args() -> Args {
    Args::parse()
}
