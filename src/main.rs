//! LaneSim - Deterministic Lane Battle Simulator
//!
//! Runs a scripted match without any interaction and prints the result as
//! JSON.

use bevy::log::{Level, LogPlugin};
use bevy::prelude::*;

use lanesim::cli;
use lanesim::headless::{run_headless_match, HeadlessMatchConfig};

fn main() {
    let args = cli::parse_args();

    let level = args.log_level.parse::<Level>().unwrap_or(Level::INFO);
    // Installs the global log subscriber; the app itself is never run.
    App::new().add_plugins(LogPlugin {
        level,
        ..default()
    });

    let mut config = match &args.script {
        Some(path) => match HeadlessMatchConfig::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading script: {}", e);
                std::process::exit(1);
            }
        },
        None => HeadlessMatchConfig::default(),
    };
    if let Some(path) = &args.units {
        config.units_path = Some(path.display().to_string());
    }
    if let Some(path) = &args.rules {
        config.rules_path = Some(path.display().to_string());
    }
    if let Some(path) = &args.output {
        config.output_path = Some(path.display().to_string());
    }
    if let Some(max_duration) = args.max_duration {
        config.max_duration_secs = max_duration;
    }
    if args.seed.is_some() {
        config.random_seed = args.seed;
    }

    match run_headless_match(config) {
        Ok(result) => match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize result: {}", e),
        },
        Err(e) => {
            eprintln!("Error running match: {}", e);
            std::process::exit(1);
        }
    }
}
