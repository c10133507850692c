//! Headless mode for scripted matches
//!
//! Runs a full match from a JSON script without any interaction, suitable
//! for automated testing, balance runs and replay generation.
//!
//! ## Usage
//!
//! ```bash
//! # Run a scripted match
//! cargo run --release -- --script assets/scripts/sample_match.json
//! ```
//!
//! ## JSON Configuration
//!
//! ```json
//! {
//!   "random_seed": 7,
//!   "max_duration_secs": 180,
//!   "deployments": [
//!     { "time_secs": 1.0, "player": 1, "card": "Knight", "x": 3.5, "y": 12.0 },
//!     { "time_secs": 1.5, "player": 2, "card": "Archers", "x": 3.5, "y": 20.0 }
//!   ],
//!   "abilities": [
//!     { "time_secs": 10.0, "deployment": 0 }
//!   ]
//! }
//! ```

pub mod config;
pub mod runner;

pub use config::HeadlessMatchConfig;
pub use runner::{run_headless_match, MatchResult, TowerResult};
