//! Combat reporting
//!
//! The battle core emits discrete events every tick; this module carries
//! them and turns them into a timestamped combat log:
//! - Battle events (spawn, damage, death, abilities, shields, towers)
//! - Combat log with filtering, damage totals and JSON export

pub mod events;
pub mod log;
pub mod systems;
