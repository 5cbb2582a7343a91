//! Command-line front end for dakdeck
//!
//! Loads YAML study files, renders and runs their decks, and serves as the
//! analysis driver the solver calls back into for every evaluation.

pub mod commands;
pub mod data;
pub mod logging;

pub use commands::{RunSummary, drive, load_study_file, render, run};
pub use logging::{default_log_dir, init_logging};
