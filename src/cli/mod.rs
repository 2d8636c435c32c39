//! Command-line interface.

mod commands;
mod helpers;

pub use commands::{load_config, run, Cli};
