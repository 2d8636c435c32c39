//! Shared utility functions.
//!
//! - `tools`: external binary discovery
//! - `file_pattern`: shell-style filename patterns for batch input

mod file_pattern;
mod tools;

pub use file_pattern::FilePattern;
pub use tools::{check_binary, check_tools};
