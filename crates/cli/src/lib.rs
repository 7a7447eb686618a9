//! Terminal helpers for the ZeroByte CLI
//!
//! Provides shared CLI functionality:
//! - Terminal output formatting
//! - Progress indicators for transfers and scans
//! - Yes/no prompts

#![warn(missing_docs)]

pub mod output;
pub mod progress;
pub mod prompt;

pub use output::{OutputFormat, Status};
