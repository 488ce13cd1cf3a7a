//! splitpack library
//!
//! Splits a monolithic React Native bundle into a shared base bundle and
//! one bundle per feature entry.

pub mod assets;
pub mod bundler;
pub mod cli;
pub mod config;
pub mod error;
pub mod recognizer;
pub mod report;
pub mod utils;

pub use bundler::Splitter;
pub use cli::Cli;
pub use config::Config;
pub use error::SplitError;
pub use report::{RunStatus, SplitReport};
