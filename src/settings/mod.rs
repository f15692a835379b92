//! Startup configuration: a TOML settings file selected by `--settings`, plus
//! the signing key read from the environment.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
