//! `sigdash` command-line frontend.
//!
//! Wires the REST client and view models to a terminal:
//! - `config`: TOML file with `SIGDASH__*` environment overrides
//! - `cli`: clap argument definitions
//! - `app`: runs one command, or the interactive `watch` loop
//! - `commands`: line commands of the watch loop
//! - `render`: plain-text tables

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod render;

pub use app::{min_frequency, print_notice, Application};
pub use cli::{Cli, Command};
pub use commands::WatchCommand;
pub use config::{AppConfig, DEFAULT_CONFIG_PATH};
pub use error::{AppError, AppResult};
