//! Event registration and check-in CLI library.
//!
//! This crate provides the `usher` command-line interface.

mod cli;
pub mod commands;
mod config;
pub mod identity;

pub use cli::{Cli, Commands, EventAction};
pub use config::Config;
