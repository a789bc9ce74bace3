//! Command-line interface definitions and helpers.
//!
//! This module contains all CLI argument parsing, enums, and subcommand handlers.

mod args;
mod commands;
mod enums;

pub use args::{Args, CacheAction, Command, ConfigAction, ContentAction};
pub use commands::{
    handle_cache_action, handle_config_action, handle_content_action, resolve_content,
};
pub use enums::ContentKind;
