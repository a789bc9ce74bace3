//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::enums::ContentKind;

/// Inspect and resolve dynamic tag content for alpha-video animations
#[derive(Parser, Debug)]
#[command(name = "vap-bridge")]
#[command(version, about = "Tag content tooling for alpha-video animations", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode or decode content wire maps
    Content {
        #[command(subcommand)]
        action: ContentAction,
    },
    /// Resolve a content wire map to image bytes
    Resolve {
        /// Content wire map as JSON
        json: String,
        /// Write the resolved image to this file
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Manage the downloaded image cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ContentAction {
    /// Print the wire map for a value
    Encode {
        /// Content type
        #[arg(long = "type", short = 't', value_enum)]
        kind: ContentKind,
        /// Content value
        #[arg(long, short)]
        value: String,
    },
    /// Decode a wire map and print its typed form
    Decode {
        /// Content wire map as JSON
        json: String,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CacheAction {
    /// Print the cache directory
    Path,
    /// Remove every cached image
    Clear,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}
