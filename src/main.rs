mod cli;

use clap::Parser;
use cli::{Args, Command};
use std::path::PathBuf;
use vap_bridge::config::{self, Config, CONFIG_ENV};
use vap_bridge::resolver::ImageCache;

/// Pick up `VAP_BRIDGE_CONFIG` and friends from a local .env.
fn load_env() {
    dotenv::dotenv().ok();
}

/// Config path: `--config` first, then the environment, then the default.
fn config_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        .unwrap_or_else(config::default_path)
}

fn run_resolve(json: &str, output: Option<PathBuf>, path: &std::path::Path) -> Result<(), String> {
    let cfg = Config::load(Some(path)).map_err(|e| e.to_string())?;
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start async runtime: {}", e))?;
    runtime
        .block_on(cli::resolve_content(
            json,
            output.as_deref(),
            cfg.resource_settings(),
        ))
        .map_err(|e| e.to_string())
}

/// The configured cache directory, whether or not caching is enabled.
fn configured_cache(path: &std::path::Path) -> Result<ImageCache, String> {
    let cfg = Config::load(Some(path)).map_err(|e| e.to_string())?;
    Ok(cfg
        .http
        .cache_dir
        .map(ImageCache::new)
        .unwrap_or_else(ImageCache::with_default_dir))
}

fn main() {
    load_env();

    let args = Args::parse();
    let path = config_path(args.config);

    match args.command {
        Command::Content { action } => {
            if let Err(e) = cli::handle_content_action(action) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Command::Resolve { json, output } => {
            if let Err(e) = run_resolve(&json, output, &path) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Command::Config { action } => cli::handle_config_action(action, &path),
        Command::Cache { action } => {
            let result =
                configured_cache(&path).and_then(|cache| cli::handle_cache_action(action, &cache));
            if let Err(e) = result {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
