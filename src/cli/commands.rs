//! Subcommand handlers for content, resolve and config actions.

use std::error::Error;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::args::{CacheAction, ConfigAction, ContentAction};
use vap_bridge::config::{Config, DEFAULT_CONFIG_TEMPLATE};
use vap_bridge::content::Content;
use vap_bridge::resolver::{decode_image_format, ContentResolver, ImageCache, ResourceSettings};

fn parse_content(json: &str) -> Result<Content, Box<dyn Error>> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    Ok(Content::from_value(&value)?)
}

/// Handle content encode/decode.
pub fn handle_content_action(action: ContentAction) -> Result<(), Box<dyn Error>> {
    match action {
        ContentAction::Encode { kind, value } => {
            let content = kind.to_content(value);
            println!("{}", serde_json::to_string_pretty(&content.to_wire())?);
        }
        ContentAction::Decode { json } => {
            let content = parse_content(&json)?;
            println!("type:  {}", content.content_type());
            println!("value: {}", content.value());
        }
    }
    Ok(())
}

/// Resolve content to image bytes and report (or write) the result.
pub async fn resolve_content(
    json: &str,
    output: Option<&Path>,
    settings: ResourceSettings,
) -> Result<(), Box<dyn Error>> {
    let content = parse_content(json)?;
    let resolver = ContentResolver::new(Arc::new(Mutex::new(Default::default())), settings)?;
    let Some(bytes) = resolver.resolve_content(&content).await? else {
        println!("Text content resolves to no image: {}", content.value());
        return Ok(());
    };

    let format = decode_image_format(&bytes)?;
    let extension = format.extensions_str().first().copied().unwrap_or("unknown");
    println!("Resolved {} bytes ({})", bytes.len(), extension);
    if let Some(output) = output {
        std::fs::write(output, &bytes)?;
        println!("Wrote {}", output.display());
    }
    Ok(())
}

/// Handle image cache actions.
pub fn handle_cache_action(action: CacheAction, cache: &ImageCache) -> Result<(), String> {
    match action {
        CacheAction::Path => println!("{}", cache.cache_dir().display()),
        CacheAction::Clear => {
            let count = cache
                .clear()
                .map_err(|e| format!("Failed to clear cache: {}", e))?;
            if count == 0 {
                println!("Cache is already empty.");
            } else {
                println!(
                    "Removed {} cached image{}.",
                    count,
                    if count == 1 { "" } else { "s" }
                );
            }
        }
    }
    Ok(())
}

/// Handle config subcommand actions.
pub fn handle_config_action(action: ConfigAction, config_path: &Path) {
    match action {
        ConfigAction::Show => {
            let config = match Config::load(Some(config_path)) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            let settings = config.resource_settings();
            println!("Current configuration:");
            println!(
                "  Scale type: {}",
                config.player.scale_type.as_deref().unwrap_or("fitCenter")
            );
            println!("  Repeat: {}", config.player.repeat);
            println!("  Mute: {}", if config.player.mute { "yes" } else { "no" });
            println!("  Storage dir: {}", settings.storage_dir.display());
            println!("  Asset root: {}", settings.asset_root.display());
            println!("  Max file size: {} MiB", config.resources.max_file_mb);
            println!("  HTTP timeout: {}s", config.http.timeout_secs);
            match &settings.cache_dir {
                Some(dir) => println!("  Image cache: {}", dir.display()),
                None => println!("  Image cache: disabled"),
            }
            println!("  Initial tags: {}", config.tags.len());
            for (tag, entry) in &config.tags {
                println!("    {} = {} {}", tag, entry.content_type, entry.content_value);
            }
            println!();

            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found)", config_path.display());
            }
        }
        ConfigAction::Init => {
            if config_path.exists() {
                eprintln!("Config file already exists: {}", config_path.display());
                eprintln!("Use 'vap-bridge config show' to view current settings.");
                std::process::exit(1);
            }

            if let Some(parent) = config_path.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    eprintln!("Error creating config directory: {}", e);
                    std::process::exit(1);
                }
            }

            if let Err(e) = std::fs::write(config_path, DEFAULT_CONFIG_TEMPLATE) {
                eprintln!("Error writing config file: {}", e);
                std::process::exit(1);
            }

            println!("Created config file: {}", config_path.display());
        }
    }
}
