use anyhow::Result;
use std::path::Path;

use crate::core::config::{AppConfig, ConfigError};

pub fn init(path: Option<&Path>) -> Result<()> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::config_path);
    if path.exists() {
        eprintln!("Config file already exists at {}", path.display());
        eprintln!("Remove it first if you want to regenerate.");
        return Ok(());
    }

    match AppConfig::default().save(&path) {
        Ok(()) => {
            println!("Generated config at {}", path.display());
            println!("  Set [account].sid and either token or auth_token before serving.");
        }
        Err(e) => {
            eprintln!("Failed to generate config: {}", e);
            std::process::exit(1);
        }
    }
    Ok(())
}

pub fn check(path: Option<&Path>) -> Result<()> {
    let shown = path
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::config_path);

    let mut config = match AppConfig::load(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };
    config.apply_env();

    let mut issues = config.validate();
    match config.resolve() {
        // Already reported by validate()
        Ok(_) | Err(ConfigError::InvalidAccount(_)) => {}
        Err(e) => issues.push(e.to_string()),
    }

    if issues.is_empty() {
        println!("Config OK ({})", shown.display());
        return Ok(());
    }

    eprintln!("Config has {} issue{}:", issues.len(), if issues.len() == 1 { "" } else { "s" });
    for issue in &issues {
        eprintln!("  - {}", issue);
    }
    std::process::exit(1);
}
