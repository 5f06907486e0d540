//! Configuration view and validation commands: `kanban-relay config`.

use std::path::Path;

use anyhow::{Context, Result};
use kanban_relay::config::{DEFAULT_CONFIG_PATH, RelayConfig};

use crate::ConfigCommands;

pub fn cmd_config(config_path: Option<&Path>, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            let mut config = RelayConfig::load_or_default(config_path)?;
            config.apply_process_env()?;
            print!("{}", config.to_toml()?);
        }
        Some(ConfigCommands::Validate) => {
            let mut config = RelayConfig::load_or_default(config_path)?;
            config.apply_process_env()?;
            config.validate()?;
            println!("Configuration is valid.");
        }
        Some(ConfigCommands::Init { force }) => {
            let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists. Use --force to overwrite.",
                    path.display()
                );
            }
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(path, RelayConfig::default().to_toml()?)
                .with_context(|| format!("Failed to write config file: {}", path.display()))?;
            println!("Wrote default configuration to {}", path.display());
        }
    }
    Ok(())
}
