//! Relay server command: `kanban-relay serve`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use kanban_relay::config::RelayConfig;

/// Flags given on the command line; they win over file and environment.
#[derive(Debug, Default)]
pub struct ServeOverrides {
    pub port: Option<u16>,
    pub host: Option<String>,
    pub dev: bool,
    pub no_seed: bool,
    pub log_format: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl ServeOverrides {
    fn apply(self, config: &mut RelayConfig) -> Result<()> {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if self.dev {
            config.server.dev_mode = true;
        }
        if self.no_seed {
            config.board.seed_demo = false;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format.parse()?;
        }
        if let Some(file) = self.log_file {
            config.logging.file = Some(file);
        }
        Ok(())
    }
}

pub async fn cmd_serve(
    config_path: Option<&Path>,
    overrides: ServeOverrides,
    verbose: bool,
) -> Result<()> {
    let mut config = RelayConfig::load_or_default(config_path)?;
    config.apply_process_env()?;
    overrides.apply(&mut config)?;
    config.validate()?;

    let _guard = kanban_relay::telemetry::init_tracing(
        config.logging.format,
        config.logging.file.as_deref(),
        verbose,
    )?;

    kanban_relay::relay::server::start_server(config).await
}
