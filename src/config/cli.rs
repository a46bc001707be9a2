use crate::config::SyncConfig;
use crate::domain::model::TravelMode;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "commute-sync")]
#[command(about = "Keep commute addresses and max durations in sync between page and extension storage")]
pub struct CliConfig {
    #[arg(long, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub api_base_url: Option<String>,

    #[arg(long)]
    pub store_path: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Print the synchronized addresses and max durations
    Status,
    /// Add or replace a commute address
    AddAddress {
        #[arg(long)]
        id: String,
        #[arg(long)]
        address: String,
    },
    /// Remove a commute address by id
    RemoveAddress { id: String },
    /// Set (or unset, when minutes is omitted) the cap for a travel mode
    SetMax {
        #[arg(long)]
        mode: TravelMode,
        #[arg(long)]
        minutes: Option<u32>,
    },
    /// Clear addresses and max durations in both storage domains
    Clear,
    /// Compute durations for the stored addresses
    Durations,
}

impl CliConfig {
    /// 讀取設定檔後套用命令列參數，並驗證結果
    pub fn resolve(&self) -> Result<SyncConfig> {
        let mut config = match &self.config {
            Some(path) => SyncConfig::from_file(path)?,
            None => SyncConfig::default(),
        };

        if let Some(base_url) = &self.api_base_url {
            config.api.base_url = base_url.clone();
        }
        if let Some(store_path) = &self.store_path {
            config.storage.path = store_path.clone();
        }
        config.logging.verbose |= self.verbose;
        config.logging.json |= self.json_logs;

        config.validate()?;
        Ok(config)
    }
}
