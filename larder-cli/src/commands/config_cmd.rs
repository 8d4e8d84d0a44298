use clap::{Args, Subcommand, ValueEnum};

use crate::config::Config;

#[derive(Debug, Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the config file path
    Path,
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("data_dir: {}", config.data_dir.value.display());
                        println!("  source: {}", config.data_dir.source);
                        println!();

                        println!(
                            "sync.server_url: {}",
                            config.sync.server_url.as_deref().unwrap_or("(not set)")
                        );
                        println!("sync.auto_sync: {}", config.sync.auto_sync);
                        println!("sync.timeout_secs: {}", config.sync.timeout_secs);
                        println!(
                            "sync.collections: {}",
                            if config.sync.collections.is_empty() {
                                "(none)".to_string()
                            } else {
                                config.sync.collections.join(", ")
                            }
                        );
                    }
                }
                Ok(())
            }

            ConfigSubcommand::Path => {
                let path = config
                    .config_file
                    .clone()
                    .unwrap_or_else(Config::default_config_path);
                println!("{}", path.display());
                Ok(())
            }
        }
    }
}
