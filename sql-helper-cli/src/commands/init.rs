use std::error::Error;

use crate::config::{CONFIG_FILE, DbInfo, TomlConfig};

#[derive(clap::Args, Debug, Clone)]
#[command(about = "Write a template config file", long_about = None)]
pub struct Initialize {}

impl Initialize {
    pub fn run(self) -> Result<(), Box<dyn Error>> {
        if std::fs::exists(CONFIG_FILE)? {
            eprintln!("{CONFIG_FILE} already exists.\nExiting...");
            return Ok(());
        }
        let config = TomlConfig {
            database: Some(DbInfo::default()),
            ..TomlConfig::default()
        };
        std::fs::write(CONFIG_FILE, toml::to_string_pretty(&config)?)?;
        eprintln!("Written config to {CONFIG_FILE}!");
        Ok(())
    }
}
