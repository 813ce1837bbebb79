pub mod escape;
pub mod execute;
pub mod init;
pub mod query;

use std::{error::Error, path::PathBuf};

use sql_helper_core::{SqlHelper, SqlHelperBuilder};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::config::SqlHelperConfig;

fn init_logging(debug: bool) -> Result<(), Box<dyn Error>> {
    let level = match debug {
        true => Level::DEBUG,
        false => Level::WARN,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Arguments shared by every command that talks to the database.
#[derive(clap::Args, Debug, Clone)]
pub struct ConnectionArgs {
    #[arg(long, help = "Path to the config file [default: sql-helper.toml]")]
    config: Option<PathBuf>,
    #[arg(long, help = "Show debug information")]
    debug: bool,
}

impl ConnectionArgs {
    pub async fn connect(&self) -> Result<(SqlHelper, SqlHelperConfig), Box<dyn Error>> {
        init_logging(self.debug)?;
        let config = SqlHelperConfig::load(self.config.as_deref())?;
        let mut builder = SqlHelperBuilder::default().max_connections(config.max_connections);
        if let Some(timeout) = config.acquire_timeout {
            builder = builder.acquire_timeout(timeout);
        }
        let helper = builder.connect_with(config.connect_options.clone()).await?;
        Ok((helper, config))
    }
}
