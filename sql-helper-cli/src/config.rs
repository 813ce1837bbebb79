use std::{
    env,
    error::Error,
    fmt::Display,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::ValueEnum;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;

const DATABASE_URL: &str = "DATABASE_URL";
pub const CONFIG_FILE: &str = "sql-helper.toml";

#[derive(Debug, Clone)]
pub enum ConfigError {
    DbUrlNotFound,
    InvalidUrl { error: String },
    Unreadable { path: PathBuf, error: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::DbUrlNotFound => write!(
                f,
                "Database URL not found, please set the {DATABASE_URL} environment variable or add a [database] table to {CONFIG_FILE}."
            ),
            ConfigError::InvalidUrl { error } => write!(f, "invalid {DATABASE_URL}: {error}"),
            ConfigError::Unreadable { path, error } => {
                write!(f, "encountered '{error}' attempting to read {}", path.display())
            }
        }
    }
}

impl Error for ConfigError {}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DbInfo {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
}

impl Default for DbInfo {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5432,
            user: "postgres".into(),
            password: "<password>".into(),
            name: "postgres".into(),
        }
    }
}

impl DbInfo {
    /// Fields are passed as they are, so passwords need no URL encoding.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.name)
    }
}

#[derive(Serialize, Deserialize, ValueEnum, Copy, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[must_use]
pub struct TomlConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub acquire_timeout_secs: Option<u64>,
    #[serde(default)]
    pub output: OutputFormat,
    #[serde(default)]
    pub database: Option<DbInfo>,
}

fn default_max_connections() -> u32 {
    1
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            acquire_timeout_secs: None,
            output: OutputFormat::default(),
            database: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqlHelperConfig {
    pub connect_options: PgConnectOptions,
    pub max_connections: u32,
    pub acquire_timeout: Option<Duration>,
    pub output: OutputFormat,
}

/// `DATABASE_URL` from the environment or a `.env` file.
pub fn db_url() -> Option<String> {
    // A missing .env file is fine, the variable may be set directly.
    let _ = dotenv();
    env::var(DATABASE_URL).ok().filter(|url| !url.is_empty())
}

impl SqlHelperConfig {
    /// Reads the config file and resolves the database URL. Without an
    /// explicit path a missing `sql-helper.toml` falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        let config = match path {
            Some(path) => read_toml_config(path)?,
            None if std::fs::exists(CONFIG_FILE)? => read_toml_config(Path::new(CONFIG_FILE))?,
            None => TomlConfig::default(),
        };
        Ok(Self::from_toml_config(config, db_url())?)
    }

    pub fn from_toml_config(
        config: TomlConfig,
        env_url: Option<String>,
    ) -> Result<Self, ConfigError> {
        let connect_options = match (env_url, &config.database) {
            (Some(url), _) => url
                .parse::<PgConnectOptions>()
                .map_err(|error| ConfigError::InvalidUrl {
                    error: error.to_string(),
                })?,
            (None, Some(database)) => database.connect_options(),
            (None, None) => return Err(ConfigError::DbUrlNotFound),
        };
        Ok(Self {
            connect_options,
            max_connections: config.max_connections,
            acquire_timeout: config.acquire_timeout_secs.map(Duration::from_secs),
            output: config.output,
        })
    }
}

fn read_toml_config(path: &Path) -> Result<TomlConfig, Box<dyn Error>> {
    let content = std::fs::read_to_string(path).map_err(|error| ConfigError::Unreadable {
        path: path.to_path_buf(),
        error: error.to_string(),
    })?;
    Ok(toml::from_str(&content)?)
}
