use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tracing::info;

pub mod command;
pub mod error;
pub mod escape;
pub mod helper;
pub mod param;
pub mod table;

pub use command::{Command, CommandKind};
pub use error::HelperError;
pub use helper::SqlHelper;
pub use param::Param;
pub use table::{DataColumn, DataRow, DataSet, DataTable, Value};

#[must_use]
pub struct SqlHelperBuilder {
    max_connections: u32,
    acquire_timeout: Option<Duration>,
}

impl Default for SqlHelperBuilder {
    fn default() -> Self {
        Self {
            max_connections: 1,
            acquire_timeout: None,
        }
    }
}

impl SqlHelperBuilder {
    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    pub async fn connect(self, database_url: &str) -> Result<SqlHelper, HelperError> {
        self.connect_with(database_url.parse()?).await
    }

    pub async fn connect_with(self, options: PgConnectOptions) -> Result<SqlHelper, HelperError> {
        let mut pool_options = PgPoolOptions::new().max_connections(self.max_connections);
        if let Some(timeout) = self.acquire_timeout {
            pool_options = pool_options.acquire_timeout(timeout);
        }
        let pool = pool_options.connect_with(options).await?;
        info!("Connected with up to {} connections", self.max_connections);
        Ok(SqlHelper::from_pool(pool))
    }
}

/// Quotes an identifier, doubling embedded double quotes.
pub fn escape_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace("\"", "\"\""))
}
