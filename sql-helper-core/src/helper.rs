use std::cmp;

use futures_util::{StreamExt, stream::BoxStream};
use sqlx::{Executor, PgPool, Postgres, QueryBuilder, Statement};
use tracing::{debug, info};

use crate::{
    command::{Command, CommandKind, quote_qualified, split_statements},
    error::HelperError,
    escape_ident,
    table::{DataColumn, DataRow, DataSet, DataTable, Value},
};

/// PostgreSQL accepts at most this many bind parameters per statement.
const MAX_BIND_PARAMS: usize = u16::MAX as usize;

/// Column types whose values bind as a parameter of the same type. Values
/// of any other column are cast to it explicitly.
const NATIVE_TYPES: &[&str] = &[
    "BOOL",
    "INT2",
    "INT4",
    "INT8",
    "FLOAT4",
    "FLOAT8",
    "NUMERIC",
    "TEXT",
    "VARCHAR",
    "CHAR",
    "NAME",
    "UNKNOWN",
    "VOID",
    "BYTEA",
    "JSONB",
    "DATE",
    "TIME",
    "TIMESTAMP",
    "TIMESTAMPTZ",
    "UUID",
];

fn bind_cast(type_name: &str) -> Result<Option<&str>, HelperError> {
    if NATIVE_TYPES.contains(&type_name) {
        return Ok(None);
    }
    let valid = !type_name.is_empty()
        && type_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '[' | ']' | ' '));
    match valid {
        true => Ok(Some(type_name)),
        false => Err(HelperError::UnsupportedType {
            type_name: type_name.to_string(),
        }),
    }
}

fn rows_per_statement(columns: usize) -> usize {
    cmp::max(1, MAX_BIND_PARAMS / columns.max(1))
}

/// Runs [`Command`]s against a PostgreSQL pool.
///
/// Connections are taken from the pool for the duration of a single call
/// and handed back afterwards, batches and bulk inserts hold one connection
/// for their transaction.
#[derive(Debug, Clone)]
pub struct SqlHelper {
    pool: PgPool,
}

impl SqlHelper {
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Runs a statement and returns the number of affected rows.
    pub async fn execute(&self, command: &Command) -> Result<u64, HelperError> {
        debug!("Executing {}", command.sql());
        let rows_affected = command.query().execute(&self.pool).await?.rows_affected();
        debug!("{rows_affected} rows affected");
        Ok(rows_affected)
    }

    /// Runs every command inside one transaction. Nothing is committed when
    /// any of them fails.
    pub async fn execute_batch(&self, commands: &[Command]) -> Result<Vec<u64>, HelperError> {
        let mut transaction = self.pool.begin().await?;
        let mut affected = Vec::with_capacity(commands.len());
        for command in commands {
            debug!("Executing {} in transaction", command.sql());
            let result = command.query().execute(&mut *transaction).await?;
            affected.push(result.rows_affected());
        }
        transaction.commit().await?;
        info!("Committed {} statements", commands.len());
        Ok(affected)
    }

    /// Fetches every row. When nothing comes back the columns are taken from
    /// the prepared statement so the table still has a header.
    pub async fn get_table(&self, command: &Command) -> Result<DataTable, HelperError> {
        debug!("Querying {}", command.sql());
        let rows = command.query().fetch_all(&self.pool).await?;
        if !rows.is_empty() {
            return DataTable::from_rows(&rows);
        }
        let statement = self.pool.prepare(command.sql()).await?;
        Ok(DataTable::new(DataColumn::describe(statement.columns())))
    }

    /// Text without parameters may hold several statements separated by `;`.
    /// They run in order inside one transaction and every statement that
    /// describes result columns adds a table, even when it returns no rows.
    /// Anything else is a single statement and yields exactly one table.
    pub async fn get_data_set(&self, command: &Command) -> Result<DataSet, HelperError> {
        if command.kind() != CommandKind::Text || !command.params().is_empty() {
            return Ok(vec![self.get_table(command).await?]);
        }
        let statements = split_statements(command.sql())?;
        debug!("Querying data set of {} statements", statements.len());
        let mut transaction = self.pool.begin().await?;
        let mut data_set = DataSet::new();
        for statement in statements {
            debug!("Querying {statement}");
            let described = (&mut *transaction).prepare(statement).await?;
            if described.columns().is_empty() {
                sqlx::query(statement).execute(&mut *transaction).await?;
                continue;
            }
            let mut table = DataTable::new(DataColumn::describe(described.columns()));
            for row in sqlx::query(statement).fetch_all(&mut *transaction).await? {
                table.rows.push(DataRow::try_from(&row)?);
            }
            data_set.push(table);
        }
        transaction.commit().await?;
        debug!("Data set has {} tables", data_set.len());
        Ok(data_set)
    }

    pub async fn get_row(&self, command: &Command) -> Result<Option<DataRow>, HelperError> {
        debug!("Querying first row of {}", command.sql());
        command
            .query()
            .fetch_optional(&self.pool)
            .await?
            .map(|row| DataRow::try_from(&row))
            .transpose()
    }

    /// Streams rows as they arrive. The connection goes back to the pool once
    /// the stream is exhausted or dropped.
    pub fn get_reader<'a>(
        &'a self,
        command: &'a Command,
    ) -> BoxStream<'a, Result<DataRow, HelperError>> {
        debug!("Reading {}", command.sql());
        command
            .query()
            .fetch(&self.pool)
            .map(|row| DataRow::try_from(&row?))
            .boxed()
    }

    /// First column of the first row, `None` when there are no rows.
    pub async fn execute_scalar(&self, command: &Command) -> Result<Option<Value>, HelperError> {
        Ok(self
            .get_row(command)
            .await?
            .and_then(|row| row.values.into_iter().next()))
    }

    /// Scalar read as an integer. Missing rows and nulls count as zero.
    pub async fn execute_scalar_int(&self, command: &Command) -> Result<i64, HelperError> {
        match self.execute_scalar(command).await? {
            Some(value) => value.to_i64(),
            None => Ok(0),
        }
    }

    /// Inserts every row of `data` into `table` inside one transaction.
    ///
    /// Columns are matched by name. Nulls are bound with the type of their
    /// column, and columns without a parameter type of their own are cast to
    /// it. Rows are sent in chunks that stay below the bind parameter limit.
    pub async fn bulk_insert(&self, table: &str, data: &DataTable) -> Result<u64, HelperError> {
        let target = quote_qualified(table)?;
        if data.rows.is_empty() || data.columns.is_empty() {
            return Ok(0);
        }
        if let Some(row) = data
            .rows
            .iter()
            .find(|row| row.values.len() != data.columns.len())
        {
            return Err(HelperError::ColumnMismatch {
                expected: data.columns.len(),
                found: row.values.len(),
            });
        }
        let casts = data
            .columns
            .iter()
            .map(|column| bind_cast(&column.type_name))
            .collect::<Result<Vec<_>, _>>()?;
        let columns = data
            .columns
            .iter()
            .map(|column| escape_ident(&column.name))
            .collect::<Vec<_>>()
            .join(", ");
        let chunk_size = rows_per_statement(data.columns.len());

        let mut transaction = self.pool.begin().await?;
        let mut inserted = 0;
        for chunk in data.rows.chunks(chunk_size) {
            let mut builder =
                QueryBuilder::<Postgres>::new(format!("INSERT INTO {target} ({columns}) "));
            builder.push_values(chunk, |mut separated, row| {
                for ((column, cast), value) in data.columns.iter().zip(&casts).zip(&row.values) {
                    column.to_param(value).push_bind(&mut separated);
                    if let Some(cast) = cast {
                        separated.push_unseparated(format!("::{cast}"));
                    }
                }
            });
            inserted += builder
                .build()
                .execute(&mut *transaction)
                .await?
                .rows_affected();
        }
        transaction.commit().await?;
        info!("Inserted {inserted} rows into {target}");
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use sqlx::postgres::PgPoolOptions;

    use crate::{
        error::HelperError,
        helper::{SqlHelper, bind_cast, rows_per_statement},
        table::{DataColumn, DataRow, DataTable, Value},
    };

    /// A helper whose pool never connects. Only checks that fail before a
    /// connection is needed can run against it.
    fn offline_helper() -> SqlHelper {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost:1/unused")
            .unwrap();
        SqlHelper::from_pool(pool)
    }

    fn table(columns: &[(&str, &str)], rows: Vec<Vec<Value>>) -> DataTable {
        DataTable {
            columns: columns
                .iter()
                .map(|(name, type_name)| DataColumn::new(*name, *type_name))
                .collect(),
            rows: rows.into_iter().map(|values| DataRow { values }).collect(),
        }
    }

    #[tokio::test]
    async fn bulk_insert_rejects_ragged_rows() {
        let data = table(
            &[("id", "INT4"), ("name", "TEXT")],
            vec![vec![Value::Int(1), Value::Null], vec![Value::Int(2)]],
        );
        let result = offline_helper().bulk_insert("users", &data).await;
        assert!(matches!(
            result,
            Err(HelperError::ColumnMismatch {
                expected: 2,
                found: 1
            })
        ));
    }

    #[tokio::test]
    async fn bulk_insert_of_nothing_is_a_no_op() {
        let helper = offline_helper();
        let empty = table(&[("id", "INT4")], vec![]);
        assert_eq!(helper.bulk_insert("users", &empty).await.unwrap(), 0);
        let no_columns = table(&[], vec![vec![]]);
        assert_eq!(helper.bulk_insert("users", &no_columns).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn bulk_insert_validates_names() {
        let helper = offline_helper();
        let data = table(&[("id", "INT4")], vec![vec![Value::Int(1)]]);
        assert!(matches!(
            helper.bulk_insert("public.", &data).await,
            Err(HelperError::InvalidName { .. })
        ));
        let data = table(&[("id", "INT4); drop table x; --")], vec![vec![Value::Int(1)]]);
        assert!(matches!(
            helper.bulk_insert("users", &data).await,
            Err(HelperError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn casts_only_where_no_parameter_type_matches() {
        assert_eq!(bind_cast("INT4").unwrap(), None);
        assert_eq!(bind_cast("TIMESTAMPTZ").unwrap(), None);
        assert_eq!(bind_cast("INTERVAL").unwrap(), Some("INTERVAL"));
        assert_eq!(bind_cast("INT4[]").unwrap(), Some("INT4[]"));
        assert_eq!(bind_cast("JSON").unwrap(), Some("JSON"));
        assert!(bind_cast("").is_err());
        assert!(bind_cast("text; select 1").is_err());
    }

    #[test]
    fn chunks_stay_under_bind_limit() {
        assert_eq!(rows_per_statement(1), 65535);
        assert_eq!(rows_per_statement(2), 32767);
        assert_eq!(rows_per_statement(100_000), 1);
        assert_eq!(rows_per_statement(0), 65535);
    }
}
