use std::error::Error;

use clap::{Parser, ValueEnum};
use futures_util::TryStreamExt;
use sql_helper_core::{Command, CommandKind, DataRow, DataTable, SqlHelper, Value};

use crate::{
    commands::{ConnectionArgs, execute::build_command},
    config::OutputFormat,
};

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Shape {
    /// Every row of a single result
    #[default]
    Table,
    /// One table per statement
    Set,
    /// First row only
    Row,
    /// First column of the first row
    Scalar,
    /// Rows printed as they arrive
    Reader,
}

#[derive(Parser, Debug, Clone)]
#[command(about = "Run a query and print its result", long_about = None)]
#[must_use]
pub struct Query {
    #[command(flatten)]
    connection: ConnectionArgs,
    #[arg(long, help = "Treat STATEMENT as the name of a function to select from")]
    function: bool,
    #[arg(long, value_enum, default_value_t)]
    shape: Shape,
    #[arg(long, value_enum, help = "Overrides the output format from the config file")]
    format: Option<OutputFormat>,
    #[arg(help = "SQL text or a path to a file containing it")]
    statement: String,
    #[arg(short = 'p', long = "param", help = "Parameter as type:value, e.g. int4:5")]
    params: Vec<String>,
}

impl Query {
    pub async fn run(self) -> Result<(), Box<dyn Error>> {
        let kind = match self.function {
            true => CommandKind::Function,
            false => CommandKind::Text,
        };
        let command = build_command(self.statement, &self.params, kind)?;
        let (helper, config) = self.connection.connect().await?;
        let format = self.format.unwrap_or(config.output);
        let result = print_result(&helper, &command, self.shape, format).await;
        helper.close().await;
        result
    }
}

async fn print_result(
    helper: &SqlHelper,
    command: &Command,
    shape: Shape,
    format: OutputFormat,
) -> Result<(), Box<dyn Error>> {
    match shape {
        Shape::Table => print_table(&helper.get_table(command).await?, format)?,
        Shape::Set => {
            let data_set = helper.get_data_set(command).await?;
            match format {
                OutputFormat::Table => {
                    for table in &data_set {
                        println!("{table}\n");
                    }
                }
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&data_set)?),
            }
        }
        Shape::Row => match helper.get_row(command).await? {
            Some(row) => print_row(&row, format)?,
            None => tracing::warn!("Query returned no rows"),
        },
        Shape::Scalar => {
            let value = helper.execute_scalar(command).await?.unwrap_or(Value::Null);
            match format {
                OutputFormat::Table => println!("{value}"),
                OutputFormat::Json => println!("{}", serde_json::to_string(&value)?),
            }
        }
        Shape::Reader => {
            let mut rows = helper.get_reader(command);
            let mut count = 0_usize;
            while let Some(row) = rows.try_next().await? {
                print_row(&row, format)?;
                count += 1;
            }
            tracing::info!("Read {count} rows");
        }
    }
    Ok(())
}

fn print_table(table: &DataTable, format: OutputFormat) -> Result<(), Box<dyn Error>> {
    match format {
        OutputFormat::Table => println!("{table}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(table)?),
    }
    Ok(())
}

fn print_row(row: &DataRow, format: OutputFormat) -> Result<(), Box<dyn Error>> {
    match format {
        OutputFormat::Table => println!("{}", format_row(row)),
        OutputFormat::Json => println!("{}", serde_json::to_string(row)?),
    }
    Ok(())
}

fn format_row(row: &DataRow) -> String {
    row.values
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join("  |  ")
}

#[cfg(test)]
mod tests {
    use sql_helper_core::{DataRow, Value};

    use crate::commands::query::format_row;

    #[test]
    fn rows_are_joined_with_separators() {
        let row = DataRow {
            values: vec![Value::Int(1), Value::Null, Value::Text("x".into())],
        };
        assert_eq!(format_row(&row), "1  |  NULL  |  x");
    }
}
