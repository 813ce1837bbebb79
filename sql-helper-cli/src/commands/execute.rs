use std::error::Error;

use clap::Parser;
use sql_helper_core::{Command, CommandKind};

use crate::{
    commands::ConnectionArgs,
    utils::{parse_param, read_statement},
};

/// Builds the command shared by `execute` and `query`.
pub(crate) fn build_command(
    statement: String,
    params: &[String],
    kind: CommandKind,
) -> Result<Command, Box<dyn Error>> {
    let command = match kind {
        CommandKind::Text => Command::text(read_statement(statement)?),
        CommandKind::Procedure => Command::procedure(statement)?,
        CommandKind::Function => Command::function(statement)?,
    };
    let params = params
        .iter()
        .map(|param| parse_param(param))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(command.bind_all(params))
}

#[derive(Parser, Debug, Clone)]
#[command(about = "Run a statement and print the number of affected rows", long_about = None)]
#[must_use]
pub struct Execute {
    #[command(flatten)]
    connection: ConnectionArgs,
    #[arg(long, help = "Treat STATEMENT as the name of a procedure to CALL")]
    procedure: bool,
    #[arg(help = "SQL text or a path to a file containing it")]
    statement: String,
    #[arg(short = 'p', long = "param", help = "Parameter as type:value, e.g. int4:5")]
    params: Vec<String>,
}

impl Execute {
    pub async fn run(self) -> Result<(), Box<dyn Error>> {
        let kind = match self.procedure {
            true => CommandKind::Procedure,
            false => CommandKind::Text,
        };
        let command = build_command(self.statement, &self.params, kind)?;
        let (helper, _) = self.connection.connect().await?;
        let affected = helper.execute(&command).await;
        helper.close().await;
        println!("{}", affected?);
        Ok(())
    }
}

#[derive(Parser, Debug, Clone)]
#[command(about = "Run several statements in one transaction", long_about = None)]
#[must_use]
pub struct Batch {
    #[command(flatten)]
    connection: ConnectionArgs,
    #[arg(required = true, help = "SQL texts or paths to files containing them")]
    statements: Vec<String>,
}

impl Batch {
    pub async fn run(self) -> Result<(), Box<dyn Error>> {
        let commands = self
            .statements
            .into_iter()
            .map(|statement| read_statement(statement).map(Command::text))
            .collect::<Result<Vec<_>, _>>()?;
        let (helper, _) = self.connection.connect().await?;
        let affected = helper.execute_batch(&commands).await;
        helper.close().await;
        for rows in affected? {
            println!("{rows}");
        }
        Ok(())
    }
}
