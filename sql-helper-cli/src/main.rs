mod commands;
mod config;
mod utils;

use std::error::Error;

use clap::*;
use commands::{
    escape::Escape,
    execute::{Batch, Execute},
    init::Initialize,
    query::Query,
};

#[derive(Parser)]
#[command(name = "sql-helper", bin_name = "sql-helper")]
enum Command {
    Init(Initialize),
    Execute(Execute),
    Batch(Batch),
    Query(Query),
    Escape(Escape),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let command = Command::parse();
    match command {
        Command::Init(args) => args.run(),
        Command::Execute(args) => args.run().await,
        Command::Batch(args) => args.run().await,
        Command::Query(args) => args.run().await,
        Command::Escape(args) => args.run(),
    }
}
