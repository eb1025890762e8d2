use anyhow::Result;
use clap::Parser;
use rustle_zabbix::cli::{
    failure, print_module_result, render, run_inventory, run_task, Command, RustleZabbixCli,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = RustleZabbixCli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    // stdout carries the JSON result
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting rustle-zabbix v{}", env!("CARGO_PKG_VERSION"));

    let outcome = match &cli.command {
        Command::Inventory(args) => match run_inventory(&cli, args).await {
            Ok(document) => {
                println!("{}", render(&document)?);
                Ok(())
            }
            Err(e) => Err(e),
        },
        task => match task.module() {
            Some((module, args)) => match run_task(&cli, module, &args.args).await {
                Ok(result) => {
                    print_module_result(&result)?;
                    Ok(())
                }
                Err(e) => {
                    println!("{}", render(&failure(&format!("{e:#}")))?);
                    Err(e)
                }
            },
            None => Ok(()),
        },
    };

    if let Err(e) = &outcome {
        error!("{:#}", e);
    }
    outcome
}
