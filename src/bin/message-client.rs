//! message-client: asks a message server for messages
//!
//! Without `--index` the client runs interactively, prompting for a message
//! number and whether to close the connection after each response. With
//! `--index` it sends that single request and exits.

use clap::Parser;
use message_lookup::client::{render, run_console};
use message_lookup::config::ClientArgs;
use message_lookup::{Client, Request};
use std::process::ExitCode;
use tokio::io::BufReader;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = ClientArgs::parse();

    // Log to stderr so the console stays readable
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Client error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: ClientArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut client = Client::connect(args.server.as_str()).await?;
    debug!(server = %args.server, "Connection established");

    if let Some(index) = args.index {
        let response = client.request(Request::new(index, args.close)).await?;
        println!("{}", render(&response));
        return Ok(if response.is_ok() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    println!("Connected to message server.");
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    run_console(&mut client, stdin, &mut stdout).await?;
    println!("Client finished.");

    Ok(ExitCode::SUCCESS)
}
