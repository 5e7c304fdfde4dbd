//! Prints the current thermostat status as JSON.
//!
//! Configuration comes from the environment, see `ClientConfig`:
//!   MYICOMFORT_USERNAME=... MYICOMFORT_PASSWORD=... cargo run --example status [-- --log <path>]

use myicomfort::{ClientConfig, MessageLogMode};
use std::env;

#[tokio::main]
async fn main() -> myicomfort::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let log_path = args
        .iter()
        .position(|a| a == "--log")
        .and_then(|i| args.get(i + 1));

    let mut builder = ClientConfig::from_env()?.into_builder();
    if let Some(path) = log_path {
        println!("Logging requests/responses to {path}");
        builder = builder.message_log(MessageLogMode::Diffed, path);
    }

    let mut client = builder.connect().await?;
    if !client.is_connected() {
        eprintln!("Not connected; check credentials and system index");
        std::process::exit(1);
    }

    let report = client.export_status().await?;
    println!("{}", report.to_json(Some(4))?);
    Ok(())
}
