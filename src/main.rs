// src/main.rs

//! Command-line client: connects to an I++ server, runs a sequence of
//! commands and prints what they return.

use anyhow::{Context, Result, anyhow};
use ippdme::client::Client;
use ippdme::config::Config;
use std::env;
use tracing::{error, info};
use tracing_subscriber::filter::EnvFilter;

const USAGE: &str =
    "Usage: ippdme [--config path] [--host host] [--port port] [--session] [command ...]";

#[derive(Debug, Default)]
struct Args {
    config_path: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    session: bool,
    commands: Vec<String>,
}

fn parse_args(raw: &[String]) -> Result<Args> {
    let mut args = Args::default();
    let mut iter = raw.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().ok_or_else(|| anyhow!("--config flag requires a value"))?;
                args.config_path = Some(path.clone());
            }
            "--host" => {
                let host = iter.next().ok_or_else(|| anyhow!("--host flag requires a value"))?;
                args.host = Some(host.clone());
            }
            "--port" => {
                let port = iter.next().ok_or_else(|| anyhow!("--port flag requires a value"))?;
                args.port = Some(
                    port.parse::<u16>()
                        .with_context(|| format!("Invalid port number: {port}"))?,
                );
            }
            "--session" => args.session = true,
            flag if flag.starts_with("--") => return Err(anyhow!("Unknown flag {flag}")),
            command => args.commands.push(command.to_string()),
        }
    }
    if args.commands.is_empty() {
        args.commands.push("GetDMEVersion()".to_string());
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> Result<()> {
    const VERSION: &str = env!("IPPDME_BUILD_INFO");

    let raw: Vec<String> = env::args().skip(1).collect();
    if raw.iter().any(|a| a == "--version") {
        println!("ippdme version {VERSION}");
        return Ok(());
    }
    if raw.iter().any(|a| a == "--help") {
        println!("{USAGE}");
        return Ok(());
    }

    let args = match parse_args(&raw) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            std::process::exit(2);
        }
    };

    let mut config = match &args.config_path {
        Some(path) => match Config::from_file(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Failed to load configuration from \"{path}\": {e:#}");
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };
    if let Some(host) = args.host.clone() {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .compact()
        .with_ansi(true)
        .init();

    if let Err(e) = run(config, &args).await {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(config: Config, args: &Args) -> Result<()> {
    info!("ippdme {} connecting to {}", env!("IPPDME_BUILD_INFO"), config.address());
    let client = Client::connect(config).await?;

    if args.session {
        client.start_session().await?.on_complete().await?;
    }

    let result = client.run_sequence(&args.commands).await;
    if let Ok(done) = &result {
        for transaction in done {
            for line in transaction.data_payloads() {
                println!("{line}");
            }
        }
    }

    if args.session && client.is_connected() {
        client.end_session().await?.on_complete().await?;
    }
    client.disconnect().await;

    result.map(|_| ()).map_err(Into::into)
}
