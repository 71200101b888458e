//! Generic HTTP Response Simulator - CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use generic_sim::{Dispatcher, RequestLog, RouteTable, Server};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "generic-sim",
    about = "Configuration-driven HTTP response simulator",
    version
)]
struct Args {
    /// Path to the responses document
    #[arg(short, long, default_value = "/etc/generic_sim/responses.yml")]
    config: PathBuf,

    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// File that receives every request body
    #[arg(short, long, default_value = "/tmp/generic_sim/output.log")]
    request_log: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: Level,

    /// Print a sample responses document and exit
    #[arg(long)]
    print_config: bool,

    /// Validate the responses document and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if args.print_config {
        let sample_config = include_str!("../demos/responses.yml");
        println!("{}", sample_config);
        return Ok(());
    }

    // Any configuration error ends the process before the listener binds
    info!(path = %args.config.display(), "Loading responses");
    let table = RouteTable::from_file(&args.config)?;

    if args.validate {
        let mut routes: Vec<_> = table
            .routes()
            .map(|(path, def)| format!("{} /{} -> {}", def.verb(), path, def.status().as_u16()))
            .collect();
        routes.sort();
        for route in &routes {
            println!("{}", route);
        }
        println!("Configuration is valid ({} routes defined)", table.len());
        return Ok(());
    }

    let request_log = RequestLog::open(&args.request_log).with_context(|| {
        format!("Failed to open request log {}", args.request_log.display())
    })?;

    let dispatcher = Dispatcher::new(Arc::new(table), Arc::new(request_log));
    let server = Server::bind(args.listen, dispatcher).await?;
    server.run().await?;

    info!("Simulator stopped");
    Ok(())
}
