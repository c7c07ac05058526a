mod server;

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use restguard::config::load_config;
use restguard::logs;

use crate::server::config::ServerConfig;
use crate::server::RestfulServer;

/// Example server protected by restguard.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct ServerArgs {
    /// The config file path.
    #[arg(long, short, default_value = "config/restguard.toml")]
    pub config: PathBuf,

    /// Print the server configuration (JSON) and exit.
    #[arg(long)]
    pub print_config: bool,

    /// Override the log level of the config file.
    #[arg(long, short)]
    pub level: Option<String>,
}

async fn run(args: ServerArgs) -> Result<()> {
    let cfg: ServerConfig = load_config(&args.config)?;

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&cfg)?);
        return Ok(());
    }

    let level = args.level.as_deref().unwrap_or(&cfg.log_level);
    logs::init(level)?;

    let server = RestfulServer::new(&cfg)?;
    server.run().await.context("run restful server")?;

    info!("Server exited by user");
    Ok(())
}

#[actix_web::main]
async fn main() {
    let args = ServerArgs::parse();
    if let Err(e) = run(args).await {
        error!("Error: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
