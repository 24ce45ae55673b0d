#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Proximity API server binary.
//!
//! Configuration comes from the environment (see [`proximity_server::config`]).
//! Without a subcommand the server prompts for its bind address and port.

use clap::{Parser, Subcommand};
use proximity_server::config::ServerConfig;

#[derive(Parser)]
#[command(name = "proximity_server", about = "Address proximity API server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server without prompting
    Serve {
        /// Address to bind to (overrides `BIND_ADDR`)
        #[arg(long)]
        bind_addr: Option<String>,

        /// Port to bind to (overrides `PORT`)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let cli = Cli::parse();
    let mut config = ServerConfig::from_env()?;

    match cli.command {
        Some(Commands::Serve { bind_addr, port }) => {
            if let Some(bind_addr) = bind_addr {
                config.bind_addr = bind_addr;
            }
            if let Some(port) = port {
                config.port = port;
            }
            proximity_server::run_server(config).await?;
        }
        None => proximity_server::interactive::run(config).await?,
    }

    Ok(())
}
