use clap::Parser;
use log::info;
use server::transport::TcpServerTransport;
use server::{Server, ServerConfig};
use std::time::Instant;
use tokio::time::{interval, MissedTickBehavior};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Session loop ticks per second
    #[arg(short, long, default_value = "60")]
    tick_rate: u32,

    /// Apply client position/colour updates to the authoritative state
    #[arg(long)]
    apply_client_updates: bool,

    /// Seed for spawn positions and colours
    #[arg(long)]
    seed: Option<u64>,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            host: args.host,
            port: args.port,
            tick_rate: args.tick_rate,
            apply_client_updates: args.apply_client_updates,
            seed: args.seed,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = ServerConfig::from(Args::parse());

    info!("Starting server...");
    let transport = TcpServerTransport::bind(&config.bind_address()).await?;
    let mut server = Server::new(transport, &config, Instant::now());

    let mut ticker = interval(config.tick_duration());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("Server started at {} Hz", config.tick_rate);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                server.tick(Instant::now());
            }
            _ = &mut shutdown => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    server.shutdown();
    Ok(())
}
