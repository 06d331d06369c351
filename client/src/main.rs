use clap::Parser;
use client::input::ScriptedInput;
use client::presentation::HeadlessPresenter;
use client::transport::{resolve_server_addr, TcpClientTransport};
use client::{Client, ClientConfig};
use log::info;
use std::time::Instant;
use tokio::time::{interval, MissedTickBehavior};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Session loop ticks per second
    #[arg(short, long, default_value = "60")]
    tick_rate: u32,

    /// Remove every cube when the connection drops
    #[arg(long)]
    purge_on_disconnect: bool,

    /// Speed of the scripted local cube in units per second
    #[arg(long, default_value = "5.0")]
    speed: f32,
}

impl From<Args> for ClientConfig {
    fn from(args: Args) -> Self {
        ClientConfig {
            server_addr: args.server,
            tick_rate: args.tick_rate,
            purge_on_disconnect: args.purge_on_disconnect,
            speed: args.speed,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = ClientConfig::from(Args::parse());

    info!("Starting client...");
    info!("Connecting to: {}", config.server_addr);
    let addr = resolve_server_addr(&config.server_addr).await?;

    let transport = TcpClientTransport::connect(addr);
    let presenter = HeadlessPresenter::new(ScriptedInput::new(config.speed, 1.0));
    let mut client = Client::new(transport, presenter, &config);

    let mut ticker = interval(config.tick_duration());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                client.tick(Instant::now());
            }
            _ = &mut shutdown => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    client.disconnect();
    Ok(())
}
