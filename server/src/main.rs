use clap::Parser;
use log::info;
use server::auth::{AllowAll, GuestNames};
use server::network::{Server, ServerConfig};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Displacement applied per unit of requested movement
    #[arg(short, long, default_value = "5.0")]
    move_speed: f32,

    /// Maximum number of concurrently connected peers
    #[arg(short = 'c', long, default_value = "64")]
    max_clients: usize,

    /// Timeout for authorization and identity lookups, in milliseconds
    #[arg(long, default_value = "2000")]
    auth_timeout_ms: u64,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            bind_addr: format!("{}:{}", args.host, args.port),
            move_speed: args.move_speed,
            max_clients: args.max_clients,
            service_timeout: Duration::from_millis(args.auth_timeout_ms),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ServerConfig::from(args);
    info!(
        "Move speed {}, up to {} clients",
        config.move_speed, config.max_clients
    );

    let mut server = Server::bind(config, AllowAll, GuestNames).await?;

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully...");
            shutdown.shutdown();
        }
    });

    server.run().await?;

    Ok(())
}
