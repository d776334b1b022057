use clap::Parser;
use log::error;
use server::config::ServerConfig;
use server::network::Server;
use shared::DEFAULT_PORT;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Sketchfall game server")]
struct Args {
    /// Address to bind to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
    /// Port to listen on for new players
    #[clap(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Directory holding level1.lvl through level10.lvl
    #[clap(short, long, default_value = "levels")]
    levels_dir: PathBuf,
    /// Simulation steps per second
    #[clap(short, long, default_value = "60")]
    tick_rate: u32,
    /// Pause unit in milliseconds inserted after broadcasts
    #[clap(long, default_value = "10")]
    pacing_ms: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();
    let config = ServerConfig {
        host: args.host,
        port: args.port,
        levels_dir: args.levels_dir,
        tick_rate: args.tick_rate,
        pacing: Duration::from_millis(args.pacing_ms),
        ..Default::default()
    };

    let server = match Server::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to start server: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match server.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}
