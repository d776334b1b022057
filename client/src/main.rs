use clap::Parser;
use client::network::{Client, ClientError};
use log::{error, info};
use shared::DEFAULT_PORT;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Sketchfall terminal client")]
struct Args {
    /// Address of the game server
    #[clap(value_name = "SERVER_IP")]
    server_ip: String,
    /// Server port
    #[clap(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info to see the world as it changes");
    }

    let args = Args::parse();

    let client = match Client::connect(&args.server_ip, args.port).await {
        Ok(client) => client,
        Err(e @ ClientError::Connect { .. }) => {
            error!("{}", e);
            return ExitCode::from(3);
        }
        Err(e) => {
            error!("Failed to start client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Commands: /shape <color> <mass> x,y x,y ..., /level <n>, /quit; anything else is chat");

    match client.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Disconnected: {}", e);
            ExitCode::FAILURE
        }
    }
}
