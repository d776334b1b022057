//! Connection to the game server.
//!
//! A receive task reads frames into the shared [`ClientWorld`] while the input
//! loop turns terminal lines into outgoing messages. Either side ending stops
//! the client.

use crate::display::describe;
use crate::game::ClientWorld;
use crate::input::{parse_command, Command};
use log::{debug, info, warn};
use shared::{write_message, FrameError, FrameReader};
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Errors that end the client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// A connected client and its mirrored world.
pub struct Client {
    stream: TcpStream,
    world: Arc<RwLock<ClientWorld>>,
}

impl Client {
    /// Connects to the server at `ip:port`. Connecting is joining.
    pub async fn connect(ip: &str, port: u16) -> Result<Self, ClientError> {
        let addr = format!("{}:{}", ip, port);
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|source| ClientError::Connect {
                addr: addr.clone(),
                source,
            })?;
        info!("Connected to {}", stream.peer_addr()?);

        Ok(Client {
            stream,
            world: Arc::new(RwLock::new(ClientWorld::new())),
        })
    }

    /// Handle on the mirrored world, shared with the receive task.
    pub fn world(&self) -> Arc<RwLock<ClientWorld>> {
        Arc::clone(&self.world)
    }

    /// Plays using commands typed on stdin.
    pub async fn run(self) -> Result<(), ClientError> {
        self.run_with_input(BufReader::new(tokio::io::stdin())).await
    }

    /// Plays using commands read line by line from `input`. Returns when the
    /// input ends, `/quit` is entered or the server goes away.
    pub async fn run_with_input<I>(self, input: I) -> Result<(), ClientError>
    where
        I: AsyncBufRead + Unpin,
    {
        let (read_half, mut write_half) = self.stream.into_split();
        let mut receiver = spawn_receiver(read_half, Arc::clone(&self.world));
        let mut lines = input.lines();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        debug!("Input closed");
                        break;
                    };
                    match parse_command(&line) {
                        Ok(Some(Command::Send(message))) => {
                            write_message(&mut write_half, &message).await?;
                        }
                        Ok(Some(Command::Quit)) => break,
                        Ok(None) => {}
                        Err(e) => warn!("{}", e),
                    }
                },

                finished = &mut receiver => {
                    return match finished {
                        Ok(result) => result.map_err(ClientError::from),
                        Err(e) => Err(io::Error::new(io::ErrorKind::Other, e).into()),
                    };
                },
            }
        }

        receiver.abort();
        let _ = write_half.shutdown().await;
        info!("Leaving the game");
        Ok(())
    }
}

/// Spawns the task that applies server messages to `world`. It ends cleanly
/// when the server closes the connection.
fn spawn_receiver(
    read_half: OwnedReadHalf,
    world: Arc<RwLock<ClientWorld>>,
) -> JoinHandle<Result<(), FrameError>> {
    tokio::spawn(async move {
        let mut reader = FrameReader::new(read_half);

        loop {
            match reader.read_message().await {
                Ok(Some(message)) => {
                    let mut world = world.write().await;
                    if world.apply(message) {
                        info!("\n{}", describe(&world));
                    }
                }
                Ok(None) => {
                    info!("Server closed the connection");
                    return Ok(());
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!("{}", e),
            }
        }
    })
}
