//! Server network layer: accepts players, moves frames between sockets and the
//! session, and drives the simulation tick.
//!
//! One task owns the [`Session`] and the [`ClientManager`]. Every connection
//! gets a reader task that turns bytes into [`ServerMessage`]s and a writer
//! task that drains the connection's frame queue, so frames reach each client
//! in the order the session produced them.

use crate::client_manager::{ClientManager, Frame};
use crate::config::ServerConfig;
use crate::session::{Outbound, Session, SessionError};
use log::{debug, error, info, warn};
use shared::{CodecError, FrameError, FrameReader, Message};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, MissedTickBehavior};

/// Messages sent from connection tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    MessageReceived { client_id: u32, message: Message },
    BogusFrame { client_id: u32, discarded: usize },
    Undecodable { client_id: u32, error: CodecError },
    ClientClosed { client_id: u32 },
}

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// The game server: listener, connected players and the session they share.
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
    clients: ClientManager,
    session: Session,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    /// Binds the listener and loads the first level.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let session = Session::new(config.level_library(), config.pacing)?;
        info!("Server listening on {}", addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            clients: ClientManager::new(config.max_clients),
            config,
            session,
            server_tx,
            server_rx,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs until the last player leaves. Fails only when a level cannot be
    /// loaded.
    pub async fn run(mut self) -> Result<(), ServerError> {
        let mut tick_interval = interval(self.config.tick_duration());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Waiting for players");

        while self.session.should_run() {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => self.handle_connection(stream, addr).await,
                        Err(e) => error!("Failed to accept connection: {}", e),
                    }
                },

                message = self.server_rx.recv() => {
                    if let Some(message) = message {
                        self.handle_server_message(message).await?;
                    }
                },

                _ = tick_interval.tick(), if self.session.is_started() => {
                    let outbound = self.session.on_tick()?;
                    self.deliver(outbound).await;

                    let timestep = self.session.world().timestep();
                    if timestep % 600 == 0 {
                        debug!(
                            "Step {}: level {}, {} players",
                            timestep,
                            self.session.level(),
                            self.clients.len()
                        );
                    }
                },

                _ = sleep(self.config.idle_timeout), if !self.session.is_started() => {},
            }
        }

        info!("Last player left, shutting down");
        Ok(())
    }

    async fn handle_connection(&mut self, stream: TcpStream, addr: SocketAddr) {
        let (read_half, write_half) = stream.into_split();
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();

        let Some(client_id) = self.clients.add_client(addr, frame_tx) else {
            warn!("Server full, refusing connection from {}", addr);
            return;
        };

        spawn_connection_writer(client_id, write_half, frame_rx);
        spawn_connection_reader(client_id, read_half, self.server_tx.clone());

        let outbound = self.session.player_joined(client_id);
        self.deliver(outbound).await;
    }

    async fn handle_server_message(&mut self, message: ServerMessage) -> Result<(), ServerError> {
        match message {
            ServerMessage::MessageReceived { client_id, message } => {
                match self.session.handle_message(client_id, message) {
                    Ok(outbound) => self.deliver(outbound).await,
                    Err(e) if e.is_fatal() => return Err(e.into()),
                    Err(e) => warn!("Request from client {} rejected: {}", client_id, e),
                }
            }
            ServerMessage::BogusFrame {
                client_id,
                discarded,
            } => {
                warn!(
                    "Discarded {} bytes of bogus data from client {}",
                    discarded, client_id
                );
            }
            ServerMessage::Undecodable { client_id, error } => {
                warn!("Undecodable frame from client {}: {}", client_id, error);
            }
            ServerMessage::ClientClosed { client_id } => {
                if self.clients.remove_client(&client_id) {
                    self.session.player_left(client_id);
                }
            }
        }
        Ok(())
    }

    /// Encodes each message once and queues it for its recipients, pausing
    /// where the message asks for it.
    async fn deliver(&mut self, outbound: Vec<Outbound>) {
        for out in outbound {
            match out.message.encode_padded() {
                Ok(bytes) => {
                    let frame: Frame = Arc::from(bytes);
                    for client_id in self.session.resolve(&out.recipients) {
                        self.clients.send_to(client_id, &frame);
                    }
                }
                Err(e) => warn!("Dropping {} message: {}", out.message.kind(), e),
            }

            if !out.pause_after.is_zero() {
                sleep(out.pause_after).await;
            }
        }
    }
}

/// Spawns the task that turns a connection's bytes into server messages
fn spawn_connection_reader(
    client_id: u32,
    read_half: OwnedReadHalf,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
) {
    tokio::spawn(async move {
        let mut reader = FrameReader::new(read_half);

        loop {
            let (event, last) = match reader.read_message().await {
                Ok(Some(message)) => (
                    ServerMessage::MessageReceived { client_id, message },
                    false,
                ),
                Ok(None) => (ServerMessage::ClientClosed { client_id }, true),
                Err(FrameError::Bogus { discarded }) => (
                    ServerMessage::BogusFrame {
                        client_id,
                        discarded,
                    },
                    false,
                ),
                Err(FrameError::Codec(error)) => {
                    (ServerMessage::Undecodable { client_id, error }, false)
                }
                Err(e) => {
                    debug!("Connection of client {} ended: {}", client_id, e);
                    (ServerMessage::ClientClosed { client_id }, true)
                }
            };

            if let Err(e) = server_tx.send(event) {
                error!("Failed to send message to main loop: {}", e);
                break;
            }
            if last {
                break;
            }
        }
    });
}

/// Spawns the task that writes queued frames to a connection
fn spawn_connection_writer(
    client_id: u32,
    mut write_half: OwnedWriteHalf,
    mut frame_rx: mpsc::UnboundedReceiver<Frame>,
) {
    tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            if let Err(e) = write_half.write_all(&frame).await {
                warn!("Failed to send to client {}: {}", client_id, e);
                break;
            }
        }
        let _ = write_half.shutdown().await;
    });
}
