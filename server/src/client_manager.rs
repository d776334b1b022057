//! Registry of connected players.
//!
//! Each connected player has an id, the peer address, and the sending half of
//! the channel drained by that connection's writer task. Frames queued for one
//! player are written in queue order. Removing a player drops the sender, which
//! ends the writer task and closes the socket.

use log::{info, warn};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// An encoded, padded frame shared between recipients.
pub type Frame = Arc<[u8]>;

/// A connected player
#[derive(Debug)]
pub struct Client {
    /// Id assigned by the server, never reused while it runs
    pub id: u32,
    pub addr: SocketAddr,
    pub connected_at: Instant,
    outbound: mpsc::UnboundedSender<Frame>,
}

impl Client {
    /// Creates a client record stamped with the current time.
    pub fn new(id: u32, addr: SocketAddr, outbound: mpsc::UnboundedSender<Frame>) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            outbound,
        }
    }

    /// Queues a frame for this client's writer task. Returns false once the
    /// writer has gone away.
    pub fn send(&self, frame: Frame) -> bool {
        self.outbound.send(frame).is_ok()
    }
}

/// Tracks connected players and hands out ids.
///
/// Ids start at 1 and increase for every accepted connection.
pub struct ClientManager {
    clients: HashMap<u32, Client>,
    next_client_id: u32,
    max_clients: usize,
}

impl ClientManager {
    /// Creates an empty registry accepting at most `max_clients` players.
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Registers a connection. Returns `None` when the server is full.
    pub fn add_client(
        &mut self,
        addr: SocketAddr,
        outbound: mpsc::UnboundedSender<Frame>,
    ) -> Option<u32> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients
            .insert(client_id, Client::new(client_id, addr, outbound));
        Some(client_id)
    }

    /// Removes a client, closing its outbound queue. Returns false if it was
    /// already gone.
    pub fn remove_client(&mut self, client_id: &u32) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!(
                "Client {} ({}) disconnected after {:.1}s",
                client.id,
                client.addr,
                client.connected_at.elapsed().as_secs_f32()
            );
            true
        } else {
            false
        }
    }

    /// Queues `frame` for `client_id`.
    pub fn send_to(&self, client_id: u32, frame: &Frame) -> bool {
        match self.clients.get(&client_id) {
            Some(client) => {
                let sent = client.send(Arc::clone(frame));
                if !sent {
                    warn!("Writer for client {} has stopped", client_id);
                }
                sent
            }
            None => false,
        }
    }

    /// Number of connected players.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether no players are connected.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
