//! Session state: the live world, the current level and attempt count, and
//! who is connected.
//!
//! Handlers never touch sockets. They return [`Outbound`] messages, each with a
//! recipient rule and a pause to observe after delivery, and the network layer
//! delivers them in order.

use crate::level::{CollisionTag, LevelError, LevelLibrary};
use crate::physics::{World, PLAYER_FRICTION};
use log::{debug, info, warn};
use shared::{Message, NewBody, PositionUpdate, LEVEL_COUNT};
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;

/// Accepted bodies per level before the level is lost.
pub const MAX_ATTEMPTS: u32 = 3;

/// Errors from session handlers.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to load level: {0}")]
    Level(#[from] LevelError),
    #[error("level {0} does not exist")]
    LevelOutOfRange(u32),
}

impl SessionError {
    /// Whether the server can keep running after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::Level(_))
    }
}

/// Which connected players receive a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipients {
    All,
    AllExcept(u32),
    Only(u32),
}

/// A message to deliver, and how long to pause after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub recipients: Recipients,
    pub message: Message,
    pub pause_after: Duration,
}

/// The game shared by every connected player.
pub struct Session {
    library: LevelLibrary,
    world: World,
    level: u32,
    attempt_number: u32,
    clients: BTreeSet<u32>,
    started: bool,
    pacing: Duration,
}

impl Session {
    /// Starts a session on level 1.
    pub fn new(library: LevelLibrary, pacing: Duration) -> Result<Self, SessionError> {
        let world = World::load(&library, 1)?;
        Ok(Self {
            library,
            world,
            level: 1,
            attempt_number: 0,
            clients: BTreeSet::new(),
            started: false,
            pacing,
        })
    }

    /// Current level, 1 through 10.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Bodies accepted on the current level.
    pub fn attempt_number(&self) -> u32 {
        self.attempt_number
    }

    /// Whether anyone has joined yet.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Players currently connected.
    pub fn player_count(&self) -> usize {
        self.clients.len()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// The server keeps going until the first player arrives and the last one leaves.
    pub fn should_run(&self) -> bool {
        !self.started || !self.clients.is_empty()
    }

    /// Connected ids matching `recipients`, ascending.
    pub fn resolve(&self, recipients: &Recipients) -> Vec<u32> {
        match *recipients {
            Recipients::All => self.clients.iter().copied().collect(),
            Recipients::AllExcept(excluded) => self
                .clients
                .iter()
                .copied()
                .filter(|&id| id != excluded)
                .collect(),
            Recipients::Only(id) => self.clients.get(&id).copied().into_iter().collect(),
        }
    }

    /// Registers a player and returns the level snapshot addressed to them.
    pub fn player_joined(&mut self, client_id: u32) -> Vec<Outbound> {
        self.clients.insert(client_id);
        self.started = true;
        info!(
            "Player {} joined level {} ({} connected)",
            client_id,
            self.level,
            self.clients.len()
        );
        self.snapshot(Recipients::Only(client_id))
    }

    pub fn player_left(&mut self, client_id: u32) {
        if self.clients.remove(&client_id) {
            info!(
                "Player {} left ({} connected)",
                client_id,
                self.clients.len()
            );
        }
    }

    /// Dispatches a message from `sender` to its handler.
    pub fn handle_message(
        &mut self,
        sender: u32,
        message: Message,
    ) -> Result<Vec<Outbound>, SessionError> {
        match message {
            Message::NewBody(body) => self.on_new_body(sender, body),
            Message::Chat { text } => Ok(self.on_chat(sender, text)),
            Message::LevelSwitch { level, .. } => {
                info!("Player {} requested level {}", sender, level);
                self.switch_level(level, false)
            }
            other => {
                warn!(
                    "Ignoring {} message from player {}",
                    other.kind(),
                    sender
                );
                Ok(Vec::new())
            }
        }
    }

    /// Relays chat to everyone but the sender.
    pub fn on_chat(&mut self, sender: u32, text: String) -> Vec<Outbound> {
        debug!("Chat from {}: {}", sender, text);
        vec![Outbound {
            recipients: Recipients::AllExcept(sender),
            message: Message::Chat { text },
            pause_after: self.pacing,
        }]
    }

    /// Adds a drawn body, announces it and counts the attempt. A body the
    /// world refuses is dropped without counting.
    pub fn on_new_body(
        &mut self,
        sender: u32,
        body: NewBody,
    ) -> Result<Vec<Outbound>, SessionError> {
        let id = match self.world.create_body(
            &body.vertices,
            body.color,
            CollisionTag::Player,
            PLAYER_FRICTION,
            body.mass,
        ) {
            Ok(id) => id,
            Err(e) => {
                warn!("Rejected body from player {}: {}", sender, e);
                return Ok(Vec::new());
            }
        };

        let mut outbound = Vec::new();
        if let Some(created) = self.world.body_message(id) {
            outbound.push(Outbound {
                recipients: Recipients::All,
                message: Message::NewBody(created),
                pause_after: self.pacing * 5,
            });
        }

        self.attempt_number += 1;
        info!(
            "Player {} placed body {} (attempt {}/{})",
            sender, id, self.attempt_number, MAX_ATTEMPTS
        );

        if self.attempt_number >= MAX_ATTEMPTS {
            self.world.mark_lost();
            info!("Attempts exhausted on level {}", self.level);
            outbound.extend(self.switch_level(self.level, false)?);
        }
        Ok(outbound)
    }

    /// Steps the world and reports every body's pose. Does nothing until the
    /// game has started or while nobody is connected.
    pub fn on_tick(&mut self) -> Result<Vec<Outbound>, SessionError> {
        if !self.started || self.clients.is_empty() {
            return Ok(Vec::new());
        }

        let outcome = self.world.step();
        let mut outbound: Vec<Outbound> = PositionUpdate::split_into_frames(self.world.poses())
            .into_iter()
            .map(|update| Outbound {
                recipients: Recipients::All,
                message: Message::PositionUpdate(update),
                pause_after: Duration::ZERO,
            })
            .collect();

        if outcome.newly_won {
            info!("Level {} won", self.level);
            if let Some(last) = outbound.last_mut() {
                last.pause_after += self.pacing * 2;
            }
            outbound.extend(self.switch_level(self.level, true)?);
        }
        Ok(outbound)
    }

    /// Replaces the world. A win advances to the next level, wrapping after
    /// the last; otherwise `level` is loaded, and level 0 restarts the
    /// current one.
    pub fn switch_level(&mut self, level: u32, win: bool) -> Result<Vec<Outbound>, SessionError> {
        let next = if win {
            self.level % LEVEL_COUNT + 1
        } else if level == 0 {
            self.level
        } else if level <= LEVEL_COUNT {
            level
        } else {
            return Err(SessionError::LevelOutOfRange(level));
        };

        let world = World::load(&self.library, next)?;
        let report = self.world.teardown();
        debug!(
            "Released {} entries of level {} (status {:?})",
            report.order.len(),
            self.level,
            self.world.status()
        );
        self.world = world;
        self.level = next;
        self.attempt_number = 0;
        info!("Switched to level {}", next);

        let mut outbound = vec![Outbound {
            recipients: Recipients::All,
            message: Message::LevelSwitch {
                level: next,
                attempt_number: 0,
            },
            pause_after: self.pacing * 2,
        }];
        outbound.extend(self.snapshot(Recipients::All));
        Ok(outbound)
    }

    /// Every body of the current world, then the drawing zone.
    fn snapshot(&self, recipients: Recipients) -> Vec<Outbound> {
        let mut outbound: Vec<Outbound> = self
            .world
            .snapshot_bodies()
            .into_iter()
            .map(|body| Outbound {
                recipients,
                message: Message::NewBody(body),
                pause_after: self.pacing * 5,
            })
            .collect();

        if let Some(zone) = self.world.zone() {
            outbound.push(Outbound {
                recipients,
                message: Message::Zone(zone),
                pause_after: Duration::ZERO,
            });
        }
        outbound
    }
}
