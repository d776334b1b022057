//! The client's mirror of the server world.

use log::{debug, warn};
use shared::{Color, Message, NewBody, Pose, PositionSlots, PositionUpdate, Vertex, Zone};
use std::collections::BTreeMap;

/// Attempts per level; a level switch reporting this many means the level was lost.
pub const MAX_ATTEMPTS: u32 = 3;
/// Banner shown after a level was lost.
pub const LOSE_BANNER: &str = "You Lose!";

/// A body as the client knows it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientBody {
    pub id: u32,
    pub color: Color,
    pub mass: f32,
    /// Outline in body coordinates.
    pub outline: Vec<Vertex>,
    pub pose: Pose,
}

impl ClientBody {
    /// Outline transformed by the current pose.
    pub fn world_outline(&self) -> Vec<Vertex> {
        let (sin, cos) = self.pose.angle.sin_cos();
        self.outline
            .iter()
            .map(|v| {
                Vertex::new(
                    self.pose.x + v.x * cos - v.y * sin,
                    self.pose.y + v.x * sin + v.y * cos,
                )
            })
            .collect()
    }
}

/// The client's copy of the current level.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientWorld {
    pub level: u32,
    pub attempt_number: u32,
    bodies: BTreeMap<u32, ClientBody>,
    zone: Option<Zone>,
    last_chat: Option<String>,
    banner: Option<String>,
}

impl Default for ClientWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientWorld {
    /// An empty world on level 1.
    pub fn new() -> Self {
        Self {
            level: 1,
            attempt_number: 0,
            bodies: BTreeMap::new(),
            zone: None,
            last_chat: None,
            banner: None,
        }
    }

    /// Applies one message from the server. Returns true when something other
    /// than body poses changed.
    pub fn apply(&mut self, message: Message) -> bool {
        match message {
            Message::NewBody(body) => self.insert_body(body),
            Message::PositionUpdate(update) => {
                self.apply_positions(&update);
                false
            }
            Message::Chat { text } => {
                self.last_chat = Some(text);
                true
            }
            Message::Zone(zone) => {
                self.zone = Some(zone);
                true
            }
            Message::LevelSwitch {
                level,
                attempt_number,
            } => {
                self.banner = (attempt_number >= MAX_ATTEMPTS).then(|| LOSE_BANNER.to_string());
                self.level = level;
                self.attempt_number = attempt_number;
                self.bodies.clear();
                self.zone = None;
                true
            }
        }
    }

    fn insert_body(&mut self, body: NewBody) -> bool {
        let Ok(id) = u32::try_from(body.body_id) else {
            warn!("Ignoring body without a server id");
            return false;
        };

        let pose = self
            .bodies
            .get(&id)
            .map(|existing| existing.pose)
            .unwrap_or(Pose {
                x: 0.0,
                y: 0.0,
                angle: 0.0,
            });
        self.bodies.insert(
            id,
            ClientBody {
                id,
                color: body.color,
                mass: body.mass,
                outline: body.vertices,
                pose,
            },
        );
        true
    }

    fn apply_positions(&mut self, update: &PositionUpdate) {
        let slots = PositionSlots::from_update(update);
        for (id, pose) in slots.iter() {
            match self.bodies.get_mut(&id) {
                Some(body) => body.pose = pose,
                None => debug!("Position for unknown body {}", id),
            }
        }
    }

    pub fn body(&self, id: u32) -> Option<&ClientBody> {
        self.bodies.get(&id)
    }

    /// Known bodies in id order.
    pub fn bodies(&self) -> impl Iterator<Item = &ClientBody> {
        self.bodies.values()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn zone(&self) -> Option<Zone> {
        self.zone
    }

    /// Most recent chat line from another player.
    pub fn last_chat(&self) -> Option<&str> {
        self.last_chat.as_deref()
    }

    /// Banner to show over the level, if any.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }
}
