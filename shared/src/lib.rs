//! Types and wire format shared by the sketchfall server and client.
//!
//! The protocol is a fixed-grammar text format: every frame starts with the
//! begin sentinel, carries a one-digit message tag and semicolon separated
//! fields, and ends with the end sentinel. See [`protocol`] for the grammar and
//! [`framing`] for reassembling frames from a byte stream.

pub mod framing;
pub mod protocol;

pub use framing::{write_message, FrameError, FrameReader};
pub use protocol::{
    classify, BodyPose, CodecError, FrameStatus, Message, MessageKind, NewBody, Pose,
    PositionSlots, PositionUpdate, Vertex, Zone,
};

use std::fmt;

/// Port the server listens on for new players.
pub const DEFAULT_PORT: u16 = 30001;
/// Number of levels shipped with the game; levels are numbered from 1.
pub const LEVEL_COUNT: u32 = 10;

/// Begin sentinel of every frame.
pub const BEGIN: &[u8; 3] = b"~!@";
/// End sentinel of every frame.
pub const END: &[u8; 3] = b"?`.";
/// Field separator.
pub const SEPARATOR: char = ';';
/// Byte offset of the message tag digit.
pub const TAG_INDEX: usize = 4;
/// Maximum size of one frame; frames are zero-padded to this size on the wire.
pub const MAX_FRAME: usize = 400;
/// Maximum chat text length in bytes.
pub const MAX_CHAT_LEN: usize = 140;
/// Highest body id a frame may reference.
pub const MAX_BODY_ID: u32 = 4096;
/// Angle reported for a slot that received no update this tick.
pub const NO_UPDATE_ANGLE: f32 = -3000.0;

/// Color a body is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    #[default]
    Red,
    Yellow,
    Blue,
    Green,
}

impl Color {
    /// Parses a color name. Unknown names fall back to red.
    pub fn from_name(name: &str) -> Self {
        match name {
            "yellow" => Color::Yellow,
            "blue" => Color::Blue,
            "green" => Color::Green,
            _ => Color::Red,
        }
    }

    /// Name used on the wire and in level files.
    pub fn name(self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Yellow => "yellow",
            Color::Blue => "blue",
            Color::Green => "green",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}
