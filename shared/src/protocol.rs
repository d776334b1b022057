//! Text wire codec.
//!
//! A frame looks like `~!@;<tag>;<field>;<field>;...;?`.`: the begin sentinel,
//! a separator, a single tag digit at [`TAG_INDEX`], and then every field
//! terminated by a separator, closed by the end sentinel. Frames never exceed
//! [`MAX_FRAME`] bytes and are zero-padded to exactly that size on the wire.

use crate::{
    Color, BEGIN, END, MAX_BODY_ID, MAX_CHAT_LEN, MAX_FRAME, NO_UPDATE_ANGLE, SEPARATOR,
    TAG_INDEX,
};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Bytes before the first field: begin sentinel, separator, tag, separator.
const HEADER_LEN: usize = TAG_INDEX + 2;

/// Why a frame could not be encoded or decoded.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    #[error("frame does not start with the begin sentinel")]
    MissingBegin,
    #[error("expected separator at byte {at}")]
    MissingSeparator { at: usize },
    #[error("frame does not end with the end sentinel")]
    MissingEnd,
    #[error("unknown message tag {0:?}")]
    UnknownTag(char),
    #[error("{kind} expects {expected} fields, found {found}")]
    Arity {
        kind: MessageKind,
        expected: usize,
        found: usize,
    },
    #[error("field {field:?} expects {expected} comma separated values, found {found}")]
    Components {
        field: String,
        expected: usize,
        found: usize,
    },
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
    #[error("frame text is not valid UTF-8")]
    InvalidUtf8,
    #[error("frame of {len} bytes exceeds the {MAX_FRAME} byte limit")]
    FrameTooLarge { len: usize },
    #[error("chat text of {len} bytes exceeds the {MAX_CHAT_LEN} byte limit")]
    ChatTooLong { len: usize },
    #[error("chat text contains a separator or sentinel")]
    ChatInvalid,
    #[error("body id {0} is out of range")]
    BodyIdOutOfRange(i64),
}

/// Result of inspecting a receive buffer for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// The buffer cannot be the start of a frame.
    Bogus,
    /// More bytes are needed.
    Incomplete,
    /// A full frame of the given length (end sentinel included) is at the start.
    Complete(usize),
}

/// Inspects `buffer` for a frame starting at its first byte.
pub fn classify(buffer: &[u8]) -> FrameStatus {
    let prefix = buffer.len().min(BEGIN.len());
    if buffer[..prefix] != BEGIN[..prefix] {
        return FrameStatus::Bogus;
    }
    if buffer.len() <= TAG_INDEX {
        return FrameStatus::Incomplete;
    }

    buffer[TAG_INDEX..]
        .windows(END.len())
        .position(|window| window == END)
        .map(|offset| FrameStatus::Complete(TAG_INDEX + offset + END.len()))
        .unwrap_or(FrameStatus::Incomplete)
}

/// Message type, carried as the tag digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    NewBody,
    PositionUpdate,
    Chat,
    Zone,
    LevelSwitch,
}

impl MessageKind {
    /// The ASCII tag digit.
    pub fn tag(self) -> u8 {
        match self {
            MessageKind::NewBody => b'1',
            MessageKind::PositionUpdate => b'2',
            MessageKind::Chat => b'3',
            MessageKind::Zone => b'4',
            MessageKind::LevelSwitch => b'5',
        }
    }

    /// Kind for an ASCII tag digit.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'1' => Some(MessageKind::NewBody),
            b'2' => Some(MessageKind::PositionUpdate),
            b'3' => Some(MessageKind::Chat),
            b'4' => Some(MessageKind::Zone),
            b'5' => Some(MessageKind::LevelSwitch),
            _ => None,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageKind::NewBody => "NEW_BODY",
            MessageKind::PositionUpdate => "POSITION",
            MessageKind::Chat => "CHAT",
            MessageKind::Zone => "ZONE",
            MessageKind::LevelSwitch => "LEVEL",
        };
        f.write_str(name)
    }
}

/// A point in world or body coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
}

impl Vertex {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A body announcement. Clients send `body_id == -1` to ask the server for an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBody {
    pub body_id: i32,
    pub color: Color,
    pub mass: f32,
    pub vertices: Vec<Vertex>,
}

/// Position and angle of one body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyPose {
    pub body_id: u32,
    pub angle: f32,
    pub x: f32,
    pub y: f32,
}

/// Poses of some or all bodies after a step.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PositionUpdate {
    pub entries: Vec<BodyPose>,
}

impl PositionUpdate {
    /// Packs poses into as few updates as fit within [`MAX_FRAME`] each.
    pub fn split_into_frames(entries: impl IntoIterator<Item = BodyPose>) -> Vec<PositionUpdate> {
        let budget = MAX_FRAME - HEADER_LEN - END.len();
        let mut updates = Vec::new();
        let mut current = PositionUpdate::default();
        let mut used = 0;

        for pose in entries {
            let len = encode_pose(&pose).len() + 1;
            if used + len > budget && !current.entries.is_empty() {
                updates.push(std::mem::take(&mut current));
                used = 0;
            }
            used += len;
            current.entries.push(pose);
        }

        if !current.entries.is_empty() || updates.is_empty() {
            updates.push(current);
        }
        updates
    }
}

/// The rectangle in which a player may draw.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Zone {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    NewBody(NewBody),
    PositionUpdate(PositionUpdate),
    Chat { text: String },
    Zone(Zone),
    LevelSwitch { level: u32, attempt_number: u32 },
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::NewBody(_) => MessageKind::NewBody,
            Message::PositionUpdate(_) => MessageKind::PositionUpdate,
            Message::Chat { .. } => MessageKind::Chat,
            Message::Zone(_) => MessageKind::Zone,
            Message::LevelSwitch { .. } => MessageKind::LevelSwitch,
        }
    }

    /// Encodes the message as one frame, without padding.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut fields: Vec<String> = Vec::new();

        match self {
            Message::NewBody(body) => {
                fields.push(body.body_id.to_string());
                fields.push(body.color.name().to_string());
                fields.push(format!("{:.3}", body.mass));
                fields.push(body.vertices.len().to_string());
                fields.extend(
                    body.vertices
                        .iter()
                        .map(|v| format!("{:.3},{:.3}", v.x, v.y)),
                );
            }
            Message::PositionUpdate(update) => {
                fields.extend(update.entries.iter().map(encode_pose));
            }
            Message::Chat { text } => {
                validate_chat(text)?;
                fields.push(text.clone());
            }
            Message::Zone(zone) => {
                fields.push(format!(
                    "{:.3},{:.3},{:.3},{:.3}",
                    zone.x1, zone.y1, zone.x2, zone.y2
                ));
            }
            Message::LevelSwitch {
                level,
                attempt_number,
            } => {
                fields.push(format!("{},{}", level, attempt_number));
            }
        }

        let mut frame = Vec::with_capacity(MAX_FRAME);
        frame.extend_from_slice(BEGIN);
        frame.push(SEPARATOR as u8);
        frame.push(self.kind().tag());
        frame.push(SEPARATOR as u8);
        for field in &fields {
            frame.extend_from_slice(field.as_bytes());
            frame.push(SEPARATOR as u8);
        }
        frame.extend_from_slice(END);

        if frame.len() > MAX_FRAME {
            return Err(CodecError::FrameTooLarge { len: frame.len() });
        }
        Ok(frame)
    }

    /// Encodes the message zero-padded to exactly [`MAX_FRAME`] bytes.
    pub fn encode_padded(&self) -> Result<Vec<u8>, CodecError> {
        let mut frame = self.encode()?;
        frame.resize(MAX_FRAME, 0);
        Ok(frame)
    }

    /// Decodes one complete frame, as delimited by [`classify`].
    pub fn decode(frame: &[u8]) -> Result<Message, CodecError> {
        if frame.len() > MAX_FRAME {
            return Err(CodecError::FrameTooLarge { len: frame.len() });
        }
        if !frame.starts_with(BEGIN) {
            return Err(CodecError::MissingBegin);
        }
        if frame.len() < HEADER_LEN + END.len() || !frame.ends_with(END) {
            return Err(CodecError::MissingEnd);
        }
        for at in [BEGIN.len(), TAG_INDEX + 1] {
            if frame[at] != SEPARATOR as u8 {
                return Err(CodecError::MissingSeparator { at });
            }
        }

        let tag = frame[TAG_INDEX];
        let kind = MessageKind::from_tag(tag).ok_or(CodecError::UnknownTag(char::from(tag)))?;

        let body = std::str::from_utf8(&frame[HEADER_LEN..frame.len() - END.len()])
            .map_err(|_| CodecError::InvalidUtf8)?;
        let fields = split_fields(body)?;

        match kind {
            MessageKind::NewBody => decode_new_body(&fields),
            MessageKind::PositionUpdate => {
                let entries = fields
                    .iter()
                    .map(|field| {
                        let [id, angle, x, y] = split_components::<4>(field)?;
                        Ok(BodyPose {
                            body_id: parse_body_id(id)?,
                            angle: parse_number(angle)?,
                            x: parse_number(x)?,
                            y: parse_number(y)?,
                        })
                    })
                    .collect::<Result<Vec<_>, CodecError>>()?;
                Ok(Message::PositionUpdate(PositionUpdate { entries }))
            }
            MessageKind::Chat => {
                let [text] = expect_fields::<1>(kind, &fields)?;
                validate_chat(text)?;
                Ok(Message::Chat {
                    text: text.to_string(),
                })
            }
            MessageKind::Zone => {
                let [field] = expect_fields::<1>(kind, &fields)?;
                let [x1, y1, x2, y2] = split_components::<4>(field)?;
                Ok(Message::Zone(Zone {
                    x1: parse_number(x1)?,
                    y1: parse_number(y1)?,
                    x2: parse_number(x2)?,
                    y2: parse_number(y2)?,
                }))
            }
            MessageKind::LevelSwitch => {
                let [field] = expect_fields::<1>(kind, &fields)?;
                let [level, attempt] = split_components::<2>(field)?;
                Ok(Message::LevelSwitch {
                    level: parse_number(level)?,
                    attempt_number: parse_number(attempt)?,
                })
            }
        }
    }
}

fn encode_pose(pose: &BodyPose) -> String {
    format!(
        "{},{:.6},{:.6},{:.6}",
        pose.body_id, pose.angle, pose.x, pose.y
    )
}

fn validate_chat(text: &str) -> Result<(), CodecError> {
    if text.len() > MAX_CHAT_LEN {
        return Err(CodecError::ChatTooLong { len: text.len() });
    }
    let has_end = text.as_bytes().windows(END.len()).any(|window| window == END);
    if has_end || text.contains(SEPARATOR) || text.contains('\0') {
        return Err(CodecError::ChatInvalid);
    }
    Ok(())
}

/// Splits the text between header and end sentinel into fields. Every field
/// carries a trailing separator, so an empty body means no fields at all.
fn split_fields(body: &str) -> Result<Vec<&str>, CodecError> {
    if body.is_empty() {
        return Ok(Vec::new());
    }
    let fields = body
        .strip_suffix(SEPARATOR)
        .ok_or(CodecError::MissingSeparator {
            at: HEADER_LEN + body.len(),
        })?;
    Ok(fields.split(SEPARATOR).collect())
}

fn expect_fields<'a, const N: usize>(
    kind: MessageKind,
    fields: &[&'a str],
) -> Result<[&'a str; N], CodecError> {
    <[&str; N]>::try_from(fields).map_err(|_| CodecError::Arity {
        kind,
        expected: N,
        found: fields.len(),
    })
}

fn split_components<const N: usize>(field: &str) -> Result<[&str; N], CodecError> {
    let parts: Vec<&str> = field.split(',').collect();
    let found = parts.len();
    <[&str; N]>::try_from(parts).map_err(|_| CodecError::Components {
        field: field.to_string(),
        expected: N,
        found,
    })
}

fn parse_number<T: FromStr>(text: &str) -> Result<T, CodecError> {
    text.parse()
        .map_err(|_| CodecError::InvalidNumber(text.to_string()))
}

fn parse_body_id(text: &str) -> Result<u32, CodecError> {
    let id: i64 = parse_number(text)?;
    if !(0..=i64::from(MAX_BODY_ID)).contains(&id) {
        return Err(CodecError::BodyIdOutOfRange(id));
    }
    Ok(id as u32)
}

fn decode_new_body(fields: &[&str]) -> Result<Message, CodecError> {
    let kind = MessageKind::NewBody;
    if fields.len() < 4 {
        return Err(CodecError::Arity {
            kind,
            expected: 4,
            found: fields.len(),
        });
    }

    let body_id: i64 = parse_number(fields[0])?;
    if !(-1..=i64::from(MAX_BODY_ID)).contains(&body_id) {
        return Err(CodecError::BodyIdOutOfRange(body_id));
    }
    let color = Color::from_name(fields[1]);
    let mass: f32 = parse_number(fields[2])?;
    let count: usize = parse_number(fields[3])?;

    let vertex_fields = &fields[4..];
    if vertex_fields.len() != count {
        return Err(CodecError::Arity {
            kind,
            expected: 4 + count,
            found: fields.len(),
        });
    }

    let vertices = vertex_fields
        .iter()
        .map(|field| {
            let [x, y] = split_components::<2>(field)?;
            Ok(Vertex::new(parse_number(x)?, parse_number(y)?))
        })
        .collect::<Result<Vec<_>, CodecError>>()?;

    Ok(Message::NewBody(NewBody {
        body_id: body_id as i32,
        color,
        mass,
        vertices,
    }))
}

/// A decoded position, as stored in a receiver's slot array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

/// Receiver-side view of a position update: one slot per id up to the largest
/// id present (never fewer than two slots).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PositionSlots {
    slots: Vec<Option<Pose>>,
}

impl PositionSlots {
    /// Slots for every id up to the largest in `update`.
    pub fn from_update(update: &PositionUpdate) -> Self {
        let max_id = update
            .entries
            .iter()
            .map(|entry| entry.body_id)
            .fold(1, u32::max);

        let mut slots = vec![None; max_id as usize + 1];
        for entry in &update.entries {
            slots[entry.body_id as usize] = Some(Pose {
                x: entry.x,
                y: entry.y,
                angle: entry.angle,
            });
        }
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Pose of `body_id`, if the update carried one.
    pub fn get(&self, body_id: u32) -> Option<Pose> {
        self.slots.get(body_id as usize).copied().flatten()
    }

    /// Angles by id, with [`NO_UPDATE_ANGLE`] for ids missing from the update.
    pub fn angles(&self) -> Vec<f32> {
        self.slots
            .iter()
            .map(|slot| slot.map_or(NO_UPDATE_ANGLE, |pose| pose.angle))
            .collect()
    }

    /// Ids that received a pose, with that pose.
    pub fn iter(&self) -> impl Iterator<Item = (u32, Pose)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.map(|pose| (id as u32, pose)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn square_body() -> NewBody {
        NewBody {
            body_id: 7,
            color: Color::Blue,
            mass: 2.5,
            vertices: vec![
                Vertex::new(-1.0, -1.0),
                Vertex::new(1.0, -1.0),
                Vertex::new(1.0, 1.0),
                Vertex::new(-1.0, 1.0),
            ],
        }
    }

    fn roundtrip(message: &Message) -> Message {
        let frame = message.encode().unwrap();
        assert_eq!(classify(&frame), FrameStatus::Complete(frame.len()));
        Message::decode(&frame).unwrap()
    }

    #[test]
    fn test_new_body_wire_format() {
        let frame = Message::NewBody(square_body()).encode().unwrap();
        assert_eq!(
            String::from_utf8(frame).unwrap(),
            "~!@;1;7;blue;2.500;4;-1.000,-1.000;1.000,-1.000;1.000,1.000;-1.000,1.000;?`."
        );
    }

    #[test]
    fn test_tag_sits_at_fixed_offset() {
        let frame = Message::Chat {
            text: "hi".to_string(),
        }
        .encode()
        .unwrap();
        assert_eq!(frame[TAG_INDEX], b'3');
    }

    #[test]
    fn test_roundtrip_every_variant() {
        let messages = vec![
            Message::NewBody(square_body()),
            Message::PositionUpdate(PositionUpdate {
                entries: vec![
                    BodyPose {
                        body_id: 0,
                        angle: 0.0,
                        x: 0.0,
                        y: -10.0,
                    },
                    BodyPose {
                        body_id: 3,
                        angle: 1.25,
                        x: 4.5,
                        y: 12.125,
                    },
                ],
            }),
            Message::Chat {
                text: "hello there".to_string(),
            },
            Message::Zone(Zone {
                x1: -20.0,
                y1: 5.0,
                x2: 20.0,
                y2: 30.0,
            }),
            Message::LevelSwitch {
                level: 4,
                attempt_number: 2,
            },
        ];

        for message in &messages {
            assert_eq!(&roundtrip(message), message);
        }
    }

    #[test]
    fn test_floats_survive_to_three_decimals() {
        let body = NewBody {
            body_id: 1,
            color: Color::Green,
            mass: 1.23456,
            vertices: vec![Vertex::new(0.1234, -9.8765)],
        };
        match roundtrip(&Message::NewBody(body)) {
            Message::NewBody(decoded) => {
                assert_approx_eq!(decoded.mass, 1.235, 1e-4);
                assert_approx_eq!(decoded.vertices[0].x, 0.123, 1e-4);
                assert_approx_eq!(decoded.vertices[0].y, -9.877, 1e-4);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_new_body_with_zero_vertices_decodes() {
        let frame = b"~!@;1;-1;red;1.000;0;?`.";
        match Message::decode(frame).unwrap() {
            Message::NewBody(body) => {
                assert_eq!(body.body_id, -1);
                assert!(body.vertices.is_empty());
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_empty_position_update() {
        let message = Message::PositionUpdate(PositionUpdate::default());
        assert_eq!(message.encode().unwrap(), b"~!@;2;?`.".to_vec());
        assert_eq!(roundtrip(&message), message);
    }

    #[test]
    fn test_empty_chat_is_one_field() {
        let message = Message::Chat {
            text: String::new(),
        };
        assert_eq!(message.encode().unwrap(), b"~!@;3;;?`.".to_vec());
        assert_eq!(roundtrip(&message), message);
    }

    #[test]
    fn test_unknown_color_decodes_as_red() {
        match Message::decode(b"~!@;1;2;mauve;1.000;0;?`.").unwrap() {
            Message::NewBody(body) => assert_eq!(body.color, Color::Red),
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_classify_bogus_prefix() {
        assert_eq!(classify(b"xyz"), FrameStatus::Bogus);
        assert_eq!(classify(b"~!x;1;"), FrameStatus::Bogus);
        assert_eq!(classify(b"x"), FrameStatus::Bogus);

        let frame = Message::Chat {
            text: "ok".to_string(),
        }
        .encode()
        .unwrap();
        for len in 3..frame.len() {
            let mut corrupted = frame[..len].to_vec();
            corrupted[0] = b'#';
            assert_eq!(classify(&corrupted), FrameStatus::Bogus);
        }
    }

    #[test]
    fn test_classify_incomplete_until_end_sentinel() {
        let frame = Message::NewBody(square_body()).encode().unwrap();
        assert_eq!(classify(b""), FrameStatus::Incomplete);
        for len in 1..frame.len() {
            assert_eq!(classify(&frame[..len]), FrameStatus::Incomplete);
        }
        assert_eq!(classify(&frame), FrameStatus::Complete(frame.len()));
    }

    #[test]
    fn test_classify_stops_at_first_frame() {
        let first = Message::Chat {
            text: "a".to_string(),
        }
        .encode()
        .unwrap();
        let mut buffer = first.clone();
        buffer.extend(Message::Chat {
            text: "b".to_string(),
        }
        .encode()
        .unwrap());
        assert_eq!(classify(&buffer), FrameStatus::Complete(first.len()));
    }

    #[test]
    fn test_decode_rejects_malformed_frames() {
        assert_eq!(
            Message::decode(b"~!@;9;x;?`."),
            Err(CodecError::UnknownTag('9'))
        );
        assert_eq!(
            Message::decode(b"~!@:3;x;?`."),
            Err(CodecError::MissingSeparator { at: 3 })
        );
        assert_eq!(Message::decode(b"~!@;3;x;"), Err(CodecError::MissingEnd));
        assert_eq!(Message::decode(b"abc;3;x;?`."), Err(CodecError::MissingBegin));
        assert_eq!(
            Message::decode(b"~!@;5;1;2;?`."),
            Err(CodecError::Arity {
                kind: MessageKind::LevelSwitch,
                expected: 1,
                found: 2,
            })
        );
        assert!(matches!(
            Message::decode(b"~!@;4;1,2,3;?`."),
            Err(CodecError::Components { expected: 4, found: 3, .. })
        ));
        assert!(matches!(
            Message::decode(b"~!@;5;one,2;?`."),
            Err(CodecError::InvalidNumber(_))
        ));
        assert_eq!(
            Message::decode(b"~!@;1;1;red;1.0;3;0,0;1,1;?`."),
            Err(CodecError::Arity {
                kind: MessageKind::NewBody,
                expected: 7,
                found: 6,
            })
        );
        assert_eq!(
            Message::decode(b"~!@;3;\xff\xfe;?`."),
            Err(CodecError::InvalidUtf8)
        );
    }

    #[test]
    fn test_decode_rejects_out_of_range_ids() {
        assert_eq!(
            Message::decode(b"~!@;2;5000,0,0,0;?`."),
            Err(CodecError::BodyIdOutOfRange(5000))
        );
        assert_eq!(
            Message::decode(b"~!@;1;-2;red;1.000;0;?`."),
            Err(CodecError::BodyIdOutOfRange(-2))
        );
    }

    #[test]
    fn test_encode_rejects_bad_chat() {
        let long = "x".repeat(MAX_CHAT_LEN + 1);
        assert_eq!(
            Message::Chat { text: long }.encode(),
            Err(CodecError::ChatTooLong {
                len: MAX_CHAT_LEN + 1
            })
        );
        assert_eq!(
            Message::Chat {
                text: "a;b".to_string()
            }
            .encode(),
            Err(CodecError::ChatInvalid)
        );
        assert_eq!(
            Message::Chat {
                text: "sneaky ?`. end".to_string()
            }
            .encode(),
            Err(CodecError::ChatInvalid)
        );
        assert!(Message::Chat {
            text: "x".repeat(MAX_CHAT_LEN)
        }
        .encode()
        .is_ok());
    }

    #[test]
    fn test_encode_rejects_oversized_frame() {
        let body = NewBody {
            body_id: 1,
            color: Color::Red,
            mass: 1.0,
            vertices: vec![Vertex::new(-100.123, -100.123); 40],
        };
        assert!(matches!(
            Message::NewBody(body).encode(),
            Err(CodecError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn test_encode_padded_fills_frame() {
        let padded = Message::LevelSwitch {
            level: 1,
            attempt_number: 0,
        }
        .encode_padded()
        .unwrap();
        assert_eq!(padded.len(), MAX_FRAME);
        assert!(padded.starts_with(b"~!@;5;1,0;?`."));
        assert!(padded[13..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_split_into_frames_respects_limit() {
        let poses = (0..40).map(|id| BodyPose {
            body_id: id,
            angle: -3.141593,
            x: -1234.5678,
            y: 9876.5432,
        });
        let updates = PositionUpdate::split_into_frames(poses);
        assert!(updates.len() > 1);

        let mut ids = Vec::new();
        for update in &updates {
            let frame = Message::PositionUpdate(update.clone()).encode().unwrap();
            assert!(frame.len() <= MAX_FRAME);
            ids.extend(update.entries.iter().map(|entry| entry.body_id));
        }
        assert_eq!(ids, (0..40).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_into_frames_empty_yields_one_update() {
        let updates = PositionUpdate::split_into_frames(Vec::new());
        assert_eq!(updates, vec![PositionUpdate::default()]);
    }

    #[test]
    fn test_position_slots_fill_by_id() {
        let update = PositionUpdate {
            entries: vec![
                BodyPose {
                    body_id: 4,
                    angle: 0.5,
                    x: 1.0,
                    y: 2.0,
                },
                BodyPose {
                    body_id: 1,
                    angle: -0.5,
                    x: 3.0,
                    y: 4.0,
                },
            ],
        };
        let slots = PositionSlots::from_update(&update);
        assert_eq!(slots.len(), 5);
        assert_eq!(
            slots.get(4),
            Some(Pose {
                x: 1.0,
                y: 2.0,
                angle: 0.5
            })
        );
        assert_eq!(slots.get(2), None);
        assert_eq!(slots.get(99), None);

        let angles = slots.angles();
        assert_eq!(angles[0], NO_UPDATE_ANGLE);
        assert_eq!(angles[1], -0.5);
        assert_eq!(angles[3], NO_UPDATE_ANGLE);
        assert_eq!(slots.iter().map(|(id, _)| id).collect::<Vec<_>>(), vec![1, 4]);
    }

    #[test]
    fn test_position_slots_minimum_size() {
        let slots = PositionSlots::from_update(&PositionUpdate::default());
        assert_eq!(slots.len(), 2);
        assert_eq!(slots.angles(), vec![NO_UPDATE_ANGLE, NO_UPDATE_ANGLE]);
    }
}
