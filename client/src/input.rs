//! Terminal command parsing.
//!
//! ```text
//! /shape <color> <mass> x,y x,y ...   submit a drawn outline
//! /level <n>                          ask the server to switch level
//! /quit                               leave the game
//! anything else                       chat
//! ```

use shared::{CodecError, Color, Message, NewBody, Vertex};
use thiserror::Error;

/// What one line of input asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Send(Message),
    Quit,
}

/// Why a line of input could not be used.
#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
    #[error("invalid vertex {0:?}, expected x,y")]
    InvalidVertex(String),
    #[error("cannot send: {0}")]
    Unsendable(#[from] CodecError),
}

const SHAPE_USAGE: &str = "/shape <color> <mass> x,y x,y ...";
const LEVEL_USAGE: &str = "/level <n>";

/// Parses one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, InputError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }

    let mut words = line.split_whitespace();
    let message = match words.next() {
        Some("/quit") => return Ok(Some(Command::Quit)),
        Some("/shape") => {
            let color = words.next().ok_or(InputError::Usage(SHAPE_USAGE))?;
            let mass = words.next().ok_or(InputError::Usage(SHAPE_USAGE))?;
            let vertices = words.map(parse_vertex).collect::<Result<Vec<_>, _>>()?;
            Message::NewBody(NewBody {
                body_id: -1,
                color: Color::from_name(color),
                mass: parse_number(mass)?,
                vertices,
            })
        }
        Some("/level") => {
            let level = words.next().ok_or(InputError::Usage(LEVEL_USAGE))?;
            if words.next().is_some() {
                return Err(InputError::Usage(LEVEL_USAGE));
            }
            Message::LevelSwitch {
                level: parse_number(level)?,
                attempt_number: 1,
            }
        }
        _ => Message::Chat {
            text: line.to_string(),
        },
    };

    message.encode()?;
    Ok(Some(Command::Send(message)))
}

fn parse_number<T: std::str::FromStr>(text: &str) -> Result<T, InputError> {
    text.parse()
        .map_err(|_| InputError::InvalidNumber(text.to_string()))
}

fn parse_vertex(text: &str) -> Result<Vertex, InputError> {
    let (x, y) = text
        .split_once(',')
        .ok_or_else(|| InputError::InvalidVertex(text.to_string()))?;
    match (x.parse(), y.parse()) {
        (Ok(x), Ok(y)) => Ok(Vertex::new(x, y)),
        _ => Err(InputError::InvalidVertex(text.to_string())),
    }
}
