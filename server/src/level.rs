//! Level descriptions and where to find them.
//!
//! A level file is a whitespace separated token stream. Directives:
//!
//! ```text
//! TARGET | OBSTACLE                      tag for the bodies that follow
//! GROUND x1 y1 x2 y2 color friction      static segment on the ground body
//! CUSTOM (x y)* z color friction mass    closed outline
//! BOX x y width height color friction mass
//! LINE x1 y1 x2 y2 color friction mass
//! ZONE x1 y1 x2 y2                       drawing zone
//! ```

use log::debug;
use shared::{Color, Vertex, Zone};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading a level.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level resource {path} could not be read: {source}")]
    Missing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("level parse error at token {position}: {reason}")]
    Parse { position: usize, reason: String },
}

/// What a shape reports to the collision rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CollisionTag {
    #[default]
    Obstacle,
    Target,
    Player,
}

impl CollisionTag {
    /// Value stored in a collider's `user_data`.
    pub fn to_user_data(self) -> u128 {
        match self {
            CollisionTag::Obstacle => 1,
            CollisionTag::Target => 2,
            CollisionTag::Player => 3,
        }
    }

    pub fn from_user_data(data: u128) -> Option<Self> {
        match data {
            1 => Some(CollisionTag::Obstacle),
            2 => Some(CollisionTag::Target),
            3 => Some(CollisionTag::Player),
            _ => None,
        }
    }
}

/// One static segment of the ground body.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundSegment {
    pub from: Vertex,
    pub to: Vertex,
    pub color: Color,
    pub friction: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LevelShape {
    Custom { vertices: Vec<Vertex> },
    /// Centered on the raw `(x, y)` given in the file.
    Box { x: f32, y: f32, width: f32, height: f32 },
    Line { from: Vertex, to: Vertex },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelBody {
    pub tag: CollisionTag,
    pub shape: LevelShape,
    pub color: Color,
    pub friction: f32,
    pub mass: f32,
}

/// Everything a level file describes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LevelDescription {
    pub ground: Vec<GroundSegment>,
    pub bodies: Vec<LevelBody>,
    pub zone: Option<Zone>,
}

impl LevelDescription {
    /// Parses a level file. Unknown tokens are skipped.
    pub fn parse(source: &str) -> Result<Self, LevelError> {
        let mut tokens = Tokens::new(source);
        let mut level = LevelDescription::default();
        let mut tag = CollisionTag::Obstacle;

        while let Some(directive) = tokens.next_token() {
            match directive {
                "TARGET" => tag = CollisionTag::Target,
                "OBSTACLE" => tag = CollisionTag::Obstacle,
                "GROUND" => {
                    let from = tokens.vertex("GROUND start")?;
                    let to = tokens.vertex("GROUND end")?;
                    let color = tokens.color()?;
                    let friction = tokens.number("GROUND friction")?;
                    level.ground.push(GroundSegment {
                        from,
                        to,
                        color,
                        friction,
                    });
                }
                "CUSTOM" => {
                    let mut vertices = Vec::new();
                    loop {
                        let x = tokens.expect("CUSTOM vertex or z")?;
                        if x == "z" {
                            break;
                        }
                        let x = parse_number(x, tokens.position)?;
                        let y = tokens.number("CUSTOM vertex y")?;
                        vertices.push(Vertex::new(x, y));
                    }
                    let (color, friction, mass) = tokens.material("CUSTOM")?;
                    level.bodies.push(LevelBody {
                        tag,
                        shape: LevelShape::Custom { vertices },
                        color,
                        friction,
                        mass,
                    });
                }
                "BOX" => {
                    let x = tokens.number("BOX x")?;
                    let y = tokens.number("BOX y")?;
                    let width = tokens.number("BOX width")?;
                    let height = tokens.number("BOX height")?;
                    let (color, friction, mass) = tokens.material("BOX")?;
                    level.bodies.push(LevelBody {
                        tag,
                        shape: LevelShape::Box {
                            x,
                            y,
                            width,
                            height,
                        },
                        color,
                        friction,
                        mass,
                    });
                }
                "LINE" => {
                    let from = tokens.vertex("LINE start")?;
                    let to = tokens.vertex("LINE end")?;
                    let (color, friction, mass) = tokens.material("LINE")?;
                    level.bodies.push(LevelBody {
                        tag,
                        shape: LevelShape::Line { from, to },
                        color,
                        friction,
                        mass,
                    });
                }
                "ZONE" => {
                    let from = tokens.vertex("ZONE corner")?;
                    let to = tokens.vertex("ZONE corner")?;
                    level.zone = Some(Zone {
                        x1: from.x,
                        y1: from.y,
                        x2: to.x,
                        y2: to.y,
                    });
                }
                other => debug!("Skipping unknown level token {:?}", other),
            }
        }

        Ok(level)
    }
}

struct Tokens<'a> {
    inner: std::str::SplitWhitespace<'a>,
    position: usize,
}

impl<'a> Tokens<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            inner: source.split_whitespace(),
            position: 0,
        }
    }

    fn next_token(&mut self) -> Option<&'a str> {
        let token = self.inner.next()?;
        self.position += 1;
        Some(token)
    }

    fn expect(&mut self, what: &str) -> Result<&'a str, LevelError> {
        self.next_token().ok_or_else(|| LevelError::Parse {
            position: self.position + 1,
            reason: format!("missing {}", what),
        })
    }

    fn number(&mut self, what: &str) -> Result<f32, LevelError> {
        let token = self.expect(what)?;
        parse_number(token, self.position)
    }

    fn vertex(&mut self, what: &str) -> Result<Vertex, LevelError> {
        Ok(Vertex::new(self.number(what)?, self.number(what)?))
    }

    fn color(&mut self) -> Result<Color, LevelError> {
        Ok(Color::from_name(self.expect("color")?))
    }

    fn material(&mut self, what: &str) -> Result<(Color, f32, f32), LevelError> {
        let color = self.color()?;
        let friction = self.number(&format!("{} friction", what))?;
        let mass = self.number(&format!("{} mass", what))?;
        Ok((color, friction, mass))
    }
}

fn parse_number(token: &str, position: usize) -> Result<f32, LevelError> {
    token
        .parse::<f32>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| LevelError::Parse {
            position,
            reason: format!("expected a number, found {:?}", token),
        })
}

/// Where level sources come from.
#[derive(Debug, Clone)]
pub enum LevelLibrary {
    /// `level{n}.lvl` files in a directory.
    Directory(PathBuf),
    /// Sources keyed by level number.
    InMemory(BTreeMap<u32, String>),
}

impl LevelLibrary {
    pub fn directory(path: impl AsRef<Path>) -> Self {
        LevelLibrary::Directory(path.as_ref().to_path_buf())
    }

    /// File name of level `level`, e.g. `level3.lvl`.
    pub fn file_name(level: u32) -> String {
        format!("level{}.lvl", level)
    }

    pub fn source(&self, level: u32) -> Result<String, LevelError> {
        match self {
            LevelLibrary::Directory(dir) => {
                let path = dir.join(Self::file_name(level));
                std::fs::read_to_string(&path).map_err(|source| LevelError::Missing { path, source })
            }
            LevelLibrary::InMemory(sources) => {
                sources
                    .get(&level)
                    .cloned()
                    .ok_or_else(|| LevelError::Missing {
                        path: PathBuf::from(Self::file_name(level)),
                        source: io::Error::new(io::ErrorKind::NotFound, "no such in-memory level"),
                    })
            }
        }
    }

    /// Reads and parses level `level`.
    pub fn load(&self, level: u32) -> Result<LevelDescription, LevelError> {
        let source = self.source(level)?;
        LevelDescription::parse(&source)
    }
}
