//! Text rendering of the client world for the terminal.

use crate::game::ClientWorld;
use shared::Vertex;
use std::fmt::Write;

/// Multi-line summary of the world: level header, banner, zone, one line per
/// body and the last chat message.
pub fn describe(world: &ClientWorld) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Level {} (attempt {})",
        world.level, world.attempt_number
    );

    if let Some(banner) = world.banner() {
        let _ = writeln!(out, "*** {} ***", banner);
    }

    if let Some(zone) = world.zone() {
        let _ = writeln!(
            out,
            "zone ({:.1}, {:.1}) - ({:.1}, {:.1})",
            zone.x1, zone.y1, zone.x2, zone.y2
        );
    }

    for body in world.bodies() {
        let _ = write!(
            out,
            "#{:<4} {:<6} mass {:>6.2} at ({:.2}, {:.2}) angle {:.2} [{} vertices]",
            body.id,
            body.color,
            body.mass,
            body.pose.x,
            body.pose.y,
            body.pose.angle,
            body.outline.len()
        );
        match bounds(&body.world_outline()) {
            Some((min, max)) => {
                let _ = writeln!(
                    out,
                    " spans ({:.1}, {:.1}) - ({:.1}, {:.1})",
                    min.x, min.y, max.x, max.y
                );
            }
            None => out.push('\n'),
        }
    }

    if let Some(chat) = world.last_chat() {
        let _ = writeln!(out, "> {}", chat);
    }
    out
}

/// Axis-aligned bounding box of `points`.
fn bounds(points: &[Vertex]) -> Option<(Vertex, Vertex)> {
    let first = points.first()?;
    Some(points.iter().fold((*first, *first), |(min, max), p| {
        (
            Vertex::new(min.x.min(p.x), min.y.min(p.y)),
            Vertex::new(max.x.max(p.x), max.y.max(p.y)),
        )
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::LOSE_BANNER;
    use shared::{Color, Message, NewBody, Vertex, Zone};

    #[test]
    fn test_describe_empty_world() {
        let world = ClientWorld::new();
        assert_eq!(describe(&world), "Level 1 (attempt 0)\n");
    }

    #[test]
    fn test_describe_full_world() {
        let mut world = ClientWorld::new();
        world.apply(Message::LevelSwitch {
            level: 2,
            attempt_number: 3,
        });
        world.apply(Message::Zone(Zone {
            x1: -1.0,
            y1: 2.0,
            x2: 3.0,
            y2: 4.0,
        }));
        world.apply(Message::NewBody(NewBody {
            body_id: 7,
            color: Color::Blue,
            mass: 2.0,
            vertices: vec![Vertex::new(0.0, 0.0), Vertex::new(1.0, 1.0)],
        }));
        world.apply(Message::Chat {
            text: "almost".to_string(),
        });

        let text = describe(&world);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Level 2 (attempt 3)");
        assert_eq!(lines[1], format!("*** {} ***", LOSE_BANNER));
        assert_eq!(lines[2], "zone (-1.0, 2.0) - (3.0, 4.0)");
        assert!(lines[3].starts_with("#7"));
        assert!(lines[3].contains("blue"));
        assert!(lines[3].contains("[2 vertices]"));
        assert!(lines[3].ends_with("spans (0.0, 0.0) - (1.0, 1.0)"));
        assert_eq!(lines[4], "> almost");
    }
}
