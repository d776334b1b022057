//! Integration tests for the networked game
//!
//! These tests run a real server on a loopback port with the shipped levels
//! and talk to it over TCP the way the client does.

use server::config::ServerConfig;
use server::network::{Server, ServerError};
use shared::{write_message, Color, FrameReader, Message, NewBody, Vertex};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;

const READ_TIMEOUT: Duration = Duration::from_secs(5);

async fn start_server() -> (SocketAddr, JoinHandle<Result<(), ServerError>>) {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        levels_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/levels")),
        pacing: Duration::ZERO,
        idle_timeout: Duration::from_millis(20),
        ..Default::default()
    };
    let server = Server::bind(config).await.expect("server should bind");
    let addr = server.local_addr().unwrap();
    (addr, tokio::spawn(server.run()))
}

struct Player {
    reader: FrameReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Player {
    async fn join(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, writer) = stream.into_split();
        Player {
            reader: FrameReader::new(read_half),
            writer,
        }
    }

    /// Joins and reads the level snapshot up to and including the zone.
    async fn join_and_sync(addr: SocketAddr) -> Self {
        let mut player = Self::join(addr).await;
        player.snapshot().await;
        player
    }

    async fn next(&mut self) -> Message {
        timeout(READ_TIMEOUT, self.reader.read_message())
            .await
            .expect("timed out waiting for a frame")
            .expect("frame should decode")
            .expect("server closed the connection")
    }

    /// Next message that is not a position update.
    async fn next_event(&mut self) -> Message {
        loop {
            match self.next().await {
                Message::PositionUpdate(_) => continue,
                other => return other,
            }
        }
    }

    async fn snapshot(&mut self) -> Vec<Message> {
        let mut messages = Vec::new();
        loop {
            let message = self.next_event().await;
            let done = matches!(message, Message::Zone(_));
            messages.push(message);
            if done {
                return messages;
            }
        }
    }

    async fn send(&mut self, message: &Message) {
        write_message(&mut self.writer, message).await.unwrap();
    }
}

fn chat(text: &str) -> Message {
    Message::Chat {
        text: text.to_string(),
    }
}

fn drawn_square(cx: f32, cy: f32) -> Message {
    Message::NewBody(NewBody {
        body_id: -1,
        color: Color::Blue,
        mass: 2.0,
        vertices: vec![
            Vertex::new(cx - 2.0, cy - 2.0),
            Vertex::new(cx + 2.0, cy - 2.0),
            Vertex::new(cx + 2.0, cy + 2.0),
            Vertex::new(cx - 2.0, cy + 2.0),
        ],
    })
}

/// SESSION TESTS
mod session_tests {
    use super::*;

    #[tokio::test]
    async fn joining_player_receives_level_snapshot() {
        let (addr, _server) = start_server().await;
        let mut player = Player::join(addr).await;

        match player.next().await {
            Message::NewBody(ground) => {
                assert_eq!(ground.body_id, 0);
                assert_eq!(ground.mass, 0.0);
            }
            other => panic!("expected the ground first, got {:?}", other),
        }

        let rest = player.snapshot().await;
        assert!(rest.len() >= 2, "level 1 has a target and a zone");
        assert!(rest[..rest.len() - 1]
            .iter()
            .all(|m| matches!(m, Message::NewBody(b) if b.body_id > 0)));
    }

    #[tokio::test]
    async fn chat_reaches_everyone_but_the_sender() {
        let (addr, _server) = start_server().await;
        let mut a = Player::join_and_sync(addr).await;
        let mut b = Player::join_and_sync(addr).await;
        let mut c = Player::join_and_sync(addr).await;

        a.send(&chat("hello")).await;
        assert_eq!(b.next_event().await, chat("hello"));
        assert_eq!(c.next_event().await, chat("hello"));

        b.send(&chat("second")).await;
        assert_eq!(a.next_event().await, chat("second"));
        assert_eq!(c.next_event().await, chat("second"));
    }

    #[tokio::test]
    async fn new_body_is_echoed_to_every_player() {
        let (addr, _server) = start_server().await;
        let mut a = Player::join_and_sync(addr).await;
        let mut b = Player::join_and_sync(addr).await;

        a.send(&drawn_square(-30.0, 35.0)).await;

        for player in [&mut a, &mut b] {
            match player.next_event().await {
                Message::NewBody(body) => {
                    assert!(body.body_id > 0);
                    assert_eq!(body.color, Color::Blue);
                    assert_eq!(body.mass, 2.0);
                    assert_eq!(body.vertices.len(), 4);
                }
                other => panic!("expected the echoed body, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn third_attempt_restarts_the_level() {
        let (addr, _server) = start_server().await;
        let mut a = Player::join_and_sync(addr).await;

        for x in [-45.0, -30.0, -15.0] {
            a.send(&drawn_square(x, 30.0)).await;
        }
        for _ in 0..3 {
            assert!(matches!(a.next_event().await, Message::NewBody(_)));
        }

        assert_eq!(
            a.next_event().await,
            Message::LevelSwitch {
                level: 1,
                attempt_number: 0
            }
        );
        match a.next_event().await {
            Message::NewBody(ground) => assert_eq!(ground.body_id, 0),
            other => panic!("expected a fresh snapshot, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn level_request_switches_every_player() {
        let (addr, _server) = start_server().await;
        let mut a = Player::join_and_sync(addr).await;
        let mut b = Player::join_and_sync(addr).await;

        a.send(&Message::LevelSwitch {
            level: 42,
            attempt_number: 1,
        })
        .await;
        a.send(&Message::LevelSwitch {
            level: 5,
            attempt_number: 1,
        })
        .await;

        for player in [&mut a, &mut b] {
            assert_eq!(
                player.next_event().await,
                Message::LevelSwitch {
                    level: 5,
                    attempt_number: 0
                }
            );
            let snapshot = player.snapshot().await;
            assert!(matches!(&snapshot[0], Message::NewBody(ground) if ground.body_id == 0));
        }
    }
}

/// CONNECTION TESTS
mod connection_tests {
    use super::*;

    #[tokio::test]
    async fn bogus_bytes_do_not_drop_the_connection() {
        let (addr, _server) = start_server().await;
        let mut a = Player::join_and_sync(addr).await;
        let mut b = Player::join_and_sync(addr).await;

        a.writer.write_all(b"not a frame at all").await.unwrap();
        a.send(&chat("still here")).await;

        assert_eq!(b.next_event().await, chat("still here"));
    }

    #[tokio::test]
    async fn one_player_leaving_does_not_affect_others() {
        let (addr, _server) = start_server().await;
        let a = Player::join_and_sync(addr).await;
        let mut b = Player::join_and_sync(addr).await;
        let mut c = Player::join_and_sync(addr).await;

        drop(a);
        b.send(&chat("anyone?")).await;
        assert_eq!(c.next_event().await, chat("anyone?"));
    }

    #[tokio::test]
    async fn server_stops_after_last_player_leaves() {
        let (addr, server) = start_server().await;
        let mut a = Player::join(addr).await;
        assert!(matches!(a.next().await, Message::NewBody(_)));

        drop(a);
        let result = timeout(READ_TIMEOUT, server)
            .await
            .expect("server should stop")
            .unwrap();
        assert!(result.is_ok());
    }
}
