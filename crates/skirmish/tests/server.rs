//! Integration tests for the Skirmish server, handler, and full connection flow.
//!
//! Every test runs a real server on a loopback port and talks to it with a
//! plain `TcpStream`, line by line, the way a game client does.

use std::path::PathBuf;
use std::time::Duration;

use skirmish::prelude::*;
use skirmish_persist::Store;
use skirmish_protocol::{read_map, read_snapshot, MapBlock};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const SEED: u64 = 0x5EED;
const READ_TIMEOUT: Duration = Duration::from_secs(5);

// =========================================================================
// Server harness
// =========================================================================

struct TestServer {
    addr: String,
    stop: watch::Sender<bool>,
    task: JoinHandle<Result<(), SkirmishError>>,
}

impl TestServer {
    /// Stops the server and waits for its final save.
    async fn shutdown(self) {
        self.stop.send(true).expect("server should be listening");
        tokio::time::timeout(READ_TIMEOUT, self.task)
            .await
            .expect("server should stop")
            .expect("server task should not panic")
            .expect("server should stop cleanly");
    }
}

fn scratch_save(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "skirmish-server-{}-{name}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("should create scratch dir");
    dir.join("world.save")
}

fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.tick.spin_threshold_us = 0;
    config.map.width = 16;
    config.map.height = 12;
    config.sim.enemy.count = 2;
    config
}

/// Starts a server on a random port with a fixed seed.
async fn start_server(save_path: &PathBuf) -> TestServer {
    let server = SkirmishServer::builder()
        .config(test_config())
        .bind("127.0.0.1:0")
        .seed(SEED)
        .save_path(save_path)
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    let (stop, shutdown) = watch::channel(false);
    let task = tokio::spawn(server.run(shutdown));
    TestServer { addr, stop, task }
}

// =========================================================================
// Client
// =========================================================================

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

#[derive(Debug)]
struct Handshake {
    hello: ServerMessage,
    seed: ServerMessage,
    tick_rate: ServerMessage,
    map: MapBlock,
    you: PlayerId,
    token: ResumeToken,
    ready: ServerMessage,
    name: String,
}

impl Client {
    async fn connect(addr: &str) -> Self {
        let stream = TcpStream::connect(addr).await.expect("should connect");
        let (read, writer) = stream.into_split();
        Self {
            lines: BufReader::new(read).lines(),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("send line");
    }

    /// Next line, or `None` at EOF.
    async fn line(&mut self) -> Option<String> {
        tokio::time::timeout(READ_TIMEOUT, self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .expect("read line")
    }

    async fn expect_line(&mut self) -> String {
        self.line().await.expect("connection closed unexpectedly")
    }

    async fn message(&mut self) -> ServerMessage {
        let line = self.expect_line().await;
        ServerMessage::parse(&line).unwrap_or_else(|| panic!("not a server message: {line:?}"))
    }

    /// Lines up to and including `end`.
    async fn block(&mut self, first: String, end: &str) -> Vec<String> {
        let mut block = vec![first];
        loop {
            let line = self.expect_line().await;
            let done = line == end;
            block.push(line);
            if done {
                return block;
            }
        }
    }

    async fn handshake(&mut self) -> Handshake {
        let hello = self.message().await;
        let seed = self.message().await;
        let tick_rate = self.message().await;
        let header = self.expect_line().await;
        let map_lines = self.block(header, "ENDMAP").await;
        let map = read_map(&mut map_lines.iter())
            .expect("valid map block")
            .expect("map block present");
        let ServerMessage::You {
            id: you,
            token: Some(token),
        } = self.message().await
        else {
            panic!("expected YOU with a token");
        };
        let ready = self.message().await;
        let ServerMessage::Welcome { name } = self.message().await else {
            panic!("expected WELCOME");
        };
        Handshake {
            hello,
            seed,
            tick_rate,
            map,
            you,
            token,
            ready,
            name,
        }
    }

    async fn snapshot(&mut self) -> Snapshot {
        let header = self.expect_line().await;
        assert!(header.starts_with("SNAPSHOT"), "expected snapshot, got {header:?}");
        let lines = self.block(header, "END").await;
        read_snapshot(&mut lines.iter())
            .expect("valid snapshot block")
            .expect("snapshot present")
    }

    /// Reads snapshots until one satisfies `pred`.
    async fn snapshot_where(&mut self, pred: impl Fn(&Snapshot) -> bool) -> Snapshot {
        for _ in 0..120 {
            let snap = self.snapshot().await;
            if pred(&snap) {
                return snap;
            }
        }
        panic!("no matching snapshot within 120 frames");
    }
}

fn has_player(snap: &Snapshot, id: PlayerId) -> bool {
    snap.players.iter().any(|p| p.id == id)
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_handshake_sends_messages_in_order() {
    let save = scratch_save("handshake");
    let server = start_server(&save).await;
    let mut client = Client::connect(&server.addr).await;

    client.send("JOIN name=sir%20lancelot").await;
    let hs = client.handshake().await;

    assert_eq!(hs.hello, ServerMessage::Hello { protocol: PROTOCOL_VERSION });
    assert_eq!(hs.seed, ServerMessage::Seed(SEED));
    assert_eq!(hs.tick_rate, ServerMessage::TickRate(60));
    assert_eq!((hs.map.width, hs.map.height), (16, 12));
    assert!(hs.map.is_wall(0, 0));
    assert_eq!(hs.you, PlayerId(1));
    assert_eq!(hs.ready, ServerMessage::Ready);
    assert_eq!(hs.name, "sir lancelot");

    // Broadcasts only start after READY.
    let snap = client.snapshot_where(|s| has_player(s, PlayerId(1))).await;
    let me = snap.players.iter().find(|p| p.id == PlayerId(1)).unwrap();
    assert_eq!(me.name, "sir lancelot");
    assert!(me.alive);
    assert_eq!(snap.enemies.len(), 2);
}

#[tokio::test]
async fn test_map_matches_for_every_client() {
    let save = scratch_save("map");
    let server = start_server(&save).await;

    let mut a = Client::connect(&server.addr).await;
    a.send("JOIN name=a").await;
    let mut b = Client::connect(&server.addr).await;
    b.send("JOIN name=b").await;

    let map_a = a.handshake().await.map;
    let map_b = b.handshake().await.map;
    assert_eq!(map_a, map_b);
}

#[tokio::test]
async fn test_silent_client_joins_with_default_name() {
    let save = scratch_save("anonymous");
    let server = start_server(&save).await;
    let mut client = Client::connect(&server.addr).await;

    let hs = client.handshake().await;

    assert_eq!(hs.you, PlayerId(1));
    assert_eq!(hs.name, "player-1");
}

#[tokio::test]
async fn test_silent_client_gets_hello_without_long_wait() {
    let save = scratch_save("prompt-hello");
    let server = start_server(&save).await;
    let mut client = Client::connect(&server.addr).await;
    let connected = tokio::time::Instant::now();

    let hello = client.message().await;

    assert_eq!(hello, ServerMessage::Hello { protocol: PROTOCOL_VERSION });
    assert!(connected.elapsed() < Duration::from_millis(1000));
}

#[tokio::test]
async fn test_input_as_first_line_is_applied() {
    let save = scratch_save("early-input");
    let server = start_server(&save).await;
    let mut client = Client::connect(&server.addr).await;

    client
        .send("INPUT t=0 dx=0 dy=0 sprint=0 attack=0 facing=4")
        .await;
    let hs = client.handshake().await;

    let snap = client
        .snapshot_where(|s| s.players.iter().any(|p| p.id == hs.you && p.facing.index() == 4))
        .await;
    assert!(has_player(&snap, hs.you));
}

#[tokio::test]
async fn test_input_changes_player_state() {
    let save = scratch_save("input");
    let server = start_server(&save).await;
    let mut client = Client::connect(&server.addr).await;
    client.send("JOIN name=runner").await;
    let hs = client.handshake().await;

    // Sprinting drains stamina even when a wall blocks the move.
    for t in 0..10 {
        client
            .send(&format!("INPUT t={t} dx=1 dy=0 sprint=1 attack=0 facing=-1"))
            .await;
        client.snapshot().await;
    }

    let snap = client
        .snapshot_where(|s| {
            s.players
                .iter()
                .any(|p| p.id == hs.you && p.stamina < 100.0)
        })
        .await;
    let me = snap.players.iter().find(|p| p.id == hs.you).unwrap();
    assert_eq!(me.facing, Facing::EAST);
}

#[tokio::test]
async fn test_garbage_lines_are_ignored() {
    let save = scratch_save("garbage");
    let server = start_server(&save).await;
    let mut client = Client::connect(&server.addr).await;
    client.send("JOIN name=noisy").await;
    let hs = client.handshake().await;

    client.send("HELLO server").await;
    client.send("INPUT t=oops dx=banana facing=2").await;

    let snap = client
        .snapshot_where(|s| s.players.iter().any(|p| p.id == hs.you && p.facing == Facing::SOUTH))
        .await;
    assert!(has_player(&snap, hs.you));
}

#[tokio::test]
async fn test_concurrent_clients_get_distinct_ids() {
    let save = scratch_save("distinct");
    let server = start_server(&save).await;

    let mut a = Client::connect(&server.addr).await;
    a.send("JOIN name=a").await;
    let hs_a = a.handshake().await;
    let id_a = hs_a.you;

    // Asking for an id that is in use falls back to a fresh one, even with
    // the right token.
    let mut b = Client::connect(&server.addr).await;
    b.send(&format!("JOIN name=b id={} token={}", id_a.0, hs_a.token)).await;
    let id_b = b.handshake().await.you;

    assert_ne!(id_a, id_b);
    let snap = b
        .snapshot_where(|s| has_player(s, id_a) && has_player(s, id_b))
        .await;
    assert_eq!(snap.players.len(), 2);
}

#[tokio::test]
async fn test_reconnect_resumes_ghost() {
    let save = scratch_save("reconnect");
    let server = start_server(&save).await;

    let mut first = Client::connect(&server.addr).await;
    first.send("JOIN name=returning").await;
    let first_hs = first.handshake().await;
    let id = first_hs.you;
    drop(first);

    // Let the server notice the hang-up.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let mut observer = Client::connect(&server.addr).await;
    observer.send("JOIN name=watcher").await;
    observer.handshake().await;
    // The ghost stays in the world.
    observer.snapshot_where(|s| has_player(s, id)).await;

    // Guessing the id alone is not enough.
    let mut impostor = Client::connect(&server.addr).await;
    impostor
        .send(&format!("JOIN name=thief id={} token={}", id.0, ResumeToken(!first_hs.token.0)))
        .await;
    let stolen = impostor.handshake().await;
    assert_ne!(stolen.you, id);
    assert_eq!(stolen.name, "thief");

    let mut again = Client::connect(&server.addr).await;
    again.send(&format!("JOIN id={} token={}", id.0, first_hs.token)).await;
    let hs = again.handshake().await;

    assert_eq!(hs.you, id);
    assert_eq!(hs.token, first_hs.token);
    assert_eq!(hs.name, "returning");
}

#[tokio::test]
async fn test_shutdown_closes_connections_and_saves() {
    let save = scratch_save("shutdown");
    let server = start_server(&save).await;
    let mut client = Client::connect(&server.addr).await;
    client.send("JOIN name=saver").await;
    let hs = client.handshake().await;
    client.snapshot_where(|s| has_player(s, hs.you)).await;

    server.shutdown().await;

    // Drain whatever was in flight, then EOF.
    while client.line().await.is_some() {}

    let saved = Store::new(&save)
        .load(SEED)
        .expect("save should be readable")
        .expect("save should match the seed");
    assert_eq!(saved.seed, SEED);
    assert!(saved.tick > 0);
    let record = saved
        .players
        .iter()
        .find(|p| p.id == hs.you)
        .expect("player should be saved");
    assert_eq!(record.name, "saver");
}

#[tokio::test]
async fn test_restart_restores_players_and_ids() {
    let save = scratch_save("restart");

    let server = start_server(&save).await;
    let mut client = Client::connect(&server.addr).await;
    client.send("JOIN name=veteran").await;
    let first_hs = client.handshake().await;
    let id = first_hs.you;
    client.snapshot_where(|s| has_player(s, id)).await;
    drop(client);
    server.shutdown().await;

    let server = start_server(&save).await;

    let mut returning = Client::connect(&server.addr).await;
    returning
        .send(&format!("JOIN id={} token={}", id.0, first_hs.token))
        .await;
    let hs = returning.handshake().await;
    assert_eq!(hs.you, id);
    assert_eq!(hs.name, "veteran");

    // New players are numbered after the restored ones.
    let mut newcomer = Client::connect(&server.addr).await;
    newcomer.send("JOIN name=rookie").await;
    let fresh = newcomer.handshake().await.you;
    assert!(fresh.0 > id.0);
}
