// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! One client connection and the handle that controls it.
//!
//! # Connection states
//!
//! ```text
//!   connect --> handshake --> LOGIN --(Login Success)--> PLAY --(Login)--> online
//!      |                        |                          |                 |
//!      +-----------+------------+--------------------------+                 |
//!                  |                                                         |
//!        error, then end                                          kicked / closed: end
//! ```
//!
//! Anything that stops the connection before the play `Login` packet is
//! reported as `error` followed by `end`. Once online, a server disconnect
//! is reported as `kicked` then `end`, a transport failure as `error` then
//! `end`.

use super::codec::{Packet, PacketCodec};
use super::packets::{self, id, LoginEvent, PlayEvent, PlayerAction, Position};
use super::{ProtocolError, ProtocolSettings};
use crate::config::RuntimeConfig;
use crate::session::{ControlState, Session, SessionError, SessionHooks};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, trace};

/// Walking speed, blocks per second.
const WALK_SPEED: f64 = 4.317;
/// Sprinting speed, blocks per second.
const SPRINT_SPEED: f64 = 5.612;
/// Sneaking speed, blocks per second.
const SNEAK_SPEED: f64 = 1.31;

/// Packets buffered between the reader task and the connection task.
const PACKET_QUEUE: usize = 256;

#[derive(Debug)]
enum Command {
    Look { yaw: f32, pitch: f32, relative: bool },
    Control(ControlState, bool),
    ClearControls,
    Quit,
    End,
}

struct SessionShared {
    hooks: SessionHooks,
    username: RwLock<Option<String>>,
}

/// Handle to one Java Edition connection.
///
/// Every method queues a command for the connection task and returns
/// immediately. Dropping the last handle closes the connection.
pub struct JavaSession {
    shared: Arc<SessionShared>,
    commands: mpsc::UnboundedSender<Command>,
}

impl JavaSession {
    /// Spawn the connection task for `target` on `runtime`.
    pub fn connect(
        target: RuntimeConfig,
        settings: ProtocolSettings,
        hooks: SessionHooks,
        runtime: &Handle,
    ) -> Self {
        let shared = Arc::new(SessionShared {
            hooks,
            username: RwLock::new(None),
        });
        let (tx, rx) = mpsc::unbounded_channel();
        runtime.spawn(run(target, settings, shared.clone(), rx));

        Self {
            shared,
            commands: tx,
        }
    }

    fn send(&self, command: Command) {
        // The task may already be gone; nothing left to control then.
        let _ = self.commands.send(command);
    }
}

impl Session for JavaSession {
    fn username(&self) -> Option<String> {
        self.shared.username.read().clone()
    }

    fn set_control_state(&self, control: ControlState, active: bool) {
        self.send(Command::Control(control, active));
    }

    fn clear_control_states(&self) {
        self.send(Command::ClearControls);
    }

    fn look(&self, yaw: f32, pitch: f32, relative: bool) {
        self.send(Command::Look {
            yaw,
            pitch,
            relative,
        });
    }

    fn remove_all_listeners(&self) {
        self.shared.hooks.clear();
    }

    fn quit(&self) {
        self.send(Command::Quit);
    }

    fn end(&self) {
        self.send(Command::End);
    }
}

impl std::fmt::Debug for JavaSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JavaSession")
            .field("username", &*self.shared.username.read())
            .field("closed", &self.commands.is_closed())
            .finish()
    }
}

// ============================================================================
// Connection task
// ============================================================================

async fn run(
    target: RuntimeConfig,
    settings: ProtocolSettings,
    shared: Arc<SessionShared>,
    commands: mpsc::UnboundedReceiver<Command>,
) {
    match drive(&target, &settings, shared.clone(), commands).await {
        Ok(reason) => {
            debug!("[PROTO] {} closed: {:?}", target, reason);
            shared.hooks.emit_end(reason);
        }
        Err(err) => {
            debug!("[PROTO] {} failed: {}", target, err);
            let reason = err.to_string();
            shared.hooks.emit_error(err);
            shared.hooks.emit_end(Some(reason));
        }
    }
}

async fn drive(
    target: &RuntimeConfig,
    settings: &ProtocolSettings,
    shared: Arc<SessionShared>,
    commands: mpsc::UnboundedReceiver<Command>,
) -> Result<Option<String>, SessionError> {
    let connect = TcpStream::connect((target.host.as_str(), target.port));
    let stream = match time::timeout(settings.connect_timeout, connect).await {
        Ok(stream) => stream?,
        Err(_) => return Err(SessionError::Timeout(settings.connect_timeout)),
    };
    stream.set_nodelay(true)?;
    debug!("[PROTO] TCP connected to {}", target);

    let (read_half, write_half) = stream.into_split();
    let (packet_tx, packet_rx) = mpsc::channel(PACKET_QUEUE);
    let _reader = AbortOnDrop(tokio::spawn(read_loop(
        read_half,
        settings.max_packet_size,
        packet_tx,
    )));

    let mut conn = Connection {
        writer: write_half,
        codec: PacketCodec::new(settings.max_packet_size),
        packets: packet_rx,
        commands,
        shared,
        player: PlayerState::default(),
    };

    conn.send(packets::handshake(
        settings.protocol_version,
        &target.host,
        target.port,
    ))
    .await?;
    conn.send(packets::login_start(&target.username)).await?;

    if let Flow::Stop(reason) = conn.login().await? {
        return Ok(reason);
    }
    conn.play(settings.movement_tick).await
}

/// Reads frames until EOF or error. Applies `Set Compression` itself so the
/// next frame is decoded with the new threshold.
async fn read_loop(
    read_half: OwnedReadHalf,
    max_size: usize,
    tx: mpsc::Sender<Result<Packet, ProtocolError>>,
) {
    let mut reader = BufReader::new(read_half);
    let mut codec = PacketCodec::new(max_size);
    let mut in_login = true;

    loop {
        let packet = match codec.read(&mut reader).await {
            Ok(Some(packet)) => packet,
            // Dropping the sender signals EOF.
            Ok(None) => return,
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                return;
            }
        };

        if in_login {
            match packet.id {
                id::login::SET_COMPRESSION => {
                    if let Ok(threshold) = packet.reader().varint() {
                        codec.set_threshold(threshold);
                    }
                }
                id::login::SUCCESS => in_login = false,
                _ => {}
            }
        }

        if tx.send(Ok(packet)).await.is_err() {
            return;
        }
    }
}

struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

enum Flow {
    Continue,
    Stop(Option<String>),
}

// ============================================================================
// Player state
// ============================================================================

#[derive(Debug, Default)]
struct PlayerState {
    entity_id: Option<i32>,
    spawned: bool,
    position: Position,
    /// Notchian degrees.
    yaw: f32,
    pitch: f32,
    controls: HashSet<ControlState>,
}

impl PlayerState {
    fn online(&self) -> bool {
        self.entity_id.is_some()
    }

    /// Horizontal displacement for one movement tick, if any direction is
    /// held.
    fn walk_delta(&self, tick: Duration) -> Option<(f64, f64)> {
        let axis = |pos: ControlState, neg: ControlState| {
            f64::from(i8::from(self.controls.contains(&pos)) - i8::from(self.controls.contains(&neg)))
        };
        let forward = axis(ControlState::Forward, ControlState::Back);
        let strafe = axis(ControlState::Left, ControlState::Right);
        if forward == 0.0 && strafe == 0.0 {
            return None;
        }

        let speed = if self.controls.contains(&ControlState::Sneak) {
            SNEAK_SPEED
        } else if self.controls.contains(&ControlState::Sprint) && forward > 0.0 {
            SPRINT_SPEED
        } else {
            WALK_SPEED
        };
        let distance = speed * tick.as_secs_f64() / forward.hypot(strafe);

        // Yaw 0 faces +Z; left of that is +X.
        let (sin, cos) = f64::from(self.yaw).to_radians().sin_cos();
        let dx = (-sin * forward + cos * strafe) * distance;
        let dz = (cos * forward + sin * strafe) * distance;
        Some((dx, dz))
    }
}

// ============================================================================
// Connection
// ============================================================================

struct Connection {
    writer: OwnedWriteHalf,
    codec: PacketCodec,
    packets: mpsc::Receiver<Result<Packet, ProtocolError>>,
    commands: mpsc::UnboundedReceiver<Command>,
    shared: Arc<SessionShared>,
    player: PlayerState,
}

impl Connection {
    async fn send(&mut self, packet: Packet) -> Result<(), SessionError> {
        trace!("[PROTO] -> 0x{:02x} ({} bytes)", packet.id, packet.payload.len());
        let frame = self.codec.encode(&packet)?;
        self.writer.write_all(&frame).await?;
        Ok(())
    }

    async fn login(&mut self) -> Result<Flow, SessionError> {
        loop {
            let flow = tokio::select! {
                packet = self.packets.recv() => match packet {
                    Some(packet) => self.handle_login_packet(packet?).await?,
                    None => {
                        return Err(SessionError::Closed(
                            "server closed the connection during login".into(),
                        ))
                    }
                },
                command = self.commands.recv() => self.handle_command(command).await?,
            };

            match flow {
                Flow::Continue => {}
                stop => return Ok(stop),
            }
            // Login Success switches to play.
            if self.shared.username.read().is_some() {
                return Ok(Flow::Continue);
            }
        }
    }

    async fn handle_login_packet(&mut self, packet: Packet) -> Result<Flow, SessionError> {
        match LoginEvent::decode(&packet)? {
            LoginEvent::SetCompression(threshold) => {
                debug!("[PROTO] compression threshold {}", threshold);
                self.codec.set_threshold(threshold);
            }
            LoginEvent::PluginRequest { message_id } => {
                self.send(packets::plugin_response(message_id)).await?;
            }
            LoginEvent::EncryptionRequest => {
                return Err(SessionError::Rejected(
                    "server requires online-mode authentication".into(),
                ));
            }
            LoginEvent::Disconnect(reason) => {
                self.shared.hooks.emit_kicked(reason.clone());
                return Err(SessionError::Rejected(reason));
            }
            LoginEvent::Success { username } => {
                debug!("[PROTO] login accepted as {}", username);
                *self.shared.username.write() = Some(username);
            }
            LoginEvent::Other(other) => trace!("[PROTO] skipping login packet 0x{:02x}", other),
        }
        Ok(Flow::Continue)
    }

    async fn play(&mut self, movement_tick: Duration) -> Result<Option<String>, SessionError> {
        let mut ticker = time::interval(movement_tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let flow = tokio::select! {
                packet = self.packets.recv() => match packet {
                    Some(packet) => self.handle_play_packet(packet?).await?,
                    None if self.player.online() => {
                        return Ok(Some("Connection closed by server".into()))
                    }
                    None => {
                        return Err(SessionError::Closed(
                            "server closed the connection before joining".into(),
                        ))
                    }
                },
                command = self.commands.recv() => self.handle_command(command).await?,
                _ = ticker.tick() => {
                    self.step(movement_tick).await?;
                    Flow::Continue
                }
            };

            if let Flow::Stop(reason) = flow {
                return Ok(reason);
            }
        }
    }

    async fn handle_play_packet(&mut self, packet: Packet) -> Result<Flow, SessionError> {
        match PlayEvent::decode(&packet)? {
            PlayEvent::Login { entity_id } => {
                self.player.entity_id = Some(entity_id);
                info!("[PROTO] joined game (entity {})", entity_id);
                self.shared.hooks.emit_login();
            }
            PlayEvent::KeepAlive(keep_alive_id) => {
                self.send(packets::keep_alive(keep_alive_id)).await?;
            }
            PlayEvent::SyncPosition(sync) => {
                let player = &mut self.player;
                sync.apply(&mut player.position, &mut player.yaw, &mut player.pitch);
                let (position, yaw, pitch) = (player.position, player.yaw, player.pitch);

                self.send(packets::confirm_teleport(sync.teleport_id)).await?;
                self.send(packets::set_position_rotation(&position, yaw, pitch, true))
                    .await?;

                if !self.player.spawned {
                    self.player.spawned = true;
                    debug!("[PROTO] spawned at {:?}", position);
                    self.shared.hooks.emit_spawn();
                }
            }
            PlayEvent::Disconnect(reason) => {
                self.shared.hooks.emit_kicked(reason.clone());
                if !self.player.online() {
                    return Err(SessionError::Rejected(reason));
                }
                return Ok(Flow::Stop(Some(reason)));
            }
            PlayEvent::Other(_) => {}
        }
        Ok(Flow::Continue)
    }

    async fn handle_command(&mut self, command: Option<Command>) -> Result<Flow, SessionError> {
        match command {
            // Every handle dropped.
            None => return Ok(Flow::Stop(Some("Session released".into()))),
            Some(Command::End) => return Ok(Flow::Stop(None)),
            Some(Command::Quit) => {
                let _ = self.writer.shutdown().await;
                return Ok(Flow::Stop(Some("disconnect.quitting".into())));
            }
            Some(Command::Look {
                yaw,
                pitch,
                relative,
            }) => {
                if relative {
                    self.player.yaw -= yaw.to_degrees();
                    self.player.pitch -= pitch.to_degrees();
                } else {
                    (self.player.yaw, self.player.pitch) = packets::to_notchian(yaw, pitch);
                }
                self.player.pitch = self.player.pitch.clamp(-90.0, 90.0);

                if self.player.spawned {
                    let (yaw, pitch) = (self.player.yaw, self.player.pitch);
                    self.send(packets::set_rotation(yaw, pitch, true)).await?;
                }
            }
            Some(Command::Control(control, active)) => self.set_control(control, active).await?,
            Some(Command::ClearControls) => {
                for control in ControlState::ALL {
                    self.set_control(control, false).await?;
                }
            }
        }
        Ok(Flow::Continue)
    }

    async fn set_control(&mut self, control: ControlState, active: bool) -> Result<(), SessionError> {
        let changed = if active {
            self.player.controls.insert(control)
        } else {
            self.player.controls.remove(&control)
        };
        if !changed {
            return Ok(());
        }

        let action = match (control, active) {
            (ControlState::Sprint, true) => PlayerAction::StartSprinting,
            (ControlState::Sprint, false) => PlayerAction::StopSprinting,
            (ControlState::Sneak, true) => PlayerAction::StartSneaking,
            (ControlState::Sneak, false) => PlayerAction::StopSneaking,
            _ => return Ok(()),
        };
        match self.player.entity_id {
            Some(entity_id) if self.player.spawned => {
                self.send(packets::player_command(entity_id, action)).await
            }
            _ => Ok(()),
        }
    }

    async fn step(&mut self, tick: Duration) -> Result<(), SessionError> {
        if !self.player.spawned {
            return Ok(());
        }
        let Some((dx, dz)) = self.player.walk_delta(tick) else {
            return Ok(());
        };
        self.player.position.x += dx;
        self.player.position.z += dz;
        let position = self.player.position;
        self.send(packets::set_position(&position, true)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::PacketWriter;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc::UnboundedReceiver;

    const WAIT: Duration = Duration::from_secs(5);

    fn recording_hooks() -> (SessionHooks, UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (e, k, n, s, l) = (tx.clone(), tx.clone(), tx.clone(), tx.clone(), tx);
        let hooks = SessionHooks::new()
            .on_error(move |_| {
                let _ = e.send("error".to_string());
            })
            .on_kicked(move |reason| {
                let _ = k.send(format!("kicked:{}", reason));
            })
            .on_end(move |_| {
                let _ = n.send("end".to_string());
            })
            .on_spawn(move || {
                let _ = s.send("spawn".to_string());
            })
            .on_login(move || {
                let _ = l.send("login".to_string());
            });
        (hooks, rx)
    }

    async fn next_event(rx: &mut UnboundedReceiver<String>) -> String {
        time::timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for hook")
            .expect("hook channel closed")
    }

    fn target(port: u16) -> RuntimeConfig {
        RuntimeConfig::new("127.0.0.1", port, "Steve")
    }

    async fn write(stream: &mut TcpStream, codec: &PacketCodec, packet: Packet) {
        let frame = codec.encode(&packet).unwrap();
        stream.write_all(&frame).await.unwrap();
    }

    async fn read(stream: &mut TcpStream, codec: &PacketCodec) -> Option<Packet> {
        time::timeout(WAIT, codec.read(stream))
            .await
            .expect("timed out waiting for packet")
            .unwrap()
    }

    /// Accept one client and take it through login. Returns the stream and
    /// the codec to use from then on.
    async fn accept_and_login(listener: &TcpListener, threshold: i32) -> (TcpStream, PacketCodec) {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut codec = PacketCodec::default();

        let handshake = read(&mut stream, &codec).await.unwrap();
        assert_eq!(handshake.id, id::HANDSHAKE);
        let mut r = handshake.reader();
        assert_eq!(r.varint().unwrap(), packets::PROTOCOL_VERSION);

        let start = read(&mut stream, &codec).await.unwrap();
        assert_eq!(start.id, id::login::START);
        assert_eq!(start.reader().string(16).unwrap(), "Steve");

        write(
            &mut stream,
            &codec,
            PacketWriter::new().varint(threshold).finish(id::login::SET_COMPRESSION),
        )
        .await;
        codec.set_threshold(threshold);

        write(
            &mut stream,
            &codec,
            PacketWriter::new()
                .i64(0)
                .i64(1)
                .string("Steve")
                .varint(0)
                .finish(id::login::SUCCESS),
        )
        .await;

        (stream, codec)
    }

    fn play_login(entity_id: i32) -> Packet {
        let mut payload = entity_id.to_be_bytes().to_vec();
        payload.extend(std::iter::repeat(0u8).take(1024));
        Packet::new(id::play::LOGIN, payload)
    }

    fn sync_position(teleport_id: i32) -> Packet {
        PacketWriter::new()
            .f64(0.5)
            .f64(64.0)
            .f64(0.5)
            .f32(0.0)
            .f32(0.0)
            .bool(false)
            .varint(teleport_id)
            .finish(id::play::SYNC_POSITION)
    }

    /// Read until a packet with `packet_id` arrives.
    async fn expect_packet(stream: &mut TcpStream, codec: &PacketCodec, packet_id: i32) -> Packet {
        loop {
            let packet = read(stream, codec).await.expect("client closed early");
            if packet.id == packet_id {
                return packet;
            }
        }
    }

    #[tokio::test]
    async fn test_login_spawn_keepalive_kick() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (hooks, mut events) = recording_hooks();
        let session = JavaSession::connect(
            target(port),
            ProtocolSettings::default(),
            hooks,
            &Handle::current(),
        );

        let (mut stream, codec) = accept_and_login(&listener, 64).await;
        write(&mut stream, &codec, play_login(42)).await;
        assert_eq!(next_event(&mut events).await, "login");
        assert_eq!(session.username().as_deref(), Some("Steve"));

        write(&mut stream, &codec, sync_position(9)).await;
        let confirm = expect_packet(&mut stream, &codec, id::play::CONFIRM_TELEPORT).await;
        assert_eq!(confirm.reader().varint().unwrap(), 9);
        assert_eq!(next_event(&mut events).await, "spawn");

        write(
            &mut stream,
            &codec,
            PacketWriter::new().i64(123456789).finish(id::play::KEEP_ALIVE),
        )
        .await;
        let pong = expect_packet(&mut stream, &codec, id::play::KEEP_ALIVE_RESPONSE).await;
        assert_eq!(pong.reader().i64().unwrap(), 123456789);

        session.look(0.0, 0.0, false);
        expect_packet(&mut stream, &codec, id::play::SET_ROTATION).await;

        session.set_control_state(ControlState::Sprint, true);
        let command = expect_packet(&mut stream, &codec, id::play::PLAYER_COMMAND).await;
        let mut r = command.reader();
        assert_eq!(r.varint().unwrap(), 42);
        assert_eq!(r.varint().unwrap(), PlayerAction::StartSprinting as i32);

        session.set_control_state(ControlState::Forward, true);
        expect_packet(&mut stream, &codec, id::play::SET_POSITION).await;

        write(
            &mut stream,
            &codec,
            PacketWriter::new()
                .string(r#"{"text":"Server closed"}"#)
                .finish(id::play::DISCONNECT),
        )
        .await;
        assert_eq!(next_event(&mut events).await, "kicked:Server closed");
        assert_eq!(next_event(&mut events).await, "end");
    }

    #[tokio::test]
    async fn test_refused_connection_reports_error_then_end() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let (hooks, mut events) = recording_hooks();
        let _session = JavaSession::connect(
            target(port),
            ProtocolSettings::default(),
            hooks,
            &Handle::current(),
        );

        assert_eq!(next_event(&mut events).await, "error");
        assert_eq!(next_event(&mut events).await, "end");
    }

    #[tokio::test]
    async fn test_kick_during_login_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (hooks, mut events) = recording_hooks();
        let _session = JavaSession::connect(
            target(port),
            ProtocolSettings::default(),
            hooks,
            &Handle::current(),
        );

        let (mut stream, _) = listener.accept().await.unwrap();
        let codec = PacketCodec::default();
        read(&mut stream, &codec).await.unwrap();
        read(&mut stream, &codec).await.unwrap();
        write(
            &mut stream,
            &codec,
            PacketWriter::new()
                .string(r#"{"text":"Whitelist only"}"#)
                .finish(id::login::DISCONNECT),
        )
        .await;

        assert_eq!(next_event(&mut events).await, "kicked:Whitelist only");
        assert_eq!(next_event(&mut events).await, "error");
        assert_eq!(next_event(&mut events).await, "end");
    }

    #[tokio::test]
    async fn test_close_before_join_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (hooks, mut events) = recording_hooks();
        let _session = JavaSession::connect(
            target(port),
            ProtocolSettings::default(),
            hooks,
            &Handle::current(),
        );

        let (stream, _) = accept_and_login(&listener, -1).await;
        drop(stream);

        assert_eq!(next_event(&mut events).await, "error");
        assert_eq!(next_event(&mut events).await, "end");
    }

    #[tokio::test]
    async fn test_quit_after_detach_closes_silently() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (hooks, mut events) = recording_hooks();
        let session = JavaSession::connect(
            target(port),
            ProtocolSettings::default(),
            hooks,
            &Handle::current(),
        );

        let (mut stream, codec) = accept_and_login(&listener, 256).await;
        write(&mut stream, &codec, play_login(7)).await;
        assert_eq!(next_event(&mut events).await, "login");

        session.remove_all_listeners();
        session.quit();
        session.end();

        // Server sees the socket close.
        loop {
            match time::timeout(WAIT, codec.read(&mut stream)).await {
                Ok(Ok(Some(_))) => continue,
                Ok(_) => break,
                Err(_) => panic!("client never closed the connection"),
            }
        }
        assert!(
            time::timeout(Duration::from_millis(100), events.recv())
                .await
                .map_or(true, |event| event.is_none()),
            "no hook may fire after detach"
        );
    }

    #[test]
    fn test_walk_delta() {
        let tick = Duration::from_millis(50);
        let mut player = PlayerState::default();
        assert!(player.walk_delta(tick).is_none());

        player.controls.insert(ControlState::Forward);
        let (dx, dz) = player.walk_delta(tick).unwrap();
        assert!(dx.abs() < 1e-9);
        assert!((dz - WALK_SPEED * 0.05).abs() < 1e-9);

        player.controls.insert(ControlState::Sprint);
        let (_, dz) = player.walk_delta(tick).unwrap();
        assert!((dz - SPRINT_SPEED * 0.05).abs() < 1e-9);

        player.controls.clear();
        player.controls.insert(ControlState::Left);
        let (dx, dz) = player.walk_delta(tick).unwrap();
        assert!(dx > 0.0);
        assert!(dz.abs() < 1e-9);

        player.controls.insert(ControlState::Right);
        assert!(player.walk_delta(tick).is_none());
    }
}
