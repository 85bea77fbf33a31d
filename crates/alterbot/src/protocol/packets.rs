// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Packets used by an offline-mode Java Edition 1.20.1 client.
//!
//! Only the handful of packets the bot reads or writes are modelled; every
//! other clientbound packet decodes to `Other(id)` and is skipped.

use super::codec::{Packet, PacketWriter};
use super::ProtocolError;

/// Protocol version of Java Edition 1.20.1.
pub const PROTOCOL_VERSION: i32 = 763;

/// Handshake `next_state` for login.
const NEXT_STATE_LOGIN: i32 = 2;

/// Longest username the server accepts.
pub const MAX_USERNAME_LEN: usize = 16;

const MAX_CHAT_LEN: usize = 262_144;

/// Packet IDs by connection state and direction.
pub mod id {
    pub const HANDSHAKE: i32 = 0x00;

    pub mod login {
        // clientbound
        pub const DISCONNECT: i32 = 0x00;
        pub const ENCRYPTION_REQUEST: i32 = 0x01;
        pub const SUCCESS: i32 = 0x02;
        pub const SET_COMPRESSION: i32 = 0x03;
        pub const PLUGIN_REQUEST: i32 = 0x04;
        // serverbound
        pub const START: i32 = 0x00;
        pub const PLUGIN_RESPONSE: i32 = 0x02;
    }

    pub mod play {
        // clientbound
        pub const DISCONNECT: i32 = 0x1a;
        pub const KEEP_ALIVE: i32 = 0x23;
        pub const LOGIN: i32 = 0x28;
        pub const SYNC_POSITION: i32 = 0x3c;
        // serverbound
        pub const CONFIRM_TELEPORT: i32 = 0x00;
        pub const KEEP_ALIVE_RESPONSE: i32 = 0x12;
        pub const SET_POSITION: i32 = 0x14;
        pub const SET_POSITION_ROTATION: i32 = 0x15;
        pub const SET_ROTATION: i32 = 0x16;
        pub const PLAYER_COMMAND: i32 = 0x1e;
    }
}

/// `Player Command` actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum PlayerAction {
    StartSneaking = 0,
    StopSneaking = 1,
    StartSprinting = 3,
    StopSprinting = 4,
}

// ============================================================================
// Serverbound
// ============================================================================

pub fn handshake(protocol_version: i32, host: &str, port: u16) -> Packet {
    PacketWriter::new()
        .varint(protocol_version)
        .string(host)
        .u16(port)
        .varint(NEXT_STATE_LOGIN)
        .finish(id::HANDSHAKE)
}

/// `Login Start` without a player UUID (offline mode).
pub fn login_start(username: &str) -> Packet {
    PacketWriter::new()
        .string(username)
        .bool(false)
        .finish(id::login::START)
}

/// Answer a login plugin request with "not understood".
pub fn plugin_response(message_id: i32) -> Packet {
    PacketWriter::new()
        .varint(message_id)
        .bool(false)
        .finish(id::login::PLUGIN_RESPONSE)
}

pub fn keep_alive(keep_alive_id: i64) -> Packet {
    PacketWriter::new()
        .i64(keep_alive_id)
        .finish(id::play::KEEP_ALIVE_RESPONSE)
}

pub fn confirm_teleport(teleport_id: i32) -> Packet {
    PacketWriter::new()
        .varint(teleport_id)
        .finish(id::play::CONFIRM_TELEPORT)
}

pub fn set_position(pos: &Position, on_ground: bool) -> Packet {
    PacketWriter::new()
        .f64(pos.x)
        .f64(pos.y)
        .f64(pos.z)
        .bool(on_ground)
        .finish(id::play::SET_POSITION)
}

pub fn set_rotation(yaw: f32, pitch: f32, on_ground: bool) -> Packet {
    PacketWriter::new()
        .f32(yaw)
        .f32(pitch)
        .bool(on_ground)
        .finish(id::play::SET_ROTATION)
}

pub fn set_position_rotation(pos: &Position, yaw: f32, pitch: f32, on_ground: bool) -> Packet {
    PacketWriter::new()
        .f64(pos.x)
        .f64(pos.y)
        .f64(pos.z)
        .f32(yaw)
        .f32(pitch)
        .bool(on_ground)
        .finish(id::play::SET_POSITION_ROTATION)
}

pub fn player_command(entity_id: i32, action: PlayerAction) -> Packet {
    PacketWriter::new()
        .varint(entity_id)
        .varint(action as i32)
        .varint(0)
        .finish(id::play::PLAYER_COMMAND)
}

// ============================================================================
// Clientbound
// ============================================================================

/// Player position in block coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// `Synchronize Player Position` payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSync {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    /// Bit set: field is relative to the current value.
    pub flags: u8,
    pub teleport_id: i32,
}

impl PositionSync {
    const REL_X: u8 = 0x01;
    const REL_Y: u8 = 0x02;
    const REL_Z: u8 = 0x04;
    const REL_YAW: u8 = 0x08;
    const REL_PITCH: u8 = 0x10;

    /// Apply to the current position and view (degrees).
    pub fn apply(&self, pos: &mut Position, yaw: &mut f32, pitch: &mut f32) {
        fn set(rel: bool, current: &mut f64, value: f64) {
            *current = if rel { *current + value } else { value };
        }
        set(self.flags & Self::REL_X != 0, &mut pos.x, self.x);
        set(self.flags & Self::REL_Y != 0, &mut pos.y, self.y);
        set(self.flags & Self::REL_Z != 0, &mut pos.z, self.z);

        *yaw = if self.flags & Self::REL_YAW != 0 { *yaw + self.yaw } else { self.yaw };
        *pitch = if self.flags & Self::REL_PITCH != 0 {
            *pitch + self.pitch
        } else {
            self.pitch
        };
    }
}

/// Clientbound packets in the login state.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginEvent {
    Disconnect(String),
    EncryptionRequest,
    Success { username: String },
    SetCompression(i32),
    PluginRequest { message_id: i32 },
    Other(i32),
}

impl LoginEvent {
    pub fn decode(packet: &Packet) -> Result<Self, ProtocolError> {
        let mut r = packet.reader();
        Ok(match packet.id {
            id::login::DISCONNECT => LoginEvent::Disconnect(chat_text(&r.string(MAX_CHAT_LEN)?)),
            id::login::ENCRYPTION_REQUEST => LoginEvent::EncryptionRequest,
            id::login::SUCCESS => {
                let _uuid = r.uuid()?;
                LoginEvent::Success {
                    username: r.string(MAX_USERNAME_LEN)?,
                }
            }
            id::login::SET_COMPRESSION => LoginEvent::SetCompression(r.varint()?),
            id::login::PLUGIN_REQUEST => LoginEvent::PluginRequest {
                message_id: r.varint()?,
            },
            other => LoginEvent::Other(other),
        })
    }
}

/// Clientbound packets in the play state.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayEvent {
    Login { entity_id: i32 },
    KeepAlive(i64),
    Disconnect(String),
    SyncPosition(PositionSync),
    Other(i32),
}

impl PlayEvent {
    pub fn decode(packet: &Packet) -> Result<Self, ProtocolError> {
        let mut r = packet.reader();
        Ok(match packet.id {
            id::play::LOGIN => PlayEvent::Login {
                entity_id: r.i32()?,
            },
            id::play::KEEP_ALIVE => PlayEvent::KeepAlive(r.i64()?),
            id::play::DISCONNECT => PlayEvent::Disconnect(chat_text(&r.string(MAX_CHAT_LEN)?)),
            id::play::SYNC_POSITION => PlayEvent::SyncPosition(PositionSync {
                x: r.f64()?,
                y: r.f64()?,
                z: r.f64()?,
                yaw: r.f32()?,
                pitch: r.f32()?,
                flags: r.u8()?,
                teleport_id: r.varint()?,
            }),
            other => PlayEvent::Other(other),
        })
    }
}

/// Flatten a JSON chat component to plain text. Non-JSON input is returned
/// as is.
pub fn chat_text(raw: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value) => {
            let mut out = String::new();
            flatten_chat(&value, &mut out);
            out
        }
        Err(_) => raw.to_string(),
    }
}

fn flatten_chat(value: &serde_json::Value, out: &mut String) {
    use serde_json::Value;
    match value {
        Value::String(s) => out.push_str(s),
        Value::Array(parts) => parts.iter().for_each(|part| flatten_chat(part, out)),
        Value::Object(map) => {
            if let Some(Value::String(text)) = map.get("text") {
                out.push_str(text);
            } else if let Some(Value::String(key)) = map.get("translate") {
                out.push_str(key);
            }
            if let Some(Value::Array(extra)) = map.get("extra") {
                extra.iter().for_each(|part| flatten_chat(part, out));
            }
        }
        other => out.push_str(&other.to_string()),
    }
}

/// Notchian view angles (degrees) from radians where yaw 0 faces north and
/// positive pitch looks up.
pub fn to_notchian(yaw: f32, pitch: f32) -> (f32, f32) {
    (
        (std::f32::consts::PI - yaw).to_degrees(),
        (-pitch).to_degrees(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_layout() {
        let packet = handshake(PROTOCOL_VERSION, "mc", 25565);
        assert_eq!(packet.id, 0x00);
        // 763 = 0xfb 0x05, "mc", 25565 BE, next_state 2
        assert_eq!(
            packet.payload,
            vec![0xfb, 0x05, 0x02, b'm', b'c', 0x63, 0xdd, 0x02]
        );
    }

    #[test]
    fn test_login_start_offline() {
        let packet = login_start("AlterBot");
        let mut r = packet.reader();
        assert_eq!(r.string(MAX_USERNAME_LEN).unwrap(), "AlterBot");
        assert!(!r.bool().unwrap(), "no uuid in offline mode");
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_decode_login_success() {
        let packet = PacketWriter::new()
            .i64(1)
            .i64(2)
            .string("Steve")
            .varint(0)
            .finish(id::login::SUCCESS);
        assert_eq!(
            LoginEvent::decode(&packet).unwrap(),
            LoginEvent::Success {
                username: "Steve".into()
            }
        );
    }

    #[test]
    fn test_decode_login_disconnect() {
        let packet = PacketWriter::new()
            .string(r#"{"text":"You are banned"}"#)
            .finish(id::login::DISCONNECT);
        assert_eq!(
            LoginEvent::decode(&packet).unwrap(),
            LoginEvent::Disconnect("You are banned".into())
        );
    }

    #[test]
    fn test_decode_sync_position() {
        let packet = PacketWriter::new()
            .f64(1.0)
            .f64(64.0)
            .f64(-3.5)
            .f32(90.0)
            .f32(0.0)
            .bool(false)
            .varint(7)
            .finish(id::play::SYNC_POSITION);

        let PlayEvent::SyncPosition(sync) = PlayEvent::decode(&packet).unwrap() else {
            panic!("expected SyncPosition");
        };
        assert_eq!(sync.teleport_id, 7);
        assert_eq!(sync.y, 64.0);
    }

    #[test]
    fn test_relative_position_sync() {
        let sync = PositionSync {
            x: 1.0,
            y: 2.0,
            z: 3.0,
            yaw: 10.0,
            pitch: 5.0,
            flags: PositionSync::REL_X | PositionSync::REL_YAW,
            teleport_id: 1,
        };
        let mut pos = Position {
            x: 10.0,
            y: 10.0,
            z: 10.0,
        };
        let (mut yaw, mut pitch) = (20.0, 20.0);
        sync.apply(&mut pos, &mut yaw, &mut pitch);

        assert_eq!(pos, Position { x: 11.0, y: 2.0, z: 3.0 });
        assert_eq!(yaw, 30.0);
        assert_eq!(pitch, 5.0);
    }

    #[test]
    fn test_unknown_packets_are_other() {
        let packet = Packet::new(0x7f, vec![1, 2, 3]);
        assert_eq!(PlayEvent::decode(&packet).unwrap(), PlayEvent::Other(0x7f));
        assert_eq!(LoginEvent::decode(&packet).unwrap(), LoginEvent::Other(0x7f));
    }

    #[test]
    fn test_chat_text() {
        assert_eq!(chat_text(r#""plain""#), "plain");
        assert_eq!(
            chat_text(r#"{"text":"Server ","extra":[{"text":"closed"},"!"]}"#),
            "Server closed!"
        );
        assert_eq!(
            chat_text(r#"{"translate":"multiplayer.disconnect.server_shutdown"}"#),
            "multiplayer.disconnect.server_shutdown"
        );
        assert_eq!(chat_text("not json"), "not json");
    }

    #[test]
    fn test_to_notchian() {
        let (yaw, pitch) = to_notchian(std::f32::consts::PI, 0.0);
        assert!(yaw.abs() < 1e-4);
        assert!(pitch.abs() < 1e-4);

        let (_, pitch) = to_notchian(0.0, std::f32::consts::FRAC_PI_2);
        assert!((pitch + 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_player_command() {
        let packet = player_command(42, PlayerAction::StartSprinting);
        assert_eq!(packet.id, id::play::PLAYER_COMMAND);
        assert_eq!(packet.payload, vec![42, 3, 0]);
    }
}
