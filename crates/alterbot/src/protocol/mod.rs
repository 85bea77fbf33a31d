// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Minecraft Java Edition session factory (offline mode, 1.20.1).
//!
//! Each session is one TCP connection driven by its own task:
//!
//! ```text
//!   JavaSession (handle) --Command--> connection task --frames--> server
//!                                        ^    |
//!                        reader task ----+    +--> SessionHooks
//! ```
//!
//! The reader task owns framing state (compression threshold); the
//! connection task owns player state and every write.

pub mod client;
pub mod codec;
pub mod packets;

pub use client::JavaSession;
pub use codec::{Packet, PacketCodec};

use crate::config::RuntimeConfig;
use crate::session::{Session, SessionError, SessionFactory, SessionHooks};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;

/// Wire-level failures.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("VarInt longer than 5 bytes")]
    VarIntTooLong,

    #[error("Unexpected end of packet")]
    UnexpectedEof,

    #[error("Packet too large: {0} bytes (max {1})")]
    TooLarge(usize, usize),

    #[error("Invalid string: {0}")]
    InvalidString(String),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Malformed packet: {0}")]
    Malformed(String),
}

impl From<ProtocolError> for SessionError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Io(e) => SessionError::Io(e),
            other => SessionError::Protocol(other.to_string()),
        }
    }
}

/// Connection parameters shared by every session.
#[derive(Debug, Clone)]
pub struct ProtocolSettings {
    /// Protocol version sent in the handshake.
    pub protocol_version: i32,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Largest frame accepted or sent.
    pub max_packet_size: usize,
    /// Movement update period while a direction is held.
    pub movement_tick: Duration,
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            protocol_version: packets::PROTOCOL_VERSION,
            connect_timeout: Duration::from_secs(10),
            max_packet_size: codec::DEFAULT_MAX_PACKET_SIZE,
            movement_tick: Duration::from_millis(50),
        }
    }
}

/// Builds [`JavaSession`]s on a tokio runtime.
#[derive(Debug, Clone)]
pub struct JavaSessionFactory {
    settings: ProtocolSettings,
    runtime: Handle,
}

impl JavaSessionFactory {
    /// Factory spawning on the current runtime.
    pub fn new(settings: ProtocolSettings) -> Self {
        Self::with_runtime(settings, Handle::current())
    }

    pub fn with_runtime(settings: ProtocolSettings, runtime: Handle) -> Self {
        Self { settings, runtime }
    }
}

impl SessionFactory for JavaSessionFactory {
    fn create(&self, config: &RuntimeConfig, hooks: SessionHooks) -> Arc<dyn Session> {
        Arc::new(JavaSession::connect(
            config.clone(),
            self.settings.clone(),
            hooks,
            &self.runtime,
        ))
    }
}
