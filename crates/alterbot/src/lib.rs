// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! AlterBot - self-healing Minecraft client session
//!
//! Keeps exactly one client session connected to a game server, reconnects
//! forever on failure, and keeps the player moving while it is in the world.
//!
//! # Architecture
//!
//! ```text
//!  HTTP / caller
//!       |
//!  ControlFacade ----> RuntimeConfigStore
//!       |                    ^
//!       v                    | get()
//!  LifecycleController --> SessionFactory --> Arc<dyn Session>
//!       ^                                         |
//!       +------------- SessionHooks (one-shot) ---+
//! ```
//!
//! - [`config`]: process settings and the mutable [`RuntimeConfig`] store
//! - [`session`]: the session capability trait and its one-shot hooks
//! - [`lifecycle`]: connect / disconnect / reconnect state machine
//! - [`activity`]: periodic look-around and movement while spawned
//! - [`control`]: the operations exposed to the control surface
//! - [`protocol`]: Minecraft Java Edition session factory (offline mode)
//!
//! # Reconnect policy
//!
//! Two fixed delays, no exponential growth, no jitter, no retry cap:
//! a failure before the first handshake waits `initial_retry_delay`
//! (60 s by default), a disconnect after a handshake waits `retry_delay`.

pub mod activity;
pub mod config;
pub mod control;
pub mod lifecycle;
pub mod protocol;
pub mod session;

pub use activity::ActivityTimer;
pub use config::{
    ActionSettings, BotSettings, ConfigError, ConfigUpdate, PortValue, ReconnectPolicy,
    RuntimeConfig, RuntimeConfigStore, SettingsOverrides,
};
pub use control::{ControlError, ControlFacade};
pub use lifecycle::{Failure, LifecycleController, LifecycleState, ReconnectOutcome, Status};
pub use protocol::{JavaSessionFactory, ProtocolSettings};
pub use session::{ControlState, Session, SessionError, SessionFactory, SessionHooks};
