// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Session capability interface.
//!
//! A [`Session`] is one connected-or-connecting client instance. It is built by
//! a [`SessionFactory`] and reports its lifecycle through [`SessionHooks`]:
//!
//! | Hook        | Fires when                                      |
//! |-------------|-------------------------------------------------|
//! | `on_error`  | transport or protocol failure                   |
//! | `on_kicked` | the server sent a disconnect notice             |
//! | `on_end`    | the session is over (always the last event)     |
//! | `on_login`  | the server accepted the player                  |
//! | `on_spawn`  | the player has a position in the world          |
//!
//! Every hook fires at most once per session. Re-arming only happens by
//! creating a new session.

use crate::config::RuntimeConfig;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Session failures delivered through `on_error`.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Rejected by server: {0}")]
    Rejected(String),

    #[error("Connection closed: {0}")]
    Closed(String),
}

/// Movement controls a session can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlState {
    Forward,
    Back,
    Left,
    Right,
    Jump,
    Sprint,
    Sneak,
}

impl ControlState {
    /// All controls, in declaration order.
    pub const ALL: [ControlState; 7] = [
        ControlState::Forward,
        ControlState::Back,
        ControlState::Left,
        ControlState::Right,
        ControlState::Jump,
        ControlState::Sprint,
        ControlState::Sneak,
    ];

    /// Lowercase name, as used in settings documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlState::Forward => "forward",
            ControlState::Back => "back",
            ControlState::Left => "left",
            ControlState::Right => "right",
            ControlState::Jump => "jump",
            ControlState::Sprint => "sprint",
            ControlState::Sneak => "sneak",
        }
    }
}

impl std::fmt::Display for ControlState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ControlState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown control state: {}", s))
    }
}

/// One live protocol session.
///
/// All methods are non-blocking: they queue work for the session's own task.
pub trait Session: Send + Sync {
    /// Name accepted by the server, once logged in.
    fn username(&self) -> Option<String>;

    /// Press or release a movement control.
    fn set_control_state(&self, control: ControlState, active: bool);

    /// Release every movement control.
    fn clear_control_states(&self);

    /// Turn the head. Angles are radians; `relative` adds to the current view.
    fn look(&self, yaw: f32, pitch: f32, relative: bool);

    /// Detach every hook so nothing fires after teardown.
    fn remove_all_listeners(&self);

    /// Leave the server politely.
    fn quit(&self);

    /// Close the transport.
    fn end(&self);
}

/// Builds sessions from the current connection target.
pub trait SessionFactory: Send + Sync {
    /// Create a session and register `hooks` on it.
    ///
    /// Must not fire any hook before returning; events are delivered later
    /// from the session's own task.
    fn create(&self, config: &RuntimeConfig, hooks: SessionHooks) -> Arc<dyn Session>;
}

type ErrorHook = Box<dyn FnOnce(SessionError) + Send>;
type ReasonHook = Box<dyn FnOnce(String) + Send>;
type EndHook = Box<dyn FnOnce(Option<String>) + Send>;
type SignalHook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct HookSlots {
    error: Option<ErrorHook>,
    kicked: Option<ReasonHook>,
    end: Option<EndHook>,
    spawn: Option<SignalHook>,
    login: Option<SignalHook>,
}

/// One-shot lifecycle handlers for a single session.
///
/// Each `emit_*` takes its handler out of the slot before calling it, so a
/// handler runs at most once and may freely call back into the session
/// (e.g. [`Session::remove_all_listeners`]) without deadlocking.
#[derive(Default)]
pub struct SessionHooks {
    slots: Mutex<HookSlots>,
}

impl SessionHooks {
    /// Empty hook set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the `error` handler.
    pub fn on_error(self, f: impl FnOnce(SessionError) + Send + 'static) -> Self {
        self.slots.lock().error = Some(Box::new(f));
        self
    }

    /// Register the `kicked` handler.
    pub fn on_kicked(self, f: impl FnOnce(String) + Send + 'static) -> Self {
        self.slots.lock().kicked = Some(Box::new(f));
        self
    }

    /// Register the `end` handler.
    pub fn on_end(self, f: impl FnOnce(Option<String>) + Send + 'static) -> Self {
        self.slots.lock().end = Some(Box::new(f));
        self
    }

    /// Register the `spawn` handler.
    pub fn on_spawn(self, f: impl FnOnce() + Send + 'static) -> Self {
        self.slots.lock().spawn = Some(Box::new(f));
        self
    }

    /// Register the `login` handler.
    pub fn on_login(self, f: impl FnOnce() + Send + 'static) -> Self {
        self.slots.lock().login = Some(Box::new(f));
        self
    }

    /// Fire `error`. Returns false if it already fired or was cleared.
    pub fn emit_error(&self, error: SessionError) -> bool {
        let hook = self.slots.lock().error.take();
        hook.map(|f| f(error)).is_some()
    }

    /// Fire `kicked`.
    pub fn emit_kicked(&self, reason: String) -> bool {
        let hook = self.slots.lock().kicked.take();
        hook.map(|f| f(reason)).is_some()
    }

    /// Fire `end`.
    pub fn emit_end(&self, reason: Option<String>) -> bool {
        let hook = self.slots.lock().end.take();
        hook.map(|f| f(reason)).is_some()
    }

    /// Fire `spawn`.
    pub fn emit_spawn(&self) -> bool {
        let hook = self.slots.lock().spawn.take();
        hook.map(|f| f()).is_some()
    }

    /// Fire `login`.
    pub fn emit_login(&self) -> bool {
        let hook = self.slots.lock().login.take();
        hook.map(|f| f()).is_some()
    }

    /// Drop every registered handler.
    pub fn clear(&self) {
        *self.slots.lock() = HookSlots::default();
    }

    /// Number of handlers still armed.
    pub fn armed(&self) -> usize {
        let slots = self.slots.lock();
        [
            slots.error.is_some(),
            slots.kicked.is_some(),
            slots.end.is_some(),
            slots.spawn.is_some(),
            slots.login.is_some(),
        ]
        .iter()
        .filter(|armed| **armed)
        .count()
    }
}

impl std::fmt::Debug for SessionHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHooks")
            .field("armed", &self.armed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_hooks_fire_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let hooks = SessionHooks::new().on_error(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(hooks.emit_error(SessionError::Closed("a".into())));
        assert!(!hooks.emit_error(SessionError::Closed("b".into())));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear_disarms_everything() {
        let hooks = SessionHooks::new()
            .on_error(|_| {})
            .on_kicked(|_| {})
            .on_end(|_| {})
            .on_spawn(|| {})
            .on_login(|| {});
        assert_eq!(hooks.armed(), 5);

        hooks.clear();
        assert_eq!(hooks.armed(), 0);
        assert!(!hooks.emit_end(None));
        assert!(!hooks.emit_spawn());
    }

    #[test]
    fn test_handler_can_reenter_hooks() {
        let this: Arc<std::sync::OnceLock<Arc<SessionHooks>>> = Arc::default();
        let handle = this.clone();
        let hooks = Arc::new(SessionHooks::new().on_login(|| {}).on_end(move |_| {
            if let Some(hooks) = handle.get() {
                hooks.clear();
            }
        }));
        let _ = this.set(hooks.clone());

        // Would deadlock if the slot lock were held while calling the handler.
        assert!(hooks.emit_end(Some("bye".into())));
        assert_eq!(hooks.armed(), 0);
    }

    #[test]
    fn test_emit_passes_payload() {
        let seen = Arc::new(Mutex::new(None));
        let s = seen.clone();
        let hooks = SessionHooks::new().on_kicked(move |reason| *s.lock() = Some(reason));

        hooks.emit_kicked("banned".into());
        assert_eq!(seen.lock().as_deref(), Some("banned"));
    }

    #[test]
    fn test_control_state_parse() {
        assert_eq!("forward".parse::<ControlState>(), Ok(ControlState::Forward));
        assert_eq!("JUMP".parse::<ControlState>(), Ok(ControlState::Jump));
        assert!("fly".parse::<ControlState>().is_err());
        assert_eq!(ControlState::Sprint.to_string(), "sprint");
    }

    #[test]
    fn test_control_state_serde() {
        let json = serde_json::to_string(&ControlState::Back).unwrap();
        assert_eq!(json, "\"back\"");
        let parsed: Vec<ControlState> = serde_json::from_str(r#"["left","right"]"#).unwrap();
        assert_eq!(parsed, vec![ControlState::Left, ControlState::Right]);
    }
}
