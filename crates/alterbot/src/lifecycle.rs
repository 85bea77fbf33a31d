// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Session lifecycle and reconnection state machine.
//!
//! # State Machine (per session)
//!
//! ```text
//!      +------------+
//!      | Connecting |--(error, no handshake yet)--> ended  => reconnect after initial_delay
//!      +-----+------+
//!            | login / spawn
//!            v
//!      +------------+
//!      |   Online   |--(end)--> ended  => reconnect after retry_delay
//!      +------------+
//! ```
//!
//! An error after the handshake is only logged: the `end` that follows
//! drives the reconnect. An `end` before the handshake is only logged: the
//! `error` drives it. Each session reports through one-shot hooks, so at
//! most one of each event arrives per session.
//!
//! # Invariants
//!
//! - At most one live session. Every transition tears the old session down
//!   (hooks detached, then transport closed) and creates the new one inside
//!   the same critical section.
//! - At most one activity timer, attached to the live session.
//! - At most one pending reconnect (`reconnect_pending` debounce).
//! - [`LifecycleController::restart`] bumps a generation counter; a delayed
//!   reconnect that wakes up under a newer generation creates nothing.

use crate::activity::ActivityTimer;
use crate::config::{ActionSettings, ReconnectPolicy, RuntimeConfig, RuntimeConfigStore};
use crate::session::{Session, SessionError, SessionFactory, SessionHooks};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

// ============================================================================
// Public types
// ============================================================================

/// Why a reconnect is being scheduled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Failure {
    /// Transport error before the first handshake.
    InitialConnectFailure,
    /// Session ended after a handshake.
    PostConnectDisconnect,
}

impl Failure {
    /// Delay this failure waits under `policy`.
    pub fn delay(&self, policy: &ReconnectPolicy) -> Duration {
        match self {
            Failure::InitialConnectFailure => policy.initial_delay,
            Failure::PostConnectDisconnect => policy.retry_delay,
        }
    }

    /// Log line prefix.
    pub fn reason(&self) -> &'static str {
        match self {
            Failure::InitialConnectFailure => "Initial connection failed",
            Failure::PostConnectDisconnect => "Disconnected from server",
        }
    }
}

/// Result of [`LifecycleController::schedule_reconnect`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconnectOutcome {
    /// The delay elapsed and a new session was created.
    Reconnected,
    /// Another reconnect was already pending; nothing was done.
    Skipped,
    /// A manual restart happened during the delay; nothing was created.
    Superseded,
}

/// Control-surface view of the controller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Status {
    /// True iff the live session completed its handshake.
    pub connected: bool,
    /// Name accepted by the server, while connected.
    pub username: Option<String>,
    /// Current connection target.
    pub config: RuntimeConfig,
}

/// Reconnect bookkeeping, as seen from outside.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LifecycleState {
    /// The live session has completed a handshake.
    pub has_connected_once: bool,
    /// A reconnect is scheduled and has not started creating its session.
    pub reconnect_pending: bool,
}

// ============================================================================
// Internal state
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    Connecting,
    LoggedIn,
    Spawned,
}

struct LiveSession {
    id: u64,
    handle: Arc<dyn Session>,
    phase: Phase,
    /// Name this session was created with.
    configured_username: String,
    username: Option<String>,
}

impl LiveSession {
    fn has_connected(&self) -> bool {
        self.phase > Phase::Connecting
    }
}

#[derive(Default)]
struct ControllerState {
    session: Option<LiveSession>,
    activity: Option<ActivityTimer>,
    reconnect_pending: bool,
    generation: u64,
    last_session_id: u64,
}

struct Shared {
    factory: Arc<dyn SessionFactory>,
    config: Arc<RuntimeConfigStore>,
    policy: ReconnectPolicy,
    actions: ActionSettings,
    runtime: Handle,
    state: Mutex<ControllerState>,
}

// ============================================================================
// Controller
// ============================================================================

/// Owner of the single live session.
///
/// Cheap to clone; all clones drive the same session.
#[derive(Clone)]
pub struct LifecycleController {
    shared: Arc<Shared>,
}

impl LifecycleController {
    /// Create a controller. Must be called from within a tokio runtime.
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        config: Arc<RuntimeConfigStore>,
        policy: ReconnectPolicy,
        actions: ActionSettings,
    ) -> Self {
        Self::with_runtime(factory, config, policy, actions, Handle::current())
    }

    /// Create a controller that spawns its tasks on `runtime`.
    pub fn with_runtime(
        factory: Arc<dyn SessionFactory>,
        config: Arc<RuntimeConfigStore>,
        policy: ReconnectPolicy,
        actions: ActionSettings,
        runtime: Handle,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                factory,
                config,
                policy,
                actions,
                runtime,
                state: Mutex::new(ControllerState::default()),
            }),
        }
    }

    /// Connection target store shared with the control surface.
    pub fn config_store(&self) -> &Arc<RuntimeConfigStore> {
        &self.shared.config
    }

    /// Create a session if none is live.
    pub fn start(&self) {
        let mut state = self.shared.state.lock();
        if state.session.is_some() {
            debug!("start(): session already live");
            return;
        }
        self.create_locked(&mut state);
    }

    /// Stop the activity timer and release the live session, if any.
    pub fn disconnect(&self) {
        let mut state = self.shared.state.lock();
        Self::teardown_locked(&mut state);
    }

    /// Debounced delayed reconnect.
    ///
    /// Tears the current session down right away, waits `delay`, then
    /// creates a fresh session. Status reads and restarts stay available
    /// during the wait.
    pub async fn schedule_reconnect(&self, delay: Duration, reason: &str) -> ReconnectOutcome {
        let generation = {
            let mut state = self.shared.state.lock();
            match Self::begin_reconnect_locked(&mut state, delay, reason) {
                Some(generation) => generation,
                None => return ReconnectOutcome::Skipped,
            }
        };
        self.finish_reconnect(delay, generation).await
    }

    /// Debounce, mark pending and tear down. Returns the generation the
    /// delayed create must still match, or `None` if already pending.
    fn begin_reconnect_locked(
        state: &mut ControllerState,
        delay: Duration,
        reason: &str,
    ) -> Option<u64> {
        if state.reconnect_pending {
            info!("Reconnect already scheduled, skipping ({})", reason);
            return None;
        }
        state.reconnect_pending = true;
        info!(
            "{}. Reconnecting in {}s...",
            reason,
            delay.as_secs_f64()
        );
        Self::teardown_locked(state);
        Some(state.generation)
    }

    async fn finish_reconnect(&self, delay: Duration, generation: u64) -> ReconnectOutcome {
        tokio::time::sleep(delay).await;

        let mut state = self.shared.state.lock();
        if state.generation != generation {
            debug!(
                "Reconnect from generation {} superseded by restart (now {})",
                generation, state.generation
            );
            return ReconnectOutcome::Superseded;
        }
        state.reconnect_pending = false;
        Self::teardown_locked(&mut state);
        self.create_locked(&mut state);
        ReconnectOutcome::Reconnected
    }

    /// Manual restart: drop any pending reconnect, tear down, reconnect now.
    pub fn restart(&self) {
        info!("Restarting session with current config...");
        let mut state = self.shared.state.lock();
        state.reconnect_pending = false;
        state.generation += 1;
        Self::teardown_locked(&mut state);
        self.create_locked(&mut state);
    }

    /// Connected flag, accepted username and current target.
    pub fn status(&self) -> Status {
        let config = self.shared.config.get();
        let state = self.shared.state.lock();
        let online = state.session.as_ref().filter(|s| s.has_connected());

        Status {
            connected: online.is_some(),
            username: online.and_then(|s| s.username.clone()),
            config,
        }
    }

    /// Reconnect bookkeeping snapshot.
    pub fn lifecycle_state(&self) -> LifecycleState {
        let state = self.shared.state.lock();
        LifecycleState {
            has_connected_once: state.session.as_ref().is_some_and(LiveSession::has_connected),
            reconnect_pending: state.reconnect_pending,
        }
    }

    /// True while a session handle is held.
    pub fn has_session(&self) -> bool {
        self.shared.state.lock().session.is_some()
    }

    /// True while the activity timer is attached.
    pub fn activity_running(&self) -> bool {
        self.shared
            .state
            .lock()
            .activity
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }

    // ------------------------------------------------------------------------
    // Transitions (caller holds the state lock)
    // ------------------------------------------------------------------------

    fn teardown_locked(state: &mut ControllerState) {
        if let Some(timer) = state.activity.take() {
            timer.stop();
        }
        if let Some(live) = state.session.take() {
            debug!("Releasing session #{}", live.id);
            live.handle.remove_all_listeners();
            live.handle.quit();
            live.handle.end();
        }
    }

    fn create_locked(&self, state: &mut ControllerState) {
        debug_assert!(state.session.is_none() && state.activity.is_none());

        let config = self.shared.config.get();
        state.last_session_id += 1;
        let id = state.last_session_id;

        info!("Connecting to {}:{} as {}...", config.host, config.port, config.username);

        let hooks = self.hooks_for(id);
        let handle = self.shared.factory.create(&config, hooks);

        state.session = Some(LiveSession {
            id,
            handle,
            phase: Phase::Connecting,
            configured_username: config.username,
            username: None,
        });
    }

    fn hooks_for(&self, id: u64) -> SessionHooks {
        let weak = Arc::downgrade(&self.shared);
        let on_error = weak.clone();
        let on_kicked = weak.clone();
        let on_end = weak.clone();
        let on_spawn = weak.clone();
        let on_login = weak;

        SessionHooks::new()
            .on_error(move |err| with_controller(&on_error, |c| c.handle_error(id, err)))
            .on_kicked(move |reason| with_controller(&on_kicked, |c| c.handle_kicked(id, reason)))
            .on_end(move |reason| with_controller(&on_end, |c| c.handle_end(id, reason)))
            .on_spawn(move || with_controller(&on_spawn, |c| c.handle_spawn(id)))
            .on_login(move || with_controller(&on_login, |c| c.handle_login(id)))
    }

    // ------------------------------------------------------------------------
    // Hook handlers
    // ------------------------------------------------------------------------

    /// `Some(has_connected)` if `id` is the live session.
    fn live_connected(state: &ControllerState, id: u64) -> Option<bool> {
        state
            .session
            .as_ref()
            .filter(|s| s.id == id)
            .map(LiveSession::has_connected)
    }

    fn handle_error(&self, id: u64, err: SessionError) {
        error!("[ERROR] session #{}: {}", id, err);

        let mut state = self.shared.state.lock();
        match Self::live_connected(&state, id) {
            Some(false) => self.reconnect_locked(&mut state, Failure::InitialConnectFailure),
            Some(true) => debug!("Session #{} was online; end event drives reconnect", id),
            None => debug!("Ignoring error from stale session #{}", id),
        }
    }

    fn handle_kicked(&self, id: u64, reason: String) {
        warn!("[KICKED] session #{}: {}", id, reason);
    }

    fn handle_end(&self, id: u64, reason: Option<String>) {
        info!(
            "[DISCONNECTED] session #{}: {}",
            id,
            reason.as_deref().unwrap_or("Connection ended")
        );

        let mut state = self.shared.state.lock();
        match Self::live_connected(&state, id) {
            Some(true) => self.reconnect_locked(&mut state, Failure::PostConnectDisconnect),
            Some(false) => debug!("Session #{} never connected; error event drives reconnect", id),
            None => debug!("Ignoring end from stale session #{}", id),
        }
    }

    fn handle_login(&self, id: u64) {
        let mut state = self.shared.state.lock();
        let Some(live) = state.session.as_mut().filter(|s| s.id == id) else {
            debug!("Ignoring login from stale session #{}", id);
            return;
        };

        live.phase = live.phase.max(Phase::LoggedIn);
        live.username = live
            .handle
            .username()
            .or_else(|| Some(live.configured_username.clone()));
        info!(
            "[LOGIN] {} connected successfully",
            live.username.as_deref().unwrap_or_default()
        );
    }

    fn handle_spawn(&self, id: u64) {
        let mut state = self.shared.state.lock();
        let handle = match state.session.as_mut().filter(|s| s.id == id) {
            Some(live) => {
                live.phase = Phase::Spawned;
                if live.username.is_none() {
                    live.username = live.handle.username();
                }
                live.handle.clone()
            }
            None => {
                debug!("Ignoring spawn from stale session #{}", id);
                return;
            }
        };

        if let Some(previous) = state.activity.take() {
            previous.stop();
        }
        info!("[SPAWN] session #{} is in the world, starting activity", id);
        state.activity = Some(ActivityTimer::start(
            handle,
            self.shared.actions.clone(),
            &self.shared.runtime,
        ));
    }

    /// Tear down now, create again after the failure's delay.
    fn reconnect_locked(&self, state: &mut ControllerState, failure: Failure) {
        let delay = failure.delay(&self.shared.policy);
        let Some(generation) = Self::begin_reconnect_locked(state, delay, failure.reason()) else {
            return;
        };
        let controller = self.clone();
        self.shared.runtime.spawn(async move {
            controller.finish_reconnect(delay, generation).await;
        });
    }
}

fn with_controller(weak: &Weak<Shared>, f: impl FnOnce(&LifecycleController)) {
    if let Some(shared) = weak.upgrade() {
        f(&LifecycleController { shared });
    }
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("LifecycleController")
            .field("session", &state.session.as_ref().map(|s| (s.id, s.phase)))
            .field("activity", &state.activity.is_some())
            .field("reconnect_pending", &state.reconnect_pending)
            .field("generation", &state.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_delays() {
        let policy = ReconnectPolicy {
            initial_delay: Duration::from_secs(60),
            retry_delay: Duration::from_secs(5),
        };
        assert_eq!(
            Failure::InitialConnectFailure.delay(&policy),
            Duration::from_secs(60)
        );
        assert_eq!(
            Failure::PostConnectDisconnect.delay(&policy),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_phase_ordering() {
        assert!(Phase::Connecting < Phase::LoggedIn);
        assert!(Phase::LoggedIn < Phase::Spawned);
        assert_eq!(Phase::Spawned.max(Phase::LoggedIn), Phase::Spawned);
    }
}
