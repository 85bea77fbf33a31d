// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Periodic in-world activity.
//!
//! While a session is spawned, every tick:
//! - looks in a random direction (yaw and pitch uniform in `[-pi/2, pi/2)`);
//! - holds a random movement command, sometimes sprinting, for the hold
//!   duration, then releases every control.
//!
//! The look is a non-blocking call; the hold runs as its own task so neither
//! delays the other nor the timer. A hold still running when the next tick
//! fires is cut short and the controls are cleared before the next command.

use crate::config::ActionSettings;
use crate::session::{ControlState, Session};
use std::f32::consts::PI;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

/// The single recurring activity task of a spawned session.
///
/// Dropping or stopping the timer aborts the task, and with it any hold in
/// progress.
#[derive(Debug)]
pub struct ActivityTimer {
    task: JoinHandle<()>,
}

impl ActivityTimer {
    /// Start ticking for `session` on `runtime`. The first tick fires one
    /// interval from now.
    pub fn start(session: Arc<dyn Session>, settings: ActionSettings, runtime: &Handle) -> Self {
        let first_tick = Instant::now() + settings.interval();
        let task = runtime.spawn(run(session, settings, first_tick));
        Self { task }
    }

    /// Stop ticking immediately.
    pub fn stop(self) {
        // Drop aborts.
    }

    /// True once the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ActivityTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(session: Arc<dyn Session>, settings: ActionSettings, first_tick: Instant) {
    let period = settings.interval();
    let mut ticker = time::interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut rng = fastrand::Rng::new();
    let mut holds: JoinSet<()> = JoinSet::new();

    loop {
        ticker.tick().await;

        while holds.try_join_next().is_some() {}
        if !holds.is_empty() {
            holds.shutdown().await;
            session.clear_control_states();
        }

        change_view(session.as_ref(), &mut rng);

        if let Some(command) = pick_command(&settings.commands, &mut rng) {
            let sprint = rng.f64() < settings.sprint_chance;
            holds.spawn(hold_command(
                session.clone(),
                command,
                sprint,
                settings.hold_duration(),
            ));
        }
    }
}

fn change_view(session: &dyn Session, rng: &mut fastrand::Rng) {
    let (yaw, pitch) = random_view(rng);
    session.look(yaw, pitch, false);
}

/// Random yaw/pitch in radians, each within `[-pi/2, pi/2)`.
pub fn random_view(rng: &mut fastrand::Rng) -> (f32, f32) {
    let yaw = rng.f32() * PI - 0.5 * PI;
    let pitch = rng.f32() * PI - 0.5 * PI;
    (yaw, pitch)
}

fn pick_command(commands: &[ControlState], rng: &mut fastrand::Rng) -> Option<ControlState> {
    if commands.is_empty() {
        return None;
    }
    Some(commands[rng.usize(..commands.len())])
}

async fn hold_command(
    session: Arc<dyn Session>,
    command: ControlState,
    sprint: bool,
    hold: Duration,
) {
    debug!(
        "[ACTION] {}{}",
        command,
        if sprint { " with sprinting" } else { "" }
    );

    session.set_control_state(ControlState::Sprint, sprint);
    session.set_control_state(command, true);

    time::sleep(hold).await;
    session.clear_control_states();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_view_range() {
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..1000 {
            let (yaw, pitch) = random_view(&mut rng);
            assert!((-0.5 * PI..=0.5 * PI).contains(&yaw), "yaw {}", yaw);
            assert!((-0.5 * PI..=0.5 * PI).contains(&pitch), "pitch {}", pitch);
        }
    }

    #[test]
    fn test_pick_command() {
        let mut rng = fastrand::Rng::with_seed(1);
        assert_eq!(pick_command(&[], &mut rng), None);

        let commands = [ControlState::Forward, ControlState::Left];
        for _ in 0..100 {
            let picked = pick_command(&commands, &mut rng).unwrap();
            assert!(commands.contains(&picked));
        }
    }
}
