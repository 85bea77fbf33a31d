// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Operations exposed to the control surface.

use crate::config::{ConfigError, ConfigUpdate, RuntimeConfig, RuntimeConfigStore};
use crate::lifecycle::{LifecycleController, Status};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Control surface errors.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The update could not be applied; nothing changed.
    #[error("Invalid config update: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Status / update / restart, delegating to the lifecycle controller.
#[derive(Clone, Debug)]
pub struct ControlFacade {
    controller: LifecycleController,
    config: Arc<RuntimeConfigStore>,
}

impl ControlFacade {
    /// Wrap a controller; updates go to the controller's config store.
    pub fn new(controller: LifecycleController) -> Self {
        let config = controller.config_store().clone();
        Self { controller, config }
    }

    /// Connected flag, username and current target.
    pub fn status(&self) -> Status {
        self.controller.status()
    }

    /// Apply a partial update. Reconnects only when `restart` is set.
    pub fn update_config(
        &self,
        update: &ConfigUpdate,
        restart: bool,
    ) -> Result<RuntimeConfig, ControlError> {
        let config = self.config.update(update)?;
        if restart {
            self.controller.restart();
        }
        Ok(config)
    }

    /// Force an immediate reconnect, overriding any pending one.
    pub fn restart(&self) {
        info!("[CONTROL] Restart requested");
        self.controller.restart();
    }
}
