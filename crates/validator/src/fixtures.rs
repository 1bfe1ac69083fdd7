//! Test fixture tracking.
//!
//! Integration checks create real devices and users against the platform.
//! Every created fixture is tracked here so teardown can remove it even when
//! the check that created it failed half-way.

use std::sync::Mutex;

use tracing::{debug, warn};

use crate::clients::ServiceClient;
use crate::config::ServiceSpec;

/// Tracks fixtures created during a run. Shared across checks.
#[derive(Debug, Default)]
pub struct FixtureTracker {
    devices: Mutex<Vec<String>>,
    users: Mutex<Vec<String>>,
}

impl FixtureTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a created device for teardown.
    pub fn track_device(&self, id: impl Into<String>) {
        let id = id.into();
        debug!(device_id = %id, "Tracking fixture device");
        self.devices.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(id);
    }

    /// Forget a device the check already deleted itself.
    pub fn untrack_device(&self, id: &str) {
        self.devices
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .retain(|tracked| tracked != id);
    }

    /// Remember a registered test user for teardown.
    pub fn track_user(&self, id: impl Into<String>) {
        let id = id.into();
        debug!(user_id = %id, "Tracking fixture user");
        self.users.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(id);
    }

    /// Forget a user the check already deleted itself.
    pub fn untrack_user(&self, id: &str) {
        self.users
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .retain(|tracked| tracked != id);
    }

    /// Number of fixtures still awaiting teardown.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.devices
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
            + self
                .users
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .len()
    }

    /// Best-effort teardown of every tracked device. A 404 counts as removed
    /// (something else already deleted it); anything else stays tracked so a
    /// later call can retry. Returns the number removed.
    pub async fn cleanup_devices(&self, devices: &ServiceClient, spec: &ServiceSpec) -> usize {
        let pending: Vec<String> = self
            .devices
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();

        let mut removed = 0;
        for id in pending {
            let path = spec.route(&format!("/{id}"));
            match devices.delete(&path).await {
                Ok(status) if status.is_success() || status.as_u16() == 404 => {
                    self.untrack_device(&id);
                    removed += 1;
                    debug!(device_id = %id, "Removed fixture device");
                }
                Ok(status) => {
                    warn!(device_id = %id, status = %status, "Fixture delete refused");
                }
                Err(e) => {
                    warn!(device_id = %id, error = %e, "Fixture delete failed");
                }
            }
        }
        removed
    }

    /// Best-effort teardown of every tracked user, same rules as devices.
    pub async fn cleanup_users(&self, auth: &ServiceClient, spec: &ServiceSpec) -> usize {
        let pending: Vec<String> = self
            .users
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();

        let mut removed = 0;
        for id in pending {
            let path = spec.route(&format!("/users/{id}"));
            match auth.delete(&path).await {
                Ok(status) if status.is_success() || status.as_u16() == 404 => {
                    self.untrack_user(&id);
                    removed += 1;
                    debug!(user_id = %id, "Removed fixture user");
                }
                Ok(status) => {
                    warn!(user_id = %id, status = %status, "Fixture delete refused");
                }
                Err(e) => {
                    warn!(user_id = %id, error = %e, "Fixture delete failed");
                }
            }
        }
        removed
    }
}
