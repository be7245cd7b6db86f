//! Runtime configuration for the sync subsystem.
//!
//! `SyncSettings` are build/deploy tunables; `StoreContext` is the runtime
//! tenant scope, set by the sign-in flow and consulted by every remote call.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::StoreProfile;

/// Tunables for the sync engine and connectivity monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Base URL of the remote proxy API
    pub endpoint: Option<String>,
    /// Background drain heartbeat
    pub heartbeat_interval_secs: u64,
    /// Connectivity polling fallback interval
    pub connectivity_poll_secs: u64,
    /// Attempts before a queue entry is marked failed
    pub retry_ceiling: u32,
    /// How long completed queue entries are retained before GC
    pub completed_retention_hours: i64,
    /// Whether the remote database writes activity logs via triggers.
    /// When off, the engine emits a synthetic activity log per synced sale.
    pub activity_log_triggers: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            heartbeat_interval_secs: 30,
            connectivity_poll_secs: 5,
            retry_ceiling: 5,
            completed_retention_hours: 24,
            activity_log_triggers: false,
        }
    }
}

impl SyncSettings {
    #[must_use]
    pub const fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    #[must_use]
    pub const fn connectivity_poll_interval(&self) -> Duration {
        Duration::from_secs(self.connectivity_poll_secs)
    }

    /// RFC 3339 cutoff before which completed queue entries are collected.
    #[must_use]
    pub fn completed_cutoff(&self) -> String {
        (chrono::Utc::now() - chrono::Duration::hours(self.completed_retention_hours)).to_rfc3339()
    }
}

/// Shared handle to the active store (tenant) profile.
///
/// Explicitly constructed at application start-up and cloned into the
/// services that need tenant scoping; there is no process-global fallback.
#[derive(Debug, Clone, Default)]
pub struct StoreContext {
    inner: Arc<RwLock<Option<StoreProfile>>>,
}

impl StoreContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a context that is already signed in to `profile`
    #[must_use]
    pub fn with_profile(profile: StoreProfile) -> Self {
        let context = Self::new();
        context.set(profile);
        context
    }

    pub fn set(&self, profile: StoreProfile) {
        *self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(profile);
    }

    /// Drop the tenant scope (sign-out)
    pub fn clear(&self) {
        *self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    #[must_use]
    pub fn profile(&self) -> Option<StoreProfile> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The scoping identifier required by every remote call.
    pub fn store_id(&self) -> Result<String> {
        self.profile()
            .map(|profile| profile.id)
            .ok_or(Error::MissingStoreContext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_sync_contract() {
        let settings = SyncSettings::default();
        assert_eq!(settings.heartbeat_interval(), Duration::from_secs(30));
        assert_eq!(settings.connectivity_poll_interval(), Duration::from_secs(5));
        assert_eq!(settings.retry_ceiling, 5);
        assert_eq!(settings.completed_retention_hours, 24);
        assert!(!settings.activity_log_triggers);
    }

    #[test]
    fn settings_deserialize_with_partial_fields() {
        let settings: SyncSettings =
            serde_json::from_str(r#"{"endpoint": "https://api.example.com/api/sync"}"#).unwrap();
        assert_eq!(
            settings.endpoint.as_deref(),
            Some("https://api.example.com/api/sync")
        );
        assert_eq!(settings.retry_ceiling, 5);
    }

    #[test]
    fn store_context_requires_sign_in() {
        let context = StoreContext::new();
        assert!(matches!(
            context.store_id(),
            Err(Error::MissingStoreContext)
        ));

        context.set(StoreProfile::new("store-1", "Warung Sinar", 11.0));
        assert_eq!(context.store_id().unwrap(), "store-1");

        context.clear();
        assert!(context.profile().is_none());
    }
}
