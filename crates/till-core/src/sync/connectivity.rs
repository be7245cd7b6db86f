//! Connectivity monitor.
//!
//! Tracks online/offline state from platform signals with a polling
//! fallback. `is_online` never suspends; transitions are delivered through
//! watch subscriptions that unsubscribe when dropped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use super::TaskGuard;

/// An instantaneous reachability check, probed on a fixed interval to catch
/// platform signals that were missed.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn check(&self) -> bool;
}

/// Probe that considers the device online when the remote proxy answers at
/// all (any HTTP response, including errors, means the network is up).
pub struct HttpConnectivityProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpConnectivityProbe {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ConnectivityProbe for HttpConnectivityProbe {
    async fn check(&self) -> bool {
        self.client.get(&self.url).send().await.is_ok()
    }
}

/// Shared handle to the connectivity state.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    tx: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    #[must_use]
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_online);
        Self { tx: Arc::new(tx) }
    }

    /// Instantaneous check; never blocks or suspends
    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Feed a platform connectivity signal. Only actual transitions are
    /// delivered to subscribers.
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
    }

    /// Subscribe to transitions. Dropping the receiver releases the
    /// subscription.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Spawn the polling fallback, re-checking `probe` on a fixed interval.
    /// The returned guard stops the poller when dropped.
    pub fn spawn_poller<P>(&self, probe: P, interval: Duration) -> TaskGuard
    where
        P: ConnectivityProbe + 'static,
    {
        let monitor = self.clone();
        TaskGuard::new(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let online = probe.check().await;
                monitor.set_online(online);
            }
        }))
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}
