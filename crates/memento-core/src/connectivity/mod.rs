//! Connectivity oracle.
//!
//! Answers "am I online" and notifies subscribers on every reported network
//! state, including repeated reports of the same value. The platform layer
//! feeds it through [`Connectivity::report`], or an optional
//! [`NetworkProbe`] is consulted on each [`Connectivity::is_connected`] call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::Result;

/// Network state as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetworkState {
    /// Link-layer connectivity.
    pub is_connected: bool,
    /// Internet reachability, if the platform has determined it.
    pub is_internet_reachable: Option<bool>,
}

impl NetworkState {
    /// Connected and reachable.
    #[must_use]
    pub const fn online() -> Self {
        Self {
            is_connected: true,
            is_internet_reachable: Some(true),
        }
    }

    /// No connectivity.
    #[must_use]
    pub const fn offline() -> Self {
        Self {
            is_connected: false,
            is_internet_reachable: Some(false),
        }
    }

    /// True only if the link is up and the internet is known to be reachable.
    #[must_use]
    pub const fn is_online(&self) -> bool {
        self.is_connected && matches!(self.is_internet_reachable, Some(true))
    }
}

/// Point-in-time network check supplied by the platform.
pub trait NetworkProbe: Send + Sync {
    /// Read the current network state.
    ///
    /// # Errors
    ///
    /// Any error is treated as offline.
    fn current(&self) -> Result<NetworkState>;
}

type Listener = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    callbacks: HashMap<u64, Listener>,
}

/// The connectivity oracle.
pub struct Connectivity {
    state: watch::Sender<NetworkState>,
    probe: Option<Box<dyn NetworkProbe>>,
    listeners: Arc<Mutex<Listeners>>,
}

impl Connectivity {
    /// Create an oracle with a known initial state.
    #[must_use]
    pub fn new(initial: NetworkState) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            state,
            probe: None,
            listeners: Arc::new(Mutex::new(Listeners::default())),
        }
    }

    /// Create an oracle that asks `probe` on every check.
    #[must_use]
    pub fn with_probe(probe: impl NetworkProbe + 'static) -> Self {
        let initial = probe.current().unwrap_or_else(|_| NetworkState::offline());
        let mut oracle = Self::new(initial);
        oracle.probe = Some(Box::new(probe));
        oracle
    }

    /// Returns true if the device is online right now.
    ///
    /// A failing probe counts as offline.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_online()
    }

    /// Current network state.
    #[must_use]
    pub fn state(&self) -> NetworkState {
        match &self.probe {
            Some(probe) => match probe.current() {
                Ok(state) => state,
                Err(e) => {
                    warn!("Network check failed, assuming offline: {e}");
                    NetworkState::offline()
                }
            },
            None => *self.state.borrow(),
        }
    }

    /// Record a network state change and notify every subscriber.
    ///
    /// Subscribers are notified even if the state did not change.
    pub fn report(&self, state: NetworkState) {
        self.state.send_replace(state);

        let online = state.is_online();
        let callbacks: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .callbacks
            .values()
            .cloned()
            .collect();

        debug!(
            "Network state reported (online: {online}), notifying {} listeners",
            callbacks.len()
        );
        for callback in callbacks {
            callback(online);
        }
    }

    /// Register a callback for every reported state.
    ///
    /// The callback receives whether the new state is online. It stays
    /// registered until the returned [`Subscription`] is unsubscribed or
    /// dropped.
    pub fn subscribe(&self, callback: impl Fn(bool) + Send + Sync + 'static) -> Subscription {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.callbacks.insert(id, Arc::new(callback));

        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Receiver that observes every reported state.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<NetworkState> {
        self.state.subscribe()
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .callbacks
            .len()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(NetworkState::online())
    }
}

/// Handle for a registered connectivity callback.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    /// Remove the callback.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .callbacks
                .remove(&self.id);
        }
    }
}
