//! # Connectivity Monitor
//!
//! Single source of truth for online/offline state.
//!
//! ## Design
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Connectivity Monitor                                 │
//! │                                                                         │
//! │  platform signal ──► set_online(bool) ──► tokio::sync::watch           │
//! │                                               │                         │
//! │                         ┌─────────────────────┼─────────────────────┐   │
//! │                         ▼                     ▼                     ▼   │
//! │                 OfflineCacheManager    auto-sync trigger       UI badge │
//! │                                                                         │
//! │  The watch channel keeps only the LATEST value: rapid                   │
//! │  online-offline-online flapping collapses for late subscribers, and    │
//! │  every subscriber sees each transition it is awake for.                │
//! │                                                                         │
//! │  No polling, no retry/backoff here - this component only REPORTS       │
//! │  state changes.                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tokio::sync::watch;
use tracing::info;

/// A point-in-time connectivity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Online,
    Offline,
}

impl ConnectivityState {
    pub fn is_online(&self) -> bool {
        matches!(self, ConnectivityState::Online)
    }
}

/// Online/offline monitor backed by a watch channel.
///
/// Cheap to clone; all clones share the same underlying state. The
/// platform's native connectivity signal drives [`set_online`]; everything
/// else subscribes.
///
/// [`set_online`]: ConnectivityMonitor::set_online
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    tx: watch::Sender<ConnectivityState>,
}

impl ConnectivityMonitor {
    /// Creates a monitor with the given initial state.
    pub fn new(initially_online: bool) -> Self {
        let initial = if initially_online {
            ConnectivityState::Online
        } else {
            ConnectivityState::Offline
        };
        let (tx, _) = watch::channel(initial);
        ConnectivityMonitor { tx }
    }

    /// Current state.
    pub fn state(&self) -> ConnectivityState {
        *self.tx.borrow()
    }

    /// True when the device is online.
    pub fn is_online(&self) -> bool {
        self.state().is_online()
    }

    /// Reports a platform connectivity change.
    ///
    /// Setting the same state twice is a no-op: subscribers only wake on
    /// actual transitions.
    pub fn set_online(&self, online: bool) {
        let next = if online {
            ConnectivityState::Online
        } else {
            ConnectivityState::Offline
        };

        self.tx.send_if_modified(|state| {
            if *state != next {
                info!(?next, "Connectivity transition");
                *state = next;
                true
            } else {
                false
            }
        });
    }

    /// Subscribes to state transitions.
    ///
    /// The receiver's `changed().await` resolves on every transition; read
    /// the latest value with `borrow_and_update()`.
    pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.tx.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        ConnectivityMonitor::new(true)
    }
}
