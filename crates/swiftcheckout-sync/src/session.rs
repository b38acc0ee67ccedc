//! # Session Context
//!
//! The signed-in identity for this register, injected explicitly into the
//! cache manager and checkout logic.
//!
//! No component reads ambient global state for identity: whoever constructs
//! the manager resolves the session once and passes it in. Accessors are
//! synchronous - session data is local, never fetched over the network.

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// The signed-in session for this register.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    /// Store this register is signed in to. `None` until store selection
    /// completes; submitting a sale without one fails fast.
    pub store_id: Option<i64>,

    /// Signed-in user.
    pub user_id: String,

    /// Account owner (for multi-store accounts).
    pub owner_id: String,

    /// User email, shown on receipts.
    pub email: String,
}

impl SessionContext {
    pub fn new(
        store_id: Option<i64>,
        user_id: impl Into<String>,
        owner_id: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        SessionContext {
            store_id,
            user_id: user_id.into(),
            owner_id: owner_id.into(),
            email: email.into(),
        }
    }

    /// The resolved numeric store id, or [`SyncError::MissingStoreId`].
    ///
    /// Every queue/submit path calls this BEFORE any persistence or
    /// network attempt.
    pub fn resolved_store_id(&self) -> SyncResult<i64> {
        match self.store_id {
            Some(id) if id > 0 => Ok(id),
            _ => Err(SyncError::MissingStoreId),
        }
    }
}
