//! # Sync Error Types
//!
//! Error types for gateway, connectivity and replay failures.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │    Gateway      │  │     Replay              │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Network        │  │  NotEligible            │ │
//! │  │  MissingStoreId │  │  GatewayRejected│  │  PartialFailure         │ │
//! │  │  InvalidUrl     │  │  Serialization  │  │  SyncInProgress         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Network errors during an online submit are NOT surfaced to the user  │
//! │  as failures: they trigger the offline-queue fallback instead.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering gateway, replay and configuration failures.
///
/// ## Design Principles
/// - Each variant includes enough context for debugging
/// - Errors are categorized for different handling strategies
/// - All errors are `Send + Sync` for async compatibility
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// No resolvable store id in the session context.
    ///
    /// A sale cannot be submitted or queued without one; this is checked
    /// before any persistence or network attempt.
    #[error("No store id in session. Sign in to a store first.")]
    MissingStoreId,

    /// Invalid gateway URL.
    #[error("Invalid gateway URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Gateway Errors
    // =========================================================================
    /// Network-level failure talking to the gateway.
    ///
    /// During an online submit this triggers the offline-queue fallback
    /// rather than failing the sale.
    #[error("Network error: {0}")]
    Network(String),

    /// The gateway answered but rejected the request (`success=false` or a
    /// non-2xx status).
    #[error("Gateway rejected {operation}: {message}")]
    GatewayRejected { operation: String, message: String },

    /// Failed to serialize a gateway payload.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Gateway response could not be parsed.
    #[error("Unexpected gateway response: {0}")]
    UnexpectedResponse(String),

    // =========================================================================
    // Replay Errors
    // =========================================================================
    /// A queued sale failed eligibility checks (empty lines, non-positive
    /// total). The record is marked failed, never deleted.
    #[error("Sale {client_ref} not eligible for replay: {reason}")]
    NotEligible { client_ref: String, reason: String },

    /// The remote group was created but one or more lines failed.
    ///
    /// The group is NOT rolled back; the next retry tolerates it already
    /// existing (idempotent create keyed on `client_ref`).
    #[error("Partial failure for sale {client_ref}: group {group_id} created, {failed_lines} line(s) failed: {message}")]
    PartialFailure {
        client_ref: String,
        group_id: String,
        failed_lines: usize,
        message: String,
    },

    /// A sync pass is already in flight (re-entrancy guard).
    #[error("A sync pass is already running")]
    SyncInProgress,

    /// Validation problems collected before submit.
    #[error("Sale validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Local storage failure (logged and re-raised, never swallowed).
    #[error("Local storage error: {0}")]
    Database(String),

    /// Internal sync error.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<swiftcheckout_db::DbError> for SyncError {
    fn from(err: swiftcheckout_db::DbError) -> Self {
        SyncError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SyncError::UnexpectedResponse(err.to_string())
        } else {
            SyncError::Network(err.to_string())
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for fallback logic)
// =============================================================================

impl SyncError {
    /// Returns true if the operation can be retried on a later pass.
    ///
    /// ## Retryable Errors
    /// - Network failures
    /// - Gateway rejections (the backend may recover)
    /// - Partial failures (idempotent group creation makes retry safe)
    ///
    /// ## Non-Retryable Errors
    /// - Configuration errors
    /// - Validation/eligibility failures (the record itself is wrong)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::Network(_)
                | SyncError::GatewayRejected { .. }
                | SyncError::PartialFailure { .. }
                | SyncError::UnexpectedResponse(_)
        )
    }

    /// Returns true if an online submit hitting this error should fall
    /// back to offline queueing instead of failing the sale.
    pub fn should_queue_offline(&self) -> bool {
        matches!(
            self,
            SyncError::Network(_) | SyncError::UnexpectedResponse(_)
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::MissingStoreId
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}
