//! Error taxonomy for the synchronization engine.
//!
//! Inbound sync errors abort the running pass and surface to the caller;
//! already-upserted rows and the previously persisted cursor stay in place.
//! `CursorExpired` is recovered inside the engine via a full-window resync
//! and never reaches the caller. Outbound push errors are logged and
//! swallowed at the pusher layer.

use thiserror::Error;
use uuid::Uuid;

use crate::model::Provider;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum SyncError {
    /// No credential row, or a credential without a refresh token. Fatal and
    /// non-retryable for the current pass.
    #[error("no usable credential for account {account_id} ({provider})")]
    CredentialMissing {
        account_id: Uuid,
        provider: Provider,
    },

    /// The provider's token endpoint rejected the refresh grant.
    #[error("{provider} rejected the token refresh: {message}")]
    TokenRefreshFailed {
        provider: Provider,
        message: String,
    },

    /// The provider signalled that the stored sync cursor is stale (410-class
    /// response). Consumed internally by the inbound synchronizer.
    #[error("sync cursor expired")]
    CursorExpired,

    /// Non-2xx response that is not a cursor-expiry signal.
    #[error("remote request failed with status {status}: {message}")]
    RemoteRequestFailed { status: u16, message: String },

    /// Transport-level failure, including bounded-timeout expiry.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The provider returned a body the wire types cannot make sense of.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    /// The calendar belongs to a provider with no registered connector
    /// (subscription and derived feeds are local-only).
    #[error("no connector registered for provider {0}")]
    UnsupportedProvider(Provider),

    /// The sync pass was cancelled via its cancellation token. The cursor is
    /// left untouched; pages applied so far are kept.
    #[error("sync pass cancelled")]
    Cancelled,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Classify a non-2xx provider response. Both providers signal cursor
    /// expiry with 410 Gone; everything else is a plain remote failure.
    pub fn from_response(status: reqwest::StatusCode, body: String) -> Self {
        if status == reqwest::StatusCode::GONE {
            SyncError::CursorExpired
        } else {
            SyncError::RemoteRequestFailed {
                status: status.as_u16(),
                message: body,
            }
        }
    }
}
