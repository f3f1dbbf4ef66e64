//! Stored OAuth grant for one (account, provider) pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Provider;

/// One OAuth grant. Created at account-linking time (outside this engine),
/// mutated in place whenever a token refresh succeeds, never deleted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub account_id: Uuid,
    pub provider: Provider,
    pub access_token: String,
    /// Absent for grants issued without offline access; a refresh is only
    /// attempted when this is present.
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// True when the stored access token can still be used without a
    /// refresh. An unknown expiry is treated as expired.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry > now)
    }
}
