//! Calendar record: a named remote or local collection of events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Provider;

/// A calendar as stored locally.
///
/// The tuple (account, provider, external id) is the natural key used for
/// upserts during calendar-list sync. `is_primary`, `is_visible`,
/// `is_favorite` and `color` are user-controlled after creation: the list
/// synchronizer sets them once and never overwrites them on later passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    pub id: Uuid,
    pub account_id: Uuid,
    pub provider: Provider,
    /// Remote identifier assigned by the provider, or a locally-assigned
    /// placeholder for subscription feeds.
    pub external_id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub is_primary: bool,
    pub is_read_only: bool,
    pub is_visible: bool,
    pub is_favorite: bool,
    /// Opaque provider-issued cursor: Google's bounded sync token, or the
    /// full Graph delta link URL. `None` means the next inbound pass runs in
    /// full-window mode.
    pub sync_cursor: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
}
