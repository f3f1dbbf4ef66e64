//! Provider connectors.
//!
//! The engine depends only on the [`CalendarConnector`] trait; the Google
//! and Microsoft Graph implementations hide every wire-level difference
//! (recurrence dialect, all-day conventions, token/cursor model) behind the
//! shared DTOs in this module.

pub mod google;
pub mod microsoft;
pub mod registry;

pub use google::GoogleConnector;
pub use microsoft::MicrosoftConnector;
pub use registry::ConnectorRegistry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SyncError;
use crate::model::{
    Attendee, Credential, Event, EventStatus, EventTime, Provider, Reminder,
};

/// Result of a successful refresh-grant exchange.
#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub access_token: String,
    /// Present only when the provider rotated the refresh token; the caller
    /// keeps the old one otherwise.
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// A calendar as seen on the remote side, already translated out of the
/// provider's wire format.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCalendar {
    pub external_id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub is_primary: bool,
    pub is_read_only: bool,
}

/// An upsertable event in canonical form.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEvent {
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    pub status: EventStatus,
    pub recurrence: Option<String>,
    pub series_master_id: Option<String>,
    pub original_start: Option<EventTime>,
    pub attendees: Vec<Attendee>,
    pub reminders: Vec<Reminder>,
    pub change_tag: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One entry of an inbound page: either a translated upsert or a deletion
/// keyed by the remote identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum EventChange {
    Upsert(RemoteEvent),
    Delete { external_id: String },
}

/// One page of an inbound sync pass.
#[derive(Debug, Clone)]
pub struct EventPage {
    pub changes: Vec<EventChange>,
    /// Opaque continuation for the next page of the same pass, if any.
    pub next_page_token: Option<String>,
    /// The cursor to persist once the pass drains; providers emit it on the
    /// final page (Google `nextSyncToken`, Graph `deltaLink`).
    pub next_cursor: Option<String>,
}

/// How an inbound pass addresses the remote change feed.
#[derive(Debug, Clone)]
pub enum SyncMode {
    /// No usable cursor: fetch everything inside a bounded window.
    FullWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Cursor-driven: the provider returns only changes since the cursor
    /// was issued.
    Incremental { cursor: String },
}

#[derive(Debug, Clone)]
pub struct PageRequest {
    pub mode: SyncMode,
    pub page_token: Option<String>,
}

impl PageRequest {
    pub fn first(mode: SyncMode) -> Self {
        Self {
            mode,
            page_token: None,
        }
    }
}

/// Acknowledgment of an outbound create.
#[derive(Debug, Clone)]
pub struct PushAck {
    pub external_id: String,
    pub change_tag: Option<String>,
}

/// Uniform capability set over one remote calendar system.
#[async_trait]
pub trait CalendarConnector: Send + Sync {
    fn provider(&self) -> Provider;

    /// Exchange the stored refresh token for a fresh access token. The
    /// caller (the token refresher) owns persistence and single-flight
    /// locking.
    async fn refresh_access_token(
        &self,
        credential: &Credential,
    ) -> Result<RefreshedToken, SyncError>;

    /// Every remote calendar visible to the account, across all pages.
    async fn list_calendars(&self, access_token: &str) -> Result<Vec<RemoteCalendar>, SyncError>;

    /// Fetch one page of event changes. A stale cursor surfaces as
    /// [`SyncError::CursorExpired`].
    async fn fetch_events_page(
        &self,
        access_token: &str,
        calendar_external_id: &str,
        request: &PageRequest,
    ) -> Result<EventPage, SyncError>;

    async fn create_event(
        &self,
        access_token: &str,
        calendar_external_id: &str,
        event: &Event,
    ) -> Result<PushAck, SyncError>;

    /// Returns the new change tag when the provider reports one.
    async fn update_event(
        &self,
        access_token: &str,
        calendar_external_id: &str,
        external_id: &str,
        event: &Event,
    ) -> Result<Option<String>, SyncError>;

    /// Already-deleted responses (404/410) count as success.
    async fn delete_event(
        &self,
        access_token: &str,
        calendar_external_id: &str,
        external_id: &str,
    ) -> Result<(), SyncError>;
}
