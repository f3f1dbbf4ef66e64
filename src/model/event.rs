//! Event record: one occurrence or recurring-series master within a calendar.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Link between a local event row and its remote counterpart.
///
/// A locally created event starts `Unsynced`; the only transition to
/// `Synced` happens when an outbound create is acknowledged and the
/// provider-assigned identifier and change tag are written back. Outbound
/// update/delete on an `Unsynced` event are no-ops by design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RemoteLink {
    Unsynced,
    Synced {
        external_id: String,
        /// Provider-issued etag equivalent. Stored, not used for conflict
        /// detection.
        change_tag: Option<String>,
    },
}

impl RemoteLink {
    pub fn is_synced(&self) -> bool {
        matches!(self, RemoteLink::Synced { .. })
    }

    pub fn external_id(&self) -> Option<&str> {
        match self {
            RemoteLink::Unsynced => None,
            RemoteLink::Synced { external_id, .. } => Some(external_id),
        }
    }
}

/// Start or end of an event. All-day values are timezone-independent local
/// calendar dates; timed values are absolute instants. For an all-day event
/// the end holds the inclusive last day, and each outbound builder applies
/// its provider's wire convention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventTime {
    AllDay(NaiveDate),
    Timed(DateTime<Utc>),
}

impl EventTime {
    pub fn is_all_day(&self) -> bool {
        matches!(self, EventTime::AllDay(_))
    }

    /// The calendar date of this value, for builders that need a date
    /// regardless of representation.
    pub fn date(&self) -> NaiveDate {
        match self {
            EventTime::AllDay(date) => *date,
            EventTime::Timed(instant) => instant.date_naive(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Confirmed,
    Tentative,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Accepted,
    Declined,
    Tentative,
    NeedsAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendee {
    pub email: String,
    pub name: Option<String>,
    pub response: Option<ResponseStatus>,
    pub organizer: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderMethod {
    Popup,
    Email,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub method: ReminderMethod,
    pub minutes_before: i64,
}

/// An event as stored locally. The tuple (calendar, external id) is the
/// natural key for synced events; unsynced events are addressed by local id
/// only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub calendar_id: Uuid,
    pub remote: RemoteLink,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    pub status: EventStatus,
    /// Canonical recurrence rule string, or `None` for single occurrences
    /// and for native patterns the translator could not express.
    pub recurrence: Option<String>,
    /// Remote identifier of the series master, for modified instances of a
    /// recurring series.
    pub series_master_id: Option<String>,
    /// Original start of a modified recurring instance.
    pub original_start: Option<EventTime>,
    pub attendees: Vec<Attendee>,
    pub reminders: Vec<Reminder>,
    pub updated_at: DateTime<Utc>,
}
