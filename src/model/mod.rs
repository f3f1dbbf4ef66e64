//! Domain model for the calendar synchronization engine.

pub mod calendar;
pub mod credential;
pub mod event;

pub use calendar::Calendar;
pub use credential::Credential;
pub use event::{
    Attendee, Event, EventStatus, EventTime, Reminder, ReminderMethod, RemoteLink, ResponseStatus,
};

use serde::{Deserialize, Serialize};

/// Closed set of calendar sources known to the dashboard.
///
/// Only `Google` and `Microsoft` have a remote counterpart that is kept in
/// sync; subscription feeds and derived feeds live entirely in the local
/// store and are no-ops for the pusher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    Google,
    Microsoft,
    Subscription,
    Derived,
}

impl Provider {
    /// Whether this provider participates in bidirectional synchronization.
    pub fn is_synced(self) -> bool {
        matches!(self, Provider::Google | Provider::Microsoft)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Microsoft => "microsoft",
            Provider::Subscription => "subscription",
            Provider::Derived => "derived",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
