//! Google Calendar connector.
//!
//! Inbound sync uses the events list API: a bounded `timeMin`/`timeMax`
//! query in full-window mode, `syncToken` in incremental mode, `pageToken`
//! pagination in both, and `nextSyncToken` on the final page as the next
//! cursor. A stale sync token comes back as 410 Gone. All-day events travel
//! as bare dates with an exclusive end date.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::config::ProviderConfig;
use crate::dates;
use crate::error::SyncError;
use crate::model::{
    Attendee, Credential, Event, EventStatus, EventTime, Provider, Reminder, ReminderMethod,
    ResponseStatus,
};
use crate::recurrence::RecurrenceRule;

use super::{
    CalendarConnector, EventChange, EventPage, PageRequest, PushAck, RefreshedToken,
    RemoteCalendar, RemoteEvent, SyncMode,
};

pub struct GoogleConnector {
    http: reqwest::Client,
    config: ProviderConfig,
    page_size: u32,
}

// --- wire types ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListEntry {
    id: String,
    summary: Option<String>,
    description: Option<String>,
    background_color: Option<String>,
    #[serde(default)]
    primary: bool,
    access_role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsResponse {
    #[serde(default)]
    items: Vec<GoogleEvent>,
    next_page_token: Option<String>,
    next_sync_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEvent {
    id: String,
    status: Option<String>,
    etag: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: Option<GoogleEventTime>,
    end: Option<GoogleEventTime>,
    recurrence: Option<Vec<String>>,
    recurring_event_id: Option<String>,
    original_start_time: Option<GoogleEventTime>,
    #[serde(default)]
    attendees: Vec<GoogleAttendee>,
    reminders: Option<GoogleReminders>,
    updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventTime {
    date: Option<NaiveDate>,
    date_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleAttendee {
    email: Option<String>,
    display_name: Option<String>,
    response_status: Option<String>,
    #[serde(default)]
    organizer: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleReminders {
    #[serde(default)]
    overrides: Vec<GoogleReminderOverride>,
}

#[derive(Debug, Deserialize)]
struct GoogleReminderOverride {
    method: Option<String>,
    minutes: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

fn response_status_from_wire(value: &str) -> Option<ResponseStatus> {
    match value {
        "accepted" => Some(ResponseStatus::Accepted),
        "declined" => Some(ResponseStatus::Declined),
        "tentative" => Some(ResponseStatus::Tentative),
        "needsAction" => Some(ResponseStatus::NeedsAction),
        _ => None,
    }
}

fn response_status_to_wire(status: ResponseStatus) -> &'static str {
    match status {
        ResponseStatus::Accepted => "accepted",
        ResponseStatus::Declined => "declined",
        ResponseStatus::Tentative => "tentative",
        ResponseStatus::NeedsAction => "needsAction",
    }
}

/// Normalize the `recurrence` string array into the canonical rule.
/// Best-effort: a missing or unparseable RRULE line yields `None`.
fn recurrence_from_wire(lines: &[String], event_id: &str) -> Option<String> {
    let rrule = lines.iter().find_map(|line| line.strip_prefix("RRULE:"))?;
    match RecurrenceRule::parse(rrule) {
        Some(rule) => Some(rule.to_string()),
        None => {
            warn!(
                event_id = %event_id,
                rrule = %rrule,
                "unsupported recurrence pattern dropped"
            );
            None
        }
    }
}

fn event_time_from_wire(time: &GoogleEventTime, is_end: bool) -> Option<EventTime> {
    if let Some(instant) = time.date_time {
        return Some(EventTime::Timed(instant));
    }
    let date = time.date?;
    // Google's all-day end date is exclusive; the local convention is the
    // inclusive last day.
    Some(EventTime::AllDay(if is_end {
        dates::inclusive_last_day(date)
    } else {
        date
    }))
}

fn event_time_to_wire(time: &EventTime, is_end: bool) -> serde_json::Value {
    match time {
        EventTime::AllDay(date) => {
            let wire_date = if is_end {
                dates::exclusive_end_date(*date)
            } else {
                *date
            };
            json!({ "date": wire_date.format("%Y-%m-%d").to_string() })
        }
        EventTime::Timed(instant) => json!({ "dateTime": instant.to_rfc3339() }),
    }
}

fn translate_event(event: GoogleEvent) -> Option<EventChange> {
    if event.status.as_deref() == Some("cancelled") {
        return Some(EventChange::Delete {
            external_id: event.id,
        });
    }

    let start = event_time_from_wire(event.start.as_ref()?, false)?;
    let end = event_time_from_wire(event.end.as_ref()?, true)?;

    let status = match event.status.as_deref() {
        Some("tentative") => EventStatus::Tentative,
        _ => EventStatus::Confirmed,
    };

    let recurrence = event
        .recurrence
        .as_deref()
        .and_then(|lines| recurrence_from_wire(lines, &event.id));

    let original_start = event
        .original_start_time
        .as_ref()
        .and_then(|time| event_time_from_wire(time, false));

    let attendees = event
        .attendees
        .into_iter()
        .filter_map(|attendee| {
            Some(Attendee {
                email: attendee.email?,
                name: attendee.display_name,
                response: attendee
                    .response_status
                    .as_deref()
                    .and_then(response_status_from_wire),
                organizer: attendee.organizer,
            })
        })
        .collect();

    let reminders = event
        .reminders
        .map(|reminders| {
            reminders
                .overrides
                .into_iter()
                .map(|entry| Reminder {
                    method: match entry.method.as_deref() {
                        Some("email") => ReminderMethod::Email,
                        _ => ReminderMethod::Popup,
                    },
                    minutes_before: entry.minutes,
                })
                .collect()
        })
        .unwrap_or_default();

    Some(EventChange::Upsert(RemoteEvent {
        external_id: event.id,
        title: event.summary.unwrap_or_else(|| "(no title)".to_string()),
        description: event.description,
        location: event.location,
        start,
        end,
        status,
        recurrence,
        series_master_id: event.recurring_event_id,
        original_start,
        attendees,
        reminders,
        change_tag: event.etag,
        updated_at: event.updated,
    }))
}

fn event_to_wire(event: &Event) -> serde_json::Value {
    let status = match event.status {
        EventStatus::Confirmed => "confirmed",
        EventStatus::Tentative => "tentative",
        EventStatus::Cancelled => "cancelled",
    };

    let mut body = json!({
        "summary": event.title,
        "status": status,
        "start": event_time_to_wire(&event.start, false),
        "end": event_time_to_wire(&event.end, true),
    });

    if let Some(description) = &event.description {
        body["description"] = json!(description);
    }
    if let Some(location) = &event.location {
        body["location"] = json!(location);
    }
    if let Some(rule) = &event.recurrence {
        body["recurrence"] = json!([format!("RRULE:{rule}")]);
    }
    if !event.attendees.is_empty() {
        body["attendees"] = json!(
            event
                .attendees
                .iter()
                .map(|attendee| {
                    let mut entry = json!({ "email": attendee.email });
                    if let Some(name) = &attendee.name {
                        entry["displayName"] = json!(name);
                    }
                    if let Some(response) = attendee.response {
                        entry["responseStatus"] = json!(response_status_to_wire(response));
                    }
                    entry
                })
                .collect::<Vec<_>>()
        );
    }
    if !event.reminders.is_empty() {
        body["reminders"] = json!({
            "useDefault": false,
            "overrides": event
                .reminders
                .iter()
                .map(|reminder| {
                    json!({
                        "method": match reminder.method {
                            ReminderMethod::Popup => "popup",
                            ReminderMethod::Email => "email",
                        },
                        "minutes": reminder.minutes_before,
                    })
                })
                .collect::<Vec<_>>(),
        });
    }

    body
}

impl GoogleConnector {
    pub fn new(http: reqwest::Client, config: ProviderConfig, page_size: u32) -> Self {
        Self {
            http,
            config,
            page_size,
        }
    }

    async fn read_error(response: reqwest::Response) -> SyncError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        SyncError::from_response(status, body)
    }

    fn events_url(&self, calendar_external_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.config.api_base, calendar_external_id
        )
    }
}

#[async_trait]
impl CalendarConnector for GoogleConnector {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    async fn refresh_access_token(
        &self,
        credential: &Credential,
    ) -> Result<RefreshedToken, SyncError> {
        let refresh_token =
            credential
                .refresh_token
                .as_deref()
                .ok_or(SyncError::CredentialMissing {
                    account_id: credential.account_id,
                    provider: Provider::Google,
                })?;

        let response = self
            .http
            .post(format!("{}/token", self.config.oauth_base))
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SyncError::TokenRefreshFailed {
                provider: Provider::Google,
                message,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| SyncError::MalformedResponse(format!("token response: {err}")))?;

        Ok(RefreshedToken {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: token
                .expires_in
                .map(|seconds| Utc::now() + chrono::Duration::seconds(seconds)),
        })
    }

    async fn list_calendars(&self, access_token: &str) -> Result<Vec<RemoteCalendar>, SyncError> {
        let mut calendars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![("maxResults", self.page_size.to_string())];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let response = self
                .http
                .get(format!("{}/users/me/calendarList", self.config.api_base))
                .bearer_auth(access_token)
                .query(&params)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(Self::read_error(response).await);
            }

            let page: CalendarListResponse = response
                .json()
                .await
                .map_err(|err| SyncError::MalformedResponse(format!("calendar list: {err}")))?;

            calendars.extend(page.items.into_iter().map(|entry| RemoteCalendar {
                is_read_only: matches!(
                    entry.access_role.as_deref(),
                    Some("reader") | Some("freeBusyReader")
                ),
                external_id: entry.id,
                name: entry.summary.unwrap_or_else(|| "(unnamed)".to_string()),
                description: entry.description,
                color: entry.background_color,
                is_primary: entry.primary,
            }));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(calendars)
    }

    async fn fetch_events_page(
        &self,
        access_token: &str,
        calendar_external_id: &str,
        request: &PageRequest,
    ) -> Result<EventPage, SyncError> {
        let mut params = vec![("maxResults", self.page_size.to_string())];
        match &request.mode {
            SyncMode::Incremental { cursor } => {
                params.push(("syncToken", cursor.clone()));
            }
            SyncMode::FullWindow { start, end } => {
                params.push(("timeMin", start.to_rfc3339()));
                params.push(("timeMax", end.to_rfc3339()));
                params.push(("showDeleted", "true".to_string()));
                params.push(("singleEvents", "false".to_string()));
            }
        }
        if let Some(token) = &request.page_token {
            params.push(("pageToken", token.clone()));
        }

        let response = self
            .http
            .get(self.events_url(calendar_external_id))
            .bearer_auth(access_token)
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let page: EventsResponse = response
            .json()
            .await
            .map_err(|err| SyncError::MalformedResponse(format!("events page: {err}")))?;

        let changes = page.items.into_iter().filter_map(translate_event).collect();

        Ok(EventPage {
            changes,
            next_page_token: page.next_page_token,
            next_cursor: page.next_sync_token,
        })
    }

    async fn create_event(
        &self,
        access_token: &str,
        calendar_external_id: &str,
        event: &Event,
    ) -> Result<PushAck, SyncError> {
        let response = self
            .http
            .post(self.events_url(calendar_external_id))
            .bearer_auth(access_token)
            .json(&event_to_wire(event))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let created: GoogleEvent = response
            .json()
            .await
            .map_err(|err| SyncError::MalformedResponse(format!("created event: {err}")))?;

        Ok(PushAck {
            external_id: created.id,
            change_tag: created.etag,
        })
    }

    async fn update_event(
        &self,
        access_token: &str,
        calendar_external_id: &str,
        external_id: &str,
        event: &Event,
    ) -> Result<Option<String>, SyncError> {
        let response = self
            .http
            .patch(format!(
                "{}/{}",
                self.events_url(calendar_external_id),
                external_id
            ))
            .bearer_auth(access_token)
            .json(&event_to_wire(event))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let updated: GoogleEvent = response
            .json()
            .await
            .map_err(|err| SyncError::MalformedResponse(format!("updated event: {err}")))?;

        Ok(updated.etag)
    }

    async fn delete_event(
        &self,
        access_token: &str,
        calendar_external_id: &str,
        external_id: &str,
    ) -> Result<(), SyncError> {
        let response = self
            .http
            .delete(format!(
                "{}/{}",
                self.events_url(calendar_external_id),
                external_id
            ))
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status.is_success()
            || status == reqwest::StatusCode::NOT_FOUND
            || status == reqwest::StatusCode::GONE
        {
            // Already gone remotely counts as a successful delete.
            return Ok(());
        }

        Err(Self::read_error(response).await)
    }
}
