//! Microsoft Graph connector.
//!
//! Inbound sync uses the calendarView delta API: a bounded
//! `startDateTime`/`endDateTime` delta query in full-window mode, the stored
//! `deltaLink` in incremental mode, `@odata.nextLink` pagination in both,
//! and the final page's `@odata.deltaLink` as the next cursor. A stale delta
//! link comes back as 410 Gone. All-day events travel as `isAllDay` plus
//! midnight-to-midnight datetimes with an exclusive end.

use async_trait::async_trait;
use chrono::Utc;
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
use crate::recurrence::{ByDay, Frequency, RecurrenceRule, RuleEnd};

use super::{
    CalendarConnector, EventChange, EventPage, PageRequest, PushAck, RefreshedToken,
    RemoteCalendar, RemoteEvent, SyncMode,
};

pub struct MicrosoftConnector {
    http: reqwest::Client,
    config: ProviderConfig,
    page_size: u32,
}

// --- wire types ---

#[derive(Debug, Deserialize)]
struct CalendarsResponse {
    #[serde(default)]
    value: Vec<GraphCalendar>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphCalendar {
    id: String,
    name: Option<String>,
    color: Option<String>,
    #[serde(default)]
    is_default_calendar: bool,
    #[serde(default = "default_true")]
    can_edit: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct DeltaResponse {
    #[serde(default)]
    value: Vec<GraphEvent>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
    #[serde(rename = "@odata.deltaLink")]
    delta_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphEvent {
    id: String,
    #[serde(rename = "@removed")]
    removed: Option<serde_json::Value>,
    #[serde(default)]
    is_cancelled: bool,
    subject: Option<String>,
    body_preview: Option<String>,
    location: Option<GraphLocation>,
    start: Option<GraphDateTime>,
    end: Option<GraphDateTime>,
    #[serde(default)]
    is_all_day: bool,
    show_as: Option<String>,
    change_key: Option<String>,
    recurrence: Option<PatternedRecurrence>,
    series_master_id: Option<String>,
    original_start: Option<String>,
    #[serde(default)]
    attendees: Vec<GraphAttendee>,
    reminder_minutes_before_start: Option<i64>,
    #[serde(default)]
    is_reminder_on: bool,
    last_modified_date_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphLocation {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphDateTime {
    date_time: String,
    #[allow(dead_code)]
    time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphAttendee {
    email_address: Option<GraphEmailAddress>,
    status: Option<GraphResponseStatus>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphEmailAddress {
    address: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphResponseStatus {
    response: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatternedRecurrence {
    pattern: GraphPattern,
    range: Option<GraphRange>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphPattern {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default = "default_interval")]
    interval: u32,
    #[serde(default)]
    days_of_week: Vec<String>,
    day_of_month: Option<u32>,
    month: Option<u32>,
    index: Option<String>,
}

fn default_interval() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphRange {
    #[serde(rename = "type")]
    kind: String,
    end_date: Option<chrono::NaiveDate>,
    number_of_occurrences: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

// --- recurrence translation ---

fn weekday_from_graph(name: &str) -> Option<chrono::Weekday> {
    match name {
        "monday" => Some(chrono::Weekday::Mon),
        "tuesday" => Some(chrono::Weekday::Tue),
        "wednesday" => Some(chrono::Weekday::Wed),
        "thursday" => Some(chrono::Weekday::Thu),
        "friday" => Some(chrono::Weekday::Fri),
        "saturday" => Some(chrono::Weekday::Sat),
        "sunday" => Some(chrono::Weekday::Sun),
        _ => None,
    }
}

fn weekday_to_graph(weekday: chrono::Weekday) -> &'static str {
    match weekday {
        chrono::Weekday::Mon => "monday",
        chrono::Weekday::Tue => "tuesday",
        chrono::Weekday::Wed => "wednesday",
        chrono::Weekday::Thu => "thursday",
        chrono::Weekday::Fri => "friday",
        chrono::Weekday::Sat => "saturday",
        chrono::Weekday::Sun => "sunday",
    }
}

fn ordinal_from_index(index: &str) -> Option<i8> {
    match index {
        "first" => Some(1),
        "second" => Some(2),
        "third" => Some(3),
        "fourth" => Some(4),
        "last" => Some(-1),
        _ => None,
    }
}

fn index_from_ordinal(ordinal: i8) -> Option<&'static str> {
    match ordinal {
        1 => Some("first"),
        2 => Some("second"),
        3 => Some("third"),
        4 => Some("fourth"),
        -1 => Some("last"),
        _ => None,
    }
}

/// Translate a Graph patterned recurrence into the canonical rule.
/// Best-effort: unknown pattern or range types yield `None`.
fn recurrence_from_wire(recurrence: &PatternedRecurrence) -> Option<RecurrenceRule> {
    let pattern = &recurrence.pattern;

    let mut by_day = Vec::new();
    let mut by_month_day = None;
    let mut by_month = None;

    let freq = match pattern.kind.as_str() {
        "daily" => Frequency::Daily,
        "weekly" => {
            for name in &pattern.days_of_week {
                by_day.push(ByDay {
                    ordinal: None,
                    weekday: weekday_from_graph(name)?,
                });
            }
            Frequency::Weekly
        }
        "absoluteMonthly" => {
            by_month_day = Some(pattern.day_of_month?);
            Frequency::Monthly
        }
        "relativeMonthly" => {
            let ordinal = ordinal_from_index(pattern.index.as_deref().unwrap_or("first"))?;
            for name in &pattern.days_of_week {
                by_day.push(ByDay {
                    ordinal: Some(ordinal),
                    weekday: weekday_from_graph(name)?,
                });
            }
            if by_day.is_empty() {
                return None;
            }
            Frequency::Monthly
        }
        "absoluteYearly" => {
            by_month_day = Some(pattern.day_of_month?);
            by_month = Some(pattern.month?);
            Frequency::Yearly
        }
        "relativeYearly" => {
            let ordinal = ordinal_from_index(pattern.index.as_deref().unwrap_or("first"))?;
            for name in &pattern.days_of_week {
                by_day.push(ByDay {
                    ordinal: Some(ordinal),
                    weekday: weekday_from_graph(name)?,
                });
            }
            if by_day.is_empty() {
                return None;
            }
            by_month = pattern.month;
            Frequency::Yearly
        }
        _ => return None,
    };

    let end = match recurrence.range.as_ref() {
        None => RuleEnd::Never,
        Some(range) => match range.kind.as_str() {
            "noEnd" => RuleEnd::Never,
            "endDate" => RuleEnd::Until(dates::end_of_day_utc(range.end_date?)),
            "numbered" => RuleEnd::Count(range.number_of_occurrences?),
            _ => return None,
        },
    };

    Some(RecurrenceRule {
        freq,
        interval: pattern.interval,
        by_day,
        by_month_day,
        by_month,
        end,
    })
}

/// Translate the canonical rule into a Graph patterned recurrence body.
/// Rules the Graph model cannot express (mixed ordinals, monthly BYDAY
/// without ordinal) yield `None` and the event goes out as a single
/// occurrence.
fn recurrence_to_wire(rule: &RecurrenceRule, series_start: chrono::NaiveDate) -> Option<serde_json::Value> {
    let mut pattern = json!({ "interval": rule.interval });

    match rule.freq {
        Frequency::Daily => {
            pattern["type"] = json!("daily");
        }
        Frequency::Weekly => {
            pattern["type"] = json!("weekly");
            pattern["daysOfWeek"] = json!(
                rule.by_day
                    .iter()
                    .map(|entry| weekday_to_graph(entry.weekday))
                    .collect::<Vec<_>>()
            );
        }
        Frequency::Monthly => {
            if let Some(day) = rule.by_month_day {
                pattern["type"] = json!("absoluteMonthly");
                pattern["dayOfMonth"] = json!(day);
            } else {
                let first = rule.by_day.first()?;
                pattern["type"] = json!("relativeMonthly");
                pattern["index"] = json!(index_from_ordinal(first.ordinal?)?);
                pattern["daysOfWeek"] = json!(
                    rule.by_day
                        .iter()
                        .map(|entry| weekday_to_graph(entry.weekday))
                        .collect::<Vec<_>>()
                );
            }
        }
        Frequency::Yearly => {
            if let Some(day) = rule.by_month_day {
                pattern["type"] = json!("absoluteYearly");
                pattern["dayOfMonth"] = json!(day);
                pattern["month"] = json!(rule.by_month?);
            } else {
                let first = rule.by_day.first()?;
                pattern["type"] = json!("relativeYearly");
                pattern["index"] = json!(index_from_ordinal(first.ordinal?)?);
                pattern["daysOfWeek"] = json!(
                    rule.by_day
                        .iter()
                        .map(|entry| weekday_to_graph(entry.weekday))
                        .collect::<Vec<_>>()
                );
                if let Some(month) = rule.by_month {
                    pattern["month"] = json!(month);
                }
            }
        }
    }

    let start_date = series_start.format("%Y-%m-%d").to_string();
    let range = match rule.end {
        RuleEnd::Never => json!({ "type": "noEnd", "startDate": start_date }),
        RuleEnd::Until(until) => json!({
            "type": "endDate",
            "startDate": start_date,
            "endDate": until.date_naive().format("%Y-%m-%d").to_string(),
        }),
        RuleEnd::Count(count) => json!({
            "type": "numbered",
            "startDate": start_date,
            "numberOfOccurrences": count,
        }),
    };

    Some(json!({ "pattern": pattern, "range": range }))
}

// --- event translation ---

fn event_time_from_wire(time: &GraphDateTime, is_all_day: bool, is_end: bool) -> Option<EventTime> {
    let instant = dates::parse_graph_datetime(&time.date_time)?;
    if is_all_day {
        let date = instant.date_naive();
        // Graph's all-day end is exclusive midnight of the following day.
        Some(EventTime::AllDay(if is_end {
            dates::inclusive_last_day(date)
        } else {
            date
        }))
    } else {
        Some(EventTime::Timed(instant))
    }
}

fn translate_event(event: GraphEvent) -> Option<EventChange> {
    if event.removed.is_some() || event.is_cancelled {
        return Some(EventChange::Delete {
            external_id: event.id,
        });
    }

    let is_all_day = event.is_all_day;
    let start = event_time_from_wire(event.start.as_ref()?, is_all_day, false)?;
    let end = event_time_from_wire(event.end.as_ref()?, is_all_day, true)?;

    let status = match event.show_as.as_deref() {
        Some("tentative") => EventStatus::Tentative,
        _ => EventStatus::Confirmed,
    };

    let recurrence = event.recurrence.as_ref().and_then(|native| {
        match recurrence_from_wire(native) {
            Some(rule) => Some(rule.to_string()),
            None => {
                warn!(
                    event_id = %event.id,
                    pattern = %native.pattern.kind,
                    "unsupported recurrence pattern dropped"
                );
                None
            }
        }
    });

    let original_start = event
        .original_start
        .as_deref()
        .and_then(dates::parse_graph_datetime)
        .map(|instant| {
            if is_all_day {
                EventTime::AllDay(instant.date_naive())
            } else {
                EventTime::Timed(instant)
            }
        });

    let attendees = event
        .attendees
        .into_iter()
        .filter_map(|attendee| {
            let address = attendee.email_address?;
            Some(Attendee {
                email: address.address?,
                name: address.name,
                response: attendee
                    .status
                    .as_ref()
                    .and_then(|status| status.response.as_deref())
                    .and_then(|response| match response {
                        "accepted" | "organizer" => Some(ResponseStatus::Accepted),
                        "declined" => Some(ResponseStatus::Declined),
                        "tentativelyAccepted" => Some(ResponseStatus::Tentative),
                        "notResponded" | "none" => Some(ResponseStatus::NeedsAction),
                        _ => None,
                    }),
                organizer: attendee
                    .status
                    .as_ref()
                    .and_then(|status| status.response.as_deref())
                    == Some("organizer")
                    || attendee.kind.as_deref() == Some("organizer"),
            })
        })
        .collect();

    let reminders = if event.is_reminder_on {
        event
            .reminder_minutes_before_start
            .map(|minutes| {
                vec![Reminder {
                    method: ReminderMethod::Popup,
                    minutes_before: minutes,
                }]
            })
            .unwrap_or_default()
    } else {
        Vec::new()
    };

    Some(EventChange::Upsert(RemoteEvent {
        external_id: event.id,
        title: event.subject.unwrap_or_else(|| "(no subject)".to_string()),
        description: event.body_preview,
        location: event.location.and_then(|location| location.display_name),
        start,
        end,
        status,
        recurrence,
        series_master_id: event.series_master_id,
        original_start,
        attendees,
        reminders,
        change_tag: event.change_key,
        updated_at: event
            .last_modified_date_time
            .as_deref()
            .and_then(dates::parse_graph_datetime),
    }))
}

fn event_time_to_wire(time: &EventTime, is_end: bool) -> serde_json::Value {
    let wire = match time {
        EventTime::AllDay(date) => {
            // Exclusive midnight end for all-day events.
            let wire_date = if is_end {
                dates::exclusive_end_date(*date)
            } else {
                *date
            };
            dates::graph_midnight(wire_date)
        }
        EventTime::Timed(instant) => instant.format("%Y-%m-%dT%H:%M:%S").to_string(),
    };
    json!({ "dateTime": wire, "timeZone": "UTC" })
}

fn event_to_wire(event: &Event) -> serde_json::Value {
    let show_as = match event.status {
        EventStatus::Confirmed => "busy",
        EventStatus::Tentative => "tentative",
        EventStatus::Cancelled => "free",
    };

    let mut body = json!({
        "subject": event.title,
        "showAs": show_as,
        "isAllDay": event.start.is_all_day(),
        "start": event_time_to_wire(&event.start, false),
        "end": event_time_to_wire(&event.end, true),
    });

    if let Some(description) = &event.description {
        body["body"] = json!({ "contentType": "text", "content": description });
    }
    if let Some(location) = &event.location {
        body["location"] = json!({ "displayName": location });
    }
    if let Some(rule) = event.recurrence.as_deref().and_then(RecurrenceRule::parse) {
        match recurrence_to_wire(&rule, event.start.date()) {
            Some(wire) => body["recurrence"] = wire,
            None => warn!(
                event_id = %event.id,
                rule = %rule,
                "unsupported recurrence pattern dropped"
            ),
        }
    }
    if !event.attendees.is_empty() {
        body["attendees"] = json!(
            event
                .attendees
                .iter()
                .map(|attendee| {
                    json!({
                        "emailAddress": {
                            "address": attendee.email,
                            "name": attendee.name.clone().unwrap_or_default(),
                        },
                        "type": "required",
                    })
                })
                .collect::<Vec<_>>()
        );
    }
    match event.reminders.first() {
        Some(reminder) => {
            body["isReminderOn"] = json!(true);
            body["reminderMinutesBeforeStart"] = json!(reminder.minutes_before);
        }
        None => {
            body["isReminderOn"] = json!(false);
        }
    }

    body
}

impl MicrosoftConnector {
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

    fn event_url(&self, calendar_external_id: &str, external_id: &str) -> String {
        format!(
            "{}/me/calendars/{}/events/{}",
            self.config.api_base, calendar_external_id, external_id
        )
    }
}

#[async_trait]
impl CalendarConnector for MicrosoftConnector {
    fn provider(&self) -> Provider {
        Provider::Microsoft
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
                    provider: Provider::Microsoft,
                })?;

        let response = self
            .http
            .post(format!("{}/token", self.config.oauth_base))
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("scope", "offline_access Calendars.ReadWrite"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SyncError::TokenRefreshFailed {
                provider: Provider::Microsoft,
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
        let mut url = format!(
            "{}/me/calendars?$top={}",
            self.config.api_base, self.page_size
        );

        loop {
            let response = self
                .http
                .get(&url)
                .bearer_auth(access_token)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(Self::read_error(response).await);
            }

            let page: CalendarsResponse = response
                .json()
                .await
                .map_err(|err| SyncError::MalformedResponse(format!("calendar list: {err}")))?;

            calendars.extend(page.value.into_iter().map(|entry| RemoteCalendar {
                external_id: entry.id,
                name: entry.name.unwrap_or_else(|| "(unnamed)".to_string()),
                description: None,
                color: entry.color.filter(|color| color != "auto"),
                is_primary: entry.is_default_calendar,
                is_read_only: !entry.can_edit,
            }));

            match page.next_link {
                Some(next) => url = next,
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
        // nextLink and deltaLink are opaque full URLs; only the first
        // full-window request is built here.
        let url = match (&request.page_token, &request.mode) {
            (Some(next_link), _) => next_link.clone(),
            (None, SyncMode::Incremental { cursor }) => cursor.clone(),
            (None, SyncMode::FullWindow { start, end }) => format!(
                "{}/me/calendars/{}/calendarView/delta?startDateTime={}&endDateTime={}",
                self.config.api_base,
                calendar_external_id,
                start.format("%Y-%m-%dT%H:%M:%SZ"),
                end.format("%Y-%m-%dT%H:%M:%SZ")
            ),
        };

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .header("Prefer", format!("odata.maxpagesize={}", self.page_size))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let page: DeltaResponse = response
            .json()
            .await
            .map_err(|err| SyncError::MalformedResponse(format!("delta page: {err}")))?;

        let changes = page.value.into_iter().filter_map(translate_event).collect();

        Ok(EventPage {
            changes,
            next_page_token: page.next_link,
            next_cursor: page.delta_link,
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
            .post(format!(
                "{}/me/calendars/{}/events",
                self.config.api_base, calendar_external_id
            ))
            .bearer_auth(access_token)
            .json(&event_to_wire(event))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let created: GraphEvent = response
            .json()
            .await
            .map_err(|err| SyncError::MalformedResponse(format!("created event: {err}")))?;

        Ok(PushAck {
            external_id: created.id,
            change_tag: created.change_key,
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
            .patch(self.event_url(calendar_external_id, external_id))
            .bearer_auth(access_token)
            .json(&event_to_wire(event))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let updated: GraphEvent = response
            .json()
            .await
            .map_err(|err| SyncError::MalformedResponse(format!("updated event: {err}")))?;

        Ok(updated.change_key)
    }

    async fn delete_event(
        &self,
        access_token: &str,
        calendar_external_id: &str,
        external_id: &str,
    ) -> Result<(), SyncError> {
        let response = self
            .http
            .delete(self.event_url(calendar_external_id, external_id))
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use uuid::Uuid;

    fn wire_event(value: serde_json::Value) -> GraphEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn removed_entries_become_deletes() {
        let change = translate_event(wire_event(json!({
            "id": "AAMk-1",
            "@removed": { "reason": "deleted" }
        })))
        .unwrap();
        assert_eq!(
            change,
            EventChange::Delete {
                external_id: "AAMk-1".into()
            }
        );
    }

    #[test]
    fn all_day_midnights_become_local_dates() {
        let change = translate_event(wire_event(json!({
            "id": "AAMk-2",
            "subject": "Offsite",
            "isAllDay": true,
            "start": { "dateTime": "2026-02-02T00:00:00.0000000", "timeZone": "UTC" },
            "end": { "dateTime": "2026-02-03T00:00:00.0000000", "timeZone": "UTC" }
        })))
        .unwrap();

        let EventChange::Upsert(event) = change else {
            panic!("expected upsert");
        };
        assert_eq!(
            event.start,
            EventTime::AllDay(NaiveDate::from_ymd_opt(2026, 2, 2).unwrap())
        );
        // One-day event: exclusive midnight end folds back to the same day.
        assert_eq!(
            event.end,
            EventTime::AllDay(NaiveDate::from_ymd_opt(2026, 2, 2).unwrap())
        );
    }

    #[test]
    fn offsetless_datetimes_are_read_as_utc() {
        let change = translate_event(wire_event(json!({
            "id": "AAMk-3",
            "subject": "Review",
            "changeKey": "ck-3",
            "start": { "dateTime": "2026-02-20T10:00:00.0000000", "timeZone": "UTC" },
            "end": { "dateTime": "2026-02-20T11:00:00.0000000", "timeZone": "UTC" }
        })))
        .unwrap();

        let EventChange::Upsert(event) = change else {
            panic!("expected upsert");
        };
        assert_eq!(
            event.start,
            EventTime::Timed(Utc.with_ymd_and_hms(2026, 2, 20, 10, 0, 0).unwrap())
        );
        assert_eq!(event.change_tag, Some("ck-3".into()));
    }

    #[test]
    fn weekly_pattern_round_trips_through_canonical_rule() {
        let native: PatternedRecurrence = serde_json::from_value(json!({
            "pattern": {
                "type": "weekly",
                "interval": 2,
                "daysOfWeek": ["monday", "wednesday"]
            },
            "range": { "type": "noEnd", "startDate": "2026-02-02" }
        }))
        .unwrap();

        let rule = recurrence_from_wire(&native).unwrap();
        assert_eq!(rule.to_string(), "FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE");

        let wire =
            recurrence_to_wire(&rule, NaiveDate::from_ymd_opt(2026, 2, 2).unwrap()).unwrap();
        assert_eq!(wire["pattern"]["type"], "weekly");
        assert_eq!(wire["pattern"]["daysOfWeek"], json!(["monday", "wednesday"]));
        assert_eq!(wire["range"]["type"], "noEnd");
        assert_eq!(wire["range"]["startDate"], "2026-02-02");
    }

    #[test]
    fn last_friday_maps_between_index_and_ordinal() {
        let native: PatternedRecurrence = serde_json::from_value(json!({
            "pattern": {
                "type": "relativeMonthly",
                "interval": 1,
                "daysOfWeek": ["friday"],
                "index": "last"
            },
            "range": { "type": "numbered", "startDate": "2026-02-06", "numberOfOccurrences": 6 }
        }))
        .unwrap();

        let rule = recurrence_from_wire(&native).unwrap();
        assert_eq!(rule.to_string(), "FREQ=MONTHLY;BYDAY=-1FR;COUNT=6");

        let wire =
            recurrence_to_wire(&rule, NaiveDate::from_ymd_opt(2026, 2, 6).unwrap()).unwrap();
        assert_eq!(wire["pattern"]["index"], "last");
        assert_eq!(wire["range"]["numberOfOccurrences"], 6);
    }

    #[test]
    fn end_date_range_becomes_inclusive_until() {
        let native: PatternedRecurrence = serde_json::from_value(json!({
            "pattern": { "type": "daily", "interval": 1 },
            "range": { "type": "endDate", "startDate": "2026-01-01", "endDate": "2026-12-31" }
        }))
        .unwrap();

        let rule = recurrence_from_wire(&native).unwrap();
        assert_eq!(
            rule.end,
            RuleEnd::Until(Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap())
        );
    }

    #[test]
    fn unknown_pattern_type_degrades_to_none() {
        let native: PatternedRecurrence = serde_json::from_value(json!({
            "pattern": { "type": "lunar", "interval": 1 },
            "range": { "type": "noEnd", "startDate": "2026-01-01" }
        }))
        .unwrap();
        assert!(recurrence_from_wire(&native).is_none());
    }

    #[test]
    fn outbound_all_day_event_is_midnight_to_midnight() {
        let day = NaiveDate::from_ymd_opt(2026, 2, 2).unwrap();
        let event = Event {
            id: Uuid::new_v4(),
            calendar_id: Uuid::new_v4(),
            remote: crate::model::RemoteLink::Unsynced,
            title: "Holiday".into(),
            description: None,
            location: None,
            start: EventTime::AllDay(day),
            end: EventTime::AllDay(day),
            status: EventStatus::Confirmed,
            recurrence: None,
            series_master_id: None,
            original_start: None,
            attendees: vec![],
            reminders: vec![],
            updated_at: Utc::now(),
        };

        let body = event_to_wire(&event);
        assert_eq!(body["isAllDay"], json!(true));
        assert_eq!(body["start"]["dateTime"], "2026-02-02T00:00:00");
        assert_eq!(body["end"]["dateTime"], "2026-02-03T00:00:00");
        assert_eq!(body["isReminderOn"], json!(false));
    }

    #[test]
    fn outbound_rule_outside_the_pattern_model_is_sent_as_single_occurrence() {
        let day = NaiveDate::from_ymd_opt(2026, 2, 2).unwrap();
        let mut event = Event {
            id: Uuid::new_v4(),
            calendar_id: Uuid::new_v4(),
            remote: crate::model::RemoteLink::Unsynced,
            title: "Drifting meetup".into(),
            description: None,
            location: None,
            start: EventTime::AllDay(day),
            end: EventTime::AllDay(day),
            status: EventStatus::Confirmed,
            // Monthly BYDAY without an ordinal has no pattern equivalent.
            recurrence: Some("FREQ=MONTHLY;BYDAY=MO".into()),
            series_master_id: None,
            original_start: None,
            attendees: vec![],
            reminders: vec![],
            updated_at: Utc::now(),
        };

        let body = event_to_wire(&event);
        assert!(body.get("recurrence").is_none());

        event.recurrence = Some("FREQ=MONTHLY;BYMONTHDAY=2".into());
        let body = event_to_wire(&event);
        assert_eq!(body["recurrence"]["pattern"]["type"], "absoluteMonthly");
    }

    #[test]
    fn outbound_recurrence_range_starts_at_event_date() {
        let event = Event {
            id: Uuid::new_v4(),
            calendar_id: Uuid::new_v4(),
            remote: crate::model::RemoteLink::Unsynced,
            title: "Standup".into(),
            description: None,
            location: None,
            start: EventTime::Timed(Utc.with_ymd_and_hms(2026, 2, 2, 9, 0, 0).unwrap()),
            end: EventTime::Timed(Utc.with_ymd_and_hms(2026, 2, 2, 9, 15, 0).unwrap()),
            status: EventStatus::Confirmed,
            recurrence: Some("FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR".into()),
            series_master_id: None,
            original_start: None,
            attendees: vec![],
            reminders: vec![Reminder {
                method: ReminderMethod::Popup,
                minutes_before: 5,
            }],
            updated_at: Utc::now(),
        };

        let body = event_to_wire(&event);
        assert_eq!(body["recurrence"]["pattern"]["type"], "weekly");
        assert_eq!(body["recurrence"]["range"]["startDate"], "2026-02-02");
        assert_eq!(body["reminderMinutesBeforeStart"], json!(5));
        assert_eq!(body["isReminderOn"], json!(true));
    }
}
