//! Inbound synchronization.
//!
//! Pulls remote state into the local store: the calendar list first, then
//! each synced calendar's events. Event sync is cursor-driven where a cursor
//! exists and window-bounded otherwise, applies changes page by page so a
//! partial pass leaves applied pages behind, and persists the new cursor
//! only after the pass drains.

use std::sync::Arc;

use chrono::{Duration, Utc};
use metrics::counter;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::model::{Calendar, Event, Provider, RemoteLink};
use crate::providers::{
    CalendarConnector, ConnectorRegistry, EventChange, EventPage, PageRequest, RemoteEvent,
    SyncMode,
};
use crate::store::{CalendarStore, EventStore};
use crate::token_refresh::TokenRefresher;

pub struct SyncEngine {
    registry: ConnectorRegistry,
    refresher: Arc<TokenRefresher>,
    calendars: Arc<dyn CalendarStore>,
    events: Arc<dyn EventStore>,
    config: SyncConfig,
}

/// Outcome of one drained inbound pass.
struct PassOutcome {
    next_cursor: Option<String>,
    changes_applied: u64,
}

impl SyncEngine {
    pub fn new(
        registry: ConnectorRegistry,
        refresher: Arc<TokenRefresher>,
        calendars: Arc<dyn CalendarStore>,
        events: Arc<dyn EventStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            registry,
            refresher,
            calendars,
            events,
            config,
        }
    }

    fn full_window(&self) -> SyncMode {
        let now = Utc::now();
        SyncMode::FullWindow {
            start: now - Duration::days(self.config.window_past_days),
            end: now + Duration::days(self.config.window_future_days),
        }
    }

    /// Sync the account's calendar list, then the events of every synced
    /// calendar. A per-calendar failure stops the account pass.
    #[instrument(skip_all, fields(account_id = %account_id, provider = %provider))]
    pub async fn sync_account(
        &self,
        account_id: Uuid,
        provider: Provider,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        self.sync_calendar_list(account_id, provider).await?;

        for calendar in self.calendars.list_for_account(account_id, provider).await? {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            self.sync_calendar_events(&calendar, cancel).await?;
        }

        Ok(())
    }

    /// Reconcile the local calendar list against the remote one.
    ///
    /// New remote calendars are inserted with every remote field. Known ones
    /// only take remote-owned fields (name, description, writability);
    /// visibility, favorite flag and color are user-owned after creation and
    /// are never overwritten. Calendars that disappeared remotely are kept.
    #[instrument(skip_all, fields(account_id = %account_id, provider = %provider))]
    pub async fn sync_calendar_list(
        &self,
        account_id: Uuid,
        provider: Provider,
    ) -> Result<(), SyncError> {
        let connector = self.registry.get(provider)?;
        let token = self.refresher.access_token(connector.as_ref(), account_id).await?;
        let remote_calendars = connector.list_calendars(&token).await?;

        let mut created = 0u64;
        let mut updated = 0u64;

        for remote in remote_calendars {
            match self
                .calendars
                .find_by_external_id(account_id, provider, &remote.external_id)
                .await?
            {
                None => {
                    self.calendars
                        .insert(Calendar {
                            id: Uuid::new_v4(),
                            account_id,
                            provider,
                            external_id: remote.external_id,
                            name: remote.name,
                            description: remote.description,
                            color: remote.color,
                            is_primary: remote.is_primary,
                            is_read_only: remote.is_read_only,
                            is_visible: true,
                            is_favorite: false,
                            sync_cursor: None,
                            last_synced_at: None,
                        })
                        .await?;
                    created += 1;
                }
                Some(mut local) => {
                    let changed = local.name != remote.name
                        || local.description != remote.description
                        || local.is_read_only != remote.is_read_only;
                    if changed {
                        local.name = remote.name;
                        local.description = remote.description;
                        local.is_read_only = remote.is_read_only;
                        self.calendars.update(local).await?;
                        updated += 1;
                    }
                }
            }
        }

        info!(created, updated, "calendar list synced");
        Ok(())
    }

    /// Sync one calendar's events by local id.
    pub async fn sync_calendar_events_by_id(
        &self,
        calendar_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        let calendar = self
            .calendars
            .get(calendar_id)
            .await?
            .ok_or(SyncError::Store(crate::store::StoreError::NotFound))?;
        self.sync_calendar_events(&calendar, cancel).await
    }

    /// Run one inbound event pass for a calendar: incremental when a cursor
    /// is stored, window-bounded otherwise. A cursor the provider reports
    /// expired triggers exactly one window-bounded retry.
    #[instrument(skip_all, fields(calendar_id = %calendar.id, provider = %calendar.provider))]
    pub async fn sync_calendar_events(
        &self,
        calendar: &Calendar,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        let connector = self.registry.get(calendar.provider)?;
        let token = self
            .refresher
            .access_token(connector.as_ref(), calendar.account_id)
            .await?;

        let mode = match &calendar.sync_cursor {
            Some(cursor) => SyncMode::Incremental {
                cursor: cursor.clone(),
            },
            None => self.full_window(),
        };
        let was_incremental = matches!(mode, SyncMode::Incremental { .. });

        let outcome = match self
            .run_inbound_pass(connector.as_ref(), &token, calendar, mode, cancel)
            .await
        {
            Ok(outcome) => outcome,
            Err(SyncError::CursorExpired) if was_incremental => {
                warn!("sync cursor expired, falling back to full window");
                counter!(
                    "event_sync_cursor_expired_total",
                    "provider" => calendar.provider.as_str()
                )
                .increment(1);
                self.run_inbound_pass(
                    connector.as_ref(),
                    &token,
                    calendar,
                    self.full_window(),
                    cancel,
                )
                .await?
            }
            Err(err) => return Err(err),
        };

        // The cursor moves only after a drained pass; a pass that errored
        // mid-way keeps the old cursor and its applied pages.
        self.calendars
            .set_sync_cursor(calendar.id, outcome.next_cursor, Utc::now())
            .await?;

        info!(
            changes_applied = outcome.changes_applied,
            "event sync pass completed"
        );
        Ok(())
    }

    async fn run_inbound_pass(
        &self,
        connector: &dyn CalendarConnector,
        token: &str,
        calendar: &Calendar,
        mode: SyncMode,
        cancel: &CancellationToken,
    ) -> Result<PassOutcome, SyncError> {
        let mut request = PageRequest::first(mode);
        let mut next_cursor = None;
        let mut changes_applied = 0u64;

        loop {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let page: EventPage = connector
                .fetch_events_page(token, &calendar.external_id, &request)
                .await?;

            // Each page is applied before the next is fetched.
            for change in page.changes {
                self.apply_change(calendar, change).await?;
                changes_applied += 1;
            }

            if page.next_cursor.is_some() {
                next_cursor = page.next_cursor;
            }

            match page.next_page_token {
                Some(token) => request.page_token = Some(token),
                None => break,
            }
        }

        counter!(
            "event_sync_changes_applied_total",
            "provider" => calendar.provider.as_str()
        )
        .increment(changes_applied);

        Ok(PassOutcome {
            next_cursor,
            changes_applied,
        })
    }

    async fn apply_change(&self, calendar: &Calendar, change: EventChange) -> Result<(), SyncError> {
        match change {
            EventChange::Delete { external_id } => {
                let removed = self
                    .events
                    .delete_by_external_id(calendar.id, &external_id)
                    .await?;
                debug!(external_id = %external_id, removed, "inbound delete");
                Ok(())
            }
            EventChange::Upsert(remote) => {
                let event = self.materialize(calendar, remote);
                self.events.upsert_by_external_id(event).await?;
                Ok(())
            }
        }
    }

    fn materialize(&self, calendar: &Calendar, remote: RemoteEvent) -> Event {
        Event {
            // Replaced by the stored row's id when the natural key matches.
            id: Uuid::new_v4(),
            calendar_id: calendar.id,
            remote: RemoteLink::Synced {
                external_id: remote.external_id,
                change_tag: remote.change_tag,
            },
            title: remote.title,
            description: remote.description,
            location: remote.location,
            start: remote.start,
            end: remote.end,
            status: remote.status,
            recurrence: remote.recurrence,
            series_master_id: remote.series_master_id,
            original_start: remote.original_start,
            attendees: remote.attendees,
            reminders: remote.reminders,
            updated_at: remote.updated_at.unwrap_or_else(Utc::now),
        }
    }
}
