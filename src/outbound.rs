//! Outbound push.
//!
//! Mirrors local edits to the owning provider. Push is best-effort by
//! contract: every failure is logged and swallowed so the local operation
//! that triggered the push never fails, and a later inbound pass reconciles
//! whatever the push missed. Events on non-synced providers and update or
//! delete of an event that was never pushed are no-ops decided before any
//! token or network work.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::SyncError;
use crate::model::{Calendar, Event, RemoteLink};
use crate::providers::ConnectorRegistry;
use crate::store::EventStore;
use crate::token_refresh::TokenRefresher;

pub struct OutboundPusher {
    registry: ConnectorRegistry,
    refresher: Arc<TokenRefresher>,
    events: Arc<dyn EventStore>,
}

impl OutboundPusher {
    pub fn new(
        registry: ConnectorRegistry,
        refresher: Arc<TokenRefresher>,
        events: Arc<dyn EventStore>,
    ) -> Self {
        Self {
            registry,
            refresher,
            events,
        }
    }

    /// Push a newly created local event. On success the event's remote link
    /// is rewritten to the provider-assigned identifier and change tag.
    #[instrument(skip_all, fields(event_id = %event.id, provider = %calendar.provider))]
    pub async fn push_create(&self, calendar: &Calendar, event: &Event) {
        if !calendar.provider.is_synced() {
            return;
        }

        if let Err(err) = self.try_create(calendar, event).await {
            Self::swallow("create", calendar, err);
        }
    }

    /// Push an edit of an already-synced event. An event that was never
    /// pushed has no remote counterpart to update.
    #[instrument(skip_all, fields(event_id = %event.id, provider = %calendar.provider))]
    pub async fn push_update(&self, calendar: &Calendar, event: &Event) {
        if !calendar.provider.is_synced() {
            return;
        }
        let RemoteLink::Synced { external_id, .. } = &event.remote else {
            debug!("event never synced, nothing to update remotely");
            return;
        };

        if let Err(err) = self.try_update(calendar, event, external_id).await {
            Self::swallow("update", calendar, err);
        }
    }

    /// Push a deletion. The local row is already gone; only the remote
    /// counterpart of a synced event needs removing.
    #[instrument(skip_all, fields(event_id = %event_id, provider = %calendar.provider))]
    pub async fn push_delete(&self, calendar: &Calendar, event_id: Uuid, remote: &RemoteLink) {
        if !calendar.provider.is_synced() {
            return;
        }
        let RemoteLink::Synced { external_id, .. } = remote else {
            debug!("event never synced, nothing to delete remotely");
            return;
        };

        if let Err(err) = self.try_delete(calendar, external_id).await {
            Self::swallow("delete", calendar, err);
        }
    }

    async fn try_create(&self, calendar: &Calendar, event: &Event) -> Result<(), SyncError> {
        let connector = self.registry.get(calendar.provider)?;
        let token = self
            .refresher
            .access_token(connector.as_ref(), calendar.account_id)
            .await?;

        let ack = connector
            .create_event(&token, &calendar.external_id, event)
            .await?;

        self.events
            .set_remote_link(
                event.id,
                RemoteLink::Synced {
                    external_id: ack.external_id,
                    change_tag: ack.change_tag,
                },
            )
            .await?;

        counter!("event_push_total", "provider" => calendar.provider.as_str(), "op" => "create")
            .increment(1);
        Ok(())
    }

    async fn try_update(
        &self,
        calendar: &Calendar,
        event: &Event,
        external_id: &str,
    ) -> Result<(), SyncError> {
        let connector = self.registry.get(calendar.provider)?;
        let token = self
            .refresher
            .access_token(connector.as_ref(), calendar.account_id)
            .await?;

        let change_tag = connector
            .update_event(&token, &calendar.external_id, external_id, event)
            .await?;

        if let Some(change_tag) = change_tag {
            self.events
                .set_remote_link(
                    event.id,
                    RemoteLink::Synced {
                        external_id: external_id.to_string(),
                        change_tag: Some(change_tag),
                    },
                )
                .await?;
        }

        counter!("event_push_total", "provider" => calendar.provider.as_str(), "op" => "update")
            .increment(1);
        Ok(())
    }

    async fn try_delete(&self, calendar: &Calendar, external_id: &str) -> Result<(), SyncError> {
        let connector = self.registry.get(calendar.provider)?;
        let token = self
            .refresher
            .access_token(connector.as_ref(), calendar.account_id)
            .await?;

        // 404/410 from the provider already count as success inside the
        // connector.
        connector
            .delete_event(&token, &calendar.external_id, external_id)
            .await?;

        counter!("event_push_total", "provider" => calendar.provider.as_str(), "op" => "delete")
            .increment(1);
        Ok(())
    }

    fn swallow(op: &'static str, calendar: &Calendar, err: SyncError) {
        warn!(
            op,
            calendar_id = %calendar.id,
            error = %err,
            "outbound push failed, deferring to next inbound pass"
        );
        counter!(
            "event_push_failure_total",
            "provider" => calendar.provider.as_str(),
            "op" => op
        )
        .increment(1);
    }
}
