//! In-process store over async-guarded hash maps.
//!
//! Backs the test suite and local-only feeds. Natural-key semantics match
//! what a relational backend would enforce with unique indexes.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::model::{Calendar, Credential, Event, Provider, RemoteLink};

use super::{CalendarStore, CredentialStore, EventStore, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    calendars: Mutex<HashMap<Uuid, Calendar>>,
    events: Mutex<HashMap<Uuid, Event>>,
    credentials: Mutex<HashMap<(Uuid, Provider), Credential>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: all events of one calendar, unordered.
    pub async fn events_for_calendar(&self, calendar_id: Uuid) -> Vec<Event> {
        self.events
            .lock()
            .await
            .values()
            .filter(|event| event.calendar_id == calendar_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CalendarStore for MemoryStore {
    async fn get(&self, id: Uuid) -> Result<Option<Calendar>, StoreError> {
        Ok(self.calendars.lock().await.get(&id).cloned())
    }

    async fn find_by_external_id(
        &self,
        account_id: Uuid,
        provider: Provider,
        external_id: &str,
    ) -> Result<Option<Calendar>, StoreError> {
        Ok(self
            .calendars
            .lock()
            .await
            .values()
            .find(|calendar| {
                calendar.account_id == account_id
                    && calendar.provider == provider
                    && calendar.external_id == external_id
            })
            .cloned())
    }

    async fn list_for_account(
        &self,
        account_id: Uuid,
        provider: Provider,
    ) -> Result<Vec<Calendar>, StoreError> {
        let mut calendars: Vec<Calendar> = self
            .calendars
            .lock()
            .await
            .values()
            .filter(|calendar| calendar.account_id == account_id && calendar.provider == provider)
            .cloned()
            .collect();
        calendars.sort_by(|a, b| a.external_id.cmp(&b.external_id));
        Ok(calendars)
    }

    async fn insert(&self, calendar: Calendar) -> Result<(), StoreError> {
        self.calendars.lock().await.insert(calendar.id, calendar);
        Ok(())
    }

    async fn update(&self, calendar: Calendar) -> Result<(), StoreError> {
        let mut calendars = self.calendars.lock().await;
        if !calendars.contains_key(&calendar.id) {
            return Err(StoreError::NotFound);
        }
        calendars.insert(calendar.id, calendar);
        Ok(())
    }

    async fn set_sync_cursor(
        &self,
        id: Uuid,
        cursor: Option<String>,
        synced_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut calendars = self.calendars.lock().await;
        let calendar = calendars.get_mut(&id).ok_or(StoreError::NotFound)?;
        calendar.sync_cursor = cursor;
        calendar.last_synced_at = Some(synced_at);
        Ok(())
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn get(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        Ok(self.events.lock().await.get(&id).cloned())
    }

    async fn find_by_external_id(
        &self,
        calendar_id: Uuid,
        external_id: &str,
    ) -> Result<Option<Event>, StoreError> {
        Ok(self
            .events
            .lock()
            .await
            .values()
            .find(|event| {
                event.calendar_id == calendar_id && event.remote.external_id() == Some(external_id)
            })
            .cloned())
    }

    async fn upsert_by_external_id(&self, event: Event) -> Result<(), StoreError> {
        let Some(external_id) = event.remote.external_id().map(str::to_owned) else {
            return Err(StoreError::Backend(
                "upsert_by_external_id requires a synced remote link".into(),
            ));
        };
        let mut events = self.events.lock().await;
        let existing_id = events
            .values()
            .find(|existing| {
                existing.calendar_id == event.calendar_id
                    && existing.remote.external_id() == Some(external_id.as_str())
            })
            .map(|existing| existing.id);
        let mut event = event;
        if let Some(id) = existing_id {
            event.id = id;
        }
        events.insert(event.id, event);
        Ok(())
    }

    async fn delete_by_external_id(
        &self,
        calendar_id: Uuid,
        external_id: &str,
    ) -> Result<bool, StoreError> {
        let mut events = self.events.lock().await;
        let existing_id = events
            .values()
            .find(|event| {
                event.calendar_id == calendar_id && event.remote.external_id() == Some(external_id)
            })
            .map(|event| event.id);
        match existing_id {
            Some(id) => Ok(events.remove(&id).is_some()),
            None => Ok(false),
        }
    }

    async fn set_remote_link(&self, id: Uuid, remote: RemoteLink) -> Result<(), StoreError> {
        let mut events = self.events.lock().await;
        let event = events.get_mut(&id).ok_or(StoreError::NotFound)?;
        event.remote = remote;
        Ok(())
    }

    async fn insert(&self, event: Event) -> Result<(), StoreError> {
        self.events.lock().await.insert(event.id, event);
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.events.lock().await.remove(&id).is_some())
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get(
        &self,
        account_id: Uuid,
        provider: Provider,
    ) -> Result<Option<Credential>, StoreError> {
        Ok(self
            .credentials
            .lock()
            .await
            .get(&(account_id, provider))
            .cloned())
    }

    async fn put(&self, credential: Credential) -> Result<(), StoreError> {
        self.credentials
            .lock()
            .await
            .insert((credential.account_id, credential.provider), credential);
        Ok(())
    }
}
