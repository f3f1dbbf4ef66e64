//! Shared fixtures for the integration tests: an engine wired against a
//! wiremock server standing in for both providers' API and OAuth hosts.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;
use wiremock::MockServer;

use calsync::config::{ProviderConfig, SyncConfig};
use calsync::model::{
    Calendar, Credential, Event, EventStatus, EventTime, Provider, RemoteLink,
};
use calsync::outbound::OutboundPusher;
use calsync::providers::{ConnectorRegistry, GoogleConnector, MicrosoftConnector};
use calsync::store::MemoryStore;
use calsync::sync_engine::SyncEngine;
use calsync::token_refresh::TokenRefresher;

pub fn config_for(server: &MockServer) -> SyncConfig {
    let base = server.uri();
    SyncConfig {
        page_size: 50,
        google: ProviderConfig {
            client_id: "google-client".into(),
            client_secret: "google-secret".into(),
            api_base: base.clone(),
            oauth_base: base.clone(),
        },
        microsoft: ProviderConfig {
            client_id: "ms-client".into(),
            client_secret: "ms-secret".into(),
            api_base: base.clone(),
            oauth_base: base,
        },
        ..SyncConfig::default()
    }
}

/// Everything a test needs, wired against one mock server.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub refresher: Arc<TokenRefresher>,
    pub registry: ConnectorRegistry,
    pub engine: SyncEngine,
    pub pusher: OutboundPusher,
}

impl Harness {
    pub fn new(server: &MockServer) -> Self {
        let config = config_for(server);
        let http = config.http_client().expect("client builds");

        let mut registry = ConnectorRegistry::new();
        registry.register(Arc::new(GoogleConnector::new(
            http.clone(),
            config.google.clone(),
            config.page_size,
        )));
        registry.register(Arc::new(MicrosoftConnector::new(
            http,
            config.microsoft.clone(),
            config.page_size,
        )));

        let store = Arc::new(MemoryStore::new());
        let refresher = Arc::new(TokenRefresher::new(store.clone()));

        let engine = SyncEngine::new(
            registry.clone(),
            refresher.clone(),
            store.clone(),
            store.clone(),
            config,
        );
        let pusher = OutboundPusher::new(registry.clone(), refresher.clone(), store.clone());

        Self {
            store,
            refresher,
            registry,
            engine,
            pusher,
        }
    }

    pub fn connector(
        &self,
        provider: Provider,
    ) -> Arc<dyn calsync::providers::CalendarConnector> {
        self.registry.get(provider).expect("connector registered")
    }

    /// Store a credential whose access token is valid for another hour, so
    /// tests that are not about refresh never hit the token endpoint.
    pub async fn seed_fresh_credential(&self, account_id: Uuid, provider: Provider) {
        use calsync::store::CredentialStore;
        self.store
            .put(fresh_credential(account_id, provider))
            .await
            .unwrap();
    }

    pub async fn seed_calendar(&self, calendar: Calendar) {
        use calsync::store::CalendarStore;
        self.store.insert(calendar).await.unwrap();
    }

    /// Calendar row as currently stored. Avoids the `get` name collision
    /// between the store traits at call sites that use both.
    pub async fn stored_calendar(&self, id: Uuid) -> Calendar {
        use calsync::store::CalendarStore;
        self.store.get(id).await.unwrap().unwrap()
    }
}

pub fn fresh_credential(account_id: Uuid, provider: Provider) -> Credential {
    Credential {
        account_id,
        provider,
        access_token: "stored-access-token".into(),
        refresh_token: Some("stored-refresh-token".into()),
        expires_at: Some(Utc::now() + Duration::hours(1)),
    }
}

pub fn expired_credential(account_id: Uuid, provider: Provider) -> Credential {
    Credential {
        expires_at: Some(Utc::now() - Duration::minutes(5)),
        ..fresh_credential(account_id, provider)
    }
}

pub fn calendar(account_id: Uuid, provider: Provider, external_id: &str) -> Calendar {
    Calendar {
        id: Uuid::new_v4(),
        account_id,
        provider,
        external_id: external_id.into(),
        name: "Work".into(),
        description: None,
        color: None,
        is_primary: false,
        is_read_only: false,
        is_visible: true,
        is_favorite: false,
        sync_cursor: None,
        last_synced_at: None,
    }
}

pub fn timed_event(calendar_id: Uuid, remote: RemoteLink) -> Event {
    Event {
        id: Uuid::new_v4(),
        calendar_id,
        remote,
        title: "Planning".into(),
        description: None,
        location: None,
        start: EventTime::Timed(Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap()),
        end: EventTime::Timed(Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap()),
        status: EventStatus::Confirmed,
        recurrence: None,
        series_master_id: None,
        original_start: None,
        attendees: vec![],
        reminders: vec![],
        updated_at: Utc::now(),
    }
}
