//! Connector registry.
//!
//! Maps sync-capable providers to their connector. Subscription and derived
//! feeds are never registered: lookups for them fail with
//! `UnsupportedProvider`, which the outbound pusher treats as a no-op and
//! the inbound synchronizer surfaces.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::SyncError;
use crate::model::Provider;

use super::CalendarConnector;

#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    connectors: HashMap<Provider, Arc<dyn CalendarConnector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, connector: Arc<dyn CalendarConnector>) {
        self.connectors.insert(connector.provider(), connector);
    }

    pub fn get(&self, provider: Provider) -> Result<Arc<dyn CalendarConnector>, SyncError> {
        self.connectors
            .get(&provider)
            .cloned()
            .ok_or(SyncError::UnsupportedProvider(provider))
    }

    pub fn is_registered(&self, provider: Provider) -> bool {
        self.connectors.contains_key(&provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Credential, Event};
    use crate::providers::{EventPage, PageRequest, PushAck, RefreshedToken, RemoteCalendar};
    use async_trait::async_trait;

    struct NullConnector(Provider);

    #[async_trait]
    impl CalendarConnector for NullConnector {
        fn provider(&self) -> Provider {
            self.0
        }

        async fn refresh_access_token(
            &self,
            _credential: &Credential,
        ) -> Result<RefreshedToken, SyncError> {
            Ok(RefreshedToken {
                access_token: "token".into(),
                refresh_token: None,
                expires_at: None,
            })
        }

        async fn list_calendars(
            &self,
            _access_token: &str,
        ) -> Result<Vec<RemoteCalendar>, SyncError> {
            Ok(vec![])
        }

        async fn fetch_events_page(
            &self,
            _access_token: &str,
            _calendar_external_id: &str,
            _request: &PageRequest,
        ) -> Result<EventPage, SyncError> {
            Ok(EventPage {
                changes: vec![],
                next_page_token: None,
                next_cursor: None,
            })
        }

        async fn create_event(
            &self,
            _access_token: &str,
            _calendar_external_id: &str,
            _event: &Event,
        ) -> Result<PushAck, SyncError> {
            Ok(PushAck {
                external_id: "id".into(),
                change_tag: None,
            })
        }

        async fn update_event(
            &self,
            _access_token: &str,
            _calendar_external_id: &str,
            _external_id: &str,
            _event: &Event,
        ) -> Result<Option<String>, SyncError> {
            Ok(None)
        }

        async fn delete_event(
            &self,
            _access_token: &str,
            _calendar_external_id: &str,
            _external_id: &str,
        ) -> Result<(), SyncError> {
            Ok(())
        }
    }

    #[test]
    fn lookup_fails_for_unregistered_providers() {
        let mut registry = ConnectorRegistry::new();
        registry.register(std::sync::Arc::new(NullConnector(Provider::Google)));

        assert!(registry.is_registered(Provider::Google));
        assert!(registry.get(Provider::Google).is_ok());
        assert!(matches!(
            registry.get(Provider::Subscription),
            Err(SyncError::UnsupportedProvider(Provider::Subscription))
        ));
    }
}
