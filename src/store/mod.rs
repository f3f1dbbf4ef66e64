//! Persistence seam.
//!
//! The engine treats storage as an external collaborator: everything it
//! needs is expressed as upsert-by-natural-key and delete-by-natural-key
//! operations plus the two narrow mutations for cursor and remote-link
//! bookkeeping. [`memory::MemoryStore`] implements all three traits for
//! tests and local-only deployments.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{Calendar, Credential, Event, Provider, RemoteLink};

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("store backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait CalendarStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Calendar>, StoreError>;

    async fn find_by_external_id(
        &self,
        account_id: Uuid,
        provider: Provider,
        external_id: &str,
    ) -> Result<Option<Calendar>, StoreError>;

    async fn list_for_account(
        &self,
        account_id: Uuid,
        provider: Provider,
    ) -> Result<Vec<Calendar>, StoreError>;

    async fn insert(&self, calendar: Calendar) -> Result<(), StoreError>;

    async fn update(&self, calendar: Calendar) -> Result<(), StoreError>;

    /// Persist the cursor produced by a completed inbound pass together with
    /// the pass timestamp.
    async fn set_sync_cursor(
        &self,
        id: Uuid,
        cursor: Option<String>,
        synced_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Event>, StoreError>;

    async fn find_by_external_id(
        &self,
        calendar_id: Uuid,
        external_id: &str,
    ) -> Result<Option<Event>, StoreError>;

    /// Upsert keyed by (calendar, external id). The event must carry a
    /// `Synced` remote link; when a row with the same key exists its local id
    /// is kept and all mutable fields are overwritten.
    async fn upsert_by_external_id(&self, event: Event) -> Result<(), StoreError>;

    /// Returns whether a row was deleted. Deleting an absent key is not an
    /// error: inbound deletes are idempotent.
    async fn delete_by_external_id(
        &self,
        calendar_id: Uuid,
        external_id: &str,
    ) -> Result<bool, StoreError>;

    /// Rewrite only the remote link of an event, used by outbound push
    /// acknowledgments.
    async fn set_remote_link(&self, id: Uuid, remote: RemoteLink) -> Result<(), StoreError>;

    async fn insert(&self, event: Event) -> Result<(), StoreError>;

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(
        &self,
        account_id: Uuid,
        provider: Provider,
    ) -> Result<Option<Credential>, StoreError>;

    /// Insert or overwrite the credential for (account, provider).
    async fn put(&self, credential: Credential) -> Result<(), StoreError>;
}
