//! Bidirectional calendar synchronization engine.
//!
//! Keeps a local calendar store in step with Google Calendar and Microsoft
//! Graph accounts: inbound passes pull the remote calendar list and event
//! changes (cursor-driven where the provider supports it), and the outbound
//! pusher mirrors local edits back on a best-effort basis. Provider
//! differences in recurrence dialect, all-day representation and pagination
//! live entirely inside the connectors behind [`providers::CalendarConnector`].

pub mod config;
pub mod dates;
pub mod error;
pub mod logging;
pub mod model;
pub mod outbound;
pub mod providers;
pub mod recurrence;
pub mod store;
pub mod sync_engine;
pub mod token_refresh;

pub use config::SyncConfig;
pub use error::SyncError;
pub use outbound::OutboundPusher;
pub use sync_engine::SyncEngine;
pub use token_refresh::TokenRefresher;
