//! Access token refresher.
//!
//! Front door for every operation that needs an access token. Serializes
//! refreshes per (account, provider) with a keyed async mutex: concurrent
//! callers for the same grant queue on one lock, and whoever enters after a
//! completed refresh sees the fresh token on the fast path instead of
//! refreshing again. Different grants never contend.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::SyncError;
use crate::model::{Credential, Provider};
use crate::providers::CalendarConnector;
use crate::store::CredentialStore;

pub struct TokenRefresher {
    credentials: Arc<dyn CredentialStore>,
    locks: Mutex<HashMap<(Uuid, Provider), Arc<Mutex<()>>>>,
}

impl TokenRefresher {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            credentials,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_for(&self, key: (Uuid, Provider)) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(key).or_default().clone()
    }

    /// Return a usable access token for the account on the connector's
    /// provider, refreshing and persisting the credential if the stored
    /// token is expired or has no known expiry.
    #[instrument(skip_all, fields(account_id = %account_id, provider = %connector.provider()))]
    pub async fn access_token(
        &self,
        connector: &dyn CalendarConnector,
        account_id: Uuid,
    ) -> Result<String, SyncError> {
        let provider = connector.provider();
        let grant_lock = self.lock_for((account_id, provider)).await;
        let _guard = grant_lock.lock().await;

        let credential = self
            .credentials
            .get(account_id, provider)
            .await?
            .ok_or(SyncError::CredentialMissing {
                account_id,
                provider,
            })?;

        if credential.is_fresh_at(Utc::now()) {
            debug!("stored access token still fresh");
            return Ok(credential.access_token);
        }

        if credential.refresh_token.is_none() {
            warn!("credential expired and has no refresh token");
            return Err(SyncError::CredentialMissing {
                account_id,
                provider,
            });
        }

        counter!("token_refresh_attempts_total", "provider" => provider.as_str()).increment(1);

        let refreshed = match connector.refresh_access_token(&credential).await {
            Ok(refreshed) => refreshed,
            Err(err) => {
                counter!("token_refresh_failure_total", "provider" => provider.as_str())
                    .increment(1);
                return Err(err);
            }
        };

        let updated = Credential {
            account_id,
            provider,
            access_token: refreshed.access_token.clone(),
            // Providers that do not rotate refresh tokens omit them from the
            // response; keep the stored one in that case.
            refresh_token: refreshed.refresh_token.or(credential.refresh_token),
            expires_at: refreshed.expires_at,
        };
        self.credentials.put(updated).await?;

        counter!("token_refresh_success_total", "provider" => provider.as_str()).increment(1);
        info!("access token refreshed");

        Ok(refreshed.access_token)
    }
}
