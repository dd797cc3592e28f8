//! Session acquisition for the versioned store.
//!
//! Every store operation must carry a session token. A [`SessionProvider`]
//! decides when to log in: [`LoginPerCall`] logs in before each operation,
//! [`CachedSession`] reuses a token until it is older than its TTL or the
//! store rejects it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use common::clock::{Clock, WallClock};
use common::{Credentials, SessionToken, VersionedStorage};

use crate::config::{SessionConfig, SessionMode};
use crate::error::{Error, Result};

/// Supplies session tokens to the store client.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Returns a token to authorize the next operation, logging in if needed.
    async fn session(&self, storage: &dyn VersionedStorage) -> Result<SessionToken>;

    /// Drops `session` after the store rejected it, so the next call to
    /// [`session`](Self::session) logs in again.
    fn invalidate(&self, session: &SessionToken);
}

/// Logs in before every operation.
pub struct LoginPerCall {
    credentials: Credentials,
}

impl LoginPerCall {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl SessionProvider for LoginPerCall {
    async fn session(&self, storage: &dyn VersionedStorage) -> Result<SessionToken> {
        Ok(storage.login(&self.credentials).await?)
    }

    fn invalidate(&self, _session: &SessionToken) {}
}

struct CachedToken {
    token: SessionToken,
    acquired_at: i64,
}

/// Caches one session token and refreshes it when it ages out or is rejected.
pub struct CachedSession {
    credentials: Credentials,
    token_ttl: Option<Duration>,
    clock: Arc<dyn Clock>,
    cached: Mutex<Option<CachedToken>>,
}

impl CachedSession {
    /// Creates a provider whose tokens are refreshed after `token_ttl`.
    /// With `None` a token is only refreshed after the store rejects it.
    pub fn new(credentials: Credentials, token_ttl: Option<Duration>) -> Self {
        Self {
            credentials,
            token_ttl,
            clock: Arc::new(WallClock),
            cached: Mutex::new(None),
        }
    }

    /// Sets the clock used to age cached tokens.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<CachedToken>>> {
        self.cached
            .lock()
            .map_err(|e| Error::Internal(format!("Failed to acquire session lock: {}", e)))
    }

    fn is_fresh(&self, cached: &CachedToken) -> bool {
        match self.token_ttl {
            Some(ttl) => self.clock.now() - cached.acquired_at < ttl.as_millis() as i64,
            None => true,
        }
    }
}

#[async_trait]
impl SessionProvider for CachedSession {
    async fn session(&self, storage: &dyn VersionedStorage) -> Result<SessionToken> {
        let cached = self
            .lock()?
            .as_ref()
            .filter(|c| self.is_fresh(c))
            .map(|c| c.token.clone());
        if let Some(token) = cached {
            return Ok(token);
        }

        // concurrent callers may both log in here; the last token wins
        let token = storage.login(&self.credentials).await?;
        tracing::debug!(user = %self.credentials.username, "acquired new session");
        *self.lock()? = Some(CachedToken {
            token: token.clone(),
            acquired_at: self.clock.now(),
        });
        Ok(token)
    }

    fn invalidate(&self, session: &SessionToken) {
        if let Ok(mut cached) = self.cached.lock() {
            if cached.as_ref().is_some_and(|c| &c.token == session) {
                *cached = None;
            }
        }
    }
}

/// Builds the provider selected by `config`.
pub fn session_provider(
    config: &SessionConfig,
    credentials: Credentials,
) -> Arc<dyn SessionProvider> {
    match config.mode {
        SessionMode::PerCall => Arc::new(LoginPerCall::new(credentials)),
        SessionMode::Cached => Arc::new(CachedSession::new(credentials, config.token_ttl)),
    }
}

#[cfg(test)]
mod tests {
    use common::clock::ManualClock;
    use common::storage::in_memory::InMemoryVersionedStorage;

    use super::*;

    #[tokio::test]
    async fn should_log_in_for_every_call() {
        // given
        let storage = InMemoryVersionedStorage::default();
        let provider = LoginPerCall::new(Credentials::default());

        // when
        let first = provider.session(&storage).await.unwrap();
        let second = provider.session(&storage).await.unwrap();

        // then
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn should_reuse_cached_token() {
        // given
        let storage = InMemoryVersionedStorage::default();
        let provider = CachedSession::new(Credentials::default(), None);

        // when
        let first = provider.session(&storage).await.unwrap();
        let second = provider.session(&storage).await.unwrap();

        // then
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn should_refresh_token_after_ttl() {
        // given
        let storage = InMemoryVersionedStorage::default();
        let clock = Arc::new(ManualClock::new(0));
        let provider = CachedSession::new(Credentials::default(), Some(Duration::from_secs(60)))
            .with_clock(clock.clone());
        let first = provider.session(&storage).await.unwrap();

        // when
        clock.advance(59_999);
        let still_cached = provider.session(&storage).await.unwrap();
        clock.advance(1);
        let refreshed = provider.session(&storage).await.unwrap();

        // then
        assert_eq!(first, still_cached);
        assert_ne!(first, refreshed);
    }

    #[tokio::test]
    async fn should_log_in_again_after_invalidation() {
        // given
        let storage = InMemoryVersionedStorage::default();
        let provider = CachedSession::new(Credentials::default(), None);
        let first = provider.session(&storage).await.unwrap();

        // when
        provider.invalidate(&first);
        let second = provider.session(&storage).await.unwrap();

        // then
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn should_ignore_invalidation_of_stale_token() {
        // given
        let storage = InMemoryVersionedStorage::default();
        let provider = CachedSession::new(Credentials::default(), None);
        let current = provider.session(&storage).await.unwrap();

        // when
        provider.invalidate(&SessionToken::new("someone-else"));

        // then
        assert_eq!(provider.session(&storage).await.unwrap(), current);
    }

    #[tokio::test]
    async fn should_report_rejected_login_as_backend_unavailable() {
        // given
        let storage = InMemoryVersionedStorage::default();
        let provider = CachedSession::new(Credentials::new("opendata", "wrong"), None);

        // when
        let result = provider.session(&storage).await;

        // then
        assert!(matches!(result, Err(Error::BackendUnavailable(_))));
    }
}
