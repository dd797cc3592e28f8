use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ops::RangeBounds;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use super::config::InMemoryConfig;
use super::{
    Credentials, Record, ScanPage, ScanRequest, SessionToken, StorageError, StorageResult,
    UNBOUNDED_REVISION, VersionedStorage,
};
use crate::clock::{Clock, WallClock};

/// A value as written by one batch.
#[derive(Clone, Debug)]
struct Version {
    revision: u64,
    value: Bytes,
}

#[derive(Default)]
struct State {
    /// Versions per key, ascending by revision.
    data: BTreeMap<Bytes, Vec<Version>>,
    revision: u64,
    /// Issued tokens and their expiration timestamp (`None` never expires).
    sessions: HashMap<SessionToken, Option<i64>>,
    /// Live tokens, oldest first.
    session_order: VecDeque<SessionToken>,
    next_session: u64,
}

impl State {
    /// Maps a requested revision bound onto a concrete revision.
    fn resolve(&self, revision: u64) -> StorageResult<u64> {
        if revision == UNBOUNDED_REVISION {
            return Ok(self.revision);
        }
        if revision > self.revision {
            return Err(StorageError::Storage(format!(
                "revision {} is ahead of current revision {}",
                revision, self.revision
            )));
        }
        Ok(revision)
    }

    /// Drops expired tokens, then evicts the oldest ones until at most
    /// `max_sessions` remain.
    fn prune_sessions(&mut self, now: i64, max_sessions: usize) {
        self.sessions.retain(|_, expire_ts| match expire_ts {
            Some(ts) => now < *ts,
            None => true,
        });
        let sessions = &self.sessions;
        self.session_order.retain(|t| sessions.contains_key(t));
        while self.sessions.len() > max_sessions {
            match self.session_order.pop_front() {
                Some(oldest) => {
                    self.sessions.remove(&oldest);
                }
                None => break,
            }
        }
    }

    fn visible(versions: &[Version], revision: u64) -> Option<&Version> {
        versions.iter().rev().find(|v| v.revision <= revision)
    }
}

/// In-memory implementation of [`VersionedStorage`].
///
/// Keeps every version of every key, so any past revision can be read back.
/// Sessions expire according to the configured TTL, measured with an
/// injectable [`Clock`].
pub struct InMemoryVersionedStorage {
    state: RwLock<State>,
    users: BTreeMap<String, String>,
    session_ttl: Option<Duration>,
    max_sessions: usize,
    clock: Arc<dyn Clock>,
}

impl InMemoryVersionedStorage {
    /// Creates an empty store accepting the accounts in `config`.
    pub fn new(config: &InMemoryConfig) -> Self {
        Self {
            state: RwLock::new(State::default()),
            users: config.users.clone(),
            session_ttl: config.session_ttl,
            max_sessions: config.max_sessions,
            clock: Arc::new(WallClock),
        }
    }

    /// Sets a custom clock for session expiry checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn read_state(&self) -> StorageResult<std::sync::RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire read lock: {}", e)))
    }

    fn write_state(&self) -> StorageResult<std::sync::RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire write lock: {}", e)))
    }

    fn authorize(&self, state: &State, session: &SessionToken) -> StorageResult<()> {
        match state.sessions.get(session) {
            None => Err(StorageError::Unauthenticated(
                "unknown session token".to_string(),
            )),
            Some(Some(expire_ts)) if self.clock.now() >= *expire_ts => Err(
                StorageError::Unauthenticated("session token expired".to_string()),
            ),
            Some(_) => Ok(()),
        }
    }
}

impl Default for InMemoryVersionedStorage {
    fn default() -> Self {
        Self::new(&InMemoryConfig::default())
    }
}

#[async_trait]
impl VersionedStorage for InMemoryVersionedStorage {
    async fn login(&self, credentials: &Credentials) -> StorageResult<SessionToken> {
        match self.users.get(&credentials.username) {
            Some(password) if *password == credentials.password => {}
            _ => {
                return Err(StorageError::Unauthenticated(format!(
                    "invalid credentials for user '{}'",
                    credentials.username
                )));
            }
        }

        let mut state = self.write_state()?;
        state.next_session += 1;
        let token = SessionToken::new(format!(
            "{}-{}",
            credentials.username, state.next_session
        ));
        let now = self.clock.now();
        let expire_ts = self.session_ttl.map(|ttl| now + ttl.as_millis() as i64);
        state.sessions.insert(token.clone(), expire_ts);
        state.session_order.push_back(token.clone());
        state.prune_sessions(now, self.max_sessions.max(1));
        Ok(token)
    }

    async fn current_revision(&self, session: &SessionToken) -> StorageResult<u64> {
        let state = self.read_state()?;
        self.authorize(&state, session)?;
        Ok(state.revision)
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn get(
        &self,
        session: &SessionToken,
        key: Bytes,
        revision: u64,
    ) -> StorageResult<Option<Record>> {
        let state = self.read_state()?;
        self.authorize(&state, session)?;
        let revision = state.resolve(revision)?;

        let record = state
            .data
            .get(&key)
            .and_then(|versions| State::visible(versions, revision))
            .map(|v| Record::new(key, v.value.clone()));
        Ok(record)
    }

    /// Applies all records under a single write lock acquisition, so readers
    /// observe either none or all of them.
    #[tracing::instrument(level = "trace", skip_all)]
    async fn set_batch(
        &self,
        session: &SessionToken,
        records: Vec<Record>,
    ) -> StorageResult<u64> {
        if records.is_empty() {
            return Err(StorageError::Storage(
                "cannot write an empty batch".to_string(),
            ));
        }

        let mut state = self.write_state()?;
        self.authorize(&state, session)?;

        let revision = state.revision + 1;
        for record in records {
            let versions = state.data.entry(record.key).or_default();
            match versions.last_mut() {
                // a key repeated within one batch keeps only its last value
                Some(last) if last.revision == revision => last.value = record.value,
                _ => versions.push(Version {
                    revision,
                    value: record.value,
                }),
            }
        }
        state.revision = revision;
        Ok(revision)
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan(&self, session: &SessionToken, request: ScanRequest) -> StorageResult<ScanPage> {
        let state = self.read_state()?;
        self.authorize(&state, session)?;
        let revision = state.resolve(request.revision)?;

        let limit = match request.limit {
            0 => usize::MAX,
            n => n,
        };
        let records = state
            .data
            .range((
                request.range.start_bound().cloned(),
                request.range.end_bound().cloned(),
            ))
            .filter_map(|(key, versions)| {
                State::visible(versions, revision)
                    .map(|v| Record::new(key.clone(), v.value.clone()))
            })
            .take(limit)
            .collect();

        Ok(ScanPage { records, revision })
    }
}

#[cfg(test)]
mod tests {
    use std::ops::Bound;

    use super::*;
    use crate::BytesRange;
    use crate::clock::ManualClock;

    async fn login(storage: &InMemoryVersionedStorage) -> SessionToken {
        storage.login(&Credentials::default()).await.unwrap()
    }

    fn record(key: &'static str, value: &'static str) -> Record {
        Record::new(Bytes::from(key), Bytes::from(value))
    }

    fn prefix_scan(prefix: &'static str, revision: u64) -> ScanRequest {
        ScanRequest {
            range: BytesRange::prefix(Bytes::from(prefix)),
            revision,
            limit: 0,
        }
    }

    #[tokio::test]
    async fn should_reject_unknown_user() {
        // given
        let storage = InMemoryVersionedStorage::default();

        // when
        let result = storage.login(&Credentials::new("mallory", "x")).await;

        // then
        assert!(matches!(result, Err(StorageError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn should_reject_unknown_session() {
        // given
        let storage = InMemoryVersionedStorage::default();

        // when
        let result = storage
            .get(&SessionToken::new("forged"), Bytes::from("k"), UNBOUNDED_REVISION)
            .await;

        // then
        assert!(matches!(result, Err(StorageError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn should_expire_session_after_ttl() {
        // given
        let clock = Arc::new(ManualClock::new(1_000));
        let config = InMemoryConfig {
            session_ttl: Some(Duration::from_secs(5)),
            ..InMemoryConfig::default()
        };
        let storage = InMemoryVersionedStorage::new(&config).with_clock(clock.clone());
        let session = login(&storage).await;
        assert!(storage.current_revision(&session).await.is_ok());

        // when
        clock.advance(5_000);
        let result = storage.current_revision(&session).await;

        // then
        assert!(matches!(result, Err(StorageError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn should_bound_live_sessions_under_repeated_logins() {
        // given
        let config = InMemoryConfig {
            max_sessions: 16,
            ..InMemoryConfig::default()
        };
        let storage = InMemoryVersionedStorage::new(&config);

        // when
        let mut last = None;
        for _ in 0..10_000 {
            let session = login(&storage).await;
            storage.current_revision(&session).await.unwrap();
            last = Some(session);
        }

        // then
        assert_eq!(storage.state.read().unwrap().sessions.len(), 16);
        assert_eq!(storage.state.read().unwrap().session_order.len(), 16);
        assert!(storage.current_revision(&last.unwrap()).await.is_ok());
    }

    #[tokio::test]
    async fn should_evict_oldest_session_when_full() {
        // given
        let config = InMemoryConfig {
            max_sessions: 2,
            ..InMemoryConfig::default()
        };
        let storage = InMemoryVersionedStorage::new(&config);
        let first = login(&storage).await;
        let second = login(&storage).await;

        // when
        let third = login(&storage).await;

        // then
        assert!(matches!(
            storage.current_revision(&first).await,
            Err(StorageError::Unauthenticated(_))
        ));
        assert!(storage.current_revision(&second).await.is_ok());
        assert!(storage.current_revision(&third).await.is_ok());
    }

    #[tokio::test]
    async fn should_drop_expired_sessions_on_login() {
        // given
        let clock = Arc::new(ManualClock::new(0));
        let config = InMemoryConfig {
            session_ttl: Some(Duration::from_secs(1)),
            ..InMemoryConfig::default()
        };
        let storage = InMemoryVersionedStorage::new(&config).with_clock(clock.clone());
        for _ in 0..100 {
            login(&storage).await;
        }

        // when
        clock.advance(1_000);
        let fresh = login(&storage).await;

        // then
        assert_eq!(storage.state.read().unwrap().sessions.len(), 1);
        assert!(storage.current_revision(&fresh).await.is_ok());
    }

    #[tokio::test]
    async fn should_assign_increasing_revisions_to_batches() {
        // given
        let storage = InMemoryVersionedStorage::default();
        let session = login(&storage).await;

        // when
        let r1 = storage
            .set_batch(&session, vec![record("a", "1")])
            .await
            .unwrap();
        let r2 = storage
            .set_batch(&session, vec![record("b", "2"), record("c", "3")])
            .await
            .unwrap();

        // then
        assert_eq!(r1, 1);
        assert_eq!(r2, 2);
        assert_eq!(storage.current_revision(&session).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn should_reject_empty_batch() {
        // given
        let storage = InMemoryVersionedStorage::default();
        let session = login(&storage).await;

        // when
        let result = storage.set_batch(&session, vec![]).await;

        // then
        assert!(matches!(result, Err(StorageError::Storage(_))));
        assert_eq!(storage.current_revision(&session).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn should_read_key_as_of_past_revision() {
        // given
        let storage = InMemoryVersionedStorage::default();
        let session = login(&storage).await;
        let r1 = storage
            .set_batch(&session, vec![record("k", "old")])
            .await
            .unwrap();
        storage
            .set_batch(&session, vec![record("k", "new")])
            .await
            .unwrap();

        // when
        let past = storage.get(&session, Bytes::from("k"), r1).await.unwrap();
        let latest = storage
            .get(&session, Bytes::from("k"), UNBOUNDED_REVISION)
            .await
            .unwrap();

        // then
        assert_eq!(past.unwrap().value, Bytes::from("old"));
        assert_eq!(latest.unwrap().value, Bytes::from("new"));
    }

    #[tokio::test]
    async fn should_see_nothing_at_revision_zero() {
        // given
        let storage = InMemoryVersionedStorage::default();
        let session = login(&storage).await;
        storage
            .set_batch(&session, vec![record("k", "v")])
            .await
            .unwrap();

        // when
        let result = storage.get(&session, Bytes::from("k"), 0).await.unwrap();

        // then
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn should_fail_read_ahead_of_current_revision() {
        // given
        let storage = InMemoryVersionedStorage::default();
        let session = login(&storage).await;

        // when
        let result = storage.get(&session, Bytes::from("k"), 7).await;

        // then
        assert!(matches!(result, Err(StorageError::Storage(_))));
    }

    #[tokio::test]
    async fn should_keep_last_value_for_key_repeated_in_batch() {
        // given
        let storage = InMemoryVersionedStorage::default();
        let session = login(&storage).await;

        // when
        storage
            .set_batch(&session, vec![record("k", "first"), record("k", "second")])
            .await
            .unwrap();

        // then
        let page = storage
            .scan(&session, prefix_scan("k", UNBOUNDED_REVISION))
            .await
            .unwrap();
        assert_eq!(page.records, vec![record("k", "second")]);
    }

    #[tokio::test]
    async fn should_scan_prefix_as_of_revision() {
        // given
        let storage = InMemoryVersionedStorage::default();
        let session = login(&storage).await;
        let r1 = storage
            .set_batch(&session, vec![record("p/1", "a"), record("q/1", "x")])
            .await
            .unwrap();
        storage
            .set_batch(&session, vec![record("p/2", "b")])
            .await
            .unwrap();

        // when
        let past = storage.scan(&session, prefix_scan("p/", r1)).await.unwrap();
        let latest = storage
            .scan(&session, prefix_scan("p/", UNBOUNDED_REVISION))
            .await
            .unwrap();

        // then
        assert_eq!(past.revision, 1);
        assert_eq!(past.records, vec![record("p/1", "a")]);
        assert_eq!(latest.revision, 2);
        assert_eq!(latest.records, vec![record("p/1", "a"), record("p/2", "b")]);
    }

    #[tokio::test]
    async fn should_limit_scan_page() {
        // given
        let storage = InMemoryVersionedStorage::default();
        let session = login(&storage).await;
        storage
            .set_batch(
                &session,
                vec![record("p/1", "a"), record("p/2", "b"), record("p/3", "c")],
            )
            .await
            .unwrap();

        // when
        let first = storage
            .scan(
                &session,
                ScanRequest {
                    range: BytesRange::prefix(Bytes::from("p/")),
                    revision: UNBOUNDED_REVISION,
                    limit: 2,
                },
            )
            .await
            .unwrap();
        let rest = storage
            .scan(
                &session,
                ScanRequest {
                    range: BytesRange::new(
                        Bound::Excluded(Bytes::from("p/2")),
                        BytesRange::prefix(Bytes::from("p/")).end,
                    ),
                    revision: first.revision,
                    limit: 2,
                },
            )
            .await
            .unwrap();

        // then
        assert_eq!(first.records, vec![record("p/1", "a"), record("p/2", "b")]);
        assert_eq!(rest.records, vec![record("p/3", "c")]);
    }
}
