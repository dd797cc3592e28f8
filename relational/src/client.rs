//! Client for the versioned key-value store.
//!
//! [`StoreClient`] wraps a [`VersionedStorage`] with session handling and
//! revision resolution. Each operation asks the [`SessionProvider`] for a
//! token first. If the store rejects the token, the client invalidates it and
//! re-issues the operation once with a fresh one; any other failure is
//! returned to the caller as is.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use common::{
    BytesRange, Record, ScanPage, ScanRequest, SessionToken, StorageError, StorageResult,
    VersionedStorage,
};

use crate::config::DEFAULT_SCAN_PAGE_SIZE;
use crate::error::{Error, Result};
use crate::model::Revision;
use crate::session::SessionProvider;

#[derive(Clone)]
pub struct StoreClient {
    storage: Arc<dyn VersionedStorage>,
    sessions: Arc<dyn SessionProvider>,
    scan_page_size: usize,
}

impl StoreClient {
    pub fn new(storage: Arc<dyn VersionedStorage>, sessions: Arc<dyn SessionProvider>) -> Self {
        Self {
            storage,
            sessions,
            scan_page_size: DEFAULT_SCAN_PAGE_SIZE,
        }
    }

    /// Sets how many records a scan fetches per round trip. Zero fetches
    /// everything in one page.
    pub fn with_scan_page_size(mut self, scan_page_size: usize) -> Self {
        self.scan_page_size = scan_page_size;
        self
    }

    /// Runs `op` with a session token, retrying once with a fresh token if
    /// the store rejects the first one.
    async fn authorized<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn(Arc<dyn VersionedStorage>, SessionToken) -> Fut + Send + Sync,
        Fut: Future<Output = StorageResult<T>> + Send,
        T: Send,
    {
        let session = self.sessions.session(self.storage.as_ref()).await?;
        match op(Arc::clone(&self.storage), session.clone()).await {
            Err(StorageError::Unauthenticated(msg)) => {
                tracing::warn!(reason = %msg, "session rejected, logging in again");
                self.sessions.invalidate(&session);
                let session = self.sessions.session(self.storage.as_ref()).await?;
                Ok(op(Arc::clone(&self.storage), session).await?)
            }
            result => Ok(result?),
        }
    }

    /// Returns the revision of the most recent write.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn current_revision(&self) -> Result<Revision> {
        let revision = self
            .authorized(|storage, session| async move {
                storage.current_revision(&session).await
            })
            .await?;
        Ok(Revision::new(revision))
    }

    /// Reads `key` as of `revision`.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn get(&self, key: Bytes, revision: Revision) -> Result<Option<Bytes>> {
        let bound = revision.as_bound();
        let record = self
            .authorized(|storage, session| {
                let key = key.clone();
                async move { storage.get(&session, key, bound).await }
            })
            .await?;
        Ok(record.map(|r| r.value))
    }

    /// Writes all pairs atomically and returns the revision they became
    /// visible at.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn set_batch(&self, entries: Vec<(Bytes, Bytes)>) -> Result<Revision> {
        if entries.is_empty() {
            return Err(Error::InvalidInput("write batch is empty".to_string()));
        }
        let records: Vec<Record> = entries
            .into_iter()
            .map(|(key, value)| Record::new(key, value))
            .collect();
        let revision = self
            .authorized(|storage, session| {
                let records = records.clone();
                async move { storage.set_batch(&session, records).await }
            })
            .await?;
        Ok(Revision::new(revision))
    }

    /// Scans every key starting with `prefix` as of `revision`.
    ///
    /// The first page is fetched before returning, so an unreachable store or
    /// an invalid revision is reported here. The stream is empty when nothing
    /// matches.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn scan_prefix(&self, prefix: Bytes, revision: Revision) -> Result<RecordStream> {
        let mut stream = RecordStream {
            client: self.clone(),
            range: BytesRange::prefix(prefix),
            revision: revision.as_bound(),
            buffer: VecDeque::new(),
            last_key: None,
            exhausted: false,
        };
        stream.fetch_page().await?;
        Ok(stream)
    }

    async fn scan_page(&self, range: BytesRange, revision: u64) -> Result<ScanPage> {
        let limit = self.scan_page_size;
        self.authorized(|storage, session| {
            let request = ScanRequest {
                range: range.clone(),
                revision,
                limit,
            };
            async move { storage.scan(&session, request).await }
        })
        .await
    }
}

/// Lazily paged sequence of records under a prefix.
///
/// The revision reported by the first page is pinned for all later pages, so
/// the whole stream reflects a single snapshot even when scanning "latest".
pub struct RecordStream {
    client: StoreClient,
    range: BytesRange,
    revision: u64,
    buffer: VecDeque<Record>,
    last_key: Option<Bytes>,
    exhausted: bool,
}

impl RecordStream {
    /// The snapshot revision the stream reads at.
    pub fn revision(&self) -> Revision {
        Revision::new(self.revision)
    }

    /// Returns the next record, or `None` once the prefix is exhausted.
    pub async fn next(&mut self) -> Result<Option<Record>> {
        if self.buffer.is_empty() && !self.exhausted {
            self.fetch_page().await?;
        }
        Ok(self.buffer.pop_front())
    }

    async fn fetch_page(&mut self) -> Result<()> {
        let range = match &self.last_key {
            Some(key) => self.range.after(key.clone()),
            None => self.range.clone(),
        };
        let page = self.client.scan_page(range, self.revision).await?;

        let page_size = self.client.scan_page_size;
        self.exhausted = page_size == 0 || page.records.len() < page_size;
        self.revision = page.revision;
        self.last_key = page.records.last().map(|r| r.key.clone());
        self.buffer.extend(page.records);
        Ok(())
    }
}
