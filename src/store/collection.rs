//! Local collection of one resource type kept in sync with the API

use parking_lot::RwLock;
use std::future::Future;
use std::slice;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use super::scope::{Scope, ScopeToken};
use crate::client::{ApiClient, ClientError, DocumentUpload};
use crate::domain::Resource;

pub(crate) struct State<R> {
    items: Vec<Arc<R>>,
    in_flight: usize,
    error: Option<String>,
    fallback: Option<Vec<Arc<R>>>,
}

/// State shared by every handle onto one collection
pub(crate) struct Shared<R> {
    state: RwLock<State<R>>,
    version: watch::Sender<u64>,
    fetch_generation: AtomicU64,
}

impl<R: Resource> Shared<R> {
    pub(crate) fn new() -> Self {
        let (version, _rx) = watch::channel(0);
        Self {
            state: RwLock::new(State {
                items: Vec::new(),
                in_flight: 0,
                error: None,
                fallback: None,
            }),
            version,
            fetch_generation: AtomicU64::new(0),
        }
    }

    fn mutate(&self, f: impl FnOnce(&mut State<R>)) {
        f(&mut *self.state.write());
        self.version.send_modify(|v| *v += 1);
    }
}

/// Marks one request in flight for as long as it lives. Starting clears the
/// shared error; an abandoned request puts it back.
struct InFlight<'a, R: Resource> {
    shared: &'a Shared<R>,
    cleared_error: Option<String>,
}

impl<'a, R: Resource> InFlight<'a, R> {
    fn start(shared: &'a Shared<R>) -> Self {
        let mut cleared_error = None;
        shared.mutate(|s| {
            s.in_flight += 1;
            cleared_error = s.error.take();
        });
        Self {
            shared,
            cleared_error,
        }
    }

    /// Restore the error this request cleared, unless another request has
    /// recorded one since
    fn abandon(&mut self) {
        if let Some(error) = self.cleared_error.take() {
            self.shared.mutate(|s| {
                if s.error.is_none() {
                    s.error = Some(error);
                }
            });
        }
    }
}

impl<R: Resource> Drop for InFlight<'_, R> {
    fn drop(&mut self) {
        self.shared
            .mutate(|s| s.in_flight = s.in_flight.saturating_sub(1));
    }
}

/// Borrowing iterator over the records of a collection
pub struct Items<'a, R> {
    inner: slice::Iter<'a, Arc<R>>,
}

impl<'a, R> Iterator for Items<'a, R> {
    type Item = &'a R;

    fn next(&mut self) -> Option<&'a R> {
        self.inner.next().map(Arc::as_ref)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Handle onto the local collection of `R`.
///
/// Handles are cheap to clone. Handles obtained from one
/// [`StoreRegistry`](super::StoreRegistry) share their state; a handle bound to
/// a [`Scope`] abandons its requests once the scope goes away, leaving the
/// state as it was.
pub struct ResourceStore<R: Resource> {
    shared: Arc<Shared<R>>,
    client: ApiClient,
    scope: Option<ScopeToken>,
}

impl<R: Resource> Clone for ResourceStore<R> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            client: self.client.clone(),
            scope: self.scope.clone(),
        }
    }
}

impl<R: Resource> ResourceStore<R> {
    /// A standalone store with its own collection
    pub fn new(client: ApiClient) -> Self {
        Self::from_shared(Arc::new(Shared::new()), client)
    }

    pub(crate) fn from_shared(shared: Arc<Shared<R>>, client: ApiClient) -> Self {
        Self {
            shared,
            client,
            scope: None,
        }
    }

    /// A handle onto the same collection whose requests end with `scope`
    pub fn bind(&self, scope: &Scope) -> Self {
        Self {
            shared: self.shared.clone(),
            client: self.client.clone(),
            scope: Some(scope.token()),
        }
    }

    /// Records served when a fetch fails
    pub fn set_fallback(&self, records: Vec<R>) {
        let records = records.into_iter().map(Arc::new).collect();
        self.shared.mutate(|s| s.fallback = Some(records));
    }

    // State accessors

    pub fn loading(&self) -> bool {
        self.shared.state.read().in_flight > 0
    }

    pub fn error(&self) -> Option<String> {
        self.shared.state.read().error.clone()
    }

    pub fn snapshot(&self) -> Vec<Arc<R>> {
        self.shared.state.read().items.clone()
    }

    pub fn get(&self, id: &str) -> Option<Arc<R>> {
        self.shared
            .state
            .read()
            .items
            .iter()
            .find(|r| r.id() == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.shared.state.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run a selector over the current records
    pub fn select<T>(&self, f: impl FnOnce(Items<'_, R>) -> T) -> T {
        let state = self.shared.state.read();
        f(Items {
            inner: state.items.iter(),
        })
    }

    /// Receiver bumped after every state change
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.version.subscribe()
    }

    // Remote operations

    /// Replace the collection with the server's list.
    ///
    /// Failures are recorded in [`error`](Self::error) and swap in the fallback
    /// set when one is registered. A fetch finishing after a later-started fetch
    /// is discarded.
    pub async fn fetch_all(&self, filters: &R::Filters) {
        let Ok(mut in_flight) = self.begin() else {
            return;
        };
        let generation = self.shared.fetch_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let result = self.guarded(self.client.list::<R>(filters)).await;

        if let Err(ClientError::Cancelled) = result {
            // Hand the latest slot back so an earlier fetch still counts
            let _ = self.shared.fetch_generation.compare_exchange(
                generation,
                generation - 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            );
            in_flight.abandon();
            return;
        }

        if self.shared.fetch_generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(resource = R::KIND, "Discarding superseded fetch");
            return;
        }

        match result {
            Ok(records) => {
                let items = records.into_iter().map(Arc::new).collect();
                self.shared.mutate(|s| s.items = items);
            }
            Err(e) => {
                tracing::warn!(resource = R::KIND, error = %e, "Fetch failed");
                self.shared.mutate(|s| {
                    s.error = Some(e.to_string());
                    if let Some(fallback) = &s.fallback {
                        s.items = fallback.clone();
                    }
                });
            }
        }
    }

    /// Create a record and put it at the head of the collection
    pub async fn create(&self, data: &R::Create) -> Result<Arc<R>, ClientError> {
        let mut in_flight = self.begin()?;
        let result = self.guarded(self.client.create::<R>(data)).await;
        let record = Arc::new(self.settle(&mut in_flight, result)?);

        self.shared.mutate(|s| s.items.insert(0, record.clone()));
        Ok(record)
    }

    /// Apply a partial update; only the record with `id` is replaced
    pub async fn update(&self, id: &str, data: &R::Update) -> Result<Arc<R>, ClientError> {
        let mut in_flight = self.begin()?;
        let result = self.guarded(self.client.update::<R>(id, data)).await;
        let record = self.settle(&mut in_flight, result)?;
        Ok(self.replace(id, record))
    }

    pub async fn delete(&self, id: &str) -> Result<(), ClientError> {
        let mut in_flight = self.begin()?;
        let result = self.guarded(self.client.delete::<R>(id)).await;
        self.settle(&mut in_flight, result)?;

        self.shared.mutate(|s| s.items.retain(|r| r.id() != id));
        Ok(())
    }

    /// Run a sub-resource action; the parent is replaced by the server's version
    pub async fn act(&self, id: &str, action: R::Action) -> Result<Arc<R>, ClientError> {
        let mut in_flight = self.begin()?;
        let result = self.guarded(self.client.act::<R>(id, &action)).await;
        let record = self.settle(&mut in_flight, result)?;
        Ok(self.replace(id, record))
    }

    pub async fn upload_document(
        &self,
        id: &str,
        upload: DocumentUpload,
    ) -> Result<Arc<R>, ClientError> {
        let mut in_flight = self.begin()?;
        let result = self
            .guarded(self.client.upload_document::<R>(id, upload))
            .await;
        let record = self.settle(&mut in_flight, result)?;
        Ok(self.replace(id, record))
    }

    fn replace(&self, id: &str, record: R) -> Arc<R> {
        let record = Arc::new(record);
        self.shared.mutate(|s| {
            if let Some(slot) = s.items.iter_mut().find(|r| r.id() == id) {
                *slot = record.clone();
            }
        });
        record
    }

    /// Start a request unless the bound scope is already gone, in which case
    /// nothing is sent and the state is left alone
    fn begin(&self) -> Result<InFlight<'_, R>, ClientError> {
        if self.scope.as_ref().is_some_and(ScopeToken::is_cancelled) {
            return Err(ClientError::Cancelled);
        }
        Ok(InFlight::start(&self.shared))
    }

    /// Record a failed mutation in the shared error. Abandoned requests
    /// leave it as it was.
    fn settle<T>(
        &self,
        in_flight: &mut InFlight<'_, R>,
        result: Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        match &result {
            Err(e) if e.is_cancelled() => in_flight.abandon(),
            Err(e) => {
                tracing::warn!(resource = R::KIND, error = %e, "Request failed");
                let message = e.to_string();
                self.shared.mutate(|s| s.error = Some(message));
            }
            Ok(_) => {}
        }
        result
    }

    /// Race `request` against the bound scope
    async fn guarded<T, F>(&self, request: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        let Some(token) = &self.scope else {
            return request.await;
        };
        if token.is_cancelled() {
            return Err(ClientError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!(resource = R::KIND, "Request abandoned");
                Err(ClientError::Cancelled)
            }
            result = request => result,
        }
    }
}
