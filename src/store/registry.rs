use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use super::collection::{ResourceStore, Shared};
use super::scope::Scope;
use crate::client::ApiClient;
use crate::domain::Resource;

type SharedAny = Arc<dyn Any + Send + Sync>;

/// One shared collection per resource type
#[derive(Clone)]
pub struct StoreRegistry {
    client: ApiClient,
    stores: Arc<Mutex<HashMap<TypeId, SharedAny>>>,
}

impl StoreRegistry {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            stores: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// The store for `R`, created on first use
    pub fn store<R: Resource>(&self) -> ResourceStore<R> {
        let mut stores = self.stores.lock();
        let entry = stores
            .entry(TypeId::of::<R>())
            .or_insert_with(|| Arc::new(Shared::<R>::new()) as SharedAny);

        let shared = match entry.clone().downcast::<Shared<R>>() {
            Ok(shared) => shared,
            // Entries are keyed by their own TypeId; replace anything else.
            Err(_) => {
                let shared = Arc::new(Shared::<R>::new());
                *entry = shared.clone() as SharedAny;
                shared
            }
        };
        drop(stores);

        tracing::trace!(resource = R::KIND, "Store handle issued");
        ResourceStore::from_shared(shared, self.client.clone())
    }

    /// The shared store for `R`, bound to `scope`
    pub fn scoped<R: Resource>(&self, scope: &Scope) -> ResourceStore<R> {
        self.store::<R>().bind(scope)
    }

    /// Number of resource types with a live collection
    pub fn len(&self) -> usize {
        self.stores.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
