//! Cache layer that coordinates freshness checks, network fetching and the
//! normalized store for one resource type.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use super::address::list_address;
use super::clock::{Clock, SystemClock};
use super::freshness::{should_fetch_list, should_fetch_single, Decision};
use super::list::{ListEntry, ListKey, Pagination};
use super::resource::{Record, ResourceDef};
use super::store::{ResourceStore, SelectedSlot, WriteTicket};
use super::traits::{CacheResult, CacheSource};
use crate::error::ResourceError;
use crate::transport::{ApiAddress, Envelope, Method, Transport};

/// Shared collaborators for every resource cache in a session.
///
/// Built once and handed to each resource explicitly; nothing here is global.
#[derive(Clone)]
pub struct CacheContext {
  transport: Arc<dyn Transport>,
  clock: Arc<dyn Clock>,
  /// How long before cached data is considered stale
  stale_time: Duration,
}

impl CacheContext {
  pub fn new(transport: impl Transport + 'static) -> Self {
    Self::from_arc(Arc::new(transport))
  }

  pub fn from_arc(transport: Arc<dyn Transport>) -> Self {
    Self {
      transport,
      clock: Arc::new(SystemClock),
      stale_time: Duration::minutes(5),
    }
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  pub fn stale_time(&self) -> Duration {
    self.stale_time
  }

  /// Create an empty cache for one resource type.
  pub fn resource<T: Record>(&self, def: ResourceDef<T>) -> ResourceCache<T> {
    ResourceCache {
      def: Arc::new(def),
      store: Arc::new(Mutex::new(ResourceStore::new())),
      transport: Arc::clone(&self.transport),
      clock: Arc::clone(&self.clock),
      stale_time: self.stale_time,
    }
  }
}

/// Normalized cache for one resource type plus the fetch coordinator.
///
/// Clones share the same store. The store lock is never held across an
/// await: a freshness check and its `is_fetching` mark happen in one critical
/// section, so concurrent callers for the same key collapse into one request.
pub struct ResourceCache<T> {
  def: Arc<ResourceDef<T>>,
  store: Arc<Mutex<ResourceStore<T>>>,
  transport: Arc<dyn Transport>,
  clock: Arc<dyn Clock>,
  stale_time: Duration,
}

impl<T: Record> ResourceCache<T> {
  pub fn definition(&self) -> &ResourceDef<T> {
    &self.def
  }

  fn lock(&self) -> MutexGuard<'_, ResourceStore<T>> {
    self.store.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn now(&self) -> DateTime<Utc> {
    self.clock.now()
  }

  /// Copy of the whole store, for rendering or inspection.
  pub fn snapshot(&self) -> ResourceStore<T> {
    self.lock().clone()
  }

  // Single entity

  /// Return the entity, fetching it first if the selected slot says so.
  pub async fn fetch_single_if_needed(&self, id: &str) -> CacheResult<Option<T>> {
    let decision = {
      let mut store = self.lock();
      let decision = should_fetch_single(&store, id, self.now(), self.stale_time);
      if decision.should_fetch() {
        store.request_single(id);
      }
      decision
    };

    debug!(resource = %self.def.name, id, reason = decision.reason(), "single freshness");

    match decision {
      Decision::Fetch(_) => self.complete_single(id).await,
      Decision::InFlight => CacheResult::in_flight(self.get_item(id)),
      Decision::Fresh(_) => CacheResult::from_cache(self.get_item(id)),
    }
  }

  /// Fetch the entity unconditionally.
  pub async fn fetch_single(&self, id: &str) -> CacheResult<Option<T>> {
    self.lock().request_single(id);
    self.complete_single(id).await
  }

  async fn complete_single(&self, id: &str) -> CacheResult<Option<T>> {
    let address = self.def.item_address(id);
    info!(resource = %self.def.name, %address, "fetching");

    let result = self.request_item(&address, Method::Get, None).await;
    let now = self.now();
    let mut store = self.lock();

    match result {
      Ok(item) => {
        store.receive_single(id.to_string(), Ok(item.clone()), now);
        CacheResult::from_network(Some(item))
      }
      Err(err) => {
        warn!(resource = %self.def.name, id, error = %err, "fetch failed");
        store.receive_single(id.to_string(), Err(&err), now);
        CacheResult::failed(None, CacheSource::Network, err)
      }
    }
  }

  // Lists

  /// Return the list, fetching it first if its entry says so.
  pub async fn fetch_list_if_needed(&self, key: impl Into<ListKey>) -> CacheResult<Vec<T>> {
    let key = key.into();
    let address = match list_address(&self.def, &key) {
      Ok(address) => address,
      Err(err) => return self.reject_list(&key, err),
    };

    let decision = {
      let mut store = self.lock();
      let decision = should_fetch_list(&store, &key, self.now(), self.stale_time);
      if decision.should_fetch() {
        store.request_list(&key);
      }
      decision
    };

    debug!(resource = %self.def.plural, list = %key, reason = decision.reason(), "list freshness");

    match decision {
      Decision::Fetch(_) => self.complete_list(&key, &address).await,
      Decision::InFlight => CacheResult::in_flight(self.get_list(key)),
      Decision::Fresh(_) => CacheResult::from_cache(self.get_list(key)),
    }
  }

  /// Fetch the list unconditionally.
  pub async fn fetch_list(&self, key: impl Into<ListKey>) -> CacheResult<Vec<T>> {
    let key = key.into();
    let address = match list_address(&self.def, &key) {
      Ok(address) => address,
      Err(err) => return self.reject_list(&key, err),
    };

    self.lock().request_list(&key);
    self.complete_list(&key, &address).await
  }

  fn reject_list(&self, key: &ListKey, err: ResourceError) -> CacheResult<Vec<T>> {
    warn!(resource = %self.def.plural, list = %key, error = %err, "rejected list key");
    CacheResult::failed(self.get_list(key.clone()), CacheSource::Local, err)
  }

  async fn complete_list(&self, key: &ListKey, address: &ApiAddress) -> CacheResult<Vec<T>> {
    info!(resource = %self.def.plural, list = %key, %address, "fetching list");

    let result = self.request_list(address).await;
    let now = self.now();
    let mut store = self.lock();

    match result {
      Ok(items) => {
        let list: Vec<T> = items.iter().map(|(_, item)| item.clone()).collect();
        store.receive_list(key, Ok(items), now);
        CacheResult::from_network(list)
      }
      Err(err) => {
        warn!(resource = %self.def.plural, list = %key, error = %err, "list fetch failed");
        store.receive_list(key, Err(&err), now);
        CacheResult::failed(store.materialize(key), CacheSource::Network, err)
      }
    }
  }

  // Writes

  /// Create an entity. The caller decides which lists should learn about it.
  pub async fn send_create(&self, item: T) -> CacheResult<Option<T>> {
    let body = match self.def.validate(&item) {
      Ok(body) => body,
      Err(err) => return CacheResult::failed(None, CacheSource::Local, err),
    };

    let ticket = self.lock().begin_write();
    let address = self.def.collection_address();
    info!(resource = %self.def.name, %address, "creating");

    let result = self.request_item(&address, Method::Post, Some(body)).await;
    self.commit_write(ticket, None, result)
  }

  /// Update an entity in place, addressed by its own id.
  pub async fn send_update(&self, item: T) -> CacheResult<Option<T>> {
    let Some(id) = self.def.id_of(&item) else {
      let err = ResourceError::Validation(format!("{} has no id", self.def.name));
      return CacheResult::failed(None, CacheSource::Local, err);
    };
    let body = match self.def.validate(&item) {
      Ok(body) => body,
      Err(err) => return CacheResult::failed(None, CacheSource::Local, err),
    };

    let ticket = self.lock().begin_write();
    let address = self.def.item_address(&id);
    info!(resource = %self.def.name, %address, "updating");

    let result = self.request_item(&address, Method::Put, Some(body)).await;
    self.commit_write(ticket, Some(id), result)
  }

  /// Delete an entity. On success the record is purged from the by-id map;
  /// lists keep the id until the caller removes it (derived views skip it).
  pub async fn send_delete(&self, id: &str) -> CacheResult<Option<T>> {
    let ticket = self.lock().begin_write();
    let address = self.def.item_address(id);
    info!(resource = %self.def.name, %address, "deleting");

    let result = self
      .transport
      .request(&address, Method::Delete, None)
      .await
      .and_then(Envelope::into_result);
    let mut store = self.lock();

    match result {
      Ok(_) => CacheResult::from_network(store.receive_delete(ticket, id)),
      Err(err) => {
        warn!(resource = %self.def.name, id, error = %err, "delete failed");
        store.write_failed(ticket, &err);
        CacheResult::failed(None, CacheSource::Network, err)
      }
    }
  }

  fn commit_write(
    &self,
    ticket: Option<WriteTicket>,
    requested_id: Option<String>,
    result: Result<T, ResourceError>,
  ) -> CacheResult<Option<T>> {
    let now = self.now();
    let mut store = self.lock();

    let result = result.and_then(|item| {
      self
        .def
        .id_of(&item)
        .or(requested_id)
        .map(|id| (id, item))
        .ok_or_else(|| ResourceError::Decode(format!("{} in response has no id", self.def.name)))
    });

    match result {
      Ok((id, item)) => {
        store.receive_write(ticket, id, item.clone(), now);
        CacheResult::from_network(Some(item))
      }
      Err(err) => {
        warn!(resource = %self.def.name, error = %err, "write failed");
        store.write_failed(ticket, &err);
        CacheResult::failed(None, CacheSource::Network, err)
      }
    }
  }

  // Transport helpers

  async fn request_item(
    &self,
    address: &ApiAddress,
    method: Method,
    body: Option<Value>,
  ) -> Result<T, ResourceError> {
    let mut envelope = self
      .transport
      .request(address, method, body)
      .await?
      .into_result()?;
    envelope.take(&self.def.name)
  }

  /// Fetch a list and pair each record with its id, in response order.
  async fn request_list(&self, address: &ApiAddress) -> Result<Vec<(String, T)>, ResourceError> {
    let mut envelope = self
      .transport
      .request(address, Method::Get, None)
      .await?
      .into_result()?;
    let items: Vec<T> = envelope.take(&self.def.plural)?;

    Ok(
      items
        .into_iter()
        .filter_map(|item| match self.def.id_of(&item) {
          Some(id) => Some((id, item)),
          None => {
            warn!(resource = %self.def.plural, "dropping record without id");
            None
          }
        })
        .collect(),
    )
  }

  // Derived views

  /// Materialize a list through the by-id map. Ids without a record are
  /// skipped.
  pub fn get_list(&self, key: impl Into<ListKey>) -> Vec<T> {
    self.lock().materialize(&key.into())
  }

  pub fn get_item(&self, id: &str) -> Option<T> {
    self.lock().get(id).cloned()
  }

  pub fn get_selected(&self) -> Option<T> {
    self.lock().selected_item().cloned()
  }

  pub fn selected_slot(&self) -> SelectedSlot {
    self.lock().selected().clone()
  }

  pub fn list_entry(&self, key: impl Into<ListKey>) -> Option<ListEntry> {
    self.lock().list(&key.into()).cloned()
  }

  /// Keys of every list created so far.
  pub fn list_keys(&self) -> Vec<ListKey> {
    self.lock().lists().keys()
  }

  pub fn default_item(&self) -> Option<T> {
    self.def.default_item.clone()
  }

  // Local state changes

  pub fn invalidate_selected(&self) {
    self.lock().invalidate_selected();
  }

  pub fn invalidate_list(&self, key: impl Into<ListKey>) {
    self.lock().invalidate_list(&key.into());
  }

  pub fn add_to_list(&self, id: &str, key: impl Into<ListKey>) {
    self.lock().add_to_list(id, &key.into());
  }

  pub fn remove_from_list(&self, id: &str, key: impl Into<ListKey>) {
    self.lock().remove_from_list(id, &key.into());
  }

  /// Drop `id` from every list, e.g. after a confirmed delete.
  pub fn remove_from_all_lists(&self, id: &str) {
    self.lock().remove_from_all_lists(id);
  }

  pub fn set_filter(&self, filter: Option<Value>, key: impl Into<ListKey>) {
    self.lock().set_filter(filter, &key.into());
  }

  pub fn set_pagination(&self, pagination: Option<Pagination>, key: impl Into<ListKey>) {
    self.lock().set_pagination(pagination, &key.into());
  }

  /// Put a record into the by-id map without touching lists or selection.
  pub fn add_single_to_map(&self, item: T) -> Result<String, ResourceError> {
    let id = self.require_id(&item)?;
    self.lock().upsert(id.clone(), item);
    Ok(id)
  }

  /// Make `item` the selected entity, as if it had just been fetched.
  pub fn set_selected(&self, item: T) -> Result<String, ResourceError> {
    let id = self.require_id(&item)?;
    let now = self.now();
    self.lock().set_selected(id.clone(), item, now);
    Ok(id)
  }

  fn require_id(&self, item: &T) -> Result<String, ResourceError> {
    self
      .def
      .id_of(item)
      .ok_or_else(|| ResourceError::Validation(format!("{} has no id", self.def.name)))
  }

  #[cfg(test)]
  fn with_store<R>(&self, f: impl FnOnce(&mut ResourceStore<T>) -> R) -> R {
    f(&mut self.lock())
  }
}

impl<T> Clone for ResourceCache<T> {
  fn clone(&self) -> Self {
    Self {
      def: Arc::clone(&self.def),
      store: Arc::clone(&self.store),
      transport: Arc::clone(&self.transport),
      clock: Arc::clone(&self.clock),
      stale_time: self.stale_time,
    }
  }
}
