//! Normalized in-memory store for one resource type.
//!
//! The store only applies state transitions; deciding when to fetch and
//! talking to the backend live in the freshness and layer modules.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;

use super::list::{ListEntry, ListKey, ListNode, Pagination};
use crate::error::ResourceError;

/// Fetch status of the most recently requested single entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectedSlot {
  pub id: Option<String>,
  pub is_fetching: bool,
  pub did_invalidate: bool,
  /// Time the last single fetch completed, successful or not
  pub last_updated: Option<DateTime<Utc>>,
  pub error: Option<String>,
}

/// Proof that a write set the selected slot's `is_fetching` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteTicket(u64);

/// By-id map, list tree and selected slot for one resource.
#[derive(Debug, Clone)]
pub struct ResourceStore<T> {
  by_id: HashMap<String, T>,
  lists: ListNode,
  selected: SelectedSlot,
  /// Request that currently owns `selected.is_fetching`
  fetch_owner: Option<u64>,
  issued: u64,
}

impl<T> Default for ResourceStore<T> {
  fn default() -> Self {
    Self {
      by_id: HashMap::new(),
      lists: ListNode::default(),
      selected: SelectedSlot::default(),
      fetch_owner: None,
      issued: 0,
    }
  }
}

impl<T: Clone> ResourceStore<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, id: &str) -> Option<&T> {
    self.by_id.get(id)
  }

  pub fn contains(&self, id: &str) -> bool {
    self.by_id.contains_key(id)
  }

  pub fn len(&self) -> usize {
    self.by_id.len()
  }

  pub fn is_empty(&self) -> bool {
    self.by_id.is_empty()
  }

  pub fn selected(&self) -> &SelectedSlot {
    &self.selected
  }

  pub fn list(&self, key: &ListKey) -> Option<&ListEntry> {
    self.lists.find(key)
  }

  pub fn lists(&self) -> &ListNode {
    &self.lists
  }

  /// Resolve a list's ids through the by-id map, skipping ids with no record.
  pub fn materialize(&self, key: &ListKey) -> Vec<T> {
    self
      .list(key)
      .map(|entry| {
        entry
          .ids()
          .iter()
          .filter_map(|id| self.by_id.get(id).cloned())
          .collect()
      })
      .unwrap_or_default()
  }

  pub fn selected_item(&self) -> Option<&T> {
    self.selected.id.as_deref().and_then(|id| self.by_id.get(id))
  }

  /// Last write wins.
  pub fn upsert(&mut self, id: String, item: T) {
    self.by_id.insert(id, item);
  }

  pub fn remove(&mut self, id: &str) -> Option<T> {
    self.by_id.remove(id)
  }

  // Selected slot transitions

  fn claim(&mut self) -> u64 {
    self.issued += 1;
    self.fetch_owner = Some(self.issued);
    self.issued
  }

  fn owns(&self, ticket: Option<WriteTicket>) -> bool {
    matches!(ticket, Some(WriteTicket(t)) if self.fetch_owner == Some(t))
  }

  pub fn request_single(&mut self, id: &str) {
    self.claim();
    self.selected = SelectedSlot {
      id: Some(id.to_string()),
      is_fetching: true,
      did_invalidate: false,
      last_updated: self.selected.last_updated,
      error: None,
    };
  }

  /// Commit a completed single read of `id`.
  pub fn receive_single(
    &mut self,
    id: String,
    result: Result<T, &ResourceError>,
    now: DateTime<Utc>,
  ) {
    let error = match result {
      Ok(item) => {
        self.by_id.insert(id.clone(), item);
        None
      }
      Err(err) => Some(err.message().to_string()),
    };

    self.fetch_owner = None;
    self.selected = SelectedSlot {
      id: Some(id),
      is_fetching: false,
      did_invalidate: false,
      last_updated: Some(monotonic(self.selected.last_updated, now)),
      error,
    };
  }

  pub fn invalidate_selected(&mut self) {
    self.selected.did_invalidate = true;
  }

  pub fn set_selected(&mut self, id: String, item: T, now: DateTime<Utc>) {
    self.by_id.insert(id.clone(), item);
    self.fetch_owner = None;
    self.selected = SelectedSlot {
      id: Some(id),
      is_fetching: false,
      did_invalidate: false,
      last_updated: Some(monotonic(self.selected.last_updated, now)),
      error: None,
    };
  }

  /// Mark a write in progress. A pending read keeps the flag, and the write
  /// then gets no ticket and leaves the slot alone when it completes.
  pub fn begin_write(&mut self) -> Option<WriteTicket> {
    if self.selected.is_fetching {
      return None;
    }
    let ticket = self.claim();
    self.selected.is_fetching = true;
    Some(WriteTicket(ticket))
  }

  /// Commit a created or updated record. It becomes the selection only if
  /// nothing else took the slot while the write was pending.
  pub fn receive_write(
    &mut self,
    ticket: Option<WriteTicket>,
    id: String,
    item: T,
    now: DateTime<Utc>,
  ) {
    if self.owns(ticket) {
      self.set_selected(id, item, now);
    } else {
      self.by_id.insert(id, item);
    }
  }

  /// A confirmed delete: purge the record and release the selection if it
  /// pointed at it.
  pub fn receive_delete(&mut self, ticket: Option<WriteTicket>, id: &str) -> Option<T> {
    if self.owns(ticket) {
      self.fetch_owner = None;
      if self.selected.id.as_deref() == Some(id) {
        self.selected = SelectedSlot::default();
      } else {
        self.selected.is_fetching = false;
      }
    }
    self.by_id.remove(id)
  }

  pub fn write_failed(&mut self, ticket: Option<WriteTicket>, err: &ResourceError) {
    if self.owns(ticket) {
      self.fetch_owner = None;
      self.selected.is_fetching = false;
      self.selected.error = Some(err.message().to_string());
    }
  }

  // List transitions

  pub fn request_list(&mut self, key: &ListKey) {
    let entry = self.lists.find_or_create(key);
    entry.items.get_or_insert_with(Vec::new);
    entry.is_fetching = true;
  }

  /// Commit a completed list request. Items are `(id, record)` pairs in
  /// response order.
  pub fn receive_list(
    &mut self,
    key: &ListKey,
    result: Result<Vec<(String, T)>, &ResourceError>,
    now: DateTime<Utc>,
  ) {
    match result {
      Ok(items) => {
        let mut ids = Vec::with_capacity(items.len());
        for (id, item) in items {
          self.by_id.insert(id.clone(), item);
          ids.push(id);
        }

        let entry = self.lists.find_or_create(key);
        entry.items = Some(ids);
        entry.is_fetching = false;
        entry.did_invalidate = false;
        entry.last_updated = Some(monotonic(entry.last_updated, now));
        entry.error = None;
      }
      Err(err) => {
        let entry = self.lists.find_or_create(key);
        entry.is_fetching = false;
        entry.error = Some(err.message().to_string());
      }
    }
  }

  pub fn invalidate_list(&mut self, key: &ListKey) {
    if let Some(entry) = self.lists.find_mut(key) {
      entry.did_invalidate = true;
    }
  }

  pub fn add_to_list(&mut self, id: &str, key: &ListKey) {
    let items = self.lists.find_or_create(key).items.get_or_insert_with(Vec::new);
    if !items.iter().any(|existing| existing == id) {
      items.push(id.to_string());
    }
  }

  pub fn remove_from_list(&mut self, id: &str, key: &ListKey) {
    if let Some(items) = self.lists.find_mut(key).and_then(|e| e.items.as_mut()) {
      items.retain(|existing| existing != id);
    }
  }

  pub fn remove_from_all_lists(&mut self, id: &str) {
    self.lists.remove_everywhere(id);
  }

  pub fn set_filter(&mut self, filter: Option<Value>, key: &ListKey) {
    self.lists.find_or_create(key).filter = filter;
  }

  pub fn set_pagination(&mut self, pagination: Option<Pagination>, key: &ListKey) {
    self.lists.find_or_create(key).pagination = pagination;
  }

  /// Test hook for aging an entry without waiting on the clock.
  #[cfg(test)]
  pub fn list_mut(&mut self, key: &ListKey) -> &mut ListEntry {
    self.lists.find_or_create(key)
  }
}

/// Timestamps never move backwards, even if the clock does.
fn monotonic(previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
  match previous {
    Some(prev) if prev > now => prev,
    _ => now,
  }
}
