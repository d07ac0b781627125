//! Decides whether a single entity or a list needs a network fetch.

use chrono::{DateTime, Duration, Utc};

use super::list::ListKey;
use super::store::ResourceStore;

/// Outcome of a freshness check, with the reason for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
  Fetch(&'static str),
  /// An equivalent request is already pending
  InFlight,
  Fresh(&'static str),
}

impl Decision {
  pub fn should_fetch(&self) -> bool {
    matches!(self, Decision::Fetch(_))
  }

  pub fn reason(&self) -> &'static str {
    match self {
      Decision::Fetch(reason) | Decision::Fresh(reason) => reason,
      Decision::InFlight => "already fetching",
    }
  }
}

/// A timestamp that was never set counts as stale.
fn is_stale(last_updated: Option<DateTime<Utc>>, now: DateTime<Utc>, stale_time: Duration) -> bool {
  last_updated.map_or(true, |at| now - at > stale_time)
}

fn from_invalidation(did_invalidate: bool) -> Decision {
  if did_invalidate {
    Decision::Fetch("invalidated")
  } else {
    Decision::Fresh("cached")
  }
}

pub fn should_fetch_single<T: Clone>(
  store: &ResourceStore<T>,
  id: &str,
  now: DateTime<Utc>,
  stale_time: Duration,
) -> Decision {
  let selected = store.selected();

  if selected.id.as_deref() != Some(id) {
    Decision::Fetch("selection changed")
  } else if selected.is_fetching {
    Decision::InFlight
  } else if !store.contains(id) && selected.error.is_none() {
    // An id that errored is absent from the map on purpose; re-fetching it
    // here would loop.
    Decision::Fetch("not in map")
  } else if is_stale(selected.last_updated, now, stale_time) {
    Decision::Fetch("stale")
  } else {
    from_invalidation(selected.did_invalidate)
  }
}

pub fn should_fetch_list<T: Clone>(
  store: &ResourceStore<T>,
  key: &ListKey,
  now: DateTime<Utc>,
  stale_time: Duration,
) -> Decision {
  let Some(entry) = store.list(key).filter(|entry| entry.items.is_some()) else {
    return Decision::Fetch("list not found");
  };

  if entry.is_fetching {
    Decision::InFlight
  } else if entry.error.is_some() {
    // Errors are not retried on their own; only an explicit invalidate does.
    from_invalidation(entry.did_invalidate)
  } else if is_stale(entry.last_updated, now, stale_time) {
    Decision::Fetch("stale")
  } else {
    from_invalidation(entry.did_invalidate)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::ResourceError;

  const FIVE_MIN: i64 = 5;

  fn stale_time() -> Duration {
    Duration::minutes(FIVE_MIN)
  }

  #[test]
  fn test_single_precedence() {
    let mut store = ResourceStore::<String>::new();
    let now = Utc::now();

    assert_eq!(
      should_fetch_single(&store, "a", now, stale_time()),
      Decision::Fetch("selection changed")
    );

    store.request_single("a");
    assert_eq!(
      should_fetch_single(&store, "a", now, stale_time()),
      Decision::InFlight
    );

    store.receive_single("a".into(), Ok("A".into()), now);
    assert_eq!(
      should_fetch_single(&store, "a", now, stale_time()),
      Decision::Fresh("cached")
    );

    store.invalidate_selected();
    assert_eq!(
      should_fetch_single(&store, "a", now, stale_time()),
      Decision::Fetch("invalidated")
    );
  }

  #[test]
  fn test_single_missing_from_map() {
    let mut store = ResourceStore::<String>::new();
    let now = Utc::now();
    store.receive_single("a".into(), Ok("A".into()), now);
    store.remove("a");

    assert_eq!(
      should_fetch_single(&store, "a", now, stale_time()),
      Decision::Fetch("not in map")
    );
  }

  #[test]
  fn test_single_error_is_not_refetched_until_stale() {
    let mut store = ResourceStore::<String>::new();
    let now = Utc::now();
    let err = ResourceError::NotFound("not found".into());
    store.request_single("missing1");
    store.receive_single("missing1".into(), Err(&err), now);

    let later = now + Duration::minutes(1);
    assert!(!should_fetch_single(&store, "missing1", later, stale_time()).should_fetch());

    let much_later = now + Duration::minutes(6);
    assert_eq!(
      should_fetch_single(&store, "missing1", much_later, stale_time()),
      Decision::Fetch("stale")
    );
  }

  #[test]
  fn test_staleness_boundary_is_exclusive() {
    let mut store = ResourceStore::<String>::new();
    let now = Utc::now();
    store.receive_single("a".into(), Ok("A".into()), now);

    let edge = now + stale_time();
    assert!(!should_fetch_single(&store, "a", edge, stale_time()).should_fetch());
    let past = edge + Duration::milliseconds(1);
    assert!(should_fetch_single(&store, "a", past, stale_time()).should_fetch());
  }

  #[test]
  fn test_list_precedence() {
    let mut store = ResourceStore::<String>::new();
    let key = ListKey::all();
    let now = Utc::now();

    assert_eq!(
      should_fetch_list(&store, &key, now, stale_time()),
      Decision::Fetch("list not found")
    );

    store.request_list(&key);
    assert_eq!(
      should_fetch_list(&store, &key, now, stale_time()),
      Decision::InFlight
    );

    store.receive_list(&key, Ok(vec![]), now);
    assert_eq!(
      should_fetch_list(&store, &key, now, stale_time()),
      Decision::Fresh("cached")
    );

    let later = now + Duration::minutes(6);
    assert_eq!(
      should_fetch_list(&store, &key, later, stale_time()),
      Decision::Fetch("stale")
    );

    store.invalidate_list(&key);
    assert_eq!(
      should_fetch_list(&store, &key, now, stale_time()),
      Decision::Fetch("invalidated")
    );
  }

  #[test]
  fn test_list_with_filter_only_is_fetched() {
    let mut store = ResourceStore::<String>::new();
    let key = ListKey::from("color");
    store.set_filter(None, &key);
    assert!(should_fetch_list(&store, &key, Utc::now(), stale_time()).should_fetch());
  }

  #[test]
  fn test_list_added_to_but_never_fetched() {
    let mut store = ResourceStore::<String>::new();
    let key = ListKey::all();
    store.add_to_list("a", &key);
    assert_eq!(
      should_fetch_list(&store, &key, Utc::now(), stale_time()),
      Decision::Fetch("stale")
    );
  }

  #[test]
  fn test_list_error_waits_for_invalidate() {
    let mut store = ResourceStore::<String>::new();
    let key = ListKey::all();
    let now = Utc::now();
    let err = ResourceError::Transport("down".into());
    store.request_list(&key);
    store.receive_list(&key, Err(&err), now);

    let later = now + Duration::minutes(10);
    assert_eq!(
      should_fetch_list(&store, &key, later, stale_time()),
      Decision::Fresh("cached")
    );

    store.invalidate_list(&key);
    assert!(should_fetch_list(&store, &key, later, stale_time()).should_fetch());
  }
}
