//! Result values returned by cache operations.

use crate::error::ResourceError;

/// Result of a cache operation, including data and metadata about the source.
///
/// Every operation yields one of these, whether or not a request was made, so
/// callers can chain on it uniformly. Check [`CacheResult::is_success`] before
/// trusting `data`.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// Set when the operation failed
  pub error: Option<ResourceError>,
}

impl<T> CacheResult<T> {
  /// Fresh data from the backend.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      error: None,
    }
  }

  /// Data served from the store without a request.
  pub fn from_cache(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      error: None,
    }
  }

  /// An equivalent request is already pending; `data` is whatever is cached.
  pub fn in_flight(data: T) -> Self {
    Self {
      data,
      source: CacheSource::InFlight,
      error: None,
    }
  }

  pub fn failed(data: T, source: CacheSource, error: ResourceError) -> Self {
    Self {
      data,
      source,
      error: Some(error),
    }
  }

  pub fn is_success(&self) -> bool {
    self.error.is_none()
  }
}

/// Indicates where the data in a [`CacheResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// A request was made (successful or not)
  Network,
  /// Served from the store, no request needed
  Cache,
  /// Served from the store while an equivalent request is pending
  InFlight,
  /// Rejected before reaching the backend
  Local,
}
