//! Transport collaborator used by the cache to reach a Yote backend.
//!
//! Every backend response is wrapped in the same envelope:
//! `{ success, message?, <name | plural>: data }`. The cache only ever talks
//! to the [`Transport`] trait, so tests and alternative clients can swap the
//! HTTP implementation out.

mod http;
#[cfg(test)]
pub(crate) mod scripted;

pub use http::HttpTransport;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::error::ResourceError;

/// HTTP verbs used by the resource routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Post,
  Put,
  Delete,
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Method::Get => "GET",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Delete => "DELETE",
    };
    f.write_str(s)
  }
}

/// A backend address relative to the server root.
///
/// Kept as raw path segments plus query pairs so the HTTP layer can encode
/// them properly; `Display` renders the unencoded form used in logs and tests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiAddress {
  pub segments: Vec<String>,
  pub query: Vec<(String, String)>,
}

impl ApiAddress {
  /// Parse a slash separated prefix such as `/api/shirts`.
  pub fn from_path(path: &str) -> Self {
    Self {
      segments: path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect(),
      query: Vec::new(),
    }
  }

  pub fn push(mut self, segment: impl Into<String>) -> Self {
    self.segments.push(segment.into());
    self
  }

  pub fn query_pair(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.query.push((key.into(), value.into()));
    self
  }
}

impl fmt::Display for ApiAddress {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for segment in &self.segments {
      write!(f, "/{}", segment)?;
    }
    for (i, (key, value)) in self.query.iter().enumerate() {
      let sep = if i == 0 { '?' } else { '&' };
      write!(f, "{}{}={}", sep, key, value)?;
    }
    Ok(())
  }
}

/// Response envelope shared by every resource route.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Envelope {
  #[serde(default)]
  pub success: bool,
  /// Mongoose errors come back as objects, so this is kept loose.
  #[serde(default)]
  pub message: Option<Value>,
  #[serde(flatten)]
  pub payload: Map<String, Value>,
}

impl Envelope {
  pub fn message_text(&self) -> Option<String> {
    match &self.message {
      None | Some(Value::Null) => None,
      Some(Value::String(s)) => Some(s.clone()),
      Some(other) => Some(other.to_string()),
    }
  }

  /// Turn a `success: false` envelope into an error, or pass it through.
  pub fn into_result(self) -> Result<Self, ResourceError> {
    if self.success {
      Ok(self)
    } else {
      Err(ResourceError::rejected(self.message_text()))
    }
  }

  /// Remove and decode the payload stored under `key`.
  pub fn take<T: DeserializeOwned>(&mut self, key: &str) -> Result<T, ResourceError> {
    let value = self
      .payload
      .remove(key)
      .ok_or_else(|| ResourceError::Decode(format!("response is missing `{}`", key)))?;
    Ok(serde_json::from_value(value)?)
  }
}

/// Something that can carry a request to the backend.
///
/// Implementations must report network failures and non-2xx responses as
/// errors; a 2xx body with `success: false` is returned as-is and classified
/// by the caller.
pub trait Transport: Send + Sync {
  fn request<'a>(
    &'a self,
    address: &'a ApiAddress,
    method: Method,
    body: Option<Value>,
  ) -> BoxFuture<'a, Result<Envelope, ResourceError>>;
}
