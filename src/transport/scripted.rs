//! In-memory transport that replays queued responses and records requests.

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

use super::{ApiAddress, Envelope, Method, Transport};
use crate::error::ResourceError;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
  pub method: Method,
  pub address: String,
  pub body: Option<Value>,
}

#[derive(Clone, Default)]
pub struct ScriptedTransport {
  responses: Arc<Mutex<VecDeque<Result<Value, ResourceError>>>>,
  requests: Arc<Mutex<Vec<RecordedRequest>>>,
  gate: Option<Arc<Semaphore>>,
  held: Arc<Mutex<HashMap<String, Arc<Notify>>>>,
}

impl ScriptedTransport {
  pub fn new() -> Self {
    Self::default()
  }

  /// Hold every response until a permit is added to the returned semaphore.
  pub fn gated() -> (Self, Arc<Semaphore>) {
    let gate = Arc::new(Semaphore::new(0));
    let transport = Self {
      gate: Some(Arc::clone(&gate)),
      ..Self::default()
    };
    (transport, gate)
  }

  /// Hold requests to `address` until the returned handle is notified.
  /// Other addresses answer straight away, in script order.
  pub fn hold(&self, address: &str) -> Arc<Notify> {
    let release = Arc::new(Notify::new());
    self
      .held
      .lock()
      .unwrap()
      .insert(address.to_string(), Arc::clone(&release));
    release
  }

  pub fn respond(&self, body: Value) -> &Self {
    self.responses.lock().unwrap().push_back(Ok(body));
    self
  }

  pub fn fail(&self, err: ResourceError) -> &Self {
    self.responses.lock().unwrap().push_back(Err(err));
    self
  }

  pub fn requests(&self) -> Vec<RecordedRequest> {
    self.requests.lock().unwrap().clone()
  }

  pub fn addresses(&self) -> Vec<String> {
    self.requests().into_iter().map(|r| r.address).collect()
  }

  pub fn request_count(&self) -> usize {
    self.requests.lock().unwrap().len()
  }
}

impl Transport for ScriptedTransport {
  fn request<'a>(
    &'a self,
    address: &'a ApiAddress,
    method: Method,
    body: Option<Value>,
  ) -> BoxFuture<'a, Result<Envelope, ResourceError>> {
    async move {
      self.requests.lock().unwrap().push(RecordedRequest {
        method,
        address: address.to_string(),
        body,
      });

      let held = self.held.lock().unwrap().get(&address.to_string()).cloned();
      if let Some(release) = held {
        release.notified().await;
      }

      if let Some(gate) = &self.gate {
        gate
          .acquire()
          .await
          .map_err(|e| ResourceError::Transport(e.to_string()))?
          .forget();
      }

      let next = self
        .responses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(ResourceError::Transport("no scripted response".into())));

      Ok(serde_json::from_value(next?)?)
    }
    .boxed()
  }
}
