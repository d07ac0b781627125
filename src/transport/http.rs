use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{ApiAddress, Envelope, Method, Transport};
use crate::config::ServerConfig;
use crate::error::ResourceError;

/// JSON-over-HTTP transport for a Yote server.
#[derive(Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
  base: Url,
}

impl HttpTransport {
  pub fn new(config: &ServerConfig) -> Result<Self, ResourceError> {
    let base = Url::parse(&config.url)
      .map_err(|e| ResourceError::Transport(format!("invalid server url {}: {}", config.url, e)))?;

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;

    Ok(Self { client, base })
  }

  /// Resolve an address against the server root, encoding each segment.
  fn url_for(&self, address: &ApiAddress) -> Result<Url, ResourceError> {
    let mut url = self.base.clone();
    url
      .path_segments_mut()
      .map_err(|_| ResourceError::Transport(format!("{} cannot be a base url", self.base)))?
      .pop_if_empty()
      .extend(&address.segments);

    if !address.query.is_empty() {
      url.query_pairs_mut().extend_pairs(&address.query);
    }

    Ok(url)
  }

  async fn send(
    &self,
    address: &ApiAddress,
    method: Method,
    body: Option<Value>,
  ) -> Result<Envelope, ResourceError> {
    let url = self.url_for(address)?;
    debug!(%method, %url, "sending request");

    let verb = match method {
      Method::Get => reqwest::Method::GET,
      Method::Post => reqwest::Method::POST,
      Method::Put => reqwest::Method::PUT,
      Method::Delete => reqwest::Method::DELETE,
    };

    let mut request = self.client.request(verb, url);
    if let Some(body) = body {
      request = request.json(&body);
    }

    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
      // Error bodies are usually envelopes too; use their message if present
      let message = response
        .json::<Envelope>()
        .await
        .ok()
        .and_then(|envelope| envelope.message_text());
      warn!(%method, %address, status = status.as_u16(), "request failed");
      return Err(ResourceError::from_status(status.as_u16(), message));
    }

    Ok(response.json::<Envelope>().await?)
  }
}

impl Transport for HttpTransport {
  fn request<'a>(
    &'a self,
    address: &'a ApiAddress,
    method: Method,
    body: Option<Value>,
  ) -> BoxFuture<'a, Result<Envelope, ResourceError>> {
    self.send(address, method, body).boxed()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn transport(url: &str) -> HttpTransport {
    HttpTransport::new(&ServerConfig {
      url: url.to_string(),
      timeout_secs: 5,
    })
    .unwrap()
  }

  #[test]
  fn test_url_for_encodes_segments_and_query() {
    let http = transport("http://localhost:3030");
    let address = ApiAddress::from_path("/api/shirts")
      .push("by-name")
      .push("blue shirt");
    assert_eq!(
      http.url_for(&address).unwrap().as_str(),
      "http://localhost:3030/api/shirts/by-name/blue%20shirt"
    );

    let address = ApiAddress::from_path("/api/shirts")
      .push("by-tag-list")
      .query_pair("tag", "a")
      .query_pair("tag", "b");
    assert_eq!(
      http.url_for(&address).unwrap().as_str(),
      "http://localhost:3030/api/shirts/by-tag-list?tag=a&tag=b"
    );
  }

  #[test]
  fn test_url_for_keeps_base_path() {
    let http = transport("https://example.com/yote/");
    let address = ApiAddress::from_path("/api/bakeries");
    assert_eq!(
      http.url_for(&address).unwrap().as_str(),
      "https://example.com/yote/api/bakeries"
    );
  }

  #[test]
  fn test_invalid_url() {
    let result = HttpTransport::new(&ServerConfig {
      url: "not a url".to_string(),
      timeout_secs: 5,
    });
    assert!(matches!(result, Err(ResourceError::Transport(_))));
  }
}
