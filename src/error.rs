use thiserror::Error;

/// Failure surfaced by a cache operation.
///
/// Operations never return these through `Err`; they are carried on the
/// result value (and recorded on the selected slot or list entry) so callers
/// always get a uniform continuation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("validation failed: {0}")]
  Validation(String),

  #[error("transport error: {0}")]
  Transport(String),

  #[error("invalid list key: {0}")]
  InvalidListKey(String),

  /// The backend answered `success: false` with a message we can't classify.
  #[error("server error: {0}")]
  Server(String),

  #[error("malformed response: {0}")]
  Decode(String),
}

impl ResourceError {
  /// Classify a `success: false` envelope by its message.
  pub fn rejected(message: Option<String>) -> Self {
    let message = message.unwrap_or_else(|| "request failed".to_string());
    let lower = message.to_lowercase();

    if lower.contains("not found") {
      Self::NotFound(message)
    } else if lower.contains("required") || lower.contains("validation") {
      Self::Validation(message)
    } else if lower.contains("invalid parameter length") {
      Self::InvalidListKey(message)
    } else {
      Self::Server(message)
    }
  }

  /// Classify a non-2xx HTTP response.
  pub fn from_status(status: u16, message: Option<String>) -> Self {
    let message = message.unwrap_or_else(|| format!("HTTP {}", status));
    match status {
      404 => Self::NotFound(message),
      400 | 422 => Self::Validation(message),
      _ => Self::Transport(message),
    }
  }

  /// The bare message, without the category prefix.
  pub fn message(&self) -> &str {
    match self {
      Self::NotFound(m)
      | Self::Validation(m)
      | Self::Transport(m)
      | Self::InvalidListKey(m)
      | Self::Server(m)
      | Self::Decode(m) => m,
    }
  }
}

impl From<reqwest::Error> for ResourceError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      Self::Decode(err.to_string())
    } else {
      Self::Transport(err.to_string())
    }
  }
}

impl From<serde_json::Error> for ResourceError {
  fn from(err: serde_json::Error) -> Self {
    Self::Decode(err.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_rejected_classifies_by_message() {
    assert!(matches!(
      ResourceError::rejected(Some("Shirt not found.".into())),
      ResourceError::NotFound(_)
    ));
    assert!(matches!(
      ResourceError::rejected(Some("name is required!".into())),
      ResourceError::Validation(_)
    ));
    assert!(matches!(
      ResourceError::rejected(Some("Invalid parameter length".into())),
      ResourceError::InvalidListKey(_)
    ));
    assert!(matches!(
      ResourceError::rejected(None),
      ResourceError::Server(_)
    ));
  }

  #[test]
  fn test_from_status() {
    assert!(matches!(
      ResourceError::from_status(404, None),
      ResourceError::NotFound(_)
    ));
    assert!(matches!(
      ResourceError::from_status(422, Some("bad".into())),
      ResourceError::Validation(_)
    ));
    let err = ResourceError::from_status(502, None);
    assert_eq!(err, ResourceError::Transport("HTTP 502".into()));
    assert_eq!(err.message(), "HTTP 502");
  }
}
