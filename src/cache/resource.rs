//! Per-resource configuration record.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::ResourceError;
use crate::transport::ApiAddress;

/// Bounds every cached entity type must meet.
pub trait Record: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {}

impl<T> Record for T where T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {}

type IdFn<T> = Arc<dyn Fn(&T) -> Option<String> + Send + Sync>;

/// Everything the generic cache needs to know about one resource type.
///
/// `name` is the envelope key for a single entity (`shirt`), `plural` is the
/// envelope key for lists and the collection path (`shirts`).
pub struct ResourceDef<T> {
  pub name: String,
  pub plural: String,
  pub api_prefix: String,
  /// Fields that must be present and non-blank before a create/update is sent
  pub required: Vec<String>,
  pub default_item: Option<T>,
  id_of: IdFn<T>,
}

impl<T: Record> ResourceDef<T> {
  pub fn new<F>(name: impl Into<String>, plural: impl Into<String>, id_of: F) -> Self
  where
    F: Fn(&T) -> Option<String> + Send + Sync + 'static,
  {
    Self {
      name: name.into(),
      plural: plural.into(),
      api_prefix: "/api".to_string(),
      required: Vec::new(),
      default_item: None,
      id_of: Arc::new(id_of),
    }
  }

  pub fn with_api_prefix(mut self, prefix: impl Into<String>) -> Self {
    self.api_prefix = prefix.into();
    self
  }

  pub fn with_required<I, S>(mut self, fields: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.required = fields.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_default_item(mut self, item: T) -> Self {
    self.default_item = Some(item);
    self
  }

  pub fn id_of(&self, item: &T) -> Option<String> {
    (self.id_of)(item)
  }

  /// `<api_prefix>/<plural>`
  pub fn collection_address(&self) -> ApiAddress {
    ApiAddress::from_path(&self.api_prefix).push(self.plural.clone())
  }

  /// `<api_prefix>/<plural>/<id>`
  pub fn item_address(&self, id: &str) -> ApiAddress {
    self.collection_address().push(id)
  }

  /// Check required fields on the serialized form of `item`.
  pub fn validate(&self, item: &T) -> Result<Value, ResourceError> {
    let value = serde_json::to_value(item)?;
    let missing: Vec<&str> = self
      .required
      .iter()
      .filter(|field| value.get(field.as_str()).map_or(true, is_blank))
      .map(String::as_str)
      .collect();

    if missing.is_empty() {
      Ok(value)
    } else {
      Err(ResourceError::Validation(format!(
        "{} is required!",
        missing.join(", ")
      )))
    }
  }
}

/// Missing the way a mongoose `required` validator sees it.
fn is_blank(value: &Value) -> bool {
  match value {
    Value::Null => true,
    Value::String(s) => s.is_empty(),
    _ => false,
  }
}

impl ResourceDef<Value> {
  /// Definition for untyped JSON documents whose id lives in `id_field`.
  pub fn json(
    name: impl Into<String>,
    plural: impl Into<String>,
    id_field: impl Into<String>,
  ) -> Self {
    let id_field = id_field.into();
    Self::new(name, plural, move |item: &Value| {
      match item.get(&id_field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
      }
    })
  }
}

impl<T> Clone for ResourceDef<T>
where
  T: Clone,
{
  fn clone(&self) -> Self {
    Self {
      name: self.name.clone(),
      plural: self.plural.clone(),
      api_prefix: self.api_prefix.clone(),
      required: self.required.clone(),
      default_item: self.default_item.clone(),
      id_of: Arc::clone(&self.id_of),
    }
  }
}

impl<T> fmt::Debug for ResourceDef<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ResourceDef")
      .field("name", &self.name)
      .field("plural", &self.plural)
      .field("api_prefix", &self.api_prefix)
      .field("required", &self.required)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_json_id_extraction() {
    let def = ResourceDef::json("shirt", "shirts", "_id");
    assert_eq!(def.id_of(&json!({"_id": "s1"})), Some("s1".to_string()));
    assert_eq!(def.id_of(&json!({"_id": 7})), Some("7".to_string()));
    assert_eq!(def.id_of(&json!({"id": "s1"})), None);
  }

  #[test]
  fn test_addresses() {
    let def = ResourceDef::json("bakery", "bakeries", "_id");
    assert_eq!(def.collection_address().to_string(), "/api/bakeries");
    assert_eq!(def.item_address("b1").to_string(), "/api/bakeries/b1");

    let def = def.with_api_prefix("/v2/api/");
    assert_eq!(def.collection_address().to_string(), "/v2/api/bakeries");
  }

  #[test]
  fn test_validate_required_fields() {
    let def = ResourceDef::json("shirt", "shirts", "_id").with_required(["name"]);
    assert!(def.validate(&json!({"name": "tee"})).is_ok());

    let err = def.validate(&json!({"color": "red"})).unwrap_err();
    assert_eq!(err, ResourceError::Validation("name is required!".into()));
    assert!(def.validate(&json!({"name": null})).is_err());
    assert!(def.validate(&json!({"name": ""})).is_err());
  }
}
