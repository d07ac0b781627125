use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A bakery as stored by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bakery {
  #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated: Option<DateTime<Utc>>,
  #[serde(default)]
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub address: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub city: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub state: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub zip: Option<u32>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheContext, ListKey};
  use crate::resources::bakeries;
  use crate::transport::scripted::ScriptedTransport;
  use serde_json::json;

  #[tokio::test]
  async fn test_update_and_delete_bakery() {
    let transport = ScriptedTransport::new();
    transport
      .respond(json!({"success": true, "bakeries": [
        {"_id": "b1", "name": "Crumb", "city": "Tulsa", "zip": 74103},
        {"_id": "b2", "name": "Rise", "city": "Tulsa"}
      ]}))
      .respond(json!({
        "success": true,
        "bakery": {"_id": "b1", "name": "Crumb & Co", "city": "Tulsa", "zip": 74103}
      }))
      .respond(json!({"success": true, "message": "Deleted bakery"}));
    let cache = CacheContext::new(transport.clone()).resource(bakeries());

    let key = ListKey::from(["city", "Tulsa"]);
    cache.fetch_list_if_needed(key.clone()).await;

    let mut crumb = cache.get_item("b1").unwrap();
    assert_eq!(crumb.zip, Some(74103));
    crumb.name = "Crumb & Co".into();
    let updated = cache.send_update(crumb).await;
    assert!(updated.is_success());
    assert_eq!(transport.requests()[1].address, "/api/bakeries/b1");

    let names: Vec<String> = cache.get_list(key.clone()).into_iter().map(|b| b.name).collect();
    assert_eq!(names, vec!["Crumb & Co", "Rise"]);

    let deleted = cache.send_delete("b2").await;
    assert!(deleted.is_success());
    cache.remove_from_list("b2", key.clone());
    assert_eq!(cache.get_list(key).len(), 1);
    assert!(cache.get_item("b2").is_none());
  }
}
