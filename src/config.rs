use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::cache::{Record, ResourceDef};
use crate::resources;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub server: ServerConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  /// Resources to expose; the built-in shirt and bakery when empty
  #[serde(default)]
  pub resources: Vec<ResourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub url: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
  30
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Minutes before cached lists and entities are considered stale
  #[serde(default = "default_stale_minutes")]
  pub stale_minutes: i64,
}

fn default_stale_minutes() -> i64 {
  5
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_minutes: default_stale_minutes(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
  /// Singular envelope key, e.g. "shirt"
  pub name: String,
  /// Plural envelope key and collection path, e.g. "shirts"
  pub plural: String,
  #[serde(default = "default_id_field")]
  pub id_field: String,
  #[serde(default = "default_api_prefix")]
  pub api_prefix: String,
  #[serde(default)]
  pub required: Vec<String>,
  /// Template for new entities
  #[serde(default)]
  pub defaults: Option<Value>,
}

fn default_id_field() -> String {
  resources::ID_FIELD.to_string()
}

fn default_api_prefix() -> String {
  "/api".to_string()
}

impl ResourceConfig {
  pub fn to_def(&self) -> ResourceDef<Value> {
    let def = ResourceDef::json(&self.name, &self.plural, &self.id_field)
      .with_api_prefix(&self.api_prefix)
      .with_required(self.required.iter().cloned());

    match &self.defaults {
      Some(defaults) => def.with_default_item(defaults.clone()),
      None => def,
    }
  }

  /// Describe a typed resource so the shell can serve it as plain JSON.
  pub fn from_def<T: Record>(def: &ResourceDef<T>, id_field: &str) -> Self {
    Self {
      name: def.name.clone(),
      plural: def.plural.clone(),
      id_field: id_field.to_string(),
      api_prefix: def.api_prefix.clone(),
      required: def.required.clone(),
      defaults: def
        .default_item
        .as_ref()
        .and_then(|item| serde_json::to_value(item).ok()),
    }
  }

  /// The resources every Yote app ships with, taken from the typed models.
  pub fn builtin() -> Vec<Self> {
    vec![
      Self::from_def(&resources::shirts(), resources::ID_FIELD),
      Self::from_def(&resources::bakeries(), resources::ID_FIELD),
    ]
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./yote.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/yote/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/yote/config.yaml\n\
                 with at least `server: {{ url: http://localhost:3030 }}`."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("yote.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("yote").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;

    if config.cache.stale_minutes < 0 {
      return Err(eyre!("cache.stale_minutes must not be negative"));
    }
    if let Some(dup) = config
      .resources
      .iter()
      .enumerate()
      .find(|(i, r)| config.resources[..*i].iter().any(|o| o.name == r.name))
      .map(|(_, r)| r.name.clone())
    {
      return Err(eyre!("resource `{}` is configured twice", dup));
    }

    Ok(config)
  }

  /// Configured resources, falling back to the built-in ones.
  pub fn resources(&self) -> Vec<ResourceConfig> {
    if self.resources.is_empty() {
      ResourceConfig::builtin()
    } else {
      self.resources.clone()
    }
  }

  pub fn stale_time(&self) -> chrono::Duration {
    chrono::Duration::minutes(self.cache.stale_minutes)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::parse("server:\n  url: http://localhost:3030\n").unwrap();
    assert_eq!(config.server.timeout_secs, 30);
    assert_eq!(config.stale_time(), chrono::Duration::minutes(5));

    let names: Vec<String> = config.resources().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["shirt", "bakery"]);
  }

  #[test]
  fn test_builtin_resources_follow_typed_models() {
    let builtin = ResourceConfig::builtin();
    let shirt = builtin[0].to_def();
    let typed = resources::shirts();
    assert_eq!(shirt.collection_address(), typed.collection_address());
    assert_eq!(shirt.required, typed.required);
    assert_eq!(
      shirt.default_item,
      Some(serde_json::to_value(resources::Shirt::default()).unwrap())
    );
    assert_eq!(shirt.default_item.unwrap()["size"], "s");

    let bakery = builtin[1].to_def();
    assert_eq!(bakery.collection_address().to_string(), "/api/bakeries");
    assert_eq!(
      bakery.default_item,
      Some(serde_json::to_value(resources::Bakery::default()).unwrap())
    );
    assert_eq!(bakery.id_of(&json!({"_id": "b1"})), Some("b1".into()));
  }

  #[test]
  fn test_custom_resources() {
    let yaml = r#"
server:
  url: https://api.example.com
  timeout_secs: 10
cache:
  stale_minutes: 1
resources:
  - name: product
    plural: products
    id_field: id
    api_prefix: /v1
    required: [title]
    defaults:
      title: ""
      price: 0
"#;
    let config = Config::parse(yaml).unwrap();
    let resources = config.resources();
    assert_eq!(resources.len(), 1);

    let def = resources[0].to_def();
    assert_eq!(def.collection_address().to_string(), "/v1/products");
    assert_eq!(def.id_of(&json!({"id": "p1"})), Some("p1".into()));
    assert_eq!(def.default_item, Some(json!({"title": "", "price": 0})));
    assert!(def.validate(&json!({"price": 3})).is_err());
  }

  #[test]
  fn test_duplicate_resource_rejected() {
    let yaml = r#"
server: { url: "http://localhost" }
resources:
  - { name: shirt, plural: shirts }
  - { name: shirt, plural: tees }
"#;
    assert!(Config::parse(yaml).is_err());
  }

  #[test]
  fn test_negative_stale_time_rejected() {
    let yaml = "server: { url: \"http://localhost\" }\ncache: { stale_minutes: -1 }\n";
    assert!(Config::parse(yaml).is_err());
  }

  #[test]
  fn test_missing_explicit_path() {
    let err = Config::load(Some(Path::new("/nonexistent/yote.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}
