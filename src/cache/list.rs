//! List keys and the nested list tree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// One argument of a list key: a scalar or a sequence of scalars.
///
/// The list tree is keyed by segments themselves, so the scalar `"a,b"` and
/// the sequence `["a", "b"]` name different lists.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
  Scalar(String),
  Seq(Vec<String>),
}

impl Segment {
  pub fn as_scalar(&self) -> Option<&str> {
    match self {
      Segment::Scalar(s) => Some(s),
      Segment::Seq(_) => None,
    }
  }
}

impl fmt::Display for Segment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Segment::Scalar(s) => f.write_str(s),
      Segment::Seq(items) => write!(f, "[{}]", items.join(",")),
    }
  }
}

impl From<&str> for Segment {
  fn from(s: &str) -> Self {
    Segment::Scalar(s.to_string())
  }
}

impl From<String> for Segment {
  fn from(s: String) -> Self {
    Segment::Scalar(s)
  }
}

impl From<&String> for Segment {
  fn from(s: &String) -> Self {
    Segment::Scalar(s.clone())
  }
}

impl From<Vec<String>> for Segment {
  fn from(items: Vec<String>) -> Self {
    Segment::Seq(items)
  }
}

impl From<Vec<&str>> for Segment {
  fn from(items: Vec<&str>) -> Self {
    Segment::Seq(items.into_iter().map(String::from).collect())
  }
}

impl<const N: usize> From<[&str; N]> for Segment {
  fn from(items: [&str; N]) -> Self {
    Segment::Seq(items.iter().map(|s| s.to_string()).collect())
  }
}

/// Address of a list: `["all"]`, `["author", "u1"]`, `["tag", ["a", "b"]]`...
///
/// An empty key always normalizes to `["all"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListKey(Vec<Segment>);

impl ListKey {
  pub const ALL: &'static str = "all";

  pub fn new(segments: Vec<Segment>) -> Self {
    if segments.is_empty() {
      Self::all()
    } else {
      Self(segments)
    }
  }

  pub fn all() -> Self {
    Self(vec![Segment::from(Self::ALL)])
  }

  pub fn segments(&self) -> &[Segment] {
    &self.0
  }

  pub fn is_all(&self) -> bool {
    self.0.len() == 1 && self.0[0].as_scalar() == Some(Self::ALL)
  }
}

impl Default for ListKey {
  fn default() -> Self {
    Self::all()
  }
}

impl fmt::Display for ListKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let parts: Vec<String> = self.0.iter().map(|s| s.to_string()).collect();
    f.write_str(&parts.join("/"))
  }
}

impl From<()> for ListKey {
  fn from(_: ()) -> Self {
    Self::all()
  }
}

impl From<&str> for ListKey {
  fn from(s: &str) -> Self {
    Self::new(vec![Segment::from(s)])
  }
}

impl From<Vec<Segment>> for ListKey {
  fn from(segments: Vec<Segment>) -> Self {
    Self::new(segments)
  }
}

impl From<Vec<String>> for ListKey {
  fn from(segments: Vec<String>) -> Self {
    Self::new(segments.into_iter().map(Segment::from).collect())
  }
}

impl From<Vec<&str>> for ListKey {
  fn from(segments: Vec<&str>) -> Self {
    Self::new(segments.into_iter().map(Segment::from).collect())
  }
}

impl<const N: usize> From<[&str; N]> for ListKey {
  fn from(segments: [&str; N]) -> Self {
    Self::new(segments.iter().map(|s| Segment::from(*s)).collect())
  }
}

impl<const N: usize> From<[Segment; N]> for ListKey {
  fn from(segments: [Segment; N]) -> Self {
    Self::new(segments.into())
  }
}

/// Page window stored alongside a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
  pub page: u32,
  pub per: u32,
}

impl Default for Pagination {
  fn default() -> Self {
    Self { page: 1, per: 20 }
  }
}

/// Fetch status and contents of one list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListEntry {
  /// Ordered ids; `None` until the list is first requested or added to
  pub items: Option<Vec<String>>,
  pub is_fetching: bool,
  pub did_invalidate: bool,
  /// Time of the last successful fetch
  pub last_updated: Option<DateTime<Utc>>,
  /// Message from the most recent failed fetch
  pub error: Option<String>,
  pub filter: Option<Value>,
  pub pagination: Option<Pagination>,
}

impl ListEntry {
  pub fn ids(&self) -> &[String] {
    self.items.as_deref().unwrap_or_default()
  }
}

/// A node in the list tree. A node may hold a list and nested lists at once,
/// e.g. `["author"]` and `["author", "u1"]`.
#[derive(Debug, Clone, Default)]
pub struct ListNode {
  entry: Option<ListEntry>,
  children: BTreeMap<Segment, ListNode>,
}

impl ListNode {
  /// Walk the tree; any missing node on the way means "not found".
  pub fn find(&self, key: &ListKey) -> Option<&ListEntry> {
    let mut node = self;
    for part in key.segments() {
      node = node.children.get(part)?;
    }
    node.entry.as_ref()
  }

  pub fn find_mut(&mut self, key: &ListKey) -> Option<&mut ListEntry> {
    let mut node = self;
    for part in key.segments() {
      node = node.children.get_mut(part)?;
    }
    node.entry.as_mut()
  }

  /// Walk the tree, creating nodes and the entry on a miss.
  pub fn find_or_create(&mut self, key: &ListKey) -> &mut ListEntry {
    let mut node = self;
    for part in key.segments() {
      node = node.children.entry(part.clone()).or_default();
    }
    node.entry.get_or_insert_with(ListEntry::default)
  }

  /// Every list key that currently holds an entry, depth first.
  pub fn keys(&self) -> Vec<ListKey> {
    let mut out = Vec::new();
    self.collect_keys(&mut Vec::new(), &mut out);
    out
  }

  fn collect_keys(&self, path: &mut Vec<Segment>, out: &mut Vec<ListKey>) {
    if self.entry.is_some() && !path.is_empty() {
      out.push(ListKey::new(path.clone()));
    }
    for (part, child) in &self.children {
      path.push(part.clone());
      child.collect_keys(path, out);
      path.pop();
    }
  }

  /// Drop `id` from every list in the tree.
  pub fn remove_everywhere(&mut self, id: &str) {
    if let Some(items) = self.entry.as_mut().and_then(|e| e.items.as_mut()) {
      items.retain(|existing| existing != id);
    }
    for child in self.children.values_mut() {
      child.remove_everywhere(id);
    }
  }
}
