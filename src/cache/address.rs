//! Maps list keys onto backend routes.
//!
//! | key                      | route                                 |
//! |--------------------------|---------------------------------------|
//! | `["all"]`                | `/api/<plural>`                       |
//! | `[k]`                    | `/api/<plural>/by-k`                  |
//! | `[k, [a, b]]`            | `/api/<plural>/by-k-list?k=a&k=b`     |
//! | `[k, v]`                 | `/api/<plural>/by-k/v`                |
//! | `[k, v, k2, v2, ...]`    | `/api/<plural>/by-k/v/k2/v2/...`      |

use super::list::{ListKey, Segment};
use super::resource::{Record, ResourceDef};
use crate::error::ResourceError;
use crate::transport::ApiAddress;

pub fn list_address<T: Record>(
  def: &ResourceDef<T>,
  key: &ListKey,
) -> Result<ApiAddress, ResourceError> {
  let base = def.collection_address();
  let segments = key.segments();

  if key.is_all() {
    return Ok(base);
  }

  for segment in segments {
    match segment {
      Segment::Scalar(s) if s.is_empty() => {
        return Err(invalid(key, "empty segment"));
      }
      Segment::Seq(items) if items.is_empty() => {
        return Err(invalid(key, "empty sequence"));
      }
      _ => {}
    }
  }

  let head = segments[0]
    .as_scalar()
    .ok_or_else(|| invalid(key, "first segment must be a scalar"))?;

  match segments {
    [_] => Ok(base.push(format!("by-{}", head))),
    [_, Segment::Seq(values)] => Ok(
      values
        .iter()
        .fold(base.push(format!("by-{}-list", head)), |address, value| {
          address.query_pair(head, value.as_str())
        }),
    ),
    [_, Segment::Scalar(value)] => Ok(base.push(format!("by-{}", head)).push(value.as_str())),
    _ => {
      // The backend reads trailing segments as key/value pairs
      if segments.len() % 2 != 0 {
        return Err(invalid(key, "extra segments must come in key/value pairs"));
      }

      let mut address = base.push(format!("by-{}", head));
      for segment in &segments[1..] {
        let value = segment
          .as_scalar()
          .ok_or_else(|| invalid(key, "sequences are only allowed as the second of two segments"))?;
        address = address.push(value);
      }
      Ok(address)
    }
  }
}

fn invalid(key: &ListKey, reason: &str) -> ResourceError {
  ResourceError::InvalidListKey(format!("{}: {}", key, reason))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::Value;

  fn shirts() -> ResourceDef<Value> {
    ResourceDef::json("shirt", "shirts", "_id")
  }

  fn address(key: impl Into<ListKey>) -> Result<String, ResourceError> {
    list_address(&shirts(), &key.into()).map(|a| a.to_string())
  }

  #[test]
  fn test_all_is_base_collection() {
    assert_eq!(address(()).unwrap(), "/api/shirts");
    assert_eq!(address("all").unwrap(), "/api/shirts");
  }

  #[test]
  fn test_single_segment() {
    assert_eq!(address("featured").unwrap(), "/api/shirts/by-featured");
  }

  #[test]
  fn test_key_value() {
    assert_eq!(
      address(["author", "u1"]).unwrap(),
      "/api/shirts/by-author/u1"
    );
    // "all" only collapses when alone
    assert_eq!(address(["all", "x"]).unwrap(), "/api/shirts/by-all/x");
  }

  #[test]
  fn test_sequence_value_builds_query() {
    let key = ListKey::from([Segment::from("tag"), Segment::from(["a", "b"])]);
    assert_eq!(address(key).unwrap(), "/api/shirts/by-tag-list?tag=a&tag=b");
  }

  #[test]
  fn test_extra_segments_append_path() {
    assert_eq!(
      address(["author", "u1", "color", "red"]).unwrap(),
      "/api/shirts/by-author/u1/color/red"
    );
  }

  #[test]
  fn test_invalid_keys() {
    assert!(matches!(
      address(["author", "u1", "color"]),
      Err(ResourceError::InvalidListKey(_))
    ));
    assert!(matches!(
      address(ListKey::from([Segment::from(["a"]), Segment::from("x")])),
      Err(ResourceError::InvalidListKey(_))
    ));
    assert!(matches!(
      address(ListKey::from([Segment::from("tag"), Segment::Seq(vec![])])),
      Err(ResourceError::InvalidListKey(_))
    ));
    assert!(matches!(
      address(ListKey::from([
        Segment::from("tag"),
        Segment::from("x"),
        Segment::from("color"),
        Segment::from(["red", "blue"]),
      ])),
      Err(ResourceError::InvalidListKey(_))
    ));
    assert!(matches!(address(""), Err(ResourceError::InvalidListKey(_))));
  }
}
