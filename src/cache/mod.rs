//! Generic normalized cache for REST resources.
//!
//! One engine serves every resource type:
//! - Entities are stored once, by id
//! - Lists are ordered ids addressed by a nested [`ListKey`]
//! - A selected slot tracks the last single-entity request
//! - Freshness checks decide whether a request is needed and de-duplicate
//!   requests already in flight

mod address;
mod clock;
mod freshness;
mod layer;
mod list;
mod resource;
mod store;
mod traits;

pub use address::list_address;
pub use clock::{Clock, ManualClock, SystemClock};
pub use freshness::{should_fetch_list, should_fetch_single, Decision};
pub use layer::{CacheContext, ResourceCache};
pub use list::{ListEntry, ListKey, ListNode, Pagination, Segment};
pub use resource::{Record, ResourceDef};
pub use store::{ResourceStore, SelectedSlot, WriteTicket};
pub use traits::{CacheResult, CacheSource};
