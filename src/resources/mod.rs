//! Built-in resource types mirroring the default Yote server models.

mod bakery;
mod shirt;

pub use bakery::Bakery;
pub use shirt::{Shirt, ShirtSize};

use crate::cache::ResourceDef;

/// Wire name of the id field on every built-in resource
pub const ID_FIELD: &str = "_id";

/// `/api/shirts`, entities under `shirt` / `shirts`.
pub fn shirts() -> ResourceDef<Shirt> {
  ResourceDef::new("shirt", "shirts", |shirt: &Shirt| shirt.id.clone())
    .with_required(["name"])
    .with_default_item(Shirt::default())
}

/// `/api/bakeries`, entities under `bakery` / `bakeries`.
pub fn bakeries() -> ResourceDef<Bakery> {
  ResourceDef::new("bakery", "bakeries", |bakery: &Bakery| bakery.id.clone())
    .with_required(["name"])
    .with_default_item(Bakery::default())
}
