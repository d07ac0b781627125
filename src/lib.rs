//! Client-side cache and fetch coordination for Yote REST resources.
//!
//! A [`cache::CacheContext`] holds the transport, clock and staleness window
//! for a session; each resource gets its own [`cache::ResourceCache`].

pub mod app;
pub mod cache;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod resources;
pub mod transport;

pub use cache::{
  CacheContext, CacheResult, CacheSource, ListKey, ResourceCache, ResourceDef, Segment,
};
pub use error::ResourceError;
