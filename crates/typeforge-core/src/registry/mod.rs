//! Durable catalog and the registry service in front of it.

mod catalog;
pub mod prelude;
mod service;

pub use catalog::{
    CatalogStore, INDEX_FILE, IndexEntry, PRELUDE_FILE, TypeDefinition, render_index,
};
pub use service::{Activation, PublishReceipt, Reservation, TypeRegistry};
