//! Database access layer
//!
//! Provides the Order Store and the item/category/series directory.

pub mod items;
pub mod orders;

pub use orders::{OrderStore, SqliteOrderStore};
