//! # Medialog Priority List (medialog-pl)
//!
//! Ordering engine for the medialog priority list.
//!
//! **Purpose:** Keep a user-curated order of tracked items per scope (global
//! and per category), group series members into draggable blocks, resolve
//! drag gestures into new orders, and persist those orders.
//!
//! **Architecture:** Pure transforms in [`order`], storage behind the
//! [`db::OrderStore`] trait, a single-flight [`sync::SyncQueue`] per scope,
//! and the [`board::PriorityBoard`] view model tying them together.

pub mod board;
pub mod config;
pub mod db;
pub mod error;
pub mod order;
pub mod sync;

pub use board::PriorityBoard;
pub use error::{Error, Result};
pub use sync::{sync_scope, SyncOutcome, SyncQueue, SyncTicket};
