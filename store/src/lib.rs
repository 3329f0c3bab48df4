//! # Item Store
//!
//! Persistent tables for everything the assistant saves:
//!
//! - **outputs**: generated text (summaries, translations, drafts)
//! - **bookmarks**: saved pages, unique by URL
//! - **embeddings**: one vector per output or bookmark, keyed by the item id
//!
//! Each table is a JSON file under the data directory, rewritten through a
//! temporary file on every change. A [`Database`] opened without a
//! directory keeps everything in memory.

pub mod database;
pub mod error;
pub mod records;
pub mod table;

pub use database::Database;
pub use error::{Result, StoreError};
pub use records::{Bookmark, Output, OutputKind, Record, new_id};
pub use table::Table;
