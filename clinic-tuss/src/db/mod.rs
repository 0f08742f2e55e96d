//! Database access for clinic-tuss
//!
//! Free functions over a `SqlitePool` per table, plus the `TussStore`
//! service trait the import pipeline is written against.

pub mod codes;
pub mod imports;
pub mod store;

pub use codes::{CodeSearch, TableCount};
pub use store::{SqliteTussStore, TussStore};
