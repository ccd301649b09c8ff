//! Persistence for index definitions, instances and document memberships.
//!
//! The engine only talks to [`IndexStore`]; [`SqliteIndexStore`] is the
//! bundled backend.

mod sqlite;
mod traits;

pub use sqlite::SqliteIndexStore;
pub use traits::{DetachOutcome, IndexStore};
