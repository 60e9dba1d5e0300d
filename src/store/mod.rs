//! Storage layer for remindr.
//!
//! Repository traits plus a SQLite implementation holding users and tasks.
//!
//! # Example
//!
//! ```ignore
//! use remindr::store::{TaskRepository, TaskStore};
//!
//! let store = TaskStore::open(Path::new("/var/lib/remindr/remindr.db"))?;
//! let due = store.list_due_candidates(today)?;
//! ```

mod task_store;
mod traits;

pub use task_store::TaskStore;
pub use traits::{TaskRepository, UserRepository};
