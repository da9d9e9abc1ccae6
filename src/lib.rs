// todostore - Ordered task list with write-through key-value persistence

pub mod config;
pub mod filter;
pub mod kv;
pub mod models;
pub mod sqlite;
pub mod store;
pub mod theme;

// Re-export main types for convenience
pub use config::{Backend, Config};
pub use filter::Filter;
pub use kv::{FileKv, KeyValueStore, MemoryKv};
pub use models::{Task, TaskId, now_ms};
pub use sqlite::SqliteKv;
pub use store::{Counts, Key, Snapshot, TASKS_KEY, TodoStore};
pub use theme::{THEME_KEY, Theme};
