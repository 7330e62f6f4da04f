//! Document storage.
//!
//! Three collections back the coach: `interviews`, `userAnswers` and `users`.
//! They are reached through the [`DocumentStore`] trait:
//! - **MemoryStore**: in-process, used by tests and throwaway sessions
//! - **SqliteStore**: a single SQLite file through `sqlx`
//!
//! Interview writes push fresh snapshots to live [`Subscription`]s, and
//! one-shot reads can be wrapped in a [`ScopedFetch`] so they are cancelled
//! together with the view that started them.
//!
//! # Usage
//!
//! ```rust,ignore
//! use interview_coach::storage::{DocumentStore, SqliteStore};
//!
//! let store = SqliteStore::open("sqlite://interview_coach.db").await?;
//! let mut sub = store.subscribe_interviews("user-1").await?;
//! let first = sub.next().await; // current snapshot, delivered immediately
//! ```

pub mod fetch;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod store;
pub mod subscription;

pub use fetch::ScopedFetch;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::{DocumentStore, StoreResult};
pub use subscription::{Snapshot, Subscription, SubscriptionHub};
