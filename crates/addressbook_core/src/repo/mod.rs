//! Contact store contracts, batch operations, and the SQLite store.
//!
//! # Responsibility
//! - Define the store boundary the facade talks to.
//! - Keep SQL and batch commit details out of the service layer.
//!
//! # Invariants
//! - Writes reach the store only as batches; each batch is atomic.
//! - Read paths return `None` for unknown keys instead of failing.

pub mod batch;
pub mod contact_store;
pub mod query;
mod schema;
