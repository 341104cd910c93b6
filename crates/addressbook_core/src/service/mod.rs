//! Use-case services over contact stores.
//!
//! # Responsibility
//! - Orchestrate permission, mapping, and batch calls into caller-level APIs.
//! - Keep FFI and CLI layers decoupled from store details.

pub mod address_book;
