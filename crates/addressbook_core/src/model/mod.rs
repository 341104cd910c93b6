//! Shared contact model.
//!
//! # Responsibility
//! - Define the store-agnostic contact shape returned to every caller.
//!
//! # Invariants
//! - Entities carry no native store types or sentinels.

pub mod contact;
