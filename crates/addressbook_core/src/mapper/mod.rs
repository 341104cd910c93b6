//! Contact mappers between native shapes and the shared model.
//!
//! # Responsibility
//! - Translate one native record into a `Contact` and back.
//! - Hide label sentinels and absent values from callers.
//!
//! # Invariants
//! - Mapping a native record never fails; malformed parts are skipped.
//! - Child order follows native enumeration order.

pub mod person;
pub mod rows;
