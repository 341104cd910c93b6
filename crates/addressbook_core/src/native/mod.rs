//! Native contact record shapes.
//!
//! # Responsibility
//! - Describe the records a platform contact store hands out, before any
//!   mapping into the shared `Contact` model.
//!
//! # Invariants
//! - Native shapes may carry absent values and label sentinels; only the
//!   mapper layer is allowed to interpret them.

pub mod person;
pub mod row;
