//! Core domain logic for the cross-platform address book.
//! This crate is the single source of truth for contact mapping and
//! contact store invariants.

pub mod access;
pub mod db;
pub mod logging;
pub mod mapper;
pub mod model;
pub mod native;
pub mod repo;
pub mod service;

pub use access::{
    AccessController, AccessPrompt, AccessReply, AlreadyResolved, AuthorizationStatus, AutoGrant,
    Completion, PermissionRequest,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::contact::{
    Address, Contact, ContactId, Email, Note, Organization, Phone, Relationship,
    RelationshipType, Website,
};
pub use repo::batch::{BatchError, BatchOperation, OperationResult, RawContactRef};
pub use repo::contact_store::{
    AggregationMode, ContactStore, SqliteContactStore, StoreCapabilities, StoreError,
    StoreResult,
};
pub use repo::query::ContactQuery;
pub use service::address_book::{AddressBook, AddressBookError, AddressBookResult, Contacts};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
