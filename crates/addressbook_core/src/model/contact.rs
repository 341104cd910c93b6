//! Contact domain model.
//!
//! # Responsibility
//! - Define the shared contact shape every native store maps into.
//! - Keep child collections ordered the way the native store enumerates them.
//!
//! # Invariants
//! - `id` is `None` until an insert has been committed by a store.
//! - Absent native fields are represented as empty strings, never as
//!   store-specific sentinels.
//! - A contact with `id == None` must never reach an update path, and a
//!   contact with `id == Some(..)` must never reach an insert path.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Opaque contact identifier as handed out by the active store mode.
///
/// Raw contact mode uses decimal row ids, aggregate mode uses lookup keys.
pub type ContactId = String;

/// Shared contact aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    /// Store-assigned identifier. `None` means "not yet persisted".
    pub id: Option<ContactId>,
    pub display_name: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub nickname: String,
    pub prefix: String,
    pub suffix: String,
    pub addresses: Vec<Address>,
    pub phones: Vec<Phone>,
    pub emails: Vec<Email>,
    pub websites: Vec<Website>,
    pub organizations: Vec<Organization>,
    pub notes: Vec<Note>,
    pub relationships: Vec<Relationship>,
}

impl Contact {
    /// Creates an empty, not yet persisted contact.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a store has assigned an identifier.
    pub fn is_persisted(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.trim().is_empty())
    }

    /// Number of child records across every collection.
    pub fn child_count(&self) -> usize {
        self.addresses.len()
            + self.phones.len()
            + self.emails.len()
            + self.websites.len()
            + self.organizations.len()
            + self.notes.len()
            + self.relationships.len()
    }
}

/// Postal address with a free-text label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub label: String,
    pub street_address: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Phone {
    pub label: String,
    pub number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Email {
    pub label: String,
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Website {
    pub label: String,
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Organization {
    pub label: String,
    pub name: String,
    /// Job title held at this organization.
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Note {
    pub contents: String,
}

/// Kind of a related person.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    SignificantOther,
    Child,
    #[default]
    Other,
}

impl RelationshipType {
    /// Stable label used by native stores that keep relation kinds as text.
    pub fn as_label(self) -> &'static str {
        match self {
            Self::SignificantOther => "SignificantOther",
            Self::Child => "Child",
            Self::Other => "Other",
        }
    }

    /// Parses a native label, falling back to `Other` for anything unknown.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "significantother" | "significant_other" | "spouse" | "partner" => {
                Self::SignificantOther
            }
            "child" => Self::Child,
            _ => Self::Other,
        }
    }
}

impl Display for RelationshipType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Relationship {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: RelationshipType,
}
