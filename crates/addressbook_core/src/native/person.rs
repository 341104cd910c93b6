//! Keyed-person native contact shape.
//!
//! Mirrors address books that keep one person object with scalar name
//! properties, single organization/note properties, and labelled
//! multi-value lists. Addresses are string dictionaries.

use std::collections::BTreeMap;

pub const ADDRESS_KEY_STREET: &str = "Street";
pub const ADDRESS_KEY_CITY: &str = "City";
pub const ADDRESS_KEY_STATE: &str = "State";
pub const ADDRESS_KEY_ZIP: &str = "ZIP";
pub const ADDRESS_KEY_COUNTRY: &str = "Country";

/// One labelled entry of a multi-value property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledValue<T> {
    /// Native label. Predefined labels arrive wrapped (`_$!<Home>!$_`).
    pub label: Option<String>,
    pub value: T,
}

impl<T> LabeledValue<T> {
    pub fn new(label: Option<&str>, value: T) -> Self {
        Self {
            label: label.map(str::to_string),
            value,
        }
    }
}

pub type MultiValue<T> = Vec<LabeledValue<T>>;

/// Address dictionary keyed by the `ADDRESS_KEY_*` constants.
pub type AddressDictionary = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonRecord {
    /// Native row id; `None` until the person has been added to a book.
    pub record_id: Option<i32>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    /// Only one organization is representable.
    pub organization: Option<String>,
    pub job_title: Option<String>,
    /// Only one free-text note is representable.
    pub note: Option<String>,
    pub addresses: MultiValue<AddressDictionary>,
    pub phones: MultiValue<String>,
    pub emails: MultiValue<String>,
    pub urls: MultiValue<String>,
    pub related_names: MultiValue<String>,
}
