//! Row-based native contact shape.
//!
//! Mirrors a multi-row contacts provider: one parent row per raw contact and
//! any number of mimetype-tagged data rows hanging off it. Payload lives in
//! generic `data` columns whose meaning depends on the mimetype.
//!
//! # Invariants
//! - `data_type == Some(TYPE_CUSTOM)` means the free-text `data_label` is the
//!   label; other codes resolve to a predefined label.
//! - Column indexes outside `0..DATA_COLUMNS` read as empty.

use std::fmt::{Display, Formatter};

/// Row id of one raw contact (parent row).
pub type RawContactId = i64;

/// Number of generic payload columns carried by one data row.
pub const DATA_COLUMNS: usize = 7;

pub const MIMETYPE_NAME: &str = "vnd.addressbook.item/name";
pub const MIMETYPE_POSTAL: &str = "vnd.addressbook.item/postal-address";
pub const MIMETYPE_PHONE: &str = "vnd.addressbook.item/phone";
pub const MIMETYPE_EMAIL: &str = "vnd.addressbook.item/email";
pub const MIMETYPE_WEBSITE: &str = "vnd.addressbook.item/website";
pub const MIMETYPE_ORGANIZATION: &str = "vnd.addressbook.item/organization";
pub const MIMETYPE_NOTE: &str = "vnd.addressbook.item/note";
pub const MIMETYPE_RELATION: &str = "vnd.addressbook.item/relation";

/// Label is stored verbatim in `data_label`.
pub const TYPE_CUSTOM: i64 = 0;
pub const TYPE_HOME: i64 = 1;
pub const TYPE_WORK: i64 = 2;
pub const TYPE_OTHER: i64 = 3;
pub const TYPE_MOBILE: i64 = 4;
pub const TYPE_FAX_WORK: i64 = 5;
pub const TYPE_FAX_HOME: i64 = 6;
pub const TYPE_PAGER: i64 = 7;
pub const TYPE_MAIN: i64 = 8;

/// Label used when a row carries neither a known type nor a custom label.
pub const FALLBACK_LABEL: &str = "Other";

/// Returns the stable label for a predefined type code.
pub fn predefined_label(code: i64) -> Option<&'static str> {
    match code {
        TYPE_HOME => Some("Home"),
        TYPE_WORK => Some("Work"),
        TYPE_OTHER => Some("Other"),
        TYPE_MOBILE => Some("Mobile"),
        TYPE_FAX_WORK => Some("Work Fax"),
        TYPE_FAX_HOME => Some("Home Fax"),
        TYPE_PAGER => Some("Pager"),
        TYPE_MAIN => Some("Main"),
        _ => None,
    }
}

/// One mimetype-tagged child row of a raw contact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataRow {
    /// Kind tag. `None` marks a malformed row.
    pub mimetype: Option<String>,
    pub data: [Option<String>; DATA_COLUMNS],
    pub data_type: Option<i64>,
    pub data_label: Option<String>,
}

impl DataRow {
    pub fn new(mimetype: &str) -> Self {
        Self {
            mimetype: Some(mimetype.to_string()),
            ..Self::default()
        }
    }

    /// Sets one payload column. Empty values are stored as absent.
    pub fn with_data(mut self, column: usize, value: &str) -> Self {
        if let Some(slot) = self.data.get_mut(column) {
            *slot = (!value.is_empty()).then(|| value.to_string());
        }
        self
    }

    /// Marks the row as custom-typed and stores `label` verbatim.
    pub fn with_custom_label(mut self, label: &str) -> Self {
        self.data_type = Some(TYPE_CUSTOM);
        self.data_label = (!label.is_empty()).then(|| label.to_string());
        self
    }

    pub fn with_type(mut self, code: i64) -> Self {
        self.data_type = Some(code);
        self
    }

    pub fn mimetype(&self) -> Option<&str> {
        self.mimetype.as_deref()
    }

    /// Reads one payload column, empty when absent.
    pub fn data(&self, column: usize) -> &str {
        self.data
            .get(column)
            .and_then(|value| value.as_deref())
            .unwrap_or("")
    }

    /// Resolves the display label of this row.
    pub fn label(&self) -> String {
        let custom = self.data_label.as_deref().filter(|label| !label.is_empty());
        match self.data_type {
            Some(TYPE_CUSTOM) | None => custom.unwrap_or(FALLBACK_LABEL).to_string(),
            Some(code) => predefined_label(code)
                .or(custom)
                .unwrap_or(FALLBACK_LABEL)
                .to_string(),
        }
    }
}

/// Identity of a contact as seen by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContactKey {
    /// A single raw contact row.
    Raw(RawContactId),
    /// An aggregate contact, addressed by its lookup key.
    Aggregate(String),
}

impl ContactKey {
    /// Opaque id string handed to callers.
    pub fn to_contact_id(&self) -> String {
        match self {
            Self::Raw(id) => id.to_string(),
            Self::Aggregate(lookup_key) => lookup_key.clone(),
        }
    }
}

impl Display for ContactKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raw(id) => write!(f, "raw:{id}"),
            Self::Aggregate(lookup_key) => write!(f, "aggregate:{lookup_key}"),
        }
    }
}

/// Native record for one contact: its key, member raw contacts, and rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawContactRecord {
    pub key: ContactKey,
    /// Member raw contacts in ascending id order.
    pub raw_contact_ids: Vec<RawContactId>,
    /// Data rows in native enumeration order.
    pub rows: Vec<DataRow>,
}
