//! Address book facade.
//!
//! # Responsibility
//! - Single entry point for permission, enumerate, load, and save.
//! - Route saves to the insert or update batch path by contact identity.
//!
//! # Invariants
//! - Every read and write checks store authorization first.
//! - Store failures are returned as `StorageFailure`, never swallowed.
//! - Update is only attempted when the store advertises it; otherwise the
//!   call fails with `NotImplemented`.
//! - Enumeration snapshots matching keys up front and loads each contact
//!   lazily; a new call starts a fresh enumeration.

use crate::access::PermissionRequest;
use crate::mapper::rows::to_contact;
use crate::model::contact::Contact;
use crate::native::row::{ContactKey, RawContactId};
use crate::repo::batch::{build_insert_batch, build_update_batch, BatchError, OperationResult};
use crate::repo::contact_store::{AggregationMode, ContactStore, StoreError};
use crate::repo::query::ContactQuery;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type AddressBookResult<T> = Result<T, AddressBookError>;

/// Facade error taxonomy.
#[derive(Debug)]
pub enum AddressBookError {
    /// Caller passed a malformed identifier.
    InvalidArgument(String),
    /// Store access has not been granted.
    PermissionDenied,
    /// Contact identity does not fit the requested operation.
    InvalidState(String),
    /// Capability not offered by the active store.
    NotImplemented(&'static str),
    /// The store rejected or failed the operation; nothing was written.
    StorageFailure(StoreError),
    /// Write succeeded but the read-back disagrees.
    InconsistentState(&'static str),
}

impl Display for AddressBookError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::PermissionDenied => write!(f, "address book access has not been granted"),
            Self::InvalidState(message) => write!(f, "invalid state: {message}"),
            Self::NotImplemented(what) => write!(f, "not implemented: {what}"),
            Self::StorageFailure(err) => write!(f, "storage failure: {err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent state: {details}"),
        }
    }
}

impl Error for AddressBookError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageFailure(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for AddressBookError {
    fn from(value: StoreError) -> Self {
        Self::StorageFailure(value)
    }
}

impl From<BatchError> for AddressBookError {
    fn from(value: BatchError) -> Self {
        match value {
            BatchError::InvalidState(message) => Self::InvalidState(message),
        }
    }
}

/// Facade over one contact store.
pub struct AddressBook<S: ContactStore> {
    store: S,
    prefer_aggregation: bool,
}

impl<S: ContactStore> AddressBook<S> {
    /// Wraps a store. Aggregation is preferred whenever the store offers it.
    pub fn new(store: S) -> Self {
        let prefer_aggregation = store.capabilities().aggregation;
        Self {
            store,
            prefer_aggregation,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_read_only(&self) -> bool {
        !self.store.capabilities().update
    }

    pub fn single_contacts_supported(&self) -> bool {
        true
    }

    pub fn aggregate_contacts_supported(&self) -> bool {
        self.store.capabilities().aggregation
    }

    pub fn load_supported(&self) -> bool {
        true
    }

    /// Whether ids are aggregate lookup keys (`true`) or raw contact ids.
    pub fn prefer_contact_aggregation(&self) -> bool {
        self.prefer_aggregation
    }

    /// Ignored (stays `false`) when the store cannot aggregate.
    pub fn set_prefer_contact_aggregation(&mut self, prefer: bool) {
        self.prefer_aggregation = prefer && self.aggregate_contacts_supported();
    }

    /// Asks for store access.
    ///
    /// Completes immediately when the answer is already known; otherwise
    /// completes when the host prompt answers, from any thread.
    pub fn request_permission(&self) -> PermissionRequest {
        self.store.access().request()
    }

    /// Enumerates every contact visible to the current grant.
    pub fn contacts(&self) -> AddressBookResult<Contacts<'_, S>> {
        self.query(&ContactQuery::default())
    }

    /// Enumerates contacts matching `query`.
    pub fn query(&self, query: &ContactQuery) -> AddressBookResult<Contacts<'_, S>> {
        self.ensure_authorized()?;
        let keys = self.store.list_keys(self.mode(), query)?;
        Ok(Contacts {
            store: &self.store,
            keys: keys.into_iter(),
        })
    }

    /// Loads one contact by id.
    ///
    /// # Errors
    /// - `InvalidArgument` for blank ids, or non-numeric ids in raw mode.
    /// - `PermissionDenied` when access has not been granted.
    pub fn load(&self, id: &str) -> AddressBookResult<Option<Contact>> {
        let key = self.parse_key(id)?;
        self.ensure_authorized()?;

        let contact = self
            .store
            .load_record(&key)?
            .map(|record| to_contact(&record));
        info!(
            "event=contact_load module=service status=ok key={} found={}",
            key,
            contact.is_some()
        );
        Ok(contact)
    }

    /// Inserts a new contact or rewrites an existing one.
    ///
    /// Returns the stored contact as read back from the store. A blank id is
    /// treated as "not yet persisted".
    pub fn save(&self, mut contact: Contact) -> AddressBookResult<Contact> {
        self.ensure_authorized()?;

        if contact.is_persisted() {
            self.save_existing(contact)
        } else {
            contact.id = None;
            self.save_new(contact)
        }
    }

    fn save_new(&self, contact: Contact) -> AddressBookResult<Contact> {
        let operations = build_insert_batch(&contact)?;
        let results = self.store.apply_batch(&operations)?;

        let raw_contact_id = match results.first() {
            Some(OperationResult::RawContact(id)) => *id,
            _ => {
                return Err(AddressBookError::InconsistentState(
                    "insert batch did not create a raw contact",
                ))
            }
        };
        let saved = self.read_back_raw(raw_contact_id)?;
        info!(
            "event=contact_save module=service status=ok path=insert operations={}",
            operations.len()
        );
        Ok(saved)
    }

    fn save_existing(&self, contact: Contact) -> AddressBookResult<Contact> {
        if !self.store.capabilities().update {
            warn!(
                "event=contact_save module=service status=error path=update error_code=update_unsupported"
            );
            return Err(AddressBookError::NotImplemented("contact update"));
        }

        let id = contact.id.as_deref().unwrap_or_default();
        let key = self.parse_key(id)?;
        let Some(record) = self.store.load_record(&key)? else {
            return Err(AddressBookError::InvalidState(format!(
                "contact `{}` does not exist",
                id.trim()
            )));
        };

        let operations = build_update_batch(&contact, &record.raw_contact_ids)?;
        self.store.apply_batch(&operations)?;

        let saved = self
            .store
            .load_record(&key)?
            .map(|record| to_contact(&record))
            .ok_or(AddressBookError::InconsistentState(
                "updated contact not found in read-back",
            ))?;
        info!(
            "event=contact_save module=service status=ok path=update operations={}",
            operations.len()
        );
        Ok(saved)
    }

    fn read_back_raw(&self, raw_contact_id: RawContactId) -> AddressBookResult<Contact> {
        let key = self
            .store
            .key_for_raw_contact(raw_contact_id, self.mode())?
            .ok_or(AddressBookError::InconsistentState(
                "inserted contact has no key in read-back",
            ))?;
        self.store
            .load_record(&key)?
            .map(|record| to_contact(&record))
            .ok_or(AddressBookError::InconsistentState(
                "inserted contact not found in read-back",
            ))
    }

    fn mode(&self) -> AggregationMode {
        if self.prefer_aggregation {
            AggregationMode::Aggregated
        } else {
            AggregationMode::RawContacts
        }
    }

    fn ensure_authorized(&self) -> AddressBookResult<()> {
        if self.store.access().is_authorized() {
            Ok(())
        } else {
            Err(AddressBookError::PermissionDenied)
        }
    }

    fn parse_key(&self, id: &str) -> AddressBookResult<ContactKey> {
        let id = id.trim();
        if id.is_empty() {
            return Err(AddressBookError::InvalidArgument(
                "contact id must not be empty".to_string(),
            ));
        }

        match self.mode() {
            AggregationMode::Aggregated => Ok(ContactKey::Aggregate(id.to_string())),
            AggregationMode::RawContacts => id.parse().map(ContactKey::Raw).map_err(|_| {
                AddressBookError::InvalidArgument(format!("not a valid contact id: `{id}`"))
            }),
        }
    }
}

/// Lazy, one-shot contact enumeration.
///
/// Contacts removed after the enumeration started are skipped.
pub struct Contacts<'a, S: ContactStore> {
    store: &'a S,
    keys: std::vec::IntoIter<ContactKey>,
}

impl<S: ContactStore> Iterator for Contacts<'_, S> {
    type Item = AddressBookResult<Contact>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let key = self.keys.next()?;
            match self.store.load_record(&key) {
                Ok(Some(record)) => return Some(Ok(to_contact(&record))),
                Ok(None) => continue,
                Err(err) => return Some(Err(err.into())),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.keys.len()))
    }
}
