//! Batch operations for transactional multi-row contact writes.
//!
//! # Responsibility
//! - Describe contact writes as an ordered list of store operations.
//! - Build insert batches whose child rows reference their parent by
//!   position, before the parent row id exists.
//!
//! # Invariants
//! - An insert batch starts with exactly one `InsertRawContact` at position 0.
//! - Every child of an insert batch uses `RawContactRef::BackReference(0)`;
//!   no resolved id appears before commit.
//! - Back references may only point at an earlier `InsertRawContact`.

use crate::mapper::rows::from_contact;
use crate::model::contact::Contact;
use crate::native::row::{DataRow, RawContactId};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Reference from a child operation to its raw contact row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawContactRef {
    /// Result of the operation at this position in the same batch.
    BackReference(usize),
    /// Already committed raw contact.
    Existing(RawContactId),
}

/// One atomic write intent inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Creates a parent row. Account fields stay `None` for local contacts.
    InsertRawContact {
        account_type: Option<String>,
        account_name: Option<String>,
    },
    /// Creates one data row under a raw contact.
    InsertData {
        raw_contact: RawContactRef,
        row: DataRow,
    },
    /// Removes every data row of a raw contact.
    DeleteData { raw_contact: RawContactRef },
}

impl BatchOperation {
    pub fn raw_contact_ref(&self) -> Option<RawContactRef> {
        match self {
            Self::InsertRawContact { .. } => None,
            Self::InsertData { raw_contact, .. } | Self::DeleteData { raw_contact } => {
                Some(*raw_contact)
            }
        }
    }
}

/// Per-operation outcome returned by a committed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    RawContact(RawContactId),
    Data(i64),
    Deleted(usize),
}

pub type BatchResult<T> = Result<T, BatchError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// Contact identity does not match the requested write path.
    InvalidState(String),
}

impl Display for BatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidState(message) => write!(f, "invalid contact state: {message}"),
        }
    }
}

impl Error for BatchError {}

/// Builds the insert batch for a contact that has never been persisted.
///
/// # Errors
/// - `InvalidState` when `contact.id` is already set.
pub fn build_insert_batch(contact: &Contact) -> BatchResult<Vec<BatchOperation>> {
    if contact.id.is_some() {
        return Err(BatchError::InvalidState(
            "insert requires a contact without id".to_string(),
        ));
    }

    let rows = from_contact(contact);
    let mut operations = Vec::with_capacity(1 + rows.len());
    operations.push(BatchOperation::InsertRawContact {
        account_type: None,
        account_name: None,
    });
    operations.extend(rows.into_iter().map(|row| BatchOperation::InsertData {
        raw_contact: RawContactRef::BackReference(0),
        row,
    }));

    Ok(operations)
}

/// Builds the replace-all batch for an existing contact.
///
/// Data rows of every member raw contact are deleted, then the contact's rows
/// are written under the first member.
///
/// # Errors
/// - `InvalidState` when `contact.id` is absent or no member raw contacts are
///   given.
pub fn build_update_batch(
    contact: &Contact,
    raw_contact_ids: &[RawContactId],
) -> BatchResult<Vec<BatchOperation>> {
    if !contact.is_persisted() {
        return Err(BatchError::InvalidState(
            "update requires a contact with id".to_string(),
        ));
    }
    let Some(&target) = raw_contact_ids.first() else {
        return Err(BatchError::InvalidState(
            "update requires at least one existing raw contact".to_string(),
        ));
    };

    let rows = from_contact(contact);
    let mut operations = Vec::with_capacity(raw_contact_ids.len() + rows.len());
    operations.extend(raw_contact_ids.iter().map(|id| BatchOperation::DeleteData {
        raw_contact: RawContactRef::Existing(*id),
    }));
    operations.extend(rows.into_iter().map(|row| BatchOperation::InsertData {
        raw_contact: RawContactRef::Existing(target),
        row,
    }));

    Ok(operations)
}

#[cfg(test)]
mod tests {
    use super::{
        build_insert_batch, build_update_batch, BatchError, BatchOperation, RawContactRef,
    };
    use crate::model::contact::{Contact, Email, Phone};

    #[test]
    fn insert_batch_rejects_identified_contact() {
        let contact = Contact {
            id: Some("12".to_string()),
            ..Contact::default()
        };
        let err = build_insert_batch(&contact).unwrap_err();
        assert!(matches!(err, BatchError::InvalidState(_)));
    }

    #[test]
    fn empty_contact_gets_parent_and_name_row() {
        let batch = build_insert_batch(&Contact::new()).unwrap();
        assert_eq!(batch.len(), 2);
        assert!(matches!(batch[0], BatchOperation::InsertRawContact { .. }));
        assert_eq!(
            batch[1].raw_contact_ref(),
            Some(RawContactRef::BackReference(0))
        );
    }

    #[test]
    fn update_batch_deletes_members_then_writes_into_first() {
        let mut contact = Contact {
            id: Some("4".to_string()),
            ..Contact::default()
        };
        contact.phones.push(Phone::default());
        contact.emails.push(Email::default());

        let batch = build_update_batch(&contact, &[4, 9]).unwrap();
        assert_eq!(batch.len(), 2 + 3);
        assert_eq!(
            batch[0],
            BatchOperation::DeleteData {
                raw_contact: RawContactRef::Existing(4)
            }
        );
        assert_eq!(
            batch[1],
            BatchOperation::DeleteData {
                raw_contact: RawContactRef::Existing(9)
            }
        );
        assert!(batch[2..]
            .iter()
            .all(|op| op.raw_contact_ref() == Some(RawContactRef::Existing(4))));
    }

    #[test]
    fn update_batch_requires_identity_and_members() {
        let unsaved = Contact::new();
        assert!(build_update_batch(&unsaved, &[1]).is_err());

        let saved = Contact {
            id: Some("1".to_string()),
            ..Contact::default()
        };
        assert!(build_update_batch(&saved, &[]).is_err());
    }
}
