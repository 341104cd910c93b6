use addressbook_core::native::row::{MIMETYPE_NAME, MIMETYPE_NOTE, MIMETYPE_RELATION};
use addressbook_core::repo::batch::build_insert_batch;
use addressbook_core::{
    Address, BatchError, BatchOperation, Contact, Email, Note, Organization, Phone,
    RawContactRef, Relationship, RelationshipType, Website,
};

fn contact_with_children() -> Contact {
    let mut contact = Contact::new();
    contact.first_name = "Katherine".to_string();
    contact.last_name = "Johnson".to_string();
    contact.addresses.push(Address {
        label: "Home".to_string(),
        city: "Hampton".to_string(),
        ..Address::default()
    });
    contact.phones.push(Phone {
        label: "Mobile".to_string(),
        number: "555-0101".to_string(),
    });
    contact.phones.push(Phone {
        label: "Work".to_string(),
        number: "555-0102".to_string(),
    });
    contact.emails.push(Email {
        label: "Work".to_string(),
        address: "kj@nasa.example".to_string(),
    });
    contact.websites.push(Website {
        label: "Profile".to_string(),
        address: "https://nasa.example/kj".to_string(),
    });
    contact.organizations.push(Organization {
        label: "Work".to_string(),
        name: "NACA".to_string(),
        title: "Computer".to_string(),
    });
    contact.notes.push(Note {
        contents: "orbital mechanics".to_string(),
    });
    contact.relationships.push(Relationship {
        name: "James".to_string(),
        kind: RelationshipType::SignificantOther,
    });
    contact
}

#[test]
fn insert_batch_size_is_parent_plus_name_plus_children() {
    let contact = contact_with_children();
    let batch = build_insert_batch(&contact).unwrap();

    assert_eq!(batch.len(), 1 + 1 + 1 + 2 + 1 + 1 + 1 + 1 + 1);
    assert_eq!(batch.len(), 2 + contact.child_count());
}

#[test]
fn insert_batch_starts_with_parent_and_back_references_it() {
    let batch = build_insert_batch(&contact_with_children()).unwrap();

    assert_eq!(
        batch[0],
        BatchOperation::InsertRawContact {
            account_type: None,
            account_name: None,
        }
    );
    for operation in &batch[1..] {
        assert!(matches!(
            operation,
            BatchOperation::InsertData {
                raw_contact: RawContactRef::BackReference(0),
                ..
            }
        ));
    }
}

#[test]
fn insert_batch_writes_name_first_and_relationships_last() {
    let batch = build_insert_batch(&contact_with_children()).unwrap();
    let mimetypes = batch
        .iter()
        .filter_map(|operation| match operation {
            BatchOperation::InsertData { row, .. } => row.mimetype(),
            _ => None,
        })
        .collect::<Vec<_>>();

    assert_eq!(mimetypes.first(), Some(&MIMETYPE_NAME));
    assert_eq!(mimetypes.last(), Some(&MIMETYPE_RELATION));
    assert_eq!(mimetypes[mimetypes.len() - 2], MIMETYPE_NOTE);
}

#[test]
fn insert_batch_refuses_persisted_contact() {
    let mut contact = contact_with_children();
    contact.id = Some("abc".to_string());

    assert!(matches!(
        build_insert_batch(&contact),
        Err(BatchError::InvalidState(_))
    ));
}
