use addressbook_core::db::open_db_in_memory;
use addressbook_core::native::row::{ContactKey, DataRow, MIMETYPE_NAME, MIMETYPE_PHONE};
use addressbook_core::repo::batch::build_insert_batch;
use addressbook_core::{
    AccessController, AggregationMode, BatchOperation, Contact, ContactQuery, ContactStore,
    OperationResult, Phone, RawContactRef, SqliteContactStore, StoreError,
};
use rusqlite::Connection;
use std::sync::Arc;

fn store(conn: &Connection) -> SqliteContactStore<'_> {
    SqliteContactStore::try_new(conn, Arc::new(AccessController::granted())).unwrap()
}

fn insert_raw() -> BatchOperation {
    BatchOperation::InsertRawContact {
        account_type: None,
        account_name: None,
    }
}

fn phone_row(number: &str) -> DataRow {
    DataRow::new(MIMETYPE_PHONE)
        .with_custom_label("Mobile")
        .with_data(0, number)
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn try_new_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let result = SqliteContactStore::try_new(&conn, Arc::new(AccessController::granted()));
    assert!(matches!(
        result,
        Err(StoreError::UninitializedConnection {
            actual_version: 0,
            ..
        })
    ));
}

#[test]
fn insert_batch_resolves_back_references_at_commit() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);

    let mut contact = Contact::new();
    contact.first_name = "Grace".to_string();
    contact.phones.push(Phone {
        label: "Work".to_string(),
        number: "555-0199".to_string(),
    });
    let batch = build_insert_batch(&contact).unwrap();

    let results = store.apply_batch(&batch).unwrap();
    assert_eq!(results.len(), batch.len());
    let OperationResult::RawContact(raw_contact_id) = results[0] else {
        panic!("first result must be the raw contact: {:?}", results[0]);
    };

    let parents: Vec<i64> = conn
        .prepare("SELECT DISTINCT raw_contact_id FROM data;")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(parents, vec![raw_contact_id]);
    assert_eq!(count(&conn, "contacts"), 1);
    assert_eq!(count(&conn, "data"), 2);
}

#[test]
fn forward_back_reference_rolls_back_whole_batch() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);

    let batch = vec![
        insert_raw(),
        BatchOperation::InsertData {
            raw_contact: RawContactRef::BackReference(0),
            row: DataRow::new(MIMETYPE_NAME).with_data(1, "Ada"),
        },
        BatchOperation::InsertData {
            raw_contact: RawContactRef::BackReference(5),
            row: phone_row("1"),
        },
    ];

    let err = store.apply_batch(&batch).unwrap_err();
    assert!(matches!(
        err,
        StoreError::InvalidBackReference {
            position: 2,
            target: 5
        }
    ));
    assert_eq!(count(&conn, "contacts"), 0);
    assert_eq!(count(&conn, "raw_contacts"), 0);
    assert_eq!(count(&conn, "data"), 0);
}

#[test]
fn back_reference_to_data_result_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);

    let batch = vec![
        insert_raw(),
        BatchOperation::InsertData {
            raw_contact: RawContactRef::BackReference(0),
            row: phone_row("1"),
        },
        BatchOperation::InsertData {
            raw_contact: RawContactRef::BackReference(1),
            row: phone_row("2"),
        },
    ];

    let err = store.apply_batch(&batch).unwrap_err();
    assert!(matches!(err, StoreError::InvalidBackReference { .. }));
    assert_eq!(count(&conn, "raw_contacts"), 0);
}

#[test]
fn missing_existing_raw_contact_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);

    let batch = vec![BatchOperation::DeleteData {
        raw_contact: RawContactRef::Existing(404),
    }];

    let err = store.apply_batch(&batch).unwrap_err();
    assert!(matches!(err, StoreError::MissingRawContact(404)));
}

#[test]
fn aggregated_mode_groups_raw_contacts_by_lookup_key() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);

    let results = store
        .apply_batch(&[
            insert_raw(),
            BatchOperation::InsertData {
                raw_contact: RawContactRef::BackReference(0),
                row: phone_row("111"),
            },
        ])
        .unwrap();
    let OperationResult::RawContact(first) = results[0] else {
        panic!("expected raw contact result");
    };
    let results = store
        .apply_batch(&[
            insert_raw(),
            BatchOperation::InsertData {
                raw_contact: RawContactRef::BackReference(0),
                row: phone_row("222"),
            },
        ])
        .unwrap();
    let OperationResult::RawContact(second) = results[0] else {
        panic!("expected raw contact result");
    };

    // Join both raw contacts under the first aggregate.
    conn.execute(
        "UPDATE raw_contacts
         SET contact_id = (SELECT contact_id FROM raw_contacts WHERE id = ?1)
         WHERE id = ?2;",
        [first, second],
    )
    .unwrap();

    let raw_keys = store
        .list_keys(AggregationMode::RawContacts, &ContactQuery::default())
        .unwrap();
    assert_eq!(raw_keys, vec![ContactKey::Raw(first), ContactKey::Raw(second)]);

    let aggregate_keys = store
        .list_keys(AggregationMode::Aggregated, &ContactQuery::default())
        .unwrap();
    assert_eq!(aggregate_keys.len(), 1);

    let record = store.load_record(&aggregate_keys[0]).unwrap().unwrap();
    assert_eq!(record.raw_contact_ids, vec![first, second]);
    assert_eq!(record.rows.len(), 2);
}

#[test]
fn load_record_returns_none_for_unknown_keys() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);

    assert!(store.load_record(&ContactKey::Raw(77)).unwrap().is_none());
    assert!(store
        .load_record(&ContactKey::Aggregate("missing".to_string()))
        .unwrap()
        .is_none());
    assert!(store
        .key_for_raw_contact(77, AggregationMode::Aggregated)
        .unwrap()
        .is_none());
}
