//! Contact store contract and SQLite implementation.
//!
//! # Responsibility
//! - Define the opaque query/batch capabilities of a platform contact store.
//! - Provide a SQLite store shaped like a multi-row contacts provider:
//!   aggregate `contacts`, parent `raw_contacts`, and mimetype-tagged `data`.
//!
//! # Invariants
//! - `apply_batch` commits every operation or none.
//! - Back references are resolved at commit time and must point at an
//!   earlier `InsertRawContact` in the same batch.
//! - Every inserted raw contact gets its own aggregate with a fresh lookup key.

use crate::access::AccessController;
use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::native::row::{
    ContactKey, DataRow, RawContactId, RawContactRecord, DATA_COLUMNS, MIMETYPE_EMAIL,
    MIMETYPE_NAME, MIMETYPE_PHONE,
};
use crate::repo::batch::{BatchOperation, OperationResult, RawContactRef};
use crate::repo::query::{fold_case, normalize_phone_digits, ContactQuery};
use crate::repo::schema::{ensure_tables, SchemaError};
use log::{error, info};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

const DATA_SELECT_SQL: &str = "SELECT
    mimetype,
    data1,
    data2,
    data3,
    data4,
    data5,
    data6,
    data7,
    data_type,
    data_label
FROM data";

const FOLD_FN: &str = "addressbook_fold";
const DIGITS_FN: &str = "addressbook_digits";

const NAME_HAYSTACK_SQL: &str = "addressbook_fold(
    coalesce(data1, '') || ' ' || coalesce(data2, '') || ' ' || coalesce(data3, '') || ' ' ||
    coalesce(data4, '') || ' ' || coalesce(data5, '') || ' ' || coalesce(data6, '') || ' ' ||
    coalesce(data7, ''))";

const PHONE_DIGITS_SQL: &str = "addressbook_digits(coalesce(data1, ''))";

const EMAIL_HAYSTACK_SQL: &str = "addressbook_fold(coalesce(data1, ''))";

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by contact store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Operation at `position` referenced a result it cannot use.
    InvalidBackReference { position: usize, target: usize },
    /// Operation referenced a raw contact that does not exist.
    MissingRawContact(RawContactId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidBackReference { position, target } => write!(
                f,
                "operation {position} has an invalid back reference to operation {target}"
            ),
            Self::MissingRawContact(id) => write!(f, "raw contact not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "contact store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "contact store requires table `{table}`")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

fn from_schema_error(value: SchemaError) -> StoreError {
    match value {
        SchemaError::Db(err) => StoreError::Db(err),
        SchemaError::UninitializedConnection {
            expected_version,
            actual_version,
        } => StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        },
        SchemaError::MissingRequiredTable(table) => StoreError::MissingRequiredTable(table),
    }
}

/// Which identity contacts are enumerated and loaded by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationMode {
    /// One contact per raw contact row, id = row id.
    RawContacts,
    /// One contact per aggregate, id = lookup key.
    Aggregated,
}

/// Optional behaviours a store may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCapabilities {
    /// Existing contacts can be rewritten.
    pub update: bool,
    /// Raw contacts are grouped into aggregates with lookup keys.
    pub aggregation: bool,
}

impl Default for StoreCapabilities {
    fn default() -> Self {
        Self {
            update: true,
            aggregation: true,
        }
    }
}

/// Platform contact store contract.
pub trait ContactStore {
    fn capabilities(&self) -> StoreCapabilities;
    /// Authorization gate guarding every read and write.
    fn access(&self) -> &AccessController;
    /// Lists keys of contacts matching `query`, ascending.
    fn list_keys(
        &self,
        mode: AggregationMode,
        query: &ContactQuery,
    ) -> StoreResult<Vec<ContactKey>>;
    /// Loads one native record, `None` when the key does not exist.
    fn load_record(&self, key: &ContactKey) -> StoreResult<Option<RawContactRecord>>;
    /// Returns the key a raw contact is visible under in `mode`.
    fn key_for_raw_contact(
        &self,
        raw_contact_id: RawContactId,
        mode: AggregationMode,
    ) -> StoreResult<Option<ContactKey>>;
    /// Applies `operations` atomically, returning one result per operation.
    fn apply_batch(&self, operations: &[BatchOperation]) -> StoreResult<Vec<OperationResult>>;
}

/// SQLite-backed contact store.
pub struct SqliteContactStore<'conn> {
    conn: &'conn Connection,
    access: Arc<AccessController>,
    capabilities: StoreCapabilities,
}

impl<'conn> SqliteContactStore<'conn> {
    /// Creates a store over a migrated connection.
    pub fn try_new(conn: &'conn Connection, access: Arc<AccessController>) -> StoreResult<Self> {
        ensure_tables(conn, latest_version(), &["contacts", "raw_contacts", "data"])
            .map_err(from_schema_error)?;
        register_match_functions(conn)?;
        Ok(Self {
            conn,
            access,
            capabilities: StoreCapabilities::default(),
        })
    }

    /// Overrides the advertised capabilities.
    pub fn with_capabilities(mut self, capabilities: StoreCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

impl ContactStore for SqliteContactStore<'_> {
    fn capabilities(&self) -> StoreCapabilities {
        self.capabilities
    }

    fn access(&self) -> &AccessController {
        &self.access
    }

    fn list_keys(
        &self,
        mode: AggregationMode,
        query: &ContactQuery,
    ) -> StoreResult<Vec<ContactKey>> {
        let mut filters = String::new();
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(needle) = query.text_needle() {
            filters.push_str(&format!(
                " AND rc.id IN (SELECT raw_contact_id FROM data
                    WHERE mimetype = ? AND instr({NAME_HAYSTACK_SQL}, ?) > 0)"
            ));
            bind_values.push(Value::Text(MIMETYPE_NAME.to_string()));
            bind_values.push(Value::Text(needle));
        }
        if let Some(digits) = query.phone_digits() {
            filters.push_str(&format!(
                " AND rc.id IN (SELECT raw_contact_id FROM data
                    WHERE mimetype = ? AND instr({PHONE_DIGITS_SQL}, ?) > 0)"
            ));
            bind_values.push(Value::Text(MIMETYPE_PHONE.to_string()));
            bind_values.push(Value::Text(digits));
        }
        if let Some(needle) = query.email_needle() {
            filters.push_str(&format!(
                " AND rc.id IN (SELECT raw_contact_id FROM data
                    WHERE mimetype = ? AND instr({EMAIL_HAYSTACK_SQL}, ?) > 0)"
            ));
            bind_values.push(Value::Text(MIMETYPE_EMAIL.to_string()));
            bind_values.push(Value::Text(needle));
        }

        let mut sql = match mode {
            AggregationMode::RawContacts => format!(
                "SELECT rc.id FROM raw_contacts rc WHERE 1 = 1{filters} ORDER BY rc.id ASC"
            ),
            AggregationMode::Aggregated => format!(
                "SELECT c.lookup_key FROM contacts c
                 WHERE EXISTS (
                    SELECT 1 FROM raw_contacts rc WHERE rc.contact_id = c.id{filters}
                 )
                 ORDER BY c.id ASC"
            ),
        };

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut keys = Vec::new();
        while let Some(row) = rows.next()? {
            keys.push(match mode {
                AggregationMode::RawContacts => ContactKey::Raw(row.get(0)?),
                AggregationMode::Aggregated => ContactKey::Aggregate(row.get(0)?),
            });
        }

        Ok(keys)
    }

    fn load_record(&self, key: &ContactKey) -> StoreResult<Option<RawContactRecord>> {
        let raw_contact_ids = match key {
            ContactKey::Raw(id) => {
                if !raw_contact_exists(self.conn, *id)? {
                    return Ok(None);
                }
                vec![*id]
            }
            ContactKey::Aggregate(lookup_key) => {
                let mut stmt = self.conn.prepare(
                    "SELECT rc.id
                     FROM raw_contacts rc
                     JOIN contacts c ON c.id = rc.contact_id
                     WHERE c.lookup_key = ?1
                     ORDER BY rc.id ASC;",
                )?;
                let ids = stmt
                    .query_map([lookup_key], |row| row.get::<_, RawContactId>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                if ids.is_empty() {
                    return Ok(None);
                }
                ids
            }
        };

        let mut stmt = self.conn.prepare(&format!(
            "{DATA_SELECT_SQL} WHERE raw_contact_id = ?1 ORDER BY id ASC;"
        ))?;
        let mut rows = Vec::new();
        for raw_contact_id in &raw_contact_ids {
            let member_rows = stmt
                .query_map([raw_contact_id], parse_data_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.extend(member_rows);
        }

        Ok(Some(RawContactRecord {
            key: key.clone(),
            raw_contact_ids,
            rows,
        }))
    }

    fn key_for_raw_contact(
        &self,
        raw_contact_id: RawContactId,
        mode: AggregationMode,
    ) -> StoreResult<Option<ContactKey>> {
        let key = match mode {
            AggregationMode::RawContacts => raw_contact_exists(self.conn, raw_contact_id)?
                .then_some(ContactKey::Raw(raw_contact_id)),
            AggregationMode::Aggregated => self
                .conn
                .query_row(
                    "SELECT c.lookup_key
                     FROM contacts c
                     JOIN raw_contacts rc ON rc.contact_id = c.id
                     WHERE rc.id = ?1;",
                    [raw_contact_id],
                    |row| row.get::<_, String>(0),
                )
                .optional()?
                .map(ContactKey::Aggregate),
        };
        Ok(key)
    }

    fn apply_batch(&self, operations: &[BatchOperation]) -> StoreResult<Vec<OperationResult>> {
        let started_at = Instant::now();
        let outcome = apply_in_transaction(self.conn, operations);
        match &outcome {
            Ok(_) => info!(
                "event=batch_apply module=store status=ok operations={} duration_ms={}",
                operations.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=batch_apply module=store status=error operations={} duration_ms={} error={}",
                operations.len(),
                started_at.elapsed().as_millis(),
                err
            ),
        }
        outcome
    }
}

// Stored values must be folded exactly like `ContactQuery` folds its needles.
fn register_match_functions(conn: &Connection) -> StoreResult<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;
    conn.create_scalar_function(FOLD_FN, 1, flags, |ctx| {
        let value = ctx.get::<Option<String>>(0)?;
        Ok(fold_case(value.as_deref().unwrap_or("")))
    })?;
    conn.create_scalar_function(DIGITS_FN, 1, flags, |ctx| {
        let value = ctx.get::<Option<String>>(0)?;
        Ok(normalize_phone_digits(value.as_deref().unwrap_or("")))
    })?;
    Ok(())
}

fn apply_in_transaction(
    conn: &Connection,
    operations: &[BatchOperation],
) -> StoreResult<Vec<OperationResult>> {
    // Dropping `tx` on any early return rolls the whole batch back.
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let mut results = Vec::with_capacity(operations.len());

    for (position, operation) in operations.iter().enumerate() {
        let result = match operation {
            BatchOperation::InsertRawContact {
                account_type,
                account_name,
            } => OperationResult::RawContact(insert_raw_contact(
                &tx,
                account_type.as_deref(),
                account_name.as_deref(),
            )?),
            BatchOperation::InsertData { raw_contact, row } => {
                let raw_contact_id = resolve_raw_contact(&tx, position, *raw_contact, &results)?;
                OperationResult::Data(insert_data_row(&tx, raw_contact_id, row)?)
            }
            BatchOperation::DeleteData { raw_contact } => {
                let raw_contact_id = resolve_raw_contact(&tx, position, *raw_contact, &results)?;
                let deleted = tx.execute(
                    "DELETE FROM data WHERE raw_contact_id = ?1;",
                    [raw_contact_id],
                )?;
                OperationResult::Deleted(deleted)
            }
        };
        results.push(result);
    }

    tx.commit()?;
    Ok(results)
}

fn resolve_raw_contact(
    conn: &Connection,
    position: usize,
    reference: RawContactRef,
    results: &[OperationResult],
) -> StoreResult<RawContactId> {
    match reference {
        RawContactRef::BackReference(target) => match results.get(target) {
            Some(OperationResult::RawContact(id)) if target < position => Ok(*id),
            _ => Err(StoreError::InvalidBackReference { position, target }),
        },
        RawContactRef::Existing(id) => {
            if raw_contact_exists(conn, id)? {
                Ok(id)
            } else {
                Err(StoreError::MissingRawContact(id))
            }
        }
    }
}

fn insert_raw_contact(
    conn: &Connection,
    account_type: Option<&str>,
    account_name: Option<&str>,
) -> StoreResult<RawContactId> {
    conn.execute(
        "INSERT INTO contacts (lookup_key) VALUES (?1);",
        [Uuid::new_v4().to_string()],
    )?;
    let contact_id = conn.last_insert_rowid();
    conn.execute(
        "INSERT INTO raw_contacts (contact_id, account_type, account_name)
         VALUES (?1, ?2, ?3);",
        params![contact_id, account_type, account_name],
    )?;
    Ok(conn.last_insert_rowid())
}

fn insert_data_row(
    conn: &Connection,
    raw_contact_id: RawContactId,
    row: &DataRow,
) -> StoreResult<i64> {
    let [data1, data2, data3, data4, data5, data6, data7] = &row.data;
    conn.execute(
        "INSERT INTO data (
            raw_contact_id,
            mimetype,
            data1,
            data2,
            data3,
            data4,
            data5,
            data6,
            data7,
            data_type,
            data_label
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
        params![
            raw_contact_id,
            row.mimetype.as_deref(),
            data1.as_deref(),
            data2.as_deref(),
            data3.as_deref(),
            data4.as_deref(),
            data5.as_deref(),
            data6.as_deref(),
            data7.as_deref(),
            row.data_type,
            row.data_label.as_deref(),
        ],
    )?;
    let data_id = conn.last_insert_rowid();
    conn.execute(
        "UPDATE contacts
         SET updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = (SELECT contact_id FROM raw_contacts WHERE id = ?1);",
        [raw_contact_id],
    )?;
    Ok(data_id)
}

fn raw_contact_exists(conn: &Connection, raw_contact_id: RawContactId) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM raw_contacts WHERE id = ?1);",
        [raw_contact_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_data_row(row: &Row<'_>) -> rusqlite::Result<DataRow> {
    let mut data: [Option<String>; DATA_COLUMNS] = Default::default();
    for (index, slot) in data.iter_mut().enumerate() {
        *slot = row.get(index + 1)?;
    }
    Ok(DataRow {
        mimetype: row.get("mimetype")?,
        data,
        data_type: row.get("data_type")?,
        data_label: row.get("data_label")?,
    })
}
