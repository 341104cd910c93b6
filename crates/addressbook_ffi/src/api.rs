//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level contact functions to Dart via FRB.
//! - Bridge the host permission dialog into the core access controller.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Contacts cross the boundary as JSON strings.
//! - One access controller exists per process; every call shares its grant.

use addressbook_core::db::open_db;
use addressbook_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    AccessController, AccessPrompt, AccessReply, AddressBook, AddressBookError, AddressBookResult,
    AuthorizationStatus, Contact, ContactQuery, SqliteContactStore,
};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

const LIST_DEFAULT_LIMIT: u32 = 50;
const LIST_LIMIT_MAX: u32 = 200;
const DB_FILE_NAME: &str = "addressbook.sqlite3";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static ACCESS: OnceLock<Arc<AccessController>> = OnceLock::new();
static PENDING_REPLIES: Mutex<Vec<AccessReply>> = Mutex::new(Vec::new());

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Contact list response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactListResponse {
    /// Whether the query ran.
    pub ok: bool,
    /// One JSON-encoded contact per item, in store order.
    pub contacts: Vec<String>,
    /// Human-readable response message for diagnostics.
    pub message: String,
    /// Effective applied page size.
    pub applied_limit: u32,
}

/// Single-contact response envelope for load and save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactActionResponse {
    pub ok: bool,
    pub contact_id: Option<String>,
    /// JSON-encoded contact, absent on failure or when nothing was found.
    pub contact_json: Option<String>,
    pub message: String,
}

impl ContactActionResponse {
    fn found(message: impl Into<String>, contact: &Contact) -> Self {
        match serde_json::to_string(contact) {
            Ok(json) => Self {
                ok: true,
                contact_id: contact.id.clone(),
                contact_json: Some(json),
                message: message.into(),
            },
            Err(err) => Self::failure(format!("contact encode failed: {err}")),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            contact_id: None,
            contact_json: None,
            message: message.into(),
        }
    }
}

/// Asks for contact access.
///
/// # FFI contract
/// - Async call; completes once the host answers through
///   [`contacts_resolve_permission`], or immediately when the answer is
///   already known.
/// - Returns `false` when access is denied or restricted.
pub async fn contacts_request_permission() -> bool {
    access().request().await
}

/// Delivers the host dialog answer to every pending permission request.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Returns `true` when at least one pending request was answered.
#[flutter_rust_bridge::frb(sync)]
pub fn contacts_resolve_permission(granted: bool) -> bool {
    let pending = std::mem::take(
        &mut *PENDING_REPLIES
            .lock()
            .unwrap_or_else(PoisonError::into_inner),
    );
    let answered = pending
        .iter()
        .filter(|reply| reply.respond(granted).is_ok())
        .count();
    info!(
        "event=permission_resolve module=ffi status=ok granted={} answered={}",
        granted, answered
    );
    answered > 0
}

/// Returns `not_determined|restricted|denied|authorized`.
#[flutter_rust_bridge::frb(sync)]
pub fn contacts_authorization_status() -> String {
    access().status().as_str().to_string()
}

/// Lists contacts whose name contains `text`.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Returns deterministic envelope with applied limit.
#[flutter_rust_bridge::frb(sync)]
pub fn contacts_list(text: Option<String>, limit: Option<u32>) -> ContactListResponse {
    let applied_limit = normalize_list_limit(limit);
    let query = ContactQuery {
        text,
        limit: Some(applied_limit),
        ..ContactQuery::default()
    };

    let listed = with_address_book(|book| {
        book.query(&query)?
            .collect::<AddressBookResult<Vec<_>>>()
    });
    let encoded = listed.and_then(|contacts| {
        contacts
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| format!("contact encode failed: {err}"))
    });

    match encoded {
        Ok(contacts) => {
            let message = if contacts.is_empty() {
                "No contacts.".to_string()
            } else {
                format!("Found {} contact(s).", contacts.len())
            };
            ContactListResponse {
                ok: true,
                contacts,
                message,
                applied_limit,
            }
        }
        Err(err) => {
            warn!("event=ffi_call module=ffi status=error op=contacts_list");
            ContactListResponse {
                ok: false,
                contacts: Vec::new(),
                message: format!("contacts_list failed: {err}"),
                applied_limit,
            }
        }
    }
}

/// Loads one contact by id.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - A missing id is rejected; an unknown id returns `ok` without payload.
#[flutter_rust_bridge::frb(sync)]
pub fn contacts_load(id: Option<String>) -> ContactActionResponse {
    let Some(id) = id else {
        let err = AddressBookError::InvalidArgument("contact id is required".to_string());
        return ContactActionResponse::failure(format!("contacts_load failed: {err}"));
    };

    match with_address_book(|book| book.load(&id)) {
        Ok(Some(contact)) => ContactActionResponse::found("Contact loaded.", &contact),
        Ok(None) => ContactActionResponse {
            ok: true,
            contact_id: None,
            contact_json: None,
            message: "Contact not found.".to_string(),
        },
        Err(err) => ContactActionResponse::failure(format!("contacts_load failed: {err}")),
    }
}

/// Inserts or updates a contact given as JSON.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Returns the stored contact, including its assigned id, on success.
#[flutter_rust_bridge::frb(sync)]
pub fn contacts_save(contact_json: String) -> ContactActionResponse {
    let contact = match serde_json::from_str::<Contact>(&contact_json) {
        Ok(contact) => contact,
        Err(err) => {
            return ContactActionResponse::failure(format!(
                "contacts_save failed: invalid contact json: {err}"
            ))
        }
    };

    match with_address_book(|book| book.save(contact)) {
        Ok(saved) => ContactActionResponse::found("Contact saved.", &saved),
        Err(err) => {
            warn!("event=ffi_call module=ffi status=error op=contacts_save");
            ContactActionResponse::failure(format!("contacts_save failed: {err}"))
        }
    }
}

// Parks replies until Dart reports the dialog result.
struct HostPrompt;

impl AccessPrompt for HostPrompt {
    fn prompt(&self, reply: AccessReply) {
        PENDING_REPLIES
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(reply);
    }
}

fn access() -> &'static Arc<AccessController> {
    ACCESS.get_or_init(|| {
        Arc::new(AccessController::new(
            AuthorizationStatus::NotDetermined,
            HostPrompt,
        ))
    })
}

fn normalize_list_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => LIST_DEFAULT_LIMIT,
        Some(value) if value > LIST_LIMIT_MAX => LIST_LIMIT_MAX,
        Some(value) => value,
    }
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("ADDRESSBOOK_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

fn with_address_book<T>(
    f: impl FnOnce(&AddressBook<SqliteContactStore<'_>>) -> AddressBookResult<T>,
) -> Result<T, String> {
    let db_path = resolve_db_path();
    let conn = open_db(&db_path).map_err(|err| format!("contact DB open failed: {err}"))?;
    let store = SqliteContactStore::try_new(&conn, Arc::clone(access()))
        .map_err(|err| format!("contact store init failed: {err}"))?;
    let book = AddressBook::new(store);
    f(&book).map_err(|err| err.to_string())
}
