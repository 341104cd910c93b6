//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `addressbook_core` linkage.
//! - Optionally open a contact store file and report how many contacts it holds.
//!
//! Usage: `addressbook_cli [DB_PATH]`

use addressbook_core::db::open_db;
use addressbook_core::{AccessController, AddressBook, SqliteContactStore};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    println!("addressbook_core ping={}", addressbook_core::ping());
    println!("addressbook_core version={}", addressbook_core::core_version());

    let Some(db_path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };

    match count_contacts(&db_path) {
        Ok(count) => {
            println!("addressbook_core contacts={count}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("addressbook_core error={err}");
            ExitCode::FAILURE
        }
    }
}

// Local files need no prompt; the probe runs pre-authorized.
fn count_contacts(db_path: &str) -> Result<usize, Box<dyn std::error::Error>> {
    let conn = open_db(db_path)?;
    let store = SqliteContactStore::try_new(&conn, Arc::new(AccessController::granted()))?;
    let book = AddressBook::new(store);

    let mut count = 0;
    for contact in book.contacts()? {
        contact?;
        count += 1;
    }
    Ok(count)
}
