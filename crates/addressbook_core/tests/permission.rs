use addressbook_core::access::completion;
use addressbook_core::db::open_db_in_memory;
use addressbook_core::{
    AccessController, AccessReply, AddressBook, AddressBookError, AlreadyResolved,
    AuthorizationStatus, Contact, SqliteContactStore,
};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

fn answering_on_thread(granted: bool) -> impl Fn(AccessReply) + Send + Sync {
    move |reply: AccessReply| {
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            reply.respond(granted).expect("first answer wins");
        });
    }
}

#[tokio::test]
async fn request_completes_when_prompt_answers_from_another_thread() {
    let access =
        AccessController::new(AuthorizationStatus::NotDetermined, answering_on_thread(true));

    assert!(access.request().await);
    assert_eq!(access.status(), AuthorizationStatus::Authorized);

    // Settled status answers without prompting again.
    assert!(access.request().await);
}

#[tokio::test]
async fn denied_answer_is_recorded() {
    let access =
        AccessController::new(AuthorizationStatus::NotDetermined, answering_on_thread(false));

    assert!(!access.request().await);
    assert_eq!(access.status(), AuthorizationStatus::Denied);
}

#[test]
fn second_answer_is_rejected_and_does_not_flip_status() {
    let kept: Arc<Mutex<Option<AccessReply>>> = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&kept);
    let access = AccessController::new(
        AuthorizationStatus::NotDetermined,
        move |reply: AccessReply| {
            *slot.lock().unwrap() = Some(reply);
        },
    );

    let request = access.request();
    let reply = kept.lock().unwrap().take().unwrap();
    assert!(!reply.is_answered());

    assert_eq!(reply.respond(true), Ok(()));
    assert_eq!(reply.clone().respond(false), Err(AlreadyResolved));
    assert!(reply.is_answered());

    assert!(request.wait());
    assert_eq!(access.status(), AuthorizationStatus::Authorized);
}

#[test]
fn overlapping_requests_keep_the_first_answer() {
    let kept: Arc<Mutex<Vec<AccessReply>>> = Arc::new(Mutex::new(Vec::new()));
    let slot = Arc::clone(&kept);
    let access = AccessController::new(
        AuthorizationStatus::NotDetermined,
        move |reply: AccessReply| {
            slot.lock().unwrap().push(reply);
        },
    );

    let first = access.request();
    let second = access.request();
    let replies = std::mem::take(&mut *kept.lock().unwrap());
    assert_eq!(replies.len(), 2);

    assert_eq!(replies[0].respond(true), Ok(()));
    assert_eq!(replies[1].respond(false), Ok(()));

    assert_eq!(access.status(), AuthorizationStatus::Authorized);
    assert!(first.wait());
    assert!(second.wait());
}

#[tokio::test]
async fn completion_can_be_resolved_from_spawned_task() {
    let (done, receiver) = completion::<&'static str>();
    let twin = done.clone();

    tokio::spawn(async move {
        done.resolve("answered").unwrap();
    });

    assert_eq!(receiver.await.unwrap(), "answered");
    assert_eq!(twin.resolve("late"), Err(AlreadyResolved));
}

#[test]
fn facade_operations_unlock_after_grant() {
    let conn = open_db_in_memory().unwrap();
    let access = Arc::new(AccessController::new(
        AuthorizationStatus::NotDetermined,
        answering_on_thread(true),
    ));
    let store = SqliteContactStore::try_new(&conn, Arc::clone(&access)).unwrap();
    let book = AddressBook::new(store);

    assert!(matches!(
        book.save(Contact::new()),
        Err(AddressBookError::PermissionDenied)
    ));

    assert!(book.request_permission().wait());
    let saved = book.save(Contact::new()).unwrap();
    assert!(saved.is_persisted());
    assert_eq!(book.contacts().unwrap().count(), 1);
}
