//! Contact store authorization and the permission request promise.
//!
//! # Responsibility
//! - Track the authorization status of the contact store.
//! - Turn a callback-style permission prompt into an awaitable request.
//!
//! # Invariants
//! - A permission request resolves at most once; later answers are rejected
//!   with `AlreadyResolved` and do not change the recorded status.
//! - A prompt that drops its reply without answering resolves to `false`.
//! - Only the first answer across all overlapping requests sets the status;
//!   later answers resolve their request with the recorded status.
//! - `Denied` and `Restricted` never prompt again.

use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Authorization state of the contact store for this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    /// The user has not been asked yet.
    NotDetermined,
    /// Access is blocked by policy and cannot be requested.
    Restricted,
    Denied,
    Authorized,
}

impl AuthorizationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotDetermined => "not_determined",
            Self::Restricted => "restricted",
            Self::Denied => "denied",
            Self::Authorized => "authorized",
        }
    }
}

/// Returned when a completion is resolved a second time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyResolved;

impl Display for AlreadyResolved {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "completion already resolved")
    }
}

impl Error for AlreadyResolved {}

/// Write side of a single-assignment promise. Cheap to clone; every clone
/// shares the same resolve-at-most-once guard.
#[derive(Debug)]
pub struct Completion<T> {
    sender: Arc<Mutex<Option<oneshot::Sender<T>>>>,
}

impl<T> Clone for Completion<T> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<T> Completion<T> {
    /// Resolves the promise. Only the first call delivers its value.
    pub fn resolve(&self, value: T) -> Result<(), AlreadyResolved> {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(AlreadyResolved)?;
        // Receiver may already be gone; the request is still considered answered.
        let _ = sender.send(value);
        Ok(())
    }

    pub fn is_resolved(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

/// Creates a linked completion/receiver pair.
pub fn completion<T>() -> (Completion<T>, oneshot::Receiver<T>) {
    let (tx, rx) = oneshot::channel();
    (
        Completion {
            sender: Arc::new(Mutex::new(Some(tx))),
        },
        rx,
    )
}

/// Pending answer to a permission request.
///
/// Await it from async code, or call [`PermissionRequest::wait`] from a
/// thread that is allowed to block.
#[derive(Debug)]
pub struct PermissionRequest {
    state: RequestState,
}

#[derive(Debug)]
enum RequestState {
    Ready(bool),
    Pending(oneshot::Receiver<bool>),
}

impl PermissionRequest {
    pub fn ready(granted: bool) -> Self {
        Self {
            state: RequestState::Ready(granted),
        }
    }

    fn pending(receiver: oneshot::Receiver<bool>) -> Self {
        Self {
            state: RequestState::Pending(receiver),
        }
    }

    /// Blocks the current thread until the prompt answers.
    ///
    /// Must not be called from inside an async runtime worker.
    pub fn wait(self) -> bool {
        match self.state {
            RequestState::Ready(granted) => granted,
            RequestState::Pending(receiver) => receiver.blocking_recv().unwrap_or(false),
        }
    }
}

impl Future for PermissionRequest {
    type Output = bool;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            RequestState::Ready(granted) => Poll::Ready(*granted),
            RequestState::Pending(receiver) => Pin::new(receiver)
                .poll(cx)
                .map(|answer| answer.unwrap_or(false)),
        }
    }
}

/// Answer handle passed to an [`AccessPrompt`].
///
/// May be moved to and resolved from any thread.
#[derive(Debug, Clone)]
pub struct AccessReply {
    completion: Completion<bool>,
    status: Arc<Mutex<AuthorizationStatus>>,
}

impl AccessReply {
    /// Records the user's answer and completes the pending request.
    pub fn respond(&self, granted: bool) -> Result<(), AlreadyResolved> {
        // Status and completion move together under the status lock so a
        // late duplicate answer cannot overwrite the first one.
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        let settled = *status != AuthorizationStatus::NotDetermined;
        // An overlapping request answered after the status settled reports
        // the settled answer instead of its own.
        let answer = if settled {
            *status == AuthorizationStatus::Authorized
        } else {
            granted
        };
        self.completion.resolve(answer)?;
        if !settled {
            *status = if granted {
                AuthorizationStatus::Authorized
            } else {
                AuthorizationStatus::Denied
            };
        }
        info!(
            "event=permission_answer module=access status=ok granted={} settled={}",
            answer, settled
        );
        Ok(())
    }

    pub fn is_answered(&self) -> bool {
        self.completion.is_resolved()
    }
}

/// Host hook that asks the user for contact access.
pub trait AccessPrompt: Send + Sync {
    /// Starts the prompt. The answer is delivered later through `reply`.
    fn prompt(&self, reply: AccessReply);
}

impl<F> AccessPrompt for F
where
    F: Fn(AccessReply) + Send + Sync,
{
    fn prompt(&self, reply: AccessReply) {
        self(reply)
    }
}

/// Prompt that grants access immediately on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoGrant;

impl AccessPrompt for AutoGrant {
    fn prompt(&self, reply: AccessReply) {
        let _ = reply.respond(true);
    }
}

/// Authorization gate shared by the store and its facade.
pub struct AccessController {
    status: Arc<Mutex<AuthorizationStatus>>,
    prompt: Box<dyn AccessPrompt>,
}

impl AccessController {
    pub fn new(initial: AuthorizationStatus, prompt: impl AccessPrompt + 'static) -> Self {
        Self {
            status: Arc::new(Mutex::new(initial)),
            prompt: Box::new(prompt),
        }
    }

    /// Controller that is already authorized.
    pub fn granted() -> Self {
        Self::new(AuthorizationStatus::Authorized, AutoGrant)
    }

    pub fn status(&self) -> AuthorizationStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_authorized(&self) -> bool {
        self.status() == AuthorizationStatus::Authorized
    }

    /// Starts a permission request.
    ///
    /// Resolves immediately unless the status is `NotDetermined`, in which
    /// case the prompt is asked and the request completes on its answer.
    pub fn request(&self) -> PermissionRequest {
        match self.status() {
            AuthorizationStatus::Authorized => PermissionRequest::ready(true),
            AuthorizationStatus::Denied | AuthorizationStatus::Restricted => {
                PermissionRequest::ready(false)
            }
            AuthorizationStatus::NotDetermined => {
                let (completion, receiver) = completion();
                let reply = AccessReply {
                    completion,
                    status: Arc::clone(&self.status),
                };
                info!("event=permission_prompt module=access status=start");
                self.prompt.prompt(reply);
                PermissionRequest::pending(receiver)
            }
        }
    }
}

impl std::fmt::Debug for AccessController {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessController")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl Drop for AccessReply {
    fn drop(&mut self) {
        // Last handle gone without an answer: the receiver sees a closed
        // channel and the request resolves to `false`.
        if Arc::strong_count(&self.completion.sender) == 1 && !self.completion.is_resolved() {
            warn!("event=permission_answer module=access status=dropped granted=false");
        }
    }
}
