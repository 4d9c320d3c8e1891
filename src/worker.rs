//! Worker thread spawn and the UI thread's half of the mailbox.
//!
//! ```text
//! UI thread                                   worker thread ("vimwasm-worker")
//! ─────────                                   ────────────────────────────────
//! UiPort::try_send ──▶ SharedMailbox ──▶      WorkerRuntime::wait_for_event
//! WorkerHandle::notifications ◀── mpsc ◀──   Notifier::send
//! WorkerHandle::join ◀────────────────────   start() outcome
//! ```
//!
//! Nothing on the UI side blocks: a refused send means the previous event is
//! still pending and should be retried on a later tick.

use std::io;
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};

use tracing::warn;

use crate::callouts::NativeEntryPoints;
use crate::codec::{KeyEvent, MailboxEvent, STATUS_EVENT_NOT_SET};
use crate::error::{MailboxError, WorkerError};
use crate::mailbox::{DEFAULT_CAPACITY_WORDS, MailboxHandle, SharedMailbox};
use crate::notifier::{Notification, Notifier};
use crate::runtime::{RuntimeConfig, StartRequest, Termination, WorkerRuntime};

// =============================================================================
// UI PORT
// =============================================================================

/// Producer side of the mailbox, owned by the UI thread.
///
/// Not `Clone`: the mailbox has a single producer.
#[derive(Debug)]
pub struct UiPort {
    mailbox: MailboxHandle,
}

impl UiPort {
    pub fn new(capacity_words: usize) -> Self {
        Self {
            mailbox: SharedMailbox::shared(capacity_words),
        }
    }

    pub fn mailbox(&self) -> &MailboxHandle {
        &self.mailbox
    }

    /// The `start` control message carrying this port's mailbox.
    pub fn start_request(&self, dom_width: u32, dom_height: u32, debug: bool) -> StartRequest {
        StartRequest {
            dom_width,
            dom_height,
            mailbox: Arc::clone(&self.mailbox),
            debug,
        }
    }

    /// True when the worker has consumed the previous event.
    pub fn is_free(&self) -> bool {
        self.mailbox.status() == STATUS_EVENT_NOT_SET
    }

    pub fn try_send(&self, event: &MailboxEvent) -> Result<(), MailboxError> {
        self.mailbox.post(event)
    }

    pub fn send_key(&self, key: KeyEvent) -> Result<(), MailboxError> {
        self.try_send(&MailboxEvent::Key(key))
    }

    pub fn send_resize(&self, width: u32, height: u32) -> Result<(), MailboxError> {
        self.try_send(&MailboxEvent::Resize { width, height })
    }

    /// First phase of the open-file handshake. Wait for `fileBufferReady`.
    pub fn request_open_file(&self, file_name: &str, file_size: u32) -> Result<(), MailboxError> {
        self.try_send(&MailboxEvent::OpenFileRequest {
            file_size,
            file_name: file_name.to_owned(),
        })
    }

    /// Second phase: the transfer buffer has been filled.
    pub fn complete_file_write(&self) -> Result<(), MailboxError> {
        self.try_send(&MailboxEvent::OpenFileWriteComplete)
    }
}

impl Default for UiPort {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY_WORDS)
    }
}

// =============================================================================
// WORKER HANDLE
// =============================================================================

/// UI-side handle to a running worker.
pub struct WorkerHandle {
    notifications: Receiver<Notification>,
    thread: JoinHandle<Result<Termination, WorkerError>>,
}

impl WorkerHandle {
    /// Ordered notifications from the worker. Disconnects when the worker ends.
    pub fn notifications(&self) -> &Receiver<Notification> {
        &self.notifications
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the worker thread and return how the legacy program ended.
    pub fn join(self) -> Result<Termination, WorkerError> {
        self.thread.join().unwrap_or_else(|_| {
            warn!("worker thread panicked");
            Err(WorkerError::WorkerPanicked)
        })
    }
}

/// Spawn the worker thread, construct the runtime on it, and deliver `request`.
///
/// The program is built on the worker thread by `make_program`, so it may hold
/// thread-local state (`Rc`, `RefCell`).
pub fn spawn_worker<P, F>(
    make_program: F,
    config: RuntimeConfig,
    request: StartRequest,
) -> io::Result<WorkerHandle>
where
    P: NativeEntryPoints + 'static,
    F: FnOnce() -> P + Send + 'static,
{
    let (notifier, notifications) = Notifier::channel();
    let thread = thread::Builder::new()
        .name("vimwasm-worker".to_string())
        .spawn(move || {
            let mut runtime = WorkerRuntime::new(make_program(), notifier, config);
            runtime.start(request)
        })?;

    Ok(WorkerHandle {
        notifications,
        thread,
    })
}
