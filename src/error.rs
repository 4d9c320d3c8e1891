//! Error taxonomy for the worker runtime.
//!
//! Three families:
//!
//! - [`ProtocolViolation`]: the peer broke the mailbox contract. Always fatal,
//!   never retried.
//! - [`MailboxError`]: producer-side refusals (slot occupied, payload too big).
//!   The UI thread can retry these later; they never reach the worker.
//! - [`WorkerError`]: what unwinds out of the legacy program. Carries
//!   [`WorkerError::Exit`] for intentional termination, which is not a failure.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Contract breach by the cooperating peer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("unknown event status tag {0}")]
    UnknownTag(u32),

    #[error("received OPEN_FILE_WRITE_COMPLETE event but no open-file context exists")]
    WriteCompleteWithoutContext,

    #[error("received OPEN_FILE_REQUEST while still awaiting the write of {pending:?}")]
    OpenFileRequestWhileAwaitingWrite { pending: String },

    #[error("the program cannot start because it is already running")]
    AlreadyRunning,

    #[error("waited for an event before the runtime was started")]
    NotStarted,

    #[error("malformed {tag} payload: needs {needed} words but mailbox holds {capacity}")]
    MalformedPayload {
        tag: &'static str,
        needed: usize,
        capacity: usize,
    },
}

/// Producer-side refusal to post an event or fill a transfer buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MailboxError {
    #[error("mailbox slot still holds unconsumed status {pending}")]
    Busy { pending: u32 },

    #[error("another producer is writing the mailbox")]
    Contended,

    #[error("encoded event needs {needed} words but mailbox holds {capacity}")]
    PayloadTooLarge { needed: usize, capacity: usize },

    #[error("write of {len} bytes at offset {offset} exceeds transfer buffer of {capacity} bytes")]
    TransferOverflow {
        offset: usize,
        len: usize,
        capacity: usize,
    },
}

/// Failure materializing a file in the virtual filesystem.
#[derive(Debug, Error)]
pub enum VfsError {
    #[error("virtual path {0:?} escapes the filesystem root")]
    EscapesRoot(PathBuf),

    #[error("failed to write {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Anything that unwinds out of the legacy program's main entry point.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),

    /// Intentional exit requested by the legacy program.
    #[error("program terminated with status {0}")]
    Exit(i32),

    #[error(transparent)]
    Vfs(#[from] VfsError),

    #[error("worker thread panicked")]
    WorkerPanicked,
}

impl WorkerError {
    /// Normal termination is reported through the `exited` notification, not as a failure.
    pub fn is_normal_termination(&self) -> bool {
        matches!(self, Self::Exit(_))
    }
}
