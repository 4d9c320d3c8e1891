//! Two-phase open-file handshake.
//!
//! ```text
//!            OPEN_FILE_REQUEST(size, name)
//!   Idle ─────────────────────────────────▶ AwaitingWrite{name, buffer}
//!    ▲        emits fileBufferReady               │
//!    │                                            │ OPEN_FILE_WRITE_COMPLETE
//!    └────────────────────────────────────────────┘ materialize /name, drop
//! ```
//!
//! The UI thread fills the transfer buffer after it receives `fileBufferReady`
//! and before it posts OPEN_FILE_WRITE_COMPLETE. That notification and the
//! mailbox's Release/Acquire on the status word are the only ordering; the
//! buffer itself holds no lock.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::{MailboxError, ProtocolViolation};

// =============================================================================
// TRANSFER BUFFER
// =============================================================================

/// Byte block sized by the worker and filled by the UI thread, used once.
///
/// Clones share the same block. Equality is identity of the block.
#[derive(Clone)]
pub struct TransferBuffer {
    bytes: Arc<[AtomicU8]>,
}

impl TransferBuffer {
    /// Zeroed buffer of `len` bytes.
    pub fn new(len: usize) -> Self {
        Self {
            bytes: (0..len).map(|_| AtomicU8::new(0)).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Copy `data` into the buffer at `offset`. UI-thread side.
    pub fn write_at(&self, offset: usize, data: &[u8]) -> Result<(), MailboxError> {
        let overflow = MailboxError::TransferOverflow {
            offset,
            len: data.len(),
            capacity: self.len(),
        };
        let end = offset.checked_add(data.len()).ok_or(overflow)?;
        let Some(dst) = self.bytes.get(offset..end) else {
            return Err(overflow);
        };
        for (slot, &byte) in dst.iter().zip(data) {
            slot.store(byte, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Snapshot of the contents. Worker side, after OPEN_FILE_WRITE_COMPLETE.
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.iter().map(|b| b.load(Ordering::Relaxed)).collect()
    }
}

impl PartialEq for TransferBuffer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }
}

impl Eq for TransferBuffer {}

impl fmt::Debug for TransferBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferBuffer")
            .field("len", &self.len())
            .finish()
    }
}

// =============================================================================
// HANDSHAKE STATE MACHINE
// =============================================================================

/// What the worker remembers between request and write completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFileContext {
    pub file_name: String,
    pub buffer: TransferBuffer,
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Idle,
    AwaitingWrite(OpenFileContext),
}

/// Open-file handshake tracker. Present context iff between request and completion.
#[derive(Debug, Default)]
pub struct OpenFileHandshake {
    state: State,
}

impl OpenFileHandshake {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle)
    }

    /// Context of the handshake in flight, if any.
    pub fn pending(&self) -> Option<&OpenFileContext> {
        match &self.state {
            State::Idle => None,
            State::AwaitingWrite(ctx) => Some(ctx),
        }
    }

    /// Handle OPEN_FILE_REQUEST: allocate the transfer buffer and await the write.
    pub fn begin(
        &mut self,
        file_name: &str,
        file_size: u32,
    ) -> Result<TransferBuffer, ProtocolViolation> {
        if let State::AwaitingWrite(ctx) = &self.state {
            return Err(ProtocolViolation::OpenFileRequestWhileAwaitingWrite {
                pending: ctx.file_name.clone(),
            });
        }
        let buffer = TransferBuffer::new(file_size as usize);
        self.state = State::AwaitingWrite(OpenFileContext {
            file_name: file_name.to_owned(),
            buffer: buffer.clone(),
        });
        Ok(buffer)
    }

    /// Handle OPEN_FILE_WRITE_COMPLETE: hand back the context and return to idle.
    pub fn complete(&mut self) -> Result<OpenFileContext, ProtocolViolation> {
        match std::mem::take(&mut self.state) {
            State::AwaitingWrite(ctx) => Ok(ctx),
            State::Idle => Err(ProtocolViolation::WriteCompleteWithoutContext),
        }
    }
}
