//! Shared event mailbox: a single-slot channel from the UI thread to the worker.
//!
//! Memory layout:
//!   - Word 0: status tag (see [`crate::codec`]), the only synchronizing word
//!   - Words 1..: payload of the pending event
//!
//! Protocol:
//!
//! ```text
//! UI thread (producer)                      Worker thread (consumer)
//! ────────────────────                      ────────────────────────
//! status == NONE ?  else Busy               wait_for_status(timeout)
//! write payload words 1..                     │ futex wait / park on word 0
//! store tag in word 0 (Release)  ──wake──▶    │
//!                                           load word 0 (Acquire), decode payload
//!                                           handle event
//! status == NONE again  ◀────────────────   store NONE in word 0 (Release)
//! ```
//!
//! Untimed waits block on word 0 with `atomic_wait::wait`. Timed waits park the
//! consumer thread with `thread::park_timeout`, since the futex wrapper has no
//! deadline. The producer signals both.
//!
//! The slot has one producer at a time: `try_post` claims a producer flag
//! before touching the payload, so a second concurrent producer is refused
//! instead of interleaving its words.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

use crate::codec::{MailboxEvent, STATUS_EVENT_NOT_SET};
use crate::error::MailboxError;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default mailbox size in words (512 bytes).
pub const DEFAULT_CAPACITY_WORDS: usize = 128;

/// Index of the status tag word.
pub const STATUS_WORD: usize = 0;

/// Shared handle passed in the start request.
pub type MailboxHandle = Arc<SharedMailbox>;

// =============================================================================
// SHARED MAILBOX
// =============================================================================

/// Fixed-capacity block of 32-bit words shared by one producer and one consumer.
#[derive(Debug)]
pub struct SharedMailbox {
    words: Box<[AtomicU32]>,
    /// Consumer thread currently in a timed wait, unparked by the producer.
    waiter: Mutex<Option<Thread>>,
    /// Held by a producer between its Busy check and its tag store.
    producing: AtomicBool,
}

impl SharedMailbox {
    /// Create a zeroed mailbox of `capacity_words` words (at least one, for the status).
    pub fn new(capacity_words: usize) -> Self {
        let words = (0..capacity_words.max(1)).map(|_| AtomicU32::new(0)).collect();
        Self {
            words,
            waiter: Mutex::new(None),
            producing: AtomicBool::new(false),
        }
    }

    /// Create a shareable mailbox of `capacity_words` words.
    pub fn shared(capacity_words: usize) -> MailboxHandle {
        Arc::new(Self::new(capacity_words))
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.words.len()
    }

    /// The whole block, status word included.
    #[inline]
    pub fn words(&self) -> &[AtomicU32] {
        &self.words
    }

    #[inline]
    fn status_word(&self) -> &AtomicU32 {
        &self.words[STATUS_WORD]
    }

    // =========================================================================
    // CONSUMER SIDE
    // =========================================================================

    /// Current status tag.
    #[inline]
    pub fn status(&self) -> u32 {
        self.status_word().load(Ordering::Acquire)
    }

    /// Release the slot back to the producer.
    #[inline]
    pub fn clear(&self) {
        self.status_word()
            .store(STATUS_EVENT_NOT_SET, Ordering::Release);
    }

    /// Block until the status word leaves NONE or `timeout` expires.
    ///
    /// Returns the pending status, or `None` on timeout. `None` or a zero
    /// timeout blocks indefinitely. Never clears the slot.
    pub fn wait_for_status(&self, timeout: Option<Duration>) -> Option<u32> {
        let status = self.status();
        if status != STATUS_EVENT_NOT_SET {
            return Some(status);
        }

        let Some(timeout) = timeout.filter(|t| !t.is_zero()) else {
            loop {
                atomic_wait::wait(self.status_word(), STATUS_EVENT_NOT_SET);
                let status = self.status();
                if status != STATUS_EVENT_NOT_SET {
                    return Some(status);
                }
            }
        };

        let deadline = Instant::now() + timeout;
        // Registered before the first status check so a post in between
        // leaves an unpark token behind.
        self.set_waiter(Some(thread::current()));
        let outcome = loop {
            let status = self.status();
            if status != STATUS_EVENT_NOT_SET {
                break Some(status);
            }
            let now = Instant::now();
            if now >= deadline {
                break None;
            }
            thread::park_timeout(deadline - now);
        };
        self.set_waiter(None);
        outcome
    }

    fn set_waiter(&self, waiter: Option<Thread>) {
        *self.waiter.lock().unwrap_or_else(PoisonError::into_inner) = waiter;
    }

    // =========================================================================
    // PRODUCER SIDE
    // =========================================================================

    /// Publish an encoded frame (status tag at index 0) and wake the consumer.
    ///
    /// Refuses with [`MailboxError::Busy`] while the previous event is still
    /// pending, and with [`MailboxError::Contended`] while another producer
    /// is mid-post. Never blocks.
    pub fn try_post(&self, frame: &[u32]) -> Result<(), MailboxError> {
        if frame.len() > self.capacity() {
            return Err(MailboxError::PayloadTooLarge {
                needed: frame.len(),
                capacity: self.capacity(),
            });
        }
        if self
            .producing
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(MailboxError::Contended);
        }
        let result = self.publish(frame);
        self.producing.store(false, Ordering::Release);
        result
    }

    /// Caller holds the producer flag.
    fn publish(&self, frame: &[u32]) -> Result<(), MailboxError> {
        let pending = self.status();
        if pending != STATUS_EVENT_NOT_SET {
            return Err(MailboxError::Busy { pending });
        }
        let Some((&tag, payload)) = frame.split_first() else {
            return Ok(());
        };

        for (slot, &word) in self.words[1..].iter().zip(payload) {
            slot.store(word, Ordering::Relaxed);
        }
        self.status_word().store(tag, Ordering::Release);
        self.notify();
        Ok(())
    }

    /// Encode and publish `event`.
    pub fn post(&self, event: &MailboxEvent) -> Result<(), MailboxError> {
        self.try_post(&event.encode())
    }

    fn notify(&self) {
        atomic_wait::wake_all(self.status_word());
        let waiter = self.waiter.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(waiter) = waiter.as_ref() {
            waiter.unpark();
        }
    }
}

impl Default for SharedMailbox {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY_WORDS)
    }
}
