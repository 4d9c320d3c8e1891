//! # vimwasm-worker
//!
//! Worker-thread runtime for a synchronous legacy editor whose only way to
//! yield is a blocking "wait for next input" call.
//!
//! The legacy program runs on a real worker thread. The UI thread, which must
//! never block, talks to it through a single-slot shared-memory mailbox; the
//! worker answers only through one-way notifications.
//!
//! ## Architecture
//!
//! ```text
//! UI thread (never blocks)                        Worker thread
//! ────────────────────────                        ─────────────
//!   UiPort ──writes payload, stores tag──▶ ┌───────────────────┐
//!                                          │   SharedMailbox   │  word 0 = status tag
//!                                          └─────────┬─────────┘  words 1.. = payload
//!                                                    │ wait_for_status (futex / park)
//!                                                    ▼
//!                                       WorkerRuntime::wait_for_event
//!                                          decode ─▶ dispatch ─▶ NativeEntryPoints
//!                                                        │
//!                                                        └─▶ OpenFileHandshake ─▶ VirtualFs
//!   WorkerHandle::notifications ◀── Notifier ◀── draw / started / exited / fileBufferReady
//! ```
//!
//! ## Modules
//!
//! - [`mailbox`] - Shared single-slot mailbox and its wait/signal protocol
//! - [`codec`] - Status tags, typed events, length-prefixed text payloads
//! - [`runtime`] - Wait loop, event dispatch, callout surface
//! - [`handshake`] - Two-phase open-file protocol and transfer buffer
//! - [`notifier`] - Outbound notifications and draw commands
//! - [`callouts`] - Traits between this layer and the legacy program
//! - [`vfs`] - Virtual filesystem for dropped files
//! - [`worker`] - Worker thread spawn and UI-side port
//! - [`logging`] - Diagnostics sink construction

pub mod callouts;
pub mod codec;
pub mod error;
pub mod handshake;
pub mod logging;
pub mod mailbox;
pub mod notifier;
pub mod runtime;
pub mod vfs;
pub mod worker;

pub use callouts::{Callouts, DialogRequest, NativeEntryPoints, TextRun};
pub use codec::{EventTag, KeyEvent, MailboxEvent, decode_text, encode_text};
pub use error::{MailboxError, ProtocolViolation, VfsError, WorkerError};
pub use handshake::{OpenFileHandshake, TransferBuffer};
pub use mailbox::{MailboxHandle, SharedMailbox};
pub use notifier::{DrawCommand, Notification, Notifier, TextStyle};
pub use runtime::{RuntimeConfig, StartRequest, Termination, WorkerRuntime};
pub use vfs::{DirFs, MemoryFs, VirtualFs};
pub use worker::{UiPort, WorkerHandle, spawn_worker};
