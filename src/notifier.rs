//! One-way notifications from the worker to the UI thread.
//!
//! Ordered, unacknowledged, never blocking: backed by an unbounded mpsc
//! channel. A hung-up receiver is logged once and further sends are dropped.
//!
//! `Started` goes out at most once and `Exited` is the last notification;
//! anything that would break either rule is dropped with a warning.

use std::sync::mpsc::{self, Receiver, Sender};

use bitflags::bitflags;
use tracing::warn;

use crate::handshake::TransferBuffer;

// =============================================================================
// DRAW COMMANDS
// =============================================================================

bitflags! {
    /// Text decoration flags for [`DrawCommand::DrawText`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextStyle: u8 {
        const BOLD      = 0b0000_0001;
        const UNDERLINE = 0b0000_0010;
        const UNDERCURL = 0b0000_0100;
        const STRIKE    = 0b0000_1000;
    }
}

impl TextStyle {
    /// Build from the callout's four nonzero-is-true words.
    pub fn from_flags(bold: bool, underline: bool, undercurl: bool, strike: bool) -> Self {
        let mut style = Self::empty();
        style.set(Self::BOLD, bold);
        style.set(Self::UNDERLINE, underline);
        style.set(Self::UNDERCURL, undercurl);
        style.set(Self::STRIKE, strike);
        style
    }
}

/// Opaque-to-the-worker payload forwarded to the rendering backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommand {
    SetColorFg(String),
    SetColorBg(String),
    SetColorSp(String),
    DrawRect {
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        color: String,
        filled: bool,
    },
    DrawText {
        text: String,
        char_height: i32,
        line_height: i32,
        char_width: i32,
        x: i32,
        y: i32,
        style: TextStyle,
    },
    SetFont {
        name: String,
        size: i32,
    },
    InvertRect {
        x: i32,
        y: i32,
        w: i32,
        h: i32,
    },
    ImageScroll {
        x: i32,
        src_y: i32,
        dst_y: i32,
        w: i32,
        h: i32,
    },
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Message from the worker to the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Draw(DrawCommand),
    /// Emitted once, after native initialization completes.
    Started,
    /// Terminal. Nothing follows.
    Exited { status: i32 },
    /// Transfer buffer for an open-file handshake, ready to be filled.
    FileBufferReady { name: String, buffer: TransferBuffer },
}

impl Notification {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Draw(_) => "draw",
            Self::Started => "started",
            Self::Exited { .. } => "exited",
            Self::FileBufferReady { .. } => "fileBufferReady",
        }
    }
}

/// Sending half, owned by the worker runtime.
#[derive(Debug)]
pub struct Notifier {
    tx: Sender<Notification>,
    hung_up: bool,
    started: bool,
    exited: bool,
}

impl Notifier {
    /// Create a connected notifier / receiver pair.
    pub fn channel() -> (Self, Receiver<Notification>) {
        let (tx, rx) = mpsc::channel();
        (Self::new(tx), rx)
    }

    pub fn new(tx: Sender<Notification>) -> Self {
        Self {
            tx,
            hung_up: false,
            started: false,
            exited: false,
        }
    }

    /// True once `Exited` has been sent.
    pub fn is_closed(&self) -> bool {
        self.exited
    }

    /// Fire and forget.
    pub fn send(&mut self, notification: Notification) {
        if self.hung_up {
            return;
        }
        let kind = notification.kind();
        if self.exited {
            warn!(kind, "notification after exited; dropped");
            return;
        }
        match notification {
            Notification::Started if self.started => {
                warn!("duplicate started notification; dropped");
                return;
            }
            Notification::Started => self.started = true,
            Notification::Exited { .. } => self.exited = true,
            _ => {}
        }
        if self.tx.send(notification).is_err() {
            warn!(kind, "UI thread hung up; dropping notifications from now on");
            self.hung_up = true;
        }
    }

    pub fn draw(&mut self, command: DrawCommand) {
        self.send(Notification::Draw(command));
    }
}
