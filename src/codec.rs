//! Mailbox wire format: status tags, typed event records, text payloads.
//!
//! Word layout (one word = 4 bytes):
//!
//! ```text
//! [0] status tag: 0=NONE 1=KEY 2=RESIZE 3=OPEN_FILE_REQUEST 4=OPEN_FILE_WRITE_COMPLETE
//! KEY:                      [1]keyCode [2]ctrl [3]shift [4]alt [5]meta [6]len [7..]codeUnits
//! RESIZE:                   [1]width [2]height
//! OPEN_FILE_REQUEST:        [1]fileSize [2]len [3..]codeUnits(filename)
//! OPEN_FILE_WRITE_COMPLETE: (empty)
//! ```
//!
//! The format is closed and versionless. Fields are read positionally, so both
//! sides must agree on order and width per tag. Every read is bound-checked
//! against the mailbox capacity; overruns become
//! [`ProtocolViolation::MalformedPayload`].
//!
//! Text payloads are one UTF-16 code unit per word. Words are truncated to
//! 16 bits and the units decoded as UTF-16, so a surrogate pair split across
//! two words reassembles into one character while an unpaired surrogate
//! decodes to U+FFFD.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::ProtocolViolation;

// =============================================================================
// STATUS TAGS
// =============================================================================

pub const STATUS_EVENT_NOT_SET: u32 = 0;
pub const STATUS_EVENT_KEY: u32 = 1;
pub const STATUS_EVENT_RESIZE: u32 = 2;
pub const STATUS_EVENT_OPEN_FILE_REQUEST: u32 = 3;
pub const STATUS_EVENT_OPEN_FILE_WRITE_COMPLETE: u32 = 4;

/// Value of mailbox word 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum EventTag {
    None = STATUS_EVENT_NOT_SET,
    Key = STATUS_EVENT_KEY,
    Resize = STATUS_EVENT_RESIZE,
    OpenFileRequest = STATUS_EVENT_OPEN_FILE_REQUEST,
    OpenFileWriteComplete = STATUS_EVENT_OPEN_FILE_WRITE_COMPLETE,
}

impl TryFrom<u32> for EventTag {
    type Error = ProtocolViolation;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            STATUS_EVENT_NOT_SET => Ok(Self::None),
            STATUS_EVENT_KEY => Ok(Self::Key),
            STATUS_EVENT_RESIZE => Ok(Self::Resize),
            STATUS_EVENT_OPEN_FILE_REQUEST => Ok(Self::OpenFileRequest),
            STATUS_EVENT_OPEN_FILE_WRITE_COMPLETE => Ok(Self::OpenFileWriteComplete),
            other => Err(ProtocolViolation::UnknownTag(other)),
        }
    }
}

impl EventTag {
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Key => "KEY",
            Self::Resize => "RESIZE",
            Self::OpenFileRequest => "OPEN_FILE_REQUEST",
            Self::OpenFileWriteComplete => "OPEN_FILE_WRITE_COMPLETE",
        }
    }
}

// =============================================================================
// WORD SOURCES
// =============================================================================

/// Read-only view of a block of 32-bit words.
///
/// Implemented for plain slices (tests, encoders) and for the shared atomic
/// block the mailbox owns.
pub trait WordSource {
    fn word_count(&self) -> usize;

    /// Word at `index`. Callers guarantee `index < word_count()`.
    fn word(&self, index: usize) -> u32;
}

impl WordSource for [u32] {
    #[inline]
    fn word_count(&self) -> usize {
        self.len()
    }

    #[inline]
    fn word(&self, index: usize) -> u32 {
        self[index]
    }
}

impl WordSource for [AtomicU32] {
    #[inline]
    fn word_count(&self) -> usize {
        self.len()
    }

    // Payload words are published by the Release store of the status word and
    // observed after its Acquire load, so Relaxed is enough here.
    #[inline]
    fn word(&self, index: usize) -> u32 {
        self[index].load(Ordering::Relaxed)
    }
}

// =============================================================================
// TEXT PAYLOADS
// =============================================================================

/// Encode `text` as a length word followed by one word per UTF-16 code unit.
pub fn encode_text(text: &str) -> Vec<u32> {
    let units: Vec<u16> = text.encode_utf16().collect();
    let mut words = Vec::with_capacity(units.len() + 1);
    words.push(units.len() as u32);
    words.extend(units.into_iter().map(u32::from));
    words
}

/// Decode a text payload starting at `cursor`.
///
/// Returns the cursor advanced by exactly `1 + n` words together with the text.
pub fn decode_text<S>(buffer: &S, cursor: usize) -> Result<(usize, String), ProtocolViolation>
where
    S: WordSource + ?Sized,
{
    let mut reader = WordReader::new(buffer, cursor, "text");
    let text = reader.text()?;
    Ok((reader.position(), text))
}

/// Positional reader with bounds checking.
struct WordReader<'a, S: ?Sized> {
    src: &'a S,
    pos: usize,
    tag: &'static str,
}

impl<'a, S: WordSource + ?Sized> WordReader<'a, S> {
    fn new(src: &'a S, pos: usize, tag: &'static str) -> Self {
        Self { src, pos, tag }
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn malformed(&self, needed: usize) -> ProtocolViolation {
        ProtocolViolation::MalformedPayload {
            tag: self.tag,
            needed,
            capacity: self.src.word_count(),
        }
    }

    fn u32(&mut self) -> Result<u32, ProtocolViolation> {
        if self.pos >= self.src.word_count() {
            return Err(self.malformed(self.pos + 1));
        }
        let value = self.src.word(self.pos);
        self.pos += 1;
        Ok(value)
    }

    fn flag(&mut self) -> Result<bool, ProtocolViolation> {
        Ok(self.u32()? != 0)
    }

    fn text(&mut self) -> Result<String, ProtocolViolation> {
        let len = self.u32()? as usize;
        let end = self
            .pos
            .checked_add(len)
            .ok_or_else(|| self.malformed(usize::MAX))?;
        if end > self.src.word_count() {
            return Err(self.malformed(end));
        }
        let units: Vec<u16> = (self.pos..end).map(|i| self.src.word(i) as u16).collect();
        self.pos = end;
        Ok(String::from_utf16_lossy(&units))
    }
}

// =============================================================================
// EVENTS
// =============================================================================

/// Keydown payload, forwarded verbatim to the native keydown entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: String,
    pub key_code: u32,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyEvent {
    /// Unmodified key.
    pub fn plain(key: impl Into<String>, key_code: u32) -> Self {
        Self {
            key: key.into(),
            key_code,
            ctrl: false,
            shift: false,
            alt: false,
            meta: false,
        }
    }
}

/// One decoded mailbox event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailboxEvent {
    Key(KeyEvent),
    Resize { width: u32, height: u32 },
    OpenFileRequest { file_size: u32, file_name: String },
    OpenFileWriteComplete,
}

impl MailboxEvent {
    pub fn tag(&self) -> EventTag {
        match self {
            Self::Key(_) => EventTag::Key,
            Self::Resize { .. } => EventTag::Resize,
            Self::OpenFileRequest { .. } => EventTag::OpenFileRequest,
            Self::OpenFileWriteComplete => EventTag::OpenFileWriteComplete,
        }
    }

    /// Decode the event announced by `status`, reading payload from word 1 on.
    ///
    /// Returns `Ok(None)` for the NONE status.
    pub fn decode<S>(status: u32, words: &S) -> Result<Option<Self>, ProtocolViolation>
    where
        S: WordSource + ?Sized,
    {
        let tag = EventTag::try_from(status)?;
        let mut r = WordReader::new(words, 1, tag.name());
        let event = match tag {
            EventTag::None => return Ok(None),
            EventTag::Key => {
                let key_code = r.u32()?;
                let ctrl = r.flag()?;
                let shift = r.flag()?;
                let alt = r.flag()?;
                let meta = r.flag()?;
                let key = r.text()?;
                Self::Key(KeyEvent {
                    key,
                    key_code,
                    ctrl,
                    shift,
                    alt,
                    meta,
                })
            }
            EventTag::Resize => {
                let width = r.u32()?;
                let height = r.u32()?;
                Self::Resize { width, height }
            }
            EventTag::OpenFileRequest => {
                let file_size = r.u32()?;
                let file_name = r.text()?;
                Self::OpenFileRequest {
                    file_size,
                    file_name,
                }
            }
            EventTag::OpenFileWriteComplete => Self::OpenFileWriteComplete,
        };
        Ok(Some(event))
    }

    /// Encode as a full mailbox frame, status tag at index 0.
    pub fn encode(&self) -> Vec<u32> {
        let mut words = vec![self.tag() as u32];
        match self {
            Self::Key(key) => {
                words.extend([
                    key.key_code,
                    u32::from(key.ctrl),
                    u32::from(key.shift),
                    u32::from(key.alt),
                    u32::from(key.meta),
                ]);
                words.extend(encode_text(&key.key));
            }
            Self::Resize { width, height } => words.extend([*width, *height]),
            Self::OpenFileRequest {
                file_size,
                file_name,
            } => {
                words.push(*file_size);
                words.extend(encode_text(file_name));
            }
            Self::OpenFileWriteComplete => {}
        }
        words
    }
}
