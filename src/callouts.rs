//! The two narrow surfaces between this layer and the legacy program.
//!
//! ```text
//!   legacy program ──── Callouts ────▶ worker runtime   (draw, query, block)
//!   legacy program ◀── NativeEntryPoints ── worker runtime   (run, key, resize, drop)
//! ```
//!
//! The legacy program receives the runtime as `&mut dyn Callouts` when its
//! main entry point runs and calls back into it synchronously. Its only way to
//! yield is [`Callouts::wait_for_event`], during which the runtime may call the
//! keydown, resize and drop entry points. Entry points therefore take `&self`;
//! implementations keep their mutable state behind `Cell`/`RefCell`.

use std::path::Path;

use crate::codec::KeyEvent;
use crate::error::WorkerError;
use crate::notifier::TextStyle;

/// Arguments of the `open_dialog` callout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogRequest {
    pub kind: i32,
    pub title: String,
    pub message: String,
    pub buttons: String,
    pub default_button: i32,
    pub text_field: String,
}

/// Arguments of the `draw_text` callout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRun<'a> {
    pub text: &'a str,
    pub char_height: i32,
    pub line_height: i32,
    pub char_width: i32,
    pub x: i32,
    pub y: i32,
    pub style: TextStyle,
}

/// Services the legacy program requests from this layer.
pub trait Callouts {
    fn call_shell(&mut self, command: &str);

    /// Native initialization finished. Emits `started`.
    fn will_init(&mut self);

    /// The program is about to exit with `status`. Emits `exited`.
    ///
    /// The program then unwinds with `Err(WorkerError::Exit(status))`.
    fn will_exit(&mut self, status: i32);

    fn resize(&mut self, width: i32, height: i32);

    fn is_font_available(&mut self, name: &str) -> bool;

    fn is_supported_key(&mut self, name: &str) -> bool;

    /// Index of the pressed button.
    fn open_dialog(&mut self, dialog: &DialogRequest) -> i32;

    fn mouse_x(&mut self) -> i32;

    fn mouse_y(&mut self) -> i32;

    fn set_title(&mut self, title: &str);

    fn set_fg_color(&mut self, name: &str);

    fn set_bg_color(&mut self, name: &str);

    fn set_sp_color(&mut self, name: &str);

    /// Cached UI width, no round trip.
    fn dom_width(&self) -> u32;

    /// Cached UI height, no round trip.
    fn dom_height(&self) -> u32;

    fn draw_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: &str, filled: bool);

    fn draw_text(&mut self, run: &TextRun<'_>);

    fn set_font(&mut self, name: &str, size: i32);

    fn invert_rect(&mut self, x: i32, y: i32, w: i32, h: i32);

    fn scroll_image(&mut self, x: i32, src_y: i32, dst_y: i32, w: i32, h: i32);

    /// Block for the next event. A non-positive timeout blocks indefinitely.
    ///
    /// Returns elapsed milliseconds.
    fn wait_for_event(&mut self, timeout_ms: i32) -> Result<i32, WorkerError>;
}

/// Entry points of the legacy program, called by the worker runtime.
pub trait NativeEntryPoints {
    /// Run the program to completion.
    fn run_main(&self, host: &mut dyn Callouts) -> Result<(), WorkerError>;

    fn resize_shell(&self, width: u32, height: u32);

    fn handle_keydown(&self, key: &KeyEvent);

    fn handle_drop(&self, path: &Path);
}
