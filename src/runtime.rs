//! Worker runtime: owns the mailbox end, runs the wait loop, dispatches events.
//!
//! ```text
//! start(request) ─▶ program.run_main(&mut runtime)
//!                        │
//!                        ├─ draw / query callouts ─▶ notifier / cached state
//!                        │
//!                        └─ wait_for_event(timeout)
//!                               │ mailbox.wait_for_status
//!                               ▼
//!                           decode ─▶ dispatch
//!                                      ├─ KEY ──────────────▶ program.handle_keydown
//!                                      ├─ RESIZE ───────────▶ cache dims, program.resize_shell
//!                                      ├─ OPEN_FILE_REQUEST ▶ handshake.begin, fileBufferReady
//!                                      └─ WRITE_COMPLETE ───▶ handshake.complete, vfs, program.handle_drop
//!                               │
//!                           mailbox.clear
//! ```
//!
//! All state here is mutated by the worker thread only.

use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{Dispatch, debug, error, info};

use crate::callouts::{Callouts, DialogRequest, NativeEntryPoints, TextRun};
use crate::codec::MailboxEvent;
use crate::error::{ProtocolViolation, WorkerError};
use crate::handshake::OpenFileHandshake;
use crate::mailbox::MailboxHandle;
use crate::notifier::{DrawCommand, Notification, Notifier};
use crate::vfs::{self, DirFs, MemoryFs, VirtualFs};

/// Debug diagnostics, emitted only when the start request asked for them.
macro_rules! verbose {
    ($rt:expr, $($arg:tt)+) => {
        if $rt.verbose {
            debug!($($arg)+);
        }
    };
}

// =============================================================================
// CONFIGURATION & CONTROL MESSAGES
// =============================================================================

/// Fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// Logging sink the legacy program runs under. `None` keeps the thread's default.
    pub dispatch: Option<Dispatch>,
    /// Host directory backing the virtual filesystem. `None` keeps files in memory.
    pub fs_root: Option<PathBuf>,
}

/// The one-shot `start` control message from the UI thread.
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub dom_width: u32,
    pub dom_height: u32,
    pub mailbox: MailboxHandle,
    pub debug: bool,
}

/// How the legacy program finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Intentional exit via `will_exit` + [`WorkerError::Exit`].
    Exited(i32),
    /// `run_main` returned without exiting.
    Returned,
}

// =============================================================================
// RUNTIME
// =============================================================================

pub struct WorkerRuntime<P: NativeEntryPoints> {
    program: Rc<P>,
    notifier: Notifier,
    fs: Box<dyn VirtualFs>,
    dispatch: Option<Dispatch>,
    mailbox: Option<MailboxHandle>,
    dom_width: u32,
    dom_height: u32,
    started: bool,
    verbose: bool,
    handshake: OpenFileHandshake,
}

impl<P: NativeEntryPoints> WorkerRuntime<P> {
    pub fn new(program: P, notifier: Notifier, config: RuntimeConfig) -> Self {
        let fs: Box<dyn VirtualFs> = match config.fs_root {
            Some(root) => Box::new(DirFs::new(root)),
            None => Box::new(MemoryFs::new()),
        };
        Self {
            program: Rc::new(program),
            notifier,
            fs,
            dispatch: config.dispatch,
            mailbox: None,
            dom_width: 0,
            dom_height: 0,
            started: false,
            verbose: false,
            handshake: OpenFileHandshake::new(),
        }
    }

    pub fn program(&self) -> &P {
        &self.program
    }

    pub fn fs(&self) -> &dyn VirtualFs {
        self.fs.as_ref()
    }

    pub fn handshake(&self) -> &OpenFileHandshake {
        &self.handshake
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Cached UI dimensions.
    pub fn dom_size(&self) -> (u32, u32) {
        (self.dom_width, self.dom_height)
    }

    /// Handle the `start` message: record dimensions and mailbox, then run the
    /// legacy program to completion. Single use.
    pub fn start(&mut self, request: StartRequest) -> Result<Termination, WorkerError> {
        if self.started {
            error!("start requested while already running");
            return Err(ProtocolViolation::AlreadyRunning.into());
        }
        self.started = true;
        self.dom_width = request.dom_width;
        self.dom_height = request.dom_height;
        self.mailbox = Some(request.mailbox);
        self.verbose = request.debug;

        match self.dispatch.clone() {
            Some(dispatch) => tracing::dispatcher::with_default(&dispatch, || self.run()),
            None => self.run(),
        }
    }

    fn run(&mut self) -> Result<Termination, WorkerError> {
        info!(
            width = self.dom_width,
            height = self.dom_height,
            "starting legacy program"
        );
        let program = Rc::clone(&self.program);
        match program.run_main(self) {
            Ok(()) => Ok(Termination::Returned),
            Err(WorkerError::Exit(status)) => {
                info!(status, "program terminated with status");
                Ok(Termination::Exited(status))
            }
            Err(e) => {
                error!(error = %e, "worker stopped on fatal error");
                Err(e)
            }
        }
    }

    // =========================================================================
    // WAIT LOOP
    // =========================================================================

    /// Block until an event arrives or `timeout` expires, handling at most one event.
    ///
    /// Returns wall-clock time spent. An already-pending event is handled
    /// without blocking. `None` or a zero timeout waits indefinitely.
    pub fn wait_for_event(&mut self, timeout: Option<Duration>) -> Result<Duration, WorkerError> {
        let mailbox: MailboxHandle = self
            .mailbox
            .as_ref()
            .map(Arc::clone)
            .ok_or(ProtocolViolation::NotStarted)?;
        verbose!(self, ?timeout, "waiting for event from main");

        let start = Instant::now();
        let Some(status) = mailbox.wait_for_status(timeout) else {
            let elapsed = start.elapsed();
            verbose!(self, ?timeout, ?elapsed, "no event before timeout");
            return Ok(elapsed);
        };

        if let Some(event) = MailboxEvent::decode(status, mailbox.words())? {
            self.dispatch_event(event)?;
        }
        mailbox.clear();

        let elapsed = start.elapsed();
        verbose!(self, ?elapsed, status, "event handled");
        Ok(elapsed)
    }

    /// Route one decoded event to worker state, a native entry point, or the handshake.
    pub fn dispatch_event(&mut self, event: MailboxEvent) -> Result<(), WorkerError> {
        match event {
            MailboxEvent::Key(key) => {
                self.program.handle_keydown(&key);
                verbose!(
                    self,
                    key = %key.key,
                    key_code = key.key_code,
                    ctrl = key.ctrl,
                    shift = key.shift,
                    alt = key.alt,
                    meta = key.meta,
                    "key event handled"
                );
            }
            MailboxEvent::Resize { width, height } => {
                self.dom_width = width;
                self.dom_height = height;
                self.program.resize_shell(width, height);
                verbose!(self, width, height, "resize event handled");
            }
            MailboxEvent::OpenFileRequest {
                file_size,
                file_name,
            } => {
                let buffer = self.handshake.begin(&file_name, file_size)?;
                verbose!(self, file = %file_name, file_size, "open file request, buffer allocated");
                self.notifier.send(Notification::FileBufferReady {
                    name: file_name,
                    buffer,
                });
            }
            MailboxEvent::OpenFileWriteComplete => {
                let ctx = self.handshake.complete()?;
                let path = vfs::virtual_path(&ctx.file_name);
                self.fs.write_file(&path, &ctx.buffer.to_vec())?;
                verbose!(
                    self,
                    path = %path.display(),
                    bytes = ctx.buffer.len(),
                    "created file on virtual filesystem"
                );
                self.program.handle_drop(&path);
            }
        }
        Ok(())
    }
}

// =============================================================================
// CALLOUT SURFACE
// =============================================================================

impl<P: NativeEntryPoints> Callouts for WorkerRuntime<P> {
    fn call_shell(&mut self, command: &str) {
        verbose!(self, command, "call_shell");
    }

    fn will_init(&mut self) {
        self.notifier.send(Notification::Started);
    }

    fn will_exit(&mut self, status: i32) {
        self.notifier.send(Notification::Exited { status });
    }

    fn resize(&mut self, width: i32, height: i32) {
        verbose!(self, width, height, "resize");
    }

    // Font is fixed to monospace on the UI side.
    fn is_font_available(&mut self, name: &str) -> bool {
        verbose!(self, name, "is_font");
        true
    }

    fn is_supported_key(&mut self, name: &str) -> bool {
        verbose!(self, name, "is_supported_key");
        true
    }

    // No dialog UI; report the first button.
    fn open_dialog(&mut self, dialog: &DialogRequest) -> i32 {
        verbose!(self, ?dialog, "open_dialog");
        0
    }

    // The pointer position cannot be read from the worker without a round trip.
    fn mouse_x(&mut self) -> i32 {
        0
    }

    fn mouse_y(&mut self) -> i32 {
        0
    }

    fn set_title(&mut self, title: &str) {
        verbose!(self, title, "set_title");
    }

    fn set_fg_color(&mut self, name: &str) {
        self.notifier.draw(DrawCommand::SetColorFg(name.to_owned()));
    }

    fn set_bg_color(&mut self, name: &str) {
        self.notifier.draw(DrawCommand::SetColorBg(name.to_owned()));
    }

    fn set_sp_color(&mut self, name: &str) {
        self.notifier.draw(DrawCommand::SetColorSp(name.to_owned()));
    }

    fn dom_width(&self) -> u32 {
        self.dom_width
    }

    fn dom_height(&self) -> u32 {
        self.dom_height
    }

    fn draw_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: &str, filled: bool) {
        self.notifier.draw(DrawCommand::DrawRect {
            x,
            y,
            w,
            h,
            color: color.to_owned(),
            filled,
        });
    }

    fn draw_text(&mut self, run: &TextRun<'_>) {
        self.notifier.draw(DrawCommand::DrawText {
            text: run.text.to_owned(),
            char_height: run.char_height,
            line_height: run.line_height,
            char_width: run.char_width,
            x: run.x,
            y: run.y,
            style: run.style,
        });
    }

    fn set_font(&mut self, name: &str, size: i32) {
        self.notifier.draw(DrawCommand::SetFont {
            name: name.to_owned(),
            size,
        });
    }

    fn invert_rect(&mut self, x: i32, y: i32, w: i32, h: i32) {
        self.notifier.draw(DrawCommand::InvertRect { x, y, w, h });
    }

    fn scroll_image(&mut self, x: i32, src_y: i32, dst_y: i32, w: i32, h: i32) {
        self.notifier.draw(DrawCommand::ImageScroll {
            x,
            src_y,
            dst_y,
            w,
            h,
        });
    }

    fn wait_for_event(&mut self, timeout_ms: i32) -> Result<i32, WorkerError> {
        let timeout = u64::try_from(timeout_ms)
            .ok()
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis);
        let elapsed = WorkerRuntime::wait_for_event(self, timeout)?;
        Ok(i32::try_from(elapsed.as_millis()).unwrap_or(i32::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{KeyEvent, encode_text};
    use crate::mailbox::SharedMailbox;
    use crate::notifier::TextStyle;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};
    use std::sync::mpsc::Receiver;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Resize(u32, u32),
        Key(KeyEvent),
        Drop(PathBuf),
    }

    type Script = Box<dyn Fn(&mut dyn Callouts) -> Result<(), WorkerError>>;

    struct FakeProgram {
        calls: RefCell<Vec<Call>>,
        script: Script,
    }

    impl FakeProgram {
        fn new(script: impl Fn(&mut dyn Callouts) -> Result<(), WorkerError> + 'static) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                script: Box::new(script),
            }
        }

        fn idle() -> Self {
            Self::new(|_| Ok(()))
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }
    }

    impl NativeEntryPoints for FakeProgram {
        fn run_main(&self, host: &mut dyn Callouts) -> Result<(), WorkerError> {
            (self.script)(host)
        }

        fn resize_shell(&self, width: u32, height: u32) {
            self.calls.borrow_mut().push(Call::Resize(width, height));
        }

        fn handle_keydown(&self, key: &KeyEvent) {
            self.calls.borrow_mut().push(Call::Key(key.clone()));
        }

        fn handle_drop(&self, path: &Path) {
            self.calls.borrow_mut().push(Call::Drop(path.to_path_buf()));
        }
    }

    fn started_runtime(
        program: FakeProgram,
    ) -> (WorkerRuntime<FakeProgram>, MailboxHandle, Receiver<Notification>) {
        let (notifier, rx) = Notifier::channel();
        let mut rt = WorkerRuntime::new(program, notifier, RuntimeConfig::default());
        let mailbox = SharedMailbox::shared(64);
        let outcome = rt
            .start(StartRequest {
                dom_width: 800,
                dom_height: 600,
                mailbox: Arc::clone(&mailbox),
                debug: true,
            })
            .unwrap();
        assert_eq!(outcome, Termination::Returned);
        (rt, mailbox, rx)
    }

    #[test]
    fn test_start_records_dimensions() {
        let (rt, _mb, _rx) = started_runtime(FakeProgram::idle());
        assert!(rt.is_started());
        assert_eq!(rt.dom_size(), (800, 600));
    }

    #[test]
    fn test_start_twice_is_already_running() {
        let (mut rt, _mb, _rx) = started_runtime(FakeProgram::idle());
        let err = rt
            .start(StartRequest {
                dom_width: 1,
                dom_height: 1,
                mailbox: SharedMailbox::shared(4),
                debug: false,
            })
            .unwrap_err();
        assert!(matches!(
            err,
            WorkerError::Protocol(ProtocolViolation::AlreadyRunning)
        ));
        // First start's state is untouched.
        assert_eq!(rt.dom_size(), (800, 600));
    }

    #[test]
    fn test_wait_before_start_is_violation() {
        let (notifier, _rx) = Notifier::channel();
        let mut rt = WorkerRuntime::new(FakeProgram::idle(), notifier, RuntimeConfig::default());
        assert!(matches!(
            rt.wait_for_event(Some(Duration::from_millis(1))),
            Err(WorkerError::Protocol(ProtocolViolation::NotStarted))
        ));
    }

    #[test]
    fn test_resize_event() {
        let (mut rt, mb, _rx) = started_runtime(FakeProgram::idle());
        mb.try_post(&[2, 640, 480]).unwrap();

        rt.wait_for_event(None).unwrap();

        assert_eq!(rt.dom_size(), (640, 480));
        assert_eq!(Callouts::dom_width(&rt), 640);
        assert_eq!(Callouts::dom_height(&rt), 480);
        assert_eq!(rt.program().calls(), vec![Call::Resize(640, 480)]);
        assert_eq!(mb.status(), 0);
    }

    #[test]
    fn test_key_event_enter() {
        let (mut rt, mb, _rx) = started_runtime(FakeProgram::idle());
        mb.try_post(&[1, 13, 0, 0, 0, 0, 1, 13]).unwrap();

        rt.wait_for_event(None).unwrap();

        assert_eq!(
            rt.program().calls(),
            vec![Call::Key(KeyEvent::plain("\u{d}", 13))]
        );
        assert_eq!(mb.status(), 0);
    }

    #[test]
    fn test_pending_event_handled_without_blocking() {
        let (mut rt, mb, _rx) = started_runtime(FakeProgram::idle());
        mb.try_post(&[2, 10, 20]).unwrap();

        let elapsed = rt.wait_for_event(Some(Duration::from_secs(5))).unwrap();

        assert!(elapsed < Duration::from_millis(100));
        assert_eq!(rt.program().calls(), vec![Call::Resize(10, 20)]);
    }

    #[test]
    fn test_zero_timeout_waits_for_event() {
        let (mut rt, mb, _rx) = started_runtime(FakeProgram::idle());
        let producer = {
            let mb = Arc::clone(&mb);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(30));
                mb.try_post(&[2, 320, 200]).unwrap();
            })
        };

        let elapsed = rt.wait_for_event(Some(Duration::ZERO)).unwrap();
        producer.join().unwrap();

        assert!(elapsed >= Duration::from_millis(20));
        assert_eq!(rt.dom_size(), (320, 200));
        assert_eq!(rt.program().calls(), vec![Call::Resize(320, 200)]);
        assert_eq!(mb.status(), 0);
    }

    #[test]
    fn test_lifecycle_notifications_are_not_repeated() {
        let program = FakeProgram::new(|host| {
            host.will_init();
            host.will_init();
            host.will_exit(0);
            host.set_fg_color("#123456");
            host.will_exit(1);
            Err(WorkerError::Exit(0))
        });
        let (notifier, rx) = Notifier::channel();
        let mut rt = WorkerRuntime::new(program, notifier, RuntimeConfig::default());

        let outcome = rt
            .start(StartRequest {
                dom_width: 1,
                dom_height: 1,
                mailbox: SharedMailbox::shared(8),
                debug: false,
            })
            .unwrap();

        assert_eq!(outcome, Termination::Exited(0));
        let received: Vec<Notification> = rx.try_iter().collect();
        assert_eq!(
            received,
            vec![Notification::Started, Notification::Exited { status: 0 }]
        );
    }

    #[test]
    fn test_timeout_handles_nothing() {
        let (mut rt, mb, _rx) = started_runtime(FakeProgram::idle());

        let elapsed = rt.wait_for_event(Some(Duration::from_millis(15))).unwrap();

        assert!(elapsed >= Duration::from_millis(15));
        assert!(rt.program().calls().is_empty());
        assert_eq!(mb.status(), 0);
    }

    #[test]
    fn test_open_file_handshake() {
        let (mut rt, mb, rx) = started_runtime(FakeProgram::idle());
        let mut frame = vec![3, 1024];
        frame.extend(encode_text("a.txt"));
        mb.try_post(&frame).unwrap();

        rt.wait_for_event(None).unwrap();

        let Ok(Notification::FileBufferReady { name, buffer }) = rx.try_recv() else {
            panic!("expected fileBufferReady");
        };
        assert_eq!(name, "a.txt");
        assert_eq!(buffer.len(), 1024);
        assert!(!rt.handshake().is_idle());

        buffer.write_at(0, b"hello").unwrap();
        mb.try_post(&[4]).unwrap();
        rt.wait_for_event(None).unwrap();

        let path = PathBuf::from("/a.txt");
        let written = rt.fs().read_file(&path).unwrap();
        assert_eq!(written.len(), 1024);
        assert_eq!(&written[..5], b"hello");
        assert_eq!(rt.program().calls(), vec![Call::Drop(path)]);
        assert!(rt.handshake().is_idle());
    }

    #[test]
    fn test_write_complete_when_idle_is_fatal() {
        let (mut rt, mb, _rx) = started_runtime(FakeProgram::idle());
        mb.try_post(&[4]).unwrap();

        assert!(matches!(
            rt.wait_for_event(None),
            Err(WorkerError::Protocol(
                ProtocolViolation::WriteCompleteWithoutContext
            ))
        ));
        assert!(rt.program().calls().is_empty());
    }

    #[test]
    fn test_unknown_tag_is_fatal() {
        let (mut rt, mb, _rx) = started_runtime(FakeProgram::idle());
        mb.try_post(&[77]).unwrap();

        assert!(matches!(
            rt.wait_for_event(None),
            Err(WorkerError::Protocol(ProtocolViolation::UnknownTag(77)))
        ));
    }

    #[test]
    fn test_malformed_text_length_is_fatal() {
        let (mut rt, mb, _rx) = started_runtime(FakeProgram::idle());
        // Declared length runs far past the 64-word mailbox.
        mb.try_post(&[1, 65, 0, 0, 0, 0, 1000]).unwrap();

        assert!(matches!(
            rt.wait_for_event(None),
            Err(WorkerError::Protocol(
                ProtocolViolation::MalformedPayload { tag: "KEY", .. }
            ))
        ));
        assert!(rt.program().calls().is_empty());
    }

    #[test]
    fn test_lifecycle_notifications_and_exit() {
        let program = FakeProgram::new(|host| {
            host.will_init();
            host.set_fg_color("#000000");
            host.draw_rect(0, 0, 10, 10, "#ffffff", true);
            host.draw_text(&TextRun {
                text: "hi",
                char_height: 16,
                line_height: 18,
                char_width: 8,
                x: 1,
                y: 2,
                style: TextStyle::BOLD,
            });
            host.set_font("monospace", 12);
            host.invert_rect(1, 2, 3, 4);
            host.scroll_image(0, 10, 20, 30, 40);
            host.will_exit(3);
            Err(WorkerError::Exit(3))
        });
        let (notifier, rx) = Notifier::channel();
        let mut rt = WorkerRuntime::new(program, notifier, RuntimeConfig::default());

        let outcome = rt
            .start(StartRequest {
                dom_width: 1,
                dom_height: 1,
                mailbox: SharedMailbox::shared(8),
                debug: false,
            })
            .unwrap();

        assert_eq!(outcome, Termination::Exited(3));
        let received: Vec<Notification> = rx.try_iter().collect();
        assert_eq!(
            received,
            vec![
                Notification::Started,
                Notification::Draw(DrawCommand::SetColorFg("#000000".into())),
                Notification::Draw(DrawCommand::DrawRect {
                    x: 0,
                    y: 0,
                    w: 10,
                    h: 10,
                    color: "#ffffff".into(),
                    filled: true,
                }),
                Notification::Draw(DrawCommand::DrawText {
                    text: "hi".into(),
                    char_height: 16,
                    line_height: 18,
                    char_width: 8,
                    x: 1,
                    y: 2,
                    style: TextStyle::BOLD,
                }),
                Notification::Draw(DrawCommand::SetFont {
                    name: "monospace".into(),
                    size: 12,
                }),
                Notification::Draw(DrawCommand::InvertRect {
                    x: 1,
                    y: 2,
                    w: 3,
                    h: 4
                }),
                Notification::Draw(DrawCommand::ImageScroll {
                    x: 0,
                    src_y: 10,
                    dst_y: 20,
                    w: 30,
                    h: 40,
                }),
                Notification::Exited { status: 3 },
            ]
        );
    }

    #[test]
    fn test_placeholder_queries() {
        let program = FakeProgram::new(|host| {
            assert!(host.is_font_available("Courier"));
            assert!(host.is_supported_key("F13"));
            assert_eq!(host.open_dialog(&DialogRequest::default()), 0);
            assert_eq!(host.mouse_x(), 0);
            assert_eq!(host.mouse_y(), 0);
            assert_eq!(host.dom_width(), 320);
            assert_eq!(host.dom_height(), 240);
            host.set_title("title");
            host.call_shell("ls");
            host.resize(1, 2);
            Ok(())
        });
        let (notifier, rx) = Notifier::channel();
        let mut rt = WorkerRuntime::new(program, notifier, RuntimeConfig::default());
        rt.start(StartRequest {
            dom_width: 320,
            dom_height: 240,
            mailbox: SharedMailbox::shared(8),
            debug: true,
        })
        .unwrap();
        // Logging-only callouts notify nothing.
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_callout_wait_maps_non_positive_timeout_to_blocking() {
        let program = FakeProgram::new(|host| {
            // Pending event: a non-positive timeout must still handle it.
            let elapsed = host.wait_for_event(0)?;
            assert!(elapsed < 100);
            let elapsed = host.wait_for_event(-1)?;
            assert!(elapsed < 100);
            // Nothing pending: a positive timeout expires.
            let elapsed = host.wait_for_event(10)?;
            assert!(elapsed >= 10);
            Ok(())
        });
        let (notifier, _rx) = Notifier::channel();
        let mut rt = WorkerRuntime::new(program, notifier, RuntimeConfig::default());
        let mailbox = SharedMailbox::shared(8);
        mailbox.try_post(&[2, 5, 6]).unwrap();

        // Second event arrives from another thread once the first is consumed.
        let producer = {
            let mailbox = Arc::clone(&mailbox);
            std::thread::spawn(move || {
                while mailbox.try_post(&[2, 7, 8]).is_err() {
                    std::thread::yield_now();
                }
            })
        };

        rt.start(StartRequest {
            dom_width: 1,
            dom_height: 1,
            mailbox,
            debug: false,
        })
        .unwrap();
        producer.join().unwrap();
        assert_eq!(
            rt.program().calls(),
            vec![Call::Resize(5, 6), Call::Resize(7, 8)]
        );
    }

    #[test]
    fn test_protocol_error_propagates_out_of_start() {
        let program = FakeProgram::new(|host| {
            host.wait_for_event(0)?;
            Ok(())
        });
        let (notifier, _rx) = Notifier::channel();
        let mut rt = WorkerRuntime::new(program, notifier, RuntimeConfig::default());
        let mailbox = SharedMailbox::shared(8);
        mailbox.try_post(&[4]).unwrap();

        let err = rt
            .start(StartRequest {
                dom_width: 1,
                dom_height: 1,
                mailbox,
                debug: false,
            })
            .unwrap_err();
        assert!(!err.is_normal_termination());
    }

    #[test]
    fn test_dir_backed_fs() {
        let dir = tempfile::tempdir().unwrap();
        let (notifier, rx) = Notifier::channel();
        let config = RuntimeConfig {
            dispatch: None,
            fs_root: Some(dir.path().to_path_buf()),
        };
        let mut rt = WorkerRuntime::new(FakeProgram::idle(), notifier, config);
        let mailbox = SharedMailbox::shared(32);
        rt.start(StartRequest {
            dom_width: 1,
            dom_height: 1,
            mailbox: Arc::clone(&mailbox),
            debug: false,
        })
        .unwrap();

        let mut frame = vec![3, 3];
        frame.extend(encode_text("b.txt"));
        mailbox.try_post(&frame).unwrap();
        rt.wait_for_event(None).unwrap();
        let Ok(Notification::FileBufferReady { buffer, .. }) = rx.try_recv() else {
            panic!("expected fileBufferReady");
        };
        buffer.write_at(0, b"xyz").unwrap();
        mailbox.try_post(&[4]).unwrap();
        rt.wait_for_event(None).unwrap();

        assert_eq!(std::fs::read(dir.path().join("b.txt")).unwrap(), b"xyz");
    }
}
