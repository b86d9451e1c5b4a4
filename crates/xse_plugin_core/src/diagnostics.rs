//! Diagnostic log for post-mortem debugging of failed loads.
//!
//! Hosts load plugins long before anyone could attach a debugger, so every
//! handshake decision is written to a per-plugin log file, one timestamped and
//! indented line at a time, flushed immediately. Logging never fails: without a
//! stream every call is a no-op, and write errors are swallowed.
//!
//! Framework messages emitted through `tracing` anywhere in the crate can be
//! redirected into the same file with [`install_framework_redirect`].

use crate::platform::PlatformType;
use chrono::{DateTime, Local};
use std::fmt::{self, Write as _};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Spaces per indentation level.
pub const INDENT_WIDTH: usize = 4;

/// Receives mirrored lines for the host's own log.
pub type HostMirror = Arc<dyn Fn(&str) + Send + Sync>;

struct SinkState {
    platform: PlatformType,
    stream: Option<Box<dyn Write + Send>>,
    mirror: Option<HostMirror>,
    mirror_enabled: bool,
}

/// Shared handle to the process-wide log destination.
///
/// Cloning is cheap; every clone writes to the same stream.
#[derive(Clone)]
pub struct DiagnosticSink {
    state: Arc<Mutex<SinkState>>,
}

impl fmt::Debug for DiagnosticSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("DiagnosticSink")
            .field("platform", &state.platform)
            .field("active", &state.stream.is_some())
            .field("mirror_enabled", &state.mirror_enabled)
            .finish()
    }
}

impl DiagnosticSink {
    /// Creates a sink with no destination; it stays silent until one is attached.
    pub fn new(platform: PlatformType) -> Self {
        Self {
            state: Arc::new(Mutex::new(SinkState {
                platform,
                stream: None,
                mirror: None,
                mirror_enabled: false,
            })),
        }
    }

    pub fn with_stream<W: Write + Send + 'static>(platform: PlatformType, stream: W) -> Self {
        let sink = Self::new(platform);
        sink.attach(stream);
        sink
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn attach<W: Write + Send + 'static>(&self, stream: W) {
        self.lock().stream = Some(Box::new(stream));
    }

    /// Creates `path` (and its parent directories) and writes to it from now on.
    pub fn open_file(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        self.attach(file);
        Ok(())
    }

    pub fn detach(&self) {
        self.lock().stream = None;
    }

    pub fn is_active(&self) -> bool {
        self.lock().stream.is_some()
    }

    pub fn set_host_mirror(&self, mirror: HostMirror) {
        self.lock().mirror = Some(mirror);
    }

    /// Mirroring is only safe when the host ABI matches the compiled one exactly.
    pub fn set_mirror_enabled(&self, enabled: bool) {
        self.lock().mirror_enabled = enabled;
    }

    pub fn mirror_enabled(&self) -> bool {
        self.lock().mirror_enabled
    }

    /// Writes one line. `category` may be empty.
    pub fn log(&self, category: &str, message: &str, indent: usize) {
        if message.trim().is_empty() {
            return;
        }

        let mirror = {
            let mut state = self.lock();
            if let Some(stream) = state.stream.as_mut() {
                let line = format_line(Local::now(), category, message, indent);
                let _ = stream.write_all(line.as_bytes());
                let _ = stream.flush();
            }

            if state.mirror_enabled {
                state.mirror.clone().map(|mirror| (mirror, state.platform))
            } else {
                None
            }
        };

        // Called outside the lock so a mirror that logs cannot deadlock the sink.
        if let Some((mirror, platform)) = mirror {
            mirror(&format!("<{}> {}", platform.name(), message));
        }
    }
}

/// Renders `<indent>[YYYY-MM-DD HH:MM:SS:mmm] <category> message\n`.
pub fn format_line(timestamp: DateTime<Local>, category: &str, message: &str, indent: usize) -> String {
    let millis = timestamp.timestamp_subsec_millis().min(999);
    let mut line = String::with_capacity(message.len() + indent * INDENT_WIDTH + 40);

    line.extend(std::iter::repeat(' ').take(indent * INDENT_WIDTH));
    let _ = write!(line, "[{}:{:03}] ", timestamp.format("%Y-%m-%d %H:%M:%S"), millis);
    if !category.is_empty() {
        let _ = write!(line, "<{category}> ");
    }
    line.push_str(message);
    line.push('\n');
    line
}

/// Forwards `tracing` events into a [`DiagnosticSink`] as `Framework:<Level>` lines.
pub struct FrameworkLayer {
    sink: DiagnosticSink,
}

impl FrameworkLayer {
    pub fn new(sink: DiagnosticSink) -> Self {
        Self { sink }
    }
}

fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "Trace",
        Level::DEBUG => "Debug",
        Level::INFO => "Info",
        Level::WARN => "Warning",
        Level::ERROR => "Error",
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

impl<S: Subscriber> Layer<S> for FrameworkLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let category = format!("Framework:{}", level_name(event.metadata().level()));
        self.sink.log(&category, &format!("{}{}", visitor.message, visitor.fields), 0);
    }
}

/// Installs the process-wide subscriber that redirects framework messages into
/// `sink`. Returns `false` if a global subscriber already exists.
pub fn install_framework_redirect(sink: &DiagnosticSink, level: &str) -> bool {
    let filter = EnvFilter::try_new(level.to_ascii_lowercase()).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(FrameworkLayer::new(sink.clone()))
        .try_init()
        .is_ok()
}

/// In-memory stream for tests.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct MemoryLog(Arc<Mutex<Vec<u8>>>);

#[cfg(test)]
impl MemoryLog {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

#[cfg(test)]
impl Write for MemoryLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn fixed_time() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .unwrap()
            + chrono::Duration::milliseconds(42)
    }

    #[test]
    fn test_line_format() {
        assert_eq!(
            format_line(fixed_time(), "", "Initializing framework", 0),
            "[2024-03-09 14:05:07:042] Initializing framework\n"
        );
        assert_eq!(
            format_line(fixed_time(), "Compatibility", "mismatch", 2),
            "        [2024-03-09 14:05:07:042] <Compatibility> mismatch\n"
        );
    }

    #[test]
    fn test_sink_without_stream_is_silent() {
        let sink = DiagnosticSink::new(PlatformType::Skse64);
        assert!(!sink.is_active());
        sink.log("", "nothing happens", 3);
    }

    #[test]
    fn test_sink_writes_and_skips_blank_lines() {
        let log = MemoryLog::default();
        let sink = DiagnosticSink::with_stream(PlatformType::Obse, log.clone());

        sink.log("", "first", 0);
        sink.log("", "   ", 0);
        sink.log("Query", "second", 1);

        let lines = log.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] first"));
        assert!(lines[1].starts_with("    ["));
        assert!(lines[1].ends_with("<Query> second"));
    }

    #[test]
    fn test_mirror_only_when_enabled() {
        let mirrored = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = DiagnosticSink::new(PlatformType::Skse64);
        let target = mirrored.clone();
        sink.set_host_mirror(Arc::new(move |line: &str| target.lock().unwrap().push(line.to_string())));

        sink.log("", "suppressed", 0);
        sink.set_mirror_enabled(true);
        sink.log("", "delivered", 0);

        assert_eq!(*mirrored.lock().unwrap(), vec!["<SKSE64> delivered".to_string()]);
    }

    #[test]
    fn test_open_file_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("My Games").join("Oblivion").join("OBSE").join("Sample.log");

        let sink = DiagnosticSink::new(PlatformType::Obse);
        sink.open_file(&path).unwrap();
        sink.log("", "hello", 0);
        sink.detach();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.ends_with("] hello\n"));
        assert!(!sink.is_active());
    }

    #[test]
    fn test_framework_layer_formats_events() {
        let log = MemoryLog::default();
        let sink = DiagnosticSink::with_stream(PlatformType::F4se, log.clone());
        let subscriber = tracing_subscriber::registry().with(FrameworkLayer::new(sink));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(library = "dbghelp", "could not preload");
        });

        let contents = log.contents();
        assert!(contents.contains("<Framework:Warning> could not preload library=dbghelp"));
    }
}
