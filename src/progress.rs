use console::style;

/// Destination for operator-facing progress lines.
///
/// The managers never write to stdout directly; they emit through a sink so
/// the engine can run under tests (or a future daemon) without capturing
/// process streams. Diagnostics still go through `tracing`.
pub trait ProgressSink: Send + Sync {
    fn line(&self, message: &str);

    fn warn(&self, message: &str) {
        self.line(message);
    }

    fn success(&self, message: &str) {
        self.line(message);
    }
}

/// Console sink used by the CLI.
pub struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn line(&self, message: &str) {
        println!("{}", message);
    }

    fn warn(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }
}

/// Sink that drops everything. Useful for callers that only want exit codes.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn line(&self, _message: &str) {}
}

/// Buffering sink for tests and for callers that render output themselves.
#[derive(Default)]
pub struct MemorySink {
    lines: std::sync::Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().unwrap().iter().any(|l| l.contains(needle))
    }
}

impl ProgressSink for MemorySink {
    fn line(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }
}
