use std::sync::Mutex;

/// Severity of a non-fatal problem reported while tokenizing or parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A single diagnostic event: a severity plus a human-readable message.
///
/// This is deliberately narrow — it mirrors the one-method reporting
/// interface external callers are expected to implement, not a general
/// logging facility. Ordinary internal tracing goes through the `log` crate
/// instead (see [`crate::config`] for where buffer sizes and friends are
/// configured).
pub trait DiagnosticHandler {
    fn diagnose(&self, severity: Severity, message: &str);

    fn warn(&self, message: &str) {
        self.diagnose(Severity::Warning, message);
    }

    fn error(&self, message: &str) {
        self.diagnose(Severity::Error, message);
    }
}

/// A handler that forwards every diagnostic to the `log` crate at the
/// matching level. This is the default used outside of tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingDiagnosticHandler;

impl DiagnosticHandler for LoggingDiagnosticHandler {
    fn diagnose(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Warning => log::warn!("{message}"),
            Severity::Error => log::error!("{message}"),
        }
    }
}

/// A handler that records every diagnostic it receives instead of emitting
/// it anywhere. Intended for tests that need to assert on exactly which
/// warnings/errors a parse produced.
#[derive(Debug, Default)]
pub struct RecordingDiagnosticHandler {
    events: Mutex<Vec<(Severity, String)>>,
}

impl RecordingDiagnosticHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(Severity, String)> {
        self.events.lock().unwrap().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|(s, _)| *s == Severity::Warning)
            .map(|(_, m)| m)
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|(s, _)| *s == Severity::Error)
            .map(|(_, m)| m)
            .collect()
    }
}

impl DiagnosticHandler for RecordingDiagnosticHandler {
    fn diagnose(&self, severity: Severity, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push((severity, message.to_string()));
    }
}

/// A handler that discards every diagnostic. Useful as a default in
/// constructors that don't want to force callers to provide one.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnosticHandler;

impl DiagnosticHandler for NullDiagnosticHandler {
    fn diagnose(&self, _severity: Severity, _message: &str) {}
}
