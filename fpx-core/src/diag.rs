//! Logging and diagnostic formatting are explicitly out of core scope
//! (spec.md §1). `fpx-core` never depends on a logging framework directly;
//! it reports through this narrow trait, which `fpx::main` implements on
//! top of `tracing`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagLevel {
    Warning,
    Error,
}

pub trait Diagnostics {
    fn report(&self, level: DiagLevel, message: &str);

    fn warn(&self, message: &str) {
        self.report(DiagLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.report(DiagLevel::Error, message);
    }
}

/// Drops every diagnostic. Useful for tests and for `Driver::run` callers
/// that only care about output, not diagnostics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn report(&self, _level: DiagLevel, _message: &str) {}
}

/// Collects diagnostics in memory, keyed by level; used by tests that need
/// to assert a diagnostic fired without wiring up `tracing`.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    pub messages: std::cell::RefCell<Vec<(DiagLevel, String)>>,
}

impl Diagnostics for RecordingDiagnostics {
    fn report(&self, level: DiagLevel, message: &str) {
        self.messages.borrow_mut().push((level, message.to_string()));
    }
}
