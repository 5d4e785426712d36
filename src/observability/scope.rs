//! ObservationScope for bracketing a unit of work
//!
//! - `{name}_BEGIN` on creation
//! - `{name}_COMPLETE` on `complete`
//! - `{name}_FAILED` on `fail`
//! - `{name}_INCOMPLETE` if dropped without either

use std::time::Instant;

use super::logger::{Logger, Severity};

/// A scope that logs begin and end events for one operation.
///
/// ```ignore
/// let scope = ObservationScope::with_fields("RATINGS_BUILD", &[("source", path)]);
/// // ... build ...
/// scope.complete_with_fields(&[("indexed", "1204")]);
/// ```
pub struct ObservationScope {
    name: String,
    fields: Vec<(String, String)>,
    timer: Timer,
    finished: bool,
}

impl ObservationScope {
    /// Logs `{name}_BEGIN` immediately.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_fields(name, &[])
    }

    /// Like `new`; `fields` are repeated on every event of the scope.
    pub fn with_fields(name: impl Into<String>, fields: &[(&str, &str)]) -> Self {
        let scope = Self {
            name: name.into(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            timer: Timer::new(),
            finished: false,
        };
        scope.emit(Severity::Info, "BEGIN", &[]);
        scope
    }

    /// Logs `{name}_COMPLETE` with the elapsed time.
    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    pub fn complete_with_fields(mut self, extra: &[(&str, &str)]) {
        self.finished = true;
        let elapsed = self.timer.elapsed_ms();
        let mut fields = extra.to_vec();
        fields.push(("elapsed_ms", elapsed.as_str()));
        self.emit(Severity::Info, "COMPLETE", &fields);
    }

    /// Logs `{name}_FAILED` at ERROR level.
    pub fn fail(self, reason: &str) {
        self.fail_with(Severity::Error, reason);
    }

    /// Logs `{name}_FAILED` at FATAL level.
    pub fn fail_fatal(self, reason: &str) {
        self.fail_with(Severity::Fatal, reason);
    }

    fn fail_with(mut self, severity: Severity, reason: &str) {
        self.finished = true;
        self.emit(severity, "FAILED", &[("reason", reason)]);
    }

    pub fn is_completed(&self) -> bool {
        self.finished
    }

    fn emit(&self, severity: Severity, suffix: &str, extra: &[(&str, &str)]) {
        let event = format!("{}_{}", self.name, suffix);
        let mut fields: Vec<(&str, &str)> = self
            .fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        fields.extend_from_slice(extra);
        Logger::log(severity, &event, &fields);
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.finished {
            self.emit(
                Severity::Warn,
                "INCOMPLETE",
                &[("reason", "scope dropped without completion")],
            );
        }
    }
}

/// A simple duration timer for logging elapsed time
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed milliseconds as a string
    pub fn elapsed_ms(&self) -> String {
        self.start.elapsed().as_millis().to_string()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
