//! Observability: structured logging and lifecycle events
//!
//! Observability is read-only: it never changes what a build or query
//! does, and a failed log write is ignored.
//!
//! ```ignore
//! use imdb_index::observability::{log_event_with_fields, Event, ObservationScope};
//!
//! log_event_with_fields(Event::IndexOpened, &[("file", "ratings.idx")]);
//!
//! let scope = ObservationScope::new("RATINGS_BUILD");
//! // ... build ...
//! scope.complete();
//! ```

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::{ObservationScope, Timer};

#[cfg(test)]
pub(crate) use logger::capture_lines;

fn severity_of(event: Event) -> Severity {
    if event.is_fatal() {
        Severity::Fatal
    } else if event.is_warning() {
        Severity::Warn
    } else {
        Severity::Info
    }
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity_of(event), event.as_str(), fields);
}
