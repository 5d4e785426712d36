//! Index lifecycle events
//!
//! Events are explicit and typed; the string form is the `event` field of
//! the log line.

use std::fmt;

/// Observable events during index build and open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration file loaded and validated
    ConfigLoaded,

    // Build
    /// Build of one domain started
    BuildBegin,
    /// Build of one domain finished; carries the report counts
    BuildComplete,
    /// Source row dropped during a build
    RecordSkipped,
    /// Sealed file renamed into place
    IndexPublished,

    // Open
    /// Index files mapped and validated
    IndexOpened,
    /// Index opened without a build manifest
    ManifestMissing,
    /// Manifest and files on disk disagree (FATAL)
    BackingStoreDesync,
    /// Sealed file failed structural validation (FATAL)
    IndexCorruption,

    /// Every domain of a catalog is open
    CatalogReady,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::BuildBegin => "BUILD_BEGIN",
            Event::BuildComplete => "BUILD_COMPLETE",
            Event::RecordSkipped => "RECORD_SKIPPED",
            Event::IndexPublished => "INDEX_PUBLISHED",
            Event::IndexOpened => "INDEX_OPENED",
            Event::ManifestMissing => "MANIFEST_MISSING",
            Event::BackingStoreDesync => "BACKING_STORE_DESYNC",
            Event::IndexCorruption => "INDEX_CORRUPTION",
            Event::CatalogReady => "CATALOG_READY",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::BackingStoreDesync | Event::IndexCorruption)
    }

    /// Returns true if this event is worth a warning but not an error
    pub fn is_warning(&self) -> bool {
        matches!(self, Event::RecordSkipped | Event::ManifestMissing)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_string_representation() {
        let events = [
            Event::ConfigLoaded,
            Event::BuildBegin,
            Event::BuildComplete,
            Event::RecordSkipped,
            Event::IndexPublished,
            Event::IndexOpened,
            Event::ManifestMissing,
            Event::BackingStoreDesync,
            Event::IndexCorruption,
            Event::CatalogReady,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_fatal_events() {
        assert!(Event::BackingStoreDesync.is_fatal());
        assert!(Event::IndexCorruption.is_fatal());
        assert!(!Event::RecordSkipped.is_fatal());
        assert!(Event::RecordSkipped.is_warning());
    }

    #[test]
    fn test_event_display() {
        assert_eq!(format!("{}", Event::IndexPublished), "INDEX_PUBLISHED");
    }
}
