//! Observability subsystem for memindex
//!
//! This module provides:
//! - Structured logging (JSON lines)
//! - Typed lifecycle events
//! - Atomic counters
//!
//! # Principles
//!
//! 1. Observability is read-only and never fails the caller
//! 2. No background threads
//! 3. Hot paths (record encode/decode) do not log
//!
//! # Usage
//!
//! ```ignore
//! use memindex::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::BufferHeld, &[("buffer_id", "7")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(Event::BufferActivated, &[("buffer_id", "1"), ("type_id", "0")]);
    }

    #[test]
    fn test_event_line_shape() {
        let line = logger::capture_log(
            Event::HoldListsCleared.severity(),
            Event::HoldListsCleared.as_str(),
            &[("held_bytes", "128")],
        );
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["event"], "HOLD_LISTS_CLEARED");
        assert_eq!(parsed["severity"], "INFO");
        assert_eq!(parsed["held_bytes"], "128");
    }
}
