//! Observable events for memindex
//!
//! Events are explicit and typed. Only buffer lifecycle and compaction
//! transitions are events; per-record encoding never logs.

use std::fmt;

use super::Severity;

/// Observable events in the storage core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Buffer lifecycle
    /// A free buffer became the active buffer of its type
    BufferActivated,
    /// The active buffer could not fit a request and was replaced
    BufferSwitched,
    /// A buffer was retired and is waiting for readers to drain
    BufferHeld,
    /// A held buffer was released and its id can be reused
    BufferFreed,

    // Compaction
    /// Compaction of a buffer type started
    CompactStart,
    /// Compaction of a buffer type finished
    CompactComplete,

    // Feature store
    /// The scratch write window was rewound to offset 0
    ScratchReset,

    // Generation holding
    /// Hold lists were cleared unconditionally at shutdown
    HoldListsCleared,
    /// A holder was dropped while still holding resources
    HoldListsLeaked,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BufferActivated => "BUFFER_ACTIVATED",
            Event::BufferSwitched => "BUFFER_SWITCHED",
            Event::BufferHeld => "BUFFER_HELD",
            Event::BufferFreed => "BUFFER_FREED",
            Event::CompactStart => "COMPACT_START",
            Event::CompactComplete => "COMPACT_COMPLETE",
            Event::ScratchReset => "SCRATCH_RESET",
            Event::HoldListsCleared => "HOLD_LISTS_CLEARED",
            Event::HoldListsLeaked => "HOLD_LISTS_LEAKED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::BufferActivated | Event::BufferFreed | Event::ScratchReset => Severity::Trace,
            Event::BufferSwitched | Event::BufferHeld => Severity::Trace,
            Event::CompactStart | Event::CompactComplete | Event::HoldListsCleared => {
                Severity::Info
            }
            Event::HoldListsLeaked => Severity::Fatal,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
