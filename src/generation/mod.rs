//! Generation-based deferred reclamation
//!
//! Readers never lock. Instead, the writer retires resources into a
//! [`GenerationHolder`] and only releases them once the oldest generation a
//! reader may still observe has moved past their retirement generation.
//!
//! This module provides:
//! - `Generation` - wraparound-safe generation counter
//! - `GenerationHolder` - two-stage hold list (untagged, then tagged FIFO)
//! - `GenerationHandler` - reader registry producing the oldest used generation
//!
//! Typical writer cycle:
//!
//! ```ignore
//! holder.hold(old_resource);
//! holder.advance(handler.current_generation());
//! handler.increment_generation();
//! holder.trim(handler.oldest_used_generation());
//! ```

mod generation;
mod handler;
mod holder;

pub use generation::Generation;
pub use handler::{GenerationGuard, GenerationHandler};
pub use holder::{BoxedHeld, GenerationHeld, GenerationHolder, HeldItem};
