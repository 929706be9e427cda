//! Typed progress reporting.
//!
//! The controller emits [`ProgressRecord`]s to an injected
//! [`ProgressObserver`]. The logging observer turns them into the
//! human-readable progress log; the streaming bridge turns them into wire
//! envelopes.

mod observer;
mod record;

pub use observer::{CollectingObserver, LoggingObserver, NoOpObserver, ProgressObserver};
pub use record::{FailureDisposition, MessageCategory, ProgressRecord};
