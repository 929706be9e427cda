//! Cooperative cancellation for agent steps.
//!
//! The controller hands every step an [`AbortSignal`] and fires it when the
//! step's timeout elapses.

mod signal;

pub use signal::AbortSignal;
