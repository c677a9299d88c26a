//! APIs for the dataflow analyses.
//!
//! The crate's centerpiece is the [`dispose`] analysis; [`fixed_point`]
//! holds the generic worklist it runs on, and [`points_to`] /
//! [`null_state`] model the external results it consumes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub mod dispose;
pub mod fixed_point;
pub mod null_state;
pub mod points_to;

/// A cooperative cancellation flag shared between a host and an analysis.
///
/// Analyses check the token at block boundaries and abort with a
/// distinguished error when it is cancelled. Cloning the token shares the
/// underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation on every clone of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
