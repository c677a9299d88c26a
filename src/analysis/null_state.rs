//! The optional null analysis result consumed by the dispose analysis.

use std::collections::BTreeMap;

use crate::ir::OperationId;

/// What a null pass knows about one operation's value.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, derive_more::Display)]
pub enum NullState {
    /// The value is always null.
    Null,
    /// The value is never null.
    NotNull,
    /// The value may or may not be null.
    MaybeNull,
    /// The pass has no information about the value.
    #[default]
    Undefined,
}

/// The per-operation result of a null pass. Supplying one only sharpens the
/// dispose analysis; leaving it out never changes soundness.
#[derive(Debug, Clone, Default)]
pub struct NullResult {
    states: BTreeMap<OperationId, NullState>,
}

impl NullResult {
    /// Creates an empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the null state of an operation.
    pub fn record(&mut self, operation: OperationId, state: NullState) {
        self.states.insert(operation, state);
    }

    /// The null state of an operation; operations the pass never saw read
    /// as [`NullState::Undefined`].
    #[must_use]
    pub fn state_of(&self, operation: OperationId) -> NullState {
        self.states.get(&operation).copied().unwrap_or_default()
    }
}
