use super::control_flow::ControlFlowGraph;
use super::operation::OperationArena;

/// A lowered procedure body: the operation arena plus the control flow
/// graph whose blocks reference it.
#[derive(Debug, Clone)]
pub struct Procedure {
    /// Every operation of the body.
    pub operations: OperationArena,
    /// The control flow graph over the body's basic blocks.
    pub cfg: ControlFlowGraph,
}

impl Procedure {
    /// Bundles an operation arena with its control flow graph.
    #[must_use]
    pub fn new(operations: OperationArena, cfg: ControlFlowGraph) -> Self {
        Self { operations, cfg }
    }
}
