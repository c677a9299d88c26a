//! The program representation consumed by the analyses: arena-allocated
//! operations grouped into basic blocks of a control flow graph.

mod control_flow;
mod operation;
#[cfg(feature = "petgraph")]
mod petgraph;
mod procedure;

pub use control_flow::{BasicBlock, BlockId, ControlFlowGraph};
pub use operation::{
    AcquiredResources, CalleeKind, LocalId, Operation, OperationArena, OperationId, OperationKind,
};
#[cfg(feature = "petgraph")]
pub use self::petgraph::Visited;
pub use procedure::Procedure;
