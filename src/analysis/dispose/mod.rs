//! Dispose-state dataflow analysis.
//!
//! Given a lowered [`Procedure`], the symbols of the dispose capability,
//! and a prior points-to result, [`analyze`] computes for every basic block
//! the dispose state of each abstract heap location of a disposable type:
//! whether it is still unreleased, definitely released, possibly released
//! (or escaped), or unknown, together with the operations that contributed
//! to its release. Rules that report missed releases query the exit state
//! of the procedure's exit block.

use std::collections::{BTreeMap, BTreeSet};

use crate::ir::{BlockId, Procedure};
use crate::symbols::{SymbolTable, TypeId};

use super::CancellationToken;
use super::fixed_point::Analyzer;
use super::null_state::NullResult;
use super::points_to::PointsToResult;

mod state;
mod transfer;
mod value;


pub use state::DisposeState;
pub use value::{DisposeKind, DisposeValue};

use transfer::DisposeTransfer;

/// The domain symbols the dispose analysis is parameterized over, valid for
/// one analyzed procedure.
#[derive(Debug, Clone)]
pub struct DisposeAnalysisContext<'a> {
    /// The type system of the analyzed program.
    pub symbols: &'a SymbolTable,
    /// The dispose capability; a type is disposable iff it transitively
    /// implements this interface.
    pub disposable: TypeId,
    /// The non-generic collection capability used by the collection-add
    /// heuristic.
    pub collection: TypeId,
    /// The generic collection capability used by the collection-add
    /// heuristic.
    pub generic_collection: TypeId,
    /// Types whose single-parameter constructors are assumed to take over
    /// the dispose obligation of their argument.
    pub ownership_transfer_types: BTreeSet<TypeId>,
    /// The type whose body the analyzed procedure belongs to.
    pub enclosing_type: TypeId,
}

/// The error cases of a dispose analysis run.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DisposeAnalysisError {
    /// The host cancelled the analysis through its [`CancellationToken`].
    #[error("The analysis was cancelled by the host")]
    Cancelled,
}

/// The dispose states at the boundaries of one basic block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDisposeState {
    /// The state on entry to the block.
    pub entry: DisposeState,
    /// The state on exit from the block.
    pub exit: DisposeState,
}

/// The fixed point of a dispose analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisposeAnalysisResult {
    block_states: BTreeMap<BlockId, BlockDisposeState>,
    exit_state: DisposeState,
}

impl DisposeAnalysisResult {
    /// The entry and exit states of a block.
    #[must_use]
    pub fn block_state(&self, block: BlockId) -> Option<&BlockDisposeState> {
        self.block_states.get(&block)
    }

    /// The state on entry to a block.
    #[must_use]
    pub fn entry_of(&self, block: BlockId) -> Option<&DisposeState> {
        self.block_state(block).map(|states| &states.entry)
    }

    /// The state on exit from a block.
    #[must_use]
    pub fn exit_of(&self, block: BlockId) -> Option<&DisposeState> {
        self.block_state(block).map(|states| &states.exit)
    }

    /// Iterates the per-block states in block order.
    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &BlockDisposeState)> {
        self.block_states
            .iter()
            .map(|(block, states)| (*block, states))
    }

    /// The state on exit from the procedure: the join over the exit states
    /// of all blocks without successors.
    #[must_use]
    pub fn exit_state(&self) -> &DisposeState {
        &self.exit_state
    }
}

/// Runs the dispose analysis over a procedure to its fixed point.
///
/// The optional null result only sharpens precision; the cancellation token
/// is checked at block boundaries.
///
/// # Errors
/// - [`DisposeAnalysisError::Cancelled`] if the host cancels the run.
pub fn analyze(
    procedure: &Procedure,
    context: &DisposeAnalysisContext<'_>,
    points_to: &PointsToResult,
    null_result: Option<&NullResult>,
    cancellation: &CancellationToken,
) -> Result<DisposeAnalysisResult, DisposeAnalysisError> {
    tracing::debug!(
        blocks = procedure.cfg.block_count(),
        operations = procedure.operations.len(),
        "running dispose analysis"
    );
    let transfer = DisposeTransfer::new(context, &procedure.operations, points_to, null_result);
    let mut analyzer = DisposeAnalyzer {
        transfer,
        procedure,
        cancellation,
    };
    let entry_states = analyzer.analyze()?;

    let mut block_states = BTreeMap::new();
    for (block_id, block) in procedure.cfg.blocks() {
        let entry = entry_states.get(&block_id).cloned().unwrap_or_default();
        let mut exit = entry.clone();
        analyzer.transfer.transfer_block(block, &mut exit);
        block_states.insert(block_id, BlockDisposeState { entry, exit });
    }
    let exit_state = procedure
        .cfg
        .exits()
        .filter_map(|block| block_states.get(&block))
        .fold(DisposeState::new(), |joined, states| {
            joined.join(&states.exit)
        });
    tracing::debug!(tracked = exit_state.len(), "dispose analysis converged");
    Ok(DisposeAnalysisResult {
        block_states,
        exit_state,
    })
}

/// Drives the generic worklist with the dispose transfer function.
struct DisposeAnalyzer<'a> {
    transfer: DisposeTransfer<'a>,
    procedure: &'a Procedure,
    cancellation: &'a CancellationToken,
}

impl Analyzer for DisposeAnalyzer<'_> {
    type Location = BlockId;
    type Fact = DisposeState;
    type Err = DisposeAnalysisError;
    type AffectedLocations = Vec<(BlockId, DisposeState)>;

    fn entry_fact(&self) -> Result<Self::AffectedLocations, Self::Err> {
        Ok(vec![(
            self.procedure.cfg.entry_point(),
            DisposeState::new(),
        )])
    }

    fn analyze_location(
        &mut self,
        location: &Self::Location,
        fact: &Self::Fact,
    ) -> Result<Self::AffectedLocations, Self::Err> {
        if self.cancellation.is_cancelled() {
            return Err(DisposeAnalysisError::Cancelled);
        }
        let Some(block) = self.procedure.cfg.block(*location) else {
            return Ok(Vec::new());
        };
        let mut exit = fact.clone();
        self.transfer.transfer_block(block, &mut exit);
        Ok(self
            .procedure
            .cfg
            .successors(*location)
            .map(|successor| (successor, exit.clone()))
            .collect())
    }

    fn merge_facts(
        &self,
        current_fact: &Self::Fact,
        incoming_fact: Self::Fact,
    ) -> Result<Self::Fact, Self::Err> {
        Ok(current_fact.join(&incoming_fact))
    }
}
