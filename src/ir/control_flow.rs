//! The basic-block control flow graph of a lowered procedure.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use super::operation::OperationId;

/// Identifies a basic block of a [`ControlFlowGraph`].
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
#[repr(transparent)]
pub struct BlockId(u32);

impl BlockId {
    /// Denotes the entry block of a procedure.
    pub const ENTRY: Self = Self(0);

    /// Checks if the block is the entry block.
    #[must_use]
    pub const fn is_entry(&self) -> bool {
        self.0 == 0
    }
}

impl Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "b{}", self.0)
    }
}

impl From<u32> for BlockId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<BlockId> for u32 {
    fn from(value: BlockId) -> Self {
        value.0
    }
}

/// A basic block: root operations in execution order.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct BasicBlock {
    operations: Vec<OperationId>,
}

impl BasicBlock {
    /// Creates a block from its root operations.
    #[must_use]
    pub fn new(operations: Vec<OperationId>) -> Self {
        Self { operations }
    }

    /// The root operations of the block, in execution order.
    #[must_use]
    pub fn operations(&self) -> &[OperationId] {
        &self.operations
    }
}

impl From<Vec<OperationId>> for BasicBlock {
    fn from(operations: Vec<OperationId>) -> Self {
        Self::new(operations)
    }
}

/// A directed graph of [`BasicBlock`]s keyed by [`BlockId`], with block
/// [`BlockId::ENTRY`] as the procedure entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlFlowGraph {
    inner: BTreeMap<BlockId, (BasicBlock, BTreeSet<BlockId>)>,
}

impl ControlFlowGraph {
    /// Constructs a control flow graph from blocks and edges.
    ///
    /// # Panics
    /// Panics if a block id occurs twice, if the entry block is missing, if
    /// an edge endpoint is not a registered block, or if an edge occurs
    /// twice.
    pub fn from_blocks(
        blocks: impl IntoIterator<Item = (BlockId, BasicBlock)>,
        edges: impl IntoIterator<Item = (BlockId, BlockId)>,
    ) -> Self {
        let mut inner: BTreeMap<BlockId, (BasicBlock, BTreeSet<BlockId>)> = BTreeMap::new();
        for (id, block) in blocks {
            let duplicate = inner.insert(id, (block, BTreeSet::new())).is_some();
            assert!(!duplicate, "Duplicate block {id}");
        }
        assert!(
            inner.contains_key(&BlockId::ENTRY),
            "Missing entry block {}",
            BlockId::ENTRY
        );
        for (src, dst) in edges {
            assert!(inner.contains_key(&dst), "Edge target {dst} is not a block");
            let (_, successors) = inner
                .get_mut(&src)
                .unwrap_or_else(|| panic!("Edge source {src} is not a block"));
            assert!(successors.insert(dst), "Duplicate edge {src} -> {dst}");
        }
        Self { inner }
    }

    /// Returns the entry point of the control flow graph.
    #[must_use]
    pub const fn entry_point(&self) -> BlockId {
        BlockId::ENTRY
    }

    /// Looks up a block.
    #[must_use]
    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.inner.get(&id).map(|(block, _)| block)
    }

    /// The number of blocks in the graph.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.inner.len()
    }

    /// Returns an iterator over the blocks.
    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &BasicBlock)> {
        self.inner.iter().map(|(id, (block, _))| (*id, block))
    }

    /// Returns an iterator over the edges.
    pub fn edges(&self) -> impl Iterator<Item = (BlockId, BlockId)> + '_ {
        self.inner.iter().flat_map(|(src, (_, successors))| {
            successors.iter().map(move |dst| (*src, *dst))
        })
    }

    /// Returns an iterator over the successors of a block.
    pub fn successors(&self, id: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.inner
            .get(&id)
            .into_iter()
            .flat_map(|(_, successors)| successors.iter().copied())
    }

    /// Returns an iterator over the predecessors of a block.
    pub fn predecessors(&self, id: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.inner
            .iter()
            .filter(move |(_, (_, successors))| successors.contains(&id))
            .map(|(src, _)| *src)
    }

    /// Returns an iterator over the exits of the control flow graph.
    pub fn exits(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.inner
            .iter()
            .filter(|(_, (_, successors))| successors.is_empty())
            .map(|(id, _)| *id)
    }
}
