//! Implementations for the traits in the `petgraph` crate.

use std::collections::BTreeSet;

use petgraph::{
    Directed, Direction,
    visit::{
        Data, GraphBase, GraphProp, IntoNeighbors, IntoNeighborsDirected, IntoNodeIdentifiers,
        NodeIndexable, VisitMap, Visitable,
    },
};

use super::control_flow::{BasicBlock, BlockId, ControlFlowGraph};

impl GraphBase for ControlFlowGraph {
    type NodeId = BlockId;
    type EdgeId = (BlockId, BlockId);
}

impl Data for ControlFlowGraph {
    type NodeWeight = BasicBlock;
    type EdgeWeight = ();
}

impl GraphProp for ControlFlowGraph {
    type EdgeType = Directed;
}

/// A visit map for the control flow graph.
pub type Visited = BTreeSet<BlockId>;

impl VisitMap<BlockId> for Visited {
    fn visit(&mut self, a: BlockId) -> bool {
        self.insert(a)
    }

    fn is_visited(&self, a: &BlockId) -> bool {
        self.contains(a)
    }

    fn unvisit(&mut self, a: BlockId) -> bool {
        self.remove(&a)
    }
}

impl Visitable for ControlFlowGraph {
    type Map = Visited;

    fn visit_map(&self) -> Self::Map {
        BTreeSet::new()
    }

    fn reset_map(&self, map: &mut Self::Map) {
        map.clear();
    }
}

impl<'a> IntoNodeIdentifiers for &'a ControlFlowGraph {
    type NodeIdentifiers = <BTreeSet<BlockId> as IntoIterator>::IntoIter;

    fn node_identifiers(self) -> Self::NodeIdentifiers {
        self.blocks()
            .map(|(id, _)| id)
            .collect::<BTreeSet<_>>()
            .into_iter()
    }
}

impl<'a> IntoNeighbors for &'a ControlFlowGraph {
    type Neighbors = <BTreeSet<BlockId> as IntoIterator>::IntoIter;

    fn neighbors(self, a: Self::NodeId) -> Self::Neighbors {
        self.neighbors_directed(a, Direction::Outgoing)
    }
}

impl<'a> IntoNeighborsDirected for &'a ControlFlowGraph {
    type NeighborsDirected = <BTreeSet<BlockId> as IntoIterator>::IntoIter;

    fn neighbors_directed(self, n: Self::NodeId, d: Direction) -> Self::NeighborsDirected {
        match d {
            Direction::Outgoing => self.successors(n).collect::<BTreeSet<_>>().into_iter(),
            Direction::Incoming => self.predecessors(n).collect::<BTreeSet<_>>().into_iter(),
        }
    }
}

impl NodeIndexable for ControlFlowGraph {
    fn node_bound(&self) -> usize {
        self.blocks()
            .map(|(id, _)| u32::from(id) as usize + 1)
            .max()
            .unwrap_or_default()
    }

    fn to_index(&self, ix: Self::NodeId) -> usize {
        u32::from(ix) as usize
    }

    fn from_index(&self, ix: usize) -> Self::NodeId {
        BlockId::from(u32::try_from(ix).expect("Index is out of u32"))
    }
}

#[cfg(test)]
mod tests {
    use petgraph::visit::Dfs;

    use super::*;

    #[test]
    fn dfs_reaches_every_block() {
        let blocks = (0..4).map(|raw| (BlockId::from(raw), BasicBlock::default()));
        let edges = [
            (0.into(), 1.into()),
            (0.into(), 2.into()),
            (1.into(), 3.into()),
            (2.into(), 3.into()),
        ];
        let cfg = ControlFlowGraph::from_blocks(blocks, edges);
        let mut dfs = Dfs::new(&cfg, cfg.entry_point());
        let mut seen = BTreeSet::new();
        while let Some(block) = dfs.next(&cfg) {
            seen.insert(block);
        }
        assert_eq!(seen.len(), 4);
    }
}
