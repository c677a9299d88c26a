//! Generic fixed-point iteration over a monotone framework.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt::Debug;

/// A trait for fixed-point analysis.
///
/// Implementors describe one forward analysis: how the entry location is
/// seeded, how a fact is transformed at a location and propagated to the
/// affected locations, and how facts are merged where control flow joins.
/// As long as `merge_facts` is monotone over a finite-height lattice, the
/// default [`analyze`](Analyzer::analyze) converges.
pub trait Analyzer {
    /// The type of the location in the control flow graph.
    type Location;
    /// The type of the fact that is propagated through the control flow graph.
    type Fact;
    /// The type of the error that can occur during the analysis.
    type Err;
    /// The type of the locations that are affected by the analysis.
    type AffectedLocations: IntoIterator<Item = (Self::Location, Self::Fact)>;

    /// Creates the facts at the entry points of the procedure being analyzed.
    /// # Errors
    /// - [`Err`](Analyzer::Err) if the entry facts cannot be created.
    fn entry_fact(&self) -> Result<Self::AffectedLocations, Self::Err>;

    /// Transforms the fact at the given location and returns the affected
    /// locations with the facts flowing into them.
    /// # Errors
    /// - [`Err`](Analyzer::Err) if the analysis fails.
    fn analyze_location(
        &mut self,
        location: &Self::Location,
        fact: &Self::Fact,
    ) -> Result<Self::AffectedLocations, Self::Err>;

    /// Merges two facts where the control flow joins.
    /// # Errors
    /// - [`Err`](Analyzer::Err) if an error occurred during merging two facts.
    fn merge_facts(
        &self,
        current_fact: &Self::Fact,
        incoming_fact: Self::Fact,
    ) -> Result<Self::Fact, Self::Err>;

    /// Runs the worklist to its fixed point and returns the stabilized fact
    /// for each reached location.
    ///
    /// Pending locations are drained in ascending order, so a run over the
    /// same inputs always visits locations in the same order.
    /// # Errors
    /// - [`Err`](Analyzer::Err) if the analysis fails.
    fn analyze(&mut self) -> Result<BTreeMap<Self::Location, Self::Fact>, Self::Err>
    where
        Self::Location: Ord + Debug,
        Self::Fact: PartialEq,
    {
        let mut facts: BTreeMap<Self::Location, Self::Fact> = BTreeMap::new();
        let mut pending: BTreeMap<Self::Location, Self::Fact> = BTreeMap::new();
        for (location, fact) in self.entry_fact()? {
            enqueue(self, &mut pending, location, fact)?;
        }

        while let Some((location, incoming_fact)) = pending.pop_first() {
            let maybe_updated_fact = match facts.get(&location) {
                Some(current_fact) => {
                    let merged_fact = self.merge_facts(current_fact, incoming_fact)?;
                    Some(merged_fact).filter(|it| it != current_fact)
                }
                None => Some(incoming_fact),
            };

            let Some(fact) = maybe_updated_fact else {
                continue;
            };
            tracing::trace!(location = ?location, "fact updated, propagating");
            for (affected, affected_fact) in self.analyze_location(&location, &fact)? {
                enqueue(self, &mut pending, affected, affected_fact)?;
            }
            facts.insert(location, fact);
        }

        Ok(facts)
    }
}

/// Queues a fact for a location, merging with a fact already queued there.
fn enqueue<A>(
    analyzer: &A,
    pending: &mut BTreeMap<A::Location, A::Fact>,
    location: A::Location,
    fact: A::Fact,
) -> Result<(), A::Err>
where
    A: Analyzer + ?Sized,
    A::Location: Ord,
{
    match pending.entry(location) {
        Entry::Occupied(mut entry) => {
            let merged = analyzer.merge_facts(entry.get(), fact)?;
            *entry.get_mut() = merged;
        }
        Entry::Vacant(entry) => {
            entry.insert(fact);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::Analyzer;

    /// Collects, per node, the set of nodes on some path from the entry.
    struct Reachability {
        successors: BTreeMap<u32, Vec<u32>>,
    }

    impl Analyzer for Reachability {
        type Location = u32;
        type Fact = BTreeSet<u32>;
        type Err = ();
        type AffectedLocations = Vec<(u32, BTreeSet<u32>)>;

        fn entry_fact(&self) -> Result<Self::AffectedLocations, Self::Err> {
            Ok(vec![(0, BTreeSet::from([0]))])
        }

        fn analyze_location(
            &mut self,
            location: &Self::Location,
            fact: &Self::Fact,
        ) -> Result<Self::AffectedLocations, Self::Err> {
            Ok(self
                .successors
                .get(location)
                .into_iter()
                .flatten()
                .map(|&successor| {
                    let mut outgoing = fact.clone();
                    outgoing.insert(successor);
                    (successor, outgoing)
                })
                .collect())
        }

        fn merge_facts(
            &self,
            current_fact: &Self::Fact,
            incoming_fact: Self::Fact,
        ) -> Result<Self::Fact, Self::Err> {
            Ok(current_fact.union(&incoming_fact).copied().collect())
        }
    }

    #[test]
    fn converges_on_a_cyclic_graph() {
        let mut analyzer = Reachability {
            successors: BTreeMap::from([(0, vec![1]), (1, vec![2, 3]), (2, vec![0])]),
        };
        let facts = analyzer.analyze().expect("analysis never fails");
        assert_eq!(facts[&0], BTreeSet::from([0, 1, 2]));
        // 2 lies on the unrolled path 0 -> 1 -> 2 -> 0 -> 1 -> 3.
        assert_eq!(facts[&3], BTreeSet::from([0, 1, 2, 3]));
    }

    #[test]
    fn unreached_locations_carry_no_fact() {
        let mut analyzer = Reachability {
            successors: BTreeMap::from([(0, vec![1]), (7, vec![8])]),
        };
        let facts = analyzer.analyze().expect("analysis never fails");
        assert!(facts.contains_key(&1));
        assert!(!facts.contains_key(&8));
    }

    struct Failing;

    impl Analyzer for Failing {
        type Location = u32;
        type Fact = u32;
        type Err = &'static str;
        type AffectedLocations = Vec<(u32, u32)>;

        fn entry_fact(&self) -> Result<Self::AffectedLocations, Self::Err> {
            Ok(vec![(0, 0)])
        }

        fn analyze_location(
            &mut self,
            _location: &Self::Location,
            _fact: &Self::Fact,
        ) -> Result<Self::AffectedLocations, Self::Err> {
            Err("boom")
        }

        fn merge_facts(
            &self,
            _current_fact: &Self::Fact,
            incoming_fact: Self::Fact,
        ) -> Result<Self::Fact, Self::Err> {
            Ok(incoming_fact)
        }
    }

    #[test]
    fn errors_abort_the_iteration() {
        assert_eq!(Failing.analyze(), Err("boom"));
    }
}
