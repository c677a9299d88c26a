//! The per-location map domain the dispose analysis iterates over.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt::Display;

use itertools::Itertools;

use crate::analysis::points_to::LocationId;

use super::value::DisposeValue;

/// The dispose state at one program point: a [`DisposeValue`] per tracked
/// abstract location.
///
/// A location without an entry reads as
/// [`DisposeValue::NOT_DISPOSABLE`], the bottom of the per-location
/// lattice. Entries are only ever added or raised, never removed, so block
/// states grow monotonically towards the fixed point.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct DisposeState {
    values: BTreeMap<LocationId, DisposeValue>,
}

impl DisposeState {
    /// Creates a state tracking no locations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The value of a location; untracked locations read as
    /// [`DisposeValue::NOT_DISPOSABLE`].
    #[must_use]
    pub fn value_of(&self, location: LocationId) -> &DisposeValue {
        static NOT_DISPOSABLE: DisposeValue = DisposeValue::NOT_DISPOSABLE;
        self.values.get(&location).unwrap_or(&NOT_DISPOSABLE)
    }

    /// The value of a location, if it is tracked.
    #[must_use]
    pub fn tracked(&self, location: LocationId) -> Option<&DisposeValue> {
        self.values.get(&location)
    }

    /// The number of tracked locations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no location is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates the tracked locations in id order.
    pub fn iter(&self) -> impl Iterator<Item = (LocationId, &DisposeValue)> {
        self.values.iter().map(|(location, value)| (*location, value))
    }

    pub(crate) fn insert(&mut self, location: LocationId, value: DisposeValue) {
        self.values.insert(location, value);
    }

    /// Merges two states pointwise where control flow joins.
    ///
    /// The key set of the result is the union of both key sets; a location
    /// tracked on only one side keeps its value unchanged (the absent side
    /// contributes nothing), and a location tracked on both sides gets
    /// [`DisposeValue::join`].
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        let mut values = self.values.clone();
        for (location, value) in &other.values {
            match values.entry(*location) {
                Entry::Occupied(mut entry) => {
                    let joined = entry.get().join(value);
                    *entry.get_mut() = joined;
                }
                Entry::Vacant(entry) => {
                    entry.insert(value.clone());
                }
            }
        }
        Self { values }
    }

    /// Pointwise comparison: `self` is below `other` iff every tracked
    /// location compares below-or-equal to `other`'s value for it. A
    /// location absent from `other` sorts below any tracked value.
    #[must_use]
    pub fn le(&self, other: &Self) -> bool {
        self.values.iter().all(|(location, value)| {
            other
                .values
                .get(location)
                .is_some_and(|theirs| value.partial_cmp(theirs).is_some_and(Ordering::is_le))
        })
    }

    /// Raises every tracked location to [`DisposeValue::UNKNOWN`], keeping
    /// the key set intact. Hosts use this to reset a join whose
    /// predecessors are not all computed yet without breaking the monotone
    /// key-set invariant.
    pub fn reset_to_unknown(&mut self) {
        for value in self.values.values_mut() {
            *value = DisposeValue::UNKNOWN;
        }
    }
}

impl Display for DisposeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.values
                .iter()
                .map(|(location, value)| format!("{location}: {value}"))
                .join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;

    use super::*;
    use crate::analysis::dispose::value::DisposeKind;
    use crate::ir::OperationId;

    #[derive(Debug, Clone, Copy, proptest_derive::Arbitrary)]
    struct RawLocation(#[proptest(strategy = "0u32..8")] u32);

    fn location(raw: u32) -> LocationId {
        LocationId::from_raw(raw)
    }

    fn disposed(ops: impl IntoIterator<Item = u32>) -> DisposeValue {
        ops.into_iter().fold(
            DisposeValue::NOT_DISPOSED,
            |value, raw| value.with_new_disposing_operation(OperationId::from_raw(raw)),
        )
    }

    #[test]
    fn untracked_locations_read_as_bottom() {
        let state = DisposeState::new();
        assert_eq!(state.value_of(location(0)), &DisposeValue::NOT_DISPOSABLE);
        assert_eq!(state.tracked(location(0)), None);
    }

    #[test]
    fn join_keeps_one_sided_entries_unchanged() {
        let mut lhs = DisposeState::new();
        lhs.insert(location(0), disposed([1]));
        let mut rhs = DisposeState::new();
        rhs.insert(location(1), DisposeValue::NOT_DISPOSED);

        let joined = lhs.join(&rhs);
        assert_eq!(joined.len(), 2);
        assert_eq!(joined.value_of(location(0)), &disposed([1]));
        assert_eq!(joined.value_of(location(1)), &DisposeValue::NOT_DISPOSED);
    }

    #[test]
    fn join_merges_shared_entries_pointwise() {
        let mut lhs = DisposeState::new();
        lhs.insert(location(0), disposed([1]));
        let mut rhs = DisposeState::new();
        rhs.insert(location(0), DisposeValue::NOT_DISPOSED);

        let joined = lhs.join(&rhs);
        assert_eq!(
            joined.value_of(location(0)).kind(),
            DisposeKind::MaybeDisposed
        );
        assert_eq!(
            joined.value_of(location(0)).disposing_ops(),
            &BTreeSet::from([OperationId::from_raw(1)])
        );
    }

    #[test]
    fn le_is_pointwise_and_absent_below_present() {
        let mut small = DisposeState::new();
        small.insert(location(0), DisposeValue::NOT_DISPOSED);
        let mut big = DisposeState::new();
        big.insert(location(0), disposed([1]));
        big.insert(location(1), DisposeValue::NOT_DISPOSED);

        assert!(small.le(&big));
        assert!(!big.le(&small));
        assert!(DisposeState::new().le(&small));
    }

    #[test]
    fn reset_to_unknown_preserves_the_key_set() {
        let mut state = DisposeState::new();
        state.insert(location(0), disposed([1]));
        state.insert(location(1), DisposeValue::NOT_DISPOSED);
        state.reset_to_unknown();

        assert_eq!(state.len(), 2);
        for (_, value) in state.iter() {
            assert_eq!(value, &DisposeValue::UNKNOWN);
        }
    }

    fn arb_state() -> impl Strategy<Value = DisposeState> {
        prop::collection::vec(
            (
                any::<RawLocation>(),
                prop_oneof![
                    Just(DisposeValue::NOT_DISPOSED),
                    Just(DisposeValue::UNKNOWN),
                    prop::collection::btree_set(0u32..16, 1..4).prop_map(disposed),
                ],
            ),
            0..6,
        )
        .prop_map(|entries| {
            let mut state = DisposeState::new();
            for (raw, value) in entries {
                state.insert(location(raw.0), value);
            }
            state
        })
    }

    proptest! {
        #[test]
        fn join_is_idempotent(state in arb_state()) {
            prop_assert_eq!(state.join(&state), state);
        }

        #[test]
        fn join_is_commutative(lhs in arb_state(), rhs in arb_state()) {
            prop_assert_eq!(lhs.join(&rhs), rhs.join(&lhs));
        }

        #[test]
        fn join_is_associative(a in arb_state(), b in arb_state(), c in arb_state()) {
            prop_assert_eq!(a.join(&b).join(&c), a.join(&b.join(&c)));
        }

        #[test]
        fn empty_state_is_the_identity_of_join(state in arb_state()) {
            prop_assert_eq!(DisposeState::new().join(&state), state.clone());
            prop_assert_eq!(state.join(&DisposeState::new()), state);
        }

        #[test]
        fn join_key_set_is_the_union(lhs in arb_state(), rhs in arb_state()) {
            let joined = lhs.join(&rhs);
            let expected: BTreeSet<_> = lhs.iter().chain(rhs.iter()).map(|(l, _)| l).collect();
            let actual: BTreeSet<_> = joined.iter().map(|(l, _)| l).collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
