//! The per-location abstract value of the dispose analysis and its lattice.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt::Display;

use itertools::Itertools;

use crate::ir::OperationId;

/// The classification part of a [`DisposeValue`].
///
/// The variant order is the lattice order: merging two classifications never
/// moves the result below either input, with the deliberate exception of
/// [`NotDisposable`](DisposeKind::NotDisposable), which absorbs anything it
/// is merged with (a location that is non-disposable on any path is
/// non-disposable, and downstream rules ignore it).
#[derive(
    Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, derive_more::Display,
)]
pub enum DisposeKind {
    /// The location's static type has no dispose capability.
    NotDisposable,
    /// No path from the location's creation has disposed it.
    NotDisposed,
    /// Every path from the location's creation has disposed it exactly once.
    Disposed,
    /// Some paths dispose the location, or its ownership may have escaped.
    MaybeDisposed,
    /// Nothing is known about the location's dispose state.
    Unknown,
}

/// The dispose state of one abstract location: a classification plus the
/// operations that contributed disposal on some path.
///
/// Values are immutable; the `with_*` transitions build new values.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct DisposeValue {
    kind: DisposeKind,
    disposing_ops: BTreeSet<OperationId>,
}

impl DisposeValue {
    /// The canonical non-disposable value.
    pub const NOT_DISPOSABLE: Self = Self {
        kind: DisposeKind::NotDisposable,
        disposing_ops: BTreeSet::new(),
    };

    /// The canonical not-yet-disposed value.
    pub const NOT_DISPOSED: Self = Self {
        kind: DisposeKind::NotDisposed,
        disposing_ops: BTreeSet::new(),
    };

    /// The canonical unknown value.
    pub const UNKNOWN: Self = Self {
        kind: DisposeKind::Unknown,
        disposing_ops: BTreeSet::new(),
    };

    /// The classification of this value.
    #[must_use]
    pub const fn kind(&self) -> DisposeKind {
        self.kind
    }

    /// The operations that disposed (or escaped) this location on some path.
    #[must_use]
    pub const fn disposing_ops(&self) -> &BTreeSet<OperationId> {
        &self.disposing_ops
    }

    /// The value after `operation` disposed the location on the current
    /// path: the first disposal of a [`NotDisposed`](DisposeKind::NotDisposed)
    /// location is [`Disposed`](DisposeKind::Disposed); disposing anything
    /// else leaves the overall state indeterminate.
    #[must_use]
    pub fn with_new_disposing_operation(&self, operation: OperationId) -> Self {
        debug_assert_ne!(self.kind, DisposeKind::NotDisposable);
        let kind = if self.kind == DisposeKind::NotDisposed {
            DisposeKind::Disposed
        } else {
            DisposeKind::MaybeDisposed
        };
        let mut disposing_ops = self.disposing_ops.clone();
        disposing_ops.insert(operation);
        Self {
            kind,
            disposing_ops,
        }
    }

    /// The value after `operation` may have transferred the location's
    /// ownership elsewhere; whoever received it may or may not dispose it.
    #[must_use]
    pub fn with_new_escaping_operation(&self, operation: OperationId) -> Self {
        debug_assert_ne!(self.kind, DisposeKind::NotDisposable);
        let mut disposing_ops = self.disposing_ops.clone();
        disposing_ops.insert(operation);
        Self {
            kind: DisposeKind::MaybeDisposed,
            disposing_ops,
        }
    }

    /// Merges two values where control flow joins.
    ///
    /// [`NotDisposable`](DisposeKind::NotDisposable) absorbs; two
    /// [`NotDisposed`](DisposeKind::NotDisposed) values stay untouched;
    /// otherwise the contributing operations are united and the result is
    /// [`Disposed`](DisposeKind::Disposed) only when both inputs are. A
    /// merge that ends up with no contributing operations has lost all
    /// information and collapses to [`Unknown`](DisposeKind::Unknown).
    ///
    /// An *absent* value merges as the identity; that case lives in
    /// [`DisposeState::join`](super::DisposeState::join), which keeps
    /// one-sided entries unchanged.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        if self.kind == DisposeKind::NotDisposable || other.kind == DisposeKind::NotDisposable {
            return Self::NOT_DISPOSABLE;
        }
        if self.kind == DisposeKind::NotDisposed && other.kind == DisposeKind::NotDisposed {
            return Self::NOT_DISPOSED;
        }
        let disposing_ops: BTreeSet<_> = self
            .disposing_ops
            .union(&other.disposing_ops)
            .copied()
            .collect();
        if disposing_ops.is_empty() {
            return Self::UNKNOWN;
        }
        let kind = if self.kind == DisposeKind::Disposed && other.kind == DisposeKind::Disposed {
            DisposeKind::Disposed
        } else {
            DisposeKind::MaybeDisposed
        };
        Self {
            kind,
            disposing_ops,
        }
    }
}

impl PartialOrd for DisposeValue {
    /// The lattice order: values of the same kind compare by inclusion of
    /// their contributing operations (and are incomparable when neither set
    /// includes the other); values of different kinds compare by
    /// [`DisposeKind`] order.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.kind != other.kind {
            return Some(self.kind.cmp(&other.kind));
        }
        if self.disposing_ops == other.disposing_ops {
            Some(Ordering::Equal)
        } else if self.disposing_ops.is_subset(&other.disposing_ops) {
            Some(Ordering::Less)
        } else if self.disposing_ops.is_superset(&other.disposing_ops) {
            Some(Ordering::Greater)
        } else {
            None
        }
    }
}

impl Display for DisposeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.disposing_ops.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(
                f,
                "{}{{{}}}",
                self.kind,
                self.disposing_ops.iter().map(ToString::to_string).join(", ")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn op(raw: u32) -> OperationId {
        OperationId::from_raw(raw)
    }

    fn disposed(ops: impl IntoIterator<Item = u32>) -> DisposeValue {
        DisposeValue {
            kind: DisposeKind::Disposed,
            disposing_ops: ops.into_iter().map(op).collect(),
        }
    }

    fn maybe_disposed(ops: impl IntoIterator<Item = u32>) -> DisposeValue {
        DisposeValue {
            kind: DisposeKind::MaybeDisposed,
            disposing_ops: ops.into_iter().map(op).collect(),
        }
    }

    #[test]
    fn first_disposal_of_fresh_value_is_definite() {
        let value = DisposeValue::NOT_DISPOSED.with_new_disposing_operation(op(3));
        assert_eq!(value, disposed([3]));
    }

    #[test]
    fn second_disposal_is_indeterminate() {
        let value = disposed([3]).with_new_disposing_operation(op(5));
        assert_eq!(value, maybe_disposed([3, 5]));
    }

    #[test]
    fn escape_is_always_indeterminate() {
        assert_eq!(
            DisposeValue::NOT_DISPOSED.with_new_escaping_operation(op(9)),
            maybe_disposed([9])
        );
        assert_eq!(
            disposed([1]).with_new_escaping_operation(op(9)),
            maybe_disposed([1, 9])
        );
    }

    #[test]
    fn join_table() {
        // NotDisposable absorbs.
        assert_eq!(
            DisposeValue::NOT_DISPOSABLE.join(&disposed([1])),
            DisposeValue::NOT_DISPOSABLE
        );
        // Two untouched locations stay untouched.
        assert_eq!(
            DisposeValue::NOT_DISPOSED.join(&DisposeValue::NOT_DISPOSED),
            DisposeValue::NOT_DISPOSED
        );
        // Disposed on every path only when disposed on both.
        assert_eq!(disposed([1]).join(&disposed([2])), disposed([1, 2]));
        assert_eq!(
            disposed([1]).join(&DisposeValue::NOT_DISPOSED),
            maybe_disposed([1])
        );
        // Merges with no contributing operations collapse to Unknown.
        assert_eq!(
            DisposeValue::NOT_DISPOSED.join(&DisposeValue::UNKNOWN),
            DisposeValue::UNKNOWN
        );
        assert_eq!(
            DisposeValue::UNKNOWN.join(&disposed([4])),
            maybe_disposed([4])
        );
    }

    #[test]
    fn order_follows_kinds_then_inclusion() {
        assert!(DisposeValue::NOT_DISPOSABLE < DisposeValue::NOT_DISPOSED);
        assert!(DisposeValue::NOT_DISPOSED < disposed([1]));
        assert!(disposed([1]) < maybe_disposed([7]));
        assert!(maybe_disposed([7]) < DisposeValue::UNKNOWN);
        assert!(disposed([1]) < disposed([1, 2]));
        assert_eq!(disposed([1]).partial_cmp(&disposed([2])), None);
    }

    prop_compose! {
        fn arb_ops()(raw in prop::collection::btree_set(0u32..32, 1..6)) -> BTreeSet<OperationId> {
            raw.into_iter().map(op).collect()
        }
    }

    fn arb_value() -> impl Strategy<Value = DisposeValue> {
        prop_oneof![
            Just(DisposeValue::NOT_DISPOSABLE),
            Just(DisposeValue::NOT_DISPOSED),
            Just(DisposeValue::UNKNOWN),
            (arb_ops(), any::<bool>()).prop_map(|(disposing_ops, definite)| DisposeValue {
                kind: if definite {
                    DisposeKind::Disposed
                } else {
                    DisposeKind::MaybeDisposed
                },
                disposing_ops,
            }),
        ]
    }

    proptest! {
        #[test]
        fn join_is_idempotent(value in arb_value()) {
            prop_assert_eq!(value.join(&value), value);
        }

        #[test]
        fn join_is_commutative(lhs in arb_value(), rhs in arb_value()) {
            prop_assert_eq!(lhs.join(&rhs), rhs.join(&lhs));
        }

        #[test]
        fn join_is_associative(a in arb_value(), b in arb_value(), c in arb_value()) {
            prop_assert_eq!(a.join(&b).join(&c), a.join(&b.join(&c)));
        }

        #[test]
        fn join_of_tracked_values_is_an_upper_bound(lhs in arb_value(), rhs in arb_value()) {
            // NotDisposable and Unknown deliberately break the upper-bound
            // law: the former absorbs downward, the latter yields to any
            // definite disposal evidence on the other side.
            prop_assume!(!matches!(lhs.kind(), DisposeKind::NotDisposable | DisposeKind::Unknown));
            prop_assume!(!matches!(rhs.kind(), DisposeKind::NotDisposable | DisposeKind::Unknown));
            let joined = lhs.join(&rhs);
            prop_assert!(lhs.partial_cmp(&joined).is_some_and(std::cmp::Ordering::is_le));
            prop_assert!(rhs.partial_cmp(&joined).is_some_and(std::cmp::Ordering::is_le));
        }
    }
}
