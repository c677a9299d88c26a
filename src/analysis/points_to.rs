//! The points-to analysis result consumed by the dispose analysis.
//!
//! The dispose analysis does not compute aliasing itself; a prior points-to
//! pass supplies, per operation, the set of abstract locations the
//! operation's value may reference. The result is read-only once built and
//! may be shared across analysis threads.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt::Display;

use crate::ir::OperationId;
use crate::symbols::TypeId;

/// Identifies an abstract location: a class of runtime objects that may
/// alias one another.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
#[repr(transparent)]
pub struct LocationId(u32);

impl LocationId {
    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

impl Display for LocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "l{}", self.0)
    }
}

/// What a points-to pass knows about one operation's value.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum PointsToValue {
    /// The pass has no information about the value.
    Unknown,
    /// The value is not a reference to a heap location.
    NoLocation,
    /// The value references one of the given locations.
    Known(BTreeSet<LocationId>),
}

impl PointsToValue {
    /// A known points-to value.
    ///
    /// # Panics
    /// Panics if the location set is empty; a known value must reference at
    /// least one location.
    #[must_use]
    pub fn known(locations: impl IntoIterator<Item = LocationId>) -> Self {
        let locations: BTreeSet<_> = locations.into_iter().collect();
        assert!(
            !locations.is_empty(),
            "A known points-to value must reference at least one location"
        );
        Self::Known(locations)
    }

    /// The referenced locations, when they are known.
    #[must_use]
    pub fn locations(&self) -> Option<&BTreeSet<LocationId>> {
        match self {
            Self::Known(locations) => Some(locations),
            Self::Unknown | Self::NoLocation => None,
        }
    }
}

/// The per-operation result of a points-to pass, plus the static type of
/// every abstract location it allocated.
#[derive(Debug, Clone, Default)]
pub struct PointsToResult {
    location_types: Vec<TypeId>,
    values: BTreeMap<OperationId, PointsToValue>,
}

impl PointsToResult {
    /// Creates an empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh abstract location with the given static type.
    ///
    /// # Panics
    /// Panics if the number of locations exceeds `u32::MAX`.
    pub fn new_location(&mut self, ty: TypeId) -> LocationId {
        let id = u32::try_from(self.location_types.len())
            .expect("The number of locations should be within u32");
        self.location_types.push(ty);
        LocationId(id)
    }

    /// The static type of a location.
    ///
    /// # Panics
    /// Panics if the id does not belong to this result.
    #[must_use]
    pub fn location_type(&self, location: LocationId) -> TypeId {
        self.location_types[location.0 as usize]
    }

    /// Records the points-to value of an operation.
    pub fn record(&mut self, operation: OperationId, value: PointsToValue) {
        self.values.insert(operation, value);
    }

    /// The points-to value of an operation; operations the pass never saw
    /// read as [`PointsToValue::Unknown`].
    #[must_use]
    pub fn value_of(&self, operation: OperationId) -> &PointsToValue {
        self.values.get(&operation).unwrap_or(&PointsToValue::Unknown)
    }
}
