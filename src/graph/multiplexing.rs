//! Multiplexing extents, indices and the logical-to-physical index mapper
//!
//! A node or resource can be replicated along independent axes within one
//! logical frame: once per viewport (e.g. stereo eye) and once per cascade.
//! A node's *logical* index is chosen by the execution loop while iterating
//! its replication count; the *physical* index addresses one concrete
//! resource instance and may collapse axes the resource is shared across.

use crate::{ExecutionError, ExecutionResult};

/// A multiplexing axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Viewports,
    Cascades,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Viewports => write!(f, "viewports"),
            Axis::Cascades => write!(f, "cascades"),
        }
    }
}

/// Repetition counts along every multiplexing axis.
///
/// A count of zero means the axis is absent from this frame entirely;
/// nodes multiplexed over an absent axis cannot execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extents {
    pub viewports: u32,
    pub cascades: u32,
}

impl Extents {
    /// No multiplexing at all: one instance of everything.
    pub const SINGLE: Self = Self {
        viewports: 1,
        cascades: 1,
    };

    pub fn axis(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Viewports => self.viewports,
            Axis::Cascades => self.cascades,
        }
    }
}

impl Default for Extents {
    fn default() -> Self {
        Self::SINGLE
    }
}

/// Set of axes a node or resource is replicated over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MultiplexingMode(u8);

impl MultiplexingMode {
    /// A single instance shared across every axis.
    pub const NONE: Self = Self(0);
    pub const VIEWPORTS: Self = Self(1 << 0);
    pub const CASCADES: Self = Self(1 << 1);
    /// Replicated along every axis.
    pub const FULL: Self = Self((1 << 0) | (1 << 1));

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    fn has(&self, axis: Axis) -> bool {
        match axis {
            Axis::Viewports => self.contains(Self::VIEWPORTS),
            Axis::Cascades => self.contains(Self::CASCADES),
        }
    }
}

impl std::ops::BitOr for MultiplexingMode {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// One concrete combination of per-axis repetition indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MultiplexingIndex {
    pub viewport: u32,
    pub cascade: u32,
}

impl MultiplexingIndex {
    /// Flatten under the given extents. Absent axes contribute nothing.
    pub fn to_flat(self, extents: Extents) -> u32 {
        self.viewport * extents.cascades.max(1) + self.cascade
    }
}

/// Number of instances of a node multiplexed with `mode` under `extents`.
///
/// Fails with [`ExecutionError::MultiplexingMismatch`] when the mode names
/// an axis the extents do not have.
pub fn instance_count(mode: MultiplexingMode, extents: Extents) -> ExecutionResult<u32> {
    let mut count = 1;
    for axis in [Axis::Viewports, Axis::Cascades] {
        if mode.has(axis) {
            let extent = extents.axis(axis);
            if extent == 0 {
                return Err(ExecutionError::MultiplexingMismatch { axis });
            }
            count *= extent;
        }
    }
    Ok(count)
}

/// Expand a node's flat logical counter into a full per-axis index.
///
/// Axes the node is not multiplexed over are fixed at zero. The expansion
/// is the inverse of flattening over exactly the node's own axes, so it is
/// deterministic and bijective on `0..instance_count(mode, extents)`.
pub fn logical_index(
    mode: MultiplexingMode,
    flat: u32,
    extents: Extents,
) -> ExecutionResult<MultiplexingIndex> {
    debug_assert!(flat < instance_count(mode, extents)?);
    let mut index = MultiplexingIndex::default();
    let mut rest = flat;
    if mode.has(Axis::Cascades) {
        let extent = extents.cascades;
        if extent == 0 {
            return Err(ExecutionError::MultiplexingMismatch {
                axis: Axis::Cascades,
            });
        }
        index.cascade = rest % extent;
        rest /= extent;
    }
    if mode.has(Axis::Viewports) {
        let extent = extents.viewports;
        if extent == 0 {
            return Err(ExecutionError::MultiplexingMismatch {
                axis: Axis::Viewports,
            });
        }
        index.viewport = rest % extent;
        rest /= extent;
    }
    let _ = rest;
    Ok(index)
}

/// Map a node-level logical index to the physical index of a resource.
///
/// Axes the resource is *not* replicated over collapse to zero: two logical
/// indices that differ only along such an axis address the same physical
/// instance, which is exactly what "shared across that axis" means.
pub fn physical_index(logical: MultiplexingIndex, resource_mode: MultiplexingMode) -> MultiplexingIndex {
    MultiplexingIndex {
        viewport: if resource_mode.has(Axis::Viewports) {
            logical.viewport
        } else {
            0
        },
        cascade: if resource_mode.has(Axis::Cascades) {
            logical.cascade
        } else {
            0
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXTENTS: Extents = Extents {
        viewports: 2,
        cascades: 4,
    };

    #[test]
    fn instance_count_multiplies_only_owned_axes() {
        assert_eq!(instance_count(MultiplexingMode::NONE, EXTENTS).unwrap(), 1);
        assert_eq!(instance_count(MultiplexingMode::CASCADES, EXTENTS).unwrap(), 4);
        assert_eq!(instance_count(MultiplexingMode::FULL, EXTENTS).unwrap(), 8);
    }

    #[test]
    fn absent_axis_is_a_mismatch() {
        let no_cascades = Extents {
            viewports: 2,
            cascades: 0,
        };
        let err = instance_count(MultiplexingMode::CASCADES, no_cascades).unwrap_err();
        assert!(matches!(
            err,
            crate::ExecutionError::MultiplexingMismatch {
                axis: Axis::Cascades
            }
        ));
        // Nodes not touching the absent axis are unaffected.
        assert_eq!(
            instance_count(MultiplexingMode::VIEWPORTS, no_cascades).unwrap(),
            2
        );
    }

    #[test]
    fn logical_index_roundtrips_through_flat() {
        let total = instance_count(MultiplexingMode::FULL, EXTENTS).unwrap();
        let mut seen = std::collections::HashSet::new();
        for flat in 0..total {
            let index = logical_index(MultiplexingMode::FULL, flat, EXTENTS).unwrap();
            assert!(index.viewport < EXTENTS.viewports);
            assert!(index.cascade < EXTENTS.cascades);
            // Bijective: every flat value maps to a distinct index, and
            // flattening it again is the identity.
            assert!(seen.insert(index));
            assert_eq!(index.to_flat(EXTENTS), flat);
        }
    }

    #[test]
    fn mapping_is_idempotent() {
        for flat in 0..8 {
            let logical = logical_index(MultiplexingMode::FULL, flat, EXTENTS).unwrap();
            let once = physical_index(logical, MultiplexingMode::CASCADES);
            let twice = physical_index(once, MultiplexingMode::CASCADES);
            assert_eq!(once, twice);
            // And deterministic across calls.
            assert_eq!(once, physical_index(logical, MultiplexingMode::CASCADES));
        }
    }

    #[test]
    fn shared_axis_collapses_to_one_instance() {
        // A resource shared across viewports: both eyes see the same cascade
        // instance.
        let left = MultiplexingIndex {
            viewport: 0,
            cascade: 2,
        };
        let right = MultiplexingIndex {
            viewport: 1,
            cascade: 2,
        };
        assert_eq!(
            physical_index(left, MultiplexingMode::CASCADES),
            physical_index(right, MultiplexingMode::CASCADES)
        );
        // But a fully multiplexed resource keeps them apart.
        assert_ne!(
            physical_index(left, MultiplexingMode::FULL),
            physical_index(right, MultiplexingMode::FULL)
        );
    }
}
