//! Parsed Header Vector (PHV).
//!
//! The PHV is the per-packet working set that flows through the pipeline:
//! every header field the parser extracted, and every value a stage
//! computed, lives in one of its containers.
//!
//! A PHV is passive data. It has:
//! - A fixed array of containers, addressed by flat index (see [`PhvLayout`])
//! - A direction tag (ingress or egress)
//! - A version number with a valid flag, consumed by the stages
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use mau_model::phv::{Phv, PhvLayout};
//!
//! let mut phv = Phv::new(Arc::new(PhvLayout::standard()));
//! phv.set_ingress();
//! phv.set(0, 0x756a_045e);
//! phv.set(64, 0x1234); // 8-bit container, keeps 0x34
//! assert_eq!(phv.get(0), 0x756a_045e);
//! assert_eq!(phv.get(64), 0x34);
//! ```

pub mod layout;
pub mod pool;

pub use layout::{ContainerGroup, ContainerWidth, PhvLayout};
pub use pool::PhvPool;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use pool::PoolLease;

/// Largest version number a PHV can carry (4-bit field).
pub const MAX_VERSION: u8 = 0xF;

/// Errors raised at the PHV boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhvError {
    /// Container index outside the layout
    #[error("PHV index {index} out of range (layout has {len} containers)")]
    IndexOutOfRange { index: usize, len: usize },

    /// The PHV pool has no free slots
    #[error("PHV pool exhausted ({limit} PHVs in flight)")]
    PoolExhausted { limit: usize },

    /// Two PHVs with different layouts were mixed
    #[error("PHV layouts differ")]
    LayoutMismatch,

    /// A layout description was rejected
    #[error("invalid PHV layout: {0}")]
    InvalidLayout(String),
}

/// Pipeline direction a PHV belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// Ingress pipeline
    Ingress,
    /// Egress pipeline
    #[default]
    Egress,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Ingress => write!(f, "ingress"),
            Direction::Egress => write!(f, "egress"),
        }
    }
}

/// Version tag attached to a whole PHV.
///
/// Stages only act on a PHV whose version is valid. A stage may
/// additionally require a specific version number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhvVersion {
    /// Version number (4 bits)
    pub version: u8,
    /// Whether this generation is live
    pub valid: bool,
}

impl Default for PhvVersion {
    fn default() -> Self {
        Self { version: 0, valid: true }
    }
}

/// A Parsed Header Vector.
///
/// Not `Clone`: copies are made through [`PhvPool::allocate_copy`] so the
/// pool can account for every PHV in flight.
pub struct Phv {
    values: Box<[u32]>,
    layout: Arc<PhvLayout>,
    direction: Direction,
    version: PhvVersion,
    /// Slot held in the pool that allocated this PHV (None if unpooled)
    lease: Option<PoolLease>,
}

impl Phv {
    /// Create a zeroed, unpooled PHV.
    pub fn new(layout: Arc<PhvLayout>) -> Self {
        Self {
            values: vec![0; layout.len()].into_boxed_slice(),
            layout,
            direction: Direction::default(),
            version: PhvVersion::default(),
            lease: None,
        }
    }

    pub(crate) fn with_lease(layout: Arc<PhvLayout>, lease: PoolLease) -> Self {
        let mut phv = Self::new(layout);
        phv.lease = Some(lease);
        phv
    }

    /// Number of containers.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false for a PHV built from a valid layout.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The container layout.
    pub fn layout(&self) -> &Arc<PhvLayout> {
        &self.layout
    }

    /// Width of the container at `index`.
    pub fn width(&self, index: usize) -> Option<ContainerWidth> {
        self.layout.width(index)
    }

    /// Write a container, masking the value to the container's width.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the layout.
    pub fn set(&mut self, index: usize, value: u32) {
        if let Err(e) = self.try_set(index, value) {
            panic!("{}", e);
        }
    }

    /// Read a container.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the layout.
    pub fn get(&self, index: usize) -> u32 {
        match self.try_get(index) {
            Ok(value) => value,
            Err(e) => panic!("{}", e),
        }
    }

    /// Checked form of [`Phv::set`].
    pub fn try_set(&mut self, index: usize, value: u32) -> Result<(), PhvError> {
        let width = self.layout.width(index).ok_or(PhvError::IndexOutOfRange {
            index,
            len: self.values.len(),
        })?;
        self.values[index] = value & width.mask();
        Ok(())
    }

    /// Checked form of [`Phv::get`].
    pub fn try_get(&self, index: usize) -> Result<u32, PhvError> {
        self.values
            .get(index)
            .copied()
            .ok_or(PhvError::IndexOutOfRange { index, len: self.values.len() })
    }

    /// Tag the PHV as ingress.
    pub fn set_ingress(&mut self) {
        self.direction = Direction::Ingress;
    }

    /// Tag the PHV as egress.
    pub fn set_egress(&mut self) {
        self.direction = Direction::Egress;
    }

    /// Current direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// True if tagged ingress.
    pub fn is_ingress(&self) -> bool {
        self.direction == Direction::Ingress
    }

    /// Attach a version number and live flag. Only the low 4 bits of
    /// `version` are kept.
    pub fn set_version(&mut self, version: u8, valid: bool) {
        self.version = PhvVersion {
            version: version & MAX_VERSION,
            valid,
        };
    }

    /// Current version tag.
    pub fn version(&self) -> PhvVersion {
        self.version
    }

    /// Zero every container. Metadata is left alone.
    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0);
    }

    /// Copy container values and metadata from another PHV.
    pub fn copy_fields_from(&mut self, other: &Phv) -> Result<(), PhvError> {
        if self.layout != other.layout {
            return Err(PhvError::LayoutMismatch);
        }
        self.values.copy_from_slice(&other.values);
        self.direction = other.direction;
        self.version = other.version;
        Ok(())
    }

    /// Iterate `(index, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.values.iter().copied().enumerate()
    }

    /// Raw container values.
    pub fn values(&self) -> &[u32] {
        &self.values
    }

    /// True if this PHV holds a pool slot.
    pub fn is_pooled(&self) -> bool {
        self.lease.is_some()
    }
}

impl fmt::Debug for Phv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nonzero: Vec<_> = self.iter().filter(|(_, v)| *v != 0).collect();
        f.debug_struct("Phv")
            .field("direction", &self.direction)
            .field("version", &self.version)
            .field("nonzero", &nonzero)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phv() -> Phv {
        Phv::new(Arc::new(PhvLayout::standard()))
    }

    #[test]
    fn test_new_is_zeroed() {
        let p = phv();
        assert_eq!(p.len(), 224);
        assert!(p.iter().all(|(_, v)| v == 0));
        assert_eq!(p.direction(), Direction::Egress);
        assert_eq!(p.version(), PhvVersion { version: 0, valid: true });
        assert!(!p.is_pooled());
    }

    #[test]
    fn test_round_trip_masks_to_width() {
        let mut p = phv();
        for i in 0..p.len() {
            p.set(i, 0xDEAD_BEEF);
        }
        for i in 0..64 {
            assert_eq!(p.get(i), 0xDEAD_BEEF);
        }
        for i in 64..128 {
            assert_eq!(p.get(i), 0xEF);
        }
        for i in 128..224 {
            assert_eq!(p.get(i), 0xBEEF);
        }
    }

    #[test]
    fn test_adjacent_writes_are_isolated() {
        let mut p = phv();
        // Boundaries between groups and neighbours within a group
        for i in [0usize, 1, 63, 64, 65, 127, 128, 129, 222, 223] {
            p.clear();
            p.set(i, u32::MAX);
            for j in 0..p.len() {
                if j != i {
                    assert_eq!(p.get(j), 0, "write to {} leaked into {}", i, j);
                }
            }
        }
    }

    #[test]
    fn test_overwrite_keeps_neighbours() {
        let mut p = phv();
        p.set(70, 0x11);
        p.set(71, 0x22);
        p.set(72, 0x33);
        p.set(71, 0x1FF);
        assert_eq!(p.get(70), 0x11);
        assert_eq!(p.get(71), 0xFF);
        assert_eq!(p.get(72), 0x33);
    }

    #[test]
    fn test_try_get_out_of_range() {
        let mut p = phv();
        assert_eq!(p.try_get(224), Err(PhvError::IndexOutOfRange { index: 224, len: 224 }));
        assert!(p.try_set(1000, 1).is_err());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_get_out_of_range_panics() {
        phv().get(224);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_set_out_of_range_panics() {
        phv().set(300, 1);
    }

    #[test]
    fn test_version_is_four_bits() {
        let mut p = phv();
        p.set_version(0x13, false);
        assert_eq!(p.version(), PhvVersion { version: 3, valid: false });
    }

    #[test]
    fn test_direction_tags() {
        let mut p = phv();
        p.set_ingress();
        assert!(p.is_ingress());
        p.set_egress();
        assert_eq!(p.direction(), Direction::Egress);
    }

    #[test]
    fn test_copy_fields_from() {
        let mut a = phv();
        a.set(5, 42);
        a.set_ingress();
        a.set_version(2, true);
        let mut b = phv();
        b.copy_fields_from(&a).unwrap();
        assert_eq!(b.get(5), 42);
        assert!(b.is_ingress());
        assert_eq!(b.version().version, 2);
    }

    #[test]
    fn test_copy_fields_rejects_other_layout() {
        let small = PhvLayout::new(vec![ContainerGroup::new(ContainerWidth::Bits8, 0, 4)]).unwrap();
        let mut a = Phv::new(Arc::new(small));
        assert_eq!(a.copy_fields_from(&phv()), Err(PhvError::LayoutMismatch));
    }
}
