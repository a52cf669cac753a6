//! PHV container layout.
//!
//! The PHV is a flat array of containers, but the containers are not all the
//! same size. They are grouped into banks of 32-bit, 8-bit and 16-bit
//! containers, and the group a flat index falls into decides how many bits
//! that container holds.
//!
//! # Standard Layout
//!
//! ```text
//!   index   0 ..  63   32-bit containers (64)
//!   index  64 .. 127    8-bit containers (64)
//!   index 128 .. 223   16-bit containers (96)
//! ```
//!
//! The layout is fixed when the model is built. Nothing resizes or reorders
//! containers afterwards.

use std::fmt;

use super::PhvError;

/// Bit width of a PHV container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerWidth {
    /// 8-bit container
    Bits8,
    /// 16-bit container
    Bits16,
    /// 32-bit container
    Bits32,
}

impl ContainerWidth {
    /// Number of bits held by the container.
    #[inline]
    pub fn bits(&self) -> u32 {
        match self {
            ContainerWidth::Bits8 => 8,
            ContainerWidth::Bits16 => 16,
            ContainerWidth::Bits32 => 32,
        }
    }

    /// Mask selecting the bits a container of this width can hold.
    #[inline]
    pub fn mask(&self) -> u32 {
        match self {
            ContainerWidth::Bits8 => 0xFF,
            ContainerWidth::Bits16 => 0xFFFF,
            ContainerWidth::Bits32 => 0xFFFF_FFFF,
        }
    }
}

impl fmt::Display for ContainerWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}b", self.bits())
    }
}

/// A contiguous run of containers sharing one width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerGroup {
    /// Width of every container in the group
    pub width: ContainerWidth,
    /// First flat index of the group
    pub start: usize,
    /// Number of containers in the group
    pub count: usize,
}

impl ContainerGroup {
    /// Create a new group.
    pub const fn new(width: ContainerWidth, start: usize, count: usize) -> Self {
        Self { width, start, count }
    }

    /// One past the last flat index of the group.
    #[inline]
    pub fn end(&self) -> usize {
        self.start + self.count
    }

    /// Check if a flat index falls inside this group.
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end()
    }
}

/// Number of 32-bit containers in the standard layout.
pub const STANDARD_WORDS: usize = 64;
/// Number of 8-bit containers in the standard layout.
pub const STANDARD_BYTES: usize = 64;
/// Number of 16-bit containers in the standard layout.
pub const STANDARD_HALVES: usize = 96;

/// Container layout of a PHV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhvLayout {
    groups: Vec<ContainerGroup>,
    /// Width of each flat index, precomputed for O(1) lookup
    widths: Vec<ContainerWidth>,
}

impl PhvLayout {
    /// Build a layout from groups.
    ///
    /// Groups must be listed in index order, start at 0 and leave no gaps.
    pub fn new(groups: Vec<ContainerGroup>) -> Result<Self, PhvError> {
        let mut next = 0;
        for group in &groups {
            if group.start != next {
                return Err(PhvError::InvalidLayout(format!(
                    "group at index {} does not continue from index {}",
                    group.start, next
                )));
            }
            if group.count == 0 {
                return Err(PhvError::InvalidLayout(format!(
                    "empty {} group at index {}",
                    group.width, group.start
                )));
            }
            next = group.end();
        }
        if next == 0 {
            return Err(PhvError::InvalidLayout("layout has no containers".to_string()));
        }

        let mut widths = Vec::with_capacity(next);
        for group in &groups {
            widths.extend(std::iter::repeat(group.width).take(group.count));
        }

        Ok(Self { groups, widths })
    }

    /// The standard 224-container layout.
    pub fn standard() -> Self {
        let words = ContainerGroup::new(ContainerWidth::Bits32, 0, STANDARD_WORDS);
        let bytes = ContainerGroup::new(ContainerWidth::Bits8, words.end(), STANDARD_BYTES);
        let halves = ContainerGroup::new(ContainerWidth::Bits16, bytes.end(), STANDARD_HALVES);
        let mut widths = Vec::with_capacity(halves.end());
        for group in [words, bytes, halves] {
            widths.extend(std::iter::repeat(group.width).take(group.count));
        }
        Self {
            groups: vec![words, bytes, halves],
            widths,
        }
    }

    /// Total number of containers.
    #[inline]
    pub fn len(&self) -> usize {
        self.widths.len()
    }

    /// Always false; a layout has at least one container.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }

    /// Width of the container at `index`, or `None` if out of range.
    #[inline]
    pub fn width(&self, index: usize) -> Option<ContainerWidth> {
        self.widths.get(index).copied()
    }

    /// Group containing `index`.
    pub fn group_of(&self, index: usize) -> Option<&ContainerGroup> {
        self.groups.iter().find(|g| g.contains(index))
    }

    /// All groups in index order.
    pub fn groups(&self) -> &[ContainerGroup] {
        &self.groups
    }
}

impl Default for PhvLayout {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_layout_widths() {
        let layout = PhvLayout::standard();
        assert_eq!(layout.len(), 224);
        assert_eq!(layout.width(0), Some(ContainerWidth::Bits32));
        assert_eq!(layout.width(63), Some(ContainerWidth::Bits32));
        assert_eq!(layout.width(64), Some(ContainerWidth::Bits8));
        assert_eq!(layout.width(127), Some(ContainerWidth::Bits8));
        assert_eq!(layout.width(128), Some(ContainerWidth::Bits16));
        assert_eq!(layout.width(223), Some(ContainerWidth::Bits16));
        assert_eq!(layout.width(224), None);
    }

    #[test]
    fn test_group_of() {
        let layout = PhvLayout::standard();
        let group = layout.group_of(100).unwrap();
        assert_eq!(group.width, ContainerWidth::Bits8);
        assert_eq!(group.start, 64);
        assert!(layout.group_of(500).is_none());
    }

    #[test]
    fn test_new_matches_standard() {
        let layout = PhvLayout::new(vec![
            ContainerGroup::new(ContainerWidth::Bits32, 0, 64),
            ContainerGroup::new(ContainerWidth::Bits8, 64, 64),
            ContainerGroup::new(ContainerWidth::Bits16, 128, 96),
        ])
        .unwrap();
        assert_eq!(layout, PhvLayout::standard());
    }

    #[test]
    fn test_new_rejects_gap() {
        let result = PhvLayout::new(vec![
            ContainerGroup::new(ContainerWidth::Bits32, 0, 4),
            ContainerGroup::new(ContainerWidth::Bits8, 8, 4),
        ]);
        assert!(matches!(result, Err(PhvError::InvalidLayout(_))));
    }

    #[test]
    fn test_new_rejects_empty() {
        assert!(PhvLayout::new(vec![]).is_err());
        assert!(PhvLayout::new(vec![ContainerGroup::new(ContainerWidth::Bits8, 0, 0)]).is_err());
    }

    #[test]
    fn test_width_masks() {
        assert_eq!(ContainerWidth::Bits8.mask(), 0xFF);
        assert_eq!(ContainerWidth::Bits16.mask(), 0xFFFF);
        assert_eq!(ContainerWidth::Bits32.mask(), u32::MAX);
        assert_eq!(format!("{}", ContainerWidth::Bits16), "16b");
    }
}
