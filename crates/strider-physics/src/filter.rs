//! Collision groups and masks

use bitflags::bitflags;
use rapier3d::prelude::{Group, InteractionGroups};

bitflags! {
    /// Collision group membership bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CollisionGroup: u32 {
        const DEFAULT = 1 << 0;
        const STATIC = 1 << 1;
        const KINEMATIC = 1 << 2;
        const DEBRIS = 1 << 3;
        const SENSOR = 1 << 4;
        const CHARACTER = 1 << 5;
        const ALL = u32::MAX;
    }
}

/// Group membership plus the groups an object is willing to interact with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollisionFilter {
    /// Groups this object belongs to
    pub group: CollisionGroup,
    /// Groups this object collides with
    pub mask: CollisionGroup,
}

impl CollisionFilter {
    /// Create a filter
    pub fn new(group: CollisionGroup, mask: CollisionGroup) -> Self {
        Self { group, mask }
    }

    /// Both sides must accept each other
    pub fn interacts_with(&self, other: &CollisionFilter) -> bool {
        self.group.intersects(other.mask) && other.group.intersects(self.mask)
    }

    /// Build a filter from raw bit patterns
    pub fn from_bits(group: u32, mask: u32) -> Self {
        Self {
            group: CollisionGroup::from_bits_retain(group),
            mask: CollisionGroup::from_bits_retain(mask),
        }
    }

    pub(crate) fn to_interaction_groups(self) -> InteractionGroups {
        InteractionGroups::new(
            Group::from_bits_truncate(self.group.bits()),
            Group::from_bits_truncate(self.mask.bits()),
        )
    }
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self {
            group: CollisionGroup::DEFAULT,
            mask: CollisionGroup::ALL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_interacts_with_everything() {
        let a = CollisionFilter::default();
        let b = CollisionFilter::new(CollisionGroup::STATIC, CollisionGroup::ALL);
        assert!(a.interacts_with(&b));
        assert!(b.interacts_with(&a));
    }

    #[test]
    fn test_filter_is_symmetric() {
        let debris = CollisionFilter::new(CollisionGroup::DEBRIS, CollisionGroup::STATIC);
        let character = CollisionFilter::new(CollisionGroup::CHARACTER, CollisionGroup::ALL);
        // Character accepts debris, but debris only accepts static geometry.
        assert!(!debris.interacts_with(&character));
        assert!(!character.interacts_with(&debris));
    }

    #[test]
    fn test_from_bits_keeps_unnamed_groups() {
        let filter = CollisionFilter::from_bits(1 << 9, 1 << 9);
        assert!(filter.interacts_with(&filter));
        assert!(!filter.interacts_with(&CollisionFilter::default()));
    }
}
