//! Collision object identity

/// Handle of any object registered with the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollisionObjectId(pub u32);

impl CollisionObjectId {
    /// Raw id value
    pub fn value(&self) -> u32 {
        self.0
    }

    pub(crate) fn to_user_data(self) -> u128 {
        self.0 as u128
    }

    pub(crate) fn from_user_data(data: u128) -> Self {
        Self(data as u32)
    }
}

impl std::fmt::Display for CollisionObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "object#{}", self.0)
    }
}

/// What kind of collision object a handle refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Simulated body (static, kinematic or dynamic)
    RigidBody,
    /// Overlap-only probe volume
    GhostObject,
    /// Kinematic character controller (a ghost probe that moves itself)
    Character,
}

impl ObjectKind {
    /// Ghosts and characters never take part in contact response
    pub fn is_ghost(&self) -> bool {
        matches!(self, Self::GhostObject | Self::Character)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_data_round_trip() {
        let id = CollisionObjectId(42);
        assert_eq!(CollisionObjectId::from_user_data(id.to_user_data()), id);
        assert_eq!(id.to_string(), "object#42");
    }

    #[test]
    fn test_characters_count_as_ghosts() {
        assert!(ObjectKind::Character.is_ghost());
        assert!(ObjectKind::GhostObject.is_ghost());
        assert!(!ObjectKind::RigidBody.is_ghost());
    }
}
