//! Per-step world actions

use strider_core::Positionable;

use crate::object::CollisionObjectId;
use crate::query::CollisionQueryable;

/// Something the world calls once per simulation step
pub trait ActionInterface {
    /// Advance by `dt` seconds, moving `node` as needed
    fn update_action(&mut self, world: &mut dyn CollisionQueryable, node: &mut dyn Positionable, dt: f32);
}

/// Registered actions, invoked in registration order
#[derive(Debug, Default, Clone)]
pub struct ActionList {
    actions: Vec<CollisionObjectId>,
}

impl ActionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action; registering twice is a no-op
    pub fn register(&mut self, id: CollisionObjectId) -> bool {
        if self.actions.contains(&id) {
            return false;
        }
        self.actions.push(id);
        true
    }

    pub fn unregister(&mut self, id: CollisionObjectId) -> bool {
        let before = self.actions.len();
        self.actions.retain(|a| *a != id);
        self.actions.len() != before
    }

    pub fn contains(&self, id: CollisionObjectId) -> bool {
        self.actions.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = CollisionObjectId> + '_ {
        self.actions.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
