//! Declarative collision object descriptions
//!
//! Scenario files describe collision objects as JSON blocks:
//!
//! ```json
//! {
//!     "type": "CHARACTER",
//!     "shape": { "type": "CAPSULE", "radius": 0.4, "height": 1.8 },
//!     "mass": 80.0,
//!     "maxStepHeight": 0.3,
//!     "maxSlopeAngle": 50.0
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::character::{DEFAULT_MAX_SLOPE_ANGLE, DEFAULT_MAX_STEP_HEIGHT};
use crate::error::{PhysicsError, PhysicsResult};
use crate::filter::{CollisionFilter, CollisionGroup};
use crate::rigid_body::RigidBodyParameters;
use crate::shape::ShapeDefinition;

/// Mass a character pushes with when none is given
pub const DEFAULT_CHARACTER_MASS: f32 = 1.0;

/// Kind of collision object a properties block builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollisionObjectType {
    Character,
    RigidBody,
    GhostObject,
}

impl CollisionObjectType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Character => "CHARACTER",
            Self::RigidBody => "RIGID_BODY",
            Self::GhostObject => "GHOST_OBJECT",
        }
    }

    fn default_group(&self) -> CollisionGroup {
        match self {
            Self::Character => CollisionGroup::CHARACTER,
            Self::RigidBody => CollisionGroup::DEFAULT,
            Self::GhostObject => CollisionGroup::SENSOR,
        }
    }
}

/// One collision object block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollisionObjectProperties {
    #[serde(rename = "type")]
    pub object_type: CollisionObjectType,
    #[serde(default)]
    pub shape: Option<ShapeDefinition>,
    /// Overrides `rigidBody.mass`; for characters, the pushing mass
    #[serde(default)]
    pub mass: Option<f32>,
    #[serde(default = "default_max_step_height")]
    pub max_step_height: f32,
    /// Degrees
    #[serde(default = "default_max_slope_angle")]
    pub max_slope_angle: f32,
    #[serde(default)]
    pub rigid_body: RigidBodyParameters,
    #[serde(default)]
    pub group: Option<u32>,
    #[serde(default)]
    pub mask: Option<u32>,
}

fn default_max_step_height() -> f32 {
    DEFAULT_MAX_STEP_HEIGHT
}

fn default_max_slope_angle() -> f32 {
    DEFAULT_MAX_SLOPE_ANGLE
}

impl CollisionObjectProperties {
    /// Properties block with defaults for everything but the shape
    pub fn new(object_type: CollisionObjectType, shape: ShapeDefinition) -> Self {
        Self {
            object_type,
            shape: Some(shape),
            mass: None,
            max_step_height: DEFAULT_MAX_STEP_HEIGHT,
            max_slope_angle: DEFAULT_MAX_SLOPE_ANGLE,
            rigid_body: RigidBodyParameters::default(),
            group: None,
            mask: None,
        }
    }

    /// Parse and validate a JSON properties block
    pub fn from_json(json: &str) -> PhysicsResult<Self> {
        let properties: Self = serde_json::from_str(json)?;
        properties.validate()?;
        Ok(properties)
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = Some(mass);
        self
    }

    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.group = Some(filter.group.bits());
        self.mask = Some(filter.mask.bits());
        self
    }

    /// Check value ranges and required fields
    pub fn validate(&self) -> PhysicsResult<()> {
        if self.shape.is_none() {
            return Err(PhysicsError::InvalidProperties(format!(
                "{} block has no shape",
                self.object_type.name()
            )));
        }
        if self.mass.is_some_and(|mass| mass < 0.0 || !mass.is_finite()) || self.rigid_body.mass < 0.0 {
            return Err(PhysicsError::InvalidProperties("mass must be non-negative".to_string()));
        }
        if !(0.0..=90.0).contains(&self.max_slope_angle) {
            return Err(PhysicsError::InvalidProperties(format!(
                "maxSlopeAngle {} is outside [0, 90]",
                self.max_slope_angle
            )));
        }
        if self.max_step_height < 0.0 {
            return Err(PhysicsError::InvalidProperties(format!(
                "maxStepHeight {} is negative",
                self.max_step_height
            )));
        }
        Ok(())
    }

    /// Validate and require a specific object type
    pub fn expect_type(&self, expected: CollisionObjectType) -> PhysicsResult<&ShapeDefinition> {
        if self.object_type != expected {
            return Err(PhysicsError::InvalidProperties(format!(
                "expected a {} block, found {}",
                expected.name(),
                self.object_type.name()
            )));
        }
        self.validate()?;
        self.shape
            .as_ref()
            .ok_or_else(|| PhysicsError::InvalidProperties(format!("{} block has no shape", expected.name())))
    }

    /// Group and mask, defaulting the group by object type
    pub fn filter(&self) -> CollisionFilter {
        CollisionFilter::from_bits(
            self.group.unwrap_or_else(|| self.object_type.default_group().bits()),
            self.mask.unwrap_or(CollisionGroup::ALL.bits()),
        )
    }

    /// Rigid body parameters with the top-level mass applied
    pub fn rigid_body_parameters(&self) -> RigidBodyParameters {
        let mut parameters = self.rigid_body.clone();
        if let Some(mass) = self.mass {
            parameters.mass = mass;
        }
        parameters
    }

    pub fn character_mass(&self) -> f32 {
        self.mass.unwrap_or(DEFAULT_CHARACTER_MASS)
    }
}
