//! Physics error types

use strider_core::NodeId;
use thiserror::Error;

use crate::object::CollisionObjectId;

/// Physics errors
#[derive(Error, Debug)]
pub enum PhysicsError {
    #[error("Invalid collision shape: {0}")]
    InvalidShape(String),

    #[error("Node {0} has no renderable geometry to build a {1} shape from")]
    MissingGeometry(NodeId, &'static str),

    #[error("{0} shapes are only supported on static collision objects")]
    UnsupportedDynamicShape(&'static str),

    #[error("Heightfield error: {0}")]
    Heightfield(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid collision object properties: {0}")]
    InvalidProperties(String),

    #[error("Properties parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown collision object: {0}")]
    UnknownObject(CollisionObjectId),

    #[error("Unknown scene node: {0}")]
    UnknownNode(NodeId),
}

/// Result type for physics operations
pub type PhysicsResult<T> = Result<T, PhysicsError>;
