//! Error types for construction-time failures.
//!
//! Per-frame work never returns these; problems found while ticking or
//! rendering are logged and skipped.

use thiserror::Error;

use crate::world::NodeId;

/// Errors raised while building actions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("a sequence needs at least one action")]
    EmptySequence,
    #[error("a spawn needs at least one action")]
    EmptySpawn,
    #[error("a repeat needs at least one iteration")]
    ZeroRepeat,
    #[error("an animation needs at least one frame")]
    EmptyAnimation,
}

/// Errors raised by scene graph mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("node {0:?} does not exist")]
    MissingNode(NodeId),
    #[error("node {0:?} already has a parent")]
    AlreadyParented(NodeId),
    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },
    #[error("node {0:?} manages its own children")]
    ManagedChildren(NodeId),
    #[error("node {child:?} cannot be added under itself or its descendant {parent:?}")]
    Cycle { parent: NodeId, child: NodeId },
    #[error("node {0:?} is not a sprite")]
    NotASprite(NodeId),
    #[error("node {0:?} is not a sprite batch")]
    NotABatch(NodeId),
    #[error("node {0:?} is not a tile layer")]
    NotATileLayer(NodeId),
    #[error("node {0:?} is not a bitmap label")]
    NotALabel(NodeId),
    #[error("sprite {sprite:?} does not use the texture of batch {batch:?}")]
    TextureMismatch { batch: NodeId, sprite: NodeId },
    #[error("tile ({x}, {y}) is outside the {width}x{height} layer")]
    TileOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
}

pub type SceneResult<T> = Result<T, SceneError>;
