//! Stagecraft - a scene graph and action engine for 2D games.
//!
//! Nodes live in a [`SceneGraph`] arena and are animated by [`actions`]
//! stepped through an [`ActionManager`]. Sprites sharing a texture can be
//! drawn through a [`SpriteBatch`], [`TileLayer`] or [`BitmapLabel`]; the
//! graph emits [`RenderCommand`]s in traversal order for a backend to draw.
//! [`Stage`] ties the pieces into a frame loop.

/// Implements [`Action::core`](crate::actions::Action::core) and
/// [`Action::core_mut`](crate::actions::Action::core_mut) for types with a
/// `core: ActionCore` field.
macro_rules! action_core {
    () => {
        fn core(&self) -> &$crate::actions::ActionCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut $crate::actions::ActionCore {
            &mut self.core
        }
    };
}

pub mod actions;
pub mod error;
pub mod hierarchy;
pub mod math;
pub mod node;
pub mod render;
pub mod scheduler;
pub mod stage;
pub mod world;

pub use crate::actions::{Action, ActionExt, ActionManager, ActionTarget, Easing};
pub use crate::error::{ActionError, SceneError, SceneResult};
pub use crate::math::{AffineTransform, Color3B, Rect, Size, Vec2};
pub use crate::node::Node;
pub use crate::render::{
    BitmapLabel, CommandQueue, RenderCommand, RenderSink, Sprite, SpriteBatch, SpriteFrame,
    Texture, TextureHandle, TileLayer,
};
pub use crate::scheduler::Scheduler;
pub use crate::stage::{Stage, StageConfig};
pub use crate::world::{NodeId, NodeMut, SceneGraph};
