use glam::Mat4;

use super::atlas::Quad;
use super::texture::TextureHandle;
use crate::math::AffineTransform;
use crate::world::NodeId;

/// A draw request produced while visiting the scene graph.
///
/// Commands arrive at the sink in traversal order; a backend that draws them
/// in that order reproduces the scene's z ordering.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderCommand {
    /// A standalone sprite. Vertices are in the sprite's local space.
    Sprite {
        node: NodeId,
        texture: TextureHandle,
        quad: Quad,
        transform: AffineTransform,
        z: f32,
    },
    /// Every live quad of a batch. Vertices are in the batch's local space.
    Quads {
        node: NodeId,
        texture: TextureHandle,
        quads: Vec<Quad>,
        transform: AffineTransform,
        z: f32,
    },
}

impl RenderCommand {
    pub fn node(&self) -> NodeId {
        match self {
            RenderCommand::Sprite { node, .. } | RenderCommand::Quads { node, .. } => *node,
        }
    }

    pub fn texture(&self) -> TextureHandle {
        match self {
            RenderCommand::Sprite { texture, .. } | RenderCommand::Quads { texture, .. } => *texture,
        }
    }

    pub fn transform(&self) -> AffineTransform {
        match self {
            RenderCommand::Sprite { transform, .. } | RenderCommand::Quads { transform, .. } => {
                *transform
            }
        }
    }

    /// Node-to-world matrix for a vertex shader.
    pub fn model_matrix(&self) -> Mat4 {
        match self {
            RenderCommand::Sprite { transform, z, .. } | RenderCommand::Quads { transform, z, .. } => {
                transform.to_mat4(*z)
            }
        }
    }

    /// The same command placed under `parent`.
    pub fn with_parent_transform(&self, parent: &AffineTransform) -> Self {
        let mut command = self.clone();
        match &mut command {
            RenderCommand::Sprite { transform, .. } | RenderCommand::Quads { transform, .. } => {
                *transform = transform.concat(parent);
            }
        }
        command
    }

    pub fn quad_count(&self) -> usize {
        match self {
            RenderCommand::Sprite { .. } => 1,
            RenderCommand::Quads { quads, .. } => quads.len(),
        }
    }
}

/// Receives render commands in traversal order.
pub trait RenderSink {
    fn submit(&mut self, command: RenderCommand);
}

/// A sink that simply records what it receives.
#[derive(Clone, Debug, Default)]
pub struct CommandQueue {
    commands: Vec<RenderCommand>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, RenderCommand> {
        self.commands.drain(..)
    }

    pub(crate) fn into_commands(self) -> Vec<RenderCommand> {
        self.commands
    }
}

impl RenderSink for CommandQueue {
    fn submit(&mut self, command: RenderCommand) {
        self.commands.push(command);
    }
}
