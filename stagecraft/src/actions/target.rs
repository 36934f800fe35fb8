use crate::math::{Color3B, Vec2};
use crate::render::SpriteFrame;
use crate::world::NodeId;

/// The properties an action may read and mutate on its target.
///
/// Anything exposing these can be animated; [`Node`](crate::node::Node)
/// implements it directly and [`NodeMut`](crate::world::NodeMut) implements it
/// through the scene graph so dirty flags and cascading values propagate.
pub trait ActionTarget {
    /// Graph identity of the target, if it lives in a [`SceneGraph`](crate::world::SceneGraph).
    fn node_id(&self) -> Option<NodeId> {
        None
    }

    fn position(&self) -> Vec2;
    fn set_position(&mut self, position: Vec2);

    fn rotation_x(&self) -> f32;
    fn rotation_y(&self) -> f32;
    fn set_rotation_x(&mut self, degrees: f32);
    fn set_rotation_y(&mut self, degrees: f32);

    fn scale_x(&self) -> f32;
    fn scale_y(&self) -> f32;
    fn set_scale_x(&mut self, scale: f32);
    fn set_scale_y(&mut self, scale: f32);

    fn skew_x(&self) -> f32;
    fn skew_y(&self) -> f32;
    fn set_skew_x(&mut self, degrees: f32);
    fn set_skew_y(&mut self, degrees: f32);

    fn opacity(&self) -> u8;
    fn set_opacity(&mut self, opacity: u8);

    fn color(&self) -> Color3B;
    fn set_color(&mut self, color: Color3B);

    fn is_visible(&self) -> bool;
    fn set_visible(&mut self, visible: bool);

    fn set_flipped_x(&mut self, _flipped: bool) {
        log::warn!("flip requested on a target that is not a sprite");
    }

    fn set_flipped_y(&mut self, _flipped: bool) {
        log::warn!("flip requested on a target that is not a sprite");
    }

    fn display_frame(&self) -> Option<SpriteFrame> {
        None
    }

    fn set_display_frame(&mut self, _frame: &SpriteFrame) {
        log::warn!("sprite frame requested on a target that is not a sprite");
    }

    fn remove_from_parent(&mut self, _cleanup: bool) {
        log::warn!("remove requested on a target that is not attached to a scene graph");
    }
}
