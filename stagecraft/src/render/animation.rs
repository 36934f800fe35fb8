use super::sprite::SpriteFrame;
use super::texture::Texture;
use crate::actions::{Action, ActionCore, ActionTarget};
use crate::error::ActionError;
use crate::math::{Rect, FLT_EPSILON};

/// A single frame of an animation.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationFrame {
    pub sprite_frame: SpriteFrame,
    /// Length of the frame in units of [`Animation::delay_per_unit`].
    pub delay_units: f32,
}

impl AnimationFrame {
    pub fn new(sprite_frame: SpriteFrame, delay_units: f32) -> Self {
        Self {
            sprite_frame,
            delay_units,
        }
    }
}

/// An ordered list of sprite frames and their timing.
#[derive(Clone, Debug, PartialEq)]
pub struct Animation {
    pub frames: Vec<AnimationFrame>,
    /// Seconds per delay unit.
    pub delay_per_unit: f32,
    pub loops: u32,
    /// Put the frame shown before the animation back once it stops.
    pub restore_original_frame: bool,
}

impl Animation {
    pub fn new(frames: Vec<AnimationFrame>, delay_per_unit: f32) -> Self {
        Self {
            frames,
            delay_per_unit,
            loops: 1,
            restore_original_frame: false,
        }
    }

    /// Every frame lasts one unit of `delay`.
    pub fn from_sprite_frames(frames: &[SpriteFrame], delay: f32) -> Self {
        Self::new(
            frames
                .iter()
                .map(|frame| AnimationFrame::new(*frame, 1.0))
                .collect(),
            delay,
        )
    }

    /// Create an animation from a spritesheet grid.
    ///
    /// Frames are taken row by row from the top-left cell; `frame_count` is
    /// capped at `columns * rows`.
    pub fn from_grid(
        texture: Texture,
        grid_size: (u32, u32),
        frame_count: usize,
        frame_duration: f32,
    ) -> Self {
        let (columns, rows) = (grid_size.0.max(1), grid_size.1.max(1));
        let cell_width = texture.size.width / columns as f32;
        let cell_height = texture.size.height / rows as f32;
        let count = frame_count.min((columns * rows) as usize);

        let frames = (0..count as u32)
            .map(|i| {
                let rect = Rect::new(
                    (i % columns) as f32 * cell_width,
                    (i / columns) as f32 * cell_height,
                    cell_width,
                    cell_height,
                );
                AnimationFrame::new(SpriteFrame::new(texture, rect), 1.0)
            })
            .collect();
        Self::new(frames, frame_duration)
    }

    #[must_use]
    pub fn with_loops(mut self, loops: u32) -> Self {
        self.loops = loops;
        self
    }

    #[must_use]
    pub fn restoring_original_frame(mut self) -> Self {
        self.restore_original_frame = true;
        self
    }

    pub fn total_delay_units(&self) -> f32 {
        self.frames.iter().map(|frame| frame.delay_units).sum()
    }

    /// Length of one loop in seconds.
    pub fn duration(&self) -> f32 {
        self.total_delay_units() * self.delay_per_unit
    }
}

/// Plays an [`Animation`] on a sprite target.
#[derive(Debug)]
pub struct Animate {
    core: ActionCore,
    animation: Animation,
    /// Start of each frame as a fraction of one loop.
    split_times: Vec<f32>,
    next_frame: usize,
    executed_loops: u32,
    original_frame: Option<SpriteFrame>,
    current_frame: Option<usize>,
}

impl Animate {
    pub fn new(animation: Animation) -> Result<Self, ActionError> {
        if animation.frames.is_empty() {
            return Err(ActionError::EmptyAnimation);
        }
        let loops = animation.loops.max(1);
        let single = animation.duration();
        let total_units = animation.total_delay_units();
        let mut accumulated = 0.0;
        let split_times = animation
            .frames
            .iter()
            .map(|frame| {
                let split = if total_units > FLT_EPSILON {
                    accumulated / total_units
                } else {
                    0.0
                };
                accumulated += frame.delay_units;
                split
            })
            .collect();

        Ok(Self {
            core: ActionCore::new(single * loops as f32),
            animation,
            split_times,
            next_frame: 0,
            executed_loops: 0,
            original_frame: None,
            current_frame: None,
        })
    }

    pub fn animation(&self) -> &Animation {
        &self.animation
    }

    /// Index of the frame most recently shown.
    pub fn current_frame_index(&self) -> Option<usize> {
        self.current_frame
    }
}

impl Action for Animate {
    action_core!();

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.core.start(target.node_id());
        self.original_frame = if self.animation.restore_original_frame {
            target.display_frame()
        } else {
            None
        };
        self.next_frame = 0;
        self.executed_loops = 0;
        self.current_frame = None;
    }

    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget) {
        let mut t = t;
        if t < 1.0 {
            t *= self.animation.loops.max(1) as f32;
            let loop_number = t as u32;
            if loop_number > self.executed_loops {
                self.next_frame = 0;
                self.executed_loops += 1;
            }
            t %= 1.0;
        }

        while self.next_frame < self.split_times.len() {
            if self.split_times[self.next_frame] > t {
                break;
            }
            let index = self.next_frame;
            target.set_display_frame(&self.animation.frames[index].sprite_frame);
            self.current_frame = Some(index);
            self.next_frame += 1;
        }
    }

    fn stop(&mut self, target: &mut dyn ActionTarget) {
        if let Some(frame) = self.original_frame.take() {
            target.set_display_frame(&frame);
        }
        self.core.stop();
    }

    fn reverse(&self) -> Box<dyn Action> {
        let mut animation = self.animation.clone();
        animation.frames.reverse();
        match Animate::new(animation) {
            Ok(mut action) => {
                action.core = self.core.reverse_config();
                Box::new(action)
            }
            Err(_) => self.clone_action(),
        }
    }

    fn clone_action(&self) -> Box<dyn Action> {
        Box::new(Self {
            core: self.core.clone_config(),
            animation: self.animation.clone(),
            split_times: self.split_times.clone(),
            next_frame: 0,
            executed_loops: 0,
            original_frame: None,
            current_frame: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Size;
    use crate::node::Node;
    use crate::render::{Sprite, TextureHandle};

    fn sheet() -> Texture {
        Texture::new(TextureHandle::new(4), Size::new(64.0, 32.0))
    }

    fn rect_x(node: &Node) -> f32 {
        node.sprite_data().unwrap().texture_rect().x
    }

    #[test]
    fn grid_frames_are_taken_row_by_row() {
        let animation = Animation::from_grid(sheet(), (4, 2), 6, 0.1);
        assert_eq!(animation.frames.len(), 6);
        assert_eq!(
            animation.frames[5].sprite_frame.rect,
            Rect::new(16.0, 16.0, 16.0, 16.0)
        );
        assert!((animation.duration() - 0.6).abs() < 1e-5);
    }

    #[test]
    fn empty_animation_is_rejected() {
        let animation = Animation::new(Vec::new(), 0.1);
        assert_eq!(Animate::new(animation).err(), Some(ActionError::EmptyAnimation));
    }

    #[test]
    fn frames_switch_at_their_split_times() {
        let animation = Animation::from_grid(sheet(), (4, 1), 4, 0.25);
        let mut node = Node::sprite(Sprite::new(sheet(), Rect::new(0.0, 0.0, 16.0, 32.0)));
        let mut action = Animate::new(animation).unwrap();
        assert_eq!(action.duration(), 1.0);

        action.start_with_target(&mut node);
        action.update(0.0, &mut node);
        assert_eq!(rect_x(&node), 0.0);
        action.update(0.6, &mut node);
        assert_eq!(action.current_frame_index(), Some(2));
        assert_eq!(rect_x(&node), 32.0);
        action.update(1.0, &mut node);
        assert_eq!(rect_x(&node), 48.0);
    }

    #[test]
    fn loops_restart_from_the_first_frame() {
        let animation = Animation::from_grid(sheet(), (4, 1), 2, 0.5).with_loops(2);
        let mut node = Node::sprite(Sprite::new(sheet(), Rect::new(0.0, 0.0, 16.0, 32.0)));
        let mut action = Animate::new(animation).unwrap();
        assert_eq!(action.duration(), 2.0);

        action.start_with_target(&mut node);
        action.update(0.3, &mut node);
        assert_eq!(action.current_frame_index(), Some(1));
        action.update(0.55, &mut node);
        assert_eq!(action.current_frame_index(), Some(0));
    }

    #[test]
    fn stop_restores_the_original_frame() {
        let animation = Animation::from_grid(sheet(), (4, 1), 4, 0.25).restoring_original_frame();
        let mut node = Node::sprite(Sprite::new(sheet(), Rect::new(0.0, 16.0, 16.0, 16.0)));
        let mut action = Animate::new(animation).unwrap();
        action.start_with_target(&mut node);
        action.update(0.8, &mut node);
        assert_eq!(rect_x(&node), 48.0);
        action.stop(&mut node);
        assert_eq!(node.sprite_data().unwrap().texture_rect(), Rect::new(0.0, 16.0, 16.0, 16.0));
    }

    #[test]
    fn reverse_plays_frames_backwards() {
        let animation = Animation::from_grid(sheet(), (4, 1), 4, 0.25);
        let mut node = Node::sprite(Sprite::new(sheet(), Rect::new(0.0, 0.0, 16.0, 32.0)));
        let mut back = Animate::new(animation).unwrap().reverse();
        back.start_with_target(&mut node);
        back.update(0.0, &mut node);
        assert_eq!(rect_x(&node), 48.0);
        back.update(1.0, &mut node);
        assert_eq!(rect_x(&node), 0.0);
    }
}
