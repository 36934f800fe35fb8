//! Leaf interval actions: motion, rotation, scale, skew, opacity, tint.
//!
//! "By" actions animate a relative delta and reverse by negating it. "To"
//! actions animate toward an absolute value captured at start and cannot be
//! reversed; asking for their reverse logs a warning and yields an
//! [`InertAction`] of the same duration.

use super::action::{Action, ActionCore};
use super::ease::bezier_at;
use super::target::ActionTarget;
use crate::math::{Color3B, Vec2};

/// No-op interval used where a real reverse does not exist.
#[derive(Debug)]
pub struct InertAction {
    core: ActionCore,
}

impl InertAction {
    pub fn new(duration: f32) -> Self {
        Self {
            core: ActionCore::new(duration),
        }
    }
}

impl Action for InertAction {
    action_core!();

    fn apply(&mut self, _t: f32, _target: &mut dyn ActionTarget) {}

    fn reverse(&self) -> Box<dyn Action> {
        self.clone_action()
    }

    fn clone_action(&self) -> Box<dyn Action> {
        Box::new(Self {
            core: self.core.clone_config(),
        })
    }
}

pub(crate) fn unsupported_reverse(name: &str, core: &ActionCore) -> Box<dyn Action> {
    log::warn!("{name} cannot be reversed; substituting an inert action");
    Box::new(InertAction::new(core.duration()))
}

/// Waits for its duration without touching the target.
#[derive(Debug)]
pub struct DelayTime {
    core: ActionCore,
}

impl DelayTime {
    pub fn new(duration: f32) -> Self {
        Self {
            core: ActionCore::new(duration),
        }
    }
}

impl Action for DelayTime {
    action_core!();

    fn apply(&mut self, _t: f32, _target: &mut dyn ActionTarget) {}

    fn reverse(&self) -> Box<dyn Action> {
        let mut action = Self::new(self.core.duration());
        action.core = self.core.reverse_config();
        Box::new(action)
    }

    fn clone_action(&self) -> Box<dyn Action> {
        Box::new(Self {
            core: self.core.clone_config(),
        })
    }
}

/// Start position plus the last position this action wrote.
///
/// Motion applied by other actions between updates is folded into the start
/// so several position actions stack on one target.
#[derive(Clone, Copy, Debug, Default)]
struct PositionTrack {
    start: Vec2,
    previous: Vec2,
}

impl PositionTrack {
    fn begin(position: Vec2) -> Self {
        Self {
            start: position,
            previous: position,
        }
    }

    fn apply(&mut self, offset: Vec2, target: &mut dyn ActionTarget) {
        let current = target.position();
        self.start += current - self.previous;
        let next = self.start + offset;
        self.previous = next;
        target.set_position(next);
    }
}

/// Moves the target by a relative offset.
#[derive(Debug)]
pub struct MoveBy {
    core: ActionCore,
    delta: Vec2,
    track: PositionTrack,
}

impl MoveBy {
    pub fn new(duration: f32, delta: impl Into<Vec2>) -> Self {
        Self {
            core: ActionCore::new(duration),
            delta: delta.into(),
            track: PositionTrack::default(),
        }
    }

    pub fn delta(&self) -> Vec2 {
        self.delta
    }
}

impl Action for MoveBy {
    action_core!();

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.core.start(target.node_id());
        self.track = PositionTrack::begin(target.position());
    }

    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget) {
        self.track.apply(self.delta * t, target);
    }

    fn reverse(&self) -> Box<dyn Action> {
        let mut action = Self::new(self.core.duration(), -self.delta);
        action.core = self.core.reverse_config();
        Box::new(action)
    }

    fn clone_action(&self) -> Box<dyn Action> {
        let mut action = Self::new(self.core.duration(), self.delta);
        action.core = self.core.clone_config();
        Box::new(action)
    }
}

/// Moves the target to an absolute position.
#[derive(Debug)]
pub struct MoveTo {
    core: ActionCore,
    end: Vec2,
    delta: Vec2,
    track: PositionTrack,
}

impl MoveTo {
    pub fn new(duration: f32, end: impl Into<Vec2>) -> Self {
        Self {
            core: ActionCore::new(duration),
            end: end.into(),
            delta: Vec2::ZERO,
            track: PositionTrack::default(),
        }
    }
}

impl Action for MoveTo {
    action_core!();

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.core.start(target.node_id());
        let position = target.position();
        self.track = PositionTrack::begin(position);
        self.delta = self.end - position;
    }

    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget) {
        self.track.apply(self.delta * t, target);
    }

    fn reverse(&self) -> Box<dyn Action> {
        unsupported_reverse("MoveTo", &self.core)
    }

    fn clone_action(&self) -> Box<dyn Action> {
        let mut action = Self::new(self.core.duration(), self.end);
        action.core = self.core.clone_config();
        Box::new(action)
    }
}

/// Parabolic hops along a relative offset.
#[derive(Debug)]
pub struct JumpBy {
    core: ActionCore,
    delta: Vec2,
    height: f32,
    jumps: u32,
    track: PositionTrack,
}

impl JumpBy {
    pub fn new(duration: f32, delta: impl Into<Vec2>, height: f32, jumps: u32) -> Self {
        Self {
            core: ActionCore::new(duration),
            delta: delta.into(),
            height,
            jumps,
            track: PositionTrack::default(),
        }
    }
}

fn jump_offset(delta: Vec2, height: f32, jumps: u32, t: f32) -> Vec2 {
    let frac = (t * jumps as f32) % 1.0;
    let y = height * 4.0 * frac * (1.0 - frac) + delta.y * t;
    Vec2::new(delta.x * t, y)
}

impl Action for JumpBy {
    action_core!();

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.core.start(target.node_id());
        self.track = PositionTrack::begin(target.position());
    }

    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget) {
        let offset = jump_offset(self.delta, self.height, self.jumps, t);
        self.track.apply(offset, target);
    }

    fn reverse(&self) -> Box<dyn Action> {
        let mut action = Self::new(self.core.duration(), -self.delta, self.height, self.jumps);
        action.core = self.core.reverse_config();
        Box::new(action)
    }

    fn clone_action(&self) -> Box<dyn Action> {
        let mut action = Self::new(self.core.duration(), self.delta, self.height, self.jumps);
        action.core = self.core.clone_config();
        Box::new(action)
    }
}

/// Parabolic hops ending at an absolute position.
#[derive(Debug)]
pub struct JumpTo {
    core: ActionCore,
    end: Vec2,
    delta: Vec2,
    height: f32,
    jumps: u32,
    track: PositionTrack,
}

impl JumpTo {
    pub fn new(duration: f32, end: impl Into<Vec2>, height: f32, jumps: u32) -> Self {
        Self {
            core: ActionCore::new(duration),
            end: end.into(),
            delta: Vec2::ZERO,
            height,
            jumps,
            track: PositionTrack::default(),
        }
    }
}

impl Action for JumpTo {
    action_core!();

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.core.start(target.node_id());
        let position = target.position();
        self.track = PositionTrack::begin(position);
        self.delta = self.end - position;
    }

    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget) {
        let offset = jump_offset(self.delta, self.height, self.jumps, t);
        self.track.apply(offset, target);
    }

    fn reverse(&self) -> Box<dyn Action> {
        unsupported_reverse("JumpTo", &self.core)
    }

    fn clone_action(&self) -> Box<dyn Action> {
        let mut action = Self::new(self.core.duration(), self.end, self.height, self.jumps);
        action.core = self.core.clone_config();
        Box::new(action)
    }
}

/// Control points of a cubic Bezier path, relative to its start.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BezierConfig {
    pub control_1: Vec2,
    pub control_2: Vec2,
    pub end: Vec2,
}

fn bezier_offset(config: &BezierConfig, t: f32) -> Vec2 {
    Vec2::new(
        bezier_at(0.0, config.control_1.x, config.control_2.x, config.end.x, t),
        bezier_at(0.0, config.control_1.y, config.control_2.y, config.end.y, t),
    )
}

/// Moves along a Bezier path expressed relative to the start position.
#[derive(Debug)]
pub struct BezierBy {
    core: ActionCore,
    config: BezierConfig,
    track: PositionTrack,
}

impl BezierBy {
    pub fn new(duration: f32, config: BezierConfig) -> Self {
        Self {
            core: ActionCore::new(duration),
            config,
            track: PositionTrack::default(),
        }
    }
}

impl Action for BezierBy {
    action_core!();

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.core.start(target.node_id());
        self.track = PositionTrack::begin(target.position());
    }

    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget) {
        self.track.apply(bezier_offset(&self.config, t), target);
    }

    fn reverse(&self) -> Box<dyn Action> {
        let c = &self.config;
        let reversed = BezierConfig {
            control_1: c.control_2 - c.end,
            control_2: c.control_1 - c.end,
            end: -c.end,
        };
        let mut action = Self::new(self.core.duration(), reversed);
        action.core = self.core.reverse_config();
        Box::new(action)
    }

    fn clone_action(&self) -> Box<dyn Action> {
        let mut action = Self::new(self.core.duration(), self.config);
        action.core = self.core.clone_config();
        Box::new(action)
    }
}

/// Moves along a Bezier path given in absolute coordinates.
#[derive(Debug)]
pub struct BezierTo {
    core: ActionCore,
    to: BezierConfig,
    config: BezierConfig,
    track: PositionTrack,
}

impl BezierTo {
    pub fn new(duration: f32, to: BezierConfig) -> Self {
        Self {
            core: ActionCore::new(duration),
            to,
            config: BezierConfig::default(),
            track: PositionTrack::default(),
        }
    }
}

impl Action for BezierTo {
    action_core!();

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.core.start(target.node_id());
        let start = target.position();
        self.track = PositionTrack::begin(start);
        self.config = BezierConfig {
            control_1: self.to.control_1 - start,
            control_2: self.to.control_2 - start,
            end: self.to.end - start,
        };
    }

    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget) {
        self.track.apply(bezier_offset(&self.config, t), target);
    }

    fn reverse(&self) -> Box<dyn Action> {
        unsupported_reverse("BezierTo", &self.core)
    }

    fn clone_action(&self) -> Box<dyn Action> {
        let mut action = Self::new(self.core.duration(), self.to);
        action.core = self.core.clone_config();
        Box::new(action)
    }
}

/// Rotates by relative angles in degrees. X and Y may differ to fake a
/// perspective skew.
#[derive(Debug)]
pub struct RotateBy {
    core: ActionCore,
    angle_x: f32,
    angle_y: f32,
    start_x: f32,
    start_y: f32,
}

impl RotateBy {
    pub fn new(duration: f32, angle: f32) -> Self {
        Self::with_angles(duration, angle, angle)
    }

    pub fn with_angles(duration: f32, angle_x: f32, angle_y: f32) -> Self {
        Self {
            core: ActionCore::new(duration),
            angle_x,
            angle_y,
            start_x: 0.0,
            start_y: 0.0,
        }
    }

    pub fn angles(&self) -> (f32, f32) {
        (self.angle_x, self.angle_y)
    }
}

impl Action for RotateBy {
    action_core!();

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.core.start(target.node_id());
        self.start_x = target.rotation_x();
        self.start_y = target.rotation_y();
    }

    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget) {
        target.set_rotation_x(self.start_x + self.angle_x * t);
        target.set_rotation_y(self.start_y + self.angle_y * t);
    }

    fn reverse(&self) -> Box<dyn Action> {
        let mut action = Self::with_angles(self.core.duration(), -self.angle_x, -self.angle_y);
        action.core = self.core.reverse_config();
        Box::new(action)
    }

    fn clone_action(&self) -> Box<dyn Action> {
        let mut action = Self::with_angles(self.core.duration(), self.angle_x, self.angle_y);
        action.core = self.core.clone_config();
        Box::new(action)
    }
}

/// Shortest signed angular distance from `start` to `end`, in degrees.
fn shortest_delta(start: f32, end: f32) -> f32 {
    let mut diff = end - start;
    if diff > 180.0 {
        diff -= 360.0;
    }
    if diff < -180.0 {
        diff += 360.0;
    }
    diff
}

/// Rotates to absolute angles along the shortest path.
#[derive(Debug)]
pub struct RotateTo {
    core: ActionCore,
    dst_x: f32,
    dst_y: f32,
    start_x: f32,
    start_y: f32,
    diff_x: f32,
    diff_y: f32,
}

impl RotateTo {
    pub fn new(duration: f32, angle: f32) -> Self {
        Self::with_angles(duration, angle, angle)
    }

    pub fn with_angles(duration: f32, dst_x: f32, dst_y: f32) -> Self {
        Self {
            core: ActionCore::new(duration),
            dst_x,
            dst_y,
            start_x: 0.0,
            start_y: 0.0,
            diff_x: 0.0,
            diff_y: 0.0,
        }
    }
}

impl Action for RotateTo {
    action_core!();

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.core.start(target.node_id());
        self.start_x = target.rotation_x() % 360.0;
        self.diff_x = shortest_delta(self.start_x, self.dst_x);
        self.start_y = target.rotation_y() % 360.0;
        self.diff_y = shortest_delta(self.start_y, self.dst_y);
    }

    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget) {
        target.set_rotation_x(self.start_x + self.diff_x * t);
        target.set_rotation_y(self.start_y + self.diff_y * t);
    }

    fn reverse(&self) -> Box<dyn Action> {
        unsupported_reverse("RotateTo", &self.core)
    }

    fn clone_action(&self) -> Box<dyn Action> {
        let mut action = Self::with_angles(self.core.duration(), self.dst_x, self.dst_y);
        action.core = self.core.clone_config();
        Box::new(action)
    }
}

/// Scales to absolute factors.
#[derive(Debug)]
pub struct ScaleTo {
    core: ActionCore,
    end_x: f32,
    end_y: f32,
    start_x: f32,
    start_y: f32,
    delta_x: f32,
    delta_y: f32,
}

impl ScaleTo {
    pub fn new(duration: f32, scale: f32) -> Self {
        Self::with_factors(duration, scale, scale)
    }

    pub fn with_factors(duration: f32, end_x: f32, end_y: f32) -> Self {
        Self {
            core: ActionCore::new(duration),
            end_x,
            end_y,
            start_x: 1.0,
            start_y: 1.0,
            delta_x: 0.0,
            delta_y: 0.0,
        }
    }
}

impl Action for ScaleTo {
    action_core!();

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.core.start(target.node_id());
        self.start_x = target.scale_x();
        self.start_y = target.scale_y();
        self.delta_x = self.end_x - self.start_x;
        self.delta_y = self.end_y - self.start_y;
    }

    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget) {
        target.set_scale_x(self.start_x + self.delta_x * t);
        target.set_scale_y(self.start_y + self.delta_y * t);
    }

    fn reverse(&self) -> Box<dyn Action> {
        unsupported_reverse("ScaleTo", &self.core)
    }

    fn clone_action(&self) -> Box<dyn Action> {
        let mut action = Self::with_factors(self.core.duration(), self.end_x, self.end_y);
        action.core = self.core.clone_config();
        Box::new(action)
    }
}

/// Multiplies the current scale by the given factors.
#[derive(Debug)]
pub struct ScaleBy {
    core: ActionCore,
    factor_x: f32,
    factor_y: f32,
    start_x: f32,
    start_y: f32,
}

impl ScaleBy {
    pub fn new(duration: f32, factor: f32) -> Self {
        Self::with_factors(duration, factor, factor)
    }

    pub fn with_factors(duration: f32, factor_x: f32, factor_y: f32) -> Self {
        Self {
            core: ActionCore::new(duration),
            factor_x,
            factor_y,
            start_x: 1.0,
            start_y: 1.0,
        }
    }

    pub fn factors(&self) -> (f32, f32) {
        (self.factor_x, self.factor_y)
    }
}

impl Action for ScaleBy {
    action_core!();

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.core.start(target.node_id());
        self.start_x = target.scale_x();
        self.start_y = target.scale_y();
    }

    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget) {
        let delta_x = self.start_x * self.factor_x - self.start_x;
        let delta_y = self.start_y * self.factor_y - self.start_y;
        target.set_scale_x(self.start_x + delta_x * t);
        target.set_scale_y(self.start_y + delta_y * t);
    }

    fn reverse(&self) -> Box<dyn Action> {
        let mut action = Self::with_factors(
            self.core.duration(),
            1.0 / self.factor_x,
            1.0 / self.factor_y,
        );
        action.core = self.core.reverse_config();
        Box::new(action)
    }

    fn clone_action(&self) -> Box<dyn Action> {
        let mut action = Self::with_factors(self.core.duration(), self.factor_x, self.factor_y);
        action.core = self.core.clone_config();
        Box::new(action)
    }
}

/// Skews to absolute angles in degrees.
#[derive(Debug)]
pub struct SkewTo {
    core: ActionCore,
    end_x: f32,
    end_y: f32,
    start_x: f32,
    start_y: f32,
    delta_x: f32,
    delta_y: f32,
}

impl SkewTo {
    pub fn new(duration: f32, end_x: f32, end_y: f32) -> Self {
        Self {
            core: ActionCore::new(duration),
            end_x,
            end_y,
            start_x: 0.0,
            start_y: 0.0,
            delta_x: 0.0,
            delta_y: 0.0,
        }
    }
}

impl Action for SkewTo {
    action_core!();

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.core.start(target.node_id());
        self.start_x = target.skew_x() % 180.0;
        self.delta_x = shortest_delta(self.start_x, self.end_x);
        self.start_y = target.skew_y() % 180.0;
        self.delta_y = shortest_delta(self.start_y, self.end_y);
    }

    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget) {
        target.set_skew_x(self.start_x + self.delta_x * t);
        target.set_skew_y(self.start_y + self.delta_y * t);
    }

    fn reverse(&self) -> Box<dyn Action> {
        unsupported_reverse("SkewTo", &self.core)
    }

    fn clone_action(&self) -> Box<dyn Action> {
        let mut action = Self::new(self.core.duration(), self.end_x, self.end_y);
        action.core = self.core.clone_config();
        Box::new(action)
    }
}

/// Skews by relative angles in degrees.
#[derive(Debug)]
pub struct SkewBy {
    core: ActionCore,
    skew_x: f32,
    skew_y: f32,
    start_x: f32,
    start_y: f32,
}

impl SkewBy {
    pub fn new(duration: f32, skew_x: f32, skew_y: f32) -> Self {
        Self {
            core: ActionCore::new(duration),
            skew_x,
            skew_y,
            start_x: 0.0,
            start_y: 0.0,
        }
    }

    pub fn angles(&self) -> (f32, f32) {
        (self.skew_x, self.skew_y)
    }
}

impl Action for SkewBy {
    action_core!();

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.core.start(target.node_id());
        self.start_x = target.skew_x() % 180.0;
        self.start_y = target.skew_y() % 180.0;
    }

    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget) {
        target.set_skew_x(self.start_x + self.skew_x * t);
        target.set_skew_y(self.start_y + self.skew_y * t);
    }

    fn reverse(&self) -> Box<dyn Action> {
        let mut action = Self::new(self.core.duration(), -self.skew_x, -self.skew_y);
        action.core = self.core.reverse_config();
        Box::new(action)
    }

    fn clone_action(&self) -> Box<dyn Action> {
        let mut action = Self::new(self.core.duration(), self.skew_x, self.skew_y);
        action.core = self.core.clone_config();
        Box::new(action)
    }
}

fn lerp_byte(from: u8, to: u8, t: f32) -> u8 {
    let value = f32::from(from) + (f32::from(to) - f32::from(from)) * t;
    value.clamp(0.0, 255.0) as u8
}

fn offset_byte(from: u8, delta: i16, t: f32) -> u8 {
    let value = f32::from(from) + f32::from(delta) * t;
    value.clamp(0.0, 255.0) as u8
}

/// Fades toward an absolute opacity.
#[derive(Debug)]
pub struct FadeTo {
    core: ActionCore,
    to: u8,
    from: u8,
}

impl FadeTo {
    pub fn new(duration: f32, opacity: u8) -> Self {
        Self {
            core: ActionCore::new(duration),
            to: opacity,
            from: 255,
        }
    }
}

impl Action for FadeTo {
    action_core!();

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.core.start(target.node_id());
        self.from = target.opacity();
    }

    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget) {
        target.set_opacity(lerp_byte(self.from, self.to, t));
    }

    fn reverse(&self) -> Box<dyn Action> {
        unsupported_reverse("FadeTo", &self.core)
    }

    fn clone_action(&self) -> Box<dyn Action> {
        let mut action = Self::new(self.core.duration(), self.to);
        action.core = self.core.clone_config();
        Box::new(action)
    }
}

/// Fades to fully opaque.
#[derive(Debug)]
pub struct FadeIn {
    fade: FadeTo,
}

impl FadeIn {
    pub fn new(duration: f32) -> Self {
        Self {
            fade: FadeTo::new(duration, 255),
        }
    }
}

impl Action for FadeIn {
    fn core(&self) -> &ActionCore {
        &self.fade.core
    }

    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.fade.core
    }

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.fade.start_with_target(target);
    }

    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget) {
        self.fade.apply(t, target);
    }

    fn reverse(&self) -> Box<dyn Action> {
        let mut action = FadeOut::new(self.fade.core.duration());
        action.fade.core = self.fade.core.reverse_config();
        Box::new(action)
    }

    fn clone_action(&self) -> Box<dyn Action> {
        let mut action = Self::new(self.fade.core.duration());
        action.fade.core = self.fade.core.clone_config();
        Box::new(action)
    }
}

/// Fades to fully transparent.
#[derive(Debug)]
pub struct FadeOut {
    fade: FadeTo,
}

impl FadeOut {
    pub fn new(duration: f32) -> Self {
        Self {
            fade: FadeTo::new(duration, 0),
        }
    }
}

impl Action for FadeOut {
    fn core(&self) -> &ActionCore {
        &self.fade.core
    }

    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.fade.core
    }

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.fade.start_with_target(target);
    }

    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget) {
        self.fade.apply(t, target);
    }

    fn reverse(&self) -> Box<dyn Action> {
        let mut action = FadeIn::new(self.fade.core.duration());
        action.fade.core = self.fade.core.reverse_config();
        Box::new(action)
    }

    fn clone_action(&self) -> Box<dyn Action> {
        let mut action = Self::new(self.fade.core.duration());
        action.fade.core = self.fade.core.clone_config();
        Box::new(action)
    }
}

/// Tints toward an absolute color.
#[derive(Debug)]
pub struct TintTo {
    core: ActionCore,
    to: Color3B,
    from: Color3B,
}

impl TintTo {
    pub fn new(duration: f32, color: Color3B) -> Self {
        Self {
            core: ActionCore::new(duration),
            to: color,
            from: Color3B::WHITE,
        }
    }
}

impl Action for TintTo {
    action_core!();

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.core.start(target.node_id());
        self.from = target.color();
    }

    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget) {
        target.set_color(Color3B::new(
            lerp_byte(self.from.r, self.to.r, t),
            lerp_byte(self.from.g, self.to.g, t),
            lerp_byte(self.from.b, self.to.b, t),
        ));
    }

    fn reverse(&self) -> Box<dyn Action> {
        unsupported_reverse("TintTo", &self.core)
    }

    fn clone_action(&self) -> Box<dyn Action> {
        let mut action = Self::new(self.core.duration(), self.to);
        action.core = self.core.clone_config();
        Box::new(action)
    }
}

/// Tints by signed per-channel deltas.
#[derive(Debug)]
pub struct TintBy {
    core: ActionCore,
    delta_r: i16,
    delta_g: i16,
    delta_b: i16,
    from: Color3B,
}

impl TintBy {
    pub fn new(duration: f32, delta_r: i16, delta_g: i16, delta_b: i16) -> Self {
        Self {
            core: ActionCore::new(duration),
            delta_r,
            delta_g,
            delta_b,
            from: Color3B::WHITE,
        }
    }

    pub fn deltas(&self) -> (i16, i16, i16) {
        (self.delta_r, self.delta_g, self.delta_b)
    }
}

impl Action for TintBy {
    action_core!();

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.core.start(target.node_id());
        self.from = target.color();
    }

    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget) {
        target.set_color(Color3B::new(
            offset_byte(self.from.r, self.delta_r, t),
            offset_byte(self.from.g, self.delta_g, t),
            offset_byte(self.from.b, self.delta_b, t),
        ));
    }

    fn reverse(&self) -> Box<dyn Action> {
        let mut action = Self::new(
            self.core.duration(),
            -self.delta_r,
            -self.delta_g,
            -self.delta_b,
        );
        action.core = self.core.reverse_config();
        Box::new(action)
    }

    fn clone_action(&self) -> Box<dyn Action> {
        let mut action = Self::new(self.core.duration(), self.delta_r, self.delta_g, self.delta_b);
        action.core = self.core.clone_config();
        Box::new(action)
    }
}

/// Toggles visibility `blinks` times, restoring the original state on stop.
#[derive(Debug)]
pub struct Blink {
    core: ActionCore,
    blinks: u32,
    original_visible: bool,
}

impl Blink {
    pub fn new(duration: f32, blinks: u32) -> Self {
        Self {
            core: ActionCore::new(duration),
            blinks,
            original_visible: true,
        }
    }
}

impl Action for Blink {
    action_core!();

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.core.start(target.node_id());
        self.original_visible = target.is_visible();
    }

    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget) {
        if self.core.is_done() || self.blinks == 0 {
            return;
        }
        let slice = 1.0 / self.blinks as f32;
        let m = t % slice;
        target.set_visible(m > slice / 2.0);
    }

    fn stop(&mut self, target: &mut dyn ActionTarget) {
        target.set_visible(self.original_visible);
        self.core.stop();
    }

    fn reverse(&self) -> Box<dyn Action> {
        let mut action = Self::new(self.core.duration(), self.blinks);
        action.core = self.core.reverse_config();
        Box::new(action)
    }

    fn clone_action(&self) -> Box<dyn Action> {
        let mut action = Self::new(self.core.duration(), self.blinks);
        action.core = self.core.clone_config();
        Box::new(action)
    }
}
