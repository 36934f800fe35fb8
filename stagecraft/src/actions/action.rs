//! The base action contract and the timing state shared by every action.

use std::fmt;

use super::ease::Easing;
use super::target::ActionTarget;
use crate::math::FLT_EPSILON;
use crate::world::NodeId;

/// Tag value for actions that were never tagged.
pub const INVALID_TAG: i32 = -1;

/// How a composite should treat an action it drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    /// Zero-length; completes on its first update.
    Instant,
    /// Finite duration, driven by normalized time.
    Interval,
    /// Never completes; only meaningful when stepped by the scheduler.
    Unbounded,
}

/// In-place repetition requested through [`ActionExt::repeat`].
///
/// This is the self-restarting variant: the same action restarts itself when
/// it completes. The [`Repeat`](super::Repeat) and
/// [`RepeatForever`](super::RepeatForever) composites are the dedicated
/// variants; the two multiply when combined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepeatPolicy {
    Once,
    Times(u32),
    Forever,
}

impl RepeatPolicy {
    /// Iteration count used by parents when splitting normalized time.
    pub fn cycles(&self) -> f32 {
        match self {
            RepeatPolicy::Once | RepeatPolicy::Forever => 1.0,
            RepeatPolicy::Times(times) => *times as f32,
        }
    }

    fn total(&self) -> u32 {
        match self {
            RepeatPolicy::Once => 1,
            RepeatPolicy::Times(times) => *times,
            RepeatPolicy::Forever => u32::MAX,
        }
    }
}

/// Configuration and run cursor shared by all actions.
///
/// Configuration (duration, tag, ease chain, speed, repeat policy) survives
/// [`clone_config`](Self::clone_config); the cursor (elapsed time, first-tick
/// flag, bound target) does not.
#[derive(Clone, Debug)]
pub struct ActionCore {
    duration: f32,
    elapsed: f32,
    first_tick: bool,
    target: Option<NodeId>,
    tag: i32,
    eases: Vec<Easing>,
    speed: Option<f32>,
    repeat: RepeatPolicy,
    repeats_left: u32,
    restarting: bool,
    cycle: u32,
}

impl ActionCore {
    /// Core for an interval action. A zero duration becomes [`FLT_EPSILON`].
    pub fn new(duration: f32) -> Self {
        let duration = if duration == 0.0 { FLT_EPSILON } else { duration };
        Self {
            duration,
            elapsed: 0.0,
            first_tick: true,
            target: None,
            tag: INVALID_TAG,
            eases: Vec::new(),
            speed: None,
            repeat: RepeatPolicy::Once,
            repeats_left: 1,
            restarting: false,
            cycle: 0,
        }
    }

    /// Core for an instant action: zero duration, always done.
    pub fn instant() -> Self {
        let mut core = Self::new(FLT_EPSILON);
        core.duration = 0.0;
        core
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Duration including in-place repetition, as seen by a parent composite.
    pub fn effective_duration(&self) -> f32 {
        self.duration * self.repeat.cycles()
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn is_first_tick(&self) -> bool {
        self.first_tick
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    pub fn tag(&self) -> i32 {
        self.tag
    }

    pub fn set_tag(&mut self, tag: i32) {
        self.tag = tag;
    }

    pub fn eases(&self) -> &[Easing] {
        &self.eases
    }

    /// Replaces the ease chain.
    pub fn set_eases(&mut self, eases: Vec<Easing>) {
        self.eases = eases;
    }

    /// Multiplier the action manager applies to `dt`, if one was set.
    pub fn speed(&self) -> Option<f32> {
        self.speed
    }

    /// Multiplies the speed factor. Non-positive factors are rejected.
    pub fn set_speed(&mut self, factor: f32) {
        if factor <= 0.0 || factor.is_nan() {
            log::warn!("ignoring invalid speed factor {factor}");
            return;
        }
        self.speed = Some(self.speed.unwrap_or(1.0) * factor);
    }

    pub fn repeat_policy(&self) -> RepeatPolicy {
        self.repeat
    }

    /// Multiplies the in-place repetition count. Zero is rejected.
    pub fn set_repeat(&mut self, times: u32) {
        if times < 1 {
            log::warn!("ignoring invalid repeat count {times}");
            return;
        }
        self.repeat = match self.repeat {
            RepeatPolicy::Once => RepeatPolicy::Times(times),
            RepeatPolicy::Times(current) => RepeatPolicy::Times(current.saturating_mul(times)),
            RepeatPolicy::Forever => RepeatPolicy::Forever,
        };
        self.repeats_left = self.repeat.total();
    }

    pub fn set_repeat_forever(&mut self) {
        self.repeat = RepeatPolicy::Forever;
        self.repeats_left = u32::MAX;
    }

    /// Runs `t` through the ease chain, left to right.
    pub fn ease_time(&self, t: f32) -> f32 {
        self.eases.iter().fold(t, |t, ease| ease.ease(t))
    }

    /// Binds the cursor to a target and rewinds it.
    pub fn start(&mut self, target: Option<NodeId>) {
        self.target = target;
        self.elapsed = 0.0;
        self.first_tick = true;
        if !self.restarting {
            self.repeats_left = self.repeat.total();
        }
        self.restarting = false;
        self.cycle = 0;
    }

    /// In-place iteration a parent composite is currently replaying.
    pub(crate) fn cycle(&self) -> u32 {
        self.cycle
    }

    pub(crate) fn set_cycle(&mut self, cycle: u32) {
        self.cycle = cycle;
    }

    pub fn stop(&mut self) {
        self.target = None;
    }

    pub fn is_done(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Accumulates `dt` and returns normalized time in `[0, 1]`.
    ///
    /// The first call after [`start`](Self::start) is time zero; its `dt` is
    /// discarded.
    pub fn advance(&mut self, dt: f32) -> f32 {
        if self.first_tick {
            self.first_tick = false;
            self.elapsed = 0.0;
        } else {
            self.elapsed += dt;
        }
        let t = self.elapsed / self.duration.max(FLT_EPSILON);
        t.min(1.0).max(0.0)
    }

    /// Consumes one in-place repetition if the run just completed.
    fn take_repeat(&mut self) -> bool {
        if !self.is_done() {
            return false;
        }
        match self.repeat {
            RepeatPolicy::Once => false,
            RepeatPolicy::Forever => true,
            RepeatPolicy::Times(_) => {
                if self.repeats_left > 1 {
                    self.repeats_left -= 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Copy of the configuration with a fresh cursor.
    pub fn clone_config(&self) -> Self {
        Self {
            duration: self.duration,
            elapsed: 0.0,
            first_tick: true,
            target: None,
            tag: self.tag,
            eases: self.eases.clone(),
            speed: self.speed,
            repeat: self.repeat,
            repeats_left: self.repeat.total(),
            restarting: false,
            cycle: 0,
        }
    }

    /// Configuration for a reversed action: every ease in the chain is
    /// reversed in place, the chain order is kept.
    pub fn reverse_config(&self) -> Self {
        let mut core = self.clone_config();
        core.eases = self.eases.iter().map(Easing::reverse).collect();
        core
    }

    /// Same as [`reverse_config`](Self::reverse_config) but with a new duration.
    pub fn reverse_config_with(&self, duration: f32) -> Self {
        let mut core = self.reverse_config();
        core.duration = if duration == 0.0 { FLT_EPSILON } else { duration };
        core
    }
}

/// A time-based behavior that mutates an [`ActionTarget`].
///
/// Actions are built detached, bound with [`start_with_target`](Self::start_with_target),
/// advanced with [`step`](Self::step) and finished once [`is_done`](Self::is_done)
/// reports true or [`stop`](Self::stop) is called.
pub trait Action: fmt::Debug {
    fn core(&self) -> &ActionCore;
    fn core_mut(&mut self) -> &mut ActionCore;

    fn kind(&self) -> ActionKind {
        ActionKind::Interval
    }

    /// Binds the action and captures whatever baseline it animates from.
    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.core_mut().start(target.node_id());
    }

    /// Applies already-eased normalized time.
    ///
    /// Must be a pure function of `t` against the captured baseline so that
    /// parents can re-apply the same `t`.
    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget);

    /// Runs `t` through the ease chain and applies it.
    fn update(&mut self, t: f32, target: &mut dyn ActionTarget) {
        let t = self.core().ease_time(t);
        self.apply(t, target);
    }

    /// Idempotent; must not assume `update` ever ran.
    fn stop(&mut self, _target: &mut dyn ActionTarget) {
        self.core_mut().stop();
    }

    fn step(&mut self, dt: f32, target: &mut dyn ActionTarget) {
        step_interval(self, dt, target);
    }

    fn is_done(&self) -> bool {
        self.core().is_done()
    }

    fn duration(&self) -> f32 {
        self.core().duration()
    }

    /// A new action that plays this one backwards.
    fn reverse(&self) -> Box<dyn Action>;

    /// A new action with the same configuration and a fresh cursor.
    fn clone_action(&self) -> Box<dyn Action>;
}

/// Standard interval stepping, including the in-place repeat path.
///
/// When a repeat-decorated action completes it restarts itself and replays the
/// overshoot, looping once per completed iteration within this call.
pub fn step_interval<A: Action + ?Sized>(action: &mut A, dt: f32, target: &mut dyn ActionTarget) {
    let mut dt = dt;
    loop {
        let t = action.core_mut().advance(dt);
        action.update(t, target);

        if !action.core_mut().take_repeat() {
            break;
        }
        let core = action.core();
        let overshoot = core.elapsed - core.duration;
        let degenerate = core.duration <= FLT_EPSILON;

        action.core_mut().restarting = true;
        action.start_with_target(target);
        let core = action.core_mut();
        core.first_tick = false;
        core.elapsed = 0.0;
        if degenerate || overshoot <= 0.0 {
            break;
        }
        dt = overshoot;
    }
}

/// Stepping for instant actions: any step applies the final state.
pub fn step_instant<A: Action + ?Sized>(action: &mut A, target: &mut dyn ActionTarget) {
    action.update(1.0, target);
}

/// Builder-style decorations for concrete actions.
pub trait ActionExt: Action + Sized + 'static {
    #[must_use]
    fn with_tag(mut self, tag: i32) -> Self {
        self.core_mut().set_tag(tag);
        self
    }

    /// Replaces the ease chain; stages apply left to right.
    #[must_use]
    fn easing(mut self, eases: impl IntoIterator<Item = Easing>) -> Self {
        self.core_mut().set_eases(eases.into_iter().collect());
        self
    }

    /// Multiplies the dt the action manager feeds this action.
    #[must_use]
    fn speed(mut self, factor: f32) -> Self {
        self.core_mut().set_speed(factor);
        self
    }

    /// Restarts the action in place `times` times in total.
    #[must_use]
    fn repeat(mut self, times: u32) -> Self {
        self.core_mut().set_repeat(times);
        self
    }

    #[must_use]
    fn repeat_forever(mut self) -> Self {
        self.core_mut().set_repeat_forever();
        self
    }

    fn boxed(self) -> Box<dyn Action> {
        Box::new(self)
    }
}

impl<A: Action + 'static> ActionExt for A {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_duration_is_coerced_to_epsilon() {
        let core = ActionCore::new(0.0);
        assert_eq!(core.duration(), FLT_EPSILON);
    }

    #[test]
    fn first_advance_discards_dt() {
        let mut core = ActionCore::new(2.0);
        core.start(None);
        assert_eq!(core.advance(5.0), 0.0);
        assert_eq!(core.advance(1.0), 0.5);
        assert_eq!(core.advance(5.0), 1.0);
        assert!(core.is_done());
    }

    #[test]
    fn elapsed_never_decreases_with_non_negative_dt() {
        let mut core = ActionCore::new(1.0);
        core.start(None);
        let mut last = core.elapsed();
        for dt in [0.0, 0.1, 0.0, 0.3, 0.25, 2.0] {
            core.advance(dt);
            assert!(core.elapsed() >= last);
            last = core.elapsed();
        }
    }

    #[test]
    fn invalid_speed_and_repeat_are_ignored() {
        let mut core = ActionCore::new(1.0);
        core.set_speed(-2.0);
        core.set_speed(0.0);
        assert_eq!(core.speed(), None);
        core.set_repeat(0);
        assert_eq!(core.repeat_policy(), RepeatPolicy::Once);
    }

    #[test]
    fn repeat_and_speed_multiply() {
        let mut core = ActionCore::new(1.0);
        core.set_repeat(2);
        core.set_repeat(3);
        core.set_speed(2.0);
        core.set_speed(1.5);
        assert_eq!(core.repeat_policy(), RepeatPolicy::Times(6));
        assert_eq!(core.speed(), Some(3.0));
        assert_eq!(core.effective_duration(), 6.0);
    }

    #[test]
    fn clone_config_resets_cursor() {
        let mut core = ActionCore::new(1.0);
        core.set_tag(7);
        core.start(None);
        core.advance(0.0);
        core.advance(0.5);
        let copy = core.clone_config();
        assert_eq!(copy.tag(), 7);
        assert_eq!(copy.elapsed(), 0.0);
        assert!(copy.is_first_tick());
    }
}
