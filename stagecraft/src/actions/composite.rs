//! Actions built from other actions.
//!
//! Parents redistribute their normalized time over children through
//! [`drive_child`], which also replays a child's own in-place repetition so
//! the two repeat mechanisms multiply instead of one masking the other.

use super::action::{Action, ActionCore, ActionKind, RepeatPolicy};
use super::instant::ExtraAction;
use super::interval::DelayTime;
use super::target::ActionTarget;
use crate::error::ActionError;
use crate::math::FLT_EPSILON;

/// Time a parent must reserve for `action`, in-place repeats included.
fn span(action: &dyn Action) -> f32 {
    action.core().effective_duration()
}

fn warn_if_unbounded(composite: &str, action: &dyn Action) {
    if action.kind() == ActionKind::Unbounded {
        log::warn!("{composite} cannot time an unbounded child; it only receives normalized time");
    }
}

/// Drives `child` with a parent's normalized time.
///
/// A child carrying `repeat(n)` gets `t` split into `n` local cycles and is
/// restarted at each forward cycle boundary.
pub(crate) fn drive_child(child: &mut dyn Action, t: f32, target: &mut dyn ActionTarget) {
    let cycles = match child.core().repeat_policy() {
        RepeatPolicy::Times(times) if times > 1 => times,
        _ => {
            child.update(t, target);
            return;
        }
    };

    let scaled = t * cycles as f32;
    let (index, local) = if scaled >= cycles as f32 {
        (cycles - 1, 1.0)
    } else {
        let index = scaled.max(0.0) as u32;
        (index, scaled - index as f32)
    };

    let mut current = child.core().cycle();
    if index < current {
        child.update(0.0, target);
        child.core_mut().set_cycle(index);
    }
    while current < index {
        child.update(1.0, target);
        child.start_with_target(target);
        current += 1;
        child.core_mut().set_cycle(current);
    }
    child.update(local, target);
}

/// Runs two actions back to back.
#[derive(Debug)]
pub struct Sequence {
    core: ActionCore,
    actions: [Box<dyn Action>; 2],
    split: f32,
    last: Option<usize>,
}

impl Sequence {
    pub fn new(first: Box<dyn Action>, second: Box<dyn Action>) -> Self {
        warn_if_unbounded("Sequence", first.as_ref());
        warn_if_unbounded("Sequence", second.as_ref());
        let duration = span(first.as_ref()) + span(second.as_ref());
        Self {
            core: ActionCore::new(duration),
            actions: [first, second],
            split: 0.0,
            last: None,
        }
    }

    /// Left-folds `actions` into nested pairs. A single action is padded
    /// with a no-op so the pair shape holds.
    pub fn from_actions(actions: Vec<Box<dyn Action>>) -> Result<Self, ActionError> {
        let mut actions = actions.into_iter();
        let first = actions.next().ok_or(ActionError::EmptySequence)?;
        let Some(second) = actions.next() else {
            return Ok(Self::new(first, Box::new(ExtraAction::new())));
        };
        Ok(actions.fold(Self::new(first, second), |sequence, next| {
            Self::new(Box::new(sequence), next)
        }))
    }

    /// Normalized time at which the second action takes over.
    pub fn split(&self) -> f32 {
        self.split
    }

    fn finish_first(&mut self, target: &mut dyn ActionTarget) {
        let first = self.actions[0].as_mut();
        drive_child(first, 1.0, target);
        first.stop(target);
    }
}

impl Action for Sequence {
    action_core!();

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.core.start(target.node_id());
        self.split = span(self.actions[0].as_ref()) / self.core.duration();
        self.last = None;
    }

    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget) {
        let (found, local) = if t < self.split {
            let local = if self.split != 0.0 { t / self.split } else { 1.0 };
            if self.last == Some(1) {
                // Rewinding into the first action: settle the second at zero.
                let second = self.actions[1].as_mut();
                drive_child(second, 0.0, target);
                second.stop(target);
            }
            (0, local)
        } else {
            let local = if self.split == 1.0 {
                1.0
            } else {
                (t - self.split) / (1.0 - self.split)
            };
            match self.last {
                None => {
                    // Jumped straight past the first action.
                    self.actions[0].start_with_target(target);
                    self.finish_first(target);
                }
                Some(0) => self.finish_first(target),
                Some(_) => {}
            }
            (1, local)
        };

        let action = self.actions[found].as_mut();
        if self.last == Some(found) && action.is_done() {
            return;
        }
        if self.last != Some(found) {
            action.start_with_target(target);
        }
        drive_child(action, local, target);
        self.last = Some(found);
    }

    fn stop(&mut self, target: &mut dyn ActionTarget) {
        if let Some(last) = self.last {
            self.actions[last].stop(target);
        }
        self.core.stop();
    }

    fn reverse(&self) -> Box<dyn Action> {
        let mut sequence = Self::new(self.actions[1].reverse(), self.actions[0].reverse());
        sequence.core = self.core.reverse_config();
        Box::new(sequence)
    }

    fn clone_action(&self) -> Box<dyn Action> {
        let mut sequence = Self::new(
            self.actions[0].clone_action(),
            self.actions[1].clone_action(),
        );
        sequence.core = self.core.clone_config();
        Box::new(sequence)
    }
}

/// Runs two actions in parallel over the longer of their durations.
#[derive(Debug)]
pub struct Spawn {
    core: ActionCore,
    one: Box<dyn Action>,
    two: Box<dyn Action>,
}

impl Spawn {
    /// The shorter action is padded with a trailing delay so both children
    /// share one duration.
    pub fn new(one: Box<dyn Action>, two: Box<dyn Action>) -> Self {
        warn_if_unbounded("Spawn", one.as_ref());
        warn_if_unbounded("Spawn", two.as_ref());
        let d1 = span(one.as_ref());
        let d2 = span(two.as_ref());
        let (one, two) = if d1 > d2 {
            let padded = Sequence::new(two, Box::new(DelayTime::new(d1 - d2)));
            (one, Box::new(padded) as Box<dyn Action>)
        } else if d1 < d2 {
            let padded = Sequence::new(one, Box::new(DelayTime::new(d2 - d1)));
            (Box::new(padded) as Box<dyn Action>, two)
        } else {
            (one, two)
        };
        Self {
            core: ActionCore::new(d1.max(d2)),
            one,
            two,
        }
    }

    pub fn from_actions(actions: Vec<Box<dyn Action>>) -> Result<Self, ActionError> {
        let mut actions = actions.into_iter();
        let first = actions.next().ok_or(ActionError::EmptySpawn)?;
        let Some(second) = actions.next() else {
            return Ok(Self::new(first, Box::new(ExtraAction::new())));
        };
        Ok(actions.fold(Self::new(first, second), |spawn, next| {
            Self::new(Box::new(spawn), next)
        }))
    }
}

impl Action for Spawn {
    action_core!();

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.core.start(target.node_id());
        self.one.start_with_target(target);
        self.two.start_with_target(target);
    }

    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget) {
        drive_child(self.one.as_mut(), t, target);
        drive_child(self.two.as_mut(), t, target);
    }

    fn stop(&mut self, target: &mut dyn ActionTarget) {
        self.one.stop(target);
        self.two.stop(target);
        self.core.stop();
    }

    fn reverse(&self) -> Box<dyn Action> {
        let mut spawn = Self::new(self.one.reverse(), self.two.reverse());
        spawn.core = self.core.reverse_config();
        Box::new(spawn)
    }

    fn clone_action(&self) -> Box<dyn Action> {
        let mut spawn = Self::new(self.one.clone_action(), self.two.clone_action());
        spawn.core = self.core.clone_config();
        Box::new(spawn)
    }
}

/// Replays an inner action a fixed number of times.
#[derive(Debug)]
pub struct Repeat {
    core: ActionCore,
    inner: Box<dyn Action>,
    times: u32,
    total: u32,
    next_threshold: f32,
    inner_instant: bool,
}

impl Repeat {
    pub fn new(inner: Box<dyn Action>, times: u32) -> Result<Self, ActionError> {
        if times == 0 {
            return Err(ActionError::ZeroRepeat);
        }
        warn_if_unbounded("Repeat", inner.as_ref());
        let inner_instant = inner.kind() == ActionKind::Instant;
        Ok(Self {
            core: ActionCore::new(span(inner.as_ref()) * times as f32),
            inner,
            times,
            total: 0,
            next_threshold: 0.0,
            inner_instant,
        })
    }

    pub fn times(&self) -> u32 {
        self.times
    }

    /// Completed iterations since the last start.
    pub fn completed(&self) -> u32 {
        self.total
    }

    fn fraction(&self) -> f32 {
        1.0 / self.times as f32
    }

    /// Normalized time at which iteration `pass` ends. The last one is
    /// pinned to 1 so rounding never lets it fire early.
    fn threshold(&self, pass: u32) -> f32 {
        if pass >= self.times {
            1.0
        } else {
            self.fraction() * pass as f32
        }
    }
}

impl Action for Repeat {
    action_core!();

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.total = 0;
        self.next_threshold = self.threshold(1);
        self.core.start(target.node_id());
        self.inner.start_with_target(target);
    }

    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget) {
        let fraction = self.fraction();
        if t >= self.next_threshold {
            // One pass per threshold crossed this frame.
            while t > self.next_threshold && self.total < self.times {
                drive_child(self.inner.as_mut(), 1.0, target);
                self.total += 1;
                if self.total < self.times {
                    self.inner.stop(target);
                    self.inner.start_with_target(target);
                }
                self.next_threshold = self.threshold(self.total + 1);
            }

            // Land exactly on the final state.
            if t >= 1.0 && self.total < self.times {
                drive_child(self.inner.as_mut(), 1.0, target);
                self.total += 1;
            }

            if !self.inner_instant {
                if self.total == self.times {
                    self.inner.stop(target);
                } else {
                    let local = (t - (self.next_threshold - fraction)) * self.times as f32;
                    drive_child(self.inner.as_mut(), local, target);
                }
            }
        } else if !self.inner_instant {
            drive_child(self.inner.as_mut(), (t * self.times as f32) % 1.0, target);
        }
    }

    fn stop(&mut self, target: &mut dyn ActionTarget) {
        self.inner.stop(target);
        self.core.stop();
    }

    fn is_done(&self) -> bool {
        self.total == self.times
    }

    fn reverse(&self) -> Box<dyn Action> {
        let mut repeat = Self {
            core: self.core.reverse_config(),
            inner: self.inner.reverse(),
            times: self.times,
            total: 0,
            next_threshold: 0.0,
            inner_instant: self.inner_instant,
        };
        repeat.next_threshold = repeat.threshold(1);
        Box::new(repeat)
    }

    fn clone_action(&self) -> Box<dyn Action> {
        Box::new(Self {
            core: self.core.clone_config(),
            inner: self.inner.clone_action(),
            times: self.times,
            total: 0,
            next_threshold: self.threshold(1),
            inner_instant: self.inner_instant,
        })
    }
}

/// Restarts an inner action forever, carrying overshoot into the next run.
///
/// Only meaningful when stepped by the action manager.
#[derive(Debug)]
pub struct RepeatForever {
    core: ActionCore,
    inner: Box<dyn Action>,
}

impl RepeatForever {
    pub fn new(inner: Box<dyn Action>) -> Self {
        Self {
            core: ActionCore::new(inner.duration()),
            inner,
        }
    }

    pub fn inner(&self) -> &dyn Action {
        self.inner.as_ref()
    }
}

impl Action for RepeatForever {
    action_core!();

    fn kind(&self) -> ActionKind {
        ActionKind::Unbounded
    }

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.core.start(target.node_id());
        self.inner.start_with_target(target);
    }

    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget) {
        drive_child(self.inner.as_mut(), t, target);
    }

    fn step(&mut self, dt: f32, target: &mut dyn ActionTarget) {
        self.inner.step(dt, target);
        // One restart per cycle completed within this step.
        while self.inner.is_done() {
            let duration = self.inner.duration();
            let overshoot = self.inner.core().elapsed() - duration;
            self.inner.start_with_target(target);
            if duration <= FLT_EPSILON {
                return;
            }
            self.inner.step(0.0, target);
            self.inner.step(overshoot.max(0.0), target);
        }
    }

    fn stop(&mut self, target: &mut dyn ActionTarget) {
        self.inner.stop(target);
        self.core.stop();
    }

    fn is_done(&self) -> bool {
        false
    }

    fn reverse(&self) -> Box<dyn Action> {
        let mut forever = Self::new(self.inner.reverse());
        forever.core = self.core.reverse_config();
        Box::new(forever)
    }

    fn clone_action(&self) -> Box<dyn Action> {
        let mut forever = Self::new(self.inner.clone_action());
        forever.core = self.core.clone_config();
        Box::new(forever)
    }
}

/// Plays an action backwards in time.
#[derive(Debug)]
pub struct ReverseTime {
    core: ActionCore,
    other: Box<dyn Action>,
}

impl ReverseTime {
    pub fn new(other: Box<dyn Action>) -> Self {
        warn_if_unbounded("ReverseTime", other.as_ref());
        Self {
            core: ActionCore::new(span(other.as_ref())),
            other,
        }
    }
}

impl Action for ReverseTime {
    action_core!();

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.core.start(target.node_id());
        self.other.start_with_target(target);
    }

    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget) {
        drive_child(self.other.as_mut(), 1.0 - t, target);
    }

    fn stop(&mut self, target: &mut dyn ActionTarget) {
        self.other.stop(target);
        self.core.stop();
    }

    /// The wrapped action itself, not a double reversal.
    fn reverse(&self) -> Box<dyn Action> {
        self.other.clone_action()
    }

    fn clone_action(&self) -> Box<dyn Action> {
        let mut reverse = Self::new(self.other.clone_action());
        reverse.core = self.core.clone_config();
        Box::new(reverse)
    }
}

/// Scales the dt an inner action receives when stepped.
#[derive(Debug)]
pub struct Speed {
    core: ActionCore,
    inner: Box<dyn Action>,
    factor: f32,
}

impl Speed {
    pub fn new(inner: Box<dyn Action>, factor: f32) -> Self {
        let factor = if factor > 0.0 {
            factor
        } else {
            log::warn!("ignoring invalid speed factor {factor}");
            1.0
        };
        Self {
            core: ActionCore::new(span(inner.as_ref()) / factor),
            inner,
            factor,
        }
    }

    pub fn factor(&self) -> f32 {
        self.factor
    }

    pub fn set_factor(&mut self, factor: f32) {
        if factor > 0.0 {
            self.factor = factor;
        } else {
            log::warn!("ignoring invalid speed factor {factor}");
        }
    }
}

impl Action for Speed {
    action_core!();

    fn kind(&self) -> ActionKind {
        self.inner.kind()
    }

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.core.start(target.node_id());
        self.inner.start_with_target(target);
    }

    fn apply(&mut self, t: f32, target: &mut dyn ActionTarget) {
        drive_child(self.inner.as_mut(), t, target);
    }

    fn step(&mut self, dt: f32, target: &mut dyn ActionTarget) {
        self.inner.step(dt * self.factor, target);
    }

    fn stop(&mut self, target: &mut dyn ActionTarget) {
        self.inner.stop(target);
        self.core.stop();
    }

    fn is_done(&self) -> bool {
        self.inner.is_done()
    }

    fn reverse(&self) -> Box<dyn Action> {
        let mut speed = Self::new(self.inner.reverse(), self.factor);
        speed.core = self.core.reverse_config();
        Box::new(speed)
    }

    fn clone_action(&self) -> Box<dyn Action> {
        let mut speed = Self::new(self.inner.clone_action(), self.factor);
        speed.core = self.core.clone_config();
        Box::new(speed)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;
    use crate::actions::{ActionExt, CallFunc, MoveBy};
    use crate::node::Node;

    const EPSILON: f32 = 1e-4;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[derive(Debug, Default)]
    struct Counts {
        starts: Cell<u32>,
        stops: Cell<u32>,
        updates: RefCell<Vec<f32>>,
    }

    #[derive(Debug)]
    struct Probe {
        core: ActionCore,
        counts: Rc<Counts>,
    }

    impl Probe {
        fn new(duration: f32) -> (Self, Rc<Counts>) {
            let counts = Rc::new(Counts::default());
            let probe = Self {
                core: ActionCore::new(duration),
                counts: Rc::clone(&counts),
            };
            (probe, counts)
        }
    }

    impl Action for Probe {
        action_core!();

        fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
            self.core.start(target.node_id());
            self.counts.starts.set(self.counts.starts.get() + 1);
        }

        fn apply(&mut self, t: f32, _target: &mut dyn ActionTarget) {
            self.counts.updates.borrow_mut().push(t);
        }

        fn stop(&mut self, _target: &mut dyn ActionTarget) {
            self.core.stop();
            self.counts.stops.set(self.counts.stops.get() + 1);
        }

        fn reverse(&self) -> Box<dyn Action> {
            self.clone_action()
        }

        fn clone_action(&self) -> Box<dyn Action> {
            Box::new(Self {
                core: self.core.clone_config(),
                counts: Rc::clone(&self.counts),
            })
        }
    }

    fn run(action: &mut dyn Action, node: &mut Node, frames: &[f32]) {
        action.start_with_target(node);
        for dt in frames {
            action.step(*dt, node);
        }
    }

    #[test]
    fn sequence_and_spawn_duration_algebra() {
        let sequence = Sequence::new(MoveBy::new(1.5, (1.0, 0.0)).boxed(), DelayTime::new(2.0).boxed());
        assert!(approx_eq(sequence.duration(), 3.5));
        let spawn = Spawn::new(MoveBy::new(1.5, (1.0, 0.0)).boxed(), DelayTime::new(2.0).boxed());
        assert!(approx_eq(spawn.duration(), 2.0));
    }

    #[test]
    fn empty_lists_are_rejected() {
        assert_eq!(
            Sequence::from_actions(Vec::new()).unwrap_err(),
            ActionError::EmptySequence
        );
        assert_eq!(
            Spawn::from_actions(Vec::new()).unwrap_err(),
            ActionError::EmptySpawn
        );
        assert_eq!(
            Repeat::new(DelayTime::new(1.0).boxed(), 0).unwrap_err(),
            ActionError::ZeroRepeat
        );
    }

    #[test]
    fn single_action_sequence_is_padded() {
        let mut node = Node::new();
        let mut sequence =
            Sequence::from_actions(vec![MoveBy::new(1.0, (10.0, 0.0)).boxed()]).unwrap();
        assert!(approx_eq(sequence.duration(), 1.0));
        run(&mut sequence, &mut node, &[0.0, 1.0]);
        assert!(approx_eq(node.position().x, 10.0));
        assert!(sequence.is_done());
    }

    #[test]
    fn crossing_the_split_stops_first_and_starts_second_once() {
        let mut node = Node::new();
        let (first, a) = Probe::new(1.0);
        let (second, b) = Probe::new(1.0);
        let mut sequence = Sequence::new(first.boxed(), second.boxed());
        sequence.start_with_target(&mut node);
        sequence.update(0.49, &mut node);
        sequence.update(0.51, &mut node);
        assert_eq!(a.starts.get(), 1);
        assert_eq!(a.stops.get(), 1);
        assert_eq!(b.starts.get(), 1);
        assert_eq!(b.stops.get(), 0);
        assert_eq!(b.updates.borrow().len(), 1);
        assert!(approx_eq(*a.updates.borrow().last().unwrap(), 1.0));
    }

    #[test]
    fn skipped_first_action_still_runs_to_completion() {
        let mut node = Node::new();
        let (first, a) = Probe::new(1.0);
        let (second, _) = Probe::new(1.0);
        let mut sequence = Sequence::new(first.boxed(), second.boxed());
        sequence.start_with_target(&mut node);
        sequence.update(0.9, &mut node);
        assert_eq!(a.starts.get(), 1);
        assert_eq!(a.stops.get(), 1);
        assert_eq!(a.updates.borrow().as_slice(), &[1.0]);
    }

    #[test]
    fn rewinding_settles_the_second_action() {
        let mut node = Node::new();
        let (first, a) = Probe::new(1.0);
        let (second, b) = Probe::new(1.0);
        let mut reversed = ReverseTime::new(Sequence::new(first.boxed(), second.boxed()).boxed());
        reversed.start_with_target(&mut node);
        reversed.update(0.0, &mut node);
        reversed.update(0.75, &mut node);
        assert_eq!(b.stops.get(), 1);
        assert_eq!(*b.updates.borrow().last().unwrap(), 0.0);
        assert_eq!(a.starts.get(), 2);
        assert!(approx_eq(*a.updates.borrow().last().unwrap(), 0.5));
    }

    #[test]
    fn instant_second_action_fires_once() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let mut node = Node::new();
        let mut sequence = Sequence::new(
            DelayTime::new(1.0).boxed(),
            CallFunc::new(move |_| counter.set(counter.get() + 1)).boxed(),
        );
        run(&mut sequence, &mut node, &[0.0, 0.5, 0.5, 0.5]);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn spawn_pads_the_shorter_child() {
        let mut node = Node::new();
        let mut spawn = Spawn::new(
            MoveBy::new(1.0, (10.0, 0.0)).boxed(),
            MoveBy::new(2.0, (0.0, 10.0)).boxed(),
        );
        run(&mut spawn, &mut node, &[0.0, 1.0]);
        assert!(approx_eq(node.position().x, 10.0));
        assert!(approx_eq(node.position().y, 5.0));
    }

    #[test]
    fn repeat_runs_the_full_cycle_n_times() {
        let mut node = Node::new();
        let (probe, counts) = Probe::new(1.0);
        let mut repeat = Repeat::new(probe.boxed(), 3).unwrap();
        run(&mut repeat, &mut node, &[0.0, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5]);
        assert!(repeat.is_done());
        assert_eq!(counts.starts.get(), 3);
        assert_eq!(counts.stops.get(), 3);
    }

    #[test]
    fn repeat_starts_and_stops_the_inner_once_per_pass() {
        for times in 1..=50 {
            let mut node = Node::new();
            let (probe, counts) = Probe::new(1.0);
            let mut repeat = Repeat::new(probe.boxed(), times).unwrap();
            repeat.start_with_target(&mut node);
            let steps = 4 * times;
            for i in 0..=steps {
                repeat.update(i as f32 / steps as f32, &mut node);
            }
            assert!(repeat.is_done(), "times = {times}");
            assert_eq!(counts.starts.get(), times, "times = {times}");
            assert_eq!(counts.stops.get(), times, "times = {times}");
        }
    }

    #[test]
    fn repeat_catches_up_in_one_large_step() {
        let mut node = Node::new();
        let mut repeat = Repeat::new(MoveBy::new(1.0, (10.0, 0.0)).boxed(), 4).unwrap();
        run(&mut repeat, &mut node, &[0.0, 10.0]);
        assert!(repeat.is_done());
        assert_eq!(repeat.completed(), 4);
        assert!(approx_eq(node.position().x, 40.0));
    }

    #[test]
    fn repeat_of_an_instant_fires_exactly_n_times() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let mut node = Node::new();
        let mut repeat = Repeat::new(
            CallFunc::new(move |_| counter.set(counter.get() + 1)).boxed(),
            3,
        )
        .unwrap();
        run(&mut repeat, &mut node, &[0.0, 0.1]);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn repeat_forever_carries_overshoot() {
        let mut node = Node::new();
        let mut forever = RepeatForever::new(MoveBy::new(1.0, (10.0, 0.0)).boxed());
        run(&mut forever, &mut node, &[0.0, 0.5, 0.75]);
        assert!(!forever.is_done());
        assert_eq!(forever.kind(), ActionKind::Unbounded);
        assert!(approx_eq(node.position().x, 12.5));
    }

    #[test]
    fn repeat_forever_replays_every_cycle_in_a_long_step() {
        let mut node = Node::new();
        let mut forever = RepeatForever::new(MoveBy::new(1.0, (10.0, 0.0)).boxed());
        run(&mut forever, &mut node, &[0.0, 3.5]);
        assert!(approx_eq(node.position().x, 35.0));

        let mut node = Node::new();
        let mut in_place = MoveBy::new(1.0, (10.0, 0.0)).repeat_forever();
        run(&mut in_place, &mut node, &[0.0, 3.5]);
        assert!(approx_eq(node.position().x, 35.0));
    }

    #[test]
    fn reverse_time_round_trip_returns_the_original() {
        let mut node = Node::new();
        let wrapped = ReverseTime::new(MoveBy::new(1.0, (10.0, 0.0)).boxed());
        let mut original = wrapped.reverse();
        run(original.as_mut(), &mut node, &[0.0, 1.0]);
        assert!(approx_eq(node.position().x, 10.0));
    }

    #[test]
    fn reversed_sequence_plays_children_backwards() {
        let mut node = Node::new();
        let sequence = Sequence::new(
            MoveBy::new(1.0, (10.0, 0.0)).boxed(),
            MoveBy::new(1.0, (0.0, 10.0)).boxed(),
        );
        let mut reversed = sequence.reverse();
        run(reversed.as_mut(), &mut node, &[0.0, 1.0]);
        assert!(approx_eq(node.position().x, 0.0));
        assert!(approx_eq(node.position().y, -10.0));
        reversed.step(1.0, &mut node);
        assert!(approx_eq(node.position().x, -10.0));
    }

    #[test]
    fn speed_scales_stepping() {
        let mut node = Node::new();
        let mut fast = Speed::new(MoveBy::new(2.0, (10.0, 0.0)).boxed(), 2.0);
        assert!(approx_eq(fast.duration(), 1.0));
        run(&mut fast, &mut node, &[0.0, 0.5]);
        assert!(approx_eq(node.position().x, 5.0));
        fast.step(0.5, &mut node);
        assert!(fast.is_done());
    }

    #[test]
    fn in_place_repeat_multiplies_inside_composites() {
        let mut node = Node::new();
        let child = MoveBy::new(1.0, (10.0, 0.0)).repeat(2);
        let mut repeat = Repeat::new(child.boxed(), 2).unwrap();
        assert!(approx_eq(repeat.duration(), 4.0));
        run(&mut repeat, &mut node, &[0.0, 1.0, 1.0, 1.0, 1.0]);
        assert!(repeat.is_done());
        assert!(approx_eq(node.position().x, 40.0));
    }
}
