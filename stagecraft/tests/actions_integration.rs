//! Integration tests for the action engine driven through a stage.
//!
//! # Usage
//!
//! ```sh
//! cargo test --test actions_integration
//! ```

use std::cell::Cell;
use std::rc::Rc;

use stagecraft::actions::{
    Action, ActionCore, ActionExt, ActionTarget, CallFunc, DelayTime, EaseAction, Easing, FadeOut,
    MoveBy, Repeat, RepeatForever, ReverseTime, RotateBy, Sequence, Spawn, Speed,
};
use stagecraft::{Node, NodeId, Stage, Vec2};

const EPSILON: f32 = 1e-4;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

/// Counts lifecycle calls so composites can be checked from the outside.
#[derive(Debug, Default)]
struct Counters {
    starts: Cell<u32>,
    stops: Cell<u32>,
    completions: Cell<u32>,
}

#[derive(Debug)]
struct CountingAction {
    core: ActionCore,
    counters: Rc<Counters>,
    finished: bool,
}

impl CountingAction {
    fn new(duration: f32, counters: &Rc<Counters>) -> Self {
        Self {
            core: ActionCore::new(duration),
            counters: Rc::clone(counters),
            finished: false,
        }
    }
}

impl Action for CountingAction {
    fn core(&self) -> &ActionCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }

    fn start_with_target(&mut self, target: &mut dyn ActionTarget) {
        self.core.start(target.node_id());
        self.finished = false;
        self.counters.starts.set(self.counters.starts.get() + 1);
    }

    fn apply(&mut self, t: f32, _target: &mut dyn ActionTarget) {
        if t >= 1.0 && !self.finished {
            self.finished = true;
            self.counters.completions.set(self.counters.completions.get() + 1);
        }
    }

    fn stop(&mut self, _target: &mut dyn ActionTarget) {
        self.counters.stops.set(self.counters.stops.get() + 1);
        self.core.stop();
    }

    fn reverse(&self) -> Box<dyn Action> {
        self.clone_action()
    }

    fn clone_action(&self) -> Box<dyn Action> {
        Box::new(Self::new(self.core.duration(), &self.counters))
    }
}

fn stage_with_node() -> (Stage, NodeId) {
    let mut stage = Stage::new();
    let id = stage.add_to_root(Node::new());
    (stage, id)
}

fn position(stage: &Stage, id: NodeId) -> Vec2 {
    stage.graph().get(id).unwrap().position()
}

#[test]
fn move_by_scenario_through_the_stage() {
    let (mut stage, id) = stage_with_node();
    stage.run_action(id, MoveBy::new(2.0, (100.0, 0.0)).boxed());
    stage.tick(0.0);
    stage.tick(0.25);
    stage.tick(0.25);
    stage.tick(0.25);
    stage.tick(0.25);
    assert!(approx_eq(position(&stage, id).x, 50.0));
    for _ in 0..4 {
        stage.tick(0.25);
    }
    assert!(approx_eq(position(&stage, id).x, 100.0));
    assert_eq!(stage.actions().number_of_running_actions_in_target(id), 0);
}

#[test]
fn ease_in_squares_normalized_time() {
    let mut node = Node::new();
    let mut action = EaseAction::new(MoveBy::new(1.0, (100.0, 0.0)).boxed(), Easing::In(2.0));
    action.start_with_target(&mut node);
    action.update(0.5, &mut node);
    assert!(approx_eq(node.position().x, 25.0));
}

#[test]
fn ease_chain_on_the_action_itself() {
    let mut node = Node::new();
    let mut action = MoveBy::new(1.0, (100.0, 0.0)).easing([Easing::In(2.0)]);
    action.start_with_target(&mut node);
    action.update(0.5, &mut node);
    assert!(approx_eq(node.position().x, 25.0));
}

#[test]
fn spawn_pads_the_shorter_child() {
    let mut node = Node::new();
    let mut spawn = Spawn::new(
        MoveBy::new(1.0, (10.0, 0.0)).boxed(),
        MoveBy::new(2.0, (0.0, 10.0)).boxed(),
    );
    assert!(approx_eq(spawn.duration(), 2.0));
    spawn.start_with_target(&mut node);
    spawn.update(0.5, &mut node);
    assert!(approx_eq(node.position().x, 10.0));
    assert!(approx_eq(node.position().y, 5.0));
}

#[test]
fn duration_algebra() {
    let sequence = Sequence::new(DelayTime::new(1.5).boxed(), DelayTime::new(0.5).boxed());
    assert!(approx_eq(sequence.duration(), 2.0));
    let spawn = Spawn::new(DelayTime::new(1.5).boxed(), DelayTime::new(0.5).boxed());
    assert!(approx_eq(spawn.duration(), 1.5));
    let repeat = Repeat::new(DelayTime::new(0.5).boxed(), 4).unwrap();
    assert!(approx_eq(repeat.duration(), 2.0));
    let speed = Speed::new(DelayTime::new(2.0).boxed(), 4.0);
    assert!(approx_eq(speed.duration(), 0.5));
}

#[test]
fn sequence_split_hands_over_exactly_once() {
    let first = Rc::new(Counters::default());
    let second = Rc::new(Counters::default());
    let mut node = Node::new();
    let mut sequence = Sequence::new(
        CountingAction::new(1.0, &first).boxed(),
        CountingAction::new(1.0, &second).boxed(),
    );
    sequence.start_with_target(&mut node);
    for t in [0.0, 0.25, 0.49, 0.51, 0.75, 1.0] {
        sequence.update(t, &mut node);
    }
    assert_eq!(first.starts.get(), 1);
    assert_eq!(first.stops.get(), 1);
    assert_eq!(first.completions.get(), 1);
    assert_eq!(second.starts.get(), 1);
    assert_eq!(second.stops.get(), 0);
}

#[test]
fn repeat_runs_the_inner_cycle_n_times() {
    let counters = Rc::new(Counters::default());
    let (mut stage, id) = stage_with_node();
    let repeat = Repeat::new(CountingAction::new(1.0, &counters).boxed(), 3).unwrap();
    stage.run_action(id, repeat.boxed());
    stage.tick(0.0);
    for _ in 0..40 {
        stage.tick(0.1);
    }
    assert_eq!(counters.completions.get(), 3);
    assert_eq!(counters.starts.get(), 3);
    assert_eq!(stage.actions().number_of_running_actions(), 0);
}

#[test]
fn repeat_forever_keeps_running() {
    let (mut stage, id) = stage_with_node();
    stage.run_action(
        id,
        RepeatForever::new(RotateBy::new(1.0, 90.0).boxed()).boxed(),
    );
    stage.tick(0.0);
    for _ in 0..10 {
        stage.tick(0.25);
    }
    let rotation = stage.graph().get(id).unwrap().rotation_x();
    assert!(approx_eq(rotation, 225.0));
    assert_eq!(stage.actions().number_of_running_actions_in_target(id), 1);
}

#[test]
fn in_place_repeat_multiplies_with_the_composite() {
    let (mut stage, id) = stage_with_node();
    let inner = MoveBy::new(0.5, (1.0, 0.0)).repeat(2);
    let repeat = Repeat::new(inner.boxed(), 3).unwrap();
    assert!(approx_eq(repeat.duration(), 3.0));
    stage.run_action(id, repeat.boxed());
    stage.tick(0.0);
    for _ in 0..16 {
        stage.tick(0.25);
    }
    assert!(approx_eq(position(&stage, id).x, 6.0));
}

#[test]
fn reverse_time_and_reverse_round_trip() {
    let mut node = Node::new();
    let mut back = ReverseTime::new(MoveBy::new(1.0, (10.0, 0.0)).boxed());
    back.start_with_target(&mut node);
    back.update(0.25, &mut node);
    assert!(approx_eq(node.position().x, 7.5));

    let mut node = Node::new();
    let mut round_trip = MoveBy::new(1.0, (30.0, 5.0)).reverse().reverse();
    round_trip.start_with_target(&mut node);
    round_trip.update(1.0, &mut node);
    assert!(approx_eq(node.position().x, 30.0));
    assert!(approx_eq(node.position().y, 5.0));
}

#[test]
fn call_func_runs_inside_a_sequence() {
    let (mut stage, id) = stage_with_node();
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&calls);
    let sequence = Sequence::new(
        FadeOut::new(0.5).boxed(),
        CallFunc::new(move |target| {
            seen.set(seen.get() + 1);
            target.set_position(Vec2::new(1.0, 2.0));
        })
        .boxed(),
    );
    stage.run_action(id, sequence.boxed());
    stage.tick(0.0);
    stage.tick(0.25);
    stage.tick(0.25);
    stage.tick(0.25);
    assert_eq!(calls.get(), 1);
    assert_eq!(position(&stage, id), Vec2::new(1.0, 2.0));
    assert_eq!(stage.graph().get(id).unwrap().opacity(), 0);
}
