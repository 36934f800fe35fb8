//! Per-frame update callbacks attached to scene nodes.

use std::fmt;

use crate::world::{NodeId, NodeMut, SceneGraph};

/// Callback run once per tick with the frame's dt and the target node.
pub type UpdateFn = Box<dyn FnMut(f32, &mut NodeMut<'_>)>;

struct ScheduledUpdate {
    target: NodeId,
    priority: i32,
    paused: bool,
    callback: UpdateFn,
}

impl fmt::Debug for ScheduledUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledUpdate")
            .field("target", &self.target)
            .field("priority", &self.priority)
            .field("paused", &self.paused)
            .finish_non_exhaustive()
    }
}

/// Runs one update callback per target each tick.
///
/// Lower priorities run first; equal priorities run in the order they were
/// scheduled.
#[derive(Debug, Default)]
pub struct Scheduler {
    updates: Vec<ScheduledUpdate>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `callback` for `target`, replacing any update it already had.
    pub fn schedule_update(
        &mut self,
        target: NodeId,
        priority: i32,
        paused: bool,
        callback: impl FnMut(f32, &mut NodeMut<'_>) + 'static,
    ) {
        if self.is_scheduled(target) {
            log::debug!("rescheduling update of {target:?} at priority {priority}");
            self.unschedule_update(target);
        }
        let at = self.updates.partition_point(|update| update.priority <= priority);
        self.updates.insert(
            at,
            ScheduledUpdate {
                target,
                priority,
                paused,
                callback: Box::new(callback),
            },
        );
    }

    pub fn unschedule_update(&mut self, target: NodeId) {
        self.updates.retain(|update| update.target != target);
    }

    pub fn unschedule_all(&mut self) {
        self.updates.clear();
    }

    pub fn is_scheduled(&self, target: NodeId) -> bool {
        self.updates.iter().any(|update| update.target == target)
    }

    pub fn priority_of(&self, target: NodeId) -> Option<i32> {
        self.updates
            .iter()
            .find(|update| update.target == target)
            .map(|update| update.priority)
    }

    pub fn pause_target(&mut self, target: NodeId) {
        self.set_paused(target, true);
    }

    pub fn resume_target(&mut self, target: NodeId) {
        self.set_paused(target, false);
    }

    pub fn is_target_paused(&self, target: NodeId) -> bool {
        self.updates
            .iter()
            .any(|update| update.target == target && update.paused)
    }

    fn set_paused(&mut self, target: NodeId, paused: bool) {
        for update in self.updates.iter_mut().filter(|u| u.target == target) {
            update.paused = paused;
        }
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Calls every unpaused update. Updates whose target is gone are dropped.
    pub fn update(&mut self, dt: f32, graph: &mut SceneGraph) {
        self.updates.retain_mut(|update| {
            if update.paused {
                return true;
            }
            match graph.node_mut(update.target) {
                Some(mut node) => {
                    (update.callback)(dt, &mut node);
                    true
                }
                None => {
                    log::debug!("dropping update of despawned node {:?}", update.target);
                    false
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::actions::ActionTarget;
    use crate::math::Vec2;
    use crate::node::Node;

    #[test]
    fn updates_run_in_priority_then_registration_order() {
        let mut graph = SceneGraph::new();
        let a = graph.spawn(Node::new());
        let b = graph.spawn(Node::new());
        let c = graph.spawn(Node::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        let mut scheduler = Scheduler::new();
        for (target, priority) in [(a, 5), (b, -1), (c, 5)] {
            let log = Rc::clone(&log);
            scheduler.schedule_update(target, priority, false, move |_, node| {
                log.borrow_mut().push(node.id());
            });
        }
        scheduler.update(0.016, &mut graph);
        assert_eq!(*log.borrow(), vec![b, a, c]);
    }

    #[test]
    fn callbacks_edit_their_node() {
        let mut graph = SceneGraph::new();
        let id = graph.spawn(Node::new());
        let mut scheduler = Scheduler::new();
        scheduler.schedule_update(id, 0, false, |dt, node| {
            let position = node.position();
            node.set_position(Vec2::new(position.x + 100.0 * dt, position.y));
        });
        scheduler.update(0.5, &mut graph);
        scheduler.update(0.25, &mut graph);
        assert_eq!(graph.get(id).unwrap().position().x, 75.0);
    }

    #[test]
    fn pause_skips_and_reschedule_replaces() {
        let mut graph = SceneGraph::new();
        let id = graph.spawn(Node::new());
        let calls = Rc::new(RefCell::new(0));
        let mut scheduler = Scheduler::new();

        let counter = Rc::clone(&calls);
        scheduler.schedule_update(id, 0, true, move |_, _| *counter.borrow_mut() += 1);
        scheduler.update(0.1, &mut graph);
        assert_eq!(*calls.borrow(), 0);
        scheduler.resume_target(id);
        scheduler.update(0.1, &mut graph);
        assert_eq!(*calls.borrow(), 1);

        let counter = Rc::clone(&calls);
        scheduler.schedule_update(id, 3, false, move |_, _| *counter.borrow_mut() += 10);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.priority_of(id), Some(3));
        scheduler.update(0.1, &mut graph);
        assert_eq!(*calls.borrow(), 11);
    }

    #[test]
    fn despawned_targets_are_unscheduled() {
        let mut graph = SceneGraph::new();
        let id = graph.spawn(Node::new());
        let mut scheduler = Scheduler::new();
        scheduler.schedule_update(id, 0, false, |_, _| {});
        graph.despawn(id);
        scheduler.update(0.1, &mut graph);
        assert!(scheduler.is_empty());
    }
}
