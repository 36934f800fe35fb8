//! Per-target action lists driven once per frame.

use super::action::Action;
use crate::world::{NodeId, SceneGraph};

#[derive(Debug)]
struct TargetActions {
    target: NodeId,
    actions: Vec<Box<dyn Action>>,
    paused: bool,
}

/// Runs the actions registered against scene nodes.
///
/// Targets are visited in the order they first received an action, and each
/// target's actions in the order they were added.
#[derive(Debug, Default)]
pub struct ActionManager {
    targets: Vec<TargetActions>,
}

impl ActionManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, target: NodeId) -> Option<&TargetActions> {
        self.targets.iter().find(|entry| entry.target == target)
    }

    fn entry_mut(&mut self, target: NodeId) -> Option<&mut TargetActions> {
        self.targets.iter_mut().find(|entry| entry.target == target)
    }

    /// Starts `action` on `target` and registers it.
    ///
    /// `paused` only applies when this is the target's first action; later
    /// additions inherit the target's current state.
    pub fn add_action(
        &mut self,
        mut action: Box<dyn Action>,
        graph: &mut SceneGraph,
        target: NodeId,
        paused: bool,
    ) {
        let Some(mut node) = graph.node_mut(target) else {
            log::warn!("action added to missing node {target:?}");
            return;
        };
        action.start_with_target(&mut node);

        match self.entry_mut(target) {
            Some(entry) => entry.actions.push(action),
            None => self.targets.push(TargetActions {
                target,
                actions: vec![action],
                paused,
            }),
        }
    }

    pub fn remove_all_actions(&mut self) {
        self.targets.clear();
    }

    pub fn remove_all_actions_from_target(&mut self, target: NodeId) {
        self.targets.retain(|entry| entry.target != target);
    }

    /// Removes the first action on `target` carrying `tag`.
    pub fn remove_action_by_tag(&mut self, tag: i32, target: NodeId) {
        if let Some(entry) = self.entry_mut(target) {
            if let Some(index) = entry
                .actions
                .iter()
                .position(|action| action.core().tag() == tag)
            {
                entry.actions.remove(index);
            }
        }
        self.drop_empty();
    }

    pub fn remove_all_actions_by_tag(&mut self, tag: i32, target: NodeId) {
        if let Some(entry) = self.entry_mut(target) {
            entry.actions.retain(|action| action.core().tag() != tag);
        }
        self.drop_empty();
    }

    pub fn action_by_tag(&self, tag: i32, target: NodeId) -> Option<&dyn Action> {
        self.entry(target)?
            .actions
            .iter()
            .find(|action| action.core().tag() == tag)
            .map(|action| action.as_ref())
    }

    pub fn number_of_running_actions_in_target(&self, target: NodeId) -> usize {
        self.entry(target).map_or(0, |entry| entry.actions.len())
    }

    pub fn number_of_running_actions(&self) -> usize {
        self.targets.iter().map(|entry| entry.actions.len()).sum()
    }

    pub fn pause_target(&mut self, target: NodeId) {
        if let Some(entry) = self.entry_mut(target) {
            entry.paused = true;
        }
    }

    pub fn resume_target(&mut self, target: NodeId) {
        if let Some(entry) = self.entry_mut(target) {
            entry.paused = false;
        }
    }

    pub fn is_target_paused(&self, target: NodeId) -> bool {
        self.entry(target).is_some_and(|entry| entry.paused)
    }

    /// Pauses every running target and returns them for [`resume_targets`](Self::resume_targets).
    pub fn pause_all_running_actions(&mut self) -> Vec<NodeId> {
        self.targets
            .iter_mut()
            .filter(|entry| !entry.paused)
            .map(|entry| {
                entry.paused = true;
                entry.target
            })
            .collect()
    }

    pub fn resume_targets(&mut self, targets: &[NodeId]) {
        for target in targets {
            self.resume_target(*target);
        }
    }

    /// Steps every unpaused action once. Finished actions are stopped and
    /// dropped; targets that left the graph are forgotten.
    pub fn update(&mut self, dt: f32, graph: &mut SceneGraph) {
        for entry in &mut self.targets {
            if entry.paused {
                continue;
            }
            let mut index = 0;
            while index < entry.actions.len() {
                let Some(mut node) = graph.node_mut(entry.target) else {
                    log::debug!("dropping actions of despawned node {:?}", entry.target);
                    entry.actions.clear();
                    break;
                };
                let action = &mut entry.actions[index];
                let scaled = dt * action.core().speed().unwrap_or(1.0);
                action.step(scaled, &mut node);
                if action.is_done() {
                    action.stop(&mut node);
                    entry.actions.remove(index);
                } else {
                    index += 1;
                }
            }
        }
        self.drop_empty();
    }

    fn drop_empty(&mut self) {
        self.targets.retain(|entry| !entry.actions.is_empty());
    }
}
