use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::actions::{Action, ActionManager};
use crate::math::{Size, Vec2};
use crate::node::Node;
use crate::render::{RenderSink, SpriteBatch, Texture};
use crate::scheduler::Scheduler;
use crate::world::{NodeId, NodeMut, SceneEvent, SceneGraph};

/// Runtime settings for a [`Stage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Multiplier applied to every frame's dt.
    pub time_scale: f32,
    /// Longest dt a single frame may advance, in seconds, before scaling.
    pub max_delta: f32,
    /// Initial quad capacity for batches created through the stage.
    pub batch_capacity: usize,
    /// Content size of the root node.
    pub design_size: Size,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            max_delta: 0.25,
            batch_capacity: SpriteBatch::DEFAULT_CAPACITY,
            design_size: Size::new(1280.0, 720.0),
        }
    }
}

impl StageConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("failed to parse stage config")?;
        anyhow::ensure!(
            config.time_scale >= 0.0,
            "time_scale must not be negative, got {}",
            config.time_scale
        );
        anyhow::ensure!(
            config.max_delta > 0.0,
            "max_delta must be positive, got {}",
            config.max_delta
        );
        Ok(config)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read stage config {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("invalid stage config {}", path.display()))
    }
}

/// Owns a scene graph and everything that drives it from frame to frame.
///
/// A tick runs the action manager, then scheduled updates, then applies the
/// lifecycle events the graph produced: exiting nodes pause, entering nodes
/// resume, cleaned up nodes lose their actions and updates.
#[derive(Debug)]
pub struct Stage {
    config: StageConfig,
    graph: SceneGraph,
    actions: ActionManager,
    scheduler: Scheduler,
    root: NodeId,
    elapsed: f32,
    frames: u64,
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage {
    /// Create a stage with default configuration.
    pub fn new() -> Self {
        Self::with_config(StageConfig::default())
    }

    pub fn with_config(config: StageConfig) -> Self {
        let mut graph = SceneGraph::new();
        let mut root = Node::new();
        root.set_name("root");
        root.set_content_size(config.design_size);
        let root = graph.spawn(root);
        graph.enter(root);
        graph.drain_events();
        log::debug!("stage created with {config:?}");
        Self {
            config,
            graph,
            actions: ActionManager::new(),
            scheduler: Scheduler::new(),
            root,
            elapsed: 0.0,
            frames: 0,
        }
    }

    /// Override the global time scale.
    #[must_use]
    pub fn with_time_scale(mut self, time_scale: f32) -> Self {
        self.set_time_scale(time_scale);
        self
    }

    /// Override the per-frame dt clamp.
    #[must_use]
    pub fn with_max_delta(mut self, max_delta: f32) -> Self {
        if max_delta > 0.0 {
            self.config.max_delta = max_delta;
        } else {
            log::warn!("ignoring invalid max delta {max_delta}");
        }
        self
    }

    #[must_use]
    pub fn with_design_size(mut self, size: Size) -> Self {
        self.config.design_size = size;
        self.graph
            .update_transform(self.root, |node| node.set_content_size(size));
        self
    }

    #[must_use]
    pub fn with_batch_capacity(mut self, capacity: usize) -> Self {
        self.config.batch_capacity = capacity;
        self
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn set_time_scale(&mut self, time_scale: f32) {
        if time_scale >= 0.0 {
            self.config.time_scale = time_scale;
        } else {
            log::warn!("ignoring negative time scale {time_scale}");
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<NodeMut<'_>> {
        self.graph.node_mut(id)
    }

    pub fn actions(&self) -> &ActionManager {
        &self.actions
    }

    pub fn actions_mut(&mut self) -> &mut ActionManager {
        &mut self.actions
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Scaled time accumulated over every tick.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// An empty batch sized from the configured capacity.
    pub fn new_batch(&self, texture: Texture) -> SpriteBatch {
        SpriteBatch::new(texture, self.config.batch_capacity)
    }

    /// Spawn `node` directly under the root.
    pub fn add_to_root(&mut self, node: Node) -> NodeId {
        let root = self.root;
        match self.graph.spawn_child(root, node) {
            Ok(id) => id,
            Err(err) => {
                // A fresh node under the root only fails if the root is gone.
                log::warn!("could not attach node to the root: {err}");
                self.graph.spawn(Node::new())
            }
        }
    }

    /// Starts `action` on `target`. Targets that are not running start paused
    /// and resume when they enter the stage.
    pub fn run_action(&mut self, target: NodeId, action: Box<dyn Action>) {
        let paused = !self.graph.get(target).is_some_and(Node::is_running);
        self.actions.add_action(action, &mut self.graph, target, paused);
    }

    pub fn stop_all_actions(&mut self, target: NodeId) {
        self.actions.remove_all_actions_from_target(target);
    }

    pub fn stop_action_by_tag(&mut self, target: NodeId, tag: i32) {
        self.actions.remove_action_by_tag(tag, target);
    }

    /// Schedules a per-frame update on `target`.
    pub fn schedule_update(
        &mut self,
        target: NodeId,
        priority: i32,
        callback: impl FnMut(f32, &mut NodeMut<'_>) + 'static,
    ) {
        let paused = !self.graph.get(target).is_some_and(Node::is_running);
        self.scheduler.schedule_update(target, priority, paused, callback);
    }

    /// Pauses the actions and updates of `target`.
    pub fn pause(&mut self, target: NodeId) {
        self.actions.pause_target(target);
        self.scheduler.pause_target(target);
    }

    pub fn resume(&mut self, target: NodeId) {
        self.actions.resume_target(target);
        self.scheduler.resume_target(target);
    }

    /// Clamps and scales `dt`, then runs actions and updates for one frame.
    pub fn tick(&mut self, dt: f32) {
        self.process_events();
        let dt = dt.clamp(0.0, self.config.max_delta) * self.config.time_scale;
        self.actions.update(dt, &mut self.graph);
        self.scheduler.update(dt, &mut self.graph);
        self.process_events();
        self.elapsed += dt;
        self.frames += 1;
    }

    /// Visits the tree from the root and submits its draw commands.
    pub fn render(&mut self, sink: &mut dyn RenderSink) {
        self.graph.visit(self.root, sink);
    }

    /// One full frame: [`tick`](Self::tick) then [`render`](Self::render).
    pub fn frame(&mut self, dt: f32, sink: &mut dyn RenderSink) {
        self.tick(dt);
        self.render(sink);
    }

    /// Converts a point in root space into `node`'s space.
    pub fn convert_to_node_space(&self, node: NodeId, point: Vec2) -> Vec2 {
        crate::hierarchy::convert_to_node_space(&self.graph, node, point)
    }

    fn process_events(&mut self) {
        for event in self.graph.drain_events() {
            match event {
                SceneEvent::Enter(id) => self.resume(id),
                SceneEvent::Exit(id) => self.pause(id),
                SceneEvent::Cleanup(id) => {
                    self.actions.remove_all_actions_from_target(id);
                    self.scheduler.unschedule_update(id);
                }
            }
        }
    }
}
