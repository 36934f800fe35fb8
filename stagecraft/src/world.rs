//! The scene graph arena.
//!
//! Nodes are owned by a [`SceneGraph`] and addressed by [`NodeId`]. The graph
//! keeps parent/child links, the running state, cascading color and opacity
//! and every dirty flag that spans more than one node.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::actions::ActionTarget;
use crate::error::{SceneError, SceneResult};
use crate::math::{AffineTransform, Color3B, Size, Vec2};
use crate::node::{Node, NodeKind, RenderCache};
use crate::render::{CommandQueue, RenderCommand, RenderSink, SpriteFrame};

/// Unique identifier for a node in a [`SceneGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Get the underlying integer ID (useful for debugging or serialization).
    pub fn to_u32(self) -> u32 {
        self.0
    }
}

/// Monotonic counter that breaks z-order ties: among siblings with the same
/// z, the one that arrived (or was reordered) first draws first.
#[derive(Clone, Debug)]
pub struct ArrivalOrder {
    next: u32,
}

impl ArrivalOrder {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next(&mut self) -> u32 {
        let value = self.next;
        self.next = self.next.wrapping_add(1);
        value
    }

    pub fn reset(&mut self) {
        self.next = 1;
    }
}

impl Default for ArrivalOrder {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle notifications, drained by whoever owns the action manager and
/// scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneEvent {
    Enter(NodeId),
    Exit(NodeId),
    Cleanup(NodeId),
}

/// Arena of nodes plus the tree operations that span several of them.
#[derive(Debug)]
pub struct SceneGraph {
    next_id: u32,
    pub(crate) nodes: HashMap<NodeId, Node>,
    arrival: ArrivalOrder,
    events: Vec<SceneEvent>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::with_arrival_order(ArrivalOrder::new())
    }

    /// A graph drawing tie-break numbers from `arrival`.
    pub fn with_arrival_order(arrival: ArrivalOrder) -> Self {
        Self {
            next_id: 1,
            nodes: HashMap::new(),
            arrival,
            events: Vec::new(),
        }
    }

    pub fn arrival_order_mut(&mut self) -> &mut ArrivalOrder {
        &mut self.arrival
    }

    /// Move a detached node into the graph.
    pub fn spawn(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.nodes.insert(id, node);
        id
    }

    /// Spawn `node` and attach it under `parent`.
    pub fn spawn_child(&mut self, parent: NodeId, node: Node) -> SceneResult<NodeId> {
        let id = self.spawn(node);
        if let Err(err) = self.add_child(parent, id) {
            self.nodes.remove(&id);
            return Err(err);
        }
        Ok(id)
    }

    /// Detach a node and delete it together with its whole subtree.
    pub fn despawn(&mut self, id: NodeId) -> bool {
        if !self.nodes.contains_key(&id) {
            return false;
        }
        if !self.remove_from_parent(id, true) {
            if self.nodes.get(&id).is_some_and(|n| n.running) {
                self.exit(id);
            }
            self.cleanup(id);
        }
        for node in self.subtree(id) {
            self.nodes.remove(&node);
        }
        true
    }

    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Raw node access. Changes made here do not propagate; prefer
    /// [`node_mut`](Self::node_mut).
    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// A handle that edits the node and propagates the change.
    pub fn node_mut(&mut self, id: NodeId) -> Option<NodeMut<'_>> {
        if self.nodes.contains_key(&id) {
            Some(NodeMut { graph: self, id })
        } else {
            None
        }
    }

    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    /// `id` followed by all of its descendants, depth first.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(&current) {
                out.push(current);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    pub fn is_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        while let Some(parent) = self.nodes.get(&node).and_then(|n| n.parent) {
            if parent == ancestor {
                return true;
            }
            node = parent;
        }
        false
    }

    // --- Tree structure ---

    /// Attach `child` under `parent` keeping the child's z order and tag.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        let (z, tag) = self
            .nodes
            .get(&child)
            .map(|n| (n.local_z_order, n.tag()))
            .ok_or(SceneError::MissingNode(child))?;
        self.add_child_with(parent, child, z, tag)
    }

    pub fn add_child_with(
        &mut self,
        parent: NodeId,
        child: NodeId,
        z: i32,
        tag: i32,
    ) -> SceneResult<()> {
        let parent_node = self
            .nodes
            .get(&parent)
            .ok_or(SceneError::MissingNode(parent))?;
        let child_node = self
            .nodes
            .get(&child)
            .ok_or(SceneError::MissingNode(child))?;
        if child_node.parent.is_some() {
            return Err(SceneError::AlreadyParented(child));
        }
        if parent == child || self.is_ancestor(child, parent) {
            return Err(SceneError::Cycle { parent, child });
        }
        if matches!(parent_node.kind, NodeKind::TileLayer(_)) {
            return Err(SceneError::ManagedChildren(parent));
        }
        let batch = self.batch_for_children_of(parent);
        if let Some(batch) = batch {
            self.check_batchable(batch, child)?;
        }

        self.link_child(parent, child, z, tag);
        if let Some(batch) = batch {
            self.append_to_batch(batch, child);
            if batch != parent {
                self.set_reorder_dirty_up_to_batch(parent);
            }
        }
        self.attach_side_effects(parent, child);
        log::trace!("added {child:?} under {parent:?} at z {z}");
        Ok(())
    }

    /// Plain tree link without batch bookkeeping.
    pub(crate) fn link_child(&mut self, parent: NodeId, child: NodeId, z: i32, tag: i32) {
        let arrival = self.arrival.next();
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
            node.local_z_order = z;
            node.set_tag(tag);
            node.order_of_arrival = arrival;
        }
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
            node.reorder_child_dirty = true;
        }
    }

    /// Cache owner, running state and cascaded values for a new child.
    pub(crate) fn attach_side_effects(&mut self, parent: NodeId, child: NodeId) {
        let owner = self.cache_owner_for_children_of(parent);
        self.set_cached_parent_recursive(child, owner);

        let Some(parent_node) = self.nodes.get(&parent) else {
            return;
        };
        let running = parent_node.running;
        let cascade_color = parent_node
            .cascade_color
            .then_some(parent_node.displayed_color);
        let cascade_opacity = parent_node
            .cascade_opacity
            .then_some(parent_node.displayed_opacity);

        if running {
            self.enter(child);
        }
        if let Some(color) = cascade_color {
            self.update_displayed_color(child, color);
        }
        if let Some(opacity) = cascade_opacity {
            self.update_displayed_opacity(child, opacity);
        }
        self.mark_children_changed(parent);
    }

    /// Detach `child` from its parent. Returns false if it had none.
    ///
    /// With `cleanup` the child's actions and scheduled updates are dropped
    /// once the stage drains the resulting [`SceneEvent::Cleanup`].
    pub fn remove_from_parent(&mut self, child: NodeId, cleanup: bool) -> bool {
        let Some(parent) = self.nodes.get(&child).and_then(|n| n.parent) else {
            return false;
        };
        self.detach_child(parent, child, cleanup);
        true
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId, cleanup: bool) -> SceneResult<()> {
        let actual = self
            .nodes
            .get(&child)
            .ok_or(SceneError::MissingNode(child))?
            .parent;
        if actual != Some(parent) {
            return Err(SceneError::NotAChild { parent, child });
        }
        self.detach_child(parent, child, cleanup);
        Ok(())
    }

    pub fn remove_child_by_tag(&mut self, parent: NodeId, tag: i32, cleanup: bool) -> bool {
        match self.child_by_tag(parent, tag) {
            Some(child) => {
                self.detach_child(parent, child, cleanup);
                true
            }
            None => {
                log::warn!("{parent:?} has no child with tag {tag}");
                false
            }
        }
    }

    pub fn remove_all_children(&mut self, parent: NodeId, cleanup: bool) {
        let children = self.children_of(parent);
        for child in children {
            self.detach_child(parent, child, cleanup);
        }
    }

    fn detach_child(&mut self, parent: NodeId, child: NodeId, cleanup: bool) {
        if self
            .nodes
            .get(&parent)
            .is_some_and(|n| matches!(n.kind, NodeKind::TileLayer(_)))
        {
            self.forget_tile_child(parent, child);
        }
        if self.nodes.get(&child).is_some_and(Node::is_batched) {
            self.remove_sprite_from_atlas(child);
        }
        if self.nodes.get(&child).is_some_and(|n| n.running) {
            self.exit(child);
        }
        if cleanup {
            self.cleanup(child);
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = None;
        }
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.retain(|c| *c != child);
        }
        self.set_cached_parent_recursive(child, None);
        self.mark_children_changed(parent);
        log::trace!("removed {child:?} from {parent:?}");
    }

    /// Changes a child's z order; it also becomes the newest arrival among
    /// its siblings.
    pub fn reorder_child(&mut self, child: NodeId, z: i32) {
        let arrival = self.arrival.next();
        let Some(node) = self.nodes.get_mut(&child) else {
            return;
        };
        node.local_z_order = z;
        node.order_of_arrival = arrival;
        let batched = node.is_batched();
        let Some(parent) = node.parent else {
            return;
        };
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.reorder_child_dirty = true;
        }
        if batched {
            self.set_reorder_dirty_up_to_batch(parent);
        }
        self.mark_children_changed(parent);
    }

    pub fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&id)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn child_by_tag(&self, parent: NodeId, tag: i32) -> Option<NodeId> {
        let node = self.nodes.get(&parent)?;
        node.children
            .iter()
            .copied()
            .find(|c| self.nodes.get(c).is_some_and(|n| n.tag() == tag))
    }

    pub fn child_by_name(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        let node = self.nodes.get(&parent)?;
        node.children
            .iter()
            .copied()
            .find(|c| self.nodes.get(c).is_some_and(|n| n.name() == name))
    }

    /// Stable sort of the children by `(z, arrival)` if a reorder is pending.
    pub fn sort_all_children(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        if !node.reorder_child_dirty {
            return;
        }
        let mut keyed: Vec<(i32, u32, NodeId)> = node
            .children
            .iter()
            .filter_map(|c| {
                self.nodes
                    .get(c)
                    .map(|n| (n.local_z_order, n.order_of_arrival, *c))
            })
            .collect();
        insertion_sort(&mut keyed);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.children = keyed.into_iter().map(|(_, _, c)| c).collect();
            node.reorder_child_dirty = false;
        }
    }

    // --- Lifecycle ---

    /// Marks `id` and its subtree running.
    pub fn enter(&mut self, id: NodeId) {
        for node in self.subtree(id) {
            if let Some(n) = self.nodes.get_mut(&node) {
                n.running = true;
                self.events.push(SceneEvent::Enter(node));
            }
        }
    }

    pub fn exit(&mut self, id: NodeId) {
        for node in self.subtree(id) {
            if let Some(n) = self.nodes.get_mut(&node) {
                n.running = false;
                self.events.push(SceneEvent::Exit(node));
            }
        }
    }

    fn cleanup(&mut self, id: NodeId) {
        for node in self.subtree(id) {
            self.events.push(SceneEvent::Cleanup(node));
        }
    }

    // --- Propagated setters ---

    /// Applies a geometric edit and propagates the dirty transform.
    pub fn update_transform(&mut self, id: NodeId, edit: impl FnOnce(&mut Node)) {
        if let Some(node) = self.nodes.get_mut(&id) {
            edit(node);
            self.mark_transform_dirty(id);
        }
    }

    /// Marks the node's transform dirty, its batched quads stale and any
    /// baked ancestor's cache dirty.
    pub fn mark_transform_dirty(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        node.invalidate_transform();
        if node.is_batched() {
            self.mark_quads_dirty(id);
        }
        self.mark_cache_dirty(id);
    }

    pub(crate) fn mark_quads_dirty(&mut self, id: NodeId) {
        for node in self.subtree(id) {
            if let Some(sprite) = self.nodes.get_mut(&node).and_then(Node::sprite_data_mut) {
                sprite.quad_dirty = true;
            }
        }
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        node.set_visible(visible);
        if node.is_batched() {
            self.mark_quads_dirty(id);
        }
        self.mark_cache_dirty(id);
    }

    pub fn set_opacity(&mut self, id: NodeId, opacity: u8) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        node.set_real_opacity(opacity);
        let parent_opacity = self.parent_cascaded_opacity(id);
        self.update_displayed_opacity(id, parent_opacity);
    }

    pub fn set_color(&mut self, id: NodeId, color: Color3B) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        node.set_real_color(color);
        let parent_color = self.parent_cascaded_color(id);
        self.update_displayed_color(id, parent_color);
    }

    fn parent_cascaded_opacity(&self, id: NodeId) -> u8 {
        self.nodes
            .get(&id)
            .and_then(|n| n.parent)
            .and_then(|p| self.nodes.get(&p))
            .filter(|p| p.cascade_opacity)
            .map_or(255, |p| p.displayed_opacity)
    }

    fn parent_cascaded_color(&self, id: NodeId) -> Color3B {
        self.nodes
            .get(&id)
            .and_then(|n| n.parent)
            .and_then(|p| self.nodes.get(&p))
            .filter(|p| p.cascade_color)
            .map_or(Color3B::WHITE, |p| p.displayed_color)
    }

    /// Recomputes `displayed = real * parent / 255` and pushes it down while
    /// cascading is enabled.
    pub fn update_displayed_opacity(&mut self, id: NodeId, parent_opacity: u8) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        let displayed = crate::math::modulate_channel(node.opacity(), parent_opacity);
        let color = node.displayed_color;
        node.set_displayed(color, displayed);
        let cascade = node.cascade_opacity;
        let children = node.children.clone();
        self.mark_cache_dirty(id);
        if cascade {
            for child in children {
                self.update_displayed_opacity(child, displayed);
            }
        }
    }

    pub fn update_displayed_color(&mut self, id: NodeId, parent_color: Color3B) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        let displayed = node.color().modulate(parent_color);
        let opacity = node.displayed_opacity;
        node.set_displayed(displayed, opacity);
        let cascade = node.cascade_color;
        let children = node.children.clone();
        self.mark_cache_dirty(id);
        if cascade {
            for child in children {
                self.update_displayed_color(child, displayed);
            }
        }
    }

    pub fn set_cascade_opacity_enabled(&mut self, id: NodeId, enabled: bool) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        if node.cascade_opacity == enabled {
            return;
        }
        node.cascade_opacity = enabled;
        if enabled {
            let parent_opacity = self.parent_cascaded_opacity(id);
            self.update_displayed_opacity(id, parent_opacity);
        } else {
            // Children fall back to a fully opaque baseline.
            let real = node.opacity();
            let color = node.displayed_color;
            node.set_displayed(color, real);
            for child in self.children_of(id) {
                self.update_displayed_opacity(child, 255);
            }
        }
    }

    pub fn set_cascade_color_enabled(&mut self, id: NodeId, enabled: bool) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        if node.cascade_color == enabled {
            return;
        }
        node.cascade_color = enabled;
        if enabled {
            let parent_color = self.parent_cascaded_color(id);
            self.update_displayed_color(id, parent_color);
        } else {
            let real = node.color();
            let opacity = node.displayed_opacity;
            node.set_displayed(real, opacity);
            for child in self.children_of(id) {
                self.update_displayed_color(child, Color3B::WHITE);
            }
        }
    }

    pub fn set_sprite_frame(&mut self, id: NodeId, frame: &SpriteFrame) {
        let changed = self
            .nodes
            .get_mut(&id)
            .is_some_and(|n| n.set_sprite_frame(frame));
        if changed {
            self.mark_transform_dirty(id);
        } else {
            log::warn!("sprite frame requested on {id:?}, which is not a sprite");
        }
    }

    pub fn set_flipped_x(&mut self, id: NodeId, flipped: bool) {
        if let Some(node) = self.nodes.get_mut(&id) {
            ActionTarget::set_flipped_x(node, flipped);
            self.mark_transform_dirty(id);
        }
    }

    pub fn set_flipped_y(&mut self, id: NodeId, flipped: bool) {
        if let Some(node) = self.nodes.get_mut(&id) {
            ActionTarget::set_flipped_y(node, flipped);
            self.mark_transform_dirty(id);
        }
    }

    // --- Render caching ---

    /// Starts recording the subtree's commands and replaying them until a
    /// descendant changes.
    pub fn bake(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        if node.cache.is_some() {
            return;
        }
        node.cache = Some(RenderCache {
            commands: Vec::new(),
            dirty: true,
        });
        for child in self.children_of(id) {
            self.set_cached_parent_recursive(child, Some(id));
        }
        // An enclosing cache must re-record to replay the new one.
        self.mark_cache_dirty(id);
    }

    pub fn unbake(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        if node.cache.take().is_none() {
            return;
        }
        let owner = node.cached_parent;
        for child in self.children_of(id) {
            self.set_cached_parent_recursive(child, owner);
        }
        self.mark_cache_dirty(id);
    }

    pub fn is_cache_dirty(&self, id: NodeId) -> bool {
        self.nodes
            .get(&id)
            .and_then(|n| n.cache.as_ref())
            .map_or(true, |cache| cache.dirty)
    }

    fn cache_owner_for_children_of(&self, parent: NodeId) -> Option<NodeId> {
        let node = self.nodes.get(&parent)?;
        if node.cache.is_some() {
            Some(parent)
        } else {
            node.cached_parent
        }
    }

    fn set_cached_parent_recursive(&mut self, id: NodeId, owner: Option<NodeId>) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        node.cached_parent = owner;
        if node.cache.is_some() {
            // A baked descendant keeps owning its own subtree.
            return;
        }
        for child in node.children.clone() {
            self.set_cached_parent_recursive(child, owner);
        }
    }

    /// The drawing of `id` changed: dirty every baked cache above it.
    pub fn mark_cache_dirty(&mut self, id: NodeId) {
        let start = self.nodes.get(&id).and_then(|n| n.cached_parent);
        self.dirty_cache_chain(start);
    }

    /// The child list of `parent` changed.
    fn mark_children_changed(&mut self, parent: NodeId) {
        let start = self.cache_owner_for_children_of(parent);
        self.dirty_cache_chain(start);
    }

    fn dirty_cache_chain(&mut self, start: Option<NodeId>) {
        let mut current = start;
        while let Some(id) = current {
            let Some(node) = self.nodes.get_mut(&id) else {
                break;
            };
            if let Some(cache) = node.cache.as_mut() {
                if !invalidate_cache(cache) {
                    break;
                }
            }
            current = node.cached_parent;
        }
    }

    // --- Rendering ---

    /// Visits the tree under `root` and submits its draw commands in z order.
    pub fn visit(&mut self, root: NodeId, sink: &mut dyn RenderSink) {
        self.visit_node(root, AffineTransform::IDENTITY, sink);
    }

    fn visit_node(&mut self, id: NodeId, parent_world: AffineTransform, sink: &mut dyn RenderSink) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        if !node.is_visible() {
            return;
        }
        let world = node.node_to_parent_transform().concat(&parent_world);

        let Some(cache) = node.cache.as_ref() else {
            self.draw_subtree(id, world, sink);
            return;
        };
        if cache.dirty {
            // Record relative to the baked node so moving it keeps the cache.
            let mut queue = CommandQueue::new();
            self.draw_subtree(id, AffineTransform::IDENTITY, &mut queue);
            if let Some(cache) = self.nodes.get_mut(&id).and_then(|n| n.cache.as_mut()) {
                cache.commands = queue.into_commands();
                cache.dirty = false;
            }
        }
        if let Some(cache) = self.nodes.get(&id).and_then(|n| n.cache.as_ref()) {
            for command in &cache.commands {
                sink.submit(command.with_parent_transform(&world));
            }
        }
    }

    fn draw_subtree(&mut self, id: NodeId, world: AffineTransform, sink: &mut dyn RenderSink) {
        let is_batch = self.nodes.get(&id).is_some_and(|n| n.batch_data().is_some());
        if is_batch {
            self.draw_batch(id, world, sink);
            return;
        }

        self.sort_all_children(id);
        let children = self.children_of(id);
        let split = children
            .iter()
            .position(|c| self.nodes.get(c).is_some_and(|n| n.local_z_order >= 0))
            .unwrap_or(children.len());

        for child in &children[..split] {
            self.visit_node(*child, world, sink);
        }
        self.draw_self(id, world, sink);
        for child in &children[split..] {
            self.visit_node(*child, world, sink);
        }
    }

    fn draw_self(&mut self, id: NodeId, world: AffineTransform, sink: &mut dyn RenderSink) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        let vertex_z = node.vertex_z();
        if let Some(sprite) = node.sprite_data_mut() {
            if sprite.slot().is_some() {
                return;
            }
            sprite.quad_dirty = false;
            sink.submit(RenderCommand::Sprite {
                node: id,
                texture: sprite.texture().handle,
                quad: *sprite.quad(),
                transform: world,
                z: vertex_z,
            });
        }
    }
}

fn invalidate_cache(cache: &mut RenderCache) -> bool {
    if cache.dirty {
        false
    } else {
        cache.dirty = true;
        true
    }
}

/// Insertion sort; cheap for the nearly sorted child lists of a running scene.
fn insertion_sort<T: Ord + Copy>(items: &mut [T]) {
    for i in 1..items.len() {
        let current = items[i];
        let mut j = i;
        while j > 0 && items[j - 1] > current {
            items[j] = items[j - 1];
            j -= 1;
        }
        items[j] = current;
    }
}

/// Mutable handle to one node that routes every change through the graph.
pub struct NodeMut<'g> {
    graph: &'g mut SceneGraph,
    id: NodeId,
}

impl<'g> NodeMut<'g> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn node(&self) -> Option<&Node> {
        self.graph.nodes.get(&self.id)
    }

    pub fn graph(&self) -> &SceneGraph {
        self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        self.graph
    }

    fn read<T: Default>(&self, f: impl FnOnce(&Node) -> T) -> T {
        self.graph.nodes.get(&self.id).map(f).unwrap_or_default()
    }

    pub fn set_rotation(&mut self, degrees: f32) {
        self.graph.update_transform(self.id, |n| n.set_rotation(degrees));
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.graph.update_transform(self.id, |n| n.set_scale(scale));
    }

    pub fn set_anchor_point(&mut self, anchor: Vec2) {
        self.graph.update_transform(self.id, |n| n.set_anchor_point(anchor));
    }

    pub fn set_content_size(&mut self, size: Size) {
        self.graph.update_transform(self.id, |n| n.set_content_size(size));
    }

    pub fn set_ignore_anchor_point_for_position(&mut self, ignore: bool) {
        self.graph
            .update_transform(self.id, |n| n.set_ignore_anchor_point_for_position(ignore));
    }

    pub fn set_additional_transform(&mut self, transform: Option<AffineTransform>) {
        self.graph
            .update_transform(self.id, |n| n.set_additional_transform(transform));
    }

    pub fn set_vertex_z(&mut self, z: f32) {
        self.graph.update_transform(self.id, |n| n.set_vertex_z(z));
    }

    pub fn set_local_z_order(&mut self, z: i32) {
        self.graph.reorder_child(self.id, z);
    }

    pub fn set_tag(&mut self, tag: i32) {
        if let Some(node) = self.graph.nodes.get_mut(&self.id) {
            node.set_tag(tag);
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        if let Some(node) = self.graph.nodes.get_mut(&self.id) {
            node.set_name(name);
        }
    }

    pub fn set_cascade_opacity_enabled(&mut self, enabled: bool) {
        self.graph.set_cascade_opacity_enabled(self.id, enabled);
    }

    pub fn set_cascade_color_enabled(&mut self, enabled: bool) {
        self.graph.set_cascade_color_enabled(self.id, enabled);
    }

    pub fn displayed_opacity(&self) -> u8 {
        self.read(Node::displayed_opacity)
    }

    pub fn displayed_color(&self) -> Color3B {
        self.read(Node::displayed_color)
    }
}

impl ActionTarget for NodeMut<'_> {
    fn node_id(&self) -> Option<NodeId> {
        Some(self.id)
    }

    fn position(&self) -> Vec2 {
        self.read(Node::position)
    }

    fn set_position(&mut self, position: Vec2) {
        self.graph.update_transform(self.id, |n| n.set_position(position));
    }

    fn rotation_x(&self) -> f32 {
        self.read(Node::rotation_x)
    }

    fn rotation_y(&self) -> f32 {
        self.read(Node::rotation_y)
    }

    fn set_rotation_x(&mut self, degrees: f32) {
        self.graph.update_transform(self.id, |n| n.set_rotation_x(degrees));
    }

    fn set_rotation_y(&mut self, degrees: f32) {
        self.graph.update_transform(self.id, |n| n.set_rotation_y(degrees));
    }

    fn scale_x(&self) -> f32 {
        self.read(Node::scale_x)
    }

    fn scale_y(&self) -> f32 {
        self.read(Node::scale_y)
    }

    fn set_scale_x(&mut self, scale: f32) {
        self.graph.update_transform(self.id, |n| n.set_scale_x(scale));
    }

    fn set_scale_y(&mut self, scale: f32) {
        self.graph.update_transform(self.id, |n| n.set_scale_y(scale));
    }

    fn skew_x(&self) -> f32 {
        self.read(Node::skew_x)
    }

    fn skew_y(&self) -> f32 {
        self.read(Node::skew_y)
    }

    fn set_skew_x(&mut self, degrees: f32) {
        self.graph.update_transform(self.id, |n| n.set_skew_x(degrees));
    }

    fn set_skew_y(&mut self, degrees: f32) {
        self.graph.update_transform(self.id, |n| n.set_skew_y(degrees));
    }

    fn opacity(&self) -> u8 {
        self.read(Node::opacity)
    }

    fn set_opacity(&mut self, opacity: u8) {
        self.graph.set_opacity(self.id, opacity);
    }

    fn color(&self) -> Color3B {
        self.read(Node::color)
    }

    fn set_color(&mut self, color: Color3B) {
        self.graph.set_color(self.id, color);
    }

    fn is_visible(&self) -> bool {
        self.read(Node::is_visible)
    }

    fn set_visible(&mut self, visible: bool) {
        self.graph.set_visible(self.id, visible);
    }

    fn set_flipped_x(&mut self, flipped: bool) {
        self.graph.set_flipped_x(self.id, flipped);
    }

    fn set_flipped_y(&mut self, flipped: bool) {
        self.graph.set_flipped_y(self.id, flipped);
    }

    fn display_frame(&self) -> Option<SpriteFrame> {
        self.graph
            .nodes
            .get(&self.id)
            .and_then(|node| node.display_frame())
    }

    fn set_display_frame(&mut self, frame: &SpriteFrame) {
        self.graph.set_sprite_frame(self.id, frame);
    }

    fn remove_from_parent(&mut self, cleanup: bool) {
        self.graph.remove_from_parent(self.id, cleanup);
    }
}
