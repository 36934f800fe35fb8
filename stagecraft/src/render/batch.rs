//! Sprite batching.
//!
//! A batch node draws every sprite in its subtree with one texture and one
//! quad buffer. Each batched sprite owns a slot (`atlas_index`) in that
//! buffer, and slot order always mirrors the depth-first, z-respecting
//! traversal of the subtree: children with negative z first, then the
//! parent, then the remaining children.

use super::atlas::TextureAtlas;
use super::command::{RenderCommand, RenderSink};
use super::sprite::BatchSlot;
use super::texture::Texture;
use crate::error::{SceneError, SceneResult};
use crate::math::AffineTransform;
use crate::node::{Node, NodeKind};
use crate::world::{NodeId, SceneGraph};

/// Quad buffer and slot bookkeeping for a batch node.
#[derive(Clone, Debug)]
pub struct SpriteBatch {
    pub(crate) atlas: TextureAtlas,
    /// Batched sprites sorted by atlas index.
    pub(crate) descendants: Vec<NodeId>,
    texture: Texture,
}

impl SpriteBatch {
    /// Default quad capacity for a new batch.
    pub const DEFAULT_CAPACITY: usize = 29;

    pub fn new(texture: Texture, capacity: usize) -> Self {
        Self {
            atlas: TextureAtlas::with_capacity(capacity),
            descendants: Vec::new(),
            texture,
        }
    }

    pub fn texture(&self) -> Texture {
        self.texture
    }

    pub fn atlas(&self) -> &TextureAtlas {
        &self.atlas
    }

    /// Batched sprites in atlas order.
    pub fn descendants(&self) -> &[NodeId] {
        &self.descendants
    }

    pub(crate) fn ensure_room(&mut self, index: usize) {
        let atlas = &mut self.atlas;
        while index >= atlas.capacity() || atlas.capacity() == atlas.total_quads() {
            let capacity = super::atlas::grown_capacity(atlas.capacity());
            log::debug!(
                "sprite batch full at {} quads, growing to {capacity}",
                atlas.capacity()
            );
            atlas.resize_capacity(capacity);
        }
    }
}

impl SceneGraph {
    fn batch_mut(&mut self, batch: NodeId) -> Option<&mut SpriteBatch> {
        self.nodes.get_mut(&batch).and_then(Node::batch_data_mut)
    }

    pub(crate) fn atlas_index_of(&self, id: NodeId) -> Option<usize> {
        self.nodes
            .get(&id)
            .and_then(Node::sprite_data)
            .and_then(|sprite| sprite.atlas_index())
    }

    pub(crate) fn set_atlas_index(&mut self, id: NodeId, index: usize) {
        if let Some(sprite) = self.nodes.get_mut(&id).and_then(Node::sprite_data_mut) {
            sprite.set_atlas_index(index);
        }
    }

    /// The batch that children of `parent` would render through.
    pub(crate) fn batch_for_children_of(&self, parent: NodeId) -> Option<NodeId> {
        let node = self.nodes.get(&parent)?;
        match &node.kind {
            NodeKind::Batch(_) | NodeKind::Label(_) => Some(parent),
            NodeKind::Sprite(sprite) => sprite.batch(),
            _ => None,
        }
    }

    /// Every node under `child` must be a sprite using the batch texture.
    pub(crate) fn check_batchable(&self, batch: NodeId, child: NodeId) -> SceneResult<()> {
        let texture = self
            .nodes
            .get(&batch)
            .and_then(Node::batch_data)
            .map(SpriteBatch::texture)
            .ok_or(SceneError::NotABatch(batch))?;
        for id in self.subtree(child) {
            let sprite = self
                .nodes
                .get(&id)
                .and_then(Node::sprite_data)
                .ok_or(SceneError::NotASprite(id))?;
            if sprite.texture().handle != texture.handle {
                return Err(SceneError::TextureMismatch { batch, sprite: id });
            }
        }
        Ok(())
    }

    /// Gives `sprite` and its subtree the next slots at the end of the batch.
    ///
    /// Slots are only made consistent again by the next
    /// [`sort_batch`](Self::sort_batch), which runs before drawing.
    pub fn append_child(&mut self, batch: NodeId, sprite: NodeId) {
        let quad = match self.nodes.get_mut(&sprite).and_then(Node::sprite_data_mut) {
            Some(data) => *data.quad(),
            None => {
                log::warn!("{sprite:?} is not a sprite; not appended to {batch:?}");
                return;
            }
        };
        let Some(data) = self.batch_mut(batch) else {
            log::warn!("{batch:?} is not a sprite batch");
            return;
        };
        data.descendants.push(sprite);
        let index = data.descendants.len() - 1;
        data.ensure_room(index);
        data.atlas.insert_quad(quad, index);
        if let Some(node) = self.nodes.get_mut(&batch) {
            node.reorder_child_dirty = true;
        }
        if let Some(data) = self.nodes.get_mut(&sprite).and_then(Node::sprite_data_mut) {
            data.attach(BatchSlot {
                batch,
                atlas_index: index,
            });
        }
        for child in self.children_of(sprite) {
            self.append_child(batch, child);
        }
    }

    pub(crate) fn append_to_batch(&mut self, batch: NodeId, sprite: NodeId) {
        self.append_child(batch, sprite);
        self.mark_quads_dirty(sprite);
    }

    /// Puts `sprite` at `index`, shifting every later slot up by one, then
    /// slots its children around it.
    ///
    /// `sprite` must already be linked under its parent.
    pub fn insert_child(&mut self, batch: NodeId, sprite: NodeId, index: usize) {
        let quad = match self.nodes.get_mut(&sprite).and_then(Node::sprite_data_mut) {
            Some(data) => {
                data.attach(BatchSlot {
                    batch,
                    atlas_index: index,
                });
                *data.quad()
            }
            None => {
                log::warn!("{sprite:?} is not a sprite; not inserted into {batch:?}");
                return;
            }
        };
        let Some(data) = self.batch_mut(batch) else {
            log::warn!("{batch:?} is not a sprite batch");
            return;
        };
        data.ensure_room(index);
        data.atlas.insert_quad(quad, index);
        self.shift_slots_from(batch, index, 1);
        self.insert_descendant(batch, sprite);
        self.mark_quads_dirty(sprite);

        for child in self.children_of(sprite) {
            let z = self.nodes.get(&child).map_or(0, |n| n.local_z_order);
            let index = self.atlas_index_for_child(batch, child, z);
            self.insert_child(batch, child, index);
        }
    }

    /// Moves every batched sprite at slot `index` or later by `delta`.
    pub(crate) fn shift_slots_from(&mut self, batch: NodeId, index: usize, delta: isize) {
        let Some(data) = self.batch_mut(batch) else {
            return;
        };
        let descendants = data.descendants.clone();
        for id in descendants {
            match self.atlas_index_of(id) {
                Some(current) if current >= index => {
                    self.set_atlas_index(id, current.saturating_add_signed(delta));
                }
                _ => {}
            }
        }
    }

    /// Adds `sprite` to the batch's descendant list, keeping it sorted by slot.
    pub(crate) fn insert_descendant(&mut self, batch: NodeId, sprite: NodeId) {
        let index = self.atlas_index_of(sprite).unwrap_or(0);
        let Some(descendants) = self.batch_mut(batch).map(|b| b.descendants.clone()) else {
            return;
        };
        let at = descendants
            .iter()
            .position(|id| self.atlas_index_of(*id).is_some_and(|i| i >= index))
            .unwrap_or(descendants.len());
        if let Some(data) = self.batch_mut(batch) {
            data.descendants.insert(at, sprite);
        }
    }

    /// Frees the slots of `sprite` and its subtree and shifts later slots down.
    pub fn remove_sprite_from_atlas(&mut self, sprite: NodeId) {
        let Some(node) = self.nodes.get_mut(&sprite) else {
            return;
        };
        let content_size = node.content_size();
        let Some(data) = node.sprite_data_mut() else {
            return;
        };
        let Some(slot) = data.slot() else {
            return;
        };
        data.detach(content_size);

        if let Some(batch) = self.batch_mut(slot.batch) {
            batch.atlas.remove_quad_at(slot.atlas_index);
            if let Some(position) = batch.descendants.iter().position(|id| *id == sprite) {
                batch.descendants.remove(position);
                let shifted: Vec<NodeId> = batch.descendants[position..].to_vec();
                for id in shifted {
                    if let Some(current) = self.atlas_index_of(id) {
                        self.set_atlas_index(id, current.saturating_sub(1));
                    }
                }
            }
        }
        for child in self.children_of(sprite) {
            self.remove_sprite_from_atlas(child);
        }
    }

    /// Slot a sprite with local z order `z` should take, given its place
    /// among its (sorted) siblings.
    pub fn atlas_index_for_child(&self, batch: NodeId, sprite: NodeId, z: i32) -> usize {
        let Some(parent) = self.nodes.get(&sprite).and_then(|n| n.parent) else {
            return 0;
        };
        let siblings = self.nodes.get(&parent).map_or(&[][..], |n| n.children());
        let child_index = siblings.iter().position(|c| *c == sprite).unwrap_or(0);
        let previous = child_index
            .checked_sub(1)
            .and_then(|i| siblings.get(i).copied());
        let previous_z = previous
            .and_then(|p| self.nodes.get(&p))
            .map_or(0, |n| n.local_z_order);

        if parent == batch {
            return match previous {
                Some(previous) => self.highest_atlas_index_in_child(previous) + 1,
                None => 0,
            };
        }

        let parent_index = self.atlas_index_of(parent).unwrap_or(0);
        match previous {
            None if z < 0 => parent_index,
            None => parent_index + 1,
            Some(previous) if (previous_z < 0) == (z < 0) => {
                self.highest_atlas_index_in_child(previous) + 1
            }
            // Previous sibling draws behind the parent, this one in front.
            Some(_) => parent_index + 1,
        }
    }

    /// Largest slot used by `sprite` or anything under it.
    pub fn highest_atlas_index_in_child(&self, sprite: NodeId) -> usize {
        match self.nodes.get(&sprite).and_then(|n| n.children().last().copied()) {
            Some(last) => self.highest_atlas_index_in_child(last),
            None => self.atlas_index_of(sprite).unwrap_or(0),
        }
    }

    pub fn lowest_atlas_index_in_child(&self, sprite: NodeId) -> usize {
        match self.nodes.get(&sprite).and_then(|n| n.children().first().copied()) {
            Some(first) => self.lowest_atlas_index_in_child(first),
            None => self.atlas_index_of(sprite).unwrap_or(0),
        }
    }

    /// Reassigns slot numbers from tree order without moving any quad.
    /// Returns the next free index.
    pub fn rebuild_index_in_order(&mut self, batch: NodeId, parent: NodeId, mut index: usize) -> usize {
        let (behind, front): (Vec<NodeId>, Vec<NodeId>) = self
            .children_of(parent)
            .into_iter()
            .partition(|c| self.nodes.get(c).is_some_and(|n| n.local_z_order < 0));
        for child in behind {
            index = self.rebuild_index_in_order(batch, child, index);
        }
        if parent != batch {
            self.set_atlas_index(parent, index);
            index += 1;
        }
        for child in front {
            index = self.rebuild_index_in_order(batch, child, index);
        }
        index
    }

    /// Sprites of `batch` in the order a traversal draws them.
    pub fn batch_traversal_order(&self, batch: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        for child in self.children_of(batch) {
            self.collect_traversal(child, &mut out);
        }
        out
    }

    fn collect_traversal(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let mut children = node.children().to_vec();
        children.sort_by_key(|c| {
            self.nodes
                .get(c)
                .map_or((0, 0), |n| (n.local_z_order, n.order_of_arrival))
        });
        let split = children
            .iter()
            .position(|c| self.nodes.get(c).is_some_and(|n| n.local_z_order >= 0))
            .unwrap_or(children.len());
        for child in &children[..split] {
            self.collect_traversal(*child, out);
        }
        out.push(id);
        for child in &children[split..] {
            self.collect_traversal(*child, out);
        }
    }

    /// Marks `node` and every ancestor up to and including its batch as
    /// needing a reorder.
    pub(crate) fn set_reorder_dirty_up_to_batch(&mut self, node: NodeId) {
        let mut current = Some(node);
        while let Some(id) = current {
            let Some(n) = self.nodes.get_mut(&id) else {
                break;
            };
            n.reorder_child_dirty = true;
            if n.batch_data().is_some() {
                break;
            }
            current = n.parent;
        }
    }

    /// Applies pending child reorders and moves quads so slot order matches
    /// traversal order again.
    pub fn sort_batch(&mut self, batch: NodeId) {
        let Some(node) = self.nodes.get(&batch) else {
            return;
        };
        if !node.reorder_child_dirty {
            return;
        }
        // Tile slots follow grid order, not child order.
        let keeps_slots = matches!(node.kind, NodeKind::TileLayer(_));
        self.sort_all_children(batch);
        let children = self.children_of(batch);
        for child in &children {
            self.sort_batched_subtree(*child);
        }
        if keeps_slots {
            return;
        }
        let mut index = 0;
        for child in children {
            self.update_atlas_index(batch, child, &mut index);
        }
    }

    fn sort_batched_subtree(&mut self, id: NodeId) {
        self.sort_all_children(id);
        for child in self.children_of(id) {
            self.sort_batched_subtree(child);
        }
    }

    fn update_atlas_index(&mut self, batch: NodeId, sprite: NodeId, current: &mut usize) {
        let children = self.children_of(sprite);
        let mut needs_slot = true;
        let first_in_front = children
            .first()
            .and_then(|c| self.nodes.get(c))
            .map_or(true, |n| n.local_z_order >= 0);

        if first_in_front {
            self.claim_slot(batch, sprite, *current);
            *current += 1;
            needs_slot = false;
        }
        for child in children {
            let child_z = self.nodes.get(&child).map_or(0, |n| n.local_z_order);
            if needs_slot && child_z >= 0 {
                self.claim_slot(batch, sprite, *current);
                *current += 1;
                needs_slot = false;
            }
            self.update_atlas_index(batch, child, current);
        }
        if needs_slot {
            self.claim_slot(batch, sprite, *current);
            *current += 1;
        }
    }

    /// Moves `sprite` into slot `index`, swapping with the current occupant.
    fn claim_slot(&mut self, batch: NodeId, sprite: NodeId, index: usize) {
        let Some(old) = self.atlas_index_of(sprite) else {
            return;
        };
        self.set_atlas_index(sprite, index);
        if old != index {
            self.swap_slots(batch, old, index);
        }
    }

    fn swap_slots(&mut self, batch: NodeId, old: usize, new: usize) {
        let Some(data) = self.batch_mut(batch) else {
            return;
        };
        if old >= data.descendants.len() || new >= data.descendants.len() {
            log::warn!("atlas swap {old} <-> {new} outside {} slots", data.descendants.len());
            return;
        }
        let displaced = data.descendants[new];
        data.descendants.swap(old, new);
        data.atlas.swap(old, new);
        self.set_atlas_index(displaced, old);
    }

    /// Rewrites the quads of batched sprites whose transform, color or
    /// visibility changed.
    pub fn update_batch_quads(&mut self, batch: NodeId) {
        for child in self.children_of(batch) {
            self.update_batched_sprite(batch, child, AffineTransform::IDENTITY, false);
        }
    }

    fn update_batched_sprite(
        &mut self,
        batch: NodeId,
        id: NodeId,
        parent_to_batch: AffineTransform,
        parent_hidden: bool,
    ) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        let visible = node.is_visible();
        let vertex_z = node.vertex_z();
        let local = node.node_to_parent_transform();
        let children = node.children.clone();
        let Some(sprite) = node.sprite_data_mut() else {
            return;
        };

        let mut written = None;
        if sprite.quad_dirty {
            if !visible || parent_hidden {
                sprite.quad.collapse();
                sprite.should_be_hidden = true;
            } else {
                sprite.should_be_hidden = false;
                sprite.transform_to_batch = local.concat(&parent_to_batch);
                sprite.write_batch_vertices(vertex_z);
            }
            sprite.quad_dirty = false;
            written = sprite.atlas_index().map(|index| (sprite.quad, index));
        }
        let to_batch = sprite.transform_to_batch;
        let hidden = sprite.should_be_hidden;

        if let Some((quad, index)) = written {
            if let Some(data) = self.batch_mut(batch) {
                data.atlas.update_quad(quad, index);
            }
        }
        for child in children {
            self.update_batched_sprite(batch, child, to_batch, hidden);
        }
    }

    /// Sorts, refreshes and submits a batch-like node as one command.
    /// Its children are never visited individually.
    pub(crate) fn draw_batch(&mut self, id: NodeId, world: AffineTransform, sink: &mut dyn RenderSink) {
        self.sort_batch(id);
        self.update_batch_quads(id);
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let Some(batch) = node.batch_data() else {
            return;
        };
        if batch.atlas.total_quads() == 0 {
            return;
        }
        sink.submit(RenderCommand::Quads {
            node: id,
            texture: batch.texture().handle,
            quads: batch.atlas.quads().to_vec(),
            transform: world,
            z: node.vertex_z(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Rect, Size};
    use crate::render::{CommandQueue, Sprite, TextureHandle};

    fn texture(raw: u32) -> Texture {
        Texture::new(TextureHandle::new(raw), Size::new(64.0, 64.0))
    }

    fn sprite() -> Node {
        Node::sprite(Sprite::new(texture(1), Rect::new(0.0, 0.0, 16.0, 16.0)))
    }

    fn setup() -> (SceneGraph, NodeId) {
        let mut graph = SceneGraph::new();
        let batch = graph.spawn(Node::batch(SpriteBatch::new(texture(1), 2)));
        (graph, batch)
    }

    fn atlas_order(graph: &SceneGraph, batch: NodeId) -> Vec<NodeId> {
        graph.get(batch).unwrap().batch_data().unwrap().descendants().to_vec()
    }

    fn assert_consistent(graph: &mut SceneGraph, batch: NodeId) {
        graph.sort_batch(batch);
        let order = atlas_order(graph, batch);
        assert_eq!(order, graph.batch_traversal_order(batch));
        for (index, id) in order.iter().enumerate() {
            let slot = graph.get(*id).unwrap().sprite_data().unwrap().atlas_index();
            assert_eq!(slot, Some(index));
        }
    }

    #[test]
    fn appending_grows_the_atlas() {
        let (mut graph, batch) = setup();
        for _ in 0..3 {
            graph.spawn_child(batch, sprite()).unwrap();
        }
        let data = graph.get(batch).unwrap().batch_data().unwrap();
        assert_eq!(data.atlas().total_quads(), 3);
        assert_eq!(data.atlas().capacity(), 4);
        assert_consistent(&mut graph, batch);
    }

    #[test]
    fn rejects_foreign_textures_and_plain_nodes() {
        let (mut graph, batch) = setup();
        let foreign = graph.spawn(Node::sprite(Sprite::new(
            texture(2),
            Rect::new(0.0, 0.0, 8.0, 8.0),
        )));
        assert_eq!(
            graph.add_child(batch, foreign),
            Err(SceneError::TextureMismatch {
                batch,
                sprite: foreign
            })
        );
        let plain = graph.spawn(Node::new());
        assert_eq!(graph.add_child(batch, plain), Err(SceneError::NotASprite(plain)));
    }

    #[test]
    fn nested_sprites_slot_around_their_parent() {
        let (mut graph, batch) = setup();
        let parent = graph.spawn_child(batch, sprite()).unwrap();
        let behind = graph.spawn(sprite());
        graph.add_child_with(parent, behind, -1, 0).unwrap();
        let front = graph.spawn_child(parent, sprite()).unwrap();
        assert_consistent(&mut graph, batch);
        assert_eq!(atlas_order(&graph, batch), vec![behind, parent, front]);
    }

    #[test]
    fn reorder_swaps_quads_with_their_slots() {
        let (mut graph, batch) = setup();
        let a = graph.spawn_child(batch, sprite()).unwrap();
        let b = graph.spawn_child(batch, sprite()).unwrap();
        graph.set_color(a, crate::math::Color3B::new(10, 0, 0));
        let mut queue = CommandQueue::new();
        graph.visit(batch, &mut queue);

        graph.reorder_child(a, 5);
        graph.sort_batch(batch);
        assert_eq!(atlas_order(&graph, batch), vec![b, a]);
        let quad = graph.get(batch).unwrap().batch_data().unwrap().atlas().quad(1).copied();
        assert_eq!(quad.unwrap().tl.color, [10, 0, 0, 255]);
    }

    #[test]
    fn removal_shifts_later_slots_down() {
        let (mut graph, batch) = setup();
        let a = graph.spawn_child(batch, sprite()).unwrap();
        let b = graph.spawn_child(batch, sprite()).unwrap();
        let c = graph.spawn_child(batch, sprite()).unwrap();
        graph.remove_from_parent(b, true);
        assert_eq!(atlas_order(&graph, batch), vec![a, c]);
        assert_eq!(graph.get(c).unwrap().sprite_data().unwrap().atlas_index(), Some(1));
        assert!(!graph.get(b).unwrap().is_batched());
        assert_consistent(&mut graph, batch);
    }

    #[test]
    fn insert_child_uses_the_sibling_slot() {
        let (mut graph, batch) = setup();
        let a = graph.spawn_child(batch, sprite()).unwrap();
        let b = graph.spawn_child(batch, sprite()).unwrap();
        graph.sort_batch(batch);

        let c = graph.spawn(sprite());
        graph.link_child(batch, c, 0, 0);
        graph.sort_all_children(batch);
        let index = graph.atlas_index_for_child(batch, c, 0);
        assert_eq!(index, 2);
        graph.insert_child(batch, c, 1);
        assert_eq!(atlas_order(&graph, batch), vec![a, c, b]);
        assert_eq!(graph.get(b).unwrap().sprite_data().unwrap().atlas_index(), Some(2));
    }

    #[test]
    fn rebuild_index_follows_tree_order() {
        let (mut graph, batch) = setup();
        let parent = graph.spawn_child(batch, sprite()).unwrap();
        let behind = graph.spawn(sprite());
        graph.add_child_with(parent, behind, -1, 0).unwrap();
        let front = graph.spawn(sprite());
        graph.add_child_with(parent, front, 1, 0).unwrap();
        graph.sort_all_children(parent);
        let next = graph.rebuild_index_in_order(batch, batch, 0);
        assert_eq!(next, 3);
        assert_eq!(graph.get(behind).unwrap().sprite_data().unwrap().atlas_index(), Some(0));
        assert_eq!(graph.get(parent).unwrap().sprite_data().unwrap().atlas_index(), Some(1));
        assert_eq!(graph.highest_atlas_index_in_child(parent), 2);
        assert_eq!(graph.lowest_atlas_index_in_child(parent), 0);
    }

    #[test]
    fn hidden_sprites_collapse_their_quads() {
        let (mut graph, batch) = setup();
        let a = graph.spawn_child(batch, sprite()).unwrap();
        graph.update_transform(a, |n| n.set_position(crate::math::Vec2::new(50.0, 50.0)));
        graph.update_batch_quads(batch);
        let quad = *graph.get(batch).unwrap().batch_data().unwrap().atlas().quad(0).unwrap();
        assert_eq!(quad.tr.position, [58.0, 58.0, 0.0]);

        graph.set_visible(a, false);
        graph.update_batch_quads(batch);
        let quad = *graph.get(batch).unwrap().batch_data().unwrap().atlas().quad(0).unwrap();
        assert_eq!(quad.tr.position, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn batches_draw_as_one_command() {
        let (mut graph, batch) = setup();
        let parent = graph.spawn_child(batch, sprite()).unwrap();
        graph.spawn_child(parent, sprite()).unwrap();
        let mut queue = CommandQueue::new();
        graph.visit(batch, &mut queue);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.commands()[0].quad_count(), 2);
    }
}
