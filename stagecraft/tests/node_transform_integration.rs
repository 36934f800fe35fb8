//! Integration tests for node transforms, hierarchy conversions and baked
//! render caches.
//!
//! # Usage
//!
//! ```sh
//! cargo test --test node_transform_integration
//! ```

use stagecraft::hierarchy::{
    convert_to_node_space, convert_to_world_space, get_world_position, node_to_world_transform,
    reparent, world_bounding_box,
};
use stagecraft::{
    ActionTarget, AffineTransform, CommandQueue, Node, NodeId, Rect, RenderCommand, SceneGraph,
    Size, Sprite, Stage, Texture, TextureHandle, Vec2,
};

const EPSILON: f32 = 1e-4;

fn approx_eq(a: Vec2, b: Vec2) -> bool {
    (a.x - b.x).abs() < EPSILON && (a.y - b.y).abs() < EPSILON
}

fn texture() -> Texture {
    Texture::new(TextureHandle::new(2), Size::new(32.0, 32.0))
}

fn sprite_at(x: f32, y: f32) -> Node {
    let mut node = Node::sprite(Sprite::new(texture(), Rect::new(0.0, 0.0, 8.0, 8.0)));
    node.set_position(Vec2::new(x, y));
    node
}

// ==================== Local transforms ====================

#[test]
fn anchor_point_offsets_the_content() {
    let mut node = Node::new();
    node.set_content_size(Size::new(100.0, 50.0));
    node.set_anchor_point(Vec2::new(0.5, 0.5));
    node.set_position(Vec2::new(200.0, 100.0));
    let bounds = node.bounding_box();
    assert!(approx_eq(bounds.origin(), Vec2::new(150.0, 75.0)));
    assert_eq!(bounds.size(), Size::new(100.0, 50.0));

    node.set_ignore_anchor_point_for_position(true);
    assert!(approx_eq(node.bounding_box().origin(), Vec2::new(200.0, 100.0)));
}

#[test]
fn rotation_is_clockwise_in_degrees() {
    let mut node = Node::new();
    node.set_rotation(90.0);
    let p = node.node_to_parent_transform().apply_point(Vec2::new(1.0, 0.0));
    assert!(approx_eq(p, Vec2::new(0.0, -1.0)));
}

#[test]
fn skew_shears_along_each_axis() {
    let mut node = Node::new();
    node.set_skew_x(45.0);
    let p = node.node_to_parent_transform().apply_point(Vec2::new(0.0, 1.0));
    assert!(approx_eq(p, Vec2::new(1.0, 1.0)));
}

#[test]
fn additional_transform_applies_after_the_local_one() {
    let mut node = Node::new();
    node.set_position(Vec2::new(10.0, 0.0));
    node.set_scale(2.0);
    node.set_additional_transform(Some(AffineTransform::translation(5.0, 0.0)));
    let t = node.node_to_parent_transform();
    assert!(approx_eq(t.apply_point(Vec2::ZERO), Vec2::new(15.0, 0.0)));
    assert!(approx_eq(t.apply_point(Vec2::new(1.0, 0.0)), Vec2::new(17.0, 0.0)));
}

#[test]
fn transform_is_recomputed_only_after_a_change() {
    let mut node = Node::new();
    assert!(node.is_transform_dirty());
    node.node_to_parent_transform();
    assert!(!node.is_transform_dirty());

    node.set_position(Vec2::ZERO);
    assert!(!node.is_transform_dirty());

    node.set_position(Vec2::new(3.0, 4.0));
    assert!(node.is_transform_dirty());
    let t = node.node_to_parent_transform();
    assert!(approx_eq(t.apply_point(Vec2::ZERO), Vec2::new(3.0, 4.0)));
    assert!(
        t.concat(&node.parent_to_node_transform())
            .approx_eq(&AffineTransform::IDENTITY, EPSILON)
    );
}

// ==================== Hierarchy ====================

fn chain() -> (Stage, NodeId, NodeId) {
    let mut stage = Stage::new();
    let mut parent = Node::new();
    parent.set_position(Vec2::new(50.0, 50.0));
    parent.set_scale(2.0);
    let parent = stage.add_to_root(parent);
    let child = stage
        .graph_mut()
        .spawn_child(parent, sprite_at(10.0, 0.0))
        .unwrap();
    (stage, parent, child)
}

#[test]
fn parent_edits_move_the_child_in_world_space() {
    let (mut stage, parent, child) = chain();
    assert!(approx_eq(
        get_world_position(stage.graph(), child),
        Vec2::new(70.0, 50.0)
    ));

    stage
        .node_mut(parent)
        .unwrap()
        .set_position(Vec2::new(0.0, 0.0));
    assert!(approx_eq(
        get_world_position(stage.graph(), child),
        Vec2::new(20.0, 0.0)
    ));

    let world = Vec2::new(-3.0, 7.5);
    let local = convert_to_node_space(stage.graph(), child, world);
    assert!(approx_eq(
        convert_to_world_space(stage.graph(), child, local),
        world
    ));
    assert!(approx_eq(stage.convert_to_node_space(child, world), local));
}

#[test]
fn reparenting_changes_the_world_box() {
    let (mut stage, _, child) = chain();
    let before = world_bounding_box(stage.graph(), child);
    assert_eq!(before.size(), Size::new(16.0, 16.0));

    let root = stage.root();
    reparent(stage.graph_mut(), child, root).unwrap();
    let after = world_bounding_box(stage.graph(), child);
    assert_eq!(after.size(), Size::new(8.0, 8.0));
    assert!(stage.graph().get(child).unwrap().is_running());
}

#[test]
fn standalone_sprites_draw_with_their_world_transform() {
    let (mut stage, _, child) = chain();
    let mut queue = CommandQueue::new();
    stage.render(&mut queue);
    assert_eq!(queue.len(), 1);
    let expected = node_to_world_transform(stage.graph(), child);
    assert!(queue.commands()[0].transform().approx_eq(&expected, EPSILON));
}

// ==================== Baking ====================

fn baked_scene() -> (SceneGraph, NodeId, NodeId, NodeId) {
    let mut graph = SceneGraph::new();
    let root = graph.spawn(Node::new());
    let mut container = Node::new();
    container.set_position(Vec2::new(100.0, 0.0));
    let container = graph.spawn_child(root, container).unwrap();
    let sprite = graph.spawn_child(container, sprite_at(10.0, 5.0)).unwrap();
    graph.bake(container);
    (graph, root, container, sprite)
}

fn sprite_transform(queue: &CommandQueue) -> AffineTransform {
    match &queue.commands()[0] {
        RenderCommand::Sprite { transform, .. } => *transform,
        other => panic!("expected a sprite command, got {other:?}"),
    }
}

#[test]
fn moving_a_baked_node_replays_its_cache() {
    let (mut graph, root, container, sprite) = baked_scene();
    let mut queue = CommandQueue::new();
    graph.visit(root, &mut queue);
    assert!(!graph.is_cache_dirty(container));
    assert!(sprite_transform(&queue)
        .approx_eq(&node_to_world_transform(&graph, sprite), EPSILON));

    graph.update_transform(container, |n| n.set_position(Vec2::new(200.0, 0.0)));
    assert!(!graph.is_cache_dirty(container));

    queue.clear();
    graph.visit(root, &mut queue);
    assert_eq!(queue.len(), 1);
    assert!(sprite_transform(&queue)
        .approx_eq(&node_to_world_transform(&graph, sprite), EPSILON));
}

#[test]
fn descendant_changes_dirty_the_cache() {
    let (mut graph, root, container, sprite) = baked_scene();
    let mut queue = CommandQueue::new();
    graph.visit(root, &mut queue);

    graph.node_mut(sprite).unwrap().set_position(Vec2::new(0.0, 0.0));
    assert!(graph.is_cache_dirty(container));
    queue.clear();
    graph.visit(root, &mut queue);
    assert!(!graph.is_cache_dirty(container));
    assert!(sprite_transform(&queue)
        .approx_eq(&node_to_world_transform(&graph, sprite), EPSILON));

    graph.set_visible(sprite, false);
    assert!(graph.is_cache_dirty(container));
    queue.clear();
    graph.visit(root, &mut queue);
    assert!(queue.is_empty());

    graph.unbake(container);
    graph.set_visible(sprite, true);
    queue.clear();
    graph.visit(root, &mut queue);
    assert_eq!(queue.len(), 1);
}
