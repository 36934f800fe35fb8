//! Hierarchy queries and coordinate-space conversion.
//!
//! Provides utilities for walking parent links and computing world transforms.
//! Transforms are recomputed from each node's cached local transform on every
//! call, so the results always reflect the current tree.

use crate::error::{SceneError, SceneResult};
use crate::math::{AffineTransform, Rect, Vec2};
use crate::world::{NodeId, SceneGraph};

/// Get the parent of a node, if it has one.
pub fn get_parent(graph: &SceneGraph, node: NodeId) -> Option<NodeId> {
    graph.get(node).and_then(|n| n.parent())
}

/// Get all children of a node in their current order.
pub fn get_children(graph: &SceneGraph, node: NodeId) -> Vec<NodeId> {
    graph.children_of(node)
}

/// Get the root of the tree containing `node` (the ancestor with no parent).
pub fn get_root(graph: &SceneGraph, node: NodeId) -> NodeId {
    let mut current = node;
    while let Some(parent) = get_parent(graph, current) {
        current = parent;
    }
    current
}

/// Ancestors of `node`, nearest first.
pub fn ancestors(graph: &SceneGraph, node: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut current = node;
    while let Some(parent) = get_parent(graph, current) {
        out.push(parent);
        current = parent;
    }
    out
}

/// Node-to-world transform: the node's local transform followed by every
/// ancestor's, up to the root.
pub fn node_to_world_transform(graph: &SceneGraph, node: NodeId) -> AffineTransform {
    let mut transform = AffineTransform::IDENTITY;
    let mut current = Some(node);
    while let Some(id) = current {
        let Some(n) = graph.get(id) else {
            break;
        };
        transform = transform.concat(&n.node_to_parent_transform());
        current = n.parent();
    }
    transform
}

pub fn world_to_node_transform(graph: &SceneGraph, node: NodeId) -> AffineTransform {
    node_to_world_transform(graph, node).invert()
}

/// Converts a world point into `node`'s local space.
pub fn convert_to_node_space(graph: &SceneGraph, node: NodeId, world_point: Vec2) -> Vec2 {
    world_to_node_transform(graph, node).apply_point(world_point)
}

/// Converts a point in `node`'s local space into world space.
pub fn convert_to_world_space(graph: &SceneGraph, node: NodeId, node_point: Vec2) -> Vec2 {
    node_to_world_transform(graph, node).apply_point(node_point)
}

/// Like [`convert_to_node_space`], relative to the node's anchor point.
pub fn convert_to_node_space_ar(graph: &SceneGraph, node: NodeId, world_point: Vec2) -> Vec2 {
    let anchor = graph
        .get(node)
        .map_or(Vec2::ZERO, |n| n.anchor_point_in_points());
    convert_to_node_space(graph, node, world_point) - anchor
}

/// Like [`convert_to_world_space`], relative to the node's anchor point.
pub fn convert_to_world_space_ar(graph: &SceneGraph, node: NodeId, node_point: Vec2) -> Vec2 {
    let anchor = graph
        .get(node)
        .map_or(Vec2::ZERO, |n| n.anchor_point_in_points());
    convert_to_world_space(graph, node, node_point + anchor)
}

/// Get the world position of a node's origin in its parent, i.e. where its
/// `position` lands in world space.
pub fn get_world_position(graph: &SceneGraph, node: NodeId) -> Vec2 {
    let Some(n) = graph.get(node) else {
        return Vec2::ZERO;
    };
    match n.parent() {
        Some(parent) => convert_to_world_space(graph, parent, n.position()),
        None => n.position(),
    }
}

/// Content rect of `node` in world space.
pub fn world_bounding_box(graph: &SceneGraph, node: NodeId) -> Rect {
    let Some(n) = graph.get(node) else {
        return Rect::ZERO;
    };
    let size = n.content_size();
    node_to_world_transform(graph, node).apply_rect(Rect::new(0.0, 0.0, size.width, size.height))
}

/// Move `node` under `new_parent` without running cleanup, keeping its z
/// order and tag. Actions and updates survive the move.
pub fn reparent(graph: &mut SceneGraph, node: NodeId, new_parent: NodeId) -> SceneResult<()> {
    if !graph.is_alive(new_parent) {
        return Err(SceneError::MissingNode(new_parent));
    }
    if node == new_parent || graph.is_ancestor(node, new_parent) {
        return Err(SceneError::Cycle {
            parent: new_parent,
            child: node,
        });
    }
    graph.remove_from_parent(node, false);
    graph.add_child(new_parent, node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    const EPSILON: f32 = 1e-4;

    fn approx_eq(a: Vec2, b: Vec2) -> bool {
        (a.x - b.x).abs() < EPSILON && (a.y - b.y).abs() < EPSILON
    }

    fn tree() -> (SceneGraph, NodeId, NodeId, NodeId) {
        let mut graph = SceneGraph::new();
        let mut root = Node::new();
        root.set_position(Vec2::new(100.0, 0.0));
        let root = graph.spawn(root);

        let mut parent = Node::new();
        parent.set_position(Vec2::new(10.0, 10.0));
        parent.set_scale(2.0);
        let parent = graph.spawn_child(root, parent).unwrap();

        let mut child = Node::new();
        child.set_position(Vec2::new(5.0, 0.0));
        child.set_rotation(90.0);
        let child = graph.spawn_child(parent, child).unwrap();
        (graph, root, parent, child)
    }

    #[test]
    fn walks_parent_links() {
        let (graph, root, parent, child) = tree();
        assert_eq!(get_parent(&graph, child), Some(parent));
        assert_eq!(get_root(&graph, child), root);
        assert_eq!(ancestors(&graph, child), vec![parent, root]);
        assert_eq!(get_children(&graph, root), vec![parent]);
    }

    #[test]
    fn world_transform_chains_ancestors() {
        let (graph, _, _, child) = tree();
        // child origin: (5, 0) scaled by 2 -> (10, 0), + (10, 10) + (100, 0)
        assert!(approx_eq(get_world_position(&graph, child), Vec2::new(120.0, 10.0)));
        // local +x rotated 90 degrees clockwise is -y, then scaled by 2
        let p = convert_to_world_space(&graph, child, Vec2::new(1.0, 0.0));
        assert!(approx_eq(p, Vec2::new(120.0, 8.0)));
    }

    #[test]
    fn node_space_round_trips() {
        let (graph, _, _, child) = tree();
        let world = Vec2::new(37.0, -12.5);
        let local = convert_to_node_space(&graph, child, world);
        assert!(approx_eq(convert_to_world_space(&graph, child, local), world));
    }

    #[test]
    fn anchor_relative_conversion() {
        let mut graph = SceneGraph::new();
        let mut node = Node::new();
        node.set_content_size(crate::math::Size::new(20.0, 10.0));
        node.set_anchor_point(Vec2::new(0.5, 0.5));
        node.set_position(Vec2::new(50.0, 50.0));
        let id = graph.spawn(node);
        assert!(approx_eq(
            convert_to_node_space_ar(&graph, id, Vec2::new(50.0, 50.0)),
            Vec2::ZERO
        ));
        assert!(approx_eq(
            convert_to_world_space_ar(&graph, id, Vec2::ZERO),
            Vec2::new(50.0, 50.0)
        ));
        let bounds = world_bounding_box(&graph, id);
        assert!(approx_eq(bounds.origin(), Vec2::new(40.0, 45.0)));
    }

    #[test]
    fn reparent_moves_without_cycles() {
        let (mut graph, root, parent, child) = tree();
        reparent(&mut graph, child, root).unwrap();
        assert_eq!(get_parent(&graph, child), Some(root));
        assert_eq!(
            reparent(&mut graph, root, parent),
            Err(SceneError::Cycle {
                parent,
                child: root
            })
        );
    }
}
