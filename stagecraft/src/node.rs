//! Scene nodes: transform state, visual state and the per-kind payload.
//!
//! A [`Node`] on its own only knows about itself. Tree structure, cascading
//! color and opacity, and dirty propagation across parents live in
//! [`SceneGraph`](crate::world::SceneGraph), which edits nodes through
//! [`NodeMut`](crate::world::NodeMut).

use std::cell::Cell;

use crate::actions::ActionTarget;
use crate::math::{AffineTransform, Color3B, Rect, Size, Vec2};
use crate::render::{BitmapLabel, RenderCommand, Sprite, SpriteBatch, SpriteFrame, TileLayer};
use crate::world::NodeId;

/// Tag value for nodes that were never tagged.
pub const INVALID_TAG: i32 = -1;

/// What a node draws, if anything.
#[derive(Debug)]
pub enum NodeKind {
    Plain,
    Sprite(Box<Sprite>),
    Batch(Box<SpriteBatch>),
    TileLayer(Box<TileLayer>),
    Label(Box<BitmapLabel>),
}

/// Recorded output of a baked subtree.
#[derive(Debug, Default)]
pub(crate) struct RenderCache {
    pub(crate) commands: Vec<RenderCommand>,
    pub(crate) dirty: bool,
}

/// A scene node.
#[derive(Debug)]
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) local_z_order: i32,
    pub(crate) order_of_arrival: u32,
    pub(crate) running: bool,
    pub(crate) reorder_child_dirty: bool,
    pub(crate) cached_parent: Option<NodeId>,
    pub(crate) cache: Option<RenderCache>,
    pub(crate) displayed_opacity: u8,
    pub(crate) displayed_color: Color3B,
    pub(crate) cascade_opacity: bool,
    pub(crate) cascade_color: bool,
    pub(crate) kind: NodeKind,

    tag: i32,
    name: String,
    position: Vec2,
    anchor_point: Vec2,
    anchor_point_in_points: Vec2,
    content_size: Size,
    scale_x: f32,
    scale_y: f32,
    rotation_x: f32,
    rotation_y: f32,
    skew_x: f32,
    skew_y: f32,
    ignore_anchor_point_for_position: bool,
    visible: bool,
    vertex_z: f32,
    real_opacity: u8,
    real_color: Color3B,
    additional_transform: Option<AffineTransform>,

    transform: Cell<AffineTransform>,
    transform_dirty: Cell<bool>,
    inverse: Cell<AffineTransform>,
    inverse_dirty: Cell<bool>,
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

impl Node {
    /// A plain node with identity transform, fully opaque and white.
    pub fn new() -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            local_z_order: 0,
            order_of_arrival: 0,
            running: false,
            reorder_child_dirty: false,
            cached_parent: None,
            cache: None,
            displayed_opacity: 255,
            displayed_color: Color3B::WHITE,
            cascade_opacity: false,
            cascade_color: false,
            kind: NodeKind::Plain,
            tag: INVALID_TAG,
            name: String::new(),
            position: Vec2::ZERO,
            anchor_point: Vec2::ZERO,
            anchor_point_in_points: Vec2::ZERO,
            content_size: Size::ZERO,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation_x: 0.0,
            rotation_y: 0.0,
            skew_x: 0.0,
            skew_y: 0.0,
            ignore_anchor_point_for_position: false,
            visible: true,
            vertex_z: 0.0,
            real_opacity: 255,
            real_color: Color3B::WHITE,
            additional_transform: None,
            transform: Cell::new(AffineTransform::IDENTITY),
            transform_dirty: Cell::new(true),
            inverse: Cell::new(AffineTransform::IDENTITY),
            inverse_dirty: Cell::new(true),
        }
    }

    /// A sprite node, anchored at its center and sized to the texture rect.
    pub fn sprite(sprite: Sprite) -> Self {
        let size = sprite.texture_rect().size();
        let mut node = Self::new();
        node.kind = NodeKind::Sprite(Box::new(sprite));
        node.set_anchor_point(Vec2::new(0.5, 0.5));
        node.set_content_size(size);
        node
    }

    pub fn sprite_from_frame(frame: &SpriteFrame) -> Self {
        let mut node = Self::sprite(Sprite::from_frame(frame));
        node.set_content_size(frame.original_size);
        node
    }

    pub fn batch(batch: SpriteBatch) -> Self {
        let mut node = Self::new();
        node.kind = NodeKind::Batch(Box::new(batch));
        node
    }

    pub fn tile_layer(layer: TileLayer) -> Self {
        let mut node = Self::new();
        node.set_content_size(layer.layer_content_size());
        node.kind = NodeKind::TileLayer(Box::new(layer));
        node
    }

    pub fn label(label: BitmapLabel) -> Self {
        let mut node = Self::new();
        node.kind = NodeKind::Label(Box::new(label));
        node.set_anchor_point(Vec2::new(0.5, 0.5));
        node.cascade_color = true;
        node.cascade_opacity = true;
        node
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn sprite_data(&self) -> Option<&Sprite> {
        match &self.kind {
            NodeKind::Sprite(sprite) => Some(&**sprite),
            _ => None,
        }
    }

    pub(crate) fn sprite_data_mut(&mut self) -> Option<&mut Sprite> {
        match &mut self.kind {
            NodeKind::Sprite(sprite) => Some(&mut **sprite),
            _ => None,
        }
    }

    /// The quad batch behind a batch, tile layer or label node.
    pub fn batch_data(&self) -> Option<&SpriteBatch> {
        match &self.kind {
            NodeKind::Batch(batch) => Some(&**batch),
            NodeKind::TileLayer(layer) => Some(layer.batch()),
            NodeKind::Label(label) => Some(label.batch()),
            _ => None,
        }
    }

    pub(crate) fn batch_data_mut(&mut self) -> Option<&mut SpriteBatch> {
        match &mut self.kind {
            NodeKind::Batch(batch) => Some(&mut **batch),
            NodeKind::TileLayer(layer) => Some(layer.batch_mut()),
            NodeKind::Label(label) => Some(label.batch_mut()),
            _ => None,
        }
    }

    pub fn tile_layer_data(&self) -> Option<&TileLayer> {
        match &self.kind {
            NodeKind::TileLayer(layer) => Some(&**layer),
            _ => None,
        }
    }

    pub(crate) fn tile_layer_data_mut(&mut self) -> Option<&mut TileLayer> {
        match &mut self.kind {
            NodeKind::TileLayer(layer) => Some(&mut **layer),
            _ => None,
        }
    }

    pub fn label_data(&self) -> Option<&BitmapLabel> {
        match &self.kind {
            NodeKind::Label(label) => Some(&**label),
            _ => None,
        }
    }

    pub(crate) fn label_data_mut(&mut self) -> Option<&mut BitmapLabel> {
        match &mut self.kind {
            NodeKind::Label(label) => Some(&mut **label),
            _ => None,
        }
    }

    /// Whether the node draws through a batch it does not own.
    pub fn is_batched(&self) -> bool {
        self.sprite_data().is_some_and(|sprite| sprite.slot().is_some())
    }

    // --- Tree ---

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn local_z_order(&self) -> i32 {
        self.local_z_order
    }

    /// Set the z order before the node joins a parent. Use
    /// [`SceneGraph::reorder_child`](crate::world::SceneGraph::reorder_child)
    /// once it has one.
    pub fn set_local_z_order(&mut self, z: i32) {
        self.local_z_order = z;
    }

    pub fn order_of_arrival(&self) -> u32 {
        self.order_of_arrival
    }

    pub fn tag(&self) -> i32 {
        self.tag
    }

    pub fn set_tag(&mut self, tag: i32) {
        self.tag = tag;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_baked(&self) -> bool {
        self.cache.is_some()
    }

    // --- Geometry ---

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        if self.position != position {
            self.position = position;
            self.invalidate_transform();
        }
    }

    pub fn rotation_x(&self) -> f32 {
        self.rotation_x
    }

    pub fn rotation_y(&self) -> f32 {
        self.rotation_y
    }

    /// Rotation in degrees, clockwise. Sets both X and Y angles.
    pub fn set_rotation(&mut self, degrees: f32) {
        self.rotation_x = degrees;
        self.rotation_y = degrees;
        self.invalidate_transform();
    }

    pub fn set_rotation_x(&mut self, degrees: f32) {
        self.rotation_x = degrees;
        self.invalidate_transform();
    }

    pub fn set_rotation_y(&mut self, degrees: f32) {
        self.rotation_y = degrees;
        self.invalidate_transform();
    }

    pub fn scale_x(&self) -> f32 {
        self.scale_x
    }

    pub fn scale_y(&self) -> f32 {
        self.scale_y
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale_x = scale;
        self.scale_y = scale;
        self.invalidate_transform();
    }

    pub fn set_scale_x(&mut self, scale: f32) {
        self.scale_x = scale;
        self.invalidate_transform();
    }

    pub fn set_scale_y(&mut self, scale: f32) {
        self.scale_y = scale;
        self.invalidate_transform();
    }

    pub fn skew_x(&self) -> f32 {
        self.skew_x
    }

    pub fn skew_y(&self) -> f32 {
        self.skew_y
    }

    pub fn set_skew_x(&mut self, degrees: f32) {
        self.skew_x = degrees;
        self.invalidate_transform();
    }

    pub fn set_skew_y(&mut self, degrees: f32) {
        self.skew_y = degrees;
        self.invalidate_transform();
    }

    /// Anchor in normalized content coordinates.
    pub fn anchor_point(&self) -> Vec2 {
        self.anchor_point
    }

    pub fn anchor_point_in_points(&self) -> Vec2 {
        self.anchor_point_in_points
    }

    pub fn set_anchor_point(&mut self, anchor: Vec2) {
        if self.anchor_point != anchor {
            self.anchor_point = anchor;
            self.refresh_anchor_in_points();
            self.invalidate_transform();
        }
    }

    pub fn content_size(&self) -> Size {
        self.content_size
    }

    pub fn set_content_size(&mut self, size: Size) {
        if self.content_size != size {
            self.content_size = size;
            self.refresh_anchor_in_points();
            self.invalidate_transform();
        }
    }

    fn refresh_anchor_in_points(&mut self) {
        self.anchor_point_in_points = Vec2::new(
            self.content_size.width * self.anchor_point.x,
            self.content_size.height * self.anchor_point.y,
        );
    }

    pub fn is_ignore_anchor_point_for_position(&self) -> bool {
        self.ignore_anchor_point_for_position
    }

    /// When set, `position` names the bottom-left corner instead of the anchor.
    pub fn set_ignore_anchor_point_for_position(&mut self, ignore: bool) {
        if self.ignore_anchor_point_for_position != ignore {
            self.ignore_anchor_point_for_position = ignore;
            self.invalidate_transform();
        }
    }

    pub fn additional_transform(&self) -> Option<AffineTransform> {
        self.additional_transform
    }

    /// Extra transform appended after the node's own, or `None` to clear it.
    pub fn set_additional_transform(&mut self, transform: Option<AffineTransform>) {
        self.additional_transform = transform;
        self.invalidate_transform();
    }

    pub fn vertex_z(&self) -> f32 {
        self.vertex_z
    }

    pub fn set_vertex_z(&mut self, z: f32) {
        self.vertex_z = z;
        self.invalidate_transform();
    }

    pub fn is_transform_dirty(&self) -> bool {
        self.transform_dirty.get()
    }

    pub(crate) fn invalidate_transform(&mut self) {
        self.transform_dirty.set(true);
        self.inverse_dirty.set(true);
        if let Some(sprite) = self.sprite_data_mut() {
            sprite.quad_dirty = true;
        }
    }

    /// Node-to-parent transform, recomputed only when a geometric property
    /// changed since the last call.
    pub fn node_to_parent_transform(&self) -> AffineTransform {
        if self.transform_dirty.get() {
            self.transform.set(self.compute_local_transform());
            self.transform_dirty.set(false);
        }
        self.transform.get()
    }

    pub fn parent_to_node_transform(&self) -> AffineTransform {
        if self.inverse_dirty.get() {
            self.inverse.set(self.node_to_parent_transform().invert());
            self.inverse_dirty.set(false);
        }
        self.inverse.get()
    }

    fn compute_local_transform(&self) -> AffineTransform {
        let anchor = self.anchor_point_in_points;
        let mut x = self.position.x;
        let mut y = self.position.y;
        if self.ignore_anchor_point_for_position {
            x += anchor.x;
            y += anchor.y;
        }

        // Rotation is clockwise; X and Y angles differ only to fake skew.
        let (sin_x, cos_x) = (-self.rotation_x.to_radians()).sin_cos();
        let (sin_y, cos_y) = (-self.rotation_y.to_radians()).sin_cos();

        let mut t = AffineTransform::new(
            cos_y * self.scale_x,
            sin_y * self.scale_x,
            -sin_x * self.scale_y,
            cos_x * self.scale_y,
            x,
            y,
        );

        if self.skew_x != 0.0 || self.skew_y != 0.0 {
            let skew = AffineTransform::new(
                1.0,
                self.skew_y.to_radians().tan(),
                self.skew_x.to_radians().tan(),
                1.0,
                0.0,
                0.0,
            );
            t = skew.concat(&t);
        }

        if anchor != Vec2::ZERO {
            t.tx += t.a * -anchor.x + t.c * -anchor.y;
            t.ty += t.b * -anchor.x + t.d * -anchor.y;
        }

        match self.additional_transform {
            Some(additional) => t.concat(&additional),
            None => t,
        }
    }

    /// Content rect in the parent's coordinate space.
    pub fn bounding_box(&self) -> Rect {
        let rect = Rect::new(0.0, 0.0, self.content_size.width, self.content_size.height);
        self.node_to_parent_transform().apply_rect(rect)
    }

    // --- Visual state ---

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            self.visible = visible;
            if let Some(sprite) = self.sprite_data_mut() {
                sprite.quad_dirty = true;
            }
        }
    }

    pub fn opacity(&self) -> u8 {
        self.real_opacity
    }

    pub fn displayed_opacity(&self) -> u8 {
        self.displayed_opacity
    }

    /// Sets the node's own opacity. Without a graph the parent counts as
    /// fully opaque.
    pub fn set_opacity(&mut self, opacity: u8) {
        self.real_opacity = opacity;
        self.set_displayed(self.displayed_color, opacity);
    }

    pub fn color(&self) -> Color3B {
        self.real_color
    }

    pub fn displayed_color(&self) -> Color3B {
        self.displayed_color
    }

    pub fn set_color(&mut self, color: Color3B) {
        self.real_color = color;
        self.set_displayed(color, self.displayed_opacity);
    }

    pub fn is_cascade_opacity_enabled(&self) -> bool {
        self.cascade_opacity
    }

    pub fn is_cascade_color_enabled(&self) -> bool {
        self.cascade_color
    }

    /// Updates the displayed values and the sprite quad colors.
    pub(crate) fn set_displayed(&mut self, color: Color3B, opacity: u8) {
        self.displayed_color = color;
        self.displayed_opacity = opacity;
        if let Some(sprite) = self.sprite_data_mut() {
            sprite.apply_display_color(color, opacity);
        }
    }

    pub(crate) fn set_real_opacity(&mut self, opacity: u8) {
        self.real_opacity = opacity;
    }

    pub(crate) fn set_real_color(&mut self, color: Color3B) {
        self.real_color = color;
    }

    // --- Sprite conveniences ---

    pub fn is_flipped_x(&self) -> bool {
        self.sprite_data().is_some_and(Sprite::is_flipped_x)
    }

    pub fn is_flipped_y(&self) -> bool {
        self.sprite_data().is_some_and(Sprite::is_flipped_y)
    }

    pub(crate) fn set_sprite_frame(&mut self, frame: &SpriteFrame) -> bool {
        let Some(sprite) = self.sprite_data_mut() else {
            return false;
        };
        let size = sprite.set_frame(frame);
        self.set_content_size(size);
        self.invalidate_transform();
        true
    }

    pub(crate) fn set_texture_rect(&mut self, rect: Rect) -> bool {
        let Some(sprite) = self.sprite_data_mut() else {
            return false;
        };
        sprite.set_texture_rect(rect, rect.size());
        self.set_content_size(rect.size());
        self.invalidate_transform();
        true
    }
}

impl ActionTarget for Node {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn set_position(&mut self, position: Vec2) {
        Node::set_position(self, position);
    }

    fn rotation_x(&self) -> f32 {
        self.rotation_x
    }

    fn rotation_y(&self) -> f32 {
        self.rotation_y
    }

    fn set_rotation_x(&mut self, degrees: f32) {
        Node::set_rotation_x(self, degrees);
    }

    fn set_rotation_y(&mut self, degrees: f32) {
        Node::set_rotation_y(self, degrees);
    }

    fn scale_x(&self) -> f32 {
        self.scale_x
    }

    fn scale_y(&self) -> f32 {
        self.scale_y
    }

    fn set_scale_x(&mut self, scale: f32) {
        Node::set_scale_x(self, scale);
    }

    fn set_scale_y(&mut self, scale: f32) {
        Node::set_scale_y(self, scale);
    }

    fn skew_x(&self) -> f32 {
        self.skew_x
    }

    fn skew_y(&self) -> f32 {
        self.skew_y
    }

    fn set_skew_x(&mut self, degrees: f32) {
        Node::set_skew_x(self, degrees);
    }

    fn set_skew_y(&mut self, degrees: f32) {
        Node::set_skew_y(self, degrees);
    }

    fn opacity(&self) -> u8 {
        self.real_opacity
    }

    fn set_opacity(&mut self, opacity: u8) {
        Node::set_opacity(self, opacity);
    }

    fn color(&self) -> Color3B {
        self.real_color
    }

    fn set_color(&mut self, color: Color3B) {
        Node::set_color(self, color);
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_visible(&mut self, visible: bool) {
        Node::set_visible(self, visible);
    }

    fn set_flipped_x(&mut self, flipped: bool) {
        let size = self.content_size;
        match self.sprite_data_mut() {
            Some(sprite) => sprite.set_flipped_x(flipped, size),
            None => log::warn!("flip requested on a node that is not a sprite"),
        }
    }

    fn set_flipped_y(&mut self, flipped: bool) {
        let size = self.content_size;
        match self.sprite_data_mut() {
            Some(sprite) => sprite.set_flipped_y(flipped, size),
            None => log::warn!("flip requested on a node that is not a sprite"),
        }
    }

    fn display_frame(&self) -> Option<SpriteFrame> {
        self.sprite_data()
            .map(|sprite| sprite.display_frame(self.content_size))
    }

    fn set_display_frame(&mut self, frame: &SpriteFrame) {
        if !self.set_sprite_frame(frame) {
            log::warn!("sprite frame requested on a node that is not a sprite");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn identity_by_default() {
        let node = Node::new();
        assert!(node
            .node_to_parent_transform()
            .approx_eq(&AffineTransform::IDENTITY, EPSILON));
    }

    #[test]
    fn transform_is_cached_until_a_setter_runs() {
        let mut node = Node::new();
        node.set_position(Vec2::new(10.0, 20.0));
        assert!(node.is_transform_dirty());
        let t = node.node_to_parent_transform();
        assert!(!node.is_transform_dirty());
        assert!(approx_eq(t.tx, 10.0));
        assert!(approx_eq(t.ty, 20.0));
        node.set_scale(2.0);
        assert!(node.is_transform_dirty());
    }

    #[test]
    fn rotation_is_clockwise() {
        let mut node = Node::new();
        node.set_rotation(90.0);
        let p = node.node_to_parent_transform().apply_point(Vec2::new(1.0, 0.0));
        assert!(approx_eq(p.x, 0.0));
        assert!(approx_eq(p.y, -1.0));
    }

    #[test]
    fn anchor_offsets_the_content() {
        let mut node = Node::new();
        node.set_content_size(Size::new(100.0, 50.0));
        node.set_anchor_point(Vec2::new(0.5, 0.5));
        node.set_position(Vec2::new(200.0, 100.0));
        let bbox = node.bounding_box();
        assert!(approx_eq(bbox.x, 150.0));
        assert!(approx_eq(bbox.y, 75.0));
        assert!(approx_eq(bbox.width, 100.0));
    }

    #[test]
    fn anchor_pivots_rotation_and_scale() {
        let mut node = Node::new();
        node.set_content_size(Size::new(10.0, 10.0));
        node.set_anchor_point(Vec2::new(0.5, 0.5));
        node.set_scale(2.0);
        node.set_rotation(180.0);
        let center = node
            .node_to_parent_transform()
            .apply_point(Vec2::new(5.0, 5.0));
        assert!(approx_eq(center.x, 0.0));
        assert!(approx_eq(center.y, 0.0));
        let corner = node
            .node_to_parent_transform()
            .apply_point(Vec2::new(0.0, 0.0));
        assert!(approx_eq(corner.x, 10.0));
        assert!(approx_eq(corner.y, 10.0));
    }

    #[test]
    fn ignore_anchor_positions_the_corner() {
        let mut node = Node::new();
        node.set_content_size(Size::new(10.0, 10.0));
        node.set_anchor_point(Vec2::new(0.5, 0.5));
        node.set_ignore_anchor_point_for_position(true);
        let origin = node.node_to_parent_transform().apply_point(Vec2::ZERO);
        assert!(approx_eq(origin.x, 0.0));
        assert!(approx_eq(origin.y, 0.0));
    }

    #[test]
    fn skew_shears_along_x() {
        let mut node = Node::new();
        node.set_skew_x(45.0);
        let p = node.node_to_parent_transform().apply_point(Vec2::new(0.0, 1.0));
        assert!(approx_eq(p.x, 1.0));
        assert!(approx_eq(p.y, 1.0));
    }

    #[test]
    fn additional_transform_applies_last() {
        let mut node = Node::new();
        node.set_scale(2.0);
        node.set_additional_transform(Some(AffineTransform::translation(5.0, 0.0)));
        let p = node.node_to_parent_transform().apply_point(Vec2::new(1.0, 0.0));
        assert!(approx_eq(p.x, 7.0));
    }

    #[test]
    fn inverse_round_trips() {
        let mut node = Node::new();
        node.set_position(Vec2::new(3.0, -4.0));
        node.set_rotation(30.0);
        node.set_scale_x(2.0);
        let p = Vec2::new(7.0, 1.0);
        let back = node
            .parent_to_node_transform()
            .apply_point(node.node_to_parent_transform().apply_point(p));
        assert!(approx_eq(back.x, p.x));
        assert!(approx_eq(back.y, p.y));
    }

    #[test]
    fn standalone_opacity_is_displayed_directly() {
        let mut node = Node::new();
        node.set_opacity(128);
        assert_eq!(node.displayed_opacity(), 128);
        node.set_color(Color3B::new(1, 2, 3));
        assert_eq!(node.displayed_color(), Color3B::new(1, 2, 3));
    }
}
