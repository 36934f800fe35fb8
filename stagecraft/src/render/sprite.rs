use serde::{Deserialize, Serialize};

use super::atlas::Quad;
use super::texture::Texture;
use crate::math::{AffineTransform, Color3B, Rect, Size, Vec2};
use crate::world::NodeId;

/// A region of a texture, with trimming information.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpriteFrame {
    pub texture: Texture,
    /// Region in texture pixels, origin at the top-left of the image.
    pub rect: Rect,
    /// Offset of the trimmed rect from the center of the original image.
    pub offset: Vec2,
    /// Size before trimming.
    pub original_size: Size,
}

impl SpriteFrame {
    pub fn new(texture: Texture, rect: Rect) -> Self {
        Self {
            texture,
            rect,
            offset: Vec2::ZERO,
            original_size: rect.size(),
        }
    }

    /// A frame covering the whole texture.
    pub fn from_texture(texture: Texture) -> Self {
        Self::new(
            texture,
            Rect::new(0.0, 0.0, texture.size.width, texture.size.height),
        )
    }

    #[must_use]
    pub fn with_offset(mut self, offset: Vec2, original_size: Size) -> Self {
        self.offset = offset;
        self.original_size = original_size;
        self
    }
}

/// Where a sprite lives inside a batch's quad buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchSlot {
    pub batch: NodeId,
    pub atlas_index: usize,
}

/// Textured quad state carried by sprite nodes.
///
/// A sprite either draws itself (`slot` is `None`) with a quad in local
/// coordinates, or renders through a batch, in which case its quad is in
/// batch coordinates and mirrored into the batch's atlas at `atlas_index`.
#[derive(Clone, Debug)]
pub struct Sprite {
    pub(crate) texture: Texture,
    pub(crate) rect: Rect,
    pub(crate) unflipped_offset: Vec2,
    pub(crate) offset_position: Vec2,
    pub(crate) flipped_x: bool,
    pub(crate) flipped_y: bool,
    pub(crate) quad: Quad,
    pub(crate) slot: Option<BatchSlot>,
    pub(crate) quad_dirty: bool,
    pub(crate) transform_to_batch: AffineTransform,
    pub(crate) should_be_hidden: bool,
}

impl Sprite {
    pub fn new(texture: Texture, rect: Rect) -> Self {
        let mut sprite = Self {
            texture,
            rect,
            unflipped_offset: Vec2::ZERO,
            offset_position: Vec2::ZERO,
            flipped_x: false,
            flipped_y: false,
            quad: Quad::default(),
            slot: None,
            quad_dirty: true,
            transform_to_batch: AffineTransform::IDENTITY,
            should_be_hidden: false,
        };
        sprite.set_color([255; 4]);
        sprite.refresh_texture_coords();
        sprite.refresh_local_vertices(rect.size());
        sprite
    }

    pub fn from_frame(frame: &SpriteFrame) -> Self {
        let mut sprite = Self::new(frame.texture, frame.rect);
        sprite.unflipped_offset = frame.offset;
        sprite.refresh_local_vertices(frame.original_size);
        sprite
    }

    pub fn texture(&self) -> Texture {
        self.texture
    }

    pub fn texture_rect(&self) -> Rect {
        self.rect
    }

    pub fn offset_position(&self) -> Vec2 {
        self.offset_position
    }

    pub fn is_flipped_x(&self) -> bool {
        self.flipped_x
    }

    pub fn is_flipped_y(&self) -> bool {
        self.flipped_y
    }

    pub fn quad(&self) -> &Quad {
        &self.quad
    }

    pub fn slot(&self) -> Option<BatchSlot> {
        self.slot
    }

    pub fn atlas_index(&self) -> Option<usize> {
        self.slot.map(|slot| slot.atlas_index)
    }

    pub fn batch(&self) -> Option<NodeId> {
        self.slot.map(|slot| slot.batch)
    }

    /// The frame currently displayed.
    pub fn display_frame(&self, content_size: Size) -> SpriteFrame {
        SpriteFrame::new(self.texture, self.rect).with_offset(self.unflipped_offset, content_size)
    }

    pub(crate) fn set_atlas_index(&mut self, index: usize) {
        if let Some(slot) = self.slot.as_mut() {
            slot.atlas_index = index;
        }
    }

    /// Replaces texture and rect. Returns the content size the node should take.
    pub(crate) fn set_frame(&mut self, frame: &SpriteFrame) -> Size {
        self.texture = frame.texture;
        self.rect = frame.rect;
        self.unflipped_offset = frame.offset;
        self.refresh_texture_coords();
        self.refresh_local_vertices(frame.original_size);
        frame.original_size
    }

    pub(crate) fn set_texture_rect(&mut self, rect: Rect, untrimmed: Size) {
        self.rect = rect;
        self.refresh_texture_coords();
        self.refresh_local_vertices(untrimmed);
    }

    pub(crate) fn set_flipped_x(&mut self, flipped: bool, content_size: Size) {
        if self.flipped_x != flipped {
            self.flipped_x = flipped;
            self.refresh_texture_coords();
            self.refresh_local_vertices(content_size);
        }
    }

    pub(crate) fn set_flipped_y(&mut self, flipped: bool, content_size: Size) {
        if self.flipped_y != flipped {
            self.flipped_y = flipped;
            self.refresh_texture_coords();
            self.refresh_local_vertices(content_size);
        }
    }

    pub(crate) fn set_color(&mut self, color: [u8; 4]) {
        self.quad.set_color(color);
        self.quad_dirty = true;
    }

    pub(crate) fn apply_display_color(&mut self, color: Color3B, opacity: u8) {
        self.set_color([color.r, color.g, color.b, opacity]);
    }

    fn refresh_texture_coords(&mut self) {
        let width = self.texture.size.width.max(1.0);
        let height = self.texture.size.height.max(1.0);
        let mut left = self.rect.x / width;
        let mut right = (self.rect.x + self.rect.width) / width;
        let mut top = self.rect.y / height;
        let mut bottom = (self.rect.y + self.rect.height) / height;
        if self.flipped_x {
            std::mem::swap(&mut left, &mut right);
        }
        if self.flipped_y {
            std::mem::swap(&mut top, &mut bottom);
        }
        self.quad.bl.uv = [left, bottom];
        self.quad.br.uv = [right, bottom];
        self.quad.tl.uv = [left, top];
        self.quad.tr.uv = [right, top];
        self.quad_dirty = true;
    }

    /// Recomputes the trimmed-rect offset and, for unbatched sprites, the
    /// local vertex positions.
    fn refresh_local_vertices(&mut self, content_size: Size) {
        let mut relative = self.unflipped_offset;
        if self.flipped_x {
            relative.x = -relative.x;
        }
        if self.flipped_y {
            relative.y = -relative.y;
        }
        self.offset_position = Vec2::new(
            relative.x + (content_size.width - self.rect.width) / 2.0,
            relative.y + (content_size.height - self.rect.height) / 2.0,
        );

        if self.slot.is_none() {
            let x1 = self.offset_position.x;
            let y1 = self.offset_position.y;
            let x2 = x1 + self.rect.width;
            let y2 = y1 + self.rect.height;
            self.quad.bl.position = [x1, y1, 0.0];
            self.quad.br.position = [x2, y1, 0.0];
            self.quad.tl.position = [x1, y2, 0.0];
            self.quad.tr.position = [x2, y2, 0.0];
        }
        self.quad_dirty = true;
    }

    /// Writes batch-space vertices from `transform_to_batch`.
    pub(crate) fn write_batch_vertices(&mut self, vertex_z: f32) {
        let t = self.transform_to_batch;
        let x1 = self.offset_position.x;
        let y1 = self.offset_position.y;
        let x2 = x1 + self.rect.width;
        let y2 = y1 + self.rect.height;
        let corner = |x: f32, y: f32| {
            let p = t.apply_point(Vec2::new(x, y));
            [p.x, p.y, vertex_z]
        };
        self.quad.bl.position = corner(x1, y1);
        self.quad.br.position = corner(x2, y1);
        self.quad.tr.position = corner(x2, y2);
        self.quad.tl.position = corner(x1, y2);
    }

    pub(crate) fn attach(&mut self, slot: BatchSlot) {
        self.slot = Some(slot);
        self.quad_dirty = true;
    }

    /// Leaves the batch and goes back to local-space vertices.
    pub(crate) fn detach(&mut self, content_size: Size) {
        self.slot = None;
        self.transform_to_batch = AffineTransform::IDENTITY;
        self.should_be_hidden = false;
        self.refresh_local_vertices(content_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::TextureHandle;

    fn texture() -> Texture {
        Texture::new(TextureHandle::new(1), Size::new(100.0, 50.0))
    }

    #[test]
    fn texture_coords_follow_the_rect() {
        let sprite = Sprite::new(texture(), Rect::new(10.0, 0.0, 20.0, 25.0));
        assert_eq!(sprite.quad().tl.uv, [0.1, 0.0]);
        assert_eq!(sprite.quad().br.uv, [0.3, 0.5]);
    }

    #[test]
    fn flipping_swaps_texture_coords() {
        let mut sprite = Sprite::new(texture(), Rect::new(0.0, 0.0, 50.0, 50.0));
        sprite.set_flipped_x(true, Size::new(50.0, 50.0));
        assert_eq!(sprite.quad().tl.uv, [0.5, 0.0]);
        assert_eq!(sprite.quad().tr.uv, [0.0, 0.0]);
    }

    #[test]
    fn local_vertices_span_the_rect() {
        let sprite = Sprite::new(texture(), Rect::new(0.0, 0.0, 20.0, 10.0));
        assert_eq!(sprite.quad().bl.position, [0.0, 0.0, 0.0]);
        assert_eq!(sprite.quad().tr.position, [20.0, 10.0, 0.0]);
    }

    #[test]
    fn trimmed_frames_are_centered_in_the_original_size() {
        let frame = SpriteFrame::new(texture(), Rect::new(0.0, 0.0, 10.0, 10.0))
            .with_offset(Vec2::new(2.0, 0.0), Size::new(20.0, 20.0));
        let sprite = Sprite::from_frame(&frame);
        assert_eq!(sprite.offset_position(), Vec2::new(7.0, 5.0));
    }
}
