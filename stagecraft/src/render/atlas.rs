use bytemuck::{Pod, Zeroable};

/// One corner of a textured quad, laid out for direct upload.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 3],
    pub color: [u8; 4],
    pub uv: [f32; 2],
}

/// Four corners of a sprite: top-left, bottom-left, top-right, bottom-right.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Quad {
    pub tl: QuadVertex,
    pub bl: QuadVertex,
    pub tr: QuadVertex,
    pub br: QuadVertex,
}

impl Quad {
    pub fn set_color(&mut self, color: [u8; 4]) {
        self.tl.color = color;
        self.bl.color = color;
        self.tr.color = color;
        self.br.color = color;
    }

    /// Collapses every corner to the origin so the quad draws nothing.
    pub fn collapse(&mut self) {
        for vertex in [&mut self.tl, &mut self.bl, &mut self.tr, &mut self.br] {
            vertex.position = [0.0; 3];
        }
    }
}

/// Capacity after one growth step: a third more than `capacity + 1`, rounded up.
pub fn grown_capacity(capacity: usize) -> usize {
    ((capacity + 1) * 4).div_ceil(3)
}

/// Resizable quad buffer shared by every sprite drawn through one batch.
///
/// `quads().len()` is the number of live quads; `capacity()` is the number
/// reserved for the backend buffer.
#[derive(Clone, Debug, Default)]
pub struct TextureAtlas {
    quads: Vec<Quad>,
    capacity: usize,
}

impl TextureAtlas {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            quads: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn total_quads(&self) -> usize {
        self.quads.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn quads(&self) -> &[Quad] {
        &self.quads
    }

    pub fn quad(&self, index: usize) -> Option<&Quad> {
        self.quads.get(index)
    }

    /// Raw bytes of the live quads, ready for a vertex buffer upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.quads)
    }

    fn reserve(&mut self, additional: usize) {
        while self.quads.len() + additional > self.capacity {
            let capacity = grown_capacity(self.capacity);
            log::debug!("growing texture atlas from {} to {capacity} quads", self.capacity);
            self.resize_capacity(capacity);
        }
    }

    /// Inserts at `index`, shifting later quads up by one.
    pub fn insert_quad(&mut self, quad: Quad, index: usize) {
        let index = self.clamp_insert_index(index);
        self.reserve(1);
        self.quads.insert(index, quad);
    }

    pub fn insert_quads(&mut self, quads: &[Quad], index: usize) {
        let index = self.clamp_insert_index(index);
        self.reserve(quads.len());
        self.quads.splice(index..index, quads.iter().copied());
    }

    fn clamp_insert_index(&self, index: usize) -> usize {
        if index > self.quads.len() {
            log::warn!(
                "atlas insert index {index} past the {} live quads; appending",
                self.quads.len()
            );
            self.quads.len()
        } else {
            index
        }
    }

    /// Overwrites the quad at `index`, extending the live range if needed.
    pub fn update_quad(&mut self, quad: Quad, index: usize) {
        if index >= self.capacity {
            log::warn!("atlas index {index} outside capacity {}", self.capacity);
            return;
        }
        if index >= self.quads.len() {
            self.quads.resize(index + 1, Quad::default());
        }
        self.quads[index] = quad;
    }

    pub fn remove_quad_at(&mut self, index: usize) {
        if index < self.quads.len() {
            self.quads.remove(index);
        } else {
            log::warn!("no quad at atlas index {index}");
        }
    }

    pub fn remove_quads_at(&mut self, index: usize, amount: usize) {
        let end = (index + amount).min(self.quads.len());
        if index < end {
            self.quads.drain(index..end);
        }
    }

    pub fn remove_all_quads(&mut self) {
        self.quads.clear();
    }

    /// Sets the capacity, truncating live quads that no longer fit.
    pub fn resize_capacity(&mut self, capacity: usize) {
        if capacity == self.capacity {
            return;
        }
        self.quads.truncate(capacity);
        if capacity > self.quads.capacity() {
            self.quads.reserve_exact(capacity - self.quads.len());
        }
        self.capacity = capacity;
    }

    /// Extends the live range by `amount` blank quads.
    pub fn increase_total_quads_with(&mut self, amount: usize) {
        self.reserve(amount);
        let total = self.quads.len() + amount;
        self.quads.resize(total, Quad::default());
    }

    pub(crate) fn swap(&mut self, a: usize, b: usize) {
        if a < self.quads.len() && b < self.quads.len() {
            self.quads.swap(a, b);
        }
    }

    pub(crate) fn quad_mut(&mut self, index: usize) -> Option<&mut Quad> {
        self.quads.get_mut(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marked(x: f32) -> Quad {
        let mut quad = Quad::default();
        quad.tl.position = [x, 0.0, 0.0];
        quad
    }

    fn markers(atlas: &TextureAtlas) -> Vec<f32> {
        atlas.quads().iter().map(|q| q.tl.position[0]).collect()
    }

    #[test]
    fn growth_is_a_third_rounded_up() {
        assert_eq!(grown_capacity(29), 40);
        assert_eq!(grown_capacity(0), 2);
        assert_eq!(grown_capacity(2), 4);
    }

    #[test]
    fn full_atlas_grows_and_keeps_quads() {
        let mut atlas = TextureAtlas::with_capacity(2);
        atlas.insert_quad(marked(1.0), 0);
        atlas.insert_quad(marked(2.0), 1);
        atlas.insert_quad(marked(0.5), 0);
        assert_eq!(atlas.capacity(), 4);
        assert_eq!(markers(&atlas), vec![0.5, 1.0, 2.0]);
    }

    #[test]
    fn remove_shifts_later_quads_down() {
        let mut atlas = TextureAtlas::with_capacity(4);
        atlas.insert_quads(&[marked(1.0), marked(2.0), marked(3.0)], 0);
        atlas.remove_quad_at(1);
        assert_eq!(markers(&atlas), vec![1.0, 3.0]);
        atlas.remove_quads_at(0, 5);
        assert_eq!(atlas.total_quads(), 0);
    }

    #[test]
    fn update_extends_the_live_range() {
        let mut atlas = TextureAtlas::with_capacity(4);
        atlas.update_quad(marked(7.0), 2);
        assert_eq!(markers(&atlas), vec![0.0, 0.0, 7.0]);
        atlas.update_quad(marked(9.0), 4);
        assert_eq!(atlas.total_quads(), 3);
    }

    #[test]
    fn bytes_cover_every_live_quad() {
        let mut atlas = TextureAtlas::with_capacity(1);
        atlas.increase_total_quads_with(3);
        assert_eq!(atlas.as_bytes().len(), 3 * std::mem::size_of::<Quad>());
        assert_eq!(std::mem::size_of::<Quad>(), 96);
    }

    #[test]
    fn shrinking_truncates() {
        let mut atlas = TextureAtlas::with_capacity(4);
        atlas.increase_total_quads_with(4);
        atlas.resize_capacity(2);
        assert_eq!(atlas.total_quads(), 2);
        assert_eq!(atlas.capacity(), 2);
    }
}
