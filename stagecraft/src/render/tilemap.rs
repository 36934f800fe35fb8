//! Tile layers: a sprite batch addressed by grid coordinate.
//!
//! Every non-empty cell owns one quad in the layer's atlas. Quads are kept in
//! grid order (`z = x + y * width`); `atlas_index_array` maps atlas slots back
//! to cells. A cell only becomes a real sprite node when [`SceneGraph::tile_at`]
//! asks for it, and that sprite takes over the cell's existing slot.

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::atlas::Quad;
use super::batch::SpriteBatch;
use super::sprite::{BatchSlot, Sprite};
use super::texture::Texture;
use crate::actions::ActionTarget;
use crate::error::{SceneError, SceneResult};
use crate::math::{Rect, Size, Vec2};
use crate::node::Node;
use crate::world::{NodeId, SceneGraph};

pub const TILE_FLIPPED_HORIZONTAL: u32 = 0x8000_0000;
pub const TILE_FLIPPED_VERTICAL: u32 = 0x4000_0000;
pub const TILE_FLIPPED_DIAGONAL: u32 = 0x2000_0000;
pub const TILE_FLIPPED_ALL: u32 =
    TILE_FLIPPED_HORIZONTAL | TILE_FLIPPED_VERTICAL | TILE_FLIPPED_DIAGONAL;
/// Clears the flip bits from a gid.
pub const TILE_FLIPPED_MASK: u32 = !TILE_FLIPPED_ALL;

/// Flip bits carried in the top of a gid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TileFlags {
    pub horizontal: bool,
    pub vertical: bool,
    pub diagonal: bool,
}

impl TileFlags {
    pub fn from_gid(gid: u32) -> Self {
        Self {
            horizontal: gid & TILE_FLIPPED_HORIZONTAL != 0,
            vertical: gid & TILE_FLIPPED_VERTICAL != 0,
            diagonal: gid & TILE_FLIPPED_DIAGONAL != 0,
        }
    }

    pub fn bits(self) -> u32 {
        let mut bits = 0;
        if self.horizontal {
            bits |= TILE_FLIPPED_HORIZONTAL;
        }
        if self.vertical {
            bits |= TILE_FLIPPED_VERTICAL;
        }
        if self.diagonal {
            bits |= TILE_FLIPPED_DIAGONAL;
        }
        bits
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Orthogonal,
    Isometric,
    Hexagonal,
}

/// A texture cut into a grid of equally sized tiles.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tileset {
    pub texture: Texture,
    /// Gid of the tileset's first tile.
    pub first_gid: u32,
    pub tile_size: Size,
    #[serde(default)]
    pub spacing: f32,
    #[serde(default)]
    pub margin: f32,
}

impl Tileset {
    fn columns(&self) -> u32 {
        let stride = self.tile_size.width + self.spacing;
        if stride <= 0.0 {
            return 1;
        }
        let usable = self.texture.size.width - self.margin * 2.0 + self.spacing;
        ((usable / stride) as u32).max(1)
    }

    /// Texture rect of `gid`; flip bits are ignored.
    pub fn rect_for_gid(&self, gid: u32) -> Rect {
        let index = (gid & TILE_FLIPPED_MASK).saturating_sub(self.first_gid);
        let columns = self.columns();
        Rect::new(
            (index % columns) as f32 * (self.tile_size.width + self.spacing) + self.margin,
            (index / columns) as f32 * (self.tile_size.height + self.spacing) + self.margin,
            self.tile_size.width,
            self.tile_size.height,
        )
    }
}

fn default_opacity() -> u8 {
    255
}

/// Plain description of one layer, as produced by a map loader.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileLayerData {
    #[serde(default)]
    pub name: String,
    /// Layer size in tiles.
    pub width: u32,
    pub height: u32,
    /// Gids in row-major order, row 0 at the top.
    pub tiles: Vec<u32>,
    #[serde(default)]
    pub orientation: Orientation,
    /// Grid cell size of the map, which may differ from the tileset's tiles.
    pub map_tile_size: Size,
    pub tileset: Tileset,
    #[serde(default = "default_opacity")]
    pub opacity: u8,
    #[serde(default)]
    pub vertex_z: f32,
}

impl TileLayerData {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let data: Self = serde_json::from_str(json).context("failed to parse tile layer")?;
        anyhow::ensure!(
            data.tiles.len() == (data.width as usize) * (data.height as usize),
            "layer {:?} has {} tiles, expected {}x{}",
            data.name,
            data.tiles.len(),
            data.width,
            data.height
        );
        Ok(data)
    }
}

/// Batch payload of a tile layer node.
#[derive(Debug)]
pub struct TileLayer {
    batch: SpriteBatch,
    name: String,
    width: u32,
    height: u32,
    map_tile_size: Size,
    orientation: Orientation,
    tileset: Tileset,
    opacity: u8,
    vertex_z: f32,
    /// Gids with flip bits, row-major.
    tiles: Vec<u32>,
    /// Cell (`z`) of each atlas slot, ascending.
    atlas_index_array: Vec<u32>,
    /// Reused to build tile quads. Only valid during one quad build.
    scratch: Option<Box<Node>>,
}

impl TileLayer {
    pub fn new(data: TileLayerData) -> Self {
        let capacity = (data.tiles.len() as f32 * 0.35) as usize + 1;
        let mut layer = Self {
            batch: SpriteBatch::new(data.tileset.texture, capacity),
            name: data.name,
            width: data.width,
            height: data.height,
            map_tile_size: data.map_tile_size,
            orientation: data.orientation,
            tileset: data.tileset,
            opacity: data.opacity,
            vertex_z: data.vertex_z,
            tiles: data.tiles,
            atlas_index_array: Vec::new(),
            scratch: None,
        };
        layer.tiles.resize(layer.width as usize * layer.height as usize, 0);
        layer.setup_tiles();
        layer
    }

    fn setup_tiles(&mut self) {
        for y in 0..self.height {
            for x in 0..self.width {
                let gid = self.tiles[self.z_for(x, y)];
                if gid & TILE_FLIPPED_MASK == 0 {
                    continue;
                }
                if (gid & TILE_FLIPPED_MASK) < self.tileset.first_gid {
                    log::warn!(
                        "layer {:?}: gid {} at ({x}, {y}) is below the tileset's first gid {}",
                        self.name,
                        gid & TILE_FLIPPED_MASK,
                        self.tileset.first_gid
                    );
                    continue;
                }
                let quad = self.tile_quad(gid, x, y);
                let index = self.atlas_index_array.len();
                self.batch.ensure_room(index);
                self.batch.atlas.insert_quad(quad, index);
                self.atlas_index_array.push(self.z_for(x, y) as u32);
            }
        }
        log::debug!(
            "layer {:?}: {} tiles in a {}x{} grid",
            self.name,
            self.atlas_index_array.len(),
            self.width,
            self.height
        );
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Layer size in tiles.
    pub fn layer_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn map_tile_size(&self) -> Size {
        self.map_tile_size
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn tileset(&self) -> &Tileset {
        &self.tileset
    }

    pub fn tiles(&self) -> &[u32] {
        &self.tiles
    }

    pub fn batch(&self) -> &SpriteBatch {
        &self.batch
    }

    pub(crate) fn batch_mut(&mut self) -> &mut SpriteBatch {
        &mut self.batch
    }

    /// Content size of the layer node, in points.
    pub fn layer_content_size(&self) -> Size {
        Size::new(
            self.width as f32 * self.map_tile_size.width,
            self.height as f32 * self.map_tile_size.height,
        )
    }

    fn z_for(&self, x: u32, y: u32) -> usize {
        x as usize + y as usize * self.width as usize
    }

    fn check_bounds(&self, x: u32, y: u32) -> SceneResult<()> {
        if x < self.width && y < self.height {
            Ok(())
        } else {
            Err(SceneError::TileOutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Bottom-left corner of cell `(x, y)` in layer space. Row 0 is the top row.
    pub fn position_at(&self, x: u32, y: u32) -> Vec2 {
        let (x, y) = (x as f32, y as f32);
        let (width, height) = (self.width as f32, self.height as f32);
        let tile = self.map_tile_size;
        match self.orientation {
            Orientation::Orthogonal => Vec2::new(x * tile.width, (height - y - 1.0) * tile.height),
            Orientation::Isometric => Vec2::new(
                tile.width / 2.0 * (width + x - y - 1.0),
                tile.height / 2.0 * ((height * 2.0 - x - y) - 2.0),
            ),
            Orientation::Hexagonal => {
                let diff_y = if (x as u32) % 2 == 1 {
                    -tile.height / 2.0
                } else {
                    0.0
                };
                Vec2::new(
                    x * tile.width * 3.0 / 4.0,
                    (height - y - 1.0) * tile.height + diff_y,
                )
            }
        }
    }

    /// Cell under `position` for orthogonal layers.
    pub fn tile_coord_for_position(&self, position: Vec2) -> Option<(u32, u32)> {
        if self.orientation != Orientation::Orthogonal {
            return None;
        }
        let column = (position.x / self.map_tile_size.width).floor();
        let row_from_bottom = (position.y / self.map_tile_size.height).floor();
        let row = self.height as f32 - 1.0 - row_from_bottom;
        if column < 0.0 || row < 0.0 || column >= self.width as f32 || row >= self.height as f32 {
            return None;
        }
        Some((column as u32, row as u32))
    }

    /// Gid at `(x, y)` without flip bits; 0 for an empty cell.
    pub fn tile_gid_at(&self, x: u32, y: u32) -> SceneResult<u32> {
        self.check_bounds(x, y)?;
        Ok(self.tiles[self.z_for(x, y)] & TILE_FLIPPED_MASK)
    }

    pub fn tile_flags_at(&self, x: u32, y: u32) -> SceneResult<TileFlags> {
        self.check_bounds(x, y)?;
        Ok(TileFlags::from_gid(self.tiles[self.z_for(x, y)]))
    }

    /// Atlas slot of an occupied cell.
    pub fn atlas_index_for_existing_z(&self, z: u32) -> Option<usize> {
        let found = self.atlas_index_array.binary_search(&z).ok();
        if found.is_none() {
            log::warn!("layer {:?}: no atlas slot for cell {z}", self.name);
        }
        found
    }

    /// Slot a quad for the empty cell `z` would take.
    pub fn atlas_index_for_new_z(&self, z: u32) -> usize {
        self.atlas_index_array.partition_point(|existing| *existing < z)
    }

    /// Builds the batch-space quad for `gid` at `(x, y)` using the scratch tile.
    fn tile_quad(&mut self, gid: u32, x: u32, y: u32) -> Quad {
        let rect = self.tileset.rect_for_gid(gid);
        let position = self.position_at(x, y);
        let (opacity, vertex_z, texture) = (self.opacity, self.vertex_z, self.tileset.texture);
        let scratch = self
            .scratch
            .get_or_insert_with(|| Box::new(Node::sprite(Sprite::new(texture, rect))));
        scratch.set_texture_rect(rect);
        setup_tile_node(scratch, position, gid, opacity, vertex_z);
        let transform = scratch.node_to_parent_transform();
        match scratch.sprite_data_mut() {
            Some(sprite) => {
                sprite.transform_to_batch = transform;
                sprite.write_batch_vertices(vertex_z);
                *sprite.quad()
            }
            None => Quad::default(),
        }
    }
}

/// Places a tile sprite and applies the flip bits of `gid`.
///
/// A diagonal flip is a transpose, expressed as a quarter rotation around the
/// tile center plus an optional horizontal flip.
fn setup_tile_node(node: &mut Node, position: Vec2, gid: u32, opacity: u8, vertex_z: f32) {
    node.set_position(position);
    node.set_vertex_z(vertex_z);
    node.set_anchor_point(Vec2::ZERO);
    node.set_opacity(opacity);
    <Node as ActionTarget>::set_flipped_x(node, false);
    <Node as ActionTarget>::set_flipped_y(node, false);
    node.set_rotation(0.0);

    if gid & TILE_FLIPPED_DIAGONAL != 0 {
        let size = node.content_size();
        node.set_anchor_point(Vec2::new(0.5, 0.5));
        node.set_position(Vec2::new(
            position.x + size.height / 2.0,
            position.y + size.width / 2.0,
        ));
        let flag = gid & (TILE_FLIPPED_HORIZONTAL | TILE_FLIPPED_VERTICAL);
        if flag == TILE_FLIPPED_HORIZONTAL {
            node.set_rotation(90.0);
        } else if flag == TILE_FLIPPED_VERTICAL {
            node.set_rotation(270.0);
        } else if flag == TILE_FLIPPED_HORIZONTAL | TILE_FLIPPED_VERTICAL {
            node.set_rotation(90.0);
            <Node as ActionTarget>::set_flipped_x(node, true);
        } else {
            node.set_rotation(270.0);
            <Node as ActionTarget>::set_flipped_x(node, true);
        }
    } else {
        if gid & TILE_FLIPPED_HORIZONTAL != 0 {
            <Node as ActionTarget>::set_flipped_x(node, true);
        }
        if gid & TILE_FLIPPED_VERTICAL != 0 {
            <Node as ActionTarget>::set_flipped_y(node, true);
        }
    }
}

impl SceneGraph {
    fn tile_layer_ref(&self, layer: NodeId) -> SceneResult<&TileLayer> {
        self.get(layer)
            .ok_or(SceneError::MissingNode(layer))?
            .tile_layer_data()
            .ok_or(SceneError::NotATileLayer(layer))
    }

    fn tile_layer_mut(&mut self, layer: NodeId) -> SceneResult<&mut TileLayer> {
        self.nodes
            .get_mut(&layer)
            .ok_or(SceneError::MissingNode(layer))?
            .tile_layer_data_mut()
            .ok_or(SceneError::NotATileLayer(layer))
    }

    /// The sprite for cell `(x, y)`, creating it on first request.
    ///
    /// Returns `None` for an empty cell. The sprite is tagged with the cell's
    /// `z` and reuses the cell's atlas slot, so moving or tinting it edits the
    /// tile in place.
    pub fn tile_at(&mut self, layer: NodeId, x: u32, y: u32) -> SceneResult<Option<NodeId>> {
        let data = self.tile_layer_ref(layer)?;
        data.check_bounds(x, y)?;
        let z = data.z_for(x, y);
        let gid = data.tiles[z];
        if gid & TILE_FLIPPED_MASK == 0 {
            return Ok(None);
        }
        if let Some(existing) = self.child_by_tag(layer, z as i32) {
            return Ok(Some(existing));
        }
        let Some(index) = data.atlas_index_for_existing_z(z as u32) else {
            return Ok(None);
        };

        let rect = data.tileset.rect_for_gid(gid);
        let mut node = Node::sprite(Sprite::new(data.tileset.texture, rect));
        setup_tile_node(&mut node, data.position_at(x, y), gid, data.opacity, data.vertex_z);
        let id = self.spawn(node);
        if let Some(sprite) = self.get_mut(id).and_then(Node::sprite_data_mut) {
            sprite.attach(BatchSlot {
                batch: layer,
                atlas_index: index,
            });
        }
        self.insert_descendant(layer, id);
        self.link_child(layer, id, z as i32, z as i32);
        self.attach_side_effects(layer, id);
        Ok(Some(id))
    }

    /// Sets the gid of a cell. `gid` may carry flip bits; 0 clears the cell.
    ///
    /// A gid the tileset does not cover is logged and ignored.
    pub fn set_tile_gid(&mut self, layer: NodeId, x: u32, y: u32, gid: u32) -> SceneResult<()> {
        let data = self.tile_layer_ref(layer)?;
        data.check_bounds(x, y)?;
        let bare = gid & TILE_FLIPPED_MASK;
        if bare != 0 && bare < data.tileset.first_gid {
            log::warn!(
                "layer {:?}: gid {bare} is below the tileset's first gid {}",
                data.name,
                data.tileset.first_gid
            );
            return Ok(());
        }
        let z = data.z_for(x, y);
        let current = data.tiles[z];
        if current == gid {
            return Ok(());
        }
        if bare == 0 {
            return self.remove_tile_at(layer, x, y);
        }
        if current & TILE_FLIPPED_MASK == 0 {
            self.insert_tile_for_gid(layer, gid, x, y)?;
            return Ok(());
        }

        match self.child_by_tag(layer, z as i32) {
            Some(sprite) => {
                let rect = data.tileset.rect_for_gid(gid);
                let position = data.position_at(x, y);
                let (opacity, vertex_z) = (data.opacity, data.vertex_z);
                if let Some(node) = self.get_mut(sprite) {
                    node.set_texture_rect(rect);
                    setup_tile_node(node, position, gid, opacity, vertex_z);
                }
                self.mark_transform_dirty(sprite);
                self.tile_layer_mut(layer)?.tiles[z] = gid;
            }
            None => {
                let data = self.tile_layer_mut(layer)?;
                let quad = data.tile_quad(gid, x, y);
                if let Some(index) = data.atlas_index_for_existing_z(z as u32) {
                    data.batch.atlas.update_quad(quad, index);
                }
                data.tiles[z] = gid;
            }
        }
        self.mark_cache_dirty(layer);
        Ok(())
    }

    fn insert_tile_for_gid(&mut self, layer: NodeId, gid: u32, x: u32, y: u32) -> SceneResult<()> {
        let data = self.tile_layer_mut(layer)?;
        let z = data.z_for(x, y);
        let quad = data.tile_quad(gid, x, y);
        let index = data.atlas_index_for_new_z(z as u32);
        data.batch.ensure_room(index);
        data.batch.atlas.insert_quad(quad, index);
        data.atlas_index_array.insert(index, z as u32);
        data.tiles[z] = gid;
        self.shift_slots_from(layer, index, 1);
        self.mark_cache_dirty(layer);
        Ok(())
    }

    /// Clears cell `(x, y)`, deleting its sprite if one was materialized.
    pub fn remove_tile_at(&mut self, layer: NodeId, x: u32, y: u32) -> SceneResult<()> {
        let data = self.tile_layer_ref(layer)?;
        data.check_bounds(x, y)?;
        let z = data.z_for(x, y);
        if data.tiles[z] & TILE_FLIPPED_MASK == 0 {
            return Ok(());
        }
        if let Some(sprite) = self.child_by_tag(layer, z as i32) {
            self.despawn(sprite);
            return Ok(());
        }

        let data = self.tile_layer_mut(layer)?;
        let Some(index) = data.atlas_index_for_existing_z(z as u32) else {
            return Ok(());
        };
        data.tiles[z] = 0;
        data.atlas_index_array.remove(index);
        data.batch.atlas.remove_quad_at(index);
        self.shift_slots_from(layer, index, -1);
        self.mark_cache_dirty(layer);
        Ok(())
    }

    /// A materialized tile sprite is leaving its layer: the cell goes with it.
    pub(crate) fn forget_tile_child(&mut self, layer: NodeId, child: NodeId) {
        let Some(index) = self.atlas_index_of(child) else {
            return;
        };
        let Ok(data) = self.tile_layer_mut(layer) else {
            return;
        };
        if index < data.atlas_index_array.len() {
            let z = data.atlas_index_array.remove(index) as usize;
            if let Some(cell) = data.tiles.get_mut(z) {
                *cell = 0;
            }
        }
    }
}
