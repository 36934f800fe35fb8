mod animation;
mod atlas;
mod batch;
mod command;
mod sprite;
mod text;
mod texture;
mod tilemap;

pub use animation::{Animate, Animation, AnimationFrame};
pub use atlas::{grown_capacity, Quad, QuadVertex, TextureAtlas};
pub use batch::SpriteBatch;
pub use command::{CommandQueue, RenderCommand, RenderSink};
pub use sprite::{BatchSlot, Sprite, SpriteFrame};
pub use text::{
    layout, Alignment, BitmapFontConfig, BitmapLabel, GlyphDef, KerningPair, PlacedGlyph,
    TextLayout,
};
pub use texture::{Texture, TextureCache, TextureHandle, TextureProvider};
pub use tilemap::{
    Orientation, TileFlags, TileLayer, TileLayerData, Tileset, TILE_FLIPPED_ALL,
    TILE_FLIPPED_DIAGONAL, TILE_FLIPPED_HORIZONTAL, TILE_FLIPPED_MASK, TILE_FLIPPED_VERTICAL,
};
