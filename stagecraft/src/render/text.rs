//! Bitmap font labels.
//!
//! A label is a sprite batch whose children are one sprite per laid out
//! glyph. Glyph sprites are tagged with their position in the layout and are
//! reused when the text changes; leftovers are hidden rather than removed.

use std::collections::HashMap;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::batch::SpriteBatch;
use super::sprite::Sprite;
use super::texture::Texture;
use crate::error::{SceneError, SceneResult};
use crate::math::{Rect, Size, Vec2};
use crate::node::Node;
use crate::world::{NodeId, SceneGraph};

/// Metrics of one glyph, in texture pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlyphDef {
    pub rect: Rect,
    #[serde(default)]
    pub x_offset: f32,
    #[serde(default)]
    pub y_offset: f32,
    pub x_advance: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct KerningPair {
    pub first: u32,
    pub second: u32,
    pub amount: f32,
}

/// Parsed bitmap font description.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BitmapFontConfig {
    /// Glyphs keyed by code point.
    pub chars: HashMap<u32, GlyphDef>,
    /// Line height.
    pub common_height: f32,
    #[serde(default)]
    pub kerning: Vec<KerningPair>,
}

impl BitmapFontConfig {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json).context("failed to parse bitmap font")?;
        anyhow::ensure!(
            config.common_height > 0.0,
            "bitmap font has a non-positive line height"
        );
        Ok(config)
    }

    pub fn glyph(&self, ch: char) -> Option<&GlyphDef> {
        self.chars.get(&(ch as u32))
    }

    pub fn kerning_amount(&self, first: char, second: char) -> f32 {
        self.kerning
            .iter()
            .find(|pair| pair.first == first as u32 && pair.second == second as u32)
            .map_or(0.0, |pair| pair.amount)
    }

    /// Advance width of `line`, kerning included. Missing glyphs add nothing.
    pub fn line_width(&self, line: &str) -> f32 {
        let mut pen = 0.0;
        let mut previous = None;
        for ch in line.chars() {
            if let Some(prev) = previous {
                pen += self.kerning_amount(prev, ch);
            }
            if let Some(glyph) = self.glyph(ch) {
                pen += glyph.x_advance;
            }
            previous = Some(ch);
        }
        pen
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// One glyph as placed by [`layout`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedGlyph {
    pub ch: char,
    pub rect: Rect,
    /// Center of the glyph in label space.
    pub position: Vec2,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextLayout {
    pub glyphs: Vec<PlacedGlyph>,
    pub size: Size,
    pub lines: usize,
}

/// Breaks `paragraph` greedily at spaces. A word wider than `max_width` gets
/// a line of its own and overflows.
fn wrap(config: &BitmapFontConfig, paragraph: &str, max_width: f32) -> Vec<String> {
    if max_width <= 0.0 {
        return vec![paragraph.to_owned()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in paragraph.split(' ') {
        let candidate = if current.is_empty() {
            word.to_owned()
        } else {
            format!("{current} {word}")
        };
        if !current.is_empty() && config.line_width(&candidate) > max_width {
            lines.push(std::mem::replace(&mut current, word.to_owned()));
        } else {
            current = candidate;
        }
    }
    lines.push(current);
    lines
}

/// Lays out `text` with the label origin at the bottom-left of the last line.
///
/// Lines are aligned within `max_width` when it is positive, otherwise within
/// the longest line.
pub fn layout(
    config: &BitmapFontConfig,
    text: &str,
    alignment: Alignment,
    max_width: f32,
) -> TextLayout {
    let lines: Vec<String> = text
        .split('\n')
        .flat_map(|paragraph| wrap(config, paragraph, max_width))
        .collect();
    let widths: Vec<f32> = lines.iter().map(|line| config.line_width(line)).collect();
    let longest = widths.iter().copied().fold(0.0, f32::max);
    let box_width = if max_width > 0.0 { max_width } else { longest };
    let height = config.common_height;

    let mut glyphs = Vec::new();
    for (row, (line, width)) in lines.iter().zip(&widths).enumerate() {
        let shift = match alignment {
            Alignment::Left => 0.0,
            Alignment::Center => (box_width - width) / 2.0,
            Alignment::Right => box_width - width,
        };
        let baseline = height * (lines.len() - 1 - row) as f32;
        let mut pen = 0.0;
        let mut previous = None;
        for ch in line.chars() {
            if let Some(prev) = previous {
                pen += config.kerning_amount(prev, ch);
            }
            previous = Some(ch);
            let Some(glyph) = config.glyph(ch) else {
                log::warn!("bitmap font has no glyph for {ch:?}");
                continue;
            };
            if glyph.rect.width > 0.0 && glyph.rect.height > 0.0 {
                glyphs.push(PlacedGlyph {
                    ch,
                    rect: glyph.rect,
                    position: Vec2::new(
                        pen + glyph.x_offset + glyph.rect.width / 2.0 + shift,
                        baseline + (height - glyph.y_offset) - glyph.rect.height / 2.0,
                    ),
                });
            }
            pen += glyph.x_advance;
        }
    }

    TextLayout {
        glyphs,
        size: Size::new(box_width, height * lines.len() as f32),
        lines: lines.len(),
    }
}

/// Batch payload of a label node.
#[derive(Clone, Debug)]
pub struct BitmapLabel {
    batch: SpriteBatch,
    config: BitmapFontConfig,
    text: String,
    alignment: Alignment,
    max_width: f32,
}

impl BitmapLabel {
    pub fn new(texture: Texture, config: BitmapFontConfig, capacity: usize) -> Self {
        Self {
            batch: SpriteBatch::new(texture, capacity),
            config,
            text: String::new(),
            alignment: Alignment::Left,
            max_width: 0.0,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    pub fn max_width(&self) -> f32 {
        self.max_width
    }

    pub fn config(&self) -> &BitmapFontConfig {
        &self.config
    }

    pub fn batch(&self) -> &SpriteBatch {
        &self.batch
    }

    pub(crate) fn batch_mut(&mut self) -> &mut SpriteBatch {
        &mut self.batch
    }

    pub fn layout(&self) -> TextLayout {
        layout(&self.config, &self.text, self.alignment, self.max_width)
    }
}

impl SceneGraph {
    fn label_mut(&mut self, label: NodeId) -> SceneResult<&mut BitmapLabel> {
        self.nodes
            .get_mut(&label)
            .ok_or(SceneError::MissingNode(label))?
            .label_data_mut()
            .ok_or(SceneError::NotALabel(label))
    }

    pub fn set_label_text(&mut self, label: NodeId, text: &str) -> SceneResult<()> {
        let data = self.label_mut(label)?;
        if data.text == text {
            return Ok(());
        }
        data.text = text.to_owned();
        self.relayout_label(label)
    }

    pub fn set_label_alignment(&mut self, label: NodeId, alignment: Alignment) -> SceneResult<()> {
        self.label_mut(label)?.alignment = alignment;
        self.relayout_label(label)
    }

    /// Wrap width; zero or less disables wrapping.
    pub fn set_label_width(&mut self, label: NodeId, max_width: f32) -> SceneResult<()> {
        self.label_mut(label)?.max_width = max_width;
        self.relayout_label(label)
    }

    fn relayout_label(&mut self, label: NodeId) -> SceneResult<()> {
        let data = self.label_mut(label)?;
        let texture = data.batch.texture();
        let layout = data.layout();

        for (index, glyph) in layout.glyphs.iter().enumerate() {
            let tag = index as i32;
            match self.child_by_tag(label, tag) {
                Some(child) => {
                    self.update_transform(child, |node| {
                        node.set_texture_rect(glyph.rect);
                        node.set_position(glyph.position);
                    });
                    self.set_visible(child, true);
                }
                None => {
                    let mut node = Node::sprite(Sprite::new(texture, glyph.rect));
                    node.set_position(glyph.position);
                    let child = self.spawn(node);
                    self.add_child_with(label, child, tag, tag)?;
                }
            }
        }
        for child in self.children_of(label) {
            let unused = self
                .get(child)
                .is_some_and(|node| node.tag() >= layout.glyphs.len() as i32);
            if unused {
                self.set_visible(child, false);
            }
        }

        self.update_transform(label, |node| node.set_content_size(layout.size));
        log::trace!(
            "label {label:?}: {} glyphs on {} lines",
            layout.glyphs.len(),
            layout.lines
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Color3B;
    use crate::render::{CommandQueue, RenderCommand, TextureHandle};

    fn glyph(x: f32, advance: f32) -> GlyphDef {
        GlyphDef {
            rect: Rect::new(x, 0.0, 8.0, 10.0),
            x_offset: 0.0,
            y_offset: 2.0,
            x_advance: advance,
        }
    }

    fn config() -> BitmapFontConfig {
        let mut chars = HashMap::new();
        chars.insert('A' as u32, glyph(0.0, 10.0));
        chars.insert('B' as u32, glyph(8.0, 10.0));
        chars.insert(
            ' ' as u32,
            GlyphDef {
                rect: Rect::new(0.0, 0.0, 0.0, 0.0),
                x_offset: 0.0,
                y_offset: 0.0,
                x_advance: 5.0,
            },
        );
        BitmapFontConfig {
            chars,
            common_height: 12.0,
            kerning: vec![KerningPair {
                first: 'A' as u32,
                second: 'B' as u32,
                amount: -2.0,
            }],
        }
    }

    fn spawn_label(graph: &mut SceneGraph) -> NodeId {
        let texture = Texture::new(TextureHandle::new(9), Size::new(64.0, 64.0));
        graph.spawn(Node::label(BitmapLabel::new(texture, config(), 8)))
    }

    #[test]
    fn glyphs_advance_with_kerning() {
        let laid = layout(&config(), "AB", Alignment::Left, 0.0);
        assert_eq!(laid.glyphs.len(), 2);
        assert_eq!(laid.glyphs[0].position, Vec2::new(4.0, 5.0));
        assert_eq!(laid.glyphs[1].position, Vec2::new(12.0, 5.0));
        assert_eq!(laid.size, Size::new(18.0, 12.0));
    }

    #[test]
    fn lines_stack_downwards() {
        let laid = layout(&config(), "A\nB", Alignment::Left, 0.0);
        assert_eq!(laid.lines, 2);
        assert_eq!(laid.glyphs[0].position.y, 17.0);
        assert_eq!(laid.glyphs[1].position.y, 5.0);
    }

    #[test]
    fn alignment_shifts_short_lines() {
        let laid = layout(&config(), "AA\nB", Alignment::Right, 0.0);
        assert_eq!(laid.glyphs[2].position.x, 14.0);
        let centered = layout(&config(), "AA\nB", Alignment::Center, 0.0);
        assert_eq!(centered.glyphs[2].position.x, 9.0);
    }

    #[test]
    fn wrapping_breaks_at_spaces() {
        let laid = layout(&config(), "AA BB", Alignment::Left, 22.0);
        assert_eq!(laid.lines, 2);
        assert_eq!(laid.size.width, 22.0);

        let long = layout(&config(), "AAAA", Alignment::Left, 22.0);
        assert_eq!(long.lines, 1);
    }

    #[test]
    fn missing_glyphs_are_skipped() {
        let laid = layout(&config(), "AzB", Alignment::Left, 0.0);
        assert_eq!(laid.glyphs.len(), 2);
        assert_eq!(laid.glyphs[1].ch, 'B');
    }

    #[test]
    fn set_text_reuses_and_hides_glyph_sprites() {
        let mut graph = SceneGraph::new();
        let label = spawn_label(&mut graph);
        graph.set_label_text(label, "ABA").unwrap();
        let children = graph.children_of(label);
        assert_eq!(children.len(), 3);

        graph.set_label_text(label, "B").unwrap();
        assert_eq!(graph.children_of(label), children);
        assert!(graph.get(children[0]).unwrap().is_visible());
        assert!(!graph.get(children[2]).unwrap().is_visible());
        assert_eq!(
            graph.get(children[0]).unwrap().sprite_data().unwrap().texture_rect().x,
            8.0
        );
        assert_eq!(graph.get(label).unwrap().content_size(), Size::new(10.0, 12.0));
    }

    #[test]
    fn label_color_cascades_into_glyphs() {
        let mut graph = SceneGraph::new();
        let label = spawn_label(&mut graph);
        graph.set_label_text(label, "AB").unwrap();
        graph.set_opacity(label, 128);
        graph.set_color(label, Color3B::new(255, 0, 0));
        for child in graph.children_of(label) {
            let node = graph.get(child).unwrap();
            assert_eq!(node.displayed_opacity(), 128);
            assert_eq!(node.displayed_color(), Color3B::new(255, 0, 0));
        }
    }

    #[test]
    fn label_draws_as_one_batch() {
        let mut graph = SceneGraph::new();
        let label = spawn_label(&mut graph);
        graph.set_label_text(label, "AB AB").unwrap();
        let mut queue = CommandQueue::new();
        graph.visit(label, &mut queue);
        assert_eq!(queue.len(), 1);
        match &queue.commands()[0] {
            RenderCommand::Quads { quads, .. } => assert_eq!(quads.len(), 4),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn missing_node_is_reported() {
        let mut graph = SceneGraph::new();
        let plain = graph.spawn(Node::new());
        assert_eq!(
            graph.set_label_text(plain, "A"),
            Err(SceneError::NotALabel(plain))
        );
    }

    #[test]
    fn config_parses_from_json() {
        let json = r#"{
            "chars": {
                "65": { "rect": { "x": 0, "y": 0, "width": 8, "height": 10 }, "x_advance": 9 }
            },
            "common_height": 12
        }"#;
        let config = BitmapFontConfig::from_json(json).unwrap();
        assert_eq!(config.glyph('A').unwrap().x_advance, 9.0);
        assert!(BitmapFontConfig::from_json(r#"{ "chars": {}, "common_height": 0 }"#).is_err());
    }
}
