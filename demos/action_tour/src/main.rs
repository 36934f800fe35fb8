use std::collections::HashMap;

use anyhow::Result;
use stagecraft::actions::{
    CallFunc, DelayTime, FadeOut, JumpBy, MoveBy, Repeat, RotateBy, ScaleTo, Sequence, Spawn,
    TintTo,
};
use stagecraft::render::{
    Alignment, Animate, Animation, BitmapFontConfig, GlyphDef, Orientation, TileLayerData,
    Tileset,
};
use stagecraft::{
    ActionExt, BitmapLabel, Color3B, CommandQueue, Easing, Node, Rect, Size, Sprite, Stage,
    StageConfig, Texture, TextureHandle, TileLayer, Vec2,
};

const FRAME: f32 = 1.0 / 60.0;

fn font(texture: Texture) -> BitmapFontConfig {
    let mut chars = HashMap::new();
    for (i, ch) in ('A'..='Z').enumerate() {
        let x = (i % 8) as f32 * 16.0;
        let y = (i / 8) as f32 * 16.0;
        chars.insert(
            ch as u32,
            GlyphDef {
                rect: Rect::new(x, y, 14.0, 16.0),
                x_offset: 1.0,
                y_offset: 0.0,
                x_advance: 15.0,
            },
        );
    }
    chars.insert(
        ' ' as u32,
        GlyphDef {
            rect: Rect::ZERO,
            x_offset: 0.0,
            y_offset: 0.0,
            x_advance: 8.0,
        },
    );
    log::debug!("font with {} glyphs on texture {:?}", chars.len(), texture.handle);
    BitmapFontConfig {
        chars,
        common_height: 18.0,
        kerning: Vec::new(),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => StageConfig::load_from_file(path)?,
        None => StageConfig::default(),
    };
    let mut stage = Stage::with_config(config);

    let sheet = Texture::new(TextureHandle::new(1), Size::new(128.0, 64.0));
    let glyphs = Texture::new(TextureHandle::new(2), Size::new(128.0, 64.0));
    let tiles = Texture::new(TextureHandle::new(3), Size::new(64.0, 64.0));

    // A batch of sprites, each running its own composite action.
    let batch = stage.add_to_root(Node::batch(stage.new_batch(sheet)));
    let mut movers = Vec::new();
    for i in 0..5 {
        let mut node = Node::sprite(Sprite::new(sheet, Rect::new(0.0, 0.0, 32.0, 32.0)));
        node.set_position(Vec2::new(40.0 + i as f32 * 48.0, 100.0));
        node.set_local_z_order(i % 2);
        let id = stage.graph_mut().spawn_child(batch, node)?;
        movers.push(id);
    }

    let hop = Sequence::new(
        JumpBy::new(0.6, (60.0, 0.0), 30.0, 2).boxed(),
        MoveBy::new(0.6, (-60.0, 0.0)).easing([Easing::BounceOut]).boxed(),
    );
    stage.run_action(movers[0], Repeat::new(hop.boxed(), 2)?.boxed());

    let spin = Spawn::new(
        RotateBy::new(1.0, 360.0).boxed(),
        ScaleTo::new(0.5, 1.5).easing([Easing::BackOut]).boxed(),
    );
    stage.run_action(movers[1], spin.repeat(2).boxed());

    stage.run_action(
        movers[2],
        Sequence::from_actions(vec![
            DelayTime::new(0.5).boxed(),
            TintTo::new(0.5, Color3B::new(255, 64, 64)).boxed(),
            FadeOut::new(0.5).easing([Easing::SineIn]).boxed(),
            CallFunc::new(|target| log::info!("faded out {:?}", target.node_id())).boxed(),
        ])?
        .boxed(),
    );

    let walk = Animation::from_grid(sheet, (4, 2), 8, 0.1).with_loops(2);
    stage.run_action(movers[3], Animate::new(walk)?.boxed());

    stage.run_action(
        movers[4],
        MoveBy::new(2.0, (0.0, 80.0)).with_tag(7).speed(2.0).boxed(),
    );

    // A label that reports progress.
    let label = stage.add_to_root(Node::label(BitmapLabel::new(glyphs, font(glyphs), 16)));
    stage.graph_mut().set_label_width(label, 200.0)?;
    stage
        .graph_mut()
        .set_label_alignment(label, Alignment::Center)?;
    stage.graph_mut().set_label_text(label, "ACTION TOUR")?;

    // A small tile map.
    let layer = TileLayer::new(TileLayerData {
        name: "floor".into(),
        width: 4,
        height: 3,
        tiles: vec![1, 2, 2, 1, 3, 0, 0, 3, 1, 2, 2, 1],
        orientation: Orientation::Orthogonal,
        map_tile_size: Size::new(16.0, 16.0),
        tileset: Tileset {
            texture: tiles,
            first_gid: 1,
            tile_size: Size::new(16.0, 16.0),
            spacing: 0.0,
            margin: 0.0,
        },
        opacity: 255,
        vertex_z: 0.0,
    });
    let floor = stage.add_to_root(Node::tile_layer(layer));
    stage.graph_mut().set_tile_gid(floor, 1, 1, 4)?;

    // The tile layer pulses once per second through a scheduled update.
    let mut clock = 0.0_f32;
    stage.schedule_update(floor, 0, move |dt, node| {
        clock += dt;
        let pulse = 1.0 + 0.05 * (clock * std::f32::consts::TAU).sin();
        node.set_scale(pulse);
    });

    let mut queue = CommandQueue::new();
    for frame in 0..180 {
        queue.clear();
        stage.frame(FRAME, &mut queue);
        if frame % 60 == 0 {
            let quads: usize = queue.commands().iter().map(|c| c.quad_count()).sum();
            log::info!(
                "t={:.2}s: {} commands, {} quads, {} running actions",
                stage.elapsed(),
                queue.len(),
                quads,
                stage.actions().number_of_running_actions()
            );
        }
        if frame == 90 {
            stage.graph_mut().set_label_text(label, "HALF WAY")?;
        }
    }

    for id in &movers {
        if let Some(node) = stage.graph().get(*id) {
            log::info!(
                "{id:?}: position {:?}, rotation {:.1}, opacity {}",
                node.position(),
                node.rotation_x(),
                node.opacity()
            );
        }
    }
    Ok(())
}
