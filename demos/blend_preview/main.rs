//! Blend preview example
//!
//! Renders a small floor plan with organic tile blending and writes it to a
//! PNG. Tile sprites are generated procedurally; water is left without a
//! sprite to show the fallback color.
//!
//! Run with: cargo run --example blend_preview -p tile_blend_demos -- [settings.toml] [output.png]

use std::collections::HashMap;
use std::error::Error;
use std::path::Path;
use std::time::Instant;

use image::{Rgba, RgbaImage};
use tile_blend::sprites::pixmap_to_rgba;
use tile_blend::{
    BlendError, BlendSettings, DrawOutcome, FrameQuality, FrameScheduler, RegistrySprites,
    RenderScene, SpriteLookup, SpriteStore, TileDrawRequest, TileRenderer,
};
use tile_blend_core::{Layer, TileMaps, TileRegistry, TileTypeId};
use tiny_skia::Pixmap;
use tracing::info;
use tracing_subscriber::EnvFilter;

const MAP_WIDTH: i32 = 12;
const MAP_HEIGHT: i32 = 8;
const TILE_SIZE: u32 = 48;
const SPRITE_SIZE: u32 = 16;

fn main() -> Result<(), Box<dyn Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => BlendSettings::load(Path::new(&path))?,
        None => BlendSettings::default(),
    };
    let output = args
        .next()
        .unwrap_or_else(|| "blend_preview.png".to_string());

    let mut registry = TileRegistry::with_default_tiles();
    let mut store = SpriteStore::new();
    let palette = sprite_palette();
    let ids: Vec<TileTypeId> = registry.ids().cloned().collect();
    for id in ids {
        let Some(color) = palette.get(id.as_str()) else {
            continue;
        };
        let handle = store.insert_rgba(&textured_sprite(*color, id.as_str()))?;
        registry.bind_sprite(&id, handle)?;
    }

    let mut maps = build_map();
    let mut renderer = TileRenderer::new(settings);
    let mut scheduler = FrameScheduler::new(&renderer.settings().frame);
    let mut canvas = Pixmap::new(MAP_WIDTH as u32 * TILE_SIZE, MAP_HEIGHT as u32 * TILE_SIZE)
        .ok_or(BlendError::SurfaceAllocation {
            width: MAP_WIDTH as u32 * TILE_SIZE,
            height: MAP_HEIGHT as u32 * TILE_SIZE,
        })?;

    {
        let sprites = RegistrySprites {
            registry: &registry,
            store: &store,
        };
        sprites.require_sprite(&TileTypeId::from("grass"))?;

        scheduler.request_redraw();
        if let Some(quality) = scheduler.poll(Instant::now()) {
            draw_frame(&mut renderer, &mut canvas, &registry, &sprites, &maps, quality)?;
        }
    }

    // Paint a wooden jetty into the water and redraw the affected cells
    maps.set(Layer::Floor, 9, 5, "floor-wood");
    renderer.on_tile_changed(9, 5);
    {
        let sprites = RegistrySprites {
            registry: &registry,
            store: &store,
        };
        scheduler.request_redraw();
        std::thread::sleep(std::time::Duration::from_millis(20));
        if let Some(quality) = scheduler.poll(Instant::now()) {
            draw_frame(&mut renderer, &mut canvas, &registry, &sprites, &maps, quality)?;
        }
    }

    pixmap_to_rgba(&canvas).save(&output)?;
    info!("Wrote {}", output);

    let stats = renderer.dispose();
    info!(
        "Blended tile cache hit rate: {:.0}%",
        stats.composites.hit_rate() * 100.0
    );
    Ok(())
}

fn draw_frame(
    renderer: &mut TileRenderer,
    canvas: &mut Pixmap,
    registry: &TileRegistry,
    sprites: &dyn SpriteLookup,
    maps: &TileMaps,
    quality: FrameQuality,
) -> Result<(), BlendError> {
    let (width, height) = (canvas.width(), canvas.height());
    renderer.render_background(canvas, width, height)?;

    let scene = RenderScene {
        registry,
        sprites,
        tiles: Some(maps),
        now: Instant::now(),
    };

    let mut outcomes: HashMap<DrawOutcome, usize> = HashMap::new();
    for layer in Layer::ALL {
        for ((x, y), tile) in maps.layer(layer).iter() {
            let mut request = TileDrawRequest::at_cell(tile, x, y, TILE_SIZE);
            request.layer = layer;
            let outcome = renderer.render_tile(canvas, &request, &scene);
            *outcomes.entry(outcome).or_default() += 1;
        }
    }

    info!("{:?} frame drawn: {:?}", quality, outcomes);
    Ok(())
}

fn sprite_palette() -> HashMap<&'static str, [u8; 3]> {
    HashMap::from([
        ("grass", [74, 140, 58]),
        ("dirt", [121, 85, 58]),
        ("sand", [214, 192, 140]),
        ("floor-stone-rough", [118, 116, 110]),
        ("floor-stone-smooth", [164, 162, 158]),
        ("floor-wood", [150, 104, 62]),
        ("wall", [70, 66, 64]),
        ("door", [110, 70, 40]),
    ])
}

/// A flat color with a little per-pixel grain
fn textured_sprite(color: [u8; 3], id: &str) -> RgbaImage {
    let salt = id.bytes().fold(7u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
    RgbaImage::from_fn(SPRITE_SIZE, SPRITE_SIZE, |x, y| {
        let grain = (x.wrapping_mul(73) ^ y.wrapping_mul(151) ^ salt) % 17;
        let shade = |c: u8| c.saturating_add(grain as u8).saturating_sub(8);
        Rgba([shade(color[0]), shade(color[1]), shade(color[2]), 255])
    })
}

fn build_map() -> TileMaps {
    let mut maps = TileMaps::new();
    for y in 0..MAP_HEIGHT {
        for x in 0..MAP_WIDTH {
            let tile = match (x, y) {
                (_, 0..=1) if x < 4 => "sand",
                (2..=6, 3..=6) => "floor-stone-rough",
                (8..=11, 4..=7) => "water",
                (3, _) | (_, 2) => "dirt",
                (7..=11, 0..=2) => "floor-wood",
                _ => "grass",
            };
            maps.set(Layer::Floor, x, y, tile);
        }
    }

    // A small hut around the stone floor
    for x in 2..=6 {
        maps.set(Layer::Walls, x, 3, "wall");
    }
    maps.set(Layer::Walls, 4, 3, "door");
    maps
}
