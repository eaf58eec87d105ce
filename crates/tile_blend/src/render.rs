//! Per-tile render dispatch
//!
//! [`TileRenderer::render_tile`] decides for each draw whether a tile is drawn
//! plain or blended, serves blended tiles from the composite cache when their
//! neighborhood is unchanged, and falls back to a plain draw whenever blending
//! cannot be done. Drawing never fails from the caller's point of view.

use std::time::Instant;

use tile_blend_core::{BlendGroup, Layer, TileRegistry, TileSource, TileTypeId};
use tracing::{trace, warn};

use crate::analyzer::{analyze, neighborhood_hash};
use crate::background::render_background;
use crate::cache::{BlendCacheContext, BlendCacheStats, CompositeKey};
use crate::compositor::{MaskCompositor, TileCompositor};
use crate::error::BlendError;
use crate::settings::BlendSettings;
use crate::sprites::SpriteLookup;
use crate::surface::DrawSurface;

/// One tile draw
#[derive(Debug, Clone)]
pub struct TileDrawRequest<'a> {
    pub tile_type: &'a TileTypeId,
    pub screen_x: f32,
    pub screen_y: f32,
    /// Edge length of the destination square in pixels
    pub size: u32,
    /// Map cell of the tile; without it the tile is always drawn plain
    pub coord: Option<(i32, i32)>,
    pub layer: Layer,
    /// Blend even when blending is globally disabled
    pub force_blend: bool,
}

impl<'a> TileDrawRequest<'a> {
    /// A floor tile at a map cell
    pub fn at_cell(tile_type: &'a TileTypeId, x: i32, y: i32, size: u32) -> Self {
        Self {
            tile_type,
            screen_x: (i64::from(x) * i64::from(size)) as f32,
            screen_y: (i64::from(y) * i64::from(size)) as f32,
            size,
            coord: Some((x, y)),
            layer: Layer::Floor,
            force_blend: false,
        }
    }
}

/// Everything outside the renderer that a draw reads
#[derive(Clone, Copy)]
pub struct RenderScene<'a> {
    pub registry: &'a TileRegistry,
    pub sprites: &'a dyn SpriteLookup,
    /// The map the tile belongs to; without it nothing is blended
    pub tiles: Option<&'a dyn TileSource>,
    pub now: Instant,
}

/// How a tile ended up on the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawOutcome {
    /// The unblended sprite
    Plain,
    /// A solid color, because no sprite is loaded
    Fallback,
    /// A blended tile from the composite cache
    Cached,
    /// A freshly composited blended tile
    Blended,
}

/// Draws tiles with organic blending against their neighbors
#[cfg_attr(feature = "bevy", derive(bevy::prelude::Resource))]
pub struct TileRenderer<C: TileCompositor = MaskCompositor> {
    settings: BlendSettings,
    compositor: C,
    caches: BlendCacheContext,
}

impl TileRenderer<MaskCompositor> {
    pub fn new(settings: BlendSettings) -> Self {
        let compositor = MaskCompositor::new(settings.neighbor_opacity);
        Self::with_compositor(settings, compositor)
    }
}

impl Default for TileRenderer<MaskCompositor> {
    fn default() -> Self {
        Self::new(BlendSettings::default())
    }
}

/// Solid color for a tile without a sprite
pub fn fallback_color(registry: &TileRegistry, tile: &TileTypeId) -> [u8; 4] {
    registry
        .metadata(tile)
        .map(|meta| meta.fallback_color)
        .unwrap_or_else(|| BlendGroup::infer(tile).fallback_color())
}

impl<C: TileCompositor> TileRenderer<C> {
    pub fn with_compositor(settings: BlendSettings, compositor: C) -> Self {
        let caches = BlendCacheContext::new(&settings.cache);
        Self {
            settings,
            compositor,
            caches,
        }
    }

    pub fn settings(&self) -> &BlendSettings {
        &self.settings
    }

    /// Replace the settings; cached blends are dropped since they may no
    /// longer match
    pub fn set_settings(&mut self, settings: BlendSettings) {
        self.caches = BlendCacheContext::new(&settings.cache);
        self.settings = settings;
    }

    pub fn set_blending_enabled(&mut self, enabled: bool) {
        self.settings.enabled = enabled;
    }

    pub fn compositor(&self) -> &C {
        &self.compositor
    }

    pub fn caches(&self) -> &BlendCacheContext {
        &self.caches
    }

    /// Draw one tile onto `surface`
    pub fn render_tile(
        &mut self,
        surface: &mut dyn DrawSurface,
        request: &TileDrawRequest,
        scene: &RenderScene,
    ) -> DrawOutcome {
        let blending = (self.settings.enabled || request.force_blend)
            && request.layer == self.settings.blend_layer;
        let (true, Some((x, y)), Some(tiles)) = (blending, request.coord, scene.tiles) else {
            return draw_plain(surface, request, scene);
        };

        self.caches.sync_registry(scene.registry.revision());
        self.caches.maintain(scene.now);

        let Some(base) = scene.sprites.sprite_for(request.tile_type) else {
            return draw_plain(surface, request, scene);
        };

        let (sx, sy, size) = (request.screen_x, request.screen_y, request.size as f32);
        let key = CompositeKey {
            tile: request.tile_type.clone(),
            x,
            y,
            size: request.size,
        };
        let neighborhood = neighborhood_hash(x, y, tiles);
        if let Some(image) = self.caches.composite(&key, neighborhood, scene.now) {
            surface.draw_sprite(image, sx, sy, size);
            return DrawOutcome::Cached;
        }

        let Some(plan) = analyze(
            x,
            y,
            tiles,
            request.layer,
            scene.registry,
            self.settings.max_priority_span,
        ) else {
            surface.draw_sprite(base, sx, sy, size);
            return DrawOutcome::Plain;
        };

        let mut masks = self.caches.mask_source(scene.now);
        match self
            .compositor
            .compose(base, &plan, request.size, scene.sprites, &mut masks)
        {
            Ok(image) => {
                trace!(
                    "Blended '{}' at ({}, {}) with {} neighbors",
                    plan.base_tile,
                    x,
                    y,
                    plan.blends.len()
                );
                surface.draw_sprite(&image, sx, sy, size);
                self.caches
                    .store_composite(key, neighborhood, image, scene.now);
                DrawOutcome::Blended
            }
            Err(err) => {
                warn!("Failed to blend tile at ({}, {}): {}", x, y, err);
                surface.draw_sprite(base, sx, sy, size);
                DrawOutcome::Plain
            }
        }
    }

    /// Draw the cached textured background covering `width`x`height`
    pub fn render_background(
        &mut self,
        surface: &mut dyn DrawSurface,
        width: u32,
        height: u32,
    ) -> Result<(), BlendError> {
        let image = self
            .caches
            .background(width, height, Instant::now(), || {
                render_background(width, height)
            })?;
        surface.draw_image(image, 0, 0);
        Ok(())
    }

    /// Invalidate blended tiles around a changed cell
    pub fn on_tile_changed(&mut self, x: i32, y: i32) {
        self.caches.on_tile_changed(x, y);
    }

    pub fn clear_caches(&mut self) {
        self.caches.clear();
    }

    /// Tear the renderer down, returning the final cache counters
    pub fn dispose(self) -> BlendCacheStats {
        self.caches.dispose()
    }
}

fn draw_plain(
    surface: &mut dyn DrawSurface,
    request: &TileDrawRequest,
    scene: &RenderScene,
) -> DrawOutcome {
    let (x, y, size) = (request.screen_x, request.screen_y, request.size as f32);
    match scene.sprites.sprite_for(request.tile_type) {
        Some(sprite) => {
            surface.draw_sprite(sprite, x, y, size);
            DrawOutcome::Plain
        }
        None => {
            surface.fill_tile(x, y, size, fallback_color(scene.registry, request.tile_type));
            DrawOutcome::Fallback
        }
    }
}
