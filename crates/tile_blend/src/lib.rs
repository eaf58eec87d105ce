//! Organic tile blending for the map editor canvas
//!
//! This crate turns hard tile edges into soft, noise-perturbed transitions:
//! - `analyzer` - decides which neighbors blend into a tile, and how strongly
//! - `mask` - procedural alpha masks per direction and strength
//! - `compositor` - draws masked neighbor sprites over a base sprite
//! - `cache` - bounded LRU caches for masks, blended tiles and backgrounds
//! - `render` - the per-tile draw entry point used by the canvas
//! - `frame` - redraw throttling during zoom and pan
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Instant;
//! use tile_blend::{RegistrySprites, RenderScene, TileDrawRequest, TileRenderer};
//! use tile_blend_core::{Layer, TileMaps, TileRegistry, TileTypeId};
//!
//! let registry = TileRegistry::with_default_tiles();
//! let mut maps = TileMaps::new();
//! maps.set(Layer::Floor, 0, 0, "grass");
//! maps.set(Layer::Floor, 1, 0, "floor-stone-rough");
//!
//! let sprites = RegistrySprites { registry: &registry, store: &store };
//! let scene = RenderScene {
//!     registry: &registry,
//!     sprites: &sprites,
//!     tiles: Some(&maps),
//!     now: Instant::now(),
//! };
//!
//! let mut renderer = TileRenderer::new(settings);
//! let grass = TileTypeId::from("grass");
//! renderer.render_tile(&mut canvas, &TileDrawRequest::at_cell(&grass, 0, 0, 32), &scene);
//! ```

pub mod analyzer;
pub mod background;
pub mod cache;
pub mod compositor;
mod error;
pub mod frame;
pub mod mask;
pub mod render;
pub mod settings;
pub mod sprites;
pub mod surface;

pub use analyzer::{analyze, neighborhood_hash, BlendEntry, BlendPlan, MAX_PRIORITY_SPAN};
pub use cache::{BlendCacheContext, BlendCacheStats, CacheStats, LruCache};
pub use compositor::{MaskCompositor, MaskSource, TileCompositor};
pub use error::BlendError;
pub use frame::{FrameQuality, FrameScheduler};
pub use mask::generate_mask;
pub use render::{DrawOutcome, RenderScene, TileDrawRequest, TileRenderer};
pub use settings::{BlendSettings, CacheSettings, FrameSettings, SettingsError};
pub use sprites::{RegistrySprites, SpriteLookup, SpriteStore};
pub use surface::DrawSurface;

// Re-export the data model
pub use tile_blend_core;
