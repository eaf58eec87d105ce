//! Errors raised inside the blending pipeline
//!
//! None of these escape [`TileRenderer::render_tile`](crate::TileRenderer::render_tile);
//! the renderer logs them and falls back to drawing a plain tile.

use thiserror::Error;
use tile_blend_core::TileTypeId;

#[derive(Debug, Error)]
pub enum BlendError {
    #[error("Cannot allocate a {width}x{height} drawing surface")]
    SurfaceAllocation { width: u32, height: u32 },
    #[error("No sprite loaded for tile type: {0}")]
    MissingSprite(TileTypeId),
}
