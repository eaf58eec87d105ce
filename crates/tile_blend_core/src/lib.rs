//! Core data structures for tile blending
//!
//! This crate provides the plain-data side of the blending pipeline:
//! - `TileTypeId` - Opaque tile type identifier with empty/delete sentinels
//! - `BlendGroup` / `SurfaceClass` - Coarse classification gating blending
//! - `TileRegistry` - Typed metadata table (compatibility & priority model)
//! - `Layer` / `TileMap` / `TileMaps` - Layered tile grids keyed by `(x, y)`
//! - `Direction` - The 8 compass neighbors
//!
//! This crate has no rendering dependency.

mod direction;
mod layer;
mod registry;
mod tile;

pub use direction::Direction;
pub use layer::{Layer, TileMap, TileMaps, TileSource};
pub use registry::{RegistryError, TileDefinition, TileRegistry};
pub use tile::{BlendGroup, SpriteHandle, SurfaceClass, TileMetadata, TileTypeId, WALL_PRIORITY};
