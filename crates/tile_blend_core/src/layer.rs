//! Layers and sparse tile maps

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::tile::TileTypeId;

/// The layer a tile lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    #[default]
    Floor,
    Walls,
    Objects,
}

impl Layer {
    pub const ALL: [Layer; 3] = [Layer::Floor, Layer::Walls, Layer::Objects];

    fn index(self) -> usize {
        match self {
            Layer::Floor => 0,
            Layer::Walls => 1,
            Layer::Objects => 2,
        }
    }
}

/// Read access to a layered tile grid.
///
/// Implemented by [`TileMaps`]; an external map store can implement it
/// directly. Any coordinate that cannot be resolved is reported as `None`.
pub trait TileSource {
    fn tile_at(&self, layer: Layer, x: i32, y: i32) -> Option<&TileTypeId>;
}

/// Sparse tile grid for a single layer. Absent coordinates are empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileMap {
    tiles: HashMap<(i32, i32), TileTypeId>,
}

impl TileMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, x: i32, y: i32) -> Option<&TileTypeId> {
        self.tiles.get(&(x, y))
    }

    /// Set a tile, returning the one it replaced
    pub fn set(&mut self, x: i32, y: i32, tile: impl Into<TileTypeId>) -> Option<TileTypeId> {
        self.tiles.insert((x, y), tile.into())
    }

    /// Erase a tile, returning it if one was present
    pub fn erase(&mut self, x: i32, y: i32) -> Option<TileTypeId> {
        self.tiles.remove(&(x, y))
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ((i32, i32), &TileTypeId)> {
        self.tiles.iter().map(|(pos, tile)| (*pos, tile))
    }
}

/// The floor, walls and objects layers of a map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileMaps {
    layers: [TileMap; 3],
}

impl TileMaps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layer(&self, layer: Layer) -> &TileMap {
        &self.layers[layer.index()]
    }

    pub fn layer_mut(&mut self, layer: Layer) -> &mut TileMap {
        &mut self.layers[layer.index()]
    }

    /// Set a tile on a layer, returning the one it replaced
    pub fn set(
        &mut self,
        layer: Layer,
        x: i32,
        y: i32,
        tile: impl Into<TileTypeId>,
    ) -> Option<TileTypeId> {
        self.layer_mut(layer).set(x, y, tile)
    }

    /// Erase a tile on a layer, returning it if one was present
    pub fn erase(&mut self, layer: Layer, x: i32, y: i32) -> Option<TileTypeId> {
        self.layer_mut(layer).erase(x, y)
    }

    /// Wall positions, the view the visibility subsystem consumes
    pub fn wall_positions(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.layer(Layer::Walls).iter().map(|(pos, _)| pos)
    }
}

impl TileSource for TileMaps {
    fn tile_at(&self, layer: Layer, x: i32, y: i32) -> Option<&TileTypeId> {
        self.layer(layer).get(x, y)
    }
}
