//! Neighbor analysis: decides which neighbors blend into a tile
//!
//! Blending is one-directional. Among blend-compatible neighbors only one
//! with strictly greater priority dominates into the base tile, so a pair of
//! tiles never blends into each other simultaneously.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tile_blend_core::{Direction, Layer, TileRegistry, TileSource, TileTypeId};

/// Priority gap that maps to full blend strength.
///
/// Larger gaps saturate at 1.0 rather than rescaling to the actual priority
/// range of the registry.
pub const MAX_PRIORITY_SPAN: i32 = 10;

/// One neighbor blending into the base tile
#[derive(Debug, Clone, PartialEq)]
pub struct BlendEntry {
    pub direction: Direction,
    pub neighbor: TileTypeId,
    /// Blend strength in `[0, 1]`
    pub strength: f32,
}

/// Directional blend instructions for one base tile
#[derive(Debug, Clone, PartialEq)]
pub struct BlendPlan {
    pub base_tile: TileTypeId,
    /// Never empty; an empty plan is represented by `None`
    pub blends: Vec<BlendEntry>,
}

/// Compute the blend plan for the tile at `(x, y)` on `layer`.
///
/// Returns `None` when the cell is empty, holds the empty/delete sentinel,
/// or no neighbor dominates it.
pub fn analyze(
    x: i32,
    y: i32,
    source: &dyn TileSource,
    layer: Layer,
    registry: &TileRegistry,
    max_priority_span: i32,
) -> Option<BlendPlan> {
    let base = source.tile_at(layer, x, y)?;
    if base.is_empty_sentinel() {
        return None;
    }

    let base_priority = registry.priority(base);
    let span = max_priority_span.max(1) as f32;
    let mut blends = Vec::new();

    for direction in Direction::ALL {
        let Some(neighbor) = direction
            .step_from(x, y)
            .and_then(|(nx, ny)| source.tile_at(layer, nx, ny))
        else {
            continue;
        };
        if neighbor == base || !registry.can_blend(base, neighbor) {
            continue;
        }

        let priority_diff = registry.priority(neighbor) - base_priority;
        if priority_diff <= 0 {
            continue;
        }

        blends.push(BlendEntry {
            direction,
            neighbor: neighbor.clone(),
            strength: (priority_diff as f32 / span).min(1.0),
        });
    }

    if blends.is_empty() {
        None
    } else {
        Some(BlendPlan {
            base_tile: base.clone(),
            blends,
        })
    }
}

/// Content hash of the 3x3 window around `(x, y)` across all layers.
///
/// Empty cells hash differently from any tile, so erasing a neighbor changes
/// the hash just like painting one. Cells past the edge of the grid hash as
/// empty.
pub fn neighborhood_hash(x: i32, y: i32, source: &dyn TileSource) -> u64 {
    let mut hasher = DefaultHasher::new();
    for layer in Layer::ALL {
        for dy in -1..=1 {
            for dx in -1..=1 {
                x.checked_add(dx)
                    .zip(y.checked_add(dy))
                    .and_then(|(nx, ny)| source.tile_at(layer, nx, ny))
                    .map(TileTypeId::as_str)
                    .hash(&mut hasher);
            }
        }
    }
    hasher.finish()
}
