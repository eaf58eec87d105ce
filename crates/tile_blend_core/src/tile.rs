//! Tile type identifiers, blend groups and per-tile metadata

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Priority of wall tiles. Walls are pinned to this value.
pub const WALL_PRIORITY: i32 = 10;

/// Opaque tile type identifier (e.g. `"grass"`, `"floor-stone-rough"`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileTypeId(String);

impl TileTypeId {
    /// Sentinel painted by the eraser tool
    pub const DELETE: &'static str = "delete";
    /// Sentinel for an explicitly empty cell
    pub const EMPTY: &'static str = "empty";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this id is the designated empty/delete sentinel
    pub fn is_empty_sentinel(&self) -> bool {
        self.0 == Self::DELETE || self.0 == Self::EMPTY
    }
}

impl fmt::Display for TileTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TileTypeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TileTypeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Handle to a loaded sprite image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpriteHandle(pub Uuid);

impl SpriteHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SpriteHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Coarse classification fixed when a tile type is defined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendGroup {
    Natural,
    Stone,
    Wood,
    Wall,
    Special,
}

impl BlendGroup {
    /// The broad surface class this group belongs to
    pub fn surface_class(self) -> SurfaceClass {
        match self {
            BlendGroup::Natural | BlendGroup::Stone | BlendGroup::Wood => SurfaceClass::Floor,
            BlendGroup::Wall => SurfaceClass::Wall,
            BlendGroup::Special => SurfaceClass::Special,
        }
    }

    /// Priority used when a definition does not set one explicitly
    pub fn default_priority(self) -> i32 {
        self.surface_class().default_priority()
    }

    /// Solid color drawn when the tile's sprite is not loaded (RGBA)
    pub fn fallback_color(self) -> [u8; 4] {
        match self {
            BlendGroup::Natural => [86, 125, 70, 255],
            BlendGroup::Stone => [128, 128, 128, 255],
            BlendGroup::Wood => [133, 94, 66, 255],
            BlendGroup::Wall => [64, 64, 64, 255],
            BlendGroup::Special => [120, 80, 160, 255],
        }
    }

    /// Classify a tile id that was never registered.
    ///
    /// Only used on the fallback path; registered tiles carry their group.
    pub fn infer(id: &TileTypeId) -> Self {
        let s = id.as_str();
        if id.is_empty_sentinel() {
            BlendGroup::Special
        } else if s.starts_with("wall") {
            BlendGroup::Wall
        } else if s.contains("stone") {
            BlendGroup::Stone
        } else if s.contains("wood") {
            BlendGroup::Wood
        } else {
            BlendGroup::Natural
        }
    }
}

impl fmt::Display for BlendGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlendGroup::Natural => "natural",
            BlendGroup::Stone => "stone",
            BlendGroup::Wood => "wood",
            BlendGroup::Wall => "wall",
            BlendGroup::Special => "special",
        };
        f.write_str(name)
    }
}

/// Broad surface class. Only floors blend, and only with other floors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceClass {
    Floor,
    Wall,
    Special,
}

impl SurfaceClass {
    pub fn default_priority(self) -> i32 {
        match self {
            SurfaceClass::Floor => 2,
            SurfaceClass::Wall => WALL_PRIORITY,
            SurfaceClass::Special => 1,
        }
    }
}

/// Resolved metadata for a registered tile type
#[derive(Debug, Clone, PartialEq)]
pub struct TileMetadata {
    pub group: BlendGroup,
    pub priority: i32,
    pub sprite: Option<SpriteHandle>,
    /// RGBA color drawn when the sprite is missing
    pub fallback_color: [u8; 4],
}

impl TileMetadata {
    pub fn surface_class(&self) -> SurfaceClass {
        self.group.surface_class()
    }
}
