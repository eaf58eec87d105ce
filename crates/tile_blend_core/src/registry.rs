//! Tile type registry: the compatibility & priority model
//!
//! Metadata is resolved once when a tile type is registered. Lookups are
//! total: unknown tiles never blend and fall back to a category priority.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::tile::{BlendGroup, SpriteHandle, SurfaceClass, TileMetadata, TileTypeId, WALL_PRIORITY};

/// Errors that can occur when loading or editing a registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Duplicate tile type: {0}")]
    DuplicateTile(TileTypeId),
    #[error("Unknown tile type: {0}")]
    UnknownTile(TileTypeId),
}

/// Serializable definition of a tile type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileDefinition {
    pub id: TileTypeId,
    pub group: BlendGroup,
    /// Explicit priority; the group default is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    /// RGBA color drawn while the sprite is not loaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_color: Option<[u8; 4]>,
}

impl TileDefinition {
    pub fn new(id: impl Into<TileTypeId>, group: BlendGroup) -> Self {
        Self {
            id: id.into(),
            group,
            priority: None,
            fallback_color: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_fallback_color(mut self, color: [u8; 4]) -> Self {
        self.fallback_color = Some(color);
        self
    }
}

#[derive(Serialize, Deserialize)]
struct RegistryFile {
    tiles: Vec<TileDefinition>,
}

/// Typed registry mapping tile type ids to their blend metadata
#[derive(Debug, Clone, Default)]
pub struct TileRegistry {
    tiles: HashMap<TileTypeId, TileMetadata>,
    /// Definitions in registration order, kept for serialization
    order: Vec<TileTypeId>,
    /// Bumped on every mutation so caches can detect reconfiguration
    revision: u64,
}

impl TileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the stock tile palette
    pub fn with_default_tiles() -> Self {
        let mut registry = Self::new();
        let defaults = [
            TileDefinition::new("grass", BlendGroup::Natural).with_priority(1),
            TileDefinition::new("dirt", BlendGroup::Natural).with_priority(1),
            TileDefinition::new("sand", BlendGroup::Natural).with_priority(1),
            TileDefinition::new("water", BlendGroup::Natural)
                .with_priority(1)
                .with_fallback_color([52, 101, 164, 255]),
            TileDefinition::new("floor-stone-rough", BlendGroup::Stone).with_priority(2),
            TileDefinition::new("floor-stone-smooth", BlendGroup::Stone).with_priority(3),
            TileDefinition::new("floor-wood", BlendGroup::Wood).with_priority(4),
            TileDefinition::new("wall", BlendGroup::Wall),
            TileDefinition::new("door", BlendGroup::Special).with_priority(1),
            TileDefinition::new(TileTypeId::DELETE, BlendGroup::Special).with_priority(0),
        ];
        for def in defaults {
            // Stock ids are unique
            let _ = registry.register(def);
        }
        registry
    }

    /// Parse a registry from JSON of the form `{ "tiles": [ ... ] }`
    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile =
            serde_json::from_str(json).map_err(|e| RegistryError::Parse(e.to_string()))?;

        let mut registry = Self::new();
        for def in file.tiles {
            registry.register(def)?;
        }
        Ok(registry)
    }

    /// Serialize the registry's definitions to pretty JSON
    pub fn to_json_string(&self) -> Result<String, RegistryError> {
        let tiles = self
            .order
            .iter()
            .filter_map(|id| {
                self.tiles.get(id).map(|meta| TileDefinition {
                    id: id.clone(),
                    group: meta.group,
                    priority: Some(meta.priority),
                    fallback_color: Some(meta.fallback_color),
                })
            })
            .collect();
        serde_json::to_string_pretty(&RegistryFile { tiles })
            .map_err(|e| RegistryError::Parse(e.to_string()))
    }

    /// Register a tile type. Walls are pinned to [`WALL_PRIORITY`] and the
    /// empty/delete sentinel to 0.
    pub fn register(&mut self, def: TileDefinition) -> Result<(), RegistryError> {
        if self.tiles.contains_key(&def.id) {
            return Err(RegistryError::DuplicateTile(def.id));
        }

        let priority = if def.id.is_empty_sentinel() {
            0
        } else if def.group == BlendGroup::Wall {
            WALL_PRIORITY
        } else {
            def.priority.unwrap_or_else(|| def.group.default_priority())
        };

        let metadata = TileMetadata {
            group: def.group,
            priority,
            sprite: None,
            fallback_color: def
                .fallback_color
                .unwrap_or_else(|| def.group.fallback_color()),
        };

        self.order.push(def.id.clone());
        self.tiles.insert(def.id, metadata);
        self.revision += 1;
        Ok(())
    }

    /// Attach a loaded sprite to a tile type
    pub fn bind_sprite(&mut self, id: &TileTypeId, sprite: SpriteHandle) -> Result<(), RegistryError> {
        let meta = self
            .tiles
            .get_mut(id)
            .ok_or_else(|| RegistryError::UnknownTile(id.clone()))?;
        meta.sprite = Some(sprite);
        self.revision += 1;
        Ok(())
    }

    /// Change a tile's priority at runtime.
    ///
    /// Returns `Ok(false)` when nothing changed (same value, a wall, or the
    /// empty/delete sentinel, whose priorities are fixed).
    pub fn set_priority(&mut self, id: &TileTypeId, priority: i32) -> Result<bool, RegistryError> {
        let meta = self
            .tiles
            .get_mut(id)
            .ok_or_else(|| RegistryError::UnknownTile(id.clone()))?;

        if meta.group == BlendGroup::Wall
            || id.is_empty_sentinel()
            || meta.priority == priority
        {
            return Ok(false);
        }
        meta.priority = priority;
        self.revision += 1;
        Ok(true)
    }

    pub fn metadata(&self, id: &TileTypeId) -> Option<&TileMetadata> {
        self.tiles.get(id)
    }

    pub fn contains(&self, id: &TileTypeId) -> bool {
        self.tiles.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Registered ids in registration order
    pub fn ids(&self) -> impl Iterator<Item = &TileTypeId> {
        self.order.iter()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether `a` may blend with `b`.
    ///
    /// False for identical tiles and for any tile whose metadata cannot be
    /// resolved. Only floor surfaces blend, and only with other floors.
    pub fn can_blend(&self, a: &TileTypeId, b: &TileTypeId) -> bool {
        if a == b {
            return false;
        }
        match (self.tiles.get(a), self.tiles.get(b)) {
            (Some(ma), Some(mb)) => {
                ma.surface_class() == SurfaceClass::Floor && mb.surface_class() == SurfaceClass::Floor
            }
            _ => false,
        }
    }

    /// Blend priority of a tile; unknown tiles get their category default
    pub fn priority(&self, id: &TileTypeId) -> i32 {
        if let Some(meta) = self.tiles.get(id) {
            return meta.priority;
        }
        if id.is_empty_sentinel() {
            return 0;
        }
        BlendGroup::infer(id).default_priority()
    }
}
