//! Blending settings
//!
//! Settings are plain serde structs with per-field defaults, so a partial
//! TOML file only overrides what it names:
//!
//! ```toml
//! enabled = true
//! neighbor_opacity = 0.8
//!
//! [cache]
//! composite_capacity = 8192
//! ttl_secs = 120
//!
//! [frame]
//! target_fps = 60
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tile_blend_core::Layer;

use crate::analyzer::MAX_PRIORITY_SPAN;

/// Error type for settings loading failures
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Global blending configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[cfg_attr(feature = "bevy", derive(bevy::prelude::Resource))]
pub struct BlendSettings {
    /// Global blending switch; `force_blend` on a request overrides it
    pub enabled: bool,
    /// The only layer whose tiles get blended
    pub blend_layer: Layer,
    /// Priority gap that maps to full blend strength
    pub max_priority_span: i32,
    /// Opacity of masked neighbor sprites drawn over the base
    pub neighbor_opacity: f32,
    pub cache: CacheSettings,
    pub frame: FrameSettings,
}

impl Default for BlendSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            blend_layer: Layer::Floor,
            max_priority_span: MAX_PRIORITY_SPAN,
            neighbor_opacity: 0.8,
            cache: CacheSettings::default(),
            frame: FrameSettings::default(),
        }
    }
}

impl BlendSettings {
    /// Parse settings from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save settings to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}

/// Capacity and lifetime limits shared by the three caches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub mask_capacity: usize,
    pub composite_capacity: usize,
    pub background_capacity: usize,
    /// Entries unused for this long are purged by the periodic sweep
    pub ttl_secs: u64,
    /// Minimum time between two sweeps
    pub sweep_interval_secs: u64,
    /// Fraction of capacity kept after an over-capacity eviction
    pub retain_ratio: f32,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            mask_capacity: 512,
            composite_capacity: 4096,
            background_capacity: 4,
            ttl_secs: 300,
            sweep_interval_secs: 30,
            retain_ratio: 0.8,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Redraw throttling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameSettings {
    /// Steady-state frame rate cap
    pub target_fps: u32,
    /// Frame rate cap during continuous interaction (zooming, panning)
    pub interaction_fps: u32,
    /// Quiet time after the last interaction before the full-quality redraw
    pub settle_delay_ms: u64,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            target_fps: 60,
            interaction_fps: 20,
            settle_delay_ms: 150,
        }
    }
}
