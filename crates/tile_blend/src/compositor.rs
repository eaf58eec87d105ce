//! Compositing a base sprite with masked neighbor sprites

use tile_blend_core::Direction;
use tiny_skia::{BlendMode, Color, Pixmap, PixmapPaint, Transform};
use tracing::debug;

use crate::analyzer::BlendPlan;
use crate::error::BlendError;
use crate::sprites::SpriteLookup;
use crate::surface::DrawSurface;

/// Provides blend masks, normally through the mask cache
pub trait MaskSource {
    fn mask(&mut self, direction: Direction, strength: f32, size: u32) -> Result<&Pixmap, BlendError>;
}

/// Produces a blended tile image from a base sprite and a blend plan
pub trait TileCompositor {
    fn compose(
        &mut self,
        base: &Pixmap,
        plan: &BlendPlan,
        size: u32,
        sprites: &dyn SpriteLookup,
        masks: &mut dyn MaskSource,
    ) -> Result<Pixmap, BlendError>;
}

/// Default compositor: masked neighbors drawn over the base with fixed
/// translucency, in plan order
#[derive(Debug, Clone)]
pub struct MaskCompositor {
    pub neighbor_opacity: f32,
}

impl Default for MaskCompositor {
    fn default() -> Self {
        Self {
            neighbor_opacity: 0.8,
        }
    }
}

impl MaskCompositor {
    pub fn new(neighbor_opacity: f32) -> Self {
        Self {
            neighbor_opacity: neighbor_opacity.clamp(0.0, 1.0),
        }
    }
}

fn allocate(size: u32) -> Result<Pixmap, BlendError> {
    Pixmap::new(size, size).ok_or(BlendError::SurfaceAllocation {
        width: size,
        height: size,
    })
}

impl TileCompositor for MaskCompositor {
    fn compose(
        &mut self,
        base: &Pixmap,
        plan: &BlendPlan,
        size: u32,
        sprites: &dyn SpriteLookup,
        masks: &mut dyn MaskSource,
    ) -> Result<Pixmap, BlendError> {
        let n = size as f32;
        let mut output = allocate(size)?;
        output.draw_sprite(base, 0.0, 0.0, n);

        let mut scratch = allocate(size)?;
        let intersect = PixmapPaint {
            blend_mode: BlendMode::DestinationIn,
            ..Default::default()
        };
        let overlay = PixmapPaint {
            opacity: self.neighbor_opacity,
            blend_mode: BlendMode::SourceOver,
            ..Default::default()
        };

        for entry in &plan.blends {
            let Some(neighbor) = sprites.sprite_for(&entry.neighbor) else {
                debug!(
                    "Skipping {} blend into '{}': no sprite for '{}'",
                    entry.direction, plan.base_tile, entry.neighbor
                );
                continue;
            };
            let mask = masks.mask(entry.direction, entry.strength, size)?;

            scratch.fill(Color::TRANSPARENT);
            scratch.draw_sprite(neighbor, 0.0, 0.0, n);
            scratch.draw_pixmap(0, 0, mask.as_ref(), &intersect, Transform::identity(), None);
            output.draw_pixmap(0, 0, scratch.as_ref(), &overlay, Transform::identity(), None);
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::BlendEntry;
    use crate::mask::generate_mask;
    use std::collections::HashMap;
    use tile_blend_core::TileTypeId;

    /// Generates masks on demand, keeping them for the borrow
    #[derive(Default)]
    struct Generated {
        masks: HashMap<(Direction, u32, u32), Pixmap>,
        calls: usize,
    }

    impl MaskSource for Generated {
        fn mask(
            &mut self,
            direction: Direction,
            strength: f32,
            size: u32,
        ) -> Result<&Pixmap, BlendError> {
            self.calls += 1;
            let key = (direction, (strength * 1000.0).round() as u32, size);
            if !self.masks.contains_key(&key) {
                self.masks.insert(key, generate_mask(direction, strength, size)?);
            }
            Ok(&self.masks[&key])
        }
    }

    struct Sprites(HashMap<TileTypeId, Pixmap>);

    impl SpriteLookup for Sprites {
        fn sprite_for(&self, tile: &TileTypeId) -> Option<&Pixmap> {
            self.0.get(tile)
        }
    }

    fn solid(r: u8, g: u8, b: u8, size: u32) -> Pixmap {
        let mut pixmap = Pixmap::new(size, size).unwrap();
        pixmap.fill(Color::from_rgba8(r, g, b, 255));
        pixmap
    }

    fn plan(entries: &[(Direction, &str, f32)]) -> BlendPlan {
        BlendPlan {
            base_tile: "grass".into(),
            blends: entries
                .iter()
                .map(|(direction, neighbor, strength)| BlendEntry {
                    direction: *direction,
                    neighbor: (*neighbor).into(),
                    strength: *strength,
                })
                .collect(),
        }
    }

    #[test]
    fn test_neighbor_bleeds_in_from_its_edge() {
        let base = solid(255, 0, 0, 16);
        let sprites = Sprites(HashMap::from([("stone".into(), solid(0, 0, 255, 16))]));
        let mut masks = Generated::default();

        let out = MaskCompositor::default()
            .compose(&base, &plan(&[(Direction::East, "stone", 1.0)]), 32, &sprites, &mut masks)
            .unwrap();

        assert_eq!((out.width(), out.height()), (32, 32));
        let east = out.pixel(31, 16).unwrap();
        assert!(east.blue() > 100, "east edge should show the neighbor");
        assert!(east.red() < 255);

        let west = out.pixel(0, 16).unwrap();
        assert!(west.red() >= 250 && west.blue() <= 2);
        assert_eq!(west.alpha(), 255);
    }

    #[test]
    fn test_neighbor_never_fully_covers_base() {
        let base = solid(255, 0, 0, 8);
        let sprites = Sprites(HashMap::from([("stone".into(), solid(0, 0, 255, 8))]));
        let mut masks = Generated::default();

        let out = MaskCompositor::default()
            .compose(&base, &plan(&[(Direction::North, "stone", 1.0)]), 32, &sprites, &mut masks)
            .unwrap();

        // 0.8 opacity leaves some of the base visible even at the edge
        assert!(out.pixel(16, 0).unwrap().red() > 0);
    }

    #[test]
    fn test_missing_neighbor_sprite_is_skipped() {
        let base = solid(0, 255, 0, 32);
        let sprites = Sprites(HashMap::from([("stone".into(), solid(0, 0, 255, 32))]));
        let mut masks = Generated::default();

        let out = MaskCompositor::default()
            .compose(
                &base,
                &plan(&[(Direction::West, "missing", 1.0), (Direction::East, "stone", 0.5)]),
                32,
                &sprites,
                &mut masks,
            )
            .unwrap();

        assert_eq!(masks.calls, 1);
        let west = out.pixel(0, 16).unwrap();
        assert!(west.green() >= 250 && west.blue() <= 2);
        assert!(out.pixel(31, 16).unwrap().blue() > 0);
    }

    #[test]
    fn test_no_sprites_yields_scaled_base() {
        let base = solid(10, 20, 30, 4);
        let sprites = Sprites(HashMap::new());
        let mut masks = Generated::default();

        let out = MaskCompositor::default()
            .compose(&base, &plan(&[(Direction::South, "stone", 1.0)]), 16, &sprites, &mut masks)
            .unwrap();

        let expected = solid(10, 20, 30, 16);
        for (a, b) in out.data().iter().zip(expected.data()) {
            assert!(a.abs_diff(*b) <= 1);
        }
    }

    #[test]
    fn test_composite_is_deterministic() {
        let base = solid(200, 180, 40, 16);
        let sprites = Sprites(HashMap::from([
            ("stone".into(), solid(90, 90, 90, 16)),
            ("wood".into(), solid(120, 80, 40, 16)),
        ]));
        let plan = plan(&[(Direction::NorthEast, "stone", 0.3), (Direction::South, "wood", 0.6)]);

        let a = MaskCompositor::default()
            .compose(&base, &plan, 24, &sprites, &mut Generated::default())
            .unwrap();
        let b = MaskCompositor::default()
            .compose(&base, &plan, 24, &sprites, &mut Generated::default())
            .unwrap();
        assert_eq!(a.data(), b.data());
    }

    #[test]
    fn test_zero_size_fails() {
        let base = solid(1, 2, 3, 4);
        let result = MaskCompositor::default().compose(
            &base,
            &plan(&[]),
            0,
            &Sprites(HashMap::new()),
            &mut Generated::default(),
        );
        assert!(matches!(result, Err(BlendError::SurfaceAllocation { .. })));
    }
}
