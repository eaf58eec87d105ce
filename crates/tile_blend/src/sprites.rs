//! Loaded sprite images, keyed by [`SpriteHandle`]
//!
//! Sprites arrive as decoded `image::RgbaImage`s and are stored as
//! premultiplied pixmaps, the format every later drawing step works in.

use image::RgbaImage;
use std::collections::HashMap;
use tile_blend_core::{SpriteHandle, TileRegistry, TileTypeId};
use tiny_skia::{ColorU8, Pixmap};

use crate::error::BlendError;

/// Resolves a tile type to its sprite, if one is loaded
pub trait SpriteLookup {
    fn sprite_for(&self, tile: &TileTypeId) -> Option<&Pixmap>;

    /// Like [`sprite_for`](Self::sprite_for), but a missing sprite is an error
    fn require_sprite(&self, tile: &TileTypeId) -> Result<&Pixmap, BlendError> {
        self.sprite_for(tile)
            .ok_or_else(|| BlendError::MissingSprite(tile.clone()))
    }
}

/// Convert a straight-alpha RGBA image into a premultiplied pixmap
pub fn pixmap_from_rgba(image: &RgbaImage) -> Result<Pixmap, BlendError> {
    let (width, height) = image.dimensions();
    let mut pixmap =
        Pixmap::new(width, height).ok_or(BlendError::SurfaceAllocation { width, height })?;

    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

/// Convert a premultiplied pixmap back into a straight-alpha RGBA image
pub fn pixmap_to_rgba(pixmap: &Pixmap) -> RgbaImage {
    let mut image = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        dst.0 = [c.red(), c.green(), c.blue(), c.alpha()];
    }
    image
}

/// In-memory sprite storage
#[derive(Debug, Default)]
pub struct SpriteStore {
    sprites: HashMap<SpriteHandle, Pixmap>,
}

impl SpriteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a decoded image under a fresh handle
    pub fn insert_rgba(&mut self, image: &RgbaImage) -> Result<SpriteHandle, BlendError> {
        let pixmap = pixmap_from_rgba(image)?;
        Ok(self.insert_pixmap(pixmap))
    }

    /// Store an already premultiplied pixmap under a fresh handle
    pub fn insert_pixmap(&mut self, pixmap: Pixmap) -> SpriteHandle {
        let handle = SpriteHandle::new();
        self.sprites.insert(handle, pixmap);
        handle
    }

    pub fn get(&self, handle: SpriteHandle) -> Option<&Pixmap> {
        self.sprites.get(&handle)
    }

    pub fn remove(&mut self, handle: SpriteHandle) -> Option<Pixmap> {
        self.sprites.remove(&handle)
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

/// Sprite lookup through the registry's sprite bindings
#[derive(Clone, Copy)]
pub struct RegistrySprites<'a> {
    pub registry: &'a TileRegistry,
    pub store: &'a SpriteStore,
}

impl SpriteLookup for RegistrySprites<'_> {
    fn sprite_for(&self, tile: &TileTypeId) -> Option<&Pixmap> {
        let handle = self.registry.metadata(tile)?.sprite?;
        self.store.get(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_rgba_conversion_round_trip_opaque() {
        let image = RgbaImage::from_pixel(3, 2, Rgba([10, 200, 30, 255]));
        let pixmap = pixmap_from_rgba(&image).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (3, 2));
        assert_eq!(pixmap_to_rgba(&pixmap), image);
    }

    #[test]
    fn test_premultiplies_alpha() {
        let image = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 128]));
        let pixmap = pixmap_from_rgba(&image).unwrap();
        let px = pixmap.pixel(0, 0).unwrap();
        assert_eq!(px.alpha(), 128);
        assert!(px.red() <= 128);
    }

    #[test]
    fn test_empty_image_is_an_error() {
        let image = RgbaImage::new(0, 0);
        assert!(matches!(
            pixmap_from_rgba(&image),
            Err(BlendError::SurfaceAllocation { .. })
        ));
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = TileRegistry::with_default_tiles();
        let mut store = SpriteStore::new();
        let handle = store
            .insert_rgba(&RgbaImage::from_pixel(4, 4, Rgba([0, 255, 0, 255])))
            .unwrap();
        registry.bind_sprite(&"grass".into(), handle).unwrap();

        let lookup = RegistrySprites {
            registry: &registry,
            store: &store,
        };
        assert!(lookup.sprite_for(&"grass".into()).is_some());
        assert!(lookup.sprite_for(&"dirt".into()).is_none());
        assert!(lookup.sprite_for(&"lava".into()).is_none());
        assert!(matches!(
            lookup.require_sprite(&"dirt".into()),
            Err(BlendError::MissingSprite(tile)) if tile.as_str() == "dirt"
        ));
    }
}
