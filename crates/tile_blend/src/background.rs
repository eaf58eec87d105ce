//! Textured canvas background

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tiny_skia::{Color, Paint, Pixmap, Rect, Transform};

use crate::error::BlendError;

const BASE_COLOR: [u8; 3] = [38, 41, 46];
/// One speckle per this many pixels
const SPECKLE_DENSITY: u32 = 48;

/// Render a speckled background of exactly `width`x`height`.
///
/// The pattern depends only on the size, so re-rendering after a cache
/// eviction gives the same image.
pub fn render_background(width: u32, height: u32) -> Result<Pixmap, BlendError> {
    let mut pixmap =
        Pixmap::new(width, height).ok_or(BlendError::SurfaceAllocation { width, height })?;
    let [r, g, b] = BASE_COLOR;
    pixmap.fill(Color::from_rgba8(r, g, b, 255));

    let seed = (u64::from(width) << 32) | u64::from(height);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut paint = Paint::default();

    let count = (u64::from(width) * u64::from(height) / u64::from(SPECKLE_DENSITY)) as usize;
    for _ in 0..count {
        let x = rng.gen_range(0..width) as f32;
        let y = rng.gen_range(0..height) as f32;
        let extent = if rng.gen_bool(0.15) { 2.0 } else { 1.0 };
        let Some(rect) = Rect::from_xywh(x, y, extent, extent) else {
            continue;
        };

        // Light or dark fleck at low opacity
        let shade = if rng.gen_bool(0.5) { 255 } else { 0 };
        let alpha = rng.gen_range(10..=28);
        paint.set_color_rgba8(shade, shade, shade, alpha);
        pixmap.fill_rect(rect, &paint, Transform::identity(), None);
    }

    Ok(pixmap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_size() {
        let background = render_background(40, 25).unwrap();
        assert_eq!((background.width(), background.height()), (40, 25));
        assert!(background.pixels().iter().all(|p| p.alpha() == 255));
    }

    #[test]
    fn test_deterministic() {
        let a = render_background(64, 64).unwrap();
        let b = render_background(64, 64).unwrap();
        assert_eq!(a.data(), b.data());
    }

    #[test]
    fn test_textured() {
        let background = render_background(64, 64).unwrap();
        let first = background.pixels()[0];
        assert!(background.pixels().iter().any(|p| *p != first));
    }

    #[test]
    fn test_zero_size_fails() {
        assert!(render_background(0, 10).is_err());
    }
}
