//! Destination surfaces the renderer draws onto

use tiny_skia::{FilterQuality, Paint, Pixmap, PixmapPaint, Rect, Transform};

/// Something tiles can be drawn onto.
///
/// Coordinates are in destination pixels; `size` is the edge length of the
/// square target rect.
pub trait DrawSurface {
    /// Draw `image` scaled into the square at `(x, y)`
    fn draw_sprite(&mut self, image: &Pixmap, x: f32, y: f32, size: f32);

    /// Fill the square at `(x, y)` with an RGBA color
    fn fill_tile(&mut self, x: f32, y: f32, size: f32, color: [u8; 4]);

    /// Draw `image` unscaled with its top-left corner at `(x, y)`
    fn draw_image(&mut self, image: &Pixmap, x: i32, y: i32);
}

/// Transform that maps an image of `width`x`height` onto a square rect
pub(crate) fn fit_transform(width: u32, height: u32, x: f32, y: f32, size: f32) -> Transform {
    let sx = size / width.max(1) as f32;
    let sy = size / height.max(1) as f32;
    Transform::from_row(sx, 0.0, 0.0, sy, x, y)
}

impl DrawSurface for Pixmap {
    fn draw_sprite(&mut self, image: &Pixmap, x: f32, y: f32, size: f32) {
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..Default::default()
        };
        let transform = fit_transform(image.width(), image.height(), x, y, size);
        self.draw_pixmap(0, 0, image.as_ref(), &paint, transform, None);
    }

    fn fill_tile(&mut self, x: f32, y: f32, size: f32, color: [u8; 4]) {
        let Some(rect) = Rect::from_xywh(x, y, size, size) else {
            return;
        };
        let mut paint = Paint::default();
        paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
        self.fill_rect(rect, &paint, Transform::identity(), None);
    }

    fn draw_image(&mut self, image: &Pixmap, x: i32, y: i32) {
        self.draw_pixmap(x, y, image.as_ref(), &PixmapPaint::default(), Transform::identity(), None);
    }
}
