//! Procedural blend masks
//!
//! A mask is a square alpha image that is opaque near the edge (or corner)
//! facing the dominant neighbor and fades out toward the tile interior along
//! an organic, noise-perturbed boundary.
//!
//! Masks are a pure function of `(direction, strength, size)`. The noise is
//! drawn from a generator seeded with a hash of `"{direction}-{size}"`, so the
//! boundary curve is identical for every strength; strength only scales the
//! finished alpha.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f32::consts::TAU;
use tile_blend_core::Direction;
use tiny_skia::{
    BlendMode, Color, FillRule, GradientStop, LinearGradient, Paint, Path, PathBuilder, Pixmap,
    Point, RadialGradient, Rect, Shader, SpreadMode, Transform,
};

use crate::error::BlendError;

/// Boundary samples along a cardinal edge
const EDGE_SAMPLES: usize = 32;
/// Boundary samples around the arc of a diagonal mask
const ARC_SAMPLES: usize = 48;

/// Four-stop fade from the facing edge (opaque) to the interior (clear)
const FADE_STOPS: [(f32, f32); 4] = [(0.0, 1.0), (0.4, 0.8), (0.75, 0.35), (1.0, 0.0)];

/// 32-bit string hash used to seed mask noise
fn string_hash(s: &str) -> u32 {
    let mut hash: i32 = 0;
    for c in s.chars() {
        hash = hash.wrapping_shl(5).wrapping_sub(hash).wrapping_add(c as i32);
    }
    hash.unsigned_abs()
}

/// Seed for the mask noise of a direction and tile size
pub fn mask_seed(direction: Direction, size: u32) -> u32 {
    string_hash(&format!("{direction}-{size}"))
}

/// Generate the blend mask for a neighbor in `direction`.
///
/// `strength` is clamped to `[0, 1]`. Fails only for a zero `size`.
pub fn generate_mask(direction: Direction, strength: f32, size: u32) -> Result<Pixmap, BlendError> {
    let mut mask = Pixmap::new(size, size).ok_or(BlendError::SurfaceAllocation {
        width: size,
        height: size,
    })?;
    mask.fill(Color::WHITE);

    // Fresh generator per call; never shared between masks
    let mut rng = ChaCha8Rng::seed_from_u64(u64::from(mask_seed(direction, size)));
    let n = size as f32;

    let cutout = if direction.is_diagonal() {
        arc_cutout(n, &mut rng)
    } else {
        edge_cutout(direction, n, &mut rng)
    };
    if let Some(path) = cutout {
        let paint = Paint {
            shader: Shader::SolidColor(Color::BLACK),
            blend_mode: BlendMode::DestinationOut,
            anti_alias: true,
            ..Default::default()
        };
        mask.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }

    soften(&mut mask, direction, n);

    let strength = strength.clamp(0.0, 1.0);
    if strength < 1.0 {
        scale_alpha(&mut mask, strength);
    }
    Ok(mask)
}

/// Mean alpha of an image in `[0, 1]`
pub fn average_alpha(pixmap: &Pixmap) -> f32 {
    let pixels = pixmap.pixels();
    if pixels.is_empty() {
        return 0.0;
    }
    let total: u64 = pixels.iter().map(|p| u64::from(p.alpha())).sum();
    total as f32 / (pixels.len() as f32 * 255.0)
}

/// Two sine waves of different frequency plus per-sample jitter
struct Wave {
    base: f32,
    amp1: f32,
    freq1: f32,
    phase1: f32,
    amp2: f32,
    freq2: f32,
    phase2: f32,
    jitter: f32,
}

impl Wave {
    fn sample(&self, t: f32, rng: &mut impl Rng) -> f32 {
        self.base
            + self.amp1 * (TAU * self.freq1 * t + self.phase1).sin()
            + self.amp2 * (TAU * self.freq2 * t + self.phase2).sin()
            + rng.gen_range(-self.jitter..=self.jitter)
    }
}

/// Map a point given as (distance along the facing edge, depth into the
/// tile) to tile coordinates.
fn edge_point(direction: Direction, along: f32, depth: f32, n: f32) -> (f32, f32) {
    match direction {
        Direction::South => (along, n - depth),
        Direction::West => (depth, along),
        Direction::East => (n - depth, along),
        _ => (along, depth),
    }
}

/// Interior region beyond a wavy line running parallel to the facing edge
fn edge_cutout(direction: Direction, n: f32, rng: &mut impl Rng) -> Option<Path> {
    let wave = Wave {
        base: n * 0.35,
        amp1: n * 0.05,
        freq1: rng.gen_range(1.0..2.0),
        phase1: rng.gen_range(0.0..TAU),
        amp2: n * 0.025,
        freq2: rng.gen_range(2.5..4.0),
        phase2: rng.gen_range(0.0..TAU),
        jitter: n * 0.015,
    };

    let mut pb = PathBuilder::new();
    for i in 0..=EDGE_SAMPLES {
        let t = i as f32 / EDGE_SAMPLES as f32;
        let along = -1.0 + t * (n + 2.0);
        let (x, y) = edge_point(direction, along, wave.sample(t, rng), n);
        if i == 0 {
            pb.move_to(x, y);
        } else {
            pb.line_to(x, y);
        }
    }
    let (x, y) = edge_point(direction, n + 1.0, n + 1.0, n);
    pb.line_to(x, y);
    let (x, y) = edge_point(direction, -1.0, n + 1.0, n);
    pb.line_to(x, y);
    pb.close();
    pb.finish()
}

/// Wobbly disc around the tile center; what survives are the corners
fn arc_cutout(n: f32, rng: &mut impl Rng) -> Option<Path> {
    let center = n / 2.0;
    // Whole-number frequencies keep the closed curve continuous at TAU
    let wave = Wave {
        base: n * 0.45,
        amp1: n * 0.05,
        freq1: rng.gen_range(3..=5) as f32,
        phase1: rng.gen_range(0.0..TAU),
        amp2: n * 0.025,
        freq2: rng.gen_range(6..=9) as f32,
        phase2: rng.gen_range(0.0..TAU),
        jitter: n * 0.015,
    };

    let mut pb = PathBuilder::new();
    for i in 0..ARC_SAMPLES {
        let t = i as f32 / ARC_SAMPLES as f32;
        let radius = wave.sample(t, rng).max(0.0);
        let (sin, cos) = (TAU * t).sin_cos();
        let (x, y) = (center + radius * cos, center + radius * sin);
        if i == 0 {
            pb.move_to(x, y);
        } else {
            pb.line_to(x, y);
        }
    }
    pb.close();
    pb.finish()
}

fn fade_stops() -> Vec<GradientStop> {
    FADE_STOPS
        .iter()
        .map(|&(pos, alpha)| {
            GradientStop::new(pos, Color::from_rgba8(255, 255, 255, (alpha * 255.0).round() as u8))
        })
        .collect()
}

/// Fade the mask from the facing edge or corner toward the interior
fn soften(mask: &mut Pixmap, direction: Direction, n: f32) {
    let shader = if direction.is_diagonal() {
        let (dx, dy) = direction.offset();
        let corner = Point::from_xy(if dx > 0 { n } else { 0.0 }, if dy > 0 { n } else { 0.0 });
        RadialGradient::new(
            corner,
            corner,
            n * 0.6,
            fade_stops(),
            SpreadMode::Pad,
            Transform::identity(),
        )
    } else {
        let (sx, sy) = edge_point(direction, n / 2.0, 0.0, n);
        let (ex, ey) = edge_point(direction, n / 2.0, n / 2.0, n);
        LinearGradient::new(
            Point::from_xy(sx, sy),
            Point::from_xy(ex, ey),
            fade_stops(),
            SpreadMode::Pad,
            Transform::identity(),
        )
    };

    let (Some(shader), Some(rect)) = (shader, Rect::from_xywh(0.0, 0.0, n, n)) else {
        return;
    };
    let paint = Paint {
        shader,
        blend_mode: BlendMode::DestinationIn,
        ..Default::default()
    };
    mask.fill_rect(rect, &paint, Transform::identity(), None);
}

/// Multiply every alpha value by `factor`
fn scale_alpha(mask: &mut Pixmap, factor: f32) {
    let Some(rect) = Rect::from_xywh(0.0, 0.0, mask.width() as f32, mask.height() as f32) else {
        return;
    };
    let color = Color::from_rgba(1.0, 1.0, 1.0, factor).unwrap_or(Color::TRANSPARENT);
    let paint = Paint {
        shader: Shader::SolidColor(color),
        blend_mode: BlendMode::DestinationIn,
        ..Default::default()
    };
    mask.fill_rect(rect, &paint, Transform::identity(), None);
}
