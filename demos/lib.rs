//! tile_blend examples
//!
//! Run examples with:
//! ```bash
//! cargo run --example blend_preview -p tile_blend_demos
//! cargo run --example blend_preview -p tile_blend_demos -- blend.toml preview.png
//! ```

// No library code - this is just a container for examples
