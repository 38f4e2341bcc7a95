//! Rendering of tile grids into pixels.
//!
//! **Sub-modules:**
//!
//! *   [`color`](crate::rendering::color): Defines the [`Color`](color::Color) struct, RGBA with alpha blending.
//! *   [`tile`](crate::rendering::tile): Defines the [`Tile`](tile::Tile) struct, one character cell with a cached content hash.
//! *   [`grid`](crate::rendering::grid): Defines the [`TileGrid`](grid::TileGrid) struct, a positioned 2D block of tiles.
//! *   [`shader`](crate::rendering::shader): Bitmap post-processing steps applied to rendered glyphs.
//! *   [`font`](crate::rendering::font): The [`GlyphFont`](font::GlyphFont) trait and sprite sheet fonts.
//! *   [`cache`](crate::rendering::cache): The [`ImageCache`](cache::ImageCache) of rendered glyph bitmaps.
//! *   [`surface`](crate::rendering::surface): Presentation surfaces and the in-memory frame buffer.
//! *   [`terminal`](crate::rendering::terminal): A surface that shows frames in a terminal.
//! *   [`blink`](crate::rendering::blink): The clock driving blinking tiles.
//! *   [`renderer`](crate::rendering::renderer): The screen render loop.
//!
//! **Rendering Process (Simplified):**
//!
//! 1.  Build a [`Scene`](crate::components::scene::Scene) with a screen and some widgets.
//! 2.  Create a [`ScreenRenderer`](renderer::ScreenRenderer) over a presentation surface and an image cache.
//! 3.  Mutate tiles. Every mutation updates the tile's hash.
//! 4.  Call [`ScreenRenderer::draw`](renderer::ScreenRenderer::draw). Positions whose combined hash
//!     changed since the last frame are painted from cached glyph bitmaps, then the frame is presented.

pub mod blink;
pub mod cache;
pub mod color;
pub mod font;
pub mod grid;
pub mod renderer;
pub mod shader;
pub mod surface;
pub mod terminal;
pub mod tile;

/// An RGBA bitmap, the pixel format of glyphs, rendered tiles and surfaces.
pub type Bitmap = image::RgbaImage;
