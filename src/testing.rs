//! Fixtures shared by the unit tests.

use crate::rendering::Bitmap;
use crate::rendering::cache::{CacheConfig, ImageCache};
use crate::rendering::font::SpriteSheetFont;
use image::Rgba;
use std::num::NonZeroUsize;

pub const INK: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// 2x2 glyphs for 'a'..='z', each with ink in the top-left pixel only.
pub fn test_font() -> SpriteSheetFont {
    let mut font = SpriteSheetFont::new(2, 2).unwrap();
    for c in 'a'..='z' {
        let mut glyph = Bitmap::new(2, 2);
        glyph.put_pixel(0, 0, INK);
        font.insert_glyph(c, glyph).unwrap();
    }
    font
}

pub fn test_cache() -> ImageCache {
    ImageCache::new(
        Box::new(test_font()),
        CacheConfig {
            capacity: NonZeroUsize::new(64).unwrap(),
            expire_after: None,
        },
    )
}

/// Routes `log` output of the code under test to the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
