//! Glyph sources.
//!
//! The renderer is monospaced: every glyph of a [`GlyphFont`] has the same pixel size, which
//! is also the size of one grid cell. Glyph bitmaps are uncolored templates. Pixels that are
//! fully transparent or pure black mark the background; every other pixel is ink and gets
//! painted in the tile's foreground color by the [`ImageCache`].
//!
//! [`ImageCache`]: crate::rendering::cache::ImageCache

use crate::error::FontError;
use crate::rendering::Bitmap;
use image::{GenericImageView, Rgba};
use std::collections::HashMap;

/// A monospaced set of glyph bitmaps.
pub trait GlyphFont {
    /// Width and height of every glyph, in pixels.
    fn glyph_size(&self) -> (u32, u32);

    /// The glyph template for `c`, or `None` if the font has no glyph for it.
    fn glyph(&self, c: char) -> Option<&Bitmap>;
}

/// Returns whether the template pixel marks background rather than ink.
pub fn is_background_marker(pixel: &Rgba<u8>) -> bool {
    let [r, g, b, a] = pixel.0;
    a == 0 || (r == 0 && g == 0 && b == 0)
}

/// A font cut out of a sprite sheet.
///
/// The sheet is a grid of equally sized glyphs, read row by row.
///
/// # Example
///
/// ```rust
/// use asciiterm::rendering::font::{GlyphFont, SpriteSheetFont};
/// use image::{Rgba, RgbaImage};
///
/// // two 2x2 glyphs side by side
/// let mut sheet = RgbaImage::new(4, 2);
/// sheet.put_pixel(0, 0, Rgba([255, 255, 255, 255]));
/// let font = SpriteSheetFont::from_sheet(&sheet, 2, 2, ['a', 'b']).unwrap();
///
/// assert_eq!(font.glyph_size(), (2, 2));
/// assert!(font.glyph('a').is_some());
/// assert!(font.glyph('c').is_none());
/// ```
#[derive(Debug, Clone)]
pub struct SpriteSheetFont {
    glyph_width: u32,
    glyph_height: u32,
    glyphs: HashMap<char, Bitmap>,
}

impl SpriteSheetFont {
    /// Creates a font without any glyphs.
    pub fn new(glyph_width: u32, glyph_height: u32) -> Result<Self, FontError> {
        if glyph_width == 0 || glyph_height == 0 {
            return Err(FontError::InvalidGlyphSize {
                width: glyph_width,
                height: glyph_height,
            });
        }
        Ok(Self {
            glyph_width,
            glyph_height,
            glyphs: HashMap::new(),
        })
    }

    /// Cuts glyphs out of `sheet`, assigning `chars` to the cells in row-major order.
    ///
    /// Assignment stops at whichever runs out first, the characters or the sheet cells.
    pub fn from_sheet(
        sheet: &Bitmap,
        glyph_width: u32,
        glyph_height: u32,
        chars: impl IntoIterator<Item = char>,
    ) -> Result<Self, FontError> {
        let mut font = Self::new(glyph_width, glyph_height)?;
        let columns = sheet.width() / glyph_width;
        let rows = sheet.height() / glyph_height;
        if columns == 0 || rows == 0 {
            return Err(FontError::SheetTooSmall {
                sheet_width: sheet.width(),
                sheet_height: sheet.height(),
                glyph_width,
                glyph_height,
            });
        }

        let cells = (0..rows).flat_map(|row| (0..columns).map(move |col| (col, row)));
        for (c, (col, row)) in chars.into_iter().zip(cells) {
            let glyph = sheet
                .view(col * glyph_width, row * glyph_height, glyph_width, glyph_height)
                .to_image();
            font.glyphs.insert(c, glyph);
        }
        log::debug!(
            "loaded {} glyphs of {}x{} from sprite sheet",
            font.glyphs.len(),
            glyph_width,
            glyph_height
        );
        Ok(font)
    }

    /// Cuts a code page sheet, where cell `n` holds the glyph for the code point `n`.
    ///
    /// This is the layout of the classic 16x16 CP437 style tilesets.
    pub fn from_code_page(sheet: &Bitmap, glyph_width: u32, glyph_height: u32) -> Result<Self, FontError> {
        Self::from_sheet(sheet, glyph_width, glyph_height, (0u32..).map_while(char::from_u32))
    }

    /// Adds or replaces a single glyph.
    pub fn insert_glyph(&mut self, c: char, glyph: Bitmap) -> Result<(), FontError> {
        if glyph.dimensions() != (self.glyph_width, self.glyph_height) {
            return Err(FontError::GlyphSizeMismatch {
                character: c,
                expected: (self.glyph_width, self.glyph_height),
                actual: glyph.dimensions(),
            });
        }
        self.glyphs.insert(c, glyph);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

impl GlyphFont for SpriteSheetFont {
    fn glyph_size(&self) -> (u32, u32) {
        (self.glyph_width, self.glyph_height)
    }

    fn glyph(&self, c: char) -> Option<&Bitmap> {
        self.glyphs.get(&c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_glyph_size_is_rejected() {
        assert!(matches!(
            SpriteSheetFont::new(0, 8),
            Err(FontError::InvalidGlyphSize { width: 0, height: 8 })
        ));
    }

    #[test]
    fn test_sheet_smaller_than_glyph() {
        let sheet = Bitmap::new(3, 3);
        assert!(matches!(
            SpriteSheetFont::from_sheet(&sheet, 4, 4, ['a']),
            Err(FontError::SheetTooSmall { .. })
        ));
    }

    #[test]
    fn test_sheet_cells_are_row_major() {
        let mut sheet = Bitmap::new(4, 4);
        // mark the top-left pixel of the third cell (col 0, row 1)
        sheet.put_pixel(0, 2, Rgba([255, 255, 255, 255]));
        let font = SpriteSheetFont::from_sheet(&sheet, 2, 2, "abcdef".chars()).unwrap();

        assert_eq!(font.len(), 4);
        assert_eq!(*font.glyph('c').unwrap().get_pixel(0, 0), Rgba([255, 255, 255, 255]));
        assert!(is_background_marker(font.glyph('a').unwrap().get_pixel(0, 0)));
        assert!(font.glyph('e').is_none());
    }

    #[test]
    fn test_code_page_layout() {
        let sheet = Bitmap::new(16, 2);
        let font = SpriteSheetFont::from_code_page(&sheet, 1, 1).unwrap();
        assert_eq!(font.len(), 32);
        assert!(font.glyph('\u{1f}').is_some());
        assert!(font.glyph(' ').is_none());
    }

    #[test]
    fn test_insert_glyph_checks_size() {
        let mut font = SpriteSheetFont::new(2, 2).unwrap();
        assert!(font.insert_glyph('a', Bitmap::new(2, 2)).is_ok());
        assert!(matches!(
            font.insert_glyph('b', Bitmap::new(3, 2)),
            Err(FontError::GlyphSizeMismatch { character: 'b', .. })
        ));
    }
}
