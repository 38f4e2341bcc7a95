//! Color representation for tile rendering.

use image::Rgba;
use serde::{Deserialize, Serialize};

/// An RGBA color with 8 bits per channel.
///
/// Alpha is straight (not premultiplied). A fully opaque color has `a == 255`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    /// Used to flag tiles that could not be rendered.
    pub const MAGENTA: Color = Color::rgb(255, 0, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    /// Creates an opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Returns whether the color is fully opaque.
    pub fn is_opaque(self) -> bool {
        self.a == 255
    }

    /// Composites `self` over `background` (source-over).
    ///
    /// ```rust
    /// use asciiterm::rendering::color::Color;
    ///
    /// let half_white = Color::rgba(255, 255, 255, 128);
    /// let blended = half_white.blend_over(Color::BLACK);
    /// assert_eq!(blended.a, 255);
    /// assert_eq!(blended.r, 128);
    /// ```
    pub fn blend_over(self, background: Color) -> Color {
        match self.a {
            255 => return self,
            0 => return background,
            _ => {}
        }
        let src_a = self.a as u32;
        let dst_a = background.a as u32 * (255 - src_a) / 255;
        let out_a = src_a + dst_a;
        if out_a == 0 {
            return Color::TRANSPARENT;
        }
        let channel = |src: u8, dst: u8| -> u8 {
            ((src as u32 * src_a + dst as u32 * dst_a + out_a / 2) / out_a) as u8
        };
        Color {
            r: channel(self.r, background.r),
            g: channel(self.g, background.g),
            b: channel(self.b, background.b),
            a: out_a as u8,
        }
    }

    /// Inverts the color channels, keeping alpha.
    pub fn inverted(self) -> Color {
        Color {
            r: 255 - self.r,
            g: 255 - self.g,
            b: 255 - self.b,
            a: self.a,
        }
    }

    /// Multiplies each channel with the corresponding channel of `tint`.
    pub fn tinted(self, tint: Color) -> Color {
        let mul = |a: u8, b: u8| ((a as u16 * b as u16 + 127) / 255) as u8;
        Color {
            r: mul(self.r, tint.r),
            g: mul(self.g, tint.g),
            b: mul(self.b, tint.b),
            a: mul(self.a, tint.a),
        }
    }

    /// The RGB triple, dropping alpha.
    pub fn to_rgb(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Color::rgb(r, g, b)
    }
}

impl From<[u8; 4]> for Color {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Color::rgba(r, g, b, a)
    }
}

impl From<Color> for Rgba<u8> {
    fn from(color: Color) -> Self {
        Rgba([color.r, color.g, color.b, color.a])
    }
}

impl From<Rgba<u8>> for Color {
    fn from(Rgba([r, g, b, a]): Rgba<u8>) -> Self {
        Color::rgba(r, g, b, a)
    }
}

impl From<Color> for crossterm::style::Color {
    fn from(color: Color) -> Self {
        crossterm::style::Color::Rgb {
            r: color.r,
            g: color.g,
            b: color.b,
        }
    }
}
