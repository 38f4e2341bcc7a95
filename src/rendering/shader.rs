//! Composable bitmap transforms applied to glyphs before they are cached.
//!
//! A [`Shader`] takes a fully colored glyph bitmap and returns a new one. Tiles carry an
//! ordered [`ShaderChain`]; the chain takes part in the tile's content hash, so every shader
//! must be deterministic: the same input bitmap always produces the same output.

use crate::rendering::Bitmap;
use crate::rendering::color::Color;
use image::imageops;
use smallvec::SmallVec;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A user supplied shader.
///
/// Custom shaders are identified by their name: two custom shaders with the same name are
/// considered equal and hash the same, so the name must uniquely describe the transform.
#[derive(Clone)]
pub struct CustomShader {
    name: Arc<str>,
    func: Arc<dyn Fn(&mut Bitmap) + Send + Sync>,
}

impl CustomShader {
    pub fn new(name: impl Into<Arc<str>>, func: impl Fn(&mut Bitmap) + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CustomShader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CustomShader({:?})", self.name)
    }
}

impl PartialEq for CustomShader {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for CustomShader {}

impl Hash for CustomShader {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// A single bitmap transform.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Shader {
    /// Mirrors the glyph along the vertical axis.
    FlipHorizontal,
    /// Mirrors the glyph along the horizontal axis.
    FlipVertical,
    /// Inverts every color channel, keeping alpha.
    Invert,
    /// Multiplies every pixel with the given color.
    Tint(Color),
    /// Replaces every pixel of exactly `from` with `to`.
    SwapColor { from: Color, to: Color },
    Custom(CustomShader),
}

impl Shader {
    /// A short name describing the shader.
    pub fn name(&self) -> &str {
        match self {
            Shader::FlipHorizontal => "flip-horizontal",
            Shader::FlipVertical => "flip-vertical",
            Shader::Invert => "invert",
            Shader::Tint(_) => "tint",
            Shader::SwapColor { .. } => "swap-color",
            Shader::Custom(custom) => custom.name(),
        }
    }

    /// Runs the shader on `bitmap` and returns the transformed bitmap.
    pub fn run(&self, mut bitmap: Bitmap) -> Bitmap {
        match self {
            Shader::FlipHorizontal => imageops::flip_horizontal_in_place(&mut bitmap),
            Shader::FlipVertical => imageops::flip_vertical_in_place(&mut bitmap),
            Shader::Invert => map_pixels(&mut bitmap, Color::inverted),
            Shader::Tint(tint) => map_pixels(&mut bitmap, |c| c.tinted(*tint)),
            Shader::SwapColor { from, to } => {
                map_pixels(&mut bitmap, |c| if c == *from { *to } else { c })
            }
            Shader::Custom(custom) => (custom.func)(&mut bitmap),
        }
        bitmap
    }
}

fn map_pixels(bitmap: &mut Bitmap, f: impl Fn(Color) -> Color) {
    for pixel in bitmap.pixels_mut() {
        *pixel = f(Color::from(*pixel)).into();
    }
}

/// An ordered list of shaders. Order is significant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ShaderChain {
    shaders: SmallVec<[Shader; 2]>,
}

impl ShaderChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shader> {
        self.shaders.iter()
    }

    pub fn contains(&self, shader: &Shader) -> bool {
        self.shaders.contains(shader)
    }

    pub fn push(&mut self, shader: Shader) {
        self.shaders.push(shader);
    }

    /// Removes the first occurrence of `shader`. Returns whether anything was removed.
    pub fn remove(&mut self, shader: &Shader) -> bool {
        match self.shaders.iter().position(|s| s == shader) {
            Some(idx) => {
                self.shaders.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.shaders.clear();
    }

    /// Runs every shader in order, each receiving the output of the previous one.
    pub fn run(&self, bitmap: Bitmap) -> Bitmap {
        self.shaders
            .iter()
            .fold(bitmap, |bitmap, shader| shader.run(bitmap))
    }
}

impl FromIterator<Shader> for ShaderChain {
    fn from_iter<I: IntoIterator<Item = Shader>>(iter: I) -> Self {
        Self {
            shaders: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn two_pixel_bitmap() -> Bitmap {
        let mut bitmap = Bitmap::new(2, 1);
        bitmap.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        bitmap.put_pixel(1, 0, Rgba([0, 0, 255, 255]));
        bitmap
    }

    #[test]
    fn test_flip_horizontal() {
        let flipped = Shader::FlipHorizontal.run(two_pixel_bitmap());
        assert_eq!(*flipped.get_pixel(0, 0), Rgba([0, 0, 255, 255]));
        assert_eq!(*flipped.get_pixel(1, 0), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_chain_order_matters() {
        let red = Color::rgb(255, 0, 0);
        let green = Color::rgb(0, 255, 0);
        let swap_then_invert: ShaderChain = [
            Shader::SwapColor { from: red, to: green },
            Shader::Invert,
        ]
        .into_iter()
        .collect();
        let invert_then_swap: ShaderChain = [
            Shader::Invert,
            Shader::SwapColor { from: red, to: green },
        ]
        .into_iter()
        .collect();

        assert_ne!(swap_then_invert, invert_then_swap);
        let a = swap_then_invert.run(two_pixel_bitmap());
        let b = invert_then_swap.run(two_pixel_bitmap());
        assert_ne!(a, b);
    }

    #[test]
    fn test_chain_is_deterministic() {
        let chain: ShaderChain = [Shader::FlipVertical, Shader::Tint(Color::rgb(128, 128, 128))]
            .into_iter()
            .collect();
        assert_eq!(chain.run(two_pixel_bitmap()), chain.run(two_pixel_bitmap()));
    }

    #[test]
    fn test_custom_shader_identity_by_name() {
        let a = Shader::Custom(CustomShader::new("clear", |bitmap| {
            bitmap.pixels_mut().for_each(|p| *p = Rgba([0, 0, 0, 0]))
        }));
        let b = Shader::Custom(CustomShader::new("clear", |_| {}));
        assert_eq!(a, b);

        let cleared = a.run(two_pixel_bitmap());
        assert!(cleared.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn test_remove_first_occurrence() {
        let mut chain: ShaderChain = [Shader::Invert, Shader::FlipHorizontal, Shader::Invert]
            .into_iter()
            .collect();
        assert!(chain.remove(&Shader::Invert));
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.iter().next(), Some(&Shader::FlipHorizontal));
        assert!(!chain.remove(&Shader::FlipVertical));
    }
}
