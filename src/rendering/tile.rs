//! The character cell.
//!
//! A [`Tile`] is the fundamental unit of the grid: a character, its foreground and background
//! colors, an optional underline and an ordered [`ShaderChain`]. Every tile caches a content
//! hash over the state that influences its glyph bitmap. The hash doubles as the key of the
//! [`ImageCache`] and as the per-position value the renderer diffs between frames, so it is
//! recomputed synchronously by every mutator that changes visible state.

use crate::rendering::cache::ImageCache;
use crate::rendering::color::Color;
use crate::rendering::shader::{Shader, ShaderChain};
use crate::rendering::surface::DrawTarget;
use std::hash::{DefaultHasher, Hash, Hasher};

/// One character cell.
///
/// # Defaults
///
/// *   Character: ' ' (space)
/// *   Foreground: white
/// *   Background: black
/// *   No shaders, no underline, visible, not blinking
///
/// # Example
///
/// ```rust
/// use asciiterm::rendering::color::Color;
/// use asciiterm::rendering::tile::Tile;
///
/// let mut tile = Tile::new('@').with_foreground(Color::rgb(255, 0, 0));
/// let before = tile.hash();
/// tile.set_background(Color::BLACK); // already black, nothing changes
/// assert_eq!(tile.hash(), before);
/// tile.set_character('#');
/// assert_ne!(tile.hash(), before);
/// ```
#[derive(Clone, Debug)]
pub struct Tile {
    character: char,
    foreground: Color,
    background: Color,
    underlined: bool,
    underline_thickness: u32,
    hidden: bool,
    blinking: bool,
    shaders: ShaderChain,
    hash: u64,
}

impl Tile {
    pub const DEFAULT_CHARACTER: char = ' ';
    pub const DEFAULT_FOREGROUND: Color = Color::WHITE;
    pub const DEFAULT_BACKGROUND: Color = Color::BLACK;
    pub const DEFAULT_UNDERLINE_THICKNESS: u32 = 1;

    /// Creates a tile showing `character` with default colors.
    pub fn new(character: char) -> Self {
        let mut tile = Self {
            character,
            foreground: Self::DEFAULT_FOREGROUND,
            background: Self::DEFAULT_BACKGROUND,
            underlined: false,
            underline_thickness: Self::DEFAULT_UNDERLINE_THICKNESS,
            hidden: false,
            blinking: false,
            shaders: ShaderChain::new(),
            hash: 0,
        };
        tile.update_hash();
        tile
    }

    pub fn with_foreground(mut self, color: Color) -> Self {
        self.set_foreground(color);
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.set_background(color);
        self
    }

    pub fn with_shader(mut self, shader: Shader) -> Self {
        self.add_shader(shader);
        self
    }

    pub fn with_underline(mut self, thickness: u32) -> Self {
        self.set_underlined(true);
        self.set_underline_thickness(thickness);
        self
    }

    pub fn character(&self) -> char {
        self.character
    }

    pub fn foreground(&self) -> Color {
        self.foreground
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn is_underlined(&self) -> bool {
        self.underlined
    }

    pub fn underline_thickness(&self) -> u32 {
        self.underline_thickness
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_blinking(&self) -> bool {
        self.blinking
    }

    pub fn shaders(&self) -> &ShaderChain {
        &self.shaders
    }

    pub fn set_character(&mut self, character: char) {
        if self.character != character {
            self.character = character;
            self.update_hash();
        }
    }

    pub fn set_foreground(&mut self, color: Color) {
        if self.foreground != color {
            self.foreground = color;
            self.update_hash();
        }
    }

    pub fn set_background(&mut self, color: Color) {
        if self.background != color {
            self.background = color;
            self.update_hash();
        }
    }

    pub fn set_underlined(&mut self, underlined: bool) {
        self.underlined = underlined;
    }

    pub fn set_underline_thickness(&mut self, thickness: u32) {
        self.underline_thickness = thickness;
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    /// Marks the tile as blinking. The renderer's blink clock toggles the hidden flag of
    /// blinking tiles; turning blinking off makes the tile visible again.
    pub fn set_blinking(&mut self, blinking: bool) {
        if self.blinking && !blinking {
            self.hidden = false;
        }
        self.blinking = blinking;
    }

    /// Appends `shader` to the end of the chain.
    pub fn add_shader(&mut self, shader: Shader) {
        self.shaders.push(shader);
        self.update_hash();
    }

    /// Removes the first occurrence of `shader`, if present.
    pub fn remove_shader(&mut self, shader: &Shader) {
        if self.shaders.remove(shader) {
            self.update_hash();
        }
    }

    pub fn clear_shaders(&mut self) {
        if !self.shaders.is_empty() {
            self.shaders.clear();
            self.update_hash();
        }
    }

    /// Restores the default appearance.
    pub fn reset(&mut self) {
        *self = Tile::default();
    }

    /// Copies every visible attribute of `other` into `self`.
    ///
    /// If both tiles already hash the same the cached hash is taken over as is, otherwise it
    /// is recomputed from the copied state.
    pub fn copy_from(&mut self, other: &Tile) {
        let hashes_matched = self.hash == other.hash;
        self.character = other.character;
        self.foreground = other.foreground;
        self.background = other.background;
        self.underlined = other.underlined;
        self.underline_thickness = other.underline_thickness;
        self.hidden = other.hidden;
        self.blinking = other.blinking;
        self.shaders.clone_from(&other.shaders);
        if hashes_matched {
            self.hash = other.hash;
        } else {
            self.update_hash();
        }
    }

    /// The cached content hash over (character, background, foreground, shaders).
    ///
    /// Never 0, which the renderer reserves for positions that were never drawn.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// The hash the renderer compares between frames.
    ///
    /// Identical to [`Tile::hash`] for plain tiles. Hidden and underlined tiles mix those
    /// flags in, so toggling them causes a repaint without changing the cache key.
    pub fn frame_hash(&self) -> u64 {
        if !self.hidden && !self.underlined {
            return self.hash;
        }
        let mut hasher = DefaultHasher::new();
        self.hash.hash(&mut hasher);
        self.hidden.hash(&mut hasher);
        if self.underlined {
            self.underline_thickness.hash(&mut hasher);
        }
        nonzero(hasher.finish())
    }

    /// Returns whether the tile renders as a plain background rectangle without a glyph.
    pub fn is_solid(&self) -> bool {
        self.hidden || self.foreground == self.background || self.character.is_whitespace()
    }

    /// Draws the tile into the cell at (`col`, `row`) of `target`.
    ///
    /// Solid tiles are filled with their background color and never touch the cache. Any
    /// other tile blits the cached glyph bitmap and, if underlined, draws the underline on
    /// top of it.
    pub fn draw(&mut self, target: &mut dyn DrawTarget, cache: &mut ImageCache, col: u32, row: u32) {
        let (cell_width, cell_height) = cache.cell_size();
        let x = col * cell_width;
        let y = row * cell_height;

        if self.is_solid() {
            target.fill_rect(x, y, cell_width, cell_height, self.background);
        } else {
            let image = cache.retrieve(self);
            target.blit(x, y, &image);
        }

        if self.underlined && !self.hidden {
            let thickness = self.underline_thickness.min(cell_height);
            target.fill_rect(x, y + cell_height - thickness, cell_width, thickness, self.foreground);
        }
    }

    fn compute_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.character.hash(&mut hasher);
        self.background.hash(&mut hasher);
        self.foreground.hash(&mut hasher);
        self.shaders.hash(&mut hasher);
        nonzero(hasher.finish())
    }

    fn update_hash(&mut self) {
        self.hash = self.compute_hash();
    }
}

fn nonzero(hash: u64) -> u64 {
    if hash == 0 { 1 } else { hash }
}

impl Default for Tile {
    fn default() -> Self {
        Tile::new(Self::DEFAULT_CHARACTER)
    }
}

/// Tiles compare by visible state.
impl PartialEq for Tile {
    fn eq(&self, other: &Self) -> bool {
        self.character == other.character
            && self.foreground == other.foreground
            && self.background == other.background
            && self.underlined == other.underlined
            && self.underline_thickness == other.underline_thickness
            && self.hidden == other.hidden
            && self.shaders == other.shaders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::collections::HashSet;

    #[test]
    fn test_equal_state_equal_hash() {
        let a = Tile::new('x')
            .with_foreground(Color::rgb(10, 20, 30))
            .with_shader(Shader::FlipHorizontal);
        let b = Tile::new('x')
            .with_foreground(Color::rgb(10, 20, 30))
            .with_shader(Shader::FlipHorizontal);
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_single_field_changes_hash() {
        let base = Tile::new('x');
        let variants = [
            Tile::new('y'),
            Tile::new('x').with_foreground(Color::rgb(1, 1, 1)),
            Tile::new('x').with_background(Color::rgb(1, 1, 1)),
            Tile::new('x').with_shader(Shader::Invert),
        ];
        for variant in variants {
            assert_ne!(base.hash(), variant.hash(), "{:?}", variant);
        }
    }

    #[test]
    fn test_random_tiles_do_not_collide() {
        let mut rng = rand::thread_rng();
        let mut states = HashSet::new();
        let mut hashes = HashSet::new();
        for _ in 0..5000 {
            let c = rng.gen_range('!'..='~');
            let fg = Color::rgb(rng.r#gen(), rng.r#gen(), rng.r#gen());
            let bg = Color::rgb(rng.r#gen(), rng.r#gen(), rng.r#gen());
            if states.insert((c, fg, bg)) {
                let tile = Tile::new(c).with_foreground(fg).with_background(bg);
                hashes.insert(tile.hash());
            }
        }
        assert_eq!(states.len(), hashes.len());
    }

    #[test]
    fn test_mutator_noop_keeps_hash() {
        let mut tile = Tile::new('a').with_background(Color::rgb(5, 6, 7));
        let before = tile.hash();
        tile.set_background(Color::rgb(5, 6, 7));
        tile.set_character('a');
        tile.clear_shaders();
        tile.remove_shader(&Shader::Invert);
        assert_eq!(tile.hash(), before);
    }

    #[test]
    fn test_shader_order_changes_hash() {
        let a = Tile::new('a')
            .with_shader(Shader::Invert)
            .with_shader(Shader::FlipVertical);
        let b = Tile::new('a')
            .with_shader(Shader::FlipVertical)
            .with_shader(Shader::Invert);
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut tile = Tile::new('z')
            .with_foreground(Color::rgb(1, 2, 3))
            .with_background(Color::rgb(4, 5, 6))
            .with_shader(Shader::Invert)
            .with_underline(2);
        tile.reset();
        assert_eq!(tile, Tile::default());
        assert_eq!(tile.hash(), Tile::default().hash());
        assert!(!tile.is_underlined());
    }

    #[test]
    fn test_copy_from_different_tile_recomputes_hash() {
        let source = Tile::new('q')
            .with_foreground(Color::rgb(200, 0, 0))
            .with_shader(Shader::FlipHorizontal)
            .with_underline(3);
        let mut target = Tile::default();
        assert_ne!(target.hash(), source.hash());

        target.copy_from(&source);
        assert_eq!(target, source);
        assert_eq!(target.character(), 'q');
        assert_eq!(target.underline_thickness(), 3);
        assert_eq!(target.shaders(), source.shaders());
        assert_eq!(target.hash(), source.hash());
    }

    #[test]
    fn test_copy_from_equal_tile_keeps_hash() {
        let source = Tile::new('q').with_underline(2);
        let mut target = Tile::new('q');
        let before = target.hash();
        assert_eq!(before, source.hash());

        target.copy_from(&source);
        assert_eq!(target.hash(), before);
        assert!(target.is_underlined());
        assert_eq!(target, source);
    }

    #[test]
    fn test_frame_hash_reflects_flags() {
        let mut tile = Tile::new('a');
        assert_eq!(tile.frame_hash(), tile.hash());
        tile.set_hidden(true);
        assert_ne!(tile.frame_hash(), tile.hash());
        tile.set_hidden(false);
        tile.set_underlined(true);
        assert_ne!(tile.frame_hash(), tile.hash());
    }

    #[test]
    fn test_solid_tiles() {
        assert!(Tile::new(' ').is_solid());
        assert!(Tile::new('a').with_foreground(Color::BLACK).is_solid());
        let mut hidden = Tile::new('a');
        hidden.set_hidden(true);
        assert!(hidden.is_solid());
        assert!(!Tile::new('a').is_solid());
    }
}
