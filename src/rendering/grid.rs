//! Fixed-size 2D grids of tiles.
//!
//! A [`TileGrid`] is a rectangle of [`Tile`]s with an origin relative to its parent
//! coordinate space. Screens own one grid, and so does every widget; the renderer translates
//! screen coordinates into each widget's local space to layer widget content over the screen
//! without copying it.
//!
//! All lookups take signed coordinates and treat out-of-bounds access as ordinary control
//! flow: they return `None`, an empty vector or a zero hash instead of panicking.

use crate::rendering::color::Color;
use crate::rendering::tile::Tile;
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::ops::{Index, IndexMut};

/// A rectangle of tiles.
///
/// # Example
///
/// ```rust
/// use asciiterm::rendering::grid::TileGrid;
///
/// let mut grid = TileGrid::new(10, 5, (2, 3));
/// grid[(2, 3)].set_character('X');
///
/// assert_eq!(grid.tile(2, 3).map(|t| t.character()), Some('X'));
/// assert!(grid.tile(10, 0).is_none());
/// assert_eq!(grid.position_hash(-1, 0), 0);
/// assert_eq!(grid.origin(), (2, 3));
/// ```
#[derive(Clone)]
pub struct TileGrid {
    width: usize,
    height: usize,
    origin: (i64, i64),
    tiles: Vec<Tile>,
}

impl Debug for TileGrid {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "TileGrid {{ width: {}, height: {}, origin: {:?} }}",
            self.width, self.height, self.origin
        )
    }
}

impl TileGrid {
    /// Creates a grid of default tiles. Width and height are clamped to at least 1.
    pub fn new(width: usize, height: usize, origin: (i64, i64)) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            origin,
            tiles: vec![Tile::default(); width * height],
        }
    }

    #[inline]
    fn index_of(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y * self.width + x)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Position of the grid's top-left corner in its parent's coordinate space.
    pub fn origin(&self) -> (i64, i64) {
        self.origin
    }

    pub fn set_origin(&mut self, origin: (i64, i64)) {
        self.origin = origin;
    }

    /// Returns whether the local coordinates lie within the grid.
    pub fn contains(&self, x: i64, y: i64) -> bool {
        self.index_of(x, y).is_some()
    }

    /// Returns whether the parent coordinates lie within the grid's footprint.
    pub fn covers(&self, parent_x: i64, parent_y: i64) -> bool {
        self.contains(parent_x - self.origin.0, parent_y - self.origin.1)
    }

    pub fn tile(&self, x: i64, y: i64) -> Option<&Tile> {
        self.index_of(x, y).map(|idx| &self.tiles[idx])
    }

    pub fn tile_mut(&mut self, x: i64, y: i64) -> Option<&mut Tile> {
        self.index_of(x, y).map(|idx| &mut self.tiles[idx])
    }

    /// The frame hash of the tile at the local position, or 0 if out of bounds.
    pub fn position_hash(&self, x: i64, y: i64) -> u64 {
        self.tile(x, y).map_or(0, Tile::frame_hash)
    }

    /// The tiles of row `y`, or an empty vector if `y` is out of bounds.
    pub fn row(&self, y: i64) -> Vec<&Tile> {
        self.row_slice(y, 0, self.width as i64)
    }

    /// The tiles of column `x`, or an empty vector if `x` is out of bounds.
    pub fn column(&self, x: i64) -> Vec<&Tile> {
        self.column_slice(x, 0, self.height as i64)
    }

    /// Up to `len` tiles of row `y`, starting at column `x_start`.
    ///
    /// The range is clipped to the grid. Non-positive lengths and ranges that miss the grid
    /// entirely produce an empty vector.
    pub fn row_slice(&self, y: i64, x_start: i64, len: i64) -> Vec<&Tile> {
        if len <= 0 || y < 0 || y as usize >= self.height {
            return Vec::new();
        }
        let start = x_start.max(0);
        let end = x_start.saturating_add(len).min(self.width as i64);
        (start..end).filter_map(|x| self.tile(x, y)).collect()
    }

    /// Up to `len` tiles of column `x`, starting at row `y_start`. Clipped like
    /// [`TileGrid::row_slice`].
    pub fn column_slice(&self, x: i64, y_start: i64, len: i64) -> Vec<&Tile> {
        if len <= 0 || x < 0 || x as usize >= self.width {
            return Vec::new();
        }
        let start = y_start.max(0);
        let end = y_start.saturating_add(len).min(self.height as i64);
        (start..end).filter_map(|y| self.tile(x, y)).collect()
    }

    /// Copies the region starting at (`x`, `y`) into a new grid whose origin is (`x`, `y`).
    ///
    /// The region is clipped to the grid; returns `None` if nothing of it lies inside.
    pub fn sub_grid(&self, x: i64, y: i64, width: usize, height: usize) -> Option<TileGrid> {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = x.saturating_add(width as i64).min(self.width as i64);
        let y1 = y.saturating_add(height as i64).min(self.height as i64);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        let mut sub = TileGrid::new((x1 - x0) as usize, (y1 - y0) as usize, (x0, y0));
        for sy in y0..y1 {
            for sx in x0..x1 {
                self.copy_tile_into(sx, sy, &mut sub, sx - x0, sy - y0);
            }
        }
        Some(sub)
    }

    /// Copies the tile at local (`x`, `y`) onto `target` at (`target_x`, `target_y`).
    ///
    /// Returns whether a tile was copied; either position being out of bounds is a no-op.
    pub fn copy_tile_into(
        &self,
        x: i64,
        y: i64,
        target: &mut TileGrid,
        target_x: i64,
        target_y: i64,
    ) -> bool {
        match (self.tile(x, y), target.tile_mut(target_x, target_y)) {
            (Some(source), Some(dest)) => {
                dest.copy_from(source);
                true
            }
            _ => false,
        }
    }

    /// Copies the whole grid onto `target`, placing local (0, 0) at (`offset_x`, `offset_y`).
    pub fn copy_into(&self, target: &mut TileGrid, offset_x: i64, offset_y: i64) {
        for (x, y, tile) in self.iter() {
            if let Some(dest) = target.tile_mut(x + offset_x, y + offset_y) {
                dest.copy_from(tile);
            }
        }
    }

    /// Resets every tile of the clipped region to the default appearance.
    pub fn reset_region(&mut self, x: i64, y: i64, width: usize, height: usize) {
        let x_end = x.saturating_add(width as i64);
        let y_end = y.saturating_add(height as i64);
        for ty in y.max(0)..y_end.min(self.height as i64) {
            for tx in x.max(0)..x_end.min(self.width as i64) {
                if let Some(tile) = self.tile_mut(tx, ty) {
                    tile.reset();
                }
            }
        }
    }

    pub fn reset_all(&mut self) {
        self.tiles.iter_mut().for_each(Tile::reset);
    }

    /// Copies `tile` into every cell.
    pub fn fill(&mut self, tile: &Tile) {
        for dest in self.tiles.iter_mut() {
            dest.copy_from(tile);
        }
    }

    /// Writes `text` into row `y` starting at `x`, clipping at the grid edge.
    ///
    /// Returns the number of tiles written.
    pub fn write_str(&mut self, x: i64, y: i64, text: &str, foreground: Color, background: Color) -> usize {
        let mut written = 0;
        for (offset, c) in text.chars().enumerate() {
            if let Some(tile) = self.tile_mut(x + offset as i64, y) {
                tile.set_character(c);
                tile.set_foreground(foreground);
                tile.set_background(background);
                written += 1;
            }
        }
        written
    }

    /// Returns an iterator over the tiles together with their local coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (i64, i64, &Tile)> {
        let width = self.width;
        self.tiles.iter().enumerate().map(move |(idx, tile)| {
            ((idx % width) as i64, (idx / width) as i64, tile)
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (i64, i64, &mut Tile)> {
        let width = self.width;
        self.tiles.iter_mut().enumerate().map(move |(idx, tile)| {
            ((idx % width) as i64, (idx / width) as i64, tile)
        })
    }
}

impl Index<(i64, i64)> for TileGrid {
    type Output = Tile;

    fn index(&self, (x, y): (i64, i64)) -> &Self::Output {
        self.tile(x, y).expect("tile index out of bounds")
    }
}

impl IndexMut<(i64, i64)> for TileGrid {
    fn index_mut(&mut self, (x, y): (i64, i64)) -> &mut Self::Output {
        self.tile_mut(x, y).expect("tile index out of bounds")
    }
}
