//! Content-addressed cache of rendered glyph bitmaps.
//!
//! The [`ImageCache`] maps a tile's content hash to the fully rendered bitmap for that tile:
//! the font glyph recolored with the tile's colors and run through its shader chain. A tile
//! whose state changes simply hashes to a different key, so entries are never invalidated one
//! by one; they age out through the LRU bound and the optional idle expiry instead.
//!
//! **Synthesis of a missing entry:**
//!
//! 1.  Look up the glyph template for the tile's character in the [`GlyphFont`].
//! 2.  Replace background marker pixels with the tile's background color and ink pixels with
//!     the foreground color composited over the background.
//! 3.  Run the tile's shader chain.
//! 4.  Store the result under the tile's hash.
//!
//! A character without a glyph is not fatal: the tile is recolored magenta and a plain magenta
//! bitmap is returned, so the defect is visible on screen instead of silently wrong.

use crate::rendering::Bitmap;
use crate::rendering::color::Color;
use crate::rendering::font::{GlyphFont, is_background_marker};
use crate::rendering::tile::Tile;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(4096) {
    Some(capacity) => capacity,
    None => unreachable!(),
};

/// Bounds of an [`ImageCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of cached bitmaps. The least recently used entry is evicted first.
    pub capacity: NonZeroUsize,
    /// Entries not accessed for this long are dropped. `None` disables expiry.
    pub expire_after: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            expire_after: Some(Duration::from_secs(5 * 60)),
        }
    }
}

/// Counters describing cache behavior since creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped because the cache was full or the entry expired.
    pub evictions: u64,
    /// Lookups for characters the font has no glyph for.
    pub missing_glyphs: u64,
}

struct CacheEntry {
    image: Arc<Bitmap>,
    generation: u64,
    last_access: Instant,
}

/// Bounded cache of rendered tile bitmaps.
pub struct ImageCache {
    font: Box<dyn GlyphFont>,
    entries: LruCache<u64, CacheEntry>,
    expire_after: Option<Duration>,
    generation: u64,
    stats: CacheStats,
}

impl ImageCache {
    pub fn new(font: Box<dyn GlyphFont>, config: CacheConfig) -> Self {
        Self {
            font,
            entries: LruCache::new(config.capacity),
            expire_after: config.expire_after,
            generation: 0,
            stats: CacheStats::default(),
        }
    }

    /// Pixel size of one grid cell, which is the font's glyph size.
    pub fn cell_size(&self) -> (u32, u32) {
        self.font.glyph_size()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Returns whether a bitmap for `hash` is cached and still valid.
    pub fn contains(&self, hash: u64) -> bool {
        self.entries
            .peek(&hash)
            .is_some_and(|entry| entry.generation == self.generation)
    }

    /// Returns the rendered bitmap for `tile`, synthesizing and caching it on a miss.
    ///
    /// If the font has no glyph for the tile's character, the tile is recolored magenta and an
    /// uncached magenta bitmap is returned.
    pub fn retrieve(&mut self, tile: &mut Tile) -> Arc<Bitmap> {
        let now = Instant::now();
        self.evict_expired(now);

        let key = tile.hash();
        if let Some(entry) = self.entries.get_mut(&key) {
            if entry.generation == self.generation {
                entry.last_access = now;
                self.stats.hits += 1;
                return Arc::clone(&entry.image);
            }
        }
        self.stats.misses += 1;

        let Some(image) = self.synthesize(tile) else {
            return self.missing_glyph(tile);
        };
        let image = Arc::new(image);
        let entry = CacheEntry {
            image: Arc::clone(&image),
            generation: self.generation,
            last_access: now,
        };
        if let Some((evicted, _)) = self.entries.push(key, entry) {
            // `push` also returns the old value when replacing a stale entry of the same key
            if evicted != key {
                self.stats.evictions += 1;
            }
        }
        image
    }

    /// Drops every entry that has not been accessed within the expiry window.
    ///
    /// Returns the number of dropped entries.
    pub fn evict_expired(&mut self, now: Instant) -> usize {
        let Some(expire_after) = self.expire_after else {
            return 0;
        };
        let mut evicted = 0;
        // LRU order is last-access order, so expired entries sit at the tail.
        while let Some((_, entry)) = self.entries.peek_lru() {
            if now.saturating_duration_since(entry.last_access) < expire_after {
                break;
            }
            self.entries.pop_lru();
            evicted += 1;
        }
        if evicted > 0 {
            log::trace!("expired {evicted} cached glyph bitmaps");
        }
        self.stats.evictions += evicted as u64;
        evicted
    }

    /// Marks every cached bitmap as lost, e.g. after the graphics device was reset.
    ///
    /// Entries stay in place but count as misses until they are rendered again.
    pub fn invalidate(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        log::debug!("image cache invalidated, generation {}", self.generation);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn synthesize(&self, tile: &Tile) -> Option<Bitmap> {
        let glyph = self.font.glyph(tile.character())?;
        let background = tile.background();
        let ink = tile.foreground().blend_over(background);

        let mut image = glyph.clone();
        for pixel in image.pixels_mut() {
            let color = if is_background_marker(pixel) { background } else { ink };
            *pixel = color.into();
        }
        Some(tile.shaders().run(image))
    }

    fn missing_glyph(&mut self, tile: &mut Tile) -> Arc<Bitmap> {
        self.stats.missing_glyphs += 1;
        log::warn!(
            "no glyph for {:?} (U+{:04X}), marking tile",
            tile.character(),
            tile.character() as u32
        );
        tile.set_foreground(Color::MAGENTA);
        tile.set_background(Color::MAGENTA);
        let (width, height) = self.cell_size();
        Arc::new(Bitmap::from_pixel(width, height, Color::MAGENTA.into()))
    }
}
