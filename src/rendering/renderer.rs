//! The screen render loop.
//!
//! [`ScreenRenderer`] draws one screen of a [`Scene`] onto a [`PresentationSurface`]:
//!
//! *   **Frame hashes:** every grid position gets a frame hash, the screen tile's hash plus the
//!     hashes of all overlay tiles covering it (wrapping addition). Two arrays are kept,
//!     `previous` and `current`, and swapped at the start of each frame.
//! *   **Diff painting:** only positions whose hash changed are painted. A previous hash of 0
//!     means "never painted" and always causes a paint, which is how lost buffers and newly
//!     created buffer strategies force a full repaint.
//! *   **Buffer management:** a missing buffer strategy is recreated (once per frame), restored
//!     buffer contents trigger a full repaint, and a present that lost its contents is retried
//!     a bounded number of times.
//! *   **Blinking:** the renderer owns the [`BlinkClock`] and applies its phase to the scene
//!     before hashing.
//!
//! `draw` takes `&mut self` and `&mut Scene`, so two draw passes can never interleave and the
//! scene cannot change while a frame is painted.

use crate::components::scene::{NodeId, Overlay, Scene};
use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::rendering::blink::BlinkClock;
use crate::rendering::cache::ImageCache;
use crate::rendering::surface::{BufferStrategy, DrawTarget, PresentOutcome, PresentationSurface};
use std::time::Instant;

/// The per-position frame hashes of the last two frames.
#[derive(Debug, Clone, Default)]
pub struct FrameHashes {
    width: usize,
    height: usize,
    previous: Vec<u64>,
    current: Vec<u64>,
}

impl FrameHashes {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            previous: vec![0; width * height],
            current: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Matches the arrays to a screen of `width` x `height`. A size change forgets every hash.
    pub fn ensure_size(&mut self, width: usize, height: usize) {
        if self.width != width || self.height != height {
            *self = Self::new(width, height);
        }
    }

    /// Moves the current hashes to `previous` and zeroes `current`.
    pub fn swap_and_clear(&mut self) {
        std::mem::swap(&mut self.previous, &mut self.current);
        self.current.iter_mut().for_each(|hash| *hash = 0);
    }

    /// Forgets what was painted, so the next paint covers every position.
    pub fn force_full_repaint(&mut self) {
        self.previous.iter_mut().for_each(|hash| *hash = 0);
    }

    /// Forgets both frames.
    pub fn clear(&mut self) {
        self.previous.iter_mut().for_each(|hash| *hash = 0);
        self.current.iter_mut().for_each(|hash| *hash = 0);
    }

    pub fn previous(&self) -> &[u64] {
        &self.previous
    }

    pub fn current(&self) -> &[u64] {
        &self.current
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    fn add(&mut self, x: i64, y: i64, hash: u64) {
        if let Some(idx) = self.index(x, y) {
            self.current[idx] = self.current[idx].wrapping_add(hash);
        }
    }

    fn needs_paint(&self, idx: usize) -> bool {
        let previous = self.previous[idx];
        previous == 0 || previous != self.current[idx]
    }
}

/// What a call to [`ScreenRenderer::draw`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawReport {
    /// The surface was not visible and nothing was drawn.
    pub skipped: bool,
    /// Grid cells painted, summed over all attempts.
    pub painted: usize,
    /// Present attempts, more than one if the surface lost its contents.
    pub attempts: u32,
    /// Whether the buffer strategy had to be created.
    pub recreated_strategy: bool,
}

/// Draws screens of a [`Scene`] onto a presentation surface.
pub struct ScreenRenderer<S: PresentationSurface> {
    surface: S,
    cache: ImageCache,
    frames: FrameHashes,
    first_render_done: bool,
    blink: BlinkClock,
    prefer_single_buffer: bool,
    max_present_attempts: u32,
}

impl<S: PresentationSurface> ScreenRenderer<S> {
    pub fn new(surface: S, cache: ImageCache, config: &RenderConfig) -> Self {
        Self {
            surface,
            cache,
            frames: FrameHashes::default(),
            first_render_done: false,
            blink: BlinkClock::new(config.blink_interval()),
            prefer_single_buffer: config.prefer_single_buffer,
            max_present_attempts: config.max_present_attempts.max(1),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ImageCache {
        &mut self.cache
    }

    pub fn frames(&self) -> &FrameHashes {
        &self.frames
    }

    pub fn blink(&self) -> &BlinkClock {
        &self.blink
    }

    pub fn set_blink_clock(&mut self, blink: BlinkClock) {
        self.blink = blink;
    }

    pub fn is_first_render_done(&self) -> bool {
        self.first_render_done
    }

    /// Makes the next frame paint every cell, e.g. after the output was disturbed.
    pub fn invalidate(&mut self) {
        self.frames.force_full_repaint();
        self.first_render_done = false;
    }

    /// Draws `screen` and presents it.
    pub fn draw(&mut self, scene: &mut Scene, screen: NodeId) -> Result<DrawReport, RenderError> {
        self.draw_at(scene, screen, Instant::now())
    }

    /// Draws `screen` as of `now`, which only matters for blinking.
    pub fn draw_at(
        &mut self,
        scene: &mut Scene,
        screen: NodeId,
        now: Instant,
    ) -> Result<DrawReport, RenderError> {
        if !scene.is_screen(screen) {
            return Err(RenderError::UnknownScreen(screen));
        }
        if !self.surface.is_visible() {
            log::trace!("surface not visible, skipping frame");
            return Ok(DrawReport {
                skipped: true,
                ..DrawReport::default()
            });
        }

        self.blink.tick(now);
        scene.set_blink_phase(screen, self.blink.is_visible());

        let overlays = scene.overlays(screen);
        self.update_frame_hashes(scene, screen, &overlays)?;

        let report = match self.paint_and_present(scene, screen, &overlays) {
            Ok(report) => report,
            Err(err) => {
                // nothing reliable reached the surface, the next frame starts over
                self.frames.clear();
                self.first_render_done = false;
                return Err(err);
            }
        };

        self.first_render_done = true;
        log::trace!(
            "drew {screen:?}: {} cells painted in {} attempt(s)",
            report.painted,
            report.attempts
        );
        Ok(report)
    }

    fn paint_and_present(
        &mut self,
        scene: &mut Scene,
        screen: NodeId,
        overlays: &[Overlay],
    ) -> Result<DrawReport, RenderError> {
        let mut report = DrawReport::default();
        loop {
            report.attempts += 1;
            if self.surface.buffer_strategy().is_none() {
                if report.recreated_strategy {
                    return Err(RenderError::NoBufferStrategy);
                }
                self.create_buffer_strategy()?;
                report.recreated_strategy = true;
                self.frames.force_full_repaint();
            }

            let everything = !self.first_render_done;
            report.painted += self.paint(scene, screen, overlays, everything)?;
            if self.surface.take_contents_restored() {
                log::debug!("back buffer was restored, repainting every cell");
                report.painted += self.paint(scene, screen, overlays, true)?;
            }

            match self.surface.present()? {
                PresentOutcome::Presented => break,
                PresentOutcome::ContentsLost => {
                    if report.attempts >= self.max_present_attempts {
                        return Err(RenderError::ContentsLost {
                            attempts: report.attempts,
                        });
                    }
                    log::warn!("back buffer contents lost, repainting (attempt {})", report.attempts);
                    self.frames.force_full_repaint();
                }
            }
        }
        Ok(report)
    }

    fn update_frame_hashes(
        &mut self,
        scene: &Scene,
        screen: NodeId,
        overlays: &[Overlay],
    ) -> Result<(), RenderError> {
        let grid = scene.grid(screen).ok_or(RenderError::UnknownScreen(screen))?;
        self.frames.ensure_size(grid.width(), grid.height());
        self.frames.swap_and_clear();

        for (x, y, tile) in grid.iter() {
            self.frames.add(x, y, tile.frame_hash());
        }
        for overlay in overlays {
            let Some(grid) = scene.grid(overlay.node) else {
                continue;
            };
            for (x, y, tile) in grid.iter() {
                self.frames
                    .add(overlay.origin.0 + x, overlay.origin.1 + y, tile.frame_hash());
            }
        }
        Ok(())
    }

    fn create_buffer_strategy(&mut self) -> Result<(), RenderError> {
        let strategy = if self.surface.requires_single_buffer() || self.prefer_single_buffer {
            BufferStrategy::Single
        } else {
            BufferStrategy::Double
        };
        log::debug!("creating {strategy:?} buffer strategy");
        self.surface.create_buffer_strategy(strategy)
    }

    fn paint(
        &mut self,
        scene: &mut Scene,
        screen: NodeId,
        overlays: &[Overlay],
        everything: bool,
    ) -> Result<usize, RenderError> {
        let target = self
            .surface
            .back_buffer()
            .ok_or(RenderError::NoBufferStrategy)?;
        Ok(paint_cells(
            target,
            &mut self.cache,
            &self.frames,
            scene,
            screen,
            overlays,
            everything,
        ))
    }
}

/// Paints every cell that changed (or all of them), bottom to top: the screen tile first, then
/// the covering overlay tiles in drawing order.
fn paint_cells(
    target: &mut dyn DrawTarget,
    cache: &mut ImageCache,
    frames: &FrameHashes,
    scene: &mut Scene,
    screen: NodeId,
    overlays: &[Overlay],
    everything: bool,
) -> usize {
    let mut painted = 0;
    for y in 0..frames.height() {
        for x in 0..frames.width() {
            let idx = y * frames.width() + x;
            if !everything && !frames.needs_paint(idx) {
                continue;
            }
            let (x, y) = (x as i64, y as i64);
            if let Some(tile) = scene.grid_mut(screen).and_then(|grid| grid.tile_mut(x, y)) {
                tile.draw(target, cache, x as u32, y as u32);
            }
            for overlay in overlays.iter().filter(|overlay| overlay.covers(x, y)) {
                let (lx, ly) = overlay.to_local(x, y);
                if let Some(tile) = scene.grid_mut(overlay.node).and_then(|grid| grid.tile_mut(lx, ly)) {
                    tile.draw(target, cache, x as u32, y as u32);
                }
            }
            painted += 1;
        }
    }
    painted
}
