//! Presentation surfaces.
//!
//! The renderer paints into a [`DrawTarget`] handed out by a [`PresentationSurface`]. Surfaces
//! follow the buffer-strategy model of windowing toolkits: the back buffer only exists once a
//! [`BufferStrategy`] was created, its contents may be lost or restored by the platform between
//! frames, and nothing becomes visible before [`PresentationSurface::present`].
//!
//! [`FrameBuffer`] is the in-memory implementation. It keeps the presented image around so it
//! can be inspected or forwarded (see [`TerminalSurface`]), and it can simulate buffer loss and
//! restoration.
//!
//! [`TerminalSurface`]: crate::rendering::terminal::TerminalSurface

use crate::error::RenderError;
use crate::rendering::Bitmap;
use crate::rendering::color::Color;
use image::imageops;
use serde::{Deserialize, Serialize};

/// Something tiles can be painted onto.
pub trait DrawTarget {
    /// Size in pixels.
    fn size(&self) -> (u32, u32);

    /// Fills the rectangle with `color`, clipped to the target.
    fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: Color);

    /// Copies `image` with its top-left corner at (`x`, `y`), clipped to the target.
    fn blit(&mut self, x: u32, y: u32, image: &Bitmap);
}

impl DrawTarget for Bitmap {
    fn size(&self) -> (u32, u32) {
        self.dimensions()
    }

    fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: Color) {
        let x_end = x.saturating_add(width).min(self.width());
        let y_end = y.saturating_add(height).min(self.height());
        let pixel = color.into();
        for py in y..y_end {
            for px in x..x_end {
                self.put_pixel(px, py, pixel);
            }
        }
    }

    fn blit(&mut self, x: u32, y: u32, image: &Bitmap) {
        imageops::replace(self, image, x as i64, y as i64);
    }
}

/// How many buffers a surface presents through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BufferStrategy {
    /// Painting goes straight to the visible image. Required by some exclusive full-screen modes.
    Single,
    /// Painting goes to a back buffer which is copied to the visible image on present.
    Double,
}

/// Result of presenting the back buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    /// The back buffer was lost before it could be shown; the frame has to be painted again.
    ContentsLost,
}

/// A buffered surface the renderer presents frames on.
pub trait PresentationSurface {
    /// A surface that is not visible (e.g. minimized) is not drawn at all.
    fn is_visible(&self) -> bool;

    /// Whether only [`BufferStrategy::Single`] works, e.g. in exclusive full-screen mode.
    fn requires_single_buffer(&self) -> bool {
        false
    }

    /// The current buffer strategy, or `None` if there is none (yet, or any more).
    fn buffer_strategy(&self) -> Option<BufferStrategy>;

    fn create_buffer_strategy(&mut self, strategy: BufferStrategy) -> Result<(), RenderError>;

    /// The buffer to paint the next frame into. `None` without a buffer strategy.
    fn back_buffer(&mut self) -> Option<&mut dyn DrawTarget>;

    /// Returns and clears the flag telling that the platform restored the back buffer, which
    /// leaves its contents undefined.
    fn take_contents_restored(&mut self) -> bool {
        false
    }

    fn present(&mut self) -> Result<PresentOutcome, RenderError>;
}

/// An in-memory presentation surface.
///
/// ```rust
/// use asciiterm::rendering::surface::{BufferStrategy, FrameBuffer, PresentOutcome, PresentationSurface};
/// use asciiterm::rendering::color::Color;
///
/// let mut surface = FrameBuffer::new(4, 4);
/// surface.create_buffer_strategy(BufferStrategy::Double).unwrap();
/// surface.back_buffer().unwrap().fill_rect(0, 0, 4, 4, Color::WHITE);
/// assert_eq!(surface.present().unwrap(), PresentOutcome::Presented);
/// assert_eq!(surface.front().get_pixel(3, 3).0, [255, 255, 255, 255]);
/// ```
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    visible: bool,
    exclusive_fullscreen: bool,
    strategy: Option<BufferStrategy>,
    back: Bitmap,
    front: Bitmap,
    lose_next_present: bool,
    contents_restored: bool,
    presents: u64,
    strategies_created: u64,
}

impl FrameBuffer {
    /// Creates a visible surface of `width` x `height` pixels without a buffer strategy.
    pub fn new(width: u32, height: u32) -> Self {
        let blank = Bitmap::from_pixel(width, height, Color::BLACK.into());
        Self {
            visible: true,
            exclusive_fullscreen: false,
            strategy: None,
            back: blank.clone(),
            front: blank,
            lose_next_present: false,
            contents_restored: false,
            presents: 0,
            strategies_created: 0,
        }
    }

    /// The image that was presented last.
    pub fn front(&self) -> &Bitmap {
        &self.front
    }

    pub fn size(&self) -> (u32, u32) {
        self.front.dimensions()
    }

    /// Number of successful presents.
    pub fn presents(&self) -> u64 {
        self.presents
    }

    /// Number of buffer strategies created over the surface's lifetime.
    pub fn strategies_created(&self) -> u64 {
        self.strategies_created
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Entering exclusive full-screen mode drops the buffer strategy, since only single
    /// buffering works there.
    pub fn set_exclusive_fullscreen(&mut self, exclusive: bool) {
        if self.exclusive_fullscreen != exclusive {
            self.exclusive_fullscreen = exclusive;
            self.strategy = None;
        }
    }

    /// Drops the buffer strategy, as a platform does when the window is reconfigured.
    pub fn drop_buffer_strategy(&mut self) {
        self.strategy = None;
    }

    /// Makes the next present fail with [`PresentOutcome::ContentsLost`] and wipes the back
    /// buffer.
    pub fn lose_contents(&mut self) {
        self.lose_next_present = true;
    }

    /// Flags the back buffer as restored with undefined contents.
    pub fn restore_contents(&mut self) {
        self.contents_restored = true;
        self.back.fill_rect(0, 0, u32::MAX, u32::MAX, Color::BLACK);
    }

    /// Resizes both buffers, discarding their contents.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.back = Bitmap::from_pixel(width, height, Color::BLACK.into());
        self.front = self.back.clone();
    }
}

impl PresentationSurface for FrameBuffer {
    fn is_visible(&self) -> bool {
        self.visible
    }

    fn requires_single_buffer(&self) -> bool {
        self.exclusive_fullscreen
    }

    fn buffer_strategy(&self) -> Option<BufferStrategy> {
        self.strategy
    }

    fn create_buffer_strategy(&mut self, strategy: BufferStrategy) -> Result<(), RenderError> {
        self.strategy = Some(strategy);
        self.strategies_created += 1;
        Ok(())
    }

    fn back_buffer(&mut self) -> Option<&mut dyn DrawTarget> {
        match self.strategy? {
            BufferStrategy::Single => Some(&mut self.front),
            BufferStrategy::Double => Some(&mut self.back),
        }
    }

    fn take_contents_restored(&mut self) -> bool {
        std::mem::take(&mut self.contents_restored)
    }

    fn present(&mut self) -> Result<PresentOutcome, RenderError> {
        let Some(strategy) = self.strategy else {
            return Err(RenderError::NoBufferStrategy);
        };
        if std::mem::take(&mut self.lose_next_present) {
            let target = match strategy {
                BufferStrategy::Single => &mut self.front,
                BufferStrategy::Double => &mut self.back,
            };
            target.fill_rect(0, 0, u32::MAX, u32::MAX, Color::BLACK);
            return Ok(PresentOutcome::ContentsLost);
        }
        if strategy == BufferStrategy::Double {
            self.front.clone_from(&self.back);
        }
        self.presents += 1;
        Ok(PresentOutcome::Presented)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_rect_clips() {
        let mut bitmap = Bitmap::new(3, 3);
        bitmap.fill_rect(2, 2, 10, 10, Color::WHITE);
        assert_eq!(bitmap.get_pixel(2, 2).0, [255, 255, 255, 255]);
        assert_eq!(bitmap.get_pixel(1, 1).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_blit_clips() {
        let mut bitmap = Bitmap::new(3, 3);
        let image = Bitmap::from_pixel(2, 2, Color::WHITE.into());
        bitmap.blit(2, 2, &image);
        assert_eq!(bitmap.get_pixel(2, 2).0, [255, 255, 255, 255]);
        assert_eq!(bitmap.get_pixel(1, 2).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_double_buffer_only_shows_after_present() {
        let mut surface = FrameBuffer::new(2, 2);
        assert!(surface.back_buffer().is_none());
        assert!(matches!(surface.present(), Err(RenderError::NoBufferStrategy)));

        surface.create_buffer_strategy(BufferStrategy::Double).unwrap();
        surface.back_buffer().unwrap().fill_rect(0, 0, 2, 2, Color::WHITE);
        assert_eq!(surface.front().get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(surface.present().unwrap(), PresentOutcome::Presented);
        assert_eq!(surface.front().get_pixel(0, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_lost_contents_are_reported_once() {
        let mut surface = FrameBuffer::new(2, 2);
        surface.create_buffer_strategy(BufferStrategy::Double).unwrap();
        surface.lose_contents();
        assert_eq!(surface.present().unwrap(), PresentOutcome::ContentsLost);
        assert_eq!(surface.present().unwrap(), PresentOutcome::Presented);
        assert_eq!(surface.presents(), 1);
    }

    #[test]
    fn test_exclusive_fullscreen_drops_strategy() {
        let mut surface = FrameBuffer::new(2, 2);
        surface.create_buffer_strategy(BufferStrategy::Double).unwrap();
        surface.set_exclusive_fullscreen(true);
        assert!(surface.requires_single_buffer());
        assert_eq!(surface.buffer_strategy(), None);
    }
}
