//! Presenting frames in a terminal.
//!
//! [`TerminalSurface`] wraps a [`FrameBuffer`] and, on every successful present, writes the
//! presented image to a terminal using `crossterm`. Each terminal cell shows two vertically
//! stacked pixels as an upper half block ('▀') whose foreground is the top pixel and whose
//! background is the bottom pixel.
//!
//! Like the frame buffer itself the output is diffed: only terminal cells whose pixel pair
//! changed since the last present are written, and color changes are only emitted when the
//! color actually differs from the last one sent.

use crate::error::RenderError;
use crate::rendering::color::Color;
use crate::rendering::surface::{
    BufferStrategy, DrawTarget, FrameBuffer, PresentOutcome, PresentationSurface,
};
use crossterm::queue;
use crossterm::style::{Colors, Print, SetColors};
use std::io::Write;

const UPPER_HALF_BLOCK: char = '▀';

type CellColors = (Color, Color);

/// A presentation surface writing half-block characters to `sink`.
pub struct TerminalSurface<W: Write> {
    frame: FrameBuffer,
    columns: u16,
    rows: u16,
    /// What each terminal cell showed after the last present, `None` if unknown.
    shown: Vec<Option<CellColors>>,
    sink: W,
}

impl<W: Write> TerminalSurface<W> {
    /// Creates a surface covering `columns` x `rows` terminal cells, i.e. `columns` x
    /// `2 * rows` pixels.
    pub fn new(columns: u16, rows: u16, sink: W) -> Self {
        Self {
            frame: FrameBuffer::new(columns as u32, rows as u32 * 2),
            columns,
            rows,
            shown: vec![None; columns as usize * rows as usize],
            sink,
        }
    }

    /// Pixel size of the surface.
    pub fn pixel_size(&self) -> (u32, u32) {
        self.frame.size()
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    /// Resizes to the new terminal size. Everything is rewritten on the next present and the
    /// buffer strategy has to be recreated.
    pub fn resize(&mut self, columns: u16, rows: u16) {
        self.columns = columns;
        self.rows = rows;
        self.frame.resize(columns as u32, rows as u32 * 2);
        self.frame.drop_buffer_strategy();
        self.shown = vec![None; columns as usize * rows as usize];
    }

    /// Forgets what the terminal shows, e.g. after something else wrote to it.
    pub fn invalidate_terminal(&mut self) {
        self.shown.iter_mut().for_each(|cell| *cell = None);
    }

    fn flush_to_terminal(&mut self) -> std::io::Result<usize> {
        let image = self.frame.front();
        let mut last_colors: Option<CellColors> = None;
        let mut cursor: Option<(u16, u16)> = None;
        let mut written = 0;

        for row in 0..self.rows {
            for col in 0..self.columns {
                let top = Color::from(*image.get_pixel(col as u32, row as u32 * 2));
                let bottom = Color::from(*image.get_pixel(col as u32, row as u32 * 2 + 1));
                let idx = row as usize * self.columns as usize + col as usize;
                if self.shown[idx] == Some((top, bottom)) {
                    continue;
                }

                if cursor != Some((col, row)) {
                    queue!(self.sink, crossterm::cursor::MoveTo(col, row))?;
                }
                // a single SetColors for both changes; a noop if neither changed
                let (fg_change, bg_change) = match last_colors {
                    Some((fg, bg)) => ((fg != top).then_some(top), (bg != bottom).then_some(bottom)),
                    None => (Some(top), Some(bottom)),
                };
                queue!(
                    self.sink,
                    SetColors(Colors {
                        foreground: fg_change.map(Into::into),
                        background: bg_change.map(Into::into),
                    }),
                    Print(UPPER_HALF_BLOCK)
                )?;
                last_colors = Some((top, bottom));
                // printing advances the cursor, except past the last column
                cursor = (col + 1 < self.columns).then_some((col + 1, row));
                self.shown[idx] = Some((top, bottom));
                written += 1;
            }
        }

        queue!(self.sink, crossterm::style::ResetColor)?;
        self.sink.flush()?;
        Ok(written)
    }
}

impl<W: Write> PresentationSurface for TerminalSurface<W> {
    fn is_visible(&self) -> bool {
        self.columns > 0 && self.rows > 0
    }

    fn buffer_strategy(&self) -> Option<BufferStrategy> {
        self.frame.buffer_strategy()
    }

    fn create_buffer_strategy(&mut self, strategy: BufferStrategy) -> Result<(), RenderError> {
        self.frame.create_buffer_strategy(strategy)
    }

    fn back_buffer(&mut self) -> Option<&mut dyn DrawTarget> {
        self.frame.back_buffer()
    }

    fn take_contents_restored(&mut self) -> bool {
        self.frame.take_contents_restored()
    }

    fn present(&mut self) -> Result<PresentOutcome, RenderError> {
        let outcome = self.frame.present()?;
        if outcome == PresentOutcome::Presented {
            let written = self.flush_to_terminal()?;
            log::trace!("wrote {written} terminal cells");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn present_white_square(surface: &mut TerminalSurface<Vec<u8>>) {
        surface
            .back_buffer()
            .unwrap()
            .fill_rect(0, 0, 1, 2, Color::WHITE);
        assert_eq!(surface.present().unwrap(), PresentOutcome::Presented);
    }

    #[test]
    fn test_first_present_writes_every_cell() {
        let mut surface = TerminalSurface::new(3, 2, Vec::new());
        surface.create_buffer_strategy(BufferStrategy::Double).unwrap();
        present_white_square(&mut surface);

        let output = String::from_utf8_lossy(surface.sink());
        assert_eq!(output.matches(UPPER_HALF_BLOCK).count(), 6);
    }

    #[test]
    fn test_unchanged_cells_are_skipped() {
        let mut surface = TerminalSurface::new(3, 2, Vec::new());
        surface.create_buffer_strategy(BufferStrategy::Double).unwrap();
        present_white_square(&mut surface);
        let before = surface.sink().len();

        surface
            .back_buffer()
            .unwrap()
            .fill_rect(2, 2, 1, 2, Color::rgb(0, 0, 255));
        surface.present().unwrap();

        let output = String::from_utf8_lossy(&surface.sink()[before..]);
        assert_eq!(output.matches(UPPER_HALF_BLOCK).count(), 1);
    }

    #[test]
    fn test_resize_drops_strategy() {
        let mut surface = TerminalSurface::new(3, 2, Vec::new());
        surface.create_buffer_strategy(BufferStrategy::Double).unwrap();
        surface.resize(5, 5);
        assert_eq!(surface.buffer_strategy(), None);
        assert_eq!(surface.pixel_size(), (5, 10));
    }
}
