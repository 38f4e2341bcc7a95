//! A tile-grid ASCII canvas for the terminal.
//!
//! Everything on screen is a grid of [`Tile`](rendering::tile::Tile)s: a character with a
//! foreground and a background color, an optional underline and a chain of bitmap shaders.
//! Tiles are rendered into pixels with a glyph font, and the rendered bitmaps are cached by
//! the tile's content hash, so a frame only costs as much as the number of cells that actually
//! changed.
//!
//! *   [`components`]: the [`Scene`] of screens, layers and widgets.
//! *   [`rendering`]: tiles, grids, the image cache and the screen render loop.
//! *   [`config`]: the [`RenderConfig`].
//! *   [`App`]: a ready-made run loop showing a scene in the terminal.
//!
//! # Example
//! ```rust ,no_run
//! use asciiterm::{App, install_panic_handler, terminal_cleanup, terminal_setup};
//! use asciiterm::components::Panel;
//! use asciiterm::config::RenderConfig;
//! use asciiterm::rendering::font::SpriteSheetFont;
//! use asciiterm::rendering::tile::Tile;
//!
//! let sheet = image::open("font.png").unwrap().to_rgba8();
//! let font = SpriteSheetFont::from_code_page(&sheet, 1, 2).unwrap();
//!
//! terminal_setup().unwrap();
//! install_panic_handler();
//!
//! let mut app = App::new_with_custom_buf_writer(Box::new(font), &RenderConfig::default()).unwrap();
//! let screen = app.screen();
//! app.scene_mut().attach(screen, Panel::filled(10, 3, (2, 2), &Tile::new('#'))).unwrap();
//! app.run().unwrap();
//!
//! terminal_cleanup().unwrap();
//! ```

use crate::components::scene::{NodeId, Scene};
use crate::config::RenderConfig;
use crate::error::AppError;
use crate::rendering::cache::ImageCache;
use crate::rendering::font::GlyphFont;
use crate::rendering::renderer::ScreenRenderer;
use crate::rendering::terminal::TerminalSurface;
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{cursor, execute};
use std::io;
use std::io::{Stdout, Write, stdout};
use std::sync::mpsc::{Receiver, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

pub mod components;
pub mod config;
pub mod error;
pub mod rendering;

#[cfg(test)]
mod testing;

/// Shows a [`Scene`] in the terminal.
///
/// The app owns one screen sized to fill the terminal: every terminal cell shows two pixels
/// stacked vertically, so a terminal of `columns` x `rows` cells holds
/// `columns / glyph_width` x `2 * rows / glyph_height` tiles.
///
/// Input is read on a separate thread and dispatched to the scene's widgets at the start of
/// every frame. Mouse positions are translated from terminal cells to tiles. `q` and `Esc`
/// end the loop.
pub struct App<W: Write> {
    renderer: ScreenRenderer<TerminalSurface<W>>,
    scene: Scene,
    screen: NodeId,
    glyph_size: (u32, u32),
    frame_duration: Duration,
    event_read_thread_handle: Option<JoinHandle<()>>,
    event_reader: Receiver<Event>,
    event_read_stop_signal: Option<Sender<()>>,
}

impl App<CustomBufWriter> {
    /// Creates an app with a sink that only flushes once every frame.
    /// This is the recommended sink.
    pub fn new_with_custom_buf_writer(
        font: Box<dyn GlyphFont>,
        config: &RenderConfig,
    ) -> io::Result<Self> {
        Self::new(CustomBufWriter::new(), font, config)
    }
}

impl App<Stdout> {
    pub fn new_with_stdout(font: Box<dyn GlyphFont>, config: &RenderConfig) -> io::Result<Self> {
        Self::new(stdout(), font, config)
    }
}

impl<W: Write> App<W> {
    /// Creates an app writing to `sink` and starts reading terminal events.
    pub fn new(sink: W, font: Box<dyn GlyphFont>, config: &RenderConfig) -> io::Result<Self> {
        let size = crossterm::terminal::size()?;

        let (event_writer, event_reader) = std::sync::mpsc::channel();
        let (event_read_stop_signal, event_read_stop_receiver) = std::sync::mpsc::channel::<()>();

        let event_read_thread_handle = std::thread::spawn(move || {
            loop {
                match crossterm::event::poll(Duration::from_millis(10)) {
                    Ok(true) => {
                        if let Ok(event) = crossterm::event::read() {
                            if event_writer.send(event).is_err() {
                                break;
                            }
                        }
                    }
                    Ok(false) => {}
                    Err(err) => {
                        log::error!("stopped reading terminal events: {err}");
                        break;
                    }
                }
                if event_read_stop_receiver.try_recv().is_ok() {
                    break;
                }
            }
        });

        let mut app = Self::with_events(sink, font, config, size, event_reader);
        app.event_read_thread_handle = Some(event_read_thread_handle);
        app.event_read_stop_signal = Some(event_read_stop_signal);
        Ok(app)
    }

    /// Creates an app for a terminal of `columns` x `rows` cells that takes its input from
    /// `events` instead of the terminal.
    pub fn with_events(
        sink: W,
        font: Box<dyn GlyphFont>,
        config: &RenderConfig,
        (columns, rows): (u16, u16),
        events: Receiver<Event>,
    ) -> Self {
        let glyph_size = font.glyph_size();
        let surface = TerminalSurface::new(columns, rows, sink);
        let (width, height) = tiles_for(surface.pixel_size(), glyph_size);
        let cache = ImageCache::new(font, config.cache_config());
        let renderer = ScreenRenderer::new(surface, cache, config);

        let mut scene = Scene::new();
        let screen = scene.add_screen(width, height);
        log::debug!("terminal of {columns}x{rows} cells holds {width}x{height} tiles");

        Self {
            renderer,
            scene,
            screen,
            glyph_size,
            frame_duration: config.frame_duration(),
            event_read_thread_handle: None,
            event_reader: events,
            event_read_stop_signal: None,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// The screen filling the terminal.
    pub fn screen(&self) -> NodeId {
        self.screen
    }

    pub fn renderer(&self) -> &ScreenRenderer<TerminalSurface<W>> {
        &self.renderer
    }

    /// Maps a terminal cell to the tile showing its top pixel.
    pub fn terminal_to_tile(&self, column: u16, row: u16) -> (u16, u16) {
        let (glyph_width, glyph_height) = self.glyph_size;
        let x = column as u32 / glyph_width.max(1);
        let y = row as u32 * 2 / glyph_height.max(1);
        (
            x.min(u16::MAX as u32) as u16,
            y.min(u16::MAX as u32) as u16,
        )
    }

    /// Runs the loop until `q` or `Esc` is pressed.
    pub fn run(&mut self) -> Result<(), AppError> {
        // how much longer the last sleep() slept than expected.
        let mut last_overhead = Duration::from_nanos(0);

        loop {
            let now = Instant::now();
            if !self.step()? {
                break;
            }

            // Sleep until the next frame
            let current = Instant::now();
            let remaining_time = self
                .frame_duration
                .saturating_sub(current.duration_since(now))
                .saturating_sub(last_overhead);
            std::thread::sleep(remaining_time);
            let time_slept = Instant::now().duration_since(current);
            last_overhead = time_slept.saturating_sub(remaining_time);
        }

        self.cleanup();
        Ok(())
    }

    /// Handles pending events and draws a frame.
    ///
    /// Drawing only paints cells whose tiles changed, so tiles edited directly through
    /// [`App::scene_mut`] show up on the next step without requesting a redraw.
    ///
    /// Returns `false` once the app should quit.
    pub fn step(&mut self) -> Result<bool, AppError> {
        while let Ok(event) = self.event_reader.try_recv() {
            if !self.on_event(event) {
                return Ok(false);
            }
        }

        self.scene.redraw_request().take();
        self.renderer.draw(&mut self.scene, self.screen)?;
        Ok(true)
    }

    fn on_event(&mut self, event: Event) -> bool {
        match event {
            Event::Key(KeyEvent {
                code: KeyCode::Char('q') | KeyCode::Esc,
                kind: KeyEventKind::Press,
                ..
            }) => return false,
            Event::Resize(columns, rows) => self.on_resize(columns, rows),
            Event::Mouse(mut mouse) => {
                (mouse.column, mouse.row) = self.terminal_to_tile(mouse.column, mouse.row);
                self.scene.dispatch_event(self.screen, &Event::Mouse(mouse));
            }
            event => {
                self.scene.dispatch_event(self.screen, &event);
            }
        }
        true
    }

    /// The screen keeps its size; the terminal shows whatever part of it fits.
    fn on_resize(&mut self, columns: u16, rows: u16) {
        log::debug!("terminal resized to {columns}x{rows}");
        self.renderer.surface_mut().resize(columns, rows);
        self.renderer.invalidate();
        self.scene.redraw_request().request();
    }

    fn cleanup(&mut self) {
        if let Some(stop) = self.event_read_stop_signal.take() {
            // the reader thread may already be gone
            let _ = stop.send(());
        }
        if let Some(handle) = self.event_read_thread_handle.take() {
            if handle.join().is_err() {
                log::error!("event reader thread panicked");
            }
        }
    }
}

impl<W: Write> Drop for App<W> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn tiles_for((pixel_width, pixel_height): (u32, u32), (glyph_width, glyph_height): (u32, u32)) -> (usize, usize) {
    (
        (pixel_width / glyph_width.max(1)).max(1) as usize,
        (pixel_height / glyph_height.max(1)).max(1) as usize,
    )
}

/// Sets up the terminal for the app.
///
/// This function should be called before any other terminal functions.
/// It sets up the terminal for raw mode, hides the cursor, tells the terminal to send mouse events,
/// and enters the alternate screen.
///
/// It is recommended to call `install_panic_handler` after this function, and `terminal_cleanup` after the run loop.
///
/// Note: If you are stuck in a bad terminal state, you can try running `reset` in the terminal.
pub fn terminal_setup() -> io::Result<()> {
    let mut stdout = stdout();

    execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;
    enable_raw_mode()?;
    execute!(stdout, EnableMouseCapture, cursor::Hide)?;

    Ok(())
}

/// Resets everything done by `terminal_setup`.
pub fn terminal_cleanup() -> io::Result<()> {
    let mut stdout = stdout();
    execute!(
        stdout,
        DisableMouseCapture,
        cursor::Show,
        crossterm::style::ResetColor,
        crossterm::terminal::Clear(crossterm::terminal::ClearType::All)
    )?;

    disable_raw_mode()?;

    execute!(stdout, crossterm::terminal::LeaveAlternateScreen)?;

    Ok(())
}

/// Installs a panic handler that restores the terminal before printing the panic.
///
/// Without this, the panic message would not be displayed properly because we're in raw mode
/// and in the alternate screen.
pub fn install_panic_handler() {
    let old_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |pinfo| {
        if let Err(err) = terminal_cleanup() {
            eprintln!("failed to restore the terminal: {err}");
        }
        old_hook(pinfo);
    }));
}

/// Buffered stdout writer that _only_ writes on an explicit flush.
///
/// The terminal surface flushes once per presented frame, so a frame reaches the terminal in
/// a single write instead of one write per escape sequence.
pub struct CustomBufWriter {
    buf: Vec<u8>,
    stdout: Stdout,
}

impl CustomBufWriter {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Preallocates `capacity` bytes, e.g. the size of a full-screen frame.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            stdout: stdout(),
        }
    }

    /// Bytes written since the last flush.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

impl Default for CustomBufWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for CustomBufWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut lock = self.stdout.lock();
        lock.write_all(&self.buf)?;
        lock.flush()?;
        self.buf.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Panel, Widget};
    use crate::rendering::grid::TileGrid;
    use crate::rendering::surface::{BufferStrategy, PresentationSurface};
    use crate::testing::test_font;
    use crossterm::event::{KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
    use std::sync::mpsc::channel;

    struct Clicks {
        tiles: TileGrid,
        seen: Vec<(u16, u16)>,
    }

    impl Widget for Clicks {
        fn tiles(&self) -> &TileGrid {
            &self.tiles
        }

        fn tiles_mut(&mut self) -> &mut TileGrid {
            &mut self.tiles
        }

        fn on_event(&mut self, event: &Event) -> bool {
            if let Event::Mouse(mouse) = event {
                self.seen.push((mouse.column, mouse.row));
                self.tiles[(mouse.column as i64, mouse.row as i64)].set_character('x');
                return true;
            }
            false
        }
    }

    // 10x5 terminal cells are 10x10 pixels, which hold 5x5 of the 2x2 test glyphs
    fn test_app() -> (App<Vec<u8>>, Sender<Event>) {
        let (sender, receiver) = channel();
        let app = App::with_events(
            Vec::new(),
            Box::new(test_font()),
            &RenderConfig::default(),
            (10, 5),
            receiver,
        );
        (app, sender)
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_screen_fills_terminal() {
        let (app, _events) = test_app();
        let grid = app.scene().grid(app.screen()).unwrap();
        assert_eq!((grid.width(), grid.height()), (5, 5));
        assert_eq!(app.terminal_to_tile(9, 4), (4, 4));
        assert_eq!(app.terminal_to_tile(3, 1), (1, 1));
    }

    #[test]
    fn test_quit_keys() {
        let (mut app, events) = test_app();
        events.send(key(KeyCode::Char('a'))).unwrap();
        assert!(app.step().unwrap());
        events.send(key(KeyCode::Esc)).unwrap();
        assert!(!app.step().unwrap());
    }

    #[test]
    fn test_first_step_draws() {
        let (mut app, _events) = test_app();
        assert!(app.step().unwrap());
        assert!(app.renderer().is_first_render_done());
        assert!(!app.renderer().surface().sink().is_empty());
    }

    #[test]
    fn test_direct_tile_edits_are_drawn() {
        let (mut app, _events) = test_app();
        app.step().unwrap();
        let before = app.renderer().surface().sink().len();

        let screen = app.screen();
        app.scene_mut().grid_mut(screen).unwrap()[(0, 0)].set_character('a');
        app.step().unwrap();

        let output = String::from_utf8_lossy(&app.renderer().surface().sink()[before..]);
        assert_eq!(output.matches('▀').count(), 1);
    }

    #[test]
    fn test_mouse_is_mapped_to_tiles() {
        let (mut app, events) = test_app();
        let screen = app.screen();
        let clicks = app
            .scene_mut()
            .attach(
                screen,
                Clicks {
                    tiles: TileGrid::new(2, 2, (2, 2)),
                    seen: Vec::new(),
                },
            )
            .unwrap();
        app.step().unwrap();

        events
            .send(Event::Mouse(MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Left),
                column: 7,
                row: 1,
                modifiers: KeyModifiers::NONE,
            }))
            .unwrap();
        app.step().unwrap();

        // terminal cell (7, 1) is tile (3, 1), which lies outside the widget
        assert_eq!(app.scene().grid(clicks).unwrap()[(1, 0)].character(), ' ');

        events
            .send(Event::Mouse(MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Left),
                column: 7,
                row: 2,
                modifiers: KeyModifiers::NONE,
            }))
            .unwrap();
        app.step().unwrap();
        assert_eq!(app.scene().grid(clicks).unwrap()[(1, 0)].character(), 'x');
    }

    #[test]
    fn test_resize_repaints() {
        let (mut app, events) = test_app();
        let screen = app.screen();
        app.scene_mut()
            .attach(screen, Panel::new(1, 1, (0, 0)))
            .unwrap();
        app.step().unwrap();

        events.send(Event::Resize(4, 2)).unwrap();
        assert!(app.step().unwrap());
        assert_eq!(app.renderer().surface().pixel_size(), (4, 4));
        // resizing drops the buffer strategy, drawing after it recreates one
        assert_eq!(app.renderer().surface().buffer_strategy(), Some(BufferStrategy::Double));
    }

    #[test]
    fn test_custom_buf_writer_holds_until_flush() {
        let mut writer = CustomBufWriter::with_capacity(16);
        writer.write_all(b"abc").unwrap();
        assert_eq!(writer.pending(), 3);
    }
}
