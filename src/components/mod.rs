//! Components that put tiles on a screen.
//!
//! Everything visible on a screen is a node of a [`Scene`]: screens, layers grouping other
//! components, and [`Widget`]s. A widget owns a [`TileGrid`] positioned relative to its parent
//! and mutates its tiles directly; the renderer layers those tiles over the screen's own grid.
//!
//! Widgets talk back to the renderer through a [`RedrawRequest`], a trigger handed to them when
//! they are attached. Pulling it marks the scene dirty so the next frame gets drawn.
//!
//! [`Scene`]: scene::Scene

use crate::rendering::grid::TileGrid;
use crate::rendering::tile::Tile;
use crossterm::event::Event;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub mod scene;

/// A shared "please redraw" flag.
///
/// Cloning yields a handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct RedrawRequest {
    requested: Arc<AtomicBool>,
}

impl RedrawRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks for a redraw.
    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Returns whether a redraw was requested and clears the request.
    pub fn take(&self) -> bool {
        self.requested.swap(false, Ordering::AcqRel)
    }

    /// Returns whether both handles refer to the same flag.
    pub fn same_as(&self, other: &RedrawRequest) -> bool {
        Arc::ptr_eq(&self.requested, &other.requested)
    }
}

/// The capabilities the scene needs from a widget.
pub trait Widget {
    /// The widget's tiles. The grid's origin is the widget's position in its parent.
    fn tiles(&self) -> &TileGrid;

    fn tiles_mut(&mut self) -> &mut TileGrid;

    /// Called when the widget is attached to or detached from a scene. Widgets that change
    /// their appearance on their own should keep the request and pull it after each change.
    fn set_redraw_function(&mut self, _redraw: RedrawRequest) {}

    /// Called for input events while the widget is attached. Mouse coordinates are local to
    /// the widget. Returns whether the event changed the widget's state.
    fn on_event(&mut self, _event: &Event) -> bool {
        false
    }

    /// Called after an event changed the widget's state, before the redraw is requested.
    fn on_state_change(&mut self) {}
}

/// A plain block of tiles.
///
/// ```rust
/// use asciiterm::components::{Panel, Widget};
/// use asciiterm::rendering::color::Color;
/// use asciiterm::rendering::tile::Tile;
///
/// let panel = Panel::filled(3, 2, (1, 1), &Tile::new('#').with_background(Color::rgb(0, 0, 128)));
/// assert_eq!(panel.tiles().origin(), (1, 1));
/// assert_eq!(panel.tiles()[(2, 1)].character(), '#');
/// ```
#[derive(Debug, Clone)]
pub struct Panel {
    tiles: TileGrid,
    redraw: RedrawRequest,
}

impl Panel {
    pub fn new(width: usize, height: usize, origin: (i64, i64)) -> Self {
        Self {
            tiles: TileGrid::new(width, height, origin),
            redraw: RedrawRequest::new(),
        }
    }

    pub fn filled(width: usize, height: usize, origin: (i64, i64), tile: &Tile) -> Self {
        let mut panel = Self::new(width, height, origin);
        panel.tiles.fill(tile);
        panel
    }

    /// Changes tiles through `f` and requests a redraw.
    pub fn update(&mut self, f: impl FnOnce(&mut TileGrid)) {
        f(&mut self.tiles);
        self.redraw.request();
    }
}

impl Widget for Panel {
    fn tiles(&self) -> &TileGrid {
        &self.tiles
    }

    fn tiles_mut(&mut self) -> &mut TileGrid {
        &mut self.tiles
    }

    fn set_redraw_function(&mut self, redraw: RedrawRequest) {
        self.redraw = redraw;
    }
}
