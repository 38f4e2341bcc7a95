use asciiterm::components::scene::Scene;
use asciiterm::components::{Panel, RedrawRequest, Widget};
use asciiterm::config::RenderConfig;
use asciiterm::rendering::Bitmap;
use asciiterm::rendering::color::Color;
use asciiterm::rendering::font::SpriteSheetFont;
use asciiterm::rendering::grid::TileGrid;
use asciiterm::rendering::tile::Tile;
use asciiterm::{App, install_panic_handler, terminal_cleanup, terminal_setup};
use crossterm::event::{Event, MouseEventKind};
use image::Rgba;
use std::error::Error;

const INK: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// One tile per terminal cell: '█' inks both halves, '▀' and '▄' one of them.
fn block_font() -> Result<SpriteSheetFont, Box<dyn Error>> {
    let mut font = SpriteSheetFont::new(1, 2)?;
    for (c, top, bottom) in [(' ', false, false), ('█', true, true), ('▀', true, false), ('▄', false, true)] {
        let mut glyph = Bitmap::new(1, 2);
        if top {
            glyph.put_pixel(0, 0, INK);
        }
        if bottom {
            glyph.put_pixel(0, 1, INK);
        }
        font.insert_glyph(c, glyph)?;
    }
    Ok(font)
}

/// Changes color whenever it is clicked.
struct ColorSwatch {
    tiles: TileGrid,
    palette: Vec<Color>,
    current: usize,
    redraw: RedrawRequest,
}

impl ColorSwatch {
    fn new(origin: (i64, i64)) -> Self {
        let palette = vec![
            Color::rgb(220, 50, 47),
            Color::rgb(133, 153, 0),
            Color::rgb(38, 139, 210),
        ];
        let mut swatch = Self {
            tiles: TileGrid::new(8, 4, origin),
            palette,
            current: 0,
            redraw: RedrawRequest::new(),
        };
        swatch.paint();
        swatch
    }

    fn paint(&mut self) {
        let color = self.palette[self.current];
        self.tiles.fill(&Tile::new('█').with_foreground(color));
    }
}

impl Widget for ColorSwatch {
    fn tiles(&self) -> &TileGrid {
        &self.tiles
    }

    fn tiles_mut(&mut self) -> &mut TileGrid {
        &mut self.tiles
    }

    fn set_redraw_function(&mut self, redraw: RedrawRequest) {
        self.redraw = redraw;
    }

    fn on_event(&mut self, event: &Event) -> bool {
        match event {
            Event::Mouse(mouse) if matches!(mouse.kind, MouseEventKind::Down(_)) => {
                self.current = (self.current + 1) % self.palette.len();
                true
            }
            _ => false,
        }
    }

    fn on_state_change(&mut self) {
        self.paint();
    }
}

fn build(scene: &mut Scene, screen: asciiterm::components::scene::NodeId) -> Result<(), Box<dyn Error>> {
    let stripe = Tile::new('▀')
        .with_foreground(Color::rgb(255, 200, 0))
        .with_background(Color::rgb(40, 40, 40));
    scene.attach(screen, Panel::filled(20, 1, (2, 1), &stripe))?;
    scene.attach(screen, ColorSwatch::new((2, 3)))?;

    let mut cursor = Panel::filled(1, 1, (12, 3), &Tile::new('▄').with_underline(1));
    cursor.tiles_mut()[(0, 0)].set_blinking(true);
    scene.attach(screen, cursor)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let font = block_font()?;

    terminal_setup()?;
    install_panic_handler();

    let mut app = App::new_with_custom_buf_writer(Box::new(font), &RenderConfig::default())?;
    let screen = app.screen();
    build(app.scene_mut(), screen)?;
    // 'q' or Esc quits
    app.run()?;

    terminal_cleanup()?;

    Ok(())
}
