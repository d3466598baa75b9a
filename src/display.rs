use crate::error::{Error, Result};
use crossterm::{cursor, execute, terminal};
use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

/// Where the environment sends each changed framebuffer. The machine never
/// talks to a screen directly, so anything that can show 64x32 pixels fits.
pub trait Display {
    /// draw a packed 1bpp frame, row-major
    fn draw(&mut self, data: &[u8]) -> Result<()>;

    /// bytes per frame this sink expects
    fn get_display_size_bytes(&self) -> usize;
}

#[derive(Debug, Clone, Copy)]
struct Resolution {
    width: usize,
    height: usize,
}

impl Resolution {
    fn new(width: usize, height: usize) -> Self {
        Resolution { width, height }
    }

    fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// 1bpp, so eight pixels to a byte
    fn byte_count(&self) -> usize {
        self.pixel_count() / 8
    }

    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.width - 1) as f64]
    }

    /// canvas y grows upwards, so row 0 sits at the top edge
    fn y_bounds(&self) -> [f64; 2] {
        [-((self.height - 1) as f64), 0.0]
    }

    /// screen plus border, cut down to what the terminal actually has
    fn area(&self, available: Rect) -> Rect {
        let wanted = Rect::new(0, 0, self.width as u16 + 2, self.height as u16 + 2);
        wanted.intersection(available)
    }

    /// frames must be exactly one screen's worth
    fn check_frame(&self, data: &[u8]) -> Result<()> {
        if data.len() != self.byte_count() {
            return Err(Error::Terminal(format!(
                "frame is {} bytes, display wants {}",
                data.len(),
                self.byte_count()
            )));
        }
        Ok(())
    }

    /// canvas coords of every pixel that is lit (or unlit), last pixel first
    fn pixels<'a>(&self, data: &'a [u8], lit: bool) -> impl Iterator<Item = (f64, f64)> + 'a {
        let width = self.width;
        (0..self.pixel_count()).rev().filter_map(move |n| {
            let on = data[n / 8] & (0x80 >> (n % 8)) != 0;
            (on == lit).then(|| ((n % width) as f64, -((n / width) as f64)))
        })
    }
}

/// monochrome display in a terminal, rendered using TUI and crossterm
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
}

impl MonoTermDisplay {
    pub fn new(x: usize, y: usize) -> Result<MonoTermDisplay> {
        let mut stdout = io::stdout();
        execute!(stdout, terminal::Clear(terminal::ClearType::All), cursor::Hide)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(MonoTermDisplay {
            terminal,
            resolution: Resolution::new(x, y),
        })
    }
}

impl Drop for MonoTermDisplay {
    fn drop(&mut self) {
        // best effort, we may already be unwinding
        let _ = execute!(io::stdout(), cursor::Show);
    }
}

impl Display for MonoTermDisplay {
    fn draw(&mut self, data: &[u8]) -> Result<()> {
        self.resolution.check_frame(data)?;

        // one terminal cell per machine pixel
        let resolution = &self.resolution;
        self.terminal.draw(|f| {
            let area = resolution.area(f.size());
            let unlit: Vec<_> = resolution.pixels(data, false).collect();
            let lit: Vec<_> = resolution.pixels(data, true).collect();
            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("OCTET8")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds(resolution.x_bounds())
                .y_bounds(resolution.y_bounds())
                .marker(Marker::Block)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &unlit,
                        color: Color::Black,
                    });
                    ctx.draw(&Points {
                        coords: &lit,
                        color: Color::White,
                    });
                });
            f.render_widget(canvas, area);
        })?;
        Ok(())
    }

    fn get_display_size_bytes(&self) -> usize {
        self.resolution.byte_count()
    }
}

/// useful for testing non-display routines; remembers what it was asked to draw
#[derive(Debug, Default)]
pub struct DummyDisplay {
    pub frames: usize,
    pub last: Vec<u8>,
}

impl DummyDisplay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Display for DummyDisplay {
    fn draw(&mut self, data: &[u8]) -> Result<()> {
        Resolution::new(64, 32).check_frame(data)?;
        self.frames += 1;
        self.last = data.to_vec();
        Ok(())
    }

    fn get_display_size_bytes(&self) -> usize {
        crate::memory::DISPLAY_SIZE_BYTES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chip8_screen_sizes() {
        let r = Resolution::new(64, 32);
        assert_eq!(r.pixel_count(), 2048);
        assert_eq!(r.byte_count(), 256);
        assert_eq!(r.x_bounds(), [0.0, 63.0]);
        assert_eq!(r.y_bounds(), [-31.0, 0.0]);
    }

    #[test]
    fn test_area_fits_small_terminal() {
        let r = Resolution::new(64, 32);
        assert_eq!(r.area(Rect::new(0, 0, 200, 50)), Rect::new(0, 0, 66, 34));
        assert_eq!(r.area(Rect::new(0, 0, 40, 20)), Rect::new(0, 0, 40, 20));
        assert_eq!(r.area(Rect::new(0, 0, 80, 24)), Rect::new(0, 0, 66, 24));
    }

    #[test]
    fn test_pixels_split_frame() {
        let r = Resolution::new(64, 32);
        let mut frame = [0u8; 256];
        frame[0] = 0x80; // (0, 0)
        frame[8 + 7] = 0x01; // (63, 1)
        let lit: Vec<_> = r.pixels(&frame, true).collect();
        assert_eq!(lit, vec![(63.0, -1.0), (0.0, 0.0)]);
        assert_eq!(r.pixels(&frame, false).count(), 2046);
    }

    #[test]
    fn test_check_frame_rejects_wrong_size() {
        let r = Resolution::new(64, 32);
        assert!(r.check_frame(&[0; 256]).is_ok());
        assert!(matches!(r.check_frame(&[0; 257]), Err(Error::Terminal(_))));
    }

    #[test]
    fn test_dummy_records_frames() -> Result<()> {
        let mut d = DummyDisplay::new();
        let mut frame = [0u8; 256];
        frame[3] = 0x42;
        d.draw(&frame)?;
        d.draw(&frame)?;
        assert_eq!(d.frames, 2);
        assert_eq!(d.last[3], 0x42);
        assert_eq!(d.get_display_size_bytes(), frame.len());
        assert!(d.draw(&frame[..10]).is_err());
        Ok(())
    }

    #[test]
    #[ignore]
    // needs a real terminal
    fn test_term_display_draws_blank_frame() -> Result<()> {
        let mut d = MonoTermDisplay::new(64, 32)?;
        assert_eq!(d.get_display_size_bytes(), 256);
        d.draw(&[0; 256])
    }
}
