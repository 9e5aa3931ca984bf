// SPDX-License-Identifier: GPL-3.0-only

//! Terminal-based camera viewer
//!
//! Shows the render sink's surface in the terminal using Unicode half-block
//! characters for improved vertical resolution.

use crate::app::{CameraController, ControllerEvent};
use crate::backends::camera::default_device;
use crate::config::Config;
use crate::constants::{photo, timing};
use crate::imaging::ImageContext;
use crate::render::{RenderingSession, select_rasterizer};
use crate::storage::{DirectoryPhotoLibrary, LocalFileSystem};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use image::RgbaImage;
use ratatui::{
    Terminal, backend::CrosstermBackend, buffer::Buffer, layout::Rect, style::Color,
    widgets::Widget,
};
use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Log file used while the terminal viewer owns the screen
pub fn log_file_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(photo::LIBRARY_DIR_NAME)
        .join("terminal.log")
}

/// Run the terminal camera viewer
pub fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    let _guard = runtime.enter();

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let result = run_app(&mut terminal, config);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let device = default_device(&config.device, config.framerate())?;
    info!(device = %device.info().name, "Using capture device");

    // One surface pixel per half-block; the last row is the status bar
    let size = terminal.size()?;
    let bounds = (
        u32::from(size.width.max(1)),
        u32::from(size.height.saturating_sub(1).max(1)) * 2,
    );
    let image_context = Arc::new(ImageContext::new(select_rasterizer(config.use_gpu)));
    let rendering = Arc::new(RenderingSession::new(
        bounds,
        config.display_scale,
        image_context,
    ));

    let library = Arc::new(DirectoryPhotoLibrary::new(config.library_dir()));
    let mut controller = CameraController::new(
        config,
        device,
        Arc::clone(&rendering),
        library,
        Arc::new(LocalFileSystem),
    );
    let mut events = controller
        .take_events()
        .ok_or("controller events already taken")?;

    let mut show_help = false;
    let mut status_message = match controller.start() {
        Ok(()) => build_status_message(),
        Err(e) => format!("Error: {}", e),
    };

    loop {
        while let Some(message) = next_event_message(&mut events) {
            status_message = message;
        }

        let frame_widget = FrameWidget::new(
            (rendering.surface().generation() > 0).then(|| rendering.surface().front_buffer()),
        );

        // Draw
        terminal.draw(|f| {
            let area = f.area();

            // Reserve bottom line for status
            let camera_area = Rect {
                x: area.x,
                y: area.y,
                width: area.width,
                height: area.height.saturating_sub(1),
            };

            f.render_widget(&frame_widget, camera_area);

            let status_area = Rect {
                x: area.x,
                y: area.height.saturating_sub(1),
                width: area.width,
                height: 1,
            };

            let status = StatusBar {
                message: &status_message,
            };
            f.render_widget(status, status_area);
        })?;

        // Handle input with timeout for frame updates
        if event::poll(Duration::from_millis(timing::UI_TICK_MS))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            // Ctrl+C to quit
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                break;
            }

            match key.code {
                KeyCode::Char('p') => {
                    show_help = false;
                    status_message = "Capturing...".to_string();
                    controller.take_photo();
                }
                KeyCode::Char('s') => {
                    show_help = false;
                    status_message = "Saving...".to_string();
                    controller.save_photo();
                }
                KeyCode::Char('u') => {
                    controller.upload_photo();
                }
                KeyCode::Char('h') => {
                    show_help = !show_help;
                    status_message = if show_help {
                        build_help_message()
                    } else {
                        build_status_message()
                    };
                }
                KeyCode::Char('q') => break,
                _ => {}
            }
        }
    }

    controller.stop();
    Ok(())
}

fn next_event_message(events: &mut mpsc::UnboundedReceiver<ControllerEvent>) -> Option<String> {
    let event = events.try_recv().ok()?;
    Some(match event {
        ControllerEvent::PhotoCaptured { width, height } => {
            format!("Captured {}x{} | 's' save", width, height)
        }
        ControllerEvent::PhotoCaptureFailed(e) => {
            error!(error = %e, "Photo capture failed");
            format!("Error: {}", e)
        }
        ControllerEvent::PhotoSaved(outcome) => outcome.to_string(),
    })
}

fn build_status_message() -> String {
    "'p' picture | 's' save | 'h' help | 'q' quit".to_string()
}

fn build_help_message() -> String {
    "p: Take picture | s: Save to library | u: Upload | h: Toggle help | q/Ctrl+C: Quit"
        .to_string()
}

/// Widget that renders the surface using half-block characters
struct FrameWidget {
    frame: Option<Arc<RgbaImage>>,
}

impl FrameWidget {
    fn new(frame: Option<Arc<RgbaImage>>) -> Self {
        Self { frame }
    }
}

impl Widget for &FrameWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let frame = match &self.frame {
            Some(frame) if frame.width() > 0 && frame.height() > 0 => frame,
            _ => {
                // No frame yet - show placeholder
                let msg = "Waiting for camera...";
                let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
                let y = area.y + area.height / 2;
                if y < area.y + area.height && x < area.x + area.width {
                    buf.set_string(x, y, msg, ratatui::style::Style::default());
                }
                return;
            }
        };

        // Each terminal cell displays 2 vertical pixels using half-block characters
        let frame_aspect = frame.width() as f64 / frame.height() as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            // Terminal is wider - fit to height
            let h = term_height;
            let w = h * frame_aspect;
            (w as u16, (h / 2.0) as u16)
        } else {
            // Terminal is taller - fit to width
            let w = term_width;
            let h = w / frame_aspect;
            (w as u16, (h / 2.0) as u16)
        };

        if display_width == 0 || display_height == 0 {
            return;
        }

        // Center the image
        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = frame.width() as f64 / display_width as f64;
        let y_scale = frame.height() as f64 / (display_height * 2) as f64;

        // Upper half (▀) colored with fg, lower half with bg
        for ty in 0..display_height {
            for tx in 0..display_width {
                let term_x = x_offset + tx;
                let term_y = y_offset + ty;

                let src_x = (tx as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                let top_color = sample_pixel(frame, src_x, src_y_top);
                let bottom_color = sample_pixel(frame, src_x, src_y_bottom);

                if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                    cell.set_char('▀');
                    cell.set_fg(top_color);
                    cell.set_bg(bottom_color);
                }
            }
        }
    }
}

fn sample_pixel(frame: &RgbaImage, x: u32, y: u32) -> Color {
    let x = x.min(frame.width() - 1);
    let y = y.min(frame.height() - 1);
    let [r, g, b, _] = frame.get_pixel(x, y).0;
    Color::Rgb(r, g, b)
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Fill background
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        let text: String = self.message.chars().take(area.width as usize).collect();

        buf.set_string(
            area.x,
            area.y,
            text,
            ratatui::style::Style::default()
                .fg(Color::White)
                .bg(Color::DarkGray),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_half_blocks_carry_two_rows() {
        let mut image = RgbaImage::from_pixel(2, 4, Rgba([0, 0, 255, 255]));
        image.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        let widget = FrameWidget::new(Some(Arc::new(image)));

        let area = Rect::new(0, 0, 2, 2);
        let mut buf = Buffer::empty(area);
        (&widget).render(area, &mut buf);

        let cell = &buf[(0, 0)];
        assert_eq!(cell.symbol(), "▀");
        assert_eq!(cell.fg, Color::Rgb(255, 0, 0));
        assert_eq!(cell.bg, Color::Rgb(0, 0, 255));
    }

    #[test]
    fn test_placeholder_without_frame() {
        let widget = FrameWidget::new(None);
        let area = Rect::new(0, 0, 30, 3);
        let mut buf = Buffer::empty(area);
        (&widget).render(area, &mut buf);

        let row: String = (0..30).map(|x| buf[(x, 1)].symbol().to_string()).collect();
        assert!(row.contains("Waiting for camera..."));
    }

    #[test]
    fn test_status_bar_truncates() {
        let area = Rect::new(0, 0, 4, 1);
        let mut buf = Buffer::empty(area);
        StatusBar { message: "abcdef" }.render(area, &mut buf);
        let row: String = (0..4).map(|x| buf[(x, 0)].symbol().to_string()).collect();
        assert_eq!(row, "abcd");
    }
}
