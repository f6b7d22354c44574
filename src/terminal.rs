// SPDX-License-Identifier: GPL-3.0-only

//! Terminal-based frame viewer
//!
//! Renders one display view at a time using Unicode half-block characters
//! for improved vertical resolution. 'v' cycles through the views.

use crate::backends::camera::FrameSource;
use crate::backends::camera::frame_loop::Ticker;
use crate::backends::display::{DisplayView, MemorySink};
use crate::backends::virtual_camera::{SyntheticConfig, VirtualSource};
use crate::config::Config;
use crate::constants::timing::POLL_INTERVAL;
use crate::pipelines::monitor::{FrameMonitor, MonitorSession, MonitorSettings, UpdateOutcome};

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
use tracing::{error, info};

/// Run the terminal viewer on `source` ("synthetic" or a capture directory)
pub fn run(source: &str, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let settings = MonitorSettings::from_config(&config)?;
    let source = Arc::new(VirtualSource::open(source, SyntheticConfig::default())?);
    info!(source = source.name(), fps = config.fps, "Starting terminal viewer");

    let ticker_source = Arc::clone(&source);
    let mut ticker = Ticker::start("terminal-source", config.fps, None, move || {
        ticker_source.tick()
    });

    let mut monitor = FrameMonitor::new(settings, MemorySink::new());

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = {
        let mut session = monitor.start(&*source);
        run_app(&mut terminal, &mut session)
    };

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    ticker.stop();

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    session: &mut MonitorSession<'_, MemorySink>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut view = DisplayView::Camera;
    let mut show_help = false;
    let mut status_message = build_status_message(view, None);

    loop {
        // Drain pending notifications so the latest frame is shown
        if session.pump() > 0 && !show_help {
            let outcome = session.last_report().map(|r| r.outcome(view.kind()).clone());
            status_message = build_status_message(view, outcome.as_ref());
        }

        let texture = session.monitor().sink().latest(view);

        terminal.draw(|f| {
            let (view_area, status_area) = split_status_line(f.area());
            f.render_widget(FrameWidget { texture, view }, view_area);
            f.render_widget(
                StatusBar {
                    message: &status_message,
                },
                status_area,
            );
        })?;

        // Handle input with timeout for frame updates
        if event::poll(POLL_INTERVAL)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            // Ctrl+C to quit
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                break;
            }

            match key.code {
                KeyCode::Char('q') => break,
                KeyCode::Char('v') => {
                    show_help = false;
                    view = view.next();
                    status_message = build_status_message(view, None);
                }
                KeyCode::Char('f') => {
                    let monitor = session.monitor_mut();
                    let mut settings = *monitor.settings();
                    settings.flip_vertical = !settings.flip_vertical;
                    monitor.set_settings(settings);
                }
                KeyCode::Char('s') => {
                    show_help = false;
                    if let Some(texture) = session.monitor().sink().latest(view) {
                        match save_snapshot(view, texture) {
                            Ok(path) => {
                                status_message = format!("Saved: {}", path.display());
                            }
                            Err(e) => {
                                error!("Failed to save snapshot: {}", e);
                                status_message = format!("Error: {}", e);
                            }
                        }
                    }
                }
                KeyCode::Char('h') => {
                    show_help = !show_help;
                    status_message = if show_help {
                        build_help_message()
                    } else {
                        build_status_message(view, None)
                    };
                }
                _ => {}
            }
        }
    }

    Ok(())
}

fn build_status_message(view: DisplayView, outcome: Option<&UpdateOutcome>) -> String {
    let state = match outcome {
        Some(UpdateOutcome::Updated { width, height }) => format!("{}x{}", width, height),
        Some(UpdateOutcome::NotReady) => "not ready".to_string(),
        Some(UpdateOutcome::Invalid(reason)) => format!("invalid: {}", reason),
        Some(UpdateOutcome::Disabled) => "disabled".to_string(),
        None => "-".to_string(),
    };
    format!(
        "[{}] {} | 'v' view | 's' snapshot | 'h' help | 'q' quit",
        view, state
    )
}

fn build_help_message() -> String {
    "v: Next view | f: Flip vertically | s: Save snapshot | h: Toggle help | q/Ctrl+C: Quit"
        .to_string()
}

/// Split `area` into the frame area and a one-line status bar at its bottom
fn split_status_line(area: Rect) -> (Rect, Rect) {
    let frame_height = area.height.saturating_sub(1);
    let view_area = Rect {
        height: frame_height,
        ..area
    };
    let status_area = Rect {
        y: area.y + frame_height,
        height: area.height.min(1),
        ..area
    };
    (view_area, status_area)
}

/// Save the current view as a PNG in the working directory
fn save_snapshot(view: DisplayView, texture: &RgbaImage) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let filepath = PathBuf::from(format!("{}_{}.png", view.name(), timestamp));
    texture.save_with_format(&filepath, image::ImageFormat::Png)?;
    info!(path = %filepath.display(), "Snapshot saved");
    Ok(filepath)
}

/// Widget that renders a display texture using half-block characters
struct FrameWidget<'a> {
    texture: Option<&'a RgbaImage>,
    view: DisplayView,
}

impl Widget for FrameWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(texture) = self.texture.filter(|t| t.width() > 0 && t.height() > 0) else {
            // No frame yet - show placeholder
            let msg = format!("Waiting for {}...", self.view);
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, ratatui::style::Style::default());
            }
            return;
        };

        let (display_width, display_height) =
            fit_half_blocks(texture.width(), texture.height(), area.width, area.height);
        if display_width == 0 || display_height == 0 {
            return;
        }

        // Center the image
        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = texture.width() as f64 / display_width as f64;
        let y_scale = texture.height() as f64 / (display_height * 2) as f64;

        // Upper half (▀) colored with fg, lower half with bg
        for ty in 0..display_height {
            for tx in 0..display_width {
                let src_x = (tx as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                if let Some(cell) = buf.cell_mut((x_offset + tx, y_offset + ty)) {
                    cell.set_char('▀');
                    cell.set_fg(sample_pixel(texture, src_x, src_y_top));
                    cell.set_bg(sample_pixel(texture, src_x, src_y_bottom));
                }
            }
        }
    }
}

/// Cell size of a `width` x `height` image fitted into `cols` x `rows`
/// half-block cells, keeping the aspect ratio
fn fit_half_blocks(width: u32, height: u32, cols: u16, rows: u16) -> (u16, u16) {
    let aspect = width as f64 / height as f64;
    let term_width = cols as f64;
    let term_height = rows as f64 * 2.0;

    if term_width / term_height > aspect {
        // Terminal is wider - fit to height
        let w = term_height * aspect;
        (w as u16, rows)
    } else {
        // Terminal is taller - fit to width
        let h = term_width / aspect;
        (cols, (h / 2.0) as u16)
    }
}

fn sample_pixel(texture: &RgbaImage, x: u32, y: u32) -> Color {
    let x = x.min(texture.width() - 1);
    let y = y.min(texture.height() - 1);
    let [r, g, b, _] = texture.get_pixel(x, y).0;
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
