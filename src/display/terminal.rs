use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io::{self, stdout};
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::playback::PlaybackState;
use crate::render::Canvas;
use crate::session::Session;
use crate::source::HttpRecordingSource;

pub async fn run(config: Config) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, config).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: Config,
) -> Result<()> {
    let source = HttpRecordingSource::new(config.fetch.server_url.clone());
    let width = terminal.size()?.width as usize;
    let poll_interval = Duration::from_secs(config.fetch.poll_interval_secs);
    let target_frame = Duration::from_secs_f64(1.0 / config.display.target_fps as f64);

    let mut session = Session::new(config, source, width)?;
    session.start().await;

    let mut last_frame = Instant::now();
    let mut last_poll = Instant::now();
    let mut drag_anchor: Option<u16> = None;

    loop {
        let now = Instant::now();
        let dt_ms = now.duration_since(last_frame).as_secs_f64() * 1000.0;
        last_frame = now;

        // One frame of production and live rendering per loop pass
        session.tick(dt_ms);

        // Fixed-interval fetch cycle; skipped internally while paused
        if last_poll.elapsed() >= poll_interval {
            session.poll().await;
            last_poll = Instant::now();
        }

        terminal.draw(|frame| {
            let area = frame.area();
            if area.height > 1 {
                let canvas_area = Rect::new(area.x, area.y, area.width, area.height - 1);
                blit_canvas(frame, canvas_area, session.canvas());
            }
            render_status(frame, area, &session);
        })?;

        if event::poll(target_frame)? {
            match event::read()? {
                Event::Key(key) => {
                    if handle_key(key, &mut session).await {
                        break;
                    }
                }
                Event::Mouse(mouse) => handle_mouse(mouse, &mut session, &mut drag_anchor),
                Event::Resize(cols, _rows) => session.resize_viewport(cols as usize),
                _ => {}
            }
        }
    }

    Ok(())
}

/// Returns true when the app should quit.
async fn handle_key<S: crate::source::RecordingSource>(
    key: KeyEvent,
    session: &mut Session<S>,
) -> bool {
    match key {
        KeyEvent {
            code: KeyCode::Char('q'),
            ..
        }
        | KeyEvent {
            code: KeyCode::Char('c'),
            modifiers: KeyModifiers::CONTROL,
            ..
        } => return true,
        KeyEvent {
            code: KeyCode::Char('s'),
            ..
        } => {
            if session.state() == PlaybackState::Idle {
                session.start().await;
            }
        }
        KeyEvent {
            code: KeyCode::Char('x'),
            ..
        } => session.stop(),
        KeyEvent {
            code: KeyCode::Char(' '),
            ..
        } => match session.state() {
            PlaybackState::Playing => session.pause(),
            PlaybackState::Paused => session.resume(),
            _ => {}
        },
        KeyEvent {
            code: KeyCode::Char('c'),
            modifiers: KeyModifiers::NONE,
            ..
        } => session.cycle_ramp(),
        KeyEvent {
            code: KeyCode::Char('['),
            ..
        } => adjust_analysis(session, |a| a.fft_size = (a.fft_size / 2).max(32)),
        KeyEvent {
            code: KeyCode::Char(']'),
            ..
        } => adjust_analysis(session, |a| a.fft_size = (a.fft_size * 2).min(16_384)),
        KeyEvent {
            code: KeyCode::Char('-'),
            ..
        } => adjust_analysis(session, |a| {
            a.max_frequency = (a.max_frequency - 500.0).max(a.min_frequency + 100.0)
        }),
        KeyEvent {
            code: KeyCode::Char('='),
            ..
        } => adjust_analysis(session, |a| a.max_frequency += 500.0),
        KeyEvent {
            code: KeyCode::Char(','),
            ..
        } => adjust_analysis(session, |a| a.min_frequency = (a.min_frequency - 50.0).max(0.0)),
        KeyEvent {
            code: KeyCode::Char('.'),
            ..
        } => adjust_analysis(session, |a| {
            a.min_frequency = (a.min_frequency + 50.0).min(a.max_frequency - 100.0)
        }),
        KeyEvent {
            code: KeyCode::Char('r'),
            ..
        } => adjust_analysis(session, |a| {
            const RATES: [u32; 4] = [8_000, 16_000, 44_100, 48_000];
            let next = RATES
                .iter()
                .position(|&r| r == a.sample_rate)
                .map(|i| RATES[(i + 1) % RATES.len()])
                .unwrap_or(48_000);
            a.sample_rate = next;
        }),
        _ => {}
    }
    false
}

fn adjust_analysis<S: crate::source::RecordingSource>(
    session: &mut Session<S>,
    change: impl FnOnce(&mut crate::config::AnalysisConfig),
) {
    let mut analysis = session.config().analysis.clone();
    change(&mut analysis);
    // invalid combinations are rejected and the previous geometry kept
    let _ = session.apply_analysis_change(analysis);
}

fn handle_mouse<S: crate::source::RecordingSource>(
    mouse: MouseEvent,
    session: &mut Session<S>,
    drag_anchor: &mut Option<u16>,
) {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if session.state() == PlaybackState::Playing {
                session.pause();
            }
            *drag_anchor = Some(mouse.column);
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            if let Some(anchor) = *drag_anchor {
                let delta = mouse.column as i32 - anchor as i32;
                if delta != 0 {
                    session.scrub(delta);
                    *drag_anchor = Some(mouse.column);
                }
            }
        }
        MouseEventKind::Up(MouseButton::Left) => {
            *drag_anchor = None;
        }
        _ => {}
    }
}

/// Paint the canvas into the frame buffer as half-block cells: each cell
/// shows two vertically stacked pixels via '▀' with fg = top, bg = bottom.
/// The canvas is nearest-sampled vertically to fit the cell rows.
fn blit_canvas(frame: &mut Frame, area: Rect, canvas: &Canvas) {
    if canvas.width == 0 || canvas.height == 0 || area.height == 0 {
        return;
    }
    let rows = area.height as usize;
    let pixel_rows = rows * 2;

    for row in 0..rows {
        for col in 0..area.width.min(canvas.width as u16) {
            let x = col as usize;
            let top_y = (row * 2) * canvas.height / pixel_rows;
            let bot_y = (row * 2 + 1) * canvas.height / pixel_rows;
            let (tr, tg, tb) = canvas.get_pixel(x, top_y);
            let (br, bg, bb) = canvas.get_pixel(x, bot_y);

            if let Some(cell) = frame
                .buffer_mut()
                .cell_mut((area.x + col, area.y + row as u16))
            {
                cell.set_char('\u{2580}');
                cell.set_fg(Color::Rgb(tr, tg, tb));
                cell.set_bg(Color::Rgb(br, bg, bb));
            }
        }
    }
}

fn render_status<S: crate::source::RecordingSource>(
    frame: &mut Frame,
    area: Rect,
    session: &Session<S>,
) {
    let status = format!(
        " {:?} | buffer {:.1}s | t {:.1}s | {} frames | {:>3.0}% | [s]tart [x]stop [space]pause [c]olor [r]ate [q]uit",
        session.state(),
        session.buffered_ms() / 1000.0,
        session.current_time_ms() / 1000.0,
        session.store_len(),
        session.progress() * 100.0,
    );

    let y = area.y + area.height.saturating_sub(1);
    for (i, ch) in status.chars().enumerate() {
        if i < area.width as usize {
            if let Some(cell) = frame.buffer_mut().cell_mut((area.x + i as u16, y)) {
                cell.set_char(ch);
                cell.set_fg(Color::DarkGray);
                cell.set_bg(Color::Reset);
            }
        }
    }
}
