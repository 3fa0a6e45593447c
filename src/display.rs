//! Terminal display surface (display context)
//!
//! Runs on the main thread. Owns the terminal, drains render requests from
//! the [`RenderBridge`], and turns keystrokes and clicks into lines on the
//! input queue.

use crate::input::{InputSender, ShutdownFlag};
use crate::render::{Pump, RenderBridge};
use crate::types::ShellConfig;
use crate::widgets::WidgetKind;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph, Widget as _},
    Terminal,
};
use std::io;
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_millis(50);

/// How long to wait for the worker's stop request after an interrupt
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const CURSOR: &str = "█";

pub type DisplayResult<T> = std::result::Result<T, DisplayError>;

#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    #[error("Terminal I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Run the display event loop until the worker asks it to stop.
pub fn run(
    bridge: &mut RenderBridge,
    input: &InputSender,
    shutdown: &ShutdownFlag,
    config: &ShellConfig,
) -> DisplayResult<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    if let Err(err) = execute!(stdout, EnterAlternateScreen, EnableMouseCapture) {
        let _ = disable_raw_mode();
        return Err(err.into());
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = match Terminal::new(backend) {
        Ok(terminal) => terminal,
        Err(err) => {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
            return Err(err.into());
        }
    };
    let _ = terminal.hide_cursor();

    let result = event_loop(&mut terminal, bridge, input, shutdown, config);

    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture);
    let _ = terminal.show_cursor();

    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    bridge: &mut RenderBridge,
    input: &InputSender,
    shutdown: &ShutdownFlag,
    config: &ShellConfig,
) -> DisplayResult<()> {
    let blink = Duration::from_millis(config.cursor_blink_ms.max(1));
    let mut cursor_on = true;
    let mut last_blink = Instant::now();
    let mut dirty = true;
    let mut shutdown_seen: Option<Instant> = None;

    loop {
        match bridge.pump() {
            Pump::Stop => break,
            Pump::Redraw => dirty = true,
            Pump::Idle => {}
        }

        if shutdown.is_triggered() {
            let since = *shutdown_seen.get_or_insert_with(Instant::now);
            if since.elapsed() >= SHUTDOWN_GRACE {
                log::warn!("Worker did not stop in time, closing display");
                break;
            }
        }

        if last_blink.elapsed() >= blink {
            cursor_on = !cursor_on;
            last_blink = Instant::now();
            dirty = true;
        }

        if dirty {
            terminal.draw(|frame| {
                let area = frame.area();
                draw(area, frame.buffer_mut(), bridge, cursor_on);
            })?;
            dirty = false;
        }

        if event::poll(TICK)? {
            match event::read()? {
                Event::Key(key) => dirty |= handle_key(key, bridge, input, shutdown),
                Event::Mouse(mouse) => dirty |= handle_mouse(mouse, bridge, input),
                Event::Resize(_, _) => dirty = true,
                _ => {}
            }
        }
    }

    Ok(())
}

/// Apply a key press; `true` when the screen changed.
pub fn handle_key(
    key: KeyEvent,
    bridge: &mut RenderBridge,
    input: &InputSender,
    shutdown: &ShutdownFlag,
) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }

    let page = bridge.visible_log().len().max(1);
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            log::info!("Ctrl-C from display, requesting shutdown");
            shutdown.trigger();
            false
        }
        KeyCode::Enter => {
            let line = bridge.take_input();
            if !line.trim().is_empty() && !input.submit(line) {
                log::warn!("Worker gone, input dropped");
            }
            true
        }
        KeyCode::Backspace => {
            bridge.pop_char();
            true
        }
        KeyCode::Esc => {
            bridge.clear_input();
            true
        }
        KeyCode::PageUp => {
            bridge.scroll_up(page);
            true
        }
        KeyCode::PageDown => {
            bridge.scroll_down(page);
            true
        }
        KeyCode::Up => {
            bridge.scroll_up(1);
            true
        }
        KeyCode::Down => {
            bridge.scroll_down(1);
            true
        }
        KeyCode::Char(c)
            if !c.is_control()
                && !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            bridge.push_char(c);
            true
        }
        _ => false,
    }
}

/// Left click on a button submits its line; the wheel scrolls the log.
pub fn handle_mouse(mouse: MouseEvent, bridge: &mut RenderBridge, input: &InputSender) -> bool {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if let Some(line) = bridge.hit_test(mouse.column, mouse.row) {
                log::debug!("Widget hit at ({}, {}): {line}", mouse.column, mouse.row);
                input.submit(line);
            }
            false
        }
        MouseEventKind::ScrollUp => {
            bridge.scroll_up(3);
            true
        }
        MouseEventKind::ScrollDown => {
            bridge.scroll_down(3);
            true
        }
        _ => false,
    }
}

/// Draw the current frame: header, widget region, log, prompt.
pub fn draw(area: Rect, buf: &mut Buffer, bridge: &mut RenderBridge, cursor_on: bool) {
    let frame = bridge.frame();
    let header_height = frame.header.len() as u16 + 1;
    let widget_height = frame.start_offset_y;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(header_height),
            Constraint::Length(widget_height),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    let green = Style::default().fg(Color::Green);

    let header: Vec<Line> = frame
        .header
        .iter()
        .map(|l| Line::styled(l.clone(), green.add_modifier(Modifier::BOLD)))
        .collect();
    Paragraph::new(header)
        .block(Block::default().borders(Borders::BOTTOM).border_style(green))
        .render(chunks[0], buf);

    let prompt = if frame.prompt_visible {
        let cursor = if cursor_on { CURSOR } else { " " };
        format!("{}{}{}", frame.prompt_text, frame.input_buffer, cursor)
    } else {
        String::new()
    };

    bridge.set_widget_origin(chunks[1].x, chunks[1].y);
    draw_widgets(chunks[1], buf, bridge);

    bridge.set_viewport_height(chunks[2].height as usize);
    let log: Vec<Line> = bridge
        .visible_log()
        .iter()
        .map(|l| Line::styled(l.clone(), green))
        .collect();
    Paragraph::new(log).render(chunks[2], buf);

    Paragraph::new(Line::styled(prompt, green)).render(chunks[3], buf);
}

fn draw_widgets(region: Rect, buf: &mut Buffer, bridge: &RenderBridge) {
    for widget in bridge.widgets().iter().filter(|w| w.visible) {
        let x = region.x.saturating_add(widget.rect.x);
        let y = region.y.saturating_add(widget.rect.y);
        if x >= region.right() || y >= region.bottom() {
            continue;
        }

        let rect = Rect::new(
            x,
            y,
            widget.rect.width.max(1).min(region.right() - x),
            widget.rect.height.max(1).min(region.bottom() - y),
        );

        let style = match widget.kind {
            WidgetKind::Label { .. } => Style::default().fg(Color::Green),
            WidgetKind::Button { .. } => Style::default()
                .fg(Color::Black)
                .bg(Color::Green)
                .add_modifier(Modifier::BOLD),
        };
        Paragraph::new(widget.text().to_string())
            .style(style)
            .render(rect, buf);
    }
}
