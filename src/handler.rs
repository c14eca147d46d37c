use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tracing::debug;

use crate::app::{App, InputMode, Tab};
use crate::lifecycle::Submit;
use crate::tui::AppEvent;

const PAGE: u16 = 10;
const WHEEL: u16 = 3;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick();
            app.poll_requests().await;
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Panel selection
        KeyCode::Tab => app.select_tab(app.tab.next()),
        KeyCode::BackTab => app.select_tab(app.tab.prev()),
        KeyCode::Char('1') => app.select_tab(Tab::Chat),
        KeyCode::Char('2') => app.select_tab(Tab::Analyze),
        KeyCode::Char('3') => app.select_tab(Tab::Generate),

        KeyCode::Char('i') => app.input_mode = InputMode::Editing,
        KeyCode::Enter => match app.tab {
            Tab::Chat => app.input_mode = InputMode::Editing,
            Tab::Analyze | Tab::Generate => submit(app),
        },

        // Tone selector
        KeyCode::Char('t') if app.tab == Tab::Generate => app.generate.next_tone(),
        KeyCode::Char('T') if app.tab == Tab::Generate => app.generate.prev_tone(),

        // Output scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::PageDown => app.scroll_down(PAGE),
        KeyCode::PageUp => app.scroll_up(PAGE),
        KeyCode::Char('g') | KeyCode::Home => app.scroll_top(),
        KeyCode::Char('G') | KeyCode::End => app.scroll_bottom(),
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    let multiline = app.tab != Tab::Chat;

    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => {
            if multiline {
                if let Some(input) = app.active_input() {
                    input.newline();
                }
            }
        }
        KeyCode::Char('j') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            if multiline {
                if let Some(input) = app.active_input() {
                    input.newline();
                }
            }
        }
        KeyCode::Enter => {
            submit(app);
        }
        KeyCode::PageDown => app.scroll_down(PAGE),
        KeyCode::PageUp => app.scroll_up(PAGE),
        code => {
            let Some(input) = app.active_input() else {
                return;
            };
            match code {
                KeyCode::Backspace => input.backspace(),
                KeyCode::Delete => input.delete(),
                KeyCode::Left => input.left(),
                KeyCode::Right => input.right(),
                KeyCode::Home => input.home(),
                KeyCode::End => input.end(),
                KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                    input.insert_char(c)
                }
                _ => {}
            }
        }
    }
}

fn submit(app: &mut App) {
    let outcome = app.submit_active();
    debug!(tab = app.tab.title(), ?outcome, "submit");

    // Leave the form so the result can be scrolled; chat keeps typing.
    if outcome == Submit::Sent && app.tab != Tab::Chat {
        app.input_mode = InputMode::Normal;
    }
}

fn handle_paste(app: &mut App, text: &str) {
    let flatten = app.tab == Tab::Chat;
    let Some(input) = app.active_input() else {
        return;
    };

    if flatten {
        let line = text.replace("\r\n", " ").replace(['\r', '\n'], " ");
        input.insert_str(&line);
    } else {
        input.insert_str(&text.replace("\r\n", "\n"));
    }
    app.input_mode = InputMode::Editing;
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

/// Tab under column `x` of the tab bar. Titles are padded by one space and
/// separated by a one-column divider.
fn tab_at(area: Rect, x: u16) -> Option<Tab> {
    let mut start = area.x;
    for tab in Tab::all() {
        let end = start + tab.title().len() as u16 + 2;
        if x >= start && x < end {
            return Some(tab);
        }
        start = end + 1;
    }
    None
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    let in_output = app.output_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_tabs = app.tabs_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown if in_output => app.scroll_down(WHEEL),
        MouseEventKind::ScrollUp if in_output => app.scroll_up(WHEEL),
        MouseEventKind::Down(MouseButton::Left) if in_tabs => {
            if let Some(tab) = app.tabs_area.and_then(|area| tab_at(area, x)) {
                app.select_tab(tab);
            }
        }
        _ => {}
    }
}
