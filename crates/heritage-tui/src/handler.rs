use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use heritage_core::QaBackend;
use ratatui::layout::Rect;

use crate::app::{App, Focus};
use crate::tui::TermEvent;

const MOUSE_SCROLL_LINES: u16 = 3;

pub fn handle_event<B: QaBackend>(app: &mut App<B>, event: TermEvent) {
    match event {
        TermEvent::Key(key) => handle_key(app, key),
        TermEvent::Mouse(mouse) => handle_mouse(app, mouse),
        TermEvent::Paste(text) => {
            if app.focus == Focus::Input {
                app.insert_str(&text);
            }
        }
        // Next draw picks up the new size
        TermEvent::Resize => {}
        TermEvent::Tick => app.tick_animation(),
    }
}

fn handle_key<B: QaBackend>(app: &mut App<B>, key: KeyEvent) {
    // Global keys that work with any focus
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
            return;
        }
        KeyCode::Esc => {
            app.should_quit = true;
            return;
        }
        KeyCode::Tab => {
            app.focus_next();
            return;
        }
        KeyCode::BackTab => {
            app.focus_prev();
            return;
        }
        KeyCode::PageUp => {
            app.scroll_half_page_up();
            return;
        }
        KeyCode::PageDown => {
            app.scroll_half_page_down();
            return;
        }
        _ => {}
    }

    match app.focus {
        Focus::Input => handle_input_key(app, key),
        Focus::Country | Focus::Category => handle_filter_key(app, key),
    }
}

fn handle_input_key<B: QaBackend>(app: &mut App<B>, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => {
            app.submit();
        }
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::Char(c) => app.insert_char(c),
        _ => {}
    }
}

fn handle_filter_key<B: QaBackend>(app: &mut App<B>, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.filter_next(),
        KeyCode::Char('k') | KeyCode::Up => app.filter_prev(),
        // Choice is live already; Enter just goes back to typing
        KeyCode::Enter => app.set_focus(Focus::Input),
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse<B: QaBackend>(app: &mut App<B>, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(MOUSE_SCROLL_LINES),
        MouseEventKind::ScrollUp => app.scroll_up(MOUSE_SCROLL_LINES),
        _ => {}
    }
}
