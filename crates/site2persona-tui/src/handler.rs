use std::time::Instant;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use site2persona_core::WorkflowPhase;

use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Tick => app.tick(Instant::now()),
    }
    app.poll_tasks().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }
    if key.code == KeyCode::Tab {
        app.cycle_focus();
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,

        KeyCode::Char('i') | KeyCode::Enter => {
            if app.focus != FocusPane::Result {
                app.input_mode = InputMode::Editing;
            }
        }

        KeyCode::Char('j') | KeyCode::Down => app.scroll_focused_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_focused_up(1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_focused_down(10)
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_focused_up(10)
        }

        // Result pane actions
        KeyCode::Char('p') if app.focus == FocusPane::Result => {
            app.result_view.toggle_prompt();
        }
        KeyCode::Char('c') if app.focus == FocusPane::Result => {
            app.copy_prompt();
        }

        // Chat pane actions
        KeyCode::Char('r') if app.focus == FocusPane::Chat => {
            app.playground.reset();
        }

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter if app.focus == FocusPane::Url => {
            if app.phase() != WorkflowPhase::Analyzing {
                app.submit_url();
            }
        }
        KeyCode::Enter if app.focus == FocusPane::Chat => {
            if key.modifiers.contains(KeyModifiers::SHIFT) {
                let playground = &mut app.playground;
                insert_char(&mut playground.input, &mut playground.cursor, '\n');
            } else {
                app.send_chat();
            }
        }
        _ => match app.focus {
            FocusPane::Url => edit_input(&mut app.url_input, &mut app.url_cursor, key),
            FocusPane::Chat => {
                let playground = &mut app.playground;
                edit_input(&mut playground.input, &mut playground.cursor, key)
            }
            FocusPane::Result => {}
        },
    }
}

fn insert_char(input: &mut String, cursor: &mut usize, c: char) {
    let byte_pos = char_to_byte_index(input, *cursor);
    input.insert(byte_pos, c);
    *cursor += 1;
}

/// Single-line text editing shared by the URL and chat inputs
fn edit_input(input: &mut String, cursor: &mut usize, key: KeyEvent) {
    // Keep the cursor valid if the input was changed elsewhere (e.g. cleared on send)
    let char_count = input.chars().count();
    *cursor = (*cursor).min(char_count);

    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(input, *cursor);
                input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if *cursor < char_count {
                let byte_pos = char_to_byte_index(input, *cursor);
                input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            *cursor = cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            *cursor = (*cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            *cursor = 0;
        }
        KeyCode::End => {
            *cursor = char_count;
        }
        KeyCode::Char(c) => insert_char(input, cursor, c),
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    let in_result = app.result_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_result {
                app.result_view.scroll = app.result_view.scroll.saturating_add(3);
            } else if in_chat {
                app.playground.scroll = app.playground.scroll.saturating_add(3);
            }
        }
        MouseEventKind::ScrollUp => {
            if in_result {
                app.result_view.scroll = app.result_view.scroll.saturating_sub(3);
            } else if in_chat {
                app.playground.scroll = app.playground.scroll.saturating_sub(3);
            }
        }
        _ => {}
    }
}
