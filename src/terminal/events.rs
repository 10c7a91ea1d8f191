use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::terminal::state::{AppState, Screen};

/// What the event loop should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
    Logout,
}

pub fn handle_key(key: KeyEvent, state: &mut AppState) -> Flow {
    // a request is in flight; input waits for it
    if state.pending.is_some() {
        return Flow::Continue;
    }

    // notices behave like alerts: any key dismisses them
    if state.notice.is_some() {
        state.notice = None;
        return Flow::Continue;
    }

    if state.confirm.is_some() {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => state.answer_confirm(true),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => state.answer_confirm(false),
            _ => {}
        }
        return Flow::Continue;
    }

    if state.reply.is_some() {
        handle_reply_keys(key, state);
        return Flow::Continue;
    }

    match key.code {
        KeyCode::Char('q') => return Flow::Quit,

        KeyCode::Esc => {
            if state.original.is_some() {
                state.close_original();
            } else if state.show_stats {
                state.show_stats = false;
            } else {
                return Flow::Quit;
            }
            return Flow::Continue;
        }

        KeyCode::Char('L') => return Flow::Logout,

        KeyCode::Char('s') | KeyCode::F(5) => {
            state.request_summarize();
            return Flow::Continue;
        }

        KeyCode::Char('t') => {
            state.toggle_stats();
            return Flow::Continue;
        }

        _ => {}
    }

    if state.screen == Screen::Digest {
        handle_digest_keys(key, state);
    }
    Flow::Continue
}

fn handle_digest_keys(key: KeyEvent, state: &mut AppState) {
    match key.code {
        KeyCode::Tab | KeyCode::BackTab => state.toggle_section(),
        KeyCode::Down | KeyCode::Char('j') => state.move_selection(1),
        KeyCode::Up | KeyCode::Char('k') => state.move_selection(-1),
        KeyCode::Home => state.select_first(),
        KeyCode::End => state.select_last(),
        KeyCode::Enter | KeyCode::Char('o') => state.toggle_original(),
        KeyCode::PageDown => state.scroll_body(10),
        KeyCode::PageUp => state.scroll_body(-10),

        KeyCode::Char('m') => state.request_mark_read(),
        KeyCode::Char('d') => state.request_trash(),
        KeyCode::Char('r') => state.start_reply(),
        KeyCode::Char('A') => state.ask_mark_all_read(),
        KeyCode::Char('D') => state.ask_delete_all_junk(),
        _ => {}
    }
}

fn handle_reply_keys(key: KeyEvent, state: &mut AppState) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => state.cancel_reply(),
        KeyCode::Char('s') if ctrl => state.submit_reply(),
        _ => {
            let Some(editor) = state.reply.as_mut() else {
                return;
            };
            match key.code {
                KeyCode::Enter => editor.text.push('\n'),
                KeyCode::Backspace => {
                    editor.text.pop();
                }
                KeyCode::Char(c) if !ctrl => editor.text.push(c),
                _ => {}
            }
        }
    }
}
