pub mod events;
pub mod state;
pub mod ui;

use anyhow::{Result, anyhow};
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;

use crate::api::DigestApi;
use crate::store::repo::HistoryRepository;
use crate::terminal::events::{Flow, handle_key};
use crate::terminal::state::AppState;

/// Run the dashboard until the user quits or logs out.
pub fn run_tui(
    api: &dyn DigestApi,
    history: Option<&dyn HistoryRepository>,
    summarize_on_start: bool,
) -> Result<Flow> {
    color_eyre::install().map_err(|e| anyhow!("failed to install error hooks: {e}"))?;

    let mut state = AppState::new();
    if summarize_on_start {
        state.request_summarize();
    }

    let terminal = ratatui::init();
    let result = run(terminal, &mut state, api, history);
    ratatui::restore();

    result
}

fn run(
    mut terminal: DefaultTerminal,
    state: &mut AppState,
    api: &dyn DigestApi,
    history: Option<&dyn HistoryRepository>,
) -> Result<Flow> {
    loop {
        terminal.draw(|f| ui::render(f, state))?;

        // the frame above shows the busy text; now do the blocking call
        if state.pending.is_some() {
            state.run_pending(api, history);
            continue;
        }

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match handle_key(key, state) {
                Flow::Continue => {}
                exit => return Ok(exit),
            }
        }
    }
}
