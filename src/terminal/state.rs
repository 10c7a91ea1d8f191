use log::{info, warn};
use ratatui::widgets::ListState;

use crate::api::DigestApi;
use crate::domain::digest::{Digest, DigestItem, EmailId, SummarizeOutcome};
use crate::domain::stats::UsageStats;
use crate::store::repo::{HistoryRepository, record_received};

/// Width used when converting HTML bodies for the original-email pane.
const ORIGINAL_WIDTH: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// Nothing requested yet.
    Welcome,
    Loading,
    Digest,
    /// Backend had nothing to summarize.
    CaughtUp(String),
    Error { message: String, unauthorized: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Important,
    Junk,
}

/// Work to run against the backend after the next redraw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
    Summarize,
    Stats,
    MarkRead(EmailId),
    Trash(EmailId),
    Reply { id: EmailId, body: String },
    MarkAllRead(Vec<EmailId>),
    DeleteAllJunk(Vec<EmailId>),
}

impl Pending {
    pub fn busy_text(&self) -> &'static str {
        match self {
            Pending::Summarize => "Analyzing...",
            Pending::Stats => "Loading stats...",
            Pending::MarkRead(_) => "Marking as read...",
            Pending::Trash(_) => "Moving to trash...",
            Pending::Reply { .. } => "Sending reply...",
            Pending::MarkAllRead(_) => "Marking all as read...",
            Pending::DeleteAllJunk(_) => "Deleting junk...",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirm {
    MarkAllRead,
    DeleteAllJunk,
}

impl Confirm {
    pub fn question(&self) -> &'static str {
        match self {
            Confirm::MarkAllRead => "Mark all filtered emails as read?",
            Confirm::DeleteAllJunk => "Are you sure you want to delete all 'Trash' items?",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyEditor {
    pub email_id: EmailId,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// A message the user has to dismiss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

pub struct AppState {
    pub screen: Screen,
    pub digest: Option<Digest>,

    pub section: Section,
    pub important_state: ListState,
    pub junk_state: ListState,

    /// Rendered original of the selected email, when the pane is open.
    pub original: Option<String>,
    pub body_scroll: u16,

    pub reply: Option<ReplyEditor>,
    pub confirm: Option<Confirm>,
    pub notice: Option<Notice>,

    pub show_stats: bool,
    pub stats: Option<UsageStats>,

    pub pending: Option<Pending>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            screen: Screen::Welcome,
            digest: None,
            section: Section::Important,
            important_state: ListState::default(),
            junk_state: ListState::default(),
            original: None,
            body_scroll: 0,
            reply: None,
            confirm: None,
            notice: None,
            show_stats: false,
            stats: None,
            pending: None,
        }
    }

    pub fn important(&self) -> Vec<&DigestItem> {
        self.digest.as_ref().map(|d| d.important()).unwrap_or_default()
    }

    pub fn junk(&self) -> Vec<&DigestItem> {
        self.digest.as_ref().map(|d| d.junk()).unwrap_or_default()
    }

    fn section_items(&self, section: Section) -> Vec<&DigestItem> {
        match section {
            Section::Important => self.important(),
            Section::Junk => self.junk(),
        }
    }

    fn section_state_mut(&mut self, section: Section) -> &mut ListState {
        match section {
            Section::Important => &mut self.important_state,
            Section::Junk => &mut self.junk_state,
        }
    }

    pub fn section_state(&self, section: Section) -> &ListState {
        match section {
            Section::Important => &self.important_state,
            Section::Junk => &self.junk_state,
        }
    }

    pub fn selected_item(&self) -> Option<&DigestItem> {
        let idx = self.section_state(self.section).selected()?;
        self.section_items(self.section).get(idx).copied()
    }

    pub fn selected_id(&self) -> Option<EmailId> {
        self.selected_item()
            .and_then(|i| i.email_id())
            .map(str::to_string)
    }

    /// Keep both selections inside their lists after items were removed.
    fn fix_selection(&mut self) {
        for section in [Section::Important, Section::Junk] {
            let len = self.section_items(section).len();
            let st = self.section_state_mut(section);
            match (len, st.selected()) {
                (0, _) => st.select(None),
                (_, None) => st.select(Some(0)),
                (n, Some(i)) if i >= n => st.select(Some(n - 1)),
                _ => {}
            }
        }
        if self.section_items(self.section).is_empty() {
            let other = match self.section {
                Section::Important => Section::Junk,
                Section::Junk => Section::Important,
            };
            if !self.section_items(other).is_empty() {
                self.section = other;
            }
        }
    }

    pub fn move_selection(&mut self, delta: i32) {
        let len = self.section_items(self.section).len() as i32;
        let section = self.section;
        let st = self.section_state_mut(section);
        if len == 0 {
            st.select(None);
            return;
        }
        let cur = st.selected().unwrap_or(0) as i32;
        let next = (cur + delta).clamp(0, len - 1) as usize;
        st.select(Some(next));
        self.close_original();
    }

    pub fn select_first(&mut self) {
        let section = self.section;
        if !self.section_items(section).is_empty() {
            self.section_state_mut(section).select(Some(0));
        }
        self.close_original();
    }

    pub fn select_last(&mut self) {
        let section = self.section;
        let len = self.section_items(section).len();
        if len > 0 {
            self.section_state_mut(section).select(Some(len - 1));
        }
        self.close_original();
    }

    pub fn toggle_section(&mut self) {
        self.section = match self.section {
            Section::Important => Section::Junk,
            Section::Junk => Section::Important,
        };
        self.close_original();
    }

    pub fn toggle_original(&mut self) {
        if self.original.is_some() {
            self.close_original();
            return;
        }
        self.original = self
            .selected_item()
            .map(|i| i.original_text(ORIGINAL_WIDTH));
        self.body_scroll = 0;
    }

    pub fn close_original(&mut self) {
        self.original = None;
        self.body_scroll = 0;
    }

    pub fn scroll_body(&mut self, delta: i32) {
        if self.original.is_none() {
            return;
        }
        if delta < 0 {
            self.body_scroll = self.body_scroll.saturating_sub((-delta) as u16);
        } else {
            self.body_scroll = self.body_scroll.saturating_add(delta as u16);
        }
    }

    // ----- Requests -----

    pub fn request_summarize(&mut self) {
        if self.pending == Some(Pending::Summarize) {
            return;
        }
        self.screen = Screen::Loading;
        self.digest = None;
        self.close_original();
        self.reply = None;
        self.pending = Some(Pending::Summarize);
    }

    pub fn toggle_stats(&mut self) {
        self.show_stats = !self.show_stats;
        if self.show_stats {
            self.pending = Some(Pending::Stats);
        }
    }

    fn selected_id_or_notice(&mut self) -> Option<EmailId> {
        self.selected_item()?;
        let id = self.selected_id();
        if id.is_none() {
            self.notice = Some(Notice::error("Cannot perform action: Email ID missing"));
        }
        id
    }

    pub fn request_mark_read(&mut self) {
        if let Some(id) = self.selected_id_or_notice() {
            self.pending = Some(Pending::MarkRead(id));
        }
    }

    pub fn request_trash(&mut self) {
        if let Some(id) = self.selected_id_or_notice() {
            self.pending = Some(Pending::Trash(id));
        }
    }

    /// Open the reply editor prefilled with the drafted reply.
    pub fn start_reply(&mut self) {
        let Some(id) = self.selected_id_or_notice() else {
            return;
        };
        let text = self
            .selected_item()
            .and_then(|i| i.draft_reply())
            .unwrap_or_default()
            .to_string();
        self.close_original();
        self.reply = Some(ReplyEditor { email_id: id, text });
    }

    pub fn cancel_reply(&mut self) {
        self.reply = None;
    }

    pub fn submit_reply(&mut self) {
        let Some(editor) = &self.reply else {
            return;
        };
        if editor.text.trim().is_empty() {
            self.notice = Some(Notice::error("Reply is empty"));
            return;
        }
        self.pending = Some(Pending::Reply {
            id: editor.email_id.clone(),
            body: editor.text.clone(),
        });
    }

    pub fn ask_mark_all_read(&mut self) {
        if !self.important().is_empty() {
            self.confirm = Some(Confirm::MarkAllRead);
        }
    }

    pub fn ask_delete_all_junk(&mut self) {
        if !self.junk().is_empty() {
            self.confirm = Some(Confirm::DeleteAllJunk);
        }
    }

    pub fn answer_confirm(&mut self, yes: bool) {
        let Some(confirm) = self.confirm.take() else {
            return;
        };
        if !yes {
            return;
        }
        self.pending = match confirm {
            Confirm::MarkAllRead => {
                let ids = ids_of(&self.important());
                (!ids.is_empty()).then_some(Pending::MarkAllRead(ids))
            }
            Confirm::DeleteAllJunk => Some(Pending::DeleteAllJunk(ids_of(&self.junk()))),
        };
    }

    /// Run the queued request, if any, and fold its result into the state.
    pub fn run_pending(&mut self, api: &dyn DigestApi, history: Option<&dyn HistoryRepository>) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        match pending {
            Pending::Summarize => self.run_summarize(api, history),

            Pending::Stats => match api.stats() {
                Ok(s) => self.stats = Some(s),
                Err(e) => {
                    self.show_stats = false;
                    self.notice = Some(Notice::error(format!("Failed to load stats: {e}")));
                }
            },

            Pending::MarkRead(id) => match api.mark_read(&id) {
                Ok(_) => self.remove_item(&id),
                Err(e) => self.notice = Some(Notice::error(format!("Failed to mark read: {e}"))),
            },

            Pending::Trash(id) => match api.trash(&id) {
                Ok(_) => self.remove_item(&id),
                Err(e) => {
                    self.notice = Some(Notice::error(format!("Failed to trash email: {e}")))
                }
            },

            Pending::Reply { id, body } => {
                let Some(item) = self.digest.as_ref().and_then(|d| d.find(&id)) else {
                    self.reply = None;
                    return;
                };
                let to = item.from.clone();
                let subject = item.reply_subject();
                match api.reply(&to, &subject, &body) {
                    Ok(_) => {
                        self.reply = None;
                        self.remove_item(&id);
                        self.notice = Some(Notice::info("Reply sent!"));
                    }
                    Err(e) => {
                        self.notice =
                            Some(Notice::error(format!("Failed to send reply: {e}")));
                    }
                }
            }

            Pending::MarkAllRead(ids) => match api.mark_all_read(&ids) {
                Ok(_) => {
                    if let Some(d) = self.digest.as_mut() {
                        d.remove_many(&ids);
                    }
                    self.close_original();
                    self.fix_selection();
                }
                Err(e) => {
                    self.notice =
                        Some(Notice::error(format!("Failed to mark all as read: {e}")))
                }
            },

            Pending::DeleteAllJunk(ids) => self.run_delete_all(api, ids),
        }
    }

    fn run_summarize(&mut self, api: &dyn DigestApi, history: Option<&dyn HistoryRepository>) {
        match api.summarize() {
            Ok(SummarizeOutcome::Digest(digest)) => {
                if let Some(repo) = history {
                    record_received(repo, &digest);
                }
                if !digest.is_empty() {
                    match api.log_usage(digest.items.len()) {
                        Ok(minutes) => info!("usage logged, {minutes} minutes saved"),
                        Err(e) => warn!("could not log usage: {e}"),
                    }
                }
                self.digest = Some(digest);
                self.section = Section::Important;
                self.important_state = ListState::default();
                self.junk_state = ListState::default();
                self.fix_selection();
                self.screen = Screen::Digest;
            }
            Ok(SummarizeOutcome::Message(msg)) => {
                let msg = if msg.trim().is_empty() {
                    "No unread emails found.".to_string()
                } else {
                    msg
                };
                self.screen = Screen::CaughtUp(msg);
            }
            Err(e) => {
                self.screen = Screen::Error {
                    unauthorized: e.is_unauthorized(),
                    message: e.to_string(),
                };
            }
        }
    }

    fn run_delete_all(&mut self, api: &dyn DigestApi, ids: Vec<EmailId>) {
        let total = self.junk().len();
        let mut failed = total.saturating_sub(ids.len());

        for id in ids {
            match api.trash(&id) {
                Ok(_) => self.remove_item(&id),
                Err(e) => {
                    warn!("bulk delete of {id} failed: {e}");
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            self.notice = Some(Notice::error(format!(
                "Some items might not have been deleted ({failed} of {total} failed)."
            )));
        }
    }

    fn remove_item(&mut self, id: &str) {
        if let Some(d) = self.digest.as_mut() {
            d.remove(id);
        }
        self.close_original();
        self.fix_selection();
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

fn ids_of(items: &[&DigestItem]) -> Vec<EmailId> {
    items
        .iter()
        .filter_map(|i| i.email_id())
        .map(str::to_string)
        .collect()
}
