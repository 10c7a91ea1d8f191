use serde::{Deserialize, Deserializer, Serialize};

pub type EmailId = String;

/// Backend-assigned label steering which controls are shown for an email.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    Trash,
    Reply,
    #[default]
    MarkAsRead,
    #[serde(other)]
    Other,
}

impl RecommendedAction {
    pub fn label(&self) -> Option<&'static str> {
        match self {
            RecommendedAction::Trash => Some("Delete this email"),
            RecommendedAction::Reply => Some("Send a reply"),
            RecommendedAction::MarkAsRead => Some("Mark as read"),
            RecommendedAction::Other => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendedAction::Trash => "trash",
            RecommendedAction::Reply => "reply",
            RecommendedAction::MarkAsRead => "mark_as_read",
            RecommendedAction::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "trash" => RecommendedAction::Trash,
            "reply" => RecommendedAction::Reply,
            "mark_as_read" => RecommendedAction::MarkAsRead,
            _ => RecommendedAction::Other,
        }
    }
}

/// The backend writes `null` for keys the model left empty.
fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

/// One summarized email as returned by `/summarize`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DigestItem {
    #[serde(default)]
    pub id: Option<EmailId>,
    #[serde(rename = "From", default, deserialize_with = "null_as_default")]
    pub from: String,
    #[serde(rename = "Subject", default, deserialize_with = "null_as_default")]
    pub subject: String,
    #[serde(rename = "Summary", default, deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(rename = "RecommendedAction", default, deserialize_with = "null_as_default")]
    pub recommended_action: RecommendedAction,
    #[serde(rename = "ReplyContent", default, deserialize_with = "null_as_default")]
    pub reply_content: String,
    #[serde(rename = "Body", default, deserialize_with = "null_as_default")]
    pub body: String,
    #[serde(rename = "BodyHtml", default, deserialize_with = "null_as_default")]
    pub body_html: String,
}

impl DigestItem {
    /// The id, ignoring the empty string some backends send for unknown ids.
    pub fn email_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|s| !s.is_empty())
    }

    pub fn display_subject(&self) -> &str {
        if self.subject.trim().is_empty() {
            "No Subject"
        } else {
            &self.subject
        }
    }

    pub fn display_from(&self) -> &str {
        if self.from.trim().is_empty() {
            "Unknown"
        } else {
            &self.from
        }
    }

    pub fn draft_reply(&self) -> Option<&str> {
        let s = self.reply_content.trim();
        (!s.is_empty()).then_some(self.reply_content.as_str())
    }

    pub fn reply_subject(&self) -> String {
        format!("Re: {}", self.subject)
    }

    pub fn is_junk(&self) -> bool {
        self.recommended_action == RecommendedAction::Trash
    }

    /// Text of the original message: HTML converted to text when present.
    pub fn original_text(&self, width: usize) -> String {
        if !self.body_html.trim().is_empty() {
            match html2text::from_read(self.body_html.as_bytes(), width.max(20)) {
                Ok(text) => return text,
                Err(e) => log::warn!("could not render html body: {e}"),
            }
        }
        if !self.body.trim().is_empty() {
            return self.body.clone();
        }
        "No content available.".to_string()
    }
}

/// The digest currently on screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Digest {
    pub items: Vec<DigestItem>,
    pub global_summary: Option<String>,
}

impl Digest {
    pub fn new(items: Vec<DigestItem>, global_summary: Option<String>) -> Self {
        let global_summary = global_summary.filter(|s| !s.trim().is_empty());
        Self {
            items,
            global_summary,
        }
    }

    /// Items needing attention ("Action Needed").
    pub fn important(&self) -> Vec<&DigestItem> {
        self.items.iter().filter(|i| !i.is_junk()).collect()
    }

    /// Items recommended for deletion ("Junk & Promotions").
    pub fn junk(&self) -> Vec<&DigestItem> {
        self.items.iter().filter(|i| i.is_junk()).collect()
    }

    pub fn find(&self, id: &str) -> Option<&DigestItem> {
        self.items.iter().find(|i| i.email_id() == Some(id))
    }

    /// Returns true if something was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.email_id() != Some(id));
        before != self.items.len()
    }

    pub fn remove_many(&mut self, ids: &[EmailId]) -> usize {
        let before = self.items.len();
        self.items
            .retain(|i| i.email_id().is_none_or(|id| !ids.iter().any(|x| x == id)));
        before - self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// What `/summarize` produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SummarizeOutcome {
    Digest(Digest),
    /// Nothing to summarize, e.g. "No unread emails found."
    Message(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, action: RecommendedAction) -> DigestItem {
        DigestItem {
            id: Some(id.to_string()),
            subject: format!("subject {id}"),
            recommended_action: action,
            ..Default::default()
        }
    }

    #[test]
    fn parses_backend_item() {
        let json = r#"{
            "id": "18e45",
            "From": "prof@uni.edu",
            "Subject": "Deadline",
            "Summary": "Deadline moved to Friday",
            "RecommendedAction": "reply",
            "ReplyContent": "Thanks for letting me know!",
            "Body": "Hi,\nthe deadline moved.",
            "BodyHtml": ""
        }"#;
        let it: DigestItem = serde_json::from_str(json).unwrap();
        assert_eq!(it.email_id(), Some("18e45"));
        assert_eq!(it.recommended_action, RecommendedAction::Reply);
        assert_eq!(it.draft_reply(), Some("Thanks for letting me know!"));
        assert_eq!(it.reply_subject(), "Re: Deadline");
    }

    #[test]
    fn parses_backend_item_with_nulls() {
        let json = r#"{
            "id": "7",
            "From": null,
            "Subject": null,
            "Summary": "Weekly newsletter",
            "RecommendedAction": null,
            "ReplyContent": null,
            "Body": null,
            "BodyHtml": null
        }"#;
        let it: DigestItem = serde_json::from_str(json).unwrap();
        assert_eq!(it.email_id(), Some("7"));
        assert_eq!(it.display_from(), "Unknown");
        assert_eq!(it.display_subject(), "No Subject");
        assert_eq!(it.recommended_action, RecommendedAction::MarkAsRead);
        assert_eq!(it.draft_reply(), None);
        assert_eq!(it.original_text(80), "No content available.");
    }

    #[test]
    fn unknown_action_is_kept_out_of_junk() {
        let it: DigestItem =
            serde_json::from_str(r#"{"id":"1","RecommendedAction":"ignore"}"#).unwrap();
        assert_eq!(it.recommended_action, RecommendedAction::Other);
        assert!(!it.is_junk());
        assert_eq!(it.recommended_action.label(), None);
    }

    #[test]
    fn missing_fields_fall_back() {
        let it: DigestItem = serde_json::from_str("{}").unwrap();
        assert_eq!(it.email_id(), None);
        assert_eq!(it.display_subject(), "No Subject");
        assert_eq!(it.display_from(), "Unknown");
        assert_eq!(it.draft_reply(), None);
        assert_eq!(it.original_text(80), "No content available.");
    }

    #[test]
    fn html_body_wins_over_plain_body() {
        let it = DigestItem {
            body: "plain".into(),
            body_html: "<p>Hello <b>there</b></p>".into(),
            ..Default::default()
        };
        let text = it.original_text(80);
        assert!(text.contains("Hello"));
        assert!(!text.contains("<p>"));
    }

    #[test]
    fn partitions_and_removes() {
        let mut d = Digest::new(
            vec![
                item("a", RecommendedAction::Reply),
                item("b", RecommendedAction::Trash),
                item("c", RecommendedAction::MarkAsRead),
                item("d", RecommendedAction::Trash),
            ],
            Some("  ".into()),
        );
        assert_eq!(d.global_summary, None);
        assert_eq!(d.important().len(), 2);
        assert_eq!(d.junk().len(), 2);

        assert!(d.remove("b"));
        assert!(!d.remove("b"));
        assert_eq!(d.junk().len(), 1);

        let removed = d.remove_many(&["a".to_string(), "c".to_string(), "zz".to_string()]);
        assert_eq!(removed, 2);
        assert!(d.important().is_empty());
        assert_eq!(d.items.len(), 1);
    }

    #[test]
    fn action_labels() {
        assert_eq!(RecommendedAction::Trash.label(), Some("Delete this email"));
        assert_eq!(RecommendedAction::parse("mark_as_read"), RecommendedAction::MarkAsRead);
        assert_eq!(RecommendedAction::parse("what"), RecommendedAction::Other);
    }
}
