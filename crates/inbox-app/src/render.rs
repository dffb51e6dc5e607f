use std::fmt::Write;

use inbox_list::{Span, apply_ops};
use inbox_session::{RowView, SessionEvent};

/// Terminal copy of the displayed list, kept in step by applying each
/// [`SessionEvent::ListUpdated`].
#[derive(Default)]
pub struct Presenter {
    rows: Vec<RowView>,
    query: String,
    banner: bool,
}

impl Presenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[RowView] {
        &self.rows
    }

    pub fn banner_visible(&self) -> bool {
        self.banner
    }

    /// Fold an event into the local view. Returns text to print, if any.
    pub fn handle(&mut self, event: SessionEvent) -> Option<String> {
        match event {
            SessionEvent::ListUpdated { query, ops, len } => {
                if ops.is_empty() && query == self.query {
                    return None;
                }
                apply_ops(&mut self.rows, ops);
                debug_assert_eq!(self.rows.len(), len);
                self.query = query;
                Some(self.list())
            }
            SessionEvent::MessageArrived { message } => {
                Some(format!("* new message from {}", message.user_name))
            }
            SessionEvent::BannerShown => {
                self.banner = true;
                Some("[ You have a new message ]".to_string())
            }
            SessionEvent::BannerHidden => {
                self.banner = false;
                None
            }
        }
    }

    pub fn list(&self) -> String {
        let mut out = String::new();
        if self.query.is_empty() {
            let _ = writeln!(out, "-- inbox ({}) --", self.rows.len());
        } else {
            let _ = writeln!(out, "-- '{}': {} match(es) --", self.query, self.rows.len());
        }
        for (index, row) in self.rows.iter().enumerate() {
            let _ = writeln!(out, "{}", format_row(index, row));
        }
        out
    }
}

pub fn format_row(index: usize, row: &RowView) -> String {
    let mut line = format!(
        "{:>3} {} {:<24} {:>16}  {}",
        index,
        if row.is_unread { "●" } else { " " },
        mark_spans(&row.display_name, &row.name_spans),
        row.timestamp_label,
        mark_spans(&row.content, &row.content_spans),
    );
    if let Some(image) = row.image {
        let _ = write!(line, " <{}>", image);
    }
    if let Some(label) = &row.button_label {
        let _ = write!(line, " [{}]", label);
    }
    line
}

/// Wrap each highlighted byte range in brackets.
pub fn mark_spans(text: &str, spans: &[Span]) -> String {
    let mut out = String::with_capacity(text.len() + spans.len() * 2);
    let mut cursor = 0;
    for span in spans {
        let (Some(before), Some(hit)) = (text.get(cursor..span.start), text.get(span.clone())) else {
            continue;
        };
        out.push_str(before);
        out.push('[');
        out.push_str(hit);
        out.push(']');
        cursor = span.end;
    }
    out.push_str(text.get(cursor..).unwrap_or_default());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use inbox_list::ListOp;
    use inbox_session::RowKey;
    use inbox_types::{MessageKind, ResourceRef};

    fn row(name: &str, content: &str) -> RowView {
        RowView {
            key: RowKey::Row(1),
            display_name: name.to_string(),
            name_spans: Vec::new(),
            content: content.to_string(),
            content_spans: Vec::new(),
            timestamp_label: "10:00".to_string(),
            is_unread: false,
            kind: MessageKind::Text,
            avatar: ResourceRef(0),
            image: None,
            button_label: None,
        }
    }

    #[test]
    fn marks_highlighted_ranges() {
        assert_eq!(mark_spans("Wang Wei", &[0..4]), "[Wang] Wei");
        assert_eq!(mark_spans("abcabc", &[0..1, 3..4]), "[a]bc[a]bc");
        assert_eq!(mark_spans("plain", &[]), "plain");
    }

    #[test]
    fn skips_spans_outside_text() {
        assert_eq!(mark_spans("abc", &[1..9]), "abc");
    }

    #[test]
    fn applies_list_updates() {
        let mut presenter = Presenter::new();
        let printed = presenter.handle(SessionEvent::ListUpdated {
            query: String::new(),
            ops: vec![
                ListOp::Insert { index: 0, item: row("Alice", "hi") },
                ListOp::Insert { index: 1, item: row("Bob", "yo") },
            ],
            len: 2,
        });
        assert!(printed.unwrap().contains("inbox (2)"));
        assert_eq!(presenter.rows()[1].display_name, "Bob");

        // Nothing changed: stay quiet
        let quiet = presenter.handle(SessionEvent::ListUpdated {
            query: String::new(),
            ops: Vec::new(),
            len: 2,
        });
        assert!(quiet.is_none());
    }

    #[test]
    fn tracks_banner() {
        let mut presenter = Presenter::new();
        assert!(presenter.handle(SessionEvent::BannerShown).is_some());
        assert!(presenter.banner_visible());
        assert!(presenter.handle(SessionEvent::BannerHidden).is_none());
        assert!(!presenter.banner_visible());
    }
}
