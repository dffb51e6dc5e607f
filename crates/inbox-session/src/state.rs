use std::collections::HashMap;

use chrono::NaiveDateTime;
use inbox_list::{
    HighlightCache, ListOp, Span, apply_ops, button_label, diff_with, display_name, filter,
    timestamp_label,
};
use inbox_types::{Message, MessageKey, MessageKind, ResourceRef, StoredMessage};
use tracing::debug;

use crate::config::IdentityMode;

/// Identity of a displayed row under the active [`IdentityMode`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowKey {
    Tuple(MessageKey),
    Row(i64),
}

/// Everything a renderer needs to draw one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub key: RowKey,
    pub display_name: String,
    pub name_spans: Vec<Span>,
    pub content: String,
    pub content_spans: Vec<Span>,
    pub timestamp_label: String,
    pub is_unread: bool,
    pub kind: MessageKind,
    pub avatar: ResourceRef,
    pub image: Option<ResourceRef>,
    pub button_label: Option<String>,
}

/// Outcome of one filter pass.
#[derive(Debug, Clone)]
pub struct Render {
    /// Trimmed query the pass ran with
    pub query: String,
    pub ops: Vec<ListOp<RowView>>,
    /// Row count after applying `ops`
    pub len: usize,
}

/// Inbox data as the view sees it: the full cache, remarks, active query and
/// the list currently on screen.
pub struct InboxState {
    identity: IdentityMode,
    messages: Vec<StoredMessage>,
    remarks: HashMap<String, String>,
    query: String,
    displayed: Vec<StoredMessage>,
    // Remarks the displayed rows were rendered with
    rendered_remarks: HashMap<String, String>,
    // Timestamp labels as last sent, parallel to `displayed`
    rendered_labels: Vec<String>,
    highlights: HighlightCache,
}

impl InboxState {
    pub fn new(identity: IdentityMode, highlight_capacity: usize) -> Self {
        Self {
            identity,
            messages: Vec::new(),
            remarks: HashMap::new(),
            query: String::new(),
            displayed: Vec::new(),
            rendered_remarks: HashMap::new(),
            rendered_labels: Vec::new(),
            highlights: HighlightCache::new(highlight_capacity),
        }
    }

    /// Swap in a fresh snapshot from the store. Takes effect on the next
    /// [`apply`](Self::apply).
    pub fn replace_data(&mut self, messages: Vec<StoredMessage>, remarks: HashMap<String, String>) {
        self.messages = messages;
        self.remarks = remarks;
    }

    /// Record the latest search input. Takes effect on the next apply.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn messages(&self) -> &[StoredMessage] {
        &self.messages
    }

    pub fn remarks(&self) -> &HashMap<String, String> {
        &self.remarks
    }

    pub fn displayed(&self) -> &[StoredMessage] {
        &self.displayed
    }

    /// Message currently shown at `index`.
    pub fn message_at(&self, index: usize) -> Option<&Message> {
        self.stored_at(index).map(|s| &s.message)
    }

    /// Stored row currently shown at `index`.
    pub fn stored_at(&self, index: usize) -> Option<&StoredMessage> {
        self.displayed.get(index)
    }

    /// Filter the cache with the current query and reconcile the displayed
    /// list against the result.
    ///
    /// When the remarks or the highlight keyword changed since the last pass,
    /// every surviving row also gets an update so names and spans repaint.
    /// Rows whose relative timestamp label has aged get one as well.
    pub fn apply(&mut self, now: NaiveDateTime) -> Render {
        let keyword = self.query.trim().to_string();
        let filtered = filter(&self.messages, &self.remarks, &keyword);

        let keyword_changed = self.highlights.set_keyword(&keyword);
        let remarks_changed = self.rendered_remarks != self.remarks;

        let identity = self.identity;
        // Row ids are not content; two rows with equal messages need no repaint
        let raw_ops = diff_with(
            &self.displayed,
            &filtered,
            |m| identity.key(m),
            |a, b| a.message == b.message,
        );

        let mut updated = vec![false; filtered.len()];
        let mut ops: Vec<ListOp<RowView>> = Vec::with_capacity(raw_ops.len());
        for op in raw_ops {
            if let ListOp::Update { index, .. } = op {
                updated[index] = true;
            }
            ops.push(op.map(|m| render_row(&mut self.highlights, &self.remarks, identity, &m, now)));
        }

        // Labels the receiver holds once the structural ops are applied
        let mut shown = std::mem::take(&mut self.rendered_labels);
        apply_ops(&mut shown, ops.iter().map(|op| op.clone().map(|row| row.timestamp_label)));
        let labels: Vec<String> = filtered
            .iter()
            .map(|m| timestamp_label(&m.message, now))
            .collect();

        let mut aged = 0;
        for (index, stored) in filtered.iter().enumerate() {
            if updated[index] {
                continue;
            }
            let stale = shown[index] != labels[index];
            if keyword_changed || remarks_changed || stale {
                aged += usize::from(stale);
                ops.push(ListOp::Update {
                    index,
                    item: render_row(&mut self.highlights, &self.remarks, identity, stored, now),
                });
            }
        }

        debug!(
            query = %keyword,
            shown = filtered.len(),
            total = self.messages.len(),
            ops = ops.len(),
            aged,
            "Filter pass"
        );

        self.displayed = filtered;
        self.rendered_labels = labels;
        if remarks_changed {
            self.rendered_remarks = self.remarks.clone();
        }

        Render {
            query: keyword,
            len: self.displayed.len(),
            ops,
        }
    }

    /// Render every displayed row from scratch.
    pub fn rows(&mut self, now: NaiveDateTime) -> Vec<RowView> {
        self.displayed
            .iter()
            .map(|m| render_row(&mut self.highlights, &self.remarks, self.identity, m, now))
            .collect()
    }
}

fn render_row(
    highlights: &mut HighlightCache,
    remarks: &HashMap<String, String>,
    identity: IdentityMode,
    stored: &StoredMessage,
    now: NaiveDateTime,
) -> RowView {
    let message = &stored.message;
    let name = display_name(message, remarks).to_string();
    RowView {
        key: identity.key(stored),
        name_spans: highlights.spans(&name),
        display_name: name,
        content_spans: highlights.spans(&message.content),
        content: message.content.clone(),
        timestamp_label: timestamp_label(message, now),
        is_unread: message.is_unread,
        kind: message.kind,
        avatar: message.avatar,
        image: match message.kind {
            MessageKind::Image => message.image,
            _ => None,
        },
        button_label: button_label(message).map(str::to_string),
    }
}
