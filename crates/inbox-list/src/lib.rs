//! List plumbing for the inbox view:
//! - case-insensitive search over sender, remark and content
//! - highlight spans with a bounded per-keyword cache
//! - Myers-based reconciliation into insert/remove/move/update ops
//! - display-name and relative timestamp formatting

pub mod diff;
pub mod filter;
pub mod format;
pub mod highlight;

pub use diff::{ListOp, apply_ops, diff, diff_by, diff_with};
pub use filter::{filter, matches};
pub use format::{button_label, display_name, message_time, relative_label, timestamp_label};
pub use highlight::{HighlightCache, Span, highlight};
