//! Row-level types for the message store.
//! Distinct from inbox-types models so the payload format stays a store concern.

use inbox_types::CodecError;
use thiserror::Error;

/// Raw `messages` row before its payload is decoded.
pub struct MessageRow {
    pub id: i64,
    pub json: String,
}

/// A stored row whose payload no longer decodes.
#[derive(Debug, Error)]
#[error("corrupt message row {id}: {source}")]
pub struct RowError {
    pub id: i64,
    #[source]
    pub source: CodecError,
}

/// Result of a best-effort write.
///
/// Failures have already been logged by the store; the variant only tells
/// the caller whether anything reached disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Committed { rows: usize },
    Failed,
}

impl WriteOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}
