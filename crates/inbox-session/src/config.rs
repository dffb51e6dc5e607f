use std::str::FromStr;
use std::time::Duration;

use inbox_list::highlight::DEFAULT_CACHE_CAPACITY;
use inbox_types::StoredMessage;
use thiserror::Error;

use crate::state::RowKey;

/// How rows are matched up when the displayed list is reconciled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdentityMode {
    /// `(user_name, content, timestamp)`. Messages sharing all three are
    /// interchangeable to the reconciler.
    #[default]
    Tuple,
    /// Store row id. Every persisted message is distinct.
    Row,
}

impl IdentityMode {
    pub fn key(&self, stored: &StoredMessage) -> RowKey {
        match self {
            Self::Tuple => RowKey::Tuple(stored.message.key()),
            Self::Row => RowKey::Row(stored.id),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown identity mode '{0}', expected 'tuple' or 'row'")]
pub struct ParseIdentityError(String);

impl FromStr for IdentityMode {
    type Err = ParseIdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tuple" => Ok(Self::Tuple),
            "row" => Ok(Self::Row),
            other => Err(ParseIdentityError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Period of simulated message arrival while active
    pub message_interval: Duration,
    /// How long the new-message banner stays up
    pub banner_visible: Duration,
    /// Quiet period before a search input is applied
    pub search_debounce: Duration,
    /// How often aged timestamp labels are repainted while active
    pub label_refresh: Duration,
    pub highlight_cache_capacity: usize,
    pub identity: IdentityMode,
    /// Generate a message every `message_interval` while active
    pub simulate: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            message_interval: Duration::from_secs(20),
            banner_visible: Duration::from_secs(5),
            search_debounce: Duration::from_millis(300),
            label_refresh: Duration::from_secs(60),
            highlight_cache_capacity: DEFAULT_CACHE_CAPACITY,
            identity: IdentityMode::Tuple,
            simulate: true,
        }
    }
}
