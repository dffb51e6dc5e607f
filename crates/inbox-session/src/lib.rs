//! Inbox session: the single task that owns the displayed list.
//!
//! Store access, search debouncing, simulated arrivals and banner timing all
//! run on one loop so the in-memory state is never mutated concurrently.

pub mod config;
pub mod session;
pub mod simulate;
pub mod state;
pub mod timers;

pub use config::{IdentityMode, SessionConfig};
pub use session::{Command, InboxHandle, SessionEvent, spawn};
pub use simulate::{MessageSimulator, ensure_seeded, seed_messages};
pub use state::{InboxState, Render, RowKey, RowView};
pub use timers::{TimerFired, TimerKind, TimerSlot};
