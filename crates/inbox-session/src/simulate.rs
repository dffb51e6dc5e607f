use anyhow::Result;
use chrono::{DateTime, Duration, Local};
use inbox_db::Database;
use inbox_types::{Message, MessageKind, ResourceRef};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

/// Number of avatar handles the simulator picks from.
pub const AVATAR_COUNT: i64 = 42;

pub const CTA_BUTTON_TEXT: &str = "Claim reward";

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SENDERS: &[&str] = &[
    "Andy Dufresne",
    "Red",
    "Bruce Wayne",
    "Tony Stark",
    "Peter Parker",
    "Doc Brown",
    "Marty",
    "Forrest",
    "Jenny",
    "Leon",
    "Mathilda",
    "Neo",
    "Morpheus",
    "Trinity",
    "Hermione",
    "Ron",
    "Dumbledore",
    "Rose",
    "Truman",
    "Jack Sparrow",
    "Indiana Jones",
    "Han Solo",
    "Luke",
    "Yoda",
    "John Wick",
    "Jason Bourne",
    "Ethan Hunt",
    "Chihiro",
    "Totoro",
    "Buzz Lightyear",
    "Woody",
    "Shrek",
    "Donkey",
];

const LINES: &[&str] = &[
    "Hope is a good thing, maybe the best of things.",
    "Get busy living, or get busy dying.",
    "Why so serious?",
    "I am Iron Man.",
    "May the Force be with you.",
    "To infinity and beyond!",
    "Life is like a box of chocolates.",
    "Do you believe in miracles?",
    "I'll be back.",
    "Goodbye is not the end, just another journey.",
    "You never know your limits until you try.",
    "Family always comes first.",
    "I'll never let go.",
    "There is only one truth.",
    "With great power comes great responsibility.",
    "You are not fighting alone.",
    "When you gaze into the abyss, the abyss gazes back.",
    "I just wanted to order some fried chicken.",
    "I'm waiting for the wind, and for you.",
    "I didn't lose, I just haven't won yet.",
    "Don't look back, the light is ahead.",
    "Every goodbye deserves a real hug.",
    "Thanks for being in the movie of my life.",
    "Shall we see the sea tomorrow?",
    "Some birds aren't meant to be caged.",
];

/// Produces random incoming messages while the inbox is active.
pub struct MessageSimulator {
    rng: StdRng,
}

impl MessageSimulator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic simulator for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_message(&mut self, now: DateTime<Local>) -> Message {
        let user_name = SENDERS[self.rng.random_range(0..SENDERS.len())];
        let content = LINES[self.rng.random_range(0..LINES.len())];
        let avatar = ResourceRef(self.rng.random_range(0..AVATAR_COUNT));

        let base = Message {
            is_unread: true,
            avatar,
            timestamp_millis: Some(now.timestamp_millis()),
            ..Message::text(user_name, content, format_display(now))
        };

        match self.rng.random_range(0..3) {
            0 => base,
            1 => Message {
                kind: MessageKind::Image,
                // Any avatar doubles as a sample picture
                image: Some(ResourceRef(self.rng.random_range(0..AVATAR_COUNT))),
                ..base
            },
            _ => Message {
                kind: MessageKind::Cta,
                button_text: Some(CTA_BUTTON_TEXT.to_string()),
                ..base
            },
        }
    }
}

impl Default for MessageSimulator {
    fn default() -> Self {
        Self::new()
    }
}

pub fn format_display(ts: DateTime<Local>) -> String {
    ts.format(DISPLAY_FORMAT).to_string()
}

/// First-run sample inbox, newest first.
pub fn seed_messages(now: DateTime<Local>) -> Vec<Message> {
    let entry = |ago: Duration, user: &str, content: &str, unread: bool| {
        let at = now - ago;
        Message {
            is_unread: unread,
            timestamp_millis: Some(at.timestamp_millis()),
            ..Message::text(user, content, format_display(at))
        }
    };

    vec![
        entry(Duration::minutes(2), "Inbox Assistant", "Welcome to your message center", true),
        Message {
            kind: MessageKind::Image,
            image: Some(ResourceRef(0)),
            ..entry(Duration::hours(1), "Ming the Photographer", "Nice shot, want a look?", false)
        },
        Message {
            kind: MessageKind::Cta,
            button_text: Some(CTA_BUTTON_TEXT.to_string()),
            ..entry(Duration::days(1), "Ops Team", "Limited-time perk, tap to claim", true)
        },
        entry(Duration::days(3), "Product Manager", "Remember tomorrow's meeting", false),
        entry(Duration::days(9), "Wang", "Movie this weekend?", true),
    ]
}

/// Insert the sample inbox if the store holds no messages yet. Returns the
/// number of rows written.
pub fn ensure_seeded(db: &Database, now: DateTime<Local>) -> Result<usize> {
    if db.message_count()? > 0 {
        return Ok(0);
    }

    // Stored oldest first so the newest ends up with the highest row id
    let mut seed = seed_messages(now);
    seed.reverse();
    let rows = db.try_insert_messages(&seed)?;
    info!("Seeded empty inbox with {} messages", rows);
    Ok(rows)
}
