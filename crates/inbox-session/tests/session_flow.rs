//! End-to-end session behaviour against an in-memory store.
//!
//! Every test runs on a paused clock so debounce, arrival and banner timers
//! can be stepped through without real waiting.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use inbox_db::Database;
use inbox_list::{ListOp, apply_ops};
use inbox_session::session::spawn_with_simulator;
use inbox_session::{
    IdentityMode, InboxHandle, MessageSimulator, RowKey, RowView, SessionConfig, SessionEvent,
    ensure_seeded,
};
use inbox_types::Message;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{Instant, timeout};

struct Harness {
    db: Arc<Database>,
    handle: InboxHandle,
    events: UnboundedReceiver<SessionEvent>,
    mirror: Vec<RowView>,
}

impl Harness {
    fn start(config: SessionConfig) -> Self {
        let db = Arc::new(Database::open_in_memory().unwrap());
        ensure_seeded(&db, Local::now()).unwrap();
        Self::with_db(db, config)
    }

    fn with_db(db: Arc<Database>, config: SessionConfig) -> Self {
        let (handle, events, _task) =
            spawn_with_simulator(db.clone(), config, MessageSimulator::with_seed(3));
        Self {
            db,
            handle,
            events,
            mirror: Vec::new(),
        }
    }

    fn quiet() -> Self {
        Self::start(SessionConfig {
            simulate: false,
            ..SessionConfig::default()
        })
    }

    async fn next(&mut self) -> SessionEvent {
        timeout(Duration::from_secs(600), self.events.recv())
            .await
            .expect("session went quiet")
            .expect("session ended")
    }

    /// Next event must be a list update; folds it into the mirror.
    async fn next_list(&mut self) -> (String, Vec<ListOp<RowView>>) {
        match self.next().await {
            SessionEvent::ListUpdated { query, ops, len } => {
                apply_ops(&mut self.mirror, ops.clone());
                assert_eq!(self.mirror.len(), len);
                (query, ops)
            }
            other => panic!("expected ListUpdated, got {:?}", other),
        }
    }

    async fn assert_silent_for(&mut self, window: Duration) {
        if let Ok(event) = timeout(window, self.events.recv()).await {
            panic!("expected silence, got {:?}", event);
        }
    }

    fn names(&self) -> Vec<&str> {
        self.mirror.iter().map(|r| r.display_name.as_str()).collect()
    }
}

#[tokio::test(start_paused = true)]
async fn activation_shows_seeded_inbox() {
    let mut h = Harness::quiet();
    h.handle.activate();

    let (query, ops) = h.next_list().await;
    assert_eq!(query, "");
    assert_eq!(ops.len(), 5);
    assert_eq!(
        h.names(),
        vec!["Inbox Assistant", "Ming the Photographer", "Ops Team", "Product Manager", "Wang"]
    );
    assert_eq!(h.mirror[2].button_label.as_deref(), Some("Claim reward"));
}

#[tokio::test(start_paused = true)]
async fn rapid_search_input_runs_one_pass() {
    let mut h = Harness::quiet();
    h.handle.activate();
    h.next_list().await;

    let start = Instant::now();
    for input in ["w", "wa", "wan"] {
        h.handle.search(input);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let (query, _) = h.next_list().await;
    assert_eq!(query, "wan");
    // Last keystroke at 200ms plus the 300ms window
    assert_eq!(start.elapsed(), Duration::from_millis(500));
    assert_eq!(h.names(), vec!["Ming the Photographer", "Wang"]);
    assert_eq!(h.mirror[1].name_spans, vec![0..3]);

    h.assert_silent_for(Duration::from_secs(5)).await;
}

#[tokio::test(start_paused = true)]
async fn clearing_the_query_restores_everything() {
    let mut h = Harness::quiet();
    h.handle.activate();
    h.next_list().await;

    h.handle.search("ops");
    h.next_list().await;
    assert_eq!(h.names(), vec!["Ops Team"]);

    h.handle.search("   ");
    let (query, _) = h.next_list().await;
    assert_eq!(query, "");
    assert_eq!(h.mirror.len(), 5);
    assert!(h.mirror.iter().all(|r| r.name_spans.is_empty() && r.content_spans.is_empty()));
}

#[tokio::test(start_paused = true)]
async fn remark_renames_and_becomes_searchable() {
    let mut h = Harness::quiet();
    h.handle.activate();
    h.next_list().await;

    h.handle.save_remark("Wang", "Buddy");
    h.next_list().await;
    assert_eq!(h.names()[4], "Buddy");
    assert_eq!(h.handle.remark("Wang").await.as_deref(), Some("Buddy"));
    assert_eq!(h.handle.remark("Nobody").await, None);

    h.handle.search("buddy");
    h.next_list().await;
    assert_eq!(h.names(), vec!["Buddy"]);
    assert_eq!(h.mirror[0].content, "Movie this weekend?");
}

#[tokio::test(start_paused = true)]
async fn opening_a_message_marks_it_read() {
    let mut h = Harness::quiet();
    h.handle.activate();
    h.next_list().await;
    assert!(h.mirror[0].is_unread);

    h.handle.open_message(0);
    let (_, ops) = h.next_list().await;
    assert!(matches!(ops[..], [ListOp::Update { index: 0, .. }]));
    assert!(!h.mirror[0].is_unread);
    assert!(!h.db.load_all_messages().unwrap()[0].is_unread);

    // Out of range taps are ignored
    h.handle.open_message(99);
    h.assert_silent_for(Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn arrival_inserts_on_top_and_flashes_banner() {
    let mut h = Harness::start(SessionConfig::default());
    h.handle.activate();
    h.next_list().await;
    let start = Instant::now();

    let (_, ops) = h.next_list().await;
    assert_eq!(start.elapsed(), Duration::from_secs(20));
    assert!(matches!(ops[..], [ListOp::Insert { index: 0, .. }]));
    assert_eq!(h.mirror.len(), 6);

    let arrived = match h.next().await {
        SessionEvent::MessageArrived { message } => message,
        other => panic!("expected MessageArrived, got {:?}", other),
    };
    assert!(arrived.is_unread);
    assert_eq!(h.mirror[0].content, arrived.content);
    assert!(matches!(h.next().await, SessionEvent::BannerShown));

    assert!(matches!(h.next().await, SessionEvent::BannerHidden));
    assert_eq!(start.elapsed(), Duration::from_secs(25));
    assert_eq!(h.db.message_count().unwrap(), 6);
}

#[tokio::test(start_paused = true)]
async fn repeated_activation_keeps_a_single_arrival_timer() {
    let mut h = Harness::start(SessionConfig::default());
    for _ in 0..3 {
        h.handle.activate();
    }
    for _ in 0..3 {
        h.next_list().await;
    }

    let start = Instant::now();
    let mut arrivals = Vec::new();
    while start.elapsed() < Duration::from_secs(59) {
        let remaining = Duration::from_secs(59) - start.elapsed();
        match timeout(remaining, h.events.recv()).await {
            Ok(Some(SessionEvent::MessageArrived { .. })) => arrivals.push(start.elapsed()),
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => break,
        }
    }
    assert_eq!(arrivals, vec![Duration::from_secs(20), Duration::from_secs(40)]);
    assert_eq!(h.db.message_count().unwrap(), 7);
}

#[tokio::test(start_paused = true)]
async fn deactivation_stops_timers_until_reactivated() {
    let mut h = Harness::start(SessionConfig::default());
    h.handle.activate();
    h.next_list().await;

    // A pending search is dropped along with the arrival timer
    h.handle.search("ops");
    h.handle.deactivate();
    h.assert_silent_for(Duration::from_secs(120)).await;
    assert_eq!(h.db.message_count().unwrap(), 5);

    h.handle.activate();
    let (query, _) = h.next_list().await;
    assert_eq!(query, "ops");

    let start = Instant::now();
    h.next_list().await;
    assert_eq!(start.elapsed(), Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn dismissing_the_banner_hides_it_early() {
    let mut h = Harness::start(SessionConfig::default());
    h.handle.activate();
    h.next_list().await;

    h.next_list().await;
    assert!(matches!(h.next().await, SessionEvent::MessageArrived { .. }));
    assert!(matches!(h.next().await, SessionEvent::BannerShown));

    h.handle.dismiss_banner();
    assert!(matches!(h.next().await, SessionEvent::BannerHidden));

    // The cancelled hide timer must not fire a second BannerHidden
    let start = Instant::now();
    let (_, _) = h.next_list().await;
    assert_eq!(start.elapsed(), Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn shutdown_ends_the_session() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let (handle, mut events, task) =
        spawn_with_simulator(db, SessionConfig::default(), MessageSimulator::with_seed(1));
    handle.activate();
    handle.shutdown();

    task.await.unwrap();
    assert!(matches!(events.recv().await, Some(SessionEvent::ListUpdated { len: 0, .. })));
    assert!(events.recv().await.is_none());
    assert_eq!(handle.remark("anyone").await, None);
}

#[tokio::test(start_paused = true)]
async fn row_identity_marks_the_tapped_twin() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let twin = Message {
        is_unread: true,
        ..Message::text("Bot", "ping", "2024-05-10 09:00:00")
    };
    db.try_insert_messages(&[twin.clone(), twin]).unwrap();

    let mut h = Harness::with_db(
        db,
        SessionConfig {
            simulate: false,
            identity: IdentityMode::Row,
            ..SessionConfig::default()
        },
    );
    h.handle.activate();
    h.next_list().await;
    assert_eq!(h.mirror[0].key, RowKey::Row(2));

    h.handle.open_message(0);
    let (_, ops) = h.next_list().await;
    assert!(matches!(ops[..], [ListOp::Update { index: 0, .. }]));
    assert_eq!((h.mirror[0].key.clone(), h.mirror[0].is_unread), (RowKey::Row(2), false));
    assert_eq!((h.mirror[1].key.clone(), h.mirror[1].is_unread), (RowKey::Row(1), true));

    let stored = h.db.load_all_stored().unwrap();
    assert_eq!((stored[0].id, stored[0].message.is_unread), (2, false));
    assert_eq!((stored[1].id, stored[1].message.is_unread), (1, true));
}

#[tokio::test(start_paused = true)]
async fn failed_arrival_leaves_the_list_alone() {
    let mut h = Harness::start(SessionConfig::default());
    h.db.with_conn(|conn| {
        conn.execute_batch(
            "CREATE TRIGGER reject_inserts BEFORE INSERT ON messages
             BEGIN SELECT RAISE(ABORT, 'store is read-only'); END;",
        )?;
        Ok(())
    })
    .unwrap();

    h.handle.activate();
    h.next_list().await;

    // Two arrival ticks, both rejected: no list change, no banner
    h.assert_silent_for(Duration::from_secs(50)).await;
    assert_eq!(h.db.message_count().unwrap(), 5);
    assert_eq!(h.mirror.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn failed_reload_keeps_last_snapshot() {
    let mut h = Harness::quiet();
    h.handle.activate();
    h.next_list().await;
    let before = h.mirror.clone();

    h.db.with_conn(|conn| {
        conn.execute_batch("DROP TABLE remarks")?;
        Ok(())
    })
    .unwrap();

    h.handle.reload();
    let (_, ops) = h.next_list().await;
    assert!(ops.is_empty());
    assert_eq!(h.mirror, before);

    // Searching still works against the cached snapshot
    h.handle.search("wang");
    h.next_list().await;
    assert_eq!(h.names(), vec!["Wang"]);
}

#[tokio::test(start_paused = true)]
async fn label_refresh_stays_quiet_while_labels_hold() {
    let mut h = Harness::quiet();
    h.handle.activate();
    h.next_list().await;

    // Refresh ticks at 60s and 120s find nothing aged
    h.assert_silent_for(Duration::from_secs(150)).await;
}
