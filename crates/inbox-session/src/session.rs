use std::sync::Arc;

use anyhow::anyhow;
use chrono::Local;
use inbox_db::Database;
use inbox_list::ListOp;
use inbox_types::Message;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{IdentityMode, SessionConfig};
use crate::simulate::MessageSimulator;
use crate::state::{InboxState, RowView};
use crate::timers::{TimerFired, TimerKind, TimerSlot};

/// Requests from the presentation layer.
#[derive(Debug)]
pub enum Command {
    /// The inbox became visible: reload and start simulated arrivals
    Activate,
    /// The inbox went away: stop every timer
    Deactivate,
    /// Raw search box contents; applied after the debounce window
    SearchInput(String),
    /// Row at this displayed index was tapped
    OpenMessage(usize),
    SaveRemark { user_name: String, remark: String },
    GetRemark {
        user_name: String,
        reply: oneshot::Sender<Option<String>>,
    },
    Reload,
    /// Banner tapped: hide it now
    DismissBanner,
    Shutdown,
}

/// Notifications for the presentation layer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Apply `ops` to the rendered list; it then holds `len` rows
    ListUpdated {
        query: String,
        ops: Vec<ListOp<RowView>>,
        len: usize,
    },
    /// A simulated message was stored
    MessageArrived { message: Message },
    BannerShown,
    BannerHidden,
}

/// Cloneable front door to a running session.
#[derive(Clone)]
pub struct InboxHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl InboxHandle {
    pub fn send(&self, command: Command) {
        let _ = self.tx.send(command);
    }

    pub fn activate(&self) {
        self.send(Command::Activate);
    }

    pub fn deactivate(&self) {
        self.send(Command::Deactivate);
    }

    pub fn search(&self, input: impl Into<String>) {
        self.send(Command::SearchInput(input.into()));
    }

    pub fn open_message(&self, index: usize) {
        self.send(Command::OpenMessage(index));
    }

    pub fn save_remark(&self, user_name: impl Into<String>, remark: impl Into<String>) {
        self.send(Command::SaveRemark {
            user_name: user_name.into(),
            remark: remark.into(),
        });
    }

    /// Current remark for `user_name`. `None` if unset or the session is gone.
    pub async fn remark(&self, user_name: impl Into<String>) -> Option<String> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::GetRemark {
            user_name: user_name.into(),
            reply,
        });
        rx.await.ok().flatten()
    }

    pub fn reload(&self) {
        self.send(Command::Reload);
    }

    pub fn dismiss_banner(&self) {
        self.send(Command::DismissBanner);
    }

    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }
}

/// Start a session task on the current runtime.
pub fn spawn(
    db: Arc<Database>,
    config: SessionConfig,
) -> (InboxHandle, mpsc::UnboundedReceiver<SessionEvent>, JoinHandle<()>) {
    spawn_with_simulator(db, config, MessageSimulator::new())
}

pub fn spawn_with_simulator(
    db: Arc<Database>,
    config: SessionConfig,
    simulator: MessageSimulator,
) -> (InboxHandle, mpsc::UnboundedReceiver<SessionEvent>, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (timer_tx, timer_rx) = mpsc::unbounded_channel();

    let session = InboxSession {
        state: InboxState::new(config.identity, config.highlight_cache_capacity),
        db,
        config,
        simulator,
        events: event_tx,
        timer_tx,
        debounce: TimerSlot::new(TimerKind::SearchDebounce),
        arrival: TimerSlot::new(TimerKind::MessageArrival),
        banner: TimerSlot::new(TimerKind::BannerHide),
        refresh: TimerSlot::new(TimerKind::LabelRefresh),
        active: false,
        banner_visible: false,
    };
    let task = tokio::spawn(session.run(command_rx, timer_rx));

    (InboxHandle { tx: command_tx }, event_rx, task)
}

struct InboxSession {
    db: Arc<Database>,
    config: SessionConfig,
    state: InboxState,
    simulator: MessageSimulator,
    events: mpsc::UnboundedSender<SessionEvent>,
    timer_tx: mpsc::UnboundedSender<TimerFired>,
    debounce: TimerSlot,
    arrival: TimerSlot,
    banner: TimerSlot,
    refresh: TimerSlot,
    active: bool,
    banner_visible: bool,
}

impl InboxSession {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut timers: mpsc::UnboundedReceiver<TimerFired>,
    ) {
        info!("Inbox session started");
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                Some(fired) = timers.recv() => self.handle_timer(fired).await,
            }
        }
        self.stop_timers();
        info!("Inbox session stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Activate => {
                if self.active {
                    debug!("Already active, restarting timers");
                } else {
                    info!("Inbox active");
                }
                self.active = true;
                self.reload().await;
                if self.config.simulate {
                    self.arrival.arm_repeating(self.config.message_interval, &self.timer_tx);
                }
                self.refresh.arm_repeating(self.config.label_refresh, &self.timer_tx);
            }
            Command::Deactivate => {
                if !self.active {
                    return;
                }
                info!("Inbox inactive");
                self.active = false;
                self.stop_timers();
                self.hide_banner();
            }
            Command::SearchInput(input) => {
                self.state.set_query(input);
                self.debounce.arm_once(self.config.search_debounce, &self.timer_tx);
            }
            Command::OpenMessage(index) => {
                let Some(target) = self.state.stored_at(index).cloned() else {
                    debug!("OpenMessage: no row at {}", index);
                    return;
                };
                let identity = self.config.identity;
                let marked = self
                    .store(move |db| match identity {
                        IdentityMode::Tuple => db.mark_as_read(&target.message),
                        IdentityMode::Row => db.mark_as_read_id(target.id),
                    })
                    .await;
                match marked {
                    Ok(changed) => debug!(changed, "Marked message at {} as read", index),
                    Err(e) => warn!("Failed to mark message read: {:#}", e),
                }
                self.reload().await;
            }
            Command::SaveRemark { user_name, remark } => {
                let user = user_name.clone();
                match self.store(move |db| db.save_remark(&user_name, &remark)).await {
                    Ok(()) => info!("Saved remark for {}", user),
                    Err(e) => warn!("Failed to save remark for {}: {:#}", user, e),
                }
                self.reload().await;
            }
            Command::GetRemark { user_name, reply } => {
                let remark = self
                    .store(move |db| db.get_remark(&user_name))
                    .await
                    .unwrap_or_else(|e| {
                        warn!("Remark lookup failed: {:#}", e);
                        None
                    });
                let _ = reply.send(remark);
            }
            Command::Reload => self.reload().await,
            Command::DismissBanner => {
                self.banner.cancel();
                self.hide_banner();
            }
            Command::Shutdown => unreachable!("handled by run loop"),
        }
    }

    async fn handle_timer(&mut self, fired: TimerFired) {
        let slot = match fired.kind {
            TimerKind::SearchDebounce => &self.debounce,
            TimerKind::MessageArrival => &self.arrival,
            TimerKind::BannerHide => &self.banner,
            TimerKind::LabelRefresh => &self.refresh,
        };
        if !slot.accepts(&fired) {
            debug!(timer = ?fired.kind, generation = fired.generation, "Dropping stale timer");
            return;
        }

        match fired.kind {
            TimerKind::SearchDebounce => {
                self.debounce.finish();
                self.apply();
            }
            TimerKind::MessageArrival => self.deliver_simulated().await,
            TimerKind::BannerHide => {
                self.banner.finish();
                self.hide_banner();
            }
            // A pending search pass repaints labels anyway
            TimerKind::LabelRefresh if self.debounce.is_armed() => {}
            TimerKind::LabelRefresh => self.repaint_labels(),
        }
    }

    async fn deliver_simulated(&mut self) {
        let message = self.simulator.next_message(Local::now());
        let batch = vec![message.clone()];
        let outcome = self.store(move |db| Ok(db.insert_messages(&batch))).await;
        if !matches!(outcome, Ok(o) if o.is_committed()) {
            // Already logged by the store; keep showing what we have
            return;
        }
        info!("New message from {}", message.user_name);

        self.reload().await;
        let _ = self.events.send(SessionEvent::MessageArrived { message });
        self.show_banner();
    }

    /// Pull a fresh snapshot from the store and re-run the filter. On failure
    /// the previous snapshot stays on screen.
    async fn reload(&mut self) {
        let snapshot = self
            .store(|db| Ok((db.load_all_stored()?, db.load_all_remarks()?)))
            .await;
        match snapshot {
            Ok((messages, remarks)) => self.state.replace_data(messages, remarks),
            Err(e) => warn!("Reload failed, keeping last known state: {:#}", e),
        }
        self.apply();
    }

    fn apply(&mut self) {
        let render = self.state.apply(Local::now().naive_local());
        let _ = self.events.send(SessionEvent::ListUpdated {
            query: render.query,
            ops: render.ops,
            len: render.len,
        });
    }

    /// Send only when some label actually aged.
    fn repaint_labels(&mut self) {
        let render = self.state.apply(Local::now().naive_local());
        if render.ops.is_empty() {
            return;
        }
        let _ = self.events.send(SessionEvent::ListUpdated {
            query: render.query,
            ops: render.ops,
            len: render.len,
        });
    }

    fn show_banner(&mut self) {
        self.banner_visible = true;
        let _ = self.events.send(SessionEvent::BannerShown);
        self.banner.arm_once(self.config.banner_visible, &self.timer_tx);
    }

    fn hide_banner(&mut self) {
        if self.banner_visible {
            self.banner_visible = false;
            let _ = self.events.send(SessionEvent::BannerHidden);
        }
    }

    fn stop_timers(&mut self) {
        self.debounce.cancel();
        self.arrival.cancel();
        self.banner.cancel();
        self.refresh.cancel();
    }

    /// Run a store call on the blocking pool. The session waits for it, so
    /// store access stays serialized with everything else.
    async fn store<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| anyhow!("store task failed: {}", e))?
    }
}
