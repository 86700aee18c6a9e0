//! Broadcaster handle and coordination loop
//!
//! The coordination task is the only owner of the subscriber set. Handles
//! talk to it through a bounded command channel and wait for a oneshot
//! acknowledgement. A subscribe is applied only once the input is drained,
//! so a subscription receives exactly the messages sent after `subscribe`
//! returned, never one that was already queued.

use std::collections::{HashMap, VecDeque};
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::config::BroadcastConfig;
use super::subscription::{Subscription, SubscriptionId};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::stats::BroadcastStats;
use crate::tail::MessageTail;

/// Requests handled by the coordination task
enum Command {
    Subscribe {
        replay: bool,
        reply: oneshot::Sender<(Vec<Message>, Subscription)>,
    },
    Cancel(SubscriptionId, oneshot::Sender<()>),
    History(oneshot::Sender<Vec<Message>>),
    Stats(oneshot::Sender<BroadcastStats>),
}

/// Outcome of handing one message to one subscriber
enum Delivery {
    Delivered,
    /// Consumer dropped its read side
    Disconnected,
    /// Consumer did not accept within `send_timeout`
    TimedOut,
}

/// Handle to a running broadcaster
///
/// Cheap to clone; every clone talks to the same coordination task.
///
/// # Example
/// ```no_run
/// use chat_hub::{Broadcaster, Message};
/// use tokio::sync::mpsc;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> chat_hub::Result<()> {
/// let (input, source) = mpsc::channel(16);
/// let broadcaster = Broadcaster::new(source, CancellationToken::new());
///
/// let mut sub = broadcaster.subscribe().await?;
/// let _ = input.send(Message::new("acorn1", "hello")).await;
///
/// while let Some(msg) = sub.recv().await {
///     println!("{}", msg.text);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Broadcaster {
    commands: mpsc::Sender<Command>,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Subscribe { replay, .. } => write!(f, "Subscribe(replay={})", replay),
            Command::Cancel(id, _) => write!(f, "Cancel({})", id),
            Command::History(_) => write!(f, "History"),
            Command::Stats(_) => write!(f, "Stats"),
        }
    }
}

impl Broadcaster {
    /// Start a broadcaster with default configuration
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(source: mpsc::Receiver<Message>, shutdown: CancellationToken) -> Self {
        Self::with_config(BroadcastConfig::default(), source, shutdown)
    }

    /// Start a broadcaster with custom configuration
    pub fn with_config(
        config: BroadcastConfig,
        source: mpsc::Receiver<Message>,
        shutdown: CancellationToken,
    ) -> Self {
        let mut config = config;
        config.command_capacity = config.command_capacity.max(1);
        config.subscriber_capacity = config.subscriber_capacity.max(1);

        let (tx, rx) = mpsc::channel(config.command_capacity);
        let tail = MessageTail::with_capacity(config.tail_capacity);

        let hub = Hub {
            config,
            source,
            commands: rx,
            shutdown: shutdown.clone(),
            subscribers: HashMap::new(),
            pending: VecDeque::new(),
            tail,
            next_id: 1,
            stats: BroadcastStats::new(),
        };
        tokio::spawn(hub.run());

        Self {
            commands: tx,
            shutdown,
        }
    }

    /// Register a new output stream
    ///
    /// Returns once the coordination task has registered it. Messages already
    /// queued on the input are taken first and are not delivered to the new
    /// subscription, so this also waits out a fan-out stalled on a slow
    /// subscriber. Fails with `Error::Closed` after shutdown.
    pub async fn subscribe(&self) -> Result<Subscription> {
        let (_, sub) = self
            .request(|reply| Command::Subscribe {
                replay: false,
                reply,
            })
            .await?;
        Ok(sub)
    }

    /// Register a new output stream together with the recent history
    ///
    /// The history and the registration are taken in the same step, so the
    /// replay ends exactly where the live stream begins.
    pub async fn subscribe_with_history(&self) -> Result<(Vec<Message>, Subscription)> {
        self.request(|reply| Command::Subscribe {
            replay: true,
            reply,
        })
        .await
    }

    /// Recent messages, oldest first
    ///
    /// Includes everything queued on the input when the request arrives, so
    /// like `subscribe` it waits while a fan-out is stalled.
    pub async fn history(&self) -> Result<Vec<Message>> {
        self.request(Command::History).await
    }

    /// Remove a subscription and close its output stream
    ///
    /// Unknown or already removed ids are a no-op. Applied even while a
    /// fan-out is stalled; cancelling the stalled subscriber unblocks it.
    /// Fails with `Error::Closed` after shutdown.
    pub async fn cancel(&self, id: SubscriptionId) -> Result<()> {
        self.request(|reply| Command::Cancel(id, reply)).await
    }

    /// Snapshot of the coordination task's counters
    ///
    /// Answered immediately, even while a fan-out is stalled.
    pub async fn stats(&self) -> Result<BroadcastStats> {
        self.request(Command::Stats).await
    }

    /// Cancel the bound token, closing every subscription
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Whether the coordination task has exited
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Wait until the coordination task has exited
    pub async fn closed(&self) {
        self.commands.closed().await
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        if self.shutdown.is_cancelled() {
            return Err(Error::Closed);
        }

        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| Error::Closed)?;

        // The reply is dropped unanswered if the loop exits first
        rx.await.map_err(|_| Error::Closed)
    }
}

/// State owned by the coordination task
struct Hub {
    config: BroadcastConfig,
    source: mpsc::Receiver<Message>,
    commands: mpsc::Receiver<Command>,
    shutdown: CancellationToken,
    subscribers: HashMap<SubscriptionId, mpsc::Sender<Message>>,
    /// Subscribe and history requests waiting for the input to drain
    pending: VecDeque<Command>,
    tail: MessageTail,
    next_id: u64,
    stats: BroadcastStats,
}

impl Hub {
    async fn run(mut self) {
        tracing::info!("Broadcaster started");

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    tracing::info!("Broadcaster shutdown requested");
                    break;
                }
                msg = self.source.recv() => match msg {
                    Some(msg) => {
                        if self.fan_out(msg).await.is_break() {
                            tracing::info!("Broadcaster shutdown during fan-out");
                            break;
                        }
                    }
                    None => {
                        tracing::info!("Broadcaster input closed");
                        break;
                    }
                },
                Some(cmd) = self.commands.recv() => self.accept_command(cmd),
                // Input looked idle only because the coop budget ran out
                _ = tokio::task::yield_now(), if !self.pending.is_empty() => {}
            }

            self.apply_pending();
        }

        // Dropping the senders closes every output stream
        let remaining = self.subscribers.len();
        self.subscribers.clear();

        tracing::info!(
            closed_subscriptions = remaining,
            messages = self.stats.messages_received,
            "Broadcaster stopped"
        );
    }

    /// Apply cancel and stats right away, queue the rest
    ///
    /// A subscribe must not overtake messages already queued on the input,
    /// so it waits in `pending` until the input is empty.
    fn accept_command(&mut self, cmd: Command) {
        match cmd {
            Command::Cancel(id, reply) => self.remove_subscriber(id, reply),
            Command::Stats(reply) => {
                let _ = reply.send(self.snapshot());
            }
            cmd => self.pending.push_back(cmd),
        }
    }

    fn apply_pending(&mut self) {
        while self.source.is_empty() {
            let Some(cmd) = self.pending.pop_front() else {
                break;
            };

            match cmd {
                Command::Subscribe { replay, reply } => self.add_subscriber(replay, reply),
                Command::History(reply) => {
                    let _ = reply.send(self.tail.iter().cloned().collect());
                }
                cmd => self.accept_command(cmd),
            }
        }
    }

    fn add_subscriber(
        &mut self,
        replay: bool,
        reply: oneshot::Sender<(Vec<Message>, Subscription)>,
    ) {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;

        let (tx, rx) = mpsc::channel(self.config.subscriber_capacity);
        self.subscribers.insert(id, tx);

        let history = if replay {
            self.tail.iter().cloned().collect()
        } else {
            Vec::new()
        };

        if reply.send((history, Subscription::new(id, rx))).is_err() {
            // Caller went away before registration completed
            self.subscribers.remove(&id);
            return;
        }

        self.stats.total_subscriptions += 1;
        tracing::debug!(
            subscription = %id,
            subscribers = self.subscribers.len(),
            replay = replay,
            "Subscriber added"
        );
    }

    fn remove_subscriber(&mut self, id: SubscriptionId, reply: oneshot::Sender<()>) {
        if self.subscribers.remove(&id).is_some() {
            tracing::debug!(
                subscription = %id,
                subscribers = self.subscribers.len(),
                "Subscriber removed"
            );
        }
        let _ = reply.send(());
    }

    fn snapshot(&self) -> BroadcastStats {
        let mut snapshot = self.stats.clone();
        snapshot.active_subscriptions = self.subscribers.len() as u64;
        snapshot
    }

    /// Hand `msg` to every registered subscriber
    ///
    /// Breaks if shutdown is signalled while a handoff is pending. While a
    /// handoff is stalled, stats are answered at once and a cancel for the
    /// stalled subscriber aborts its handoff; other cancels are applied after
    /// the fan-out and everything else joins `pending`.
    async fn fan_out(&mut self, msg: Message) -> ControlFlow<()> {
        self.stats.messages_received += 1;
        self.tail.push(msg.clone());

        let targets: Vec<SubscriptionId> = self.subscribers.keys().copied().collect();
        let mut cancels: Vec<(SubscriptionId, oneshot::Sender<()>)> = Vec::new();
        let mut evicted = Vec::new();

        for id in targets {
            if cancels.iter().any(|(cid, _)| *cid == id) {
                continue;
            }
            let Some(tx) = self.subscribers.get(&id) else {
                continue;
            };

            let send = deliver(tx, msg.clone(), self.config.send_timeout);
            tokio::pin!(send);

            loop {
                tokio::select! {
                    biased;

                    _ = self.shutdown.cancelled() => return ControlFlow::Break(()),
                    delivery = &mut send => {
                        match delivery {
                            Delivery::Delivered => self.stats.deliveries += 1,
                            Delivery::Disconnected => evicted.push((id, "receiver dropped")),
                            Delivery::TimedOut => evicted.push((id, "send timed out")),
                        }
                        break;
                    }
                    Some(cmd) = self.commands.recv() => match cmd {
                        Command::Cancel(cid, reply) => {
                            cancels.push((cid, reply));
                            if cid == id {
                                break;
                            }
                        }
                        Command::Stats(reply) => {
                            let _ = reply.send(self.snapshot());
                        }
                        cmd => self.pending.push_back(cmd),
                    },
                }
            }
        }

        for (id, reason) in evicted {
            if self.subscribers.remove(&id).is_some() {
                self.stats.evicted_subscriptions += 1;
                tracing::warn!(
                    subscription = %id,
                    reason = reason,
                    subscribers = self.subscribers.len(),
                    "Subscriber evicted"
                );
            }
        }

        for (id, reply) in cancels {
            self.remove_subscriber(id, reply);
        }

        ControlFlow::Continue(())
    }
}

async fn deliver(
    tx: &mpsc::Sender<Message>,
    msg: Message,
    timeout: Option<Duration>,
) -> Delivery {
    match timeout {
        None => match tx.send(msg).await {
            Ok(()) => Delivery::Delivered,
            Err(_) => Delivery::Disconnected,
        },
        Some(timeout) => match tokio::time::timeout(timeout, tx.send(msg)).await {
            Ok(Ok(())) => Delivery::Delivered,
            Ok(Err(_)) => Delivery::Disconnected,
            Err(_) => Delivery::TimedOut,
        },
    }
}
