//! LISTEN/NOTIFY polling.
//!
//! The provider keeps the set of listened channels in sync with the
//! configuration, drains the notification source on a fixed interval and
//! hands each channel's lines to the [`Dispatcher`]. Notifications sent by
//! our own backend are dropped: the local model already holds those
//! changes.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use navi_config::NotificationConfig;
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::dispatcher::{Dispatcher, Event};
use crate::error::NotifyError;
use crate::resolver::{DataLoader, Informer, ModelResolver};
use crate::table::Channel;

/// One notification as delivered by the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub channel: String,
    /// Backend process that sent the notification.
    pub pid: i32,
    pub payload: String,
}

/// A database connection able to LISTEN.
pub trait NotificationSource {
    /// Process id of our own backend.
    fn backend_pid(&self) -> i32;

    fn listen(&mut self, channel: &str) -> Result<(), NotifyError>;

    fn unlisten(&mut self, channel: &str) -> Result<(), NotifyError>;

    /// Drains pending notifications without blocking.
    fn poll(&mut self) -> Result<Vec<Notification>, NotifyError>;

    fn is_valid(&self) -> bool;

    fn reconnect(&mut self) -> Result<(), NotifyError>;
}

/// Provider settings derived from [`NotificationConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub poll_interval: Duration,
    pub channels: BTreeSet<Channel>,
}

impl ProviderSettings {
    /// Unknown channel names are rejected; an empty list listens to none.
    pub fn from_config(config: &NotificationConfig) -> Result<Self, NotifyError> {
        let channels = config
            .channels
            .iter()
            .map(|name| {
                Channel::from_name(name)
                    .ok_or_else(|| NotifyError::Source(format!("unknown channel '{name}'")))
            })
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            channels,
        })
    }
}

/// Outcome of one poll.
#[derive(Debug, Default)]
pub struct PollReport {
    pub received: usize,
    /// Notifications sent by our own backend.
    pub own: usize,
    pub events: Vec<Event>,
    /// Lines that could not be applied. Fatal errors end their channel's
    /// batch for this poll.
    pub failures: Vec<(String, NotifyError)>,
}

/// Drives one notification source.
pub struct NotificationProvider<S> {
    source: S,
    dispatcher: Dispatcher,
    listened: BTreeSet<Channel>,
}

impl<S: NotificationSource> NotificationProvider<S> {
    pub fn new(source: S, dispatcher: Dispatcher) -> Self {
        Self {
            source,
            dispatcher,
            listened: BTreeSet::new(),
        }
    }

    /// Channels currently listened to.
    pub fn listened(&self) -> &BTreeSet<Channel> {
        &self.listened
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Unlistens channels no longer wanted, then listens to new ones.
    pub fn sync_channels(&mut self, desired: &BTreeSet<Channel>) -> Result<(), NotifyError> {
        let removed: Vec<Channel> = self.listened.difference(desired).copied().collect();
        for channel in removed {
            self.source.unlisten(channel.name())?;
            self.listened.remove(&channel);
            debug!(%channel, "unlistened");
        }
        let added: Vec<Channel> = desired.difference(&self.listened).copied().collect();
        for channel in added {
            self.source.listen(channel.name())?;
            self.listened.insert(channel);
            debug!(%channel, "listening");
        }
        Ok(())
    }

    /// Drains the source once and dispatches what arrived, channel by
    /// channel in [`Channel::ALL`] order.
    pub fn poll_once<W>(&mut self, model: &mut W) -> Result<PollReport, NotifyError>
    where
        W: ModelResolver + DataLoader + Informer + ?Sized,
    {
        if !self.source.is_valid() {
            self.reconnect()?;
        }
        let own_pid = self.source.backend_pid();
        let notifications = self.source.poll()?;

        let mut report = PollReport {
            received: notifications.len(),
            ..PollReport::default()
        };
        let mut batches: BTreeMap<Channel, Vec<String>> = BTreeMap::new();
        for notification in notifications {
            if notification.pid == own_pid {
                report.own += 1;
                continue;
            }
            match Channel::from_name(&notification.channel) {
                Some(channel) => batches.entry(channel).or_default().push(notification.payload),
                None => warn!("notification on unknown channel '{}'", notification.channel),
            }
        }

        for (channel, lines) in batches {
            let batch = self.dispatcher.dispatch_batch(channel, &lines, model);
            report.events.extend(batch.events);
            report.failures.extend(batch.failures);
            if let Some(err) = batch.aborted {
                error!(%channel, "notification batch aborted: {}", err);
                report.failures.push((channel.name().to_string(), err));
            }
        }
        Ok(report)
    }

    fn reconnect(&mut self) -> Result<(), NotifyError> {
        info!("notification connection lost, reconnecting");
        self.source.reconnect()?;
        for channel in &self.listened {
            self.source.listen(channel.name())?;
        }
        Ok(())
    }
}

/// Commands accepted by [`provider_task`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCommand {
    SetChannels(BTreeSet<Channel>),
    Shutdown,
}

/// Async task polling `provider` every `poll_interval` until shut down.
///
/// Each poll holds the model lock and runs on the blocking pool, since
/// loaders and informers may block. Applied events are forwarded on
/// `evt_tx`; the task stops once nobody receives them. Returns the
/// provider so the caller can close its source.
pub async fn provider_task<S, W>(
    mut provider: NotificationProvider<S>,
    model: Arc<TokioMutex<W>>,
    poll_interval: Duration,
    mut cmd_rx: mpsc::Receiver<ProviderCommand>,
    evt_tx: mpsc::UnboundedSender<Event>,
) -> NotificationProvider<S>
where
    S: NotificationSource + Send + 'static,
    W: ModelResolver + DataLoader + Informer + Send + 'static,
{
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(ProviderCommand::SetChannels(channels)) => {
                    if let Err(e) = provider.sync_channels(&channels) {
                        warn!("could not update listened channels: {}", e);
                    }
                }
                Some(ProviderCommand::Shutdown) | None => break,
            },
            _ = ticker.tick() => {
                let guard = Arc::clone(&model).lock_owned().await;
                let polled = tokio::task::spawn_blocking(move || {
                    let mut model = guard;
                    let result = provider.poll_once(&mut *model);
                    (provider, result)
                })
                .await;
                let result = match polled {
                    Ok((returned, result)) => {
                        provider = returned;
                        result
                    }
                    Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                    Err(e) => {
                        // Only a runtime shutting down cancels the poll, and
                        // it drops this task as well.
                        error!("notification poll cancelled: {}", e);
                        return std::future::pending().await;
                    }
                };
                match result {
                    Ok(report) => {
                        if forward(&evt_tx, report.events).is_err() {
                            warn!("event receiver dropped, stopping notification polling");
                            break;
                        }
                    }
                    Err(e) => warn!("notification poll failed: {}", e),
                }
            }
        }
    }
    provider
}

fn forward(
    evt_tx: &mpsc::UnboundedSender<Event>,
    events: Vec<Event>,
) -> Result<(), mpsc::error::SendError<Event>> {
    for event in events {
        evt_tx.send(event)?;
    }
    Ok(())
}

// ── tests ───────────────────────────────────────────────────────────
