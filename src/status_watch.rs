use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rocket::{
    fairing::{Fairing, Info, Kind},
    tokio::{
        self,
        sync::{Mutex, Notify},
        task::JoinHandle,
        time::{Duration, MissedTickBehavior},
    },
    Orbit, Rocket,
};

use crate::{
    clock::SharedClock,
    model::{resolve_status, Id, Poll, PollStatus, SharedLedger},
    Config,
};

/// Latest derived status of every poll.
pub type StatusMap = HashMap<Id, PollStatus>;

/// A change in a poll's derived status between two evaluations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub poll_id: Id,
    /// `None` the first time the poll is seen.
    pub from: Option<PollStatus>,
    pub to: PollStatus,
}

/// Re-derive every poll's status at `now` and report what changed since `previous`.
pub fn detect_transitions(
    previous: &StatusMap,
    polls: &[Poll],
    now: DateTime<Utc>,
) -> (StatusMap, Vec<Transition>) {
    let mut current = StatusMap::with_capacity(polls.len());
    let mut transitions = Vec::new();
    for poll in polls {
        let status = resolve_status(poll, now);
        let before = previous.get(&poll.id).copied();
        if before != Some(status) {
            transitions.push(Transition {
                poll_id: poll.id,
                from: before,
                to: status,
            });
        }
        current.insert(poll.id, status);
    }
    (current, transitions)
}

/// A background task that periodically re-derives poll statuses and logs transitions.
/// It reads the latest ledger state on every tick and holds no other state.
pub struct StatusWatch {
    task_handle: JoinHandle<()>,
    signal: Arc<Notify>,
    statuses: Arc<Mutex<StatusMap>>,
}

impl StatusWatch {
    /// Start watching. The first evaluation happens immediately.
    pub fn spawn(ledger: SharedLedger, clock: SharedClock, period: Duration) -> Self {
        let signal = Arc::new(Notify::new());
        let statuses = Arc::new(Mutex::new(StatusMap::new()));

        let task_signal = signal.clone();
        let task_statuses = statuses.clone();
        let period = period.max(Duration::from_millis(1));
        let task_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = task_signal.notified() => {}
                }
                let now = clock.now();
                let mut statuses = task_statuses.lock().await;
                let (current, transitions) = {
                    let ledger = ledger.lock().await;
                    detect_transitions(&statuses, ledger.polls(), now)
                };
                for Transition { poll_id, from, to } in transitions {
                    match from {
                        Some(from) => info!("Poll {poll_id} is now {to} (was {from})"),
                        None => debug!("Poll {poll_id} is {to}"),
                    }
                }
                *statuses = current;
            }
        });

        Self {
            task_handle,
            signal,
            statuses,
        }
    }

    /// Re-evaluate now instead of waiting for the next tick.
    pub fn trigger_now(&self) {
        self.signal.notify_one();
    }

    /// The statuses derived at the most recent evaluation.
    pub async fn statuses(&self) -> StatusMap {
        self.statuses.lock().await.clone()
    }

    /// Stop future evaluations. Returns true iff the task had already stopped on its own.
    pub async fn cancel(self) -> bool {
        self.task_handle.abort();
        self.task_handle.await.is_ok()
    }
}

/// A fairing that starts the status watch on liftoff and stops it on shutdown.
#[derive(Default)]
pub struct StatusWatchFairing {
    watch: Mutex<Option<StatusWatch>>,
}

#[rocket::async_trait]
impl Fairing for StatusWatchFairing {
    fn info(&self) -> Info {
        Info {
            name: "Status watch",
            kind: Kind::Liftoff | Kind::Shutdown,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let (Some(ledger), Some(clock), Some(config)) = (
            rocket.state::<SharedLedger>(),
            rocket.state::<SharedClock>(),
            rocket.state::<Config>(),
        ) else {
            warn!("Ledger, clock or config not managed; status watch disabled");
            return;
        };
        let watch = StatusWatch::spawn(ledger.clone(), clock.clone(), config.status_interval());
        *self.watch.lock().await = Some(watch);
        info!("Status watch running every {:?}", config.status_interval());
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        if let Some(watch) = self.watch.lock().await.take() {
            watch.cancel().await;
            info!("Status watch stopped");
        }
    }
}
