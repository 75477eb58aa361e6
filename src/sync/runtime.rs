//! Async driver that runs one [`Controller`] per mounted view.
//!
//! Each view is a spawned task owning its controller, timer, and at most one
//! outstanding fetch. Fetches run as their own tasks and report back over an
//! mpsc channel tagged with their ticket. Snapshots are published through a
//! `watch` channel after every state mutation.
//!
//! Dropping the [`ViewHandle`] aborts the view task, which drops the timer and
//! aborts the outstanding fetch. Nothing is published after that point.

#![allow(missing_docs)]

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use super::controller::Controller;
use super::model::{FetchState, SyncCmd, SyncMsg, SyncNote};
use crate::core::config::FailurePolicy;
use crate::gateway::{DashboardApi, GatewayResult};
use crate::logger::jsonl::{EventType, LogEntry, Severity, SharedLog, record};
use crate::query::QueryState;

// ──────────────────── view contract ────────────────────

/// One kind of polled data: how to load it and what to show on failure.
#[async_trait]
pub trait ViewSource: Send + Sync + 'static {
    type Params: Clone + PartialEq + Debug + Send + Sync + 'static;
    type Data: Clone + Send + Sync + 'static;

    /// Short stable name used in logs (`dashboard`, `events`, ...).
    fn name(&self) -> &'static str;

    async fn load(&self, api: &dyn DashboardApi, params: &Self::Params)
    -> GatewayResult<Self::Data>;

    /// Placeholder shown under [`FailurePolicy::Fallback`].
    fn fallback(&self) -> Option<Self::Data> {
        None
    }

    /// Combine the previously applied payload with a fresh one.
    fn merge(_previous: Option<&Self::Data>, incoming: Self::Data) -> Self::Data {
        incoming
    }
}

/// A view whose parameters are derived from the shared [`QueryState`].
pub trait QueryDriven: ViewSource {
    fn params_for(&self, query: &QueryState) -> Self::Params;
}

/// Per-mount settings.
#[derive(Clone)]
pub struct MountOptions {
    pub interval: Duration,
    pub policy: FailurePolicy,
    pub log: Option<SharedLog>,
}

impl MountOptions {
    #[must_use]
    pub fn new(interval: Duration, policy: FailurePolicy) -> Self {
        Self {
            interval,
            policy,
            log: None,
        }
    }

    #[must_use]
    pub fn with_log(mut self, log: Option<SharedLog>) -> Self {
        self.log = log;
        self
    }
}

// ──────────────────── handle ────────────────────

enum Control<P> {
    Refresh,
    Revalidate,
    SetParams(P),
}

/// Aborts the wrapped task when dropped.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Owner-side handle of a mounted view. Dropping it unmounts the view.
pub struct ViewHandle<P, T> {
    name: &'static str,
    control: mpsc::UnboundedSender<Control<P>>,
    state: watch::Receiver<FetchState<T>>,
    log: Option<SharedLog>,
    _task: AbortOnDrop,
}

impl<P, T: Clone> ViewHandle<P, T> {
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Visible refetch (`Refreshing`, or `Loading` if nothing has loaded).
    pub fn refresh(&self) {
        let _ = self.control.send(Control::Refresh);
    }

    /// Silent refetch, e.g. after a mutation.
    pub fn revalidate(&self) {
        let _ = self.control.send(Control::Revalidate);
    }

    /// Switch parameters; the timer restarts against the new ones.
    pub fn set_params(&self, params: P) {
        let _ = self.control.send(Control::SetParams(params));
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> FetchState<T> {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.state.clone()
    }

    /// Wait for the next published snapshot. `None` once the view is gone.
    pub async fn changed(&mut self) -> Option<FetchState<T>> {
        self.state.changed().await.ok()?;
        Some(self.state.borrow_and_update().clone())
    }

    /// Tear the view down. Equivalent to dropping the handle.
    pub fn unmount(self) {}
}

impl<P, T> Drop for ViewHandle<P, T> {
    fn drop(&mut self) {
        record(
            self.log.as_ref(),
            &LogEntry::new(EventType::ViewUnmounted, Severity::Info).view(self.name),
        );
    }
}

// ──────────────────── mounting ────────────────────

/// Mount a view with fixed initial parameters.
///
/// # Panics
/// Must be called from within a tokio runtime.
pub fn mount<V: ViewSource>(
    view: V,
    api: Arc<dyn DashboardApi>,
    params: V::Params,
    options: MountOptions,
) -> ViewHandle<V::Params, V::Data> {
    spawn(Arc::new(view), api, params, None, options)
}

/// Mount a view that follows a [`QueryState`] channel. Every observed change
/// is mapped to parameters; unchanged parameters do not refetch.
///
/// # Panics
/// Must be called from within a tokio runtime.
pub fn mount_with_query<V: QueryDriven>(
    view: V,
    api: Arc<dyn DashboardApi>,
    mut query: watch::Receiver<QueryState>,
    options: MountOptions,
) -> ViewHandle<V::Params, V::Data> {
    let view = Arc::new(view);
    let params = view.params_for(&query.borrow_and_update());
    let mapper = Arc::clone(&view);
    let feed = QueryFeed {
        rx: query,
        map: Box::new(move |q: &QueryState| mapper.params_for(q)),
    };
    spawn(view, api, params, Some(feed), options)
}

struct QueryFeed<P> {
    rx: watch::Receiver<QueryState>,
    map: Box<dyn Fn(&QueryState) -> P + Send + Sync>,
}

struct Completion<T> {
    ticket: u64,
    result: GatewayResult<T>,
    elapsed: Duration,
}

fn spawn<V: ViewSource>(
    view: Arc<V>,
    api: Arc<dyn DashboardApi>,
    params: V::Params,
    feed: Option<QueryFeed<V::Params>>,
    options: MountOptions,
) -> ViewHandle<V::Params, V::Data> {
    let name = view.name();
    let controller = Controller::new(options.interval, options.policy)
        .with_fallback(view.fallback())
        .with_merge(V::merge);
    let (publish, state) = watch::channel(FetchState::default());
    let (control_tx, control_rx) = mpsc::unbounded_channel();
    let (done_tx, done_rx) = mpsc::unbounded_channel();

    record(
        options.log.as_ref(),
        &LogEntry::new(EventType::ViewMounted, Severity::Info)
            .view(name)
            .details(format!("{params:?}")),
    );

    let driver = Driver {
        view,
        api,
        controller,
        publish,
        done_tx,
        timer: None,
        fetch: None,
        elapsed: None,
        log: options.log.clone(),
    };
    let task = tokio::spawn(driver.run(params, control_rx, done_rx, feed));

    ViewHandle {
        name,
        control: control_tx,
        state,
        log: options.log,
        _task: AbortOnDrop(task),
    }
}

// ──────────────────── driver ────────────────────

struct Driver<V: ViewSource> {
    view: Arc<V>,
    api: Arc<dyn DashboardApi>,
    controller: Controller<V::Params, V::Data>,
    publish: watch::Sender<FetchState<V::Data>>,
    done_tx: mpsc::UnboundedSender<Completion<V::Data>>,
    timer: Option<Interval>,
    fetch: Option<AbortOnDrop>,
    elapsed: Option<Duration>,
    log: Option<SharedLog>,
}

impl<V: ViewSource> Driver<V> {
    async fn run(
        mut self,
        params: V::Params,
        mut control: mpsc::UnboundedReceiver<Control<V::Params>>,
        mut done: mpsc::UnboundedReceiver<Completion<V::Data>>,
        mut feed: Option<QueryFeed<V::Params>>,
    ) {
        self.dispatch(SyncMsg::Mount(params));
        loop {
            let msg = tokio::select! {
                ctl = control.recv() => match ctl {
                    Some(Control::Refresh) => SyncMsg::ManualRefresh,
                    Some(Control::Revalidate) => SyncMsg::Revalidate,
                    Some(Control::SetParams(p)) => SyncMsg::ParamsChanged(p),
                    None => SyncMsg::Unmount,
                },
                Some(completion) = done.recv() => {
                    self.elapsed = Some(completion.elapsed);
                    SyncMsg::FetchCompleted {
                        ticket: completion.ticket,
                        result: completion.result,
                        at: Utc::now(),
                    }
                }
                () = next_tick(&mut self.timer) => SyncMsg::Tick,
                next = next_params(&mut feed) => match next {
                    Some(p) => SyncMsg::ParamsChanged(p),
                    None => {
                        feed = None;
                        continue;
                    }
                },
            };
            let unmounting = matches!(msg, SyncMsg::Unmount);
            self.dispatch(msg);
            if unmounting {
                break;
            }
        }
    }

    fn dispatch(&mut self, msg: SyncMsg<V::Params, V::Data>) {
        let before = self.controller.revision();
        let cmd = self.controller.update(msg);
        for cmd in cmd.into_vec() {
            self.execute(cmd);
        }
        if self.controller.revision() != before {
            self.publish.send_replace(self.controller.state().clone());
        }
    }

    fn execute(&mut self, cmd: SyncCmd<V::Params>) {
        match cmd {
            SyncCmd::Fetch { ticket, params } => {
                let view = Arc::clone(&self.view);
                let api = Arc::clone(&self.api);
                let tx = self.done_tx.clone();
                let task = tokio::spawn(async move {
                    let started = Instant::now();
                    let result = view.load(api.as_ref(), &params).await;
                    let _ = tx.send(Completion {
                        ticket,
                        result,
                        elapsed: started.elapsed(),
                    });
                });
                // Replacing the previous fetch aborts it.
                self.fetch = Some(AbortOnDrop(task));
            }
            SyncCmd::ArmTimer(period) => {
                let mut timer = tokio::time::interval_at(Instant::now() + period, period);
                timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.timer = Some(timer);
                let entry = LogEntry::new(EventType::TimerArmed, Severity::Info);
                self.log(entry.duration(period));
            }
            SyncCmd::CancelTimer => self.timer = None,
            SyncCmd::CancelFetch => self.fetch = None,
            SyncCmd::Note(note) => self.note(note),
            SyncCmd::None | SyncCmd::Batch(_) => {}
        }
    }

    fn note(&mut self, note: SyncNote) {
        let entry = match note {
            SyncNote::Issued { ticket, trigger } => {
                LogEntry::new(EventType::FetchIssued, Severity::Info)
                    .ticket(ticket)
                    .trigger(trigger.as_str())
            }
            SyncNote::Applied { ticket, trigger } => {
                let mut entry = LogEntry::new(EventType::FetchApplied, Severity::Info)
                    .ticket(ticket)
                    .trigger(trigger.as_str())
                    .outcome(true);
                if let Some(elapsed) = self.elapsed.take() {
                    entry = entry.duration(elapsed);
                }
                entry
            }
            SyncNote::Failed {
                ticket,
                trigger,
                error,
                surfaced,
            } => {
                let severity = if surfaced {
                    Severity::Error
                } else {
                    Severity::Warning
                };
                let mut entry = LogEntry::new(EventType::FetchFailed, severity)
                    .ticket(ticket)
                    .trigger(trigger.as_str())
                    .error(error.code(), error.message());
                if let Some(elapsed) = self.elapsed.take() {
                    entry = entry.duration(elapsed);
                }
                entry
            }
            SyncNote::Discarded { ticket } => {
                self.elapsed = None;
                LogEntry::new(EventType::StaleDiscarded, Severity::Info).ticket(ticket)
            }
        };
        self.log(entry);
    }

    fn log(&self, entry: LogEntry) {
        record(self.log.as_ref(), &entry.view(self.view.name()));
    }
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Next parameters from the query feed; `None` once its sender is gone.
async fn next_params<P>(feed: &mut Option<QueryFeed<P>>) -> Option<P> {
    let Some(feed) = feed else {
        return std::future::pending().await;
    };
    feed.rx.changed().await.ok()?;
    Some((feed.map)(&feed.rx.borrow_and_update()))
}
