//! Run one checker on a jittered periodic schedule

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use rand::Rng;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error, warn};

use crate::{check::CheckState, checker::Binding};

/// Name reported for failing checkers that never recorded a check
pub const NO_CHECK_NAME: &str = "no check has been made yet";

/// Maximum jitter as a fraction of the nominal interval (1/20 = 5%)
const JITTER_DIVISOR: u32 = 20;

/// Shortest interval a worker will fire at
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Longest nominal interval, larger values are clamped to it
pub const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Perturb `interval` by a random amount of at most 5% in either direction.
///
/// `interval` is first clamped to [`MAX_INTERVAL`].
pub fn interval_with_jitter<R: Rng + ?Sized>(interval: Duration, rng: &mut R) -> Duration {
    let interval = interval.min(MAX_INTERVAL);
    let max_jitter = interval / JITTER_DIVISOR;
    let jitter = rng.gen_range(Duration::ZERO..=max_jitter * 2);
    (interval - max_jitter + jitter).max(MIN_INTERVAL)
}

/// Periodically runs one checker until stopped
pub struct Worker {
    /// Effective interval including jitter, fixed for the lifetime of the worker
    interval: Duration,

    /// Checker and the state it writes
    binding: Binding,

    /// Raised once to make the timer loop exit
    shutdown: CancellationToken,

    /// Raised after the timer loop exited and all executions finished
    closed: CancellationToken,

    /// In-flight checker executions
    tracker: TaskTracker,

    /// Whether the timer loop has been spawned
    started: AtomicBool,

    /// Whether a stop has been requested
    stopping: AtomicBool,
}

impl Worker {
    /// Create a worker firing at `interval` plus jitter
    pub fn new(interval: Duration, binding: Binding) -> Self {
        Self {
            interval: interval_with_jitter(interval, &mut rand::thread_rng()),
            binding,
            shutdown: CancellationToken::new(),
            closed: CancellationToken::new(),
            tracker: TaskTracker::new(),
            started: AtomicBool::new(false),
            stopping: AtomicBool::new(false),
        }
    }

    /// Effective interval between two executions
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// State written by the checker of this worker
    pub fn state(&self) -> &CheckState {
        self.binding.state()
    }

    /// Number of checker executions currently running
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Whether the worker has stopped and drained all executions
    pub fn is_stopped(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Spawn the timer loop and return immediately.
    ///
    /// The first execution happens one interval after this call. Cancelling
    /// `ctx` stops the worker just like [`Worker::stop`]; `ctx` is also handed
    /// to every checker execution.
    pub fn start(self: &Arc<Self>, ctx: CancellationToken) {
        if self.stopping.load(Ordering::SeqCst) {
            warn!("not starting a worker that has already been stopped");
            return;
        }
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("worker has already been started");
            return;
        }

        let worker = Arc::clone(self);
        tokio::spawn(async move { worker.run(ctx).await });
    }

    /// Stop the timer and wait until all in-flight executions have finished.
    ///
    /// Only the first call raises the stop signal. Later calls wait for the
    /// same drain, which has usually completed already.
    pub async fn stop(&self) {
        self.request_stop();
        if self.started.load(Ordering::SeqCst) {
            self.closed.cancelled().await;
        } else {
            self.tracker.close();
            self.closed.cancel();
        }
    }

    /// Raise the stop signal unless it has been raised before
    fn request_stop(&self) {
        if !self.stopping.swap(true, Ordering::SeqCst) {
            self.shutdown.cancel();
        }
    }

    /// Timer loop, spawned by [`Worker::start`]
    async fn run(&self, ctx: CancellationToken) {
        // raise `closed` even if the loop panics, so `stop` cannot hang
        let _closed = self.closed.clone().drop_guard();

        let now = Instant::now();
        let first_tick = now.checked_add(self.interval).unwrap_or(now);
        let mut ticker = interval_at(first_tick, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                () = ctx.cancelled(), if !self.shutdown.is_cancelled() => {
                    debug!("context cancelled, stopping worker");
                    self.request_stop();
                }
                () = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.tracker.spawn(execute(self.binding.clone(), ctx.clone()));
                }
            }
        }
        drop(ticker);

        self.tracker.close();
        self.tracker.wait().await;
        debug!("worker drained");
    }
}

/// Run the checker once and report a failure, if any
async fn execute(binding: Binding, ctx: CancellationToken) {
    if let Err(err) = binding.run(ctx).await {
        let name = binding
            .state()
            .name()
            .await
            .unwrap_or_else(|| NO_CHECK_NAME.to_owned());
        error!(external_service = %name, "failed: {err:#}");
    }
}
