//! Own the registered checks and drive their workers

use std::{mem, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    check::{Check, CheckState},
    checker::{Binding, Checker},
    worker::Worker,
};

/// Errors returned by the [`Monitor`] lifecycle
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unable to add new check, health check has already started")]
    Registration,

    #[error("health check has already been started")]
    AlreadyStarted,
}

/// Lifecycle of a [`Monitor`]
enum Lifecycle {
    Unstarted,
    Started {
        start_time: DateTime<Utc>,
        workers: Vec<Arc<Worker>>,
    },
    Stopped {
        start_time: DateTime<Utc>,
    },
}

impl Lifecycle {
    fn start_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Unstarted => None,
            Self::Started { start_time, .. } | Self::Stopped { start_time } => Some(*start_time),
        }
    }
}

struct Inner {
    /// Registered checks, in registration order
    bindings: Vec<Binding>,

    lifecycle: Lifecycle,
}

/// Runs every registered checker on its own jittered schedule
pub struct Monitor {
    /// Nominal interval between two executions of the same checker
    interval: Duration,

    /// How long a dependency may stay unhealthy before the service as a
    /// whole is considered unhealthy
    critical_error_timeout: Duration,

    inner: RwLock<Inner>,
}

impl Monitor {
    /// Create a monitor without any checks
    pub fn new(interval: Duration, critical_error_timeout: Duration) -> Self {
        Self {
            interval,
            critical_error_timeout,
            inner: RwLock::new(Inner {
                bindings: Vec::new(),
                lifecycle: Lifecycle::Unstarted,
            }),
        }
    }

    /// Create a monitor and register all given checkers
    pub fn with_checkers<I>(interval: Duration, critical_error_timeout: Duration, checkers: I) -> Self
    where
        I: IntoIterator,
        I::Item: Checker + 'static,
    {
        let mut monitor = Self::new(interval, critical_error_timeout);
        monitor
            .inner
            .get_mut()
            .bindings
            .extend(checkers.into_iter().map(Binding::new));
        monitor
    }

    /// Register a checker and return the state it will write.
    ///
    /// Names are not deduplicated.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Registration`] once the monitor has been started.
    pub async fn register_check(&self, checker: impl Checker + 'static) -> Result<CheckState, Error> {
        let mut inner = self.inner.write().await;
        if !matches!(inner.lifecycle, Lifecycle::Unstarted) {
            return Err(Error::Registration);
        }
        let binding = Binding::new(checker);
        let state = binding.state().clone();
        inner.bindings.push(binding);
        Ok(state)
    }

    /// Start one worker per registered check and return without waiting.
    ///
    /// Cancelling `ctx` stops all workers; [`Monitor::stop`] should still be
    /// called to wait for them.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::AlreadyStarted`] unless this is the first call.
    pub async fn start(&self, ctx: CancellationToken) -> Result<(), Error> {
        let mut inner = self.inner.write().await;
        if !matches!(inner.lifecycle, Lifecycle::Unstarted) {
            return Err(Error::AlreadyStarted);
        }

        let workers: Vec<_> = inner
            .bindings
            .iter()
            .map(|binding| Arc::new(Worker::new(self.interval, binding.clone())))
            .collect();
        let start_time = Utc::now();
        for worker in &workers {
            debug!("starting worker with interval {:?}", worker.interval());
            worker.start(ctx.clone());
        }
        info!("started {} health checks", workers.len());
        inner.lifecycle = Lifecycle::Started {
            start_time,
            workers,
        };
        Ok(())
    }

    /// Stop all workers in registration order, waiting for each to drain
    pub async fn stop(&self) {
        let workers = {
            let mut inner = self.inner.write().await;
            let Lifecycle::Started { start_time, .. } = inner.lifecycle else {
                debug!("health check is not running, nothing to stop");
                return;
            };
            match mem::replace(&mut inner.lifecycle, Lifecycle::Stopped { start_time }) {
                Lifecycle::Started { workers, .. } => workers,
                Lifecycle::Unstarted | Lifecycle::Stopped { .. } => Vec::new(),
            }
        };

        for worker in &workers {
            worker.stop().await;
        }
        info!("stopped {} health checks", workers.len());
    }

    /// Latest recorded checks in registration order, skipping checks that
    /// have not been made yet
    pub async fn checks(&self) -> Vec<Check> {
        let states: Vec<_> = self
            .inner
            .read()
            .await
            .bindings
            .iter()
            .map(|binding| binding.state().clone())
            .collect();

        let mut checks = Vec::with_capacity(states.len());
        for state in states {
            if let Some(check) = state.get().await {
                checks.push(check);
            }
        }
        checks
    }

    /// Number of registered checks
    pub async fn registered(&self) -> usize {
        self.inner.read().await.bindings.len()
    }

    /// Whether the monitor is currently running
    pub async fn is_started(&self) -> bool {
        matches!(self.inner.read().await.lifecycle, Lifecycle::Started { .. })
    }

    /// Time the monitor was started
    pub async fn start_time(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.lifecycle.start_time()
    }

    /// Time elapsed since the monitor was started
    pub async fn uptime(&self) -> Option<chrono::Duration> {
        self.start_time().await.map(|start| Utc::now() - start)
    }

    /// Nominal interval between two executions of the same checker
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Grace period before a failing dependency marks the service unhealthy
    pub fn critical_error_timeout(&self) -> Duration {
        self.critical_error_timeout
    }
}
