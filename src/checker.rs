//! Checker functions and their bindings to check state

use std::{future::Future, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::check::CheckState;

/// A probe of one dependency.
///
/// A checker records the outcome of each probe in the given [`CheckState`]
/// and returns an error if the probe itself failed. It should stop early when
/// `ctx` is cancelled; the scheduler never interrupts it.
#[async_trait]
pub trait Checker
where
    Self: Send + Sync,
{
    async fn check(&self, ctx: CancellationToken, state: CheckState) -> Result<()>;
}

#[async_trait]
impl<F, Fut> Checker for F
where
    F: Fn(CancellationToken, CheckState) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn check(&self, ctx: CancellationToken, state: CheckState) -> Result<()> {
        self(ctx, state).await
    }
}

/// A checker together with the state it owns
#[derive(Clone)]
pub struct Binding {
    /// The probe function
    checker: Arc<dyn Checker>,

    /// Latest outcome of the probe
    state: CheckState,
}

impl Binding {
    /// Bind a checker to a fresh, empty state
    pub fn new(checker: impl Checker + 'static) -> Self {
        Self {
            checker: Arc::new(checker),
            state: CheckState::new(),
        }
    }

    /// State written by the checker
    pub fn state(&self) -> &CheckState {
        &self.state
    }

    /// Run the checker once
    pub async fn run(&self, ctx: CancellationToken) -> Result<()> {
        self.checker.check(ctx, self.state.clone()).await
    }
}
