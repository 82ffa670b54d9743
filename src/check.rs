//! Latest known health status of monitored dependencies

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

/// Health status of a single dependency, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// The dependency responded as expected
    Ok,

    /// The dependency works but is degraded
    Warning,

    /// The dependency is unusable
    Critical,
}

/// Details of a single checked dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Check {
    /// Stable identifier of the dependency
    pub name: String,

    /// Outcome of the latest check
    pub status: Status,

    /// Protocol level status code of the latest check, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// Human-readable description of the latest outcome
    pub message: String,

    /// Time of the latest check
    pub last_checked: Option<DateTime<Utc>>,

    /// Time of the latest check with status [`Status::Ok`]
    pub last_success: Option<DateTime<Utc>>,

    /// Time of the latest check with any other status
    pub last_failure: Option<DateTime<Utc>>,
}

impl Check {
    /// Create a check that has not been recorded yet
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: Status::Critical,
            status_code: None,
            message: String::new(),
            last_checked: None,
            last_success: None,
            last_failure: None,
        }
    }

    /// Record the outcome of one check made at `now`.
    ///
    /// `last_checked` never moves backwards, even if the clock does. Exactly
    /// one of `last_success` and `last_failure` is updated.
    pub fn record(
        &mut self,
        status: Status,
        message: impl Into<String>,
        status_code: Option<u16>,
        now: DateTime<Utc>,
    ) {
        let now = self.last_checked.map_or(now, |last| last.max(now));
        self.status = status;
        self.message = message.into();
        self.status_code = status_code;
        self.last_checked = Some(now);
        if status == Status::Ok {
            self.last_success = Some(now);
        } else {
            self.last_failure = Some(now);
        }
    }
}

/// Shared handle to the state of one check.
///
/// Writers are serialized, so overlapping executions of the same checker
/// never race on the record.
#[derive(Debug, Clone, Default)]
pub struct CheckState {
    check: Arc<RwLock<Option<Check>>>,
}

impl CheckState {
    /// Create an empty state, no check has been made yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy of the latest recorded check
    pub async fn get(&self) -> Option<Check> {
        self.check.read().await.clone()
    }

    /// Return the name of the latest recorded check
    pub async fn name(&self) -> Option<String> {
        self.check
            .read()
            .await
            .as_ref()
            .map(|check| check.name.clone())
    }

    /// Record the outcome of a check made now and return the updated record
    pub async fn update(
        &self,
        name: &str,
        status: Status,
        message: impl Into<String> + Send,
        status_code: Option<u16>,
    ) -> Check {
        let mut check = self.check.write().await;
        let check = check.get_or_insert_with(|| Check::new(name));
        if check.name != name {
            name.clone_into(&mut check.name);
        }
        check.record(status, message, status_code, Utc::now());
        check.clone()
    }
}
