//! Checker for HTTP endpoints

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    check::{CheckState, Status},
    checker::Checker,
};

/// Probes an HTTP endpoint with a GET request
pub struct HttpChecker {
    /// Name under which the check is recorded
    name: String,

    /// Endpoint to probe
    url: Url,

    client: Client,
}

impl HttpChecker {
    /// Create a checker for `url`, giving up on requests after `timeout`
    ///
    /// # Errors
    ///
    /// Fails if `url` cannot be parsed or the HTTP client cannot be built.
    pub fn new(name: impl Into<String>, url: &str, timeout: Duration) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("invalid url {url}"))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            name: name.into(),
            url,
            client,
        })
    }
}

#[async_trait]
impl Checker for HttpChecker {
    async fn check(&self, ctx: CancellationToken, state: CheckState) -> Result<()> {
        debug!("checking {}", self.url);
        let response = tokio::select! {
            biased;

            () = ctx.cancelled() => {
                state
                    .update(&self.name, Status::Critical, "check cancelled", None)
                    .await;
                bail!("check of {} cancelled", self.url);
            }
            response = self.client.get(self.url.clone()).send() => response,
        };

        match response {
            Ok(response) => {
                let code = response.status();
                state
                    .update(&self.name, status_for(code), message_for(code), Some(code.as_u16()))
                    .await;
                Ok(())
            }
            Err(err) => {
                state
                    .update(
                        &self.name,
                        Status::Critical,
                        err.to_string(),
                        err.status().map(|code| code.as_u16()),
                    )
                    .await;
                Err(err).with_context(|| format!("request to {} failed", self.url))
            }
        }
    }
}

/// Map a response status code to a check status
fn status_for(code: StatusCode) -> Status {
    if code.is_success() {
        Status::Ok
    } else if code == StatusCode::TOO_MANY_REQUESTS {
        Status::Warning
    } else {
        Status::Critical
    }
}

fn message_for(code: StatusCode) -> String {
    if code.is_success() {
        "endpoint is ok".to_owned()
    } else {
        format!("endpoint returned {code}")
    }
}
