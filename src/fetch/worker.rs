//! Per-worker fetch loop.
//!
//! Each worker independently drains the shared queue: timed dequeue, fresh
//! authorization header, HTTP GET, persist. A worker owns its Negotiator (the
//! token field is per-worker mutable state) and shares only the queue, the
//! HTTP client, and the read-only credential context. A per-item error ends
//! this worker's loop; sibling workers keep draining the queue.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::auth::Negotiator;
use crate::config::RetryConfig;
use crate::error::{Error, IsRetryable, Result};
use crate::retry::delay_for_attempt;

use super::queue::WorkQueue;

/// Summary of one worker's run
#[derive(Debug, Clone, Copy)]
pub(crate) struct WorkerStats {
    /// Resources fetched and persisted by this worker
    pub(crate) fetched: usize,
}

pub(crate) struct Worker {
    pub(crate) id: usize,
    pub(crate) queue: Arc<WorkQueue>,
    pub(crate) negotiator: Negotiator,
    pub(crate) client: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) output_dir: PathBuf,
    pub(crate) poll_timeout: Duration,
    pub(crate) retry: RetryConfig,
}

impl Worker {
    /// Drain the queue until it is observed empty
    pub(crate) async fn run(mut self) -> Result<WorkerStats> {
        let mut fetched = 0usize;
        while let Some(name) = self.queue.dequeue(self.poll_timeout).await {
            // The queue filters blanks at population; this guard keeps the
            // exactly-once contract even if one slips through
            if name.trim().is_empty() {
                continue;
            }
            self.process(&name).await?;
            fetched += 1;
        }
        tracing::debug!(worker = self.id, fetched, "queue drained, worker exiting");
        Ok(WorkerStats { fetched })
    }

    async fn process(&mut self, name: &str) -> Result<()> {
        let body = self.fetch_with_retry(name).await?;
        let path = output_path(&self.output_dir, name)?;
        tokio::fs::write(&path, &body)
            .await
            .map_err(|e| Error::Persist {
                resource: name.to_string(),
                path: path.clone(),
                reason: e.to_string(),
            })?;
        tracing::info!(
            worker = self.id,
            resource = name,
            bytes = body.len(),
            "resource persisted"
        );
        Ok(())
    }

    /// Fetch one resource, renegotiating a fresh header per attempt and
    /// retrying only transient failures
    async fn fetch_with_retry(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut attempt = 1u32;
        loop {
            match self.fetch_once(name).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt < self.retry.max_attempts && e.is_retryable() => {
                    let delay = delay_for_attempt(&self.retry, attempt);
                    tracing::warn!(
                        worker = self.id,
                        resource = name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient fetch failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&mut self, name: &str) -> Result<Vec<u8>> {
        let url = Url::parse(&format!("{}/{}", self.base_url, name))?;

        // Authorization is recomputed fresh for every request; a target
        // host's negotiation may differ per request in a multi-host
        // deployment, so the header is never cached across calls
        let authorization = self.negotiator.authorization_header(&url)?;
        tracing::info!(
            worker = self.id,
            url = %url,
            header = %authorization,
            "authorization header issued"
        );

        let response = self
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch {
                resource: name.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Resolve the local path a resource is persisted under.
///
/// A resource name must stay inside the output directory: path separators,
/// parent-directory segments, and absolute paths are rejected.
pub(crate) fn output_path(output_dir: &Path, resource: &str) -> Result<PathBuf> {
    let escapes = resource.contains('/')
        || resource.contains('\\')
        || resource == ".."
        || resource.starts_with("..")
        || Path::new(resource).is_absolute();
    if escapes {
        return Err(Error::Persist {
            resource: resource.to_string(),
            path: output_dir.join(resource),
            reason: "resource name escapes the output directory".to_string(),
        });
    }
    Ok(output_dir.join(resource))
}
