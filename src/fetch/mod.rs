//! Concurrent fetch pipeline.
//!
//! The fetcher is organized by role:
//! - [`queue`] - Shared pre-populated work queue with timed dequeue
//! - [`worker`] - Per-worker loop: dequeue, negotiate, GET, persist
//! - [`list`] - Newline-delimited resource list input
//!
//! [`SpnegoFetcher`] is the coordinator: it opens the credential context at
//! startup, spawns the worker pool, joins every worker, surfaces the first
//! per-item error only after all workers have finished, and guarantees the
//! credential context is released on every exit path.

pub mod list;
pub mod queue;
mod worker;

pub use list::read_file_list;
pub use queue::WorkQueue;

use std::sync::Arc;

use crate::auth::{CredentialContext, GssProvider, Negotiator};
use crate::config::Config;
use crate::error::{Error, Result};

use worker::Worker;

/// Summary of one completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchReport {
    /// Resources fetched and persisted
    pub fetched: usize,
    /// Blank entries in the input list that were skipped
    pub skipped_blank: usize,
    /// Number of workers that drained the queue
    pub workers: usize,
}

/// Coordinator for SPNEGO-authenticated concurrent fetching.
///
/// Construction performs the whole startup phase: configuration validation,
/// credential login, and output directory creation. Startup errors abort the
/// run before any worker is spawned.
#[derive(Debug)]
pub struct SpnegoFetcher {
    config: Arc<Config>,
    credentials: Arc<CredentialContext>,
    client: reqwest::Client,
}

impl SpnegoFetcher {
    /// Validate `config`, log in, and prepare the output directory
    pub async fn new(config: Config, provider: Arc<dyn GssProvider>) -> Result<Self> {
        config.validate()?;

        let credentials = Arc::new(CredentialContext::open(&config.login, provider)?);

        tokio::fs::create_dir_all(&config.fetch.output_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create output directory '{}': {}",
                        config.fetch.output_dir.display(),
                        e
                    ),
                ))
            })?;

        Ok(Self {
            config: Arc::new(config),
            credentials,
            client: reqwest::Client::new(),
        })
    }

    /// Fetch the resources listed in the configured file list
    pub async fn run_from_file(&self) -> Result<FetchReport> {
        let names = read_file_list(&self.config.fetch.file_list).await?;
        self.run(names).await
    }

    /// Fetch every non-blank resource in `names` with the worker pool.
    ///
    /// Workers race on the shared queue until it is drained; there is no
    /// cross-worker cancellation, so a failing worker never interrupts its
    /// siblings. The first per-item error is surfaced here after every worker
    /// has finished.
    pub async fn run(&self, names: Vec<String>) -> Result<FetchReport> {
        let (queue, skipped_blank) = WorkQueue::from_names(names);
        let queue = Arc::new(queue);
        let worker_count = self.config.fetch.workers;
        let base_url = self.config.target.base_url();

        tracing::info!(
            workers = worker_count,
            queued = queue.len().await,
            skipped_blank,
            base_url = %base_url,
            "starting worker pool"
        );

        let mut handles = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let worker = Worker {
                id,
                queue: Arc::clone(&queue),
                negotiator: Negotiator::new(&self.credentials),
                client: self.client.clone(),
                base_url: base_url.clone(),
                output_dir: self.config.fetch.output_dir.clone(),
                poll_timeout: self.config.fetch.poll_timeout,
                retry: self.config.retry.clone(),
            };
            handles.push(tokio::spawn(worker.run()));
        }

        let mut fetched = 0usize;
        let mut first_error: Option<Error> = None;
        for handle in handles {
            match handle.await {
                Ok(Ok(stats)) => fetched += stats.fetched,
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "worker failed");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                Err(join_err) => {
                    tracing::error!(error = %join_err, "worker panicked");
                    if first_error.is_none() {
                        first_error = Some(Error::Other(format!("worker panicked: {join_err}")));
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        tracing::info!(fetched, skipped_blank, "fetch run complete");
        Ok(FetchReport {
            fetched,
            skipped_blank,
            workers: worker_count,
        })
    }

    /// Release the credential context.
    ///
    /// Also happens automatically when the fetcher is dropped; calling it
    /// twice is safe.
    pub fn close(&self) {
        self.credentials.close();
    }
}
