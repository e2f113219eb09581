use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::Notify;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::aggregate::ActionsAggregate;
use crate::catalog::{self, Task};
use crate::config::CollectorConfig;
use crate::ledger::ProgressLedger;
use crate::traits::{ConsoleAuthenticator, ResourceFetcher};

/// The final aggregate: the catalog exactly as fetched plus the merged
/// per-service detail documents.
#[derive(Debug, Serialize)]
pub struct CollectionReport {
    pub services: Value,
    pub actions: Map<String, Value>,
}

/// Run totals, logged once the aggregate is emitted.
#[derive(Debug, Clone, Copy)]
pub struct CollectionStats {
    pub tasks: usize,
    pub complete: usize,
    pub errored: usize,
}

impl fmt::Display for CollectionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tasks: {} complete, {} errored",
            self.tasks, self.complete, self.errored
        )
    }
}

/// Authenticate, then collect. Authentication and catalog failures are
/// fatal; per-task failures are absorbed into the report.
pub async fn run_collection<A: ConsoleAuthenticator>(
    console: A,
    signin_token: &str,
    config: CollectorConfig,
) -> Result<CollectionReport> {
    let session = console
        .authenticate(signin_token)
        .await
        .context("console sign-in failed")?;
    Collector::new(session, config).run().await
}

/// The fan-out collection engine: enumerate the catalog once, dispatch one
/// detail fetch per entry, track completion in the ledger, and emit the
/// aggregate exactly once when every task is terminal.
pub struct Collector<F: ResourceFetcher + 'static> {
    fetcher: Arc<F>,
    config: CollectorConfig,
    ledger: Arc<ProgressLedger>,
    aggregate: Arc<ActionsAggregate>,
    completions: Arc<Notify>,
}

impl<F: ResourceFetcher + 'static> Collector<F> {
    pub fn new(fetcher: F, config: CollectorConfig) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            config,
            ledger: Arc::new(ProgressLedger::new()),
            aggregate: Arc::new(ActionsAggregate::new()),
            completions: Arc::new(Notify::new()),
        }
    }

    pub async fn run(&self) -> Result<CollectionReport> {
        info!("asking for services");
        let services = self
            .fetcher
            .fetch_json(&self.config.catalog_url)
            .await
            .context("service catalog fetch failed")?;

        let tasks = catalog::tasks_from_catalog(&services);
        info!(count = tasks.len(), "service catalog enumerated");

        // Register everything before dispatching anything, so the completion
        // wait can never observe a ledger that looks terminal only because
        // it is still filling.
        for task in &tasks {
            self.ledger.register(&task.actions_url);
        }
        for task in tasks {
            self.dispatch(task);
        }

        self.wait_all_terminal().await;

        let (complete, errored) = self.ledger.counts();
        let stats = CollectionStats {
            tasks: self.ledger.len(),
            complete,
            errored,
        };
        info!(%stats, "collection complete");

        Ok(CollectionReport {
            services,
            actions: self.aggregate.snapshot(),
        })
    }

    /// Fire-and-forget one detail fetch. The spawned task owns the terminal
    /// transition for its ledger key.
    fn dispatch(&self, task: Task) {
        let fetcher = Arc::clone(&self.fetcher);
        let ledger = Arc::clone(&self.ledger);
        let aggregate = Arc::clone(&self.aggregate);
        let completions = Arc::clone(&self.completions);
        let task_timeout = self.config.task_timeout;

        tokio::spawn(async move {
            debug!(url = task.actions_url.as_str(), "asking for actions");
            let outcome = match task_timeout {
                Some(limit) => match timeout(limit, fetcher.fetch_json(&task.actions_url)).await {
                    Ok(result) => result,
                    Err(_) => Err(anyhow::anyhow!(
                        "fetch timed out after {}s",
                        limit.as_secs()
                    )),
                },
                None => fetcher.fetch_json(&task.actions_url).await,
            };

            match outcome {
                Ok(data) => {
                    aggregate.record(&task.service_name, data);
                    ledger.complete(&task.actions_url);
                }
                Err(e) => {
                    warn!(url = task.actions_url.as_str(), error = %e, "actions fetch failed");
                    ledger.error(&task.actions_url);
                }
            }
            completions.notify_one();
        });
    }

    /// Completion wait: a latch signaled by every task's terminal transition,
    /// with the fixed poll period as a fallback rescan. Returns once no task
    /// is NOT_STARTED — both completed and errored tasks count as terminal.
    async fn wait_all_terminal(&self) {
        loop {
            let pending = self.ledger.pending();
            if pending.is_empty() {
                return;
            }
            for url in &pending {
                debug!(url = url.as_str(), "task not yet complete");
            }
            tokio::select! {
                _ = self.completions.notified() => {}
                _ = tokio::time::sleep(self.config.poll_period) => {}
            }
        }
    }
}
