//! Runs the retrieval strategies for a domain side by side and merges what
//! they find into one deduplicated stream.

use std::{collections::HashSet, io, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    archive::{ArchiveClient, ArchivedUrl},
    config::Config,
    error::{Error, Result},
    subdomain::is_subdomain,
};

// Producers wait for the consumer after every record.
const MERGE_CHANNEL_CAPACITY: usize = 1;

/// One way of asking the archive for the URLs under a domain.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(
        &self,
        domain: &str,
        exclude_subdomains: bool,
        days_back: u32,
    ) -> Result<Vec<ArchivedUrl>>;
}

/// Only URLs captured in the last `days_back` days.
#[derive(Clone, Debug)]
pub struct TimeBounded {
    client: ArchiveClient,
}

impl TimeBounded {
    pub fn new(client: ArchiveClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Strategy for TimeBounded {
    fn name(&self) -> &'static str {
        "time-bounded"
    }

    async fn fetch(
        &self,
        domain: &str,
        exclude_subdomains: bool,
        days_back: u32,
    ) -> Result<Vec<ArchivedUrl>> {
        self.client.fetch(domain, exclude_subdomains, days_back).await
    }
}

/// Every URL the archive has ever seen for the domain.
#[derive(Clone, Debug)]
pub struct Unbounded {
    client: ArchiveClient,
}

impl Unbounded {
    pub fn new(client: ArchiveClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Strategy for Unbounded {
    fn name(&self) -> &'static str {
        "unbounded"
    }

    async fn fetch(
        &self,
        domain: &str,
        exclude_subdomains: bool,
        _days_back: u32,
    ) -> Result<Vec<ArchivedUrl>> {
        self.client.fetch(domain, exclude_subdomains, 0).await
    }
}

/// Picks the strategies to run: the time-bounded one when a window is set,
/// otherwise the unbounded one.
#[must_use]
pub fn select_strategies(client: &ArchiveClient, days_back: u32) -> Vec<Arc<dyn Strategy>> {
    let strategy: Arc<dyn Strategy> = if days_back > 0 {
        Arc::new(TimeBounded::new(client.clone()))
    } else {
        Arc::new(Unbounded::new(client.clone()))
    };
    vec![strategy]
}

#[derive(Debug)]
pub struct StrategyFailure {
    pub strategy: &'static str,
    pub error: Error,
}

/// What happened while processing one domain.
#[derive(Debug, Default)]
pub struct DomainSummary {
    pub strategies_run: usize,
    /// Distinct URLs handed to the caller.
    pub emitted: usize,
    /// Records dropped because their URL had already been emitted.
    pub duplicates: usize,
    pub failures: Vec<StrategyFailure>,
}

impl DomainSummary {
    /// True when every strategy failed, so an empty result says nothing
    /// about the domain.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        self.strategies_run > 0 && self.failures.len() == self.strategies_run
    }
}

pub struct Orchestrator {
    strategies: Vec<Arc<dyn Strategy>>,
    exclude_subdomains: bool,
    days_back: u32,
    task_timeout: Option<Duration>,
}

impl Orchestrator {
    pub fn new(config: &Config, strategies: Vec<Arc<dyn Strategy>>) -> Self {
        Self {
            strategies,
            exclude_subdomains: config.exclude_subdomains,
            days_back: config.days_back,
            task_timeout: config.task_timeout,
        }
    }

    /// Uses the built-in strategies selected by `config.days_back`.
    pub fn from_config(config: &Config, client: &ArchiveClient) -> Self {
        Self::new(config, select_strategies(client, config.days_back))
    }

    /// Runs every strategy for `domain` concurrently and calls `emit` once
    /// for each distinct URL, as soon as it arrives.
    ///
    /// A failing strategy contributes nothing and is reported in the
    /// returned summary; it never stops the other strategies.
    ///
    /// # Errors
    ///
    /// Only an error returned by `emit` is propagated. The remaining fetch
    /// tasks are aborted in that case.
    pub async fn fetch_domain<F>(&self, domain: &str, mut emit: F) -> Result<DomainSummary>
    where
        F: FnMut(&ArchivedUrl) -> io::Result<()>,
    {
        let (tx, mut rx) = mpsc::channel(MERGE_CHANNEL_CAPACITY);
        let tasks: Vec<(&'static str, JoinHandle<Result<()>>)> = self
            .strategies
            .iter()
            .map(|strategy| {
                let name = strategy.name();
                let task = tokio::spawn(run_strategy(
                    Arc::clone(strategy),
                    domain.to_owned(),
                    self.exclude_subdomains,
                    self.days_back,
                    self.task_timeout,
                    tx.clone(),
                ));
                (name, task)
            })
            .collect();
        // The channel closes once the last task drops its sender.
        drop(tx);

        let mut summary = DomainSummary {
            strategies_run: tasks.len(),
            ..DomainSummary::default()
        };
        let mut seen: HashSet<String> = HashSet::new();
        while let Some(record) = rx.recv().await {
            if seen.contains(record.url()) {
                summary.duplicates += 1;
                continue;
            }
            if let Err(e) = emit(&record) {
                for (_, task) in &tasks {
                    task.abort();
                }
                return Err(e.into());
            }
            summary.emitted += 1;
            seen.insert(record.into_url());
        }

        for (strategy, task) in tasks {
            if let Err(error) = task.await.map_err(Error::from).and_then(|res| res) {
                log::debug!("{} strategy failed for {}: {}", strategy, domain, error);
                summary.failures.push(StrategyFailure { strategy, error });
            }
        }

        Ok(summary)
    }
}

async fn run_strategy(
    strategy: Arc<dyn Strategy>,
    domain: String,
    exclude_subdomains: bool,
    days_back: u32,
    task_timeout: Option<Duration>,
    tx: mpsc::Sender<ArchivedUrl>,
) -> Result<()> {
    let fetch = strategy.fetch(&domain, exclude_subdomains, days_back);
    let records = match task_timeout {
        Some(limit) => tokio::time::timeout(limit, fetch)
            .await
            .map_err(|_| Error::Timeout(limit))??,
        None => fetch.await?,
    };

    for record in records {
        if exclude_subdomains && is_subdomain(record.url(), &domain) {
            log::trace!("dropping subdomain url {}", record.url());
            continue;
        }
        if tx.send(record).await.is_err() {
            // Receiver is gone; nobody wants the rest.
            break;
        }
    }
    Ok(())
}
