//! # Concurrency Scheduler Module
//!
//! Esegue i work item con al massimo `limit` file in elaborazione nello stesso
//! momento. Il permesso del semaforo viene acquisito PRIMA dello spawn, quindi
//! non esiste mai un task per file lanciato senza limite.
//!
//! ## Stati per item:
//! `Queued → Admitted → Running → {Completed, Failed}`
//!
//! ## Garanzie:
//! - Nessun fail-fast: ogni item produce un outcome
//! - Un task andato in panic diventa un outcome `Failed` per il suo item
//! - Cancellazione cooperativa controllata tra un'ammissione e l'altra
//! - Il batch termina solo quando tutti gli item sono in stato terminale

use crate::{
    error::ErrorKind,
    optimizer::{path_resolver::WorkItem, task_optimizer::ProcessingOutcome},
};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Semaphore};
use tracing::{debug, warn};

/// Contatori condivisi tra scheduler e task
#[derive(Debug, Default)]
struct Counters {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Decrementa `in_flight` anche se il task va in panic
struct RunningGuard(Arc<Counters>);

impl RunningGuard {
    fn enter(counters: Arc<Counters>) -> Self {
        let now = counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        counters.peak.fetch_max(now, Ordering::SeqCst);
        Self(counters)
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Bounded worker pool for work items
pub struct ConcurrencyScheduler {
    limit: usize,
    counters: Arc<Counters>,
    stop_receiver: Option<broadcast::Receiver<()>>,
}

impl ConcurrencyScheduler {
    /// `limit` is clamped to at least one slot
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            counters: Arc::new(Counters::default()),
            stop_receiver: None,
        }
    }

    /// Stop admitting new items once a message arrives on `stop_receiver`
    pub fn with_cancellation(mut self, stop_receiver: broadcast::Receiver<()>) -> Self {
        self.stop_receiver = Some(stop_receiver);
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Items currently running
    pub fn in_flight(&self) -> usize {
        self.counters.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of items observed running at once
    pub fn peak_in_flight(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    pub fn create_cancellation_channel() -> (broadcast::Sender<()>, broadcast::Receiver<()>) {
        broadcast::channel(1)
    }

    fn should_stop(&mut self) -> bool {
        match self.stop_receiver {
            Some(ref mut receiver) => match receiver.try_recv() {
                Ok(()) | Err(broadcast::error::TryRecvError::Lagged(_)) => true,
                Err(broadcast::error::TryRecvError::Empty)
                | Err(broadcast::error::TryRecvError::Closed) => false,
            },
            None => false,
        }
    }

    /// Run `process` over every item, at most `limit` at a time.
    ///
    /// Outcomes are returned in input order.
    pub async fn run<F, Fut>(&mut self, items: Vec<WorkItem>, process: F) -> Vec<ProcessingOutcome>
    where
        F: Fn(WorkItem) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ProcessingOutcome> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.limit));
        let process = Arc::new(process);
        let mut tasks = Vec::with_capacity(items.len());
        let mut cancelled = Vec::new();
        let mut stopped = false;

        for item in items {
            if !stopped && self.should_stop() {
                warn!("Batch cancelled, no further files will be admitted");
                stopped = true;
            }
            if stopped {
                cancelled.push(item);
                continue;
            }

            // Admitted: attende uno slot libero
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    // il semaforo non viene mai chiuso
                    cancelled.push(item);
                    continue;
                }
            };

            let process = process.clone();
            let counters = self.counters.clone();
            let task_item = item.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let _running = RunningGuard::enter(counters);
                process(task_item).await
            });

            tasks.push((item, handle));
        }

        let (items, handles): (Vec<WorkItem>, Vec<_>) = tasks.into_iter().unzip();
        let results = futures::future::join_all(handles).await;

        let mut outcomes: Vec<ProcessingOutcome> = items
            .into_iter()
            .zip(results)
            .map(|(item, result)| match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Worker for {} did not finish: {}", item.source.display(), e);
                    ProcessingOutcome::failed(item, ErrorKind::Internal, format!("worker task failed: {}", e))
                }
            })
            .collect();

        if !cancelled.is_empty() {
            debug!("{} files were never admitted", cancelled.len());
        }
        outcomes.extend(cancelled.into_iter().map(|item| {
            ProcessingOutcome::failed(item, ErrorKind::Cancelled, "batch cancelled before this file was admitted")
        }));

        outcomes
    }
}
