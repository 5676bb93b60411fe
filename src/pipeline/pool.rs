//! Worker pool lifecycle
//!
//! `processes x threads` workers run as one flat pool of OS threads. The two
//! counts only decide how many workers exist and how they are named; every
//! worker reads the same queue and writes the same result channel.

use super::source::UnitReceiver;
use super::worker::{Worker, WorkerId, WorkerReport};
use crate::config::ExtractConfig;
use crate::error::{PipelineError, Result};
use crate::extract::{SignatureExtractor, TypeAliases};
use crossbeam_channel::Sender;
use std::sync::Arc;
use tracing::{info, warn};

/// Shape of the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Outer execution contexts
    pub processes: usize,
    /// Workers per outer context
    pub threads: usize,
}

impl PoolConfig {
    pub fn new(processes: usize, threads: usize) -> Result<Self> {
        if processes == 0 || threads == 0 {
            return Err(PipelineError::InvalidPool(format!(
                "need at least one process and one thread (got {} x {})",
                processes, threads
            )));
        }
        Ok(Self { processes, threads })
    }

    /// Number of result sets the aggregator waits for
    pub fn total_workers(&self) -> usize {
        self.processes * self.threads
    }
}

/// Running workers
pub struct WorkerPool {
    workers: Vec<Worker>,
}

impl WorkerPool {
    /// Start every worker. `results` is consumed so that the channel closes
    /// once the last worker has published.
    pub fn start(
        pool: &PoolConfig,
        config: Arc<ExtractConfig>,
        aliases: Arc<TypeAliases>,
        units: UnitReceiver,
        results: Sender<WorkerReport>,
    ) -> Result<Self> {
        let mut workers = Vec::with_capacity(pool.total_workers());

        for outer in 0..pool.processes {
            for inner in 0..pool.threads {
                let extractor = SignatureExtractor::new(Arc::clone(&config), Arc::clone(&aliases))?;
                let worker = Worker::spawn(
                    WorkerId { outer, inner },
                    extractor,
                    units.clone(),
                    results.clone(),
                )?;
                workers.push(worker);
            }
        }

        info!(
            count = workers.len(),
            processes = pool.processes,
            threads = pool.threads,
            "Workers spawned"
        );
        Ok(Self { workers })
    }

    /// Join all workers; returns how many panicked
    pub fn join(self) -> usize {
        let mut panicked = 0;
        for worker in self.workers {
            let id = worker.id();
            if let Err(e) = worker.join() {
                warn!(worker = %id, error = %e, "Worker failed to join cleanly");
                panicked += 1;
            }
        }
        panicked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_config_validation() {
        assert_eq!(PoolConfig::new(3, 4).unwrap().total_workers(), 12);
        assert!(matches!(PoolConfig::new(0, 4), Err(PipelineError::InvalidPool(_))));
        assert!(matches!(PoolConfig::new(2, 0), Err(PipelineError::InvalidPool(_))));
    }
}
