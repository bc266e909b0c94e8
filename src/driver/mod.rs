//! A small multi-threaded workload for exercising a `ConcurrentStack`.
//!
//! Every worker pushes its own run of distinct values and then tries to pop
//! the same number of times. Workers are held at a start gate until all of
//! them exist, so their operations really do interleave.

mod config;
mod worker;

pub use config::DriverConfig;
pub use worker::WorkerReport;

use crate::{
    error::{DriverError, Result},
    stack::ConcurrentStack,
    utils::start_gate,
};
use std::{sync::Arc, thread::JoinHandle};
use tracing::{debug, info, warn};

/// The outcome of a driver run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    /// One entry per worker, ordered by worker id.
    pub per_thread: Vec<WorkerReport>,
    /// The stack's version right after every worker was joined.
    pub version: u64,
}

impl Report {
    pub fn pushed(&self) -> usize {
        self.per_thread.iter().map(|w| w.pushed.len()).sum()
    }

    pub fn popped(&self) -> usize {
        self.per_thread.iter().map(|w| w.popped.len()).sum()
    }

    /// How many values should still be on the stack.
    pub fn remaining(&self) -> usize {
        self.pushed() - self.popped()
    }

    /// `(id, value)` for every successful pop, grouped by worker.
    pub fn pops(&self) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.per_thread
            .iter()
            .flat_map(|w| w.popped.iter().map(move |&value| (w.id, value)))
    }
}

/// Runs the workload described by `config` against `stack`, returning once
/// every worker has been joined.
pub fn run(stack: &Arc<ConcurrentStack<u64>>, config: &DriverConfig) -> Result<Report> {
    config.validate()?;

    let (gate, opener) = start_gate::new2();
    let mut handles = Vec::with_capacity(config.threads);

    for id in 0..config.threads {
        match worker::create_worker(id, Arc::clone(stack), gate.clone(), config) {
            Ok(handle) => handles.push((id, handle)),
            Err(source) => {
                // Let the workers that did start finish before reporting.
                opener.open();
                join_all(handles);
                return Err(DriverError::Spawn { id, source });
            }
        }
    }

    debug!(workers = config.threads, "releasing workers");
    opener.open();

    let mut per_thread = Vec::with_capacity(config.threads);
    let mut panicked = None;

    for (id, handle) in handles {
        match handle.join() {
            Ok(report) => per_thread.push(report),
            Err(_) => {
                panicked.get_or_insert(id);
            }
        }
    }

    if let Some(id) = panicked {
        return Err(DriverError::WorkerPanicked { id });
    }

    let report = Report {
        per_thread,
        version: stack.version(),
    };

    let attempted = config.threads * config.pops_per_thread;
    info!(
        pushed = report.pushed(),
        popped = report.popped(),
        remaining = report.remaining(),
        version = report.version,
        "driver run complete"
    );
    if report.popped() < attempted {
        warn!(
            attempted,
            popped = report.popped(),
            "some pops found the stack empty"
        );
    }

    Ok(report)
}

fn join_all(handles: Vec<(usize, JoinHandle<WorkerReport>)>) {
    for (_, handle) in handles {
        let _ = handle.join();
    }
}
