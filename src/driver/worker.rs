use super::config::DriverConfig;
use crate::{stack::ConcurrentStack, utils::start_gate::StartGate};
use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
};
use tracing::debug;

/// What a single worker did: every value it pushed, in push order, and
/// every value it managed to pop, in pop order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerReport {
    pub id: usize,
    pub pushed: Vec<u64>,
    pub popped: Vec<u64>,
}

pub(super) fn create_worker(
    id: usize,
    stack: Arc<ConcurrentStack<u64>>,
    gate: StartGate,
    config: &DriverConfig,
) -> io::Result<JoinHandle<WorkerReport>> {
    let values: Vec<u64> = config.values_for(id).collect();
    let pops = config.pops_per_thread;

    thread::Builder::new()
        .name(format!("verstack-worker-{}", id))
        .spawn(move || {
            gate.wait();
            debug!(worker = id, "worker released");

            for &value in &values {
                stack.push(value);
            }

            // An empty pop is a normal outcome and is simply not recorded.
            let popped: Vec<u64> = (0..pops).filter_map(|_| stack.pop()).collect();

            debug!(
                worker = id,
                pushed = values.len(),
                popped = popped.len(),
                "worker finished"
            );

            WorkerReport {
                id,
                pushed: values,
                popped,
            }
        })
}
