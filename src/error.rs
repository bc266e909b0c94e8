use std::io;
use thiserror::Error;

/// Errors produced while running a concurrent workload against a stack.
/// The stack itself has no error cases: an empty pop is a plain `None`.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("invalid driver configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("failed to spawn worker {id}")]
    Spawn {
        id: usize,
        #[source]
        source: io::Error,
    },

    #[error("worker {id} panicked")]
    WorkerPanicked { id: usize },
}

pub type Result<T> = std::result::Result<T, DriverError>;
