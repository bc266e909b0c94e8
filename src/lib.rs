//! A lock-free, version-tagged Treiber stack.
//!
//! [`ConcurrentStack`] supports any number of threads pushing and popping at
//! the same time without taking a lock. Its root is a `(head, version)` pair
//! swapped with one double-width compare-and-swap, where the version counts
//! successful pops and keeps a stale head from being mistaken for a current
//! one.
//!
//! The [`driver`] module runs a small multi-threaded workload against a
//! stack; the `verstack` binary is a command line front end for it.

pub mod driver;
pub mod error;
pub mod stack;
pub mod utils;

pub use error::DriverError;
pub use stack::ConcurrentStack;
