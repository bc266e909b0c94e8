use crate::error::{DriverError, Result};

/// The shape of a driver run: how many workers, and how many pushes and
/// pops each one issues.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriverConfig {
    pub threads: usize,
    pub pushes_per_thread: usize,
    pub pops_per_thread: usize,
}

impl DriverConfig {
    /// One worker per logical CPU, each with the default workload.
    pub fn per_core() -> DriverConfig {
        DriverConfig {
            threads: num_cpus::get(),
            ..DriverConfig::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(DriverError::InvalidConfig("at least one worker thread is required"));
        }

        Ok(())
    }

    /// The gap between the first values of two neighbouring workers.
    /// Worker `id` pushes `id * stride + i`, so the stride is the smallest
    /// power of ten (at least 10) that keeps every worker's values apart.
    pub fn value_stride(&self) -> u64 {
        let mut stride = 10u64;
        while stride < self.pushes_per_thread as u64 {
            stride = stride.saturating_mul(10);
        }
        stride
    }

    pub(crate) fn values_for(&self, id: usize) -> impl Iterator<Item = u64> {
        let base = id as u64 * self.value_stride();
        (0..self.pushes_per_thread as u64).map(move |i| base + i)
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            threads: 4,
            pushes_per_thread: 5,
            pops_per_thread: 5,
        }
    }
}
