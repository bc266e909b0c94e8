use anyhow::Context;
use clap::Parser;
use std::{
    io::{self, Write},
    sync::Arc,
};
use tracing_subscriber::EnvFilter;
use verstack::{
    driver::{self, DriverConfig},
    ConcurrentStack,
};

/// Hammers a lock-free stack from several threads and prints what each
/// thread popped.
#[derive(Debug, Parser)]
#[command(name = "verstack", version)]
struct Args {
    /// Number of worker threads.
    #[arg(long, env = "VERSTACK_THREADS", default_value_t = 4, conflicts_with = "per_core")]
    threads: usize,

    /// Start one worker per logical CPU.
    #[arg(long)]
    per_core: bool,

    /// Values each worker pushes before it starts popping.
    #[arg(long, env = "VERSTACK_PUSHES", default_value_t = 5)]
    pushes: usize,

    /// Pops each worker attempts after pushing.
    #[arg(long, env = "VERSTACK_POPS", default_value_t = 5)]
    pops: usize,

    /// Only print the final contents of the stack.
    #[arg(long, short)]
    quiet: bool,
}

impl Args {
    fn config(&self) -> DriverConfig {
        let threads = if self.per_core {
            DriverConfig::per_core().threads
        } else {
            self.threads
        };

        DriverConfig {
            threads,
            pushes_per_thread: self.pushes,
            pops_per_thread: self.pops,
        }
    }
}

pub fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = args.config();

    if !ConcurrentStack::<u64>::is_lock_free() {
        tracing::warn!("no native double-width CAS on this machine, the stack is not lock-free");
    }

    let stack = Arc::new(ConcurrentStack::new());
    let report = driver::run(&stack, &config).context("stack workload failed")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if !args.quiet {
        for (id, value) in report.pops() {
            writeln!(out, "Thread {} popped {}", id, value)?;
        }
    }

    stack
        .print(&mut out)
        .context("failed to print the stack")?;

    Ok(())
}
