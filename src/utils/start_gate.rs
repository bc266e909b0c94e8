use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// Creates a gate and a handle that opens it.
pub fn new2() -> (StartGate, GateOpener) {
    let gate = StartGate::new();
    let opener = gate.opener();
    (gate, opener)
}

/// A one-shot gate that holds any number of threads until it is opened.
/// The driver parks every worker here so they all hit the stack at once.
#[derive(Clone)]
pub struct StartGate {
    inner: Arc<Inner>,
}

impl StartGate {
    pub fn new() -> StartGate {
        StartGate {
            inner: Arc::new(Inner::new()),
        }
    }

    pub fn opener(&self) -> GateOpener {
        GateOpener {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Blocks until the gate is opened. Returns immediately if it already
    /// was.
    pub fn wait(&self) {
        self.inner.wait();
    }
}

impl Default for StartGate {
    fn default() -> Self {
        Self::new()
    }
}

pub struct GateOpener {
    inner: Arc<Inner>,
}

impl GateOpener {
    pub fn open(&self) {
        self.inner.open();
    }
}

// Opening the gate also happens on drop, so a driver that bails out early
// never leaves workers parked forever.
impl Drop for GateOpener {
    fn drop(&mut self) {
        self.inner.open();
    }
}

struct Inner {
    open: Mutex<bool>,
    cvar: Condvar,
}

impl Inner {
    fn new() -> Self {
        Self {
            open: Mutex::new(false),
            cvar: Condvar::new(),
        }
    }

    fn wait(&self) {
        let mut open = self.open.lock();

        // Spurious wakeups are possible, so the flag is rechecked.
        while !*open {
            self.cvar.wait(&mut open);
        }
    }

    fn open(&self) {
        let mut open = self.open.lock();
        if !*open {
            *open = true;
            self.cvar.notify_all();
        }
    }
}
