mod top;

use crossbeam::{epoch, utils::Backoff, utils::CachePadded};
use std::{
    fmt,
    io::{self, Write},
    mem::ManuallyDrop,
    ptr,
    sync::atomic::Ordering,
};
use top::{AtomicTop, Top};

struct Node<T> {
    // Moved out by the pop that detaches the node, so it is never dropped
    // through the node itself.
    value: ManuallyDrop<T>,
    next: *mut Node<T>,
}

/// An unbounded, lock-free LIFO stack for any number of concurrent
/// producers and consumers.
///
/// The stack's root is a single `(head, version)` pair that is only ever
/// changed with a compare-and-swap over both halves at once. The version
/// counts successful pops, so a thread holding a stale snapshot can't win a
/// CAS just because the head's address was freed and handed out again.
///
/// Popped nodes are not freed on the spot. Another thread may still be about
/// to read the node's `next` link, so the allocation is handed to the
/// `crossbeam` epoch collector and released once no pinned thread can see it.
/// The value inside is moved out to the popping thread immediately.
pub struct ConcurrentStack<T> {
    top: CachePadded<AtomicTop<Node<T>>>,
}

impl<T> ConcurrentStack<T> {
    /// Creates an empty stack.
    pub fn new() -> ConcurrentStack<T> {
        ConcurrentStack {
            top: CachePadded::new(AtomicTop::new(Top::empty())),
        }
    }

    /// Pushes `value` on top of the stack. This never fails; contention
    /// only makes it retry.
    pub fn push(&self, value: T) {
        let node = Box::into_raw(Box::new(Node {
            value: ManuallyDrop::new(value),
            next: ptr::null_mut(),
        }));

        let backoff = Backoff::new();
        let mut current = self.top.load(Ordering::Acquire);

        loop {
            // The node is still private to this thread until the CAS succeeds.
            unsafe { (*node).next = current.node() };

            match self.top.compare_exchange_weak(
                current,
                current.with_node(node),
                Ordering::Release,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => {
                    current = actual;
                    backoff.spin();
                }
            }
        }
    }

    /// Attempts to pop the top element, returning `None` right away if the
    /// stack is observed to be empty.
    pub fn pop(&self) -> Option<T> {
        let guard = epoch::pin();
        let backoff = Backoff::new();
        let mut current = self.top.load(Ordering::Acquire);

        loop {
            if current.is_empty() {
                return None;
            }

            let head = current.node();
            // `head` was reachable after we pinned, so the collector keeps
            // it allocated for as long as `guard` lives.
            let next = unsafe { (*head).next };

            match self.top.compare_exchange_weak(
                current,
                current.detached(next),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => unsafe {
                    // Winning the CAS makes this thread the only owner of
                    // the value. The node memory waits for the epoch to pass.
                    let value = ptr::read(&*(*head).value);
                    guard.defer_unchecked(move || drop(Box::from_raw(head)));

                    return Some(value);
                },
                Err(actual) => {
                    current = actual;
                    backoff.spin();
                }
            }
        }
    }

    /// Returns whether the stack was empty at the moment it was looked at.
    /// Other threads may have changed that by the time this returns.
    pub fn is_empty(&self) -> bool {
        self.top.load(Ordering::Acquire).is_empty()
    }

    /// Returns the number of successful pops performed on this stack.
    /// This never decreases.
    pub fn version(&self) -> u64 {
        self.top.load(Ordering::Acquire).version()
    }

    /// Whether `push` and `pop` run on a native double-width CAS on this
    /// machine. When they don't, the atomic falls back to a
    /// platform-provided emulation which is not lock-free.
    pub fn is_lock_free() -> bool {
        AtomicTop::<Node<T>>::is_lock_free()
    }
}

impl<T: fmt::Display + Copy> ConcurrentStack<T> {
    /// Writes the contents of the stack from top to bottom, as
    /// `[top] v1 v2 ... [bottom]`.
    ///
    /// Only the root is read atomically; the rest of the chain is walked
    /// without synchronization. If other threads push or pop at the same
    /// time, the output is a transient view that may never have existed as
    /// a whole. Use it for diagnostics, never for decisions.
    pub fn print<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let _guard = epoch::pin();
        let snapshot = self.top.load(Ordering::Acquire);
        let mut cur = snapshot.node();

        write!(out, "[top] ")?;
        while !cur.is_null() {
            // A racing pop may have moved the value out already, which is
            // harmless for `Copy` values; the node itself is pinned.
            let (value, next) = unsafe { (*(*cur).value, (*cur).next) };
            write!(out, "{} ", value)?;
            cur = next;
        }
        writeln!(out, "[bottom]")
    }
}

impl<T> Default for ConcurrentStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for ConcurrentStack<T> {
    fn drop(&mut self) {
        let mut cur = self.top.load(Ordering::Relaxed).node();

        // `&mut self` means nobody else can touch the chain any more.
        while !cur.is_null() {
            unsafe {
                let mut node = Box::from_raw(cur);
                ManuallyDrop::drop(&mut node.value);
                cur = node.next;
            }
        }
    }
}

impl<T> fmt::Debug for ConcurrentStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let top = self.top.load(Ordering::Acquire);
        f.debug_struct("ConcurrentStack")
            .field("version", &top.version())
            .field("is_empty", &top.is_empty())
            .finish()
    }
}

unsafe impl<T: Send> Send for ConcurrentStack<T> {}
unsafe impl<T: Send> Sync for ConcurrentStack<T> {}
