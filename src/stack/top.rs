use portable_atomic::AtomicU128;
use std::{fmt, marker::PhantomData, ptr, sync::atomic::Ordering};

/// A snapshot of the stack's root: the head node (or null when the stack
/// is empty) paired with the number of successful pops so far.
pub(crate) struct Top<N> {
    node: *mut N,
    version: u64,
}

impl<N> Top<N> {
    pub(crate) fn empty() -> Self {
        Top {
            node: ptr::null_mut(),
            version: 0,
        }
    }

    pub(crate) fn node(self) -> *mut N {
        self.node
    }

    pub(crate) fn version(self) -> u64 {
        self.version
    }

    pub(crate) fn is_empty(self) -> bool {
        self.node.is_null()
    }

    /// The state after a push of `node`. Pushes never touch the version.
    pub(crate) fn with_node(self, node: *mut N) -> Self {
        Top {
            node,
            version: self.version,
        }
    }

    /// The state after a pop that leaves `next` on top.
    pub(crate) fn detached(self, next: *mut N) -> Self {
        Top {
            node: next,
            version: self.version.wrapping_add(1),
        }
    }

    fn pack(self) -> u128 {
        ((self.version as u128) << 64) | (self.node as usize as u64 as u128)
    }

    fn unpack(raw: u128) -> Self {
        Top {
            node: raw as u64 as usize as *mut N,
            version: (raw >> 64) as u64,
        }
    }
}

// Manual impls so `Top<N>` is `Copy` regardless of `N`.
impl<N> Clone for Top<N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<N> Copy for Top<N> {}

impl<N> PartialEq for Top<N> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node && self.version == other.version
    }
}

impl<N> Eq for Top<N> {}

impl<N> fmt::Debug for Top<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Top")
            .field("node", &self.node)
            .field("version", &self.version)
            .finish()
    }
}

/// A `Top` stored as one 128 bit word, so the pointer and the version are
/// always loaded and swapped together.
pub(crate) struct AtomicTop<N> {
    raw: AtomicU128,
    _phantom: PhantomData<*mut N>,
}

impl<N> AtomicTop<N> {
    pub(crate) fn new(top: Top<N>) -> Self {
        AtomicTop {
            raw: AtomicU128::new(top.pack()),
            _phantom: PhantomData,
        }
    }

    pub(crate) fn load(&self, order: Ordering) -> Top<N> {
        Top::unpack(self.raw.load(order))
    }

    /// Replaces `current` with `new` if the stored pair still equals
    /// `current`. On failure the pair that was actually stored is returned.
    pub(crate) fn compare_exchange_weak(
        &self,
        current: Top<N>,
        new: Top<N>,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Top<N>, Top<N>> {
        self.raw
            .compare_exchange_weak(current.pack(), new.pack(), success, failure)
            .map(Top::unpack)
            .map_err(Top::unpack)
    }

    /// Whether the double-width CAS is natively lock-free on this machine.
    pub(crate) fn is_lock_free() -> bool {
        AtomicU128::is_lock_free()
    }
}
