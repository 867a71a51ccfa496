use core::alloc::Layout;
use core::ptr::NonNull;
use core::sync::atomic::Ordering;

use super::{AllocResult, RawAllocator};

cfg_if::cfg_if! {
    if #[cfg(all(not(feature = "no-std"), all(test, feature = "loom")))] {
        use loom::sync::atomic::AtomicUsize;
    } else {
        use core::sync::atomic::AtomicUsize;
    }
}

/// Wraps another allocator and keeps a tally of what went through it.
///
/// `live` is the number of blocks currently handed out, `constructed` the
/// number of values currently alive in those blocks. Both drop back to zero
/// once every collection using the allocator has released its memory, which
/// makes this the tool of choice for leak checks.
pub struct Counting<A> {
    inner: A,
    live: AtomicUsize,
    total: AtomicUsize,
    constructed: AtomicUsize,
    failures: AtomicUsize,
}

impl<A: RawAllocator> Counting<A> {
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            live: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            constructed: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }

    /// blocks allocated and not yet freed
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// blocks allocated over the lifetime of the allocator
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Acquire)
    }

    /// values constructed and not yet destroyed
    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::Acquire)
    }

    /// allocation requests the inner allocator refused
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::Acquire)
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }
}

unsafe impl<A: RawAllocator> RawAllocator for Counting<A> {
    fn allocate(&self, layout: Layout) -> AllocResult<NonNull<u8>> {
        match self.inner.allocate(layout) {
            Ok(ptr) => {
                self.live.fetch_add(1, Ordering::AcqRel);
                self.total.fetch_add(1, Ordering::AcqRel);
                Ok(ptr)
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::AcqRel);
                Err(e)
            }
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.inner.deallocate(ptr, layout);
        self.live.fetch_sub(1, Ordering::AcqRel);
    }

    unsafe fn construct<U>(&self, ptr: NonNull<U>, value: U) {
        self.inner.construct(ptr, value);
        self.constructed.fetch_add(1, Ordering::AcqRel);
    }

    unsafe fn destroy<U>(&self, ptr: NonNull<U>) {
        self.constructed.fetch_sub(1, Ordering::AcqRel);
        self.inner.destroy(ptr);
    }
}

impl<A: core::fmt::Debug> core::fmt::Debug for Counting<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Counting")
            .field("inner", &self.inner)
            .field("live", &self.live.load(Ordering::Relaxed))
            .field("total", &self.total.load(Ordering::Relaxed))
            .field("constructed", &self.constructed.load(Ordering::Relaxed))
            .field("failures", &self.failures.load(Ordering::Relaxed))
            .finish()
    }
}
