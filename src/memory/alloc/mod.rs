pub mod counting;
pub mod pool;

use core::alloc::Layout;
use core::ptr::NonNull;

pub use counting::Counting;
pub use pool::SlotPool;

pub type AllocResult<T> = Result<T, AllocError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    /// the allocator had no memory left to satisfy `layout`
    #[error("out of memory allocating {} bytes (align {})", .layout.size(), .layout.align())]
    OutOfMemory { layout: Layout },
    /// the allocator can never satisfy `layout`, regardless of how much memory
    /// is free
    #[error("allocator cannot serve {} bytes (align {})", .layout.size(), .layout.align())]
    UnsupportedLayout { layout: Layout },
}

impl AllocError {
    /// the layout of the request that failed
    pub fn layout(&self) -> Layout {
        match self {
            Self::OutOfMemory { layout } | Self::UnsupportedLayout { layout } => *layout,
        }
    }
}

/// A pluggable source of memory for node-based collections.
///
/// Collections obtain raw storage with `allocate`, place values into it with
/// `construct` and tear them down again with `destroy` followed by
/// `deallocate`. The default `construct`/`destroy` are a plain write and an
/// in-place drop; allocators only need to override them when they track
/// object lifetimes.
///
/// # Safety
/// Implementors must return storage that fits `layout` and stays valid until
/// it is passed back to `deallocate` on the same allocator (or a copy of it,
/// for allocators that are `Clone`).
pub unsafe trait RawAllocator {
    /// reserve storage for `layout`. never returns a null pointer.
    fn allocate(&self, layout: Layout) -> AllocResult<NonNull<u8>>;

    /// release storage previously handed out by `allocate`
    ///
    /// # Safety
    /// `ptr` must come from `self.allocate(layout)` with the same `layout` and
    /// must not be used afterwards
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// move `value` into the storage at `ptr`
    ///
    /// # Safety
    /// `ptr` must be valid for writes and properly aligned for `U`
    unsafe fn construct<U>(&self, ptr: NonNull<U>, value: U) {
        ptr.as_ptr().write(value);
    }

    /// run the destructor of the value at `ptr`, leaving the storage allocated
    ///
    /// # Safety
    /// `ptr` must point to a live `U` that is not used afterwards
    unsafe fn destroy<U>(&self, ptr: NonNull<U>) {
        core::ptr::drop_in_place(ptr.as_ptr());
    }
}

unsafe impl<A: RawAllocator + ?Sized> RawAllocator for &A {
    fn allocate(&self, layout: Layout) -> AllocResult<NonNull<u8>> {
        (**self).allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        (**self).deallocate(ptr, layout)
    }

    unsafe fn construct<U>(&self, ptr: NonNull<U>, value: U) {
        (**self).construct(ptr, value)
    }

    unsafe fn destroy<U>(&self, ptr: NonNull<U>) {
        (**self).destroy(ptr)
    }
}

/// The process-wide heap, via `alloc::alloc`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Global;

unsafe impl RawAllocator for Global {
    fn allocate(&self, layout: Layout) -> AllocResult<NonNull<u8>> {
        if layout.size() == 0 {
            return Err(AllocError::UnsupportedLayout { layout });
        }

        // SAFETY: layout has a non-zero size
        let ptr = unsafe { ::alloc::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(AllocError::OutOfMemory { layout })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        ::alloc::alloc::dealloc(ptr.as_ptr(), layout);
    }
}
