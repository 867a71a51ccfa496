use core::alloc::Layout;
use core::cell::Cell;
use core::ptr::NonNull;

use super::{AllocError, AllocResult, Global, RawAllocator};

/// A fixed-capacity pool of equally sized slots carved out of one region.
///
/// Free slots form an intrusive singly-linked list: the first word of every
/// free slot holds the address of the next free slot. Allocation pops the
/// head, deallocation pushes onto it, both in constant time. Once every slot
/// is handed out further requests fail with `AllocError::OutOfMemory`; the
/// pool never grows.
///
/// Collections borrow the pool (`&SlotPool` is itself a `RawAllocator`), so
/// several lists can share one pool and the pool outlives all of them.
pub struct SlotPool {
    /// layout of a single slot, padded to its alignment
    slot: Layout,
    capacity: usize,
    region: NonNull<u8>,
    region_layout: Layout,
    free: Cell<Option<NonNull<u8>>>,
    in_use: Cell<usize>,
}

impl SlotPool {
    /// create a pool with `capacity` slots, each able to hold a value of
    /// `layout`
    pub fn new(layout: Layout, capacity: usize) -> AllocResult<Self> {
        let link = Layout::new::<Option<NonNull<u8>>>();
        let slot = Layout::from_size_align(
            layout.size().max(link.size()),
            layout.align().max(link.align()),
        )
        .map_err(|_| AllocError::UnsupportedLayout { layout })?
        .pad_to_align();

        let region_size = slot
            .size()
            .checked_mul(capacity)
            .ok_or(AllocError::UnsupportedLayout { layout })?;
        let region_layout = Layout::from_size_align(region_size, slot.align())
            .map_err(|_| AllocError::UnsupportedLayout { layout })?;

        let region = if capacity == 0 {
            NonNull::dangling()
        } else {
            Global.allocate(region_layout)?
        };

        let pool = Self {
            slot,
            capacity,
            region,
            region_layout,
            free: Cell::new(None),
            in_use: Cell::new(0),
        };

        // thread the free list back to front so the first allocation gets
        // the lowest slot
        for index in (0..capacity).rev() {
            let slot_ptr = pool.slot_ptr(index);
            // SAFETY: slot_ptr is inside the region and aligned for a link
            unsafe { pool.push_free(slot_ptr) };
        }

        Ok(pool)
    }

    /// create a pool of `slots` slots, each fitting one node of a `List<T, _>`.
    /// every list takes one slot for its sentinel, so `slots` counts nodes,
    /// not elements: a single list in a pool of `n + 1` slots holds `n`
    /// elements.
    pub fn for_list<T>(slots: usize) -> AllocResult<Self> {
        Self::new(crate::collections::list::node_layout::<T>(), slots)
    }

    /// the number of slots in the pool
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// the number of slots currently handed out
    pub fn in_use(&self) -> usize {
        self.in_use.get()
    }

    /// the number of slots that can still be handed out
    pub fn available(&self) -> usize {
        self.capacity - self.in_use.get()
    }

    /// the layout of a single slot
    pub fn slot_layout(&self) -> Layout {
        self.slot
    }

    /// returns true if `ptr` points at the start of a slot in this pool
    pub fn contains(&self, ptr: *const u8) -> bool {
        let start = self.region.as_ptr() as usize;
        let end = start + self.region_layout.size();
        let addr = ptr as usize;
        addr >= start && addr < end && (addr - start) % self.slot.size() == 0
    }

    fn slot_ptr(&self, index: usize) -> NonNull<u8> {
        debug_assert!(index < self.capacity);
        // SAFETY: index is in bounds, so the offset stays inside the region
        unsafe { NonNull::new_unchecked(self.region.as_ptr().add(index * self.slot.size())) }
    }

    /// # Safety
    /// `slot` must be a slot of this pool that is not currently in use
    unsafe fn push_free(&self, slot: NonNull<u8>) {
        let link = slot.cast::<Option<NonNull<u8>>>();
        link.as_ptr().write(self.free.get());
        self.free.set(Some(slot));
    }

    fn pop_free(&self) -> Option<NonNull<u8>> {
        let head = self.free.get()?;
        // SAFETY: every slot on the free list holds the link to its successor
        let next = unsafe { head.cast::<Option<NonNull<u8>>>().as_ptr().read() };
        self.free.set(next);
        Some(head)
    }
}

unsafe impl RawAllocator for SlotPool {
    fn allocate(&self, layout: Layout) -> AllocResult<NonNull<u8>> {
        if layout.size() > self.slot.size() || layout.align() > self.slot.align() {
            return Err(AllocError::UnsupportedLayout { layout });
        }

        let slot = self.pop_free().ok_or(AllocError::OutOfMemory { layout })?;
        self.in_use.set(self.in_use.get() + 1);
        Ok(slot)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, _layout: Layout) {
        assert!(
            self.contains(ptr.as_ptr()),
            "trying to free a pointer that does not belong to this pool"
        );
        self.push_free(ptr);
        self.in_use.set(self.in_use.get() - 1);
    }
}

impl Drop for SlotPool {
    fn drop(&mut self) {
        if self.capacity != 0 {
            // SAFETY: the region came from Global with exactly this layout
            unsafe { Global.deallocate(self.region, self.region_layout) };
        }
    }
}

impl core::fmt::Debug for SlotPool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SlotPool")
            .field("slot", &self.slot)
            .field("capacity", &self.capacity)
            .field("in_use", &self.in_use.get())
            .field("region", &self.region)
            .finish()
    }
}
