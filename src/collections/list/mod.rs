//! An owning, allocator-aware, circular doubly-linked list.
//!
//! Elements live in nodes obtained from a [`RawAllocator`]; a payload-free
//! sentinel node anchors the ring so that the list is never structurally
//! empty and insertion or removal never has to special-case the ends.
//! Positions are expressed with [`Cursor`]s, which stay valid while other
//! elements are inserted or erased around them.

mod cursor;
mod iter;
mod node;
mod node_alloc;

#[cfg(all(not(miri), test, not(feature = "loom")))]
mod proptests;

use core::convert::Infallible;
use core::marker::PhantomData;
use core::ops::{Bound, RangeBounds};

pub use cursor::{Cursor, CursorMut};
pub use iter::{IntoIter, Iter, IterMut};

use node::ListNode;
use node_alloc::{NodeAllocator, NodePtr};

use crate::memory::alloc::{AllocError, AllocResult, Global, RawAllocator};

/// An element could not be emplaced into a list.
#[derive(Debug, thiserror::Error)]
pub enum EmplaceError<E> {
    /// no storage for the node
    #[error(transparent)]
    Alloc(#[from] AllocError),
    /// the element constructor failed; the node storage was released
    #[error("element construction failed: {0}")]
    Construct(E),
}

/// the layout of a single node (payload or sentinel) of a `List<T, _>`
pub(crate) fn node_layout<T>() -> core::alloc::Layout {
    NodeAllocator::<T, Global>::layout()
}

/// abort through the allocator error hook, the way `alloc`'s collections do
/// when an infallible API runs out of memory
fn unwrap_alloc<R>(res: AllocResult<R>) -> R {
    match res {
        Ok(r) => r,
        Err(e) => ::alloc::alloc::handle_alloc_error(e.layout()),
    }
}

fn alloc_only(e: EmplaceError<Infallible>) -> AllocError {
    match e {
        EmplaceError::Alloc(e) => e,
        EmplaceError::Construct(never) => match never {},
    }
}

/// a circular doubly-linked list whose nodes come from `A`
pub struct List<T, A: RawAllocator = Global> {
    /// a sentinel node that always exists, even in empty lists
    sentinel: NodePtr<T>,
    /// the number of non-sentinel elements in the list
    len: usize,
    nodes: NodeAllocator<T, A>,
    _marker: PhantomData<T>,
}

impl<T> List<T> {
    /// create an empty list on the global heap
    pub fn new() -> Self {
        Self::new_in(Global)
    }
}

impl<T, A: RawAllocator> List<T, A> {
    /// create an empty list whose nodes come from `alloc`. running out of
    /// memory for the sentinel goes through `handle_alloc_error`.
    pub fn new_in(alloc: A) -> Self {
        unwrap_alloc(Self::try_new_in(alloc))
    }

    /// create an empty list whose nodes come from `alloc`, reporting failure
    /// to allocate the sentinel
    pub fn try_new_in(alloc: A) -> AllocResult<Self> {
        let nodes = NodeAllocator::new(alloc);
        let sentinel = nodes.create_sentinel()?;
        Ok(Self {
            sentinel,
            len: 0,
            nodes,
            _marker: PhantomData,
        })
    }

    /// the allocator this list draws its nodes from
    pub fn allocator(&self) -> &A {
        self.nodes.allocator()
    }

    /// get the length of the list, not including the sentinel node
    pub fn len(&self) -> usize {
        self.len
    }

    /// returns true if the length of the list is 0
    pub fn is_empty(&self) -> bool {
        debug_assert_eq!(self.len == 0, self.head() == self.sentinel_ptr());
        self.len == 0
    }

    /// get the first element, or None if the list is empty
    pub fn front(&self) -> Option<&T> {
        // SAFETY: head is either a payload node or the sentinel, which has no data
        unsafe { (*self.head()).data() }
    }

    /// get the first element mutably, or None if the list is empty
    pub fn front_mut(&mut self) -> Option<&mut T> {
        // SAFETY: see `front`, `&mut self` guarantees exclusivity
        unsafe { (*self.head()).data_mut() }
    }

    /// get the last element, or None if the list is empty
    pub fn back(&self) -> Option<&T> {
        // SAFETY: tail is either a payload node or the sentinel, which has no data
        unsafe { (*self.tail()).data() }
    }

    /// get the last element mutably, or None if the list is empty
    pub fn back_mut(&mut self) -> Option<&mut T> {
        // SAFETY: see `back`, `&mut self` guarantees exclusivity
        unsafe { (*self.tail()).data_mut() }
    }

    /// append `value`. on allocation failure the list is unchanged.
    pub fn push_back(&mut self, value: T) -> AllocResult<()> {
        let sentinel = self.sentinel_ptr();
        self.insert_node(sentinel, || Ok::<_, Infallible>(value))
            .map(|_| ())
            .map_err(alloc_only)
    }

    /// prepend `value`. on allocation failure the list is unchanged.
    pub fn push_front(&mut self, value: T) -> AllocResult<()> {
        let head = self.head();
        self.insert_node(head, || Ok::<_, Infallible>(value))
            .map(|_| ())
            .map_err(alloc_only)
    }

    /// remove the last element. popping an empty list does nothing.
    pub fn pop_back(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let tail = self.tail();
        // SAFETY: the list is not empty, so tail is a payload node
        unsafe {
            let node = self.unlink_node(tail);
            self.nodes.take_payload(node)
        }
    }

    /// remove the first element. popping an empty list does nothing.
    pub fn pop_front(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let head = self.head();
        // SAFETY: the list is not empty, so head is a payload node
        unsafe {
            let node = self.unlink_node(head);
            self.nodes.take_payload(node)
        }
    }

    /// allocate a node at the back and only then build its element with
    /// `ctor`
    pub fn emplace_back<F>(&mut self, ctor: F) -> AllocResult<&mut T>
    where
        F: FnOnce() -> T,
    {
        self.try_emplace_back(|| Ok::<_, Infallible>(ctor()))
            .map_err(alloc_only)
    }

    /// allocate a node at the front and only then build its element with
    /// `ctor`
    pub fn emplace_front<F>(&mut self, ctor: F) -> AllocResult<&mut T>
    where
        F: FnOnce() -> T,
    {
        self.try_emplace_front(|| Ok::<_, Infallible>(ctor()))
            .map_err(alloc_only)
    }

    /// like `emplace_back` with a fallible constructor. if `ctor` fails the
    /// list is left exactly as it was and no memory is retained.
    pub fn try_emplace_back<E, F>(&mut self, ctor: F) -> Result<&mut T, EmplaceError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let sentinel = self.sentinel_ptr();
        let node = self.insert_node(sentinel, ctor)?;
        // SAFETY: the node was just linked in and holds data
        Ok(unsafe { Self::payload_mut(node) })
    }

    /// like `emplace_front` with a fallible constructor. if `ctor` fails the
    /// list is left exactly as it was and no memory is retained.
    pub fn try_emplace_front<E, F>(&mut self, ctor: F) -> Result<&mut T, EmplaceError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let head = self.head();
        let node = self.insert_node(head, ctor)?;
        // SAFETY: the node was just linked in and holds data
        Ok(unsafe { Self::payload_mut(node) })
    }

    /// drop every element, leaving the sentinel self-looped. if an element's
    /// destructor panics the remaining elements are still dropped and freed.
    pub fn clear(&mut self) {
        /// keeps clearing while a destructor unwinds
        struct ClearGuard<'a, T, A: RawAllocator>(&'a mut List<T, A>);

        impl<'a, T, A: RawAllocator> Drop for ClearGuard<'a, T, A> {
            fn drop(&mut self) {
                self.0.clear();
            }
        }

        while !self.is_empty() {
            let head = self.head();
            // SAFETY: the list is not empty, so head is a payload node. the
            // node is out of the ring before its element is dropped.
            unsafe {
                let node = self.unlink_node(head);
                let guard = ClearGuard(&mut *self);
                guard.0.nodes.release_node(node);
                core::mem::forget(guard);
            }
        }
    }

    /// erase the elements whose indices fall in `range`, returning how many
    /// were erased. bounds past the end are clamped; an empty range is a no-op.
    pub fn erase_range<R: RangeBounds<usize>>(&mut self, range: R) -> usize {
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => self.len,
        }
        .min(self.len);

        if start >= end {
            return 0;
        }
        self.cursor_at_mut(start).erase_many(end - start)
    }

    /// deep copy every element, in order, into a new list sharing a copy of
    /// this list's allocator
    pub fn try_clone(&self) -> AllocResult<Self>
    where
        T: Clone,
        A: Clone,
    {
        let mut out = Self::try_new_in(self.allocator().clone())?;
        for value in self.iter() {
            out.push_back(value.clone())?;
        }
        Ok(out)
    }

    /// move every element into a new list, leaving `self` empty. no element
    /// is copied or reallocated; only a fresh sentinel is allocated for `self`.
    pub fn take(&mut self) -> Self
    where
        A: Clone,
    {
        let mut out = Self::new_in(self.allocator().clone());
        // SAFETY: both sentinels anchor closed rings. the payload nodes were
        // allocated by a copy of `out`'s allocator.
        unsafe { ListNode::swap_anchors(self.sentinel_ptr(), out.sentinel_ptr()) };
        core::mem::swap(&mut self.len, &mut out.len);
        out
    }

    /// move assignment: drop this list's elements and take over `other`'s.
    /// `other` is left empty and keeps this list's old allocator.
    pub fn move_from(&mut self, other: &mut Self) {
        self.clear();
        core::mem::swap(self, other);
    }

    /// iterate over shared references to the elements, front to back
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.head(), self.tail(), self.len)
    }

    /// iterate over mutable references to the elements, front to back
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut::new(self.head(), self.tail(), self.len)
    }

    /// a cursor on the first element, or on the sentinel if the list is empty
    pub fn cursor_front(&self) -> Cursor<'_, T, A> {
        Cursor::new(self, self.head(), 0)
    }

    /// a cursor on the last element, or on the sentinel if the list is empty
    pub fn cursor_back(&self) -> Cursor<'_, T, A> {
        Cursor::new(self, self.tail(), self.len.saturating_sub(1))
    }

    /// a cursor on the sentinel, one past the last element
    pub fn cursor_end(&self) -> Cursor<'_, T, A> {
        Cursor::new(self, self.sentinel_ptr(), self.len)
    }

    /// a cursor on the element at `index`, or on the sentinel if `index` is
    /// out of bounds
    pub fn cursor_at(&self, index: usize) -> Cursor<'_, T, A> {
        let (node, index) = self.seek(index);
        Cursor::new(self, node, index)
    }

    /// a mutable cursor on the first element, or on the sentinel if the list
    /// is empty
    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, T, A> {
        let head = self.head();
        CursorMut::new(self, head, 0)
    }

    /// a mutable cursor on the last element, or on the sentinel if the list
    /// is empty
    pub fn cursor_back_mut(&mut self) -> CursorMut<'_, T, A> {
        let tail = self.tail();
        let index = self.len.saturating_sub(1);
        CursorMut::new(self, tail, index)
    }

    /// a mutable cursor on the sentinel. inserting before it appends.
    pub fn cursor_end_mut(&mut self) -> CursorMut<'_, T, A> {
        let sentinel = self.sentinel_ptr();
        let len = self.len;
        CursorMut::new(self, sentinel, len)
    }

    /// a mutable cursor on the element at `index`, or on the sentinel if
    /// `index` is out of bounds
    pub fn cursor_at_mut(&mut self, index: usize) -> CursorMut<'_, T, A> {
        let (node, index) = self.seek(index);
        CursorMut::new(self, node, index)
    }
}

// private APIs
impl<T, A: RawAllocator> List<T, A> {
    fn sentinel_ptr(&self) -> *mut ListNode<T> {
        self.sentinel.as_ptr()
    }

    fn head(&self) -> *mut ListNode<T> {
        // SAFETY: the sentinel lives as long as the list
        unsafe { (*self.sentinel_ptr()).next() }
    }

    fn tail(&self) -> *mut ListNode<T> {
        // SAFETY: the sentinel lives as long as the list
        unsafe { (*self.sentinel_ptr()).prev() }
    }

    /// find the node at `index`, walking from whichever end is closer.
    /// out-of-bounds indices resolve to the sentinel.
    fn seek(&self, index: usize) -> (*mut ListNode<T>, usize) {
        if index >= self.len {
            return (self.sentinel_ptr(), self.len);
        }

        // SAFETY: every step stays within the closed ring
        unsafe {
            if index < self.len / 2 {
                let mut curr = self.head();
                for _ in 0..index {
                    curr = (*curr).next();
                }
                (curr, index)
            } else {
                let mut curr = self.tail();
                for _ in index + 1..self.len {
                    curr = (*curr).prev();
                }
                (curr, index)
            }
        }
    }

    /// allocate a node, build its payload and splice it in before `before`.
    /// on failure the ring and the length are untouched.
    fn insert_node<E, F>(
        &mut self,
        before: *mut ListNode<T>,
        ctor: F,
    ) -> Result<NodePtr<T>, EmplaceError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let node = self.nodes.create_node(ctor)?;
        // SAFETY: node is fresh and unlinked, before belongs to our ring
        unsafe { ListNode::hook(node.as_ptr(), before) };
        self.len += 1;
        Ok(node)
    }

    /// unhook a payload node and hand back ownership of it
    ///
    /// # Safety
    /// `node` must be a payload node of this list
    unsafe fn unlink_node(&mut self, node: *mut ListNode<T>) -> NodePtr<T> {
        debug_assert!(!(*node).is_sentinel());
        ListNode::unhook(node);
        self.len -= 1;
        NodePtr::new_unchecked(node)
    }

    /// # Safety
    /// `node` must be a payload node of this list
    unsafe fn payload_mut<'a>(node: NodePtr<T>) -> &'a mut T {
        match (*node.as_ptr()).data_mut() {
            Some(data) => data,
            None => unreachable!("payload nodes always hold data"),
        }
    }
}

impl<T, A: RawAllocator> Drop for List<T, A> {
    fn drop(&mut self) {
        /// frees the sentinel once the elements are gone, even if dropping
        /// one of them panicked
        struct SentinelGuard<'a, T, A: RawAllocator>(&'a mut List<T, A>);

        impl<'a, T, A: RawAllocator> Drop for SentinelGuard<'a, T, A> {
            fn drop(&mut self) {
                // SAFETY: the ring is empty and nothing refers to the sentinel
                // anymore
                unsafe { self.0.nodes.release_node(self.0.sentinel) };
            }
        }

        let guard = SentinelGuard(self);
        guard.0.clear();
    }
}

// SAFETY: the list exclusively owns its nodes, so sending it sends the `T`s
// and the allocator
unsafe impl<T: Send, A: RawAllocator + Send> Send for List<T, A> {}
unsafe impl<T: Sync, A: RawAllocator + Sync> Sync for List<T, A> {}

impl<T, A: RawAllocator + Default> Default for List<T, A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T: Clone, A: RawAllocator + Clone> Clone for List<T, A> {
    fn clone(&self) -> Self {
        unwrap_alloc(self.try_clone())
    }

    /// the copy is built before the old contents are dropped, so a panicking
    /// `T::clone` leaves `self` untouched
    fn clone_from(&mut self, source: &Self) {
        let copy = source.clone();
        *self = copy;
    }
}

impl<T: core::fmt::Debug, A: RawAllocator> core::fmt::Debug for List<T, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq, A: RawAllocator, B: RawAllocator> PartialEq<List<T, B>> for List<T, A> {
    fn eq(&self, other: &List<T, B>) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<T: Eq, A: RawAllocator> Eq for List<T, A> {}

impl<T: core::hash::Hash, A: RawAllocator> core::hash::Hash for List<T, A> {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        state.write_usize(self.len);
        for value in self.iter() {
            value.hash(state);
        }
    }
}

impl<T, A: RawAllocator> Extend<T> for List<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            unwrap_alloc(self.push_back(value));
        }
    }
}

impl<'a, T: Copy + 'a, A: RawAllocator> Extend<&'a T> for List<T, A> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<T, A: RawAllocator + Default> FromIterator<T> for List<T, A> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::default();
        list.extend(iter);
        list
    }
}

impl<T, A: RawAllocator> IntoIterator for List<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self)
    }
}

impl<'a, T, A: RawAllocator> IntoIterator for &'a List<T, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, A: RawAllocator> IntoIterator for &'a mut List<T, A> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}


#[cfg(all(not(feature = "no-std"), all(test, feature = "loom")))]
mod loom_tests {
    use super::*;
    use crate::memory::alloc::Counting;

    #[test]
    fn list_can_be_handed_to_another_thread() {
        loom::model(|| {
            let mut ll = List::new();
            ll.push_back(1_u32).expect("failed to push");
            ll.push_back(2).expect("failed to push");

            let jh = loom::thread::spawn(move || {
                ll.push_front(0).expect("failed to push");
                ll.pop_back();
                ll
            });
            let ll = jh.join().expect("failed to join loom thread");
            assert_eq!(ll.iter().copied().collect::<std::vec::Vec<_>>(), [0, 1]);
        });
    }

    #[test]
    fn shared_counting_allocator_balances_across_threads() {
        loom::model(|| {
            let counting = loom::sync::Arc::new(Counting::new(Global));

            let handles: std::vec::Vec<_> = (0..2_u32)
                .map(|t| {
                    let counting = counting.clone();
                    loom::thread::spawn(move || {
                        let mut ll = List::new_in(&*counting);
                        ll.push_back(t).expect("failed to push");
                        ll.push_back(t + 1).expect("failed to push");
                        ll.len()
                    })
                })
                .collect();

            for jh in handles {
                assert_eq!(jh.join().expect("failed to join loom thread"), 2);
            }
            assert_eq!(counting.live(), 0);
        });
    }
}
