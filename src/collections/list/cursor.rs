use core::convert::Infallible;

use super::node::ListNode;
use super::{alloc_only, EmplaceError, List};
use crate::memory::alloc::{AllocResult, Global, RawAllocator};

/// Where a cursor points: a node of the ring plus that node's index. The
/// sentinel sits at index `len`.
struct Position<T> {
    node: *mut ListNode<T>,
    index: usize,
}

impl<T> Clone for Position<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Position<T> {}

impl<T> Position<T> {
    fn is_sentinel(&self) -> bool {
        // SAFETY: a position always refers to a live node of its list
        unsafe { (*self.node).is_sentinel() }
    }

    fn index(&self) -> Option<usize> {
        if self.is_sentinel() {
            None
        } else {
            Some(self.index)
        }
    }

    fn move_next(&mut self, len: usize) {
        let was_sentinel = self.is_sentinel();
        // SAFETY: the ring is closed, so next is a live node
        self.node = unsafe { (*self.node).next() };
        self.index = if self.is_sentinel() {
            len
        } else if was_sentinel {
            0
        } else {
            self.index + 1
        };
    }

    fn move_prev(&mut self, len: usize) {
        let was_sentinel = self.is_sentinel();
        // SAFETY: the ring is closed, so prev is a live node
        self.node = unsafe { (*self.node).prev() };
        self.index = if self.is_sentinel() {
            len
        } else if was_sentinel {
            len - 1
        } else {
            self.index - 1
        };
    }

    fn data<'a>(&self) -> Option<&'a T> {
        // SAFETY: the owning cursor borrows the list for 'a
        unsafe { (*self.node).data() }
    }

    fn peek_next<'a>(&self) -> Option<&'a T> {
        // SAFETY: the ring is closed, so next is a live node
        unsafe { (*(*self.node).next()).data() }
    }

    fn peek_prev<'a>(&self) -> Option<&'a T> {
        // SAFETY: the ring is closed, so prev is a live node
        unsafe { (*(*self.node).prev()).data() }
    }
}

/// A read-only position in a [`List`].
///
/// A cursor always points at a node of the ring: either an element or the
/// sentinel ("end"), which sits between the last and the first element.
/// Moving past either end lands on the sentinel; moving on from the sentinel
/// wraps around.
///
/// A [`CursorMut`] can be turned into a `Cursor`, but not the other way:
///
/// ```compile_fail
/// use sentinel_list::collections::list::{CursorMut, List};
///
/// let list: List<u32> = List::new();
/// let cursor = list.cursor_front();
/// let _: CursorMut<'_, u32> = cursor.into();
/// ```
pub struct Cursor<'a, T, A: RawAllocator = Global> {
    list: &'a List<T, A>,
    pos: Position<T>,
}

impl<'a, T, A: RawAllocator> Cursor<'a, T, A> {
    pub(super) fn new(list: &'a List<T, A>, node: *mut ListNode<T>, index: usize) -> Self {
        Self {
            list,
            pos: Position { node, index },
        }
    }

    /// the index of the current element, or None on the sentinel
    pub fn index(&self) -> Option<usize> {
        self.pos.index()
    }

    /// returns true if the cursor is on the sentinel
    pub fn is_end(&self) -> bool {
        self.pos.is_sentinel()
    }

    pub fn move_next(&mut self) {
        self.pos.move_next(self.list.len);
    }

    pub fn move_prev(&mut self) {
        self.pos.move_prev(self.list.len);
    }

    /// the element under the cursor, or None on the sentinel
    pub fn current(&self) -> Option<&'a T> {
        self.pos.data()
    }

    pub fn peek_next(&self) -> Option<&'a T> {
        self.pos.peek_next()
    }

    pub fn peek_prev(&self) -> Option<&'a T> {
        self.pos.peek_prev()
    }

    pub fn list(&self) -> &'a List<T, A> {
        self.list
    }
}

impl<'a, T, A: RawAllocator> Clone for Cursor<'a, T, A> {
    fn clone(&self) -> Self {
        Self {
            list: self.list,
            pos: self.pos,
        }
    }
}

/// cursors are equal when they point at the same node
impl<'a, T, A: RawAllocator> PartialEq for Cursor<'a, T, A> {
    fn eq(&self, other: &Self) -> bool {
        self.pos.node == other.pos.node
    }
}

impl<'a, T, A: RawAllocator> Eq for Cursor<'a, T, A> {}

impl<'a, T: core::fmt::Debug, A: RawAllocator> core::fmt::Debug for Cursor<'a, T, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Cursor")
            .field(self.list)
            .field(&self.index())
            .finish()
    }
}

/// A position in a [`List`] that can edit the list around it.
///
/// Insertions never move the cursor off its node. Erasing the current
/// element moves the cursor to the element that followed it.
pub struct CursorMut<'a, T, A: RawAllocator = Global> {
    list: &'a mut List<T, A>,
    pos: Position<T>,
}

impl<'a, T, A: RawAllocator> CursorMut<'a, T, A> {
    pub(super) fn new(list: &'a mut List<T, A>, node: *mut ListNode<T>, index: usize) -> Self {
        Self {
            list,
            pos: Position { node, index },
        }
    }

    /// the index of the current element, or None on the sentinel
    pub fn index(&self) -> Option<usize> {
        self.pos.index()
    }

    /// returns true if the cursor is on the sentinel
    pub fn is_end(&self) -> bool {
        self.pos.is_sentinel()
    }

    pub fn move_next(&mut self) {
        self.pos.move_next(self.list.len);
    }

    pub fn move_prev(&mut self) {
        self.pos.move_prev(self.list.len);
    }

    /// the element under the cursor, or None on the sentinel
    pub fn current(&mut self) -> Option<&mut T> {
        // SAFETY: the cursor holds the list mutably borrowed
        unsafe { (*self.pos.node).data_mut() }
    }

    pub fn peek_next(&mut self) -> Option<&mut T> {
        // SAFETY: the ring is closed and the list is mutably borrowed
        unsafe { (*(*self.pos.node).next()).data_mut() }
    }

    pub fn peek_prev(&mut self) -> Option<&mut T> {
        // SAFETY: the ring is closed and the list is mutably borrowed
        unsafe { (*(*self.pos.node).prev()).data_mut() }
    }

    /// a read-only view of this cursor, for as long as it is borrowed
    pub fn as_cursor(&self) -> Cursor<'_, T, A> {
        Cursor {
            list: &*self.list,
            pos: self.pos,
        }
    }

    /// insert `value` before the current node. on the sentinel this appends.
    /// the cursor keeps pointing at the same node.
    pub fn insert_before(&mut self, value: T) -> AllocResult<()> {
        self.list
            .insert_node(self.pos.node, || Ok::<_, Infallible>(value))
            .map_err(alloc_only)?;
        self.pos.index += 1;
        Ok(())
    }

    /// insert `value` after the current node. on the sentinel this prepends.
    /// the cursor keeps pointing at the same node.
    pub fn insert_after(&mut self, value: T) -> AllocResult<()> {
        // SAFETY: the ring is closed, so next is a live node
        let next = unsafe { (*self.pos.node).next() };
        self.list
            .insert_node(next, || Ok::<_, Infallible>(value))
            .map_err(alloc_only)?;
        if self.pos.is_sentinel() {
            self.pos.index += 1;
        }
        Ok(())
    }

    /// insert `value` before the current node and move the cursor onto the
    /// new element
    pub fn insert(&mut self, value: T) -> AllocResult<()> {
        self.emplace(|| value).map(|_| ())
    }

    /// allocate a node before the current one, build its element with
    /// `ctor` and move the cursor onto it
    pub fn emplace<F>(&mut self, ctor: F) -> AllocResult<&mut T>
    where
        F: FnOnce() -> T,
    {
        self.try_emplace(|| Ok::<_, Infallible>(ctor()))
            .map_err(alloc_only)
    }

    /// like `emplace` with a fallible constructor. on failure neither the
    /// list nor the cursor change.
    pub fn try_emplace<E, F>(&mut self, ctor: F) -> Result<&mut T, EmplaceError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let node = self.list.insert_node(self.pos.node, ctor)?;
        // the new node takes over the index of the old current node
        self.pos.node = node.as_ptr();
        // SAFETY: the node was just linked in and holds data
        Ok(unsafe { List::<T, A>::payload_mut(node) })
    }

    /// insert every value from `iter` before the current node, keeping their
    /// order, and return how many were inserted. stops at the first
    /// allocation failure; values inserted up to that point stay.
    pub fn insert_iter_before<I>(&mut self, iter: I) -> AllocResult<usize>
    where
        I: IntoIterator<Item = T>,
    {
        let mut inserted = 0;
        for value in iter {
            self.insert_before(value)?;
            inserted += 1;
        }
        Ok(inserted)
    }

    /// if the current node is the sentinel, do nothing and return false
    ///
    /// otherwise drop the current element, free its node and advance the
    /// cursor to the following node
    pub fn erase_current(&mut self) -> bool {
        match self.unlink_current() {
            Some(node) => {
                // SAFETY: the node is unlinked and owned by us now
                unsafe { self.list.nodes.release_node(node) };
                true
            }
            None => false,
        }
    }

    /// like `erase_current`, but hand the element back instead of dropping it
    pub fn remove_current(&mut self) -> Option<T> {
        let node = self.unlink_current()?;
        // SAFETY: the node is unlinked and owned by us now
        unsafe { self.list.nodes.take_payload(node) }
    }

    /// erase up to `count` elements starting at the current one, stopping
    /// early at the sentinel. returns how many were erased.
    pub fn erase_many(&mut self, count: usize) -> usize {
        let mut erased = 0;
        while erased < count && self.erase_current() {
            erased += 1;
        }
        erased
    }

    fn unlink_current(&mut self) -> Option<super::NodePtr<T>> {
        if self.pos.is_sentinel() {
            return None;
        }

        let curr = self.pos.node;
        // SAFETY: curr is a payload node of the list
        unsafe {
            self.pos.node = (*curr).next();
            Some(self.list.unlink_node(curr))
        }
    }
}

impl<'a, T, A: RawAllocator> From<CursorMut<'a, T, A>> for Cursor<'a, T, A> {
    fn from(cursor: CursorMut<'a, T, A>) -> Self {
        Cursor {
            list: cursor.list,
            pos: cursor.pos,
        }
    }
}

impl<'a, T: core::fmt::Debug, A: RawAllocator> core::fmt::Debug for CursorMut<'a, T, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("CursorMut")
            .field(&*self.list)
            .field(&self.index())
            .finish()
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod test {
    use std::vec::Vec;

    use super::*;
    use crate::memory::alloc::{AllocError, SlotPool};

    fn list_of(values: &[u32]) -> List<u32> {
        let mut ll = List::new();
        ll.extend(values);
        ll
    }

    fn forward(ll: &List<u32, impl RawAllocator>) -> Vec<u32> {
        ll.iter().copied().collect()
    }

    #[test]
    fn cursor_on_empty_list_never_returns_data() {
        let ll = List::<u32>::new();
        let mut cursor = ll.cursor_front();
        assert!(cursor.is_end());
        assert!(cursor.current().is_none());
        cursor.move_next();
        assert!(cursor.current().is_none());
        cursor.move_prev();
        assert!(cursor.current().is_none());
        assert_eq!(cursor, ll.cursor_end());
    }

    #[test]
    fn cursor_iterates_through_values_in_both_directions() {
        let ll = list_of(&[1, 2, 3]);
        let mut cursor = ll.cursor_front();
        let mut seen = Vec::new();
        while let Some(v) = cursor.current() {
            seen.push(*v);
            cursor.move_next();
        }
        assert_eq!(seen, [1, 2, 3]);
        assert!(cursor.is_end());

        seen.clear();
        cursor.move_prev();
        while let Some(v) = cursor.current() {
            seen.push(*v);
            cursor.move_prev();
        }
        assert_eq!(seen, [3, 2, 1]);
    }

    #[test]
    fn moving_from_the_sentinel_wraps_around() {
        let ll = list_of(&[1, 2, 3]);
        let mut cursor = ll.cursor_end();
        cursor.move_next();
        assert_eq!(cursor.current(), Some(&1));
        assert_eq!(cursor.index(), Some(0));

        let mut cursor = ll.cursor_end();
        cursor.move_prev();
        assert_eq!(cursor.current(), Some(&3));
        assert_eq!(cursor.index(), Some(2));
    }

    #[test]
    fn index_tracks_position() {
        let ll = list_of(&[10, 20, 30, 40]);
        for i in 0..4 {
            let cursor = ll.cursor_at(i);
            assert_eq!(cursor.index(), Some(i));
            assert_eq!(cursor.current(), Some(&((i as u32 + 1) * 10)));
        }
        assert!(ll.cursor_at(4).is_end());
        assert_eq!(ll.cursor_at(4).index(), None);
        assert_eq!(ll.cursor_back().index(), Some(3));
    }

    #[test]
    fn peek_looks_at_neighbours() {
        let ll = list_of(&[1, 2]);
        let cursor = ll.cursor_front();
        assert_eq!(cursor.peek_prev(), None);
        assert_eq!(cursor.peek_next(), Some(&2));
        let cursor = ll.cursor_back();
        assert_eq!(cursor.peek_prev(), Some(&1));
        assert_eq!(cursor.peek_next(), None);
    }

    #[test]
    fn cursors_compare_by_node() {
        let ll = list_of(&[5, 5]);
        let a = ll.cursor_front();
        let mut b = ll.cursor_back();
        assert_ne!(a, b);
        b.move_prev();
        assert_eq!(a, b);
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn cursor_can_mutate_elements() {
        let mut ll = list_of(&[1, 2, 3]);
        let mut cursor = ll.cursor_front_mut();
        while let Some(v) = cursor.current() {
            *v *= 10;
            cursor.move_next();
        }
        assert_eq!(forward(&ll), [10, 20, 30]);
    }

    #[test]
    fn erasing_the_middle_element_advances_to_its_successor() {
        let mut ll = list_of(&[1, 2, 3]);
        let mut cursor = ll.cursor_at_mut(1);
        assert!(cursor.erase_current());
        assert_eq!(cursor.current(), Some(&mut 3));
        assert_eq!(cursor.index(), Some(1));
        assert_eq!(ll.len(), 2);
        assert_eq!(forward(&ll), [1, 3]);
    }

    #[test]
    fn erasing_the_sentinel_does_nothing() {
        let mut ll = list_of(&[1, 2]);
        let mut cursor = ll.cursor_end_mut();
        assert!(!cursor.erase_current());
        assert!(cursor.remove_current().is_none());
        assert!(cursor.is_end());
        assert_eq!(forward(&ll), [1, 2]);
    }

    #[test]
    fn erasing_the_last_element_lands_on_the_sentinel() {
        let mut ll = list_of(&[1, 2]);
        let mut cursor = ll.cursor_back_mut();
        assert_eq!(cursor.remove_current(), Some(2));
        assert!(cursor.is_end());
        assert_eq!(cursor.index(), None);
        assert_eq!(forward(&ll), [1]);
    }

    #[test]
    fn erase_many_stops_at_the_sentinel() {
        let mut ll = list_of(&[1, 2, 3, 4]);
        let mut cursor = ll.cursor_at_mut(2);
        assert_eq!(cursor.erase_many(10), 2);
        assert!(cursor.is_end());
        assert_eq!(forward(&ll), [1, 2]);

        let mut cursor = ll.cursor_front_mut();
        assert_eq!(cursor.erase_many(0), 0);
        assert_eq!(forward(&ll), [1, 2]);
    }

    #[test]
    fn insert_before_keeps_the_cursor_on_its_element() {
        let mut ll = list_of(&[1, 3]);
        let mut cursor = ll.cursor_at_mut(1);
        cursor.insert_before(2).expect("failed to insert");
        assert_eq!(cursor.current(), Some(&mut 3));
        assert_eq!(cursor.index(), Some(2));
        assert_eq!(cursor.peek_prev(), Some(&mut 2));
        assert_eq!(forward(&ll), [1, 2, 3]);
    }

    #[test]
    fn insert_moves_onto_the_new_element() {
        let mut ll = list_of(&[1, 3]);
        let mut cursor = ll.cursor_at_mut(1);
        cursor.insert(2).expect("failed to insert");
        assert_eq!(cursor.current(), Some(&mut 2));
        assert_eq!(cursor.index(), Some(1));
        // the original element is untouched and right behind the new one
        assert_eq!(cursor.peek_next(), Some(&mut 3));
        assert_eq!(forward(&ll), [1, 2, 3]);
    }

    #[test]
    fn insert_after_keeps_the_cursor_on_its_element() {
        let mut ll = list_of(&[1, 3]);
        let mut cursor = ll.cursor_front_mut();
        cursor.insert_after(2).expect("failed to insert");
        assert_eq!(cursor.current(), Some(&mut 1));
        assert_eq!(cursor.index(), Some(0));
        assert_eq!(forward(&ll), [1, 2, 3]);
    }

    #[test]
    fn inserting_at_the_sentinel_appends_and_prepends() {
        let mut ll = List::<u32>::new();
        let mut cursor = ll.cursor_end_mut();
        cursor.insert_before(2).expect("failed to insert");
        cursor.insert_after(1).expect("failed to insert");
        cursor.insert_before(3).expect("failed to insert");
        assert!(cursor.is_end());
        assert_eq!(cursor.as_cursor().list().len(), 3);
        assert_eq!(forward(&ll), [1, 2, 3]);
    }

    #[test]
    fn insert_iter_before_keeps_order() {
        let mut ll = list_of(&[1, 5]);
        let mut cursor = ll.cursor_at_mut(1);
        let n = cursor.insert_iter_before([2, 3, 4]).expect("failed to insert");
        assert_eq!(n, 3);
        assert_eq!(cursor.current(), Some(&mut 5));
        assert_eq!(cursor.index(), Some(4));
        assert_eq!(forward(&ll), [1, 2, 3, 4, 5]);
    }

    #[test]
    fn failed_emplace_keeps_cursor_and_list() {
        let mut ll = list_of(&[1, 2]);
        let mut cursor = ll.cursor_back_mut();
        let res = cursor.try_emplace(|| Err::<u32, _>(()));
        assert!(matches!(res, Err(EmplaceError::Construct(()))));
        assert_eq!(cursor.current(), Some(&mut 2));
        assert_eq!(cursor.index(), Some(1));
        assert_eq!(forward(&ll), [1, 2]);
    }

    #[test]
    fn insert_reports_out_of_memory() {
        let pool = SlotPool::for_list::<u32>(2).expect("failed to create pool");
        let mut ll = List::new_in(&pool);
        ll.push_back(1).expect("failed to push");
        let mut cursor = ll.cursor_front_mut();
        let res = cursor.insert_before(0);
        assert!(matches!(res, Err(AllocError::OutOfMemory { .. })));
        assert_eq!(cursor.index(), Some(0));
        let res = cursor.insert_iter_before([7, 8]);
        assert!(matches!(res, Err(AllocError::OutOfMemory { .. })));
        assert_eq!(forward(&ll), [1]);
    }

    #[test]
    fn cursor_types_default_to_the_global_allocator() {
        let mut ll = list_of(&[1, 2]);
        {
            let cursor: CursorMut<'_, u32> = ll.cursor_front_mut();
            assert_eq!(cursor.index(), Some(0));
        }
        let cursor: Cursor<'_, u32> = ll.cursor_back();
        assert_eq!(cursor.current(), Some(&2));
    }

    #[test]
    fn cursor_mut_converts_into_cursor() {
        let mut ll = list_of(&[1, 2, 3]);
        let mut cursor = ll.cursor_front_mut();
        cursor.move_next();
        let view = cursor.as_cursor();
        assert_eq!(view.current(), Some(&2));
        let cursor: Cursor<'_, u32, _> = cursor.into();
        assert_eq!(cursor.current(), Some(&2));
        assert_eq!(cursor.index(), Some(1));
    }
}
