use core::iter::FusedIterator;
use core::marker::PhantomData;

use super::node::ListNode;
use super::List;
use crate::memory::alloc::RawAllocator;

/// Borrowing iterator over the elements of a [`List`], front to back.
///
/// Both ends move inward and the iterator stops once they meet, so it never
/// yields the sentinel.
pub struct Iter<'a, T> {
    head: *const ListNode<T>,
    tail: *const ListNode<T>,
    len: usize,
    _marker: PhantomData<&'a ListNode<T>>,
}

impl<'a, T> Iter<'a, T> {
    pub(super) fn new(head: *const ListNode<T>, tail: *const ListNode<T>, len: usize) -> Self {
        Self {
            head,
            tail,
            len,
            _marker: PhantomData,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        // # Safety
        // len > 0, so head is a payload node of the borrowed list
        unsafe {
            let to_return = &*self.head;
            self.head = to_return.next();
            self.len -= 1;
            to_return.data()
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        // # Safety
        // len > 0, so tail is a payload node of the borrowed list
        unsafe {
            let to_return = &*self.tail;
            self.tail = to_return.prev();
            self.len -= 1;
            to_return.data()
        }
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}

impl<'a, T> FusedIterator for Iter<'a, T> {}

impl<'a, T> Clone for Iter<'a, T> {
    fn clone(&self) -> Self {
        Self::new(self.head, self.tail, self.len)
    }
}

// SAFETY: an Iter only hands out shared references
unsafe impl<'a, T: Sync> Send for Iter<'a, T> {}
unsafe impl<'a, T: Sync> Sync for Iter<'a, T> {}

impl<'a, T: core::fmt::Debug> core::fmt::Debug for Iter<'a, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

/// Mutably borrowing iterator over the elements of a [`List`].
pub struct IterMut<'a, T> {
    head: *mut ListNode<T>,
    tail: *mut ListNode<T>,
    len: usize,
    _marker: PhantomData<&'a mut ListNode<T>>,
}

impl<'a, T> IterMut<'a, T> {
    pub(super) fn new(head: *mut ListNode<T>, tail: *mut ListNode<T>, len: usize) -> Self {
        Self {
            head,
            tail,
            len,
            _marker: PhantomData,
        }
    }
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        // # Safety
        // len > 0, so head is a payload node not yet handed out
        unsafe {
            let to_return = &mut *self.head;
            self.head = to_return.next();
            self.len -= 1;
            to_return.data_mut()
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'a, T> DoubleEndedIterator for IterMut<'a, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        // # Safety
        // len > 0, so tail is a payload node not yet handed out
        unsafe {
            let to_return = &mut *self.tail;
            self.tail = to_return.prev();
            self.len -= 1;
            to_return.data_mut()
        }
    }
}

impl<'a, T> ExactSizeIterator for IterMut<'a, T> {}

impl<'a, T> FusedIterator for IterMut<'a, T> {}

// SAFETY: an IterMut behaves like a `&mut T` for each element it yields
unsafe impl<'a, T: Send> Send for IterMut<'a, T> {}
unsafe impl<'a, T: Sync> Sync for IterMut<'a, T> {}

/// Owning iterator, draining a [`List`] from either end.
pub struct IntoIter<T, A: RawAllocator> {
    list: List<T, A>,
}

impl<T, A: RawAllocator> IntoIter<T, A> {
    pub(super) fn new(list: List<T, A>) -> Self {
        Self { list }
    }
}

impl<T, A: RawAllocator> Iterator for IntoIter<T, A> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.list.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.list.len(), Some(self.list.len()))
    }
}

impl<T, A: RawAllocator> DoubleEndedIterator for IntoIter<T, A> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.list.pop_back()
    }
}

impl<T, A: RawAllocator> ExactSizeIterator for IntoIter<T, A> {}

impl<T, A: RawAllocator> FusedIterator for IntoIter<T, A> {}

impl<T: core::fmt::Debug, A: RawAllocator> core::fmt::Debug for IntoIter<T, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("IntoIter").field(&self.list).finish()
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod iter_test {
    use std::vec::Vec;

    use crate::collections::list::List;

    fn list_of(values: &[u32]) -> List<u32> {
        let mut ll = List::new();
        ll.extend(values);
        ll
    }

    #[test]
    fn iter_on_empty_list_yields_nothing() {
        let ll = List::<u32>::new();
        let mut iter = ll.iter();
        assert_eq!(iter.len(), 0);
        assert!(iter.next().is_none());
        assert!(iter.next_back().is_none());
    }

    #[test]
    fn iter_goes_front_to_back() {
        let ll = list_of(&[1, 2, 3]);
        let values: Vec<u32> = ll.iter().copied().collect();
        assert_eq!(values, [1, 2, 3]);
    }

    #[test]
    fn rev_goes_back_to_front() {
        let ll = list_of(&[1, 2, 3]);
        let values: Vec<u32> = ll.iter().rev().copied().collect();
        assert_eq!(values, [3, 2, 1]);
    }

    #[test]
    fn both_ends_meet_in_the_middle() {
        let ll = list_of(&[1, 2, 3, 4, 5]);
        let mut iter = ll.iter();
        assert_eq!(iter.next(), Some(&1));
        assert_eq!(iter.next_back(), Some(&5));
        assert_eq!(iter.len(), 3);
        assert_eq!(iter.next_back(), Some(&4));
        assert_eq!(iter.next(), Some(&2));
        assert_eq!(iter.next(), Some(&3));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);
    }

    #[test]
    fn clone_iterates_independently() {
        let ll = list_of(&[1, 2]);
        let mut iter = ll.iter();
        iter.next();
        let copy = iter.clone();
        assert_eq!(iter.next(), Some(&2));
        assert_eq!(copy.copied().collect::<Vec<_>>(), [2]);
        assert_eq!(std::format!("{:?}", ll.iter()), "[1, 2]");
    }

    #[test]
    fn iter_mut_can_update_values() {
        let mut ll = list_of(&[1, 2, 3]);
        for v in ll.iter_mut() {
            *v += 1;
        }
        for v in (&mut ll).into_iter().rev().take(1) {
            *v *= 10;
        }
        assert_eq!(ll.iter().copied().collect::<Vec<_>>(), [2, 3, 40]);
    }

    #[test]
    fn into_iter_drains_from_both_ends() {
        let ll = list_of(&[1, 2, 3, 4]);
        let mut iter = ll.into_iter();
        assert_eq!(iter.len(), 4);
        assert_eq!(iter.next(), Some(1));
        assert_eq!(iter.next_back(), Some(4));
        assert_eq!(iter.collect::<Vec<_>>(), [2, 3]);
    }

    #[test]
    fn for_loop_over_reference() {
        let ll = list_of(&[4, 5]);
        let mut sum = 0;
        for v in &ll {
            sum += *v;
        }
        assert_eq!(sum, 9);
    }

    #[test]
    fn dropping_into_iter_drops_remaining_elements() {
        use std::rc::Rc;

        let marker = Rc::new(());
        let mut ll = List::new();
        for _ in 0..3 {
            ll.push_back(marker.clone()).expect("failed to push");
        }
        let mut iter = ll.into_iter();
        drop(iter.next());
        assert_eq!(Rc::strong_count(&marker), 3);
        drop(iter);
        assert_eq!(Rc::strong_count(&marker), 1);
    }
}
