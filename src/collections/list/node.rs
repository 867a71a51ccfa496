//! Ring topology for [`List`](super::List).
//!
//! Every node, the sentinel included, is a `ListNode<T>`. The sentinel is the
//! `Sentinel` variant and carries no payload; it is both the element before
//! the first and the element after the last. Link manipulation goes through
//! raw pointers so that no `&mut` to a node is alive while its neighbours are
//! being rewritten.

/// a node in the list, hiding whether it is the sentinel or holds data
pub(crate) struct ListNode<T> {
    internal: InternalListNode<T>,
}

/// the private internal layout of a node, either a sentinel or user-provided data
///
/// links are stored as `*const` so that `ListNode<T>` stays covariant in `T`
enum InternalListNode<T> {
    Sentinel {
        prev: *const ListNode<T>,
        next: *const ListNode<T>,
    },
    Data {
        prev: *const ListNode<T>,
        data: T,
        next: *const ListNode<T>,
    },
}

impl<T> ListNode<T> {
    /// an unlinked sentinel. it must be passed to `init_to_this` once it sits
    /// at its final address.
    pub(crate) const fn sentinel() -> Self {
        Self {
            internal: InternalListNode::Sentinel {
                prev: core::ptr::null(),
                next: core::ptr::null(),
            },
        }
    }

    /// an unlinked node holding `data`
    pub(crate) const fn new(data: T) -> Self {
        Self {
            internal: InternalListNode::Data {
                prev: core::ptr::null(),
                data,
                next: core::ptr::null(),
            },
        }
    }

    /// returns true if the node is the sentinel node
    pub(crate) fn is_sentinel(&self) -> bool {
        matches!(self.internal, InternalListNode::Sentinel { .. })
    }

    pub(crate) fn data(&self) -> Option<&T> {
        match &self.internal {
            InternalListNode::Sentinel { .. } => None,
            InternalListNode::Data { data, .. } => Some(data),
        }
    }

    pub(crate) fn data_mut(&mut self) -> Option<&mut T> {
        match &mut self.internal {
            InternalListNode::Sentinel { .. } => None,
            InternalListNode::Data { data, .. } => Some(data),
        }
    }

    /// move the payload out, turning the node into an (unlinked) sentinel
    /// shell that is trivial to drop
    pub(crate) fn take_data(&mut self) -> Option<T> {
        let shell = InternalListNode::Sentinel {
            prev: core::ptr::null(),
            next: core::ptr::null(),
        };
        match core::mem::replace(&mut self.internal, shell) {
            InternalListNode::Sentinel { prev, next } => {
                self.internal = InternalListNode::Sentinel { prev, next };
                None
            }
            InternalListNode::Data { data, .. } => Some(data),
        }
    }

    pub(crate) fn prev(&self) -> *mut ListNode<T> {
        match &self.internal {
            InternalListNode::Sentinel { prev, .. } | InternalListNode::Data { prev, .. } => {
                *prev as *mut ListNode<T>
            }
        }
    }

    pub(crate) fn next(&self) -> *mut ListNode<T> {
        match &self.internal {
            InternalListNode::Sentinel { next, .. } | InternalListNode::Data { next, .. } => {
                *next as *mut ListNode<T>
            }
        }
    }

    fn set_prev(&mut self, new_prev: *mut ListNode<T>) {
        match &mut self.internal {
            InternalListNode::Sentinel { prev, .. } | InternalListNode::Data { prev, .. } => {
                *prev = new_prev as *const ListNode<T>
            }
        }
    }

    fn set_next(&mut self, new_next: *mut ListNode<T>) {
        match &mut self.internal {
            InternalListNode::Sentinel { next, .. } | InternalListNode::Data { next, .. } => {
                *next = new_next as *const ListNode<T>
            }
        }
    }

    /// self-loop a freshly placed sentinel, giving a valid empty ring
    ///
    /// # Safety
    /// `node` must point to a live `ListNode<T>`
    pub(crate) unsafe fn init_to_this(node: *mut ListNode<T>) {
        (*node).set_prev(node);
        (*node).set_next(node);
    }

    /// splice `node` into the ring immediately before `before`
    ///
    /// # Safety
    /// `node` must be live and not linked into any ring; `before` must be a
    /// live node of a closed ring
    // Before: (before.prev) <-> (before)
    // After: (before.prev) <-> (node) <-> (before)
    pub(crate) unsafe fn hook(node: *mut ListNode<T>, before: *mut ListNode<T>) {
        debug_assert!(node != before);
        let prev = (*before).prev();
        debug_assert!(!prev.is_null());

        (*node).set_next(before);
        (*node).set_prev(prev);
        (*prev).set_next(node);
        (*before).set_prev(node);
    }

    /// remove `node` from its ring, leaving its old neighbours linked to each
    /// other. the links of `node` are nulled.
    ///
    /// # Safety
    /// `node` must be a live, linked node that is not the anchor of its ring
    pub(crate) unsafe fn unhook(node: *mut ListNode<T>) {
        let prev = (*node).prev();
        let next = (*node).next();
        debug_assert!(!prev.is_null() && !next.is_null());

        (*prev).set_next(next);
        (*next).set_prev(prev);
        (*node).set_prev(core::ptr::null_mut());
        (*node).set_next(core::ptr::null_mut());
    }

    /// exchange the rings anchored at `a` and `b`. the anchors keep their
    /// addresses; the nodes hanging off them change owner.
    ///
    /// an empty ring is a self-loop, so swapping fields verbatim would leave
    /// `a` pointing at `b` and vice versa. self-loops are redirected to the
    /// receiving anchor instead.
    ///
    /// # Safety
    /// `a` and `b` must be anchors of closed rings
    pub(crate) unsafe fn swap_anchors(a: *mut ListNode<T>, b: *mut ListNode<T>) {
        if a == b {
            return;
        }

        let a_empty = (*a).next() == a;
        let b_empty = (*b).next() == b;

        let (a_prev, a_next) = if b_empty {
            (a, a)
        } else {
            ((*b).prev(), (*b).next())
        };
        let (b_prev, b_next) = if a_empty {
            (b, b)
        } else {
            ((*a).prev(), (*a).next())
        };

        (*a).set_prev(a_prev);
        (*a).set_next(a_next);
        (*b).set_prev(b_prev);
        (*b).set_next(b_next);

        // the end nodes of each transplanted ring still point at their old
        // anchor
        if !b_empty {
            (*a_prev).set_next(a);
            (*a_next).set_prev(a);
        }
        if !a_empty {
            (*b_prev).set_next(b);
            (*b_next).set_prev(b);
        }
    }
}

impl<T: core::fmt::Debug> core::fmt::Debug for ListNode<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.internal {
            InternalListNode::Sentinel { .. } => f
                .debug_struct("Sentinel")
                .field("prev", &self.prev())
                .field("self", &core::ptr::addr_of!(*self))
                .field("next", &self.next())
                .finish(),
            InternalListNode::Data { data, .. } => f
                .debug_struct("Node")
                .field("prev", &self.prev())
                .field("self", &core::ptr::addr_of!(*self))
                .field("data", data)
                .field("next", &self.next())
                .finish(),
        }
    }
}

#[cfg(test)]
mod test {
    use std::boxed::Box;
    use std::vec::Vec;

    use super::*;

    fn boxed_sentinel() -> *mut ListNode<u32> {
        let s = Box::into_raw(Box::new(ListNode::sentinel()));
        unsafe { ListNode::init_to_this(s) };
        s
    }

    fn boxed_node(v: u32) -> *mut ListNode<u32> {
        Box::into_raw(Box::new(ListNode::new(v)))
    }

    /// walk forward from the anchor, checking every back link on the way
    unsafe fn collect(anchor: *mut ListNode<u32>) -> Vec<u32> {
        let mut out = Vec::new();
        let mut curr = (*anchor).next();
        let mut prev = anchor;
        while curr != anchor {
            assert_eq!((*curr).prev(), prev, "ring is not closed");
            out.push(*(*curr).data().expect("payload node"));
            prev = curr;
            curr = (*curr).next();
        }
        assert_eq!((*anchor).prev(), prev, "ring is not closed");
        out
    }

    unsafe fn free_ring(anchor: *mut ListNode<u32>) {
        let mut curr = (*anchor).next();
        while curr != anchor {
            let next = (*curr).next();
            drop(Box::from_raw(curr));
            curr = next;
        }
        drop(Box::from_raw(anchor));
    }

    #[test]
    fn init_to_this_builds_self_loop() {
        let s = boxed_sentinel();
        unsafe {
            assert_eq!((*s).next(), s);
            assert_eq!((*s).prev(), s);
            assert!((*s).is_sentinel());
            assert!((*s).data().is_none());
            free_ring(s);
        }
    }

    #[test]
    fn hook_before_sentinel_appends() {
        let s = boxed_sentinel();
        unsafe {
            for v in [1, 2, 3] {
                ListNode::hook(boxed_node(v), s);
            }
            assert_eq!(collect(s), [1, 2, 3]);
            free_ring(s);
        }
    }

    #[test]
    fn hook_before_first_prepends() {
        let s = boxed_sentinel();
        unsafe {
            for v in [1, 2, 3] {
                ListNode::hook(boxed_node(v), (*s).next());
            }
            assert_eq!(collect(s), [3, 2, 1]);
            free_ring(s);
        }
    }

    #[test]
    fn unhook_relinks_neighbours() {
        let s = boxed_sentinel();
        unsafe {
            let middle = boxed_node(2);
            ListNode::hook(boxed_node(1), s);
            ListNode::hook(middle, s);
            ListNode::hook(boxed_node(3), s);

            ListNode::unhook(middle);
            assert!((*middle).next().is_null());
            assert!((*middle).prev().is_null());
            assert_eq!(collect(s), [1, 3]);

            drop(Box::from_raw(middle));
            free_ring(s);
        }
    }

    #[test]
    fn unhook_last_node_restores_self_loop() {
        let s = boxed_sentinel();
        unsafe {
            let n = boxed_node(7);
            ListNode::hook(n, s);
            ListNode::unhook(n);
            assert_eq!((*s).next(), s);
            assert_eq!((*s).prev(), s);
            drop(Box::from_raw(n));
            free_ring(s);
        }
    }

    #[test]
    fn take_data_leaves_a_sentinel_shell() {
        let mut n = ListNode::new(42_u32);
        assert_eq!(n.take_data(), Some(42));
        assert!(n.is_sentinel());
        assert_eq!(n.take_data(), None);
    }

    #[test]
    fn swap_anchors_both_populated() {
        let a = boxed_sentinel();
        let b = boxed_sentinel();
        unsafe {
            ListNode::hook(boxed_node(1), a);
            ListNode::hook(boxed_node(2), a);
            ListNode::hook(boxed_node(9), b);

            ListNode::swap_anchors(a, b);
            assert_eq!(collect(a), [9]);
            assert_eq!(collect(b), [1, 2]);
            free_ring(a);
            free_ring(b);
        }
    }

    #[test]
    fn swap_anchors_with_empty_side() {
        let a = boxed_sentinel();
        let b = boxed_sentinel();
        unsafe {
            ListNode::hook(boxed_node(1), a);
            ListNode::hook(boxed_node(2), a);

            ListNode::swap_anchors(a, b);
            assert_eq!((*a).next(), a);
            assert_eq!((*a).prev(), a);
            assert_eq!(collect(b), [1, 2]);

            ListNode::swap_anchors(a, b);
            assert_eq!(collect(a), [1, 2]);
            assert_eq!((*b).next(), b);
            assert_eq!((*b).prev(), b);
            free_ring(a);
            free_ring(b);
        }
    }

    #[test]
    fn swap_anchors_both_empty_stay_self_looped() {
        let a = boxed_sentinel();
        let b = boxed_sentinel();
        unsafe {
            ListNode::swap_anchors(a, b);
            assert_eq!((*a).next(), a);
            assert_eq!((*b).prev(), b);
            free_ring(a);
            free_ring(b);
        }
    }

    #[test]
    fn swap_anchors_with_itself_is_a_no_op() {
        let a = boxed_sentinel();
        unsafe {
            ListNode::hook(boxed_node(5), a);
            ListNode::swap_anchors(a, a);
            assert_eq!(collect(a), [5]);
            free_ring(a);
        }
    }
}
