use core::alloc::Layout;
use core::marker::PhantomData;
use core::ptr::NonNull;

use super::node::ListNode;
use super::EmplaceError;
use crate::memory::alloc::{AllocResult, RawAllocator};

pub(crate) type NodePtr<T> = NonNull<ListNode<T>>;

/// Adapts a `RawAllocator` to whole list nodes.
///
/// Obtaining storage and constructing the payload are separate steps:
/// `allocate_node` hands out raw storage, `construct_payload` fills it and
/// gives the storage back if building the value fails. Teardown mirrors this
/// with `destroy_payload` followed by `deallocate_node`.
pub(crate) struct NodeAllocator<T, A: RawAllocator> {
    alloc: A,
    _marker: PhantomData<ListNode<T>>,
}

/// frees a node's storage when dropped, including while a payload
/// constructor or destructor unwinds
struct DeallocOnUnwind<'a, T, A: RawAllocator> {
    nodes: &'a NodeAllocator<T, A>,
    node: NodePtr<T>,
}

impl<'a, T, A: RawAllocator> Drop for DeallocOnUnwind<'a, T, A> {
    fn drop(&mut self) {
        // SAFETY: the node was allocated by `nodes` and never constructed
        unsafe { self.nodes.deallocate_node(self.node) };
    }
}

impl<T, A: RawAllocator> NodeAllocator<T, A> {
    pub(crate) fn new(alloc: A) -> Self {
        Self {
            alloc,
            _marker: PhantomData,
        }
    }

    pub(crate) fn allocator(&self) -> &A {
        &self.alloc
    }

    pub(crate) fn layout() -> Layout {
        Layout::new::<ListNode<T>>()
    }

    /// reserve uninitialized storage for exactly one node
    pub(crate) fn allocate_node(&self) -> AllocResult<NodePtr<T>> {
        self.alloc.allocate(Self::layout()).map(NonNull::cast)
    }

    /// release the storage of a node whose contents are already gone
    ///
    /// # Safety
    /// `node` must come from `allocate_node` and hold no live value
    pub(crate) unsafe fn deallocate_node(&self, node: NodePtr<T>) {
        self.alloc.deallocate(node.cast(), Self::layout());
    }

    /// build a payload with `ctor` and place it in `node`. if `ctor` fails or
    /// panics the storage of `node` is released before the failure propagates.
    ///
    /// # Safety
    /// `node` must come from `allocate_node` and be uninitialized
    pub(crate) unsafe fn construct_payload<E, F>(&self, node: NodePtr<T>, ctor: F) -> Result<(), E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let guard = DeallocOnUnwind { nodes: self, node };
        let res = ctor();
        core::mem::forget(guard);

        match res {
            Ok(value) => {
                self.alloc.construct(node, ListNode::new(value));
                Ok(())
            }
            Err(e) => {
                self.deallocate_node(node);
                Err(e)
            }
        }
    }

    /// allocate and construct an unlinked payload node
    pub(crate) fn create_node<E, F>(&self, ctor: F) -> Result<NodePtr<T>, EmplaceError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let node = self.allocate_node().map_err(EmplaceError::Alloc)?;
        // SAFETY: node is freshly allocated and uninitialized
        unsafe { self.construct_payload(node, ctor) }.map_err(EmplaceError::Construct)?;
        Ok(node)
    }

    /// allocate a sentinel and self-loop it
    pub(crate) fn create_sentinel(&self) -> AllocResult<NodePtr<T>> {
        let node = self.allocate_node()?;
        // SAFETY: node is freshly allocated, the sentinel is linked to itself
        // once it sits at its final address
        unsafe {
            self.alloc.construct(node, ListNode::sentinel());
            ListNode::init_to_this(node.as_ptr());
        }
        Ok(node)
    }

    /// drop whatever the node holds in place. the storage stays allocated.
    ///
    /// # Safety
    /// `node` must be constructed and unlinked from any ring it was part of,
    /// or about to be unlinked without its contents being read again
    pub(crate) unsafe fn destroy_payload(&self, node: NodePtr<T>) {
        self.alloc.destroy(node);
    }

    /// destroy and free a node in one go. the storage is freed even if the
    /// payload's destructor panics.
    ///
    /// # Safety
    /// see `destroy_payload` and `deallocate_node`
    pub(crate) unsafe fn release_node(&self, node: NodePtr<T>) {
        let _dealloc = DeallocOnUnwind { nodes: self, node };
        self.destroy_payload(node);
    }

    /// move the payload out of `node`, then destroy and free the node
    ///
    /// # Safety
    /// `node` must be a constructed, unlinked payload node from this allocator
    pub(crate) unsafe fn take_payload(&self, node: NodePtr<T>) -> Option<T> {
        let data = (*node.as_ptr()).take_data();
        self.release_node(node);
        data
    }
}

impl<T, A: RawAllocator + Clone> Clone for NodeAllocator<T, A> {
    fn clone(&self) -> Self {
        Self::new(self.alloc.clone())
    }
}
