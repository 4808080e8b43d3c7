//! A singly-linked list whose nodes come from a [`Resource`].

use std::{
    fmt,
    marker::PhantomData,
    ops::{Index, IndexMut},
    ptr::NonNull,
};

use crate::{
    memory::{Resource, SystemResource},
    Error, Result,
};

/// One heap node of a [`List`]. Exposed so resources can be named for it.
pub struct ListNode<T> {
    value: T,
    next: Option<NonNull<ListNode<T>>>,
}

/// Singly-linked list with `O(1)` push at both ends and `O(1)` `pop_front`.
///
/// There are no back links, so `pop_back` walks from the head to find the
/// new tail.
pub struct List<T, R: Resource<ListNode<T>> = SystemResource> {
    head: Option<NonNull<ListNode<T>>>,
    tail: Option<NonNull<ListNode<T>>>,
    len: usize,
    resource: R,
    _marker: PhantomData<T>,
}

impl<T, R: Resource<ListNode<T>>> List<T, R> {
    pub fn new() -> Self
    where
        R: Default,
    {
        Self::new_in(R::default())
    }

    pub fn new_in(resource: R) -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
            resource,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push_front(&mut self, value: T) -> Result<()> {
        let node = self.resource.allocate(ListNode {
            value,
            next: self.head,
        })?;
        if self.tail.is_none() {
            self.tail = Some(node);
        }
        self.head = Some(node);
        self.len += 1;
        Ok(())
    }

    pub fn push_back(&mut self, value: T) -> Result<()> {
        let node = self.resource.allocate(ListNode { value, next: None })?;
        match self.tail {
            // SAFETY: `tail` is a live node owned by this list.
            Some(mut tail) => unsafe { tail.as_mut().next = Some(node) },
            None => self.head = Some(node),
        }
        self.tail = Some(node);
        self.len += 1;
        Ok(())
    }

    /// Takes the node's value and returns its storage to the resource.
    ///
    /// # Safety
    /// `node` must be a live node of this list that has already been unlinked.
    unsafe fn free_node(&self, node: NonNull<ListNode<T>>) -> T {
        // SAFETY: the node is live; reading it moves the value out, so the
        // storage is returned without dropping.
        unsafe {
            let ListNode { value, .. } = node.as_ptr().read();
            self.resource.deallocate_with::<false>(node);
            value
        }
    }

    pub fn pop_front(&mut self) -> Option<T> {
        let head = self.head?;
        // SAFETY: `head` is a live node owned by this list.
        self.head = unsafe { head.as_ref().next };
        if self.head.is_none() {
            self.tail = None;
        }
        self.len -= 1;
        // SAFETY: `head` has been unlinked.
        Some(unsafe { self.free_node(head) })
    }

    /// Removes the last element. Walks the list to find the predecessor.
    pub fn pop_back(&mut self) -> Option<T> {
        let tail = self.tail?;
        if self.head == Some(tail) {
            return self.pop_front();
        }
        let mut prev = self.head?;
        // SAFETY: every `next` link reached from `head` is a live node.
        unsafe {
            while prev.as_ref().next != Some(tail) {
                prev = prev.as_ref().next?;
            }
            prev.as_mut().next = None;
        }
        self.tail = Some(prev);
        self.len -= 1;
        // SAFETY: `tail` has been unlinked.
        Some(unsafe { self.free_node(tail) })
    }

    fn node_at(&self, index: usize) -> Result<NonNull<ListNode<T>>> {
        if index >= self.len {
            return Err(Error::OutOfRange("Index out of range"));
        }
        let mut cur = self.head.ok_or(Error::OutOfRange("Index out of range"))?;
        for _ in 0..index {
            // SAFETY: `index < len`, so every hop lands on a live node.
            cur = unsafe { cur.as_ref().next }.ok_or(Error::OutOfRange("Index out of range"))?;
        }
        Ok(cur)
    }

    pub fn at(&self, index: usize) -> Result<&T> {
        let node = self.node_at(index)?;
        // SAFETY: the node is live for as long as `self` is borrowed.
        Ok(unsafe { &(*node.as_ptr()).value })
    }

    pub fn at_mut(&mut self, index: usize) -> Result<&mut T> {
        let node = self.node_at(index)?;
        // SAFETY: the node is live and `self` is uniquely borrowed.
        Ok(unsafe { &mut (*node.as_ptr()).value })
    }

    /// Removes and returns the element at `index`.
    pub fn erase(&mut self, index: usize) -> Result<T> {
        if index >= self.len {
            return Err(Error::OutOfRange("Index out of range"));
        }
        if index == 0 {
            return self.pop_front().ok_or(Error::OutOfRange("Index out of range"));
        }
        let mut prev = self.node_at(index - 1)?;
        // SAFETY: `index < len`, so `prev` has a live successor.
        let target = unsafe { prev.as_ref().next }.ok_or(Error::OutOfRange("Index out of range"))?;
        // SAFETY: both nodes are live and owned by this list.
        unsafe { prev.as_mut().next = target.as_ref().next };
        if self.tail == Some(target) {
            self.tail = Some(prev);
        }
        self.len -= 1;
        // SAFETY: `target` has been unlinked.
        Ok(unsafe { self.free_node(target) })
    }

    pub fn front(&self) -> Result<&T> {
        // SAFETY: `head` is live while `self` is borrowed.
        self.head
            .map(|n| unsafe { &(*n.as_ptr()).value })
            .ok_or(Error::Exception("List is empty"))
    }

    pub fn front_mut(&mut self) -> Result<&mut T> {
        // SAFETY: `head` is live and `self` is uniquely borrowed.
        self.head
            .map(|n| unsafe { &mut (*n.as_ptr()).value })
            .ok_or(Error::Exception("List is empty"))
    }

    pub fn back(&self) -> Result<&T> {
        // SAFETY: `tail` is live while `self` is borrowed.
        self.tail
            .map(|n| unsafe { &(*n.as_ptr()).value })
            .ok_or(Error::Exception("List is empty"))
    }

    pub fn back_mut(&mut self) -> Result<&mut T> {
        // SAFETY: `tail` is live and `self` is uniquely borrowed.
        self.tail
            .map(|n| unsafe { &mut (*n.as_ptr()).value })
            .ok_or(Error::Exception("List is empty"))
    }

    /// Drops every element front to back without recursion.
    pub fn clear(&mut self) {
        while let Some(head) = self.head {
            // SAFETY: `head` is a live node owned by this list.
            self.head = unsafe { head.as_ref().next };
            self.len -= 1;
            // SAFETY: `head` has been unlinked.
            unsafe { self.resource.deallocate(head) };
        }
        self.tail = None;
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            next: self.head,
            remaining: self.len,
            _marker: PhantomData,
        }
    }
}

impl<T, R: Resource<ListNode<T>>> Drop for List<T, R> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T, R: Resource<ListNode<T>> + Default> Default for List<T, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, R: Resource<ListNode<T>>> Index<usize> for List<T, R> {
    type Output = T;

    #[track_caller]
    fn index(&self, index: usize) -> &T {
        self.at(index).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl<T, R: Resource<ListNode<T>>> IndexMut<usize> for List<T, R> {
    #[track_caller]
    fn index_mut(&mut self, index: usize) -> &mut T {
        self.at_mut(index).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl<T: fmt::Debug, R: Resource<ListNode<T>>> fmt::Debug for List<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, T, R: Resource<ListNode<T>>> IntoIterator for &'a List<T, R> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

// SAFETY: the list uniquely owns its nodes.
unsafe impl<T: Send, R: Resource<ListNode<T>> + Send> Send for List<T, R> {}

pub struct Iter<'a, T> {
    next: Option<NonNull<ListNode<T>>>,
    remaining: usize,
    _marker: PhantomData<&'a T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let node = self.next?;
        // SAFETY: the list outlives `'a` and is not mutated while borrowed.
        let node = unsafe { &*node.as_ptr() };
        self.next = node.next;
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
