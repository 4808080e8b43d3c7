//! A doubly-linked list whose nodes come from a [`Resource`].

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

type Link<T> = Option<NonNull<DelistNode<T>>>;

pub struct DelistNode<T> {
    value: T,
    prev: Link<T>,
    next: Link<T>,
}

/// Doubly-linked list with `O(1)` push and pop at both ends.
pub struct Delist<T, R: Resource<DelistNode<T>> = SystemResource> {
    head: Link<T>,
    tail: Link<T>,
    len: usize,
    resource: R,
    _marker: PhantomData<T>,
}

impl<T, R: Resource<DelistNode<T>>> Delist<T, R> {
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
        let node = self.resource.allocate(DelistNode {
            value,
            prev: None,
            next: self.head,
        })?;
        match self.head {
            // SAFETY: `head` is a live node of this list.
            Some(mut head) => unsafe { head.as_mut().prev = Some(node) },
            None => self.tail = Some(node),
        }
        self.head = Some(node);
        self.len += 1;
        Ok(())
    }

    pub fn push_back(&mut self, value: T) -> Result<()> {
        let node = self.resource.allocate(DelistNode {
            value,
            prev: self.tail,
            next: None,
        })?;
        match self.tail {
            // SAFETY: `tail` is a live node of this list.
            Some(mut tail) => unsafe { tail.as_mut().next = Some(node) },
            None => self.head = Some(node),
        }
        self.tail = Some(node);
        self.len += 1;
        Ok(())
    }

    /// Unlinks `node` and hands its value back.
    ///
    /// # Safety
    /// `node` must be a live node of this list.
    unsafe fn unlink(&mut self, node: NonNull<DelistNode<T>>) -> T {
        // SAFETY: `node` and its neighbours are live nodes of this list.
        unsafe {
            let DelistNode { value, prev, next } = node.as_ptr().read();
            match prev {
                Some(mut p) => p.as_mut().next = next,
                None => self.head = next,
            }
            match next {
                Some(mut n) => n.as_mut().prev = prev,
                None => self.tail = prev,
            }
            self.resource.deallocate_with::<false>(node);
            self.len -= 1;
            value
        }
    }

    /// Removes the first element. Returns `None` (and changes nothing) when
    /// empty.
    pub fn pop_front(&mut self) -> Option<T> {
        let head = self.head?;
        // SAFETY: `head` is live.
        Some(unsafe { self.unlink(head) })
    }

    pub fn pop_back(&mut self) -> Option<T> {
        let tail = self.tail?;
        // SAFETY: `tail` is live.
        Some(unsafe { self.unlink(tail) })
    }

    fn node_at(&self, index: usize) -> Result<NonNull<DelistNode<T>>> {
        if index >= self.len {
            return Err(Error::OutOfRange("Index out of range"));
        }
        // Walk from whichever end is closer.
        let (mut cur, hops, forward) = if index <= self.len / 2 {
            (self.head, index, true)
        } else {
            (self.tail, self.len - 1 - index, false)
        };
        for _ in 0..hops {
            // SAFETY: `index < len`, so every hop stays on live nodes.
            cur = cur.and_then(|n| unsafe {
                if forward {
                    n.as_ref().next
                } else {
                    n.as_ref().prev
                }
            });
        }
        cur.ok_or(Error::OutOfRange("Index out of range"))
    }

    pub fn at(&self, index: usize) -> Result<&T> {
        let node = self.node_at(index)?;
        // SAFETY: the node lives as long as `self` is borrowed.
        Ok(unsafe { &(*node.as_ptr()).value })
    }

    pub fn at_mut(&mut self, index: usize) -> Result<&mut T> {
        let node = self.node_at(index)?;
        // SAFETY: the node is live and `self` is uniquely borrowed.
        Ok(unsafe { &mut (*node.as_ptr()).value })
    }

    pub fn erase(&mut self, index: usize) -> Result<T> {
        let node = self.node_at(index)?;
        // SAFETY: `node_at` only returns live nodes.
        Ok(unsafe { self.unlink(node) })
    }

    pub fn front(&self) -> Result<&T> {
        self.head
            // SAFETY: `head` is live while `self` is borrowed.
            .map(|n| unsafe { &(*n.as_ptr()).value })
            .ok_or(Error::Exception("Delist is empty"))
    }

    pub fn front_mut(&mut self) -> Result<&mut T> {
        self.head
            // SAFETY: `head` is live and `self` is uniquely borrowed.
            .map(|n| unsafe { &mut (*n.as_ptr()).value })
            .ok_or(Error::Exception("Delist is empty"))
    }

    pub fn back(&self) -> Result<&T> {
        self.tail
            // SAFETY: `tail` is live while `self` is borrowed.
            .map(|n| unsafe { &(*n.as_ptr()).value })
            .ok_or(Error::Exception("Delist is empty"))
    }

    pub fn back_mut(&mut self) -> Result<&mut T> {
        self.tail
            // SAFETY: `tail` is live and `self` is uniquely borrowed.
            .map(|n| unsafe { &mut (*n.as_ptr()).value })
            .ok_or(Error::Exception("Delist is empty"))
    }

    pub fn clear(&mut self) {
        while let Some(head) = self.head {
            // SAFETY: `head` is live; it is unlinked before being freed.
            unsafe {
                self.head = head.as_ref().next;
                self.resource.deallocate(head);
            }
        }
        self.tail = None;
        self.len = 0;
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            front: self.head,
            back: self.tail,
            remaining: self.len,
            _marker: PhantomData,
        }
    }
}

impl<T, R: Resource<DelistNode<T>>> Drop for Delist<T, R> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T, R: Resource<DelistNode<T>> + Default> Default for Delist<T, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, R: Resource<DelistNode<T>>> Index<usize> for Delist<T, R> {
    type Output = T;

    #[track_caller]
    fn index(&self, index: usize) -> &T {
        self.at(index).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl<T, R: Resource<DelistNode<T>>> IndexMut<usize> for Delist<T, R> {
    #[track_caller]
    fn index_mut(&mut self, index: usize) -> &mut T {
        self.at_mut(index).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl<T: fmt::Debug, R: Resource<DelistNode<T>>> fmt::Debug for Delist<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, T, R: Resource<DelistNode<T>>> IntoIterator for &'a Delist<T, R> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

// SAFETY: the list uniquely owns its nodes.
unsafe impl<T: Send, R: Resource<DelistNode<T>> + Send> Send for Delist<T, R> {}

pub struct Iter<'a, T> {
    front: Link<T>,
    back: Link<T>,
    remaining: usize,
    _marker: PhantomData<&'a T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        // SAFETY: the list outlives `'a` and is not mutated while borrowed.
        let node = unsafe { &*self.front?.as_ptr() };
        self.front = node.next;
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        // SAFETY: as in `next`.
        let node = unsafe { &*self.back?.as_ptr() };
        self.back = node.prev;
        self.remaining -= 1;
        Some(&node.value)
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{drop_counts, Tracked};
    use assert2::{assert, let_assert};

    #[test]
    fn pops_from_both_ends() {
        let mut d: Delist<i32> = Delist::new();
        for i in 1..=3 {
            d.push_back(i).unwrap();
        }
        d.push_front(0).unwrap();
        assert!(d.iter().copied().collect::<Vec<_>>() == [0, 1, 2, 3]);
        assert!(d.iter().rev().copied().collect::<Vec<_>>() == [3, 2, 1, 0]);
        assert!(d.pop_back() == Some(3));
        assert!(d.pop_front() == Some(0));
        assert!(*d.front().unwrap() == 1);
        assert!(*d.back().unwrap() == 2);
        assert!(d.len() == 2);
    }

    #[test]
    fn pop_on_empty_keeps_len() {
        let mut d: Delist<i32> = Delist::new();
        assert!(d.pop_back() == None);
        assert!(d.pop_front() == None);
        assert!(d.len() == 0);
        let_assert!(Err(Error::Exception("Delist is empty")) = d.front());
        let_assert!(Err(Error::Exception("Delist is empty")) = d.back());
    }

    #[test]
    fn index_from_either_end() {
        let mut d: Delist<usize> = Delist::new();
        for i in 0..9 {
            d.push_back(i * 10).unwrap();
        }
        for i in 0..9 {
            assert!(d[i] == i * 10);
        }
        d[7] = 0;
        assert!(*d.at(7).unwrap() == 0);
        let_assert!(Err(Error::OutOfRange(_)) = d.at(9));
    }

    #[test]
    fn erase_relinks() {
        let mut d: Delist<char> = Delist::new();
        for c in "abcde".chars() {
            d.push_back(c).unwrap();
        }
        assert!(d.erase(0).unwrap() == 'a');
        assert!(d.erase(3).unwrap() == 'e');
        assert!(d.erase(1).unwrap() == 'c');
        assert!(d.iter().collect::<String>() == "bd");
        assert!(d.iter().rev().collect::<String>() == "db");
    }

    #[test]
    fn drop_releases_everything() {
        drop_counts::reset_counts();
        let mut d: Delist<Tracked> = Delist::new();
        for i in 0..5 {
            d.push_front(Tracked::new(i)).unwrap();
        }
        drop(d.pop_back());
        assert!(drop_counts::total_drop_count() == 1);
        drop(d);
        assert!(drop_counts::current_live_allocs() == 0);
    }
}
