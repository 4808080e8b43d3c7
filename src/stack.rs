use crate::{
    memory::{ArrayResource, Resource},
    Delist, DelistNode, Error, List, ListNode, Result, Vector,
};

/// A container that can grow and shrink at its back.
pub trait BackInsertion<T> {
    fn push_back(&mut self, value: T) -> Result<()>;

    fn pop_back(&mut self) -> Option<T>;

    fn back(&self) -> Option<&T>;

    fn back_mut(&mut self) -> Option<&mut T>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T, R: Resource<DelistNode<T>>> BackInsertion<T> for Delist<T, R> {
    fn push_back(&mut self, value: T) -> Result<()> {
        Delist::push_back(self, value)
    }

    fn pop_back(&mut self) -> Option<T> {
        Delist::pop_back(self)
    }

    fn back(&self) -> Option<&T> {
        Delist::back(self).ok()
    }

    fn back_mut(&mut self) -> Option<&mut T> {
        Delist::back_mut(self).ok()
    }

    fn len(&self) -> usize {
        Delist::len(self)
    }
}

impl<T, R: Resource<ListNode<T>>> BackInsertion<T> for List<T, R> {
    fn push_back(&mut self, value: T) -> Result<()> {
        List::push_back(self, value)
    }

    fn pop_back(&mut self) -> Option<T> {
        List::pop_back(self)
    }

    fn back(&self) -> Option<&T> {
        List::back(self).ok()
    }

    fn back_mut(&mut self) -> Option<&mut T> {
        List::back_mut(self).ok()
    }

    fn len(&self) -> usize {
        List::len(self)
    }
}

impl<T, const G: usize, const I: usize, R: ArrayResource<T>> BackInsertion<T> for Vector<T, G, I, R> {
    fn push_back(&mut self, value: T) -> Result<()> {
        Vector::push_back(self, value)
    }

    fn pop_back(&mut self) -> Option<T> {
        if Vector::is_empty(self) {
            return None;
        }
        let value = self.pop_back_move().ok();
        if Vector::is_empty(self) {
            // Back to the lazy state, as `Vector::pop_back` leaves it.
            self.forget_elements();
        }
        value
    }

    fn back(&self) -> Option<&T> {
        Vector::back(self).ok()
    }

    fn back_mut(&mut self) -> Option<&mut T> {
        Vector::back_mut(self).ok()
    }

    fn len(&self) -> usize {
        Vector::len(self)
    }
}

/// LIFO adapter over any [`BackInsertion`] container.
#[derive(Debug)]
pub struct Stack<T, C: BackInsertion<T> = Delist<T>> {
    items: C,
    _marker: std::marker::PhantomData<T>,
}

impl<T, C: BackInsertion<T>> Stack<T, C> {
    pub fn new() -> Self
    where
        C: Default,
    {
        Self::with_container(C::default())
    }

    pub fn with_container(items: C) -> Self {
        Self {
            items,
            _marker: std::marker::PhantomData,
        }
    }

    pub fn push(&mut self, value: T) -> Result<()> {
        self.items.push_back(value)
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_back()
    }

    /// # Errors
    /// [`Error::Exception`] when empty.
    pub fn top(&self) -> Result<&T> {
        self.items.back().ok_or(Error::Exception("Stack is empty"))
    }

    pub fn top_mut(&mut self) -> Result<&mut T> {
        self.items.back_mut().ok_or(Error::Exception("Stack is empty"))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_inner(self) -> C {
        self.items
    }
}

impl<T, C: BackInsertion<T> + Default> Default for Stack<T, C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{assert, let_assert};

    fn exercise<C: BackInsertion<i32> + Default>() {
        let mut s: Stack<i32, C> = Stack::new();
        let_assert!(Err(Error::Exception("Stack is empty")) = s.top());
        for i in 0..5 {
            s.push(i).unwrap();
        }
        assert!(*s.top().unwrap() == 4);
        *s.top_mut().unwrap() = 40;
        assert!(s.pop() == Some(40));
        assert!(s.pop() == Some(3));
        assert!(s.len() == 3);
        while s.pop().is_some() {}
        assert!(s.is_empty());
        assert!(s.pop() == None);
    }

    #[test]
    fn over_delist() {
        exercise::<Delist<i32>>();
    }

    #[test]
    fn over_list() {
        exercise::<List<i32>>();
    }

    #[test]
    fn over_vector() {
        exercise::<Vector<i32>>();
    }

    #[test]
    fn vector_storage_released_when_popped_empty() {
        let mut s: Stack<i32, Vector<i32>> = Stack::new();
        s.push(1).unwrap();
        s.push(2).unwrap();
        assert!(s.pop() == Some(2));
        assert!(s.pop() == Some(1));
        let v = s.into_inner();
        assert!(v.is_empty());
        assert!(!v.is_initialized());
    }
}
