//! A 26-way trie over ASCII letters.

use std::{fmt, ptr::NonNull};

use tracing::{error, instrument, trace};

use crate::{
    memory::{ArrayResource, MonotonicResource, Resource, SystemArrayResource},
    Error, Result, Vector,
};

pub const ALPHABET: usize = 26;

type Link<C> = Option<NonNull<TrieNode<C>>>;

/// Storage for a node's 26 child links.
pub trait ChildTable: Sized {
    fn new_table() -> Result<Self>;

    fn get(&self, index: usize) -> Link<Self>;

    fn set(&mut self, index: usize, child: NonNull<TrieNode<Self>>);
}

/// Child links embedded in the node.
pub struct InlineChildren([Link<InlineChildren>; ALPHABET]);

impl ChildTable for InlineChildren {
    fn new_table() -> Result<Self> {
        Ok(Self([None; ALPHABET]))
    }

    fn get(&self, index: usize) -> Link<Self> {
        self.0[index]
    }

    fn set(&mut self, index: usize, child: NonNull<TrieNode<Self>>) {
        self.0[index] = Some(child);
    }
}

/// An untyped child link, as stored by [`HeapChildren`].
#[derive(Clone, Copy)]
pub struct ChildSlot(Option<NonNull<()>>);

/// Child links in a separate 26-slot array from `A`, keeping nodes small.
pub struct HeapChildren<A: ArrayResource<ChildSlot> = SystemArrayResource<ChildSlot>> {
    slots: NonNull<ChildSlot>,
    resource: A,
}

impl<A: ArrayResource<ChildSlot> + Default> ChildTable for HeapChildren<A> {
    fn new_table() -> Result<Self> {
        let resource = A::default();
        let slots = resource.allocate(ALPHABET)?;
        for i in 0..ALPHABET {
            // SAFETY: the block has `ALPHABET` slots.
            unsafe { slots.as_ptr().add(i).write(ChildSlot(None)) };
        }
        Ok(Self { slots, resource })
    }

    fn get(&self, index: usize) -> Link<Self> {
        assert!(index < ALPHABET);
        // SAFETY: in bounds and initialized in `new_table`.
        let ChildSlot(link) = unsafe { *self.slots.as_ptr().add(index) };
        link.map(|child| child.cast())
    }

    fn set(&mut self, index: usize, child: NonNull<TrieNode<Self>>) {
        assert!(index < ALPHABET);
        // SAFETY: in bounds and initialized in `new_table`.
        unsafe { *self.slots.as_ptr().add(index) = ChildSlot(Some(child.cast())) };
    }
}

impl<A: ArrayResource<ChildSlot>> Drop for HeapChildren<A> {
    fn drop(&mut self) {
        // SAFETY: allocated by `self.resource` with `ALPHABET` slots.
        unsafe { self.resource.deallocate(self.slots, ALPHABET) };
    }
}

pub struct TrieNode<C> {
    children: C,
    terminal: bool,
}

/// A set of words over `a..=z`, letters compared case-insensitively unless
/// `ONLY_LOWERCASE` is set, in which case only lowercase letters are
/// accepted.
///
/// Nodes come from `R`, a [`MonotonicResource`] by default. Dropping the
/// trie walks it with an explicit work stack whose storage comes from `Q`,
/// so long words cannot overflow the call stack.
///
/// # Examples
///
/// ```
/// # use pmr_kit::AlphabeticTrie;
/// # use assert2::assert;
/// let mut trie: AlphabeticTrie = AlphabeticTrie::new();
/// trie.insert("Rust").unwrap();
/// assert!(trie.search("rust"));
/// assert!(trie.starts_with("ru"));
/// assert!(!trie.search("ru"));
/// assert!(trie.insert("r2d2").is_err());
/// ```
pub struct AlphabeticTrie<
    const ONLY_LOWERCASE: bool = false,
    C: ChildTable = InlineChildren,
    R: Resource<TrieNode<C>> = MonotonicResource<TrieNode<C>>,
    Q: ArrayResource<NonNull<TrieNode<C>>> = SystemArrayResource<NonNull<TrieNode<C>>>,
> {
    root: Option<NonNull<TrieNode<C>>>,
    words: usize,
    resource: R,
    queue: Q,
}

impl<const ONLY_LOWERCASE: bool, C, R, Q> AlphabeticTrie<ONLY_LOWERCASE, C, R, Q>
where
    C: ChildTable,
    R: Resource<TrieNode<C>>,
    Q: ArrayResource<NonNull<TrieNode<C>>>,
{
    pub fn new() -> Self
    where
        R: Default,
        Q: Default,
    {
        Self::new_in(R::default())
    }

    pub fn new_in(resource: R) -> Self
    where
        Q: Default,
    {
        Self::with_resources(resource, Q::default())
    }

    /// A trie with nodes from `resource` and its teardown stack from `queue`.
    pub fn with_resources(resource: R, queue: Q) -> Self {
        Self {
            root: None,
            words: 0,
            resource,
            queue,
        }
    }

    /// Number of distinct words inserted.
    pub fn len(&self) -> usize {
        self.words
    }

    pub fn is_empty(&self) -> bool {
        self.words == 0
    }

    fn index(byte: u8) -> Option<usize> {
        let byte = if ONLY_LOWERCASE {
            byte
        } else {
            byte.to_ascii_lowercase()
        };
        byte.is_ascii_lowercase().then(|| (byte - b'a') as usize)
    }

    fn new_node(&self) -> Result<NonNull<TrieNode<C>>> {
        self.resource.allocate(TrieNode {
            children: C::new_table()?,
            terminal: false,
        })
    }

    /// Adds `word`, returning whether it was new.
    ///
    /// # Errors
    /// [`Error::OutOfRange`] if `word` has a byte outside the alphabet; the
    /// trie is left unchanged. Allocation failures are passed through.
    pub fn insert(&mut self, word: impl AsRef<[u8]>) -> Result<bool> {
        let word = word.as_ref();
        let outside = || Error::OutOfRange("Character outside the trie alphabet");
        if !word.iter().all(|&b| Self::index(b).is_some()) {
            return Err(outside());
        }

        let mut node = match self.root {
            Some(root) => root,
            None => {
                let root = self.new_node()?;
                self.root = Some(root);
                root
            }
        };
        for &byte in word {
            let i = Self::index(byte).ok_or_else(outside)?;
            // SAFETY: nodes reachable from the root are live and only
            // touched through `&mut self`.
            let next = unsafe { node.as_ref() }.children.get(i);
            node = match next {
                Some(child) => child,
                None => {
                    let child = self.new_node()?;
                    // SAFETY: `node` is live and no other reference to it is
                    // held; `child` is a distinct fresh allocation.
                    unsafe { node.as_mut() }.children.set(i, child);
                    child
                }
            };
        }

        // SAFETY: `node` is live and the last reference into the trie was
        // dropped with the loop.
        let node = unsafe { node.as_mut() };
        if node.terminal {
            return Ok(false);
        }
        node.terminal = true;
        self.words += 1;
        Ok(true)
    }

    fn find(&self, word: &[u8]) -> Option<&TrieNode<C>> {
        // SAFETY: live nodes, shared borrow tied to `&self`.
        let mut node = unsafe { self.root?.as_ref() };
        for &byte in word {
            let child = node.children.get(Self::index(byte)?)?;
            // SAFETY: child links point at live nodes owned by this trie.
            node = unsafe { child.as_ref() };
        }
        Some(node)
    }

    /// Whether `word` was inserted.
    pub fn search(&self, word: impl AsRef<[u8]>) -> bool {
        self.find(word.as_ref()).is_some_and(|node| node.terminal)
    }

    /// Whether some inserted word begins with `prefix`.
    pub fn starts_with(&self, prefix: impl AsRef<[u8]>) -> bool {
        self.find(prefix.as_ref()).is_some()
    }
}

impl<const L: bool, C, R, Q> Drop for AlphabeticTrie<L, C, R, Q>
where
    C: ChildTable,
    R: Resource<TrieNode<C>>,
    Q: ArrayResource<NonNull<TrieNode<C>>>,
{
    #[instrument(skip(self), fields(words = self.words))]
    fn drop(&mut self) {
        let Some(root) = self.root.take() else { return };
        let mut pending: Vector<NonNull<TrieNode<C>>, 180, 25, &Q> = Vector::new_in(&self.queue);
        let mut freed = 0usize;
        let mut next = Some(root);
        while let Some(node) = next {
            {
                // SAFETY: each node is reachable from exactly one parent link,
                // so it is visited once.
                let children = unsafe { &node.as_ref().children };
                for i in 0..ALPHABET {
                    if let Some(child) = children.get(i) {
                        if let Err(e) = pending.push_back(child) {
                            error!(%e, "trie teardown could not queue a subtree; leaking it");
                        }
                    }
                }
            }
            // SAFETY: allocated from `self.resource`; children were queued.
            unsafe { self.resource.deallocate(node) };
            freed += 1;
            next = pending.pop_back_move().ok();
        }
        trace!(freed, "trie released");
    }
}

impl<const L: bool, C, R, Q> Default for AlphabeticTrie<L, C, R, Q>
where
    C: ChildTable,
    R: Resource<TrieNode<C>> + Default,
    Q: ArrayResource<NonNull<TrieNode<C>>> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<const L: bool, C, R, Q> fmt::Debug for AlphabeticTrie<L, C, R, Q>
where
    C: ChildTable,
    R: Resource<TrieNode<C>>,
    Q: ArrayResource<NonNull<TrieNode<C>>>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlphabeticTrie")
            .field("words", &self.words)
            .field("only_lowercase", &L)
            .finish()
    }
}
