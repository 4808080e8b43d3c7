/// Two values fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Pair<K, V> {
    first: K,
    second: V,
}

impl<K, V> Pair<K, V> {
    pub const fn new(first: K, second: V) -> Self {
        Self { first, second }
    }

    pub fn first(&self) -> &K {
        &self.first
    }

    pub fn second(&self) -> &V {
        &self.second
    }

    pub fn into_parts(self) -> (K, V) {
        (self.first, self.second)
    }
}

impl<K, V> From<(K, V)> for Pair<K, V> {
    fn from((first, second): (K, V)) -> Self {
        Self::new(first, second)
    }
}

#[test]
fn test_pair() {
    let p = Pair::new("k", 1);
    assert_eq!(*p.first(), "k");
    assert_eq!(*p.second(), 1);
    assert_eq!(Pair::from(("k", 1)), p);
    assert!(Pair::new(1, 'a') < Pair::new(1, 'b'));
    assert_eq!(p.into_parts(), ("k", 1));
}
