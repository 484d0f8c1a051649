//! Utility types.

use std::{cell::RefCell, fmt, hash::Hash, rc::Rc};

type BuildHasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

pub type Map<K, V> = indexmap::IndexMap<K, V, BuildHasher>;
pub type Set<T> = indexmap::IndexSet<T, BuildHasher>;

/// A canonicalization arena for immutable values.
///
/// Interning two equal values returns the same `Rc`, so later stages may
/// compare handles with `Rc::ptr_eq` instead of walking the whole value.
/// An interner belongs to exactly one grammar and is never shared between
/// grammars.
pub struct Interner<T> {
    cache: RefCell<Set<Rc<T>>>,
}

impl<T> Default for Interner<T> {
    fn default() -> Self {
        Self {
            cache: RefCell::new(Set::default()),
        }
    }
}

impl<T> fmt::Debug for Interner<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interner")
            .field("len", &self.cache.borrow().len())
            .finish()
    }
}

impl<T> Interner<T>
where
    T: Eq + Hash,
{
    /// Return the canonical shared instance equal to `value`.
    pub fn intern(&self, value: T) -> Rc<T> {
        let mut cache = self.cache.borrow_mut();
        if let Some(shared) = cache.get(&value) {
            return Rc::clone(shared);
        }
        let shared = Rc::new(value);
        cache.insert(Rc::clone(&shared));
        shared
    }

    /// Same as `intern`, but starts from an existing handle and keeps it if
    /// no equal value was interned before.
    pub fn intern_rc(&self, value: &Rc<T>) -> Rc<T> {
        let mut cache = self.cache.borrow_mut();
        if let Some(shared) = cache.get(&**value) {
            return Rc::clone(shared);
        }
        cache.insert(Rc::clone(value));
        Rc::clone(value)
    }

    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }
}
