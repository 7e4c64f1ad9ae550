//! Generational slot storage
//!
//! Templates and blackboard instances are owned centrally and referred to
//! by [`SlotKey`]s. A key carries the generation of the slot it was minted
//! from, so a key held past the value's removal resolves to `None` instead
//! of aliasing whatever was stored there next. This is the back-reference
//! model used throughout the engine: publishers keep lists of keys, never
//! pointers.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;

/// Typed key into a [`SlotMap`], carrying the slot's generation.
pub struct SlotKey<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SlotKey<T> {
    #[inline]
    const fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// The raw slot index.
    #[inline]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// The generation this key was minted with.
    #[inline]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

// Manual impls so keys stay Copy/Eq/Hash without bounds on T.
impl<T> Clone for SlotKey<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SlotKey<T> {}

impl<T> PartialEq for SlotKey<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for SlotKey<T> {}

impl<T> Hash for SlotKey<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for SlotKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotKey({}v{})", self.index, self.generation)
    }
}

/// Generational storage with O(1) insert, remove, and lookup.
pub struct SlotMap<T> {
    values: Vec<Option<T>>,
    generations: Vec<u32>,
    free: Vec<u32>,
    len: usize,
}

impl<T> SlotMap<T> {
    /// Create an empty slot map.
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            generations: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Create with room for `capacity` values before reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            generations: Vec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Store a value, returning the key that retrieves it.
    pub fn insert(&mut self, value: T) -> SlotKey<T> {
        self.len += 1;

        if let Some(index) = self.free.pop() {
            self.values[index as usize] = Some(value);
            SlotKey::new(index, self.generations[index as usize])
        } else {
            let index = self.values.len() as u32;
            self.values.push(Some(value));
            self.generations.push(0);
            SlotKey::new(index, 0)
        }
    }

    /// Remove and return the value behind `key`, if the key is still live.
    ///
    /// The slot's generation is bumped so existing copies of the key stop
    /// resolving.
    pub fn remove(&mut self, key: SlotKey<T>) -> Option<T> {
        let index = key.index as usize;
        if index >= self.values.len()
            || self.generations[index] != key.generation
            || self.values[index].is_none()
        {
            return None;
        }

        self.generations[index] = self.generations[index].wrapping_add(1);
        self.free.push(key.index);
        self.len -= 1;
        self.values[index].take()
    }

    /// Borrow the value behind `key`, if the key is still live.
    pub fn get(&self, key: SlotKey<T>) -> Option<&T> {
        let index = key.index as usize;
        if index >= self.values.len() || self.generations[index] != key.generation {
            return None;
        }
        self.values[index].as_ref()
    }

    /// Mutably borrow the value behind `key`, if the key is still live.
    pub fn get_mut(&mut self, key: SlotKey<T>) -> Option<&mut T> {
        let index = key.index as usize;
        if index >= self.values.len() || self.generations[index] != key.generation {
            return None;
        }
        self.values[index].as_mut()
    }

    /// Whether `key` still resolves to a value.
    pub fn contains(&self, key: SlotKey<T>) -> bool {
        self.get(key).is_some()
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no values are stored.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate over live `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (SlotKey<T>, &T)> {
        self.values.iter().enumerate().filter_map(move |(i, slot)| {
            slot.as_ref()
                .map(|v| (SlotKey::new(i as u32, self.generations[i]), v))
        })
    }

    /// Iterate over live `(key, value)` pairs with mutable access.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SlotKey<T>, &mut T)> {
        let generations = &self.generations;
        self.values
            .iter_mut()
            .enumerate()
            .filter_map(move |(i, slot)| {
                slot.as_mut()
                    .map(|v| (SlotKey::new(i as u32, generations[i]), v))
            })
    }
}

impl<T> Default for SlotMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_remove() {
        let mut map = SlotMap::new();
        let a = map.insert("alpha");
        let b = map.insert("beta");

        assert_eq!(map.get(a), Some(&"alpha"));
        assert_eq!(map.get(b), Some(&"beta"));
        assert_eq!(map.len(), 2);

        assert_eq!(map.remove(a), Some("alpha"));
        assert_eq!(map.get(a), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_stale_key_does_not_alias() {
        let mut map = SlotMap::new();
        let first = map.insert(1u32);
        map.remove(first);

        let second = map.insert(2u32);
        // Slot is reused, generation is not.
        assert_eq!(second.index(), first.index());
        assert_ne!(second.generation(), first.generation());

        assert_eq!(map.get(first), None);
        assert!(!map.contains(first));
        assert_eq!(map.get(second), Some(&2));
    }

    #[test]
    fn test_remove_twice_is_none() {
        let mut map = SlotMap::new();
        let key = map.insert(5i32);
        assert_eq!(map.remove(key), Some(5));
        assert_eq!(map.remove(key), None);
        assert!(map.is_empty());
    }

    #[test]
    fn test_iteration_skips_holes() {
        let mut map = SlotMap::new();
        let a = map.insert(10);
        let b = map.insert(20);
        let c = map.insert(30);
        map.remove(b);

        let collected: Vec<_> = map.iter().map(|(_, v)| *v).collect();
        assert_eq!(collected, vec![10, 30]);

        for (key, value) in map.iter_mut() {
            *value += 1;
            assert!(key == a || key == c);
        }
        assert_eq!(map.get(a), Some(&11));
    }
}
