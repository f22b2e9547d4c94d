//! Chunked storage for pending primitives.
//!
//! A [`Deck`] owns a list of fixed-size, power-of-two chunks. Chunks are
//! allocated through the shared [`DrawAllocator`] and never reallocate, so
//! elements are addressed by `(chunk, slot)` pairs and a flat index maps to a
//! pair with a shift and a mask.
//!
//! # Density
//!
//! The deck is kept dense: every chunk before the tail chunk is full and
//! every chunk after it is empty. Appends go to the tail chunk, so the most
//! recently added elements are always last in iteration order. Removal
//! ([`retain`](Deck::retain)) swaps the last element of a chunk into the hole
//! and then compacts, so iteration order is NOT stable across removals.

use std::sync::Arc;

use parking_lot::MutexGuard;

use crate::allocator::{AllocationToken, DrawAllocator};

/// Largest supported chunk shift (chunks of 1M elements).
pub const MAX_CHUNK_SHIFT: u32 = 20;

/// Position of an element inside a [`Deck`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeckIndex {
    pub chunk: usize,
    pub slot: usize,
}

struct Chunk<T> {
    items: Vec<T>,
    _token: AllocationToken,
}

/// Chunked, append-mostly container for one primitive type.
pub struct Deck<T> {
    chunks: Vec<Chunk<T>>,
    chunk_shift: u32,
    tail: usize,
    allocator: Arc<DrawAllocator>,
}

impl<T> Deck<T> {
    /// Create an empty deck with chunks of `1 << chunk_shift` elements.
    ///
    /// No memory is allocated until the first element is added.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_shift` exceeds [`MAX_CHUNK_SHIFT`].
    pub fn new(chunk_shift: u32, allocator: Arc<DrawAllocator>) -> Self {
        assert!(
            chunk_shift <= MAX_CHUNK_SHIFT,
            "chunk shift {chunk_shift} exceeds {MAX_CHUNK_SHIFT}"
        );
        Self {
            chunks: Vec::new(),
            chunk_shift,
            tail: 0,
            allocator,
        }
    }

    /// Elements per chunk.
    #[inline]
    pub fn chunk_capacity(&self) -> usize {
        1 << self.chunk_shift
    }

    /// Number of allocated chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.chunks.iter().map(|c| c.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.iter().all(|c| c.items.is_empty())
    }

    /// Total element capacity of the allocated chunks.
    pub fn capacity(&self) -> usize {
        self.chunks.len() * self.chunk_capacity()
    }

    /// Elements that can be appended without allocating.
    pub fn free_capacity(&self) -> usize {
        match self.chunks.get(self.tail) {
            Some(tail) => {
                let spare_chunks = self.chunks.len() - self.tail - 1;
                (self.chunk_capacity() - tail.items.len()) + spare_chunks * self.chunk_capacity()
            }
            None => 0,
        }
    }

    pub fn allocator(&self) -> &Arc<DrawAllocator> {
        &self.allocator
    }

    /// Append one element, allocating a chunk if the tail chunk is full.
    pub fn add(&mut self, item: T) {
        if !self.tail_has_room() {
            self.advance_tail();
        }
        self.chunks[self.tail].items.push(item);
    }

    /// Append every element of `items`, allocating as needed.
    pub fn extend<I: IntoIterator<Item = T>>(&mut self, items: I) {
        for item in items {
            self.add(item);
        }
    }

    /// Allocate `count` additional chunks.
    ///
    /// The caller must hold the allocator's growth lock, passed as proof.
    pub fn grow_locked(&mut self, count: usize, _growth: &MutexGuard<'_, ()>) {
        let capacity = self.chunk_capacity();
        for _ in 0..count {
            let (items, token) = self.allocator.allocate_chunk_locked(capacity);
            self.chunks.push(Chunk {
                items,
                _token: token,
            });
        }
    }

    /// Allocate `count` additional chunks under the growth lock.
    pub fn grow(&mut self, count: usize) {
        let allocator = Arc::clone(&self.allocator);
        let growth = allocator.lock_growth();
        self.grow_locked(count, &growth);
    }

    /// Get an element by position.
    pub fn get(&self, index: DeckIndex) -> Option<&T> {
        self.chunks.get(index.chunk)?.items.get(index.slot)
    }

    pub fn get_mut(&mut self, index: DeckIndex) -> Option<&mut T> {
        self.chunks.get_mut(index.chunk)?.items.get_mut(index.slot)
    }

    /// Convert a flat element index into a `(chunk, slot)` position.
    #[inline]
    pub fn index_of(&self, flat: usize) -> DeckIndex {
        DeckIndex {
            chunk: flat >> self.chunk_shift,
            slot: flat & (self.chunk_capacity() - 1),
        }
    }

    /// Get the `flat`-th element in iteration order.
    #[inline]
    pub fn get_flat(&self, flat: usize) -> Option<&T> {
        self.get(self.index_of(flat))
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.chunks.iter().flat_map(|c| c.items.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.chunks.iter_mut().flat_map(|c| c.items.iter_mut())
    }

    /// Keep only the elements for which `keep` returns `true`.
    ///
    /// `keep` is called exactly once per element and may mutate it. A removed
    /// element is replaced by the last element of its chunk, which is then
    /// visited in the same slot. Returns the number of removed elements.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&mut T) -> bool,
    {
        let mut removed = 0;
        for chunk in &mut self.chunks {
            let mut slot = 0;
            while slot < chunk.items.len() {
                if keep(&mut chunk.items[slot]) {
                    slot += 1;
                } else {
                    chunk.items.swap_remove(slot);
                    removed += 1;
                }
            }
        }
        if removed > 0 {
            self.compact();
        }
        removed
    }

    /// Remove and return the last `count` elements, oldest first.
    pub fn split_off_tail(&mut self, count: usize) -> Vec<T> {
        let count = count.min(self.len());
        let mut tail = Vec::with_capacity(count);
        while tail.len() < count {
            match self.chunks[self.tail].items.pop() {
                Some(item) => tail.push(item),
                None if self.tail > 0 => self.tail -= 1,
                None => break,
            }
        }
        tail.reverse();
        tail
    }

    /// Drop every element but keep the chunks for reuse.
    pub fn clear(&mut self) {
        for chunk in &mut self.chunks {
            chunk.items.clear();
        }
        self.tail = 0;
    }

    /// Drop every element and release all chunk memory.
    pub fn deallocate(&mut self) {
        self.chunks.clear();
        self.tail = 0;
    }

    fn tail_has_room(&self) -> bool {
        let capacity = self.chunk_capacity();
        self.chunks
            .get(self.tail)
            .is_some_and(|c| c.items.len() < capacity)
    }

    fn advance_tail(&mut self) {
        if self.chunks.is_empty() {
            self.grow(1);
            self.tail = 0;
            return;
        }
        if self.tail + 1 >= self.chunks.len() {
            self.grow(1);
        }
        self.tail += 1;
    }

    /// Move elements from the back into holes so the deck is dense again.
    fn compact(&mut self) {
        let capacity = self.chunk_capacity();
        let mut back = self.chunks.len();
        let mut front = 0;
        while front < back {
            while self.chunks[front].items.len() < capacity {
                while back > front + 1 && self.chunks[back - 1].items.is_empty() {
                    back -= 1;
                }
                if back <= front + 1 {
                    break;
                }
                if let Some(item) = self.chunks[back - 1].items.pop() {
                    self.chunks[front].items.push(item);
                }
            }
            front += 1;
        }
        self.tail = self
            .chunks
            .iter()
            .position(|c| c.items.len() < capacity)
            .unwrap_or(self.chunks.len().saturating_sub(1));
    }
}

impl<T: Clone> Deck<T> {
    /// Append `items` without allocating.
    ///
    /// Returns `false`, leaving the deck untouched, when the allocated chunks
    /// lack room for all of them.
    pub fn try_add_stream(&mut self, items: &[T]) -> bool {
        if items.len() > self.free_capacity() {
            return false;
        }
        let capacity = self.chunk_capacity();
        let mut rest = items;
        while !rest.is_empty() {
            if !self.tail_has_room() {
                self.tail += 1;
            }
            let chunk = &mut self.chunks[self.tail].items;
            let take = (capacity - chunk.len()).min(rest.len());
            chunk.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
        }
        true
    }

    /// Append `items`, first reserving whole chunks for all of them.
    pub fn add_stream(&mut self, items: &[T]) {
        let missing = items.len().saturating_sub(self.free_capacity());
        if missing > 0 {
            self.grow(missing.div_ceil(self.chunk_capacity()));
        }
        let copied = self.try_add_stream(items);
        debug_assert!(copied, "reserved capacity must fit the stream");
    }
}

impl<T: Clone> Clone for Deck<T> {
    fn clone(&self) -> Self {
        let mut deck = Deck::new(self.chunk_shift, Arc::clone(&self.allocator));
        for chunk in &self.chunks {
            deck.add_stream(&chunk.items);
        }
        deck
    }
}

impl<T> std::fmt::Debug for Deck<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deck")
            .field("len", &self.len())
            .field("chunks", &self.chunks.len())
            .field("chunk_capacity", &self.chunk_capacity())
            .field("tail", &self.tail)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deck(shift: u32) -> Deck<u32> {
        Deck::new(shift, DrawAllocator::new())
    }

    fn contents(deck: &Deck<u32>) -> Vec<u32> {
        deck.iter().copied().collect()
    }

    #[test]
    fn test_new_deck_allocates_nothing() {
        let deck = deck(2);
        assert_eq!(deck.len(), 0);
        assert_eq!(deck.chunk_count(), 0);
        assert_eq!(deck.allocator().stats().live_allocations, 0);
    }

    #[test]
    fn test_add_spans_chunks() {
        let mut deck = deck(2);
        for i in 0..10 {
            deck.add(i);
        }
        assert_eq!(deck.len(), 10);
        assert_eq!(deck.chunk_count(), 3);
        assert_eq!(contents(&deck), (0..10).collect::<Vec<_>>());
        assert_eq!(deck.get(DeckIndex { chunk: 1, slot: 2 }), Some(&6));
        assert_eq!(deck.get_flat(9), Some(&9));
        assert_eq!(deck.get_flat(10), None);
    }

    #[test]
    fn test_try_add_stream_does_not_grow() {
        let mut deck = deck(2);
        assert!(!deck.try_add_stream(&[1, 2]));
        assert_eq!(deck.len(), 0);

        deck.grow(1);
        assert!(deck.try_add_stream(&[1, 2, 3]));
        assert!(!deck.try_add_stream(&[4, 5]));
        assert!(deck.try_add_stream(&[4]));
        assert_eq!(contents(&deck), vec![1, 2, 3, 4]);
        assert_eq!(deck.chunk_count(), 1);
    }

    #[test]
    fn test_add_stream_reserves_whole_chunks() {
        let mut deck = deck(2);
        deck.add(0);
        deck.add_stream(&(1..11).collect::<Vec<_>>());
        assert_eq!(deck.len(), 11);
        assert_eq!(deck.chunk_count(), 3);
        assert_eq!(deck.capacity(), 12);
        assert_eq!(contents(&deck), (0..11).collect::<Vec<_>>());
    }

    #[test]
    fn test_retain_removes_and_stays_dense() {
        let mut deck = deck(2);
        deck.extend(0..10);
        let removed = deck.retain(|v| *v % 3 != 0);
        assert_eq!(removed, 4);
        assert_eq!(deck.len(), 6);

        let mut kept = contents(&deck);
        kept.sort_unstable();
        assert_eq!(kept, vec![1, 2, 4, 5, 7, 8]);

        // Dense: flat indices cover every element.
        for i in 0..deck.len() {
            assert!(deck.get_flat(i).is_some());
        }

        // New elements land at the end of iteration order.
        deck.add(100);
        assert_eq!(deck.iter().last(), Some(&100));
    }

    #[test]
    fn test_retain_visits_each_element_once() {
        let mut deck = deck(3);
        deck.extend(0..20);
        let mut visited = Vec::new();
        deck.retain(|v| {
            visited.push(*v);
            *v >= 10
        });
        visited.sort_unstable();
        assert_eq!(visited, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_retain_can_mutate() {
        let mut deck = deck(2);
        deck.extend([1, 2, 3]);
        deck.retain(|v| {
            *v *= 10;
            true
        });
        assert_eq!(contents(&deck), vec![10, 20, 30]);
    }

    #[test]
    fn test_iter_mut_reaches_every_chunk() {
        let mut deck = deck(2);
        deck.extend(0..6);
        for v in deck.iter_mut() {
            *v += 100;
        }
        assert_eq!(contents(&deck), (100..106).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_off_tail_returns_newest_in_order() {
        let mut deck = deck(2);
        deck.extend(0..7);
        let tail = deck.split_off_tail(4);
        assert_eq!(tail, vec![3, 4, 5, 6]);
        assert_eq!(contents(&deck), vec![0, 1, 2]);

        deck.add(9);
        assert_eq!(contents(&deck), vec![0, 1, 2, 9]);

        let everything = deck.split_off_tail(100);
        assert_eq!(everything, vec![0, 1, 2, 9]);
        assert!(deck.is_empty());
    }

    #[test]
    fn test_clear_keeps_chunks_and_deallocate_releases() {
        let mut deck = deck(2);
        deck.extend(0..9);
        let allocator = Arc::clone(deck.allocator());
        assert_eq!(allocator.stats().live_allocations, 3);

        deck.clear();
        assert!(deck.is_empty());
        assert_eq!(deck.chunk_count(), 3);
        deck.extend(0..9);
        assert_eq!(deck.chunk_count(), 3);

        deck.deallocate();
        assert_eq!(deck.chunk_count(), 0);
        assert_eq!(allocator.stats().live_allocations, 0);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut deck = deck(2);
        deck.extend(0..5);
        let copy = deck.clone();
        deck.clear();
        assert_eq!(contents(&copy), (0..5).collect::<Vec<_>>());
        assert_eq!(copy.allocator().stats().live_allocations, 4);
    }

    #[test]
    #[should_panic]
    fn test_oversized_chunk_shift_panics() {
        let _ = deck(MAX_CHUNK_SHIFT + 1);
    }
}
