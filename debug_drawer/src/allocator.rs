//! Instrumented allocation tracking for debug draw storage.
//!
//! Every [`Deck`](crate::deck::Deck) chunk and every secondary allocation a
//! primitive owns (string text, grid cell lists) holds an [`AllocationToken`].
//! Dropping the token releases it, so [`DrawAllocator::stats`] reports exactly
//! what is still alive. The allocator also owns the growth lock that
//! serializes chunk allocation across drawer queues.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

/// Snapshot of allocator counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocatorStats {
    /// Allocations currently alive.
    pub live_allocations: usize,
    /// Bytes currently alive.
    pub live_bytes: usize,
    /// Allocations made since creation.
    pub total_allocations: u64,
}

/// Shared allocation tracker and growth lock.
#[derive(Debug, Default)]
pub struct DrawAllocator {
    grow_lock: Mutex<()>,
    live_allocations: AtomicUsize,
    live_bytes: AtomicUsize,
    total_allocations: AtomicU64,
}

impl DrawAllocator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Acquire the growth lock.
    ///
    /// Held while chunk storage is allocated; never held on the fast path.
    pub fn lock_growth(&self) -> MutexGuard<'_, ()> {
        self.grow_lock.lock()
    }

    /// Allocate an empty chunk with room for `capacity` elements.
    ///
    /// Takes the growth lock for the duration of the allocation.
    pub fn allocate_chunk<T>(self: &Arc<Self>, capacity: usize) -> (Vec<T>, AllocationToken) {
        let _guard = self.lock_growth();
        self.allocate_chunk_locked(capacity)
    }

    /// Like [`allocate_chunk`](Self::allocate_chunk) for callers already
    /// holding the growth lock.
    pub(crate) fn allocate_chunk_locked<T>(
        self: &Arc<Self>,
        capacity: usize,
    ) -> (Vec<T>, AllocationToken) {
        let storage = Vec::with_capacity(capacity);
        let token = self.track(capacity * std::mem::size_of::<T>());
        log::trace!(
            "DrawAllocator: chunk of {} x {} bytes",
            capacity,
            std::mem::size_of::<T>()
        );
        (storage, token)
    }

    /// Register an allocation of `bytes` and return its release token.
    pub fn track(self: &Arc<Self>, bytes: usize) -> AllocationToken {
        self.live_allocations.fetch_add(1, Ordering::Relaxed);
        self.live_bytes.fetch_add(bytes, Ordering::Relaxed);
        self.total_allocations.fetch_add(1, Ordering::Relaxed);
        AllocationToken {
            allocator: Arc::clone(self),
            bytes,
        }
    }

    pub fn stats(&self) -> AllocatorStats {
        AllocatorStats {
            live_allocations: self.live_allocations.load(Ordering::Relaxed),
            live_bytes: self.live_bytes.load(Ordering::Relaxed),
            total_allocations: self.total_allocations.load(Ordering::Relaxed),
        }
    }

    fn release(&self, bytes: usize) {
        self.live_allocations.fetch_sub(1, Ordering::Relaxed);
        self.live_bytes.fetch_sub(bytes, Ordering::Relaxed);
    }
}

/// Proof of one tracked allocation. Releases it on drop.
///
/// Cloning registers a new allocation of the same size, matching the deep
/// copy the owner makes alongside it.
pub struct AllocationToken {
    allocator: Arc<DrawAllocator>,
    bytes: usize,
}

impl AllocationToken {
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn allocator(&self) -> &Arc<DrawAllocator> {
        &self.allocator
    }
}

impl Clone for AllocationToken {
    fn clone(&self) -> Self {
        self.allocator.track(self.bytes)
    }
}

impl Drop for AllocationToken {
    fn drop(&mut self) {
        self.allocator.release(self.bytes);
    }
}

impl std::fmt::Debug for AllocationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllocationToken")
            .field("bytes", &self.bytes)
            .finish()
    }
}
