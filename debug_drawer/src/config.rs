//! Construction-time configuration.

use crate::deck::MAX_CHUNK_SHIFT;

/// Configuration for a [`DebugDrawer`](crate::DebugDrawer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugDrawerConfig {
    /// Number of producer threads to provision staging buffers for.
    pub thread_count: usize,
    /// Capacity of each per-thread, per-type staging buffer.
    pub thread_buffer_capacity: usize,
    /// Deck chunks hold `1 << chunk_shift` elements.
    pub chunk_shift: u32,
}

impl DebugDrawerConfig {
    pub const DEFAULT_THREAD_BUFFER_CAPACITY: usize = 256;
    pub const DEFAULT_CHUNK_SHIFT: u32 = 10;

    /// A single-thread configuration with default buffer sizes.
    pub const fn new() -> Self {
        Self {
            thread_count: 1,
            thread_buffer_capacity: Self::DEFAULT_THREAD_BUFFER_CAPACITY,
            chunk_shift: Self::DEFAULT_CHUNK_SHIFT,
        }
    }

    pub fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    pub fn with_thread_buffer_capacity(mut self, capacity: usize) -> Self {
        self.thread_buffer_capacity = capacity;
        self
    }

    /// # Panics
    ///
    /// Panics if `chunk_shift` exceeds [`MAX_CHUNK_SHIFT`].
    pub fn with_chunk_shift(mut self, chunk_shift: u32) -> Self {
        assert!(
            chunk_shift <= MAX_CHUNK_SHIFT,
            "chunk shift {chunk_shift} exceeds {MAX_CHUNK_SHIFT}"
        );
        self.chunk_shift = chunk_shift;
        self
    }
}

impl Default for DebugDrawerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for a [`DebugDrawRenderer`](crate::DebugDrawRenderer).
///
/// Draws of up to `small_buffer_instances` use the pooled small buffer, up to
/// `large_buffer_instances` the pooled large one. Larger batches get a
/// temporary buffer destroyed after the draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererConfig {
    pub small_buffer_instances: usize,
    pub large_buffer_instances: usize,
    /// Most instances a single dynamic-path draw call writes.
    pub dynamic_batch_limit: usize,
}

impl RendererConfig {
    pub const DEFAULT_SMALL_BUFFER_INSTANCES: usize = 1024;
    pub const DEFAULT_LARGE_BUFFER_INSTANCES: usize = 16 * 1024;
    pub const DEFAULT_DYNAMIC_BATCH_LIMIT: usize = 100 * 1024;

    pub const fn new() -> Self {
        Self {
            small_buffer_instances: Self::DEFAULT_SMALL_BUFFER_INSTANCES,
            large_buffer_instances: Self::DEFAULT_LARGE_BUFFER_INSTANCES,
            dynamic_batch_limit: Self::DEFAULT_DYNAMIC_BATCH_LIMIT,
        }
    }

    pub fn with_small_buffer_instances(mut self, instances: usize) -> Self {
        self.small_buffer_instances = instances;
        self
    }

    pub fn with_large_buffer_instances(mut self, instances: usize) -> Self {
        self.large_buffer_instances = instances;
        self
    }

    pub fn with_dynamic_batch_limit(mut self, limit: usize) -> Self {
        self.dynamic_batch_limit = limit;
        self
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new()
    }
}
