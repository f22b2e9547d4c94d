//! Fixed-capacity per-thread staging buffers.

/// A fixed-capacity buffer absorbing one thread's adds of one primitive type.
///
/// Written only by its owning producer thread; drained by the flush engine.
#[derive(Debug, Clone)]
pub struct StagingBuffer<T> {
    items: Vec<T>,
    capacity: usize,
    /// Buffer length when a per-thread redirect began. Elements past this
    /// mark are forwarded instead of flushed locally.
    redirect_mark: Option<usize>,
}

impl<T> StagingBuffer<T> {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "staging buffer capacity must be non-zero");
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
            redirect_mark: None,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Stage one element.
    ///
    /// The caller flushes first when the buffer [is full](Self::is_full).
    pub fn push(&mut self, item: T) {
        debug_assert!(!self.is_full(), "staging buffer overflow");
        self.items.push(item);
    }

    /// Drop all staged elements. Resets any redirect mark to zero.
    pub fn clear(&mut self) {
        self.items.clear();
        if let Some(mark) = &mut self.redirect_mark {
            *mark = 0;
        }
    }

    pub(crate) fn redirect_mark(&self) -> Option<usize> {
        self.redirect_mark
    }

    pub(crate) fn set_redirect_mark(&mut self, mark: Option<usize>) {
        self.redirect_mark = mark;
    }
}
