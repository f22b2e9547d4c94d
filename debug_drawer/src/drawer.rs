use std::cell::RefCell;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::allocator::DrawAllocator;
use crate::config::DebugDrawerConfig;
use crate::deck::Deck;
use crate::primitives::Primitive;
use crate::queues::{PrimitiveQueues, QueueVisitor, StagingVisitor, ThreadStaging, TypedQueue};
use crate::staging::StagingBuffer;

/// Thread-safe debug primitive accumulator.
///
/// Primitives reach the shared per-type [`Deck`]s in two ways:
/// - [`add`](Self::add) / [`add_many`](Self::add_many) store directly under
///   the type's lock
/// - [`add_thread`](Self::add_thread) (or a [`ThreadContext`]) stages into
///   the calling thread's fixed-capacity buffer; the buffer is flushed when
///   full and by [`flush_all`](Self::flush_all)
///
/// Each producer thread index must be used by one thread at a time. The
/// render thread calls [`flush_all`](Self::flush_all), the renderer and
/// [`sweep_expired`](Self::sweep_expired) once producers for the frame are
/// done.
pub struct DebugDrawer {
    config: DebugDrawerConfig,
    allocator: Arc<DrawAllocator>,
    pub(crate) queues: PrimitiveQueues,
    pub(crate) threads: Vec<Mutex<ThreadStaging>>,
    pub(crate) redirect_target: RwLock<Option<Arc<DebugDrawer>>>,
    pub(crate) redirecting: AtomicBool,
}

impl DebugDrawer {
    /// Create a drawer with its own allocator.
    pub fn new(config: DebugDrawerConfig) -> Self {
        Self::with_allocator(config, DrawAllocator::new())
    }

    /// Create a drawer whose storage is tracked by `allocator`.
    ///
    /// # Panics
    ///
    /// Panics if `config.thread_buffer_capacity` is zero.
    pub fn with_allocator(config: DebugDrawerConfig, allocator: Arc<DrawAllocator>) -> Self {
        log::debug!(
            "DebugDrawer: {} producer threads, staging capacity {}, chunks of {}",
            config.thread_count,
            config.thread_buffer_capacity,
            1usize << config.chunk_shift
        );
        let threads = (0..config.thread_count)
            .map(|_| Mutex::new(ThreadStaging::new(config.thread_buffer_capacity)))
            .collect();
        Self {
            queues: PrimitiveQueues::new(config.chunk_shift, &allocator),
            threads,
            config,
            allocator,
            redirect_target: RwLock::new(None),
            redirecting: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &DebugDrawerConfig {
        &self.config
    }

    /// Number of producer threads with staging buffers.
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    pub fn allocator(&self) -> &Arc<DrawAllocator> {
        &self.allocator
    }

    /// Queue one primitive from the render thread.
    pub fn add<P: Primitive>(&self, item: P) {
        P::queue(&self.queues).lock().deck.add(item);
    }

    /// Queue a span of primitives under a single lock.
    pub fn add_many<P: Primitive>(&self, items: &[P]) {
        if items.is_empty() {
            return;
        }
        let mut state = P::queue(&self.queues).lock();
        store_stream(&mut state.deck, items);
    }

    /// Stage one primitive in `thread`'s buffer, flushing it first when full.
    ///
    /// Locks the thread's slot for this one call. Producers submitting many
    /// primitives should hold a [`ThreadContext`] instead.
    ///
    /// # Panics
    ///
    /// Panics if `thread` is not below [`thread_count`](Self::thread_count).
    pub fn add_thread<P: Primitive>(&self, thread: usize, item: P) {
        let mut slot = self.slot(thread);
        self.stage(&mut slot, thread, item);
    }

    /// Drawing context owning producer thread `thread`'s staging slot.
    ///
    /// The slot stays locked until the context is dropped, so adds through it
    /// take no lock unless a full buffer has to be flushed. Drop every context
    /// before the render thread flushes; calling [`flush_all`](Self::flush_all),
    /// [`flush_thread`](Self::flush_thread), [`staged_len`](Self::staged_len),
    /// [`is_empty`](Self::is_empty) or [`clear`](Self::clear) on the thread
    /// holding the context deadlocks.
    ///
    /// # Panics
    ///
    /// Panics if `thread` is not below [`thread_count`](Self::thread_count).
    pub fn thread(&self, thread: usize) -> ThreadContext<'_> {
        ThreadContext {
            drawer: self,
            thread,
            slot: RefCell::new(self.slot(thread)),
        }
    }

    /// Flush `thread`'s staged primitives of type `P`.
    pub fn flush<P: Primitive>(&self, thread: usize) {
        let mut slot = self.slot(thread);
        self.flush_staged(P::staging(&mut slot), thread);
    }

    /// Flush every staging buffer of `thread`.
    pub fn flush_thread(&self, thread: usize) {
        let mut slot = self.slot(thread);
        self.flush_slot(&mut slot, thread);
    }

    /// Flush every thread, then forward pending redirect deltas.
    pub fn flush_all(&self) {
        for thread in 0..self.threads.len() {
            self.flush_thread(thread);
        }
        if self.is_redirecting() {
            self.forward_redirect_deltas();
        }
    }

    /// Primitives of type `P` in the shared deck.
    pub fn len<P: Primitive>(&self) -> usize {
        P::queue(&self.queues).lock().deck.len()
    }

    /// Primitives of type `P` staged across all threads.
    pub fn staged_len<P: Primitive>(&self) -> usize {
        self.threads
            .iter()
            .map(|slot| P::staging(&mut slot.lock()).len())
            .sum()
    }

    /// Primitives of every type in the shared decks.
    pub fn total_len(&self) -> usize {
        let mut counter = LenCounter(0);
        self.queues.visit(&mut counter);
        counter.0
    }

    /// Whether no primitive is queued or staged.
    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
            && self.threads.iter().all(|slot| {
                let mut counter = StagedCounter(0);
                slot.lock().visit(&mut counter);
                counter.0 == 0
            })
    }

    /// Advance every queued primitive's lifetime by `dt` and drop the ones
    /// whose remaining duration is no longer positive.
    ///
    /// Removal frees the primitive's owned allocations. Returns the number of
    /// removed primitives.
    pub fn sweep_expired(&self, dt: f32) -> usize {
        let redirecting = self.is_redirecting();
        if redirecting {
            self.forward_redirect_deltas();
        }
        let mut sweep = SweepVisitor {
            dt,
            redirecting,
            removed: 0,
        };
        self.queues.visit(&mut sweep);
        if sweep.removed > 0 {
            log::trace!("DebugDrawer: swept {} expired primitives", sweep.removed);
        }
        sweep.removed
    }

    /// Drop every queued and staged primitive. Deck chunks stay allocated.
    pub fn clear(&self) {
        self.queues.visit(&mut ClearVisitor);
        for slot in &self.threads {
            slot.lock().visit(&mut ClearVisitor);
        }
    }

    /// Run `f` on the deck of type `P` under its lock.
    pub fn with_deck<P: Primitive, R>(&self, f: impl FnOnce(&Deck<P>) -> R) -> R {
        f(&P::queue(&self.queues).lock().deck)
    }

    /// Accept primitives forwarded from a per-thread redirect.
    ///
    /// They are staged on the same thread index when this drawer has one,
    /// otherwise stored directly.
    pub(crate) fn receive_thread<P: Primitive>(&self, thread: usize, items: &[P]) {
        if thread >= self.threads.len() {
            log::warn!(
                "DebugDrawer: redirect target has {} producer threads, storing forwarded thread {} directly",
                self.threads.len(),
                thread
            );
            self.add_many(items);
            return;
        }
        let mut slot = self.threads[thread].lock();
        let staging = P::staging(&mut slot);
        for item in items {
            if staging.is_full() {
                self.flush_staged(staging, thread);
            }
            staging.push(item.clone());
        }
    }

    /// Move `staging`'s contents into the shared deck or the redirect target.
    pub(crate) fn flush_staged<P: Primitive>(&self, staging: &mut StagingBuffer<P>, thread: usize) {
        if staging.is_empty() {
            return;
        }
        let items = staging.as_slice();

        if self.is_redirecting() {
            if let Some(target) = self.redirect_target() {
                target.add_many(items);
                log::trace!(
                    "DebugDrawer: forwarded {} staged {:?} from thread {}",
                    items.len(),
                    P::KIND,
                    thread
                );
                staging.clear();
                return;
            }
        }

        let split = staging
            .redirect_mark()
            .map_or(items.len(), |mark| mark.min(items.len()));
        let (local, forwarded) = items.split_at(split);
        if !local.is_empty() {
            self.store_local(local);
        }
        if !forwarded.is_empty() {
            match self.redirect_target() {
                Some(target) => target.receive_thread(thread, forwarded),
                None => self.store_local(forwarded),
            }
        }
        log::trace!(
            "DebugDrawer: flushed {} {:?} from thread {}",
            items.len(),
            P::KIND,
            thread
        );
        staging.clear();
    }

    fn stage<P: Primitive>(&self, slot: &mut ThreadStaging, thread: usize, item: P) {
        let staging = P::staging(slot);
        if staging.is_full() {
            self.flush_staged(staging, thread);
        }
        staging.push(item);
    }

    fn flush_slot(&self, slot: &mut ThreadStaging, thread: usize) {
        slot.visit(&mut FlushVisitor {
            drawer: self,
            thread,
        });
    }

    fn store_local<P: Primitive>(&self, items: &[P]) {
        let mut state = P::queue(&self.queues).lock();
        store_stream(&mut state.deck, items);
    }

    pub(crate) fn slot(&self, thread: usize) -> MutexGuard<'_, ThreadStaging> {
        self.assert_thread(thread);
        self.threads[thread].lock()
    }

    fn assert_thread(&self, thread: usize) {
        assert!(
            thread < self.threads.len(),
            "thread index {thread} out of range for {} producer threads",
            self.threads.len()
        );
    }
}

impl Default for DebugDrawer {
    fn default() -> Self {
        Self::new(DebugDrawerConfig::default())
    }
}

impl std::fmt::Debug for DebugDrawer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugDrawer")
            .field("config", &self.config)
            .field("queued", &self.total_len())
            .field("redirecting", &self.is_redirecting())
            .finish()
    }
}

/// Bulk-copy `items` into `deck`, growing one chunk at a time under the
/// allocator's growth lock when it lacks room.
fn store_stream<P: Clone>(deck: &mut Deck<P>, items: &[P]) {
    if deck.try_add_stream(items) {
        return;
    }
    let allocator = Arc::clone(deck.allocator());
    let growth = allocator.lock_growth();
    while !deck.try_add_stream(items) {
        deck.grow_locked(1, &growth);
    }
    log::trace!(
        "DebugDrawer: deck grown to {} chunks for {} elements",
        deck.chunk_count(),
        items.len()
    );
}

/// A producer thread's handle to a [`DebugDrawer`].
///
/// Holds the thread's staging slot for its whole lifetime; primitives
/// submitted through it are staged without locking. Obtain via
/// [`DebugDrawer::thread`] on the producer thread itself.
pub struct ThreadContext<'a> {
    drawer: &'a DebugDrawer,
    thread: usize,
    slot: RefCell<MutexGuard<'a, ThreadStaging>>,
}

impl<'a> ThreadContext<'a> {
    pub fn drawer(&self) -> &'a DebugDrawer {
        self.drawer
    }

    pub fn thread_index(&self) -> usize {
        self.thread
    }

    pub fn add<P: Primitive>(&self, item: P) {
        let mut slot = self.slot.borrow_mut();
        self.drawer.stage(&mut slot, self.thread, item);
    }

    /// Flush this thread's staging buffers.
    pub fn flush(&self) {
        let mut slot = self.slot.borrow_mut();
        self.drawer.flush_slot(&mut slot, self.thread);
    }
}

impl std::fmt::Debug for ThreadContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadContext")
            .field("thread", &self.thread)
            .finish()
    }
}

struct FlushVisitor<'a> {
    drawer: &'a DebugDrawer,
    thread: usize,
}

impl StagingVisitor for FlushVisitor<'_> {
    fn visit<P: Primitive>(&mut self, staging: &mut StagingBuffer<P>) {
        self.drawer.flush_staged(staging, self.thread);
    }
}

struct SweepVisitor {
    dt: f32,
    redirecting: bool,
    removed: usize,
}

impl QueueVisitor for SweepVisitor {
    fn visit<P: Primitive>(&mut self, queue: &TypedQueue<P>) {
        let dt = self.dt;
        let mut state = queue.lock();
        self.removed += state.deck.retain(|item| {
            let options = item.options_mut();
            options.duration -= dt;
            options.duration > 0.0
        });
        // Removal reorders the deck; the survivors are the new snapshot.
        if self.redirecting {
            state.redirect_count = state.deck.len();
        }
    }
}

struct ClearVisitor;

impl QueueVisitor for ClearVisitor {
    fn visit<P: Primitive>(&mut self, queue: &TypedQueue<P>) {
        let mut state = queue.lock();
        state.deck.clear();
        state.redirect_count = 0;
    }
}

impl StagingVisitor for ClearVisitor {
    fn visit<P: Primitive>(&mut self, staging: &mut StagingBuffer<P>) {
        staging.clear();
    }
}

struct LenCounter(usize);

impl QueueVisitor for LenCounter {
    fn visit<P: Primitive>(&mut self, queue: &TypedQueue<P>) {
        self.0 += queue.lock().deck.len();
    }
}

struct StagedCounter(usize);

impl StagingVisitor for StagedCounter {
    fn visit<P: Primitive>(&mut self, staging: &mut StagingBuffer<P>) {
        self.0 += staging.len();
    }
}
