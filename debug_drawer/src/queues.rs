//! Per-type queues and per-thread staging slots.
//!
//! One field per primitive type, generated from a single list so that the
//! shared queues, the staging slots and their visitors never drift apart.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::allocator::DrawAllocator;
use crate::deck::Deck;
use crate::primitives::{
    DebugAabb, DebugArrow, DebugCircle, DebugCross, DebugGrid, DebugLine, DebugOobb, DebugPoint,
    DebugRectangle, DebugSphere, DebugString, DebugTriangle, Primitive,
};
use crate::staging::StagingBuffer;

/// A primitive type's shared store and its redirect snapshot.
pub struct QueueState<P> {
    pub deck: Deck<P>,
    /// Deck length when the global redirect began. Elements past it are
    /// forwarded on the next flush.
    pub redirect_count: usize,
}

impl<P> QueueState<P> {
    /// Elements queued since the redirect snapshot.
    pub fn redirect_delta(&self) -> usize {
        self.deck.len().saturating_sub(self.redirect_count)
    }
}

/// The per-type lock guarding one primitive type's [`Deck`].
pub struct TypedQueue<P> {
    state: Mutex<QueueState<P>>,
}

impl<P> TypedQueue<P> {
    fn new(chunk_shift: u32, allocator: &Arc<DrawAllocator>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                deck: Deck::new(chunk_shift, Arc::clone(allocator)),
                redirect_count: 0,
            }),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, QueueState<P>> {
        self.state.lock()
    }
}

/// Visits every shared queue with its concrete primitive type.
pub(crate) trait QueueVisitor {
    fn visit<P: Primitive>(&mut self, queue: &TypedQueue<P>);
}

/// Visits every staging buffer of one thread slot.
pub(crate) trait StagingVisitor {
    fn visit<P: Primitive>(&mut self, staging: &mut StagingBuffer<P>);
}

macro_rules! declare_queues {
    ($($field:ident: $ty:ty),+ $(,)?) => {
        /// Shared per-type queues of a drawer.
        pub struct PrimitiveQueues {
            $(pub(crate) $field: TypedQueue<$ty>,)+
        }

        impl PrimitiveQueues {
            pub(crate) fn new(chunk_shift: u32, allocator: &Arc<DrawAllocator>) -> Self {
                Self {
                    $($field: TypedQueue::new(chunk_shift, allocator),)+
                }
            }

            pub(crate) fn visit<V: QueueVisitor>(&self, visitor: &mut V) {
                $(visitor.visit(&self.$field);)+
            }
        }

        /// One producer thread's staging buffers.
        pub struct ThreadStaging {
            $(pub(crate) $field: StagingBuffer<$ty>,)+
            /// Whether a per-thread redirect is active on this slot.
            pub(crate) redirecting: bool,
        }

        impl ThreadStaging {
            pub(crate) fn new(capacity: usize) -> Self {
                Self {
                    $($field: StagingBuffer::new(capacity),)+
                    redirecting: false,
                }
            }

            pub(crate) fn visit<V: StagingVisitor>(&mut self, visitor: &mut V) {
                $(visitor.visit(&mut self.$field);)+
            }
        }
    };
}

declare_queues! {
    lines: DebugLine,
    spheres: DebugSphere,
    points: DebugPoint,
    rectangles: DebugRectangle,
    crosses: DebugCross,
    circles: DebugCircle,
    arrows: DebugArrow,
    triangles: DebugTriangle,
    aabbs: DebugAabb,
    oobbs: DebugOobb,
    strings: DebugString,
    grids: DebugGrid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::PrimitiveKind;

    struct KindCollector(Vec<PrimitiveKind>);

    impl QueueVisitor for KindCollector {
        fn visit<P: Primitive>(&mut self, _queue: &TypedQueue<P>) {
            self.0.push(P::KIND);
        }
    }

    impl StagingVisitor for KindCollector {
        fn visit<P: Primitive>(&mut self, staging: &mut StagingBuffer<P>) {
            assert_eq!(staging.capacity(), 4);
            self.0.push(P::KIND);
        }
    }

    #[test]
    fn test_queue_visitor_covers_every_kind() {
        let queues = PrimitiveQueues::new(4, &DrawAllocator::new());
        let mut collector = KindCollector(Vec::new());
        queues.visit(&mut collector);
        assert_eq!(collector.0, PrimitiveKind::ALL);
    }

    #[test]
    fn test_staging_visitor_covers_every_kind() {
        let mut slot = ThreadStaging::new(4);
        let mut collector = KindCollector(Vec::new());
        slot.visit(&mut collector);
        assert_eq!(collector.0, PrimitiveKind::ALL);
    }
}
