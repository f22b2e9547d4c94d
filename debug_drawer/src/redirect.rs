//! Forwarding queued primitives into another drawer.
//!
//! A redirect mirrors what one [`DebugDrawer`] receives into a target drawer,
//! e.g. game-view debug draws into an editor viewport. Forwarding is
//! delta-based: beginning a redirect snapshots each deck's length, and
//! everything queued past the snapshot moves to the target on the next flush,
//! sweep or [`end_redirect`](DebugDrawer::end_redirect). Nothing is paid per
//! add.
//!
//! The per-thread variant marks one thread's staging buffers instead and
//! forwards only what that thread stages afterwards.
//!
//! Redirect chains must not form a cycle.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::drawer::DebugDrawer;
use crate::primitives::Primitive;
use crate::queues::{QueueVisitor, StagingVisitor, TypedQueue};
use crate::staging::StagingBuffer;

/// An open global redirect, returned by [`DebugDrawer::begin_redirect`].
#[must_use = "pass the session to `end_redirect`"]
#[derive(Debug)]
pub struct RedirectSession {
    nested: bool,
}

impl RedirectSession {
    /// Whether the redirect was already active (or impossible) when this
    /// session began. Ending a nested session does nothing.
    pub fn is_nested(&self) -> bool {
        self.nested
    }
}

/// An open per-thread redirect, returned by
/// [`DebugDrawer::begin_thread_redirect`].
#[must_use = "pass the session to `end_thread_redirect`"]
#[derive(Debug)]
pub struct ThreadRedirectSession {
    thread: usize,
    nested: bool,
}

impl ThreadRedirectSession {
    pub fn thread_index(&self) -> usize {
        self.thread
    }

    pub fn is_nested(&self) -> bool {
        self.nested
    }
}

impl DebugDrawer {
    /// Set or clear the drawer redirects forward into.
    ///
    /// # Panics
    ///
    /// Panics if `target` is this drawer.
    pub fn set_redirect_target(&self, target: Option<Arc<DebugDrawer>>) {
        if let Some(target) = &target {
            assert!(
                !std::ptr::eq(Arc::as_ptr(target), self),
                "a debug drawer cannot redirect into itself"
            );
        }
        *self.redirect_target.write() = target;
    }

    pub fn redirect_target(&self) -> Option<Arc<DebugDrawer>> {
        self.redirect_target.read().clone()
    }

    /// Whether the global redirect is active.
    pub fn is_redirecting(&self) -> bool {
        self.redirecting.load(Ordering::Acquire)
    }

    /// Start forwarding everything queued from now on.
    ///
    /// Flushes all threads, then snapshots every deck. Without a redirect
    /// target, or while already redirecting, returns a nested session and
    /// changes nothing. Of concurrent callers exactly one gets the
    /// non-nested session.
    pub fn begin_redirect(&self) -> RedirectSession {
        if self.is_redirecting() {
            return RedirectSession { nested: true };
        }
        if self.redirect_target.read().is_none() {
            log::debug!("DebugDrawer: redirect requested without a target");
            return RedirectSession { nested: true };
        }
        self.flush_all();
        // Once the flag is set, flushes forward everything past the snapshot,
        // so the snapshot is taken first. A repeated snapshot by a losing
        // caller sees no delta and is harmless.
        self.queues.visit(&mut SnapshotVisitor);
        if self
            .redirecting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return RedirectSession { nested: true };
        }
        log::debug!("DebugDrawer: redirect started");
        RedirectSession { nested: false }
    }

    /// Close a global redirect, forwarding everything queued since it began.
    pub fn end_redirect(&self, session: RedirectSession) {
        if session.nested || !self.is_redirecting() {
            return;
        }
        self.flush_all();
        self.redirecting.store(false, Ordering::Release);
        self.queues.visit(&mut ResetSnapshotVisitor);
        log::debug!("DebugDrawer: redirect ended");
    }

    /// Start forwarding what `thread` stages from now on.
    ///
    /// Does not flush. Without a redirect target, or while the thread is
    /// already redirecting, returns a nested session.
    ///
    /// # Panics
    ///
    /// Panics if `thread` is not below [`thread_count`](Self::thread_count).
    pub fn begin_thread_redirect(&self, thread: usize) -> ThreadRedirectSession {
        let mut slot = self.slot(thread);
        if slot.redirecting || self.redirect_target.read().is_none() {
            return ThreadRedirectSession {
                thread,
                nested: true,
            };
        }
        slot.visit(&mut MarkVisitor);
        slot.redirecting = true;
        log::debug!("DebugDrawer: thread {} redirect started", thread);
        ThreadRedirectSession {
            thread,
            nested: false,
        }
    }

    /// Close a per-thread redirect, flushing the thread so that everything
    /// staged since it began reaches the target.
    pub fn end_thread_redirect(&self, session: ThreadRedirectSession) {
        if session.nested {
            return;
        }
        let thread = session.thread;
        let mut slot = self.slot(thread);
        if !slot.redirecting {
            return;
        }
        slot.visit(&mut EndThreadRedirectVisitor {
            drawer: self,
            thread,
        });
        slot.redirecting = false;
        log::debug!("DebugDrawer: thread {} redirect ended", thread);
    }

    /// Move every deck's elements past the redirect snapshot to the target.
    pub(crate) fn forward_redirect_deltas(&self) {
        let Some(target) = self.redirect_target() else {
            return;
        };
        let mut forward = ForwardVisitor {
            target: &target,
            forwarded: 0,
        };
        self.queues.visit(&mut forward);
        if forward.forwarded > 0 {
            log::trace!(
                "DebugDrawer: forwarded {} primitives to redirect target",
                forward.forwarded
            );
        }
    }
}

struct SnapshotVisitor;

impl QueueVisitor for SnapshotVisitor {
    fn visit<P: Primitive>(&mut self, queue: &TypedQueue<P>) {
        let mut state = queue.lock();
        state.redirect_count = state.deck.len();
    }
}

struct ResetSnapshotVisitor;

impl QueueVisitor for ResetSnapshotVisitor {
    fn visit<P: Primitive>(&mut self, queue: &TypedQueue<P>) {
        queue.lock().redirect_count = 0;
    }
}

struct ForwardVisitor<'a> {
    target: &'a DebugDrawer,
    forwarded: usize,
}

impl QueueVisitor for ForwardVisitor<'_> {
    fn visit<P: Primitive>(&mut self, queue: &TypedQueue<P>) {
        let delta = {
            let mut state = queue.lock();
            let count = state.redirect_delta();
            state.deck.split_off_tail(count)
        };
        if delta.is_empty() {
            return;
        }
        self.forwarded += delta.len();
        self.target.add_many(&delta);
    }
}

struct MarkVisitor;

impl StagingVisitor for MarkVisitor {
    fn visit<P: Primitive>(&mut self, staging: &mut StagingBuffer<P>) {
        staging.set_redirect_mark(Some(staging.len()));
    }
}

struct EndThreadRedirectVisitor<'a> {
    drawer: &'a DebugDrawer,
    thread: usize,
}

impl StagingVisitor for EndThreadRedirectVisitor<'_> {
    fn visit<P: Primitive>(&mut self, staging: &mut StagingBuffer<P>) {
        self.drawer.flush_staged(staging, self.thread);
        staging.set_redirect_mark(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DebugDrawerConfig;
    use crate::primitives::{DebugLine, DebugSphere};
    use glam::Vec3;

    fn pair(source_threads: usize, target_threads: usize) -> (DebugDrawer, Arc<DebugDrawer>) {
        let config = DebugDrawerConfig::new().with_thread_buffer_capacity(4);
        let source = DebugDrawer::new(config.with_thread_count(source_threads));
        let target = Arc::new(DebugDrawer::new(config.with_thread_count(target_threads)));
        source.set_redirect_target(Some(Arc::clone(&target)));
        (source, target)
    }

    fn line(x: f32) -> DebugLine {
        DebugLine::new(Vec3::new(x, 0.0, 0.0), Vec3::X)
    }

    #[test]
    fn test_forwards_exactly_the_delta() {
        let (source, target) = pair(1, 1);
        for i in 0..3 {
            source.add(line(i as f32));
        }

        let session = source.begin_redirect();
        assert!(!session.is_nested());
        source.add(line(10.0));
        source.add(line(11.0));
        source.end_redirect(session);

        assert_eq!(source.len::<DebugLine>(), 3);
        assert_eq!(target.len::<DebugLine>(), 2);
        target.with_deck::<DebugLine, _>(|deck| {
            let xs: Vec<_> = deck.iter().map(|l| l.start.x).collect();
            assert_eq!(xs, vec![10.0, 11.0]);
        });
        assert!(!source.is_redirecting());
    }

    #[test]
    fn test_nested_session_forwards_nothing() {
        let (source, target) = pair(1, 1);
        source.add(line(0.0));

        let outer = source.begin_redirect();
        let inner = source.begin_redirect();
        assert!(inner.is_nested());
        source.add(line(1.0));
        source.add(line(2.0));

        source.end_redirect(inner);
        assert_eq!(target.len::<DebugLine>(), 0);
        assert!(source.is_redirecting());

        source.end_redirect(outer);
        assert_eq!(target.len::<DebugLine>(), 2);
    }

    #[test]
    fn test_concurrent_begin_yields_one_session() {
        let (source, target) = pair(1, 1);
        let barrier = std::sync::Barrier::new(4);
        let sessions: Vec<RedirectSession> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        source.begin_redirect()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(sessions.iter().filter(|s| !s.is_nested()).count(), 1);
        assert!(source.is_redirecting());

        source.add(line(1.0));
        for session in sessions {
            source.end_redirect(session);
        }
        assert!(!source.is_redirecting());
        assert_eq!(target.len::<DebugLine>(), 1);
    }

    #[test]
    fn test_begin_flushes_staging_locally() {
        let (source, target) = pair(1, 1);
        source.add_thread(0, line(0.0));

        let session = source.begin_redirect();
        assert_eq!(source.len::<DebugLine>(), 1);

        source.add_thread(0, line(1.0));
        source.add_thread(0, DebugSphere::new(Vec3::ZERO, 1.0));
        source.flush_all();
        assert_eq!(target.len::<DebugLine>(), 1);
        assert_eq!(target.len::<DebugSphere>(), 1);

        source.end_redirect(session);
        assert_eq!(source.len::<DebugLine>(), 1);
        assert_eq!(target.total_len(), 2);
    }

    #[test]
    fn test_sweep_forwards_before_expiring() {
        let (source, target) = pair(1, 1);
        let session = source.begin_redirect();
        source.add(line(0.0));
        source.sweep_expired(1.0);
        assert_eq!(target.len::<DebugLine>(), 1);
        source.end_redirect(session);
        assert_eq!(target.len::<DebugLine>(), 1);
    }

    #[test]
    fn test_without_target_is_a_noop() {
        let drawer = DebugDrawer::default();
        drawer.add(line(0.0));
        let session = drawer.begin_redirect();
        assert!(session.is_nested());
        assert!(!drawer.is_redirecting());
        drawer.end_redirect(session);
        assert_eq!(drawer.len::<DebugLine>(), 1);
    }

    #[test]
    fn test_thread_redirect_forwards_after_mark() {
        let (source, target) = pair(2, 2);
        source.add_thread(1, line(0.0));

        let session = source.begin_thread_redirect(1);
        source.add_thread(1, line(1.0));
        source.add_thread(1, line(2.0));
        source.add_thread(0, line(3.0));
        source.end_thread_redirect(session);

        assert_eq!(source.len::<DebugLine>(), 1);
        assert_eq!(source.staged_len::<DebugLine>(), 1);
        assert_eq!(target.staged_len::<DebugLine>(), 2);
        target.flush_all();
        assert_eq!(target.len::<DebugLine>(), 2);
    }

    #[test]
    fn test_thread_redirect_survives_auto_flush() {
        let (source, target) = pair(1, 1);
        let session = source.begin_thread_redirect(0);
        for i in 0..9 {
            source.add_thread(0, line(i as f32));
        }
        source.end_thread_redirect(session);
        target.flush_all();
        assert_eq!(source.len::<DebugLine>(), 0);
        assert_eq!(target.len::<DebugLine>(), 9);
    }

    #[test]
    fn test_thread_redirect_into_fewer_threads() {
        let (source, target) = pair(2, 1);
        let session = source.begin_thread_redirect(1);
        source.add_thread(1, line(0.0));
        source.end_thread_redirect(session);
        assert_eq!(target.len::<DebugLine>(), 1);
    }

    #[test]
    #[should_panic(expected = "into itself")]
    fn test_self_redirect_panics() {
        let drawer = Arc::new(DebugDrawer::default());
        drawer.set_redirect_target(Some(Arc::clone(&drawer)));
    }
}
