//! The plugin-side FIFO of dataplane contexts waiting to be encoded.
//!
//! The engine pushes contexts in from its own thread as routes change;
//! the plugin thread drains them in order. A mutex-guarded `VecDeque`
//! plus atomic counters keeps the len/peak readable without locking from
//! the counters snapshot path.

use std::{
    collections::VecDeque,
    sync::atomic::{AtomicU32, Ordering},
};

use parking_lot::Mutex;

use crate::context::DplaneContext;

/// FIFO of contexts queued for encoding.
#[derive(Default)]
pub struct ContextQueue {
    items: Mutex<VecDeque<DplaneContext>>,
    len: AtomicU32,
    peak: AtomicU32,
}

impl ContextQueue {
    pub fn new() -> Self {
        ContextQueue::default()
    }

    /// Push one context onto the back of the queue.
    ///
    /// The length counter is incremented before the item becomes visible
    /// to a concurrent `pop_front`, so a reader can never observe a
    /// length lower than the number of items actually in the deque.
    pub fn push(&self, ctx: DplaneContext) {
        let mut items = self.items.lock();
        items.push_back(ctx);
        let new_len = self.len.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak.fetch_max(new_len, Ordering::Relaxed);
    }

    /// Pop the oldest context, if any.
    pub fn pop_front(&self) -> Option<DplaneContext> {
        let mut items = self.items.lock();
        let ctx = items.pop_front()?;
        self.len.fetch_sub(1, Ordering::Relaxed);
        Some(ctx)
    }

    pub fn len(&self) -> u32 {
        self.len.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn peak(&self) -> u32 {
        self.peak.load(Ordering::Relaxed)
    }

    pub fn reset_peak(&self) {
        self.peak.store(self.len(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::context::{DplaneContextBuilder, DplaneOp};

    fn ctx() -> DplaneContext {
        DplaneContextBuilder::default()
            .op(DplaneOp::Other)
            .build()
            .unwrap()
    }

    #[test]
    fn fifo_order_is_preserved() {
        let q = ContextQueue::new();
        q.push(ctx());
        q.push(ctx());
        assert_eq!(q.len(), 2);
        assert!(q.pop_front().is_some());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn peak_tracks_high_water_mark() {
        let q = ContextQueue::new();
        q.push(ctx());
        q.push(ctx());
        q.pop_front();
        assert_eq!(q.peak(), 2);
        assert_eq!(q.len(), 1);
    }
}
