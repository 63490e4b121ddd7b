use std::sync::Arc;

use parking_lot::RwLock;

/// Fixed-capacity, oldest-first series used for chart rendering.
///
/// Every push swaps in a fresh immutable snapshot, so readers holding an
/// `Arc<[T]>` never observe a half-applied update.
pub struct RollingBuffer<T> {
    capacity: usize,
    points: RwLock<Arc<[T]>>,
}

impl<T: Clone> RollingBuffer<T> {
    /// A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            points: RwLock::new(Arc::from(Vec::new())),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append `item`, evicting from the front once over capacity.
    pub fn push(&self, item: T) {
        let mut guard = self.points.write();
        let keep = guard.len().min(self.capacity - 1);
        let skip = guard.len() - keep;

        let mut next = Vec::with_capacity(keep + 1);
        next.extend(guard[skip..].iter().cloned());
        next.push(item);

        *guard = Arc::from(next);
    }

    pub fn snapshot(&self) -> Arc<[T]> {
        self.points.read().clone()
    }

    pub fn len(&self) -> usize {
        self.points.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_most_recent_points_oldest_first() {
        let buf = RollingBuffer::new(10);
        for i in 0..15 {
            buf.push(i);
            assert!(buf.len() <= 10);
        }
        let snap = buf.snapshot();
        assert_eq!(&snap[..], &(5..15).collect::<Vec<_>>()[..]);
    }

    #[test]
    fn snapshots_are_not_affected_by_later_pushes() {
        let buf = RollingBuffer::new(3);
        buf.push("a");
        buf.push("b");
        let before = buf.snapshot();
        buf.push("c");
        buf.push("d");
        assert_eq!(&before[..], &["a", "b"]);
        assert_eq!(&buf.snapshot()[..], &["b", "c", "d"]);
    }

    #[test]
    fn zero_capacity_holds_one() {
        let buf = RollingBuffer::new(0);
        buf.push(1);
        buf.push(2);
        assert_eq!(buf.capacity(), 1);
        assert_eq!(&buf.snapshot()[..], &[2]);
    }
}
