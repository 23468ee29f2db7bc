use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Fixed pool of pre-allocated preview buffers.
///
/// Buffers are sized to the negotiated resolution's encoding footprint,
/// handed to the device one at a time, lent to observers for the duration
/// of a single callback, and recycled when the `PooledBuffer` drops.
/// The pool never allocates after construction; when every buffer is
/// checked out, `acquire` returns `None` and the frame is dropped.
#[derive(Debug)]
pub struct FramePool {
    inner: Arc<PoolInner>,
}

#[derive(Debug)]
struct PoolInner {
    free: Mutex<Vec<Vec<u8>>>,
    buffer_size: usize,
    capacity: usize,
    starved: AtomicU64,
}

impl FramePool {
    pub fn new(buffer_size: usize, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let free = (0..capacity).map(|_| vec![0u8; buffer_size]).collect();
        Self {
            inner: Arc::new(PoolInner {
                free: Mutex::new(free),
                buffer_size,
                capacity,
                starved: AtomicU64::new(0),
            }),
        }
    }

    /// Check out a buffer, or `None` when the pool is exhausted.
    pub fn acquire(&self) -> Option<PooledBuffer> {
        match self.inner.free.lock().pop() {
            Some(data) => Some(PooledBuffer {
                data,
                pool: Arc::clone(&self.inner),
            }),
            None => {
                self.inner.starved.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Buffers currently checked in.
    pub fn available(&self) -> usize {
        self.inner.free.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn buffer_size(&self) -> usize {
        self.inner.buffer_size
    }

    /// Number of acquire attempts that found the pool empty.
    pub fn starved(&self) -> u64 {
        self.inner.starved.load(Ordering::Relaxed)
    }
}

/// A checked-out preview buffer; returns itself to the pool on drop.
#[derive(Debug)]
pub struct PooledBuffer {
    data: Vec<u8>,
    pool: Arc<PoolInner>,
}

impl std::ops::Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl std::ops::DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let data = std::mem::take(&mut self.data);
        self.pool.free.lock().push(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_are_preallocated_to_size() {
        let pool = FramePool::new(1280 * 720 * 3 / 2, 4);
        assert_eq!(pool.buffer_size(), 1280 * 720 * 3 / 2);
        let buf = pool.acquire().unwrap();
        assert_eq!(buf.len(), 1280 * 720 * 3 / 2);
        assert_eq!(pool.available(), 3);
    }

    #[test]
    fn exhaustion_returns_none_and_counts() {
        let pool = FramePool::new(16, 2);
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert!(pool.acquire().is_none());
        assert!(pool.acquire().is_none());
        assert_eq!(pool.starved(), 2);
        drop(a);
        drop(b);
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn dropped_buffers_recycle() {
        let pool = FramePool::new(8, 1);
        {
            let mut buf = pool.acquire().unwrap();
            buf[0] = 0xAB;
            assert_eq!(pool.available(), 0);
        }
        assert_eq!(pool.available(), 1);
        // Recycled buffer keeps its allocation (and stale contents).
        let buf = pool.acquire().unwrap();
        assert_eq!(buf.len(), 8);
        assert_eq!(buf[0], 0xAB);
    }

    #[test]
    fn zero_capacity_clamped_to_one() {
        let pool = FramePool::new(4, 0);
        assert_eq!(pool.capacity(), 1);
        assert!(pool.acquire().is_some());
    }
}
