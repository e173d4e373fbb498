//! Reusable byte buffers for template execution
//!
//! Templates are executed into a pooled buffer so that a failing render never
//! leaves partial output on the response, and so that busy servers do not
//! allocate a fresh buffer per request.
//!
//! Buffers are handed out as [`PooledBuffer`] guards which go back to the
//! pool when dropped, on success and error paths alike.

use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Number of idle buffers kept by [`BufferPool::default`]
pub const DEFAULT_POOL_CAPACITY: usize = 64;

/// Concurrency-safe pool of byte buffers
///
/// [`acquire`](Self::acquire) never blocks: it allocates when the pool is
/// empty. At most `capacity` idle buffers are retained.
#[derive(Debug, Clone)]
pub struct BufferPool {
    idle: Arc<Mutex<Vec<Vec<u8>>>>,
    capacity: usize,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_CAPACITY)
    }
}

impl BufferPool {
    /// Create a pool retaining up to `capacity` idle buffers
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            idle: Arc::new(Mutex::new(Vec::with_capacity(capacity))),
            capacity,
        }
    }

    /// Take an empty buffer from the pool
    #[must_use]
    pub fn acquire(&self) -> PooledBuffer {
        let buf = self.idle.lock().pop().unwrap_or_default();
        PooledBuffer {
            buf,
            pool: self.clone(),
        }
    }

    /// Return a buffer to the pool
    ///
    /// The buffer is cleared first. It is dropped when the pool is full.
    pub fn release(&self, mut buf: Vec<u8>) {
        buf.clear();
        let mut idle = self.idle.lock();
        if idle.len() < self.capacity {
            idle.push(buf);
        }
    }

    /// Number of idle buffers currently held
    #[must_use]
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    /// Maximum number of idle buffers retained
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A buffer borrowed from a [`BufferPool`]
///
/// Dereferences to `Vec<u8>` and returns itself to the pool on drop.
#[derive(Debug)]
pub struct PooledBuffer {
    buf: Vec<u8>,
    pool: BufferPool,
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_allocates_when_empty() {
        let pool = BufferPool::new(2);
        assert_eq!(pool.idle(), 0);

        let buf = pool.acquire();
        assert!(buf.is_empty());
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_drop_returns_cleared_buffer() {
        let pool = BufferPool::new(2);
        {
            let mut buf = pool.acquire();
            buf.extend_from_slice(b"hello");
        }
        assert_eq!(pool.idle(), 1);

        let buf = pool.acquire();
        assert!(buf.is_empty());
        assert!(buf.capacity() >= 5);
    }

    #[test]
    fn test_capacity_bounds_idle_buffers() {
        let pool = BufferPool::new(1);
        let first = pool.acquire();
        let second = pool.acquire();
        drop(first);
        drop(second);
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_clones_share_buffers() {
        let pool = BufferPool::default();
        let other = pool.clone();
        drop(other.acquire());
        assert_eq!(pool.idle(), 1);
        assert_eq!(pool.capacity(), DEFAULT_POOL_CAPACITY);
    }
}
