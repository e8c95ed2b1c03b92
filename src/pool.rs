//! Shared scratch-buffer pool
//!
//! Buffers are bucketed by power-of-two capacity. [`BufferPool::rent`] hands
//! out a zero-filled [`PooledBuffer`] whose `Drop` puts the allocation back,
//! so a buffer is returned on every exit path, including `?` propagation and
//! unwinding out of a parallel task.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock};

use tracing::trace;

/// Number of power-of-two size classes (covers every `usize` capacity)
const SIZE_CLASSES: usize = usize::BITS as usize;

/// Pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Idle buffers kept per size class; extra returns are dropped
    pub max_idle_per_class: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_class: 32,
        }
    }
}

/// Rent/return counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Buffers handed out
    pub rented: usize,
    /// Buffers given back
    pub returned: usize,
    /// Rents that had to allocate
    pub misses: usize,
}

impl PoolStats {
    /// Buffers currently checked out
    pub fn outstanding(&self) -> usize {
        self.rented - self.returned
    }
}

/// Size-classed pool of `Vec<f64>` scratch buffers
pub struct BufferPool {
    config: PoolConfig,
    classes: Vec<Mutex<Vec<Vec<f64>>>>,
    rented: AtomicUsize,
    returned: AtomicUsize,
    misses: AtomicUsize,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl BufferPool {
    /// Create an empty pool
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            classes: (0..SIZE_CLASSES).map(|_| Mutex::new(Vec::new())).collect(),
            rented: AtomicUsize::new(0),
            returned: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Process-wide pool used by the solvers and the recursive multiply
    pub fn global() -> &'static BufferPool {
        static POOL: OnceLock<BufferPool> = OnceLock::new();
        POOL.get_or_init(BufferPool::default)
    }

    fn class_of(len: usize) -> usize {
        len.max(1).next_power_of_two().trailing_zeros() as usize
    }

    fn bucket(&self, class: usize) -> MutexGuard<'_, Vec<Vec<f64>>> {
        // A poisoned bucket only holds plain buffers; keep using it
        self.classes[class]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Rent a zero-filled buffer of exactly `len` elements
    pub fn rent(&self, len: usize) -> PooledBuffer<'_> {
        let class = Self::class_of(len);
        self.rented.fetch_add(1, Ordering::Relaxed);
        let reused = self.bucket(class).pop();
        let mut buf = match reused {
            Some(buf) => buf,
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                trace!(len, capacity = 1usize << class, "buffer pool miss");
                Vec::with_capacity(1 << class)
            }
        };
        buf.clear();
        buf.resize(len, 0.0);
        PooledBuffer {
            buf,
            class,
            pool: self,
        }
    }

    fn give_back(&self, class: usize, buf: Vec<f64>) {
        self.returned.fetch_add(1, Ordering::Relaxed);
        let mut bucket = self.bucket(class);
        if bucket.len() < self.config.max_idle_per_class {
            bucket.push(buf);
        }
    }

    /// Snapshot of the rent/return counters
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            rented: self.rented.load(Ordering::Relaxed),
            returned: self.returned.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Idle buffers currently held in the class that serves `len`
    pub fn idle(&self, len: usize) -> usize {
        self.bucket(Self::class_of(len)).len()
    }
}

/// Scoped lease of a pool buffer; returned to the pool on drop
pub struct PooledBuffer<'a> {
    buf: Vec<f64>,
    class: usize,
    pool: &'a BufferPool,
}

impl Deref for PooledBuffer<'_> {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut [f64] {
        &mut self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        let buf = std::mem::take(&mut self.buf);
        self.pool.give_back(self.class, buf);
    }
}
