//! Fork-join helpers
//!
//! Each helper runs on the rayon pool when the `parallel` feature is on and
//! the work count exceeds its threshold, and on the calling thread otherwise.
//! Tasks own disjoint output slots; nothing here takes a lock.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::PARALLEL_THRESHOLD;
use crate::error::Result;

/// Whether `n` work items clear `threshold` and the pool is available
#[inline]
pub fn should_parallelize(n: usize, threshold: usize) -> bool {
    cfg!(feature = "parallel") && n > threshold
}

/// `f(i)` for `i in 0..n`, collected in order
pub fn map_range<R, F>(n: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(usize) -> R + Sync + Send,
{
    map_range_with(n, PARALLEL_THRESHOLD, f)
}

/// [`map_range`] with an explicit threshold
pub fn map_range_with<R, F>(n: usize, threshold: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(usize) -> R + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        if should_parallelize(n, threshold) {
            return (0..n).into_par_iter().map(f).collect();
        }
    }
    let _ = threshold;
    (0..n).map(f).collect()
}

/// Fallible [`map_range`]; the first error observed is returned
pub fn try_map_range<R, F>(n: usize, f: F) -> Result<Vec<R>>
where
    R: Send,
    F: Fn(usize) -> Result<R> + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        if should_parallelize(n, PARALLEL_THRESHOLD) {
            return (0..n).into_par_iter().map(f).collect();
        }
    }
    (0..n).map(f).collect()
}

/// `f(i, &mut items[i])` over every slot
pub fn for_each_mut<T, F>(items: &mut [T], f: F)
where
    T: Send,
    F: Fn(usize, &mut T) + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        if should_parallelize(items.len(), PARALLEL_THRESHOLD) {
            items.par_iter_mut().enumerate().for_each(|(i, x)| f(i, x));
            return;
        }
    }
    items.iter_mut().enumerate().for_each(|(i, x)| f(i, x));
}

/// Runs two closures, concurrently when `fork` is set
pub fn join<A, B, RA, RB>(fork: bool, a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    #[cfg(feature = "parallel")]
    {
        if fork {
            return rayon::join(a, b);
        }
    }
    let _ = fork;
    (a(), b())
}
