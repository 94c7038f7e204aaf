//! Reuse caches for writers, buffers and lexer state.
//!
//! A [`Pool`] hands out idle instances on [`Pool::borrow`] and takes them back on
//! [`Pool::redeem`], resetting them first so that no data leaks from one user to the next.
//! Redeeming the same instance twice or using it after redemption is a logic error the pool
//! does not detect.
use std::{
    ops::{Deref, DerefMut},
    sync::LazyLock,
};

use parking_lot::Mutex;

use crate::{
    lexer::LexerPool,
    writer::{AppendWriter, ScratchBuffer},
};

/// Maximum number of idle instances a pool keeps by default.
const DEFAULT_MAX_IDLE: usize = 64;

/// Types that can be returned to a clean state for reuse.
pub trait Reset {
    /// Drop all content while keeping allocated capacity.
    fn reset(&mut self);
}

/// A thread-safe free list of reusable instances.
#[derive(Debug)]
pub struct Pool<T> {
    idle: Mutex<Vec<T>>,
    max_idle: usize,
}

impl<T: Default + Reset> Pool<T> {
    #[must_use]
    pub fn new() -> Pool<T> {
        Pool::with_max_idle(DEFAULT_MAX_IDLE)
    }

    /// Create a pool that keeps at most `max_idle` redeemed instances.
    #[must_use]
    pub fn with_max_idle(max_idle: usize) -> Pool<T> {
        Pool {
            idle: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// Take an idle instance, or allocate a new one if none is available.
    pub fn borrow(&self) -> T {
        if let Some(item) = self.idle.lock().pop() {
            return item;
        }
        tracing::trace!(ty = std::any::type_name::<T>(), "Pool is empty, allocating");
        T::default()
    }

    /// Reset `item` and put it back on the free list.
    pub fn redeem(&self, mut item: T) {
        item.reset();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(item);
        } else {
            drop(idle);
            tracing::trace!(
                ty = std::any::type_name::<T>(),
                max_idle = self.max_idle,
                "Pool is full, dropping instance"
            );
        }
    }

    /// Borrow an instance that is redeemed automatically when the guard goes out of scope.
    pub fn scoped(&self) -> Pooled<'_, T> {
        Pooled {
            pool: self,
            item: self.borrow(),
            detached: false,
        }
    }

    /// Number of instances waiting on the free list.
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }
}

impl<T: Default + Reset> Default for Pool<T> {
    fn default() -> Self {
        Pool::new()
    }
}

/// A borrowed instance that goes back to its pool on drop.
#[derive(Debug)]
pub struct Pooled<'p, T: Default + Reset> {
    pool: &'p Pool<T>,
    item: T,
    detached: bool,
}

impl<T: Default + Reset> Pooled<'_, T> {
    /// Keep the instance instead of returning it to the pool.
    #[must_use]
    pub fn into_inner(mut self) -> T {
        self.detached = true;
        std::mem::take(&mut self.item)
    }
}

impl<T: Default + Reset> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.item
    }
}

impl<T: Default + Reset> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.item
    }
}

impl<T: Default + Reset> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if !self.detached {
            self.pool.redeem(std::mem::take(&mut self.item));
        }
    }
}

/// The pools used by the codec helpers.
///
/// Construct one explicitly and pass it around, or use [`Pools::global`], which is created on
/// first use and lives for the rest of the process.
#[derive(Debug, Default)]
pub struct Pools {
    writers: Pool<AppendWriter>,
    buffers: Pool<ScratchBuffer>,
    lexers: LexerPool,
}

static GLOBAL_POOLS: LazyLock<Pools> = LazyLock::new(Pools::new);

impl Pools {
    #[must_use]
    pub fn new() -> Pools {
        Pools::default()
    }

    /// Process-wide pools shared by the convenience entry points.
    #[must_use]
    pub fn global() -> &'static Pools {
        &GLOBAL_POOLS
    }

    #[must_use]
    pub fn writers(&self) -> &Pool<AppendWriter> {
        &self.writers
    }

    #[must_use]
    pub fn buffers(&self) -> &Pool<ScratchBuffer> {
        &self.buffers
    }

    #[must_use]
    pub fn lexers(&self) -> &LexerPool {
        &self.lexers
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn borrowed_writer_is_clean() {
        let pool = Pool::<AppendWriter>::new();
        let mut writer = pool.borrow();
        writer.write(b"residual").expect("Failed to write");
        pool.redeem(writer);

        let writer = pool.borrow();
        assert!(writer.bytes().is_empty());
        assert!(writer.capacity() >= 8);
    }

    #[test]
    fn scoped_guard_redeems_on_drop() {
        let pool = Pool::<AppendWriter>::new();
        {
            let mut writer = pool.scoped();
            writer.write(b"abc").expect("Failed to write");
        }
        assert_eq!(pool.idle(), 1);
        assert!(pool.borrow().bytes().is_empty());
    }

    #[test]
    fn into_inner_detaches() {
        let pool = Pool::<AppendWriter>::new();
        let mut writer = pool.scoped();
        writer.write(b"kept").expect("Failed to write");
        let writer = writer.into_inner();
        assert_eq!(writer.bytes(), b"kept");
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn idle_limit() {
        let pool = Pool::<AppendWriter>::with_max_idle(1);
        let first = pool.borrow();
        let second = pool.borrow();
        pool.redeem(first);
        pool.redeem(second);
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn concurrent_borrow_and_redeem() {
        let pool = Arc::new(Pool::<AppendWriter>::with_max_idle(8));
        let handles: Vec<_> = (0..8)
            .map(|idx| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let mut writer = pool.borrow();
                        assert!(writer.bytes().is_empty());
                        writer.write(&[idx]).expect("Failed to write");
                        assert_eq!(writer.bytes(), &[idx]);
                        pool.redeem(writer);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("Thread panicked");
        }
        assert!(pool.idle() <= 8);
    }

    #[test]
    fn global_pools_are_shared() {
        assert!(std::ptr::eq(Pools::global(), Pools::global()));
    }
}
