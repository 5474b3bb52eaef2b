use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError};

use crate::token::Token;

// Buffers kept around per pool; anything beyond this is simply dropped.
const MAX_SHELVED: usize = 8;

/// A pool of reusable token buffers.
///
/// Renting returns a [`Rented`] guard that hands its storage back to the
/// pool exactly once, either explicitly through [`Rented::release`] or when
/// the guard is dropped, including on unwind. Cloning the pool is cheap and
/// yields a handle to the same shelves.
#[derive(Debug)]
pub struct BufferPool<T> {
    shelves: Arc<Mutex<Vec<Vec<T>>>>,
}

impl<T> Clone for BufferPool<T> {
    fn clone(&self) -> Self {
        Self {
            shelves: Arc::clone(&self.shelves),
        }
    }
}

impl<T: Token> Default for BufferPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Token> BufferPool<T> {
    pub fn new() -> Self {
        Self {
            shelves: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Rents a buffer of at least `min_capacity` tokens. The returned
    /// storage may be larger than requested when a bigger buffer was
    /// shelved earlier.
    pub fn rent(&self, min_capacity: usize) -> Rented<T> {
        let recycled = {
            let mut shelves = self.shelves.lock().unwrap_or_else(PoisonError::into_inner);

            shelves
                .iter()
                .position(|buffer| buffer.capacity() >= min_capacity)
                .map(|index| shelves.swap_remove(index))
        };

        let mut buffer = recycled.unwrap_or_default();
        let capacity = buffer.capacity().max(min_capacity);

        buffer.resize(capacity, T::default());

        Rented {
            buffer: Some(buffer),
            pool: self.clone(),
        }
    }

    fn shelve(&self, mut buffer: Vec<T>) {
        buffer.clear();

        let mut shelves = self.shelves.lock().unwrap_or_else(PoisonError::into_inner);

        if shelves.len() < MAX_SHELVED {
            shelves.push(buffer);
        }
    }

    #[cfg(test)]
    pub(crate) fn shelved(&self) -> usize {
        self.shelves.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Storage rented from a [`BufferPool`].
///
/// Dereferences to a token slice of fixed length. The storage is returned
/// to its pool at most once; releasing an already-released guard is a no-op.
#[derive(Debug)]
pub struct Rented<T: Token> {
    buffer: Option<Vec<T>>,
    pool: BufferPool<T>,
}

impl<T: Token> Rented<T> {
    /// Hands the storage back to the pool. Idempotent.
    pub fn release(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.pool.shelve(buffer);
        }
    }

    pub fn is_released(&self) -> bool {
        self.buffer.is_none()
    }
}

impl<T: Token> Deref for Rented<T> {
    type Target = [T];

    #[inline(always)]
    fn deref(&self) -> &[T] {
        self.buffer.as_deref().unwrap_or(&[])
    }
}

impl<T: Token> DerefMut for Rented<T> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut [T] {
        self.buffer.as_deref_mut().unwrap_or(&mut [])
    }
}

impl<T: Token> Drop for Rented<T> {
    fn drop(&mut self) {
        self.release();
    }
}
