use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, ErrorKind, Result};
use crate::pool::{BufferPool, Rented};
use crate::token::Token;

// Buffers below this size make the grow/retry protocol degenerate.
const MIN_CAPACITY: usize = 64;

#[inline]
fn flush_threshold(capacity: usize) -> usize {
    // Leave a sliver of slack so short fields rarely trigger a grow.
    128.max(capacity - capacity / 32)
}

/// A shareable cancellation flag.
///
/// Observed by buffers at entry to `grow`, `flush` and `complete` only; a
/// signalled token makes those operations fail before any I/O is performed.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Where flushed tokens ultimately go.
pub trait Sink<T: Token> {
    fn write_all(&mut self, data: &[T]) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

/// Adapts any [`std::io::Write`] into a byte sink.
#[derive(Debug)]
pub struct IoSink<W>(W);

impl<W: Write> IoSink<W> {
    pub fn new(writer: W) -> Self {
        Self(writer)
    }

    pub fn get_ref(&self) -> &W {
        &self.0
    }

    pub fn into_inner(self) -> W {
        self.0
    }
}

impl<W: Write> Sink<u8> for IoSink<W> {
    #[inline(always)]
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.0.write_all(data)
    }

    #[inline(always)]
    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<T: Token> Sink<T> for Vec<T> {
    #[inline(always)]
    fn write_all(&mut self, data: &[T]) -> io::Result<()> {
        self.extend_from_slice(data);
        Ok(())
    }

    #[inline(always)]
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A growable output region with deferred flushing.
///
/// The protocol has four operations and one terminal state:
///
/// - [`acquire`](FieldBuffer::acquire) peeks at the unwritten tail of the
///   buffer. It never allocates; an empty region means `grow` must run.
/// - [`commit`](FieldBuffer::commit) marks tokens of the last acquired
///   region as written. Committing past the region is a programmer error
///   and panics.
/// - [`grow`](FieldBuffer::grow) flushes, then enlarges the buffer until
///   the writable region is strictly larger than the last one handed out.
/// - [`flush`](FieldBuffer::flush) pushes committed tokens to the sink.
///   Idempotent.
/// - [`complete`](FieldBuffer::complete) performs the final flush (unless
///   an error or cancellation is already observed), releases the storage
///   exactly once, and must be called at most once.
pub trait FieldBuffer<T: Token> {
    fn acquire(&mut self, size_hint: usize) -> &mut [T];

    fn commit(&mut self, len: usize);

    fn grow(&mut self) -> Result<&mut [T]>;

    fn flush(&mut self) -> Result<()>;

    fn complete(&mut self, error: Option<Error>) -> Result<()>;

    /// Whether enough tokens accumulated that flushing now is worthwhile.
    fn needs_flush(&self) -> bool {
        false
    }
}

/// The copying flavor of the buffer protocol: committed tokens accumulate in
/// rented storage and are handed to the sink on flush.
#[derive(Debug)]
pub struct SinkBuffer<T: Token, S: Sink<T>> {
    sink: S,
    storage: Rented<T>,
    pool: BufferPool<T>,
    unflushed: usize,
    last_acquired: usize,
    completed: bool,
    cancel: Option<CancelToken>,
}

impl<T: Token, S: Sink<T>> SinkBuffer<T, S> {
    pub fn new(sink: S, capacity: usize) -> Self {
        Self::with_pool(sink, capacity, BufferPool::new())
    }

    pub fn with_pool(sink: S, capacity: usize, pool: BufferPool<T>) -> Self {
        let storage = pool.rent(capacity.max(MIN_CAPACITY));

        Self {
            sink,
            storage,
            pool,
            unflushed: 0,
            last_acquired: 0,
            completed: false,
            cancel: None,
        }
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(Error::cancelled()),
            _ => Ok(()),
        }
    }
}

impl<T: Token, S: Sink<T>> FieldBuffer<T> for SinkBuffer<T, S> {
    #[inline]
    fn acquire(&mut self, _size_hint: usize) -> &mut [T] {
        self.last_acquired = self.storage.len() - self.unflushed;
        &mut self.storage[self.unflushed..]
    }

    #[inline]
    fn commit(&mut self, len: usize) {
        let remaining = self.storage.len() - self.unflushed;

        assert!(
            len <= remaining,
            "commit of {} tokens exceeds the remaining capacity of {}",
            len,
            remaining,
        );

        self.unflushed += len;
    }

    fn grow(&mut self) -> Result<&mut [T]> {
        self.check_cancelled()?;

        // Reclaiming the flushed prefix is cheaper than allocating.
        self.flush()?;

        let target = self.last_acquired;

        while self.storage.len() - self.unflushed <= target {
            let capacity = self.storage.len();
            let doubled = capacity.saturating_mul(2).max(MIN_CAPACITY);

            let mut next = self.pool.rent(doubled);

            if next.len() <= capacity {
                next.release();
                return Err(Error::new(ErrorKind::GrowthStalled { capacity }));
            }

            next[..self.unflushed].copy_from_slice(&self.storage[..self.unflushed]);
            let mut previous = std::mem::replace(&mut self.storage, next);
            previous.release();
        }

        self.last_acquired = self.storage.len() - self.unflushed;
        Ok(&mut self.storage[self.unflushed..])
    }

    fn flush(&mut self) -> Result<()> {
        self.check_cancelled()?;

        if self.unflushed > 0 {
            self.sink.write_all(&self.storage[..self.unflushed])?;
            self.unflushed = 0;
        }

        Ok(())
    }

    fn complete(&mut self, error: Option<Error>) -> Result<()> {
        assert!(!self.completed, "complete called twice on a csv write buffer");
        self.completed = true;

        let mut failure = error;

        if failure.is_none() {
            if let Some(token) = &self.cancel {
                if token.is_cancelled() {
                    failure = Some(Error::cancelled());
                }
            }
        }

        if failure.is_none() {
            let outcome = self
                .flush()
                .and_then(|()| self.sink.flush().map_err(Error::from));

            if let Err(err) = outcome {
                failure = Some(Error::on_complete(err));
            }
        }

        // Storage goes back to the pool on every path.
        self.storage.release();
        self.unflushed = 0;

        match failure {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    #[inline(always)]
    fn needs_flush(&self) -> bool {
        self.unflushed >= flush_threshold(self.storage.len())
    }
}

/// The direct flavor of the buffer protocol: the output `Vec` itself is the
/// committable region, so nothing is copied and flushing is a no-op.
#[derive(Debug, Default)]
pub struct MemoryBuffer<T: Token> {
    out: Vec<T>,
    committed: usize,
    last_acquired: usize,
    completed: bool,
    cancel: Option<CancelToken>,
}

impl<T: Token> MemoryBuffer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            out: vec![T::default(); capacity],
            ..Self::default()
        }
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Consumes the buffer, returning the committed output.
    pub fn into_vec(mut self) -> Vec<T> {
        if !self.completed {
            self.out.truncate(self.committed);
        }

        self.out
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(Error::cancelled()),
            _ => Ok(()),
        }
    }
}

impl<T: Token> FieldBuffer<T> for MemoryBuffer<T> {
    #[inline]
    fn acquire(&mut self, _size_hint: usize) -> &mut [T] {
        self.last_acquired = self.out.len() - self.committed;
        &mut self.out[self.committed..]
    }

    #[inline]
    fn commit(&mut self, len: usize) {
        let remaining = self.out.len() - self.committed;

        assert!(
            len <= remaining,
            "commit of {} tokens exceeds the remaining capacity of {}",
            len,
            remaining,
        );

        self.committed += len;
    }

    fn grow(&mut self) -> Result<&mut [T]> {
        self.check_cancelled()?;

        let target = self.last_acquired;

        while self.out.len() - self.committed <= target {
            let doubled = self.out.len().saturating_mul(2).max(MIN_CAPACITY);
            self.out.resize(doubled, T::default());
        }

        self.last_acquired = self.out.len() - self.committed;
        Ok(&mut self.out[self.committed..])
    }

    fn flush(&mut self) -> Result<()> {
        self.check_cancelled()
    }

    fn complete(&mut self, error: Option<Error>) -> Result<()> {
        assert!(!self.completed, "complete called twice on a csv write buffer");
        self.completed = true;

        let mut failure = error;

        if failure.is_none() {
            if let Some(token) = &self.cancel {
                if token.is_cancelled() {
                    failure = Some(Error::cancelled());
                }
            }
        }

        self.out.truncate(self.committed);

        match failure {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }
}
