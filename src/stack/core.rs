//! Lock-guarded LIFO stack shared by every thread of a sort session.
//!
//! Each operation takes the lock for exactly one push, pop or length check.
//! No lock is ever held across user code, so a thread that pops a chunk owns
//! it outright until it hands the result back.

use std::fmt;

use parking_lot::Mutex;
use thiserror::Error;

/// Errors raised by [`ConcurrentStack`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    /// `pop` was called on a stack the caller believed to be non-empty.
    #[error("empty stack")]
    Empty,
}

/// Unbounded LIFO stack behind a single mutex.
pub struct ConcurrentStack<T> {
    items: Mutex<Vec<T>>,
}

impl<T> ConcurrentStack<T> {
    pub fn new() -> Self {
        ConcurrentStack {
            items: Mutex::new(Vec::new()),
        }
    }

    /// Push an item on top of the stack.
    #[inline]
    pub fn push(&self, item: T) {
        self.items.lock().push(item);
    }

    /// Remove and return the top item, or `None` if the stack is empty.
    /// Never fails; this is the polling path used by sorting threads.
    #[inline]
    pub fn try_pop(&self) -> Option<T> {
        self.items.lock().pop()
    }

    /// Remove and return the top item.
    ///
    /// For callers whose own protocol guarantees the stack is non-empty.
    /// An empty stack here is a logic error and is reported as
    /// [`StackError::Empty`] instead of a silent `None`.
    pub fn pop(&self) -> Result<T, StackError> {
        self.items.lock().pop().ok_or(StackError::Empty)
    }

    /// Snapshot emptiness check. May be stale as soon as it returns.
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Snapshot length. May be stale as soon as it returns.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }
}

impl<T> Default for ConcurrentStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Deep copy taken under the source's lock.
impl<T: Clone> Clone for ConcurrentStack<T> {
    fn clone(&self) -> Self {
        let items = self.items.lock().clone();
        ConcurrentStack {
            items: Mutex::new(items),
        }
    }
}

impl<T> fmt::Debug for ConcurrentStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentStack")
            .field("len", &self.len())
            .finish()
    }
}
