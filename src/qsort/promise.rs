//! One-shot result slot linking a pushed chunk to the thread waiting on it.
//!
//! The producer half is consumed by [`Promise::fulfil`], so a chunk can be
//! fulfilled at most once. The consumer half is polled without blocking.

use std::any::Any;
use std::collections::LinkedList;

use crossbeam_channel::{Receiver, Sender, TryRecvError};

/// Panic payload caught on the thread that was sorting a chunk.
pub type PanicPayload = Box<dyn Any + Send + 'static>;

/// What a promise delivers: the sorted chunk, or the panic that stopped it.
pub type ChunkResult<T> = Result<LinkedList<T>, PanicPayload>;

/// Create a connected promise/future pair.
pub fn channel<T>() -> (Promise<T>, ChunkFuture<T>) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    (Promise { tx }, ChunkFuture { rx })
}

/// Write half, travels with the chunk onto the shared stack.
pub struct Promise<T> {
    tx: Sender<ChunkResult<T>>,
}

impl<T> Promise<T> {
    pub fn fulfil(self, result: ChunkResult<T>) {
        // The waiter may already be unwinding; the result is dropped with the channel.
        let _ = self.tx.send(result);
    }
}

/// Result of a zero-duration readiness check.
pub enum FuturePoll<T> {
    Ready(ChunkResult<T>),
    Pending,
    /// The promise was dropped without being fulfilled.
    Abandoned,
}

/// Read half, kept by the thread that pushed the chunk.
pub struct ChunkFuture<T> {
    rx: Receiver<ChunkResult<T>>,
}

impl<T> ChunkFuture<T> {
    #[inline]
    pub fn poll(&mut self) -> FuturePoll<T> {
        match self.rx.try_recv() {
            Ok(result) => FuturePoll::Ready(result),
            Err(TryRecvError::Empty) => FuturePoll::Pending,
            Err(TryRecvError::Disconnected) => FuturePoll::Abandoned,
        }
    }
}
