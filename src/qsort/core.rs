/// Work-stealing parallel quicksort over `LinkedList`.
///
/// A sorting thread partitions in a loop. Each step pushes its "less than
/// pivot" half onto a shared stack as a chunk and keeps partitioning the other
/// half itself. Background workers (capped at hardware parallelism minus one)
/// pop chunks and sort them; a thread waiting on a chunk's result pops and
/// sorts whatever chunk is on top of the stack instead of parking, so a
/// saturated pool cannot deadlock. A waiter that pops its own chunk back
/// partitions it in place, so only chunks stolen from other threads nest.
use std::collections::LinkedList;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, Scope};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::config::SortConfig;
use super::error::SortError;
use super::promise::{self, ChunkFuture, FuturePoll, Promise};
use crate::stack::ConcurrentStack;

/// A sub-list waiting to be sorted, paired with the slot its result goes to.
pub struct ChunkToSort<T> {
    /// Push sequence number, unique within a session.
    id: usize,
    data: LinkedList<T>,
    promise: Promise<T>,
}

/// Counters collected over one sort session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortStats {
    /// Chunks pushed onto the shared stack.
    pub chunks_pushed: usize,
    /// Chunks sorted by background workers.
    pub chunks_by_workers: usize,
    /// Chunks sorted by threads that were waiting on another chunk.
    pub chunks_by_waiters: usize,
    /// Worker threads started.
    pub workers_spawned: usize,
    /// Worker threads the OS refused to start.
    pub spawn_failures: usize,
}

/// A sorted list together with the statistics of the session that sorted it.
#[derive(Debug)]
pub struct SortOutcome<T> {
    pub list: LinkedList<T>,
    pub stats: SortStats,
}

#[derive(Default)]
struct Counters {
    chunks_pushed: AtomicUsize,
    chunks_by_workers: AtomicUsize,
    chunks_by_waiters: AtomicUsize,
    workers_spawned: AtomicUsize,
    spawn_failures: AtomicUsize,
}

impl Counters {
    /// Increment `counter`, returning its previous value.
    #[inline]
    fn bump(counter: &AtomicUsize) -> usize {
        counter.fetch_add(1, Ordering::Relaxed)
    }

    fn snapshot(&self) -> SortStats {
        SortStats {
            chunks_pushed: self.chunks_pushed.load(Ordering::Relaxed),
            chunks_by_workers: self.chunks_by_workers.load(Ordering::Relaxed),
            chunks_by_waiters: self.chunks_by_waiters.load(Ordering::Relaxed),
            workers_spawned: self.workers_spawned.load(Ordering::Relaxed),
            spawn_failures: self.spawn_failures.load(Ordering::Relaxed),
        }
    }
}

/// State shared by every thread of one top-level sort call.
struct Session<T> {
    chunks: ConcurrentStack<ChunkToSort<T>>,
    max_workers: usize,
    /// Worker slots handed out so far. Only grows.
    reserved_workers: AtomicUsize,
    end_of_data: AtomicBool,
    thread_name: String,
    stack_size: Option<usize>,
    counters: Counters,
}

impl<T> Session<T> {
    fn new(config: &SortConfig) -> Self {
        Session {
            chunks: ConcurrentStack::new(),
            max_workers: config.worker_cap(),
            reserved_workers: AtomicUsize::new(0),
            end_of_data: AtomicBool::new(false),
            thread_name: config.thread_name.clone(),
            stack_size: config.stack_size,
            counters: Counters::default(),
        }
    }
}

/// Sets the session's stop flag when dropped, so workers are recalled before
/// the thread scope joins them on every exit path, unwinding included.
struct StopOnDrop<'a>(&'a AtomicBool);

impl Drop for StopOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Part of a result still to be assembled, left of the list being partitioned.
enum Piece<T> {
    Pivot(T),
    Chunk { id: usize, future: ChunkFuture<T> },
}

/// How a waited-on chunk came back.
enum Resolved<T> {
    /// Sorted by whichever thread popped it.
    Sorted(LinkedList<T>),
    /// Popped back by the waiting thread itself, still unsorted.
    Reclaimed(LinkedList<T>),
}

/// Handle through which the calling thread and the workers drive a session.
struct Sorter<'scope, 'env, T> {
    session: &'env Session<T>,
    scope: &'scope Scope<'scope, 'env>,
}

impl<T> Clone for Sorter<'_, '_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Sorter<'_, '_, T> {}

impl<'scope, 'env, T: Ord + Send> Sorter<'scope, 'env, T> {
    /// Sort `list` on the current thread.
    ///
    /// Partitioning leaves chunks and pivots on `pieces` and moves right into
    /// the rest; the pieces are then resolved right to left onto `sorted`.
    /// Stack depth does not grow with the input's ordering.
    fn do_sort(&self, mut list: LinkedList<T>) -> LinkedList<T> {
        let mut pieces = Vec::new();
        let mut sorted = LinkedList::new();
        loop {
            self.partition_into(list, &mut pieces, &mut sorted);
            list = loop {
                match pieces.pop() {
                    None => return sorted,
                    Some(Piece::Pivot(pivot)) => sorted.push_front(pivot),
                    Some(Piece::Chunk { id, future }) => match self.wait_for(id, future) {
                        Resolved::Sorted(mut low) => {
                            low.append(&mut sorted);
                            sorted = low;
                        }
                        Resolved::Reclaimed(data) => break data,
                    },
                }
            };
        }
    }

    /// Partition `list` down to its last element. Everything pushed to
    /// `pieces` sorts before everything prepended to `sorted`.
    fn partition_into(
        &self,
        mut list: LinkedList<T>,
        pieces: &mut Vec<Piece<T>>,
        sorted: &mut LinkedList<T>,
    ) {
        while let Some(pivot) = list.pop_front() {
            if list.is_empty() {
                sorted.push_front(pivot);
                return;
            }

            let (low, rest) = partition(list, &pivot);
            if rest.is_empty() {
                // The chunk would be this thread's only work left.
                sorted.push_front(pivot);
                list = low;
                continue;
            }

            let id = Counters::bump(&self.session.counters.chunks_pushed);
            let (promise, future) = promise::channel();
            self.session.chunks.push(ChunkToSort {
                id,
                data: low,
                promise,
            });
            self.maybe_spawn_worker();

            pieces.push(Piece::Chunk { id, future });
            pieces.push(Piece::Pivot(pivot));
            list = rest;
        }
    }

    /// Poll the future of chunk `id` until it resolves, sorting stolen chunks
    /// in between. Popping chunk `id` itself hands its data back unsorted.
    fn wait_for(&self, id: usize, mut future: ChunkFuture<T>) -> Resolved<T> {
        loop {
            match future.poll() {
                FuturePoll::Ready(Ok(list)) => return Resolved::Sorted(list),
                FuturePoll::Ready(Err(payload)) => panic::resume_unwind(payload),
                FuturePoll::Abandoned => {
                    panic::resume_unwind(Box::new(SortError::ChunkAbandoned))
                }
                FuturePoll::Pending => match self.session.chunks.try_pop() {
                    Some(chunk) => {
                        Counters::bump(&self.session.counters.chunks_by_waiters);
                        if chunk.id == id {
                            return Resolved::Reclaimed(chunk.data);
                        }
                        self.sort_chunk(chunk);
                    }
                    None => thread::yield_now(),
                },
            }
        }
    }

    /// Pop one chunk and sort it. Returns false if the stack was empty.
    fn try_sort_chunk(&self) -> bool {
        match self.session.chunks.try_pop() {
            Some(chunk) => {
                self.sort_chunk(chunk);
                true
            }
            None => false,
        }
    }

    fn sort_chunk(&self, chunk: ChunkToSort<T>) {
        let ChunkToSort { data, promise, .. } = chunk;
        // A panic must reach the waiter, or it would poll forever.
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.do_sort(data)));
        promise.fulfil(result);
    }

    fn maybe_spawn_worker(&self) {
        let session = self.session;
        let reserved = session.reserved_workers.fetch_update(
            Ordering::AcqRel,
            Ordering::Acquire,
            |n| (n < session.max_workers).then_some(n + 1),
        );
        let Ok(index) = reserved else {
            return;
        };

        let mut builder = thread::Builder::new().name(format!("{}-{}", session.thread_name, index));
        if let Some(size) = session.stack_size {
            builder = builder.stack_size(size);
        }
        let sorter = *self;
        let spawned = builder.spawn_scoped(self.scope, move || sorter.run_worker());
        match spawned {
            Ok(_) => {
                Counters::bump(&session.counters.workers_spawned);
                debug!(worker = index, "spawned sort worker");
            }
            Err(err) => {
                // Stop growing; waiting threads still drain every chunk.
                session
                    .reserved_workers
                    .store(session.max_workers, Ordering::Release);
                Counters::bump(&session.counters.spawn_failures);
                warn!(?err, workers = index, "failed to spawn sort worker");
            }
        }
    }

    /// Sort the session input on a driver thread with the configured stack,
    /// or on the calling thread when no stack size is set.
    fn drive(self, input: &'env Mutex<Option<LinkedList<T>>>) -> LinkedList<T> {
        let take = move || input.lock().take().unwrap_or_default();
        let Some(size) = self.session.stack_size else {
            return self.do_sort(take());
        };

        let spawned = thread::Builder::new()
            .name(format!("{}-driver", self.session.thread_name))
            .stack_size(size)
            .spawn_scoped(self.scope, move || self.do_sort(take()));
        match spawned {
            Ok(driver) => driver
                .join()
                .unwrap_or_else(|payload| panic::resume_unwind(payload)),
            Err(err) => {
                warn!(?err, "failed to spawn sort driver, sorting on the calling thread");
                self.do_sort(take())
            }
        }
    }

    fn run_worker(self) {
        trace!("sort worker started");
        while !self.session.end_of_data.load(Ordering::Acquire) {
            if self.try_sort_chunk() {
                Counters::bump(&self.session.counters.chunks_by_workers);
            } else {
                thread::yield_now();
            }
        }
        trace!("sort worker stopped");
    }
}

/// Split `list` into elements less than `pivot` and the rest.
/// Elements equal to the pivot go to the rest.
fn partition<T: Ord>(list: LinkedList<T>, pivot: &T) -> (LinkedList<T>, LinkedList<T>) {
    let mut low = LinkedList::new();
    let mut rest = LinkedList::new();
    for item in list {
        if item < *pivot {
            low.push_back(item);
        } else {
            rest.push_back(item);
        }
    }
    (low, rest)
}

fn run_session<T: Ord + Send>(list: LinkedList<T>, config: &SortConfig) -> SortOutcome<T> {
    if list.is_empty() {
        return SortOutcome {
            list,
            stats: SortStats::default(),
        };
    }

    let session = Session::new(config);
    debug!(
        len = list.len(),
        max_workers = session.max_workers,
        "starting parallel sort"
    );

    // Taken by whichever thread ends up driving the sort.
    let input = Mutex::new(Some(list));
    let list = thread::scope(|scope| {
        let _stop = StopOnDrop(&session.end_of_data);
        Sorter {
            session: &session,
            scope,
        }
        .drive(&input)
    });

    // Every chunk was awaited by the thread that pushed it.
    debug_assert!(session.chunks.is_empty());
    let stats = session.counters.snapshot();
    debug!(?stats, "parallel sort finished");
    SortOutcome { list, stats }
}

/// Sort `list` with the default configuration.
///
/// A panic raised by the element order on any thread is re-raised here.
pub fn parallel_sort<T: Ord + Send>(list: LinkedList<T>) -> LinkedList<T> {
    parallel_sort_with(list, &SortConfig::default())
}

/// Sort `list` with an explicit configuration.
pub fn parallel_sort_with<T: Ord + Send>(list: LinkedList<T>, config: &SortConfig) -> LinkedList<T> {
    run_session(list, config).list
}

/// Sort `list`, turning a panic on any sorting thread into a [`SortError`].
/// All workers have been joined by the time this returns, on success or error.
pub fn try_parallel_sort_with<T: Ord + Send>(
    list: LinkedList<T>,
    config: &SortConfig,
) -> Result<SortOutcome<T>, SortError> {
    panic::catch_unwind(AssertUnwindSafe(|| run_session(list, config)))
        .map_err(SortError::from_panic)
}
