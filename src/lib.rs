#![allow(clippy::needless_return)]

/// Use mimalloc as the global allocator for all binaries.
/// Every partition step moves elements into freshly allocated list nodes,
/// so allocation speed and thread-local caching dominate small sorts.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod common;
pub mod qsort;
pub mod stack;

pub use qsort::{
    SortConfig, SortError, SortOutcome, SortStats, parallel_sort, parallel_sort_with,
    try_parallel_sort_with,
};
pub use stack::{ConcurrentStack, StackError};
