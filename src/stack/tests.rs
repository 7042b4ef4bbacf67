use super::*;

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

#[test]
fn test_push_pop_is_lifo() {
    let stack = ConcurrentStack::new();
    stack.push(1);
    stack.push(2);
    stack.push(3);
    assert_eq!(stack.try_pop(), Some(3));
    assert_eq!(stack.try_pop(), Some(2));
    assert_eq!(stack.try_pop(), Some(1));
    assert_eq!(stack.try_pop(), None);
}

#[test]
fn test_try_pop_on_empty_returns_none() {
    let stack: ConcurrentStack<u32> = ConcurrentStack::default();
    assert!(stack.is_empty());
    assert_eq!(stack.try_pop(), None);
    // Polling an empty stack never poisons it
    stack.push(7);
    assert_eq!(stack.try_pop(), Some(7));
}

#[test]
fn test_pop_on_empty_is_an_error() {
    let stack: ConcurrentStack<u32> = ConcurrentStack::new();
    assert_eq!(stack.pop(), Err(StackError::Empty));
    assert_eq!(StackError::Empty.to_string(), "empty stack");

    stack.push(4);
    assert_eq!(stack.pop(), Ok(4));
    assert_eq!(stack.pop(), Err(StackError::Empty));
}

#[test]
fn test_len_and_is_empty() {
    let stack = ConcurrentStack::new();
    assert_eq!(stack.len(), 0);
    stack.push("a");
    stack.push("b");
    assert_eq!(stack.len(), 2);
    assert!(!stack.is_empty());
    stack.try_pop();
    stack.try_pop();
    assert!(stack.is_empty());
}

#[test]
fn test_clone_is_a_deep_copy() {
    let stack = ConcurrentStack::new();
    stack.push(vec![1, 2]);
    stack.push(vec![3]);

    let copy = stack.clone();
    assert_eq!(stack.try_pop(), Some(vec![3]));
    assert_eq!(stack.len(), 1);

    // The copy is unaffected by pops on the source stack
    assert_eq!(copy.len(), 2);
    assert_eq!(copy.try_pop(), Some(vec![3]));
    assert_eq!(copy.try_pop(), Some(vec![1, 2]));
}

#[test]
fn test_debug_shows_length() {
    let stack = ConcurrentStack::new();
    stack.push(1u8);
    assert_eq!(format!("{:?}", stack), "ConcurrentStack { len: 1 }");
}

#[test]
fn test_concurrent_push_pop_delivers_each_item_once() {
    const PRODUCERS: usize = 4;
    const CONSUMERS: usize = 4;
    const PER_PRODUCER: usize = 5_000;
    const TOTAL: usize = PRODUCERS * PER_PRODUCER;

    let stack = Arc::new(ConcurrentStack::new());
    let popped = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let stack = Arc::clone(&stack);
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    stack.push(p * PER_PRODUCER + i);
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let stack = Arc::clone(&stack);
            let popped = Arc::clone(&popped);
            thread::spawn(move || {
                let mut seen = Vec::new();
                while popped.load(Ordering::SeqCst) < TOTAL {
                    match stack.try_pop() {
                        Some(tag) => {
                            seen.push(tag);
                            popped.fetch_add(1, Ordering::SeqCst);
                        }
                        None => thread::yield_now(),
                    }
                }
                seen
            })
        })
        .collect();

    for handle in producers {
        handle.join().unwrap();
    }

    let mut all = HashSet::with_capacity(TOTAL);
    let mut count = 0;
    for handle in consumers {
        for tag in handle.join().unwrap() {
            assert!(all.insert(tag), "tag {} popped twice", tag);
            count += 1;
        }
    }

    assert_eq!(count, TOTAL);
    assert_eq!(all.len(), TOTAL);
    assert!((0..TOTAL).all(|tag| all.contains(&tag)));
    assert!(stack.is_empty());
}

#[test]
fn test_concurrent_is_empty_does_not_disturb_contents() {
    let stack = Arc::new(ConcurrentStack::new());
    let checker = {
        let stack = Arc::clone(&stack);
        thread::spawn(move || {
            for _ in 0..10_000 {
                let _ = stack.is_empty();
                let _ = stack.len();
            }
        })
    };
    for i in 0..10_000 {
        stack.push(i);
    }
    checker.join().unwrap();
    assert_eq!(stack.len(), 10_000);
}
