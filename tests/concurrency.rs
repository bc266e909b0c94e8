use crossbeam::thread;
use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Barrier,
    },
};
use verstack::ConcurrentStack;

const THREADS: usize = 4;

#[test]
fn four_workers_push_then_pop() {
    let stack = ConcurrentStack::new();
    let barrier = Barrier::new(THREADS);

    let popped: Vec<Vec<u64>> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS as u64)
            .map(|id| {
                let stack = &stack;
                let barrier = &barrier;
                s.spawn(move |_| {
                    barrier.wait();
                    for i in 0..5 {
                        stack.push(id * 10 + i);
                    }
                    (0..5).filter_map(|_| stack.pop()).collect::<Vec<_>>()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    let mut all: Vec<u64> = popped.into_iter().flatten().collect();
    all.sort_unstable();

    let mut expected: Vec<u64> = (0..THREADS as u64)
        .flat_map(|id| (0..5).map(move |i| id * 10 + i))
        .collect();
    expected.sort_unstable();

    assert_eq!(all, expected, "Exactly the pushed values, each once");
    assert_eq!(stack.pop(), None);
    assert_eq!(stack.version(), 20);
}

#[test]
fn conservation_under_mixed_load() {
    const PER_THREAD: u64 = 20_000;

    let stack = ConcurrentStack::new();
    let pops = AtomicUsize::new(0);

    let popped: Vec<Vec<u64>> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS as u64)
            .map(|id| {
                let stack = &stack;
                let pops = &pops;
                s.spawn(move |_| {
                    let mut mine = Vec::new();
                    for i in 0..PER_THREAD {
                        stack.push(id * PER_THREAD + i);
                        // Pop roughly every third push so the stack keeps
                        // growing and shrinking under contention.
                        if i % 3 == 0 {
                            if let Some(value) = stack.pop() {
                                pops.fetch_add(1, Ordering::Relaxed);
                                mine.push(value);
                            }
                        }
                    }
                    mine
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    let mut seen = HashSet::new();
    for value in popped.into_iter().flatten() {
        assert!(seen.insert(value), "{} popped twice", value);
    }

    let pops = pops.load(Ordering::Relaxed);
    assert_eq!(stack.version(), pops as u64);

    let mut left = 0;
    while let Some(value) = stack.pop() {
        assert!(seen.insert(value), "{} popped twice", value);
        left += 1;
    }

    let total = THREADS * PER_THREAD as usize;
    assert_eq!(left, total - pops);
    assert_eq!(seen.len(), total, "Nothing lost");
}

#[test]
fn producers_keep_their_own_order() {
    const PER_THREAD: u64 = 5_000;

    let stack = ConcurrentStack::new();

    thread::scope(|s| {
        for id in 0..THREADS as u64 {
            let stack = &stack;
            s.spawn(move |_| {
                for i in 0..PER_THREAD {
                    stack.push((id, i));
                }
            });
        }
    })
    .unwrap();

    // Drained alone, each producer's values come back newest first.
    let mut last = vec![PER_THREAD; THREADS];
    let mut count = 0;
    while let Some((id, i)) = stack.pop() {
        let id = id as usize;
        assert_eq!(i + 1, last[id], "Producer {} out of order", id);
        last[id] = i;
        count += 1;
    }

    assert_eq!(count, THREADS * PER_THREAD as usize);
    assert!(last.iter().all(|&i| i == 0));
}

#[test]
fn version_never_decreases() {
    let stack = ConcurrentStack::new();
    let done = AtomicBool::new(false);

    thread::scope(|s| {
        let stack = &stack;
        let done = &done;

        s.spawn(move |_| {
            let mut last = 0;
            while !done.load(Ordering::Acquire) {
                let version = stack.version();
                assert!(version >= last, "version went from {} to {}", last, version);
                last = version;
            }
        });

        let workers: Vec<_> = (0..THREADS as u32)
            .map(|id| {
                s.spawn(move |_| {
                    for i in 0..10_000u32 {
                        stack.push(id ^ i);
                        stack.pop();
                        stack.pop();
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        done.store(true, Ordering::Release);
    })
    .unwrap();
}

#[test]
fn empty_pop_under_contention() {
    let stack = ConcurrentStack::<u32>::new();

    thread::scope(|s| {
        for _ in 0..THREADS {
            let stack = &stack;
            s.spawn(move |_| {
                for _ in 0..10_000 {
                    // Nothing is ever pushed, so every pop is an empty pop.
                    assert_eq!(stack.pop(), None);
                }
            });
        }
    })
    .unwrap();

    assert_eq!(stack.version(), 0);
}

#[test]
fn drops_every_value_once() {
    static LIVE: AtomicUsize = AtomicUsize::new(0);

    struct Counted(#[allow(dead_code)] u64);

    impl Counted {
        fn new(n: u64) -> Self {
            LIVE.fetch_add(1, Ordering::Relaxed);
            Counted(n)
        }
    }

    impl Drop for Counted {
        fn drop(&mut self) {
            LIVE.fetch_sub(1, Ordering::Relaxed);
        }
    }

    let stack = ConcurrentStack::new();

    thread::scope(|s| {
        for id in 0..THREADS as u64 {
            let stack = &stack;
            s.spawn(move |_| {
                for i in 0..10_000 {
                    stack.push(Counted::new(id * 10_000 + i));
                    if i % 2 == 0 {
                        drop(stack.pop());
                    }
                }
            });
        }
    })
    .unwrap();

    assert!(LIVE.load(Ordering::Relaxed) > 0);
    drop(stack);
    assert_eq!(LIVE.load(Ordering::Relaxed), 0);
}

#[test]
fn print_while_mutating() {
    let stack = ConcurrentStack::new();
    let done = AtomicBool::new(false);

    thread::scope(|s| {
        let stack = &stack;
        let done = &done;

        s.spawn(move |_| {
            while !done.load(Ordering::Acquire) {
                let mut out = Vec::new();
                stack.print(&mut out).unwrap();
                let line = String::from_utf8(out).unwrap();
                assert!(line.starts_with("[top] "));
                assert!(line.ends_with("[bottom]\n"));
            }
        });

        for i in 0..20_000u64 {
            stack.push(i);
            if i % 2 == 1 {
                stack.pop();
            }
        }
        done.store(true, Ordering::Release);
    })
    .unwrap();
}
