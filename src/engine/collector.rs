use crate::engine::rollout::Tree;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// The search refuses to grow the tree past this many live nodes and falls
/// back to plain backtracking instead.
pub const MAX_NODES: u32 = 10_000_000;

/// Owns retired search trees and frees them off the search thread. Trees
/// handed to `collect` are already detached from the live search; a single
/// background worker drains the queue every 100 ms. Dropping the collector
/// joins the worker and drains synchronously.
pub struct Collector {
    queue: Arc<Mutex<VecDeque<Tree>>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    count: u32,
}

impl Default for Collector {
    fn default() -> Self {
        Collector::new()
    }
}

impl Collector {
    pub fn new() -> Collector {
        let queue = Arc::new(Mutex::new(VecDeque::new()));
        let stop = Arc::new(AtomicBool::new(false));

        let worker_queue = Arc::clone(&queue);
        let worker_stop = Arc::clone(&stop);
        let worker = std::thread::spawn(move || {
            while !worker_stop.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_millis(100));
                loop {
                    // Trees are dropped outside the lock so the search never
                    // blocks on a large deallocation.
                    let tree = worker_queue.lock().pop_front();
                    match tree {
                        Some(t) => drop(t),
                        None => break,
                    }
                }
            }
        });

        Collector {
            queue,
            stop,
            worker: Some(worker),
            count: 0,
        }
    }

    /// Queues a retired tree for background destruction.
    pub fn collect(&self, tree: Tree) {
        self.queue.lock().push_back(tree);
    }

    /// Registers one allocated node against the cap.
    #[inline(always)]
    pub fn on_alloc(&mut self) {
        self.count += 1;
    }

    #[inline(always)]
    pub fn total(&self) -> u32 {
        self.count
    }

    #[inline(always)]
    pub fn max_nodes_exceeded(&self) -> bool {
        self.count > MAX_NODES
    }

    /// Resets the allocation counter (the queued garbage is unaffected).
    pub fn reset(&mut self) {
        self.count = 0;
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        self.queue.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_queued_trees() {
        let mut gc = Collector::new();
        gc.on_alloc();
        gc.on_alloc();
        assert_eq!(gc.total(), 2);
        gc.collect(Tree::new());
        gc.reset();
        assert_eq!(gc.total(), 0);
        assert!(!gc.max_nodes_exceeded());
        // Drop joins the worker and drains whatever is left.
    }
}
