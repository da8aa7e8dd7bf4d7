use std::collections::{HashSet, VecDeque};

/// Pending `(url, depth)` work plus the set of URLs already dequeued.
///
/// The visited set only grows. An entry whose URL is already visited is
/// dropped on `next` rather than on `push`, so the same URL may sit in the
/// queue more than once until its first copy is taken.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<(String, usize)>,
    visited: HashSet<String>,
}

impl Frontier {
    pub fn new(seed: impl Into<String>) -> Self {
        let mut frontier = Self::default();
        frontier.queue.push_back((seed.into(), 0));
        frontier
    }

    /// Enqueue `url` at `depth` unless it was already visited.
    pub fn push(&mut self, url: String, depth: usize) -> bool {
        if self.is_visited(&url) {
            return false;
        }
        self.queue.push_back((url, depth));
        true
    }

    /// Pop the next entry that has not been visited yet, without marking it.
    pub fn next_unvisited(&mut self) -> Option<(String, usize)> {
        while let Some((url, depth)) = self.queue.pop_front() {
            if !self.is_visited(&url) {
                return Some((url, depth));
            }
        }
        None
    }

    /// Returns false if `url` was already visited.
    pub fn mark_visited(&mut self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
