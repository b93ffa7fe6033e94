use std::collections::VecDeque;

/// Append-only log that keeps at most `cap` entries, dropping the oldest
/// first.
#[derive(Debug, Clone)]
pub struct BoundedLog<T> {
    entries: VecDeque<T>,
    cap: usize,
}

impl<T> BoundedLog<T> {
    /// # Panics
    /// Panics if `cap` is zero.
    pub fn new(cap: usize) -> Self {
        assert!(cap > 0, "BoundedLog capacity must be at least 1");
        BoundedLog { entries: VecDeque::with_capacity(cap), cap }
    }

    /// Appends `entry`, returning the evicted one if the log was full.
    pub fn push(&mut self, entry: T) -> Option<T> {
        let evicted = if self.entries.len() == self.cap {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_first() {
        let mut log = BoundedLog::new(3);
        for i in 0..3 {
            assert_eq!(log.push(i), None);
        }
        assert_eq!(log.push(3), Some(0));
        assert_eq!(log.push(4), Some(1));
        assert_eq!(log.iter().copied().collect::<Vec<_>>(), [2, 3, 4]);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn latest_is_the_newest_entry() {
        let mut log = BoundedLog::new(10);
        assert_eq!(log.latest(), None);
        for i in 0..6 {
            log.push(i);
        }
        assert_eq!(log.latest(), Some(&5));
        assert!(!log.is_empty());
    }
}
