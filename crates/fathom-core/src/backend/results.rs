//! Lazy result sequences returned by a backend.

use std::fmt;

use crate::error::Error;

type Execute<T> = Box<dyn FnOnce() -> Result<Vec<T>, Error> + Send>;

enum State<T> {
    Pending(Execute<T>),
    Ready(std::vec::IntoIter<T>),
    Done,
}

/// A lazy sequence of query results.
///
/// Nothing runs until the first call to `next`. A failed execution is
/// yielded once as an `Err` item, after which the sequence is exhausted.
pub struct Results<T> {
    state: State<T>,
}

impl<T> Results<T> {
    /// Defer `execute` until the sequence is first advanced.
    pub fn lazy<F>(execute: F) -> Self
    where
        F: FnOnce() -> Result<Vec<T>, Error> + Send + 'static,
    {
        Self {
            state: State::Pending(Box::new(execute)),
        }
    }

    /// A sequence over already materialized items.
    pub fn ready(items: Vec<T>) -> Self {
        Self {
            state: State::Ready(items.into_iter()),
        }
    }

    /// An empty sequence.
    pub fn empty() -> Self {
        Self::ready(Vec::new())
    }

    /// Drain the sequence, stopping at the first error.
    pub fn collect_all(self) -> Result<Vec<T>, Error> {
        self.collect()
    }
}

impl<T> Iterator for Results<T> {
    type Item = Result<T, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if let State::Pending(_) = self.state {
            if let State::Pending(execute) = std::mem::replace(&mut self.state, State::Done) {
                match execute() {
                    Ok(items) => self.state = State::Ready(items.into_iter()),
                    Err(e) => return Some(Err(e)),
                }
            }
        }

        match &mut self.state {
            State::Ready(items) => match items.next() {
                Some(item) => Some(Ok(item)),
                None => {
                    self.state = State::Done;
                    None
                }
            },
            _ => None,
        }
    }
}

impl<T> fmt::Debug for Results<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            State::Pending(_) => "pending",
            State::Ready(_) => "ready",
            State::Done => "done",
        };
        f.debug_struct("Results").field("state", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_execution_is_deferred_until_first_pull() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut results = Results::lazy(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1, 2])
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(results.next().unwrap().unwrap(), 1);
        assert_eq!(results.next().unwrap().unwrap(), 2);
        assert!(results.next().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_surfaces_once() {
        let mut results: Results<i32> =
            Results::lazy(|| Err(Error::Transport("backend unavailable".into())));

        assert!(matches!(results.next(), Some(Err(Error::Transport(_)))));
        assert!(results.next().is_none());
    }

    #[test]
    fn test_empty_is_distinct_from_failure() {
        assert_eq!(Results::<i32>::empty().collect_all().unwrap(), Vec::<i32>::new());
        let failed: Results<i32> = Results::lazy(|| Err(Error::Transport("down".into())));
        assert!(failed.collect_all().is_err());
    }
}
