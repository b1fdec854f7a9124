//! VotePool: bounded in-memory intake queue for votes awaiting a proposal.
//!
//! The pool only buffers and batches; validation of vote content belongs to
//! the intake boundary, and proposal timing to the caller (a primary drains a
//! batch once `ready()` reports true and no round is active).

use parking_lot::Mutex;
use thiserror::Error;

use crate::voting::Vote;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VotePoolError {
    #[error("vote pool is full ({capacity} pending)")]
    PoolFull { capacity: usize },
}

pub struct VotePool {
    pending: Mutex<Vec<Vote>>,
    batch_size: usize,
    capacity: usize,
}

impl VotePool {
    pub fn new(batch_size: usize, capacity: usize) -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            batch_size,
            capacity,
        }
    }

    /// Queue a vote in submission order. Returns the pending count.
    pub fn submit(&self, vote: Vote) -> Result<usize, VotePoolError> {
        let mut pending = self.pending.lock();
        if pending.len() >= self.capacity {
            return Err(VotePoolError::PoolFull {
                capacity: self.capacity,
            });
        }
        pending.push(vote);
        Ok(pending.len())
    }

    /// True once at least one full batch is queued.
    pub fn ready(&self) -> bool {
        self.pending.lock().len() >= self.batch_size
    }

    /// Take all pending votes, preserving submission order.
    pub fn drain(&self) -> Vec<Vote> {
        std::mem::take(&mut *self.pending.lock())
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batches_in_submission_order() {
        let pool = VotePool::new(2, 16);
        assert!(!pool.ready());
        pool.submit(Vote::new("V1", "A")).unwrap();
        assert!(!pool.ready());
        pool.submit(Vote::new("V2", "B")).unwrap();
        assert!(pool.ready());

        let batch = pool.drain();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].voter_id, "V1");
        assert_eq!(batch[1].voter_id, "V2");
        assert!(pool.is_empty());
        assert!(!pool.ready());
    }

    #[test]
    fn rejects_when_full() {
        let pool = VotePool::new(2, 2);
        pool.submit(Vote::new("V1", "A")).unwrap();
        pool.submit(Vote::new("V2", "B")).unwrap();
        let err = pool.submit(Vote::new("V3", "C")).unwrap_err();
        assert_eq!(err, VotePoolError::PoolFull { capacity: 2 });
        assert_eq!(pool.len(), 2);
    }
}
