//! The quick-play queue.
//!
//! A FIFO of waiting players with no duplicates. The queue itself knows
//! nothing about connections; the server layer filters stale ids when it
//! claims a batch and puts survivors back at the front so their wait
//! still counts.

use std::collections::VecDeque;

use ludod_protocol::PlayerId;

/// Players needed to form a quick-play match.
pub const QUORUM: usize = 4;

#[derive(Debug, Default)]
pub struct MatchQueue {
    waiting: VecDeque<PlayerId>,
}

impl MatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.waiting.contains(&player_id)
    }

    /// Waiting players, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.waiting.iter().copied()
    }

    /// Adds a player to the back. Returns `false` (and changes nothing)
    /// if they were already waiting.
    pub fn enqueue(&mut self, player_id: PlayerId) -> bool {
        if self.contains(player_id) {
            return false;
        }
        self.waiting.push_back(player_id);
        true
    }

    /// Removes a player wherever they are in line. Returns whether they
    /// were waiting.
    pub fn dequeue(&mut self, player_id: PlayerId) -> bool {
        let before = self.waiting.len();
        self.waiting.retain(|&id| id != player_id);
        self.waiting.len() != before
    }

    /// Takes the four oldest waiters if a full batch is available.
    pub fn claim_quorum(&mut self) -> Option<Vec<PlayerId>> {
        if self.waiting.len() < QUORUM {
            return None;
        }
        Some(self.waiting.drain(..QUORUM).collect())
    }

    /// Puts a claimed batch's survivors back at the head of the line,
    /// preserving their relative order.
    pub fn requeue_front(&mut self, players: Vec<PlayerId>) {
        for player_id in players.into_iter().rev() {
            self.waiting.push_front(player_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: fn(u64) -> PlayerId = PlayerId;

    #[test]
    fn test_enqueue_rejects_duplicates() {
        let mut q = MatchQueue::new();
        assert!(q.enqueue(P(1)));
        assert!(!q.enqueue(P(1)));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_claim_needs_a_full_quorum() {
        let mut q = MatchQueue::new();
        for i in 1..=3 {
            q.enqueue(P(i));
        }
        assert!(q.claim_quorum().is_none());
        assert_eq!(q.len(), 3);

        q.enqueue(P(4));
        let batch = q.claim_quorum().unwrap();
        assert_eq!(batch, vec![P(1), P(2), P(3), P(4)]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_claim_takes_oldest_first() {
        let mut q = MatchQueue::new();
        for i in 1..=6 {
            q.enqueue(P(i));
        }
        let batch = q.claim_quorum().unwrap();
        assert_eq!(batch, vec![P(1), P(2), P(3), P(4)]);
        assert_eq!(q.len(), 2);
        assert!(q.contains(P(5)));
    }

    #[test]
    fn test_dequeue_from_middle() {
        let mut q = MatchQueue::new();
        for i in 1..=3 {
            q.enqueue(P(i));
        }
        assert!(q.dequeue(P(2)));
        assert!(!q.dequeue(P(2)));
        let waiting: Vec<PlayerId> = q.iter().collect();
        assert_eq!(waiting, vec![P(1), P(3)]);
    }

    #[test]
    fn test_requeue_front_preserves_order() {
        let mut q = MatchQueue::new();
        q.enqueue(P(5));
        q.requeue_front(vec![P(1), P(2), P(3)]);
        let waiting: Vec<PlayerId> = q.iter().collect();
        assert_eq!(waiting, vec![P(1), P(2), P(3), P(5)]);
    }
}
