//! Bounded best-first node queue.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::SearchNode;
use crate::error::{MaxCutError, MaxCutResult};

/// Entry in the node queue with priority.
struct QueuedNode {
    node: SearchNode,
    seq: u64, // Earlier insertions win ties
}

impl PartialEq for QueuedNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedNode {}

impl PartialOrd for QueuedNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Highest upper bound first
        self.node
            .upper_bound
            .total_cmp(&other.node.upper_bound)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority queue for B&B nodes, ordered by upper bound.
///
/// Capacity is fixed at construction; pushing into a full queue is an error.
pub struct NodeQueue {
    /// Max-heap by upper bound.
    heap: BinaryHeap<QueuedNode>,

    /// Maximum number of open nodes.
    capacity: usize,

    /// Count of nodes added.
    nodes_added: u64,

    /// Count of nodes popped.
    nodes_popped: u64,
}

impl NodeQueue {
    /// Create an empty queue holding at most `capacity` nodes.
    pub fn new(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::new(),
            capacity,
            nodes_added: 0,
            nodes_popped: 0,
        }
    }

    /// Add a node to the queue.
    pub fn push(&mut self, node: SearchNode) -> MaxCutResult<()> {
        if self.heap.len() >= self.capacity {
            return Err(MaxCutError::QueueOverflow {
                capacity: self.capacity,
            });
        }

        let seq = self.nodes_added;
        self.heap.push(QueuedNode { node, seq });
        self.nodes_added += 1;
        Ok(())
    }

    /// Remove and return the node with the highest upper bound.
    pub fn pop(&mut self) -> Option<SearchNode> {
        let queued = self.heap.pop()?;
        self.nodes_popped += 1;
        Some(queued.node)
    }

    /// Peek at the next node without removing it.
    pub fn peek(&self) -> Option<&SearchNode> {
        self.heap.peek().map(|q| &q.node)
    }

    /// Highest upper bound among open nodes (-inf if empty).
    pub fn best_bound(&self) -> f64 {
        self.peek()
            .map(|n| n.upper_bound)
            .unwrap_or(f64::NEG_INFINITY)
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Get the number of nodes in the queue.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Get the total number of nodes added.
    pub fn total_added(&self) -> u64 {
        self.nodes_added
    }

    /// Get the total number of nodes popped.
    pub fn total_popped(&self) -> u64 {
        self.nodes_popped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u64, bound: f64) -> SearchNode {
        let mut n = SearchNode::root(3);
        n.id = id;
        n.upper_bound = bound;
        n
    }

    #[test]
    fn test_best_bound_selection() {
        let mut queue = NodeQueue::new(10);

        queue.push(node(1, 10.0)).unwrap();
        queue.push(node(2, 5.0)).unwrap();
        queue.push(node(3, 15.0)).unwrap();

        assert_eq!(queue.best_bound(), 15.0);

        // Highest bound comes first
        assert_eq!(queue.pop().unwrap().id, 3);
        assert_eq!(queue.pop().unwrap().id, 1);
        assert_eq!(queue.pop().unwrap().id, 2);

        assert!(queue.is_empty());
        assert_eq!(queue.best_bound(), f64::NEG_INFINITY);
        assert_eq!(queue.total_added(), 3);
        assert_eq!(queue.total_popped(), 3);
    }

    #[test]
    fn test_ties_follow_insertion_order() {
        let mut queue = NodeQueue::new(10);
        for id in 0..4 {
            queue.push(node(id, 7.0)).unwrap();
        }
        let order: Vec<u64> = std::iter::from_fn(|| queue.pop()).map(|n| n.id).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_overflow_is_an_error() {
        let mut queue = NodeQueue::new(2);
        queue.push(node(1, 1.0)).unwrap();
        queue.push(node(2, 2.0)).unwrap();

        let err = queue.push(node(3, 3.0)).unwrap_err();
        assert!(matches!(err, MaxCutError::QueueOverflow { capacity: 2 }));
        assert_eq!(queue.len(), 2);

        // Space frees up after a pop
        queue.pop();
        assert!(queue.push(node(3, 3.0)).is_ok());
    }
}
