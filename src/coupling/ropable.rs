use serde::{Deserialize, Serialize};

use crate::core::node::NodeId;

/// A node that ropes, ties and hooks may attach to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ropable {
    pub node: NodeId,
    /// `-1` accepts couplings of any group.
    pub group: i32,
    /// Allows more than one coupling at a time.
    pub multilock: bool,
    lock_count: u32,
}

impl Ropable {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            group: -1,
            multilock: false,
            lock_count: 0,
        }
    }

    pub fn with_group(mut self, group: i32) -> Self {
        self.group = group;
        self
    }

    pub fn multilock(mut self) -> Self {
        self.multilock = true;
        self
    }

    pub fn in_use(&self) -> bool {
        self.lock_count > 0
    }

    pub fn lock_count(&self) -> u32 {
        self.lock_count
    }

    /// Whether another coupling could take this ropable right now.
    pub fn is_available(&self) -> bool {
        self.multilock || !self.in_use()
    }

    /// Claims the ropable; refused when in use and not multilock.
    pub fn try_acquire(&mut self) -> bool {
        if !self.is_available() {
            return false;
        }
        self.lock_count += 1;
        true
    }

    pub fn release(&mut self) {
        self.lock_count = self.lock_count.saturating_sub(1);
    }

    /// Forgets every lock, used when the vehicles holding it are gone.
    pub(crate) fn clear(&mut self) {
        self.lock_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_lock_ropable_refuses_second_coupling() {
        let mut ropable = Ropable::new(NodeId(3));
        assert!(ropable.try_acquire());
        assert!(!ropable.try_acquire());
        assert_eq!(ropable.lock_count(), 1);
        ropable.release();
        assert!(!ropable.in_use());
        ropable.release();
        assert_eq!(ropable.lock_count(), 0);
    }

    #[test]
    fn multilock_ropable_counts_holders() {
        let mut ropable = Ropable::new(NodeId(3)).multilock();
        assert!(ropable.try_acquire());
        assert!(ropable.try_acquire());
        ropable.release();
        assert!(ropable.in_use());
    }
}
