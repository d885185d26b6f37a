use std::ops::Range;

/// Per-node churn flags, indexed by node id. Holds `node_count + 1` slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChurnState {
    churned: Vec<bool>,
}

impl ChurnState {
    pub fn new(node_count: usize) -> Self {
        Self {
            churned: vec![false; node_count + 1],
        }
    }

    pub fn len(&self) -> usize {
        self.churned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.churned.is_empty()
    }

    /// Out-of-range nodes read as available.
    pub fn is_churned(&self, node: usize) -> bool {
        self.churned.get(node).copied().unwrap_or(false)
    }

    /// Sets the flag and returns its previous value. Writes past the end are
    /// ignored and report `false`.
    pub fn set(&mut self, node: usize, churned: bool) -> bool {
        match self.churned.get_mut(node) {
            Some(slot) => std::mem::replace(slot, churned),
            None => false,
        }
    }

    /// Churned-out nodes within `nodes`.
    pub fn count_churned(&self, nodes: Range<usize>) -> usize {
        self.churned
            .get(nodes.start.min(self.churned.len())..nodes.end.min(self.churned.len()))
            .map_or(0, |slots| slots.iter().filter(|&&c| c).count())
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.churned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_all_available() {
        let state = ChurnState::new(4);
        assert_eq!(state.len(), 5);
        assert_eq!(state.count_churned(0..5), 0);
    }

    #[test]
    fn set_reports_previous_flag() {
        let mut state = ChurnState::new(4);
        assert!(!state.set(2, true));
        assert!(state.set(2, true));
        assert!(state.is_churned(2));
        assert!(state.set(2, false));
        assert!(!state.is_churned(2));
    }

    #[test]
    fn count_is_limited_to_the_range() {
        let mut state = ChurnState::new(6);
        state.set(0, true);
        state.set(3, true);
        state.set(5, true);
        assert_eq!(state.count_churned(1..6), 2);
        assert_eq!(state.count_churned(4..100), 1);
        assert_eq!(state.count_churned(50..60), 0);
    }

    #[test]
    fn out_of_range_reads_and_writes_are_inert() {
        let mut state = ChurnState::new(2);
        assert!(!state.set(10, true));
        assert!(!state.is_churned(10));
        assert_eq!(state.as_slice(), &[false, false, false]);
    }
}
