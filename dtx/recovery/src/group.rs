use std::collections::HashMap;

use crate::config::Grouping;

/// Gathers rows into per-dtid groups, kept in the order each group was opened.
///
/// Lookups go through an index from dtid to position, so emission order never depends on
/// hash order.
#[derive(Debug)]
pub(crate) struct Grouper<G> {
    mode: Grouping,
    entries: Vec<(String, G)>,
    index: HashMap<String, usize>,
}

impl<G> Grouper<G> {
    pub(crate) fn new(mode: Grouping) -> Self {
        Self {
            mode,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// The open group for `dtid`, if any.
    pub(crate) fn get_mut(&mut self, dtid: &str) -> Option<&mut G> {
        let pos = match self.mode {
            Grouping::Consecutive => self
                .entries
                .last()
                .filter(|(key, _)| key == dtid)
                .map(|_| self.entries.len() - 1),
            Grouping::Merged => self.index.get(dtid).copied(),
        };
        pos.and_then(|pos| self.entries.get_mut(pos)).map(|(_, group)| group)
    }

    /// Opens a new group for `dtid` after all existing ones.
    pub(crate) fn open(&mut self, dtid: String, group: G) {
        if self.index.contains_key(&dtid) {
            tracing::debug!(dtid, "dtid reappeared after another one, opening a new group");
        } else {
            self.index.insert(dtid.clone(), self.entries.len());
        }
        self.entries.push((dtid, group));
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn into_groups(self) -> impl Iterator<Item = G> {
        self.entries.into_iter().map(|(_, group)| group)
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;

    fn collect(mode: Grouping, rows: &[(&str, u32)]) -> Vec<Vec<u32>> {
        let mut grouper: Grouper<Vec<u32>> = Grouper::new(mode);
        for (dtid, value) in rows {
            match grouper.get_mut(dtid) {
                Some(group) => group.push(*value),
                None => grouper.open(dtid.to_string(), vec![*value]),
            }
        }
        grouper.into_groups().collect_vec()
    }

    #[test]
    fn test_consecutive_preserves_first_seen_order() {
        let rows = [("b", 1), ("b", 2), ("a", 3), ("c", 4), ("c", 5)];
        assert_eq!(
            collect(Grouping::Consecutive, &rows),
            vec![vec![1, 2], vec![3], vec![4, 5]]
        );
    }

    #[test]
    fn test_consecutive_reopens_as_duplicate() {
        let rows = [("a", 1), ("b", 2), ("a", 3)];
        assert_eq!(
            collect(Grouping::Consecutive, &rows),
            vec![vec![1], vec![2], vec![3]]
        );
    }

    #[test]
    fn test_merged_joins_first_group() {
        let rows = [("a", 1), ("b", 2), ("a", 3), ("b", 4)];
        assert_eq!(
            collect(Grouping::Merged, &rows),
            vec![vec![1, 3], vec![2, 4]]
        );
    }
}
