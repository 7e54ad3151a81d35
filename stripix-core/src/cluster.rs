//! Strip cluster records.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A group of adjacent strips attributed to one particle crossing.
///
/// Clusters are created once by the clustering engine and never mutated.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cluster {
    /// One-based index of the event the cluster belongs to.
    pub event: usize,
    /// Number of seeds retained for this event.
    pub nclust: usize,
    /// Strip that passed the high threshold.
    pub seed: usize,
    /// Sum of strip signals.
    pub signal: f64,
    /// Number of strips in the cluster.
    pub width: usize,
    /// Representative strip: the lowest accepted strip, or the seed in
    /// symmetric mode.
    pub address: usize,
    /// Signal-weighted mean strip index.
    pub cog: f64,
    /// Lowest strip covered by `strips`.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub first_strip: usize,
    /// Per-strip signals from `first_strip` upwards.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub strips: Vec<f64>,
}

impl Cluster {
    /// Iterates over `(strip index, signal)` pairs.
    pub fn iter_strips(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.strips
            .iter()
            .enumerate()
            .map(|(i, &signal)| (self.first_strip + i, signal))
    }

    /// Returns the chip (VA) holding the seed strip.
    #[must_use]
    pub fn chip(&self) -> usize {
        self.seed / crate::event::CHIP_CHANNELS
    }
}

/// Ordered collection of clusters produced by one conversion run.
///
/// Clusters appear in event order and, within an event, in ascending seed
/// order.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ClusterTable {
    clusters: Vec<Cluster>,
}

impl ClusterTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            clusters: Vec::with_capacity(capacity),
        }
    }

    /// Appends a cluster.
    pub fn push(&mut self, cluster: Cluster) {
        self.clusters.push(cluster);
    }

    /// Appends every cluster of another table, keeping order.
    pub fn append(&mut self, other: &mut ClusterTable) {
        self.clusters.append(&mut other.clusters);
    }

    /// Returns the number of clusters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// Returns true if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Returns an iterator over the clusters.
    pub fn iter(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter()
    }

    /// Returns the clusters as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Returns the clusters of one event (one-based index).
    pub fn for_event(&self, event: usize) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter().filter(move |c| c.event == event)
    }
}

impl FromIterator<Cluster> for ClusterTable {
    fn from_iter<I: IntoIterator<Item = Cluster>>(iter: I) -> Self {
        Self {
            clusters: iter.into_iter().collect(),
        }
    }
}

impl Extend<Cluster> for ClusterTable {
    fn extend<I: IntoIterator<Item = Cluster>>(&mut self, iter: I) {
        self.clusters.extend(iter);
    }
}

impl IntoIterator for ClusterTable {
    type Item = Cluster;
    type IntoIter = std::vec::IntoIter<Cluster>;

    fn into_iter(self) -> Self::IntoIter {
        self.clusters.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(event: usize, seed: usize) -> Cluster {
        Cluster {
            event,
            nclust: 1,
            seed,
            signal: 30.0,
            width: 3,
            address: seed - 1,
            cog: seed as f64,
            first_strip: seed - 1,
            strips: vec![10.0, 10.0, 10.0],
        }
    }

    #[test]
    fn test_cluster_table_operations() {
        let mut table = ClusterTable::with_capacity(4);
        assert!(table.is_empty());

        table.push(cluster(1, 10));
        table.push(cluster(1, 70));
        table.push(cluster(2, 130));

        assert_eq!(table.len(), 3);
        assert_eq!(table.for_event(1).count(), 2);
        assert_eq!(table.for_event(3).count(), 0);
    }

    #[test]
    fn test_append_keeps_order() {
        let mut a: ClusterTable = vec![cluster(1, 10)].into_iter().collect();
        let mut b: ClusterTable = vec![cluster(2, 20), cluster(3, 30)].into_iter().collect();
        a.append(&mut b);
        let events: Vec<usize> = a.iter().map(|c| c.event).collect();
        assert_eq!(events, vec![1, 2, 3]);
        assert!(b.is_empty());
    }

    #[test]
    fn test_iter_strips_and_chip() {
        let c = cluster(1, 70);
        let strips: Vec<usize> = c.iter_strips().map(|(i, _)| i).collect();
        assert_eq!(strips, vec![69, 70, 71]);
        assert_eq!(c.chip(), 1);
    }
}
