//! Seed-based strip clustering.
//!
//! Strips above the high threshold seed clusters. A seed grows over its
//! neighbours while they sit strictly between the two thresholds, or takes a
//! fixed window around itself in symmetric mode.

use crate::common_mode::subtract_common_mode;
use stripix_core::{Cluster, ClusteringConfig, CorrectedEvent, Result};

/// Counters accumulated over the events seen by one engine run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusteringState {
    /// Events passed to the engine.
    pub events_processed: usize,
    /// Events with no seed candidate.
    pub events_without_seeds: usize,
    /// Events rejected for having too many seed candidates.
    pub events_over_multiplicity: usize,
    /// Seeds skipped in symmetric mode for lack of margin.
    pub seeds_at_edge: usize,
    /// Clusters produced.
    pub clusters_found: usize,
}

impl ClusteringState {
    /// Clears every counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Folds the counters of another run into this one.
    pub fn merge(&mut self, other: &Self) {
        self.events_processed += other.events_processed;
        self.events_without_seeds += other.events_without_seeds;
        self.events_over_multiplicity += other.events_over_multiplicity;
        self.seeds_at_edge += other.seeds_at_edge;
        self.clusters_found += other.clusters_found;
    }
}

/// Channels whose value is strictly above `high`, ascending.
#[must_use]
pub fn find_seeds(values: &[f64], high: f64) -> Vec<usize> {
    values
        .iter()
        .enumerate()
        .filter(|&(_, &v)| v > high)
        .map(|(i, _)| i)
        .collect()
}

/// Drops every candidate whose lower neighbour is also a candidate.
///
/// `candidates` must be ascending. A run of adjacent candidates keeps only
/// its first member.
#[must_use]
pub fn prune_adjacent(candidates: &[usize]) -> Vec<usize> {
    candidates
        .iter()
        .enumerate()
        .filter(|&(i, &c)| i == 0 || candidates[i - 1] + 1 != c)
        .map(|(_, &c)| c)
        .collect()
}

/// Signal-weighted mean index over `values`, starting at `first`.
///
/// Falls back to the unweighted mean index when the signal sums to zero.
#[allow(clippy::cast_precision_loss)]
fn center_of_gravity(first: usize, values: &[f64]) -> (f64, f64) {
    let signal: f64 = values.iter().sum();
    if signal == 0.0 {
        let mid = first as f64 + (values.len().saturating_sub(1)) as f64 / 2.0;
        return (signal, mid);
    }
    let weighted: f64 = values
        .iter()
        .enumerate()
        .map(|(i, v)| (first + i) as f64 * v)
        .sum();
    (signal, weighted / signal)
}

/// Strip clustering engine.
#[derive(Debug, Clone, Default)]
pub struct StripClustering {
    config: ClusteringConfig,
}

impl StripClustering {
    /// Creates an engine with a validated configuration.
    ///
    /// # Errors
    /// Returns a configuration error if the thresholds or window are invalid.
    pub fn new(config: ClusteringConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    /// Clusters one corrected event.
    ///
    /// The cluster records carry the one-based event number.
    #[must_use]
    pub fn cluster_corrected(
        &self,
        event: &CorrectedEvent,
        state: &mut ClusteringState,
    ) -> Vec<Cluster> {
        self.cluster_event(&event.values, event.index + 1, state)
    }

    /// Clusters one event vector in detector channel order.
    ///
    /// Common-mode subtraction, when configured, is applied to a copy.
    /// Events with no seeds or more than `max_seeds` seeds yield nothing.
    #[must_use]
    pub fn cluster_event(
        &self,
        values: &[f64],
        event_number: usize,
        state: &mut ClusteringState,
    ) -> Vec<Cluster> {
        state.events_processed += 1;

        let mut owned;
        let values = match &self.config.common_mode {
            Some(cm) => {
                owned = values.to_vec();
                subtract_common_mode(&mut owned, cm);
                owned.as_slice()
            }
            None => values,
        };

        let candidates = find_seeds(values, self.config.high_threshold);
        if candidates.is_empty() {
            state.events_without_seeds += 1;
            return Vec::new();
        }
        if candidates.len() > self.config.max_seeds {
            state.events_over_multiplicity += 1;
            log::debug!(
                "event {event_number}: {} seeds exceed the limit of {}",
                candidates.len(),
                self.config.max_seeds
            );
            return Vec::new();
        }

        let seeds = prune_adjacent(&candidates);
        let nclust = seeds.len();
        let mut clusters = Vec::with_capacity(nclust);
        for seed in seeds {
            let cluster = if self.config.symmetric {
                self.symmetric_cluster(values, seed, event_number, nclust)
            } else {
                Some(self.grow_cluster(values, seed, event_number, nclust))
            };
            match cluster {
                Some(cluster) => clusters.push(cluster),
                None => state.seeds_at_edge += 1,
            }
        }
        state.clusters_found += clusters.len();
        clusters
    }

    fn symmetric_cluster(
        &self,
        values: &[f64],
        seed: usize,
        event: usize,
        nclust: usize,
    ) -> Option<Cluster> {
        let w = self.config.symmetric_width;
        if seed < w || seed + w >= values.len() {
            return None;
        }
        let first = seed - w;
        let strips = values[first..=seed + w].to_vec();
        let (signal, cog) = center_of_gravity(first, &strips);
        Some(Cluster {
            event,
            nclust,
            seed,
            signal,
            width: 2 * w + 1,
            address: seed,
            cog,
            first_strip: first,
            strips,
        })
    }

    fn grow_cluster(&self, values: &[f64], seed: usize, event: usize, nclust: usize) -> Cluster {
        let (low, high) = (self.config.low_threshold, self.config.high_threshold);
        let accepts = |v: f64| v > low && v < high;

        let mut first = seed;
        while first > 0 && accepts(values[first - 1]) {
            first -= 1;
        }
        let mut last = seed;
        while last + 1 < values.len() && accepts(values[last + 1]) {
            last += 1;
        }

        let strips = values[first..=last].to_vec();
        let (signal, cog) = center_of_gravity(first, &strips);
        Cluster {
            event,
            nclust,
            seed,
            signal,
            width: strips.len(),
            address: first,
            cog,
            first_strip: first,
            strips,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn engine(config: ClusteringConfig) -> StripClustering {
        StripClustering::new(config.with_common_mode(None)).unwrap()
    }

    #[test]
    fn test_prune_adjacent() {
        assert_eq!(prune_adjacent(&[10, 11, 20]), vec![10, 20]);
        assert_eq!(prune_adjacent(&[10, 11, 12]), vec![10]);
        assert_eq!(prune_adjacent(&[3, 5, 7]), vec![3, 5, 7]);
        assert!(prune_adjacent(&[]).is_empty());
    }

    #[test]
    fn test_asymmetric_growth() {
        let mut values = vec![0.0; 64];
        values[19] = 10.0;
        values[20] = 40.0;
        values[21] = 20.0;
        values[22] = 8.0; // exactly at the low threshold stops growth
        let engine = engine(ClusteringConfig::new());
        let mut state = ClusteringState::default();
        let clusters = engine.cluster_event(&values, 1, &mut state);

        assert_eq!(clusters.len(), 1);
        let c = &clusters[0];
        assert_eq!(c.seed, 20);
        assert_eq!(c.address, 19);
        assert_eq!(c.width, 3);
        assert_relative_eq!(c.signal, 70.0);
        assert_relative_eq!(c.cog, (19.0 * 10.0 + 20.0 * 40.0 + 21.0 * 20.0) / 70.0);
        assert_eq!(c.strips, vec![10.0, 40.0, 20.0]);
        assert_eq!(state.clusters_found, 1);
    }

    #[test]
    fn test_neighbour_at_high_threshold_is_neither_seed_nor_grown() {
        let mut values = vec![0.0; 64];
        values[20] = 40.0;
        values[21] = 25.0;
        values[22] = 15.0;
        let engine = engine(ClusteringConfig::new());
        let mut state = ClusteringState::default();
        let clusters = engine.cluster_event(&values, 1, &mut state);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].seed, 20);
        assert_eq!(clusters[0].nclust, 1);
        assert_eq!(clusters[0].width, 1);
        assert_eq!(clusters[0].address, 20);
        assert_relative_eq!(clusters[0].signal, 40.0);
    }

    #[test]
    fn test_asymmetric_growth_reaches_edges() {
        let values = vec![30.0, 12.0, 12.0];
        let engine = engine(ClusteringConfig::new());
        let clusters = engine.cluster_event(&values, 1, &mut ClusteringState::default());
        assert_eq!(clusters[0].address, 0);
        assert_eq!(clusters[0].width, 3);

        let values = vec![12.0, 12.0, 30.0];
        let clusters = engine.cluster_event(&values, 1, &mut ClusteringState::default());
        assert_eq!(clusters[0].address, 0);
        assert_eq!(clusters[0].width, 3);
    }

    #[test]
    fn test_symmetric_window() {
        let mut values = vec![1.0; 64];
        values[30] = 50.0;
        let engine = engine(ClusteringConfig::new().with_symmetric_window(2));
        let clusters = engine.cluster_event(&values, 4, &mut ClusteringState::default());

        assert_eq!(clusters.len(), 1);
        let c = &clusters[0];
        assert_eq!(c.event, 4);
        assert_eq!(c.width, 5);
        assert_eq!(c.address, 30);
        assert_eq!(c.first_strip, 28);
        assert_relative_eq!(c.signal, 54.0);
        assert_relative_eq!(c.cog, 30.0);
    }

    #[test]
    fn test_symmetric_seed_without_margin_is_skipped() {
        let mut values = vec![0.0; 64];
        values[0] = 50.0;
        values[63] = 50.0;
        values[30] = 50.0;
        let engine = engine(ClusteringConfig::new().with_symmetric_window(1));
        let mut state = ClusteringState::default();
        let clusters = engine.cluster_event(&values, 1, &mut state);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].seed, 30);
        assert_eq!(clusters[0].nclust, 3);
        assert_eq!(state.seeds_at_edge, 2);
    }

    #[test]
    fn test_too_many_seeds() {
        let values: Vec<f64> = (0..64).map(|i| if i % 2 == 0 { 100.0 } else { 0.0 }).collect();
        let engine = engine(ClusteringConfig::new());
        let mut state = ClusteringState::default();
        assert!(engine.cluster_event(&values, 1, &mut state).is_empty());
        assert_eq!(state.events_over_multiplicity, 1);
    }

    #[test]
    fn test_no_seeds() {
        let engine = engine(ClusteringConfig::new());
        let mut state = ClusteringState::default();
        assert!(engine
            .cluster_event(&[25.0; 64], 1, &mut state)
            .is_empty());
        assert_eq!(state.events_without_seeds, 1);
    }

    #[test]
    fn test_zero_signal_cog_falls_back_to_mean_index() {
        assert_eq!(center_of_gravity(10, &[5.0, -10.0, 5.0]), (0.0, 11.0));
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(StripClustering::new(ClusteringConfig::new().with_thresholds(5.0, 8.0)).is_err());
    }
}
