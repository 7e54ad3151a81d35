//! Batch helpers that run correction and clustering over many events.
//!
//! Events are processed in parallel with rayon; results are always
//! returned in input order, so repeated runs produce identical tables.

use crate::clustering::{ClusteringState, StripClustering};
use rayon::prelude::*;
use stripix_core::{CalibrationGroup, ClusterTable, CorrectedEvent, Correction, RawEvent};

/// Un-shuffles and calibrates a batch of raw events.
#[must_use]
pub fn correct_events(
    events: &[RawEvent],
    calibration: &CalibrationGroup,
    correction: Correction,
) -> Vec<CorrectedEvent> {
    events
        .par_iter()
        .map(|raw| calibration.correct(raw, correction))
        .collect()
}

/// Clusters a batch of corrected events.
///
/// Returns the cluster table in event order together with the merged
/// engine counters.
#[must_use]
pub fn cluster_events(
    events: &[CorrectedEvent],
    engine: &StripClustering,
) -> (ClusterTable, ClusteringState) {
    let per_event: Vec<_> = events
        .par_iter()
        .map(|event| {
            let mut state = ClusteringState::default();
            let clusters = engine.cluster_corrected(event, &mut state);
            (clusters, state)
        })
        .collect();

    let mut table = ClusterTable::with_capacity(per_event.len());
    let mut state = ClusteringState::default();
    for (clusters, event_state) in per_event {
        state.merge(&event_state);
        table.extend(clusters);
    }
    log::debug!(
        "clustered {} events into {} clusters",
        state.events_processed,
        state.clusters_found
    );
    (table, state)
}

/// Calibrates and clusters a batch of raw events.
#[must_use]
pub fn process_events(
    events: &[RawEvent],
    calibration: &CalibrationGroup,
    engine: &StripClustering,
) -> (ClusterTable, ClusteringState) {
    let corrected = correct_events(events, calibration, Correction::Signal);
    cluster_events(&corrected, engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stripix_core::{ChannelCalibration, ClusteringConfig};

    #[test]
    fn test_correct_events_keeps_order() {
        let events: Vec<RawEvent> = (0..50)
            .map(|i| RawEvent::new(i, vec![i as u16; 128]))
            .collect();
        let calibration = CalibrationGroup::new(vec![ChannelCalibration::default(); 128]);
        let corrected = correct_events(&events, &calibration, Correction::Signal);
        for (i, event) in corrected.iter().enumerate() {
            assert_eq!(event.index, i);
            assert!(event.values.iter().all(|&v| (v - i as f64).abs() < f64::EPSILON));
        }
    }

    #[test]
    fn test_cluster_events_in_event_order() {
        let events: Vec<CorrectedEvent> = (0..20)
            .map(|i| {
                let mut values = vec![0.0; 128];
                values[i * 3 + 10] = 100.0;
                CorrectedEvent::new(i, values)
            })
            .collect();
        let engine = StripClustering::new(ClusteringConfig::new().with_common_mode(None)).unwrap();
        let (table, state) = cluster_events(&events, &engine);

        assert_eq!(table.len(), 20);
        assert_eq!(state.events_processed, 20);
        let numbers: Vec<usize> = table.iter().map(|c| c.event).collect();
        assert_eq!(numbers, (1..=20).collect::<Vec<_>>());
    }
}
