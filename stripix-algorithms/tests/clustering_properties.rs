#![allow(clippy::cast_precision_loss, clippy::float_cmp)]
use approx::assert_relative_eq;
use stripix_algorithms::{
    cluster_events, estimate, process_events, ClusteringState, StripClustering,
};
use stripix_core::{
    CalibrationGroup, ChannelCalibration, ClusteringConfig, CommonModeConfig, CommonModePolicy,
    CorrectedEvent, RawEvent, CHIP_CHANNELS,
};

fn plain_engine() -> StripClustering {
    StripClustering::new(ClusteringConfig::new().with_common_mode(None)).unwrap()
}

#[test]
fn test_adjacent_seeds_pruned_to_first() {
    let mut values = vec![0.0; 128];
    values[10] = 60.0;
    values[11] = 55.0;
    values[20] = 45.0;

    let clusters = plain_engine().cluster_event(&values, 1, &mut ClusteringState::default());
    let seeds: Vec<usize> = clusters.iter().map(|c| c.seed).collect();
    assert_eq!(seeds, vec![10, 20]);
    assert!(clusters.iter().all(|c| c.nclust == 2));
    // Growth from 10 stops at 11, which is above the high threshold
    assert_eq!(clusters[0].width, 1);
}

#[test]
fn test_clustering_is_deterministic() {
    let events: Vec<CorrectedEvent> = (0..200)
        .map(|e| {
            let values = (0..384)
                .map(|ch| (((e * 7919 + ch * 104_729) % 97) as f64) - 20.0)
                .collect();
            CorrectedEvent::new(e, values)
        })
        .collect();
    let engine = StripClustering::new(ClusteringConfig::new().with_max_seeds(384)).unwrap();

    let (first, first_state) = cluster_events(&events, &engine);
    let (second, second_state) = cluster_events(&events, &engine);
    assert!(!first.is_empty());
    assert_eq!(first, second);
    assert_eq!(first_state, second_state);
}

#[test]
fn test_fixed_threshold_common_mode_with_outlier() {
    let mut values = vec![10.0; CHIP_CHANNELS];
    values[40] = 200.0;
    let config = CommonModeConfig::new(CommonModePolicy::FixedThreshold);
    assert_relative_eq!(estimate(&values, &config).unwrap(), 10.0);
}

#[test]
fn test_common_mode_removed_before_seeding() {
    // A 30 count baseline shift would make every strip a seed
    let mut values = vec![30.0; 2 * CHIP_CHANNELS];
    values[70] = 90.0;
    values[71] = 45.0;

    let config = ClusteringConfig::new().with_common_mode(Some(CommonModeConfig::new(
        CommonModePolicy::FixedThreshold,
    )));
    let engine = StripClustering::new(config).unwrap();
    let clusters = engine.cluster_event(&values, 3, &mut ClusteringState::default());

    // Chip 1 baseline averages every value below the signal cut
    let cm = (62.0 * 30.0 + 45.0) / 63.0;
    let (seed, neighbour) = (90.0 - cm, 45.0 - cm);

    assert_eq!(clusters.len(), 1);
    let c = &clusters[0];
    assert_eq!(c.event, 3);
    assert_eq!(c.seed, 70);
    assert_eq!(c.width, 2);
    assert_relative_eq!(c.signal, seed + neighbour, epsilon = 1e-9);
    assert_relative_eq!(
        c.cog,
        (70.0 * seed + 71.0 * neighbour) / (seed + neighbour),
        epsilon = 1e-9
    );
}

#[test]
fn test_full_pipeline_from_raw_samples() {
    // Raw samples are interleaved: detector strip k < 64 sits at slot 2k
    let mut samples = vec![100u16; 128];
    samples[2 * 30] = 160;
    let events = vec![RawEvent::new(0, samples)];
    let calibration = CalibrationGroup::new(
        (0..128)
            .map(|_| ChannelCalibration {
                pedestal: Some(100.0),
                flag: Some(0.0),
                ..ChannelCalibration::default()
            })
            .collect(),
    );

    let (table, state) = process_events(&events, &calibration, &plain_engine());
    assert_eq!(state.events_processed, 1);
    assert_eq!(table.len(), 1);
    let c = &table.as_slice()[0];
    assert_eq!(c.event, 1);
    assert_eq!(c.seed, 30);
    assert_relative_eq!(c.signal, 60.0);
}
