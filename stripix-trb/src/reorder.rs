//! Multiplexer channel ordering for streamed boards.
//!
//! A streamed board carries 10 ADC lanes of 128 samples each. On the wire
//! the lanes are interleaved sample by sample, lanes swapped in pairs: wire
//! index `ch * 10 + p` holds channel `ch` of lane `ADC_ORDER[p]`.

/// Lane visited at each position of one multiplexer cycle.
pub const ADC_ORDER: [usize; ADC_LANES] = [1, 0, 3, 2, 5, 4, 7, 6, 9, 8];

/// Number of ADC lanes per board.
pub const ADC_LANES: usize = 10;

/// Samples per ADC lane.
pub const LANE_SAMPLES: usize = 128;

/// Samples in one complete board readout.
pub const BOARD_SAMPLES: usize = ADC_LANES * LANE_SAMPLES;

/// Maps wire order to detector channel order.
///
/// Returns `None` unless `wire` holds exactly [`BOARD_SAMPLES`] samples.
#[must_use]
pub fn reorder<T: Copy + Default>(wire: &[T]) -> Option<Vec<T>> {
    if wire.len() != BOARD_SAMPLES {
        return None;
    }
    let mut out = vec![T::default(); BOARD_SAMPLES];
    for (j, &sample) in wire.iter().enumerate() {
        let ch = j / ADC_LANES;
        let position = j % ADC_LANES;
        out[ADC_ORDER[position] * LANE_SAMPLES + ch] = sample;
    }
    Some(out)
}

/// Maps detector channel order back to wire order.
///
/// Returns `None` unless `detector` holds exactly [`BOARD_SAMPLES`] samples.
#[must_use]
pub fn inverse_reorder<T: Copy + Default>(detector: &[T]) -> Option<Vec<T>> {
    if detector.len() != BOARD_SAMPLES {
        return None;
    }
    let mut out = vec![T::default(); BOARD_SAMPLES];
    for (j, slot) in out.iter_mut().enumerate() {
        let ch = j / ADC_LANES;
        let position = j % ADC_LANES;
        *slot = detector[ADC_ORDER[position] * LANE_SAMPLES + ch];
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_cycle_lands_in_swapped_lanes() {
        let wire: Vec<u32> = (0..BOARD_SAMPLES as u32).collect();
        let out = reorder(&wire).unwrap();
        // wire 0 is lane 1 channel 0, wire 1 is lane 0 channel 0
        assert_eq!(out[128], 0);
        assert_eq!(out[0], 1);
        assert_eq!(out[3 * 128], 2);
        // wire 10 starts channel 1
        assert_eq!(out[128 + 1], 10);
    }

    #[test]
    fn test_round_trip() {
        let wire: Vec<u32> = (0..BOARD_SAMPLES as u32).map(|v| v * 7 + 3).collect();
        let detector = reorder(&wire).unwrap();
        assert_ne!(detector, wire);
        assert_eq!(inverse_reorder(&detector).unwrap(), wire);
    }

    #[test]
    fn test_reorder_is_a_permutation() {
        let wire: Vec<u32> = (0..BOARD_SAMPLES as u32).collect();
        let mut detector = reorder(&wire).unwrap();
        detector.sort_unstable();
        assert_eq!(detector, wire);
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(reorder(&[0u16; 640]).is_none());
        assert!(inverse_reorder(&[0u16; 1281]).is_none());
    }
}
