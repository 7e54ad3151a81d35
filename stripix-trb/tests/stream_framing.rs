#![allow(clippy::cast_possible_truncation, clippy::unreadable_literal)]
use stripix_trb::stream::BOARD_HEADER_WORDS;
use stripix_trb::{
    inverse_reorder, BoardFrame, StreamFramer, BOARD_END, BOARD_SAMPLES, BOARD_START, EVENT_START,
};

/// Encodes detector-ordered samples as a complete event on the wire.
fn event_words(detector: &[u16]) -> Vec<u32> {
    let wire = inverse_reorder(detector).unwrap();
    let mut words = vec![EVENT_START, BOARD_START];
    words.extend(std::iter::repeat(0x1234_5678).take(BOARD_HEADER_WORDS));
    words.extend(
        wire.chunks_exact(2)
            .map(|pair| ((u32::from(pair[1]) * 4) << 16) | (u32::from(pair[0]) * 4)),
    );
    words.push(BOARD_END);
    words
}

fn to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

#[test]
fn test_complete_event_produces_one_frame() {
    let detector: Vec<u16> = (0..BOARD_SAMPLES as u16).collect();
    let mut framer = StreamFramer::new();
    let frames = framer.push_bytes(&to_bytes(&event_words(&detector)));

    assert_eq!(frames.len(), 1);
    let frame = &frames[0];
    assert_eq!(frame.j7, detector[..640].to_vec());
    assert_eq!(frame.j5, detector[640..].to_vec());
    assert_eq!(frame.connector(1), Some(&detector[640..]));
    assert_eq!(frame.connector(2), None);
}

#[test]
fn test_frame_ids_increase() {
    let detector = vec![7u16; BOARD_SAMPLES];
    let mut words = event_words(&detector);
    words.extend(event_words(&detector));

    let mut framer = StreamFramer::new();
    let ids: Vec<u64> = framer
        .push_bytes(&to_bytes(&words))
        .iter()
        .map(|f: &BoardFrame| f.id)
        .collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn test_event_split_across_datagrams() {
    let detector: Vec<u16> = (0..BOARD_SAMPLES as u16).rev().collect();
    let bytes = to_bytes(&event_words(&detector));
    let (first, second) = bytes.split_at(1000);

    let mut framer = StreamFramer::new();
    assert!(framer.push_bytes(first).is_empty());
    assert!(framer.in_board());
    let frames = framer.push_bytes(second);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].j7[0], 1279);
}

#[test]
fn test_partial_trailing_word_is_lost() {
    let detector = vec![9u16; BOARD_SAMPLES];
    let bytes = to_bytes(&event_words(&detector));
    let (first, second) = bytes.split_at(1001);

    let mut framer = StreamFramer::new();
    assert!(framer.push_bytes(first).is_empty());
    // The split word is gone, leaving the board one word short
    assert!(framer.push_bytes(&second[3..]).is_empty());
    assert_eq!(framer.stats().dropped_boards, 1);
}

#[test]
fn test_leading_garbage_is_discarded() {
    let detector = vec![1u16; BOARD_SAMPLES];
    let mut words = vec![0xAAAA_AAAA, BOARD_END, 42];
    words.extend(event_words(&detector));

    let mut framer = StreamFramer::new();
    let frames = framer.push_bytes(&to_bytes(&words));
    assert_eq!(frames.len(), 1);
    assert_eq!(framer.stats().discarded_words, 3);
}

#[test]
fn test_truncated_board_resyncs_on_next_event() {
    let detector = vec![3u16; BOARD_SAMPLES];
    let mut words = event_words(&detector);
    words.truncate(100);
    words.extend(event_words(&detector));

    let mut framer = StreamFramer::new();
    let frames = framer.push_bytes(&to_bytes(&words));
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].id, 1);
    assert_eq!(framer.stats().desync_warnings, 1);
}
