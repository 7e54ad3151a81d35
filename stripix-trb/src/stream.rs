//! Live stream framing.
//!
//! The acquisition board streams little-endian 32-bit words. An event opens
//! with [`EVENT_START`]; each board's payload sits between [`BOARD_START`]
//! and [`BOARD_END`]. Sentinels are matched by literal equality only, so a
//! payload word equal to a sentinel value desynchronizes the stream until
//! the next [`EVENT_START`]. Only one board per event is decoded.

use crate::reorder::{reorder, BOARD_SAMPLES};
use byteorder::{ByteOrder, LittleEndian};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Opens an event.
pub const EVENT_START: u32 = 0xFA4A_F1CA;
/// Opens a board payload inside an event.
pub const BOARD_START: u32 = 0xBABA_1A9A;
/// Closes a board payload.
pub const BOARD_END: u32 = 0x0BED_FACE;

/// Words of board header preceding the samples.
pub const BOARD_HEADER_WORDS: usize = 8;

/// Channels per connector; a board frame holds two connectors.
pub const CONNECTOR_CHANNELS: usize = BOARD_SAMPLES / 2;

/// Splits one payload word into its two samples, low half first.
///
/// The two low bits of each half are ADC status flags and are dropped.
#[inline]
#[must_use]
pub fn decode_word(word: u32) -> [u16; 2] {
    let low = (word & 0xFFFF) as u16;
    let high = ((word >> 16) & 0xFFFF) as u16;
    [low / 4, high / 4]
}

/// Decodes board payload words into samples in wire order.
#[must_use]
pub fn decode_board(words: &[u32]) -> Vec<u16> {
    words.iter().flat_map(|&w| decode_word(w)).collect()
}

/// One decoded board readout in detector channel order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoardFrame {
    /// Sequence number, starting at 1 for the first completed frame.
    pub id: u64,
    /// First connector (J7), 640 channels.
    pub j7: Vec<u16>,
    /// Second connector (J5), 640 channels.
    pub j5: Vec<u16>,
}

impl BoardFrame {
    /// Returns the channels of connector 0 (J7) or 1 (J5).
    #[must_use]
    pub fn connector(&self, index: usize) -> Option<&[u16]> {
        match index {
            0 => Some(&self.j7),
            1 => Some(&self.j5),
            _ => None,
        }
    }
}

/// Counters for conditions the framer absorbed instead of failing on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StreamStats {
    /// Words consumed.
    pub words: u64,
    /// Frames published.
    pub frames: u64,
    /// Words seen outside any event.
    pub discarded_words: u64,
    /// Out-of-order sentinels that were ignored or restarted a board.
    pub desync_warnings: u64,
    /// Boards closed with a payload of the wrong size.
    pub dropped_boards: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    InEvent,
    InBoard,
}

/// Stateful decoder turning a word stream into board frames.
#[derive(Debug, Clone)]
pub struct StreamFramer {
    state: State,
    board_words: Vec<u32>,
    stats: StreamStats,
}

impl Default for StreamFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamFramer {
    /// Creates an idle framer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            board_words: Vec::with_capacity(BOARD_HEADER_WORDS + BOARD_SAMPLES / 2),
            stats: StreamStats::default(),
        }
    }

    /// Returns true inside an event.
    #[must_use]
    pub fn in_event(&self) -> bool {
        self.state != State::Idle
    }

    /// Returns true while accumulating a board payload.
    #[must_use]
    pub fn in_board(&self) -> bool {
        self.state == State::InBoard
    }

    /// Number of words accumulated for the current board.
    #[must_use]
    pub fn pending_words(&self) -> usize {
        self.board_words.len()
    }

    /// Counters since creation.
    #[must_use]
    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    /// Drops any partial event and returns to idle.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.board_words.clear();
    }

    /// Consumes one word, returning a frame when a board completes.
    pub fn push_word(&mut self, word: u32) -> Option<BoardFrame> {
        self.stats.words += 1;

        if word == EVENT_START {
            if self.state == State::InBoard {
                self.desync("event start inside a board");
            }
            self.state = State::InEvent;
            self.board_words.clear();
            return None;
        }

        match (self.state, word) {
            (State::Idle, _) => {
                self.stats.discarded_words += 1;
                None
            }
            (State::InEvent, BOARD_START) => {
                self.state = State::InBoard;
                self.board_words.clear();
                None
            }
            (State::InBoard, BOARD_START) => {
                self.desync("board start inside a board");
                self.board_words.clear();
                None
            }
            (State::InEvent, BOARD_END) => {
                self.desync("board end outside a board");
                None
            }
            (State::InEvent, _) => None,
            (State::InBoard, BOARD_END) => {
                let frame = self.close_board();
                self.reset();
                frame
            }
            (State::InBoard, _) => {
                self.board_words.push(word);
                None
            }
        }
    }

    /// Consumes every complete little-endian word of a datagram.
    ///
    /// Trailing bytes that do not form a full word are ignored.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<BoardFrame> {
        bytes
            .chunks_exact(4)
            .filter_map(|chunk| self.push_word(LittleEndian::read_u32(chunk)))
            .collect()
    }

    fn close_board(&mut self) -> Option<BoardFrame> {
        let payload = self.board_words.get(BOARD_HEADER_WORDS..).unwrap_or(&[]);
        let samples = decode_board(payload);
        let Some(ordered) = reorder(&samples) else {
            self.stats.dropped_boards += 1;
            self.desync("board payload has the wrong size");
            log::warn!(
                "dropping board with {} samples, expected {}",
                samples.len(),
                BOARD_SAMPLES
            );
            return None;
        };
        self.stats.frames += 1;
        let (j7, j5) = ordered.split_at(CONNECTOR_CHANNELS);
        Some(BoardFrame {
            id: self.stats.frames,
            j7: j7.to_vec(),
            j5: j5.to_vec(),
        })
    }

    fn desync(&mut self, what: &str) {
        self.stats.desync_warnings += 1;
        log::warn!("stream desync: {what}");
    }
}
