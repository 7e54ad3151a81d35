//! stripix-trb: miniTRB binary decoding.
//!
//! This crate turns miniTRB acquisition output into raw events: fixed-stride
//! data files recorded by the board, and the live UDP word stream.
//!
//! # Key Components
//!
//! - [`WordReader`] - Positional 16-bit word reader with runtime byte order
//! - [`FileLayout`] - Header discovery (endianness, event header, version)
//! - [`RawEvents`] - Lazy iterator over the complete events of a file
//! - [`StreamFramer`] - Sentinel state machine for the live stream
//!
//! # File Framing
//!
//! 1. Scan for the endianness marker and the event header in 2-byte steps
//! 2. Check the data-kind byte and read the hardware version word
//! 3. Read events at a fixed 1024-byte stride until a slot is short

pub mod error;
pub mod events;
pub mod layout;
pub mod reorder;
pub mod stream;
pub mod word;

pub use error::{Error, Result};
pub use events::{read_event, RawEvents, SampleMode, Truncation};
pub use layout::{FileLayout, EVENT_STRIDE, RAW_KIND};
pub use reorder::{inverse_reorder, reorder, BOARD_SAMPLES};
pub use stream::{BoardFrame, StreamFramer, StreamStats, BOARD_END, BOARD_START, EVENT_START};
pub use word::{Endianness, WordReader};

// Re-export core types for convenience
pub use stripix_core::{HardwareVersion, RawEvent};
