//! Piano fingering domain: keyboard geometry, anatomical candidate
//! generation, ergonomic rewards and the decision process tying them
//! together.
//!
//! Pitches are MIDI numbers 21..=108 (A0 to C8); fingers are numbered
//! 1 (thumb) to 5 (little finger) for both hands.

pub mod candidates;
pub mod geometry;
pub mod mdp;
pub mod reward;
pub mod types;

pub use candidates::{assign_fingering, build_fingering, one_to_one_fingerings};
pub use mdp::{FingeringMdp, State, DEFAULT_LONG_NOTE_TICKS};
pub use types::{
    flatten_policy, validate_sequence, FingerAssignment, Fingering, FingeringEntry, Hand,
    InputError, Note, NoteGroup, SegmentPart,
};
