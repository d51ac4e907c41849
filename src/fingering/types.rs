//! Core domain types for the fingering problem.
//!
//! A piece is modeled per hand as an ordered sequence of [`NoteGroup`]s
//! (chords or single notes sharing an onset). The solver's job is to pick
//! one [`Fingering`] per group.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lowest pitch on an 88-key keyboard (A0).
pub const PITCH_MIN: u8 = 21;

/// Highest pitch on an 88-key keyboard (C8).
pub const PITCH_MAX: u8 = 108;

/// Which hand a part belongs to.
///
/// Laterality flips the direction-sensitive parts of the anatomy model:
/// ascending pitch moves the right hand outward but the left hand inward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hand {
    /// Left hand (low register).
    Left,
    /// Right hand (high register).
    Right,
}

impl Hand {
    /// Signed laterality factor: +1 for the right hand, -1 for the left.
    pub fn lateral(self) -> f64 {
        match self {
            Hand::Left => -1.0,
            Hand::Right => 1.0,
        }
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hand::Left => write!(f, "left"),
            Hand::Right => write!(f, "right"),
        }
    }
}

/// Position of a segment within the whole piece.
///
/// Boundary segments keep their outer end fully explorable while interior
/// boundaries are anchored (see the action-space rules) to limit
/// cross-segment discontinuity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentPart {
    /// First of several segments.
    First,
    /// Interior segment.
    Middle,
    /// Last of several segments.
    Last,
    /// The only segment (the whole piece).
    Whole,
}

/// A single note event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Note {
    /// MIDI pitch, 21..=108.
    pub pitch: u8,
    /// Onset position in ticks.
    #[serde(default)]
    pub onset: u64,
    /// Duration in ticks.
    #[serde(default)]
    pub duration: u64,
    /// Source channel (informational only).
    #[serde(default)]
    pub channel: u8,
}

impl Note {
    /// Create a note with only the fields the solver cares about.
    pub fn new(pitch: u8, duration: u64) -> Self {
        Self {
            pitch,
            onset: 0,
            duration,
            channel: 0,
        }
    }
}

/// Notes sharing an onset: a chord, or a single note.
///
/// Notes are kept sorted ascending by pitch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteGroup {
    notes: Vec<Note>,
}

impl NoteGroup {
    /// Create a group from arbitrary-order notes.
    pub fn new(mut notes: Vec<Note>) -> Self {
        notes.sort_by_key(|n| n.pitch);
        Self { notes }
    }

    /// Single-note group.
    pub fn single(pitch: u8, duration: u64) -> Self {
        Self::new(vec![Note::new(pitch, duration)])
    }

    /// Chord from a pitch list, all notes sharing one duration.
    pub fn chord(pitches: &[u8], duration: u64) -> Self {
        Self::new(pitches.iter().map(|&p| Note::new(p, duration)).collect())
    }

    /// Notes sorted ascending by pitch.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Number of notes in the group.
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// True when the group holds no notes (invalid input).
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Duration of the group, taken from its lowest note.
    pub fn duration(&self) -> u64 {
        self.notes.first().map(|n| n.duration).unwrap_or(0)
    }
}

/// One pitch bound to one finger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FingerAssignment {
    /// MIDI pitch.
    pub pitch: u8,
    /// Finger number, 1 (thumb) ..= 5 (little finger).
    pub finger: u8,
}

/// A complete finger assignment for one [`NoteGroup`], sorted ascending
/// by pitch.
///
/// `Fingering` is both the solver's action type and the policy output, so
/// it is structurally hashable and keys the value tables directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingering {
    entries: Vec<FingerAssignment>,
}

impl Fingering {
    /// Build a fingering, restoring the pitch ordering invariant.
    pub fn new(mut entries: Vec<FingerAssignment>) -> Self {
        entries.sort_by_key(|e| e.pitch);
        Self { entries }
    }

    /// The empty fingering (previous assignment of the initial state).
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// Entries sorted ascending by pitch.
    pub fn entries(&self) -> &[FingerAssignment] {
        &self.entries
    }

    /// Number of assignments.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True for the empty fingering.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lowest-pitch assignment.
    pub fn first(&self) -> Option<FingerAssignment> {
        self.entries.first().copied()
    }

    /// Highest-pitch assignment.
    pub fn last(&self) -> Option<FingerAssignment> {
        self.entries.last().copied()
    }
}

impl fmt::Display for Fingering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}:{}", e.pitch, e.finger)?;
        }
        Ok(())
    }
}

/// Flat annotation record for the score writer: one row per played note,
/// numbered in playing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingeringEntry {
    /// MIDI pitch.
    pub pitch: u8,
    /// Assigned finger, 1..=5.
    pub finger: u8,
    /// Running index over the hand's notes.
    pub position: usize,
}

/// Flatten a per-group policy into writer-ready annotation rows.
pub fn flatten_policy(policy: &[Fingering]) -> Vec<FingeringEntry> {
    let mut rows = Vec::new();
    let mut position = 0;
    for fingering in policy {
        for e in fingering.entries() {
            rows.push(FingeringEntry {
                pitch: e.pitch,
                finger: e.finger,
                position,
            });
            position += 1;
        }
    }
    rows
}

/// Invalid input detected before training starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// The note-group sequence is empty.
    EmptySequence,
    /// A group at the given index holds no notes.
    EmptyGroup(usize),
    /// A pitch lies outside the 88-key range.
    PitchOutOfRange {
        /// Index of the offending group.
        index: usize,
        /// The offending pitch.
        pitch: u8,
    },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::EmptySequence => write!(f, "note-group sequence is empty"),
            InputError::EmptyGroup(i) => write!(f, "note group {} is empty", i),
            InputError::PitchOutOfRange { index, pitch } => write!(
                f,
                "pitch {} in group {} is outside {}..={}",
                pitch, index, PITCH_MIN, PITCH_MAX
            ),
        }
    }
}

impl std::error::Error for InputError {}

/// Validate a per-hand sequence: non-empty, no empty groups, pitches in range.
pub fn validate_sequence(groups: &[NoteGroup]) -> Result<(), InputError> {
    if groups.is_empty() {
        return Err(InputError::EmptySequence);
    }
    for (index, group) in groups.iter().enumerate() {
        if group.is_empty() {
            return Err(InputError::EmptyGroup(index));
        }
        for note in group.notes() {
            if note.pitch < PITCH_MIN || note.pitch > PITCH_MAX {
                return Err(InputError::PitchOutOfRange {
                    index,
                    pitch: note.pitch,
                });
            }
        }
    }
    Ok(())
}
