//! The fingering decision process.
//!
//! Binds the anatomical candidate generator and the ergonomic reward
//! model into an [`Mdp`] over a sequence of note groups. A state is the
//! position in the sequence together with the fingering chosen for the
//! previous group; an action is a fingering for the current group.

use serde::{Deserialize, Serialize};

use crate::dynaq::Mdp;

use super::candidates::{assign_fingering, build_fingering, one_to_one_fingerings};
use super::reward::reward;
use super::types::{
    validate_sequence, FingerAssignment, Fingering, Hand, InputError, NoteGroup, SegmentPart,
};

/// Default hold length, in MIDI ticks, beyond which the hand is
/// considered free to reposition (two whole notes at 1890 ticks per
/// quarter).
pub const DEFAULT_LONG_NOTE_TICKS: u64 = 15_120;

/// Position in the sequence plus the fingering of the previous group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct State {
    /// Index of the group the next action will finger.
    pub index: usize,
    /// Fingering chosen one step earlier; empty at the start.
    pub prev: Fingering,
}

/// A hand's journey through one segment of a piece.
#[derive(Debug, Clone)]
pub struct FingeringMdp {
    hand: Hand,
    groups: Vec<NoteGroup>,
    part: SegmentPart,
    long_note_ticks: u64,
}

impl FingeringMdp {
    /// Build a process over a validated group sequence.
    pub fn new(hand: Hand, groups: Vec<NoteGroup>, part: SegmentPart) -> Result<Self, InputError> {
        validate_sequence(&groups)?;
        Ok(Self {
            hand,
            groups,
            part,
            long_note_ticks: DEFAULT_LONG_NOTE_TICKS,
        })
    }

    /// Builder method: set the long-note threshold in ticks.
    pub fn with_long_note_ticks(mut self, ticks: u64) -> Self {
        self.long_note_ticks = ticks;
        self
    }

    /// The hand this process fingers for.
    pub fn hand(&self) -> Hand {
        self.hand
    }

    /// The note groups being fingered.
    pub fn groups(&self) -> &[NoteGroup] {
        &self.groups
    }

    /// Duration of the group preceding `index`, 0 at the start.
    fn prev_duration(&self, index: usize) -> u64 {
        if index == 0 {
            0
        } else {
            self.groups[index - 1].duration()
        }
    }

    /// Whether a boundary group must anchor on finger 5.
    ///
    /// Segment edges that continue into a neighboring segment pin single
    /// notes to the little finger so that stitched policies meet on a
    /// stable hand position. The entry edge anchors unless this is the
    /// piece's opening, the exit edge unless it is the piece's close.
    fn anchored(&self, index: usize) -> bool {
        if index == 0 {
            !matches!(self.part, SegmentPart::First | SegmentPart::Whole)
        } else if index + 1 == self.groups.len() {
            matches!(self.part, SegmentPart::First | SegmentPart::Middle)
        } else {
            false
        }
    }
}

impl Mdp for FingeringMdp {
    type State = State;
    type Action = Fingering;

    fn initial_state(&self) -> State {
        State {
            index: 0,
            prev: Fingering::empty(),
        }
    }

    fn is_terminal(&self, state: &State) -> bool {
        state.index >= self.groups.len()
    }

    fn actions(&self, state: &State) -> Vec<Fingering> {
        let Some(group) = self.groups.get(state.index) else {
            return Vec::new();
        };

        if self.anchored(state.index) && group.len() == 1 {
            let pitch = group.notes()[0].pitch;
            return vec![build_fingering(self.hand, &[pitch], &[5])];
        }

        if state.index > 0 && state.prev.len() == 1 && group.len() == 1 {
            let candidates = one_to_one_fingerings(self.hand, &state.prev, group.notes()[0]);
            if !candidates.is_empty() {
                return candidates;
            }
            // No reachable single-note move; fall through to the full set.
        }

        assign_fingering(self.hand, group.notes())
    }

    fn reward(&self, state: &State, action: &Fingering) -> f64 {
        reward(
            self.hand,
            state.index,
            &state.prev,
            self.prev_duration(state.index),
            self.long_note_ticks,
            action,
        )
    }

    fn transition(&self, state: &State, action: &Fingering) -> State {
        State {
            index: state.index + 1,
            prev: action.clone(),
        }
    }

    fn default_action(&self, state: &State) -> Option<Fingering> {
        let group = self.groups.get(state.index)?;
        let entries = group
            .notes()
            .iter()
            .enumerate()
            .map(|(i, note)| FingerAssignment {
                pitch: note.pitch,
                finger: (i + 1).min(5) as u8,
            })
            .collect();
        Some(Fingering::new(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynaq::Mdp;

    fn melody(pitches: &[u8]) -> Vec<NoteGroup> {
        pitches.iter().map(|&p| NoteGroup::single(p, 480)).collect()
    }

    #[test]
    fn empty_sequence_is_rejected() {
        let result = FingeringMdp::new(Hand::Right, Vec::new(), SegmentPart::Whole);
        assert_eq!(result.err(), Some(InputError::EmptySequence));
    }

    #[test]
    fn opening_single_note_offers_all_five_fingers() {
        let mdp = FingeringMdp::new(Hand::Right, melody(&[60, 62]), SegmentPart::Whole)
            .expect("valid sequence");
        let actions = mdp.actions(&mdp.initial_state());
        assert_eq!(actions.len(), 5);
    }

    #[test]
    fn continuation_segment_anchors_its_first_note() {
        let mdp = FingeringMdp::new(Hand::Right, melody(&[60, 62, 64]), SegmentPart::Middle)
            .expect("valid sequence");
        let actions = mdp.actions(&mdp.initial_state());
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].entries()[0].finger, 5);
    }

    #[test]
    fn continuing_segment_anchors_its_last_note() {
        let mdp = FingeringMdp::new(Hand::Right, melody(&[60, 62, 64]), SegmentPart::First)
            .expect("valid sequence");
        let state = State {
            index: 2,
            prev: Fingering::new(vec![FingerAssignment {
                pitch: 62,
                finger: 2,
            }]),
        };
        let actions = mdp.actions(&state);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].entries()[0].finger, 5);
    }

    #[test]
    fn interior_single_steps_use_transition_candidates() {
        let mdp = FingeringMdp::new(Hand::Right, melody(&[60, 62, 64]), SegmentPart::Whole)
            .expect("valid sequence");
        let state = State {
            index: 1,
            prev: Fingering::new(vec![FingerAssignment {
                pitch: 60,
                finger: 1,
            }]),
        };
        // Every offered action stays a single note and none repeats the
        // thumb on a new pitch without a crossing.
        let actions = mdp.actions(&state);
        assert!(!actions.is_empty());
        assert!(actions.iter().all(|a| a.len() == 1));
    }

    #[test]
    fn transition_advances_and_records_the_action() {
        let mdp = FingeringMdp::new(Hand::Right, melody(&[60, 62]), SegmentPart::Whole)
            .expect("valid sequence");
        let action = Fingering::new(vec![FingerAssignment {
            pitch: 60,
            finger: 2,
        }]);
        let next = mdp.transition(&mdp.initial_state(), &action);
        assert_eq!(next.index, 1);
        assert_eq!(next.prev, action);
        assert!(!mdp.is_terminal(&next));
        assert!(mdp.is_terminal(&State {
            index: 2,
            prev: action,
        }));
    }

    #[test]
    fn default_action_assigns_ascending_fingers() {
        let groups = vec![NoteGroup::chord(&[60, 64, 67], 480)];
        let mdp =
            FingeringMdp::new(Hand::Right, groups, SegmentPart::Whole).expect("valid sequence");
        let action = mdp
            .default_action(&mdp.initial_state())
            .expect("group exists");
        let fingers: Vec<u8> = action.entries().iter().map(|e| e.finger).collect();
        assert_eq!(fingers, vec![1, 2, 3]);
    }
}
