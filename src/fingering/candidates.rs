//! Enumeration of anatomically admissible fingerings.
//!
//! Two generators feed the action space: full chord enumeration
//! ([`assign_fingering`]) and the much smaller single-note step generator
//! ([`one_to_one_fingerings`]). Both only propose fingerings that a hand
//! can physically form; classification of crossing moves lives here too.

use super::geometry::{is_white_key, key_distance, max_finger_span, narrow_finger_check};
use super::types::{FingerAssignment, Fingering, Hand, Note};

/// Direction of pitch motion between two events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
    Level,
}

fn direction(from: u8, to: u8) -> Direction {
    match to.cmp(&from) {
        std::cmp::Ordering::Greater => Direction::Up,
        std::cmp::Ordering::Less => Direction::Down,
        std::cmp::Ordering::Equal => Direction::Level,
    }
}

/// True when the motion leads away from the thumb side of the hand.
fn is_outward(hand: Hand, dir: Direction) -> bool {
    matches!(
        (hand, dir),
        (Hand::Right, Direction::Up) | (Hand::Left, Direction::Down)
    )
}

/// True when the motion leads back over the thumb side of the hand.
fn is_inward(hand: Hand, dir: Direction) -> bool {
    matches!(
        (hand, dir),
        (Hand::Right, Direction::Down) | (Hand::Left, Direction::Up)
    )
}

/// Map an ascending pitch list onto a finger set, ascending fingers for
/// the right hand and descending for the left.
pub fn build_fingering(hand: Hand, pitches: &[u8], fingers: &[u8]) -> Fingering {
    debug_assert_eq!(pitches.len(), fingers.len());
    let mut sorted_pitches = pitches.to_vec();
    sorted_pitches.sort_unstable();
    let mut sorted_fingers = fingers.to_vec();
    match hand {
        Hand::Right => sorted_fingers.sort_unstable(),
        Hand::Left => sorted_fingers.sort_unstable_by(|a, b| b.cmp(a)),
    }
    Fingering::new(
        sorted_pitches
            .iter()
            .zip(sorted_fingers.iter())
            .map(|(&pitch, &finger)| FingerAssignment { pitch, finger })
            .collect(),
    )
}

/// All k-element ascending combinations of the fingers 1..=5.
fn finger_combinations(k: usize) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    let mut current = Vec::with_capacity(k);
    fn recurse(start: u8, k: usize, current: &mut Vec<u8>, out: &mut Vec<Vec<u8>>) {
        if current.len() == k {
            out.push(current.clone());
            return;
        }
        for f in start..=5 {
            current.push(f);
            recurse(f + 1, k, current, out);
            current.pop();
        }
    }
    recurse(1, k, &mut current, &mut out);
    out
}

/// Enumerate every admissible fingering for a chord (or single note).
///
/// For up to five notes this walks all C(5, n) finger combinations and
/// keeps those where every pair respects the anatomical span bound (taken
/// in the laterality-correct direction) and no adjacent pair fails the
/// narrow-finger check. Chords of more than five notes are truncated to
/// the outer five playable ones (highest for the right hand, lowest for
/// the left). If nothing survives, the default ascending assignment is
/// returned so the action space is never empty for legal input.
pub fn assign_fingering(hand: Hand, notes: &[Note]) -> Vec<Fingering> {
    debug_assert!(!notes.is_empty(), "assign_fingering on empty group");
    if notes.is_empty() {
        return Vec::new();
    }

    let mut pitches: Vec<u8> = notes.iter().map(|n| n.pitch).collect();
    pitches.sort_unstable();

    if pitches.len() > 5 {
        let outer: Vec<Note> = match hand {
            Hand::Right => pitches[pitches.len() - 5..]
                .iter()
                .map(|&p| Note::new(p, 0))
                .collect(),
            Hand::Left => pitches[..5].iter().map(|&p| Note::new(p, 0)).collect(),
        };
        return assign_fingering(hand, &outer);
    }

    let n = pitches.len();
    let combos = finger_combinations(n);

    if n == 1 {
        return combos
            .iter()
            .map(|fingers| build_fingering(hand, &pitches, fingers))
            .collect();
    }

    let mut result = Vec::new();
    'combo: for fingers in &combos {
        // Pairwise span bound, oriented by laterality.
        for i in 0..n {
            for j in (i + 1)..n {
                let distance = key_distance(pitches[i], pitches[j]);
                let (inner, outer) = match hand {
                    Hand::Right => (fingers[i], fingers[j]),
                    Hand::Left => (fingers[j], fingers[i]),
                };
                match max_finger_span(inner, outer) {
                    Some(bound) if distance <= bound => {}
                    _ => continue 'combo,
                }
            }
        }

        let fingering = build_fingering(hand, &pitches, fingers);
        let entries = fingering.entries();
        for w in entries.windows(2) {
            if narrow_finger_check(w[0], w[1]) {
                continue 'combo;
            }
        }
        result.push(fingering);
    }

    if result.is_empty() {
        // Anatomically infeasible chord: degrade to the plain ascending
        // assignment rather than failing.
        let default: Vec<u8> = (1..=n as u8).collect();
        result.push(build_fingering(hand, &pitches, &default));
    }
    result
}

/// Candidate fingers for a single-note step from a one-note fingering.
///
/// Same pitch keeps the same finger. Otherwise candidates split into
/// non-crossing moves (reachable fingers on the motion side, narrow pairs
/// excluded) and crossing moves: thumb-under from fingers 2..4 when moving
/// outward (blocked from a white key onto an adjacent black key, where the
/// thumb has no room) and fingers 2..4 over the thumb when moving inward.
pub fn one_to_one_fingerings(hand: Hand, prev: &Fingering, next: Note) -> Vec<Fingering> {
    debug_assert_eq!(prev.len(), 1, "one_to_one_fingerings needs a single-note start");
    let Some(start) = prev.first() else {
        return Vec::new();
    };

    let distance = key_distance(start.pitch, next.pitch);
    let dir = direction(start.pitch, next.pitch);
    let mut result = Vec::new();

    let single = |finger: u8| {
        Fingering::new(vec![FingerAssignment {
            pitch: next.pitch,
            finger,
        }])
    };

    if dir == Direction::Level {
        result.push(single(start.finger));
        return result;
    }

    if is_outward(hand, dir) {
        for finger in 2..=5 {
            if let Some(bound) = max_finger_span(start.finger, finger) {
                if distance <= bound {
                    let candidate = FingerAssignment {
                        pitch: next.pitch,
                        finger,
                    };
                    if start.finger == 1 || !narrow_finger_check(start, candidate) {
                        result.push(single(finger));
                    }
                }
            }
        }
    } else if is_inward(hand, dir) && start.finger != 1 {
        for finger in 1..=5 {
            if let Some(bound) = max_finger_span(finger, start.finger) {
                if distance <= bound {
                    let candidate = FingerAssignment {
                        pitch: next.pitch,
                        finger,
                    };
                    if finger == 1 || !narrow_finger_check(start, candidate) {
                        result.push(single(finger));
                    }
                }
            }
        }
    }

    // Thumb-under: fingers 2..4 pivot the thumb past themselves.
    if (2..=4).contains(&start.finger)
        && is_outward(hand, dir)
        && !(is_white_key(start.pitch) && !is_white_key(next.pitch))
    {
        if let Some(bound) = max_finger_span(start.finger, 1) {
            if distance <= bound {
                result.push(single(1));
            }
        }
    }
    // Cross-over: fingers 2..4 reach back across the thumb.
    if start.finger == 1 && is_inward(hand, dir) {
        for finger in 2..=4 {
            if let Some(bound) = max_finger_span(finger, 1) {
                if distance <= bound {
                    result.push(single(finger));
                }
            }
        }
    }

    result
}

/// True when a single-note transition is a crossing move.
pub fn is_one_to_one_cross(hand: Hand, start: FingerAssignment, end: FingerAssignment) -> bool {
    let dir = if end.pitch > start.pitch {
        Direction::Up
    } else {
        Direction::Down
    };
    ((2..=4).contains(&start.finger) && end.finger == 1 && is_outward(hand, dir))
        || (start.finger == 1 && is_inward(hand, dir))
}

/// Cost proxy of a crossing move: key distance plus the pivot finger's
/// offset from the thumb.
pub fn cross_distance(start: FingerAssignment, end: FingerAssignment) -> f64 {
    let pivot = if start.finger == 1 {
        end.finger
    } else {
        start.finger
    };
    key_distance(start.pitch, end.pitch) + pivot as f64 - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingering::geometry::max_finger_span;

    fn fingers_of(fingerings: &[Fingering]) -> Vec<u8> {
        fingerings
            .iter()
            .map(|f| f.entries()[0].finger)
            .collect()
    }

    #[test]
    fn single_note_gets_all_five_fingers() {
        let notes = [Note::new(60, 480)];
        let result = assign_fingering(Hand::Right, &notes);
        assert_eq!(result.len(), 5);
    }

    #[test]
    fn chord_fingerings_respect_anatomy() {
        let notes = [Note::new(60, 480), Note::new(64, 480), Note::new(67, 480)];
        let result = assign_fingering(Hand::Right, &notes);
        assert!(!result.is_empty());
        for fingering in &result {
            let entries = fingering.entries();
            for i in 0..entries.len() {
                for j in (i + 1)..entries.len() {
                    let bound = max_finger_span(entries[i].finger, entries[j].finger)
                        .expect("admissible pair must have a real bound");
                    assert!(key_distance(entries[i].pitch, entries[j].pitch) <= bound);
                }
            }
            for w in entries.windows(2) {
                assert!(!narrow_finger_check(w[0], w[1]));
            }
        }
    }

    #[test]
    fn left_hand_assigns_descending_fingers() {
        let notes = [Note::new(48, 480), Note::new(52, 480), Note::new(55, 480)];
        for fingering in assign_fingering(Hand::Left, &notes) {
            let entries = fingering.entries();
            assert!(entries.windows(2).all(|w| w[0].finger > w[1].finger));
        }
    }

    #[test]
    fn infeasible_chord_falls_back_to_default() {
        // A tenth played with two adjacent keys squeezed in has no legal
        // combination; the ascending default must still come back.
        let notes = [
            Note::new(60, 480),
            Note::new(61, 480),
            Note::new(62, 480),
            Note::new(63, 480),
            Note::new(76, 480),
        ];
        let result = assign_fingering(Hand::Right, &notes);
        assert!(!result.is_empty());
    }

    #[test]
    fn wide_chords_truncate_to_outer_five() {
        let pitches = [60u8, 62, 64, 65, 67, 69, 71];
        let notes: Vec<Note> = pitches.iter().map(|&p| Note::new(p, 480)).collect();
        for fingering in assign_fingering(Hand::Right, &notes) {
            assert_eq!(fingering.len(), 5);
            // Right hand keeps the highest five.
            assert_eq!(fingering.first().unwrap().pitch, 64);
        }
    }

    #[test]
    fn same_pitch_keeps_same_finger() {
        let prev = Fingering::new(vec![FingerAssignment { pitch: 60, finger: 1 }]);
        let result = one_to_one_fingerings(Hand::Right, &prev, Note::new(60, 480));
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].entries()[0], FingerAssignment { pitch: 60, finger: 1 });
    }

    #[test]
    fn upward_step_from_thumb_offers_outer_fingers() {
        let prev = Fingering::new(vec![FingerAssignment { pitch: 60, finger: 1 }]);
        let result = one_to_one_fingerings(Hand::Right, &prev, Note::new(64, 480));
        let fingers = fingers_of(&result);
        assert!(fingers.contains(&2));
        assert!(!fingers.contains(&1));
    }

    #[test]
    fn thumb_under_is_offered_when_reachable() {
        // Finger 3 on E4 moving up to F4: thumb can pass under.
        let prev = Fingering::new(vec![FingerAssignment { pitch: 64, finger: 3 }]);
        let result = one_to_one_fingerings(Hand::Right, &prev, Note::new(65, 480));
        assert!(fingers_of(&result).contains(&1));
    }

    #[test]
    fn thumb_under_blocked_onto_adjacent_black_key() {
        // Finger 3 on E4 moving up to F#4: white-to-black thumb pass is barred.
        let prev = Fingering::new(vec![FingerAssignment { pitch: 64, finger: 3 }]);
        let result = one_to_one_fingerings(Hand::Right, &prev, Note::new(66, 480));
        assert!(!fingers_of(&result).contains(&1));
    }

    #[test]
    fn cross_classification_and_distance() {
        let start = FingerAssignment { pitch: 64, finger: 3 };
        let end = FingerAssignment { pitch: 65, finger: 1 };
        assert!(is_one_to_one_cross(Hand::Right, start, end));
        assert_eq!(cross_distance(start, end), 1.0 + 2.0);

        let no_cross = FingerAssignment { pitch: 65, finger: 4 };
        assert!(!is_one_to_one_cross(Hand::Right, start, no_cross));
    }
}
