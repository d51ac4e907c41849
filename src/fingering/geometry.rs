//! Keyboard-distance arithmetic.
//!
//! All distances are measured in white-key widths: white keys are
//! unit-spaced and a black key sits at the half-integer midpoint of its
//! white neighbors. This is the leaf module every other fingering rule
//! builds on.

use super::types::{FingerAssignment, Fingering, Hand, PITCH_MIN};

/// Maximum comfortable span between two fingers, indexed by
/// `[inner - 1][outer - 1]` where "inner" is the finger closer to the
/// thumb side of the motion. Entries of `-1` are sentinels for pairs with
/// no defined span (same finger, or an ordering the hand cannot form
/// without crossing); they must never be used as a real bound.
const MAX_FINGER_DISTANCE: [[f64; 5]; 5] = [
    [-1.0, 4.0, 5.0, 6.0, 7.0],
    [3.0, -1.0, 3.0, 4.0, 6.0],
    [2.0, -1.0, -1.0, 3.0, 4.0],
    [1.5, -1.0, -1.0, -1.0, 3.0],
    [-1.0, -1.0, -1.0, -1.0, -1.0],
];

/// Round to 2 decimals. The reward model is calibrated against reference
/// policies that round every intermediate rate this way.
pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// True for the white keys of the keyboard.
pub fn is_white_key(pitch: u8) -> bool {
    matches!(pitch % 12, 0 | 2 | 4 | 5 | 7 | 9 | 11)
}

/// Linear keyboard coordinate of a pitch: the index of its white key, or
/// the half-integer midpoint for a black key.
pub fn relative_position(pitch: u8) -> f64 {
    if is_white_key(pitch) {
        white_index(pitch) as f64
    } else {
        // A black key sits half a unit below its upper white neighbor.
        white_index(pitch + 1) as f64 - 0.5
    }
}

/// White keys strictly below each pitch class within one octave.
const WHITES_BELOW_PC: [usize; 12] = [0, 1, 1, 2, 2, 3, 4, 4, 5, 5, 6, 6];

/// Number of white keys strictly below `pitch`, counted from A0.
///
/// Seven white keys per octave plus the within-octave offset; A0 itself
/// sits five whites above C0, which the subtraction cancels. This is on
/// the reward hot path, so no scanning.
fn white_index(pitch: u8) -> usize {
    debug_assert!(pitch >= PITCH_MIN);
    let semis = pitch.saturating_sub(12) as usize;
    ((semis / 12) * 7 + WHITES_BELOW_PC[semis % 12]).saturating_sub(5)
}

/// Unsigned keyboard distance between two pitches.
pub fn key_distance(a: u8, b: u8) -> f64 {
    (relative_position(a) - relative_position(b)).abs()
}

/// One-based keyboard position relative to A0.
pub fn note_position(pitch: u8) -> f64 {
    key_distance(PITCH_MIN, pitch) + 1.0
}

/// Anatomical span bound for an ordered finger pair, or `None` for
/// sentinel entries.
pub fn max_finger_span(inner: u8, outer: u8) -> Option<f64> {
    debug_assert!((1..=5).contains(&inner) && (1..=5).contains(&outer));
    let bound = MAX_FINGER_DISTANCE[inner as usize - 1][outer as usize - 1];
    if bound < 0.0 {
        None
    } else {
        Some(bound)
    }
}

/// True when two assignments squeeze more finger numbers than keys: the
/// rounded-up key distance is smaller than the finger-number difference.
pub fn narrow_finger_check(a: FingerAssignment, b: FingerAssignment) -> bool {
    key_distance(a.pitch, b.pitch).ceil() < (a.finger as i8 - b.finger as i8).abs() as f64
}

/// Keyboard span of a pitch set: extreme-pitch distance plus one key.
pub fn chord_range(pitches: &[u8]) -> f64 {
    let (Some(&min), Some(&max)) = (pitches.iter().min(), pitches.iter().max()) else {
        return 0.0;
    };
    key_distance(min, max) + 1.0
}

/// Distance traveled by the hand's positional center between two
/// consecutive fingerings.
///
/// Each extreme assignment is corrected by a per-finger lateral offset of
/// `3 - finger`, signed by hand laterality, so that the center tracks the
/// palm rather than whichever finger happens to play.
pub fn hand_move_distance(hand: Hand, from: &Fingering, to: &Fingering) -> f64 {
    if from.is_empty() || to.is_empty() {
        return 0.0;
    }
    (hand_position(hand, from) - hand_position(hand, to)).abs()
}

fn hand_position(hand: Hand, fingering: &Fingering) -> f64 {
    // from/to are non-empty when this is called
    let first = fingering.entries()[0];
    let last = fingering.entries()[fingering.len() - 1];
    (finger_position(hand, first) + finger_position(hand, last)) / 2.0
}

fn finger_position(hand: Hand, e: FingerAssignment) -> f64 {
    note_position(e.pitch) + hand.lateral() * (3.0 - e.finger as f64)
}

/// Signed deviation of an actual finger span from its natural span.
///
/// Positive rates are stretches scaled by the remaining headroom to the
/// anatomical maximum; negative rates are contractions scaled by the
/// natural span itself. Zero when note and finger coincide. Rounded to
/// 2 decimals.
pub fn stretch_rate(hand: Hand, a: FingerAssignment, b: FingerAssignment) -> f64 {
    // Order the pair so the lower finger-slot comes first for the given hand.
    let (p1, p2) = if (a.pitch > b.pitch && hand == Hand::Right)
        || (a.pitch < b.pitch && hand == Hand::Left)
    {
        (b, a)
    } else {
        (a, b)
    };

    let nature = (p1.finger as i8 - p2.finger as i8).abs() as f64;
    let distance = key_distance(p1.pitch, p2.pitch);

    if distance == nature {
        return 0.0;
    }
    if distance > nature {
        match max_finger_span(p1.finger, p2.finger) {
            Some(max) if max > nature => round2((distance - nature) / (max - nature)),
            // Sentinel pair asked to stretch: saturate instead of dividing.
            _ => 1.0,
        }
    } else {
        // distance < nature implies nature > 0
        round2(-(nature - distance) / nature)
    }
}

/// Mean of `|stretch_rate|^1.5` over all unordered finger pairs of a
/// fingering, rounded to 2 decimals.
///
/// The 1.5 exponent makes one severe stretch cost more than several mild
/// ones.
pub fn all_stretch_rate(hand: Hand, fingering: &Fingering) -> f64 {
    let entries = fingering.entries();
    if entries.len() < 2 {
        return 0.0;
    }
    let mut sum = 0.0;
    let mut pairs = 0u32;
    for i in 0..entries.len() {
        for j in (i + 1)..entries.len() {
            sum += stretch_rate(hand, entries[i], entries[j]).abs().powf(1.5);
            pairs += 1;
        }
    }
    round2(sum / pairs as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingering::types::FingerAssignment;

    fn fa(pitch: u8, finger: u8) -> FingerAssignment {
        FingerAssignment { pitch, finger }
    }

    #[test]
    fn white_keys_are_unit_spaced() {
        // A0 is the origin; B0 and C1 are its next white neighbors.
        assert_eq!(relative_position(21), 0.0);
        assert_eq!(relative_position(23), 1.0);
        assert_eq!(relative_position(24), 2.0);
    }

    #[test]
    fn black_keys_sit_at_half_positions() {
        // A#0 lies between A0 (0) and B0 (1).
        assert_eq!(relative_position(22), 0.5);
        // C#4 lies between C4 and D4.
        assert_eq!(
            relative_position(61),
            (relative_position(60) + relative_position(62)) / 2.0
        );
    }

    #[test]
    fn positions_match_the_counting_definition() {
        use crate::fingering::types::PITCH_MAX;
        for pitch in PITCH_MIN..=PITCH_MAX {
            let counted = (PITCH_MIN..pitch).filter(|&p| is_white_key(p)).count() as f64;
            let expected = if is_white_key(pitch) {
                counted
            } else {
                counted - 0.5
            };
            assert_eq!(relative_position(pitch), expected, "pitch {}", pitch);
        }
    }

    #[test]
    fn key_distance_is_symmetric() {
        assert_eq!(key_distance(60, 72), key_distance(72, 60));
        assert_eq!(key_distance(60, 72), 7.0);
    }

    #[test]
    fn sentinel_entries_are_guarded() {
        assert_eq!(max_finger_span(1, 1), None);
        assert_eq!(max_finger_span(5, 2), None);
        assert_eq!(max_finger_span(1, 5), Some(7.0));
    }

    #[test]
    fn narrow_check_flags_impossible_doubling() {
        // C4 and C#4 are half a key apart but fingers 1 and 4 are 3 slots apart.
        assert!(narrow_finger_check(fa(60, 1), fa(61, 4)));
        assert!(!narrow_finger_check(fa(60, 1), fa(65, 4)));
    }

    #[test]
    fn chord_range_counts_both_extremes() {
        assert_eq!(chord_range(&[60, 64, 67]), 5.0);
        assert_eq!(chord_range(&[60]), 1.0);
        assert_eq!(chord_range(&[]), 0.0);
    }

    #[test]
    fn stretch_rate_zero_on_identical_pair() {
        assert_eq!(stretch_rate(Hand::Right, fa(60, 1), fa(60, 1)), 0.0);
    }

    #[test]
    fn stretch_rate_sign_matches_deviation() {
        // C4-G4 with 1-5: distance 4 equals the natural span 4.
        assert_eq!(stretch_rate(Hand::Right, fa(60, 1), fa(67, 5)), 0.0);
        // C4-C5 with 1-5: distance 7 > natural 4, max span 7 -> full stretch.
        assert_eq!(stretch_rate(Hand::Right, fa(60, 1), fa(72, 5)), 1.0);
        // C4-D4 with 1-5: distance 1 < natural 4 -> contraction.
        assert!(stretch_rate(Hand::Right, fa(60, 1), fa(62, 5)) < 0.0);
    }

    #[test]
    fn all_stretch_rate_ignores_entry_listing_order() {
        let a = Fingering::new(vec![fa(60, 1), fa(64, 2), fa(72, 5)]);
        let b = Fingering::new(vec![fa(72, 5), fa(60, 1), fa(64, 2)]);
        assert_eq!(
            all_stretch_rate(Hand::Right, &a),
            all_stretch_rate(Hand::Right, &b)
        );
    }

    #[test]
    fn hand_move_distance_zero_for_same_fingering() {
        let f = Fingering::new(vec![fa(60, 1), fa(67, 5)]);
        assert_eq!(hand_move_distance(Hand::Right, &f, &f), 0.0);
    }

    #[test]
    fn hand_move_distance_uses_lateral_offset() {
        // Same key, thumb vs little finger: the palm sits in different places.
        let thumb = Fingering::new(vec![fa(60, 1)]);
        let little = Fingering::new(vec![fa(60, 5)]);
        assert_eq!(hand_move_distance(Hand::Right, &thumb, &little), 4.0);
    }
}
