//! Ergonomic scoring of fingering transitions.
//!
//! The reward of a (state, action) pair is evaluated rule by rule in
//! priority order: free repositioning, identical repeat, single-note
//! steps, then the general chord-to-chord case. A small finger-strength
//! bonus is layered on top as a tie-break. The constants here are
//! calibrated against reference policies; intermediate rates round to
//! 2 decimals on purpose.

use super::candidates::{cross_distance, is_one_to_one_cross, one_to_one_fingerings};
use super::geometry::{
    all_stretch_rate, chord_range, hand_move_distance, key_distance, stretch_rate,
};
use super::types::{Fingering, Hand, Note};

/// Relative strength of fingers 1..=5. Index and middle carry load best,
/// the thumb worst as a melodic finger.
const SINGLE_FINGER_STRENGTH: [f64; 5] = [2.0, 4.0, 5.0, 3.0, 1.0];

/// Score the transition from a previous fingering to a candidate action.
///
/// `index` is the position of the action's note group; `prev_duration` is
/// the previous group's duration in ticks (0 at the start of a segment).
pub fn reward(
    hand: Hand,
    index: usize,
    prev: &Fingering,
    prev_duration: u64,
    long_note_ticks: u64,
    action: &Fingering,
) -> f64 {
    let num_prev = prev.len();
    let num_next = action.len();

    let strength: f64 = action
        .entries()
        .iter()
        .map(|e| SINGLE_FINGER_STRENGTH[e.finger as usize - 1])
        .sum();

    let base;

    if index == 0 || prev_duration >= long_note_ticks {
        // Hand is free to reposition.
        base = if num_next == 1 {
            50.0
        } else {
            50.0 * (1.0 - all_stretch_rate(hand, action))
        };
    } else if prev == action {
        base = 50.0;
    } else if num_prev == 1 && num_next == 1 {
        let start = prev.entries()[0];
        let end = action.entries()[0];
        let candidates = one_to_one_fingerings(hand, prev, Note::new(end.pitch, 0));

        if candidates.contains(action) {
            if is_one_to_one_cross(hand, start, end) {
                base = 20.0 + 2.5 * (4.0 - cross_distance(start, end));
            } else {
                let rate = stretch_rate(hand, start, end);
                let adjacent_step = key_distance(start.pitch, end.pitch).ceil() == 1.0
                    && (start.finger as i8 - end.finger as i8).abs() == 1;
                if rate == 0.0 || adjacent_step {
                    // A perfectly natural move, no tie-break needed.
                    return 50.0;
                } else if rate > 0.0 {
                    base = 40.0 + 10.0 * (1.0 - rate * rate);
                } else {
                    base = 0.0;
                }
            }
        } else {
            // Implausible jump: priced by travel, never hard-rejected.
            base = 20.0 - hand_move_distance(hand, prev, action) / 2.0;
        }
    } else {
        let prev_pitches: Vec<u8> = prev.entries().iter().map(|e| e.pitch).collect();
        let next_pitches: Vec<u8> = action.entries().iter().map(|e| e.pitch).collect();
        let range_prev = chord_range(&prev_pitches);
        let range_next = chord_range(&next_pitches);
        let both_wide = range_prev >= 6.0 && range_next >= 6.0;

        let reversals = reverse_order_count(hand, prev, action);
        let (same_finger, same_pitch) = if reversals == 0 {
            (
                same_finger_different_pitch(prev, action),
                same_pitch_different_finger(prev, action),
            )
        } else {
            (0, 0)
        };

        let mut discount = if both_wide {
            1.0
        } else {
            1.0 - (same_finger + same_pitch + reversals) as f64 / (num_prev + num_next) as f64
        };

        if num_next > 1 {
            let travel = hand_move_distance(hand, prev, action);
            let rate = all_stretch_rate(hand, action);

            if both_wide {
                base = 49.0 * (1.0 - rate) + 1.0;
            } else if travel > 5.0 {
                base = (20.0 * (1.0 - rate) + (45.0 - travel) / 4.5) * discount;
            } else {
                base = (25.0 * (6.0 * (1.0 - rate.powf(2.2)) + 4.0 * (5.0 - travel)) / 13.0)
                    * discount;
            }
        } else {
            let travel = hand_move_distance(hand, prev, action);
            let mut combined: Vec<u8> = prev_pitches;
            combined.extend_from_slice(&next_pitches);
            if chord_range(&combined) >= 7.0 {
                discount = 1.0;
            }
            base = (50.0 - 1.2 * travel) * discount;
            if travel >= 20.0 {
                // Very long release travel: keep an enlarged floor so the
                // value does not collapse below every alternative.
                return base + 0.01 * strength * 500.0;
            }
        }
    }

    base + 0.01 * strength
}

/// Count of fingers reused on a different pitch between two fingerings.
fn same_finger_different_pitch(prev: &Fingering, next: &Fingering) -> usize {
    prev.entries()
        .iter()
        .filter(|p| {
            next.entries()
                .iter()
                .any(|n| n.finger == p.finger && n.pitch != p.pitch)
        })
        .count()
}

/// Count of pitches held over with a different finger.
fn same_pitch_different_finger(prev: &Fingering, next: &Fingering) -> usize {
    prev.entries()
        .iter()
        .filter(|p| {
            next.entries()
                .iter()
                .any(|n| n.pitch == p.pitch && n.finger != p.finger)
        })
        .count()
}

/// Pitch/finger order inversions in the pitch-merged pair of fingerings,
/// oriented by laterality.
fn reverse_order_count(hand: Hand, prev: &Fingering, next: &Fingering) -> usize {
    let mut merged: Vec<_> = prev
        .entries()
        .iter()
        .chain(next.entries().iter())
        .copied()
        .collect();
    merged.sort_by_key(|e| e.pitch);

    merged
        .windows(2)
        .filter(|w| match hand {
            Hand::Right => w[0].finger > w[1].finger,
            Hand::Left => w[1].finger > w[0].finger,
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingering::types::FingerAssignment;

    const LONG: u64 = 15120;

    fn single(pitch: u8, finger: u8) -> Fingering {
        Fingering::new(vec![FingerAssignment { pitch, finger }])
    }

    fn chord(entries: &[(u8, u8)]) -> Fingering {
        Fingering::new(
            entries
                .iter()
                .map(|&(pitch, finger)| FingerAssignment { pitch, finger })
                .collect(),
        )
    }

    #[test]
    fn first_group_single_note_scores_fifty_plus_bonus() {
        let action = single(60, 1);
        let r = reward(Hand::Right, 0, &Fingering::empty(), 0, LONG, &action);
        assert_eq!(r, 50.0 + 0.01 * 2.0);
    }

    #[test]
    fn long_previous_note_frees_the_hand() {
        let prev = single(60, 1);
        let action = single(84, 1);
        // Short hold: scored as an implausible jump.
        let short = reward(Hand::Right, 1, &prev, 480, LONG, &action);
        assert!(short < 25.0);
        // Long hold: free repositioning.
        let long = reward(Hand::Right, 1, &prev, LONG, LONG, &action);
        assert_eq!(long, 50.0 + 0.01 * 2.0);
    }

    #[test]
    fn repeating_the_same_fingering_scores_fifty() {
        let prev = chord(&[(60, 1), (64, 3)]);
        let r = reward(Hand::Right, 2, &prev, 480, LONG, &prev.clone());
        assert_eq!(r, 50.0 + 0.01 * (2.0 + 5.0));
    }

    #[test]
    fn natural_step_returns_exactly_fifty() {
        // 1 on C4 to 2 on D4: unit step, adjacent fingers, no bonus added.
        let prev = single(60, 1);
        let action = single(62, 2);
        assert_eq!(reward(Hand::Right, 1, &prev, 480, LONG, &action), 50.0);
    }

    #[test]
    fn crossing_move_scores_by_cross_distance() {
        // 3 on E4 up to thumb on F4: cross distance 3.
        let prev = single(64, 3);
        let action = single(65, 1);
        let r = reward(Hand::Right, 1, &prev, 480, LONG, &action);
        assert_eq!(r, 20.0 + 2.5 * (4.0 - 3.0) + 0.01 * 2.0);
    }

    #[test]
    fn implausible_jump_is_priced_not_rejected() {
        let prev = single(60, 1);
        let action = single(96, 1);
        let r = reward(Hand::Right, 1, &prev, 480, LONG, &action);
        assert!(r < 20.0);
        assert!(r.is_finite());
    }

    #[test]
    fn stretched_step_scores_below_natural() {
        // 1 on C4 to 2 on G4: stretched but reachable.
        let prev = single(60, 1);
        let stretched = reward(Hand::Right, 1, &prev, 480, LONG, &single(67, 2));
        let natural = reward(Hand::Right, 1, &prev, 480, LONG, &single(62, 2));
        assert!(stretched < natural);
    }

    #[test]
    fn chord_to_note_discount_respects_anomalies() {
        let prev = chord(&[(60, 1), (64, 3)]);
        // Releasing to the pitch held by finger 3, now with finger 1.
        let conflicted = reward(Hand::Right, 1, &prev, 480, LONG, &single(64, 1));
        let clean = reward(Hand::Right, 1, &prev, 480, LONG, &single(62, 2));
        assert!(conflicted < clean);
    }

    #[test]
    fn wide_chords_skip_the_anomaly_discount() {
        let prev = chord(&[(60, 1), (72, 5)]);
        let next = chord(&[(62, 1), (74, 5)]);
        let r = reward(Hand::Right, 1, &prev, 480, LONG, &next);
        // Both ranges >= 6: reward comes from stretch alone, bonus on top.
        let rate = all_stretch_rate(Hand::Right, &next);
        assert_eq!(r, 49.0 * (1.0 - rate) + 1.0 + 0.01 * (2.0 + 1.0));
    }

    #[test]
    fn reverse_order_counts_inversions() {
        // Finger 4 below finger 2 in the pitch merge is one inversion (RH).
        let prev = single(64, 4);
        let next = single(67, 2);
        assert_eq!(reverse_order_count(Hand::Right, &prev, &next), 1);
        assert_eq!(reverse_order_count(Hand::Left, &prev, &next), 0);
    }
}
