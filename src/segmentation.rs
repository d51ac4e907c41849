//! Piece-level orchestration: segmentation, replica training, table
//! merging and policy stitching.
//!
//! Long pieces are cut into bounded segments so each solver works on a
//! tractable state space. Every segment is trained by several
//! independently seeded replicas in parallel; their value tables are
//! merged by per-key mean and a single greedy policy is extracted from
//! the merged table. Segment policies are stitched back in order, with
//! boundary anchoring (see
//! [`FingeringMdp`](crate::fingering::FingeringMdp)) keeping the seams
//! consistent.

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dynaq::{greedy_policy, ConfigError, DynaQConfig, DynaQSolver, ValueTable};
use crate::fingering::{
    validate_sequence, Fingering, FingeringMdp, Hand, InputError, NoteGroup, SegmentPart,
    DEFAULT_LONG_NOTE_TICKS,
};

/// Upper bound on note groups per segment.
const DEFAULT_SEGMENT_CAP: usize = 50;

/// Seed stride between replicas of one segment.
const REPLICA_SEED_STRIDE: u64 = 1_000;

/// Options for [`solve_hand`] and [`solve_piece`].
#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// Learning configuration applied to every replica. Replica `r`
    /// trains with seed `config.seed + 1000 * r`.
    pub config: DynaQConfig,
    /// Maximum note groups per segment.
    pub segment_cap: usize,
    /// Independently seeded solvers per segment.
    pub replicas: usize,
    /// Hold length in ticks beyond which the hand repositions freely.
    pub long_note_ticks: u64,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            config: DynaQConfig::default(),
            segment_cap: DEFAULT_SEGMENT_CAP,
            replicas: 4,
            long_note_ticks: DEFAULT_LONG_NOTE_TICKS,
        }
    }
}

impl SolveOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the learning configuration.
    pub fn with_config(mut self, config: DynaQConfig) -> Self {
        self.config = config;
        self
    }

    /// Builder method: set the segment cap.
    pub fn with_segment_cap(mut self, cap: usize) -> Self {
        self.segment_cap = cap.max(1);
        self
    }

    /// Builder method: set the replica count.
    pub fn with_replicas(mut self, replicas: usize) -> Self {
        self.replicas = replicas.max(1);
        self
    }

    /// Builder method: set the long-note threshold in ticks.
    pub fn with_long_note_ticks(mut self, ticks: u64) -> Self {
        self.long_note_ticks = ticks;
        self
    }
}

/// Errors from piece-level solving.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveError {
    /// The input sequence is malformed.
    Input(InputError),
    /// The learning configuration is invalid.
    Config(ConfigError),
}

impl std::fmt::Display for SolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveError::Input(e) => write!(f, "invalid input: {}", e),
            SolveError::Config(e) => write!(f, "invalid configuration: {}", e),
        }
    }
}

impl std::error::Error for SolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SolveError::Input(e) => Some(e),
            SolveError::Config(e) => Some(e),
        }
    }
}

impl From<InputError> for SolveError {
    fn from(e: InputError) -> Self {
        SolveError::Input(e)
    }
}

impl From<ConfigError> for SolveError {
    fn from(e: ConfigError) -> Self {
        SolveError::Config(e)
    }
}

/// Complete fingering for both hands of a piece.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceFingering {
    /// One fingering per right-hand group, in order. Empty if the piece
    /// has no right-hand part.
    pub right: Vec<Fingering>,
    /// One fingering per left-hand group, in order.
    pub left: Vec<Fingering>,
}

/// Cut `len` groups into ranges of at most `cap`.
fn split_ranges(len: usize, cap: usize) -> Vec<Range<usize>> {
    let cap = cap.max(1);
    (0..len).step_by(cap).map(|s| s..(s + cap).min(len)).collect()
}

/// Role of segment `index` among `total` segments.
fn part_for(index: usize, total: usize) -> SegmentPart {
    if total == 1 {
        SegmentPart::Whole
    } else if index == 0 {
        SegmentPart::First
    } else if index + 1 == total {
        SegmentPart::Last
    } else {
        SegmentPart::Middle
    }
}

/// Shared progress accounting across hands and segments.
///
/// Each replica evaluation checkpoint bumps the counter; the reported
/// percentage is derived from the expected checkpoint total and clamped
/// to 99 until the caller forces completion. The compare and the
/// callback invocation happen under one lock, so the consumer observes
/// a strictly increasing sequence even when replicas race.
struct ProgressMeter<'a> {
    counter: AtomicUsize,
    reported: Mutex<usize>,
    expected: usize,
    callback: &'a (dyn Fn(u8) + Sync),
}

impl<'a> ProgressMeter<'a> {
    fn new(expected: usize, callback: &'a (dyn Fn(u8) + Sync)) -> Self {
        Self {
            counter: AtomicUsize::new(0),
            reported: Mutex::new(0),
            expected: expected.max(1),
            callback,
        }
    }

    fn checkpoint(&self) {
        let count = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let pct = (count * 100 / self.expected).min(99);
        let mut reported = self.reported.lock().unwrap_or_else(|p| p.into_inner());
        if pct > *reported {
            *reported = pct;
            (self.callback)(pct as u8);
        }
    }

    fn finish(&self) {
        let mut reported = self.reported.lock().unwrap_or_else(|p| p.into_inner());
        if *reported < 100 {
            *reported = 100;
            (self.callback)(100);
        }
    }
}

/// Expected evaluation checkpoints for a group count under `options`,
/// assuming no early convergence.
fn expected_checkpoints(len: usize, options: &SolveOptions) -> usize {
    let segments = split_ranges(len, options.segment_cap).len();
    let per_replica = (options.config.episodes / options.config.eval_interval) as usize;
    segments * options.replicas * per_replica
}

/// Solve one hand's sequence, reporting progress in [0, 100].
pub fn solve_hand(
    hand: Hand,
    groups: &[NoteGroup],
    options: &SolveOptions,
    progress: &(dyn Fn(u8) + Sync),
) -> Result<Vec<Fingering>, SolveError> {
    options.config.validate()?;
    validate_sequence(groups)?;

    let meter = ProgressMeter::new(expected_checkpoints(groups.len(), options), progress);
    let policy = solve_hand_inner(hand, groups, options, &meter)?;
    meter.finish();
    Ok(policy)
}

fn solve_hand_inner(
    hand: Hand,
    groups: &[NoteGroup],
    options: &SolveOptions,
    meter: &ProgressMeter<'_>,
) -> Result<Vec<Fingering>, SolveError> {
    let ranges = split_ranges(groups.len(), options.segment_cap);
    let total = ranges.len();
    let mut policy = Vec::with_capacity(groups.len());

    for (index, range) in ranges.into_iter().enumerate() {
        let part = part_for(index, total);
        let segment = groups[range].to_vec();

        let tables: Vec<ValueTable<_, _>> = (0..options.replicas)
            .into_par_iter()
            .map(|replica| -> Result<_, SolveError> {
                let config = options
                    .config
                    .clone()
                    .with_seed(options.config.seed + REPLICA_SEED_STRIDE * replica as u64);
                let mdp = FingeringMdp::new(hand, segment.clone(), part)?
                    .with_long_note_ticks(options.long_note_ticks);
                let mut solver = DynaQSolver::new(mdp, config);
                solver.solve_with_callback(|_| meter.checkpoint());
                Ok(solver.into_values())
            })
            .collect::<Result<_, _>>()?;

        let merged = ValueTable::merged(&tables);
        let mdp = FingeringMdp::new(hand, segment, part)?
            .with_long_note_ticks(options.long_note_ticks);
        policy.extend(greedy_policy(&mdp, &merged));
    }

    Ok(policy)
}

/// Solve both hands of a piece with one shared progress scale.
///
/// A hand with no groups is skipped rather than rejected; progress
/// always reaches 100 on success.
pub fn solve_piece(
    right: &[NoteGroup],
    left: &[NoteGroup],
    options: &SolveOptions,
    progress: &(dyn Fn(u8) + Sync),
) -> Result<PieceFingering, SolveError> {
    options.config.validate()?;
    if !right.is_empty() {
        validate_sequence(right)?;
    }
    if !left.is_empty() {
        validate_sequence(left)?;
    }

    let expected =
        expected_checkpoints(right.len(), options) + expected_checkpoints(left.len(), options);
    let meter = ProgressMeter::new(expected, progress);

    let right_policy = if right.is_empty() {
        Vec::new()
    } else {
        solve_hand_inner(Hand::Right, right, options, &meter)?
    };
    let left_policy = if left.is_empty() {
        Vec::new()
    } else {
        solve_hand_inner(Hand::Left, left, options, &meter)?
    };

    meter.finish();
    Ok(PieceFingering {
        right: right_policy,
        left: left_policy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn quick_options() -> SolveOptions {
        SolveOptions::new()
            .with_replicas(1)
            .with_config(
                DynaQConfig::default()
                    .with_episodes(60)
                    .with_eval_interval(30),
            )
    }

    fn melody(pitches: &[u8]) -> Vec<NoteGroup> {
        pitches.iter().map(|&p| NoteGroup::single(p, 480)).collect()
    }

    #[test]
    fn split_respects_the_cap() {
        let ranges = split_ranges(120, 50);
        assert_eq!(ranges, vec![0..50, 50..100, 100..120]);
        assert_eq!(split_ranges(50, 50), vec![0..50]);
    }

    #[test]
    fn parts_cover_first_middle_last_and_whole() {
        assert_eq!(part_for(0, 1), SegmentPart::Whole);
        assert_eq!(part_for(0, 3), SegmentPart::First);
        assert_eq!(part_for(1, 3), SegmentPart::Middle);
        assert_eq!(part_for(2, 3), SegmentPart::Last);
    }

    #[test]
    fn solve_hand_fingers_every_group() {
        let groups = vec![
            NoteGroup::single(60, 480),
            NoteGroup::chord(&[64, 67], 480),
            NoteGroup::single(60, 480),
        ];
        let policy = solve_hand(Hand::Right, &groups, &quick_options(), &|_| {})
            .expect("solvable sequence");
        // Each fingering covers exactly the pitches of its group.
        let pitches: Vec<Vec<u8>> = policy
            .iter()
            .map(|f| f.entries().iter().map(|e| e.pitch).collect())
            .collect();
        assert_eq!(pitches, vec![vec![60], vec![64, 67], vec![60]]);
        for fingering in &policy {
            assert!(fingering
                .entries()
                .iter()
                .all(|e| (1..=5).contains(&e.finger)));
        }
    }

    #[test]
    fn solving_is_deterministic() {
        let groups = melody(&[60, 62, 64, 65, 67]);
        let options = quick_options();
        let a = solve_hand(Hand::Right, &groups, &options, &|_| {}).expect("solvable");
        let b = solve_hand(Hand::Right, &groups, &options, &|_| {}).expect("solvable");
        assert_eq!(a, b);
    }

    #[test]
    fn long_sequences_are_stitched_across_segments() {
        let pitches: Vec<u8> = (0..120).map(|i| 60 + (i % 12) as u8).collect();
        let groups = melody(&pitches);
        let options = quick_options();
        let policy = solve_hand(Hand::Right, &groups, &options, &|_| {}).expect("solvable");
        assert_eq!(policy.len(), 120);
        assert!(policy.iter().all(|f| f.len() == 1));
    }

    #[test]
    fn progress_is_monotone_and_ends_at_one_hundred() {
        let groups = melody(&[60, 62, 64, 65]);
        let seen = Mutex::new(Vec::new());
        solve_hand(Hand::Right, &groups, &quick_options(), &|pct| {
            seen.lock().unwrap().push(pct);
        })
        .expect("solvable");
        let seen = seen.into_inner().unwrap();
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(seen.last().copied(), Some(100));
    }

    #[test]
    fn racing_replicas_report_nondecreasing_progress() {
        // Several replicas hit checkpoints concurrently; the consumer
        // must still see the percentages in increasing order.
        let groups = melody(&[60, 62, 64, 65, 67, 69]);
        let options = quick_options().with_replicas(4);
        let seen = Mutex::new(Vec::new());
        solve_hand(Hand::Right, &groups, &options, &|pct| {
            seen.lock().unwrap().push(pct);
        })
        .expect("solvable");
        let seen = seen.into_inner().unwrap();
        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(seen.last().copied(), Some(100));
    }

    #[test]
    fn empty_hand_is_skipped_not_rejected() {
        let right = melody(&[60, 64, 67]);
        let piece =
            solve_piece(&right, &[], &quick_options(), &|_| {}).expect("solvable piece");
        assert_eq!(piece.right.len(), 3);
        assert!(piece.left.is_empty());
    }

    #[test]
    fn both_hands_are_fingered() {
        let right = melody(&[60, 62, 64]);
        let left = melody(&[48, 47, 45]);
        let piece =
            solve_piece(&right, &left, &quick_options(), &|_| {}).expect("solvable piece");
        assert_eq!(piece.right.len(), 3);
        assert_eq!(piece.left.len(), 3);
    }

    #[test]
    fn empty_sequence_is_an_input_error() {
        let err = solve_hand(Hand::Right, &[], &quick_options(), &|_| {})
            .expect_err("empty input");
        assert_eq!(err, SolveError::Input(InputError::EmptySequence));
    }

    #[test]
    fn short_sequences_converge_within_the_default_budget() {
        let groups = melody(&[60, 62, 64, 65, 67]);
        let mdp = FingeringMdp::new(Hand::Right, groups, SegmentPart::Whole)
            .expect("valid sequence");
        let mut solver = DynaQSolver::new(mdp, DynaQConfig::default());
        solver.solve();
        assert!(solver.stats().converged);
    }
}
