//! # Fingering Solver
//!
//! A piano fingering engine: models fingering choice as a Markov
//! Decision Process over note groups and solves it with tabular Dyna-Q
//! reinforcement learning with prioritized sweeping.
//!
//! ## Features
//!
//! - **Generic Dyna-Q Engine**: Works with any process implementing the `Mdp` trait
//! - **Anatomical Candidates**: Legal fingerings from finger-span and crossing rules
//! - **Ergonomic Rewards**: Stretch, travel and voicing scored per transition
//! - **Segmented Solving**: Long pieces split, trained by parallel replicas, stitched
//! - **Deterministic**: Same input, seed and configuration give the same fingering
//!
//! ## Quick Start
//!
//! ```ignore
//! use fingering_solver::fingering::{Hand, NoteGroup};
//! use fingering_solver::segmentation::{solve_hand, SolveOptions};
//!
//! // 1. Describe the hand's notes, grouped by simultaneous onset
//! let groups = vec![
//!     NoteGroup::single(60, 480),
//!     NoteGroup::chord(&[64, 67], 480),
//! ];
//!
//! // 2. Solve
//! let policy = solve_hand(Hand::Right, &groups, &SolveOptions::default(), &|_| {})?;
//!
//! // 3. One fingering per group, one finger per note
//! assert_eq!(policy.len(), groups.len());
//! ```
//!
//! ## Modules
//!
//! - [`dynaq`]: Generic Dyna-Q solver with prioritized sweeping
//! - [`fingering`]: Keyboard geometry, candidate generation and rewards
//! - [`segmentation`]: Piece-level segmentation, replicas and stitching
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Dyna-Q Solver (Generic)                      │
//! │  - ε-greedy episodes      - Prioritized sweeping                │
//! │  - Deterministic model    - Convergence checkpoints             │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               │ implements Mdp trait
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Fingering Process                         │
//! │  - Candidate fingerings   - Ergonomic rewards                   │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               │ orchestrated by
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │   Segmentation: split → replicas (rayon) → merge → stitch       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

/// Dyna-Q reinforcement learning module.
///
/// This is the core module containing the generic learning algorithm.
pub mod dynaq;

/// Piano fingering domain module.
///
/// Keyboard geometry, legal-fingering generation, rewards and the MDP.
pub mod fingering;

/// Piece-level solving module.
///
/// Segmentation, parallel replicas, table merging and policy stitching.
pub mod segmentation;

// Re-export commonly used types at crate root for convenience
pub use dynaq::{DynaQConfig, DynaQSolver, Mdp, SolverStats, ValueTable};
pub use fingering::{Fingering, FingeringMdp, Hand, Note, NoteGroup, SegmentPart};
pub use segmentation::{solve_hand, solve_piece, PieceFingering, SolveOptions};
