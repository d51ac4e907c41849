//! Piece fingering solver binary.
//!
//! Usage:
//!   cargo run --release --bin solve_piece -- <INPUT> [OPTIONS]
//!
//! Options:
//!   --episodes <N>       Episode budget per replica (default: 10000)
//!   --seed <N>           Base random seed (default: 42)
//!   --segment-size <N>   Max note groups per segment (default: 50)
//!   --replicas <N>       Solver replicas per segment (default: 4)
//!   --output <FILE>      Output file (default: fingering.json)

use std::env;
use std::fs;
use std::process;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

use fingering_solver::fingering::{flatten_policy, FingeringEntry, NoteGroup};
use fingering_solver::segmentation::{solve_piece, SolveOptions};
use fingering_solver::DynaQConfig;

/// Both hands' note groups, lowest-voice first within each group.
#[derive(Debug, Deserialize)]
struct PieceInput {
    #[serde(default)]
    right: Vec<NoteGroup>,
    #[serde(default)]
    left: Vec<NoteGroup>,
}

/// Flattened per-note fingering decisions for both hands.
#[derive(Debug, Serialize)]
struct PieceOutput {
    right: Vec<FingeringEntry>,
    left: Vec<FingeringEntry>,
    elapsed_seconds: f64,
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut input_file: Option<String> = None;
    let mut episodes: Option<u32> = None;
    let mut seed: Option<u64> = None;
    let mut segment_size: Option<usize> = None;
    let mut replicas: Option<usize> = None;
    let mut output_file = "fingering.json".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--episodes" | "-e" => {
                i += 1;
                if i < args.len() {
                    episodes = args[i].parse().ok();
                }
            }
            "--seed" | "-s" => {
                i += 1;
                if i < args.len() {
                    seed = args[i].parse().ok();
                }
            }
            "--segment-size" => {
                i += 1;
                if i < args.len() {
                    segment_size = args[i].parse().ok();
                }
            }
            "--replicas" | "-r" => {
                i += 1;
                if i < args.len() {
                    replicas = args[i].parse().ok();
                }
            }
            "--output" | "-o" => {
                i += 1;
                if i < args.len() {
                    output_file = args[i].clone();
                }
            }
            "--help" | "-h" => {
                print_help();
                return;
            }
            other if !other.starts_with('-') && input_file.is_none() => {
                input_file = Some(other.to_string());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                process::exit(2);
            }
        }
        i += 1;
    }

    let Some(input_path) = input_file else {
        eprintln!("Missing input file");
        print_help();
        process::exit(2);
    };

    println!("=================================================");
    println!("  Piano Fingering Solver");
    println!("=================================================");
    println!();

    let piece: PieceInput = match fs::read_to_string(&input_path) {
        Ok(text) => match serde_json::from_str(&text) {
            Ok(piece) => piece,
            Err(e) => {
                eprintln!("Error parsing {}: {}", input_path, e);
                process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("Error reading {}: {}", input_path, e);
            process::exit(1);
        }
    };

    let mut config = DynaQConfig::default();
    if let Some(n) = episodes {
        config = config.with_episodes(n);
    }
    if let Some(s) = seed {
        config = config.with_seed(s);
    }

    let mut options = SolveOptions::new().with_config(config);
    if let Some(cap) = segment_size {
        options = options.with_segment_cap(cap);
    }
    if let Some(r) = replicas {
        options = options.with_replicas(r);
    }

    println!("Input: {}", input_path);
    println!(
        "Groups: {} right, {} left",
        piece.right.len(),
        piece.left.len()
    );
    println!("Episodes: {} per replica", options.config.episodes);
    println!("Replicas: {} per segment", options.replicas);
    println!("Segment size: {}", options.segment_cap);
    println!("Seed: {}", options.config.seed);
    println!("Output: {}", output_file);
    println!();

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let start = Instant::now();
    let result = solve_piece(&piece.right, &piece.left, &options, &|pct| {
        bar.set_position(pct as u64);
    });
    bar.finish();
    println!();

    let fingering = match result {
        Ok(fingering) => fingering,
        Err(e) => {
            eprintln!("Solve failed: {}", e);
            process::exit(1);
        }
    };

    let elapsed = start.elapsed().as_secs_f64();
    println!("Solved in {:.2}s", elapsed);

    let output = PieceOutput {
        right: flatten_policy(&fingering.right),
        left: flatten_policy(&fingering.left),
        elapsed_seconds: elapsed,
    };

    match serde_json::to_string_pretty(&output) {
        Ok(json) => match fs::write(&output_file, json) {
            Ok(()) => println!("Results saved to {}", output_file),
            Err(e) => {
                eprintln!("Error writing {}: {}", output_file, e);
                process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("Error serializing results: {}", e);
            process::exit(1);
        }
    }

    // Show the opening fingerings as a sanity check.
    println!();
    println!("=== Sample Fingerings (right hand) ===");
    for entry in output.right.iter().take(8) {
        println!("  group {:>3} | pitch {:>3} | finger {}", entry.position, entry.pitch, entry.finger);
    }
    println!();
    println!("Done!");
}

fn print_help() {
    println!("Piano Fingering Solver");
    println!();
    println!("Usage: solve_piece <INPUT> [OPTIONS]");
    println!();
    println!("Input is a JSON object with \"right\" and \"left\" arrays of note");
    println!("groups; each group is an array of notes with a MIDI \"pitch\" and an");
    println!("optional \"duration\" in ticks.");
    println!();
    println!("Options:");
    println!("  -e, --episodes <N>       Episode budget per replica (default: 10000)");
    println!("  -s, --seed <N>           Base random seed (default: 42)");
    println!("      --segment-size <N>   Max note groups per segment (default: 50)");
    println!("  -r, --replicas <N>       Solver replicas per segment (default: 4)");
    println!("  -o, --output <FILE>      Output file (default: fingering.json)");
    println!("  -h, --help               Show this help");
    println!();
    println!("Examples:");
    println!("  # Solve with defaults");
    println!("  solve_piece piece.json");
    println!();
    println!("  # Quick low-budget pass");
    println!("  solve_piece piece.json --episodes 1500 --replicas 2");
}
