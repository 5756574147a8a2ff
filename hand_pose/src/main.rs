//! pose_check: classify every frame of a recorded landmark file.
//!
//! ```text
//! pose_check recording.jsonl [--all]
//! ```
//!
//! Prints one line per frame with the first hand's gesture, then a tally.
//! `--all` also lists every rule that matched, not just the winner.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;

use hand_pose::record::read_frames;
use hand_pose::{classify, matching_rules, GestureLabel};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let show_all = args.iter().any(|a| a == "--all");
    let Some(path) = args.iter().find(|a| !a.starts_with("--")) else {
        eprintln!("usage: pose_check <recording.jsonl> [--all]");
        std::process::exit(2);
    };

    let file = match File::open(path) {
        Ok(f)  => f,
        Err(e) => {
            eprintln!("Error: cannot open {}: {}", path, e);
            std::process::exit(1);
        }
    };

    let mut tally: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut frames = 0usize;

    for (i, frame) in read_frames(BufReader::new(file)).enumerate() {
        let frame = match frame {
            Ok(f)  => f,
            Err(e) => {
                eprintln!("  frame {:>5}: {}", i, e);
                continue;
            }
        };
        frames += 1;

        let hand = frame.hands.first().map(|h| h.to_landmark_set());
        let label = match &hand {
            Some(Ok(set)) => classify(Some(set)),
            Some(Err(e))  => {
                eprintln!("  frame {:>5}: {}", i, e);
                GestureLabel::None
            }
            None => GestureLabel::None,
        };
        *tally.entry(label.name()).or_default() += 1;

        let stamp = frame.timestamp.map(|t| format!("{:>8.3}s", t)).unwrap_or_default();
        match (&hand, show_all) {
            (Some(Ok(set)), true) => println!(
                "  frame {:>5} {} {:<10} matched {:?}", i, stamp, label.name(), matching_rules(set)
            ),
            _ => println!("  frame {:>5} {} {}", i, stamp, label),
        }
    }

    println!();
    println!("  {} frames", frames);
    for (name, count) in tally {
        println!("  {:<10} {:>5}", name, count);
    }
}
