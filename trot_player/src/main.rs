//! trot_player: gesture-controlled audio playback.
//!
//! ```text
//! trot_player [AUDIO_PATH] [--config FILE] [--replay FILE] [--no-autoplay]
//! ```

use anyhow::Context;
use tracing::info;
use trot_player::app::run;
use trot_player::config::{config_path_from_args, AppConfig, SourceKind};
use trot_player::logging;

fn main() {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║          Trot Player · Easy Gesture Music Controller         ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    if let Err(e) = start() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn start() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut cfg = match config_path_from_args(&args[..]) {
        Some(path) => AppConfig::load(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => AppConfig::default(),
    };
    cfg.apply_args(&args)?;
    cfg.validate()?;

    logging::init(&cfg.log_level);

    match cfg.source {
        SourceKind::Simulated => println!("  Mode: Keyboard simulation  (1-4 pick a pose, 0 clears, Q quits)"),
        SourceKind::Replay    => println!("  Mode: Landmark replay"),
    }
    println!("  Track: {}", cfg.audio_path.display());
    println!();

    let summary = run(&cfg)?;
    info!(
        "session over: {} frames, {} gestures accepted",
        summary.frames, summary.accepted
    );
    Ok(())
}
