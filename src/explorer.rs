//! Explores the tree from the first turn repeatedly, saving the visible events
//! and snapshots of each run
use anyhow::{Context, Result};
use clap::Parser;
use env_logger::fmt::Formatter;
use log::Record;
use serde::Serialize;
use std::io::Write;
use std::thread;
use std::time::Instant;
use uct_rs::game::Game;
use uct_rs::games::Games;
use uct_rs::uct::{Cadence, Controller, Recorder, SearchConfig};

const CHUNK_SIZE: usize = 1000;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(value_enum, default_value_t = Games::TicTacToe)]
    game: Games,
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity,
    #[arg(short, long, default_value_t = 1000)]
    iterations: u32,
    #[arg(short, long, default_value_t = 10)]
    episodes: u64,
    #[arg(short, long, default_value = None)]
    reports_folder: Option<String>,
    #[arg(short('c'), long, default_value_t = std::f64::consts::SQRT_2)]
    exploration_constant: f64,
    /// Every nth iteration is recorded, or "final"
    #[arg(short, long, default_value = "10")]
    animate_every: Cadence,
}

fn write_chunks<T: Serialize>(items: &[T], report_path: &str, kind: &str) -> Result<()> {
    let chunks = items.len().div_ceil(CHUNK_SIZE);
    for (i, chunk) in items.chunks(CHUNK_SIZE).enumerate() {
        let filename = format!(
            "{}-{}-{:0>width$}.json",
            report_path,
            kind,
            i,
            width = chunks.to_string().len()
        );
        let serialized = serde_json::to_string(&chunk)?;
        std::fs::write(&filename, serialized)
            .with_context(|| format!("Failed to write {}", filename))?;
    }
    Ok(())
}

fn run_explore<G: Game>(
    game: &G,
    iterations: u32,
    cadence: Cadence,
    config: SearchConfig,
    report_path: &str,
) -> Result<f64> {
    let controller = Controller::new(game.init_game(), config)?;
    let mut recorder: Recorder<G::ActionType> = Recorder::new();
    let start = Instant::now();
    let outcome = controller.step_many_animated(iterations, cadence, true, &mut recorder)?;
    let elapsed = start.elapsed();
    println!(
        "{} iterations in {:.2} seconds ({} events, {} snapshots)",
        outcome.iterations(),
        elapsed.as_secs_f64(),
        recorder.events.len(),
        recorder.snapshots.len()
    );
    write_chunks(&recorder.events, report_path, "events")?;
    write_chunks(&recorder.snapshots, report_path, "snapshots")?;
    Ok(elapsed.as_secs_f64())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let reports_folder = args.reports_folder.clone().unwrap_or_else(|| {
        format!(
            "reports/{:?}/{}",
            args.game,
            chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
        )
    });
    std::fs::create_dir_all(&reports_folder)
        .with_context(|| format!("Failed to create reports folder {}", reports_folder))?;

    println!(
        "===\nIterations: {}, Episodes: {}, Cadence: {}, Path: {}",
        args.iterations, args.episodes, args.animate_every, &reports_folder
    );
    println!("---");
    env_logger::Builder::new()
        .format(|buf: &mut Formatter, record: &Record| {
            let thread_id = thread::current().id();
            let timestamp = buf.timestamp_millis();
            writeln!(
                buf,
                "[{}] [Thread: {:?}] [{}] - {}",
                timestamp,
                thread_id,
                record.level(),
                record.args()
            )
        })
        .filter_level(args.verbose.log_level_filter())
        .init();

    let game = args.game.game();
    for episode in 0..args.episodes {
        let config = SearchConfig::default()
            .with_exploration_constant(args.exploration_constant)
            .with_seed(episode);
        run_explore(
            &game,
            args.iterations,
            args.animate_every,
            config,
            &format!("{}/{}", reports_folder, episode),
        )?;
    }
    Ok(())
}
