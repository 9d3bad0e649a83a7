//! Benchmarks the search by timing fast batches from the opening position
use anyhow::{Context, Result};
use clap::Parser;
use std::time::Instant;
use uct_rs::game::Game;
use uct_rs::games::Games;
use uct_rs::uct::{Controller, SearchConfig};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(value_enum, default_value_t = Games::TicTacToe)]
    game: Games,
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity,
    #[arg(short, long, default_value_t = 100000)]
    iterations: u32,
    #[arg(short, long, default_value_t = 10)]
    episodes: u32,
    #[arg(short('c'), long, default_value_t = std::f64::consts::SQRT_2)]
    exploration_constant: f64,
}

fn run_benchmark<G: Game>(game: &G, iterations: u32, config: SearchConfig) -> Result<f64> {
    let controller = Controller::new(game.init_game(), config)?;
    let start = Instant::now();
    let outcome = controller.run_batch(iterations, true, &mut ())?;
    let elapsed = start.elapsed();
    let iterations_per_second = outcome.iterations() as f64 / elapsed.as_secs_f64();
    let tree = controller.inspect(|tree| tree.stats());
    println!(
        "{} iterations in {:.2} seconds ({:.2} iterations per second, {} nodes, depth {})",
        outcome.iterations(),
        elapsed.as_secs_f64(),
        iterations_per_second,
        tree.total_nodes,
        tree.max_depth
    );
    Ok(elapsed.as_secs_f64())
}

fn main() -> Result<()> {
    let args = Args::parse();
    println!(
        "===\nGame: {:?}, Iterations: {}, Episodes: {}",
        args.game, args.iterations, args.episodes
    );
    println!("---");
    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    let game = args.game.game();
    let durations = (0..args.episodes)
        .map(|episode| {
            let config = SearchConfig::default()
                .with_exploration_constant(args.exploration_constant)
                .with_seed(episode as u64);
            run_benchmark(&game, args.iterations, config)
                .with_context(|| format!("Episode {} failed", episode))
        })
        .collect::<Result<Vec<f64>>>()?;
    println!("---");
    let total: f64 = durations.iter().sum();
    println!(
        "Average duration: {:.2} seconds",
        total / durations.len().max(1) as f64
    );
    println!(
        "Average iterations per second: {:.2}",
        (args.episodes as f64 * args.iterations as f64) / total
    );
    Ok(())
}
