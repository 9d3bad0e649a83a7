use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::io::BufRead;
use std::time::Duration;
use std::{io, thread};
use uct_rs::game::Game;
use uct_rs::games::{Games, MnkAction, MnkGame, MnkState};
use uct_rs::uct::{
    Cadence, ControlHandle, Controller, LogObserver, RunOutcome, SearchConfig, Side, Snapshot,
    State,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// One fully visible iteration at a time
    Step,
    /// Fast iterations, only the final result is shown
    Batch,
    /// Iterations with every `--animate-every`th one visible
    Animated,
    /// Play a game against the search, entering cell indexes on stdin
    Play,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mark {
    X,
    O,
}

impl Mark {
    fn side(self) -> Side {
        match self {
            Mark::X => Side::First,
            Mark::O => Side::Second,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Board as rows of X, O and _ (e.g. "XO_ _X_ O__"). Starts from an empty
    /// board of `--game` when omitted.
    #[arg()]
    board: Option<String>,
    #[arg(short, long, value_enum, default_value_t = Games::TicTacToe)]
    game: Games,
    #[arg(short, long, value_enum, default_value_t = Mode::Batch)]
    mode: Mode,
    #[arg(short, long, default_value_t = 1000)]
    iterations: u32,
    #[arg(short('c'), long, default_value_t = std::f64::consts::SQRT_2)]
    exploration_constant: f64,
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
    /// Every nth iteration is visible in animated mode, or "final"
    #[arg(long, default_value = "1")]
    animate_every: Cadence,
    /// Pause after each phase of a visible iteration
    #[arg(long, default_value_t = 0)]
    phase_delay_ms: u64,
    /// Pause after each rollout move of a visible iteration
    #[arg(long, default_value_t = 0)]
    move_delay_ms: u64,
    /// Print the final snapshot as JSON
    #[arg(long)]
    json: bool,
    /// Read pause, resume and cancel commands from stdin while searching
    #[arg(long)]
    interactive: bool,
    /// The side you play in play mode
    #[arg(long, value_enum, default_value_t = Mark::X)]
    human: Mark,
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity,
}

fn print_table(board: &MnkState, snapshot: &Snapshot<MnkAction>) {
    println!("{}", board);
    println!("---");
    println!("Move\tVisits\tWins\tDraws\tLosses\tMean");
    for stats in &snapshot.moves {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{:.3}",
            stats.action,
            stats.visit_count,
            stats.wins,
            stats.draws,
            stats.losses,
            stats.mean_value
        );
    }
    println!("---");
    println!(
        "Iterations: {}, Root visits: {}, Nodes: {}",
        snapshot.iterations, snapshot.root_visits, snapshot.tree_size
    );
    match snapshot.best_move {
        Some(action) => println!("Best move: {}", action),
        None => println!("Best move: none"),
    }
}

fn listen_for_commands(handle: ControlHandle) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let applied = match line.trim() {
                "p" | "pause" => handle.pause(),
                "r" | "resume" => handle.resume(),
                "c" | "cancel" => handle.cancel(),
                other => {
                    eprintln!("Unknown command {:?}; use pause, resume or cancel", other);
                    continue;
                }
            };
            if !applied {
                log::warn!("No search is running");
            }
        }
    });
}

/// Prompts until `input` yields a legal move for the side to move.
fn read_human_turn<G: Game>(
    game: &G,
    state: &G::StateType,
    input: &mut dyn BufRead,
) -> Result<G::ActionType> {
    loop {
        println!("Your move ({} to play):", state.next_actor());
        if input.fill_buf().context("Could not read stdin")?.is_empty() {
            bail!("Input closed before a move was entered");
        }
        match game.get_human_turn(state, input) {
            Ok(action) => return Ok(action),
            Err(err) => println!("{}", err),
        }
    }
}

fn play_game(
    controller: &Controller<MnkState>,
    game: &MnkGame,
    human: Side,
    iterations: u32,
    observer: &mut LogObserver,
) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    loop {
        let board = controller.board();
        game.visualise_state(&board);
        if let Some(outcome) = board.outcome() {
            println!("Game over: {:?}", outcome);
            return Ok(());
        }
        let action = if board.next_actor() == human {
            read_human_turn(game, &board, &mut input)?
        } else {
            controller.run_batch(iterations, true, &mut *observer)?;
            let action = controller
                .best_action()
                .context("Search returned no move for a live position")?;
            println!("Search plays {}", action);
            action
        };
        controller.play(action)?;
        println!("---");
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    let board: MnkState = match &args.board {
        Some(board) => board
            .parse()
            .with_context(|| format!("Could not read board {:?}", board))?,
        None => args.game.game().init_game(),
    };
    let config = SearchConfig::default()
        .with_exploration_constant(args.exploration_constant)
        .with_seed(args.seed)
        .with_phase_delay(Duration::from_millis(args.phase_delay_ms))
        .with_move_delay(Duration::from_millis(args.move_delay_ms));
    let controller = Controller::new(board.clone(), config).context("Invalid search settings")?;
    if args.interactive && !matches!(args.mode, Mode::Play) {
        listen_for_commands(controller.handle());
    }

    let mut observer = LogObserver;
    let outcome = match args.mode {
        Mode::Step => {
            let mut outcome = RunOutcome::Completed { iterations: 0 };
            for _ in 0..args.iterations {
                outcome = controller.step_once(&mut observer)?;
                if !matches!(outcome, RunOutcome::Completed { .. }) {
                    break;
                }
            }
            outcome
        }
        Mode::Batch => controller.run_batch(args.iterations, true, &mut observer)?,
        Mode::Animated => controller.step_many_animated(
            args.iterations,
            args.animate_every,
            true,
            &mut observer,
        )?,
        Mode::Play => {
            let game = MnkGame::try_new(board.width(), board.height(), board.k())?;
            return play_game(
                &controller,
                &game,
                args.human.side(),
                args.iterations,
                &mut observer,
            );
        }
    };
    log::info!("Search finished: {:?}", outcome);

    let snapshot = controller.snapshot();
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&snapshot).context("Could not serialise snapshot")?
        );
    } else {
        if outcome == RunOutcome::AlreadyTerminal {
            println!("The game is already over");
        }
        print_table(&board, &snapshot);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_turn_retries_until_legal() {
        let game = Games::TicTacToe.game();
        let state: MnkState = "XO_ _X_ O__".parse().unwrap();
        let mut input = "centre\n0\n8\n".as_bytes();
        assert_eq!(
            read_human_turn(&game, &state, &mut input).unwrap(),
            MnkAction::Place(8)
        );
    }

    #[test]
    fn test_human_turn_fails_on_closed_input() {
        let game = Games::TicTacToe.game();
        let state = game.init_game();
        let mut input = "9\n".as_bytes();
        assert!(read_human_turn(&game, &state, &mut input).is_err());
    }
}
