//! Plays configurations of the search against one another
use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::fmt::Formatter;
use log::Record;
use rand::Rng;
use serde::Deserialize;
use std::io::Write;
use std::{fs, thread};
use uct_rs::game::Game;
use uct_rs::games::Games;
use uct_rs::uct::{calculate_best_turn, Action, SearchConfig, Side, State};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg()]
    config_file: String,
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity,
}

#[derive(Debug, Deserialize)]
struct ArenaSettings {
    game: Games,
    episodes: usize,
    /// First entry plays X, second plays O
    players: Vec<PlayerSettings>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type")]
enum PlayerSettings {
    Random,
    Uct(UctSettings),
}

#[derive(Debug, Deserialize, Clone)]
struct UctSettings {
    iterations: u32,
    #[serde(flatten)]
    search: SearchConfig,
}

fn choose_action<S: State>(
    state: &S,
    player: &PlayerSettings,
    seed: u64,
) -> Result<S::ActionType> {
    match player {
        PlayerSettings::Random => {
            let permitted_actions = state.permitted_actions();
            Ok(permitted_actions[rand::thread_rng().gen_range(0..permitted_actions.len())])
        }
        PlayerSettings::Uct(settings) => {
            let config = SearchConfig {
                seed: settings.search.seed.wrapping_add(seed),
                ..settings.search.clone()
            };
            calculate_best_turn(state.clone(), settings.iterations, config)?
                .context("Search returned no move for a live position")
        }
    }
}

/// Rewards for X and O.
fn run_episode<G: Game>(game: &G, players: &[PlayerSettings], episode: u64) -> Result<[f64; 2]> {
    let mut state = game.init_game();
    let mut turn = 0;
    while !state.terminal() {
        let actor = state.next_actor();
        let player = match actor {
            Side::First => &players[0],
            Side::Second => &players[1],
        };
        let action = choose_action(&state, player, episode * 1000 + turn)?;
        log::debug!("Player {} plays {}", actor, action);
        state = action.execute(&state)?;
        turn += 1;
    }
    game.visualise_state(&state);
    match state.outcome() {
        Some(outcome) => Ok([
            outcome.reward_for(Side::First),
            outcome.reward_for(Side::Second),
        ]),
        None => bail!("Episode {} stopped before the game ended", episode),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
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

    let config_file = fs::read_to_string(&args.config_file)
        .with_context(|| format!("Failed to read config file {}", args.config_file))?;
    let arena_settings: ArenaSettings =
        serde_json::from_str(&config_file).context("Failed to parse config file")?;
    if arena_settings.players.len() != 2 {
        bail!(
            "Exactly two players are needed, {} configured",
            arena_settings.players.len()
        );
    }

    let game = arena_settings.game.game();
    let mut results = [0.0; 2];
    for episode in 0..arena_settings.episodes {
        log::info!("Starting episode {}", episode);
        let result = run_episode(&game, &arena_settings.players, episode as u64)?;
        for (i, r) in result.iter().enumerate() {
            results[i] += *r;
        }
    }
    println!("Player\tResult\tPercentage");
    let total: f64 = results.iter().sum();
    for (i, r) in results.iter().enumerate() {
        println!("{}\t{:?}\t{:>5.2}%", i + 1, r, percentage(*r, total));
    }
    Ok(())
}

/// Share of `total`; 0 when nothing was played.
fn percentage(result: f64, total: f64) -> f64 {
    if total > 0.0 {
        100.0 * result / total
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_of_no_episodes_is_zero() {
        assert_eq!(percentage(0.0, 0.0), 0.0);
        assert_eq!(percentage(1.5, 2.0), 75.0);
    }

    #[test]
    fn test_settings_parse() {
        let settings: ArenaSettings = serde_json::from_str(
            r#"{
                "game": "TicTacToe",
                "episodes": 0,
                "players": [
                    { "type": "Uct", "iterations": 50, "seed": 3 },
                    { "type": "Random" }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(settings.episodes, 0);
        assert!(matches!(
            &settings.players[0],
            PlayerSettings::Uct(UctSettings { iterations: 50, search }) if search.seed == 3
        ));
    }
}
