use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use rand::{rngs::StdRng, SeedableRng};
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use config::{BoardConfig, GameConfig, DEFAULT_START_CASH};
use engine::{Engine, Outcome};
use games::estate::{Dice, State, MAX_PLAYERS, MIN_PLAYERS};
use games::GameState;
use history::History;
use policy::{Automatic, Console, Manual, Policy};

mod config;
mod engine;
mod games;
mod history;
mod policy;
mod tui;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Let every player buy whatever they can afford
    Simulate {
        #[arg(long, default_value_t = MAX_PLAYERS)]
        players: usize,
        /// Number of independent games, played in parallel
        #[arg(long, default_value_t = 1)]
        games: usize,
        /// Write every game's balance history here as JSON lines
        #[arg(short)]
        log_file: Option<PathBuf>,
        #[command(flatten)]
        game: GameArgs,
    },
    /// Ask at the console before every roll and purchase
    Interactive {
        #[arg(long)]
        players: Option<usize>,
        #[command(flatten)]
        game: GameArgs,
    },
}

#[derive(clap::Args, Clone, Debug)]
struct GameArgs {
    /// JSON file with the lap income, rents and optionally the space names
    #[arg(long)]
    board: Option<PathBuf>,
    #[arg(long, default_value_t = DEFAULT_START_CASH)]
    start_cash: i64,
    #[arg(long, default_value_t = 1)]
    dice_count: u8,
    #[arg(long, default_value_t = 6)]
    dice_sides: u8,
    /// Call the game a draw after this many rounds, 0 plays on forever
    #[arg(long, default_value_t = 10_000)]
    max_rounds: usize,
    #[arg(long)]
    seed: Option<u64>,
    /// Skip the balance chart at the end
    #[arg(long)]
    no_chart: bool,
}

impl GameArgs {
    fn config(&self) -> Result<GameConfig> {
        let board = match &self.board {
            Some(path) => BoardConfig::load(path)?,
            None => BoardConfig::default(),
        };

        Ok(GameConfig {
            board,
            start_cash: self.start_cash,
            dice: Dice::new(self.dice_count, self.dice_sides)?,
            max_rounds: (self.max_rounds > 0).then_some(self.max_rounds),
        })
    }

    // Game i of a seeded batch uses seed + i
    fn rng(&self, game_idx: usize) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(game_idx as u64)),
            None => StdRng::from_os_rng(),
        }
    }
}

fn check_player_count(n_players: usize) -> Result<()> {
    if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&n_players) {
        bail!("Number of players ({}) outside the bound [{}, {}]", n_players, MIN_PLAYERS, MAX_PLAYERS);
    }
    Ok(())
}

fn play_game(config: &GameConfig, names: &[String], policy: Box<dyn Policy>, rng: StdRng) -> Result<(Outcome, History)> {
    let mut state = State::new(&config.board, config.dice)?;
    for name in names {
        state.add_player(name, config.start_cash)?;
    }

    let mut engine = Engine::new(state, policy, rng, config.max_rounds);
    let outcome = engine.run()?;
    log::info!(
        "Game over in round {} with {} of {} players left",
        engine.round(),
        engine.state().active_players().len(),
        engine.history().names().len(),
    );
    Ok((outcome, engine.into_history()))
}

fn report(outcomes: &[Outcome], names: &[String]) {
    let mut win_counts: HashMap<usize, usize> = HashMap::from_iter((0..names.len()).map(|i| (i, 0)));
    let mut draws = 0;
    let total_games = outcomes.len();

    for outcome in outcomes {
        match outcome {
            Outcome::Winner(i) => {
                if let Some(count) = win_counts.get_mut(i) {
                    *count += 1;
                }
            },
            Outcome::RoundLimit => draws += 1,
        }
    }

    for (i, name) in names.iter().enumerate() {
        println!("Win Count for {}: {}/{}, ratio: {}", name, win_counts[&i], total_games, (win_counts[&i] as f64 / total_games as f64));
    }
    if draws > 0 {
        println!("Games stopped at the round limit: {}/{}", draws, total_games);
    }
}

// Text summary, then the chart unless it was turned off
fn review(history: &History, no_chart: bool) -> Result<()> {
    println!("\nNow that the game is over, let's review the storied history of this game!");
    for (seat, name) in history.names().iter().enumerate() {
        if let Some(last) = history.series(seat).last() {
            println!("{}: ${} at round {}", name, last.cash, last.round);
        }
    }

    if !no_chart {
        tui::show_chart(history)?;
    }

    Ok(())
}

fn simulate(n_players: usize, n_games: usize, log_file: Option<&Path>, args: &GameArgs) -> Result<()> {
    check_player_count(n_players)?;
    if n_games == 0 {
        bail!("Need at least one game to simulate");
    }

    let config = args.config()?;
    let names: Vec<String> = (1..=n_players).map(|i| format!("Player {}", i)).collect();
    // Only narrate when there is a single game to follow
    let narrate = n_games == 1;

    log::info!("Running {} simulations for {} players", n_games, n_players);

    let results: Vec<(Outcome, History)> = (0..n_games)
        .into_par_iter()
        .map(|game_idx| {
            let result = play_game(&config, &names, Box::new(Automatic::new(narrate)), args.rng(game_idx));
            if let Ok((outcome, _)) = &result {
                log::info!("Game {} finished: {:?}", game_idx, outcome);
            }
            result
        })
        .collect::<Result<Vec<_>>>()?;

    let (outcomes, histories): (Vec<Outcome>, Vec<History>) = results.into_iter().unzip();

    if let Some(file) = log_file {
        history::write_history_log(&histories, file)?;
        log::info!("Wrote balance history to {}", file.display());
    }

    if n_games == 1 {
        review(&histories[0], args.no_chart)
    } else {
        report(&outcomes, &names);
        Ok(())
    }
}

fn run_interactive(players: Option<usize>, args: &GameArgs) -> Result<()> {
    let config = args.config()?;
    let mut console = Console::new(io::stdin().lock(), io::stdout());

    let n_players = match players {
        Some(n) => {
            check_player_count(n)?;
            n
        },
        None => console.ask_number(&format!("How many players? ({}-{})", MIN_PLAYERS, MAX_PLAYERS), MIN_PLAYERS..=MAX_PLAYERS)?,
    };
    let names = console.ask_names(n_players)?;

    console.say("Before we start, let's check things over to make sure everything is legit...")?;
    let (_outcome, history) = play_game(&config, &names, Box::new(Manual::new(console)), args.rng(0))?;

    review(&history, args.no_chart)
}

fn main() -> Result<()> {
    env_logger::init();
    if let Err(err) = color_eyre::install() {
        log::warn!("Could not install the error report hooks: {}", err);
    }

    let args = Args::parse();

    match args.commands {
        Commands::Simulate { players, games, log_file, game } => simulate(players, games, log_file.as_deref(), &game),
        Commands::Interactive { players, game } => run_interactive(players, &game),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game_args(seed: u64) -> GameArgs {
        GameArgs {
            board: None,
            start_cash: DEFAULT_START_CASH,
            dice_count: 1,
            dice_sides: 6,
            max_rounds: 10_000,
            seed: Some(seed),
            no_chart: true,
        }
    }

    #[test]
    fn test_cli_parses() {
        let args = Args::try_parse_from(["estate", "simulate", "--games", "4", "--seed", "7", "-l", "out.jsonl", "--no-chart"]).unwrap();
        match args.commands {
            Commands::Simulate { players, games, log_file, game } => {
                assert_eq!(players, 30);
                assert_eq!(games, 4);
                assert_eq!(log_file, Some(PathBuf::from("out.jsonl")));
                assert_eq!(game.seed, Some(7));
                assert!(game.no_chart);
            },
            Commands::Interactive { .. } => panic!("Expected the simulate command"),
        }
    }

    #[test]
    fn test_config_from_args() {
        let mut args = game_args(1);
        args.max_rounds = 0;
        args.dice_count = 2;
        let config = args.config().unwrap();
        assert_eq!(config.board, BoardConfig::default());
        assert_eq!(config.start_cash, DEFAULT_START_CASH);
        assert_eq!(config.max_rounds, None);
        assert_eq!(config.dice.max(), 12);

        args.dice_sides = 20;
        assert!(args.config().is_err());
    }

    #[test]
    fn test_player_count_bounds() {
        assert!(check_player_count(1).is_err());
        assert!(check_player_count(2).is_ok());
        assert!(check_player_count(30).is_ok());
        assert!(check_player_count(31).is_err());
    }

    #[test]
    fn test_seeded_games_repeat() {
        let args = game_args(99);
        let config = args.config().unwrap();
        let names: Vec<String> = (1..=4).map(|i| format!("Player {}", i)).collect();

        let (first, history_a) = play_game(&config, &names, Box::new(Automatic::new(false)), args.rng(0)).unwrap();
        let (second, history_b) = play_game(&config, &names, Box::new(Automatic::new(false)), args.rng(0)).unwrap();

        assert_eq!(first, second);
        for seat in 0..names.len() {
            assert_eq!(history_a.series(seat), history_b.series(seat));
        }
    }

    #[test]
    fn test_review_without_chart() {
        let args = game_args(3);
        let config = args.config().unwrap();
        let names: Vec<String> = (1..=3).map(|i| format!("Player {}", i)).collect();

        let (_outcome, history) = play_game(&config, &names, Box::new(Automatic::new(false)), args.rng(0)).unwrap();
        assert_eq!(history.names(), names.as_slice());
        for seat in 0..names.len() {
            assert_eq!(history.series(seat)[0].cash, DEFAULT_START_CASH);
        }
        review(&history, true).unwrap();
    }

    #[test]
    fn test_batch_simulation_writes_log() {
        let path = std::env::temp_dir().join(format!("estate-batch-{}.jsonl", std::process::id()));
        simulate(3, 4, Some(&path), &game_args(5)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let game_ids: Vec<u64> = contents
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["game_id"].as_u64().unwrap())
            .collect();
        assert_eq!(game_ids.first(), Some(&0));
        assert_eq!(game_ids.last(), Some(&3));
    }
}
