use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::agent::{select_move_within, Agent, MoveOutcome};
use crate::board::{Board, Hand, Line};
use crate::cards::{parse_cards, Card, Deck};
use crate::checkpoint::FileStore;
use crate::config::{
    default_checkpoint_path, load_settings, AgentKind, FantasyType, GameSettings, TrainerConfig,
};
use crate::display::{
    action_display, actions_table, board_table, cards_display, print_error, print_section,
    print_success, progress_bar, royalty_table,
};
use crate::error::{OfcError, OfcResult};
use crate::game_state::{GameState, INITIAL_DEAL, STREET_DEAL};
use crate::heuristic::evaluate_state;
use crate::royalty::{qualifies_fantasy_entry, qualifies_fantasy_repeat};
use crate::session::Session;
use crate::trainer::Trainer;

#[derive(Parser)]
#[command(name = "ofc", version = "1.0.0", about = "Open-Face Chinese Poker solver: MCCFR training, move selection and scoring.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum AgentArg {
    Mccfr,
    Random,
}

impl AgentArg {
    fn kind(&self) -> AgentKind {
        match self {
            AgentArg::Mccfr => AgentKind::Mccfr,
            AgentArg::Random => AgentKind::Random,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum FantasyArg {
    Normal,
    Progressive,
}

impl FantasyArg {
    fn fantasy_type(&self) -> FantasyType {
        match self {
            FantasyArg::Normal => FantasyType::Normal,
            FantasyArg::Progressive => FantasyType::Progressive,
        }
    }
}

/// Board lines, e.g. `--top "AhAd" --bottom "2c3c4c5c6c"`.
#[derive(Args, Clone, Default)]
struct BoardArgs {
    /// Top line cards
    #[arg(long, default_value = "")]
    top: String,
    /// Middle line cards
    #[arg(long, default_value = "")]
    middle: String,
    /// Bottom line cards
    #[arg(long, default_value = "")]
    bottom: String,
}

/// Settings file plus per-flag overrides.
#[derive(Args, Clone)]
struct SettingsArgs {
    /// JSON settings file (front-end keys: fantasyMode, aiTime, ...)
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Enable fantasy mode
    #[arg(long)]
    fantasy: bool,
    /// Fantasy variant
    #[arg(long)]
    fantasy_type: Option<FantasyArg>,
    /// Agent kind
    #[arg(long)]
    agent: Option<AgentArg>,
    /// Move deadline in seconds
    #[arg(long)]
    time: Option<u64>,
}

impl SettingsArgs {
    fn resolve(&self) -> OfcResult<GameSettings> {
        let mut settings = match &self.settings {
            Some(path) => load_settings(path)?,
            None => GameSettings::default(),
        };
        if self.fantasy {
            settings.fantasy_mode = true;
        }
        if let Some(ft) = &self.fantasy_type {
            settings.fantasy_type = ft.fantasy_type();
        }
        if let Some(agent) = &self.agent {
            settings.ai_type = agent.kind();
        }
        if let Some(time) = self.time {
            settings.ai_time = time;
        }
        Ok(settings)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Train the MCCFR agent by self-play
    Train {
        /// Iteration budget
        #[arg(short, long, default_value = "500000")]
        iterations: usize,
        /// Convergence tolerance around uniform
        #[arg(long, default_value = "0.0001")]
        stop_threshold: f64,
        /// Iterations between saves and convergence checks
        #[arg(long, default_value = "100")]
        save_interval: usize,
        /// Actions traversed per node (0 = all)
        #[arg(long, default_value = "4")]
        branch_limit: usize,
        /// Stop after this many seconds
        #[arg(long)]
        max_seconds: Option<u64>,
        /// RNG seed
        #[arg(long)]
        seed: Option<u64>,
        /// Ignore any saved progress
        #[arg(long)]
        fresh: bool,
        /// Checkpoint file (default ~/.ofc-solver/cfr_data.bin)
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },
    /// Pick a move for a board and a set of selected cards
    Move {
        /// Selected cards, e.g. "2h2d2c3s4h"
        cards: String,
        #[command(flatten)]
        board: BoardArgs,
        /// Cards already discarded
        #[arg(long, default_value = "")]
        discarded: String,
        #[command(flatten)]
        settings: SettingsArgs,
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },
    /// Rank every legal move by the heuristic scorer
    Eval {
        /// Selected cards
        cards: String,
        #[command(flatten)]
        board: BoardArgs,
        /// Cards already discarded
        #[arg(long, default_value = "")]
        discarded: String,
        /// Enable fantasy mode
        #[arg(long)]
        fantasy: bool,
        /// Rows to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Score a board: royalties, dead hand, fantasy qualification
    Score {
        #[command(flatten)]
        board: BoardArgs,
    },
    /// Deal a hand and let the agent play it out, then any fantasy hands it earns
    Play {
        #[command(flatten)]
        settings: SettingsArgs,
        /// RNG seed
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },
    /// Show saved training progress
    Progress {
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },
    /// Clear saved training progress
    Reset {
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },
    /// Serve the line-delimited JSON protocol on stdin/stdout
    Session {
        #[command(flatten)]
        settings: SettingsArgs,
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },
}

pub fn run() {
    let cli = Cli::parse();
    dispatch(cli);
}

fn dispatch(cli: Cli) {
    let result = match cli.command {
        Commands::Train {
            iterations,
            stop_threshold,
            save_interval,
            branch_limit,
            max_seconds,
            seed,
            fresh,
            checkpoint,
        } => cmd_train(
            iterations,
            stop_threshold,
            save_interval,
            branch_limit,
            max_seconds,
            seed,
            fresh,
            checkpoint,
        ),
        Commands::Move {
            cards,
            board,
            discarded,
            settings,
            checkpoint,
        } => cmd_move(cards, board, discarded, settings, checkpoint),
        Commands::Eval {
            cards,
            board,
            discarded,
            fantasy,
            limit,
        } => cmd_eval(cards, board, discarded, fantasy, limit),
        Commands::Score { board } => cmd_score(board),
        Commands::Play {
            settings,
            seed,
            checkpoint,
        } => cmd_play(settings, seed, checkpoint),
        Commands::Progress { checkpoint } => cmd_progress(checkpoint),
        Commands::Reset { checkpoint } => cmd_reset(checkpoint),
        Commands::Session {
            settings,
            checkpoint,
        } => cmd_session(settings, checkpoint),
    };

    if let Err(e) = result {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn store_at(checkpoint: Option<PathBuf>) -> FileStore {
    FileStore::new(checkpoint.unwrap_or_else(default_checkpoint_path))
}

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

fn parse_board(args: &BoardArgs) -> OfcResult<Board> {
    let mut board = Board::new();
    for (line, text) in [
        (Line::Top, &args.top),
        (Line::Middle, &args.middle),
        (Line::Bottom, &args.bottom),
    ] {
        board.place_cards(line, &parse_cards(text)?)?;
    }
    Ok(board)
}

fn build_state(
    cards: &str,
    board: &BoardArgs,
    discarded: &str,
    settings: GameSettings,
) -> OfcResult<GameState> {
    let state = GameState {
        selected: Hand::new(parse_cards(cards)?),
        board: parse_board(board)?,
        discarded: parse_cards(discarded)?,
        settings,
    };
    state.validate()?;
    Ok(state)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn cmd_train(
    iterations: usize,
    stop_threshold: f64,
    save_interval: usize,
    branch_limit: usize,
    max_seconds: Option<u64>,
    seed: Option<u64>,
    fresh: bool,
    checkpoint: Option<PathBuf>,
) -> OfcResult<()> {
    let store = store_at(checkpoint);
    let config = TrainerConfig {
        iterations,
        stop_threshold,
        save_interval,
        branch_limit: if branch_limit == 0 { None } else { Some(branch_limit) },
    };
    let mut trainer = Trainer::new(config);
    if !fresh && trainer.load(&store)? {
        // The budget on the command line wins over the saved one.
        trainer.set_iterations(iterations);
    }

    println!(
        "\n{} {} iterations, checkpoint {}",
        "Training".cyan().bold(),
        iterations,
        store.path().display()
    );
    if trainer.current_iteration() > 0 {
        println!(
            "  Resuming at iteration {} with {} nodes",
            trainer.current_iteration(),
            trainer.num_nodes()
        );
    }

    let mut rng = rng_from(seed);
    let cancel = AtomicBool::new(false);

    let status = thread::scope(|scope| {
        let (done_tx, done_rx) = mpsc::channel::<()>();
        if let Some(secs) = max_seconds {
            let cancel = &cancel;
            scope.spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = done_rx.recv_timeout(Duration::from_secs(secs)) {
                    log::info!("time limit of {} s reached", secs);
                    cancel.store(true, Ordering::Relaxed);
                }
            });
        }
        let status = trainer.train(&mut rng, &cancel, &store);
        let _ = done_tx.send(());
        status
    });

    print_section(
        "Result",
        &format!(
            "  status {}, iteration {}, {} nodes\n  {}",
            status.to_string().bold(),
            trainer.current_iteration(),
            trainer.num_nodes(),
            progress_bar(trainer.progress(), 30)
        ),
    );
    Ok(())
}

fn cmd_move(
    cards: String,
    board: BoardArgs,
    discarded: String,
    settings: SettingsArgs,
    checkpoint: Option<PathBuf>,
) -> OfcResult<()> {
    let settings = settings.resolve()?;
    let state = build_state(&cards, &board, &discarded, settings)?;
    let agent = Agent::load(&settings, &store_at(checkpoint))?;

    print_section("Board", &board_table(&state.board));
    println!("  Selected: {}", cards_display(state.selected.cards()));

    match select_move_within(&agent, &state, settings.move_timeout()) {
        MoveOutcome::Move(action) => {
            print_section("Move", &format!("  {}", action_display(&action)));
            let next = state.apply_action(&action)?;
            print_section("Result", &board_table(&next.board));
            if next.is_terminal() {
                println!("{}", royalty_table(&next.royalties(), next.is_dead_hand()));
            }
            Ok(())
        }
        MoveOutcome::NoMove => {
            println!("\n  {}", "No legal move.".yellow());
            Ok(())
        }
        MoveOutcome::Timeout => Err(OfcError::MoveTimeout {
            timeout_ms: settings.move_timeout().as_millis(),
        }),
    }
}

fn cmd_eval(
    cards: String,
    board: BoardArgs,
    discarded: String,
    fantasy: bool,
    limit: usize,
) -> OfcResult<()> {
    let settings = GameSettings {
        fantasy_mode: fantasy,
        ..GameSettings::default()
    };
    let state = build_state(&cards, &board, &discarded, settings)?;
    let actions = state.legal_actions();
    if actions.is_empty() {
        println!("\n  {}", "No legal move.".yellow());
        return Ok(());
    }

    let mut rows: Vec<_> = actions
        .into_iter()
        .filter_map(|a| {
            let score = evaluate_state(&state.apply_action(&a).ok()?);
            Some((a, score))
        })
        .collect();
    rows.sort_by(|a, b| b.1.total_cmp(&a.1));

    print_section("Board", &board_table(&state.board));
    print_section(
        &format!("{} legal moves, best {}", rows.len(), limit.min(rows.len())),
        &actions_table(&rows, limit),
    );
    Ok(())
}

fn cmd_score(board: BoardArgs) -> OfcResult<()> {
    let board = parse_board(&board)?;
    let state = GameState {
        board,
        ..GameState::default()
    };
    state.validate()?;

    print_section("Board", &board_table(&state.board));
    let dead = state.is_dead_hand();
    println!("{}", royalty_table(&state.royalties(), dead));
    if state.is_terminal() {
        let mark = |b: bool| if b { "yes".green().to_string() } else { "no".dimmed().to_string() };
        println!("  Payoff:          {:.0}", state.payoff()?);
        println!("  Fantasy entry:   {}", mark(qualifies_fantasy_entry(&state.board)));
        println!("  Fantasy repeat:  {}", mark(qualifies_fantasy_repeat(&state.board)));
    } else {
        println!("  {} free slots", state.board.total_free_slots());
    }
    Ok(())
}

fn cmd_play(settings: SettingsArgs, seed: Option<u64>, checkpoint: Option<PathBuf>) -> OfcResult<()> {
    let settings = settings.resolve()?;
    let agent = Agent::load(&settings, &store_at(checkpoint))?;
    let mut rng = rng_from(seed);

    // --fantasy starts in fantasy with the base deal
    let mut fantasy_deal = settings
        .fantasy_mode
        .then(|| settings.fantasy_type.cards_dealt(&[]));
    let mut hand = 1;
    loop {
        let hand_settings = GameSettings {
            fantasy_mode: fantasy_deal.is_some(),
            ..settings
        };
        match fantasy_deal {
            Some(n) => println!("\n{} {} (fantasy, {} cards)", "Hand".cyan().bold(), hand, n),
            None => println!("\n{} {}", "Hand".cyan().bold(), hand),
        }

        let state = play_hand(&agent, hand_settings, fantasy_deal, &mut rng)?;
        print_section("Final board", &board_table(&state.board));
        println!("{}", royalty_table(&state.royalties(), state.is_dead_hand()));

        fantasy_deal = state.next_fantasy_deal();
        match fantasy_deal {
            Some(n) => print_success(&format!("Fantasy earned: {} cards next hand", n)),
            None => return Ok(()),
        }
        hand += 1;
    }
}

/// Deals and plays one hand. A fantasy hand gets `fantasy_deal` cards at once.
fn play_hand(
    agent: &Agent,
    settings: GameSettings,
    fantasy_deal: Option<usize>,
    rng: &mut StdRng,
) -> OfcResult<GameState> {
    let mut deck = Deck::shuffled(rng);
    let mut state = GameState::new(settings);

    let mut street = 1;
    while !state.is_terminal() {
        let n = match (street, fantasy_deal) {
            (1, Some(n)) => n,
            (1, None) => INITIAL_DEAL,
            _ => STREET_DEAL,
        };
        let dealt: Vec<Card> = deck.deal(n.min(deck.len()))?;
        state = state.deal(&dealt);
        println!(
            "\n{} {}  dealt {}",
            "Street".cyan().bold(),
            street,
            cards_display(&dealt)
        );

        match select_move_within(agent, &state, settings.move_timeout()) {
            MoveOutcome::Move(action) => {
                println!("  {}", action_display(&action));
                state = state.apply_action(&action)?;
            }
            MoveOutcome::NoMove => {
                println!("  {}", "No legal move, stopping.".yellow());
                break;
            }
            MoveOutcome::Timeout => {
                return Err(OfcError::MoveTimeout {
                    timeout_ms: settings.move_timeout().as_millis(),
                })
            }
        }
        street += 1;
    }
    Ok(state)
}

fn cmd_progress(checkpoint: Option<PathBuf>) -> OfcResult<()> {
    let store = store_at(checkpoint);
    let mut trainer = Trainer::new(Default::default());
    if !trainer.load(&store)? {
        println!("\n  No saved progress at {}", store.path().display());
        return Ok(());
    }
    print_section(
        "Training progress",
        &format!(
            "  {}\n  iteration {} of {}, {} nodes",
            progress_bar(trainer.progress(), 30),
            trainer.current_iteration(),
            trainer.config().iterations,
            trainer.num_nodes()
        ),
    );
    Ok(())
}

fn cmd_reset(checkpoint: Option<PathBuf>) -> OfcResult<()> {
    let store = store_at(checkpoint);
    Trainer::new(Default::default()).save(&store)?;
    print_success(&format!("Training progress cleared at {}", store.path().display()));
    Ok(())
}

fn cmd_session(settings: SettingsArgs, checkpoint: Option<PathBuf>) -> OfcResult<()> {
    let settings = settings.resolve()?;
    let mut session = Session::new(settings, Box::new(store_at(checkpoint)))?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut reader = stdin.lock();
    let mut writer = stdout.lock();
    session.serve(&mut reader, &mut writer)
}
