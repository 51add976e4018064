mod script;

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use gridmerge_common::{GameConfig, GridCoord};
use gridmerge_input::{FeedHandle, KeyHandle};
use gridmerge_persist::{FileBackend, SaveSlot};
use gridmerge_render::{TextPresenter, status_line};
use gridmerge_session::{GameSession, handle_factory};
use gridmerge_tools::WorldInspector;
use tracing_subscriber::EnvFilter;

use crate::script::{ScriptCommand, parse_line};

#[derive(Parser)]
#[command(name = "gridmerge-cli", about = "Play and inspect gridmerge saves from the terminal")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML file overriding the default game constants
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding save blobs
    #[arg(long, global = true, default_value = ".gridmerge")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version, constants and save status
    Info,
    /// Run a play script against the saved game
    Play {
        /// Script file, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        script: String,
    },
    /// Summarize the saved game, or one cell of it
    Inspect {
        /// Row of a cell to inspect
        #[arg(requires = "j", allow_negative_numbers = true)]
        i: Option<i32>,
        /// Column of a cell to inspect
        #[arg(allow_negative_numbers = true)]
        j: Option<i32>,
    },
    /// Delete the save and start over
    Reset,
}

/// Host-side input wiring plus the session it drives.
struct Game {
    session: GameSession<TextPresenter>,
    feed: FeedHandle,
    keys: KeyHandle,
    clock: Instant,
}

impl Game {
    fn open(config: GameConfig, data_dir: &Path) -> anyhow::Result<Self> {
        let backend = FileBackend::open(data_dir)
            .with_context(|| format!("opening data dir {}", data_dir.display()))?;
        let slot = SaveSlot::new(Box::new(backend), config.save_key.clone());
        let feed = FeedHandle::new();
        let keys = KeyHandle::new();
        let session = GameSession::new(config, slot, TextPresenter::new())?
            .with_movement_factory(handle_factory(feed.clone(), keys.clone()));
        let mut game = Self {
            session,
            feed,
            keys,
            clock: Instant::now(),
        };
        game.report();
        Ok(game)
    }

    fn run(&mut self, command: ScriptCommand) -> anyhow::Result<()> {
        match command {
            ScriptCommand::Move { direction, steps } => {
                if self.session.player().mode.uses_geolocation() {
                    println!("Manual movement is off; use `mode manual` first.");
                    return Ok(());
                }
                let interval = self.session.config().key_repeat();
                self.keys.key_down(direction);
                for _ in 0..steps {
                    self.tick(interval);
                }
                self.keys.key_up(direction);
            }
            ScriptCommand::Fix(position) => {
                if !self.feed.push_fix(position) {
                    println!("Position feed is not listening; use `mode geo` first.");
                    return Ok(());
                }
                self.tick(Duration::ZERO);
            }
            ScriptCommand::Interact(coord) => {
                if let Some(outcome) = self.session.interact(coord) {
                    tracing::info!(%coord, ?outcome, "interaction");
                }
            }
            ScriptCommand::Here => {
                let player = self.session.player();
                println!("{}", status_line(player.held, player.position));
                let cell = self.session.state().player_cell();
                println!("{}", WorldInspector::inspect_cell(&self.session.state().world, cell));
            }
            ScriptCommand::View => self.draw(),
            ScriptCommand::Follow(on) => self.session.set_follow_player(on),
            ScriptCommand::Mode(mode) => self.session.set_movement_mode(mode),
            ScriptCommand::Save => self.session.save()?,
            ScriptCommand::Reset => self.session.reset(),
        }
        self.report();
        Ok(())
    }

    /// Advance the virtual clock and pump movement once.
    fn tick(&mut self, by: Duration) {
        self.session.pump(self.clock);
        self.clock += by;
    }

    fn draw(&self) {
        let (rows, cols) = self.session.config().view_span;
        let player = self.session.state().player_cell();
        print!("{}", self.session.presenter().draw(player, rows, cols, player));
        let p = self.session.player();
        println!("{}", status_line(p.held, p.position));
    }

    fn report(&mut self) {
        for note in self.session.drain_notifications() {
            println!("! {note}");
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<GameConfig> {
    match path {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(GameConfig::default()),
    }
}

fn play(config: GameConfig, data_dir: &Path, script: &str) -> anyhow::Result<()> {
    let reader: Box<dyn BufRead> = if script == "-" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let file = std::fs::File::open(script)
            .with_context(|| format!("opening script {script}"))?;
        Box::new(BufReader::new(file))
    };

    let mut game = Game::open(config, data_dir)?;
    game.session.start_movement();
    game.report();
    for (n, line) in reader.lines().enumerate() {
        let line = line.context("reading script")?;
        let command = parse_line(&line).with_context(|| format!("script line {}", n + 1))?;
        if let Some(command) = command {
            game.run(command)?;
        }
    }
    game.session.shutdown();
    game.report();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Info => {
            println!("gridmerge-cli v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "grid: origin={:.6},{:.6} tile={}",
                config.origin.lat, config.origin.lng, config.tile_size
            );
            println!(
                "rules: reach={} target={} spawn={} neighborhood={}",
                config.interaction_radius,
                config.target_token,
                config.spawn_probability,
                config.neighborhood_radius
            );
            let backend = FileBackend::open(&cli.data_dir)
                .with_context(|| format!("opening data dir {}", cli.data_dir.display()))?;
            match backend.manifest().get(&config.save_key) {
                Some(entry) => println!(
                    "save: {} key={} bytes={}",
                    cli.data_dir.display(),
                    entry.key,
                    entry.bytes
                ),
                None => println!("save: {} key={} (none)", cli.data_dir.display(), config.save_key),
            }
            if let Err(e) = backend.verify_integrity() {
                println!("integrity: FAILED ({e})");
            }
        }
        Commands::Play { script } => play(config, &cli.data_dir, &script)?,
        Commands::Inspect { i, j } => {
            let mut game = Game::open(config, &cli.data_dir)?;
            let state = game.session.state();
            println!(
                "{}",
                WorldInspector::summary(state, game.session.cache().len())
            );
            if let (Some(i), Some(j)) = (i, j) {
                println!(
                    "{}",
                    WorldInspector::inspect_cell(&state.world, GridCoord::new(i, j))
                );
            } else {
                for coord in WorldInspector::list_overrides(&state.world) {
                    println!("  {}", WorldInspector::inspect_cell(&state.world, coord));
                }
            }
            game.report();
        }
        Commands::Reset => {
            let mut game = Game::open(config, &cli.data_dir)?;
            game.session.reset();
            game.report();
            println!("Save cleared.");
        }
    }

    Ok(())
}
