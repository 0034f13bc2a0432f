use clap::{error::ErrorKind, value_parser, CommandFactory, Parser, Subcommand, ValueEnum};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use itertools::Itertools;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::File,
    io::{self, stdin},
    path::{Path, PathBuf},
    time::Duration,
};

use quizbreak::{
    app::{App, AppParts},
    app_dirs::AppDirs,
    config::{FilePreferencesStore, Preferences, PreferencesStore},
    games::{GameKind, GameRegistry},
    history::HistoryDb,
    logging,
    player::{extract_video_id, Catalog, TimelinePlayer},
    runtime::{AppEvent, Clock, CrosstermEventSource, MonotonicClock, Runner, TICK_RATE_MS},
    speech::{CommandSpeaker, SilentSpeaker, Speaker},
    ui::draw,
};

/// video player that stops for short mini-game exercise breaks
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal video player for kids. Every few minutes of watching, the video pauses and a short run of mini-games (counting, letters, colors, words, syllables) has to be played before it continues."
)]
pub struct Cli {
    /// video to play: a YouTube link or an 11 character video id
    #[clap(short = 'v', long)]
    video: Option<String>,

    /// number of mini-games per exercise break
    #[clap(short = 'g', long, value_parser = value_parser!(u64).range(1..=20))]
    games: Option<u64>,

    /// minutes of video between exercise breaks
    #[clap(short = 'e', long, value_parser = value_parser!(u32).range(1..))]
    every: Option<u32>,

    /// only play these mini-games
    #[clap(long, value_enum, value_delimiter = ',')]
    only: Vec<GameArg>,

    /// do not speak; answers are signalled with the terminal bell
    #[clap(long)]
    no_speech: bool,

    /// preferences file to read and write
    #[clap(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// show past exercise breaks
    History {
        /// write every session as csv instead ("-" for stdout)
        #[clap(long, value_name = "PATH")]
        csv: Option<PathBuf>,

        /// number of sessions to list
        #[clap(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum GameArg {
    Numbers,
    Alphabet,
    Colors,
    Words,
    Syllables,
}

impl GameArg {
    fn as_kind(&self) -> GameKind {
        match self {
            GameArg::Numbers => GameKind::Numbers,
            GameArg::Alphabet => GameKind::Alphabet,
            GameArg::Colors => GameKind::ColorGhost,
            GameArg::Words => GameKind::WordMatching,
            GameArg::Syllables => GameKind::SyllableMatching,
        }
    }
}

impl Cli {
    /// Flags override the stored preferences and are saved with them
    fn apply(&self, prefs: &mut Preferences, video_id: Option<String>) {
        if let Some(games) = self.games {
            prefs.num_exercises = games as usize;
        }
        if let Some(minutes) = self.every {
            prefs.frequency_seconds = minutes.saturating_mul(60);
        }
        if !self.only.is_empty() {
            let only = self.only.iter().map(GameArg::as_kind).collect_vec();
            for kind in GameKind::ALL {
                prefs.selected_games.insert(kind, only.contains(&kind));
            }
        }
        if let Some(id) = video_id {
            if prefs.current_video_id.as_deref() != Some(id.as_str()) {
                prefs.current_video_id = Some(id);
                prefs.current_video_time = 0.0;
            }
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Some(path) = AppDirs::log_path() {
        if let Err(err) = logging::init(&path, logging::filter_from_env()) {
            eprintln!("quizbreak: logging disabled: {err}");
        }
    }

    if let Some(Command::History { csv, limit }) = &cli.command {
        return print_history(csv.as_deref(), *limit);
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let video_id = match cli.video.as_deref().map(extract_video_id).transpose() {
        Ok(id) => id,
        Err(err) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::InvalidValue, err).exit();
        }
    };

    let store = cli
        .config
        .as_ref()
        .map(FilePreferencesStore::with_path)
        .unwrap_or_default();
    let mut prefs = store.load();
    cli.apply(&mut prefs, video_id);

    let speaker: Box<dyn Speaker> = if prefs.speech_enabled && !cli.no_speech {
        Box::new(CommandSpeaker::new(prefs.speech_command.clone()))
    } else {
        Box::new(SilentSpeaker { bell: true })
    };
    let history = match HistoryDb::open_default() {
        Ok(db) => Some(db),
        Err(err) => {
            tracing::warn!("session history disabled: {err}");
            None
        }
    };

    let parts = AppParts {
        player: Box::new(TimelinePlayer::new()),
        speaker,
        registry: GameRegistry::standard()?,
        catalog: Catalog::load()?,
        store: Box::new(store),
        history,
        prefs,
    };
    tracing::info!("starting");

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(parts);
    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Some(summary) = app.last_summary() {
        tracing::info!(
            "last session {} after {}/{} games",
            summary.outcome,
            summary.completed,
            summary.game_count()
        );
    }

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        Duration::from_millis(TICK_RATE_MS),
    );
    let clock = MonotonicClock::new();

    loop {
        terminal.draw(|f| draw(app, f))?;

        match runner.step() {
            AppEvent::Key(key) => app.on_key(key, clock.now_ms()),
            AppEvent::Resize | AppEvent::Tick => {}
        }
        if app.should_quit() {
            break;
        }
        // extra ticks are no-ops, timers fire by due time
        app.on_tick(clock.now_ms());
    }

    Ok(())
}

fn print_history(csv: Option<&Path>, limit: usize) -> Result<(), Box<dyn Error>> {
    let db = HistoryDb::open_default()?;

    if let Some(path) = csv {
        if path == Path::new("-") {
            db.export_csv(io::stdout().lock())?;
        } else {
            let rows = db.export_csv(File::create(path)?)?;
            println!("wrote {rows} sessions to {}", path.display());
        }
        return Ok(());
    }

    let summary = db.summary()?;
    println!(
        "{} sessions ({} completed, {} abandoned), {} games played",
        summary.sessions, summary.completed, summary.abandoned, summary.games_played
    );
    for record in db.recent(limit)? {
        println!(
            "{}  {:<9} {:<9} {}/{}  {}",
            record.started_at.format("%Y-%m-%d %H:%M"),
            record.trigger,
            record.outcome.to_string(),
            record.completed,
            record.games.len(),
            record.games.iter().join(" ")
        );
    }

    Ok(())
}
