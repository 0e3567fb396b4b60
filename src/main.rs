use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
    tty::IsTty,
};
use fingers::{
    app::App,
    app_dirs::AppDirs,
    controller::InteractionController,
    runtime::{spawn_terminal_reader, AppEvent, ChannelEventSource, FixedTicker, Runner},
    settings::{GameSettings, QueryFileStore, SettingsStore},
    speech::{CommandEngine, SilentEngine, SpeechAnnouncer},
    ui,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    sync::{mpsc::Sender, Mutex},
    time::Duration,
};

const TICK_RATE_MS: u64 = 100;

/// finger-counting arithmetic drill with spoken questions
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Shows two hands with a random number of fingers, asks out loud how many there are, and checks the digits you type."
)]
pub struct Cli {
    /// settings as a query string, e.g. "leftBound=3&rightBound=2&speechRate=0.8&locale=1"
    #[clap(short = 'q', long)]
    query: Option<String>,

    /// do not speak, only log what would have been said
    #[clap(short = 'm', long)]
    mute: bool,

    /// espeak-compatible text-to-speech program to use
    #[clap(long, value_name = "PROGRAM")]
    tts: Option<String>,

    /// log file (defaults to the state directory)
    #[clap(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_tracing(cli.log_file.clone())?;

    let store = QueryFileStore::new();
    let settings = match &cli.query {
        Some(query) => GameSettings::from_query(query),
        None => store.load(),
    };
    tracing::info!(query = %settings.to_query(), path = %store.path().display(), "starting");

    let (tx, events) = ChannelEventSource::channel();
    let announcer = spawn_announcer(&cli, tx.clone());
    let mut app = App::new(
        InteractionController::new(settings, announcer),
        Box::new(store),
    );

    enable_raw_mode()?;
    let enhanced = supports_keyboard_enhancement().unwrap_or(false);

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    if enhanced {
        // Needed to tell held-key repeats apart from fresh presses.
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    spawn_terminal_reader(tx);
    let runner = Runner::new(
        events,
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let result = start_tui(&mut terminal, &mut app, &runner);

    if enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn spawn_announcer(cli: &Cli, tx: Sender<AppEvent>) -> SpeechAnnouncer {
    if cli.mute {
        return SpeechAnnouncer::spawn(SilentEngine, tx);
    }
    let engine = match &cli.tts {
        Some(program) => Some(CommandEngine::new(program.clone())),
        None => CommandEngine::detect(),
    };
    match engine {
        Some(engine) => {
            tracing::info!(program = engine.program(), "using text-to-speech program");
            SpeechAnnouncer::spawn(engine, tx)
        }
        None => {
            tracing::warn!("no text-to-speech program found, running muted");
            SpeechAnnouncer::spawn(SilentEngine, tx)
        }
    }
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<ChannelEventSource, FixedTicker>,
) -> Result<(), Box<dyn Error>> {
    loop {
        if app.take_dirty() {
            terminal.draw(|f| draw(app, f))?;
        }
        if !app.handle(runner.step()) {
            break;
        }
    }

    Ok(())
}

fn draw(app: &App, f: &mut Frame) {
    let area = f.area();
    f.render_widget(app, area);
    if let Some(editor) = &app.editor {
        f.set_cursor_position(ui::editor_cursor(editor, area));
    }
}

fn init_tracing(log_file: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    let Some(path) = log_file.or_else(AppDirs::log_path) else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let filter = tracing_subscriber::EnvFilter::try_from_env("FINGERS_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|error| format!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
