use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use std::io::{self, Stdout};
use std::path::Path;
use std::time::Duration;
use termseq::ui::{self, Action, SequencerView};
use termseq::{Config, MidirTransport, Sequencer};
use tracing::info;
use tracing_subscriber::EnvFilter;

const CONFIG_PATH: &str = "termseq.ron";
const REDRAW_INTERVAL: Duration = Duration::from_millis(50);

fn main() {
    if let Err(e) = run() {
        eprintln!("termseq: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default(Path::new(CONFIG_PATH))?;
    init_logging(&config)?;
    info!(name = %config.name, beat_ms = config.beat_duration_ms, "starting");

    let transport = MidirTransport::new(config.client_name.clone());
    let mut sequencer = Sequencer::new(config, Box::new(transport));

    let mut stdout = io::stdout();
    terminal::enable_raw_mode()?;
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        cursor::Hide
    )?;

    let result = event_loop(&sequencer, &mut stdout);

    execute!(
        stdout,
        cursor::Show,
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal::disable_raw_mode()?;
    sequencer.shutdown();

    Ok(result?)
}

fn event_loop(sequencer: &Sequencer, stdout: &mut Stdout) -> io::Result<()> {
    let view = SequencerView::new();

    loop {
        if event::poll(REDRAW_INTERVAL)? {
            match ui::action_for(&event::read()?) {
                Some(Action::TogglePlay) => sequencer.toggle(),
                Some(Action::Stop) => sequencer.stop(),
                Some(Action::Quit) => return Ok(()),
                None => {}
            }
        }

        let (width, _) = terminal::size()?;
        view.draw(stdout, &sequencer.snapshot(), width)?;
    }
}

/// Logs go to the configured file since the terminal belongs to the view.
fn init_logging(config: &Config) -> io::Result<()> {
    let Some(path) = &config.log_file else {
        return Ok(());
    };

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
