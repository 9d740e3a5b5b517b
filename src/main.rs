use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;

use iptv_lineup_lib::api::{ChannelService, CommandClient, RemoteRequest, RemoteResponse};
use iptv_lineup_lib::app::{App, AsyncAction, CurrentScreen};
use iptv_lineup_lib::config::AppConfig;
use iptv_lineup_lib::demo::MemoryChannelService;
use iptv_lineup_lib::handlers::async_actions::{flush_outbox, handle_async_action, run_request};
use iptv_lineup_lib::handlers::input::{handle_key_event, InputResult};
use iptv_lineup_lib::handlers::mouse::handle_mouse_event;
use iptv_lineup_lib::{logging, ui};

const DEMO_CHANNELS: usize = 500;

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ScreenArg {
    Channels,
    Lineup,
}

#[derive(clap::Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Channel-management backend URL (overrides the config file)
    #[arg(short, long)]
    backend: Option<String>,

    /// Use an in-memory demo lineup instead of a backend
    #[arg(long)]
    demo: bool,

    /// Check configuration and backend reachability, then exit
    #[arg(long)]
    check: bool,

    /// Screen to open on start
    #[arg(long, value_enum)]
    screen: Option<ScreenArg>,
}

type Tui = Terminal<CrosstermBackend<io::Stdout>>;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    use clap::Parser;
    let args = Args::parse();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Could not read config ({}), using defaults", e);
        AppConfig::default()
    });
    if let Some(url) = args.backend {
        config.backend_url = url;
    }

    let _log_guard = AppConfig::log_dir().and_then(|dir| match logging::init(&dir, &config.log_level) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Logging disabled: {}", e);
            None
        }
    });

    let (service, label): (Arc<dyn ChannelService>, String) = if args.demo {
        (Arc::new(MemoryChannelService::demo(DEMO_CHANNELS)), "demo".to_string())
    } else {
        (
            Arc::new(CommandClient::new(config.backend_url.clone(), config.request_timeout_secs)),
            config.backend_url.clone(),
        )
    };

    // -- CLI MODE --
    if args.check {
        if let Some(path) = AppConfig::config_path() {
            println!("Config: {}", path.display());
        }
        println!("Checking backend {}...", label);
        match run_request(service.as_ref(), RemoteRequest::ListChannels, config.request_timeout()).await {
            Ok(RemoteResponse::Channels(channels)) => {
                let enabled = channels.iter().filter(|c| c.enabled).count();
                println!("OK: {} channels ({} enabled)", channels.len(), enabled);
                return Ok(());
            }
            Ok(other) => anyhow::bail!("unexpected response: {:?}", other),
            Err(e) => {
                eprintln!("{}", e.diagnostics());
                anyhow::bail!(e.summary());
            }
        }
    }

    // -- TUI MODE (Default) --
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config, service, label);
    if let Some(ScreenArg::Lineup) = args.screen {
        app.switch_screen(CurrentScreen::TargetLineup);
    }

    let (tx, mut rx) = mpsc::channel::<AsyncAction>(64);
    let res = run_app(&mut terminal, &mut app, tx, &mut rx).await;

    // Restore Terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = ?err, "main loop failed");
        println!("{:?}", err);
    }

    Ok(())
}

async fn run_app(
    terminal: &mut Tui,
    app: &mut App,
    tx: mpsc::Sender<AsyncAction>,
    rx: &mut mpsc::Receiver<AsyncAction>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui::ui(f, app))?;

        // 1. Apply finished remote calls (non-blocking)
        while let Ok(action) = rx.try_recv() {
            handle_async_action(app, action);
        }

        // 2. Undo deadlines and debounced announcements
        app.tick(Instant::now());

        // 3. Dispatch whatever the list queued
        flush_outbox(app, &tx);

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) => {
                    if let InputResult::Quit = handle_key_event(app, key) {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => handle_mouse_event(app, mouse),
                _ => {}
            }
            flush_outbox(app, &tx);
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
