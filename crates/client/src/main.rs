mod tui;

use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use skirmish::net::{DEFAULT_HANDSHAKE_TIMEOUT_MS, DEFAULT_RECONNECT_DELAY_MS, DEFAULT_SERVER_URL};
use skirmish::{ClientConfig, ConnectionStatus, SessionClient, StoreChange};
use tui::TuiState;

#[derive(Parser)]
#[command(name = "skirmish")]
#[command(about = "Skirmish session client")]
struct Args {
    #[arg(short, long, default_value = DEFAULT_SERVER_URL)]
    server: String,

    #[arg(long, default_value_t = DEFAULT_RECONNECT_DELAY_MS)]
    reconnect_delay_ms: u64,

    #[arg(long, default_value_t = DEFAULT_HANDSHAKE_TIMEOUT_MS, help = "0 waits indefinitely")]
    handshake_timeout_ms: u64,

    #[arg(long)]
    headless: bool,
}

impl Args {
    fn config(&self) -> ClientConfig {
        ClientConfig {
            server_url: self.server.clone(),
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            handshake_timeout: (self.handshake_timeout_ms > 0)
                .then(|| Duration::from_millis(self.handshake_timeout_ms)),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let client = SessionClient::new(args.config());

    if args.headless {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        run_headless(client).await
    } else {
        run_with_tui(client).await?;
        Ok(())
    }
}

async fn run_headless(mut client: SessionClient) -> Result<()> {
    let server_url = client.config().server_url.clone();

    client
        .store_mut()
        .subscribe(|change: &StoreChange| log::info!("{}", tui::describe(change)));

    log::info!("Connecting to {}", server_url);
    client.connect();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = client.next_event() => {
                if client.status() == ConnectionStatus::Error && client.is_settled() {
                    client.shutdown();
                    bail!("could not connect to {}", server_url);
                }
            }
            result = &mut ctrl_c => {
                result?;
                break;
            }
        }
    }

    log::info!("Client shutting down");
    client.shutdown();

    Ok(())
}

async fn run_with_tui(mut client: SessionClient) -> io::Result<()> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let changes = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&changes);
    client
        .store_mut()
        .subscribe(move |change: &StoreChange| sink.borrow_mut().push(change.clone()));

    let mut tui_state = TuiState::new();
    tui_state.log_info(format!("Connecting to {}", client.config().server_url));
    client.connect();

    let mut ticker = tokio::time::interval(Duration::from_millis(50));
    let mut running = true;

    while running {
        for change in changes.borrow_mut().drain(..) {
            tui_state.record(&change);
        }

        terminal.draw(|frame| {
            tui::render(frame, &tui_state, &client);
        })?;

        tokio::select! {
            _ = client.next_event() => {}
            _ = ticker.tick() => {}
        }

        while event::poll(Duration::ZERO)? {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }

            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => running = false,
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    running = false;
                }
                KeyCode::Char('r') => {
                    if client.is_settled() {
                        tui_state.log_info(format!("Connecting to {}", client.config().server_url));
                        client.connect();
                    } else {
                        tui_state.log_warn("Connection already active");
                    }
                }
                KeyCode::Char('l') => client.store_mut().leave_session(),
                KeyCode::PageUp => tui_state.scroll_up(),
                KeyCode::PageDown => tui_state.scroll_down(),
                KeyCode::End => tui_state.scroll_to_bottom(),
                _ => {}
            }
        }
    }

    client.shutdown();

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;

    Ok(())
}
