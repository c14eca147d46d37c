//! Terminal setup and the application event stream.

use std::io::{self, Stderr};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{
        DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture, Event,
        EventStream, KeyEvent, KeyEventKind, MouseEvent,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

pub type Tui = Terminal<CrosstermBackend<Stderr>>;

/// Interval between ticks; drives the loading animation and request polling.
const TICK_MS: u64 = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Paste(String),
    Resize(u16, u16),
    Tick,
}

/// Map a raw terminal event to what the handler cares about. Key releases and
/// repeats are dropped; so are focus changes.
pub fn translate(event: Event) -> Option<AppEvent> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => Some(AppEvent::Key(key)),
        Event::Mouse(mouse) => Some(AppEvent::Mouse(mouse)),
        Event::Paste(text) => Some(AppEvent::Paste(text)),
        Event::Resize(cols, rows) => Some(AppEvent::Resize(cols, rows)),
        _ => None,
    }
}

/// Terminal input and ticks merged into one channel by a background task.
/// The task stops when the handler is dropped or the terminal stream ends.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<AppEvent>,
    pump: JoinHandle<()>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let pump = tokio::spawn(pump(tx, Duration::from_millis(TICK_MS)));
        Self { rx, pump }
    }

    /// `None` once the terminal stream has closed.
    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventHandler {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

async fn pump(tx: mpsc::UnboundedSender<AppEvent>, tick: Duration) {
    let mut terminal_events = EventStream::new();
    let mut ticks = tokio::time::interval(tick);
    // A slow draw should not be followed by a burst of catch-up ticks.
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let event = tokio::select! {
            _ = ticks.tick() => Some(AppEvent::Tick),
            polled = terminal_events.next() => match polled {
                Some(Ok(event)) => translate(event),
                Some(Err(e)) => {
                    warn!(error = %e, "terminal event stream error");
                    None
                }
                None => break,
            },
        };

        if let Some(event) = event {
            if tx.send(event).is_err() {
                break;
            }
        }
    }
    debug!("event pump stopped");
}

/// Raw mode on stderr, alternate screen, mouse and bracketed paste.
pub fn init() -> Result<Tui> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    execute!(io::stderr(), EnterAlternateScreen, EnableMouseCapture, EnableBracketedPaste)?;
    Terminal::new(CrosstermBackend::new(io::stderr())).context("Failed to create terminal")
}

/// Undo `init`. Safe to call more than once.
pub fn restore() -> Result<()> {
    execute!(io::stderr(), DisableBracketedPaste, DisableMouseCapture, LeaveAlternateScreen)?;
    disable_raw_mode().context("Failed to disable raw mode")
}

/// Put the terminal back before a panic message is printed.
pub fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore();
        previous(info);
    }));
}
