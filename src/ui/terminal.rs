//! Terminal setup and teardown for the full-screen views, plus the
//! background task that forwards input events.

use std::{error::Error, io, time::Duration};

use ratatui::backend::CrosstermBackend;
use ratatui::crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::Terminal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub type AppTerminal = Terminal<CrosstermBackend<io::Stdout>>;

pub fn setup_terminal() -> Result<AppTerminal, Box<dyn Error>> {
    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;

    let terminal = Terminal::new(CrosstermBackend::new(stdout)).inspect_err(|_| {
        let _ = disable_raw_mode();
    })?;
    Ok(terminal)
}

pub fn restore_terminal(terminal: &mut AppTerminal) -> Result<(), Box<dyn Error>> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Poll crossterm on a background task and forward every event. The task
/// ends once the receiver is dropped.
pub fn spawn_event_reader() -> (mpsc::UnboundedReceiver<Event>, JoinHandle<()>) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(async move {
        loop {
            if let Ok(true) = event::poll(Duration::from_millis(10)) {
                match event::read() {
                    Ok(ev) => {
                        if event_tx.send(ev).is_err() {
                            break;
                        }
                    }
                    Err(_) => continue,
                }
            } else {
                if event_tx.is_closed() {
                    break;
                }
                tokio::task::yield_now().await;
            }
        }
    });
    (event_rx, handle)
}
