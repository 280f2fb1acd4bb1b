//! Live terminal dashboard over a decision core.
//!
//! Feature-gated behind `tui`. Launch with `--tui` on the CLI.

mod controls;
mod layout;
/// Dashboard application state.
pub mod runtime;
mod style;

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::config::EmsConfig;
use runtime::App;

type Term = Terminal<CrosstermBackend<Stdout>>;

/// Launches the dashboard for the given configuration.
///
/// The terminal is restored before returning, whether or not the loop failed.
///
/// # Errors
///
/// Returns an `io::Error` if the terminal cannot be set up or drawing fails.
pub fn run(config: EmsConfig, preset: &str) -> io::Result<()> {
    let mut terminal = enter()?;
    let mut app = App::new(config, preset);
    let result = event_loop(&mut terminal, &mut app);
    leave(&mut terminal);
    result
}

/// Raw mode plus alternate screen. Undoes raw mode if a later step fails.
fn enter() -> io::Result<Term> {
    enable_raw_mode()?;
    let attempt = execute!(io::stdout(), EnterAlternateScreen)
        .and_then(|()| Terminal::new(CrosstermBackend::new(io::stdout())));
    if attempt.is_err() {
        let _ = disable_raw_mode();
    }
    attempt
}

fn leave(terminal: &mut Term) {
    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let _ = terminal.show_cursor();
}

/// Draws, waits for input until the next tick is due, then ticks.
fn event_loop(terminal: &mut Term, app: &mut App) -> io::Result<()> {
    while !app.quit {
        terminal.draw(|frame| layout::render(frame, app))?;
        app.on_frame();

        let period = Duration::from_millis(app.tick_interval_ms());
        let wait = (app.last_tick + period).saturating_duration_since(Instant::now());
        if event::poll(wait)? {
            if let Event::Key(key) = event::read()? {
                controls::handle_key(app, key);
            }
        }

        if !app.quit && app.last_tick.elapsed() >= period {
            app.tick();
            app.last_tick = Instant::now();
        }
    }
    Ok(())
}
