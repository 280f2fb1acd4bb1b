//! Keyboard input handling for the TUI.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::runtime::App;

/// Maps a key event to an application action.
///
/// Guards on [`KeyEventKind::Press`] to avoid double-fire on some terminals.
pub fn handle_key(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit = true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit = true,
        KeyCode::Char(' ') => app.toggle_streaming(),
        KeyCode::Char('e') => app.toggle_emergency(),
        KeyCode::Char('f') => app.inject_fault(),
        KeyCode::Char('o') => app.cycle_objective(),
        KeyCode::Char('a') => app.acknowledge_all(),
        KeyCode::Char('+' | '=') | KeyCode::Right => app.speed_up(),
        KeyCode::Char('-') | KeyCode::Left => app.speed_down(),
        KeyCode::Char('1') => app.switch_preset("baseline"),
        KeyCode::Char('2') => app.switch_preset("aging_fleet"),
        KeyCode::Char('3') => app.switch_preset("large_site"),
        KeyCode::Char('r') => app.restart(),
        _ => {}
    }
}
