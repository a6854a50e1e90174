//! Renderer module: split into focused submodules.
//!
//! - `header`: Logo, tab strip, machine summary
//! - `status_bar`: Bottom status bar with keybinds
//! - `monitor`: Machine list, live readings and alerts
//! - `sensor`: Editable snapshot with analysis and prediction results
//! - `chat`: Assistant transcript and input
//! - `manual`: Repair-manual Q&A
//! - `overlays`: Help popup
//! - `helpers`: Shared rendering utilities

mod chat;
mod header;
pub mod helpers;
mod manual;
mod monitor;
mod overlays;
mod sensor;
mod status_bar;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use super::state::{AppState, Tab};

/// Top-level render function. Delegates to sub-renderers per tab.
pub fn render(frame: &mut Frame, state: &AppState) {
    let size = frame.area();

    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header bar
            Constraint::Min(10),   // Content area
            Constraint::Length(1), // Status bar
        ])
        .split(size);

    header::render_header(frame, main_chunks[0], state);
    status_bar::render_status_bar(frame, main_chunks[2], state);

    match state.active_tab() {
        Tab::Monitor => monitor::render_monitor(frame, main_chunks[1], state),
        Tab::Sensor => sensor::render_sensor(frame, main_chunks[1], state),
        Tab::Chat => chat::render_chat(frame, main_chunks[1], state),
        Tab::Manual => manual::render_manual(frame, main_chunks[1], state),
    }

    if state.show_help {
        overlays::render_help_overlay(frame, size, state);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ratatui::{backend::TestBackend, Terminal};

    use super::*;
    use crate::alerts::AlertDetector;
    use crate::constants::DEFAULT_BACKEND_URL;
    use crate::models::ChannelRegistry;
    use crate::store::{MemoryBackend, SessionStore};
    use crate::ui::theme::Theme;

    fn draw_all_tabs(state: &mut AppState) {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        for tab in Tab::all() {
            state.set_tab(*tab);
            terminal.draw(|f| render(f, state)).unwrap();
        }
        state.show_help = true;
        terminal.draw(|f| render(f, state)).unwrap();
    }

    #[test]
    fn every_tab_renders_when_empty() {
        let session = SessionStore::new(Arc::new(MemoryBackend::new()));
        let detector = AlertDetector::new(Arc::new(ChannelRegistry::feed_mill()));
        let mut state =
            AppState::new(&session, detector, Theme::default(), DEFAULT_BACKEND_URL, 5, 50);
        draw_all_tabs(&mut state);
    }

    #[test]
    fn tiny_terminal_does_not_panic() {
        let session = SessionStore::new(Arc::new(MemoryBackend::new()));
        let detector = AlertDetector::new(Arc::new(ChannelRegistry::feed_mill()));
        let state =
            AppState::new(&session, detector, Theme::default(), DEFAULT_BACKEND_URL, 5, 50);
        let mut terminal = Terminal::new(TestBackend::new(20, 6)).unwrap();
        terminal.draw(|f| render(f, &state)).unwrap();
    }
}
