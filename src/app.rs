//! Application struct and event loop.
//!
//! Owns the terminal, state, refresh scheduler and backend channels.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
        MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::Backend, backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::alerts::AlertDetector;
use crate::config::Config;
use crate::constants::*;
use crate::error::FetchError;
use crate::models::{Reading, UploadInfo};
use crate::monitor::{
    AnalysisResponse, BackendClient, ChatResponse, ManualResponse, MonitorEvent,
    PredictionResponse, ReadingSource, RefreshScheduler,
};
use crate::store::SessionStore;
use crate::ui::{self, AppState, Tab, TextInput, Theme};

/// Results of one-shot backend calls, sent back from spawned tasks.
#[derive(Debug)]
pub enum BackendEvent {
    Machines(Result<Vec<String>, FetchError>),
    /// Carries the row it was requested for so a result for an edited row
    /// can be discarded.
    Analysis {
        row: Reading,
        result: Result<AnalysisResponse, FetchError>,
    },
    Prediction {
        row: Reading,
        result: Result<PredictionResponse, FetchError>,
    },
    /// Chat and manual replies carry the request id they answer.
    Chat {
        request: u64,
        result: Result<ChatResponse, FetchError>,
    },
    Manual {
        request: u64,
        result: Result<ManualResponse, FetchError>,
    },
}

/// Main application struct.
pub struct App {
    state: AppState,
    client: Arc<BackendClient>,
    scheduler: RefreshScheduler<BackendClient>,
    monitor_rx: mpsc::UnboundedReceiver<MonitorEvent>,
    backend_tx: mpsc::UnboundedSender<BackendEvent>,
    backend_rx: mpsc::UnboundedReceiver<BackendEvent>,

    machine_list_interval: Duration,
    last_machine_fetch: Option<Instant>,
    initial_machine: Option<String>,
}

impl App {
    pub fn new(config: &Config, session: &SessionStore) -> Result<Self> {
        let client = Arc::new(
            BackendClient::new(&config.backend_url).context("creating backend client")?,
        );
        let detector = AlertDetector::new(Arc::clone(&config.channels));
        let (scheduler, monitor_rx) = RefreshScheduler::new(
            Arc::clone(&client),
            detector.clone(),
            Duration::from_secs(config.live_refresh_secs),
            config.recent_count,
        );
        let (backend_tx, backend_rx) = mpsc::unbounded_channel();

        let theme = Theme::by_name(&config.theme).unwrap_or_else(|| {
            warn!(theme = %config.theme, "unknown theme, using default");
            Theme::default()
        });

        let state = AppState::new(
            session,
            detector,
            theme,
            client.base_url(),
            config.live_refresh_secs,
            config.max_chat_history,
        );

        Ok(Self {
            state,
            client,
            scheduler,
            monitor_rx,
            backend_tx,
            backend_rx,
            machine_list_interval: Duration::from_secs(config.dashboard_refresh_secs),
            last_machine_fetch: None,
            initial_machine: config.initial_machine.clone(),
        })
    }

    /// Run the main event loop. Returns when the user quits.
    pub async fn run(&mut self) -> Result<()> {
        // Terminal init
        enable_raw_mode().context("enabling raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        // Cleanup runs on every exit path
        self.state.monitor.deselect();
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        info!("zerobreak stopped");
        result
    }

    fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        self.fetch_machines();
        if let Some(machine) = self.initial_machine.take() {
            self.watch(&machine);
        }

        loop {
            terminal.draw(|frame| ui::render(frame, &self.state))?;

            self.drain_monitor_events();
            self.drain_backend_events();

            if event::poll(Duration::from_millis(EVENT_POLL_MS))? {
                match event::read()? {
                    Event::Key(key) => {
                        if self.handle_key(key) {
                            break; // quit requested
                        }
                    }
                    Event::Mouse(mouse) => match mouse.kind {
                        MouseEventKind::ScrollUp => self.state.scroll_up(),
                        MouseEventKind::ScrollDown => self.state.scroll_down(),
                        _ => {}
                    },
                    _ => {}
                }
            }

            self.tick_refresh();
        }
        Ok(())
    }

    // ── Channel draining ─────────────────────────────────────────

    fn drain_monitor_events(&mut self) {
        while let Ok(event) = self.monitor_rx.try_recv() {
            self.state.monitor.apply(event);
        }
    }

    fn drain_backend_events(&mut self) {
        while let Ok(event) = self.backend_rx.try_recv() {
            self.apply_backend_event(event);
        }
    }

    fn apply_backend_event(&mut self, event: BackendEvent) {
        let state = &mut self.state;
        match event {
            BackendEvent::Machines(Ok(machines)) => state.set_machines(machines),
            BackendEvent::Machines(Err(e)) => {
                warn!(error = %e, "machine list fetch failed");
                state.machines_loading = false;
                state.machines_error = Some(e.to_string());
            }
            BackendEvent::Analysis { row, result } => {
                state.sensor.analyzing = false;
                if state.sensor.row() != Some(&row) {
                    return;
                }
                match result {
                    Ok(analysis) => {
                        state.sensor.last_error = None;
                        state.sensor.analysis = Some(analysis);
                    }
                    Err(e) => state.sensor.last_error = Some(format!("Analysis failed: {}", e)),
                }
            }
            BackendEvent::Prediction { row, result } => {
                state.sensor.predicting = false;
                if state.sensor.row() != Some(&row) {
                    return;
                }
                match result {
                    Ok(prediction) => state.sensor.prediction = Some(prediction),
                    Err(e) => state.sensor.last_error = Some(format!("Prediction failed: {}", e)),
                }
            }
            BackendEvent::Chat { request, result } => {
                let saved = match result {
                    Ok(r) => state.chat.add_assistant_message(request, &r.response, r.tools_used),
                    Err(e) => state.chat.add_error(request, &e.to_string()),
                };
                state.chat_scroll = 0;
                state.report_save(saved);
            }
            BackendEvent::Manual { request, result } => {
                let saved = match result {
                    Ok(r) => state.manual.resolve(request, &r.answer),
                    Err(e) => state.manual.fail(request, &e.to_string()),
                };
                state.manual_scroll = 0;
                state.report_save(saved);
            }
        }
    }

    // ── Backend dispatch ─────────────────────────────────────────

    fn fetch_machines(&mut self) {
        if self.state.machines_loading {
            return;
        }
        self.state.machines_loading = true;
        self.last_machine_fetch = Some(Instant::now());
        let client = Arc::clone(&self.client);
        let tx = self.backend_tx.clone();
        tokio::spawn(async move {
            let result = client.fetch_entity_list().await;
            let _ = tx.send(BackendEvent::Machines(result));
        });
    }

    fn dispatch_analysis(&mut self) {
        let Some(row) = self.state.sensor.row().cloned() else {
            self.state.set_status("Load a snapshot first".to_string());
            return;
        };
        if self.state.sensor.analyzing {
            return;
        }
        self.state.sensor.analyzing = true;
        self.state.sensor.last_error = None;
        let client = Arc::clone(&self.client);
        let tx = self.backend_tx.clone();
        tokio::spawn(async move {
            let result = client.submit_analysis(&row).await;
            let _ = tx.send(BackendEvent::Analysis { row, result });
        });
    }

    fn dispatch_prediction(&mut self) {
        let Some(row) = self.state.sensor.row().cloned() else {
            self.state.set_status("Load a snapshot first".to_string());
            return;
        };
        if self.state.sensor.predicting {
            return;
        }
        self.state.sensor.predicting = true;
        let client = Arc::clone(&self.client);
        let tx = self.backend_tx.clone();
        tokio::spawn(async move {
            let result = client.submit_prediction(&row).await;
            let _ = tx.send(BackendEvent::Prediction { row, result });
        });
    }

    fn dispatch_chat(&mut self) {
        if self.state.chat.is_pending() {
            self.state.set_status("Waiting for the previous reply".to_string());
            return;
        }
        let Some(message) = self.state.chat_input.submit() else {
            return;
        };
        let saved = self.state.chat.add_user_message(&message);
        self.state.report_save(saved);
        self.state.chat_scroll = 0;
        let Some(request) = self.state.chat.pending_request() else {
            return;
        };

        let client = Arc::clone(&self.client);
        let tx = self.backend_tx.clone();
        tokio::spawn(async move {
            let result = client.submit_chat(&message).await;
            let _ = tx.send(BackendEvent::Chat { request, result });
        });
    }

    fn dispatch_manual(&mut self) {
        if self.state.manual.is_pending() {
            self.state.set_status("Waiting for the previous answer".to_string());
            return;
        }
        let Some(question) = self.state.manual_input.submit() else {
            return;
        };
        let saved = self.state.manual.ask(&question);
        self.state.report_save(saved);
        self.state.manual_scroll = 0;
        let Some(request) = self.state.manual.pending_request() else {
            return;
        };

        let client = Arc::clone(&self.client);
        let tx = self.backend_tx.clone();
        tokio::spawn(async move {
            let result = client.ask_repair_manual(&question).await;
            let _ = tx.send(BackendEvent::Manual { request, result });
        });
    }

    // ── Monitor actions ──────────────────────────────────────────

    fn watch(&mut self, machine: &str) {
        self.state.monitor.select(&self.scheduler, machine);
        if let Some(i) = self.state.machines.iter().position(|m| m == machine) {
            self.state.machine_cursor = i;
        }
    }

    /// Copy the live reading into the Sensor tab.
    fn load_snapshot_from_monitor(&mut self) {
        let Some(reading) = self.state.monitor.reading().cloned() else {
            self.state.set_status("No reading to copy yet".to_string());
            return;
        };
        let info = UploadInfo {
            filename: format!("live:{}", reading.entity),
            total_rows: 1,
            machines: vec![reading.entity.clone()],
            date_range: reading.timestamp.clone(),
        };
        let saved = self.state.sensor.load_snapshot(reading, info);
        self.state.report_save(saved);
        self.state.set_tab(Tab::Sensor);
    }

    // ── Keyboard handling ────────────────────────────────────────

    /// Handle a key event. Returns `true` if the app should quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }

        // Help overlay: any key closes it
        if self.state.show_help {
            self.state.show_help = false;
            return false;
        }

        // Cell edit mode
        if self.state.sensor.editing.is_some() {
            return self.handle_key_editing(key);
        }

        // Text tabs
        if self.state.active_tab().takes_text() {
            return self.handle_key_typing(key);
        }

        self.handle_key_normal(key)
    }

    fn handle_key_editing(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => self.state.sensor.cancel_edit(),
            KeyCode::Enter => match self.state.sensor.commit_edit() {
                Ok(Some(value)) => self.state.set_status(format!("Value set to {}", value)),
                Ok(None) => {}
                Err(e) => self.state.set_status(e.to_string()),
            },
            _ => {
                if let Some(input) = self.state.sensor.editing.as_mut() {
                    edit_input(input, key);
                }
            }
        }
        false
    }

    fn handle_key_typing(&mut self, key: KeyEvent) -> bool {
        let tab = self.state.active_tab();
        match key.code {
            KeyCode::Esc => self.state.set_tab(Tab::Monitor),
            KeyCode::Tab => self.state.next_tab(),
            KeyCode::BackTab => self.state.prev_tab(),
            KeyCode::Up => self.state.scroll_up(),
            KeyCode::Down => self.state.scroll_down(),
            KeyCode::PageUp => self.state.page_up(),
            KeyCode::PageDown => self.state.page_down(),
            KeyCode::Enter => match tab {
                Tab::Chat => self.dispatch_chat(),
                _ => self.dispatch_manual(),
            },
            KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                let cleared = match tab {
                    Tab::Chat => {
                        self.state.chat_input.clear();
                        self.state.chat_scroll = 0;
                        self.state.chat.clear()
                    }
                    _ => {
                        self.state.manual_input.clear();
                        self.state.manual_scroll = 0;
                        self.state.manual.reset()
                    }
                };
                self.state.report_save(cleared);
            }
            _ => {
                let input = match tab {
                    Tab::Chat => &mut self.state.chat_input,
                    _ => &mut self.state.manual_input,
                };
                edit_input(input, key);
            }
        }
        false
    }

    /// Handle keys on the Monitor and Sensor tabs. Returns `true` if the app
    /// should quit.
    fn handle_key_normal(&mut self, key: KeyEvent) -> bool {
        let tab = self.state.active_tab();
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => return true,

            // Tab navigation
            KeyCode::Tab => self.state.next_tab(),
            KeyCode::BackTab => self.state.prev_tab(),
            KeyCode::Char('1') => self.state.set_tab(Tab::Monitor),
            KeyCode::Char('2') => self.state.set_tab(Tab::Sensor),
            KeyCode::Char('3') => self.state.set_tab(Tab::Chat),
            KeyCode::Char('4') => self.state.set_tab(Tab::Manual),
            KeyCode::Char('?') => self.state.show_help = true,
            KeyCode::Char('T') => {
                self.state.theme = self.state.theme.next_builtin();
                self.state.set_status(format!("Theme: {}", self.state.theme.name));
            }

            // Scrolling
            KeyCode::Up | KeyCode::Char('k') => self.state.scroll_up(),
            KeyCode::Down | KeyCode::Char('j') => self.state.scroll_down(),
            KeyCode::PageUp => self.state.page_up(),
            KeyCode::PageDown => self.state.page_down(),

            // Monitor
            KeyCode::Enter if tab == Tab::Monitor => {
                if let Some(machine) = self.state.machine_under_cursor().map(str::to_string) {
                    self.watch(&machine);
                }
            }
            KeyCode::Char('r') if tab == Tab::Monitor => {
                if self.state.monitor.is_running() {
                    self.state.monitor.refresh_now();
                } else {
                    self.state.set_status("Not monitoring a machine".to_string());
                }
            }
            KeyCode::Char('x') if tab == Tab::Monitor => self.state.monitor.deselect(),
            KeyCode::Char('m') if tab == Tab::Monitor => self.fetch_machines(),
            KeyCode::Char('l') if tab == Tab::Monitor => self.load_snapshot_from_monitor(),

            // Sensor
            KeyCode::Char('e') | KeyCode::Enter if tab == Tab::Sensor => {
                self.state.sensor.begin_edit();
            }
            KeyCode::Char('a') if tab == Tab::Sensor => self.dispatch_analysis(),
            KeyCode::Char('p') if tab == Tab::Sensor => self.dispatch_prediction(),

            _ => {}
        }
        false
    }

    // ── Periodic work ────────────────────────────────────────────

    fn tick_refresh(&mut self) {
        self.state.tick();
        let due = self
            .last_machine_fetch
            .map_or(true, |t| t.elapsed() >= self.machine_list_interval);
        if due {
            self.fetch_machines();
        }
    }
}

/// Shared line-editing keys for every text input.
fn edit_input(input: &mut TextInput, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => input.backspace(),
        KeyCode::Left => input.left(),
        KeyCode::Right => input.right(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => input.insert_char(c),
        _ => {}
    }
}
