use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::ai::{Conversation, ManualLog};
use crate::alerts::AlertDetector;
use crate::constants::*;
use crate::error::MonitorResult;
use crate::models::{AlertReport, ChannelStatus, Severity};
use crate::monitor::MonitorState;
use crate::store::{Persisted, SessionStore};

use super::input::TextInput;
use super::sensor::SensorView;
use super::theme::Theme;

const ACTIVE_TAB_KEY: &str = "active_tab";

/// Which tab is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Monitor,
    Sensor,
    Chat,
    Manual,
}

impl Tab {
    pub fn all() -> &'static [Tab] {
        &[Tab::Monitor, Tab::Sensor, Tab::Chat, Tab::Manual]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tab::Monitor => "1 Monitor",
            Tab::Sensor => "2 Sensor",
            Tab::Chat => "3 Chat",
            Tab::Manual => "4 Manual",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Tab::Monitor => 0,
            Tab::Sensor => 1,
            Tab::Chat => 2,
            Tab::Manual => 3,
        }
    }

    /// Tabs where printable keys go to a text input.
    pub fn takes_text(&self) -> bool {
        matches!(self, Tab::Chat | Tab::Manual)
    }
}

/// All mutable UI state. Rendered every frame by `ui::render`.
pub struct AppState {
    tab: Persisted<Tab>,
    pub theme: Theme,
    pub tick_count: u64,
    pub status_message: Option<(String, Instant)>,
    pub backend_url: String,
    pub show_help: bool,
    pub detector: AlertDetector,

    // ── Monitor ──────────────────────────────────────────────
    pub machines: Vec<String>,
    pub machines_loading: bool,
    pub machines_error: Option<String>,
    /// Cursor in the machine list.
    pub machine_cursor: usize,
    pub monitor: MonitorState,
    pub refresh_secs: u64,

    // ── Sensor ───────────────────────────────────────────────
    pub sensor: SensorView,

    // ── Chat ─────────────────────────────────────────────────
    pub chat: Conversation,
    pub chat_input: TextInput,
    /// Lines scrolled up from the bottom; 0 follows new messages.
    pub chat_scroll: usize,

    // ── Manual ───────────────────────────────────────────────
    pub manual: ManualLog,
    pub manual_input: TextInput,
    pub manual_scroll: usize,
}

impl AppState {
    pub fn new(
        session: &SessionStore,
        detector: AlertDetector,
        theme: Theme,
        backend_url: &str,
        refresh_secs: u64,
        max_chat_history: usize,
    ) -> Self {
        Self {
            tab: Persisted::load(session.namespace(NS_APP), ACTIVE_TAB_KEY, Tab::default()),
            theme,
            tick_count: 0,
            status_message: None,
            backend_url: backend_url.to_string(),
            show_help: false,
            detector,
            machines: Vec::new(),
            machines_loading: false,
            machines_error: None,
            machine_cursor: 0,
            monitor: MonitorState::new(),
            refresh_secs,
            sensor: SensorView::load(session.namespace(NS_SENSOR)),
            chat: Conversation::load(session.namespace(NS_CHAT), max_chat_history),
            chat_input: TextInput::new(),
            chat_scroll: 0,
            manual: ManualLog::load(session.namespace(NS_MANUAL)),
            manual_input: TextInput::new(),
            manual_scroll: 0,
        }
    }

    pub fn active_tab(&self) -> Tab {
        *self.tab.get()
    }

    pub fn set_tab(&mut self, tab: Tab) {
        if tab != self.active_tab() {
            let saved = self.tab.set(tab);
            self.report_save(saved);
        }
    }

    pub fn next_tab(&mut self) {
        let tabs = Tab::all();
        self.set_tab(tabs[(self.active_tab().index() + 1) % tabs.len()]);
    }

    pub fn prev_tab(&mut self) {
        let tabs = Tab::all();
        self.set_tab(tabs[(self.active_tab().index() + tabs.len() - 1) % tabs.len()]);
    }

    pub fn set_status(&mut self, msg: String) {
        self.status_message = Some((msg, Instant::now()));
    }

    /// Put a failed session write on the status bar.
    pub fn report_save(&mut self, result: MonitorResult<()>) {
        if let Err(e) = result {
            self.set_status(format!("Could not save: {}", e));
        }
    }

    pub fn tick(&mut self) {
        self.tick_count = self.tick_count.wrapping_add(1);
    }

    // ── Monitor helpers ──────────────────────────────────────

    pub fn machine_under_cursor(&self) -> Option<&str> {
        self.machines.get(self.machine_cursor).map(String::as_str)
    }

    /// Replace the machine list, keeping the cursor on the same machine
    /// when it is still present.
    pub fn set_machines(&mut self, machines: Vec<String>) {
        let current = self.machine_under_cursor().map(str::to_string);
        self.machines = machines;
        self.machine_cursor = current
            .and_then(|m| self.machines.iter().position(|x| *x == m))
            .unwrap_or(0)
            .min(self.machines.len().saturating_sub(1));
        self.machines_loading = false;
        self.machines_error = None;
    }

    pub fn cursor_up(&mut self) {
        self.machine_cursor = self.machine_cursor.saturating_sub(1);
    }

    pub fn cursor_down(&mut self) {
        if self.machine_cursor + 1 < self.machines.len() {
            self.machine_cursor += 1;
        }
    }

    /// Table rows for the monitored reading.
    pub fn monitor_rows(&self) -> Vec<ChannelStatus> {
        self.monitor
            .reading()
            .map(|r| self.detector.status_summary(r))
            .unwrap_or_default()
    }

    /// Table rows for the sensor snapshot, in the same name order the
    /// edit cursor walks.
    pub fn sensor_rows(&self) -> Vec<ChannelStatus> {
        let mut rows = self
            .sensor
            .row()
            .map(|r| self.detector.status_summary(r))
            .unwrap_or_default();
        rows.sort_by(|a, b| a.channel.cmp(&b.channel));
        rows
    }

    /// Local threshold check of the sensor snapshot. `None` when no snapshot
    /// is loaded, which is not the same as a snapshot with zero alerts.
    pub fn sensor_report(&self) -> MonitorResult<Option<AlertReport>> {
        self.detector.report_for(self.sensor.row())
    }

    /// Number of danger alerts on the monitored machine (header badge).
    pub fn danger_alert_count(&self) -> usize {
        self.monitor
            .report()
            .map(|r| r.count(Severity::Danger))
            .unwrap_or(0)
    }

    // ── Scrolling ────────────────────────────────────────────

    pub fn scroll_up(&mut self) {
        match self.active_tab() {
            Tab::Monitor => self.cursor_up(),
            Tab::Sensor => self.sensor.select_up(),
            Tab::Chat => self.chat_scroll += 1,
            Tab::Manual => self.manual_scroll += 1,
        }
    }

    pub fn scroll_down(&mut self) {
        match self.active_tab() {
            Tab::Monitor => self.cursor_down(),
            Tab::Sensor => self.sensor.select_down(),
            Tab::Chat => self.chat_scroll = self.chat_scroll.saturating_sub(1),
            Tab::Manual => self.manual_scroll = self.manual_scroll.saturating_sub(1),
        }
    }

    pub fn page_up(&mut self) {
        match self.active_tab() {
            Tab::Chat => self.chat_scroll += PAGE_SIZE,
            Tab::Manual => self.manual_scroll += PAGE_SIZE,
            _ => {
                for _ in 0..PAGE_SIZE {
                    self.scroll_up();
                }
            }
        }
    }

    pub fn page_down(&mut self) {
        match self.active_tab() {
            Tab::Chat => self.chat_scroll = self.chat_scroll.saturating_sub(PAGE_SIZE),
            Tab::Manual => self.manual_scroll = self.manual_scroll.saturating_sub(PAGE_SIZE),
            _ => {
                for _ in 0..PAGE_SIZE {
                    self.scroll_down();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChannelRegistry;
    use crate::store::{MemoryBackend, StateBackend};
    use std::sync::Arc;

    fn session() -> SessionStore {
        SessionStore::new(Arc::new(MemoryBackend::new()))
    }

    /// Backend that rejects every write.
    struct ReadOnlyBackend;

    impl StateBackend for ReadOnlyBackend {
        fn read(&self, _key: &str) -> MonitorResult<Option<String>> {
            Ok(None)
        }

        fn write(&self, key: &str, _value: &str) -> MonitorResult<()> {
            Err(crate::error::MonitorError::Validation(format!("{} is read-only", key)))
        }
    }

    fn make_state(session: &SessionStore) -> AppState {
        let detector = AlertDetector::new(Arc::new(ChannelRegistry::feed_mill()));
        AppState::new(session, detector, Theme::default_dark(), DEFAULT_BACKEND_URL, 5, 50)
    }

    // ── Tab cycling ───────────────────────────────────────────────

    #[test]
    fn next_tab_cycles() {
        let s = session();
        let mut st = make_state(&s);
        assert_eq!(st.active_tab(), Tab::Monitor);
        st.next_tab();
        assert_eq!(st.active_tab(), Tab::Sensor);
        st.next_tab();
        assert_eq!(st.active_tab(), Tab::Chat);
        st.next_tab();
        assert_eq!(st.active_tab(), Tab::Manual);
        st.next_tab();
        assert_eq!(st.active_tab(), Tab::Monitor);
    }

    #[test]
    fn prev_tab_cycles() {
        let s = session();
        let mut st = make_state(&s);
        st.prev_tab();
        assert_eq!(st.active_tab(), Tab::Manual);
        st.prev_tab();
        assert_eq!(st.active_tab(), Tab::Chat);
    }

    #[test]
    fn active_tab_restored_on_restart() {
        let s = session();
        {
            let mut st = make_state(&s);
            st.set_tab(Tab::Chat);
        }
        assert_eq!(make_state(&s).active_tab(), Tab::Chat);
    }

    #[test]
    fn tab_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Tab::Manual).unwrap(), "\"manual\"");
    }

    // ── Machine list ──────────────────────────────────────────────

    #[test]
    fn set_machines_keeps_cursor_on_same_machine() {
        let s = session();
        let mut st = make_state(&s);
        st.set_machines(vec!["Feed Mill 1".into(), "Feed Mill 2".into()]);
        st.cursor_down();
        assert_eq!(st.machine_under_cursor(), Some("Feed Mill 2"));

        st.set_machines(vec!["Feed Mill 0".into(), "Feed Mill 1".into(), "Feed Mill 2".into()]);
        assert_eq!(st.machine_under_cursor(), Some("Feed Mill 2"));

        st.set_machines(vec!["Feed Mill 3".into()]);
        assert_eq!(st.machine_cursor, 0);
    }

    #[test]
    fn cursor_is_clamped() {
        let s = session();
        let mut st = make_state(&s);
        st.set_machines(vec!["a".into(), "b".into()]);
        st.cursor_up();
        assert_eq!(st.machine_cursor, 0);
        st.page_down();
        assert_eq!(st.machine_cursor, 1);
    }

    #[test]
    fn no_reading_means_no_rows() {
        let s = session();
        let st = make_state(&s);
        assert!(st.monitor_rows().is_empty());
        assert_eq!(st.danger_alert_count(), 0);
    }

    // ── Sensor snapshot ───────────────────────────────────────────

    #[test]
    fn sensor_report_distinguishes_missing_snapshot() {
        let s = session();
        let mut st = make_state(&s);
        assert!(st.sensor_report().unwrap().is_none());

        let reading = crate::models::Reading::new("Feed Mill 1", "t")
            .with("CurrentMotor", 300.0)
            .with("SpeedMotor", 1440.0);
        let info = crate::models::UploadInfo {
            filename: "live:Feed Mill 1".into(),
            total_rows: 1,
            machines: vec!["Feed Mill 1".into()],
            date_range: "t".into(),
        };
        st.sensor.load_snapshot(reading, info).unwrap();
        let report = st.sensor_report().unwrap().unwrap();
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.overall, Severity::Warning);
    }

    // ── Save failures ─────────────────────────────────────────────

    #[test]
    fn failed_tab_save_reaches_status_bar() {
        let s = SessionStore::new(Arc::new(ReadOnlyBackend));
        let mut st = make_state(&s);
        st.set_tab(Tab::Sensor);
        assert_eq!(st.active_tab(), Tab::Sensor);
        let (msg, _) = st.status_message.as_ref().unwrap();
        assert!(msg.contains("Could not save"));
    }

    // ── Chat scrolling ────────────────────────────────────────────

    #[test]
    fn chat_scroll_saturates_at_bottom() {
        let s = session();
        let mut st = make_state(&s);
        st.set_tab(Tab::Chat);
        st.scroll_down();
        assert_eq!(st.chat_scroll, 0);
        st.page_up();
        assert_eq!(st.chat_scroll, PAGE_SIZE);
        st.scroll_down();
        assert_eq!(st.chat_scroll, PAGE_SIZE - 1);
    }
}
