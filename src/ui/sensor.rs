//! Sensor tab state: the persisted snapshot and its analysis results.

use crate::error::MonitorResult;
use crate::models::{Reading, UploadInfo};
use crate::monitor::{AnalysisResponse, PredictionResponse};
use crate::store::{Persisted, ViewStore};

use super::input::TextInput;

const UPLOAD_KEY: &str = "upload";
const ROW_KEY: &str = "selected_row";

pub struct SensorView {
    upload: Persisted<Option<UploadInfo>>,
    row: Persisted<Option<Reading>>,
    /// Index into the row's channel list (sorted by name).
    pub selected: usize,
    /// Edit buffer while a cell is being changed.
    pub editing: Option<TextInput>,
    pub analysis: Option<AnalysisResponse>,
    pub prediction: Option<PredictionResponse>,
    pub analyzing: bool,
    pub predicting: bool,
    pub last_error: Option<String>,
}

impl SensorView {
    pub fn load(store: ViewStore) -> Self {
        Self {
            upload: Persisted::load(store.clone(), UPLOAD_KEY, None),
            row: Persisted::load(store, ROW_KEY, None),
            selected: 0,
            editing: None,
            analysis: None,
            prediction: None,
            analyzing: false,
            predicting: false,
            last_error: None,
        }
    }

    pub fn upload(&self) -> Option<&UploadInfo> {
        self.upload.get().as_ref()
    }

    pub fn row(&self) -> Option<&Reading> {
        self.row.get().as_ref()
    }

    /// Channel names in display order.
    pub fn channels(&self) -> Vec<String> {
        self.row()
            .map(|r| r.values.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn selected_channel(&self) -> Option<String> {
        self.channels().into_iter().nth(self.selected)
    }

    /// Replace the snapshot. Results from the previous snapshot are dropped.
    pub fn load_snapshot(&mut self, reading: Reading, info: UploadInfo) -> MonitorResult<()> {
        self.analysis = None;
        self.prediction = None;
        self.last_error = None;
        self.editing = None;
        self.selected = 0;
        self.upload.set(Some(info))?;
        self.row.set(Some(reading))
    }

    pub fn select_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_down(&mut self) {
        let n = self.channels().len();
        if self.selected + 1 < n {
            self.selected += 1;
        }
    }

    /// Open the edit buffer on the selected cell, prefilled with its value.
    pub fn begin_edit(&mut self) -> bool {
        let Some(channel) = self.selected_channel() else {
            return false;
        };
        let current = self
            .row()
            .and_then(|r| r.get(&channel))
            .map(|v| v.to_string())
            .unwrap_or_default();
        self.editing = Some(TextInput::with_text(&current));
        true
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Validate and store the edit buffer. On error the buffer stays open so
    /// the value can be corrected; nothing is written.
    pub fn commit_edit(&mut self) -> MonitorResult<Option<f64>> {
        let (Some(channel), Some(input)) = (self.selected_channel(), self.editing.as_ref()) else {
            return Ok(None);
        };
        let raw = input.text().to_string();

        let mut row = match self.row.get().clone() {
            Some(r) => r,
            None => return Ok(None),
        };
        let value = row.set_value(&channel, &raw)?;
        self.editing = None;
        // results no longer describe the row on screen
        self.analysis = None;
        self.prediction = None;
        self.row.set(Some(row))?;
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MonitorError;
    use crate::store::{MemoryBackend, SessionStore};
    use std::sync::Arc;

    fn session() -> SessionStore {
        SessionStore::new(Arc::new(MemoryBackend::new()))
    }

    fn snapshot() -> (Reading, UploadInfo) {
        let reading = Reading::new("Feed Mill 1", "2025-10-01T08:00:00")
            .with("CurrentMotor", 305.0)
            .with("TempOilGear", 62.0);
        let info = UploadInfo {
            filename: "live:Feed Mill 1".into(),
            total_rows: 1,
            machines: vec!["Feed Mill 1".into()],
            date_range: "2025-10-01T08:00:00".into(),
        };
        (reading, info)
    }

    #[test]
    fn empty_by_default() {
        let v = SensorView::load(session().namespace("sensor"));
        assert!(v.row().is_none());
        assert!(v.upload().is_none());
        assert!(v.channels().is_empty());
    }

    #[test]
    fn snapshot_persists() {
        let s = session();
        {
            let mut v = SensorView::load(s.namespace("sensor"));
            let (r, i) = snapshot();
            v.load_snapshot(r, i).unwrap();
        }
        let v = SensorView::load(s.namespace("sensor"));
        assert_eq!(v.row().unwrap().get("TempOilGear"), Some(62.0));
        assert_eq!(v.upload().unwrap().machines, vec!["Feed Mill 1".to_string()]);
    }

    #[test]
    fn edit_commit_updates_and_persists() {
        let s = session();
        let mut v = SensorView::load(s.namespace("sensor"));
        let (r, i) = snapshot();
        v.load_snapshot(r, i).unwrap();

        v.select_down(); // TempOilGear
        assert!(v.begin_edit());
        assert_eq!(v.editing.as_ref().unwrap().text(), "62");
        v.editing = Some(TextInput::with_text("78.5"));
        assert_eq!(v.commit_edit().unwrap(), Some(78.5));
        assert!(v.editing.is_none());

        let reloaded = SensorView::load(s.namespace("sensor"));
        assert_eq!(reloaded.row().unwrap().get("TempOilGear"), Some(78.5));
    }

    #[test]
    fn malformed_edit_is_rejected_not_zeroed() {
        let mut v = SensorView::load(session().namespace("sensor"));
        let (r, i) = snapshot();
        v.load_snapshot(r, i).unwrap();
        v.begin_edit();
        v.editing = Some(TextInput::with_text("3o5"));

        let err = v.commit_edit().unwrap_err();
        assert!(matches!(err, MonitorError::InvalidReading { .. }));
        assert!(v.editing.is_some());
        assert_eq!(v.row().unwrap().get("CurrentMotor"), Some(305.0));
    }

    #[test]
    fn selection_is_clamped() {
        let mut v = SensorView::load(session().namespace("sensor"));
        let (r, i) = snapshot();
        v.load_snapshot(r, i).unwrap();
        v.select_down();
        v.select_down();
        v.select_down();
        assert_eq!(v.selected, 1);
        v.select_up();
        v.select_up();
        assert_eq!(v.selected, 0);
    }
}
