use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{MonitorError, MonitorResult};

/// One timestamped snapshot of channel values for one machine.
///
/// Never mutated by the refresh loop: each cycle replaces it wholesale.
/// The sensor view edits its own persisted copy through [`Reading::set_value`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(rename = "machine_id")]
    pub entity: String,
    #[serde(default)]
    pub timestamp: String,
    /// Channel name -> value. Null values from the backend are dropped.
    #[serde(rename = "sensor_readings", deserialize_with = "non_null_values")]
    pub values: BTreeMap<String, f64>,
}

fn non_null_values<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, Option<f64>> = BTreeMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v)))
        .collect())
}

impl Reading {
    #[cfg(test)]
    pub fn new(entity: &str, timestamp: &str) -> Self {
        Self {
            entity: entity.to_string(),
            timestamp: timestamp.to_string(),
            values: BTreeMap::new(),
        }
    }

    #[cfg(test)]
    pub fn with(mut self, channel: &str, value: f64) -> Self {
        self.values.insert(channel.to_string(), value);
        self
    }

    pub fn get(&self, channel: &str) -> Option<f64> {
        self.values.get(channel).copied()
    }

    /// Replace one cell from operator input.
    ///
    /// Input must parse as a finite number; nothing is coerced to zero.
    pub fn set_value(&mut self, channel: &str, raw: &str) -> MonitorResult<f64> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(MonitorError::invalid_reading(channel, "value is empty"));
        }
        let value: f64 = trimmed.parse().map_err(|_| {
            MonitorError::invalid_reading(channel, format!("'{}' is not a number", trimmed))
        })?;
        if !value.is_finite() {
            return Err(MonitorError::invalid_reading(
                channel,
                format!("'{}' is not finite", trimmed),
            ));
        }
        self.values.insert(channel.to_string(), value);
        Ok(value)
    }

    /// Body for the analysis and prediction endpoints.
    pub fn to_request(&self, default_machine: &str) -> AnalysisRequest {
        let machine_type = if self.entity.is_empty() {
            default_machine.to_string()
        } else {
            self.entity.clone()
        };
        AnalysisRequest {
            timestamp: chrono::Local::now().to_rfc3339(),
            machine_type,
            sensor_readings: self.values.clone(),
        }
    }
}

/// Request body shared by `/api/analyze-sensors` and `/api/predict-ml-breakdown`.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    pub timestamp: String,
    pub machine_type: String,
    pub sensor_readings: BTreeMap<String, f64>,
}

/// Metadata about the last uploaded CSV, kept with the sensor snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadInfo {
    pub filename: String,
    pub total_rows: u64,
    pub machines: Vec<String>,
    pub date_range: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_backend_payload() {
        let json = r#"{
            "timestamp": "2025-09-30T10:00:00",
            "machine_id": "Feed Mill 1",
            "sensor_readings": {"CurrentMotor": 305.0, "Vibration": null, "TempOilGear": 60}
        }"#;
        let r: Reading = serde_json::from_str(json).unwrap();
        assert_eq!(r.entity, "Feed Mill 1");
        assert_eq!(r.get("CurrentMotor"), Some(305.0));
        assert_eq!(r.get("TempOilGear"), Some(60.0));
        // null is treated as absent
        assert_eq!(r.get("Vibration"), None);
        assert_eq!(r.values.len(), 2);
    }

    #[test]
    fn set_value_accepts_numbers() {
        let mut r = Reading::new("Feed Mill 1", "");
        assert_eq!(r.set_value("CurrentMotor", " 312.5 ").unwrap(), 312.5);
        assert_eq!(r.get("CurrentMotor"), Some(312.5));
    }

    #[test]
    fn set_value_rejects_garbage_instead_of_zero() {
        let mut r = Reading::new("Feed Mill 1", "").with("CurrentMotor", 300.0);
        let err = r.set_value("CurrentMotor", "abc").unwrap_err();
        assert!(matches!(err, MonitorError::InvalidReading { .. }));
        // previous value untouched
        assert_eq!(r.get("CurrentMotor"), Some(300.0));
    }

    #[test]
    fn set_value_rejects_empty_and_non_finite() {
        let mut r = Reading::new("Feed Mill 1", "");
        assert!(r.set_value("Vibration", "").is_err());
        assert!(r.set_value("Vibration", "NaN").is_err());
        assert!(r.set_value("Vibration", "inf").is_err());
        assert!(r.values.is_empty());
    }

    #[test]
    fn request_falls_back_to_default_machine() {
        let r = Reading::new("", "").with("Vibration", 1.0);
        let req = r.to_request("Feed Mill 1");
        assert_eq!(req.machine_type, "Feed Mill 1");
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["sensor_readings"]["Vibration"], 1.0);
    }
}
