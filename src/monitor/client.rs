use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::*;
use crate::error::{FetchError, MonitorError, MonitorResult};
use crate::models::Reading;

use super::ReadingSource;

/// Async client for the analysis backend.
///
/// Every request carries the same timeout; retry policy belongs to the
/// caller (the refresh loop simply tries again on its next tick).
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: Url,
}

/// Result of `/api/analyze-sensors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    #[serde(default)]
    pub alerts: Vec<String>,
    /// Markdown maintenance advice.
    #[serde(default)]
    pub recommended_action: String,
}

/// Per-model breakdown probabilities (0..1).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasePredictions {
    pub xgb: Option<f64>,
    pub lgb: Option<f64>,
    pub rf: Option<f64>,
}

/// Result of `/api/predict-ml-breakdown`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// 0..100
    pub risk_score: f64,
    pub risk_level: String,
    #[serde(default)]
    pub prediction: String,
    #[serde(default)]
    pub base_predictions: Option<BasePredictions>,
    #[serde(default, deserialize_with = "flag_from_any")]
    pub anomaly_flag: bool,
    #[serde(default)]
    pub anomaly_score: Option<f64>,
}

/// Result of `/api/orchestrator-chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(default)]
    pub tools_used: Vec<String>,
}

/// Result of `/api/repair-manual`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualResponse {
    pub answer: String,
}

#[derive(Serialize)]
struct MessageBody<'a> {
    message: &'a str,
}

/// The machine list comes back either bare or wrapped.
#[derive(Deserialize)]
#[serde(untagged)]
enum MachineList {
    Plain(Vec<String>),
    Wrapped { machines: Vec<String> },
}

impl From<MachineList> for Vec<String> {
    fn from(list: MachineList) -> Self {
        match list {
            MachineList::Plain(v) | MachineList::Wrapped { machines: v } => v,
        }
    }
}

/// The backend reports the anomaly flag as 0/1 or as a bool.
fn flag_from_any<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    Ok(match v {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|x| x != 0.0),
        _ => false,
    })
}

impl BackendClient {
    pub fn new(base_url: &str) -> MonitorResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| MonitorError::Config(format!("backend url '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(MonitorError::Config(format!(
                "backend url '{}' cannot be used as a base",
                base_url
            )));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| MonitorError::Config(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Build `<base>/<segments...>`, percent-encoding each segment
    /// (machine ids contain spaces).
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub async fn submit_analysis(&self, reading: &Reading) -> Result<AnalysisResponse, FetchError> {
        let body = reading.to_request(DEFAULT_MACHINE_TYPE);
        self.post_json(self.endpoint(&["api", "analyze-sensors"]), &body)
            .await
    }

    pub async fn submit_prediction(
        &self,
        reading: &Reading,
    ) -> Result<PredictionResponse, FetchError> {
        let body = reading.to_request(DEFAULT_MACHINE_TYPE);
        self.post_json(self.endpoint(&["api", "predict-ml-breakdown"]), &body)
            .await
    }

    pub async fn submit_chat(&self, message: &str) -> Result<ChatResponse, FetchError> {
        self.post_json(
            self.endpoint(&["api", "orchestrator-chat"]),
            &MessageBody { message },
        )
        .await
    }

    pub async fn ask_repair_manual(&self, question: &str) -> Result<ManualResponse, FetchError> {
        self.post_json(
            self.endpoint(&["api", "repair-manual"]),
            &MessageBody { message: question },
        )
        .await
    }

    // ── Transport ────────────────────────────────────────────────

    async fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T, FetchError> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Self::decode(response, what).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, FetchError> {
        debug!(%url, "POST");
        let what = url.path().to_string();
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Self::decode(response, &what).await
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
        what: &str,
    ) -> Result<T, FetchError> {
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(status_error(status, what, &detail));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| FetchError::Network(format!("bad response from {}: {}", what, e)))
    }
}

/// Map a non-2xx status to the collaborator error kinds.
fn status_error(status: StatusCode, what: &str, detail: &str) -> FetchError {
    let detail = crate::utils::truncate_str(detail.trim(), 200);
    match status {
        StatusCode::NOT_FOUND => FetchError::NotFound(what.to_string()),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            FetchError::Validation(format!("{}: {}", status, detail))
        }
        _ => FetchError::Network(format!("{} returned {}: {}", what, status, detail)),
    }
}

impl ReadingSource for BackendClient {
    async fn fetch_entity_list(&self) -> Result<Vec<String>, FetchError> {
        let list: MachineList = self
            .get_json(self.endpoint(&["api", "machines"]), "machine list")
            .await?;
        Ok(list.into())
    }

    async fn fetch_latest_reading(
        &self,
        entity: &str,
        recent_count: usize,
    ) -> Result<Reading, FetchError> {
        let mut url = self.endpoint(&["api", "machine-data", entity]);
        url.query_pairs_mut()
            .append_pair("limit", &recent_count.to_string());
        self.get_json(url, entity).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_encodes_machine_id() {
        let client = BackendClient::new("http://localhost:8000").unwrap();
        let url = client.endpoint(&["api", "machine-data", "Feed Mill 1"]);
        assert_eq!(url.as_str(), "http://localhost:8000/api/machine-data/Feed%20Mill%201");
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let client = BackendClient::new("http://gw.local/zb/").unwrap();
        let url = client.endpoint(&["api", "machines"]);
        assert_eq!(url.as_str(), "http://gw.local/zb/api/machines");
    }

    #[test]
    fn rejects_bad_base_url() {
        assert!(matches!(
            BackendClient::new("not a url"),
            Err(MonitorError::Config(_))
        ));
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            status_error(StatusCode::NOT_FOUND, "Feed Mill 9", ""),
            FetchError::NotFound("Feed Mill 9".into())
        );
        assert!(matches!(
            status_error(StatusCode::UNPROCESSABLE_ENTITY, "x", "missing field"),
            FetchError::Validation(_)
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, "x", ""),
            FetchError::Validation(_)
        ));
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, "x", "boom"),
            FetchError::Network(_)
        ));
    }

    #[test]
    fn machine_list_accepts_both_shapes() {
        let plain: MachineList = serde_json::from_str(r#"["Feed Mill 1","Feed Mill 2"]"#).unwrap();
        let wrapped: MachineList =
            serde_json::from_str(r#"{"machines":["Feed Mill 3"],"total":1}"#).unwrap();
        assert_eq!(Vec::<String>::from(plain).len(), 2);
        assert_eq!(Vec::<String>::from(wrapped), vec!["Feed Mill 3".to_string()]);
    }

    #[test]
    fn prediction_parses_numeric_flag() {
        let json = r#"{
            "risk_score": 72.5,
            "risk_level": "high",
            "prediction": "**Bearing wear likely**",
            "base_predictions": {"xgb": 0.71, "lgb": null, "rf": 0.64},
            "anomaly_flag": 1,
            "anomaly_score": -0.123
        }"#;
        let p: PredictionResponse = serde_json::from_str(json).unwrap();
        assert!(p.anomaly_flag);
        assert_eq!(p.base_predictions.as_ref().unwrap().lgb, None);
        assert_eq!(p.anomaly_score, Some(-0.123));
    }

    #[test]
    fn prediction_tolerates_missing_optionals() {
        let p: PredictionResponse =
            serde_json::from_str(r#"{"risk_score": 10, "risk_level": "low"}"#).unwrap();
        assert!(!p.anomaly_flag);
        assert!(p.base_predictions.is_none());
        assert!(p.prediction.is_empty());
    }

    #[test]
    fn chat_response_defaults_tools() {
        let c: ChatResponse = serde_json::from_str(r#"{"response":"ok"}"#).unwrap();
        assert!(c.tools_used.is_empty());
    }

    #[tokio::test]
    async fn unreachable_backend_is_network_error() {
        // port 9 (discard) on localhost is essentially never listening
        let client = BackendClient::new("http://127.0.0.1:9").unwrap();
        let err = client.fetch_latest_reading("Feed Mill 1", 10).await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }
}
