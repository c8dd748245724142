use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::feed::{FetchOutcome, HistoryQuery, VideoCandidate};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const RECOMMENDATIONS_PATH: &str = "recommendations";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    /// `None` leaves requests without a deadline.
    pub timeout: Option<Duration>,
    pub tuning: Tuning,
}

/// Optional knobs the recommendation service understands. Unset values are
/// left off the request so the service keeps its own defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tuning {
    pub query: Option<String>,
    pub alpha: Option<f64>,
    pub top_n: Option<u32>,
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    endpoint: Url,
    tuning: Tuning,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("recommendation client user agent required");
        }
        let endpoint = endpoint_url(&config.base_url)?;

        let mut builder = HttpClient::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("build recommendation HTTP client")?;

        Ok(Client {
            http,
            user_agent: config.user_agent,
            endpoint,
            tuning: config.tuning,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn request_url(&self, history: &HistoryQuery) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("played", &history.played)
                .append_pair("liked", &history.liked)
                .append_pair("disliked", &history.disliked);
            if let Some(query) = self.tuning.query.as_deref() {
                pairs.append_pair("query", query);
            }
            if let Some(alpha) = self.tuning.alpha {
                pairs.append_pair("alpha", &alpha.to_string());
            }
            if let Some(top_n) = self.tuning.top_n {
                pairs.append_pair("top_n", &top_n.to_string());
            }
        }
        url
    }

    /// Fetches the raw response body. Shape checks happen in
    /// [`validate_batch`].
    pub fn recommendations(&self, history: &HistoryQuery) -> Result<Value> {
        let url = self.request_url(history);
        let response = self
            .http
            .get(url.clone())
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .send()
            .with_context(|| format!("request {url}"))?;

        let status = response.status();
        let body = response
            .text()
            .with_context(|| format!("read response body from {url}"))?;

        if !status.is_success() {
            match service_error_message(&body) {
                Some(message) => bail!("recommendation service returned {status}: {message}"),
                None => bail!("recommendation service returned {status}"),
            }
        }

        serde_json::from_str(&body).context("decode recommendation response as JSON")
    }

    pub fn fetch(&self, history: &HistoryQuery) -> FetchOutcome {
        match self.recommendations(history) {
            Ok(body) => validate_batch(body),
            Err(err) => FetchOutcome::Failed(format!("{err:#}")),
        }
    }
}

fn endpoint_url(base_url: &str) -> Result<Url> {
    let base = if base_url.trim().is_empty() {
        DEFAULT_BASE_URL
    } else {
        base_url.trim()
    };
    let mut url =
        Url::parse(base).with_context(|| format!("parse recommendation base url {base:?}"))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| anyhow::anyhow!("recommendation base url {base:?} has no path"))?;
        segments.pop_if_empty().push(RECOMMENDATIONS_PATH);
    }
    Ok(url)
}

fn service_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|parsed| parsed.error)
        .filter(|message| !message.trim().is_empty())
}

/// One element of the service's response array.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCandidate {
    pub video_id: String,
    pub title: String,
    pub final_score: f64,
}

impl From<RawCandidate> for VideoCandidate {
    fn from(raw: RawCandidate) -> Self {
        VideoCandidate {
            id: raw.video_id,
            title: raw.title,
            score: raw.final_score,
        }
    }
}

/// Checks a decoded body against the expected shape: a JSON array whose
/// elements all carry `video_id`, `title` and `final_score`.
pub fn validate_batch(body: Value) -> FetchOutcome {
    let elements = match body {
        Value::Array(elements) => elements,
        other => {
            return FetchOutcome::ProtocolError(format!(
                "expected a JSON array, got {}",
                json_kind(&other)
            ));
        }
    };

    let mut batch = Vec::with_capacity(elements.len());
    for (index, element) in elements.into_iter().enumerate() {
        match serde_json::from_value::<RawCandidate>(element) {
            Ok(raw) => batch.push(VideoCandidate::from(raw)),
            Err(err) => {
                return FetchOutcome::ProtocolError(format!("element {index}: {err}"));
            }
        }
    }
    FetchOutcome::Batch(batch)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(base_url: &str) -> Client {
        Client::new(ClientConfig {
            base_url: base_url.to_string(),
            user_agent: "reel-tui/test".to_string(),
            ..ClientConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn requires_user_agent() {
        let result = Client::new(ClientConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            ..ClientConfig::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn endpoint_appends_recommendations_path() {
        assert_eq!(
            client("http://localhost:5000").endpoint().as_str(),
            "http://localhost:5000/recommendations"
        );
        assert_eq!(
            client("http://example.test/api/").endpoint().as_str(),
            "http://example.test/api/recommendations"
        );
        assert_eq!(
            client("").endpoint().as_str(),
            "http://localhost:5000/recommendations"
        );
    }

    #[test]
    fn request_url_carries_history_lists() {
        let url = client("http://localhost:5000").request_url(&HistoryQuery {
            played: "a,b".into(),
            liked: "a".into(),
            disliked: String::new(),
        });
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/recommendations?played=a%2Cb&liked=a&disliked="
        );
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("played".to_string(), "a,b".to_string()));
    }

    #[test]
    fn request_url_includes_tuning_when_set() {
        let client = Client::new(ClientConfig {
            base_url: "http://localhost:5000".into(),
            user_agent: "reel-tui/test".into(),
            tuning: Tuning {
                query: Some("cats".into()),
                alpha: Some(0.5),
                top_n: Some(5),
            },
            ..ClientConfig::default()
        })
        .unwrap();
        let url = client.request_url(&HistoryQuery::default());
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let keys: Vec<&str> = pairs.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(
            keys,
            vec!["played", "liked", "disliked", "query", "alpha", "top_n"]
        );
        assert_eq!(pairs[4].1, "0.5");
    }

    #[test]
    fn validates_expected_shape() {
        let body = json!([
            {"video_id": "x", "title": "First", "final_score": 0.75, "views": 10},
            {"video_id": "y", "title": "Second", "final_score": 1}
        ]);
        let FetchOutcome::Batch(batch) = validate_batch(body) else {
            panic!("expected batch");
        };
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], VideoCandidate::new("x", "First", 0.75));
        assert_eq!(batch[1].score, 1.0);
    }

    #[test]
    fn non_array_is_protocol_error() {
        let outcome = validate_batch(json!({"error": "boom"}));
        assert!(matches!(outcome, FetchOutcome::ProtocolError(reason) if reason.contains("object")));
    }

    #[test]
    fn malformed_element_is_protocol_error() {
        let outcome = validate_batch(json!([
            {"video_id": "x", "title": "ok", "final_score": 0.1},
            {"video_id": 7, "title": "bad", "final_score": 0.1}
        ]));
        assert!(
            matches!(outcome, FetchOutcome::ProtocolError(reason) if reason.starts_with("element 1"))
        );
    }

    #[test]
    fn empty_array_is_empty_batch() {
        assert_eq!(validate_batch(json!([])), FetchOutcome::Batch(Vec::new()));
    }

    #[test]
    fn extracts_service_error_message() {
        assert_eq!(
            service_error_message(r#"{"error": "dataset missing"}"#).as_deref(),
            Some("dataset missing")
        );
        assert_eq!(service_error_message("<html>"), None);
    }
}
