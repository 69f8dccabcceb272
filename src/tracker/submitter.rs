//! Transport for serialized events.
//!
//! [`HttpSubmitter`] POSTs a dumped event to the sensor endpoint as a form-encoded body.
//! [`NullSubmitter`] discards everything, for when tracking is disabled.

use crate::error::{Result, TrackerError};
use crate::event::Dump;
use crate::tracker::config::TrackerConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

/// Header carrying the API key (`Api-Key`; header names are case-insensitive)
pub const API_KEY_HEADER: HeaderName = HeaderName::from_static("api-key");
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Delivers one serialized event
#[async_trait]
pub trait Submitter: Send + Sync {
    /// Send the dumped event. Errors are reported to the tracker, which logs them.
    async fn submit(&self, data: &Dump) -> Result<()>;
}

/// Submitter for the tirreno sensor HTTP API
pub struct HttpSubmitter {
    client: Client,
    url: String,
}

impl HttpSubmitter {
    /// Create a submitter with the configured endpoint, API key and request timeout
    pub fn with_config(config: &TrackerConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        let api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|e| TrackerError::ConfigError(format!("invalid API key: {}", e)))?;
        headers.insert(API_KEY_HEADER, api_key);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.connection_timeout)
            .build()?;

        Ok(Self {
            client,
            url: config.api_url.clone(),
        })
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(&self, data: &Dump) -> Result<()> {
        let pairs = form_pairs(data);
        debug!(url = %self.url, fields = pairs.len(), "Submitting event");

        let response = self.client.post(&self.url).form(&pairs).send().await?;

        debug!(status = %response.status(), "Sensor responded");
        Ok(())
    }
}

/// Submitter that drops every event
pub struct NullSubmitter;

impl NullSubmitter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NullSubmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Submitter for NullSubmitter {
    async fn submit(&self, _data: &Dump) -> Result<()> {
        Ok(())
    }
}

/// Flatten a dump into form fields.
///
/// Nested mappings and sequences use bracket keys, so `{"payload": {"field_id": "a"}}`
/// becomes `payload[field_id]=a` and list items become `fieldHistory[0][...]`.
pub fn form_pairs(data: &Dump) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(data.len());
    for (key, value) in data {
        flatten_into(key.clone(), value, &mut pairs);
    }
    pairs
}

fn flatten_into(key: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::String(s) => pairs.push((key, s.clone())),
        Value::Number(n) => pairs.push((key, n.to_string())),
        Value::Bool(b) => pairs.push((key, if *b { "1" } else { "0" }.to_string())),
        Value::Object(map) => {
            for (child, value) in map {
                flatten_into(format!("{}[{}]", key, child), value, pairs);
            }
        }
        Value::Array(items) => {
            for (index, value) in items.iter().enumerate() {
                flatten_into(format!("{}[{}]", key, index), value, pairs);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::payload::Payload;
    use mockito::Matcher;
    use serde_json::json;
    use std::time::Duration;

    fn dump_of(value: Value) -> Dump {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_form_pairs_flat_values() {
        let pairs = form_pairs(&dump_of(json!({"userName": "alice", "httpCode": 404})));

        assert_eq!(
            pairs,
            vec![
                ("userName".to_string(), "alice".to_string()),
                ("httpCode".to_string(), "404".to_string())
            ]
        );
    }

    #[test]
    fn test_form_pairs_nested_payload_and_history() {
        let mut payload = Payload::new();
        payload.set_field_id("id1").set_new_value("b");
        let mut change = Payload::new();
        change.set_old_value("x");

        let mut event = Event::new("u-1");
        event.clear_event_time().clear_event_type();
        event.set_payload(payload).add_field_history(change);

        let pairs = form_pairs(&event.dump());
        assert_eq!(
            pairs,
            vec![
                ("payload[new_value]".to_string(), "b".to_string()),
                ("payload[field_id]".to_string(), "id1".to_string()),
                ("fieldHistory[0][old_value]".to_string(), "x".to_string()),
            ]
        );
    }

    #[test]
    fn test_form_pairs_skips_null() {
        let pairs = form_pairs(&dump_of(json!({"a": null, "b": "1"})));
        assert_eq!(pairs, vec![("b".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_with_config_rejects_unprintable_key() {
        let config = TrackerConfig::new("https://localhost/", "bad\nkey");
        assert!(matches!(HttpSubmitter::with_config(&config), Err(TrackerError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_submit_posts_form_with_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/sensor/")
            .match_header("api-key", "k")
            .match_header("content-type", FORM_CONTENT_TYPE)
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("userName".into(), "alice".into()),
                Matcher::UrlEncoded("payload[field_id]".into(), "id1".into()),
            ]))
            .with_status(204)
            .create_async()
            .await;

        let config = TrackerConfig::new(format!("{}/sensor/", server.url()), "k");
        let submitter = HttpSubmitter::with_config(&config).unwrap();
        let data = dump_of(json!({"userName": "alice", "payload": {"field_id": "id1"}}));

        let result = submitter.submit(&data).await;

        mock.assert_async().await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_submit_ignores_error_status() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/").with_status(500).create_async().await;

        let config = TrackerConfig::new(server.url(), "k");
        let submitter = HttpSubmitter::with_config(&config).unwrap();

        let result = submitter.submit(&Dump::new()).await;

        mock.assert_async().await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_submit_reports_connection_failure() {
        let config = TrackerConfig::new("http://127.0.0.1:1/", "k")
            .with_connection_timeout(Duration::from_secs(1));
        let submitter = HttpSubmitter::with_config(&config).unwrap();

        let result = submitter.submit(&Dump::new()).await;

        assert!(matches!(result, Err(TrackerError::HttpError(_))));
    }

    #[tokio::test]
    async fn test_null_submitter_accepts_everything() {
        let submitter = NullSubmitter::new();
        assert!(submitter.submit(&Dump::new()).await.is_ok());
    }
}
