/*!
Resolves a [Query] into the list of archive files to process.

The broker answers `GET <broker_url>?peers=..&from_time=..&until_time=..&data_type=..` with a
JSON object:

```json
{"files": {"3130_147.28.0.3": ["http://.../1704067200.mrt.bz2"]}, "error": "optional"}
```
*/
use log::{info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::StreamConfig;
use crate::error::GillError;
use crate::http::HttpClient;
use crate::models::{FileTask, Query};
use crate::retry::{retry_with_backoff, Backoff, Sleeper};

#[derive(Debug, Deserialize)]
struct BrokerResponse {
    #[serde(default)]
    files: HashMap<String, Vec<String>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

pub struct BrokerClient<'a> {
    http: &'a dyn HttpClient,
    sleeper: &'a dyn Sleeper,
    broker_url: String,
    backoff: Backoff,
}

impl<'a> BrokerClient<'a> {
    pub fn new(
        http: &'a dyn HttpClient,
        sleeper: &'a dyn Sleeper,
        config: &StreamConfig,
    ) -> BrokerClient<'a> {
        BrokerClient {
            http,
            sleeper,
            broker_url: config.broker_url.clone(),
            backoff: config.broker_backoff,
        }
    }

    /// Request URL for a query, with percent-encoded parameters. `peers` is left out when the
    /// query names no vantage points.
    pub fn request_url(&self, query: &Query) -> Result<String, GillError> {
        let mut params = vec![];
        if let Some(vps) = query.vantage_points.as_ref().filter(|vps| !vps.is_empty()) {
            params.push(("peers", vps.join(",")));
        }
        params.push(("from_time", query.from_time.to_string()));
        params.push(("until_time", query.until_time.to_string()));
        params.push(("data_type", query.record_type.to_string()));

        let url = reqwest::Url::parse_with_params(&self.broker_url, &params).map_err(|e| {
            GillError::InvalidBrokerUrl {
                url: self.broker_url.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(url.to_string())
    }

    /// Ask the broker which files cover `query`, sorted by `(url, peer)`.
    pub fn resolve(&self, query: &Query) -> Result<Vec<FileTask>, GillError> {
        let url = self.request_url(query)?;
        let tasks = retry_with_backoff(&self.backoff, self.sleeper, "broker query", |timeout| {
            self.query_once(&url, timeout)
        })
        .map_err(|(_, attempts)| GillError::BrokerUnreachable { attempts })?;

        info!("broker resolved {} files", tasks.len());
        Ok(tasks)
    }

    fn query_once(&self, url: &str, timeout: Duration) -> Result<Vec<FileTask>, GillError> {
        let response = self.http.get(url, timeout)?;
        if !response.is_success() {
            return Err(GillError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }
        parse_broker_response(response.text()?.as_str())
    }
}

/// Flatten a broker payload into sorted tasks.
///
/// A top-level `"error"` is logged and otherwise ignored; a missing `"files"` means no files.
pub fn parse_broker_response(text: &str) -> Result<Vec<FileTask>, GillError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(GillError::BrokerPayload(format!(
            "expected a JSON object, got {}",
            value
        )));
    }
    let response: BrokerResponse = serde_json::from_value(value)?;

    if let Some(error) = response.error {
        warn!("error from broker: '{}'", error);
    }

    let mut tasks: Vec<FileTask> = response
        .files
        .into_iter()
        .flat_map(|(peer, urls)| {
            urls.into_iter()
                .map(move |url| FileTask::new(url, peer.clone()))
        })
        .collect();
    tasks.sort();
    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordType;

    #[test]
    fn test_parse_response_sorted() {
        let text = r#"{"files": {
            "2_10.0.0.2": ["http://a/1.mrt.bz2", "http://a/0.mrt.bz2"],
            "1_10.0.0.1": ["http://a/1.mrt.bz2"]
        }}"#;
        let tasks = parse_broker_response(text).unwrap();
        assert_eq!(
            tasks,
            vec![
                FileTask::new("http://a/0.mrt.bz2", "2_10.0.0.2"),
                FileTask::new("http://a/1.mrt.bz2", "1_10.0.0.1"),
                FileTask::new("http://a/1.mrt.bz2", "2_10.0.0.2"),
            ]
        );
    }

    #[test]
    fn test_parse_response_error_and_missing_files() {
        let tasks =
            parse_broker_response(r#"{"error": "peer unknown", "files": {"1_10.0.0.1": ["u"]}}"#)
                .unwrap();
        assert_eq!(tasks, vec![FileTask::new("u", "1_10.0.0.1")]);

        assert!(parse_broker_response(r#"{"error": "no data"}"#)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_parse_response_rejects_non_object() {
        assert!(matches!(
            parse_broker_response("[1, 2]"),
            Err(GillError::BrokerPayload(_))
        ));
        assert!(matches!(
            parse_broker_response("<html>"),
            Err(GillError::Json(_))
        ));
    }

    #[test]
    fn test_request_url() {
        struct NoHttp;
        impl HttpClient for NoHttp {
            fn get(&self, url: &str, _: Duration) -> Result<crate::http::HttpResponse, GillError> {
                Err(GillError::BrokerPayload(url.to_string()))
            }
        }

        let config = StreamConfig::default().with_broker_url("http://broker/b");
        let client = BrokerClient::new(&NoHttp, &crate::retry::ThreadSleeper, &config);

        let query = Query::new(10, 20, RecordType::Updates, None).unwrap();
        assert_eq!(
            client.request_url(&query).unwrap(),
            "http://broker/b?from_time=10&until_time=20&data_type=updates"
        );

        let query = Query::new(
            10,
            20,
            RecordType::Ribs,
            Some(vec!["1_10.0.0.1".to_string(), "2_10.0.0.2".to_string()]),
        )
        .unwrap();
        assert_eq!(
            client.request_url(&query).unwrap(),
            "http://broker/b?peers=1_10.0.0.1%2C2_10.0.0.2&from_time=10&until_time=20&data_type=ribs"
        );

        let query = Query::new(
            10,
            20,
            RecordType::Updates,
            Some(vec!["6939_2001:db8::1".to_string(), "1_a&b=c".to_string()]),
        )
        .unwrap();
        assert_eq!(
            client.request_url(&query).unwrap(),
            "http://broker/b?peers=6939_2001%3Adb8%3A%3A1%2C1_a%26b%3Dc&from_time=10&until_time=20&data_type=updates"
        );
    }

    #[test]
    fn test_invalid_broker_url() {
        struct NoHttp;
        impl HttpClient for NoHttp {
            fn get(&self, url: &str, _: Duration) -> Result<crate::http::HttpResponse, GillError> {
                Err(GillError::BrokerPayload(url.to_string()))
            }
        }

        let config = StreamConfig::default().with_broker_url("not a url");
        let client = BrokerClient::new(&NoHttp, &crate::retry::ThreadSleeper, &config);
        let query = Query::new(10, 20, RecordType::Updates, None).unwrap();
        assert!(matches!(
            client.resolve(&query),
            Err(GillError::InvalidBrokerUrl { .. })
        ));
    }
}
