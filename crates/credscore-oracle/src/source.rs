//! Oracle data sources.
//!
//! A source is anything that can produce one `(value, timestamp)` reading
//! for a logical key. The HTTP implementation covers the production case;
//! tests plug in stub sources through the same trait.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{OracleError, Result};

/// One reading from one source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceResponse {
    /// Which source produced this reading.
    pub source: String,
    /// Parsed payload.
    pub value: serde_json::Value,
    /// When the reading was taken (response receipt time for HTTP sources).
    pub timestamp: DateTime<Utc>,
}

/// An independently-configured oracle data source.
#[async_trait]
pub trait OracleSource: Send + Sync {
    /// Stable source name, unique within an aggregator.
    fn name(&self) -> &str;

    /// Fetch one reading. Implementations bound their own latency; the
    /// aggregator additionally wraps calls in a per-source timeout.
    async fn fetch(&self) -> Result<SourceResponse>;
}

/// How to extract the datum value from a raw HTTP response body.
///
/// Closed set so a malformed payload fails parsing deterministically
/// instead of propagating nulls downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseParser {
    /// Use the whole JSON body as the value.
    Raw,
    /// Extract a sub-value with an RFC 6901 JSON pointer (e.g. "/rates/BRL").
    Pointer { pointer: String },
}

impl ResponseParser {
    /// Apply the parser to a JSON body.
    pub fn parse(&self, source: &str, body: serde_json::Value) -> Result<serde_json::Value> {
        match self {
            ResponseParser::Raw => Ok(body),
            ResponseParser::Pointer { pointer } => body
                .pointer(pointer)
                .cloned()
                .filter(|v| !v.is_null())
                .ok_or_else(|| OracleError::MalformedResponse {
                    source_name: source.to_string(),
                    reason: format!("pointer {pointer} not found in response"),
                }),
        }
    }
}

/// HTTP-backed oracle source.
///
/// Holds a clone of the aggregator's shared `reqwest::Client`; per-source
/// timeout is enforced on each request.
#[derive(Debug, Clone)]
pub struct HttpSource {
    name: String,
    url: String,
    headers: HashMap<String, String>,
    parser: ResponseParser,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(
        client: reqwest::Client,
        name: impl Into<String>,
        url: impl Into<String>,
        parser: ResponseParser,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            headers: HashMap::new(),
            parser,
            timeout,
            client,
        }
    }

    /// Attach a request header (e.g. an API key).
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Configured per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl OracleSource for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<SourceResponse> {
        let mut request = self.client.get(&self.url).timeout(self.timeout);
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(OracleError::SourceUnavailable {
                source_name: self.name.clone(),
                reason: format!("http status {}", response.status()),
            });
        }

        let body: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| OracleError::MalformedResponse {
                    source_name: self.name.clone(),
                    reason: e.to_string(),
                })?;
        let value = self.parser.parse(&self.name, body)?;

        Ok(SourceResponse {
            source: self.name.clone(),
            value,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_parser_passes_body_through() {
        let body = serde_json::json!({"rates": {"BRL": 5.43}});
        let out = ResponseParser::Raw.parse("src", body.clone()).unwrap();
        assert_eq!(out, body);
    }

    #[test]
    fn test_pointer_parser_extracts_value() {
        let body = serde_json::json!({"rates": {"BRL": 5.43}});
        let parser = ResponseParser::Pointer {
            pointer: "/rates/BRL".to_string(),
        };
        let out = parser.parse("src", body).unwrap();
        assert_eq!(out, serde_json::json!(5.43));
    }

    #[test]
    fn test_pointer_parser_rejects_missing_path() {
        let body = serde_json::json!({"rates": {}});
        let parser = ResponseParser::Pointer {
            pointer: "/rates/BRL".to_string(),
        };
        let err = parser.parse("src", body).unwrap_err();
        assert!(matches!(err, OracleError::MalformedResponse { .. }));
    }

    #[test]
    fn test_pointer_parser_rejects_explicit_null() {
        let body = serde_json::json!({"rate": null});
        let parser = ResponseParser::Pointer {
            pointer: "/rate".to_string(),
        };
        assert!(parser.parse("src", body).is_err());
    }

    #[test]
    fn test_parser_serde_roundtrip() {
        let parser = ResponseParser::Pointer {
            pointer: "/a/b".to_string(),
        };
        let json = serde_json::to_string(&parser).unwrap();
        let back: ResponseParser = serde_json::from_str(&json).unwrap();
        assert_eq!(parser, back);
    }
}
