use std::time::Duration;

use chrono::{DateTime, Utc};
use common::RawRecord;
use http::{header, HeaderMap, StatusCode};
use serde_json::Value;

/// One non-empty page of a collection endpoint.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-indexed page number as sent in the `page` query parameter.
    pub number: u32,
    pub records: Vec<RawRecord>,
}

impl Page {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitUpdate {
    pub limit: i64,
    pub remaining: i64,
    pub reset: DateTime<Utc>,
}

pub fn parse_rate_limit(headers: &HeaderMap) -> Option<RateLimitUpdate> {
    let limit = header_i64(headers, "x-ratelimit-limit")?;
    let remaining = header_i64(headers, "x-ratelimit-remaining")?;
    let reset_ts = header_i64(headers, "x-ratelimit-reset")?;
    let reset = DateTime::from_timestamp(reset_ts, 0)?;
    Some(RateLimitUpdate {
        limit,
        remaining,
        reset,
    })
}

#[derive(Debug, Clone)]
pub struct RetryAdvice {
    pub wait: Duration,
    pub reason: &'static str,
}

/// Host-suggested wait. Only reported; the cooldown itself is fixed.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<RetryAdvice> {
    let value = headers.get(header::RETRY_AFTER)?.to_str().ok()?;
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(RetryAdvice {
            wait: Duration::from_secs(seconds),
            reason: "retry_after",
        });
    }
    let date = httpdate::parse_http_date(value).ok()?;
    let wait = date.duration_since(std::time::SystemTime::now()).ok()?;
    Some(RetryAdvice {
        wait,
        reason: "retry_after_date",
    })
}

/// A 403/429 only counts as rate limiting when the host also says so,
/// either through an exhausted quota header or the message body.
pub fn is_rate_limited(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> bool {
    if status != StatusCode::FORBIDDEN && status != StatusCode::TOO_MANY_REQUESTS {
        return false;
    }
    if header_i64(headers, "x-ratelimit-remaining") == Some(0) {
        return true;
    }
    String::from_utf8_lossy(body)
        .to_ascii_lowercase()
        .contains("rate limit")
}

/// GitHub error bodies look like `{"message": "...", "documentation_url": "..."}`.
pub fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| common::text::preview(body, 256))
}

/// Splits a list response into records. `null` is an empty page.
pub fn decode_records(body: &[u8]) -> Result<Vec<RawRecord>, String> {
    let value: Value = serde_json::from_slice(body).map_err(|err| err.to_string())?;
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| match item {
                Value::Object(map) => Ok(map),
                other => Err(format!("element {idx} is {}", json_kind(&other))),
            })
            .collect(),
        Value::Null => Ok(Vec::new()),
        other => Err(format!("expected array, got {}", json_kind(&other))),
    }
}

pub fn decode_record(body: &[u8]) -> Result<RawRecord, String> {
    match serde_json::from_slice::<Value>(body).map_err(|err| err.to_string())? {
        Value::Object(map) => Ok(map),
        other => Err(format!("expected object, got {}", json_kind(&other))),
    }
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

fn header_i64(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn forbidden_without_marker_is_not_rate_limited() {
        let headers = HeaderMap::new();
        assert!(!is_rate_limited(
            StatusCode::FORBIDDEN,
            &headers,
            br#"{"message":"Resource not accessible by integration"}"#
        ));
    }

    #[test]
    fn body_marker_and_header_marker_both_count() {
        let headers = HeaderMap::new();
        assert!(is_rate_limited(
            StatusCode::FORBIDDEN,
            &headers,
            br#"{"message":"API rate limit exceeded for 1.2.3.4."}"#
        ));

        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        assert!(is_rate_limited(StatusCode::TOO_MANY_REQUESTS, &headers, b""));
        assert!(!is_rate_limited(StatusCode::NOT_FOUND, &headers, b"rate limit"));
    }

    #[test]
    fn rate_limit_headers_parse() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", HeaderValue::from_static("60"));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("12"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1700000000"));
        let update = parse_rate_limit(&headers).expect("headers present");
        assert_eq!(update.limit, 60);
        assert_eq!(update.remaining, 12);
        assert_eq!(update.reset.timestamp(), 1_700_000_000);
    }

    #[test]
    fn retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(header::RETRY_AFTER, HeaderValue::from_static("30"));
        let advice = parse_retry_after(&headers).expect("retry-after");
        assert_eq!(advice.wait, Duration::from_secs(30));
    }

    #[test]
    fn decode_rejects_non_arrays() {
        assert!(decode_records(br#"{"message":"x"}"#).is_err());
        assert!(decode_records(b"[1, 2]").is_err());
        assert_eq!(decode_records(b"null").map(|r| r.len()), Ok(0));
        assert_eq!(decode_records(br#"[{"id":1}]"#).map(|r| r.len()), Ok(1));
    }

    #[test]
    fn error_message_prefers_json_message() {
        assert_eq!(error_message(br#"{"message":"Not Found"}"#), "Not Found");
        assert_eq!(error_message(b"plain failure"), "plain failure");
    }
}
