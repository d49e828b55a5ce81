//! Redaction of sensitive values before they reach the logs.
//!
//! Field and header names are matched exactly after lowercasing. A match
//! replaces the whole value (including nested objects) with [`REDACTED`];
//! everything else is copied through untouched. Inputs are never mutated.

mod defaults;

use std::collections::{HashMap, HashSet};

pub use defaults::{DEFAULT_SENSITIVE_FIELDS, DEFAULT_SENSITIVE_HEADERS};
use http::{HeaderMap, HeaderValue};
use serde_json::Value;

use crate::config::RedactionConfig;

/// Marker written in place of a redacted value.
pub const REDACTED: &str = "******";

/// The sets of names the sanitizer redacts.
#[derive(Debug, Clone)]
pub struct SanitizerConfig {
    fields: HashSet<String>,
    headers: HashSet<String>,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self::empty()
            .with_fields(DEFAULT_SENSITIVE_FIELDS.iter().copied())
            .with_headers(DEFAULT_SENSITIVE_HEADERS.iter().copied())
    }
}

impl SanitizerConfig {
    /// A config that redacts nothing.
    pub fn empty() -> Self {
        Self {
            fields: HashSet::new(),
            headers: HashSet::new(),
        }
    }

    pub fn with_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.fields
            .extend(names.into_iter().map(|n| n.as_ref().to_lowercase()));
        self
    }

    pub fn with_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.headers
            .extend(names.into_iter().map(|n| n.as_ref().to_lowercase()));
        self
    }

    /// Built-in defaults extended with the names from the `[sanitizer]` section.
    pub fn from_redaction_config(config: &RedactionConfig) -> Self {
        Self::default()
            .with_fields(&config.extra_fields)
            .with_headers(&config.extra_headers)
    }
}

/// Redacts sensitive fields from JSON payloads and sensitive headers from
/// header maps.
#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
    config: SanitizerConfig,
}

impl Sanitizer {
    pub fn new(config: SanitizerConfig) -> Self {
        Self { config }
    }

    /// Add field names to redact.
    pub fn add_sensitive_fields<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config
            .fields
            .extend(names.into_iter().map(|n| n.as_ref().to_lowercase()));
    }

    /// Add header names to redact.
    pub fn add_sensitive_headers<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config
            .headers
            .extend(names.into_iter().map(|n| n.as_ref().to_lowercase()));
    }

    pub fn is_sensitive_field(&self, name: &str) -> bool {
        self.config.fields.contains(&name.to_lowercase())
    }

    pub fn is_sensitive_header(&self, name: &str) -> bool {
        self.config.headers.contains(&name.to_lowercase())
    }

    /// Return a redacted copy of a JSON value.
    pub fn sanitize_value(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| {
                        if self.is_sensitive_field(k) {
                            (k.clone(), Value::String(REDACTED.to_string()))
                        } else {
                            (k.clone(), self.sanitize_value(v))
                        }
                    })
                    .collect(),
            ),
            Value::Array(items) => {
                Value::Array(items.iter().map(|v| self.sanitize_value(v)).collect())
            }
            other => other.clone(),
        }
    }

    /// Redact a raw JSON body, returning compact JSON.
    ///
    /// Empty input yields an empty string. Input that does not parse as JSON
    /// is returned as-is so non-JSON bodies can still be logged.
    pub fn sanitize_json(&self, body: &[u8]) -> String {
        if body.is_empty() {
            return String::new();
        }

        match serde_json::from_slice::<Value>(body) {
            Ok(value) => serde_json::to_string(&self.sanitize_value(&value))
                .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned()),
            Err(_) => String::from_utf8_lossy(body).into_owned(),
        }
    }

    /// Return a copy of `headers` with every sensitive header collapsed to a
    /// single redacted value.
    pub fn sanitize_headers(&self, headers: &HeaderMap) -> HeaderMap {
        let mut sanitized = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            if self.is_sensitive_header(name.as_str()) {
                sanitized.insert(name.clone(), HeaderValue::from_static(REDACTED));
            } else {
                sanitized.append(name.clone(), value.clone());
            }
        }
        sanitized
    }

    /// Same as [`Sanitizer::sanitize_headers`] for plain string maps.
    pub fn sanitize_headers_map(&self, headers: &HashMap<String, String>) -> HashMap<String, String> {
        headers
            .iter()
            .map(|(k, v)| {
                if self.is_sensitive_header(k) {
                    (k.clone(), REDACTED.to_string())
                } else {
                    (k.clone(), v.clone())
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_sanitize_nested_object() {
        let sanitizer = Sanitizer::default();
        let output = sanitizer.sanitize_json(br#"{"password":"x","user":{"token":"y"}}"#);
        assert_eq!(output, r#"{"password":"******","user":{"token":"******"}}"#);
    }

    #[rstest]
    #[case("password")]
    #[case("PASSWORD")]
    #[case("Password")]
    #[case("Api_Key")]
    #[case("ACCESS_TOKEN")]
    fn test_field_match_is_case_insensitive(#[case] key: &str) {
        let sanitizer = Sanitizer::default();
        let value = json!({ key: "hunter2" });
        assert_eq!(sanitizer.sanitize_value(&value)[key], REDACTED);
    }

    #[rstest]
    #[case("passwords")]
    #[case("my_password")]
    #[case("tokenizer")]
    #[case("keyboard")]
    fn test_field_match_is_exact_not_substring(#[case] key: &str) {
        let sanitizer = Sanitizer::default();
        let value = json!({ key: "visible" });
        assert_eq!(sanitizer.sanitize_value(&value)[key], "visible");
    }

    #[test]
    fn test_arrays_are_walked() {
        let sanitizer = Sanitizer::default();
        let value = json!({
            "participants": [
                {"email": "a@example.com", "token": "t1"},
                {"email": "b@example.com", "session": {"id": 1}},
                [{"secret": "deep"}],
                "plain",
                42
            ]
        });

        let sanitized = sanitizer.sanitize_value(&value);
        assert_eq!(sanitized["participants"][0]["email"], "a@example.com");
        assert_eq!(sanitized["participants"][0]["token"], REDACTED);
        assert_eq!(sanitized["participants"][1]["session"], REDACTED);
        assert_eq!(sanitized["participants"][2][0]["secret"], REDACTED);
        assert_eq!(sanitized["participants"][3], "plain");
        assert_eq!(sanitized["participants"][4], 42);
    }

    #[test]
    fn test_sensitive_key_with_null_or_number_is_redacted() {
        let sanitizer = Sanitizer::default();
        let sanitized = sanitizer.sanitize_value(&json!({"pin": 1234, "token": null}));
        assert_eq!(sanitized["pin"], REDACTED);
        assert_eq!(sanitized["token"], REDACTED);
    }

    #[test]
    fn test_leaves_pass_through() {
        let sanitizer = Sanitizer::default();
        let value = json!({"name": "room", "is_public": false, "count": 3, "topic": null});
        assert_eq!(sanitizer.sanitize_value(&value), value);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let sanitizer = Sanitizer::default();
        let value = json!({"password": "x"});
        let _ = sanitizer.sanitize_value(&value);
        assert_eq!(value["password"], "x");
    }

    #[test]
    fn test_top_level_array() {
        let sanitizer = Sanitizer::default();
        let output = sanitizer.sanitize_json(br#"[{"api_key":"k"},{"name":"n"}]"#);
        assert_eq!(output, r#"[{"api_key":"******"},{"name":"n"}]"#);
    }

    #[test]
    fn test_empty_input_returns_empty() {
        assert_eq!(Sanitizer::default().sanitize_json(b""), "");
    }

    #[rstest]
    #[case("not json at all")]
    #[case("{\"password\": ")]
    #[case("password=hunter2&user=bob")]
    fn test_invalid_json_returned_unchanged(#[case] input: &str) {
        assert_eq!(Sanitizer::default().sanitize_json(input.as_bytes()), input);
    }

    #[test]
    fn test_output_is_compact() {
        let output =
            Sanitizer::default().sanitize_json(b"{\n  \"room\": {\n    \"ids\": [1, 2]\n  }\n}");
        assert_eq!(output, r#"{"room":{"ids":[1,2]}}"#);
    }

    #[test]
    fn test_sanitize_headers() {
        let sanitizer = Sanitizer::default();
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc"));
        headers.insert("qiscus-secret-key", HeaderValue::from_static("s3cret"));
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("set-cookie", HeaderValue::from_static("b=2"));
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let sanitized = sanitizer.sanitize_headers(&headers);
        assert_eq!(sanitized["authorization"], REDACTED);
        assert_eq!(sanitized["qiscus-secret-key"], REDACTED);
        assert_eq!(sanitized.get_all("set-cookie").iter().count(), 1);
        assert_eq!(sanitized["set-cookie"], REDACTED);
        assert_eq!(sanitized["content-type"], "application/json");

        // original untouched
        assert_eq!(headers["authorization"], "Bearer abc");
        assert_eq!(headers.get_all("set-cookie").iter().count(), 2);
    }

    #[test]
    fn test_sanitize_headers_map_ignores_case() {
        let sanitizer = Sanitizer::default();
        let headers = HashMap::from([
            ("Qiscus-Secret-Key".to_string(), "s3cret".to_string()),
            ("X-Request-Id".to_string(), "req-1".to_string()),
        ]);

        let sanitized = sanitizer.sanitize_headers_map(&headers);
        assert_eq!(sanitized["Qiscus-Secret-Key"], REDACTED);
        assert_eq!(sanitized["X-Request-Id"], "req-1");
    }

    #[test]
    fn test_add_sensitive_names_at_runtime() {
        let mut sanitizer = Sanitizer::default();
        assert!(!sanitizer.is_sensitive_field("otp"));
        assert!(!sanitizer.is_sensitive_header("x-signature"));

        sanitizer.add_sensitive_fields(["OTP"]);
        sanitizer.add_sensitive_headers(["X-Signature"]);

        assert!(sanitizer.is_sensitive_field("otp"));
        assert!(sanitizer.is_sensitive_header("x-signature"));
        assert_eq!(sanitizer.sanitize_json(br#"{"otp":"123456"}"#), r#"{"otp":"******"}"#);
    }

    #[test]
    fn test_from_redaction_config_keeps_defaults() {
        let config = SanitizerConfig::from_redaction_config(&RedactionConfig {
            extra_fields: vec!["Otp".into()],
            extra_headers: vec![],
        });
        let sanitizer = Sanitizer::new(config);
        assert!(sanitizer.is_sensitive_field("otp"));
        assert!(sanitizer.is_sensitive_field("password"));
        assert!(sanitizer.is_sensitive_header("authorization"));
    }

    #[test]
    fn test_empty_config_redacts_nothing() {
        let sanitizer = Sanitizer::new(SanitizerConfig::empty());
        let value = json!({"password": "x"});
        assert_eq!(sanitizer.sanitize_value(&value), value);
    }
}
