//! Request header assembly.

use crate::protocol::{HttpMethod, PingRequest};
use crate::{PING_HEADER, USER_AGENT};

/// Request headers in insertion order with case-insensitive names.
///
/// Setting a name that is already present replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedHeaders {
    entries: Vec<(String, String)>,
}

impl OrderedHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(name, _)| name.eq_ignore_ascii_case(key)) {
            Some(entry) => *entry = (key.to_string(), value.to_string()),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Headers sent for a probe using `method`.
///
/// Defaults come first, then the user's headers in their configured order.
/// A user header overrides a default of the same name; entries with an empty
/// key are dropped.
pub fn request_headers(request: &PingRequest, method: HttpMethod) -> OrderedHeaders {
    let mut headers = OrderedHeaders::new();
    headers.set("User-Agent", USER_AGENT);
    headers.set(PING_HEADER.0, PING_HEADER.1);
    headers.set("Cache-Control", "no-cache");

    for header in &request.headers {
        let key = header.key.trim();
        if key.is_empty() {
            continue;
        }
        headers.set(key, &header.value);
    }

    if method.allows_body() && !headers.contains("content-type") {
        headers.set("Content-Type", "application/json");
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_come_first() {
        let request = PingRequest::new("https://example.com").with_header("X-Trace", "1");
        let headers = request_headers(&request, HttpMethod::Get);

        let names: Vec<&str> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["User-Agent", "OpenStatus-Ping", "Cache-Control", "X-Trace"]);
        assert!(!headers.contains("content-type"));
    }

    #[test]
    fn test_user_headers_override_defaults() {
        let request = PingRequest::new("https://example.com")
            .with_header("user-agent", "custom/2.0")
            .with_header("openstatus-ping", "false");
        let headers = request_headers(&request, HttpMethod::Get);

        assert_eq!(headers.len(), 3);
        assert_eq!(headers.get("User-Agent"), Some("custom/2.0"));
        assert_eq!(headers.get("OpenStatus-Ping"), Some("false"));
    }

    #[test]
    fn test_empty_keys_are_dropped() {
        let request = PingRequest::new("https://example.com").with_header("  ", "x").with_header("", "y");
        assert_eq!(request_headers(&request, HttpMethod::Get).len(), 3);
    }

    #[test]
    fn test_content_type_default_for_body_methods() {
        let request = PingRequest::new("https://example.com");
        assert_eq!(
            request_headers(&request, HttpMethod::Post).get("content-type"),
            Some("application/json")
        );
        assert!(!request_headers(&request, HttpMethod::Head).contains("content-type"));

        let request = request.with_header("Content-Type", "text/plain");
        assert_eq!(request_headers(&request, HttpMethod::Put).get("content-type"), Some("text/plain"));
    }
}
