//! HTTP response extraction and handling.

use std::collections::BTreeMap;

use hyper::header::{HeaderMap, LOCATION};

/// Extract all response headers.
///
/// Names are lowercase; repeated headers are joined with `", "`. Values that
/// are not visible ASCII are skipped.
pub fn extract_response_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut extracted: BTreeMap<String, String> = BTreeMap::new();

    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };

        extracted
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    extracted
}

/// Redirect target of a response, if any
pub fn extract_location(headers: &HeaderMap) -> Option<String> {
    headers.get(LOCATION)?.to_str().ok().map(str::to_string)
}
