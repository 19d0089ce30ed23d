use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

/// Marker patterns that platform pages use to embed their hydration state,
/// in priority order. The first pattern that matches is authoritative; no
/// merging across patterns.
static MARKERS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        (
            "sigi-script",
            Regex::new(r#"(?is)<script[^>]+id="SIGI_STATE"[^>]*>(.*?)</script>"#).unwrap(),
        ),
        (
            "universal-data-script",
            Regex::new(
                r#"(?is)<script[^>]+id="__UNIVERSAL_DATA_FOR_REHYDRATION__"[^>]*>(.*?)</script>"#,
            )
            .unwrap(),
        ),
        (
            "sigi-window-assignment",
            Regex::new(
                r#"(?s)window\s*(?:\.\s*SIGI_STATE|\[\s*["']SIGI_STATE["']\s*\])\s*=\s*(\{.*?\})\s*;"#,
            )
            .unwrap(),
        ),
    ]
});

/// Undoes the handful of HTML entities platform pages escape inside their
/// embedded JSON. `&amp;` goes last so it cannot manufacture new entities.
fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#34;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

fn parse_payload(raw: &str) -> Option<Value> {
    // A top-level string is the double-encoded case: the decoded content
    // of the string literal is the actual JSON document.
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::String(inner)) => serde_json::from_str(&inner).ok(),
        Ok(value) => Some(value),
        Err(_) => {
            let trimmed = raw.trim().trim_end_matches(';');
            match serde_json::from_str::<Value>(trimmed) {
                Ok(Value::String(inner)) => serde_json::from_str(&inner).ok(),
                Ok(value) => Some(value),
                Err(_) => None,
            }
        }
    }
}

/// Locates and parses the structured data blob embedded in page HTML.
/// Returns `None` when no marker yields a parse — an empty signal, not an
/// error; the orchestrator moves on to the next strategy.
pub fn extract_embedded_json(page_html: &str) -> Option<Value> {
    for (name, pattern) in MARKERS.iter() {
        let Some(caps) = pattern.captures(page_html) else {
            continue;
        };
        let mut raw = unescape_html(caps[1].trim());
        // Assignment expressions keep only the right-hand side.
        if raw.starts_with("window") && raw.contains('=') {
            raw = raw
                .split_once('=')
                .map(|(_, rhs)| rhs.trim().trim_end_matches(';').to_string())
                .unwrap_or(raw);
        }
        match parse_payload(&raw) {
            Some(value) => {
                debug!(marker = name, "embedded data matched");
                return Some(value);
            }
            None => {
                debug!(marker = name, "marker matched but payload did not parse");
                continue;
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PAYLOAD: &str = r#"{"ItemModule":{"1":{"id":"1"}},"count":2}"#;

    #[test]
    fn test_all_marker_variants_yield_equivalent_value() {
        let expected = json!({"ItemModule": {"1": {"id": "1"}}, "count": 2});
        let pages = [
            format!(r#"<html><script id="SIGI_STATE" type="application/json">{PAYLOAD}</script>"#),
            format!(
                r#"<script id="__UNIVERSAL_DATA_FOR_REHYDRATION__" type="application/json">{PAYLOAD}</script>"#
            ),
            format!(r#"<script>window["SIGI_STATE"] = {PAYLOAD};</script>"#),
            format!(r#"<script>window.SIGI_STATE = {PAYLOAD};</script>"#),
        ];
        for page in &pages {
            assert_eq!(extract_embedded_json(page).as_ref(), Some(&expected));
        }
    }

    #[test]
    fn test_first_matching_marker_is_authoritative() {
        let page = r#"<script id="SIGI_STATE">{"from":"first"}</script>
               <script id="__UNIVERSAL_DATA_FOR_REHYDRATION__">{"from":"second"}</script>"#;
        assert_eq!(extract_embedded_json(page), Some(json!({"from": "first"})));
    }

    #[test]
    fn test_html_entities_are_unescaped() {
        let page = r#"<script id="SIGI_STATE">{&quot;url&quot;:&quot;https://a?x=1&amp;y=2&quot;}</script>"#;
        assert_eq!(
            extract_embedded_json(page),
            Some(json!({"url": "https://a?x=1&y=2"}))
        );
    }

    #[test]
    fn test_double_encoded_payload_recovers() {
        let page = r#"<script id="SIGI_STATE">"{\"a\":1}"</script>"#;
        assert_eq!(extract_embedded_json(page), Some(json!({"a": 1})));
    }

    #[test]
    fn test_unparseable_marker_falls_through_to_next() {
        let page = format!(
            r#"<script id="SIGI_STATE">not json at all</script>
               <script id="__UNIVERSAL_DATA_FOR_REHYDRATION__">{PAYLOAD}</script>"#
        );
        let value = extract_embedded_json(&page).unwrap();
        assert_eq!(value["count"], json!(2));
    }

    #[test]
    fn test_no_structured_data_is_none() {
        assert_eq!(extract_embedded_json("<html><body>plain page</body></html>"), None);
    }
}
