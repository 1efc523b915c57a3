use url::Url;

/// Returns only the hostname of `raw`, for use in log lines.
///
/// Provider URLs routinely embed API keys in the path, query string, or userinfo.
/// None of those survive. Unparseable input yields `"<invalid-url>"`.
#[must_use]
pub fn redacted_host(raw: &str) -> String {
    Url::parse(raw)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| "<invalid-url>".to_string())
}
