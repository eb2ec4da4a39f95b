use crate::types::{QueryParams, RealtimeError, Result};
use url::Url;

/// Parses an endpoint and checks it against the schemes its transport accepts
pub fn parse_endpoint(raw: &str, schemes: &[&str]) -> Result<Url> {
    let url = Url::parse(raw)?;
    if !schemes.contains(&url.scheme()) {
        return Err(RealtimeError::Config(format!(
            "unsupported scheme '{}' for endpoint {} (expected one of: {})",
            url.scheme(),
            raw,
            schemes.join(", ")
        )));
    }
    Ok(url)
}

/// Returns a copy of `base` with `query` appended after any existing pairs
pub fn with_query(base: &Url, query: Option<&QueryParams>) -> Url {
    let mut url = base.clone();
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query.iter() {
            pairs.append_pair(key, value);
        }
    }
    url
}

/// Appends the token as a query parameter when enabled and present
pub fn with_token(base: &Url, token: Option<&str>, include_in_query: bool, param: &str) -> Url {
    match token {
        Some(token) if include_in_query => {
            with_query(base, Some(&QueryParams::new().append(param, token)))
        }
        _ => base.clone(),
    }
}
