use reqwest::StatusCode;

pub(crate) fn rejected_key_status(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

pub(crate) fn with_trailing_slash(base: &str) -> String {
    let base = base.trim();
    if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    }
}

pub(crate) fn append_query(url: &str, params: &[(&str, &str)]) -> String {
    let mut out = url.to_string();
    let mut sep = if url.contains('?') { '&' } else { '?' };
    for (k, v) in params {
        out.push(sep);
        sep = '&';
        out.push_str(k);
        out.push('=');
        out.push_str(v);
    }
    out
}

/// Filter expressions are passed through verbatim; only spaces are escaped.
pub(crate) fn escape_spaces(url: &str) -> String {
    url.replace(' ', "%20")
}
