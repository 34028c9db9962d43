use reqwest::StatusCode;

use crate::response::Record;
use crate::util::rejected_key_status;

/// Failure of a single page request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server rejected the API key (HTTP 401/403).
    #[error(
        "DD-ECO-API rejected the API key (HTTP {status}) for url ({url})\n- Check DDECOAPI_KEY or the `key:` entry in .ddecoapirc\n- Open endpoints such as `parameters` also work without a key\n\nServer message: {message}"
    )]
    Authentication {
        status: StatusCode,
        url: String,
        message: String,
    },

    /// Any other non-success status.
    #[error("API request failed: HTTP {status} for url ({url})\n{message}")]
    Status {
        status: StatusCode,
        url: String,
        message: String,
    },

    #[error("could not connect ({url})")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The body was not a `{"result": [...]}` envelope of JSON objects.
    #[error("failed to parse API JSON (url={url})")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid query: {message}")]
    InvalidQuery { message: String },
}

impl Error {
    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication { .. })
    }

    /// Status, connection and body failures, i.e. everything the server side caused
    /// apart from a rejected key.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Status { .. } | Error::Network { .. } | Error::Decode { .. }
        )
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Authentication { status, .. } | Error::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// An aggregation run that stopped before the last page.
///
/// Records from the pages fetched before the failing one are kept, so callers can
/// decide themselves whether a truncated result is usable.
#[derive(Debug, thiserror::Error)]
#[error("query aborted at page {page}: {source}")]
pub struct AggregateError {
    page: u32,
    #[source]
    source: Error,
    partial: Vec<Record>,
}

impl AggregateError {
    pub(crate) fn new(page: u32, source: Error, partial: Vec<Record>) -> Self {
        Self {
            page,
            source,
            partial,
        }
    }

    /// Page whose request failed.
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn error(&self) -> &Error {
        &self.source
    }

    pub fn into_error(self) -> Error {
        self.source
    }

    /// Records aggregated before the failure, in fetch order.
    pub fn partial(&self) -> &[Record] {
        &self.partial
    }

    pub fn into_partial(self) -> Vec<Record> {
        self.partial
    }

    pub fn is_authentication(&self) -> bool {
        self.source.is_authentication()
    }
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) detail: Option<String>,
    // Some gateways answer with {"message": ...} only
    #[serde(default)]
    pub(crate) message: Option<String>,
}

impl ApiErrorBody {
    fn summary(&self) -> Option<String> {
        let head = self.title.as_deref().or(self.message.as_deref());
        match (head, self.detail.as_deref()) {
            (Some(h), Some(d)) => Some(format!("{}\n{}", h, d)),
            (Some(h), None) => Some(h.to_string()),
            (None, Some(d)) => Some(d.to_string()),
            (None, None) => None,
        }
    }
}

pub(crate) fn status_error(status: StatusCode, url: &str, body: &str) -> Error {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|e| e.summary())
        .unwrap_or_else(|| body.trim().to_string());

    if rejected_key_status(status) {
        return Error::Authentication {
            status,
            url: url.to_string(),
            message,
        };
    }

    Error::Status {
        status,
        url: url.to_string(),
        message,
    }
}
