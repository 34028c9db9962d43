use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use std::cell::Cell;
use std::time::Duration;

use crate::config::load_config;
use crate::error::{AggregateError, Error, status_error};
use crate::normalize::{Table, normalize};
use crate::pagination::{PageSource, aggregate};
use crate::query::Query;
use crate::response::{Record, decode_page};
use crate::util::with_trailing_slash;

/// Base URL of the public DD-ECO-API v2.
pub const DEFAULT_URL: &str = "https://ddecoapi.aquadesk.nl/v2/";

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base API URL, typically `https://ddecoapi.aquadesk.nl/v2/`.
    pub url: String,
    /// Organisation API key, sent as `x-api-key`.
    ///
    /// Open endpoints such as `parameters` can be queried without one.
    pub key: Option<String>,
    /// Whether to verify TLS certificates.
    pub verify: bool,
}

#[derive(Debug, Clone)]
pub struct Client {
    url: String,
    key: Option<String>,

    timeout: Duration,
    progress: bool,

    http: HttpClient,
}

impl Client {
    /// Creates a client using environment variables and/or `.ddecoapirc`.
    ///
    /// This is equivalent to `Client::new(None, None, None)`.
    pub fn from_env() -> Result<Self> {
        Self::new(None, None, None)
    }

    /// Creates a client using (in order of precedence):
    /// - explicit `url`/`key` arguments
    /// - environment variables `DDECOAPI_URL` / `DDECOAPI_KEY`
    /// - config file from `DDECOAPI_RC` or `.ddecoapirc`
    /// - the public API URL, without a key
    pub fn new(url: Option<String>, key: Option<String>, verify: Option<bool>) -> Result<Self> {
        Self::with_config(load_config(url, key, verify)?)
    }

    pub fn with_config(cfg: ClientConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("ddecoapi-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("ddecoapi-rs")),
        );

        let mut builder = HttpClient::builder().default_headers(default_headers);
        if !cfg.verify {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder.build().context("failed to build HTTP client")?;

        Ok(Self {
            url: with_trailing_slash(&cfg.url),
            key: cfg.key,
            timeout: Duration::from_secs(60),
            progress: true,
            http,
        })
    }

    /// Per-request timeout (default 60 seconds).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Show a spinner with the page and record count while a query runs.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.url
    }

    /// Fetches only the start page of `query` and returns its raw records.
    ///
    /// Useful for trying out filters before running the full query.
    pub fn query_page(&self, query: &Query) -> std::result::Result<Vec<Record>, Error> {
        query.validate()?;
        self.get_page(&query.url(&self.url))
    }

    /// Fetches all pages of `query`, in order, without flattening them.
    pub fn fetch_records(&self, query: &Query) -> std::result::Result<Vec<Record>, AggregateError> {
        if !self.progress {
            return aggregate(self, &self.url, query);
        }

        let tracked = Tracked::new(self, &query.endpoint);
        let result = aggregate(&tracked, &self.url, query);
        tracked.bar.finish_and_clear();
        result
    }

    /// Fetches all pages of `query` and flattens them into a [`Table`].
    ///
    /// With [`Query::parse_watertypes`] set, the `watertypes` column is split into
    /// `classificationsystem` and `watertypecode`.
    pub fn fetch_table(&self, query: &Query) -> std::result::Result<Table, AggregateError> {
        let records = self.fetch_records(query)?;
        Ok(normalize(&records, query.parse_watertypes))
    }

    fn get_page(&self, url: &str) -> std::result::Result<Vec<Record>, Error> {
        let mut req = self
            .http
            .get(url)
            .timeout(self.timeout)
            .header(ACCEPT, "application/json");
        if let Some(key) = &self.key {
            req = req.header(API_KEY_HEADER, key.trim());
        }

        let resp = req.send().map_err(|source| Error::Network {
            url: url.to_string(),
            source,
        })?;

        let status = resp.status();
        let text = resp.text().map_err(|source| Error::Network {
            url: url.to_string(),
            source,
        })?;
        if !status.is_success() {
            return Err(status_error(status, url, &text));
        }

        decode_page(url, &text)
    }
}

impl PageSource for Client {
    fn fetch_page(&self, url: &str) -> std::result::Result<Vec<Record>, Error> {
        self.get_page(url)
    }
}

/// Wraps a page source with a terminal spinner.
struct Tracked<'a, S: ?Sized> {
    inner: &'a S,
    bar: ProgressBar,
    pages: Cell<u32>,
}

impl<'a, S: PageSource + ?Sized> Tracked<'a, S> {
    fn new(inner: &'a S, endpoint: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} {prefix} {msg} ({pos} records, {elapsed})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix(endpoint.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        Self {
            inner,
            bar,
            pages: Cell::new(0),
        }
    }
}

impl<S: PageSource + ?Sized> PageSource for Tracked<'_, S> {
    fn fetch_page(&self, url: &str) -> std::result::Result<Vec<Record>, Error> {
        self.bar.set_message(format!("page {}", self.pages.get() + 1));
        let records = self.inner.fetch_page(url)?;
        self.pages.set(self.pages.get() + 1);
        self.bar.inc(records.len() as u64);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    struct Pages(RefCell<Vec<Vec<Record>>>);

    impl PageSource for Pages {
        fn fetch_page(&self, _url: &str) -> std::result::Result<Vec<Record>, Error> {
            Ok(self.0.borrow_mut().remove(0))
        }
    }

    fn config(url: &str) -> ClientConfig {
        ClientConfig {
            url: url.to_string(),
            key: Some("k".to_string()),
            verify: true,
        }
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let client = Client::with_config(config("https://x/v2")).unwrap();
        assert_eq!(client.base_url(), "https://x/v2/");
    }

    #[test]
    fn invalid_query_is_rejected_before_sending() {
        let client = Client::with_config(config("http://127.0.0.1:9/v2/")).unwrap();
        let err = client
            .query_page(&Query::new("measurements").with_page(0))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidQuery { .. }));
    }

    #[test]
    fn tracked_source_counts_records_and_pages() {
        let page = |n: u64| -> Vec<Record> {
            (0..n)
                .map(|i| json!({ "i": i }).as_object().cloned().unwrap())
                .collect()
        };
        let inner = Pages(RefCell::new(vec![page(2), page(1)]));
        let tracked = Tracked::new(&inner, "measurements");

        let query = Query::new("measurements").with_page_size(2);
        let out = aggregate(&tracked, "https://x/v2/", &query).unwrap();
        tracked.bar.finish_and_clear();

        assert_eq!(out.len(), 3);
        assert_eq!(tracked.pages.get(), 2);
        assert_eq!(tracked.bar.position(), 3);
    }
}
