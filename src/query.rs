use crate::error::Error;
use crate::util::{append_query, escape_spaces};

/// Page size used when a query does not set one.
pub const DEFAULT_PAGE_SIZE: u32 = 10_000;

/// One DD-ECO-API query: endpoint plus the parameters sent with every page.
///
/// ```
/// use ddecoapi::Query;
///
/// let query = Query::new("measurements")
///     .with_filter(r#"measurementdate:ge:"2021-04-01";taxontype:eq:"MACEV""#)
///     .with_skip_properties(["measurementobjectname"]);
///
/// assert_eq!(
///     query.url("https://ddecoapi.aquadesk.nl/v2/"),
///     "https://ddecoapi.aquadesk.nl/v2/measurements?page=1&pagesize=10000\
///      &filter=measurementdate:ge:\"2021-04-01\";taxontype:eq:\"MACEV\"\
///      &skipproperties=measurementobjectname"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Resource path relative to the base URL, e.g. `measurements` or `parameters`.
    pub endpoint: String,
    /// Filter expression in the API's filter grammar (`field:operator:"value"` clauses
    /// separated by `;`).
    pub filter: Option<String>,
    /// Properties the API should leave out of each record.
    pub skip_properties: Vec<String>,
    /// First page to request (1-based).
    pub page: u32,
    /// Records per page. A page shorter than this ends the run.
    pub page_size: u32,
    /// Split the `watertypes` column into `classificationsystem` and `watertypecode`.
    pub parse_watertypes: bool,
}

impl Query {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            filter: None,
            skip_properties: Vec::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            parse_watertypes: false,
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Accepts field names, or a single ready-made comma-separated list.
    pub fn with_skip_properties<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_properties = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_parse_watertypes(mut self, parse: bool) -> Self {
        self.parse_watertypes = parse;
        self
    }

    /// URL of the query's start page.
    pub fn url(&self, base_url: &str) -> String {
        self.url_for_page(base_url, self.page)
    }

    pub fn url_for_page(&self, base_url: &str, page: u32) -> String {
        let skip = self.skip_properties.join(",");
        build_url(
            base_url,
            &self.endpoint,
            self.filter.as_deref(),
            Some(skip.as_str()),
            page,
            self.page_size,
        )
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.page == 0 {
            return Err(Error::InvalidQuery {
                message: "page numbers start at 1".to_string(),
            });
        }
        if self.page_size == 0 {
            return Err(Error::InvalidQuery {
                message: "page size must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Builds the request URL for one page.
///
/// `base_url` and `endpoint` are joined verbatim, so the base URL should end in `/`.
/// `filter` and `skip_properties` are appended only when present and non-empty.
pub fn build_url(
    base_url: &str,
    endpoint: &str,
    filter: Option<&str>,
    skip_properties: Option<&str>,
    page: u32,
    page_size: u32,
) -> String {
    let page = page.to_string();
    let page_size = page_size.to_string();
    let mut params = vec![("page", page.as_str()), ("pagesize", page_size.as_str())];
    if let Some(filter) = filter.filter(|f| !f.is_empty()) {
        params.push(("filter", filter));
    }
    if let Some(skip) = skip_properties.filter(|s| !s.is_empty()) {
        params.push(("skipproperties", skip));
    }

    let url = append_query(&format!("{}{}", base_url, endpoint), &params);
    escape_spaces(&url)
}
