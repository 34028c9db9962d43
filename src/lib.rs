//! A small Rust client for the DD-ECO-API (AquaDesk ecological data).
//!
//! This crate walks a paginated endpoint page by page until a page comes back
//! shorter than the page size, concatenates the records, and flattens them into a
//! [`Table`]. The nested `watertypes` field can optionally be split into
//! `classificationsystem` and `watertypecode` columns.
//!
//! ## Quick start
//! - Configure the API key via environment variables (`DDECOAPI_URL`, `DDECOAPI_KEY`)
//!   or a `.ddecoapirc` file (supported in the current directory and in your home
//!   directory). Open endpoints such as `parameters` work without a key.
//! - Call [`Client::fetch_table`] with a [`Query`].
//!
//! ```no_run
//! use anyhow::Result;
//! use ddecoapi::{Client, Query};
//!
//! fn main() -> Result<()> {
//!     let client = Client::from_env()?;
//!     let query = Query::new("measurements")
//!         .with_filter(r#"measurementdate:ge:"2021-04-01";taxontype:eq:"MACEV""#)
//!         .with_skip_properties(["measurementobjectname"])
//!         .with_parse_watertypes(true);
//!
//!     let table = client.fetch_table(&query)?;
//!     println!("{} rows, columns: {:?}", table.len(), table.columns());
//!     Ok(())
//! }
//! ```
//!
//! A failed run returns an [`AggregateError`] that tells a rejected API key apart
//! from other failures and still holds the records of the pages fetched before it.

#![forbid(unsafe_code)]

mod client;
mod config;
mod error;
mod normalize;
mod pagination;
mod query;
mod response;
mod util;

pub use client::{Client, ClientConfig, DEFAULT_URL};
pub use error::{AggregateError, Error};
pub use normalize::{CLASSIFICATION_SYSTEM, Table, WATERTYPE_CODE, WATERTYPES, normalize};
pub use pagination::{PageSource, aggregate};
pub use query::{DEFAULT_PAGE_SIZE, Query, build_url};
pub use response::Record;
