//! A client for the Wayback Machine's CDX index.
//!
//! The index answers a query with a JSON table: an array of rows where every
//! row is an array of strings. The first row names the columns and the rest
//! are `[urlkey, timestamp, original, mimetype, statuscode, digest, length]`.

use std::fmt;

use chrono::{Local, NaiveDate, NaiveDateTime};
use reqwest::Url;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Direct snapshot access is `<prefix><timestamp>/<original url>`.
pub static SNAPSHOT_URL_PREFIX: &str = "http://web.archive.org/web/";

static TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
static QUERY_DATE_FORMAT: &str = "%Y%m%d";
const TIMESTAMP_COLUMN: usize = 1;
const ORIGINAL_COLUMN: usize = 2;

/// One URL known to the archive together with the snapshot time it was
/// reported under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchivedUrl {
    date: String,
    url: String,
}

impl ArchivedUrl {
    pub fn new(date: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            url: url.into(),
        }
    }

    /// Raw archive timestamp, `YYYYMMDDHHMMSS`.
    #[must_use]
    pub fn date(&self) -> &str {
        &self.date
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn into_url(self) -> String {
        self.url
    }

    /// Parses [`Self::date`]. Archive timestamps are UTC.
    #[must_use]
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.date, TIMESTAMP_FORMAT).ok()
    }

    /// Builds the address of this exact snapshot.
    #[must_use]
    pub fn snapshot_url(&self) -> String {
        format!("{}{}/{}", SNAPSHOT_URL_PREFIX, self.date, self.url)
    }

    fn from_row(row: Vec<String>) -> Option<Self> {
        if row.len() <= ORIGINAL_COLUMN {
            log::warn!("skipping short archive index row: {:?}", row);
            return None;
        }
        let mut columns = row.into_iter();
        let date = columns.nth(TIMESTAMP_COLUMN)?;
        let url = columns.next()?;
        Some(Self { date, url })
    }
}

impl fmt::Display for ArchivedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Parameters of a single CDX request.
#[derive(Clone, Debug, PartialEq)]
pub struct CdxQuery {
    url_pattern: String,
    collapse_urlkey: bool,
    from: Option<NaiveDate>,
}

impl CdxQuery {
    /// Every URL under `domain`, one row per distinct URL key.
    #[must_use]
    pub fn for_domain(domain: &str, exclude_subdomains: bool) -> Self {
        let wildcard = if exclude_subdomains { "" } else { "*." };
        Self {
            url_pattern: format!("{}{}/*", wildcard, domain),
            collapse_urlkey: true,
            from: None,
        }
    }

    /// Every snapshot of exactly `url`.
    #[must_use]
    pub fn for_exact_url(url: &str) -> Self {
        Self {
            url_pattern: url.to_owned(),
            collapse_urlkey: false,
            from: None,
        }
    }

    /// Only snapshots taken on or after `from`. The upper end is left open.
    #[must_use]
    pub fn since(mut self, from: NaiveDate) -> Self {
        self.from = Some(from);
        self
    }

    #[must_use]
    pub fn url_pattern(&self) -> &str {
        &self.url_pattern
    }

    #[must_use]
    pub fn to_url(&self, index_url: &Url) -> Url {
        let mut url = index_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("url", &self.url_pattern);
            pairs.append_pair("output", "json");
            if self.collapse_urlkey {
                pairs.append_pair("collapse", "urlkey");
            }
            if let Some(from) = self.from {
                pairs.append_pair("from", &from.format(QUERY_DATE_FORMAT).to_string());
            }
        }
        url
    }
}

/// `today` minus `days_back` days, or `None` when that falls before the
/// earliest representable date.
#[must_use]
pub fn days_ago(days_back: u32, today: NaiveDate) -> Option<NaiveDate> {
    today.checked_sub_signed(chrono::Duration::days(i64::from(days_back)))
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(transparent)]
struct CdxResponse {
    rows: Vec<Vec<String>>,
}

/// Converts a CDX JSON table into records. The header row is dropped and
/// rows too short to hold a timestamp and URL are skipped.
pub(crate) fn parse_rows(body: &str) -> Result<Vec<ArchivedUrl>> {
    // The index answers an empty result set with an empty body.
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let CdxResponse { rows } = serde_json::from_str(body)?;
    Ok(rows
        .into_iter()
        .skip(1)
        .filter_map(ArchivedUrl::from_row)
        .collect())
}

#[derive(Clone, Debug)]
pub struct ArchiveClient {
    index_url: Url,
    http_client: reqwest::Client,
}

impl ArchiveClient {
    pub fn new(index_url: Url, http_client: reqwest::Client) -> Self {
        Self {
            index_url,
            http_client,
        }
    }

    /// Lists URLs archived under `domain`, limited to the last `days_back`
    /// days when it is non-zero.
    ///
    /// # Errors
    ///
    /// Fails on a network error, a non-success status or a body that is not
    /// a CDX JSON table.
    pub async fn fetch(
        &self,
        domain: &str,
        exclude_subdomains: bool,
        days_back: u32,
    ) -> Result<Vec<ArchivedUrl>> {
        let mut query = CdxQuery::for_domain(domain, exclude_subdomains);
        if days_back > 0 {
            match days_ago(days_back, Local::now().date_naive()) {
                Some(from) => query = query.since(from),
                // Earlier than any capture, so the window covers everything.
                None => log::debug!("{} days back predates the calendar; fetching all", days_back),
            }
        }
        self.query(&query).await
    }

    /// Runs an arbitrary CDX query.
    ///
    /// # Errors
    ///
    /// See [`Self::fetch`].
    pub async fn query(&self, query: &CdxQuery) -> Result<Vec<ArchivedUrl>> {
        let url = query.to_url(&self.index_url);
        log::debug!("querying archive index: {}", url);
        let resp = self.http_client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status(status));
        }
        let body = resp.text().await?;
        let records = parse_rows(&body)?;
        log::debug!(
            "archive index returned {} records for {}",
            records.len(),
            query.url_pattern()
        );
        Ok(records)
    }
}
