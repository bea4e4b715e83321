use std::time::Duration;

use reqwest::Url;

use crate::error::{Error, Result};

pub static INDEX_URL_ENV_VAR: &str = "WAYBACK_URLS_INDEX_URL";
pub static DEFAULT_INDEX_URL: &str = "http://web.archive.org/cdx/search/cdx";
pub const DEFAULT_TASK_TIMEOUT_SECS: u64 = 300;

/// Settings for one invocation. Built once from the command line and then
/// only read.
#[derive(Clone, Debug)]
pub struct Config {
    /// Query only the bare domain and drop any subdomain URLs the index
    /// returns anyway.
    pub exclude_subdomains: bool,
    /// Restrict results to the last `days_back` days. Zero means no bound.
    pub days_back: u32,
    /// Prefix each printed URL with its snapshot time.
    pub show_dates: bool,
    /// Upper bound on a single strategy call. `None` waits forever.
    pub task_timeout: Option<Duration>,
    pub index_url: Url,
}

impl Config {
    pub fn new(index_url: &str) -> Result<Self> {
        let index_url = Url::parse(index_url)?;
        if index_url.cannot_be_a_base() {
            return Err(Error::InvalidArgument(format!(
                "index url must be absolute: {}",
                index_url
            )));
        }
        Ok(Self {
            exclude_subdomains: false,
            days_back: 0,
            show_dates: false,
            task_timeout: Some(Duration::from_secs(DEFAULT_TASK_TIMEOUT_SECS)),
            index_url,
        })
    }
}

#[cfg(test)]
impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_URL).expect("default index url is valid")
    }
}

/// Maps a timeout given in whole seconds on the command line, where zero
/// disables the bound.
#[must_use]
pub fn task_timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_targets_public_index_without_bounds() {
        let config = Config::default();
        assert_eq!(config.index_url.as_str(), DEFAULT_INDEX_URL);
        assert_eq!(config.days_back, 0);
        assert!(!config.exclude_subdomains);
    }

    #[test]
    fn test_config_rejects_relative_index_url() {
        assert!(Config::new("cdx/search").is_err());
        assert!(Config::new("mailto:someone@example.com").is_err());
    }

    #[test]
    fn test_task_timeout_zero_disables_bound() {
        assert_eq!(task_timeout_from_secs(0), None);
        assert_eq!(task_timeout_from_secs(5), Some(Duration::from_secs(5)));
    }
}
