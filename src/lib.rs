//! Fetches the URLs the [Wayback Machine](https://web.archive.org) has
//! archived for a domain, and the snapshots it holds for a single URL.

pub mod archive;
pub mod config;
pub mod error;
pub mod fetch;
pub mod subdomain;
pub mod versions;
