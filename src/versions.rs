//! Lists every archived snapshot of a known URL.

use crate::{
    archive::{ArchiveClient, CdxQuery},
    error::Result,
};

/// Returns a direct snapshot address for each capture of exactly `url`, in
/// the order the index reports them.
///
/// # Errors
///
/// Fails if the archive index cannot be queried; see [`ArchiveClient::query`].
pub async fn resolve_versions(client: &ArchiveClient, url: &str) -> Result<Vec<String>> {
    let records = client.query(&CdxQuery::for_exact_url(url)).await?;
    Ok(records.iter().map(|record| record.snapshot_url()).collect())
}
