use reqwest::Url;

/// Returns whether the host of `candidate_url` sits strictly below
/// `root_domain`, e.g. `foo.example.com` under `example.com`. The root itself
/// and unrelated hosts that merely end in the same characters are not
/// subdomains. URLs without a scheme are read as `http`.
#[must_use]
pub fn is_subdomain(candidate_url: &str, root_domain: &str) -> bool {
    let host = match host_of(candidate_url) {
        Some(host) => host,
        None => return false,
    };
    let root = root_domain.trim_end_matches('.').to_lowercase();
    host != root && host.ends_with(&format!(".{}", root))
}

fn host_of(candidate_url: &str) -> Option<String> {
    let parsed = Url::parse(candidate_url)
        .ok()
        .filter(|url| url.has_host())
        .or_else(|| Url::parse(&format!("http://{}", candidate_url)).ok())?;
    parsed
        .host_str()
        .map(|host| host.trim_end_matches('.').to_lowercase())
}
