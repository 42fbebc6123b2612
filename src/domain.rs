use url::Url;

/// Cookie scope for a site URL, approximated as the last two host labels.
///
/// Hosts with more than two labels get a leading dot (`.example.com`); shorter
/// hosts are returned as-is. Multi-part public suffixes such as `co.uk` are not
/// recognised, so `tracker.example.co.uk` yields `.co.uk`. Input that does not
/// parse as a URL is returned unchanged.
pub fn cookie_domain(site_url: &str) -> String {
    let host = match Url::parse(site_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
    {
        Some(host) => host,
        None => return site_url.to_string(),
    };

    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() > 2 {
        format!(".{}", parts[parts.len() - 2..].join("."))
    } else {
        host
    }
}

/// Whether a cookie stored for `cookie_domain` is sent to `host`.
pub fn domain_matches_host(cookie_domain: &str, host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let cookie_domain = cookie_domain.to_ascii_lowercase();

    match cookie_domain.strip_prefix('.') {
        Some(bare) => host == bare || host.ends_with(&cookie_domain),
        None => host == cookie_domain,
    }
}

/// Whether a cookie stored for `cookie_domain` falls under `domain` or one of
/// its subdomains. Leading dots on either side are ignored.
pub fn domain_within(cookie_domain: &str, domain: &str) -> bool {
    let cookie_domain = cookie_domain.trim_start_matches('.').to_ascii_lowercase();
    let domain = domain.trim_start_matches('.').to_ascii_lowercase();

    if domain.is_empty() {
        return false;
    }
    cookie_domain == domain || cookie_domain.ends_with(&format!(".{}", domain))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_domain_takes_last_two_labels() {
        assert_eq!(cookie_domain("https://pt.example.com/medal.php"), ".example.com");
        assert_eq!(cookie_domain("https://a.b.example.org/"), ".example.org");
    }

    #[test]
    fn cookie_domain_keeps_two_label_hosts() {
        assert_eq!(cookie_domain("http://a.test/medal.php"), "a.test");
        assert_eq!(cookie_domain("http://localhost:8080/"), "localhost");
    }

    #[test]
    fn cookie_domain_mishandles_multi_part_suffix() {
        assert_eq!(cookie_domain("https://pt.example.co.uk/"), ".co.uk");
    }

    #[test]
    fn cookie_domain_returns_unparseable_input() {
        assert_eq!(cookie_domain("not a url"), "not a url");
    }

    #[test]
    fn host_matching_follows_leading_dot() {
        assert!(domain_matches_host(".example.com", "example.com"));
        assert!(domain_matches_host(".example.com", "pt.example.com"));
        assert!(!domain_matches_host(".example.com", "badexample.com"));
        assert!(domain_matches_host("pt.example.com", "pt.example.com"));
        assert!(!domain_matches_host("pt.example.com", "x.pt.example.com"));
    }

    #[test]
    fn domain_within_includes_subdomains() {
        assert!(domain_within("pt.example.com", ".example.com"));
        assert!(domain_within(".example.com", "example.com"));
        assert!(!domain_within("notexample.com", "example.com"));
        assert!(!domain_within("example.com", ""));
    }
}
