//! URL and name normalization shared by the dedup guard, adapters and
//! listing mappers.

use url::Url;

/// Strip scheme and trailing slash from a website, as stored on leads.
pub fn clean_website(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    without_scheme.trim_end_matches('/').to_string()
}

/// Absolute URL for a cleaned or raw website.
pub fn website_url(website: &str) -> String {
    let trimmed = website.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Bare host of a website with any `www.` prefix removed.
///
/// Returns `None` for empty input or when no host can be recovered.
pub fn extract_domain(website: &str) -> Option<String> {
    let trimmed = website.trim();
    if trimmed.is_empty() {
        return None;
    }
    let host = match Url::parse(&website_url(trimmed)) {
        Ok(url) => url.host_str().map(str::to_string),
        Err(_) => clean_website(trimmed).split('/').next().map(str::to_string),
    }?;
    let host = host.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    (!host.is_empty() && host.contains('.')).then_some(host)
}

/// Dedup key for a website: lower-cased, scheme, `www.` and trailing slash stripped.
pub fn website_key(website: &str) -> Option<String> {
    let cleaned = clean_website(&website.to_lowercase());
    let cleaned = cleaned.strip_prefix("www.").unwrap_or(&cleaned);
    let cleaned = cleaned.trim_end_matches('/');
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// Dedup key for a company name: trimmed and lower-cased.
pub fn name_key(name: &str) -> Option<String> {
    let key = name.trim().to_lowercase();
    (!key.is_empty()).then_some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn website_key_strips_decorations() {
        assert_eq!(website_key("https://www.Acme.com/").as_deref(), Some("acme.com"));
        assert_eq!(website_key("http://acme.com").as_deref(), Some("acme.com"));
        assert_eq!(website_key("acme.com/es/").as_deref(), Some("acme.com/es"));
        assert_eq!(website_key("  "), None);
    }

    #[test]
    fn name_key_trims_and_lowercases() {
        assert_eq!(name_key("  Acme Gym ").as_deref(), Some("acme gym"));
        assert_eq!(name_key(""), None);
    }

    #[test]
    fn extract_domain_variants() {
        assert_eq!(extract_domain("https://www.acme.com/about").as_deref(), Some("acme.com"));
        assert_eq!(extract_domain("acme.com").as_deref(), Some("acme.com"));
        assert_eq!(extract_domain("WWW.ACME.COM").as_deref(), Some("acme.com"));
        assert_eq!(extract_domain(""), None);
        assert_eq!(extract_domain("localhost"), None);
    }

    #[test]
    fn clean_website_keeps_path() {
        assert_eq!(clean_website("https://acme.com/shop/"), "acme.com/shop");
        assert_eq!(website_url("acme.com"), "https://acme.com");
        assert_eq!(website_url("http://acme.com"), "http://acme.com");
    }
}
