use url::Url;

/// The listing's identity when the payload does not carry one: the trailing
/// numeric suffix of the URL's last path segment
/// (`…/bostad/villa-8rok-solsidan-1234567` → 1234567). Deterministic per
/// URL, since this is the de-duplication key consumed downstream. Local
/// fixture paths keep their extension out of the derivation.
pub fn listing_id(page_url: &str) -> Option<i64> {
    let path = match Url::parse(page_url) {
        Ok(u) => u.path().to_string(),
        // bare file paths are not absolute URLs; use them as-is
        Err(_) => page_url.to_string(),
    };
    let segment = path.trim_end_matches('/').rsplit('/').next()?;
    let segment = segment
        .strip_suffix(".html")
        .or_else(|| segment.strip_suffix(".htm"))
        .unwrap_or(segment);
    segment.rsplit('-').next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_trailing_suffix() {
        assert_eq!(
            listing_id("https://www.hemnet.se/bostad/villa-8rok-solsidan-1234567"),
            Some(1234567)
        );
        assert_eq!(
            listing_id("https://www.hemnet.se/salda/lagenhet-2rok-333/"),
            Some(333)
        );
    }

    #[test]
    fn stable_per_url() {
        let url = "https://www.hemnet.se/bostad/radhus-4rok-989898";
        assert_eq!(listing_id(url), listing_id(url));
    }

    #[test]
    fn fixture_paths_match_live_urls() {
        assert_eq!(listing_id("fixtures/villa-8rok-solsidan-1234567.html"), Some(1234567));
    }

    #[test]
    fn no_numeric_suffix_is_absent() {
        assert_eq!(listing_id("https://www.hemnet.se/bostader"), None);
        assert_eq!(listing_id(""), None);
    }
}
