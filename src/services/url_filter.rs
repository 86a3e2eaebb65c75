//! Exclusion of unwanted URLs.

/// Drops URLs containing any configured pattern.
///
/// Matching is literal, case-sensitive substring containment over the whole
/// URL, not host matching: `ads.example.com` also excludes
/// `https://fake-ads.example.com.evil.com/`.
#[derive(Debug, Clone, Default)]
pub struct UnwantedUrlFilter {
    patterns: Vec<String>,
}

impl UnwantedUrlFilter {
    /// Creates a filter from the configured patterns. Empty patterns are ignored.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }

    /// Returns true if `url` should be excluded from the digest.
    pub fn is_unwanted(&self, url: &str) -> bool {
        self.patterns.iter().any(|p| url.contains(p.as_str()))
    }

    /// The active patterns.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excludes_matching_domain() {
        let filter = UnwantedUrlFilter::new(["ads.example.com"]);
        assert!(filter.is_unwanted("https://ads.example.com/x"));
        assert!(!filter.is_unwanted("https://news.example.com/y"));
    }

    #[test]
    fn matches_anywhere_in_url() {
        let filter = UnwantedUrlFilter::new(["unsubscribe"]);
        assert!(filter.is_unwanted("https://list.example.com/unsubscribe?u=1"));
        assert!(filter.is_unwanted("https://example.com/?next=unsubscribe"));
    }

    #[test]
    fn substring_match_overblocks_lookalike_hosts() {
        let filter = UnwantedUrlFilter::new(["ads.example.com"]);
        assert!(filter.is_unwanted("https://fake-ads.example.com.evil.com/"));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let filter = UnwantedUrlFilter::new(["twitter.com"]);
        assert!(!filter.is_unwanted("https://TWITTER.com/someone"));
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let filter = UnwantedUrlFilter::default();
        assert!(!filter.is_unwanted("https://anything.example"));
    }

    #[test]
    fn empty_patterns_are_dropped() {
        let filter = UnwantedUrlFilter::new(vec![String::new(), "x.com".to_string()]);
        assert_eq!(filter.patterns(), &["x.com".to_string()]);
        assert!(!filter.is_unwanted("https://a.com"));
    }
    mod properties {
        use super::*;
        use crate::domain::{Digest, UrlCollection};
        use proptest::prelude::*;

        fn url() -> impl Strategy<Value = String> {
            "https://(ads|news|www)\\.(a|b)\\.com/[a-z]{0,4}"
        }

        fn patterns() -> impl Strategy<Value = Vec<String>> {
            prop::collection::vec("[a-z.]{0,6}", 0..4)
        }

        proptest! {
            #[test]
            fn digest_never_lists_unwanted_urls(
                groups in prop::collection::vec(prop::collection::vec(url(), 0..6), 0..5),
                patterns in patterns(),
            ) {
                let filter = UnwantedUrlFilter::new(patterns.clone());
                let kept: Vec<Vec<String>> = groups
                    .iter()
                    .map(|g| g.iter().filter(|u| !filter.is_unwanted(u)).cloned().collect())
                    .collect();
                let digest = Digest::from_collection(&UrlCollection::from(kept));

                for url in digest.urls() {
                    for pattern in patterns.iter().filter(|p| !p.is_empty()) {
                        prop_assert!(!url.contains(pattern.as_str()));
                    }
                }
            }

            #[test]
            fn only_matching_urls_are_excluded(
                urls in prop::collection::vec(url(), 0..20),
                patterns in patterns(),
            ) {
                let filter = UnwantedUrlFilter::new(patterns.clone());
                for url in &urls {
                    let matches = patterns
                        .iter()
                        .any(|p| !p.is_empty() && url.contains(p.as_str()));
                    prop_assert_eq!(filter.is_unwanted(url), matches);
                }
            }
        }
    }
}
