//! URL collection and digest assembly.
//!
//! A run gathers resolved URLs into a [`UrlCollection`], one group per
//! scanned message. The [`Digest`] is the flattened, deduplicated and
//! lexicographically sorted view of that collection, and is what ends up in
//! the outbound email body.

use std::collections::BTreeSet;

/// Separator placed between digest entries.
pub const ENTRY_SEPARATOR: &str = "\n\n";

/// Resolved URLs grouped per scanned message, in collection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlCollection {
    groups: Vec<Vec<String>>,
}

impl UrlCollection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the URLs gathered from one message (or an empty sender).
    pub fn push_group(&mut self, urls: Vec<String>) {
        self.groups.push(urls);
    }

    /// Per-message groups in the order they were collected.
    pub fn groups(&self) -> &[Vec<String>] {
        &self.groups
    }

    /// Number of groups, including empty ones.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Total number of URLs across all groups, duplicates included.
    pub fn url_count(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    /// Iterates over every URL in collection order.
    pub fn flatten(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().flatten().map(String::as_str)
    }
}

impl From<Vec<Vec<String>>> for UrlCollection {
    fn from(groups: Vec<Vec<String>>) -> Self {
        Self { groups }
    }
}

/// Deduplicated, sorted list of URLs for a single outbound message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Digest {
    urls: Vec<String>,
}

impl Digest {
    /// Flattens, deduplicates and sorts a collection.
    ///
    /// The result depends only on the set of URLs in the collection, never on
    /// how they were grouped or the order in which they arrived.
    pub fn from_collection(collection: &UrlCollection) -> Self {
        let unique: BTreeSet<&str> = collection.flatten().collect();
        Self {
            urls: unique.into_iter().map(str::to_owned).collect(),
        }
    }

    /// The digest entries, ascending.
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Number of unique entries.
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Returns true if no URL survived collection.
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Email body: entries separated by a blank line.
    pub fn body(&self) -> String {
        self.urls.join(ENTRY_SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn collection(groups: &[&[&str]]) -> UrlCollection {
        groups
            .iter()
            .map(|g| g.iter().map(|s| s.to_string()).collect())
            .collect::<Vec<Vec<String>>>()
            .into()
    }

    #[test]
    fn duplicates_collapse_and_sort() {
        let digest = Digest::from_collection(&collection(&[
            &["https://c.com", "https://a.com"],
            &["https://b.com", "https://a.com"],
        ]));
        assert_eq!(
            digest.urls(),
            &["https://a.com", "https://b.com", "https://c.com"]
        );
    }

    #[test]
    fn body_joins_with_blank_lines() {
        let digest = Digest::from_collection(&collection(&[&["https://b.com", "https://a.com"]]));
        assert_eq!(digest.body(), "https://a.com\n\nhttps://b.com");
    }

    #[test]
    fn single_entry_has_no_separator() {
        let digest = Digest::from_collection(&collection(&[&["https://real.com/page"]]));
        assert_eq!(digest.body(), "https://real.com/page");
    }

    #[test]
    fn empty_collection_yields_empty_body() {
        let digest = Digest::from_collection(&collection(&[&[], &[]]));
        assert!(digest.is_empty());
        assert_eq!(digest.body(), "");
    }

    #[test]
    fn grouping_does_not_affect_result() {
        let left = Digest::from_collection(&collection(&[&["a", "b"], &["c"]]));
        let right = Digest::from_collection(&collection(&[&["a"], &["b", "c"]]));
        let shuffled = Digest::from_collection(&collection(&[&["c", "a"], &["b", "a"]]));
        assert_eq!(left, right);
        assert_eq!(left, shuffled);
    }

    #[test]
    fn assembly_is_idempotent() {
        let urls = collection(&[&["https://z.com", "https://y.com"], &["https://z.com"]]);
        let first = Digest::from_collection(&urls).body();
        let second = Digest::from_collection(&urls).body();
        assert_eq!(first, second);
    }

    #[test]
    fn sorting_is_bytewise_lexicographic() {
        let digest = Digest::from_collection(&collection(&[&[
            "https://b.com",
            "HTTPS://A.com",
            "http://b.com",
        ]]));
        assert_eq!(
            digest.urls(),
            &["HTTPS://A.com", "http://b.com", "https://b.com"]
        );
    }

    #[test]
    fn counts_include_empty_groups() {
        let urls = collection(&[&["a", "a"], &[], &["b"]]);
        assert_eq!(urls.group_count(), 3);
        assert_eq!(urls.url_count(), 3);
        assert_eq!(urls.flatten().collect::<Vec<_>>(), vec!["a", "a", "b"]);
    }
    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn url() -> impl Strategy<Value = String> {
            "https?://[a-d]{1,2}\\.(com|org)/[a-z0-9]{0,3}"
        }

        fn url_groups() -> impl Strategy<Value = Vec<Vec<String>>> {
            prop::collection::vec(prop::collection::vec(url(), 0..6), 0..6)
        }

        proptest! {
            #[test]
            fn entries_are_unique_and_ascending(groups in url_groups()) {
                let digest = Digest::from_collection(&UrlCollection::from(groups));
                prop_assert!(digest.urls().windows(2).all(|w| w[0] < w[1]));
            }

            #[test]
            fn every_collected_url_is_listed(groups in url_groups()) {
                let digest = Digest::from_collection(&UrlCollection::from(groups.clone()));
                for url in groups.iter().flatten() {
                    prop_assert!(digest.urls().binary_search(url).is_ok());
                }
            }

            #[test]
            fn regrouping_does_not_change_digest(groups in url_groups(), split in 0usize..40) {
                let flat: Vec<String> = groups.iter().flatten().cloned().collect();
                let split = split.min(flat.len());
                let regrouped = vec![flat[..split].to_vec(), Vec::new(), flat[split..].to_vec()];

                prop_assert_eq!(
                    Digest::from_collection(&UrlCollection::from(groups)),
                    Digest::from_collection(&UrlCollection::from(regrouped))
                );
            }

            #[test]
            fn input_order_does_not_change_digest(groups in url_groups()) {
                let mut reversed: Vec<Vec<String>> = groups
                    .iter()
                    .map(|g| g.iter().rev().cloned().collect())
                    .collect();
                reversed.reverse();

                prop_assert_eq!(
                    Digest::from_collection(&UrlCollection::from(groups)),
                    Digest::from_collection(&UrlCollection::from(reversed))
                );
            }

            #[test]
            fn reassembling_a_digest_is_a_no_op(groups in url_groups()) {
                let digest = Digest::from_collection(&UrlCollection::from(groups));
                let again = Digest::from_collection(&UrlCollection::from(vec![digest.urls().to_vec()]));
                prop_assert_eq!(digest.body(), again.body());
            }

            #[test]
            fn body_lists_each_entry_once(groups in url_groups()) {
                let digest = Digest::from_collection(&UrlCollection::from(groups));
                let body = digest.body();
                let entries: Vec<&str> = if body.is_empty() {
                    Vec::new()
                } else {
                    body.split(ENTRY_SEPARATOR).collect()
                };
                prop_assert_eq!(entries, digest.urls().iter().map(String::as_str).collect::<Vec<_>>());
            }
        }
    }
}
