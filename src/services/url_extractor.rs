//! URL detection in free-form message text.
//!
//! Recognizes `http://` and `https://` URLs (and scheme-less `www.` hosts,
//! promoted to `http://`). Candidates are returned in the order they appear,
//! duplicates included; nothing here touches the network.
//!
//! Message text may be HTML, so `&amp;` inside a URL is unescaped and escaped
//! quotes or angle brackets end it.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use url::{Host, Url};

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:https?://|www\.)[^\s<>"'`{}|\\^\[\]“”‘’«»‹›…。、，）（「」『』【】〈〉《》]+"#)
        .expect("URL pattern is valid")
});

/// Characters that end a sentence rather than a URL.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '*'];

/// HTML-escaped characters that cannot appear unescaped in a URL.
const ESCAPED_DELIMITERS: &[&str] = &["&quot;", "&#34;", "&#39;", "&apos;", "&lt;", "&gt;"];

/// Finds syntactically valid URLs in text.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlExtractor;

impl UrlExtractor {
    /// Creates an extractor.
    pub fn new() -> Self {
        Self
    }

    /// Returns every URL in `text`, in order of appearance.
    pub fn extract(&self, text: &str) -> Vec<String> {
        URL_PATTERN
            .find_iter(text)
            .filter_map(|m| Self::candidate(m.as_str()))
            .collect()
    }

    /// Cleans one regex match and validates it as a URL.
    fn candidate(raw: &str) -> Option<String> {
        let trimmed = unescape_ampersands(trim_trailing(cut_at_escaped_delimiter(raw)));

        let candidate = if trimmed.len() >= 4 && trimmed[..4].eq_ignore_ascii_case("www.") {
            format!("http://{}", trimmed)
        } else {
            trimmed.into_owned()
        };

        let parsed = Url::parse(&candidate).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }

        match parsed.host()? {
            Host::Domain(domain) => {
                let domain = domain.trim_end_matches('.');
                let has_tld = domain
                    .rsplit_once('.')
                    .is_some_and(|(name, tld)| !name.is_empty() && tld.len() >= 2);
                has_tld.then_some(candidate)
            }
            Host::Ipv4(_) | Host::Ipv6(_) => Some(candidate),
        }
    }
}

/// Truncates at the first escaped quote or angle bracket.
fn cut_at_escaped_delimiter(raw: &str) -> &str {
    ESCAPED_DELIMITERS
        .iter()
        .filter_map(|d| raw.find(d))
        .min()
        .map_or(raw, |end| &raw[..end])
}

fn unescape_ampersands(s: &str) -> Cow<'_, str> {
    if s.contains("&amp;") {
        Cow::Owned(s.replace("&amp;", "&"))
    } else {
        Cow::Borrowed(s)
    }
}

/// Strips sentence punctuation and unbalanced closing parentheses.
fn trim_trailing(raw: &str) -> &str {
    let mut s = raw;
    loop {
        let before = s.len();
        s = s.trim_end_matches(TRAILING_PUNCTUATION);

        if s.ends_with(')') && s.matches('(').count() < s.matches(')').count() {
            s = &s[..s.len() - 1];
        }

        if s.len() == before {
            return s;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn extract(text: &str) -> Vec<String> {
        UrlExtractor::new().extract(text)
    }

    #[test]
    fn no_urls_yields_nothing() {
        assert!(extract("").is_empty());
        assert!(extract("Hello, this week there is nothing to read.").is_empty());
    }

    #[test]
    fn keeps_order_and_duplicates() {
        assert_eq!(
            extract("see http://bit.ly/abc and http://bit.ly/abc then https://a.com/x"),
            vec!["http://bit.ly/abc", "http://bit.ly/abc", "https://a.com/x"]
        );
    }

    #[test]
    fn trims_sentence_punctuation() {
        assert_eq!(
            extract("Read https://example.com/post. Or https://example.org/a, https://example.net!"),
            vec![
                "https://example.com/post",
                "https://example.org/a",
                "https://example.net"
            ]
        );
    }

    #[test]
    fn balances_parentheses() {
        assert_eq!(
            extract("(see https://en.wikipedia.org/wiki/Rust_(programming_language))"),
            vec!["https://en.wikipedia.org/wiki/Rust_(programming_language)"]
        );
        assert_eq!(extract("(https://a.com/x)"), vec!["https://a.com/x"]);
    }

    #[test]
    fn stops_at_html_delimiters() {
        assert_eq!(
            extract(r#"<a href="https://news.example.com/y?id=1&amp;s=2">link</a> <https://b.com/z>"#),
            vec!["https://news.example.com/y?id=1&s=2", "https://b.com/z"]
        );
    }

    #[test]
    fn unescapes_ampersands() {
        assert_eq!(
            extract("https://a.com/p?id=1&amp;s=2&amp;t=3"),
            vec!["https://a.com/p?id=1&s=2&t=3"]
        );
    }

    #[test]
    fn stops_at_escaped_quotes_and_brackets() {
        assert_eq!(
            extract("&lt;a href=&quot;https://a.com/x?q=1&amp;r=2&quot;&gt;x&lt;/a&gt; &lt;https://b.com/y&gt;"),
            vec!["https://a.com/x?q=1&r=2", "https://b.com/y"]
        );
    }

    #[test]
    fn stops_at_typographic_quotes() {
        assert_eq!(extract("Read “https://a.com/x” today"), vec!["https://a.com/x"]);
        assert_eq!(extract("it’s at ‘https://b.com/y’."), vec!["https://b.com/y"]);
        assert_eq!(extract("« https://c.com/z »"), vec!["https://c.com/z"]);
    }

    #[test]
    fn stops_at_ellipsis_and_cjk_punctuation() {
        assert_eq!(extract("…https://a.com/y…"), vec!["https://a.com/y"]);
        assert_eq!(extract("リンク：https://a.com/ja。次"), vec!["https://a.com/ja"]);
        assert_eq!(extract("（https://a.com/zh）"), vec!["https://a.com/zh"]);
    }

    #[test]
    fn keeps_query_and_fragment() {
        assert_eq!(
            extract("https://a.com/p?utm_source=x&id=3#section"),
            vec!["https://a.com/p?utm_source=x&id=3#section"]
        );
    }

    #[test]
    fn promotes_www_hosts() {
        assert_eq!(extract("visit www.example.com today"), vec!["http://www.example.com"]);
    }

    #[test]
    fn scheme_is_case_insensitive() {
        assert_eq!(extract("HTTPS://Example.com/Path"), vec!["HTTPS://Example.com/Path"]);
    }

    #[test]
    fn rejects_hosts_without_tld() {
        assert!(extract("http://localhost/admin and http:// nothing").is_empty());
        assert!(extract("https://intranet").is_empty());
    }

    #[test]
    fn accepts_ip_hosts() {
        assert_eq!(extract("http://192.168.1.10:8080/x"), vec!["http://192.168.1.10:8080/x"]);
    }

    #[test]
    fn ignores_other_schemes() {
        assert!(extract("mailto:me@example.com ftp://files.example.com").is_empty());
    }

    #[test]
    fn handles_multiline_text() {
        let text = "Top stories:\r\n\r\n1. https://a.com/1\r\n2. https://b.com/2\r\n";
        assert_eq!(extract(text), vec!["https://a.com/1", "https://b.com/2"]);
    }
}
