//! Name/value cookie store threaded through every upstream request.
//!
//! Only the `name=value` part of a `Set-Cookie` header is kept. Expiry,
//! domain and path attributes are ignored because each jar is bound to a
//! single upstream origin.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CookieJar(BTreeMap<String, String>);

impl CookieJar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Absorbs a single `Set-Cookie` header value.
    ///
    /// Everything up to the first `;` is the pair; the value keeps any `=` it
    /// contains. A later cookie with the same name overwrites the earlier one.
    pub fn merge_set_cookie(&mut self, header: &str) {
        let pair = header.split(';').next().unwrap_or_default();
        if let Some((name, value)) = pair.split_once('=') {
            let name = name.trim();
            if !name.is_empty() {
                self.insert(name, value.trim());
            }
        }
    }

    /// Absorbs a header that folds several `Set-Cookie` values into one line.
    ///
    /// Splits on commas followed by a `name=` token so the comma inside an
    /// `Expires=Wed, 21 Oct ...` attribute stays put.
    pub fn merge_combined(&mut self, header: &str) {
        for part in split_combined(header) {
            self.merge_set_cookie(part);
        }
    }

    /// Absorbs every `Set-Cookie` value of one response.
    ///
    /// A lone value is treated as possibly folded.
    pub fn merge_headers<'a, I>(&mut self, values: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let values: Vec<&str> = values.into_iter().collect();
        match values.as_slice() {
            [single] => self.merge_combined(single),
            many => {
                for value in many {
                    self.merge_set_cookie(value);
                }
            }
        }
    }

    /// Renders the jar as a `Cookie` request header value.
    #[must_use]
    pub fn header_value(&self) -> String {
        self.0
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Rebuilds a jar from a `Cookie` header value produced by [`Self::header_value`].
    #[must_use]
    pub fn from_header_value(header: &str) -> Self {
        let mut jar = Self::new();
        for pair in header.split(';') {
            if let Some((name, value)) = pair.split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    jar.insert(name, value.trim());
                }
            }
        }
        jar
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

// Values are session secrets; only names are printed.
impl fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

fn split_combined(raw: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (idx, _) in raw.match_indices(',') {
        if starts_cookie_pair(&raw[idx + 1..]) {
            parts.push(&raw[start..idx]);
            start = idx + 1;
        }
    }
    parts.push(&raw[start..]);
    parts
}

fn starts_cookie_pair(rest: &str) -> bool {
    let rest = rest.trim_start();
    let name_len = rest
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'))
        .count();
    name_len > 0 && rest.as_bytes().get(name_len) == Some(&b'=')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_pair_before_first_semicolon() {
        let mut jar = CookieJar::new();
        jar.merge_set_cookie("PHPSESSID=abc123; path=/; HttpOnly");
        assert_eq!(jar.get("PHPSESSID"), Some("abc123"));
        assert_eq!(jar.len(), 1);
    }

    #[test]
    fn merge_keeps_equals_inside_value() {
        let mut jar = CookieJar::new();
        jar.merge_set_cookie("token=a=b==; Secure");
        assert_eq!(jar.get("token"), Some("a=b=="));
    }

    #[test]
    fn later_cookie_overwrites_earlier() {
        let mut jar = CookieJar::new();
        jar.merge_headers(["sid=old; path=/", "cart=1"]);
        jar.merge_headers(["sid=new; path=/", "other=2"]);
        assert_eq!(jar.get("sid"), Some("new"));
        assert_eq!(jar.get("cart"), Some("1"));
        assert_eq!(jar.len(), 3);
    }

    #[test]
    fn combined_header_splits_on_cookie_boundaries_only() {
        let mut jar = CookieJar::new();
        jar.merge_combined(
            "sid=abc; Expires=Wed, 21 Oct 2026 07:28:00 GMT; Path=/, lang=pl; Path=/,cart_id=77",
        );
        assert_eq!(jar.get("sid"), Some("abc"));
        assert_eq!(jar.get("lang"), Some("pl"));
        assert_eq!(jar.get("cart_id"), Some("77"));
        assert_eq!(jar.len(), 3);
    }

    #[test]
    fn single_header_value_is_treated_as_possibly_combined() {
        let mut jar = CookieJar::new();
        jar.merge_headers(["a=1; path=/, b=2"]);
        assert_eq!(jar.get("a"), Some("1"));
        assert_eq!(jar.get("b"), Some("2"));
    }

    #[test]
    fn malformed_entries_are_ignored() {
        let mut jar = CookieJar::new();
        jar.merge_headers(["no-equals-here", "=orphan", "ok=1"]);
        assert_eq!(jar.names().collect::<Vec<_>>(), vec!["ok"]);
    }

    #[test]
    fn header_value_round_trips() {
        let mut jar = CookieJar::new();
        jar.merge_headers([
            "PHPSESSID=abc; path=/",
            "basket=x=y; HttpOnly",
            "lang=pl",
        ]);

        let header = jar.header_value();
        assert_eq!(header, "PHPSESSID=abc; basket=x=y; lang=pl");
        assert_eq!(CookieJar::from_header_value(&header), jar);
    }

    #[test]
    fn serializes_as_plain_object() {
        let mut jar = CookieJar::new();
        jar.insert("sid", "1");
        let json = serde_json::to_value(&jar).unwrap();
        assert_eq!(json, serde_json::json!({"sid": "1"}));
        let back: CookieJar = serde_json::from_value(json).unwrap();
        assert_eq!(back, jar);
    }

    #[test]
    fn debug_hides_values() {
        let mut jar = CookieJar::new();
        jar.insert("sid", "super-secret");
        let rendered = format!("{jar:?}");
        assert!(rendered.contains("sid"));
        assert!(!rendered.contains("super-secret"));
    }
}
