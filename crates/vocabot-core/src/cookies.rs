//! Allow-listed cookie jar.
//!
//! The service only needs a handful of cookies to keep a session pinned to
//! the same backend and logged in. Everything else it sets is ignored.

use std::collections::BTreeMap;

/// Cookie names that are kept between requests.
pub const ALLOWED_COOKIES: &[&str] = &["AWSALB", "AWSALBCORS", "JSESSIONID", "guid", "__cf_bm"];

/// Latest value of each allow-listed cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a jar from a `name=value; name=value` header string.
    pub fn from_header(header: &str) -> Self {
        let mut jar = Self::new();
        for pair in header.split(';') {
            if let Some((name, value)) = pair.split_once('=') {
                jar.insert(name.trim(), value.trim());
            }
        }
        jar
    }

    /// Store `value` under `name` if the name is allow-listed.
    /// Returns whether the cookie was kept.
    pub fn insert(&mut self, name: &str, value: &str) -> bool {
        if !ALLOWED_COOKIES.contains(&name) {
            return false;
        }
        self.cookies.insert(name.to_string(), value.to_string());
        true
    }

    /// Merge one `Set-Cookie` header value. Attributes after the first `;`
    /// (path, expiry, flags) are discarded.
    pub fn merge_set_cookie(&mut self, set_cookie: &str) -> bool {
        let pair = set_cookie.split(';').next().unwrap_or_default();
        match pair.split_once('=') {
            Some((name, value)) => self.insert(name.trim(), value.trim()),
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Serialize as a `Cookie` request header value.
    pub fn header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip_keeps_allowed_only() {
        let jar = CookieJar::from_header("AWSALB=abc; tracking=1; guid=g-1;JSESSIONID=s");
        assert_eq!(jar.len(), 3);
        assert_eq!(jar.get("tracking"), None);
        assert_eq!(jar.header(), "AWSALB=abc; JSESSIONID=s; guid=g-1");
        assert_eq!(CookieJar::from_header(&jar.header()), jar);
    }

    #[test]
    fn set_cookie_overwrites_previous_value() {
        let mut jar = CookieJar::from_header("AWSALB=old");
        assert!(jar.merge_set_cookie("AWSALB=new; Expires=Tue, 01 Jan 2030 00:00:00 GMT; Path=/"));
        assert!(!jar.merge_set_cookie("_ga=GA1.2; Path=/"));
        assert!(!jar.merge_set_cookie("garbage"));
        assert_eq!(jar.get("AWSALB"), Some("new"));
        assert_eq!(jar.len(), 1);
    }

    #[test]
    fn values_may_contain_equals() {
        let mut jar = CookieJar::new();
        jar.merge_set_cookie("__cf_bm=abc==def; HttpOnly");
        assert_eq!(jar.get("__cf_bm"), Some("abc==def"));
    }

    #[test]
    fn empty_header_gives_empty_jar() {
        let jar = CookieJar::from_header("");
        assert!(jar.is_empty());
        assert_eq!(jar.header(), "");
    }
}
