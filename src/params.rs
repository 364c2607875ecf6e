//! Defines [`Params`], an ordered list of query-string pairs passed to the
//! CMS alongside a resource request.

use url::form_urlencoded::Serializer;
use url::Url;

/// An ordered list of `(key, value)` query parameters. Keys may repeat; order
/// is preserved when the parameters are serialized.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Params {
        Params(Vec::new())
    }

    /// Appends a pair and returns `self`, for building parameter lists inline.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Params {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Returns the first value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serializes the pairs as an `application/x-www-form-urlencoded` query
    /// string (without the leading `?`).
    pub fn to_query_string(&self) -> String {
        Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }

    /// Replaces the query of `url` with these parameters. An empty parameter
    /// list clears the query entirely.
    pub fn apply(&self, url: &mut Url) {
        if self.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&self.to_query_string()));
        }
    }
}
