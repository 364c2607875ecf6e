//! Helpers for building template [`Value`]s. Templates don't escape anything,
//! so plain text goes through [`text`] (HTML-escaped) and markup the CMS has
//! already processed goes through [`html`] (verbatim).

use gtmpl_value::Value;
use pulldown_cmark::escape::{escape_href, escape_html};
use std::collections::HashMap;

/// Builds a [`Value::Object`] from `(field, value)` pairs.
pub fn object(fields: Vec<(&str, Value)>) -> Value {
    let mut m: HashMap<String, Value> = HashMap::with_capacity(fields.len());
    for (field, value) in fields {
        m.insert(field.to_owned(), value);
    }
    Value::Object(m)
}

/// Escapes plain text for HTML element content and attribute values.
pub fn text(s: &str) -> Value {
    Value::String(escape(s))
}

/// Escapes a URL for use in an `href` or `src` attribute.
pub fn href(s: &str) -> Value {
    let mut out = String::with_capacity(s.len());
    // writing into a String can't fail
    let _ = escape_href(&mut out, s);
    Value::String(out)
}

/// Passes CMS-processed markup through untouched.
pub fn html(s: &str) -> Value {
    Value::String(s.to_owned())
}

pub fn list<T>(items: &[T]) -> Value
where
    for<'a> &'a T: Into<Value>,
{
    Value::Array(items.iter().map(Into::into).collect())
}

/// Converts `Some(v)` with `f` and `None` into [`Value::Nil`], which templates
/// treat as false.
pub fn optional<T>(option: Option<T>, f: impl FnOnce(T) -> Value) -> Value {
    match option {
        Some(v) => f(v),
        None => Value::Nil,
    }
}

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    // writing into a String can't fail
    let _ = escape_html(&mut out, s);
    out
}

#[cfg(test)]
mod test {
    use super::*;

    fn string(value: Value) -> String {
        match value {
            Value::String(s) => s,
            _ => panic!("expected a string value"),
        }
    }

    #[test]
    fn test_text_escapes_markup() {
        assert_eq!(
            "&lt;b&gt;Tom &amp; &quot;Jerry&quot;&lt;/b&gt;",
            string(text("<b>Tom & \"Jerry\"</b>"))
        );
    }

    #[test]
    fn test_html_is_verbatim() {
        assert_eq!("<p>Hi</p>", string(html("<p>Hi</p>")));
    }

    #[test]
    fn test_href_escapes_quotes() {
        let escaped = string(href("/blogs?search=\"x\"&author=1"));
        assert!(!escaped.contains('"'));
        assert!(escaped.starts_with("/blogs?search="));
    }

    #[test]
    fn test_optional_none_is_nil() {
        assert!(matches!(optional(None::<&str>, text), Value::Nil));
    }
}
