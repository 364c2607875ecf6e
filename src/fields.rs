//! Field types shared by several CMS records: files, formatted text, links,
//! and loosely-typed amounts.

use crate::client::Origin;
use serde::Deserialize;

/// A `file--file` entity, usually an image.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct File {
    #[serde(default)]
    pub filename: Option<String>,

    #[serde(default)]
    pub uri: Option<FileUri>,

    /// The `meta` of the relationship that pointed at this file (see
    /// [`crate::jsonapi::IDENTIFIER_META_KEY`]). For images it carries the alt
    /// text.
    #[serde(default, rename = "resourceIdObjMeta")]
    pub meta: Option<FileMeta>,
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct FileUri {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct FileMeta {
    #[serde(default)]
    pub alt: Option<String>,
}

impl File {
    /// The CMS-relative URL of the file, if the CMS exposed one.
    pub fn url(&self) -> Option<&str> {
        self.uri
            .as_ref()
            .and_then(|uri| uri.url.as_deref())
            .filter(|url| !url.is_empty())
    }

    /// The file's absolute URL.
    pub fn absolute_url(&self, origin: &Origin) -> Option<String> {
        self.url().map(|url| origin.absolute(url))
    }

    /// The alt text, if it's set and not empty.
    pub fn alt(&self) -> Option<&str> {
        self.meta
            .as_ref()
            .and_then(|meta| meta.alt.as_deref())
            .filter(|alt| !alt.is_empty())
    }
}

/// A formatted text field. Most arrive as objects carrying the raw `value`
/// and the filtered `processed` HTML (plus a `summary` for body fields), but
/// plain string fields are accepted too.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum RichText {
    Plain(String),
    Formatted {
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        processed: Option<String>,
        #[serde(default)]
        summary: Option<String>,
    },
}

impl RichText {
    /// The markup to render: `processed` when present, else the raw value.
    pub fn html(&self) -> Option<&str> {
        let html = match self {
            RichText::Plain(s) => Some(s.as_str()),
            RichText::Formatted {
                value, processed, ..
            } => processed.as_deref().or_else(|| value.as_deref()),
        };
        html.filter(|s| !s.is_empty())
    }

    pub fn processed(&self) -> Option<&str> {
        let processed = match self {
            RichText::Plain(s) => Some(s.as_str()),
            RichText::Formatted { processed, .. } => processed.as_deref(),
        };
        processed.filter(|s| !s.is_empty())
    }

    pub fn summary(&self) -> Option<&str> {
        let summary = match self {
            RichText::Plain(_) => None,
            RichText::Formatted { summary, .. } => summary.as_deref(),
        };
        summary.filter(|s| !s.is_empty())
    }
}

/// A link field.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Link {
    #[serde(default)]
    pub uri: Option<String>,

    #[serde(default)]
    pub title: Option<String>,
}

/// A numeric field. Drupal serializes decimal fields as strings and integer
/// fields as numbers, so both are accepted.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum Amount {
    Number(f64),
    Text(String),
}

impl Amount {
    pub fn value(&self) -> Option<f64> {
        let value: Option<f64> = match self {
            Amount::Number(n) => Some(*n),
            Amount::Text(s) => s.trim().parse().ok(),
        };
        value.filter(|n| n.is_finite())
    }
}

/// Formats a number the way it reads on a price tag: whole numbers without a
/// fractional part, everything else as-is.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
