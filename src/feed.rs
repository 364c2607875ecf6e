//! Support for creating Atom feeds from a list of articles.

use crate::article::{Article, Listing};
use crate::client::Origin;
use atom_syndication::{Entry, Error as AtomError, Feed, Link, Person, Text};
use chrono::{DateTime, FixedOffset, Utc};
use std::fmt;
use std::io::Write;
use url::Url;

/// Bundled configuration for creating a feed.
pub struct FeedConfig<'a> {
    pub title: &'a str,
    pub subtitle: &'a str,

    /// The public URL of the site. Entry links are resolved against it.
    pub home_page: &'a Url,

    /// Resolves CMS-relative URLs inside entry summaries.
    pub origin: &'a Origin,
}

/// Creates a feed from `config` and `articles` and writes the result to a
/// [`std::io::Write`].
pub fn write_feed<W: Write>(config: &FeedConfig, articles: &[Article], w: W) -> Result<()> {
    feed(config, articles)?.write_to(w)?;
    Ok(())
}

/// Like [`write_feed`], but returns the feed document as a string.
pub fn render_feed(config: &FeedConfig, articles: &[Article]) -> Result<String> {
    let mut out: Vec<u8> = Vec::new();
    write_feed(config, articles, &mut out)?;
    Ok(String::from_utf8(out)?)
}

fn feed(config: &FeedConfig, articles: &[Article]) -> Result<Feed> {
    let entries = feed_entries(config, articles)?;
    // The feed is as fresh as its newest entry.
    let updated = entries
        .iter()
        .map(|entry| entry.updated)
        .max()
        .unwrap_or_else(now);
    Ok(Feed {
        title: config.title.into(),
        subtitle: Some(config.subtitle.into()),
        id: config.home_page.to_string(),
        updated,
        entries,
        links: vec![alternate(config.home_page.to_string())],
        ..Default::default()
    })
}

fn feed_entries(config: &FeedConfig, articles: &[Article]) -> Result<Vec<Entry>> {
    let mut entries: Vec<Entry> = Vec::with_capacity(articles.len());

    for article in articles {
        let url = config.home_page.join(&article.href())?;
        let created = article.created_at();
        let summary = Listing::from_article(article, config.origin).description;

        entries.push(Entry {
            id: url.to_string(),
            title: article.title.as_str().into(),
            updated: created.unwrap_or_else(now),
            published: created,
            authors: article
                .uid
                .as_ref()
                .and_then(|user| user.display_name.clone())
                .filter(|name| !name.is_empty())
                .map(|name| Person {
                    name,
                    ..Default::default()
                })
                .into_iter()
                .collect(),
            links: vec![alternate(url.to_string())],
            summary: match summary.is_empty() {
                true => None,
                false => Some(Text::html(summary)),
            },
            ..Default::default()
        })
    }
    Ok(entries)
}

fn alternate(href: String) -> Link {
    Link {
        href,
        rel: "alternate".to_owned(),
        ..Default::default()
    }
}

fn now() -> DateTime<FixedOffset> {
    Utc::now().fixed_offset()
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed. Variants include I/O, Atom, and URL
/// issues.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is a generic I/O error.
    Io(std::io::Error),

    /// Returned when there is an Atom-related error.
    Atom(AtomError),

    /// Returned when an article's link can't be resolved against the site URL.
    Url(url::ParseError),

    /// Returned when the serialized feed isn't valid UTF-8.
    Utf8(std::string::FromUtf8Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Atom(err) => err.fmt(f),
            Error::Url(err) => err.fmt(f),
            Error::Utf8(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Atom(err) => Some(err),
            Error::Url(err) => Some(err),
            Error::Utf8(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator in fallible feed operations.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<AtomError> for Error {
    /// Converts [`AtomError`]s into [`Error`]. This allows us to use the `?`
    /// operator in fallible feed operations.
    fn from(err: AtomError) -> Error {
        Error::Atom(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::Url(err)
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Error {
        Error::Utf8(err)
    }
}
