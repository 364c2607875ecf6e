//! Defines the [`Article`] and [`User`] records and the two ways articles are
//! presented: [`Teaser`] cards on the home page and [`Listing`] rows on the
//! blogs page. See [`Listing::from_article`] for how descriptions are
//! derived.

use crate::client::Origin;
use crate::fields::{File, RichText};
use crate::value::{href, html, object, optional, text};
use chrono::{DateTime, FixedOffset};
use gtmpl_value::Value;
use serde::Deserialize;

/// The resource type of authors.
pub const USER_TYPE: &str = "user--user";

/// The author fields projected for the author filter.
pub const USER_FIELDS: &str = "display_name,uid";

/// Shown for articles without a resolvable author name.
const ANONYMOUS: &str = "Anonymous";

/// Processed bodies are cut to this many characters when an article has no
/// summary.
const DESCRIPTION_LENGTH: usize = 410;

/// Image used for listings whose article has no image, relative to the CMS.
const DEFAULT_IMAGE: &str = "/images/default-image.jpg";

/// Author picture used on listing rows, relative to the site.
const DEFAULT_AUTHOR_IMAGE: &str = "/image.png";

/// A `node--article` resource.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Article {
    pub id: String,
    pub title: String,

    #[serde(default)]
    pub path: Option<PathAlias>,

    /// The creation timestamp as RFC 3339.
    #[serde(default)]
    pub created: Option<String>,

    #[serde(default)]
    pub body: Option<RichText>,

    #[serde(default)]
    pub field_image: Option<File>,

    #[serde(default)]
    pub uid: Option<User>,
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PathAlias {
    #[serde(default)]
    pub alias: Option<String>,
}

/// A `user--user` resource.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct User {
    pub id: String,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub user_picture: Option<File>,
}

impl User {
    fn name(&self) -> Option<&str> {
        self.display_name.as_deref().filter(|name| !name.is_empty())
    }
}

impl Article {
    /// The site-relative URL of the article. Articles without an alias fall
    /// back to their canonical node path.
    pub fn href(&self) -> String {
        match self.path.as_ref().and_then(|path| path.alias.as_deref()) {
            Some(alias) if !alias.is_empty() => alias.to_owned(),
            _ => format!("/node/{}", self.id),
        }
    }

    pub fn created_at(&self) -> Option<DateTime<FixedOffset>> {
        self.created
            .as_deref()
            .and_then(|created| DateTime::parse_from_rfc3339(created).ok())
    }

    /// The creation date the way readers see it, e.g. `March 15, 2024`.
    pub fn display_date(&self) -> String {
        self.created_at().map(format_date).unwrap_or_default()
    }

    fn author_name(&self) -> Option<&str> {
        self.uid.as_ref().and_then(User::name)
    }
}

pub fn format_date(date: DateTime<FixedOffset>) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// An article card on the home page.
#[derive(Clone, Debug, PartialEq)]
pub struct Teaser {
    pub title: String,
    pub href: String,
    pub created: String,
    pub date: String,
    pub author_name: Option<String>,
    pub author_picture: Option<String>,
    pub image_url: Option<String>,
    pub image_alt: String,
}

impl Teaser {
    pub fn from_article(article: &Article, origin: &Origin) -> Teaser {
        let image = article.field_image.as_ref();
        Teaser {
            title: article.title.clone(),
            href: article.href(),
            created: article.created.clone().unwrap_or_default(),
            date: article.display_date(),
            author_name: article.author_name().map(str::to_owned),
            author_picture: article
                .uid
                .as_ref()
                .and_then(|user| user.user_picture.as_ref())
                .and_then(|picture| picture.absolute_url(origin)),
            image_url: image.and_then(|image| image.absolute_url(origin)),
            image_alt: image
                .and_then(File::alt)
                .unwrap_or_default()
                .to_owned(),
        }
    }
}

impl From<&Teaser> for Value {
    fn from(teaser: &Teaser) -> Value {
        object(vec![
            ("title", text(&teaser.title)),
            ("href", href(&teaser.href)),
            ("created", text(&teaser.created)),
            ("date", text(&teaser.date)),
            ("author_name", optional(teaser.author_name.as_deref(), text)),
            ("author_picture", optional(teaser.author_picture.as_deref(), href)),
            ("image_url", optional(teaser.image_url.as_deref(), href)),
            ("image_alt", text(&teaser.image_alt)),
        ])
    }
}

/// An article row on the blogs page.
#[derive(Clone, Debug, PartialEq)]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub href: String,

    /// Markup: the body summary or the start of the processed body.
    pub description: String,
    pub date: String,
    pub datetime: String,
    pub category: String,
    pub author_name: String,
    pub author_role: String,
    pub author_image_url: String,
    pub image_url: String,
}

impl Listing {
    /// Builds the row for `article`. The description is the body's summary
    /// when it has one; otherwise the first [`DESCRIPTION_LENGTH`] characters
    /// of the processed body followed by ` ...`; otherwise empty.
    pub fn from_article(article: &Article, origin: &Origin) -> Listing {
        Listing {
            id: article.id.clone(),
            title: article.title.clone(),
            href: article.href(),
            description: description(article.body.as_ref()),
            date: article.display_date(),
            datetime: article.created.clone().unwrap_or_default(),
            category: "Article".to_owned(),
            author_name: article.author_name().unwrap_or(ANONYMOUS).to_owned(),
            author_role: "Author".to_owned(),
            author_image_url: DEFAULT_AUTHOR_IMAGE.to_owned(),
            image_url: article
                .field_image
                .as_ref()
                .and_then(|image| image.absolute_url(origin))
                .unwrap_or_else(|| origin.absolute(DEFAULT_IMAGE)),
        }
    }
}

fn description(body: Option<&RichText>) -> String {
    let body = match body {
        Some(body) => body,
        None => return String::new(),
    };
    if let Some(summary) = body.summary() {
        return summary.to_owned();
    }
    match body.processed() {
        Some(processed) => {
            let mut cut: String = processed.chars().take(DESCRIPTION_LENGTH).collect();
            cut.push_str(" ...");
            cut
        }
        None => String::new(),
    }
}

impl From<&Listing> for Value {
    fn from(listing: &Listing) -> Value {
        object(vec![
            ("id", text(&listing.id)),
            ("title", text(&listing.title)),
            ("href", href(&listing.href)),
            ("description", html(&listing.description)),
            ("date", text(&listing.date)),
            ("datetime", text(&listing.datetime)),
            ("category", text(&listing.category)),
            ("author_name", text(&listing.author_name)),
            ("author_role", text(&listing.author_role)),
            ("author_image_url", href(&listing.author_image_url)),
            ("image_url", href(&listing.image_url)),
        ])
    }
}

/// An entry of the author filter's dropdown.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthorOption {
    pub id: String,
    pub label: String,
    pub selected: bool,
}

impl AuthorOption {
    pub fn new(user: &User, selected_id: Option<&str>) -> AuthorOption {
        AuthorOption {
            id: user.id.clone(),
            label: match user.name() {
                Some(name) => name.to_owned(),
                None => format!("User {}", user.id),
            },
            selected: selected_id == Some(user.id.as_str()),
        }
    }
}

impl From<&AuthorOption> for Value {
    fn from(option: &AuthorOption) -> Value {
        object(vec![
            ("id", text(&option.id)),
            ("label", text(&option.label)),
            ("selected", Value::Bool(option.selected)),
        ])
    }
}
