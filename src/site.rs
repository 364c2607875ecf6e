//! Assembles the site's pages. A [`Site`] fetches what each page needs from
//! the CMS through its [`Client`], converts the records into template values,
//! and renders them through the [`Theme`].
//!
//! Pages degrade piecemeal: a block or the menu that can't be fetched is
//! logged and left out, but a failed article query fails the whole page.

use crate::article::{Article, AuthorOption, Listing, Teaser, User, USER_FIELDS, USER_TYPE};
use crate::blocks::*;
use crate::client::{self, Client, HttpTransport, Transport};
use crate::config::{Config, SiteSettings};
use crate::feed::{self, render_feed, FeedConfig};
use crate::filter::{self, FilterDirectiveSet, FilterInput, RawFilterInput, ARTICLE_FIELDS, ARTICLE_TYPE};
use crate::menu::Menu;
use crate::params::Params;
use crate::render::{self, Page, Theme};
use crate::value::{list, object, text};
use gtmpl::Value;
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::warn;

/// The article fields the home page's teasers need.
const TEASER_FIELDS: &[&str] = &["title", "path", "field_image", "uid", "created"];

/// The number of entries in the Atom feed.
pub const FEED_LIMIT: usize = 20;

pub struct Site<T = HttpTransport> {
    client: Client<T>,
    theme: Theme,
    settings: SiteSettings,
}

impl Site {
    /// Creates a site talking to the CMS over HTTP.
    pub fn from_config(config: &Config) -> Result<Site> {
        Site::new(config, HttpTransport::new(config.request_timeout)?)
    }
}

impl<T: Transport> Site<T> {
    pub fn new(config: &Config, transport: T) -> Result<Site<T>> {
        Ok(Site {
            client: Client::new(&config.cms_base_url, transport)?,
            theme: Theme::load(config)?,
            settings: config.site.clone(),
        })
    }

    pub fn settings(&self) -> &SiteSettings {
        &self.settings
    }

    /// Renders the home page: the hero, stats, the latest articles, FAQs,
    /// pricing, and clients.
    pub fn home(&self) -> Result<String> {
        let articles: Vec<Article> = self.client.resource_collection(
            ARTICLE_TYPE,
            &latest_articles(TEASER_FIELDS, self.settings.home_article_limit),
        )?;
        let origin = self.client.origin();
        let teasers: Vec<Teaser> = articles
            .iter()
            .map(|article| Teaser::from_article(article, origin))
            .collect();

        let blocks = &self.settings.blocks;
        let featured_tier = self.settings.featured_tier.as_str();
        let content = vec![
            (
                "hero",
                self.block(HERO_TYPE, blocks.hero.as_deref(), HERO_INCLUDES, |hero: Hero| {
                    hero.to_value(origin)
                }),
            ),
            (
                "stats",
                self.block(STATS_TYPE, blocks.stats.as_deref(), STATS_INCLUDES, |stats: Stats| {
                    match stats.field_stats_item.is_empty() {
                        true => Value::Nil,
                        false => stats.to_value(),
                    }
                }),
            ),
            ("articles", list(&teasers)),
            (
                "faqs",
                self.block(FAQS_TYPE, blocks.faqs.as_deref(), FAQS_INCLUDES, |faqs: Faqs| {
                    faqs.to_value()
                }),
            ),
            (
                "pricing",
                self.block(
                    PRICING_TYPE,
                    blocks.pricing.as_deref(),
                    PRICING_INCLUDES,
                    |pricing: Pricing| match pricing.field_advantages.is_empty() {
                        true => Value::Nil,
                        false => pricing.to_value(featured_tier),
                    },
                ),
            ),
            (
                "clients",
                self.block(
                    CLIENTS_TYPE,
                    blocks.clients.as_deref(),
                    CLIENTS_INCLUDES,
                    |clients: Clients| match clients.field_clients.is_empty() {
                        true => Value::Nil,
                        false => clients.to_value(origin),
                    },
                ),
            ),
        ];
        self.render(
            Page::Home,
            &self.settings.title,
            &self.settings.home_description,
            self.menu(),
            content,
        )
    }

    /// Renders the blogs page: the filter form (echoing `raw`) and every
    /// article matching it.
    pub fn blogs(&self, raw: &RawFilterInput) -> Result<String> {
        let input = FilterInput::from(raw);
        let articles: Vec<Article> = self
            .client
            .resource_collection(ARTICLE_TYPE, &filter::build_from(&input).to_params())?;
        let origin = self.client.origin();
        let listings: Vec<Listing> = articles
            .iter()
            .map(|article| Listing::from_article(article, origin))
            .collect();

        let selected = input.author.id();
        let authors: Vec<AuthorOption> = self
            .authors()
            .iter()
            .map(|user| AuthorOption::new(user, selected))
            .collect();

        let content = vec![
            ("search", text(raw.search_term.as_deref().unwrap_or_default())),
            ("date", text(raw.date_string.as_deref().unwrap_or_default())),
            ("all_authors", Value::Bool(selected.is_none())),
            ("authors", list(&authors)),
            ("count", text(&result_count(listings.len()))),
            ("posts", list(&listings)),
        ];
        self.render(
            Page::Blogs,
            &self.settings.page_title("Blogs"),
            &self.settings.description,
            self.menu(),
            content,
        )
    }

    /// Renders the Atom feed of the latest [`FEED_LIMIT`] articles.
    pub fn feed(&self) -> Result<String> {
        let articles: Vec<Article> = self
            .client
            .resource_collection(ARTICLE_TYPE, &latest_articles(ARTICLE_FIELDS, FEED_LIMIT))?;
        Ok(render_feed(
            &FeedConfig {
                title: &self.settings.title,
                subtitle: &self.settings.description,
                home_page: &self.settings.site_url,
                origin: self.client.origin(),
            },
            &articles,
        )?)
    }

    /// Renders the error page. The menu is left out so that an error page
    /// doesn't depend on the CMS.
    pub fn error_page(&self, status: u16, reason: &str, message: &str) -> Result<String> {
        self.render(
            Page::Error,
            &self.settings.page_title(reason),
            &self.settings.description,
            Value::Array(Vec::new()),
            vec![
                ("status", text(&status.to_string())),
                ("reason", text(reason)),
                ("message", text(message)),
            ],
        )
    }

    fn render(
        &self,
        page: Page,
        title: &str,
        description: &str,
        menu: Value,
        content: Vec<(&str, Value)>,
    ) -> Result<String> {
        let mut fields = vec![
            ("site_title", text(&self.settings.title)),
            ("title", text(title)),
            ("description", text(description)),
            ("menu", menu),
        ];
        fields.extend(content);
        Ok(self.theme.render(page, object(fields))?)
    }

    fn menu(&self) -> Value {
        let menu = match self.client.menu(&self.settings.menu) {
            Ok(menu) => menu,
            Err(err) => {
                warn!(menu = %self.settings.menu, error = %err, "menu unavailable");
                Menu::default()
            }
        };
        Value::from(&menu)
    }

    fn authors(&self) -> Vec<User> {
        let params = Params::new().with(format!("fields[{}]", USER_TYPE), USER_FIELDS);
        match self.client.resource_collection(USER_TYPE, &params) {
            Ok(authors) => authors,
            Err(err) => {
                warn!(resource = USER_TYPE, error = %err, "authors unavailable");
                Vec::new()
            }
        }
    }

    /// Fetches the block `id` and converts it with `f`. Unconfigured blocks
    /// and blocks that fail to load are [`Value::Nil`].
    fn block<B: DeserializeOwned>(
        &self,
        resource_type: &str,
        id: Option<&str>,
        includes: &str,
        f: impl FnOnce(B) -> Value,
    ) -> Value {
        let id = match id {
            Some(id) => id,
            None => return Value::Nil,
        };
        match self
            .client
            .resource::<B>(resource_type, id, &Params::new().with("include", includes))
        {
            Ok(block) => f(block),
            Err(err) => {
                warn!(resource = resource_type, id, error = %err, "block unavailable");
                Value::Nil
            }
        }
    }
}

/// The query for the newest published articles, projected to `fields`.
fn latest_articles(fields: &'static [&'static str], limit: usize) -> Params {
    FilterDirectiveSet {
        field_selection: fields,
        ..FilterDirectiveSet::fixed()
    }
    .to_params()
    .with("page[limit]", limit.to_string())
}

fn result_count(n: usize) -> String {
    match n {
        1 => "Showing 1 article".to_owned(),
        n => format!("Showing {} articles", n),
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure to produce a page.
#[derive(Debug)]
pub enum Error {
    /// Returned when the CMS can't deliver the page's content.
    Client(client::Error),

    /// Returned when the theme can't be loaded or executed.
    Render(render::Error),

    /// Returned when the feed can't be serialized.
    Feed(feed::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Client(err) => write!(f, "Fetching content: {}", err),
            Error::Render(err) => err.fmt(f),
            Error::Feed(err) => write!(f, "Writing feed: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Client(err) => Some(err),
            Error::Render(err) => Some(err),
            Error::Feed(err) => Some(err),
        }
    }
}

impl From<client::Error> for Error {
    fn from(err: client::Error) -> Error {
        Error::Client(err)
    }
}

impl From<render::Error> for Error {
    fn from(err: render::Error) -> Error {
        Error::Render(err)
    }
}

impl From<feed::Error> for Error {
    fn from(err: feed::Error) -> Error {
        Error::Feed(err)
    }
}
