//! Reusable page blocks stored as `block_content` entities: hero, stats, FAQs,
//! pricing and clients. Each block has a record type (what the CMS returns)
//! and converts into a template [`Value`] with the page's defaults applied.

use crate::client::Origin;
use crate::fields::{format_number, Amount, File, Link, RichText};
use crate::value::{href, html, list, object, optional, text};
use gtmpl_value::Value;
use serde::Deserialize;

pub const HERO_TYPE: &str = "block_content--hero";
pub const STATS_TYPE: &str = "block_content--stats";
pub const FAQS_TYPE: &str = "block_content--faqs";
pub const PRICING_TYPE: &str = "block_content--pricing";
pub const CLIENTS_TYPE: &str = "block_content--clients_section";

/// Relations each block type needs resolved.
pub const HERO_INCLUDES: &str = "field_image";
pub const STATS_INCLUDES: &str = "field_stats_item";
pub const FAQS_INCLUDES: &str = "field_item";
pub const PRICING_INCLUDES: &str = "field_advantages,field_advantages.field_advantages";
pub const CLIENTS_INCLUDES: &str = "field_clients,field_clients.field_client_image";

/// Annual plans cost this share of twelve monthly payments.
const ANNUAL_RATE: f64 = 0.8;

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Hero {
    #[serde(default)]
    pub field_title: Option<String>,

    #[serde(default)]
    pub body: Option<RichText>,

    #[serde(default)]
    pub field_link: Option<Link>,

    #[serde(default)]
    pub field_image: Option<File>,
}

impl Hero {
    pub fn to_value(&self, origin: &Origin) -> Value {
        let title = non_empty(&self.field_title).unwrap_or("Deploy to the cloud with confidence");
        let link = self
            .field_link
            .as_ref()
            .and_then(|link| non_empty(&link.uri).map(|uri| (uri, link)));
        // The image is only shown when the file resolved, i.e. has a name.
        let image = self
            .field_image
            .as_ref()
            .filter(|image| non_empty(&image.filename).is_some());
        object(vec![
            ("title", text(title)),
            ("body", optional(self.body.as_ref().and_then(RichText::processed), html)),
            (
                "link",
                optional(link, |(uri, link)| {
                    object(vec![
                        ("url", href(uri)),
                        ("title", text(non_empty(&link.title).unwrap_or("Get started"))),
                    ])
                }),
            ),
            (
                "image",
                optional(image, |image| {
                    object(vec![
                        ("url", optional(image.absolute_url(origin).as_deref(), href)),
                        ("alt", text(image.alt().unwrap_or_default())),
                    ])
                }),
            ),
        ])
    }
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Stats {
    #[serde(default)]
    pub field_stats_item: Vec<StatsItem>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct StatsItem {
    pub id: String,

    #[serde(default)]
    pub field_number: Option<String>,

    #[serde(default)]
    pub field_stats_title: Option<String>,
}

impl From<&StatsItem> for Value {
    fn from(item: &StatsItem) -> Value {
        object(vec![
            ("id", text(&item.id)),
            ("name", text(item.field_stats_title.as_deref().unwrap_or_default())),
            ("value", text(item.field_number.as_deref().unwrap_or_default())),
        ])
    }
}

impl Stats {
    pub fn to_value(&self) -> Value {
        object(vec![("items", list(&self.field_stats_item))])
    }
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Faqs {
    #[serde(default)]
    pub field_faqs_title: Option<String>,

    #[serde(default)]
    pub field_item: Vec<Faq>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Faq {
    #[serde(default)]
    pub field_title: Option<String>,

    #[serde(default)]
    pub field_description: Option<RichText>,
}

impl From<&Faq> for Value {
    fn from(faq: &Faq) -> Value {
        object(vec![
            ("question", text(faq.field_title.as_deref().unwrap_or_default())),
            (
                "answer",
                html(
                    faq.field_description
                        .as_ref()
                        .and_then(RichText::html)
                        .unwrap_or_default(),
                ),
            ),
        ])
    }
}

impl Faqs {
    pub fn to_value(&self) -> Value {
        object(vec![
            (
                "title",
                text(non_empty(&self.field_faqs_title).unwrap_or("Frequently asked questions")),
            ),
            ("items", list(&self.field_item)),
        ])
    }
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Pricing {
    #[serde(default)]
    pub field_pricing_title: Option<String>,

    #[serde(default)]
    pub field_description: Option<String>,

    /// The plans. Each plan in turn lists its advantages.
    #[serde(default)]
    pub field_advantages: Vec<Plan>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Plan {
    #[serde(default, rename = "field__pricing_title")]
    pub title: Option<String>,

    #[serde(default, rename = "field_pricing")]
    pub price: Option<Amount>,

    #[serde(default, rename = "field_advantages")]
    pub advantages: Vec<Advantage>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Advantage {
    #[serde(default)]
    pub field_advantage: Option<String>,
}

/// A pricing column, derived from a [`Plan`].
#[derive(Clone, Debug, PartialEq)]
pub struct Tier {
    pub id: String,
    pub name: String,
    pub featured: bool,
    pub description: String,
    pub monthly: String,
    pub annually: String,
    pub highlights: Vec<String>,
}

impl Tier {
    /// Derives the tier for `plan`. The plan named `featured_tier` is
    /// highlighted.
    pub fn from_plan(plan: &Plan, featured_tier: &str) -> Tier {
        let name = plan.title.clone().unwrap_or_default();
        let price = plan.price.as_ref().and_then(Amount::value).unwrap_or(0.0);
        Tier {
            id: format!("tier-{}", slug::slugify(&name)),
            featured: name == featured_tier,
            description: format!("{} plan with comprehensive features", name),
            monthly: format!("${}", format_number(price)),
            annually: format!("${}", format_number(annual_price(price))),
            highlights: plan
                .advantages
                .iter()
                .filter_map(|advantage| advantage.field_advantage.clone())
                .collect(),
            name,
        }
    }
}

/// Twelve months with the annual discount, rounded to whole units.
pub fn annual_price(monthly: f64) -> f64 {
    (monthly * 12.0 * ANNUAL_RATE).round()
}

impl From<&Tier> for Value {
    fn from(tier: &Tier) -> Value {
        object(vec![
            ("id", text(&tier.id)),
            ("name", text(&tier.name)),
            ("featured", Value::Bool(tier.featured)),
            ("description", text(&tier.description)),
            ("monthly", text(&tier.monthly)),
            ("annually", text(&tier.annually)),
            (
                "highlights",
                Value::Array(tier.highlights.iter().map(|h| text(h)).collect()),
            ),
        ])
    }
}

impl Pricing {
    pub fn tiers(&self, featured_tier: &str) -> Vec<Tier> {
        self.field_advantages
            .iter()
            .map(|plan| Tier::from_plan(plan, featured_tier))
            .collect()
    }

    pub fn to_value(&self, featured_tier: &str) -> Value {
        object(vec![
            ("title", text(self.field_pricing_title.as_deref().unwrap_or_default())),
            ("description", text(self.field_description.as_deref().unwrap_or_default())),
            ("tiers", list(&self.tiers(featured_tier))),
        ])
    }
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Clients {
    #[serde(default)]
    pub field_clients_title: Option<String>,

    #[serde(default)]
    pub field_clients: Vec<Client>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Client {
    pub id: String,

    #[serde(default)]
    pub field_client_image: Option<File>,
}

/// Grid placement for the logo at `index`: the fourth and fifth logos are
/// shifted one column on small screens, and from the fifth on logos start in
/// the second column on the narrowest layout.
pub fn logo_placement(index: usize) -> String {
    let mut classes = Vec::new();
    if index >= 3 && index < 5 {
        classes.push("sm:col-start-2");
    }
    if index >= 4 {
        classes.push("col-start-2 sm:col-start-auto");
    }
    classes.join(" ")
}

impl Clients {
    pub fn to_value(&self, origin: &Origin) -> Value {
        let logos = self
            .field_clients
            .iter()
            .filter_map(|client| {
                let image = client.field_client_image.as_ref()?;
                Some((client, image, image.absolute_url(origin)?))
            })
            .enumerate()
            .map(|(index, (client, image, url))| {
                object(vec![
                    ("id", text(&client.id)),
                    ("url", href(&url)),
                    ("alt", text(image.alt().unwrap_or("Client logo"))),
                    ("placement", text(&logo_placement(index))),
                ])
            })
            .collect();
        object(vec![
            ("title", text(self.field_clients_title.as_deref().unwrap_or_default())),
            ("logos", Value::Array(logos)),
        ])
    }
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|s| !s.is_empty())
}
