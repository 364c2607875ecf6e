//! Drives the site end to end against canned CMS documents from `testdata/`.

use anyhow::Result;
use lectern::build::{export, WATERMARK};
use lectern::client::{self, Transport};
use lectern::config::Config;
use lectern::filter::RawFilterInput;
use lectern::server::route;
use lectern::site::{Error as SiteError, Site};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

fn project_root() -> &'static Path {
    Path::new(env!("CARGO_MANIFEST_DIR"))
}

/// Serves fixtures by endpoint path and records every requested URL.
/// Fixtures named in `failing` answer 500 instead.
struct Cms {
    requests: RefCell<Vec<Url>>,
    failing: Vec<&'static str>,
}

impl Cms {
    fn new() -> Cms {
        Cms::failing(&[])
    }

    fn failing(fixtures: &[&'static str]) -> Cms {
        Cms {
            requests: RefCell::new(Vec::new()),
            failing: fixtures.to_vec(),
        }
    }

    /// The query of the last request to `path`, as a map.
    fn last_query(&self, path: &str) -> HashMap<String, String> {
        self.requests
            .borrow()
            .iter()
            .rev()
            .find(|url| url.path() == path)
            .map(|url| url.query_pairs().into_owned().collect())
            .unwrap_or_default()
    }
}

impl Transport for Cms {
    fn get(&self, url: &Url) -> client::Result<String> {
        self.requests.borrow_mut().push(url.clone());
        let path = url.path();
        let fixture = if path == "/jsonapi/node/article" {
            "articles.json"
        } else if path == "/jsonapi/user/user" {
            "users.json"
        } else if path == "/jsonapi/menu_items/main" {
            "menu.json"
        } else if path.starts_with("/jsonapi/block_content/hero/") {
            "hero.json"
        } else if path.starts_with("/jsonapi/block_content/stats/") {
            "stats.json"
        } else if path.starts_with("/jsonapi/block_content/faqs/") {
            "faqs.json"
        } else if path.starts_with("/jsonapi/block_content/pricing/") {
            "pricing.json"
        } else if path.starts_with("/jsonapi/block_content/clients_section/") {
            "clients.json"
        } else {
            return Err(client::Error::Status {
                status: 404,
                url: url.to_string(),
            });
        };
        if self.failing.contains(&fixture) {
            return Err(client::Error::Status {
                status: 500,
                url: url.to_string(),
            });
        }
        fs::read_to_string(project_root().join("testdata").join(fixture)).map_err(|_| {
            client::Error::Status {
                status: 404,
                url: url.to_string(),
            }
        })
    }
}

fn config() -> Result<Config> {
    Config::from_directory(project_root(), Some(1))
}

#[test]
fn test_home_page() -> Result<()> {
    let cms = Cms::new();
    let site = Site::new(&config()?, &cms)?;
    let html = site.home()?;

    // layout
    assert!(html.contains("<title>HashNode</title>"));
    assert!(html.contains(r#"content="A site powered by a Drupal backend.""#));
    assert!(html.contains(r#"<a href="/blogs">Blogs</a>"#));
    assert!(!html.contains("/hidden"));
    assert!(html.contains(r#"<ul class="submenu"><li><a href="/blogs?search=rust">Rust</a></li></ul>"#));

    // hero
    assert!(html.contains("Ship faster with a headless CMS"));
    assert!(html.contains("<p>Content in, pages out.</p>"));
    assert!(html.contains(r#"<a class="button" href="https://example.com/start">Get started</a>"#));
    assert!(html.contains(
        r#"src="https://cms.example.com/sites/default/files/hero.png" alt="Dashboard screenshot""#
    ));

    // stats
    assert!(html.contains("<dd>44 million</dd>"));
    assert!(html.contains("<dt>Transactions every 24 hours</dt>"));

    // teasers
    assert!(html.contains(r#"<a href="/blog/shipping-rust">Shipping Rust to production</a>"#));
    assert!(html.contains("March 15, 2024"));
    assert!(html.contains("Ada Lovelace"));
    assert!(html.contains("https://cms.example.com/sites/default/files/pictures/ada.png"));
    assert!(html.contains("Caching &lt;strategies&gt; &amp; pitfalls"));
    assert!(html.contains(r#"href="/node/9d2e4f6a-3b5c-4d7e-8f90-a1b2c3d4e5f6""#));
    assert!(!html.contains("No nodes found"));

    // faqs
    assert!(html.contains("Frequently asked questions"));
    assert!(html.contains("<dd><p>Yes, <strong>any</strong> time.</p></dd>"));

    // pricing
    assert!(html.contains(r#"<div class="tier tier-featured" id="tier-elite-kit">"#));
    assert!(html.contains(r#"<div class="tier" id="tier-starter-kit">"#));
    assert!(html.contains(r#"<span class="amount">$49</span> / month"#));
    assert!(html.contains(r#"<span class="amount">$470</span> / year"#));
    assert!(html.contains(r#"<span class="amount">$182</span> / year"#));
    assert!(html.contains("<li>Advanced analytics</li>"));

    // clients
    assert!(html.contains(r#"alt="Transistor""#));
    assert!(html.contains(r#"src="https://cms.example.com/sites/default/files/reform.svg" alt="Client logo""#));

    let query = cms.last_query("/jsonapi/node/article");
    assert_eq!(Some("3"), query.get("page[limit]").map(String::as_str));
    assert_eq!(
        Some("title,path,field_image,uid,created"),
        query.get("fields[node--article]").map(String::as_str)
    );
    assert_eq!(Some("-created"), query.get("sort").map(String::as_str));
    assert_eq!(
        Some("field_advantages,field_advantages.field_advantages"),
        cms.last_query("/jsonapi/block_content/pricing/2ca4fdf1-02e1-4f0b-a00f-43055ebb678f")
            .get("include")
            .map(String::as_str)
    );
    Ok(())
}

#[test]
fn test_home_page_degrades_missing_blocks() -> Result<()> {
    let cms = Cms::failing(&["stats.json", "pricing.json", "clients.json", "menu.json"]);
    let site = Site::new(&config()?, &cms)?;
    let html = site.home()?;

    assert!(html.contains("No stats data available"));
    assert!(html.contains("No pricing data available"));
    assert!(html.contains("No clients data available"));
    assert!(!html.contains(r#"<a href="/blogs">Blogs</a>"#));
    assert!(html.contains("Shipping Rust to production"));
    Ok(())
}

#[test]
fn test_home_page_fails_without_articles() -> Result<()> {
    let cms = Cms::failing(&["articles.json"]);
    let site = Site::new(&config()?, &cms)?;
    assert!(matches!(site.home(), Err(SiteError::Client(_))));
    Ok(())
}

#[test]
fn test_blogs_page_with_filters() -> Result<()> {
    let cms = Cms::new();
    let site = Site::new(&config()?, &cms)?;
    let html = site.blogs(&RawFilterInput::from_query(
        "search=+rust+&author=u-ada&date=2024-03-15&date=",
    ))?;

    assert!(html.contains("<title>Blogs | Tech</title>"));
    assert!(html.contains(r#"value=" rust ""#));
    assert!(html.contains(r#"<option value="u-ada" selected>Ada Lovelace</option>"#));
    assert!(html.contains(r#"<option value="u-grace">Grace Hopper</option>"#));
    assert!(html.contains(r#"<option value="u-anon">User u-anon</option>"#));
    assert!(html.contains(r#"<option value="all">All Authors</option>"#));
    assert!(html.contains(r#"type="date" name="date" value="2024-03-15""#));
    assert!(html.contains("Showing 2 articles"));

    // summary when present, otherwise the processed body
    assert!(html.contains("Lessons from a year of Rust in production."));
    assert!(html.contains("<p>Caching is hard.</p> ..."));
    assert!(html.contains("https://cms.example.com/images/default-image.jpg"));
    assert!(html.contains("https://cms.example.com/sites/default/files/2024-03/rust.jpg"));

    let query = cms.last_query("/jsonapi/node/article");
    assert_eq!(Some("1"), query.get("filter[status]").map(String::as_str));
    assert_eq!(
        Some("title,path,field_image,uid,created,body"),
        query.get("fields[node--article]").map(String::as_str)
    );
    assert_eq!(Some("CONTAINS"), query.get("filter[title][operator]").map(String::as_str));
    assert_eq!(Some("rust"), query.get("filter[title][value]").map(String::as_str));
    assert_eq!(Some("u-ada"), query.get("filter[uid.id]").map(String::as_str));
    assert_eq!(
        Some("2024-03-15T00:00:00.000Z"),
        query
            .get("filter[created-range][condition][value][0]")
            .map(String::as_str)
    );
    assert_eq!(
        Some("2024-03-15T23:59:59.999Z"),
        query
            .get("filter[created-range][condition][value][1]")
            .map(String::as_str)
    );
    assert_eq!(
        Some("display_name,uid"),
        cms.last_query("/jsonapi/user/user")
            .get("fields[user--user]")
            .map(String::as_str)
    );
    Ok(())
}

#[test]
fn test_blogs_page_without_filters() -> Result<()> {
    let cms = Cms::new();
    let site = Site::new(&config()?, &cms)?;
    let html = site.blogs(&RawFilterInput::from_query("author=all&date=not-a-date"))?;

    assert!(html.contains(r#"<option value="all" selected>All Authors</option>"#));
    let query = cms.last_query("/jsonapi/node/article");
    assert_eq!(4, query.len());
    assert!(!query.contains_key("filter[uid.id]"));
    assert!(!query.contains_key("filter[title][value]"));
    Ok(())
}

#[test]
fn test_routes() -> Result<()> {
    let cms = Cms::new();
    let site = Site::new(&config()?, &cms)?;
    let static_directory = project_root().join("static");

    let home = route(&site, &static_directory, "GET", "/");
    assert_eq!(200, home.status);
    assert_eq!("text/html; charset=utf-8", home.content_type);

    let blogs = route(&site, &static_directory, "GET", "/blogs?search=rust");
    assert_eq!(200, blogs.status);
    assert_eq!(
        Some("rust"),
        cms.last_query("/jsonapi/node/article")
            .get("filter[title][value]")
            .map(String::as_str)
    );

    let feed = route(&site, &static_directory, "GET", "/feed.atom");
    assert_eq!(200, feed.status);
    assert_eq!("application/atom+xml; charset=utf-8", feed.content_type);
    let xml = String::from_utf8(feed.body)?;
    assert!(xml.contains("http://localhost:8080/blog/shipping-rust"));

    let css = route(&site, &static_directory, "GET", "/css/site.css");
    assert_eq!(200, css.status);
    assert_eq!("text/css; charset=utf-8", css.content_type);

    assert_eq!(404, route(&site, &static_directory, "GET", "/missing").status);
    assert_eq!(404, route(&site, &static_directory, "GET", "/../Cargo.toml").status);

    let post = route(&site, &static_directory, "POST", "/blogs");
    assert_eq!(405, post.status);
    assert!(String::from_utf8(post.body)?.contains("405 Method Not Allowed"));
    Ok(())
}

#[test]
fn test_unavailable_cms_is_a_bad_gateway() -> Result<()> {
    let cms = Cms::failing(&["articles.json"]);
    let site = Site::new(&config()?, &cms)?;
    let reply = route(&site, &project_root().join("static"), "GET", "/");
    assert_eq!(502, reply.status);
    let html = String::from_utf8(reply.body)?;
    assert!(html.contains("502 Bad Gateway"));
    assert!(html.contains("<title>Bad Gateway | Tech</title>"));
    Ok(())
}

#[test]
fn test_export() -> Result<()> {
    let cms = Cms::new();
    let site = Site::new(&config()?, &cms)?;
    let scratch = tempfile::tempdir()?;
    let output: PathBuf = scratch.path().join("public");

    export(&site, &project_root().join("static"), &output)?;
    assert!(fs::read_to_string(output.join("index.html"))?.contains("Latest Articles."));
    assert!(fs::read_to_string(output.join("blogs").join("index.html"))?.contains("Showing 2 articles"));
    assert!(fs::read_to_string(output.join("feed.atom"))?.contains("Shipping Rust to production"));
    assert!(output.join("css").join("site.css").is_file());
    assert!(output.join(WATERMARK).is_file());

    // a second build replaces the first
    export(&site, &project_root().join("static"), &output)?;
    assert!(output.join("index.html").is_file());
    Ok(())
}
