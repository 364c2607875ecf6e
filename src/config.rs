//! Loads the site [`Config`] from a project directory. A project is a
//! directory containing `lectern.yaml`, a `theme/` directory described by
//! `theme/theme.yaml`, and an optional `static/` directory of assets served
//! (or exported) as-is.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// The name of the project file searched for by [`Config::from_directory`].
pub const PROJECT_FILE: &str = "lectern.yaml";

#[derive(Deserialize)]
struct ArticleLimit(usize);
impl Default for ArticleLimit {
    fn default() -> Self {
        ArticleLimit(3)
    }
}

#[derive(Deserialize)]
struct TimeoutSecs(u64);
impl Default for TimeoutSecs {
    fn default() -> Self {
        TimeoutSecs(10)
    }
}

/// The `block_content` ids of the home page's blocks. A missing id leaves
/// the block out.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct BlockIds {
    #[serde(default)]
    pub hero: Option<String>,
    #[serde(default)]
    pub stats: Option<String>,
    #[serde(default)]
    pub faqs: Option<String>,
    #[serde(default)]
    pub pricing: Option<String>,
    #[serde(default)]
    pub clients: Option<String>,
}

#[derive(Deserialize)]
struct Project {
    pub cms_base_url: String,

    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_title_template")]
    pub title_template: String,

    #[serde(default = "default_description")]
    pub description: String,

    #[serde(default)]
    pub home_description: Option<String>,

    #[serde(default = "default_menu")]
    pub menu: String,

    #[serde(default)]
    pub home_article_limit: ArticleLimit,

    #[serde(default = "default_featured_tier")]
    pub featured_tier: String,

    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default)]
    pub site_url: Option<Url>,

    #[serde(default)]
    pub threads: Option<usize>,

    #[serde(default)]
    pub request_timeout_secs: TimeoutSecs,

    #[serde(default)]
    pub blocks: BlockIds,
}

fn default_title() -> String {
    "HashNode".to_owned()
}

fn default_title_template() -> String {
    "%s | Tech".to_owned()
}

fn default_description() -> String {
    "Stay Ahead in Tech.".to_owned()
}

fn default_menu() -> String {
    "main".to_owned()
}

fn default_featured_tier() -> String {
    "Elite Kit".to_owned()
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_owned()
}

#[derive(Deserialize)]
struct Theme {
    home: Vec<PathBuf>,
    blogs: Vec<PathBuf>,
    error: Vec<PathBuf>,
}

/// Everything the pages need to know about the site itself.
#[derive(Clone, Debug, PartialEq)]
pub struct SiteSettings {
    pub title: String,

    /// Page titles are this template with `%s` replaced by the page name.
    pub title_template: String,
    pub description: String,
    pub home_description: String,

    /// The machine name of the navigation menu.
    pub menu: String,
    pub home_article_limit: usize,

    /// The pricing plan rendered as featured.
    pub featured_tier: String,

    /// The public URL of the site, used for feed links.
    pub site_url: Url,
    pub blocks: BlockIds,
}

impl SiteSettings {
    pub fn page_title(&self, page: &str) -> String {
        self.title_template.replace("%s", page)
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub cms_base_url: String,
    pub site: SiteSettings,
    pub home_template: Vec<PathBuf>,
    pub blogs_template: Vec<PathBuf>,
    pub error_template: Vec<PathBuf>,
    pub static_directory: PathBuf,
    pub listen: String,
    pub threads: usize,
    pub request_timeout: Duration,
}

impl Config {
    /// Finds `lectern.yaml` in `dir` or the nearest ancestor that has one and
    /// loads it. `threads` overrides the project's thread count.
    pub fn from_directory(dir: &Path, threads: Option<usize>) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            match Config::from_project_file(&path, threads) {
                Ok(config) => Ok(config),
                Err(e) => Err(anyhow!("Loading configuration: {:?}", e)),
            }
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent, threads),
                None => Err(anyhow!(
                    "Could not find `{}` in any parent directory",
                    PROJECT_FILE
                )),
            }
        }
    }

    pub fn from_project_file(path: &Path, threads: Option<usize>) -> Result<Config> {
        let project: Project = serde_yaml::from_reader(open(path, "project")?)?;
        match path.parent() {
            None => Err(anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )),
            Some(project_root) => {
                let theme_dir = project_root.join("theme");
                let theme: Theme =
                    serde_yaml::from_reader(open(&theme_dir.join("theme.yaml"), "theme")?)?;
                let resolve = |files: &[PathBuf]| -> Vec<PathBuf> {
                    files.iter().map(|relpath| theme_dir.join(relpath)).collect()
                };
                let site_url = match project.site_url {
                    Some(url) => url,
                    None => Url::parse(&format!("http://{}/", project.listen))?,
                };
                let description = project.description;
                Ok(Config {
                    home_template: resolve(&theme.home),
                    blogs_template: resolve(&theme.blogs),
                    error_template: resolve(&theme.error),
                    static_directory: project_root.join("static"),
                    threads: match threads.or(project.threads) {
                        None => num_cpus::get(),
                        Some(threads) => threads.max(1),
                    },
                    request_timeout: Duration::from_secs(project.request_timeout_secs.0),
                    site: SiteSettings {
                        home_description: project
                            .home_description
                            .unwrap_or_else(|| description.clone()),
                        title: project.title,
                        title_template: project.title_template,
                        description,
                        menu: project.menu,
                        home_article_limit: project.home_article_limit.0,
                        featured_tier: project.featured_tier,
                        site_url,
                        blocks: project.blocks,
                    },
                    cms_base_url: project.cms_base_url,
                    listen: project.listen,
                })
            }
        }
    }
}

fn open(path: &Path, kind: &str) -> Result<File> {
    match File::open(path) {
        Err(e) => Err(anyhow!("Opening {} file `{}`: {}", kind, path.display(), e)),
        Ok(file) => Ok(file),
    }
}
