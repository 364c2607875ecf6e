//! Defines the [`Client`] for the CMS's JSON:API content API, the
//! [`Transport`] it fetches documents with, and the client [`Error`] type.
//!
//! Resource types follow the Drupal convention `{entity}--{bundle}` (e.g.,
//! `node--article`), which map onto the endpoint
//! `{base_url}/jsonapi/{entity}/{bundle}`.

use crate::jsonapi::{Document, DocumentError};
use crate::menu::{Menu, MenuItem};
use crate::params::Params;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// The media type of JSON:API documents.
pub const JSONAPI_MEDIA_TYPE: &str = "application/vnd.api+json";

/// Fetches the body of a document. The production implementation is
/// [`HttpTransport`]; tests substitute canned documents.
pub trait Transport {
    fn get(&self, url: &Url) -> Result<String>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &Url) -> Result<String> {
        (**self).get(url)
    }
}

/// A [`Transport`] over HTTP(S) backed by a blocking [`reqwest`] client.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<HttpTransport> {
        Ok(HttpTransport {
            client: reqwest::blocking::Client::builder()
                .timeout(timeout)
                .user_agent(concat!("lectern/", env!("CARGO_PKG_VERSION")))
                .build()?,
        })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.as_str())
            .header(ACCEPT, JSONAPI_MEDIA_TYPE)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text()?)
    }
}

/// Resolves CMS-relative asset paths (e.g., `/sites/default/files/a.jpg`)
/// against the CMS's public origin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Origin(String);

impl Origin {
    pub fn new(base_url: &str) -> Origin {
        Origin(base_url.trim_end_matches('/').to_owned())
    }

    /// Prefixes `path` with the origin. Paths that are already absolute URLs
    /// are returned unchanged.
    pub fn absolute(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_owned();
        }
        if path.starts_with('/') {
            format!("{}{}", self.0, path)
        } else {
            format!("{}/{}", self.0, path)
        }
    }
}

/// A client for the CMS's JSON:API endpoints.
pub struct Client<T = HttpTransport> {
    jsonapi_url: Url,
    origin: Origin,
    transport: T,
}

impl<T: Transport> Client<T> {
    /// Constructs a client for the CMS at `base_url` (e.g.,
    /// `https://cms.example.com`).
    pub fn new(base_url: &str, transport: T) -> Result<Client<T>> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Client {
            jsonapi_url: base.join("jsonapi/")?,
            origin: Origin::new(base_url),
            transport,
        })
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Builds the endpoint URL for `resource_type`, optionally for a single
    /// resource `id`, carrying `params` as its query.
    pub fn endpoint(&self, resource_type: &str, id: Option<&str>, params: &Params) -> Result<Url> {
        let (entity, bundle) = split_resource_type(resource_type)?;
        let relative = match id {
            Some(id) => format!("{}/{}/{}", entity, bundle, id),
            None => format!("{}/{}", entity, bundle),
        };
        let mut url = self.jsonapi_url.join(&relative)?;
        params.apply(&mut url);
        Ok(url)
    }

    /// Fetches a collection of `resource_type` resources filtered, projected,
    /// and sorted per `params`, and decodes each into a `R`.
    pub fn resource_collection<R: DeserializeOwned>(
        &self,
        resource_type: &str,
        params: &Params,
    ) -> Result<Vec<R>> {
        let url = self.endpoint(resource_type, None, params)?;
        self.fetch(&url)?
            .into_records()?
            .into_iter()
            .map(|record| decode(resource_type, record))
            .collect()
    }

    /// Fetches the single `resource_type` resource identified by `id`.
    pub fn resource<R: DeserializeOwned>(
        &self,
        resource_type: &str,
        id: &str,
        params: &Params,
    ) -> Result<R> {
        let url = self.endpoint(resource_type, Some(id), params)?;
        decode(resource_type, self.fetch(&url)?.into_record()?)
    }

    /// Fetches the menu `name` as exposed by the `jsonapi_menu_items` module.
    pub fn menu(&self, name: &str) -> Result<Menu> {
        let url = self.jsonapi_url.join(&format!("menu_items/{}", name))?;
        let items = self
            .fetch(&url)?
            .into_records()?
            .into_iter()
            .map(|record| decode::<MenuItem>("menu_items", record))
            .collect::<Result<Vec<MenuItem>>>()?;
        Ok(Menu::new(items))
    }

    fn fetch(&self, url: &Url) -> Result<Document> {
        let started = Instant::now();
        let body = self.transport.get(url)?;
        debug!(
            url = %url,
            bytes = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fetched document"
        );
        Document::from_str(&body).map_err(|err| Error::Json {
            url: url.to_string(),
            err,
        })
    }
}

fn split_resource_type(resource_type: &str) -> Result<(&str, &str)> {
    let mut parts = resource_type.splitn(2, "--");
    match (parts.next(), parts.next()) {
        (Some(entity), Some(bundle)) if !entity.is_empty() && !bundle.is_empty() => {
            Ok((entity, bundle))
        }
        _ => Err(Error::ResourceType(resource_type.to_owned())),
    }
}

fn decode<R: DeserializeOwned>(resource_type: &str, record: Value) -> Result<R> {
    serde_json::from_value(record).map_err(|err| Error::Decode {
        resource_type: resource_type.to_owned(),
        err,
    })
}

/// The result of a fallible CMS operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure talking to the CMS.
#[derive(Debug)]
pub enum Error {
    /// Returned when the HTTP request itself fails.
    Http(reqwest::Error),

    /// Returned when the CMS answers with a non-success status.
    Status { status: u16, url: String },

    /// Returned when a response body isn't valid JSON.
    Json { url: String, err: serde_json::Error },

    /// Returned when a response is JSON but not a usable JSON:API document.
    Document(DocumentError),

    /// Returned when a resource doesn't have the shape of its record type.
    Decode {
        resource_type: String,
        err: serde_json::Error,
    },

    /// Returned for resource types not of the form `entity--bundle`.
    ResourceType(String),

    /// Returned when there is a problem parsing or joining URLs.
    UrlParse(url::ParseError),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Http(err) => err.fmt(f),
            Error::Status { status, url } => {
                write!(f, "CMS answered {} for `{}`", status, url)
            }
            Error::Json { url, err } => write!(f, "decoding `{}`: {}", url, err),
            Error::Document(err) => err.fmt(f),
            Error::Decode { resource_type, err } => {
                write!(f, "decoding `{}` resource: {}", resource_type, err)
            }
            Error::ResourceType(resource_type) => {
                write!(f, "invalid resource type `{}`", resource_type)
            }
            Error::UrlParse(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(err) => Some(err),
            Error::Status { .. } => None,
            Error::Json { err, .. } => Some(err),
            Error::Document(err) => Some(err),
            Error::Decode { err, .. } => Some(err),
            Error::ResourceType(_) => None,
            Error::UrlParse(err) => Some(err),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Error {
        Error::Http(err)
    }
}

impl From<DocumentError> for Error {
    fn from(err: DocumentError) -> Error {
        Error::Document(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for URL parsing and joining functions.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;
    use std::cell::RefCell;

    /// Answers every request with the same body and remembers the URLs.
    struct Canned {
        body: &'static str,
        requested: RefCell<Vec<Url>>,
    }

    impl Canned {
        fn new(body: &'static str) -> Canned {
            Canned {
                body,
                requested: RefCell::new(Vec::new()),
            }
        }
    }

    impl Transport for Canned {
        fn get(&self, url: &Url) -> Result<String> {
            self.requested.borrow_mut().push(url.clone());
            Ok(self.body.to_owned())
        }
    }

    struct Failing;

    impl Transport for Failing {
        fn get(&self, url: &Url) -> Result<String> {
            Err(Error::Status {
                status: 503,
                url: url.to_string(),
            })
        }
    }

    #[derive(Deserialize, Debug, PartialEq)]
    struct Titled {
        id: String,
        title: String,
    }

    #[test]
    fn test_endpoint_maps_resource_types_onto_paths() -> Result<()> {
        let client = Client::new("https://cms.example.com", Failing)?;
        assert_eq!(
            "https://cms.example.com/jsonapi/node/article?page%5Blimit%5D=3",
            client
                .endpoint("node--article", None, &Params::new().with("page[limit]", "3"))?
                .as_str()
        );
        assert_eq!(
            "https://cms.example.com/jsonapi/block_content/hero/2d59",
            client
                .endpoint("block_content--hero", Some("2d59"), &Params::new())?
                .as_str()
        );
        assert!(matches!(
            client.endpoint("article", None, &Params::new()),
            Err(Error::ResourceType(_))
        ));
        Ok(())
    }

    #[test]
    fn test_base_url_path_is_preserved() -> Result<()> {
        let client = Client::new("https://example.com/cms", Failing)?;
        assert_eq!(
            "https://example.com/cms/jsonapi/user/user",
            client.endpoint("user--user", None, &Params::new())?.as_str()
        );
        Ok(())
    }

    #[test]
    fn test_resource_collection_decodes_records() -> Result<()> {
        let canned = Canned::new(
            r#"{"data":[
                {"type":"node--article","id":"a1","attributes":{"title":"One"}},
                {"type":"node--article","id":"a2","attributes":{"title":"Two"}}
            ]}"#,
        );
        let client = Client::new("https://cms.example.com/", &canned)?;
        let params = Params::new().with("sort", "-created");
        let titled: Vec<Titled> = client.resource_collection("node--article", &params)?;

        assert_eq!(
            vec!["One", "Two"],
            titled.iter().map(|t| t.title.as_str()).collect::<Vec<&str>>()
        );
        assert_eq!("a1", titled[0].id);
        assert_eq!(
            Some("sort=-created"),
            canned.requested.borrow()[0].query()
        );
        Ok(())
    }

    #[test]
    fn test_decode_errors_name_the_resource_type() -> Result<()> {
        let canned = Canned::new(r#"{"data":{"type":"node--article","id":"a1","attributes":{}}}"#);
        let client = Client::new("https://cms.example.com", &canned)?;
        match client.resource::<Titled>("node--article", "a1", &Params::new()) {
            Err(Error::Decode { resource_type, .. }) => assert_eq!("node--article", resource_type),
            other => panic!("expected a decode error, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_transport_errors_propagate() -> Result<()> {
        let client = Client::new("https://cms.example.com", Failing)?;
        let result: Result<Vec<Titled>> = client.resource_collection("node--article", &Params::new());
        assert!(matches!(result, Err(Error::Status { status: 503, .. })));
        Ok(())
    }

    #[test]
    fn test_origin_absolute() {
        let origin = Origin::new("https://cms.example.com/");
        assert_eq!(
            "https://cms.example.com/sites/default/files/a.jpg",
            origin.absolute("/sites/default/files/a.jpg")
        );
        assert_eq!("https://cms.example.com/a.jpg", origin.absolute("a.jpg"));
        assert_eq!("https://cdn.example.com/a.jpg", origin.absolute("https://cdn.example.com/a.jpg"));
    }
}
