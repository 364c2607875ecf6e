//! Serves the site over HTTP. A pool of worker threads shares one
//! [`tiny_http::Server`], and each worker owns its own [`Site`] (CMS client
//! and parsed theme), so requests are handled without any shared state.
//!
//! Routing is done by [`route`], which is independent of the HTTP library:
//!
//! | Method | Path          | Page                               |
//! |--------|---------------|------------------------------------|
//! | GET    | `/`           | home                               |
//! | GET    | `/blogs`      | article listing, filtered by query |
//! | GET    | `/feed.atom`  | Atom feed                          |
//! | GET    | anything else | a file under `static/`, or 404     |
//!
//! Other methods get 405. A page whose content the CMS can't deliver gets 502.

use crate::client::Transport;
use crate::config::Config;
use crate::filter::RawFilterInput;
use crate::site::{Error as SiteError, Site};
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tiny_http::{Header, Request, Response, Server, StatusCode};
use tracing::{error, info, warn};

const HTML: &str = "text/html; charset=utf-8";
const ATOM: &str = "application/atom+xml; charset=utf-8";
const PLAIN: &str = "text/plain; charset=utf-8";

/// A response, ready to be written.
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    fn ok(content_type: &'static str, body: impl Into<Vec<u8>>) -> Reply {
        Reply {
            status: 200,
            content_type,
            body: body.into(),
        }
    }
}

/// Handles one request for `target` (the request path plus optional query).
pub fn route<T: Transport>(site: &Site<T>, static_directory: &Path, method: &str, target: &str) -> Reply {
    if method != "GET" && method != "HEAD" {
        return error_reply(site, 405, "Method Not Allowed", "Only GET requests are supported.");
    }

    let (path, query) = match target.find('?') {
        Some(i) => (&target[..i], &target[i + 1..]),
        None => (target, ""),
    };

    let page = match path {
        "/" | "/index.html" => site.home().map(|body| Reply::ok(HTML, body)),
        "/blogs" | "/blogs/" => site
            .blogs(&RawFilterInput::from_query(query))
            .map(|body| Reply::ok(HTML, body)),
        "/feed.atom" => site.feed().map(|body| Reply::ok(ATOM, body)),
        _ => return static_file(site, static_directory, path),
    };

    match page {
        Ok(reply) => reply,
        Err(err @ SiteError::Client(_)) => {
            error!(path, error = %err, "content unavailable");
            error_reply(
                site,
                502,
                "Bad Gateway",
                "The content service is unavailable. Please try again later.",
            )
        }
        Err(err) => {
            error!(path, error = %err, "rendering failed");
            error_reply(site, 500, "Internal Server Error", "Something went wrong.")
        }
    }
}

fn static_file<T: Transport>(site: &Site<T>, static_directory: &Path, path: &str) -> Reply {
    let not_found = || error_reply(site, 404, "Not Found", "The page you requested does not exist.");
    let file = match static_path(static_directory, path) {
        Some(file) => file,
        None => return not_found(),
    };
    if !file.is_file() {
        return not_found();
    }
    match std::fs::read(&file) {
        Ok(body) => Reply::ok(content_type(&file), body),
        Err(err) => {
            warn!(file = %file.display(), error = %err, "reading static file");
            not_found()
        }
    }
}

/// Maps the URL `path` onto a file under `root`. Paths that could escape
/// `root` are rejected.
fn static_path(root: &Path, path: &str) -> Option<PathBuf> {
    let mut file = root.to_owned();
    let mut segments = 0;
    for segment in path.split('/').filter(|segment| !segment.is_empty()) {
        if segment == ".." || segment == "." || segment.contains('\\') {
            return None;
        }
        file.push(segment);
        segments += 1;
    }
    match segments {
        0 => None,
        _ => Some(file),
    }
}

fn content_type(file: &Path) -> &'static str {
    match file.extension().and_then(|ext| ext.to_str()) {
        Some("html") => HTML,
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("txt") => PLAIN,
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

fn error_reply<T: Transport>(site: &Site<T>, status: u16, reason: &str, message: &str) -> Reply {
    match site.error_page(status, reason, message) {
        Ok(body) => Reply {
            status,
            content_type: HTML,
            body: body.into(),
        },
        Err(err) => {
            error!(status, error = %err, "rendering error page");
            Reply {
                status,
                content_type: PLAIN,
                body: format!("{} {}", status, reason).into(),
            }
        }
    }
}

/// Listens on `config.listen` and serves requests on `config.threads`
/// workers until the process exits.
pub fn serve(config: &Config) -> Result<()> {
    // Fail fast on a broken theme or CMS URL rather than in every worker.
    Site::from_config(config)?;

    let server = match Server::http(&config.listen) {
        Ok(server) => Arc::new(server),
        Err(e) => return Err(anyhow!("Listening on `{}`: {}", config.listen, e)),
    };
    info!(listen = %config.listen, threads = config.threads, "serving");

    let mut workers = Vec::with_capacity(config.threads);
    for worker in 0..config.threads {
        let server = Arc::clone(&server);
        let config = config.clone();
        workers.push(thread::spawn(move || {
            let site = match Site::from_config(&config) {
                Ok(site) => site,
                Err(err) => {
                    error!(worker, error = %err, "starting worker");
                    return;
                }
            };
            for request in server.incoming_requests() {
                handle(&site, &config.static_directory, request);
            }
        }));
    }

    for worker in workers {
        if worker.join().is_err() {
            error!("worker panicked");
        }
    }
    Ok(())
}

fn handle<T: Transport>(site: &Site<T>, static_directory: &Path, request: Request) {
    let started = Instant::now();
    let method = request.method().to_string();
    let target = request.url().to_owned();

    let reply = route(site, static_directory, &method, &target);
    let status = reply.status;
    let mut response = Response::from_data(reply.body).with_status_code(StatusCode(status));
    if let Ok(header) = Header::from_bytes("Content-Type", reply.content_type) {
        response = response.with_header(header);
    }
    if let Err(err) = request.respond(response) {
        warn!(path = %target, error = %err, "writing response");
    }

    info!(
        method = %method,
        path = %target,
        status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
}
