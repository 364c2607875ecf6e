//! Exports the [`build_site`] function, which renders the site once into a
//! directory of static files: the home page (`index.html`), the unfiltered
//! article listing (`blogs/index.html`), the Atom feed (`feed.atom`), and the
//! contents of the project's static directory.

use crate::client::Transport;
use crate::config::Config;
use crate::filter::RawFilterInput;
use crate::site::{Error as SiteError, Site};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

/// Marks a directory as created by [`build_site`]. Only marked (or empty)
/// directories are cleaned before a build.
pub const WATERMARK: &str = ".lectern";

/// Builds the site described by `config` into `output`.
pub fn build_site(config: &Config, output: &Path) -> Result<()> {
    let site = Site::from_config(config)?;
    export(&site, &config.static_directory, output)
}

/// Renders every page of `site` and copies `static_directory` into `output`.
pub fn export<T: Transport>(site: &Site<T>, static_directory: &Path, output: &Path) -> Result<()> {
    // Render before touching the output so a failed build leaves the
    // previous one in place.
    let home = site.home()?;
    let blogs = site.blogs(&RawFilterInput::default())?;
    let feed = site.feed()?;

    clean(output)?;
    fs::create_dir_all(output.join("blogs"))?;
    fs::write(output.join(WATERMARK), "")?;

    // Static files go first so the pages win any name collision.
    if static_directory.is_dir() {
        copy_dir(static_directory, output)?;
    }
    fs::write(output.join("index.html"), home)?;
    fs::write(output.join("blogs").join("index.html"), blogs)?;
    fs::write(output.join("feed.atom"), feed)?;

    info!(output = %output.display(), "built site");
    Ok(())
}

// Removes a previous build. Directories that weren't produced by a build are
// left alone unless they are empty.
fn clean(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    let is_empty = fs::read_dir(dir)
        .map_err(|err| Error::Clean {
            path: dir.to_owned(),
            err,
        })?
        .next()
        .is_none();
    if !is_empty && !dir.join(WATERMARK).exists() {
        return Err(Error::Foreign(dir.to_owned()));
    }
    rmdir(dir)
}

fn rmdir(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    for result in WalkDir::new(src).min_depth(1) {
        let entry = result?;
        let relative = match entry.path().strip_prefix(src) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

pub type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during rendering,
/// cleaning the output directory, copying static files, and other I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned when a page can't be produced.
    Site(SiteError),

    /// Returned for I/O problems while cleaning the output directory.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned when the output directory holds files that no build wrote.
    Foreign(PathBuf),

    /// Returned for WalkDir I/O errors.
    WalkDir(walkdir::Error),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Site(err) => err.fmt(f),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::Foreign(path) => write!(
                f,
                "Refusing to overwrite '{}': it is not empty and has no `{}` file",
                path.display(),
                WATERMARK
            ),
            Error::WalkDir(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Site(err) => Some(err),
            Error::Clean { path: _, err } => Some(err),
            Error::Foreign(_) => None,
            Error::WalkDir(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<SiteError> for Error {
    /// Converts [`SiteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: SiteError) -> Error {
        Error::Site(err)
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}
