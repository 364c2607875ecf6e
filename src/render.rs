//! Parses the theme's templates and renders page [`Value`]s through them.
//! Each page's template is the concatenation of its template files, so
//! shared markup (e.g., the layout's head and navigation) lives in files
//! listed for several pages.

use crate::config::Config;
use gtmpl::{Template, Value};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// The pages a [`Theme`] can render.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Page {
    Home,
    Blogs,
    Error,
}

/// The parsed templates for every [`Page`].
pub struct Theme {
    home: Template,
    blogs: Template,
    error: Template,
}

impl Theme {
    pub fn load(config: &Config) -> Result<Theme> {
        Ok(Theme {
            home: parse_template(config.home_template.iter())?,
            blogs: parse_template(config.blogs_template.iter())?,
            error: parse_template(config.error_template.iter())?,
        })
    }

    /// Executes the template for `page` against `value`.
    pub fn render(&self, page: Page, value: Value) -> Result<String> {
        let template = match page {
            Page::Home => &self.home,
            Page::Blogs => &self.blogs,
            Page::Error => &self.error,
        };
        let context = gtmpl::Context::from(value).map_err(Error::Template)?;
        let mut out: Vec<u8> = Vec::new();
        template
            .execute(&mut out, &context)
            .map_err(Error::Template)?;
        Ok(String::from_utf8(out)?)
    }
}

// Loads the template file contents, concatenates them, and parses the result
// into a template.
fn parse_template<P: AsRef<Path>>(template_files: impl Iterator<Item = P>) -> Result<Template> {
    let mut contents = String::new();
    for template_file in template_files {
        let template_file = template_file.as_ref();
        File::open(&template_file)
            .map_err(|e| Error::OpenTemplateFile {
                path: template_file.to_owned(),
                err: e,
            })?
            .read_to_string(&mut contents)?;
        contents.push(' ');
    }

    let mut template = Template::default();
    template.parse(&contents).map_err(Error::ParseTemplate)?;
    Ok(template)
}

pub type Result<T> = std::result::Result<T, Error>;

/// The error type for loading and executing templates.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O problems while opening template files.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing template files.
    ParseTemplate(String),

    /// Returned when a template fails to execute.
    Template(String),

    /// Returned when a template produces invalid UTF-8.
    Utf8(std::string::FromUtf8Error),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate(err) => write!(f, "Parsing template: {}", err),
            Error::Template(err) => write!(f, "Executing template: {}", err),
            Error::Utf8(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::ParseTemplate(_) => None,
            Error::Template(_) => None,
            Error::Utf8(err) => Some(err),
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

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Error {
        Error::Utf8(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::value::{object, text};
    use std::fs;

    #[test]
    fn test_parse_template_concatenates_files() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let head = dir.path().join("head.html");
        let body = dir.path().join("body.html");
        fs::write(&head, "<title>{{ .title }}</title>")?;
        fs::write(&body, "<p>{{ .body }}</p>")?;

        let template = parse_template(vec![&head, &body].into_iter())?;
        let context = gtmpl::Context::from(object(vec![
            ("title", text("A & B")),
            ("body", text("hi")),
        ]))
        .map_err(Error::Template)?;
        let mut out: Vec<u8> = Vec::new();
        template.execute(&mut out, &context).map_err(Error::Template)?;

        assert_eq!(
            "<title>A &amp; B</title> <p>hi</p> ",
            String::from_utf8(out)?
        );
        Ok(())
    }

    #[test]
    fn test_missing_template_file() {
        let missing = Path::new("/nonexistent/lectern/head.html");
        match parse_template(std::iter::once(missing)) {
            Err(Error::OpenTemplateFile { path, .. }) => assert_eq!(missing, path),
            Err(err) => panic!("unexpected error: {}", err),
            Ok(_) => panic!("expected an error"),
        }
    }
}
