//! Defines [`CollectionConfig`], the configuration surface of a
//! [`crate::collection::Collection`], and how it's loaded from YAML.
//!
//! ```yaml
//! Title: Blog
//! content_path: posts
//! template: post.html
//! excludes: ["draft*"]
//! recursive: true
//! parser_options:
//!   markdown_extras: [footnotes, tables]
//! index_name: All Posts
//! index_sort_key: date
//! index_reverse: true
//! ```

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::parser::{Attributes, ContentType, Options};

/// The configuration for a collection. Every field is optional in YAML and
/// falls back to the value in [`CollectionConfig::default`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectionConfig {
    /// The collection's display name.
    #[serde(rename = "Title", alias = "title")]
    pub title: String,

    /// Glob patterns, relative to `content_path`, selecting the content
    /// files. `*` matches within a path segment and `**` across segments.
    pub includes: Vec<String>,

    /// Glob patterns removing files the includes matched.
    pub excludes: Vec<String>,

    /// The template assigned to every discovered page.
    pub template: Option<PathBuf>,

    /// The directory pages are discovered in.
    pub content_path: Option<PathBuf>,

    /// Selects the parser for discovered pages.
    pub page_content_type: ContentType,

    /// Options handed to the parser, e.g. `markdown_extras`.
    pub parser_options: Options,

    pub template_vars: Attributes,

    /// Whether the patterns match below direct children of
    /// `content_path`.
    pub recursive: bool,

    pub index_name: String,

    /// The content type recorded on the generated index page.
    pub index_page_content_type: ContentType,

    pub index_template: Option<PathBuf>,
    pub index_sort_key: String,
    pub index_reverse: bool,
    pub index_template_vars: Attributes,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        CollectionConfig {
            title: String::new(),
            includes: vec![String::from("*.md"), String::from("*.html")],
            excludes: Vec::new(),
            template: None,
            content_path: None,
            page_content_type: ContentType::default(),
            parser_options: Options::new(),
            template_vars: Attributes::new(),
            recursive: false,
            index_name: String::from("All Items"),
            index_page_content_type: ContentType::default(),
            index_template: None,
            index_sort_key: String::from("title"),
            index_reverse: false,
            index_template_vars: Attributes::new(),
        }
    }
}

impl CollectionConfig {
    /// Loads a configuration file. Relative `content_path`, `template`, and
    /// `index_template` paths are resolved against the file's directory.
    pub fn from_file(path: &Path) -> Result<CollectionConfig> {
        let file = File::open(path).map_err(|err| Error::Open {
            path: path.to_owned(),
            err,
        })?;
        let mut config: CollectionConfig = serde_yaml::from_reader(file)?;
        if let Some(root) = path.parent() {
            config.resolve(root);
        }
        Ok(config)
    }

    fn resolve(&mut self, root: &Path) {
        for path in [
            &mut self.content_path,
            &mut self.template,
            &mut self.index_template,
        ]
        .into_iter()
        .flatten()
        {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        }
    }
}

impl std::str::FromStr for CollectionConfig {
    type Err = Error;

    /// Parses a configuration from YAML text. Paths are left as written.
    fn from_str(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }
}

/// Represents the result of loading a [`CollectionConfig`].
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading a [`CollectionConfig`].
#[derive(Debug)]
pub enum Error {
    /// Returned when the configuration file can't be opened.
    Open { path: PathBuf, err: std::io::Error },

    /// Returned when the configuration isn't valid YAML or has unknown or
    /// mistyped fields.
    DeserializeYaml(serde_yaml::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Open { path, err } => {
                write!(f, "Opening configuration file '{}': {}", path.display(), err)
            }
            Error::DeserializeYaml(err) => {
                write!(f, "Loading configuration: {}", err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Open { path: _, err } => Some(err),
            Error::DeserializeYaml(err) => Some(err),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}
