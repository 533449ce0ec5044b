//! Defines the [`Collection`] type, a named group of [`Page`]s discovered
//! from a content directory, and the [`Error`] type for discovery.
//!
//! Discovery is lazy: nothing touches the filesystem until the page set is
//! first asked for, and the result is cached for the life of the collection.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde_yaml::Value;

use crate::config::CollectionConfig;
use crate::page::Page;
use crate::parser::{self, Attributes, ContentType, PageParser};
use crate::scan::{GlobScanner, Scanner};

/// The pages of a [`Collection`], in discovery order.
pub type PageSet = Arc<[Arc<Page>]>;

/// A configured group of [`Page`]s. Its pages are either supplied up front
/// with [`Collection::with_pages`] or discovered from the configured content
/// directory on first access.
pub struct Collection {
    title: String,
    includes: Vec<String>,
    template: Option<PathBuf>,
    content_path: Option<PathBuf>,
    template_vars: Attributes,
    recursive: bool,

    index_name: String,
    index_template: Option<PathBuf>,
    index_sort_key: String,
    index_reverse: bool,
    index_template_vars: Attributes,
    index_page_content_type: ContentType,

    /// Constructs every discovered page.
    parser: Arc<dyn PageParser>,
    /// The content type `parser` was built from; `None` once replaced by
    /// [`Collection::with_parser`].
    page_content_type: Option<ContentType>,
    scanner: Box<dyn Scanner>,

    /// Pages supplied at construction. When non-empty they are the page set
    /// and the content directory is never scanned.
    explicit: PageSet,

    /// `None` until discovery succeeds.
    cache: Mutex<Option<PageSet>>,

    span: tracing::Span,
}

/// Controls [`Collection::generate_index`].
#[derive(Clone, Debug)]
pub struct IndexOptions {
    /// Derived from the title when absent.
    pub slug: Option<String>,
    pub template: Option<PathBuf>,
    /// The attribute the pages are ordered by.
    pub sort_key: String,
    pub reverse: bool,
}

impl Default for IndexOptions {
    fn default() -> Self {
        IndexOptions {
            slug: None,
            template: None,
            sort_key: String::from("title"),
            reverse: false,
        }
    }
}

impl Collection {
    /// Constructs a collection from its configuration. Fails if the
    /// configured content type rejects the parser options.
    pub fn new(config: CollectionConfig) -> Result<Collection> {
        let parser = config
            .page_content_type
            .parser(&config.parser_options)?;

        let mut includes = config.includes;
        includes.extend(config.excludes.iter().map(|x| format!("!{}", x)));

        Ok(Collection {
            span: tracing::info_span!("collection", title = %config.title),
            title: config.title,
            includes,
            template: config.template,
            content_path: config.content_path,
            template_vars: config.template_vars,
            recursive: config.recursive,
            index_name: config.index_name,
            index_template: config.index_template,
            index_sort_key: config.index_sort_key,
            index_reverse: config.index_reverse,
            index_template_vars: config.index_template_vars,
            index_page_content_type: config.index_page_content_type,
            parser,
            page_content_type: Some(config.page_content_type),
            scanner: Box::new(GlobScanner),
            explicit: PageSet::from(Vec::new()),
            cache: Mutex::new(None),
        })
    }

    /// Supplies the collection's pages directly. A non-empty list replaces
    /// discovery entirely.
    pub fn with_pages(
        mut self,
        pages: impl IntoIterator<Item = Arc<Page>>,
    ) -> Collection {
        self.explicit = pages.into_iter().collect();
        self
    }

    /// Replaces the parser built from the configured content type.
    pub fn with_parser(mut self, parser: Arc<dyn PageParser>) -> Collection {
        self.parser = parser;
        self.page_content_type = None;
        self
    }

    pub fn with_scanner(mut self, scanner: Box<dyn Scanner>) -> Collection {
        self.scanner = scanner;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// The include patterns, with excludes appended as `!pattern`.
    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn template(&self) -> Option<&Path> {
        self.template.as_deref()
    }

    pub fn content_path(&self) -> Option<&Path> {
        self.content_path.as_deref()
    }

    pub fn template_vars(&self) -> &Attributes {
        &self.template_vars
    }

    pub fn recursive(&self) -> bool {
        self.recursive
    }

    pub fn parser(&self) -> &dyn PageParser {
        self.parser.as_ref()
    }

    /// The configured page content type, unless a custom parser replaced
    /// it.
    pub fn page_content_type(&self) -> Option<ContentType> {
        self.page_content_type
    }

    /// Returns the collection's pages, discovering them first if they
    /// haven't been yet. A failed discovery caches nothing, so the next call
    /// scans again.
    pub fn pages(&self) -> Result<PageSet> {
        if !self.explicit.is_empty() {
            return Ok(self.explicit.clone());
        }
        let content_path = match &self.content_path {
            Some(content_path) => content_path,
            None => return Ok(PageSet::from(Vec::new())),
        };

        // Held across discovery so concurrent callers scan only once. The
        // cache is only ever written whole, so a poisoned lock is still
        // consistent.
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pages) = cache.as_ref() {
            tracing::trace!(parent: &self.span, "page cache hit");
            return Ok(pages.clone());
        }

        let _entered = self.span.enter();
        let pages = self.discover(content_path)?;
        *cache = Some(pages.clone());
        Ok(pages)
    }

    fn discover(&self, content_path: &Path) -> Result<PageSet> {
        tracing::debug!(
            content_path = %content_path.display(),
            includes = ?self.includes,
            recursive = self.recursive,
            "discovering pages"
        );
        let paths = self
            .scanner
            .scan(content_path, &self.includes, self.recursive)?;

        let mut seen = HashSet::with_capacity(paths.len());
        let mut pages = Vec::with_capacity(paths.len());
        for path in paths {
            let key = path.canonicalize().unwrap_or_else(|_| path.clone());
            if !seen.insert(key) {
                tracing::debug!(path = %path.display(), "skipping duplicate");
                continue;
            }
            tracing::debug!(path = %path.display(), "building page");
            let mut page =
                Page::from_content_path(path, self.template.clone(), self.parser.as_ref())?;
            page.set_content_type(self.page_content_type);
            pages.push(Arc::new(page));
        }

        tracing::info!(pages = pages.len(), "discovered pages");
        Ok(pages.into())
    }

    /// Drops the cached page set; the next access scans again.
    pub fn reset(&self) {
        *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.pages()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.pages()?.is_empty())
    }

    /// Iterates over the collection's pages, discovering them first if
    /// needed.
    pub fn iter(&self) -> Result<PageIter> {
        Ok(PageIter {
            pages: self.pages()?,
            next: 0,
        })
    }

    /// Builds an index page listing `pages` ordered by the
    /// `options.sort_key` attribute. The sort is stable in both directions,
    /// so pages with equal keys keep their input order. The slug defaults to
    /// the lowercased title with spaces replaced by hyphens.
    pub fn generate_index(
        title: &str,
        pages: impl IntoIterator<Item = Arc<Page>>,
        options: IndexOptions,
    ) -> Page {
        let slug = options
            .slug
            .filter(|slug| !slug.is_empty())
            .unwrap_or_else(|| title.to_lowercase().replace(' ', "-"));

        let mut pages: Vec<Arc<Page>> = pages.into_iter().collect();
        let key = options.sort_key.as_str();
        pages.sort_by(|a, b| {
            let ordering = compare_values(a.get(key), b.get(key));
            match options.reverse {
                true => ordering.reverse(),
                false => ordering,
            }
        });

        let mut index = Page::new()
            .with_attr("slug", slug)
            .with_attr("title", title)
            .with_pages(pages);
        index.set_template(options.template);
        index
    }

    /// Builds this collection's own index from its `index_*` configuration.
    /// The index page has the `index_page_content_type`, and the index
    /// template vars are added as attributes unless they would shadow `slug`
    /// or `title`.
    pub fn index(&self) -> Result<Page> {
        let pages = self.pages()?;
        let _entered = self.span.enter();
        tracing::debug!(
            name = %self.index_name,
            sort_key = %self.index_sort_key,
            reverse = self.index_reverse,
            "generating index"
        );

        let mut index = Self::generate_index(
            &self.index_name,
            pages.iter().cloned(),
            IndexOptions {
                slug: None,
                template: self.index_template.clone(),
                sort_key: self.index_sort_key.clone(),
                reverse: self.index_reverse,
            },
        );
        index.set_content_type(Some(self.index_page_content_type));
        for (key, value) in &self.index_template_vars {
            if index.get(key).is_none() {
                index.set_attr(key.clone(), value.clone());
            }
        }
        Ok(index)
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Collection")
            .field("title", &self.title)
            .field("includes", &self.includes)
            .field("content_path", &self.content_path)
            .field("recursive", &self.recursive)
            .field("parser", &self.parser)
            .finish()
    }
}

/// Iterates over a snapshot of a [`Collection`]'s pages.
pub struct PageIter {
    pages: PageSet,
    next: usize,
}

impl Iterator for PageIter {
    type Item = Arc<Page>;

    fn next(&mut self) -> Option<Arc<Page>> {
        let page = self.pages.get(self.next)?.clone();
        self.next += 1;
        Some(page)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.pages.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PageIter {}

/// Orders attribute values for index sorting. Missing values come first,
/// then null, booleans, numbers and strings; anything else is compared by
/// its YAML rendering. NaN sorts after every other number.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            _ => 4,
        }
    }

    let (a, b) = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Less,
        (Some(_), None) => return Ordering::Greater,
        (Some(a), Some(b)) => (a, b),
    };
    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => match (a.is_nan(), b.is_nan()) {
                (false, false) => a.total_cmp(&b),
                (a_nan, b_nan) => a_nan.cmp(&b_nan),
            },
            _ => Ordering::Equal,
        },
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ if rank(a) != rank(b) => rank(a).cmp(&rank(b)),
        _ => serde_yaml::to_string(a)
            .ok()
            .cmp(&serde_yaml::to_string(b).ok()),
    }
}

/// Represents the result of a discovery operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error discovering a [`Collection`]'s pages.
#[derive(Debug)]
pub enum Error {
    /// Returned when a discovered file can't be turned into a [`Page`], or
    /// the parser can't be configured.
    Parse(parser::Error),

    /// Returned when the collection's configuration can't be used, e.g. the
    /// content path isn't a directory.
    Configuration(String),

    /// Returned when an include or exclude pattern isn't a valid glob.
    Pattern {
        pattern: String,
        err: glob::PatternError,
    },

    /// Returned for I/O errors while scanning the content directory.
    Scan { path: PathBuf, err: std::io::Error },
}

impl Error {
    /// Whether a content source or the content directory couldn't be read.
    pub fn is_read_error(&self) -> bool {
        match self {
            Error::Parse(err) => err.is_read_error(),
            Error::Scan { .. } => true,
            _ => false,
        }
    }

    /// Whether a content source was read but couldn't be parsed.
    pub fn is_parse_error(&self) -> bool {
        match self {
            Error::Parse(err) => err.is_parse_error(),
            _ => false,
        }
    }

    /// Whether the collection or its parser was misconfigured.
    pub fn is_configuration_error(&self) -> bool {
        match self {
            Error::Parse(err) => err.is_configuration_error(),
            Error::Configuration(_) | Error::Pattern { .. } => true,
            Error::Scan { .. } => false,
        }
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(err) => err.fmt(f),
            Error::Configuration(msg) => write!(f, "configuration: {}", msg),
            Error::Pattern { pattern, err } => {
                write!(f, "invalid pattern `{}`: {}", pattern, err)
            }
            Error::Scan { path, err } => {
                write!(f, "scanning `{}`: {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(err) => Some(err),
            Error::Configuration(_) => None,
            Error::Pattern { pattern: _, err } => Some(err),
            Error::Scan { path: _, err } => Some(err),
        }
    }
}

impl From<parser::Error> for Error {
    /// Converts a [`parser::Error`] into an [`Error`]. It allows us to use the
    /// `?` operator when constructing pages.
    fn from(err: parser::Error) -> Error {
        Error::Parse(err)
    }
}
