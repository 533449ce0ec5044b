//! Defines the [`Page`] type, a single renderable unit of content.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use serde_yaml::Value;

use crate::parser::{Attributes, ContentType, PageParser, Result};

/// A single content unit: metadata attributes, rendered markup, and the
/// template it should be rendered with. A page is either file-backed (built
/// by [`Page::from_content_path`], attributes come from the file's front
/// matter) or built in memory with its attributes supplied directly.
///
/// Index pages (see [`crate::collection::Collection::generate_index`]) also
/// carry the member pages they list.
#[derive(Clone, Debug, Default)]
pub struct Page {
    content_path: Option<PathBuf>,
    template: Option<PathBuf>,
    attrs: Attributes,
    content: String,
    content_type: Option<ContentType>,
    pages: Vec<Arc<Page>>,
}

impl Page {
    /// Constructs an empty in-memory page.
    pub fn new() -> Page {
        Page::default()
    }

    /// Constructs an in-memory page whose content is `raw` rendered by
    /// `parser`.
    pub fn from_content(raw: &str, parser: &dyn PageParser) -> Result<Page> {
        Ok(Page {
            content: parser.parse(raw)?,
            ..Page::default()
        })
    }

    /// Constructs a file-backed page. Attributes and markup are extracted
    /// from `content_path` by `parser` before this returns.
    pub fn from_content_path(
        content_path: impl Into<PathBuf>,
        template: Option<PathBuf>,
        parser: &dyn PageParser,
    ) -> Result<Page> {
        let content_path = content_path.into();
        let attrs = parser.attrs_from_content_path(&content_path)?;
        let content = parser.markup_from_content_path(&content_path)?;
        Ok(Page {
            content_path: Some(content_path),
            template,
            attrs,
            content,
            content_type: None,
            pages: Vec::new(),
        })
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Page {
        self.set_attr(key, value);
        self
    }

    pub fn with_template(mut self, template: impl Into<PathBuf>) -> Page {
        self.template = Some(template.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Page {
        self.content = content.into();
        self
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Page {
        self.content_type = Some(content_type);
        self
    }

    pub(crate) fn with_pages(mut self, pages: Vec<Arc<Page>>) -> Page {
        self.pages = pages;
        self
    }

    /// Sets (or replaces) an attribute.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attrs.insert(key.into(), value.into());
    }

    pub fn set_template(&mut self, template: Option<PathBuf>) {
        self.template = template;
    }

    pub fn set_content_type(&mut self, content_type: Option<ContentType>) {
        self.content_type = content_type;
    }

    /// The source file, for file-backed pages.
    pub fn content_path(&self) -> Option<&Path> {
        self.content_path.as_deref()
    }

    pub fn template(&self) -> Option<&Path> {
        self.template.as_deref()
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    /// Looks up an attribute by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    /// The rendered markup.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The kind of content the page was rendered from, when the collection
    /// that built it knows. Unset for pages rendered by a custom parser.
    pub fn content_type(&self) -> Option<ContentType> {
        self.content_type
    }

    /// The member pages of an index page; empty for other pages.
    pub fn pages(&self) -> &[Arc<Page>] {
        &self.pages
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title").and_then(Value::as_str)
    }

    /// The `slug` attribute or, for file-backed pages without one, the
    /// slugified file stem (`My Post.md` becomes `my-post`).
    pub fn slug(&self) -> Option<String> {
        if let Some(slug) = self.get("slug").and_then(Value::as_str) {
            return Some(slug.to_owned());
        }
        self.content_path
            .as_deref()
            .and_then(Path::file_stem)
            .and_then(|stem| stem.to_str())
            .map(slug::slugify)
    }

    /// The `date` attribute, accepted as `YYYY-MM-DD` or as an RFC 3339
    /// timestamp whose date part is used.
    pub fn date(&self) -> Option<NaiveDate> {
        let date = self.get("date").and_then(Value::as_str)?;
        NaiveDate::parse_from_str(date.get(..10).unwrap_or(date), "%Y-%m-%d").ok()
    }
}
