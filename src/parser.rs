//! Defines the [`PageParser`] capability, the [`ContentType`] registry of
//! built-in parsers, and the [`Error`] type for reading and parsing content
//! sources. A content source is a front matter block followed by a body:
//!
//! ```md
//! ---
//! title: Hello, world!
//! date: 2021-04-16
//! ---
//! # Hello
//!
//! World
//! ```
//!
//! The front matter becomes the page's [`Attributes`] and the body is handed
//! to [`PageParser::parse`] to produce the page's markup.

use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Deserialize;
use serde_yaml::Value;

use crate::markdown::MarkdownParser;

/// Metadata attributes extracted from a content source's front matter.
pub type Attributes = BTreeMap<String, Value>;

/// Caller-supplied parser options, keyed by option name.
pub type Options = BTreeMap<String, Value>;

/// Converts a content source into [`Attributes`] and rendered markup. Only
/// [`PageParser::parse`] is format-specific; reading the source and splitting
/// off its front matter is shared by every format.
pub trait PageParser: fmt::Debug + Send + Sync {
    /// The names of the options this parser consumes, in declaration order.
    fn configuration_values(&self) -> &'static [&'static str];

    /// Reads `content_path` and returns the attributes from its front matter.
    fn attrs_from_content_path(&self, content_path: &Path) -> Result<Attributes> {
        let input = read_content(content_path)?;
        let (frontmatter, _) =
            split_frontmatter(&input).map_err(|e| e.annotate(content_path))?;
        parse_frontmatter(frontmatter).map_err(|e| e.annotate(content_path))
    }

    /// Reads `content_path` and returns its body rendered by
    /// [`PageParser::parse_with`], so the page's own front matter can
    /// adjust the rendering.
    fn markup_from_content_path(&self, content_path: &Path) -> Result<String> {
        let input = read_content(content_path)?;
        let (frontmatter, body) =
            split_frontmatter(&input).map_err(|e| e.annotate(content_path))?;
        let attrs = parse_frontmatter(frontmatter).map_err(|e| e.annotate(content_path))?;
        self.parse_with(body, &attrs).map_err(|e| e.annotate(content_path))
    }

    /// Converts raw content into the finalized markup.
    fn parse(&self, content: &str) -> Result<String>;

    /// Like [`PageParser::parse`], but for a page with `attrs`. Parsers
    /// with per-page options read them from the `parser_extras` attribute.
    fn parse_with(&self, content: &str, _attrs: &Attributes) -> Result<String> {
        self.parse(content)
    }
}

/// The resolved options of a parser. Every declared option is present,
/// either with the supplied value or absent.
#[derive(Clone, Debug, Default)]
pub struct ParserOptions {
    values: Vec<(&'static str, Option<Value>)>,
}

impl ParserOptions {
    /// Resolves `supplied` against the `declared` option names. Supplying an
    /// option the parser does not declare is a configuration error.
    pub fn new(
        declared: &'static [&'static str],
        supplied: &Options,
    ) -> Result<ParserOptions> {
        if let Some(unknown) = supplied
            .keys()
            .find(|name| !declared.contains(&name.as_str()))
        {
            return Err(Error::Configuration(format!(
                "unknown parser option `{}` (expected one of {:?})",
                unknown, declared
            )));
        }

        Ok(ParserOptions {
            values: declared
                .iter()
                .map(|name| (*name, supplied.get(*name).cloned()))
                .collect(),
        })
    }

    /// Returns the value of the option `name`, if it was supplied.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, v)| v.as_ref())
    }

    /// Iterates over the declared option names.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.iter().map(|(name, _)| *name)
    }
}

/// Passes the body through untouched. Used for content that is already
/// HTML.
#[derive(Clone, Debug, Default)]
pub struct HtmlParser;

impl HtmlParser {
    pub fn new(options: &Options) -> Result<HtmlParser> {
        ParserOptions::new(&[], options)?;
        Ok(HtmlParser)
    }
}

impl PageParser for HtmlParser {
    fn configuration_values(&self) -> &'static [&'static str] {
        &[]
    }

    fn parse(&self, content: &str) -> Result<String> {
        Ok(content.to_owned())
    }
}

/// The built-in page content types. A collection is configured with one of
/// these, which selects the parser used for every page it discovers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Markdown,
    Html,
}

impl Default for ContentType {
    fn default() -> Self {
        ContentType::Markdown
    }
}

impl ContentType {
    /// Constructs the parser for this content type from the caller-supplied
    /// `options`.
    pub fn parser(self, options: &Options) -> Result<Arc<dyn PageParser>> {
        Ok(match self {
            ContentType::Markdown => Arc::new(MarkdownParser::new(options)?),
            ContentType::Html => Arc::new(HtmlParser::new(options)?),
        })
    }
}

/// Reads a content source into memory.
pub fn read_content(content_path: &Path) -> Result<String> {
    fs::read_to_string(content_path).map_err(|err| Error::ContentRead {
        path: content_path.to_owned(),
        err,
    })
}

/// Splits `input` into its front matter and body. The front matter is
/// delimited by `---` lines; input that does not open with a fence has no
/// front matter and is all body.
pub fn split_frontmatter(input: &str) -> Result<(&str, &str)> {
    const FENCE: &str = "---";

    let first_line_end = input.find('\n').unwrap_or(input.len());
    if input[..first_line_end].trim_end() != FENCE {
        return Ok(("", input));
    }

    let yaml_start = (first_line_end + 1).min(input.len());
    let mut offset = yaml_start;
    for line in input[yaml_start..].split_inclusive('\n') {
        if line.trim_end() == FENCE {
            return Ok((&input[yaml_start..offset], &input[offset + line.len()..]));
        }
        offset += line.len();
    }
    Err(Error::FrontmatterMissingEndFence)
}

/// Deserializes a front matter block into [`Attributes`]. An empty block
/// yields no attributes.
pub fn parse_frontmatter(frontmatter: &str) -> Result<Attributes> {
    if frontmatter.trim().is_empty() {
        return Ok(Attributes::new());
    }

    match serde_yaml::from_str::<Value>(frontmatter)? {
        Value::Null => Ok(Attributes::new()),
        Value::Mapping(mapping) => mapping
            .into_iter()
            .map(|(key, value)| match key {
                Value::String(key) => Ok((key, value)),
                _ => Err(Error::FrontmatterNotMapping),
            })
            .collect(),
        _ => Err(Error::FrontmatterNotMapping),
    }
}

/// Represents the result of reading or parsing a content source.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error reading or parsing a content source, or configuring a
/// parser.
#[derive(Debug)]
pub enum Error {
    /// Returned when a content source can't be opened or read, including
    /// when it isn't valid UTF-8.
    ContentRead { path: PathBuf, err: std::io::Error },

    /// Returned when a content source opens a front matter fence (`---`) but
    /// never closes it.
    FrontmatterMissingEndFence,

    /// Returned when the front matter is valid YAML but not a mapping with
    /// string keys.
    FrontmatterNotMapping,

    /// Returned when the front matter isn't valid YAML.
    DeserializeYaml(serde_yaml::Error),

    /// Returned when a parser is given options it can't use.
    Configuration(String),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl Error {
    fn annotate(self, content_path: &Path) -> Error {
        Error::Annotated(
            format!("parsing `{}`", content_path.display()),
            Box::new(self),
        )
    }

    /// Whether the content source couldn't be read.
    pub fn is_read_error(&self) -> bool {
        match self {
            Error::ContentRead { .. } => true,
            Error::Annotated(_, err) => err.is_read_error(),
            _ => false,
        }
    }

    /// Whether the content source was read but couldn't be parsed.
    pub fn is_parse_error(&self) -> bool {
        match self {
            Error::FrontmatterMissingEndFence
            | Error::FrontmatterNotMapping
            | Error::DeserializeYaml(_) => true,
            Error::Annotated(_, err) => err.is_parse_error(),
            _ => false,
        }
    }

    /// Whether the parser was misconfigured.
    pub fn is_configuration_error(&self) -> bool {
        match self {
            Error::Configuration(_) => true,
            Error::Annotated(_, err) => err.is_configuration_error(),
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ContentRead { path, err } => {
                write!(f, "reading `{}`: {}", path.display(), err)
            }
            Error::FrontmatterMissingEndFence => {
                write!(f, "missing closing `---`")
            }
            Error::FrontmatterNotMapping => {
                write!(f, "front matter must be a mapping with string keys")
            }
            Error::DeserializeYaml(err) => err.fmt(f),
            Error::Configuration(msg) => write!(f, "configuration: {}", msg),
            Error::Annotated(annotation, err) => {
                write!(f, "{}: {}", &annotation, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ContentRead { path: _, err } => Some(err),
            Error::FrontmatterMissingEndFence => None,
            Error::FrontmatterNotMapping => None,
            Error::DeserializeYaml(err) => Some(err),
            Error::Configuration(_) => None,
            Error::Annotated(_, err) => Some(err),
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

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_frontmatter() -> Result<()> {
        let (frontmatter, body) =
            split_frontmatter("---\ntitle: Hello\n---\n# Hello\n---\nmore")?;
        assert_eq!("title: Hello\n", frontmatter);
        assert_eq!("# Hello\n---\nmore", body);
        Ok(())
    }

    #[test]
    fn test_split_frontmatter_crlf() -> Result<()> {
        let (frontmatter, body) =
            split_frontmatter("---\r\ntitle: Hello\r\n---\r\nbody")?;
        assert_eq!("title: Hello\r\n", frontmatter);
        assert_eq!("body", body);
        Ok(())
    }

    #[test]
    fn test_split_frontmatter_without_fence() -> Result<()> {
        assert_eq!(("", "# Just a body\n"), split_frontmatter("# Just a body\n")?);
        Ok(())
    }

    #[test]
    fn test_split_frontmatter_missing_end_fence() {
        let err = split_frontmatter("---\ntitle: Hello\n# body").unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_parse_frontmatter() -> Result<()> {
        let attrs = parse_frontmatter("title: Hello\ntags: [a, b]\n")?;
        assert_eq!(Some(&Value::from("Hello")), attrs.get("title"));
        assert_eq!(2, attrs["tags"].as_sequence().map_or(0, |s| s.len()));
        assert!(parse_frontmatter("  \n")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_parse_frontmatter_not_mapping() {
        assert!(parse_frontmatter("- a\n- b\n").unwrap_err().is_parse_error());
        assert!(parse_frontmatter("1: one\n").unwrap_err().is_parse_error());
        assert!(parse_frontmatter("title: [unclosed\n")
            .unwrap_err()
            .is_parse_error());
    }

    #[test]
    fn test_parser_options() -> Result<()> {
        let mut supplied = Options::new();
        supplied.insert("markdown_extras".to_owned(), Value::from(vec!["tables"]));
        let options = ParserOptions::new(&["markdown_extras", "other"], &supplied)?;
        assert_eq!(vec!["markdown_extras", "other"], options.names().collect::<Vec<_>>());
        assert!(options.get("markdown_extras").is_some());
        assert!(options.get("other").is_none());
        Ok(())
    }

    #[test]
    fn test_parser_options_unknown() {
        let mut supplied = Options::new();
        supplied.insert("bogus".to_owned(), Value::Bool(true));
        let err = ParserOptions::new(&["markdown_extras"], &supplied).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(HtmlParser::new(&supplied).is_err());
    }

    #[test]
    fn test_html_parser_from_content_path() -> Result<()> {
        let path = Path::new("./testdata/content/about.html");
        let parser = HtmlParser;
        let attrs = parser.attrs_from_content_path(path)?;
        assert_eq!(Some(&Value::from("About")), attrs.get("title"));
        assert_eq!(
            "<p>Static site, static life.</p>\n",
            parser.markup_from_content_path(path)?
        );
        Ok(())
    }

    #[test]
    fn test_missing_content_path() {
        let err = HtmlParser
            .attrs_from_content_path(Path::new("./testdata/content/missing.md"))
            .unwrap_err();
        assert!(err.is_read_error());
        assert!(err.to_string().contains("missing.md"));
    }

    #[test]
    fn test_annotated_parse_error() {
        let err = HtmlParser
            .attrs_from_content_path(Path::new("./testdata/broken/unclosed.md"))
            .unwrap_err();
        assert!(err.is_parse_error());
        assert!(err.to_string().starts_with("parsing `"));
    }

    #[test]
    fn test_content_type_parser() -> Result<()> {
        let parser = ContentType::Html.parser(&Options::new())?;
        assert_eq!("<b>hi</b>", parser.parse("<b>hi</b>")?);
        let parser = ContentType::default().parser(&Options::new())?;
        assert_eq!(&["markdown_extras"], parser.configuration_values());
        Ok(())
    }
}
