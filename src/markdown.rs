//! The Markdown [`PageParser`]. Markdown extensions are opted into per
//! collection through the `markdown_extras` parser option, e.g.:
//!
//! ```yaml
//! parser_options:
//!   markdown_extras: [footnotes, tables, strike]
//! ```
//!
//! A page can add its own extras in its front matter:
//!
//! ```yaml
//! parser_extras:
//!   markdown_extras: [task_list]
//! ```

use crate::parser::{Attributes, Error, Options, PageParser, ParserOptions, Result};
use pulldown_cmark::{html, Options as MarkdownOptions, Parser};
use serde_yaml::Value;

/// Renders CommonMark to HTML.
#[derive(Clone, Debug)]
pub struct MarkdownParser {
    options: MarkdownOptions,
}

impl MarkdownParser {
    const CONFIGURATION_VALUES: &'static [&'static str] = &["markdown_extras"];

    /// Constructs a new parser from caller-supplied `options`. Unknown
    /// options or extras are rejected.
    pub fn new(options: &Options) -> Result<MarkdownParser> {
        let options = ParserOptions::new(Self::CONFIGURATION_VALUES, options)?;
        Ok(MarkdownParser {
            options: extensions(options.get("markdown_extras"))?,
        })
    }

    fn render(&self, content: &str, options: MarkdownOptions) -> String {
        let mut markup = String::with_capacity(content.len() * 3 / 2);
        html::push_html(&mut markup, Parser::new_ext(content, options));
        markup
    }
}

impl Default for MarkdownParser {
    fn default() -> Self {
        MarkdownParser {
            options: MarkdownOptions::empty(),
        }
    }
}

/// Collects the pulldown-cmark options for a `markdown_extras` list.
fn extensions(extras: Option<&Value>) -> Result<MarkdownOptions> {
    let mut options = MarkdownOptions::empty();
    match extras {
        None | Some(Value::Null) => {}
        Some(Value::Sequence(extras)) => {
            for extra in extras {
                options.insert(extension(extra)?);
            }
        }
        Some(other) => {
            return Err(Error::Configuration(format!(
                "`markdown_extras` must be a list of names, got {:?}",
                other
            )))
        }
    }
    Ok(options)
}

/// Maps a `markdown_extras` name onto the matching pulldown-cmark option.
fn extension(extra: &Value) -> Result<MarkdownOptions> {
    Ok(match extra.as_str() {
        Some("footnotes") => MarkdownOptions::ENABLE_FOOTNOTES,
        Some("tables") => MarkdownOptions::ENABLE_TABLES,
        Some("strike") => MarkdownOptions::ENABLE_STRIKETHROUGH,
        Some("task_list") => MarkdownOptions::ENABLE_TASKLISTS,
        Some("smarty-pants") => MarkdownOptions::ENABLE_SMART_PUNCTUATION,
        Some("header-ids") => MarkdownOptions::ENABLE_HEADING_ATTRIBUTES,
        Some("definition-lists") => MarkdownOptions::ENABLE_DEFINITION_LIST,
        _ => {
            return Err(Error::Configuration(format!(
                "unknown markdown extra {:?}",
                extra
            )))
        }
    })
}

impl PageParser for MarkdownParser {
    fn configuration_values(&self) -> &'static [&'static str] {
        Self::CONFIGURATION_VALUES
    }

    fn parse(&self, content: &str) -> Result<String> {
        Ok(self.render(content, self.options))
    }

    /// Adds the page's `parser_extras.markdown_extras` on top of the
    /// collection's extras.
    fn parse_with(&self, content: &str, attrs: &Attributes) -> Result<String> {
        let page_extras = attrs
            .get("parser_extras")
            .and_then(|extras| extras.get("markdown_extras"));
        Ok(self.render(content, self.options | extensions(page_extras)?))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn extras(names: &[&str]) -> Options {
        let mut options = Options::new();
        options.insert(
            "markdown_extras".to_owned(),
            Value::Sequence(names.iter().map(|n| Value::from(*n)).collect()),
        );
        options
    }

    #[test]
    fn test_parse() -> Result<()> {
        assert_eq!(
            "<h1>Hello</h1>\n<p>World</p>\n",
            MarkdownParser::default().parse("# Hello\n\nWorld\n")?
        );
        Ok(())
    }

    #[test]
    fn test_strike_requires_extra() -> Result<()> {
        let plain = MarkdownParser::new(&Options::new())?.parse("~~gone~~")?;
        assert!(!plain.contains("<del>"));

        let strike = MarkdownParser::new(&extras(&["strike"]))?.parse("~~gone~~")?;
        assert_eq!("<p><del>gone</del></p>\n", strike);
        Ok(())
    }

    #[test]
    fn test_tables_extra() -> Result<()> {
        let markup = MarkdownParser::new(&extras(&["tables", "footnotes"]))?
            .parse("| a | b |\n|---|---|\n| 1 | 2 |\n")?;
        assert!(markup.contains("<table>"));
        Ok(())
    }

    #[test]
    fn test_unknown_extra() {
        let err = MarkdownParser::new(&extras(&["fenced-code-blocks", "nope"])).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_extras_not_a_list() {
        let mut options = Options::new();
        options.insert("markdown_extras".to_owned(), Value::from("tables"));
        assert!(MarkdownParser::new(&options)
            .unwrap_err()
            .is_configuration_error());
    }

    #[test]
    fn test_page_extras() -> Result<()> {
        let mut attrs = Attributes::new();
        attrs.insert(
            "parser_extras".to_owned(),
            serde_yaml::from_str("markdown_extras: [strike]").unwrap(),
        );
        let parser = MarkdownParser::new(&extras(&["tables"]))?;
        assert_eq!("<p><del>gone</del></p>\n", parser.parse_with("~~gone~~", &attrs)?);
        assert_eq!("<p>~~gone~~</p>\n", parser.parse_with("~~gone~~", &Attributes::new())?);
        Ok(())
    }

    #[test]
    fn test_unknown_page_extra() {
        let mut attrs = Attributes::new();
        attrs.insert(
            "parser_extras".to_owned(),
            serde_yaml::from_str("markdown_extras: [nope]").unwrap(),
        );
        let err = MarkdownParser::default().parse_with("text", &attrs).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_page_extras_from_content_path() -> Result<()> {
        let markup = MarkdownParser::default()
            .markup_from_content_path(Path::new("./testdata/content/struck.md"))?;
        assert_eq!("<p><del>gone</del></p>\n", markup);
        Ok(())
    }

    #[test]
    fn test_markup_from_content_path() -> Result<()> {
        let markup = MarkdownParser::default()
            .markup_from_content_path(Path::new("./testdata/content/hello.md"))?;
        assert_eq!("<h1>Hello</h1>\n<p>Today is the first day.</p>\n", markup);
        Ok(())
    }
}
