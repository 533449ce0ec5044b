//! The content layer of the `render-engine` static site generator: it turns
//! a directory of loosely structured content files into pages that a
//! templating engine can render. It breaks down into:
//!
//! 1. Parsing content sources into attributes and markup ([`crate::parser`],
//!    with the Markdown plugin in [`crate::markdown`])
//! 2. Modeling the result as [`Page`]s ([`crate::page`])
//! 3. Grouping pages into [`Collection`]s ([`crate::collection`])
//!
//! A collection is configured ([`crate::config`]) with a content directory
//! and include/exclude glob patterns. The first time its pages are asked
//! for, it scans the directory ([`crate::scan`]), builds one page per
//! matched file, and caches the result. Index pages listing a collection's
//! pages are generated on demand, sorted by any page attribute.
//!
//! Rendering templates and orchestrating builds are left to the caller.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod collection;
pub mod config;
pub mod markdown;
pub mod page;
pub mod parser;
pub mod scan;

pub use crate::collection::{Collection, IndexOptions, PageSet};
pub use crate::config::CollectionConfig;
pub use crate::page::Page;
pub use crate::parser::{ContentType, PageParser};
