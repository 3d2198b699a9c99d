//! Structural processing for `AsciiDoc` documents.
//!
//! - [`PathResolver`] resolves system and web paths, optionally jailed to a root
//!   directory.
//! - [`substitution`] applies ordered substitution sets (quotes, attributes,
//!   replacements, macros, ...) to block text.
//! - [`Document::reindex_sections`] assigns indices, numbers and captions to
//!   sections as the document tree is walked.

mod attributes;
mod counter;
mod doctype;
mod error;
mod model;
mod numbering;
mod options;
mod path_resolver;
mod safe_mode;
pub mod substitution;

#[cfg(test)]
mod proptests;

pub use attributes::{
    AttributeLookup, AttributeName, AttributeValue, DocumentAttributes, default_attributes,
};
pub use counter::{CounterValue, Counters};
pub use doctype::Doctype;
pub use error::Error;
pub use model::{
    Block, BlockNode, Document, DocumentContext, DocumentScope, NumberingRule, Section,
    SectionLevel, generate_id,
};
pub use options::{Options, OptionsBuilder};
pub use path_resolver::{
    PartitionedPath, PathResolver, PathRoot, ResolveOptions, descends_from, normalize,
};
pub use safe_mode::SafeMode;
