//! The document tree that section numbering and captioning walk.
use serde::Serialize;

use crate::{AttributeLookup, CounterValue, Counters, Doctype, PathResolver};

mod block;
mod document;
mod section;

pub use block::BlockNode;
pub use document::{Document, DocumentScope};
pub use section::{NumberingRule, Section, SectionLevel, generate_id};

/// Per-document state that substitutions and numbering read and advance.
///
/// Everything behind this trait belongs to a single document: two documents processed
/// in parallel each own their counters and resolver.
pub trait DocumentContext: AttributeLookup {
    fn doctype(&self) -> Doctype;

    fn counters(&self) -> &Counters;

    fn counters_mut(&mut self) -> &mut Counters;

    fn path_resolver(&self) -> &PathResolver;

    /// Advance the named document counter and return its new value.
    ///
    /// An attribute with the same name presets the counter: the first value drawn is
    /// the attribute's successor.
    fn counter(&mut self, name: &str, seed: &str) -> CounterValue {
        let preset = self.attribute_str(name).map(ToString::to_string);
        self.counters_mut().next(name, seed, preset.as_deref())
    }
}

/// A `Block` is a child of a document or section.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section(Section),
    Node(BlockNode),
}
