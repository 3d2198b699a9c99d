use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::{
    AttributeLookup, AttributeValue, CounterValue, Doctype,
    model::{Block, DocumentContext},
    numbering::Numbering,
};

/// A `SectionLevel` represents a section depth in a document.
pub type SectionLevel = u8;

/// Which counter a numbered section draws its number from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumberingRule {
    /// Document-wide `appendix-number` counter, alphabetic from `A`. Appendices always
    /// get a caption.
    Appendix,
    /// Document-wide `chapter-number` counter, numeric from `1`. Chapters keep counting
    /// across book parts.
    Chapter,
    /// The parent container's own counter.
    Local,
}

/// A `Section` represents a section in a document.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Section {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub level: SectionLevel,
    /// `appendix`, `preface`, `part`, `chapter`, `sect1`, ...
    pub sectname: String,
    pub special: bool,
    pub numbered: bool,
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<CounterValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sectnum: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
    #[serde(skip)]
    pub(crate) numbering: Numbering,
}

impl Section {
    #[must_use]
    pub fn new(title: impl Into<String>, level: SectionLevel) -> Self {
        Self {
            id: None,
            title: title.into(),
            level,
            sectname: format!("sect{level}"),
            special: false,
            numbered: false,
            index: 0,
            number: None,
            caption: None,
            sectnum: None,
            blocks: Vec::new(),
            numbering: Numbering::default(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_sectname(mut self, sectname: impl Into<String>) -> Self {
        self.sectname = sectname.into();
        self
    }

    #[must_use]
    pub fn with_special(mut self, special: bool) -> Self {
        self.special = special;
        self
    }

    #[must_use]
    pub fn with_numbered(mut self, numbered: bool) -> Self {
        self.numbered = numbered;
        self
    }

    #[must_use]
    pub fn with_blocks(mut self, blocks: Vec<Block>) -> Self {
        self.blocks = blocks;
        self
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Caption and title joined without a separator. The caption carries its own
    /// trailing punctuation (`"Appendix A: "`).
    #[must_use]
    pub fn captioned_title(&self) -> String {
        match &self.caption {
            Some(caption) => format!("{caption}{}", self.title),
            None => self.title.clone(),
        }
    }

    /// The title as it appears in a table of contents: appendices with their
    /// caption, other numbered sections prefixed with their section number.
    #[must_use]
    pub fn numbered_title(&self) -> String {
        if self.sectname == "appendix" {
            return self.captioned_title();
        }
        match &self.sectnum {
            Some(sectnum) => format!("{sectnum} {}", self.title),
            None => self.captioned_title(),
        }
    }

    #[must_use]
    pub fn numbering_rule(&self, doctype: Doctype) -> NumberingRule {
        if self.sectname == "appendix" {
            NumberingRule::Appendix
        } else if doctype == Doctype::Book && (self.level == 1 || (self.level == 0 && self.special))
        {
            NumberingRule::Chapter
        } else {
            NumberingRule::Local
        }
    }

    /// Child sections of this section, in document order.
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Section(section) => Some(section),
            Block::Node(_) => None,
        })
    }

    /// Re-walk this section's subtree, assigning index, number and caption to every
    /// descendant section.
    ///
    /// Walking again without changing the tree yields the same assignments: the
    /// document-wide counters consumed by the walk are rewound first.
    pub fn reindex_sections<D: DocumentContext + ?Sized>(&mut self, document: &mut D) {
        let sectnum = self.sectnum.clone();
        self.numbering
            .reindex(&mut self.blocks, sectnum.as_deref(), document);
    }
}

/// Generate a section id from a title.
///
/// The title is lowercased; alphanumeric runs become words joined by `idseparator`
/// and prefixed with `idprefix`. Other characters are dropped. An id that is
/// already taken gets a numeric suffix (`_intro_2`). Returns `None` when `sectids`
/// is unset.
pub fn generate_id<A: AttributeLookup + ?Sized>(
    title: &str,
    attributes: &A,
    ids: &mut FxHashSet<String>,
) -> Option<String> {
    if matches!(attributes.attribute("sectids"), Some(AttributeValue::Bool(false))) {
        return None;
    }
    let prefix = attributes.attribute_str("idprefix").unwrap_or_default();
    let separator = attributes.attribute_str("idseparator").unwrap_or_default();

    // (id, boundary pending since the last word character)
    let (words, _) = title.to_lowercase().chars().fold(
        (String::with_capacity(title.len()), false),
        |(mut acc, pending), c| {
            if c.is_alphanumeric() {
                if pending && !acc.is_empty() {
                    acc.push_str(separator);
                }
                acc.push(c);
                (acc, false)
            } else if c.is_whitespace() || matches!(c, '-' | '.' | '_') {
                (acc, true)
            } else {
                (acc, pending)
            }
        },
    );
    let base = format!("{prefix}{words}");

    let mut id = base.clone();
    let suffix_separator = if separator.is_empty() { "_" } else { separator };
    let mut n = 2;
    while ids.contains(&id) {
        id = format!("{base}{suffix_separator}{n}");
        n += 1;
    }
    ids.insert(id.clone());
    Some(id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{DocumentAttributes, default_attributes};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("Section One", "_section_one")]
    #[case("What's new?", "_whats_new")]
    #[case("  Spaces  -  and.dots  ", "_spaces_and_dots")]
    #[case("Übersicht", "_übersicht")]
    #[case("Trailing!!", "_trailing")]
    fn test_generate_id(#[case] title: &str, #[case] expected: &str) {
        let mut ids = FxHashSet::default();
        assert_eq!(
            generate_id(title, &default_attributes(), &mut ids).as_deref(),
            Some(expected)
        );
    }

    #[test]
    fn test_generate_id_deduplicates() {
        let attrs = default_attributes();
        let mut ids = FxHashSet::default();
        assert_eq!(generate_id("Intro", &attrs, &mut ids).unwrap(), "_intro");
        assert_eq!(generate_id("Intro", &attrs, &mut ids).unwrap(), "_intro_2");
        assert_eq!(generate_id("intro", &attrs, &mut ids).unwrap(), "_intro_3");
    }

    #[test]
    fn test_generate_id_respects_prefix_and_separator() {
        let mut attrs = DocumentAttributes::default();
        attrs.set("idprefix".to_string(), "".into());
        attrs.set("idseparator".to_string(), "-".into());
        let mut ids = FxHashSet::default();
        assert_eq!(
            generate_id("Getting Started", &attrs, &mut ids).unwrap(),
            "getting-started"
        );

        attrs.set("sectids".to_string(), false.into());
        assert_eq!(generate_id("Getting Started", &attrs, &mut ids), None);
    }

    #[rstest]
    #[case("appendix", 1, false, Doctype::Book, NumberingRule::Appendix)]
    #[case("appendix", 2, false, Doctype::Article, NumberingRule::Appendix)]
    #[case("chapter", 1, false, Doctype::Book, NumberingRule::Chapter)]
    #[case("part", 0, true, Doctype::Book, NumberingRule::Chapter)]
    #[case("sect2", 2, false, Doctype::Book, NumberingRule::Local)]
    #[case("sect1", 1, false, Doctype::Article, NumberingRule::Local)]
    fn test_numbering_rule(
        #[case] sectname: &str,
        #[case] level: SectionLevel,
        #[case] special: bool,
        #[case] doctype: Doctype,
        #[case] expected: NumberingRule,
    ) {
        let section = Section::new("Title", level)
            .with_sectname(sectname)
            .with_special(special);
        assert_eq!(section.numbering_rule(doctype), expected);
    }

    #[test]
    fn test_titles() {
        let mut section = Section::new("Reference", 1).with_sectname("appendix");
        assert_eq!(section.captioned_title(), "Reference");
        section.caption = Some("Appendix A: ".to_string());
        section.sectnum = Some("A.".to_string());
        assert_eq!(section.captioned_title(), "Appendix A: Reference");
        assert_eq!(section.numbered_title(), "Appendix A: Reference");

        let mut section = Section::new("Usage", 2);
        section.sectnum = Some("1.2.".to_string());
        assert_eq!(section.numbered_title(), "1.2. Usage");
    }
}
