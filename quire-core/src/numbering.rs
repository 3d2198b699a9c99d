//! Section index and number assignment.
//!
//! Every container (the document or a section) counts its direct child sections.
//! Book chapters and appendices draw from document-wide counters instead, so the
//! container remembers where those counters stood before its first walk and rewinds
//! them on every later walk.

use crate::{
    CounterValue,
    model::{Block, DocumentContext, NumberingRule, Section},
};

const APPENDIX_COUNTER: &str = "appendix-number";
const CHAPTER_COUNTER: &str = "chapter-number";
const DOCUMENT_COUNTERS: [&str; 2] = [APPENDIX_COUNTER, CHAPTER_COUNTER];

type CounterMarks = Vec<(&'static str, Option<CounterValue>)>;

/// Per-container numbering state.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Numbering {
    next_section_index: usize,
    next_section_number: u32,
    counter_marks: Option<CounterMarks>,
}

impl Default for Numbering {
    fn default() -> Self {
        Self {
            next_section_index: 0,
            next_section_number: 1,
            counter_marks: None,
        }
    }
}

impl Numbering {
    /// Walk `blocks` as the children of this container.
    pub(crate) fn reindex<D: DocumentContext + ?Sized>(
        &mut self,
        blocks: &mut [Block],
        parent_sectnum: Option<&str>,
        document: &mut D,
    ) {
        match &self.counter_marks {
            Some(marks) => {
                for (name, value) in marks {
                    document.counters_mut().restore(name, value.clone());
                }
            }
            None => self.capture(document),
        }
        self.walk(blocks, parent_sectnum, document);
    }

    fn capture<D: DocumentContext + ?Sized>(&mut self, document: &D) {
        self.counter_marks = Some(
            DOCUMENT_COUNTERS
                .iter()
                .map(|name| (*name, document.counters().current(name).cloned()))
                .collect(),
        );
    }

    fn walk<D: DocumentContext + ?Sized>(
        &mut self,
        blocks: &mut [Block],
        parent_sectnum: Option<&str>,
        document: &mut D,
    ) {
        self.next_section_index = 0;
        self.next_section_number = 1;
        for block in blocks {
            let Block::Section(section) = block else {
                continue;
            };
            self.assign_index(section, parent_sectnum, document);
            let sectnum = section.sectnum.clone();
            section.numbering.capture(document);
            section
                .numbering
                .walk(&mut section.blocks, sectnum.as_deref(), document);
        }
    }

    /// Assign index, number, caption and section number to one child section.
    fn assign_index<D: DocumentContext + ?Sized>(
        &mut self,
        section: &mut Section,
        parent_sectnum: Option<&str>,
        document: &mut D,
    ) {
        section.index = self.next_section_index;
        self.next_section_index += 1;

        section.number = match section.numbering_rule(document.doctype()) {
            NumberingRule::Appendix => {
                let value = document.counter(APPENDIX_COUNTER, "A");
                section.caption = Some(
                    match document
                        .attribute_str("appendix-caption")
                        .filter(|caption| !caption.is_empty())
                    {
                        Some(caption) => format!("{caption} {value}: "),
                        None => format!("{value}. "),
                    },
                );
                section.numbered.then_some(value)
            }
            NumberingRule::Chapter if section.numbered => {
                Some(document.counter(CHAPTER_COUNTER, "1"))
            }
            NumberingRule::Local if section.numbered => {
                let number = self.next_section_number;
                self.next_section_number += 1;
                Some(CounterValue::Numeric(number))
            }
            NumberingRule::Chapter | NumberingRule::Local => None,
        };

        section.sectnum = section.number.as_ref().map(|number| match parent_sectnum {
            Some(parent) if section.level > 1 => format!("{parent}{number}."),
            Some(_) | None => format!("{number}."),
        });
        tracing::trace!(
            title = %section.title,
            index = section.index,
            sectnum = ?section.sectnum,
            "assigned section index"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;
    use crate::{Doctype, Document, Options};
    use pretty_assertions::assert_eq;

    fn document(doctype: Doctype) -> Document {
        let options = Options::builder()
            .with_working_dir("/work")
            .with_doctype(doctype)
            .with_attribute("sectnums", true)
            .build();
        Document::new(&options).unwrap()
    }

    fn numbered(title: &str, level: u8) -> Section {
        Section::new(title, level).with_numbered(true)
    }

    fn summary(section: &Section) -> (usize, Option<CounterValue>, Option<String>) {
        (section.index, section.number.clone(), section.caption.clone())
    }

    #[test]
    fn test_local_numbers_are_per_container() {
        let mut doc = document(Doctype::Article);
        let mut first = numbered("First", 1);
        first.push(Block::Section(numbered("A", 2)));
        first.push(Block::Section(numbered("B", 2)));
        let mut second = numbered("Second", 1);
        second.push(Block::Section(numbered("C", 2)));
        doc.push(Block::Section(first));
        doc.push(Block::Section(Section::new("Unnumbered", 1)));
        doc.push(Block::Section(second));
        doc.reindex_sections();

        let top: Vec<&Section> = doc.sections().collect();
        assert_eq!(top[0].sectnum.as_deref(), Some("1."));
        assert_eq!(top[1].index, 1);
        assert_eq!(top[1].number, None);
        assert_eq!(top[2].index, 2);
        assert_eq!(top[2].sectnum.as_deref(), Some("2."));

        let nested: Vec<Option<&str>> = top[0]
            .sections()
            .chain(top[2].sections())
            .map(|section| section.sectnum.as_deref())
            .collect();
        assert_eq!(nested, [Some("1.1."), Some("1.2."), Some("2.1.")]);
        assert_eq!(doc.counters().current(CHAPTER_COUNTER), None);
    }

    #[test]
    fn test_level_two_never_consumes_chapter_counter() {
        let mut doc = document(Doctype::Book);
        let mut chapter = numbered("Chapter", 1);
        chapter.push(Block::Section(numbered("Section", 2)));
        doc.push(Block::Section(chapter));
        doc.reindex_sections();
        assert_eq!(
            doc.counters().current(CHAPTER_COUNTER),
            Some(&CounterValue::Numeric(1))
        );
    }

    #[test]
    fn test_numbered_part_draws_from_chapter_counter() {
        let mut doc = document(Doctype::Book);
        let mut part = numbered("Part", 0).with_special(true);
        part.push(Block::Section(numbered("Chapter", 1)));
        doc.push(Block::Section(part));
        doc.reindex_sections();
        let part = doc.sections().next().unwrap();
        assert_eq!(part.number, Some(CounterValue::Numeric(1)));
        assert_eq!(
            part.sections().next().unwrap().number,
            Some(CounterValue::Numeric(2))
        );
    }

    #[test]
    fn test_appendix_caption() {
        let mut doc = document(Doctype::Article);
        doc.push(Block::Section(numbered("Intro", 1)));
        doc.push(Block::Section(numbered("Extra", 1).with_sectname("appendix")));
        doc.push(Block::Section(Section::new("More", 1).with_sectname("appendix")));
        doc.reindex_sections();

        let top: Vec<&Section> = doc.sections().collect();
        assert_eq!(top[0].number, Some(CounterValue::Numeric(1)));
        assert_eq!(
            summary(top[1]),
            (
                1,
                Some(CounterValue::Alphabetic("A".to_string())),
                Some("Appendix A: ".to_string())
            )
        );
        // Unnumbered appendices still consume the counter and get a caption.
        assert_eq!(summary(top[2]), (2, None, Some("Appendix B: ".to_string())));
    }

    #[test]
    fn test_appendix_caption_without_label() {
        let mut doc = document(Doctype::Article);
        doc.set_attribute("appendix-caption", "");
        doc.push(Block::Section(numbered("Extra", 1).with_sectname("appendix")));
        doc.reindex_sections();
        assert_eq!(
            doc.sections().next().unwrap().caption.as_deref(),
            Some("A. ")
        );
    }

    #[test]
    fn test_reindexing_a_section_is_idempotent() {
        let mut doc = document(Doctype::Book);
        let mut chapter = numbered("Chapter", 1);
        chapter.push(Block::Section(numbered("One", 2)));
        chapter.push(Block::Section(numbered("Two", 2)));
        doc.push(Block::Section(chapter));
        doc.reindex_sections();

        let Some(Block::Section(mut chapter)) = doc.blocks_mut().pop() else {
            panic!("expected a section");
        };
        let before: Vec<_> = chapter.sections().map(summary).collect();
        chapter.reindex_sections(&mut doc);
        chapter.reindex_sections(&mut doc);
        let after: Vec<_> = chapter.sections().map(summary).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_reindex_after_insert_renumbers() {
        let mut doc = document(Doctype::Book);
        doc.push(Block::Section(numbered("One", 1)));
        doc.push(Block::Section(numbered("Two", 1)));
        doc.reindex_sections();
        doc.blocks_mut()
            .insert(0, Block::Section(numbered("Zero", 1)));
        doc.reindex_sections();
        let numbers: Vec<Option<CounterValue>> =
            doc.sections().map(|section| section.number.clone()).collect();
        assert_eq!(
            numbers,
            [
                Some(CounterValue::Numeric(1)),
                Some(CounterValue::Numeric(2)),
                Some(CounterValue::Numeric(3))
            ]
        );
    }
}
