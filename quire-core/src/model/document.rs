use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::{
    AttributeLookup, AttributeValue, Counters, Doctype, DocumentAttributes, Error, Options,
    PathResolver, ResolveOptions, SafeMode, default_attributes,
    model::{Block, DocumentContext, Section, SectionLevel, generate_id},
    numbering::Numbering,
};

/// The state of a document that outlives any single block: attributes, counters,
/// registered ids and the path resolver.
///
/// Kept apart from the block tree so that a walk can borrow the blocks mutably while
/// handing the scope to numbering and substitutions.
#[derive(Clone, Debug, Serialize)]
pub struct DocumentScope {
    doctype: Doctype,
    #[serde(skip)]
    safe_mode: SafeMode,
    #[serde(skip)]
    base_dir: String,
    #[serde(skip)]
    attributes: DocumentAttributes,
    #[serde(skip)]
    counters: Counters,
    #[serde(skip)]
    path_resolver: PathResolver,
    #[serde(skip)]
    ids: FxHashSet<String>,
}

impl AttributeLookup for DocumentScope {
    fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }
}

impl DocumentContext for DocumentScope {
    fn doctype(&self) -> Doctype {
        self.doctype
    }

    fn counters(&self) -> &Counters {
        &self.counters
    }

    fn counters_mut(&mut self) -> &mut Counters {
        &mut self.counters
    }

    fn path_resolver(&self) -> &PathResolver {
        &self.path_resolver
    }
}

/// A `Document` represents the root of a document tree.
#[derive(Clone, Debug, Serialize)]
pub struct Document {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(flatten)]
    scope: DocumentScope,
    blocks: Vec<Block>,
    #[serde(skip)]
    numbering: Numbering,
}

impl Document {
    /// Create an empty document.
    ///
    /// The attributes start from [`default_attributes`], overridden by the
    /// attributes in `options`. The base directory defaults to the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkingDirectory`] when no working directory is configured and
    /// the current directory cannot be determined.
    pub fn new(options: &Options) -> Result<Self, Error> {
        let path_resolver =
            PathResolver::new(options.file_separator, options.working_dir.as_deref())?;
        let base_dir = path_resolver.expand_path(
            options
                .base_dir
                .as_deref()
                .unwrap_or_else(|| path_resolver.working_dir()),
        );

        let mut attributes = default_attributes();
        attributes.merge(options.document_attributes.clone());
        attributes.set("doctype".to_string(), options.doctype.to_string().into());
        if options.hardbreaks {
            attributes.set("hardbreaks".to_string(), true.into());
        }
        tracing::debug!(%base_dir, safe_mode = ?options.safe_mode, doctype = %options.doctype, "created document");

        Ok(Self {
            title: None,
            scope: DocumentScope {
                doctype: options.doctype,
                safe_mode: options.safe_mode,
                base_dir,
                attributes,
                counters: Counters::default(),
                path_resolver,
                ids: FxHashSet::default(),
            },
            blocks: Vec::new(),
            numbering: Numbering::default(),
        })
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    #[must_use]
    pub fn safe_mode(&self) -> SafeMode {
        self.scope.safe_mode
    }

    #[must_use]
    pub fn base_dir(&self) -> &str {
        &self.scope.base_dir
    }

    #[must_use]
    pub fn attributes(&self) -> &DocumentAttributes {
        &self.scope.attributes
    }

    /// Set an attribute, replacing any previous value. `false` unsets it.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.scope.attributes.set(name.into(), value.into());
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }

    /// Top-level sections, in document order.
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Section(section) => Some(section),
            Block::Node(_) => None,
        })
    }

    /// The document state handed to substitutions and numbering.
    pub fn scope_mut(&mut self) -> &mut DocumentScope {
        &mut self.scope
    }

    /// Create a section classified the way this document classifies headings.
    ///
    /// A block style (`appendix`, `preface`, ...) becomes the section name and marks
    /// the section special. In a book, level 0 sections are parts and level 1
    /// sections are chapters. The section is numbered when `sectnums` is set, its
    /// level is within `sectnumlevels`, and it is an appendix or a regular
    /// section below the document title.
    #[must_use]
    pub fn section(
        &self,
        title: impl Into<String>,
        level: SectionLevel,
        style: Option<&str>,
    ) -> Section {
        let book = self.scope.doctype == Doctype::Book;
        let (sectname, special) = match style.filter(|style| !style.is_empty()) {
            Some(style) => (style.to_string(), true),
            None if book && level == 0 => ("part".to_string(), true),
            None if book && level == 1 => ("chapter".to_string(), false),
            None => (format!("sect{level}"), false),
        };
        let sectnumlevels = self
            .scope
            .attribute_str("sectnumlevels")
            .and_then(|levels| levels.parse::<SectionLevel>().ok())
            .unwrap_or(3);
        let numbered = self.scope.has_attribute("sectnums")
            && level <= sectnumlevels
            && (sectname == "appendix" || (!special && level > 0));

        Section::new(title, level)
            .with_sectname(sectname)
            .with_special(special)
            .with_numbered(numbered)
    }

    /// Assign index, number and caption to every section in the document.
    ///
    /// Calling this again without changing the tree yields the same assignments.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn reindex_sections(&mut self) {
        self.numbering
            .reindex(&mut self.blocks, None, &mut self.scope);
    }

    /// Caption every titled block that has a caption attribute, in document order.
    pub fn assign_captions(&mut self) {
        fn walk(blocks: &mut [Block], scope: &mut DocumentScope) {
            for block in blocks {
                match block {
                    Block::Section(section) => walk(&mut section.blocks, scope),
                    Block::Node(node) => node.assign_caption(None, None, scope),
                }
            }
        }
        walk(&mut self.blocks, &mut self.scope);
    }

    /// Generate ids for sections that have none. Explicit ids are registered first
    /// so generated ids never collide with them.
    pub fn assign_section_ids(&mut self) {
        fn register(blocks: &[Block], ids: &mut FxHashSet<String>) {
            for block in blocks {
                match block {
                    Block::Section(section) => {
                        if let Some(id) = &section.id {
                            ids.insert(id.clone());
                        }
                        register(&section.blocks, ids);
                    }
                    Block::Node(node) => {
                        if let Some(id) = &node.id {
                            ids.insert(id.clone());
                        }
                    }
                }
            }
        }

        fn generate(
            blocks: &mut [Block],
            attributes: &DocumentAttributes,
            ids: &mut FxHashSet<String>,
        ) {
            for block in blocks {
                if let Block::Section(section) = block {
                    if section.id.is_none() {
                        section.id = generate_id(&section.title, attributes, ids);
                    }
                    generate(&mut section.blocks, attributes, ids);
                }
            }
        }

        register(&self.blocks, &mut self.scope.ids);
        generate(&mut self.blocks, &self.scope.attributes, &mut self.scope.ids);
    }

    /// Resolve a path referenced by the document according to its safe mode.
    ///
    /// Below [`SafeMode::Safe`] paths are resolved without a jail. From `Safe` up the
    /// base directory is the jail and paths that escape it are clamped back inside.
    /// A relative `start` is anchored at the base directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StartOutsideJail`] or [`Error::PathOutsideJail`] only if
    /// recovery fails, which cannot happen for jails derived from an absolute base
    /// directory.
    pub fn normalize_system_path(
        &self,
        target: &str,
        start: Option<&str>,
        target_name: &str,
    ) -> Result<String, Error> {
        let resolver = &self.scope.path_resolver;
        let base_dir = self.scope.base_dir.as_str();
        let start = match start.filter(|start| !start.is_empty()) {
            Some(start) if resolver.is_absolute_system_path(start) => start.to_string(),
            Some(start) => format!("{base_dir}/{start}"),
            None => base_dir.to_string(),
        };
        let jail = self.scope.safe_mode.is_jailed().then_some(base_dir);
        resolver.resolve_system_path(
            Some(target),
            Some(&start),
            jail,
            &ResolveOptions::recovering(target_name),
        )
    }
}

impl AttributeLookup for Document {
    fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.scope.attribute(name)
    }
}

impl DocumentContext for Document {
    fn doctype(&self) -> Doctype {
        self.scope.doctype
    }

    fn counters(&self) -> &Counters {
        &self.scope.counters
    }

    fn counters_mut(&mut self) -> &mut Counters {
        &mut self.scope.counters
    }

    fn path_resolver(&self) -> &PathResolver {
        &self.scope.path_resolver
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::{BlockNode, CounterValue};
    use pretty_assertions::assert_eq;

    fn options() -> crate::OptionsBuilder {
        Options::builder()
            .with_working_dir("/home/docs")
            .with_file_separator('/')
    }

    fn sections(blocks: &[Block]) -> Vec<&Section> {
        blocks
            .iter()
            .filter_map(|block| match block {
                Block::Section(section) => Some(section),
                Block::Node(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_new_merges_defaults_and_options() {
        let doc = Document::new(
            &options()
                .with_doctype(Doctype::Book)
                .with_attribute("table-caption", "Tableau")
                .with_hardbreaks()
                .build(),
        )
        .unwrap();
        assert_eq!(doc.attribute_str("table-caption"), Some("Tableau"));
        assert_eq!(doc.attribute_str("figure-caption"), Some("Figure"));
        assert_eq!(doc.attribute_str("doctype"), Some("book"));
        assert!(doc.has_attribute("hardbreaks"));
        assert_eq!(doc.base_dir(), "/home/docs");
    }

    #[test]
    fn test_base_dir_is_expanded_against_working_dir() {
        let doc = Document::new(&options().with_base_dir("book/../manual").build()).unwrap();
        assert_eq!(doc.base_dir(), "/home/docs/manual");
    }

    #[test]
    fn test_normalize_system_path_unsafe_is_not_jailed() {
        let doc = Document::new(&options().build()).unwrap();
        assert_eq!(
            doc.normalize_system_path("../shared/a.adoc", None, "include file")
                .unwrap(),
            "/home/shared/a.adoc"
        );
        assert_eq!(
            doc.normalize_system_path("a.adoc", Some("chapters"), "include file")
                .unwrap(),
            "/home/docs/chapters/a.adoc"
        );
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_normalize_system_path_safe_is_jailed() {
        let doc = Document::new(&options().with_safe_mode(SafeMode::Safe).build()).unwrap();
        assert_eq!(
            doc.normalize_system_path("../../etc/passwd", None, "include file")
                .unwrap(),
            "/home/docs/etc/passwd"
        );
        assert!(logs_contain("recovering automatically"));
    }

    #[test]
    fn test_section_classification() {
        let doc = Document::new(
            &options()
                .with_doctype(Doctype::Book)
                .with_attribute("sectnums", true)
                .build(),
        )
        .unwrap();
        let part = doc.section("Basics", 0, None);
        assert_eq!(part.sectname, "part");
        assert!(part.special);
        assert!(!part.numbered);

        let chapter = doc.section("Install", 1, None);
        assert_eq!(chapter.sectname, "chapter");
        assert!(chapter.numbered);

        let appendix = doc.section("Reference", 1, Some("appendix"));
        assert!(appendix.special);
        assert!(appendix.numbered);

        let preface = doc.section("Preface", 1, Some("preface"));
        assert!(!preface.numbered);

        assert!(!doc.section("Deep", 4, None).numbered);
    }

    #[test]
    fn test_book_chapters_count_across_parts() {
        let mut doc = Document::new(
            &options()
                .with_doctype(Doctype::Book)
                .with_attribute("sectnums", true)
                .build(),
        )
        .unwrap();
        let part_one = doc.section("Part One", 0, None).with_blocks(vec![
            Block::Section(doc.section("First", 1, None).with_blocks(vec![Block::Section(
                doc.section("Detail", 2, None),
            )])),
            Block::Section(doc.section("Second", 1, None)),
        ]);
        let part_two = doc
            .section("Part Two", 0, None)
            .with_blocks(vec![Block::Section(doc.section("Third", 1, None))]);
        let appendix = doc.section("Reference", 1, Some("appendix"));
        doc.push(Block::Section(part_one));
        doc.push(Block::Section(part_two));
        doc.push(Block::Section(appendix));
        doc.reindex_sections();

        let parts = sections(doc.blocks());
        assert_eq!(parts.len(), 3);
        let chapters: Vec<String> = parts
            .iter()
            .flat_map(|part| part.sections())
            .map(Section::numbered_title)
            .collect();
        assert_eq!(chapters, ["1. First", "2. Second", "3. Third"]);

        let detail = parts[0].sections().next().unwrap().sections().next().unwrap();
        assert_eq!(detail.numbered_title(), "1.1. Detail");
        assert_eq!(detail.index, 0);

        assert_eq!(parts[0].number, None);
        assert_eq!(parts[2].index, 2);
        assert_eq!(parts[2].number, Some(CounterValue::Alphabetic("A".to_string())));
        assert_eq!(parts[2].captioned_title(), "Appendix A: Reference");
    }

    #[test]
    fn test_reindex_is_idempotent() {
        let mut doc = Document::new(
            &options()
                .with_doctype(Doctype::Book)
                .with_attribute("sectnums", true)
                .build(),
        )
        .unwrap();
        for title in ["One", "Two"] {
            let chapter = doc.section(title, 1, None);
            doc.push(Block::Section(chapter));
        }
        let appendix = doc.section("Extra", 1, Some("appendix"));
        doc.push(Block::Section(appendix));

        doc.reindex_sections();
        let first: Vec<Section> = sections(doc.blocks()).into_iter().cloned().collect();
        doc.reindex_sections();
        let second: Vec<Section> = sections(doc.blocks()).into_iter().cloned().collect();
        assert_eq!(first, second);
        assert_eq!(second[2].caption.as_deref(), Some("Appendix A: "));
    }

    #[test]
    fn test_assign_captions_and_ids() {
        let mut doc = Document::new(&options().build()).unwrap();
        let intro = doc.section("Intro", 1, None).with_blocks(vec![
            Block::Node(BlockNode::new("table").with_title("Prices")),
            Block::Node(BlockNode::new("example").with_title("Usage")),
            Block::Node(BlockNode::new("table").with_title("Costs")),
        ]);
        let repeated = doc.section("Intro", 1, None);
        let explicit = doc.section("Other", 1, None).with_id("_intro_2");
        doc.push(Block::Section(intro));
        doc.push(Block::Section(repeated));
        doc.push(Block::Section(explicit));
        doc.assign_captions();
        doc.assign_section_ids();

        let all = sections(doc.blocks());
        assert_eq!(all[0].id.as_deref(), Some("_intro"));
        assert_eq!(all[1].id.as_deref(), Some("_intro_3"));
        let titles: Vec<String> = all[0]
            .blocks
            .iter()
            .filter_map(|block| match block {
                Block::Node(node) => node.captioned_title(),
                Block::Section(_) => None,
            })
            .collect();
        assert_eq!(titles, ["Table 1. Prices", "Example 1. Usage", "Table 2. Costs"]);
    }

    #[test]
    fn test_serializes_tree() {
        let mut doc = Document::new(&options().with_attribute("sectnums", true).build()).unwrap();
        doc.set_title("Guide");
        let intro = doc.section("Intro", 1, None);
        doc.push(Block::Section(intro));
        doc.reindex_sections();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["title"], "Guide");
        assert_eq!(json["doctype"], "article");
        assert_eq!(json["blocks"][0]["type"], "section");
        assert_eq!(json["blocks"][0]["sectnum"], "1.");
        assert_eq!(json["blocks"][0]["number"], 1);
    }
}
