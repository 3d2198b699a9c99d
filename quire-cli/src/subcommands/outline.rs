use std::{
    fmt::{self, Write as _},
    path::PathBuf,
    sync::LazyLock,
};

use anyhow::Context;
use quire_core::{
    Block, BlockNode, Doctype, Document, DocumentContext, Options, Section,
    substitution::apply_attributes,
};
use regex::Regex;

use crate::error;

/// Print the section outline of a document with numbers and captions assigned
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Input file (reads stdin when omitted)
    pub file: Option<PathBuf>,

    /// Document type; overrides a `:doctype:` entry in the header
    #[arg(long)]
    pub doctype: Option<Doctype>,

    /// Set document attributes (`name=value`, `name`, or `name!` to unset)
    #[arg(short = 'a', long = "attribute")]
    pub attributes: Vec<String>,

    /// Print the section tree as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &Args) -> miette::Result<()> {
    let input = super::read_input(args.file.as_deref()).map_err(|e| error::display(e.as_ref()))?;
    let output = outline(args, &input).map_err(|e| error::display(e.as_ref()))?;
    print!("{output}");
    Ok(())
}

#[tracing::instrument(level = "debug", skip(input))]
fn outline(args: &Args, input: &str) -> anyhow::Result<String> {
    let mut document = parse(args, input)?;
    document.assign_section_ids();
    document.assign_captions();
    document.reindex_sections();

    if args.json {
        let mut json =
            serde_json::to_string_pretty(&document).context("failed to serialize outline")?;
        json.push('\n');
        return Ok(json);
    }
    render(&document).context("failed to render outline")
}

#[allow(clippy::expect_used)]
static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(={1,6})[ \t]+(\S.*?)[ \t]*$").expect("heading pattern must compile")
});

#[allow(clippy::expect_used)]
static ATTRIBUTE_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^:(!?)(\w[\w-]*)(!?):(?:[ \t]+(.*))?$").expect("attribute entry pattern must compile")
});

#[allow(clippy::expect_used)]
static BLOCK_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[\[([\p{Alphabetic}_:][\w:.-]*)(?:,\s*.+)?\]\]$")
        .expect("block anchor pattern must compile")
});

#[allow(clippy::expect_used)]
static BLOCK_ATTRIBUTES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[([^\[\]]*)\]$").expect("block attribute pattern must compile")
});

#[allow(clippy::expect_used)]
static BLOCK_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\.([^.\s].*)$").expect("block title pattern must compile")
});

#[allow(clippy::expect_used)]
static DELIMITER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:={4,}|-{4,}|\.{4,}|\*{4,}|_{4,}|/{4,}|\|={3,})$")
        .expect("delimiter pattern must compile")
});

#[allow(clippy::expect_used)]
static BLOCK_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^image::([^\s\[]+)\[.*\]$").expect("block image pattern must compile")
});

fn delimited_context(delimiter: &str) -> Option<&'static str> {
    match delimiter.chars().next() {
        Some('=') => Some("example"),
        Some('-') => Some("listing"),
        Some('.') => Some("literal"),
        Some('*') => Some("sidebar"),
        Some('_') => Some("quote"),
        Some('|') => Some("table"),
        Some(_) | None => None,
    }
}

/// Title, style and id collected from the lines above a block or heading.
#[derive(Debug, Default)]
struct BlockMetadata {
    title: Option<String>,
    style: Option<String>,
    id: Option<String>,
}

impl BlockMetadata {
    fn is_empty(&self) -> bool {
        self.title.is_none() && self.style.is_none() && self.id.is_none()
    }
}

struct OutlineBuilder {
    document: Document,
    /// Attribute names set on the command line; header entries cannot override them.
    locked: Vec<String>,
    stack: Vec<Section>,
    pending: BlockMetadata,
    in_paragraph: bool,
    delimiter: Option<String>,
    seen_content: bool,
}

impl OutlineBuilder {
    fn new(document: Document, locked: Vec<String>) -> Self {
        Self {
            document,
            locked,
            stack: Vec::new(),
            pending: BlockMetadata::default(),
            in_paragraph: false,
            delimiter: None,
            seen_content: false,
        }
    }

    fn line(&mut self, line: &str) {
        if let Some(delimiter) = &self.delimiter {
            if line == delimiter {
                self.delimiter = None;
            }
            return;
        }
        if line.trim().is_empty() {
            self.in_paragraph = false;
            return;
        }
        if self.in_paragraph {
            return;
        }
        if line.starts_with("//") && !line.starts_with("////") {
            return;
        }

        if DELIMITER.is_match(line) {
            self.delimiter = Some(line.to_string());
            if let Some(context) = delimited_context(line) {
                self.node(context);
            }
        } else if let Some(captures) = ATTRIBUTE_ENTRY.captures(line) {
            let unset = captures.get(1).is_some_and(|m| !m.as_str().is_empty())
                || captures.get(3).is_some_and(|m| !m.as_str().is_empty());
            let name = captures.get(2).map_or("", |m| m.as_str());
            let value = captures.get(4).map_or("", |m| m.as_str());
            self.attribute_entry(name, value, unset);
        } else if let Some(captures) = HEADING.captures(line) {
            let level = captures.get(1).map_or(0, |m| m.as_str().len().saturating_sub(1));
            let title = captures.get(2).map_or("", |m| m.as_str());
            self.heading(level, title);
        } else if let Some(captures) = BLOCK_ANCHOR.captures(line) {
            self.pending.id = captures.get(1).map(|m| m.as_str().to_string());
        } else if let Some(captures) = BLOCK_ATTRIBUTES.captures(line) {
            self.block_attributes(captures.get(1).map_or("", |m| m.as_str()));
        } else if let Some(captures) = BLOCK_TITLE.captures(line) {
            let title = captures.get(1).map_or("", |m| m.as_str());
            self.pending.title = Some(apply_attributes(title, self.document.scope_mut()));
        } else if BLOCK_IMAGE.is_match(line) {
            self.node("image");
        } else {
            self.in_paragraph = true;
            if !self.pending.is_empty() {
                self.node("paragraph");
            }
            self.seen_content = true;
        }
    }

    fn attribute_entry(&mut self, name: &str, value: &str, unset: bool) {
        if self.locked.iter().any(|locked| locked == name) {
            tracing::debug!(%name, "attribute is locked by the command line");
            return;
        }
        if unset {
            self.document.set_attribute(name, false);
        } else {
            let value = apply_attributes(value, self.document.scope_mut());
            self.document.set_attribute(name, value);
        }
    }

    /// `[style,positional...,name=value]`. `#id` and `id=` set the id.
    fn block_attributes(&mut self, attrlist: &str) {
        for (position, entry) in attrlist.split(',').map(str::trim).enumerate() {
            if let Some(id) = entry.strip_prefix("id=") {
                self.pending.id = Some(id.trim_matches('"').to_string());
            } else if position == 0 && !entry.is_empty() && !entry.contains('=') {
                let (style, id) = match entry.split_once('#') {
                    Some((style, id)) => (style, Some(id)),
                    None => (entry, None),
                };
                if !style.is_empty() {
                    self.pending.style = Some(style.to_string());
                }
                if let Some(id) = id.filter(|id| !id.is_empty()) {
                    self.pending.id = Some(id.to_string());
                }
            }
        }
    }

    fn heading(&mut self, level: usize, title: &str) {
        let metadata = std::mem::take(&mut self.pending);
        let title = apply_attributes(title, self.document.scope_mut());
        if level == 0 && self.document.title().is_none() && !self.seen_content {
            self.document.set_title(title);
            return;
        }
        self.seen_content = true;
        let level = match u8::try_from(level) {
            Ok(0) if self.document.doctype() != Doctype::Book => {
                tracing::warn!(%title, "level 0 sections can only be used when doctype is book");
                return;
            }
            Ok(level) => level,
            Err(_) => return,
        };

        self.close_sections(level);
        let mut section = self
            .document
            .section(title, level, metadata.style.as_deref());
        if let Some(id) = metadata.id {
            section = section.with_id(id);
        }
        self.stack.push(section);
    }

    fn node(&mut self, context: &str) {
        self.seen_content = true;
        let metadata = std::mem::take(&mut self.pending);
        let mut node = BlockNode::new(context);
        node.title = metadata.title;
        node.style = metadata.style;
        node.id = metadata.id;
        self.append(Block::Node(node));
    }

    fn append(&mut self, block: Block) {
        match self.stack.last_mut() {
            Some(section) => section.push(block),
            None => self.document.push(block),
        }
    }

    /// Close every open section at `level` or deeper.
    fn close_sections(&mut self, level: u8) {
        while self.stack.last().is_some_and(|section| section.level >= level) {
            if let Some(section) = self.stack.pop() {
                self.append(Block::Section(section));
            }
        }
    }

    fn finish(mut self) -> Document {
        if let Some(delimiter) = &self.delimiter {
            tracing::warn!(%delimiter, "unterminated delimited block");
        }
        self.close_sections(0);
        self.document
    }
}

/// Read `:doctype:` from the document header, the lines before the first blank one.
fn header_doctype(input: &str) -> Option<Doctype> {
    input
        .lines()
        .take_while(|line| !line.trim().is_empty())
        .filter_map(|line| ATTRIBUTE_ENTRY.captures(line))
        .filter(|captures| captures.get(2).is_some_and(|m| m.as_str() == "doctype"))
        .filter_map(|captures| captures.get(4).and_then(|m| m.as_str().parse().ok()))
        .last()
}

fn parse(args: &Args, input: &str) -> anyhow::Result<Document> {
    let attributes = super::build_attributes(&args.attributes);
    let locked: Vec<String> = attributes.iter().map(|(name, _)| name.clone()).collect();
    let doctype = args
        .doctype
        .or_else(|| header_doctype(input))
        .unwrap_or_default();
    let options = Options::builder()
        .with_doctype(doctype)
        .with_attributes(attributes)
        .build();
    let document = Document::new(&options).context("failed to set up document")?;

    let mut builder = OutlineBuilder::new(document, locked);
    for line in input.lines() {
        builder.line(line);
    }
    Ok(builder.finish())
}

fn render(document: &Document) -> Result<String, fmt::Error> {
    fn walk(blocks: &[Block], depth: usize, out: &mut String) -> fmt::Result {
        let indent = "  ".repeat(depth);
        for block in blocks {
            match block {
                Block::Section(section) => {
                    writeln!(out, "{indent}{}", section.numbered_title())?;
                    walk(&section.blocks, depth + 1, out)?;
                }
                Block::Node(node) => {
                    if let Some(title) = node.captioned_title() {
                        writeln!(out, "{indent}- {title}")?;
                    }
                }
            }
        }
        Ok(())
    }

    let mut out = String::new();
    if let Some(title) = document.title() {
        writeln!(out, "{title}")?;
    }
    let depth = usize::from(document.title().is_some());
    walk(document.blocks(), depth, &mut out)?;
    Ok(out)
}
