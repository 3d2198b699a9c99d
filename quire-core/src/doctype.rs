//! Document type configuration.
//!
//! The doctype decides which numbering rule applies to top-level sections: in a
//! `book`, chapters draw from a single document-wide counter.

use std::str::FromStr;

/// Document type of the document being processed.
#[derive(Debug, Clone, Default, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Doctype {
    /// The default doctype. Sections are numbered per container.
    #[default]
    Article,

    /// Builds on the article doctype with the additional ability to use a top-level
    /// title as part titles. Chapters (level 1 sections) are numbered sequentially
    /// across the whole book, even when divided into parts.
    Book,

    /// Used for producing a manual page.
    Manpage,

    /// Inline formatting only, without wrapping blocks.
    Inline,
}

impl FromStr for Doctype {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "article" => Ok(Self::Article),
            "book" => Ok(Self::Book),
            "manpage" => Ok(Self::Manpage),
            "inline" => Ok(Self::Inline),
            _ => Err(format!(
                "invalid doctype: '{s}', expected: article, book, manpage, inline"
            )),
        }
    }
}

impl std::fmt::Display for Doctype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Article => write!(f, "article"),
            Self::Book => write!(f, "book"),
            Self::Manpage => write!(f, "manpage"),
            Self::Inline => write!(f, "inline"),
        }
    }
}
