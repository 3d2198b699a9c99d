//! Ordered text substitutions applied to the raw content of a block.
//!
//! A substitution set is a fixed, ordered list of [`Substitution`] kinds. Every kind in
//! the list runs exactly once, in list order, over the output of the previous kind. The
//! named sets are process-wide constants; blocks that customize their substitutions work
//! on an owned [`Substitutions`] copy.

use std::{fmt, str::FromStr};

use serde::Serialize;

mod attributes;
mod converter;
mod macros;
mod pipeline;
mod quotes;
mod replacements;

pub use attributes::apply_attributes;
pub use converter::{Html5Converter, InlineConverter, InlineImage, QuoteAttributes, QuoteKind};
pub use macros::apply_macros;
pub use pipeline::Substitutor;
pub use quotes::{QuoteMatch, apply_quotes, find_quote};
pub use replacements::{
    apply_callouts, apply_post_replacements, apply_replacements, apply_special_characters,
};

/// A single substitution kind.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Substitution {
    SpecialCharacters,
    Quotes,
    Attributes,
    Replacements,
    Macros,
    PostReplacements,
    Callouts,
}

impl Substitution {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::SpecialCharacters => "specialcharacters",
            Self::Quotes => "quotes",
            Self::Attributes => "attributes",
            Self::Replacements => "replacements",
            Self::Macros => "macros",
            Self::PostReplacements => "post_replacements",
            Self::Callouts => "callouts",
        }
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Substitution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "specialcharacters" | "specialchars" | "c" => Ok(Self::SpecialCharacters),
            "quotes" | "q" => Ok(Self::Quotes),
            "attributes" | "a" => Ok(Self::Attributes),
            "replacements" | "r" => Ok(Self::Replacements),
            "macros" | "m" => Ok(Self::Macros),
            "post_replacements" | "p" => Ok(Self::PostReplacements),
            "callouts" => Ok(Self::Callouts),
            unknown => Err(format!("invalid substitution type: {unknown}")),
        }
    }
}

pub const BASIC: &[Substitution] = &[Substitution::SpecialCharacters];
pub const HEADER: &[Substitution] = &[Substitution::SpecialCharacters, Substitution::Attributes];
pub const NORMAL: &[Substitution] = &[
    Substitution::SpecialCharacters,
    Substitution::Quotes,
    Substitution::Attributes,
    Substitution::Replacements,
    Substitution::Macros,
    Substitution::PostReplacements,
];
pub const TITLE: &[Substitution] = NORMAL;
pub const VERBATIM: &[Substitution] = &[Substitution::SpecialCharacters, Substitution::Callouts];
pub const PASS: &[Substitution] = &[];

/// The named substitution sets.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubstitutionSet {
    Basic,
    Normal,
    Verbatim,
    Title,
    Header,
    Pass,
}

impl SubstitutionSet {
    /// The kinds in this set, in application order.
    #[must_use]
    pub fn substitutions(self) -> &'static [Substitution] {
        match self {
            Self::Basic => BASIC,
            Self::Normal => NORMAL,
            Self::Verbatim => VERBATIM,
            Self::Title => TITLE,
            Self::Header => HEADER,
            Self::Pass => PASS,
        }
    }
}

impl FromStr for SubstitutionSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Self::Basic),
            "normal" => Ok(Self::Normal),
            "verbatim" => Ok(Self::Verbatim),
            "title" => Ok(Self::Title),
            "header" => Ok(Self::Header),
            "pass" => Ok(Self::Pass),
            unknown => Err(format!(
                "invalid substitution set: '{unknown}', expected: basic, normal, verbatim, title, header, pass"
            )),
        }
    }
}

/// Look up a named substitution set.
///
/// Set names can come from document content, so an unknown name is logged and
/// resolves to no substitutions rather than failing.
#[must_use]
pub fn lookup_set(name: &str) -> &'static [Substitution] {
    match SubstitutionSet::from_str(name) {
        Ok(set) => set.substitutions(),
        Err(error) => {
            tracing::warn!(set = %name, %error, "unknown substitution set, applying no substitutions");
            PASS
        }
    }
}

/// An owned, editable list of substitutions for one block.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Substitutions(Vec<Substitution>);

impl Substitutions {
    #[must_use]
    pub fn new(substitutions: &[Substitution]) -> Self {
        Self(substitutions.to_vec())
    }

    /// Remove the first occurrence of `kind`. Returns whether anything was removed.
    pub fn remove(&mut self, kind: Substitution) -> bool {
        if let Some(position) = self.0.iter().position(|candidate| *candidate == kind) {
            self.0.remove(position);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn contains(&self, kind: Substitution) -> bool {
        self.0.contains(&kind)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Substitution] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Substitution> {
        self.0.iter()
    }

    /// Resolve a `subs` attribute value against the block's default substitutions.
    ///
    /// The value is a comma-separated list of substitution names, single-letter
    /// aliases (`a`, `c`, `m`, `n`, `p`, `q`, `r`, `v`) or composites (`none`,
    /// `normal`, `verbatim`, `specialchars`). Once any entry carries a modifier,
    /// the list is applied incrementally to `defaults`:
    ///
    /// - `+name` appends
    /// - `name+` prepends
    /// - `-name` removes every occurrence
    ///
    /// Unknown names are logged and dropped. Duplicates are removed, keeping the first.
    #[must_use]
    pub fn resolve(spec: &str, defaults: &[Substitution]) -> Self {
        enum Modifier {
            Append,
            Prepend,
            Remove,
        }

        let modifiers_present = spec.contains(['+', '-']);
        let mut candidates: Option<Vec<Substitution>> = None;

        for entry in spec.split(',').map(str::trim) {
            let (modifier, key) = if modifiers_present {
                if let Some(key) = entry.strip_prefix('+') {
                    (Some(Modifier::Append), key)
                } else if let Some(key) = entry.strip_prefix('-') {
                    (Some(Modifier::Remove), key)
                } else if let Some(key) = entry.strip_suffix('+') {
                    (Some(Modifier::Prepend), key)
                } else {
                    (None, entry)
                }
            } else {
                (None, entry)
            };
            let key = key.trim();

            let resolved: Vec<Substitution> = match key {
                "none" => Vec::new(),
                "normal" | "n" => NORMAL.to_vec(),
                "verbatim" | "v" => VERBATIM.to_vec(),
                key => match key.parse() {
                    Ok(substitution) => vec![substitution],
                    Err(error) => {
                        tracing::warn!(substitution = %key, %error, "dropping unknown substitution");
                        Vec::new()
                    }
                },
            };

            match modifier {
                Some(modifier) => {
                    let current = candidates.get_or_insert_with(|| defaults.to_vec());
                    match modifier {
                        Modifier::Append => current.extend(resolved),
                        Modifier::Prepend => {
                            current.splice(0..0, resolved);
                        }
                        Modifier::Remove => current.retain(|kind| !resolved.contains(kind)),
                    }
                }
                None => candidates.get_or_insert_with(Vec::new).extend(resolved),
            }
        }

        let mut unique: Vec<Substitution> = Vec::new();
        for kind in candidates.unwrap_or_default() {
            if !unique.contains(&kind) {
                unique.push(kind);
            }
        }
        Self(unique)
    }
}

impl From<SubstitutionSet> for Substitutions {
    fn from(set: SubstitutionSet) -> Self {
        Self::new(set.substitutions())
    }
}

impl<'a> IntoIterator for &'a Substitutions {
    type Item = &'a Substitution;
    type IntoIter = std::slice::Iter<'a, Substitution>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
