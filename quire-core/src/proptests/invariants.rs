//! Invariants for path resolution, substitution sets and section numbering

use proptest::prelude::*;

use crate::{
    Block, CounterValue, Doctype, Document, Error, Options, PathResolver, ResolveOptions,
    descends_from, normalize,
    substitution::{Substitution, Substitutions},
};

use super::generators::*;

type Assignment = (usize, Option<CounterValue>, Option<String>, Option<String>);

fn resolver() -> Result<PathResolver, TestCaseError> {
    PathResolver::new(Some('/'), Some("/work")).map_err(|e| TestCaseError::fail(e.to_string()))
}

fn assignments(blocks: &[Block], out: &mut Vec<Assignment>) {
    for block in blocks {
        if let Block::Section(section) = block {
            out.push((
                section.index,
                section.number.clone(),
                section.caption.clone(),
                section.sectnum.clone(),
            ));
            assignments(&section.blocks, out);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 512,
        .. ProptestConfig::default()
    })]

    /// Normalizing never leaves a backslash and keeps every character in place.
    #[test]
    fn normalize_has_no_backslash(path in any_path_string()) {
        let normalized = normalize(&path);
        prop_assert!(!normalized.contains('\\'));
        prop_assert_eq!(normalized.chars().count(), path.chars().count());
        for (original, replaced) in path.chars().zip(normalized.chars()) {
            if original == '\\' || original == '/' {
                prop_assert_eq!(replaced, '/');
            } else {
                prop_assert_eq!(replaced, original);
            }
        }
    }

    /// With recovery enabled, a jailed resolution never leaves the jail, whatever
    /// the start directory.
    #[test]
    fn jailed_resolution_stays_in_jail(
        (jail, start) in jail_and_start(),
        target in prop_oneof![relative_path(), escaping_path(), relative_path().prop_map(|p| format!("/{p}"))],
    ) {
        let resolver = resolver()?;
        let resolved = resolver
            .resolve_system_path(Some(&target), start.as_deref(), Some(&jail), &ResolveOptions::recovering("path"))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert!(descends_from(&resolved, &jail), "{resolved} escapes {jail}");
    }

    /// Without recovery, escaping the jail is always a containment violation: the
    /// start's when the start lies outside, the target's otherwise.
    #[test]
    fn strict_escape_is_containment_violation((jail, start) in jail_and_start(), target in escaping_path()) {
        let resolver = resolver()?;
        let effective_start = start
            .as_deref()
            .map_or_else(|| "/work".to_string(), |start| resolver.expand_path(start));
        let result = resolver.resolve_system_path(
            Some(&target),
            start.as_deref(),
            Some(&jail),
            &ResolveOptions::strict("path"),
        );
        if descends_from(&effective_start, &jail) {
            prop_assert!(matches!(result, Err(Error::PathOutsideJail { .. })), "{result:?}");
        } else {
            prop_assert!(matches!(result, Err(Error::StartOutsideJail { .. })), "{result:?}");
        }
    }

    /// Re-indexing without structural change yields the same assignments.
    #[test]
    fn reindex_is_idempotent(blocks in section_tree(), book in any::<bool>(), sectnums in any::<bool>()) {
        let doctype = if book { Doctype::Book } else { Doctype::Article };
        let options = Options::builder()
            .with_working_dir("/work")
            .with_doctype(doctype)
            .with_attribute("sectnums", sectnums)
            .build();
        let mut doc = Document::new(&options).map_err(|e| TestCaseError::fail(e.to_string()))?;
        for block in blocks {
            doc.push(block);
        }

        doc.reindex_sections();
        let mut first = Vec::new();
        assignments(doc.blocks(), &mut first);
        doc.reindex_sections();
        let mut second = Vec::new();
        assignments(doc.blocks(), &mut second);
        prop_assert_eq!(first, second);
    }

    /// Removing a kind present once removes exactly one occurrence, then nothing.
    #[test]
    fn remove_is_noop_after_first(kind in substitution(), times in 1usize..5) {
        let all = [
            Substitution::SpecialCharacters,
            Substitution::Quotes,
            Substitution::Attributes,
            Substitution::Replacements,
            Substitution::Macros,
            Substitution::PostReplacements,
            Substitution::Callouts,
        ];
        let mut subs = Substitutions::new(&all);
        prop_assert!(subs.remove(kind));
        for _ in 1..times {
            prop_assert!(!subs.remove(kind));
        }
        let expected: Vec<Substitution> = all.iter().copied().filter(|k| *k != kind).collect();
        prop_assert_eq!(subs.as_slice(), expected.as_slice());
    }
}
