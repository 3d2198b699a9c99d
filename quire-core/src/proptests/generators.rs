//! Custom input generators for property-based testing
#![allow(clippy::expect_used)]
use proptest::prelude::*;

use crate::{Block, Section, substitution::Substitution};

/// Any string, including backslashes and control characters.
pub fn any_path_string() -> impl Strategy<Value = String> {
    prop::string::string_regex(".*").expect("Failed to create any string strategy")
}

/// Relative paths built from ordinary names, `.`, `..` and mixed separators.
pub fn relative_path() -> impl Strategy<Value = String> {
    (
        prop::collection::vec(
            prop_oneof![
                3 => prop::string::string_regex("[a-z0-9_-]{1,8}")
                    .expect("Failed to create segment strategy"),
                2 => Just("..".to_string()),
                1 => Just(".".to_string()),
                1 => Just(String::new()),
            ],
            0..12,
        ),
        prop::collection::vec(prop_oneof![Just('/'), Just('\\')], 12),
    )
        .prop_map(|(segments, separators)| {
            segments
                .iter()
                .zip(separators.iter().cycle())
                .fold(String::new(), |mut path, (segment, separator)| {
                    if !path.is_empty() {
                        path.push(*separator);
                    }
                    path.push_str(segment);
                    path
                })
        })
}

/// A relative path that climbs above its start directory.
pub fn escaping_path() -> impl Strategy<Value = String> {
    (1usize..6, relative_path()).prop_map(|(depth, rest)| {
        let mut path = "../".repeat(depth + 4);
        path.push_str(&rest.replace("..", "x"));
        path
    })
}

/// Absolute jail directories.
pub fn jail() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::string::string_regex("[a-z]{1,6}").expect("Failed to create jail segment"),
        1..4,
    )
    .prop_map(|segments| format!("/{}", segments.join("/")))
}

/// A short relative directory, at most three levels deep.
fn short_relative() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::string::string_regex("[a-z]{1,6}").expect("Failed to create start segment"),
        0..4,
    )
    .prop_map(|segments| segments.join("/"))
}

/// A relative start that climbs above the filesystem root into `/outside`. Jail
/// segments are at most six letters, so this never lands inside a jail.
fn escaping_start() -> impl Strategy<Value = String> {
    (1usize..6).prop_map(|depth| format!("{}outside/dir", "../".repeat(depth + 4)))
}

/// A jail together with a start directory: absent, inside the jail, relative to
/// the working directory, climbing out of the filesystem, or absolute elsewhere.
pub fn jail_and_start() -> impl Strategy<Value = (String, Option<String>)> {
    jail().prop_flat_map(|jail| {
        let inside = {
            let jail = jail.clone();
            short_relative().prop_map(move |path| Some(format!("{jail}/{path}")))
        };
        let start = prop_oneof![
            Just(None),
            inside,
            short_relative().prop_map(Some),
            escaping_start().prop_map(Some),
            Just(Some("/elsewhere/docs".to_string())),
        ];
        (Just(jail), start)
    })
}

pub fn substitution() -> impl Strategy<Value = Substitution> {
    prop_oneof![
        Just(Substitution::SpecialCharacters),
        Just(Substitution::Quotes),
        Just(Substitution::Attributes),
        Just(Substitution::Replacements),
        Just(Substitution::Macros),
        Just(Substitution::PostReplacements),
        Just(Substitution::Callouts),
    ]
}

/// Section trees with a mix of numbered, special and appendix sections.
pub fn section_tree() -> impl Strategy<Value = Vec<Block>> {
    let leaf = (1u8..4, any::<bool>(), 0u8..6).prop_map(|(level, numbered, kind)| {
        let section = Section::new(format!("Section {level}"), level).with_numbered(numbered);
        Block::Section(match kind {
            0 => section.with_sectname("appendix").with_special(true),
            1 => section.with_special(true),
            _ => section,
        })
    });
    let tree = leaf.prop_recursive(3, 24, 4, |inner| {
        (
            0u8..3,
            any::<bool>(),
            any::<bool>(),
            prop::collection::vec(inner, 0..4),
        )
            .prop_map(|(level, numbered, special, children)| {
                Block::Section(
                    Section::new(format!("Container {level}"), level)
                        .with_numbered(numbered)
                        .with_special(special)
                        .with_blocks(children),
                )
            })
    });
    prop::collection::vec(tree, 1..4)
}
