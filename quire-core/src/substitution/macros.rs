//! Inline macros: images, URLs, `link:` and `mailto:` macros, and inline anchors.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::converter::{InlineConverter, InlineImage};
use crate::DocumentContext;

#[allow(clippy::expect_used)]
static INLINE_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\?image:([^:\s\[][^\[]*)\[((?:\\\]|[^\]])*?)\]")
        .expect("inline image pattern must compile")
});

#[allow(clippy::expect_used)]
static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)(^|link:|&lt;|[\s>\(\)\[\];])(\\?(?:https?|file|ftp|irc)://[^\s\[\]<]*[^\s.,\[\]<])(?:\[((?:\\\]|[^\]])*?)\])?",
    )
    .expect("url pattern must compile")
});

#[allow(clippy::expect_used)]
static LINK_MACRO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\?(link|mailto):([^\s\[]+)\[((?:\\\]|[^\]])*?)\]")
        .expect("link macro pattern must compile")
});

#[allow(clippy::expect_used)]
static INLINE_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\\?(?:\[\[([\p{Alphabetic}:_][\w:.-]*)(?:,\s*(.+?))?\]\]|anchor:([\p{Alphabetic}:_][\w:.-]*)\[(?:\]|(.*?[^\\])\]))",
    )
    .expect("inline anchor pattern must compile")
});

fn group<'t>(captures: &Captures<'t>, index: usize) -> Option<&'t str> {
    captures.get(index).map(|m| m.as_str())
}

fn whole<'t>(captures: &Captures<'t>) -> &'t str {
    group(captures, 0).unwrap_or_default()
}

/// Escaped macros keep their text without the leading backslash.
fn unescape(matched: &str) -> String {
    matched.replacen('\\', "", 1)
}

/// Replace inline macros with converted nodes.
///
/// Images are resolved against `imagesdir` as web paths. A macro preceded by a
/// backslash is left as literal text without the backslash.
#[must_use]
#[tracing::instrument(level = "trace", skip(document, converter))]
pub fn apply_macros<D, C>(text: &str, document: &D, converter: &C) -> String
where
    D: DocumentContext + ?Sized,
    C: InlineConverter + ?Sized,
{
    let mut text = text.to_string();
    if !text.contains(':') && !text.contains("[[") {
        return text;
    }

    if text.contains("image:") {
        text = replace_images(&text, document, converter);
    }
    if text.contains("://") {
        text = replace_urls(&text, converter);
    }
    if text.contains("link:") || text.contains("mailto:") {
        text = replace_link_macros(&text, converter);
    }
    if text.contains("[[") || text.contains("anchor:") {
        text = replace_anchors(&text, converter);
    }
    text
}

fn replace_images<D, C>(text: &str, document: &D, converter: &C) -> String
where
    D: DocumentContext + ?Sized,
    C: InlineConverter + ?Sized,
{
    INLINE_IMAGE
        .replace_all(text, |captures: &Captures<'_>| {
            let matched = whole(captures);
            if matched.starts_with('\\') {
                return unescape(matched);
            }
            let target = group(captures, 1).unwrap_or_default().trim();
            let attributes = ImageAttributes::parse(group(captures, 2).unwrap_or_default());
            let alt = attributes.alt.unwrap_or_else(|| default_alt(target));
            let src = document
                .path_resolver()
                .web_path(target, document.attribute_str("imagesdir"));
            converter.image(&InlineImage {
                src: &src,
                alt: &alt,
                width: attributes.width.as_deref(),
                height: attributes.height.as_deref(),
            })
        })
        .into_owned()
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ImageAttributes {
    alt: Option<String>,
    width: Option<String>,
    height: Option<String>,
}

impl ImageAttributes {
    /// Positional `alt, width, height`, or the same names as `key=value` pairs.
    fn parse(attrlist: &str) -> Self {
        let mut attributes = Self::default();
        let attrlist = attrlist.replace("\\]", "]");
        let mut position = 0;
        for entry in attrlist.split(',').map(str::trim) {
            if let Some((name, value)) = entry.split_once('=') {
                let value = value.trim().trim_matches('"').to_string();
                match name.trim() {
                    "alt" => attributes.alt = Some(value),
                    "width" => attributes.width = Some(value),
                    "height" => attributes.height = Some(value),
                    _ => {}
                }
                continue;
            }
            if !entry.is_empty() {
                let value = Some(entry.trim_matches('"').to_string());
                match position {
                    0 => attributes.alt = value,
                    1 => attributes.width = value,
                    2 => attributes.height = value,
                    _ => {}
                }
            }
            position += 1;
        }
        attributes
    }
}

/// The file name without directory or extension, with `-` and `_` read as spaces.
fn default_alt(target: &str) -> String {
    let name = target.rsplit('/').next().unwrap_or(target);
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        Some(_) | None => name,
    };
    stem.replace(['-', '_'], " ")
}

fn replace_urls<C: InlineConverter + ?Sized>(text: &str, converter: &C) -> String {
    URL.replace_all(text, |captures: &Captures<'_>| {
        let prefix = group(captures, 1).unwrap_or_default();
        let target = group(captures, 2).unwrap_or_default();
        if target.starts_with('\\') {
            let rest = whole(captures).get(prefix.len()..).unwrap_or_default();
            return format!("{prefix}{}", unescape(rest));
        }

        let mut prefix = if prefix == "link:" { "" } else { prefix };
        let mut target = target;
        let mut suffix = "";
        let text = group(captures, 3);
        if prefix == "&lt;"
            && let Some(stripped) = target.strip_suffix("&gt;")
        {
            prefix = "";
            target = stripped;
        }
        if text.is_none()
            && let Some(stripped) = target.strip_suffix(')')
        {
            target = stripped;
            suffix = ")";
        }

        let link = match text.map(|text| text.replace("\\]", "]")) {
            Some(text) if !text.is_empty() => converter.link(target, &text, false),
            Some(_) | None => converter.link(target, target, true),
        };
        format!("{prefix}{link}{suffix}")
    })
    .into_owned()
}

fn replace_link_macros<C: InlineConverter + ?Sized>(text: &str, converter: &C) -> String {
    LINK_MACRO
        .replace_all(text, |captures: &Captures<'_>| {
            let matched = whole(captures);
            if matched.starts_with('\\') {
                return unescape(matched);
            }
            let scheme = group(captures, 1).unwrap_or_default();
            let path = group(captures, 2).unwrap_or_default();
            let target = if scheme == "mailto" {
                format!("mailto:{path}")
            } else {
                path.to_string()
            };
            let text = group(captures, 3).unwrap_or_default().replace("\\]", "]");
            if text.is_empty() {
                converter.link(&target, path, true)
            } else {
                converter.link(&target, &text, false)
            }
        })
        .into_owned()
}

fn replace_anchors<C: InlineConverter + ?Sized>(text: &str, converter: &C) -> String {
    INLINE_ANCHOR
        .replace_all(text, |captures: &Captures<'_>| {
            let matched = whole(captures);
            if matched.starts_with('\\') {
                return unescape(matched);
            }
            let id = group(captures, 1)
                .or_else(|| group(captures, 3))
                .unwrap_or_default();
            let reftext = group(captures, 2).or_else(|| group(captures, 4));
            converter.anchor(id, reftext)
        })
        .into_owned()
}
