//! Rendering of inline nodes produced by substitutions.

use std::fmt::Write as _;

use serde::Serialize;

/// The kind of a quoted span.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteKind {
    Strong,
    Emphasis,
    Monospaced,
    Mark,
    Superscript,
    Subscript,
    /// `"`curved double quotes`"`
    Double,
    /// `'`curved single quotes`'`
    Single,
    /// A mark span with an attribute list: rendered as a generic styled span.
    Unquoted,
}

/// The parsed attribute list of a quoted span (`[#id.role1.role2]` or `[role]`).
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct QuoteAttributes {
    pub id: Option<String>,
    pub roles: Vec<String>,
}

impl QuoteAttributes {
    /// Parse an attribute list. Only the first positional attribute is considered.
    #[must_use]
    pub fn parse(attrlist: &str) -> Self {
        let first = attrlist.split(',').next().unwrap_or_default().trim();
        if first.is_empty() {
            return Self::default();
        }
        if !first.starts_with(['.', '#']) {
            return Self {
                id: None,
                roles: vec![first.to_string()],
            };
        }

        let (roles_part, id_part) = match first.split_once('#') {
            Some((roles, id)) => (roles, Some(id)),
            None => (first, None),
        };
        let mut roles: Vec<String> = roles_part
            .split('.')
            .filter(|role| !role.is_empty())
            .map(ToString::to_string)
            .collect();
        let id = id_part.and_then(|rest| {
            let mut parts = rest.split('.');
            let id = parts.next().filter(|id| !id.is_empty()).map(ToString::to_string);
            roles.extend(
                parts
                    .filter(|role| !role.is_empty())
                    .map(ToString::to_string),
            );
            id
        });
        Self { id, roles }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.roles.is_empty()
    }

    /// Space-separated roles, if any.
    #[must_use]
    pub fn role(&self) -> Option<String> {
        if self.roles.is_empty() {
            None
        } else {
            Some(self.roles.join(" "))
        }
    }
}

/// An inline image reference after its target has been resolved.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InlineImage<'a> {
    pub src: &'a str,
    pub alt: &'a str,
    pub width: Option<&'a str>,
    pub height: Option<&'a str>,
}

/// Turns inline nodes into output text.
///
/// Substitutions decide *what* is recognized; the converter decides how it looks.
pub trait InlineConverter {
    fn quoted(&self, kind: QuoteKind, text: &str, attributes: &QuoteAttributes) -> String;

    fn anchor(&self, id: &str, reftext: Option<&str>) -> String;

    /// A hyperlink. `bare` is set when the link text is the target itself.
    fn link(&self, target: &str, text: &str, bare: bool) -> String;

    fn image(&self, image: &InlineImage<'_>) -> String;

    /// A line that ends with a hard line break.
    fn line_break(&self, line: &str) -> String;

    fn callout(&self, number: &str) -> String;
}

/// HTML5 output, matching asciidoctor's inline markup.
#[derive(Clone, Copy, Debug, Default)]
pub struct Html5Converter;

impl Html5Converter {
    /// Opening text, closing text and whether the pair is an element.
    fn quote_tags(kind: QuoteKind) -> (&'static str, &'static str, bool) {
        match kind {
            QuoteKind::Strong => ("<strong>", "</strong>", true),
            QuoteKind::Emphasis => ("<em>", "</em>", true),
            QuoteKind::Monospaced => ("<code>", "</code>", true),
            QuoteKind::Mark => ("<mark>", "</mark>", true),
            QuoteKind::Superscript => ("<sup>", "</sup>", true),
            QuoteKind::Subscript => ("<sub>", "</sub>", true),
            QuoteKind::Double => ("&#8220;", "&#8221;", false),
            QuoteKind::Single => ("&#8216;", "&#8217;", false),
            QuoteKind::Unquoted => ("", "", false),
        }
    }
}

impl InlineConverter for Html5Converter {
    fn quoted(&self, kind: QuoteKind, text: &str, attributes: &QuoteAttributes) -> String {
        let (open, close, is_element) = Self::quote_tags(kind);
        if attributes.is_empty() {
            return format!("{open}{text}{close}");
        }

        let mut attrs = String::new();
        if let Some(id) = &attributes.id {
            let _ = write!(attrs, " id=\"{id}\"");
        }
        if let Some(role) = attributes.role() {
            let _ = write!(attrs, " class=\"{role}\"");
        }

        match open.strip_suffix('>') {
            Some(tag) if is_element => format!("{tag}{attrs}>{text}{close}"),
            Some(_) | None => format!("<span{attrs}>{open}{text}{close}</span>"),
        }
    }

    fn anchor(&self, id: &str, _reftext: Option<&str>) -> String {
        format!("<a id=\"{id}\"></a>")
    }

    fn link(&self, target: &str, text: &str, bare: bool) -> String {
        if bare {
            format!("<a href=\"{target}\" class=\"bare\">{text}</a>")
        } else {
            format!("<a href=\"{target}\">{text}</a>")
        }
    }

    fn image(&self, image: &InlineImage<'_>) -> String {
        let mut img = format!("<img src=\"{}\" alt=\"{}\"", image.src, image.alt);
        if let Some(width) = image.width {
            let _ = write!(img, " width=\"{width}\"");
        }
        if let Some(height) = image.height {
            let _ = write!(img, " height=\"{height}\"");
        }
        format!("<span class=\"image\">{img}></span>")
    }

    fn line_break(&self, line: &str) -> String {
        format!("{line}<br>")
    }

    fn callout(&self, number: &str) -> String {
        format!("<b class=\"conum\">({number})</b>")
    }
}
