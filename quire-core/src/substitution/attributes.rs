use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::{AttributeValue, DocumentContext};

#[allow(clippy::expect_used)]
static ATTRIBUTE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\\)?\{((\w[\w-]*)|(counter2?):(.*?))(\\)?\}")
        .expect("attribute reference pattern must compile")
});

/// Attributes every document can reference without defining them.
const INTRINSIC_ATTRIBUTES: &[(&str, &str)] = &[
    ("startsb", "["),
    ("endsb", "]"),
    ("vbar", "|"),
    ("caret", "^"),
    ("asterisk", "*"),
    ("tilde", "~"),
    ("plus", "&#43;"),
    ("backslash", "\\"),
    ("backtick", "`"),
    ("blank", ""),
    ("empty", ""),
    ("sp", " "),
    ("two-colons", "::"),
    ("two-semicolons", ";;"),
    ("nbsp", "&#160;"),
    ("deg", "&#176;"),
    ("zwsp", "&#8203;"),
    ("wj", "&#8288;"),
    ("apos", "&#39;"),
    ("quot", "&#34;"),
    ("lsquo", "&#8216;"),
    ("rsquo", "&#8217;"),
    ("ldquo", "&#8220;"),
    ("rdquo", "&#8221;"),
    ("brvbar", "&#166;"),
    ("pp", "&#43;&#43;"),
    ("cpp", "C++"),
    ("amp", "&"),
    ("lt", "<"),
    ("gt", ">"),
];

/// What to do with a reference to an attribute that is not set (`attribute-missing`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AttributeMissing {
    /// Leave the reference in place.
    Skip,
    /// Remove the reference, and the line if nothing else is left on it.
    Drop,
    /// Remove the whole line.
    DropLine,
    /// Leave the reference in place and log a warning.
    Warn,
}

impl AttributeMissing {
    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("drop") => Self::Drop,
            Some("drop-line") => Self::DropLine,
            Some("warn") => Self::Warn,
            Some(_) | None => Self::Skip,
        }
    }
}

#[derive(Default)]
struct LineState {
    reject: bool,
    reject_if_empty: bool,
}

/// Replace attribute references (`{name}`) with attribute values.
///
/// `{counter:name}` and `{counter:name:seed}` advance a document counter and insert
/// its new value, `{counter2:name}` advances it silently. A reference with a
/// backslash before either brace is left as literal text without the backslash.
#[must_use]
#[tracing::instrument(level = "trace", skip(document))]
pub fn apply_attributes<D: DocumentContext + ?Sized>(text: &str, document: &mut D) -> String {
    if !text.contains('{') {
        return text.to_string();
    }
    let policy = AttributeMissing::parse(document.attribute_str("attribute-missing"));

    let mut lines = Vec::new();
    for line in text.split('\n') {
        if !line.contains('{') {
            lines.push(line.to_string());
            continue;
        }
        let mut state = LineState::default();
        let substituted = ATTRIBUTE_REFERENCE
            .replace_all(line, |captures: &Captures<'_>| {
                resolve_reference(captures, document, policy, &mut state)
            })
            .into_owned();
        if state.reject || (state.reject_if_empty && substituted.is_empty()) {
            continue;
        }
        lines.push(substituted);
    }
    lines.join("\n")
}

fn resolve_reference<D: DocumentContext + ?Sized>(
    captures: &Captures<'_>,
    document: &mut D,
    policy: AttributeMissing,
    state: &mut LineState,
) -> String {
    let reference = captures.get(2).map_or("", |m| m.as_str());
    if captures.get(1).is_some() || captures.get(6).is_some() {
        return format!("{{{reference}}}");
    }

    if let Some(directive) = captures.get(4) {
        let expression = captures.get(5).map_or("", |m| m.as_str());
        let mut args = expression.splitn(2, ':');
        let name = args.next().unwrap_or_default();
        let seed = args.next().filter(|seed| !seed.is_empty()).unwrap_or("1");
        let value = document.counter(name, seed);
        if directive.as_str() == "counter2" {
            state.reject_if_empty = true;
            return String::new();
        }
        return value.to_string();
    }

    let name = reference.to_lowercase();
    match document.attribute(&name) {
        Some(AttributeValue::String(value)) => return value.clone(),
        Some(AttributeValue::Bool(true)) => return String::new(),
        Some(AttributeValue::Bool(false)) | None => {}
    }
    if let Some((_, value)) = INTRINSIC_ATTRIBUTES.iter().find(|(key, _)| *key == name) {
        return (*value).to_string();
    }

    let whole = captures.get(0).map_or("", |m| m.as_str()).to_string();
    match policy {
        AttributeMissing::Skip => whole,
        AttributeMissing::Warn => {
            tracing::warn!(attribute = %name, "skipping reference to missing attribute");
            whole
        }
        AttributeMissing::DropLine => {
            tracing::warn!(attribute = %name, "dropping line containing reference to missing attribute");
            state.reject = true;
            String::new()
        }
        AttributeMissing::Drop => {
            state.reject_if_empty = true;
            String::new()
        }
    }
}
