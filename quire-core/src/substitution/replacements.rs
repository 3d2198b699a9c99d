//! Character-level substitutions: special characters, typographic replacements, hard
//! line breaks and callout markers.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::converter::InlineConverter;

/// How much of a replacement match is kept around the replacement text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Restore {
    /// Replace the whole match.
    None,
    /// Keep the first group in front of the replacement.
    Leading,
    /// Keep the first group in front and the second group behind.
    Bounding,
}

/// The character after the match must be of this class. Stands in for a lookahead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Followed {
    Any,
    Word,
    Alphabetic,
}

impl Followed {
    fn accepts(self, next: Option<char>) -> bool {
        match self {
            Self::Any => true,
            Self::Word => next.is_some_and(|c| c.is_alphanumeric() || c == '_'),
            Self::Alphabetic => next.is_some_and(char::is_alphabetic),
        }
    }
}

struct Replacement {
    pattern: Regex,
    text: &'static str,
    restore: Restore,
    followed: Followed,
}

#[allow(clippy::expect_used)]
fn replacement(
    pattern: &str,
    text: &'static str,
    restore: Restore,
    followed: Followed,
) -> Replacement {
    Replacement {
        pattern: Regex::new(pattern).expect("replacement pattern must compile"),
        text,
        restore,
        followed,
    }
}

static REPLACEMENTS: LazyLock<Vec<Replacement>> = LazyLock::new(|| {
    vec![
        // (C) (R) (TM)
        replacement(r"\\?\(C\)", "&#169;", Restore::None, Followed::Any),
        replacement(r"\\?\(R\)", "&#174;", Restore::None, Followed::Any),
        replacement(r"\\?\(TM\)", "&#8482;", Restore::None, Followed::Any),
        // foo -- bar, either space can be a line boundary
        replacement(
            r"(?m)(^|\n| |\\)--( |\n|$)",
            "&#8201;&#8212;&#8201;",
            Restore::None,
            Followed::Any,
        ),
        // foo--bar
        replacement(r"(\w)\\?--", "&#8212;&#8203;", Restore::Leading, Followed::Word),
        replacement(r"\\?\.\.\.", "&#8230;&#8203;", Restore::None, Followed::Any),
        replacement(r"\\?`'", "&#8217;", Restore::None, Followed::Any),
        // apostrophe inside a word
        replacement(
            r"([\p{Alphabetic}\p{Nd}])\\?'",
            "&#8217;",
            Restore::Leading,
            Followed::Alphabetic,
        ),
        replacement(r"\\?-&gt;", "&#8594;", Restore::None, Followed::Any),
        replacement(r"\\?=&gt;", "&#8658;", Restore::None, Followed::Any),
        replacement(r"\\?&lt;-", "&#8592;", Restore::None, Followed::Any),
        replacement(r"\\?&lt;=", "&#8656;", Restore::None, Followed::Any),
        // entity references escaped by the special characters pass
        replacement(
            r"\\?(&)amp;((?:[a-zA-Z][a-zA-Z]+\d{0,2}|#\d\d\d{0,4}|#x[\da-fA-F][\da-fA-F][\da-fA-F]{0,3});)",
            "",
            Restore::Bounding,
            Followed::Any,
        ),
    ]
});

#[allow(clippy::expect_used)]
static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(.*)[ \t]\+$").expect("line break pattern must compile")
});

#[allow(clippy::expect_used)]
static CALLOUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:(?://|#|--|;;) ?)?(\\)?&lt;(?:!--(\d+)--|(\d+))&gt;")
        .expect("callout pattern must compile")
});

/// Escape `&`, `<` and `>`.
#[must_use]
pub fn apply_special_characters(text: &str) -> String {
    if !text.contains(['&', '<', '>']) {
        return text.to_string();
    }
    let mut result = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            c => result.push(c),
        }
    }
    result
}

fn group<'t>(captures: &Captures<'t>, index: usize) -> &'t str {
    captures.get(index).map_or("", |m| m.as_str())
}

impl Replacement {
    fn apply(&self, text: &str) -> String {
        let mut result = String::with_capacity(text.len());
        let mut last = 0;
        for captures in self.pattern.captures_iter(text) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            let next = text.get(whole.end()..).and_then(|rest| rest.chars().next());
            if !self.followed.accepts(next) {
                continue;
            }
            result.push_str(text.get(last..whole.start()).unwrap_or_default());
            let matched = whole.as_str();
            if matched.contains('\\') {
                result.push_str(&matched.replace('\\', ""));
            } else {
                match self.restore {
                    Restore::None => result.push_str(self.text),
                    Restore::Leading => {
                        result.push_str(group(&captures, 1));
                        result.push_str(self.text);
                    }
                    Restore::Bounding => {
                        result.push_str(group(&captures, 1));
                        result.push_str(self.text);
                        result.push_str(group(&captures, 2));
                    }
                }
            }
            last = whole.end();
        }
        result.push_str(text.get(last..).unwrap_or_default());
        result
    }
}

/// Typographic replacements: symbols, dashes, ellipses, curved apostrophes, arrows, and
/// restoring entity references. A leading backslash keeps the literal text.
#[must_use]
pub fn apply_replacements(text: &str) -> String {
    REPLACEMENTS
        .iter()
        .fold(text.to_string(), |text, replacement| replacement.apply(&text))
}

/// Hard line breaks.
///
/// With `hardbreaks` every line but the last becomes a hard break (a trailing ` +` is
/// dropped). Otherwise only lines that end with ` +` do.
#[must_use]
pub fn apply_post_replacements<C: InlineConverter + ?Sized>(
    text: &str,
    converter: &C,
    hardbreaks: bool,
) -> String {
    if hardbreaks {
        let lines: Vec<&str> = text.split('\n').collect();
        let Some((last, lines)) = lines.split_last() else {
            return text.to_string();
        };
        if lines.is_empty() {
            return text.to_string();
        }
        let mut result: Vec<String> = lines
            .iter()
            .map(|&line| converter.line_break(line.strip_suffix(" +").unwrap_or(line)))
            .collect();
        result.push((*last).to_string());
        return result.join("\n");
    }
    if !text.contains(" +") {
        return text.to_string();
    }
    LINE_BREAK
        .replace_all(text, |captures: &Captures<'_>| {
            converter.line_break(group(captures, 1))
        })
        .into_owned()
}

/// Callout markers (`<1>`, `// <2>`, `<!--3-->`) at the end of verbatim lines.
///
/// Only markers in the trailing run of a line are converted. An escaped marker keeps
/// its literal text without the backslash.
#[must_use]
pub fn apply_callouts<C: InlineConverter + ?Sized>(text: &str, converter: &C) -> String {
    if !text.contains("&lt;") {
        return text.to_string();
    }
    text.split('\n')
        .map(|line| convert_line_callouts(line, converter))
        .collect::<Vec<_>>()
        .join("\n")
}

fn convert_line_callouts<C: InlineConverter + ?Sized>(line: &str, converter: &C) -> String {
    let matches: Vec<Captures<'_>> = CALLOUT.captures_iter(line).collect();

    // Walk backwards from the end of the line while markers are adjacent.
    let mut boundary = line.len();
    let mut first_trailing = matches.len();
    for (index, captures) in matches.iter().enumerate().rev() {
        let Some(whole) = captures.get(0) else {
            break;
        };
        let gap = line.get(whole.end()..boundary).unwrap_or_default();
        let adjacent = if boundary == line.len() {
            gap.is_empty()
        } else {
            gap.is_empty() || gap == " "
        };
        if !adjacent {
            break;
        }
        boundary = whole.start();
        first_trailing = index;
    }

    let mut result = String::with_capacity(line.len());
    let mut last = 0;
    for captures in matches.iter().skip(first_trailing) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        result.push_str(line.get(last..whole.start()).unwrap_or_default());
        if captures.get(1).is_some() {
            result.push_str(&whole.as_str().replacen('\\', "", 1));
        } else {
            let number = captures
                .get(2)
                .or_else(|| captures.get(3))
                .map_or("", |m| m.as_str());
            result.push_str(&converter.callout(number));
        }
        last = whole.end();
    }
    result.push_str(line.get(last..).unwrap_or_default());
    result
}
