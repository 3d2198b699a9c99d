//! Quoted text: strong, emphasis, monospaced, mark, curved quotes, super- and subscript.
//!
//! Rules are tried in table order and each one rewrites the whole text before the next
//! runs. Unconstrained forms (`**`, ` `` `, `__`, `##`) come before their constrained
//! counterparts so a constrained rule never re-matches the inside of a span an
//! unconstrained rule already claimed.
//!
//! A constrained span must not be preceded by a word character (or `;`, `:`, `}`) and
//! must not be followed by a word character. Both checks are done by hand, the closing
//! delimiter search walks every candidate in order the way a lazy regex would backtrack.

use std::ops::Range;

use serde::Serialize;

use super::converter::{InlineConverter, QuoteAttributes, QuoteKind};

/// Surrounds the index of a protected literal. Escaped spans are parked behind these
/// placeholders until every rule has run so a later rule cannot re-match them.
const PLACEHOLDER_MARK: char = '\u{E000}';
const PLACEHOLDER_LITERAL: &str = "\u{E000}";

const QUOTE_CHARS: [char; 8] = ['*', '_', '`', '#', '^', '~', '"', '\''];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Content {
    /// `(.+?)`: anything, newlines included.
    Any,
    /// `(\S|\S.*?\S)`: starts and ends with a non-space character.
    Bounded,
    /// `(\S+?)`: no whitespace at all.
    NoSpaces,
}

#[derive(Debug)]
struct QuoteRule {
    kind: QuoteKind,
    constrained: bool,
    open: &'static str,
    close: &'static str,
    content: Content,
    /// Besides word characters, characters that may not precede a constrained span.
    lead_excludes: &'static [char],
    /// Besides word characters, characters that may not follow a constrained span.
    trail_excludes: &'static [char],
}

const DEFAULT_LEAD_EXCLUDES: &[char] = &[';', ':', '}'];

const fn unconstrained(kind: QuoteKind, delimiter: &'static str, content: Content) -> QuoteRule {
    QuoteRule {
        kind,
        constrained: false,
        open: delimiter,
        close: delimiter,
        content,
        lead_excludes: &[],
        trail_excludes: &[],
    }
}

const fn constrained(
    kind: QuoteKind,
    open: &'static str,
    close: &'static str,
    lead_excludes: &'static [char],
    trail_excludes: &'static [char],
) -> QuoteRule {
    QuoteRule {
        kind,
        constrained: true,
        open,
        close,
        content: Content::Bounded,
        lead_excludes,
        trail_excludes,
    }
}

const QUOTE_RULES: &[QuoteRule] = &[
    unconstrained(QuoteKind::Strong, "**", Content::Any),
    constrained(QuoteKind::Strong, "*", "*", DEFAULT_LEAD_EXCLUDES, &[]),
    constrained(QuoteKind::Double, "\"`", "`\"", DEFAULT_LEAD_EXCLUDES, &[]),
    constrained(QuoteKind::Single, "'`", "`'", &[';', ':', '`', '}'], &[]),
    unconstrained(QuoteKind::Monospaced, "``", Content::Any),
    constrained(
        QuoteKind::Monospaced,
        "`",
        "`",
        &[';', ':', '"', '\'', '`', '}'],
        &['"', '\'', '`'],
    ),
    unconstrained(QuoteKind::Emphasis, "__", Content::Any),
    constrained(QuoteKind::Emphasis, "_", "_", DEFAULT_LEAD_EXCLUDES, &[]),
    unconstrained(QuoteKind::Mark, "##", Content::Any),
    constrained(QuoteKind::Mark, "#", "#", DEFAULT_LEAD_EXCLUDES, &[]),
    unconstrained(QuoteKind::Superscript, "^", Content::NoSpaces),
    unconstrained(QuoteKind::Subscript, "~", Content::NoSpaces),
];

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn slice(text: &str, range: Range<usize>) -> &str {
    text.get(range).unwrap_or_default()
}

/// The first quoted span found by the quote rules, in rule order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuoteMatch<'a> {
    pub kind: QuoteKind,
    pub constrained: bool,
    /// The span was preceded by a backslash and is left unrendered.
    pub escaped: bool,
    /// Text before the attribute list or opening delimiter, without the escaping
    /// backslash. For constrained spans this includes the boundary character.
    pub prefix: &'a str,
    /// The bracketed attribute list before the opening delimiter, without brackets.
    pub attributes: Option<&'a str>,
    pub content: &'a str,
    /// Byte range of the whole match, boundary character and escape included.
    pub range: Range<usize>,
}

#[derive(Debug)]
struct RawMatch<'t> {
    start: usize,
    end: usize,
    /// Where the attribute list or the opening delimiter starts.
    open_start: usize,
    /// The boundary character a constrained span consumed, if any.
    lead: &'t str,
    escaped: bool,
    attributes: Option<&'t str>,
    content: &'t str,
}

impl QuoteRule {
    fn match_at<'t>(&self, text: &'t str, start: usize) -> Option<RawMatch<'t>> {
        let rest = text.get(start..)?;
        if self.constrained {
            let line_start = start == 0 || slice(text, 0..start).ends_with('\n');
            if line_start && let Some(found) = self.match_open(text, start, start, "") {
                return Some(found);
            }
            let lead = rest.chars().next()?;
            if is_word(lead) || self.lead_excludes.contains(&lead) {
                return None;
            }
            let open_start = start + lead.len_utf8();
            self.match_open(text, start, open_start, slice(text, start..open_start))
        } else if rest.starts_with('\\') {
            self.match_open(text, start, start + 1, "\\")
        } else {
            self.match_open(text, start, start, "")
        }
    }

    /// Match the optional attribute list, the delimiters and the content starting at
    /// `open_start`.
    fn match_open<'t>(
        &self,
        text: &'t str,
        start: usize,
        open_start: usize,
        lead: &'t str,
    ) -> Option<RawMatch<'t>> {
        let mut delimiter_start = open_start;
        let mut attributes = None;
        let after = text.get(open_start..)?;
        if let Some(inner) = after.strip_prefix('[') {
            let close = inner.find(']').filter(|close| *close > 0)?;
            attributes = inner.get(..close);
            delimiter_start = open_start + 1 + close + 1;
        }
        if !slice(text, delimiter_start..text.len()).starts_with(self.open) {
            return None;
        }
        let content_start = delimiter_start + self.open.len();
        let content_end = self.find_close(text, content_start)?;
        Some(RawMatch {
            start,
            end: content_end + self.close.len(),
            open_start,
            lead,
            escaped: lead == "\\",
            attributes,
            content: slice(text, content_start..content_end),
        })
    }

    /// Find where the content ends, i.e. where an acceptable closing delimiter starts.
    fn find_close(&self, text: &str, content_start: usize) -> Option<usize> {
        let body = text.get(content_start..)?;
        let first = body.chars().next()?;
        if self.content != Content::Any && first.is_whitespace() {
            return None;
        }
        let mut offset = first.len_utf8();

        match self.content {
            Content::Any => body
                .get(offset..)?
                .find(self.close)
                .map(|found| content_start + offset + found),
            Content::NoSpaces => {
                while let Some(rest) = body.get(offset..) {
                    if rest.starts_with(self.close) {
                        return Some(content_start + offset);
                    }
                    let c = rest.chars().next()?;
                    if c.is_whitespace() {
                        return None;
                    }
                    offset += c.len_utf8();
                }
                None
            }
            Content::Bounded => {
                while let Some(found) = body.get(offset..).and_then(|rest| rest.find(self.close)) {
                    let close_at = offset + found;
                    let before_ok = slice(body, 0..close_at)
                        .chars()
                        .next_back()
                        .is_some_and(|c| !c.is_whitespace());
                    let after_ok = slice(body, close_at + self.close.len()..body.len())
                        .chars()
                        .next()
                        .is_none_or(|c| !is_word(c) && !self.trail_excludes.contains(&c));
                    if before_ok && after_ok {
                        return Some(content_start + close_at);
                    }
                    offset = close_at
                        + slice(body, close_at..body.len())
                            .chars()
                            .next()
                            .map_or(1, char::len_utf8);
                }
                None
            }
        }
    }

    /// The leftmost match at or after `from`.
    fn find<'t>(&self, text: &'t str, from: usize) -> Option<RawMatch<'t>> {
        text.get(from..)?
            .char_indices()
            .find_map(|(offset, _)| self.match_at(text, from + offset))
    }

    fn replace_all<C: InlineConverter + ?Sized>(
        &self,
        text: &str,
        converter: &C,
        protected: &mut Vec<String>,
    ) -> String {
        let mut result = String::with_capacity(text.len());
        let mut last = 0;
        while let Some(found) = self.find(text, last) {
            result.push_str(slice(text, last..found.start));
            result.push_str(&self.render(text, &found, converter, protected));
            last = found.end;
        }
        result.push_str(slice(text, last..text.len()));
        result
    }

    fn render<C: InlineConverter + ?Sized>(
        &self,
        text: &str,
        found: &RawMatch<'_>,
        converter: &C,
        protected: &mut Vec<String>,
    ) -> String {
        if found.escaped {
            if self.constrained
                && let Some(attrlist) = found.attributes
            {
                let literal = protect(protected, format!("[{attrlist}]"));
                let quoted = converter.quoted(self.kind, found.content, &QuoteAttributes::default());
                return format!("{literal}{quoted}");
            }
            return protect(protected, slice(text, found.open_start..found.end).to_string());
        }

        let (kind, attributes) = match found.attributes {
            Some(attrlist) => {
                let kind = if self.kind == QuoteKind::Mark {
                    QuoteKind::Unquoted
                } else {
                    self.kind
                };
                (kind, QuoteAttributes::parse(attrlist))
            }
            None => (self.kind, QuoteAttributes::default()),
        };
        format!(
            "{}{}",
            found.lead,
            converter.quoted(kind, found.content, &attributes)
        )
    }
}

fn protect(protected: &mut Vec<String>, literal: String) -> String {
    let placeholder = format!("{PLACEHOLDER_MARK}{}{PLACEHOLDER_MARK}", protected.len());
    protected.push(literal);
    placeholder
}

/// Park every mark already present in the input, so that each mark left in the
/// text afterwards opens a placeholder.
fn protect_marks(text: &str, protected: &mut Vec<String>) -> String {
    if !text.contains(PLACEHOLDER_MARK) {
        return text.to_string();
    }
    text.chars().fold(String::with_capacity(text.len()), |mut out, c| {
        if c == PLACEHOLDER_MARK {
            out.push_str(&protect(protected, PLACEHOLDER_LITERAL.to_string()));
        } else {
            out.push(c);
        }
        out
    })
}

/// Swap placeholders back for their literals, scanning left to right. A literal
/// can hold placeholders parked before it, which are restored in turn.
fn restore(text: &str, protected: &[String]) -> String {
    let mut restored = String::with_capacity(text.len());
    let mut rest = text;
    while let Some((before, after)) = rest.split_once(PLACEHOLDER_MARK) {
        restored.push_str(before);
        let Some((index, tail)) = after.split_once(PLACEHOLDER_MARK) else {
            restored.push(PLACEHOLDER_MARK);
            rest = after;
            continue;
        };
        match index.parse::<usize>().ok().and_then(|index| protected.get(index)) {
            Some(literal) if literal == PLACEHOLDER_LITERAL => restored.push_str(literal),
            Some(literal) => restored.push_str(&restore(literal, protected)),
            None => {
                restored.push(PLACEHOLDER_MARK);
                restored.push_str(index);
                restored.push(PLACEHOLDER_MARK);
            }
        }
        rest = tail;
    }
    restored.push_str(rest);
    restored
}

/// Find the first quoted span, trying the rules in table order.
#[must_use]
pub fn find_quote(text: &str) -> Option<QuoteMatch<'_>> {
    QUOTE_RULES.iter().find_map(|rule| {
        let found = rule.find(text, 0)?;
        let prefix_end = if found.escaped {
            found.open_start - 1
        } else {
            found.open_start
        };
        Some(QuoteMatch {
            kind: rule.kind,
            constrained: rule.constrained,
            escaped: found.escaped,
            prefix: slice(text, 0..prefix_end),
            attributes: found.attributes,
            content: found.content,
            range: found.start..found.end,
        })
    })
}

/// Render every quoted span in `text`.
///
/// A span preceded by a backslash loses the backslash and is otherwise left as is.
#[must_use]
#[tracing::instrument(level = "trace", skip(converter))]
pub fn apply_quotes<C: InlineConverter + ?Sized>(text: &str, converter: &C) -> String {
    if !text.contains(QUOTE_CHARS) {
        return text.to_string();
    }
    let mut protected = Vec::new();
    let mut result = protect_marks(text, &mut protected);
    for rule in QUOTE_RULES {
        if result.contains(rule.open) {
            result = rule.replace_all(&result, converter, &mut protected);
        }
    }
    restore(&result, &protected)
}
