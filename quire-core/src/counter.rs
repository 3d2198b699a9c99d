//! Document-wide named counters (`chapter-number`, `appendix-number`, `table-number`,
//! `{counter:name}` references, ...).

use std::fmt;

use rustc_hash::FxHashMap;
use serde::Serialize;

/// The value of a named counter.
///
/// A counter seeded with a number counts numerically, a counter seeded with letters
/// counts alphabetically (`A`, `B`, ..., `Z`, `AA`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CounterValue {
    Numeric(u32),
    Alphabetic(String),
}

impl CounterValue {
    /// Interpret a seed or a stored attribute value.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        value
            .parse()
            .map_or_else(|_| Self::Alphabetic(value.to_string()), Self::Numeric)
    }

    /// The value that follows this one.
    #[must_use]
    pub fn successor(&self) -> Self {
        match self {
            Self::Numeric(n) => Self::Numeric(n.saturating_add(1)),
            Self::Alphabetic(s) => Self::Alphabetic(next_alphabetic(s)),
        }
    }
}

impl fmt::Display for CounterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Alphabetic(s) => write!(f, "{s}"),
        }
    }
}

/// Alphabetic successor with carry: `A` -> `B`, `Z` -> `AA`, `Az` -> `Ba`.
///
/// Characters that are not ASCII letters advance to the next code point.
fn next_alphabetic(value: &str) -> String {
    let mut chars: Vec<char> = value.chars().collect();
    let mut i = chars.len();
    while i > 0 {
        i -= 1;
        let Some(ch) = chars.get_mut(i) else {
            break;
        };
        match *ch {
            'z' => *ch = 'a',
            'Z' => *ch = 'A',
            c if c.is_ascii_alphabetic() => {
                *ch = char::from(u8::try_from(c).map_or(b'a', |b| b + 1));
                return chars.into_iter().collect();
            }
            c => {
                *ch = char::from_u32(u32::from(c) + 1).unwrap_or(c);
                return chars.into_iter().collect();
            }
        }
    }
    // Every letter wrapped around: prepend a new leading letter.
    let lead = match chars.first() {
        Some(c) if c.is_ascii_lowercase() => 'a',
        Some(_) | None => 'A',
    };
    std::iter::once(lead).chain(chars).collect()
}

/// Counters owned by a single document.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Counters(FxHashMap<String, CounterValue>);

impl Counters {
    /// Advance the named counter and return its new value.
    ///
    /// On first use the counter starts at the successor of `preset` (a document
    /// attribute with the same name) if given, else at `seed`.
    pub fn next(&mut self, name: &str, seed: &str, preset: Option<&str>) -> CounterValue {
        let value = match self.0.get(name) {
            Some(current) => current.successor(),
            None => preset.map_or_else(
                || CounterValue::parse(seed),
                |preset| CounterValue::parse(preset).successor(),
            ),
        };
        tracing::trace!(counter = name, %value, "advanced counter");
        self.0.insert(name.to_string(), value.clone());
        value
    }

    #[must_use]
    pub fn current(&self, name: &str) -> Option<&CounterValue> {
        self.0.get(name)
    }

    pub fn reset(&mut self, name: &str) {
        self.0.remove(name);
    }

    /// Put a counter back to a previously observed state. `None` removes it.
    pub fn restore(&mut self, name: &str, value: Option<CounterValue>) {
        match value {
            Some(value) => {
                self.0.insert(name.to_string(), value);
            }
            None => {
                self.0.remove(name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("A", "B")]
    #[case("Y", "Z")]
    #[case("Z", "AA")]
    #[case("AZ", "BA")]
    #[case("ZZ", "AAA")]
    #[case("a", "b")]
    #[case("z", "aa")]
    #[case("9a", "9b")]
    fn test_alphabetic_successor(#[case] value: &str, #[case] expected: &str) {
        assert_eq!(
            CounterValue::Alphabetic(value.to_string()).successor(),
            CounterValue::Alphabetic(expected.to_string())
        );
    }

    #[test]
    fn test_parse_seed() {
        assert_eq!(CounterValue::parse("1"), CounterValue::Numeric(1));
        assert_eq!(CounterValue::parse("10"), CounterValue::Numeric(10));
        assert_eq!(
            CounterValue::parse("A"),
            CounterValue::Alphabetic("A".to_string())
        );
    }

    #[test]
    fn test_counter_starts_at_seed() {
        let mut counters = Counters::default();
        assert_eq!(counters.next("chapter-number", "1", None), CounterValue::Numeric(1));
        assert_eq!(counters.next("chapter-number", "1", None), CounterValue::Numeric(2));
        assert_eq!(
            counters.next("appendix-number", "A", None),
            CounterValue::Alphabetic("A".to_string())
        );
        assert_eq!(
            counters.next("appendix-number", "A", None),
            CounterValue::Alphabetic("B".to_string())
        );
        assert_eq!(counters.current("chapter-number"), Some(&CounterValue::Numeric(2)));
    }

    #[test]
    fn test_counter_continues_from_preset() {
        let mut counters = Counters::default();
        assert_eq!(
            counters.next("chapter-number", "1", Some("4")),
            CounterValue::Numeric(5)
        );
        // The preset only matters on first use.
        assert_eq!(
            counters.next("chapter-number", "1", Some("4")),
            CounterValue::Numeric(6)
        );
    }

    #[test]
    fn test_reset_restarts_counter() {
        let mut counters = Counters::default();
        let _ = counters.next("table-number", "1", None);
        counters.reset("table-number");
        assert_eq!(counters.next("table-number", "1", None), CounterValue::Numeric(1));
    }
}
