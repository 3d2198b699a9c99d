use crate::DocumentContext;

use super::{
    Substitution, apply_attributes, apply_callouts, apply_macros, apply_post_replacements,
    apply_quotes, apply_replacements, apply_special_characters, converter::InlineConverter,
    lookup_set,
};

/// Runs substitutions over block text on behalf of one document.
///
/// Each kind runs exactly once, in the given order, over the output of the previous
/// kind. Counters referenced from the text advance on the document.
pub struct Substitutor<'a, D: ?Sized, C: ?Sized> {
    document: &'a mut D,
    converter: &'a C,
    hardbreaks: bool,
}

impl<'a, D, C> Substitutor<'a, D, C>
where
    D: DocumentContext + ?Sized,
    C: InlineConverter + ?Sized,
{
    /// Hard line breaks are on when the document sets `hardbreaks`.
    pub fn new(document: &'a mut D, converter: &'a C) -> Self {
        let hardbreaks = document.has_attribute("hardbreaks");
        Self {
            document,
            converter,
            hardbreaks,
        }
    }

    /// Turn every line break into a hard break, regardless of the document.
    #[must_use]
    pub fn with_hardbreaks(mut self, hardbreaks: bool) -> Self {
        self.hardbreaks = hardbreaks;
        self
    }

    /// Apply a named substitution set. An unknown name applies nothing.
    pub fn apply_set(&mut self, name: &str, text: &str) -> String {
        self.apply(text, lookup_set(name))
    }

    #[tracing::instrument(level = "trace", skip(self))]
    pub fn apply(&mut self, text: &str, substitutions: &[Substitution]) -> String {
        substitutions
            .iter()
            .fold(text.to_string(), |text, kind| {
                self.apply_substitution(&text, *kind)
            })
    }

    pub fn apply_substitution(&mut self, text: &str, kind: Substitution) -> String {
        match kind {
            Substitution::SpecialCharacters => apply_special_characters(text),
            Substitution::Quotes => apply_quotes(text, self.converter),
            Substitution::Attributes => apply_attributes(text, &mut *self.document),
            Substitution::Replacements => apply_replacements(text),
            Substitution::Macros => apply_macros(text, &*self.document, self.converter),
            Substitution::PostReplacements => {
                apply_post_replacements(text, self.converter, self.hardbreaks)
            }
            Substitution::Callouts => apply_callouts(text, self.converter),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        Document, Options,
        substitution::{Html5Converter, NORMAL, Substitutions, VERBATIM},
    };
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn document() -> Document {
        let options = Options::builder()
            .with_working_dir("/work")
            .with_attribute("product", "Quire")
            .with_attribute("imagesdir", "img")
            .build();
        Document::new(&options).unwrap()
    }

    #[rstest]
    #[case(
        "normal",
        "*{product}* & _friends_ -- see https://example.org",
        "<strong>Quire</strong> &amp; <em>friends</em>&#8201;&#8212;&#8201;see <a href=\"https://example.org\" class=\"bare\">https://example.org</a>"
    )]
    #[case("basic", "*<b>*", "*&lt;b&gt;*")]
    #[case("header", "{product} <1>", "Quire &lt;1&gt;")]
    #[case(
        "verbatim",
        "puts \"{product}\" <1>",
        "puts \"{product}\" <b class=\"conum\">(1)</b>"
    )]
    #[case("pass", "*<raw>* {product}", "*<raw>* {product}")]
    fn test_apply_set(#[case] set: &str, #[case] input: &str, #[case] expected: &str) {
        let mut doc = document();
        let mut substitutor = Substitutor::new(&mut doc, &Html5Converter);
        assert_eq!(substitutor.apply_set(set, input), expected);
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_unknown_set_leaves_text_alone() {
        let mut doc = document();
        let mut substitutor = Substitutor::new(&mut doc, &Html5Converter);
        assert_eq!(substitutor.apply_set("fancy", "*a* & b"), "*a* & b");
        assert!(logs_contain("unknown substitution set"));
    }

    #[test]
    fn test_order_matters() {
        let mut doc = document();
        let mut substitutor = Substitutor::new(&mut doc, &Html5Converter);
        // Attributes before special characters: the inserted value gets escaped.
        let text = "{lt}tag{gt}";
        assert_eq!(
            substitutor.apply(text, &[Substitution::Attributes, Substitution::SpecialCharacters]),
            "&lt;tag&gt;"
        );
        assert_eq!(
            substitutor.apply(text, &[Substitution::SpecialCharacters, Substitution::Attributes]),
            "<tag>"
        );
    }

    #[test]
    fn test_counters_advance_on_the_document() {
        let mut doc = document();
        {
            let mut substitutor = Substitutor::new(&mut doc, &Html5Converter);
            assert_eq!(
                substitutor.apply("Step {counter:step}", NORMAL),
                "Step 1"
            );
            assert_eq!(
                substitutor.apply("Step {counter:step}", NORMAL),
                "Step 2"
            );
        }
        assert_eq!(
            doc.counters().current("step").map(ToString::to_string).as_deref(),
            Some("2")
        );
    }

    #[test]
    fn test_hardbreaks() {
        let mut doc = document();
        let mut substitutor = Substitutor::new(&mut doc, &Html5Converter).with_hardbreaks(true);
        assert_eq!(substitutor.apply("one\ntwo", NORMAL), "one<br>\ntwo");

        let options = Options::builder()
            .with_working_dir("/work")
            .with_hardbreaks()
            .build();
        let mut doc = Document::new(&options).unwrap();
        let mut substitutor = Substitutor::new(&mut doc, &Html5Converter);
        assert_eq!(substitutor.apply("one\ntwo", NORMAL), "one<br>\ntwo");
    }

    #[test]
    fn test_customized_substitutions() {
        let mut doc = document();
        let mut subs = Substitutions::resolve("+quotes", VERBATIM);
        assert!(subs.remove(Substitution::Callouts));
        let mut substitutor = Substitutor::new(&mut doc, &Html5Converter);
        assert_eq!(
            substitutor.apply("*bold* <1>", subs.as_slice()),
            "<strong>bold</strong> &lt;1&gt;"
        );
    }
}
