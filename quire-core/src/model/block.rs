use serde::Serialize;

use crate::model::DocumentContext;

/// A non-section block: the parts of it that captioning cares about.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BlockNode {
    /// `example`, `table`, `listing`, `image`, ...
    pub context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl BlockNode {
    #[must_use]
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// The key used to look up `<key>-caption` and `<key>-number`. Images are
    /// captioned as figures.
    #[must_use]
    pub fn caption_key(&self) -> &str {
        match self.context.as_str() {
            "image" => "figure",
            context => context,
        }
    }

    #[must_use]
    pub fn captioned_title(&self) -> Option<String> {
        self.title.as_ref().map(|title| match &self.caption {
            Some(caption) => format!("{caption}{title}"),
            None => title.clone(),
        })
    }

    /// Give this block a caption if it has a title but no caption yet.
    ///
    /// An explicit `caption` wins, then the document's `caption` attribute. Otherwise
    /// the `<key>-caption` attribute is combined with the next value of the
    /// `<key>-number` counter (`"Table 2. "`). Without any of these the block stays
    /// uncaptioned and no counter is consumed.
    pub fn assign_caption<D: DocumentContext + ?Sized>(
        &mut self,
        caption: Option<&str>,
        key: Option<&str>,
        document: &mut D,
    ) {
        if self.caption.is_some() || self.title.is_none() {
            return;
        }
        if let Some(caption) = caption.or_else(|| document.attribute_str("caption")) {
            self.caption = Some(caption.to_string());
            return;
        }
        let key = key.unwrap_or_else(|| self.caption_key()).to_string();
        let Some(label) = document
            .attribute_str(&format!("{key}-caption"))
            .map(ToString::to_string)
        else {
            return;
        };
        let number = document.counter(&format!("{key}-number"), "1");
        self.caption = Some(format!("{label} {number}. "));
    }
}
