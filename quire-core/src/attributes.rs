use rustc_hash::FxHashMap;
use serde::Serialize;

/// An `AttributeName` represents the name of an attribute in a document.
pub type AttributeName = String;

/// An `AttributeValue` represents the value of an attribute in a document.
///
/// An attribute value can be a string or a boolean.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// A string attribute value.
    String(String),
    /// A boolean attribute value. `false` means it is unset.
    Bool(bool),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(value) => write!(f, "{value}"),
            Self::Bool(true) => Ok(()),
            Self::Bool(false) => write!(f, "false"),
        }
    }
}

/// Read-only attribute lookup.
///
/// Substitutions and numbering only ever read attributes, so they depend on this
/// trait rather than on a concrete attribute store.
pub trait AttributeLookup {
    /// Raw value of the attribute, including explicitly unset (`false`) values.
    fn attribute(&self, name: &str) -> Option<&AttributeValue>;

    /// Whether the attribute is set. An attribute stored as `false` is unset.
    fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name)
            .is_some_and(|value| !matches!(value, AttributeValue::Bool(false)))
    }

    /// The attribute's text if it holds a string value.
    fn attribute_str(&self, name: &str) -> Option<&str> {
        match self.attribute(name) {
            Some(AttributeValue::String(value)) => Some(value.as_str()),
            Some(AttributeValue::Bool(_)) | None => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DocumentAttributes(
    #[serde(skip_serializing_if = "FxHashMap::is_empty")] FxHashMap<AttributeName, AttributeValue>,
);

impl DocumentAttributes {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Insert an attribute unless one with that name is already present.
    pub fn insert(&mut self, name: AttributeName, value: AttributeValue) {
        self.0.entry(name).or_insert(value);
    }

    /// Set an attribute, replacing any previous value.
    pub fn set(&mut self, name: AttributeName, value: AttributeValue) {
        self.0.insert(name, value);
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.0.remove(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.0.get(name)
    }

    #[must_use]
    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.attribute_str(name)
    }

    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Merge another set of attributes into this one. Values from `other` win.
    pub fn merge(&mut self, other: DocumentAttributes) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AttributeName, &AttributeValue)> {
        self.0.iter()
    }
}

impl AttributeLookup for DocumentAttributes {
    fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.0.get(name)
    }
}

impl FromIterator<(AttributeName, AttributeValue)> for DocumentAttributes {
    fn from_iter<T: IntoIterator<Item = (AttributeName, AttributeValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Create the attributes every document starts with.
///
/// Document-level attributes from the source (or from [`crate::Options`]) always take
/// precedence over these defaults.
///
/// # Default Attributes
///
/// - `appendix-caption`: "Appendix" - Prefix of appendix captions
/// - `example-caption`, `figure-caption`, `table-caption` - Block caption labels
/// - `attribute-missing`: "skip" - Leave unresolved attribute references in place
/// - `sectnumlevels`: "3" - Deepest section level that receives a number
/// - `idprefix` / `idseparator`: "_" - Generated section id format
#[must_use]
pub fn default_attributes() -> DocumentAttributes {
    let mut attrs = DocumentAttributes::default();

    attrs.set("appendix-caption".to_string(), "Appendix".into());
    attrs.set("example-caption".to_string(), "Example".into());
    attrs.set("figure-caption".to_string(), "Figure".into());
    attrs.set("table-caption".to_string(), "Table".into());

    attrs.set("attribute-missing".to_string(), "skip".into());
    attrs.set("sectnumlevels".to_string(), "3".into());

    attrs.set("idprefix".to_string(), "_".into());
    attrs.set("idseparator".to_string(), "_".into());

    attrs
}
