use crate::{AttributeValue, Doctype, DocumentAttributes, SafeMode};

#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct Options {
    pub safe_mode: SafeMode,
    pub doctype: Doctype,
    pub document_attributes: DocumentAttributes,
    /// Directory that relative document paths are resolved against. In safe mode
    /// this directory is also the jail. Defaults to the working directory.
    pub base_dir: Option<String>,
    /// Working directory of the path resolver. Defaults to the process's current
    /// directory.
    pub working_dir: Option<String>,
    /// File separator used to recognize absolute system paths. Defaults to the host's.
    pub file_separator: Option<char>,
    /// Turn every line break in normal content into a hard break.
    pub hardbreaks: bool,
}

impl Options {
    /// Create a new `OptionsBuilder` for fluent configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use quire_core::{Doctype, Options, SafeMode};
    ///
    /// let options = Options::builder()
    ///     .with_safe_mode(SafeMode::Safe)
    ///     .with_doctype(Doctype::Book)
    ///     .with_attribute("sectnums", true)
    ///     .build();
    /// ```
    #[must_use]
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    /// Create a new `Options` with default settings.
    ///
    /// Equivalent to `Options::default()`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new `Options` with the given document attributes.
    #[must_use]
    pub fn with_attributes(document_attributes: DocumentAttributes) -> Self {
        Self {
            document_attributes,
            ..Default::default()
        }
    }
}

/// Builder for `Options`.
///
/// Create an `OptionsBuilder` using `Options::builder()`.
///
/// # Example
///
/// ```
/// use quire_core::Options;
///
/// let options = Options::builder()
///     .with_base_dir("/srv/docs")
///     .with_working_dir("/srv/docs")
///     .with_attribute("imagesdir", "images")
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct OptionsBuilder {
    safe_mode: SafeMode,
    doctype: Doctype,
    document_attributes: DocumentAttributes,
    base_dir: Option<String>,
    working_dir: Option<String>,
    file_separator: Option<char>,
    hardbreaks: bool,
}

impl OptionsBuilder {
    /// Set the safe mode used when resolving paths.
    #[must_use]
    pub fn with_safe_mode(mut self, safe_mode: SafeMode) -> Self {
        self.safe_mode = safe_mode;
        self
    }

    #[must_use]
    pub fn with_doctype(mut self, doctype: Doctype) -> Self {
        self.doctype = doctype;
        self
    }

    /// Add a document attribute.
    ///
    /// - `&str` and `String` become `AttributeValue::String`
    /// - `bool` becomes `AttributeValue::Bool`; `false` unsets the attribute
    ///
    /// An attribute that was already added keeps its first value.
    #[must_use]
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.document_attributes.insert(name.into(), value.into());
        self
    }

    /// Set all document attributes at once.
    #[must_use]
    pub fn with_attributes(mut self, document_attributes: DocumentAttributes) -> Self {
        self.document_attributes = document_attributes;
        self
    }

    #[must_use]
    pub fn with_base_dir(mut self, base_dir: impl Into<String>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    #[must_use]
    pub fn with_working_dir(mut self, working_dir: impl Into<String>) -> Self {
        self.working_dir = Some(working_dir.into());
        self
    }

    #[must_use]
    pub fn with_file_separator(mut self, file_separator: char) -> Self {
        self.file_separator = Some(file_separator);
        self
    }

    #[must_use]
    pub fn with_hardbreaks(mut self) -> Self {
        self.hardbreaks = true;
        self
    }

    /// Build the `Options` from this builder.
    #[must_use]
    pub fn build(self) -> Options {
        Options {
            safe_mode: self.safe_mode,
            doctype: self.doctype,
            document_attributes: self.document_attributes,
            base_dir: self.base_dir,
            working_dir: self.working_dir,
            file_separator: self.file_separator,
            hardbreaks: self.hardbreaks,
        }
    }
}
