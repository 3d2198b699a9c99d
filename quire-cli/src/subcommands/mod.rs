use std::{
    fs,
    io::{self, Read},
    path::Path,
};

use anyhow::Context;
use quire_core::{AttributeValue, DocumentAttributes};

pub mod outline;
pub mod resolve;
pub mod subs;

/// Turn `-a` arguments into document attributes.
///
/// `name=value` sets a string, `name` sets the attribute, and `name!` unsets it.
pub(crate) fn build_attributes(values: &[String]) -> DocumentAttributes {
    let mut attributes = DocumentAttributes::default();
    for raw_attr in values {
        let (name, value) = if let Some(stripped) = raw_attr.strip_suffix('!') {
            (stripped.to_string(), AttributeValue::Bool(false))
        } else if let Some((name, value)) = raw_attr.split_once('=') {
            (name.to_string(), AttributeValue::String(value.to_string()))
        } else {
            (raw_attr.clone(), AttributeValue::Bool(true))
        };
        attributes.set(name, value);
    }
    attributes
}

/// Read the whole input file, or stdin when no file is given.
pub(crate) fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut input = String::new();
            io::stdin()
                .lock()
                .read_to_string(&mut input)
                .context("failed to read standard input")?;
            Ok(input)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quire_core::AttributeLookup;

    #[test]
    fn test_build_attributes() {
        let attributes = build_attributes(&[
            "imagesdir=img".to_string(),
            "sectnums".to_string(),
            "idprefix=".to_string(),
            "sectids!".to_string(),
        ]);
        assert_eq!(attributes.attribute_str("imagesdir"), Some("img"));
        assert!(attributes.has_attribute("sectnums"));
        assert_eq!(attributes.attribute_str("idprefix"), Some(""));
        assert!(attributes.contains_key("sectids"));
        assert!(!attributes.has_attribute("sectids"));
    }
}
