// src/fingerprint/spec.rs

//! Declared inputs and outputs of a task.

use std::path::{Path, PathBuf};

/// Value of a scalar input property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// Property not set. Hashes differently from an empty string.
    Absent,
    Text(String),
    /// Ordered list; element order is significant.
    List(Vec<String>),
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(PropertyValue::Absent)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(value: Vec<String>) -> Self {
        PropertyValue::List(value)
    }
}

/// Everything a task reads.
///
/// `files`, `optional_files` and `directories` are sets: their declaration
/// order never affects the fingerprint. `properties` keep declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSpec {
    pub files: Vec<PathBuf>,
    pub optional_files: Vec<PathBuf>,
    pub directories: Vec<PathBuf>,
    pub properties: Vec<(String, PropertyValue)>,
}

impl InputSpec {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
            && self.optional_files.is_empty()
            && self.directories.is_empty()
            && self.properties.is_empty()
    }

    /// All declared paths, used to detect producer/consumer relationships.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files
            .iter()
            .chain(self.optional_files.iter())
            .chain(self.directories.iter())
            .map(PathBuf::as_path)
    }
}

/// Everything a task produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputSpec {
    pub files: Vec<PathBuf>,
    pub directories: Vec<PathBuf>,
}

impl OutputSpec {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.directories.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files
            .iter()
            .chain(self.directories.iter())
            .map(PathBuf::as_path)
    }

    /// Whether any of our paths is, contains, or lies inside one of `inputs`.
    pub fn feeds(&self, inputs: &InputSpec) -> bool {
        self.paths().any(|out| {
            inputs
                .paths()
                .any(|input| input.starts_with(out) || out.starts_with(input))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outputs_feed_inputs_inside_declared_directory() {
        let outputs = OutputSpec {
            files: vec![],
            directories: vec![PathBuf::from("node")],
        };
        let inputs = InputSpec {
            files: vec![PathBuf::from("node/bin/node")],
            ..Default::default()
        };
        assert!(outputs.feeds(&inputs));

        let unrelated = InputSpec {
            files: vec![PathBuf::from("nodes.txt")],
            ..Default::default()
        };
        assert!(!outputs.feeds(&unrelated));
    }

    #[test]
    fn absent_option_maps_to_absent_property() {
        let value: PropertyValue = Option::<String>::None.into();
        assert_eq!(value, PropertyValue::Absent);
        let value: PropertyValue = Some("x").into();
        assert_eq!(value, PropertyValue::Text("x".into()));
    }
}
