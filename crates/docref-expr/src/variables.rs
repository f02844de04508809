//! Variables visible to lookup templates.

use bson::Bson;
use std::collections::HashMap;

/// Variable bound to the raw reference value.
pub const TARGET_VARIABLE: &str = "target";
/// Alias of [`TARGET_VARIABLE`].
pub const THIS_VARIABLE: &str = "this";
/// Alias of [`TARGET_VARIABLE`], also the object bare paths read from.
pub const ROOT_VARIABLE: &str = "root";

/// The named and positional values available while binding one template.
///
/// Built from the stored reference value (the *source*):
///
/// - `#target`, `#this` and `#root` are the source itself
/// - positional index 0 is the source, unless the source is a document, in
///   which case index N is its N-th field value
/// - every top-level field of a document source is also a named variable
#[derive(Debug, Clone, Default)]
pub struct BindingVariables {
    root: Bson,
    positional: Vec<Bson>,
    named: HashMap<String, Bson>,
}

impl BindingVariables {
    /// Bind variables for a stored reference value.
    pub fn for_source(source: &Bson) -> Self {
        let mut named = HashMap::new();
        let positional = match source {
            Bson::Document(doc) => {
                for (key, value) in doc {
                    named.insert(key.clone(), value.clone());
                }
                doc.values().cloned().collect()
            }
            other => vec![other.clone()],
        };

        let mut variables = Self {
            root: source.clone(),
            positional,
            named,
        };
        variables.bind_source_aliases();
        variables
    }

    /// Bind variables for a stored reference value of the named property.
    ///
    /// The source is additionally reachable as `#<property_name>`.
    pub fn for_property(property_name: &str, source: &Bson) -> Self {
        let mut variables = Self::for_source(source);
        variables
            .named
            .insert(property_name.to_string(), source.clone());
        variables.bind_source_aliases();
        variables
    }

    /// Add or replace a named variable.
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    /// The source value bare property paths are read from.
    pub fn root(&self) -> &Bson {
        &self.root
    }

    /// Look up a named variable.
    pub fn variable(&self, name: &str) -> Option<&Bson> {
        self.named.get(name)
    }

    /// Look up a positional value.
    pub fn positional(&self, index: usize) -> Option<&Bson> {
        self.positional.get(index)
    }

    /// Number of positional values.
    pub fn positional_len(&self) -> usize {
        self.positional.len()
    }

    fn bind_source_aliases(&mut self) {
        for alias in [TARGET_VARIABLE, THIS_VARIABLE, ROOT_VARIABLE] {
            self.named.insert(alias.to_string(), self.root.clone());
        }
    }
}
