//! Placeholder binding.

use crate::evaluator::ExpressionEvaluator;
use crate::placeholder::{Placeholder, Segment, contains_placeholder, looks_like_document, segments};
use crate::template::TemplateCodec;
use crate::variables::BindingVariables;
use bson::{Bson, Document};
use docref_core::{BindingError, BindingErrorKind, Result};

/// Field read from a decoded target-collection template.
pub const TARGET_COLLECTION_FIELD: &str = "target-collection";

/// Render a value as text for interpolation into a larger string.
///
/// Strings are inserted raw, identifiers in hex, and structured values as
/// relaxed extended JSON.
pub fn to_text(value: &Bson) -> String {
    match value {
        Bson::String(s) => s.clone(),
        Bson::Null | Bson::Undefined => "null".to_string(),
        Bson::Boolean(b) => b.to_string(),
        Bson::Int32(v) => v.to_string(),
        Bson::Int64(v) => v.to_string(),
        Bson::Double(v) => v.to_string(),
        Bson::ObjectId(oid) => oid.to_hex(),
        other => {
            let json = other.clone().into_relaxed_extjson();
            serde_json::to_string(&json).unwrap_or_else(|_| json.to_string())
        }
    }
}

/// Binds placeholders against one set of variables.
#[derive(Clone, Copy)]
pub struct BindingContext<'a> {
    variables: &'a BindingVariables,
    evaluator: &'a dyn ExpressionEvaluator,
}

impl std::fmt::Debug for BindingContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingContext")
            .field("variables", self.variables)
            .finish_non_exhaustive()
    }
}

impl<'a> BindingContext<'a> {
    /// Create a context binding `variables` through `evaluator`.
    pub fn new(variables: &'a BindingVariables, evaluator: &'a dyn ExpressionEvaluator) -> Self {
        Self {
            variables,
            evaluator,
        }
    }

    /// The bound variables.
    pub fn variables(&self) -> &BindingVariables {
        self.variables
    }

    /// Evaluate raw expression text.
    pub fn evaluate_expression(&self, expression: &str) -> Result<Bson> {
        self.evaluator.evaluate(expression, self.variables)
    }

    pub(crate) fn resolve(&self, placeholder: Placeholder<'_>) -> Result<Bson> {
        match placeholder {
            Placeholder::Positional(index) => {
                self.variables.positional(index).cloned().ok_or_else(|| {
                    BindingError::new(
                        BindingErrorKind::Positional,
                        format!(
                            "no value bound at ?{} ({} positional values available)",
                            index,
                            self.variables.positional_len()
                        ),
                    )
                    .into()
                })
            }
            Placeholder::Expression(expression) => self.evaluate_expression(expression),
        }
    }

    /// Bind every placeholder in a piece of text.
    ///
    /// Text that is exactly one placeholder yields the bound value unchanged,
    /// so `'?#{#target}'` binds to an integer when the target is an integer.
    /// Otherwise each placeholder is rendered with [`to_text`] and the result
    /// is a string.
    pub fn bind_text(&self, text: &str) -> Result<Bson> {
        let parts = segments(text).map_err(|err| with_template(err, text))?;
        if let [Segment::Placeholder(only)] = parts.as_slice() {
            return self.resolve(*only).map_err(|err| with_template(err, text));
        }

        let mut out = String::with_capacity(text.len());
        for part in parts {
            match part {
                Segment::Literal(literal) => out.push_str(literal),
                Segment::Placeholder(placeholder) => {
                    let value = self.resolve(placeholder).map_err(|err| with_template(err, text))?;
                    out.push_str(&to_text(&value));
                }
            }
        }
        Ok(Bson::String(out))
    }

    /// Bind placeholders in every string, key and nested value.
    pub fn bind(&self, value: &Bson) -> Result<Bson> {
        match value {
            Bson::String(s) => self.bind_text(s),
            Bson::Document(doc) => self.bind_document(doc).map(Bson::Document),
            Bson::Array(items) => items
                .iter()
                .map(|item| self.bind(item))
                .collect::<Result<Vec<_>>>()
                .map(Bson::Array),
            other => Ok(other.clone()),
        }
    }

    fn bind_document(&self, doc: &Document) -> Result<Document> {
        let mut bound = Document::new();
        for (key, value) in doc {
            let key = match self.bind_text(key)? {
                Bson::String(s) => s,
                other => to_text(&other),
            };
            bound.insert(key, self.bind(value)?);
        }
        Ok(bound)
    }

    /// Decode template text into a concrete document.
    pub fn decode(&self, template: &str) -> Result<Document> {
        tracing::trace!(template, "decoding lookup template");
        TemplateCodec::new().decode(template, self)
    }

    /// Bind a target-collection expression.
    ///
    /// Accepts three forms:
    ///
    /// - a document template, whose `target-collection` field is the result
    /// - text containing placeholders, such as `?#{collection}` or
    ///   `archived-?#{kind}`
    /// - a bare expression, such as `#target.collection`
    ///
    /// A missing field or unset variable binds to null.
    pub fn bind_collection(&self, expression: &str) -> Result<Bson> {
        if looks_like_document(expression) {
            let document = self.decode(expression)?;
            return Ok(document
                .get(TARGET_COLLECTION_FIELD)
                .cloned()
                .unwrap_or(Bson::Null));
        }
        if contains_placeholder(expression)? {
            return self.bind_text(expression);
        }
        self.evaluate_expression(expression)
    }
}

fn with_template(err: docref_core::Error, text: &str) -> docref_core::Error {
    match err {
        docref_core::Error::Binding(binding) if binding.template.is_none() => {
            binding.with_template(text).into()
        }
        other => other,
    }
}
