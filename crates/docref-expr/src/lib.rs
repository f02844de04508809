//! Expression binding for docref lookup templates.
//!
//! Lookup filters and target-collection names are written as templates with
//! placeholders that are bound against the stored reference value:
//!
//! - `BindingVariables` holds the named and positional values for one binding
//! - `ExpressionEvaluator` evaluates `?#{...}` bodies; `PathEvaluator` is the
//!   default, a closed grammar of paths, literals and `+`
//! - `TemplateCodec` decodes relaxed-JSON template text into documents
//! - `BindingContext` ties the three together
//!
//! ```ignore
//! let vars = BindingVariables::for_source(&Bson::String("ref-1".into()));
//! let evaluator = PathEvaluator::new();
//! let filter = BindingContext::new(&vars, &evaluator).decode("{ '_id' : ?#{#target} }")?;
//! assert_eq!(filter, doc! { "_id": "ref-1" });
//! ```

pub mod binding;
pub mod evaluator;
mod placeholder;
pub mod template;
pub mod variables;

pub use binding::{BindingContext, TARGET_COLLECTION_FIELD, to_text};
pub use evaluator::{Expression, ExpressionEvaluator, PathEvaluator};
pub use template::TemplateCodec;
pub use variables::{BindingVariables, ROOT_VARIABLE, TARGET_VARIABLE, THIS_VARIABLE};
