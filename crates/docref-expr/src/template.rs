//! Lookup template decoding.
//!
//! Templates are written in relaxed JSON: keys may be unquoted or quoted with
//! single or double quotes, and placeholders may appear as bare values or
//! inside strings.
//!
//! ```text
//! { '_id' : '?#{#target}' }
//! { 'refKey1' : ?0, 'refKey2' : ?1 }
//! { $or : [ { kind : 'book' }, { kind : ?#{#target.kind} } ] }
//! ```
//!
//! A string that is exactly one placeholder takes the bound value's native
//! type; anything else is interpolated as text.

use crate::binding::{BindingContext, to_text};
use crate::evaluator::{integer, type_label};
use crate::placeholder::{matching_brace, placeholder_at};
use bson::{Bson, Document};
use docref_core::{BindingError, BindingErrorKind, Error, Result};

/// Decodes template text into concrete documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateCodec;

impl TemplateCodec {
    /// Create the codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode template text that must describe a document.
    pub fn decode(&self, template: &str, ctx: &BindingContext<'_>) -> Result<Document> {
        match self.decode_value(template, ctx)? {
            Bson::Document(doc) => Ok(doc),
            other => Err(BindingError::new(
                BindingErrorKind::Type,
                format!("template must describe a document, got {}", type_label(&other)),
            )
            .with_template(template)
            .into()),
        }
    }

    /// Decode template text describing any value.
    pub fn decode_value(&self, template: &str, ctx: &BindingContext<'_>) -> Result<Bson> {
        let mut parser = TemplateParser {
            text: template,
            pos: 0,
            ctx,
        };
        let value = parser.value()?;
        parser.skip_whitespace();
        if parser.pos < template.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(value)
    }
}

struct TemplateParser<'t, 'c, 'v> {
    text: &'t str,
    pos: usize,
    ctx: &'c BindingContext<'v>,
}

impl<'t> TemplateParser<'t, '_, '_> {
    fn error(&self, message: &str) -> Error {
        BindingError::new(BindingErrorKind::Syntax, message)
            .at(self.pos)
            .with_template(self.text)
            .into()
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.bump();
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", expected)))
        }
    }

    fn value(&mut self) -> Result<Bson> {
        self.skip_whitespace();
        match self.peek() {
            Some('{') => self.document().map(Bson::Document),
            Some('[') => self.array(),
            Some(q @ ('\'' | '"')) => {
                let raw = self.quoted(q)?;
                self.ctx.bind_text(&raw)
            }
            Some('?') => self.placeholder(),
            Some(c) if c == '-' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_ascii_alphabetic() => {
                let word = self.word();
                match word {
                    "true" => Ok(Bson::Boolean(true)),
                    "false" => Ok(Bson::Boolean(false)),
                    "null" => Ok(Bson::Null),
                    _ => Err(self.error(&format!("unexpected word '{}'", word))),
                }
            }
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of template")),
        }
    }

    fn document(&mut self) -> Result<Document> {
        self.expect('{')?;
        let mut doc = Document::new();
        self.skip_whitespace();
        if self.peek() == Some('}') {
            self.bump();
            return Ok(doc);
        }

        loop {
            let key = self.key()?;
            self.expect(':')?;
            let value = self.value()?;
            doc.insert(key, value);

            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(doc),
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn array(&mut self) -> Result<Bson> {
        self.expect('[')?;
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(']') {
            self.bump();
            return Ok(Bson::Array(items));
        }

        loop {
            items.push(self.value()?);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some(']') => return Ok(Bson::Array(items)),
                _ => return Err(self.error("expected ',' or ']'")),
            }
        }
    }

    fn key(&mut self) -> Result<String> {
        self.skip_whitespace();
        let key = match self.peek() {
            Some(q @ ('\'' | '"')) => {
                let raw = self.quoted(q)?;
                self.ctx.bind_text(&raw)?
            }
            Some('?') => self.placeholder()?,
            Some(c) if is_key_char(c) => Bson::String(self.word().to_string()),
            _ => return Err(self.error("expected field name")),
        };
        Ok(match key {
            Bson::String(s) => s,
            other => to_text(&other),
        })
    }

    fn word(&mut self) -> &'t str {
        let text = self.text;
        let start = self.pos;
        while self.peek().is_some_and(is_key_char) {
            self.bump();
        }
        &text[start..self.pos]
    }

    /// Read a quoted string, returning its unescaped content.
    ///
    /// Expression placeholder bodies are copied verbatim, so they may contain
    /// the enclosing quote character.
    fn quoted(&mut self, quote: char) -> Result<String> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();

        loop {
            if self.text[self.pos..].starts_with("?#{") {
                let open = self.pos + 3;
                let Some(close) = matching_brace(self.text, open) else {
                    return Err(self.error("unterminated expression placeholder"));
                };
                out.push_str(&self.text[self.pos..=close]);
                self.pos = close + 1;
                continue;
            }

            match self.bump() {
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('u') => out.push(self.unicode_escape()?),
                    Some(c) => out.push(c),
                    None => break,
                },
                Some(c) => out.push(c),
                None => break,
            }
        }

        self.pos = start;
        Err(self.error("unterminated string"))
    }

    fn unicode_escape(&mut self) -> Result<char> {
        let end = self.pos + 4;
        let hex = self.text.get(self.pos..end).ok_or_else(|| self.error("short unicode escape"))?;
        let code = u32::from_str_radix(hex, 16).map_err(|_| self.error("invalid unicode escape"))?;
        let c = char::from_u32(code).ok_or_else(|| self.error("invalid unicode escape"))?;
        self.pos = end;
        Ok(c)
    }

    fn placeholder(&mut self) -> Result<Bson> {
        match placeholder_at(self.text, self.pos)? {
            Some((placeholder, end)) => {
                self.pos = end;
                self.ctx.resolve(placeholder)
            }
            None => Err(self.error("expected '?N' or '?#{...}' placeholder")),
        }
    }

    fn number(&mut self) -> Result<Bson> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.bump();
            } else if matches!(c, '.' | 'e' | 'E' | '+') || (c == '-' && is_float) {
                is_float = true;
                self.bump();
            } else {
                break;
            }
        }

        let literal = &self.text[start..self.pos];
        let parsed = if is_float {
            literal.parse::<f64>().ok().map(Bson::Double)
        } else {
            literal.parse::<i64>().ok().map(integer)
        };
        parsed.ok_or_else(|| {
            BindingError::new(BindingErrorKind::Syntax, format!("invalid number '{}'", literal))
                .at(start)
                .with_template(self.text)
                .into()
        })
    }
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '-' | '.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::PathEvaluator;
    use crate::variables::BindingVariables;
    use bson::{bson, doc};

    fn decode(template: &str, source: &Bson) -> Result<Document> {
        let vars = BindingVariables::for_source(source);
        let evaluator = PathEvaluator::new();
        let ctx = BindingContext::new(&vars, &evaluator);
        TemplateCodec::new().decode(template, &ctx)
    }

    #[test]
    fn test_quoted_placeholder_keeps_native_type() {
        let filter = decode("{ '_id' : '?#{#target}' }", &Bson::Int64(42)).unwrap();
        assert_eq!(filter, doc! { "_id": 42_i64 });

        let filter = decode("{ '_id' : '?#{#target}' }", &Bson::String("ref-1".into())).unwrap();
        assert_eq!(filter, doc! { "_id": "ref-1" });
    }

    #[test]
    fn test_unquoted_placeholders() {
        let source = bson!({ "refKey1": "k1", "refKey2": "k2" });
        let filter = decode("{ refKey1 : ?0, \"refKey2\" : ?#{refKey2} }", &source).unwrap();
        assert_eq!(filter, doc! { "refKey1": "k1", "refKey2": "k2" });
    }

    #[test]
    fn test_interpolated_string() {
        let source = bson!({ "kind": "book", "n": 7 });
        let filter = decode("{ 'sku' : '?#{kind}-?1' }", &source).unwrap();
        assert_eq!(filter, doc! { "sku": "book-7" });
    }

    #[test]
    fn test_nested_structures_and_literals() {
        let filter = decode(
            "{ $or : [ { kind : 'book', stock : -2, price : 1.5e1 }, { active : true, note : null } ], tags : [] }",
            &Bson::Null,
        )
        .unwrap();
        assert_eq!(
            filter,
            doc! {
                "$or": [
                    { "kind": "book", "stock": -2, "price": 15.0 },
                    { "active": true, "note": null },
                ],
                "tags": [],
            }
        );
    }

    #[test]
    fn test_expression_with_quotes_inside_quoted_string() {
        let filter = decode("{ 'code' : '?#{'sku-' + #target}' }", &Bson::String("9".into())).unwrap();
        assert_eq!(filter, doc! { "code": "sku-9" });
    }

    #[test]
    fn test_placeholder_in_key() {
        let source = bson!({ "field": "isbn", "value": "123" });
        let filter = decode("{ '?#{field}' : ?#{value} }", &source).unwrap();
        assert_eq!(filter, doc! { "isbn": "123" });
    }

    #[test]
    fn test_escapes() {
        let filter = decode(r#"{ 'a' : 'it\'s', "b" : "A\n" }"#, &Bson::Null).unwrap();
        assert_eq!(filter, doc! { "a": "it's", "b": "A\n" });
    }

    #[test]
    fn test_syntax_errors() {
        for bad in [
            "{ '_id' : 'open }",
            "{ '_id' 1 }",
            "{ '_id' : 1 ",
            "{ '_id' : nope }",
            "{ '_id' : ?x }",
            "{ '_id' : 1 } trailing",
            "",
        ] {
            let err = decode(bad, &Bson::Null).unwrap_err();
            assert!(
                matches!(err, Error::Binding(ref e) if e.kind == BindingErrorKind::Syntax),
                "expected syntax error for {bad:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_non_document_template_is_type_error() {
        let err = decode("'?#{#target}'", &Bson::Int32(1)).unwrap_err();
        assert!(matches!(err, Error::Binding(ref e) if e.kind == BindingErrorKind::Type));
    }

    #[test]
    fn test_positional_out_of_range() {
        let err = decode("{ '_id' : ?1 }", &Bson::String("ref-1".into())).unwrap_err();
        assert!(matches!(err, Error::Binding(ref e) if e.kind == BindingErrorKind::Positional));
    }
}
