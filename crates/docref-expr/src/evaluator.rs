//! Restricted expression language for lookup templates.
//!
//! The grammar is deliberately closed:
//!
//! ```text
//! expression := postfix ( '+' postfix )*
//! postfix    := primary ( '.' IDENT | '[' expression ']' )*
//! primary    := '#' IDENT | IDENT | STRING | NUMBER
//!             | 'true' | 'false' | 'null' | '(' expression ')'
//! ```
//!
//! Variable resolution:
//!
//! - `#name` reads a named variable (`target`, `this`, `root`, the property
//!   name, every top-level field of a document source). Unknown names are null.
//! - a bare `name` reads a field of the root object (the source). Missing
//!   fields are null; reading a field of a scalar is an error.
//! - `.field` / `['field']` / `[0]` step into documents and arrays.
//! - `+` concatenates when either side is a string, otherwise adds numbers.
//!
//! `#collection`, `collection` and `#target.collection` therefore all read the
//! same field of a document source.

use crate::binding::to_text;
use crate::variables::BindingVariables;
use bson::Bson;
use docref_core::{BindingError, BindingErrorKind, Result};

/// Pluggable evaluator for `?#{...}` expressions.
pub trait ExpressionEvaluator: Send + Sync {
    /// Evaluate expression text against the bound variables.
    fn evaluate(&self, expression: &str, variables: &BindingVariables) -> Result<Bson>;
}

/// The default evaluator: paths, literals and concatenation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathEvaluator;

impl PathEvaluator {
    /// Create the evaluator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ExpressionEvaluator for PathEvaluator {
    fn evaluate(&self, expression: &str, variables: &BindingVariables) -> Result<Bson> {
        let parsed = Expression::parse(expression)?;
        parsed.evaluate(variables).map_err(|err| match err {
            docref_core::Error::Binding(binding) if binding.template.is_none() => {
                binding.with_template(expression).into()
            }
            other => other,
        })
    }
}

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A literal value.
    Literal(Bson),
    /// `#name`
    Variable(String),
    /// Bare `name`, read from the root object.
    Property(String),
    /// `target.field`
    Member(Box<Expression>, String),
    /// `target[index]`
    Index(Box<Expression>, Box<Expression>),
    /// `left + right`
    Add(Box<Expression>, Box<Expression>),
}

impl Expression {
    /// Parse expression text.
    pub fn parse(text: &str) -> Result<Self> {
        let tokens = tokenize(text)?;
        if tokens.is_empty() {
            return Err(syntax(text, "empty expression", 0));
        }
        let mut parser = Parser {
            text,
            tokens,
            pos: 0,
        };
        let expression = parser.expression()?;
        if let Some(token) = parser.tokens.get(parser.pos) {
            return Err(syntax(text, "unexpected trailing input", token.offset));
        }
        Ok(expression)
    }

    /// Evaluate against bound variables.
    pub fn evaluate(&self, variables: &BindingVariables) -> Result<Bson> {
        match self {
            Expression::Literal(value) => Ok(value.clone()),
            Expression::Variable(name) => Ok(variables.variable(name).cloned().unwrap_or(Bson::Null)),
            Expression::Property(name) => read_field(variables.root(), name),
            Expression::Member(target, name) => read_field(&target.evaluate(variables)?, name),
            Expression::Index(target, index) => {
                let target = target.evaluate(variables)?;
                let index = index.evaluate(variables)?;
                read_index(&target, &index)
            }
            Expression::Add(left, right) => add(&left.evaluate(variables)?, &right.evaluate(variables)?),
        }
    }
}

fn read_field(target: &Bson, name: &str) -> Result<Bson> {
    match target {
        Bson::Document(doc) => Ok(doc.get(name).cloned().unwrap_or(Bson::Null)),
        other => Err(BindingError::new(
            BindingErrorKind::Evaluation,
            format!("cannot read property '{}' of {}", name, type_label(other)),
        )
        .into()),
    }
}

fn read_index(target: &Bson, index: &Bson) -> Result<Bson> {
    match (target, index) {
        (Bson::Document(_), Bson::String(key)) => read_field(target, key),
        (Bson::Array(items), index) => {
            let position = as_index(index).ok_or_else(|| {
                BindingError::new(
                    BindingErrorKind::Type,
                    format!("array index must be a non-negative integer, got {}", type_label(index)),
                )
            })?;
            items.get(position).cloned().ok_or_else(|| {
                BindingError::new(
                    BindingErrorKind::Evaluation,
                    format!("index {} out of bounds for array of length {}", position, items.len()),
                )
                .into()
            })
        }
        (other, index) => Err(BindingError::new(
            BindingErrorKind::Evaluation,
            format!("cannot index {} with {}", type_label(other), type_label(index)),
        )
        .into()),
    }
}

fn as_index(value: &Bson) -> Option<usize> {
    match value {
        Bson::Int32(v) => usize::try_from(*v).ok(),
        Bson::Int64(v) => usize::try_from(*v).ok(),
        _ => None,
    }
}

fn add(left: &Bson, right: &Bson) -> Result<Bson> {
    if matches!(left, Bson::String(_)) || matches!(right, Bson::String(_)) {
        return Ok(Bson::String(format!("{}{}", to_text(left), to_text(right))));
    }

    if let (Some(a), Some(b)) = (as_integer(left), as_integer(right)) {
        return a.checked_add(b).map(integer).ok_or_else(|| {
            BindingError::new(BindingErrorKind::Evaluation, "integer overflow in '+'").into()
        });
    }

    match (as_number(left), as_number(right)) {
        (Some(a), Some(b)) => Ok(Bson::Double(a + b)),
        _ => Err(BindingError::new(
            BindingErrorKind::Type,
            format!("cannot add {} and {}", type_label(left), type_label(right)),
        )
        .into()),
    }
}

fn as_integer(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(v) => Some(i64::from(*v)),
        Bson::Int64(v) => Some(*v),
        _ => None,
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Double(v) => Some(*v),
        other => as_integer(other).map(|v| v as f64),
    }
}

/// Short human-readable name of a value's type for error messages.
pub(crate) fn type_label(value: &Bson) -> &'static str {
    match value {
        Bson::Null | Bson::Undefined => "null",
        Bson::String(_) => "string",
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => "number",
        Bson::Boolean(_) => "boolean",
        Bson::Document(_) => "document",
        Bson::Array(_) => "array",
        Bson::ObjectId(_) => "objectId",
        _ => "value",
    }
}

fn syntax(text: &str, message: &str, offset: usize) -> docref_core::Error {
    BindingError::new(BindingErrorKind::Syntax, message)
        .at(offset)
        .with_template(text)
        .into()
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Hash,
    Dot,
    Plus,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        let kind = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '#' => TokenKind::Hash,
            '.' => TokenKind::Dot,
            '+' => TokenKind::Plus,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '\'' | '"' => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                while let Some((_, ch)) = chars.next() {
                    if ch == c {
                        closed = true;
                        break;
                    }
                    if ch == '\\' {
                        match chars.next() {
                            Some((_, escaped)) => value.push(escaped),
                            None => break,
                        }
                    } else {
                        value.push(ch);
                    }
                }
                if !closed {
                    return Err(syntax(text, "unterminated string literal", offset));
                }
                tokens.push(Token {
                    kind: TokenKind::Str(value),
                    offset,
                });
                continue;
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut end = offset;
                let mut is_float = false;
                chars.next();
                end += c.len_utf8();
                while let Some(&(i, ch)) = chars.peek() {
                    if ch.is_ascii_digit() {
                        end = i + 1;
                        chars.next();
                    } else if ch == '.' && !is_float {
                        // `a.b` never starts with a digit, so a dot here is a decimal point
                        is_float = true;
                        end = i + 1;
                        chars.next();
                    } else {
                        break;
                    }
                }
                let literal = &text[offset..end];
                let kind = if is_float {
                    literal.parse().map(TokenKind::Float).ok()
                } else {
                    literal.parse().map(TokenKind::Int).ok()
                };
                match kind {
                    Some(kind) => tokens.push(Token { kind, offset }),
                    None => return Err(syntax(text, "invalid number literal", offset)),
                }
                continue;
            }
            c if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
                let mut end = offset;
                while let Some(&(i, ch)) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' || ch == '$' {
                        end = i + ch.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(text[offset..end].to_string()),
                    offset,
                });
                continue;
            }
            other => {
                return Err(syntax(
                    text,
                    &format!("unexpected character '{}'", other),
                    offset,
                ));
            }
        };
        chars.next();
        tokens.push(Token { kind, offset });
    }

    Ok(tokens)
}

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.text.len(), |t| t.offset)
    }

    fn next(&mut self) -> Option<TokenKind> {
        let token = self.tokens.get(self.pos).map(|t| t.kind.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &TokenKind, what: &str) -> Result<()> {
        let offset = self.offset();
        match self.next() {
            Some(ref kind) if kind == expected => Ok(()),
            _ => Err(syntax(self.text, &format!("expected {}", what), offset)),
        }
    }

    fn ident(&mut self) -> Result<String> {
        let offset = self.offset();
        match self.next() {
            Some(TokenKind::Ident(name)) => Ok(name),
            _ => Err(syntax(self.text, "expected identifier", offset)),
        }
    }

    fn expression(&mut self) -> Result<Expression> {
        let mut left = self.postfix()?;
        while matches!(self.peek(), Some(TokenKind::Plus)) {
            self.pos += 1;
            let right = self.postfix()?;
            left = Expression::Add(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn postfix(&mut self) -> Result<Expression> {
        let mut target = self.primary()?;
        loop {
            match self.peek() {
                Some(TokenKind::Dot) => {
                    self.pos += 1;
                    let name = self.ident()?;
                    target = Expression::Member(Box::new(target), name);
                }
                Some(TokenKind::LBracket) => {
                    self.pos += 1;
                    let index = self.expression()?;
                    self.expect(&TokenKind::RBracket, "']'")?;
                    target = Expression::Index(Box::new(target), Box::new(index));
                }
                _ => return Ok(target),
            }
        }
    }

    fn primary(&mut self) -> Result<Expression> {
        let offset = self.offset();
        match self.next() {
            Some(TokenKind::Hash) => Ok(Expression::Variable(self.ident()?)),
            Some(TokenKind::Ident(name)) => Ok(match name.as_str() {
                "true" => Expression::Literal(Bson::Boolean(true)),
                "false" => Expression::Literal(Bson::Boolean(false)),
                "null" => Expression::Literal(Bson::Null),
                _ => Expression::Property(name),
            }),
            Some(TokenKind::Str(value)) => Ok(Expression::Literal(Bson::String(value))),
            Some(TokenKind::Int(value)) => Ok(Expression::Literal(integer(value))),
            Some(TokenKind::Float(value)) => Ok(Expression::Literal(Bson::Double(value))),
            Some(TokenKind::LParen) => {
                let inner = self.expression()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            Some(_) => Err(syntax(self.text, "unexpected token", offset)),
            None => Err(syntax(self.text, "unexpected end of expression", offset)),
        }
    }
}

/// Integers keep the narrowest width that holds them.
pub(crate) fn integer(value: i64) -> Bson {
    i32::try_from(value).map_or(Bson::Int64(value), Bson::Int32)
}
