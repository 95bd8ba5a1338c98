//! Type expressions as written in declaration snapshots
//!
//! Grammar:
//!
//! ```text
//! type  := ident ( '<' type ( ',' type )* '>' )? ( '[' ']' )*
//! ident := [A-Za-z_$] [A-Za-z0-9_$.]*
//! ```
//!
//! An identifier naming a type parameter in scope becomes a type variable,
//! anything else a named type.

use crate::model::{Type, TypeName};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message} at offset {offset} in `{text}`")]
pub struct TypeExprError {
    pub text: String,
    pub offset: usize,
    pub message: String,
}

/// Type parameters visible where an expression is written
#[derive(Debug, Clone, Copy)]
pub struct TypeScope<'a> {
    owner: Option<&'a TypeName>,
    params: &'a [String],
}

impl<'a> TypeScope<'a> {
    pub fn new(owner: &'a TypeName, params: &'a [String]) -> Self {
        Self {
            owner: Some(owner),
            params,
        }
    }

    /// A scope with no type parameters
    pub fn empty() -> Self {
        Self {
            owner: None,
            params: &[],
        }
    }

    fn variable(&self, name: &str) -> Option<Type> {
        let owner = self.owner?;
        self.params
            .iter()
            .any(|p| p == name)
            .then(|| Type::variable(name, owner.clone()))
    }
}

pub fn parse_type(text: &str, scope: TypeScope<'_>) -> Result<Type, TypeExprError> {
    let mut parser = Parser {
        text,
        bytes: text.as_bytes(),
        pos: 0,
        scope,
    };
    let ty = parser.parse_type()?;
    parser.skip_whitespace();
    if parser.pos < parser.bytes.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(ty)
}

struct Parser<'t, 's> {
    text: &'t str,
    bytes: &'t [u8],
    pos: usize,
    scope: TypeScope<'s>,
}

impl<'t> Parser<'t, '_> {
    fn parse_type(&mut self) -> Result<Type, TypeExprError> {
        self.skip_whitespace();
        let start = self.pos;
        let name = self.parse_ident()?;

        let mut args = Vec::new();
        if self.eat(b'<') {
            loop {
                args.push(self.parse_type()?);
                if self.eat(b',') {
                    continue;
                }
                if self.eat(b'>') {
                    break;
                }
                return Err(self.error("expected `,` or `>`"));
            }
        }

        let mut dims = 0;
        while self.eat(b'[') {
            if !self.eat(b']') {
                return Err(self.error("expected `]`"));
            }
            dims += 1;
        }

        if let Some(var) = self.scope.variable(name) {
            if !args.is_empty() {
                return Err(self.error_at(start, "type variables take no type arguments"));
            }
            if dims > 0 {
                return Err(self.error_at(start, "arrays of type variables are not supported"));
            }
            return Ok(var);
        }

        if dims > 0 {
            if !args.is_empty() {
                return Err(self.error_at(start, "arrays of generic types are not supported"));
            }
            return Ok(Type::concrete(format!("{}{}", name, "[]".repeat(dims))));
        }

        Ok(Type::generic(name, args))
    }

    fn parse_ident(&mut self) -> Result<&'t str, TypeExprError> {
        let start = self.pos;
        match self.bytes.get(self.pos) {
            Some(b) if b.is_ascii_alphabetic() || *b == b'_' || *b == b'$' => self.pos += 1,
            _ => return Err(self.error("expected a type name")),
        }
        while let Some(b) = self.bytes.get(self.pos) {
            if b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$' | b'.') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = self.text;
        let ident = &text[start..self.pos];
        if ident.ends_with('.') || ident.contains("..") {
            return Err(self.error_at(start, "malformed qualified name"));
        }
        Ok(ident)
    }

    fn eat(&mut self, expected: u8) -> bool {
        self.skip_whitespace();
        if self.bytes.get(self.pos) == Some(&expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.bytes.get(self.pos).is_some_and(u8::is_ascii_whitespace) {
            self.pos += 1;
        }
    }

    fn error(&self, message: &str) -> TypeExprError {
        self.error_at(self.pos, message)
    }

    fn error_at(&self, offset: usize, message: &str) -> TypeExprError {
        TypeExprError {
            text: self.text.to_string(),
            offset,
            message: message.to_string(),
        }
    }
}
