// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A recursive-descent parser for path templates.
//!
//! The grammar is:
//!
//! ```norust
//! template  := segment ( '/' segment )* ( ':' LITERAL )? EOF
//! segment   := variable | terminal
//! variable  := '{' LITERAL ( '=' terminal ( '/' terminal )* )? '}'
//! terminal  := '*' | '**' | LITERAL
//! ```
//!
//! `LITERAL` is any run of characters other than `*`, `=`, `{`, `}`, `/`,
//! `:`, and whitespace.

use super::Error;
use super::segment::{PATH_WILDCARD, Segment, SegmentKind, WILDCARD};
use std::collections::HashSet;

/// Parses `template` into its segments.
///
/// Unnamed wildcards receive positional names (`$0`, `$1`, ...). The counter
/// is local to each call.
pub(crate) fn parse(template: &str) -> Result<Vec<Segment>, Error> {
    let tokens = tokenize(template)?;
    let mut parser = Parser {
        template,
        tokens,
        position: 0,
        positional: 0,
        names: HashSet::new(),
        segments: Vec::new(),
    };
    parser.template()?;
    let segments = parser.segments;

    let path_wildcards = segments.iter().filter(|s| s.is_path_wildcard()).count();
    if path_wildcards > 1 {
        return Err(Error::MultiplePathWildcards(template.to_string()));
    }
    Ok(segments)
}

#[derive(Clone, Debug, PartialEq)]
enum TokenKind {
    Slash,
    Colon,
    Wildcard,
    PathWildcard,
    OpenBrace,
    Equal,
    CloseBrace,
    Literal(String),
    End,
}

impl TokenKind {
    fn text(&self) -> &str {
        match self {
            Self::Slash => "/",
            Self::Colon => ":",
            Self::Wildcard => WILDCARD,
            Self::PathWildcard => PATH_WILDCARD,
            Self::OpenBrace => "{",
            Self::Equal => "=",
            Self::CloseBrace => "}",
            Self::Literal(s) => s,
            Self::End => "end of input",
        }
    }
}

#[derive(Clone, Debug)]
struct Token {
    kind: TokenKind,
    line: usize,
    column: usize,
}

fn is_literal_char(c: char) -> bool {
    !matches!(c, '*' | '=' | '{' | '}' | '/' | ':') && !c.is_whitespace()
}

fn tokenize(template: &str) -> Result<Vec<Token>, Error> {
    let mut tokens = Vec::new();
    let mut chars = template.chars().peekable();
    // Whitespace is rejected, so every template fits on one line.
    let line = 1_usize;
    let mut column = 1_usize;
    while let Some(c) = chars.next() {
        let start_column = column;
        column += 1;
        let kind = match c {
            '/' => TokenKind::Slash,
            ':' => TokenKind::Colon,
            '{' => TokenKind::OpenBrace,
            '=' => TokenKind::Equal,
            '}' => TokenKind::CloseBrace,
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                column += 1;
                TokenKind::PathWildcard
            }
            '*' => TokenKind::Wildcard,
            c if is_literal_char(c) => {
                let mut literal = String::from(c);
                while let Some(&n) = chars.peek() {
                    if !is_literal_char(n) {
                        break;
                    }
                    literal.push(n);
                    column += 1;
                    chars.next();
                }
                TokenKind::Literal(literal)
            }
            c => {
                return Err(Error::Parse {
                    template: template.to_string(),
                    message: "unexpected character".to_string(),
                    line,
                    column: start_column,
                    near: c.escape_default().to_string(),
                });
            }
        };
        tokens.push(Token {
            kind,
            line,
            column: start_column,
        });
    }
    tokens.push(Token {
        kind: TokenKind::End,
        line,
        column,
    });
    Ok(tokens)
}

struct Parser<'a> {
    template: &'a str,
    tokens: Vec<Token>,
    position: usize,
    positional: usize,
    names: HashSet<String>,
    segments: Vec<Segment>,
}

impl Parser<'_> {
    fn peek(&self) -> &Token {
        // The token list always ends with `End`, and `advance()` never moves
        // past it.
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::End {
            self.position += 1;
        }
        token
    }

    fn error(&self, token: &Token, message: impl Into<String>) -> Error {
        Error::Parse {
            template: self.template.to_string(),
            message: message.into(),
            line: token.line,
            column: token.column,
            near: token.kind.text().to_string(),
        }
    }

    fn template(&mut self) -> Result<(), Error> {
        self.segment()?;
        while self.peek().kind == TokenKind::Slash {
            self.advance();
            self.segment()?;
        }
        if self.peek().kind == TokenKind::Colon {
            self.advance();
            let token = self.advance();
            let TokenKind::Literal(verb) = &token.kind else {
                return Err(self.error(&token, "expected a custom verb after `:`"));
            };
            self.merge_verb(verb);
        }
        let token = self.advance();
        match token.kind {
            TokenKind::End => Ok(()),
            TokenKind::CloseBrace => Err(self.error(&token, "unbalanced `}`")),
            _ => Err(self.error(&token, "expected `/`, `:`, or end of input")),
        }
    }

    fn segment(&mut self) -> Result<(), Error> {
        if self.peek().kind == TokenKind::OpenBrace {
            return self.variable();
        }
        let token = self.advance();
        let terminal = self.terminal(&token)?;
        if terminal.is_literal() {
            self.segments.push(terminal);
            return Ok(());
        }
        let name = format!("${}", self.positional);
        self.positional += 1;
        self.bind(&token, &name)?;
        self.segments.push(Segment::binding(&name));
        self.segments.push(terminal);
        self.segments.push(Segment::end_binding(name));
        Ok(())
    }

    fn variable(&mut self) -> Result<(), Error> {
        let open = self.advance();
        let token = self.advance();
        let name = match token.kind {
            TokenKind::Literal(ref name) => name.clone(),
            TokenKind::End => return Err(self.error(&open, "unterminated `{`")),
            _ => return Err(self.error(&token, "expected a variable name after `{`")),
        };
        self.bind(&token, &name)?;
        self.segments.push(Segment::binding(&name));

        let token = self.advance();
        match token.kind {
            TokenKind::CloseBrace => {
                self.segments.push(Segment::terminal(WILDCARD));
            }
            TokenKind::Equal => {
                self.bound_terminal()?;
                while self.peek().kind == TokenKind::Slash {
                    self.advance();
                    self.bound_terminal()?;
                }
                let token = self.advance();
                match token.kind {
                    TokenKind::CloseBrace => {}
                    TokenKind::End => return Err(self.error(&open, "unterminated `{`")),
                    _ => return Err(self.error(&token, "expected `/` or `}`")),
                }
            }
            TokenKind::End => return Err(self.error(&open, "unterminated `{`")),
            _ => return Err(self.error(&token, "expected `=` or `}`")),
        }
        self.segments.push(Segment::end_binding(name));
        Ok(())
    }

    fn bound_terminal(&mut self) -> Result<(), Error> {
        let token = self.advance();
        let terminal = self.terminal(&token)?;
        self.segments.push(terminal);
        Ok(())
    }

    fn terminal(&self, token: &Token) -> Result<Segment, Error> {
        match &token.kind {
            TokenKind::Wildcard => Ok(Segment::terminal(WILDCARD)),
            TokenKind::PathWildcard => Ok(Segment::terminal(PATH_WILDCARD)),
            TokenKind::Literal(s) => Ok(Segment::terminal(s.as_str())),
            TokenKind::OpenBrace => Err(self.error(token, "nested variables are not allowed")),
            TokenKind::End => Err(self.error(token, "expected a path segment")),
            _ => Err(self.error(token, "expected a literal or a wildcard")),
        }
    }

    fn bind(&mut self, token: &Token, name: &str) -> Result<(), Error> {
        if !self.names.insert(name.to_string()) {
            return Err(self.error(token, format!("duplicate variable `{name}`")));
        }
        Ok(())
    }

    fn merge_verb(&mut self, verb: &str) {
        // The last segment is either a terminal or the end of a binding, whose
        // last terminal is right before it.
        if let Some(last) = self
            .segments
            .iter_mut()
            .rev()
            .find(|s| s.kind() == SegmentKind::Terminal)
        {
            last.append_suffix(verb);
        }
    }
}
