//! Lexer for Pivot scripts.
//!
//! Scripts are indentation-based. The lexer turns leading whitespace into `Indent` and
//! `Dedent` tokens so the parser never looks at columns. Lines inside parentheses are
//! joined, and blank or comment-only lines are dropped.

// Positions always sit on UTF-8 character boundaries, so slicing the source is safe.
#![allow(clippy::string_slice)]

use std::fmt;

/// A byte range in the source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// 1-based line and column of the span start.
    pub fn line_col(self, source: &str) -> (usize, usize) {
        let before = source.get(..self.start).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let column = before
            .rsplit('\n')
            .next()
            .map_or(0, |tail| tail.chars().count())
            + 1;
        (line, column)
    }
}

/// A value with its source span.
pub type Spanned<T> = (T, Span);

#[derive(Clone, Debug, PartialEq)]
pub enum Token<'src> {
    // Literals
    Number(f64),
    String(&'src str),

    Ident(&'src str),

    // Keywords
    Component,
    System,
    Event,
    If,
    Else,
    While,
    Emit,
    True,
    False,
    And,
    Or,
    Not,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    EqEq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    AndAnd,
    OrOr,
    Bang,

    // Delimiters
    Dot,
    Comma,
    LParen,
    RParen,

    // Structure
    Newline,
    Indent,
    Dedent,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "\"{s}\""),
            Self::Ident(s) => write!(f, "{s}"),
            Self::Component => write!(f, "component"),
            Self::System => write!(f, "system"),
            Self::Event => write!(f, "event"),
            Self::If => write!(f, "if"),
            Self::Else => write!(f, "else"),
            Self::While => write!(f, "while"),
            Self::Emit => write!(f, "emit"),
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::And => write!(f, "and"),
            Self::Or => write!(f, "or"),
            Self::Not => write!(f, "not"),
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Star => write!(f, "*"),
            Self::Slash => write!(f, "/"),
            Self::Percent => write!(f, "%"),
            Self::Assign => write!(f, "="),
            Self::EqEq => write!(f, "=="),
            Self::NotEq => write!(f, "!="),
            Self::Lt => write!(f, "<"),
            Self::Gt => write!(f, ">"),
            Self::LtEq => write!(f, "<="),
            Self::GtEq => write!(f, ">="),
            Self::AndAnd => write!(f, "&&"),
            Self::OrOr => write!(f, "||"),
            Self::Bang => write!(f, "!"),
            Self::Dot => write!(f, "."),
            Self::Comma => write!(f, ","),
            Self::LParen => write!(f, "("),
            Self::RParen => write!(f, ")"),
            Self::Newline => write!(f, "end of line"),
            Self::Indent => write!(f, "indent"),
            Self::Dedent => write!(f, "dedent"),
        }
    }
}

/// Lexer error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {:?}", self.message, self.span)
    }
}

/// Lex a script into tokens. Every logical line ends with `Newline`.
pub fn lex(source: &str) -> Result<Vec<Spanned<Token<'_>>>, LexError> {
    Lexer::new(source).lex()
}

struct Lexer<'src> {
    source: &'src str,
    pos: usize,
    indent_stack: Vec<usize>,
    /// Open parentheses; newlines inside them are ignored.
    depth: usize,
}

impl<'src> Lexer<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            indent_stack: vec![0],
            depth: 0,
        }
    }

    fn lex(mut self) -> Result<Vec<Spanned<Token<'src>>>, LexError> {
        let mut tokens = Vec::new();
        let mut at_line_start = true;

        while self.pos < self.source.len() {
            if at_line_start {
                at_line_start = false;
                let line_start = self.pos;
                let indent = self.count_indent();
                if self.at_blank_line() {
                    self.skip_line();
                    at_line_start = true;
                    continue;
                }
                self.indent(indent, line_start, &mut tokens)?;
            }

            self.skip_hspace();
            if self.pos >= self.source.len() {
                break;
            }

            match self.current() {
                '#' => self.skip_comment(),
                '\n' => {
                    let start = self.pos;
                    self.advance();
                    if self.depth == 0 {
                        tokens.push((Token::Newline, Span::new(start, self.pos)));
                        at_line_start = true;
                    }
                }
                _ => {
                    let token = self.lex_token()?;
                    tokens.push(token);
                }
            }
        }

        if self.depth > 0 {
            return Err(LexError {
                message: "unclosed parenthesis".to_string(),
                span: Span::new(self.pos, self.pos),
            });
        }
        if tokens
            .last()
            .is_some_and(|(token, _)| *token != Token::Newline)
        {
            tokens.push((Token::Newline, Span::new(self.pos, self.pos)));
        }

        // Final dedents
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            tokens.push((Token::Dedent, Span::new(self.pos, self.pos)));
        }

        Ok(tokens)
    }

    fn indent(
        &mut self,
        indent: usize,
        line_start: usize,
        tokens: &mut Vec<Spanned<Token<'src>>>,
    ) -> Result<(), LexError> {
        let current = self.indent_stack.last().copied().unwrap_or(0);
        let span = Span::new(line_start, self.pos);
        if indent > current {
            self.indent_stack.push(indent);
            tokens.push((Token::Indent, span));
            return Ok(());
        }
        while indent < self.indent_stack.last().copied().unwrap_or(0) {
            self.indent_stack.pop();
            tokens.push((Token::Dedent, span));
        }
        if indent == self.indent_stack.last().copied().unwrap_or(0) {
            Ok(())
        } else {
            Err(LexError {
                message: "inconsistent dedent".to_string(),
                span,
            })
        }
    }

    fn current(&self) -> char {
        self.source[self.pos..].chars().next().unwrap_or('\0')
    }

    fn peek(&self) -> char {
        self.source[self.pos..].chars().nth(1).unwrap_or('\0')
    }

    fn advance(&mut self) {
        if self.pos < self.source.len() {
            self.pos += self.current().len_utf8();
        }
    }

    fn count_indent(&mut self) -> usize {
        let mut count = 0;
        while self.pos < self.source.len() {
            match self.current() {
                // A tab and a space both count as one unit
                '\t' | ' ' => {
                    count += 1;
                    self.advance();
                }
                '\r' => self.advance(),
                _ => break,
            }
        }
        count
    }

    fn at_blank_line(&self) -> bool {
        matches!(self.current(), '\n' | '#' | '\0')
    }

    fn skip_line(&mut self) {
        self.skip_comment();
        self.advance();
    }

    fn skip_hspace(&mut self) {
        while self.pos < self.source.len() {
            match self.current() {
                ' ' | '\t' | '\r' => self.advance(),
                _ => break,
            }
        }
    }

    fn skip_comment(&mut self) {
        while self.pos < self.source.len() && self.current() != '\n' {
            self.advance();
        }
    }

    fn lex_token(&mut self) -> Result<Spanned<Token<'src>>, LexError> {
        let start = self.pos;
        let c = self.current();

        if c == '"' {
            return self.lex_string();
        }
        if c.is_ascii_digit() {
            return self.lex_number();
        }
        if c.is_alphabetic() || c == '_' {
            return Ok(self.lex_ident());
        }

        let next = self.peek();
        let (token, width) = match (c, next) {
            ('=', '=') => (Token::EqEq, 2),
            ('!', '=') => (Token::NotEq, 2),
            ('<', '=') => (Token::LtEq, 2),
            ('>', '=') => (Token::GtEq, 2),
            ('&', '&') => (Token::AndAnd, 2),
            ('|', '|') => (Token::OrOr, 2),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('%', _) => (Token::Percent, 1),
            ('=', _) => (Token::Assign, 1),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('!', _) => (Token::Bang, 1),
            ('.', _) => (Token::Dot, 1),
            (',', _) => (Token::Comma, 1),
            ('(', _) => {
                self.depth += 1;
                (Token::LParen, 1)
            }
            (')', _) => {
                self.depth = self.depth.checked_sub(1).ok_or_else(|| LexError {
                    message: "unmatched `)`".to_string(),
                    span: Span::new(start, start + 1),
                })?;
                (Token::RParen, 1)
            }
            _ => {
                return Err(LexError {
                    message: format!("unexpected character: {c:?}"),
                    span: Span::new(start, start + c.len_utf8()),
                });
            }
        };
        for _ in 0..width {
            self.advance();
        }

        Ok((token, Span::new(start, self.pos)))
    }

    fn lex_string(&mut self) -> Result<Spanned<Token<'src>>, LexError> {
        let start = self.pos;
        self.advance(); // opening quote

        let content_start = self.pos;
        while self.pos < self.source.len() && self.current() != '"' {
            if self.current() == '\n' {
                break;
            }
            self.advance();
        }
        if self.current() != '"' {
            return Err(LexError {
                message: "unterminated string".to_string(),
                span: Span::new(start, self.pos),
            });
        }

        let content = &self.source[content_start..self.pos];
        self.advance(); // closing quote

        Ok((Token::String(content), Span::new(start, self.pos)))
    }

    fn lex_number(&mut self) -> Result<Spanned<Token<'src>>, LexError> {
        let start = self.pos;

        while self.current().is_ascii_digit() {
            self.advance();
        }
        if self.current() == '.' && self.peek().is_ascii_digit() {
            self.advance();
            while self.current().is_ascii_digit() {
                self.advance();
            }
        }

        let text = &self.source[start..self.pos];
        let value: f64 = text.parse().map_err(|_| LexError {
            message: format!("invalid number: {text}"),
            span: Span::new(start, self.pos),
        })?;

        Ok((Token::Number(value), Span::new(start, self.pos)))
    }

    fn lex_ident(&mut self) -> Spanned<Token<'src>> {
        let start = self.pos;
        while self.current().is_alphanumeric() || self.current() == '_' {
            self.advance();
        }

        let text = &self.source[start..self.pos];
        let token = match text {
            "component" => Token::Component,
            "system" => Token::System,
            "event" => Token::Event,
            "if" => Token::If,
            "else" => Token::Else,
            "while" => Token::While,
            "emit" => Token::Emit,
            "True" => Token::True,
            "False" => Token::False,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            _ => Token::Ident(text),
        };

        (token, Span::new(start, self.pos))
    }
}
