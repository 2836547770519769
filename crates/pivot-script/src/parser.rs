//! Recursive-descent parser for Pivot scripts.
//!
//! # Syntax
//!
//! ```text
//! component Stats              # record component
//!     Number xp
//! component Speed = Number     # alias component
//!
//! event Kill                   # roles, then an optional payload line
//!     Stats, Inventory
//!     String monster
//!
//! system Reward(player<Stats>) event Kill(e<Stats, Inventory>, String monster)
//!     if monster == "Thrax"
//!         player.Stats.xp = player.Stats.xp + 2500
//! ```

use pivot_data::{DVec3, Value};

use crate::ast::{
    BinaryOp, ComponentBody, ComponentDecl, EventDecl, Expr, Field, Item, RoleDecl, Script, Stmt,
    SystemDecl, TypeExpr, UnaryOp,
};
use crate::error::ParseError;
use crate::lexer::{Span, Spanned, Token, lex};

/// Parse a whole script.
///
/// # Errors
///
/// Returns `ParseError` with the offending token and its position if the script is malformed.
pub fn parse(source: &str) -> std::result::Result<Script, ParseError> {
    let tokens = lex(source).map_err(|err| {
        let (line, column) = err.span.line_col(source);
        let found = source
            .get(err.span.start..err.span.end)
            .filter(|text| !text.is_empty())
            .map_or_else(|| "end of input".to_string(), |text| format!("`{text}`"));
        ParseError {
            message: err.message,
            found,
            line,
            column,
        }
    })?;
    Parser {
        source,
        tokens,
        pos: 0,
    }
    .parse_script()
}

type Result<T> = std::result::Result<T, ParseError>;

const EQUALITY: &[(Token<'static>, BinaryOp)] =
    &[(Token::EqEq, BinaryOp::Eq), (Token::NotEq, BinaryOp::NotEq)];
const COMPARISON: &[(Token<'static>, BinaryOp)] = &[
    (Token::Lt, BinaryOp::Lt),
    (Token::Gt, BinaryOp::Gt),
    (Token::LtEq, BinaryOp::LtEq),
    (Token::GtEq, BinaryOp::GtEq),
];
const ADDITIVE: &[(Token<'static>, BinaryOp)] =
    &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)];
const MULTIPLICATIVE: &[(Token<'static>, BinaryOp)] = &[
    (Token::Star, BinaryOp::Mul),
    (Token::Slash, BinaryOp::Div),
    (Token::Percent, BinaryOp::Mod),
];

struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Spanned<Token<'src>>>,
    pos: usize,
}

impl<'src> Parser<'src> {
    // Token access

    fn peek(&self) -> Option<&Token<'src>> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token<'src>> {
        self.tokens.get(self.pos + offset).map(|(token, _)| token)
    }

    fn span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map_or(Span::new(self.source.len(), self.source.len()), |(_, span)| *span)
    }

    /// End of the previously consumed token.
    fn last_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |(_, span)| span.end)
    }

    fn check(&self, token: &Token<'src>) -> bool {
        self.peek() == Some(token)
    }

    fn eat(&mut self, token: &Token<'src>) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token<'src>, what: &str) -> Result<Span> {
        let span = self.span();
        if self.eat(token) {
            Ok(span)
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<(String, Span)> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = (*name).to_string();
                let span = self.span();
                self.pos += 1;
                Ok((name, span))
            }
            _ => Err(self.error(format!("expected {what}"))),
        }
    }

    fn expect_newline(&mut self) -> Result<()> {
        self.expect(&Token::Newline, "end of line").map(|_| ())
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let (line, column) = self.span().line_col(self.source);
        ParseError {
            message: message.into(),
            found: self
                .peek()
                .map_or_else(|| "end of input".to_string(), |token| format!("`{token}`")),
            line,
            column,
        }
    }

    fn role(&self, head: TypeExpr) -> Result<RoleDecl> {
        role_from_type(head).map_err(|span| self.error_at("expected a component name", span))
    }

    fn error_at(&self, message: impl Into<String>, span: Span) -> ParseError {
        let (line, column) = span.line_col(self.source);
        let found = self
            .tokens
            .iter()
            .find(|(_, s)| s.start == span.start)
            .map_or_else(|| "end of input".to_string(), |(token, _)| format!("`{token}`"));
        ParseError {
            message: message.into(),
            found,
            line,
            column,
        }
    }

    // Items

    fn parse_script(mut self) -> Result<Script> {
        let mut items = Vec::new();
        while let Some(token) = self.peek() {
            match token {
                Token::Newline => {
                    self.pos += 1;
                }
                Token::Component => items.push(Item::Component(self.parse_component()?)),
                Token::Event => items.push(Item::Event(self.parse_event()?)),
                Token::System => items.push(Item::System(self.parse_system()?)),
                _ => return Err(self.error("expected `component`, `event` or `system`")),
            }
        }
        Ok(Script { items })
    }

    fn parse_component(&mut self) -> Result<ComponentDecl> {
        let start = self.expect(&Token::Component, "`component`")?.start;
        let (name, _) = self.expect_ident("component name")?;

        if self.eat(&Token::Assign) {
            let ty = self.parse_type()?;
            let span = Span::new(start, self.last_end());
            self.expect_newline()?;
            return Ok(ComponentDecl {
                name,
                body: ComponentBody::Alias(ty),
                span,
            });
        }

        self.expect_newline()?;
        let mut fields = Vec::new();
        if self.eat(&Token::Indent) {
            while !self.eat(&Token::Dedent) {
                fields.push(self.parse_field()?);
                self.expect_newline()?;
            }
        }
        Ok(ComponentDecl {
            name,
            body: ComponentBody::Fields(fields),
            span: Span::new(start, self.last_end()),
        })
    }

    fn parse_field(&mut self) -> Result<Field> {
        let ty = self.parse_type()?;
        let (name, name_span) = self.expect_ident("field name")?;
        Ok(Field {
            span: Span::new(ty.span.start, name_span.end),
            ty,
            name,
        })
    }

    fn parse_type(&mut self) -> Result<TypeExpr> {
        let (name, span) = self.expect_ident("type name")?;
        let mut args = Vec::new();
        if self.eat(&Token::Lt) {
            loop {
                args.push(self.parse_type()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::Gt, "`>`")?;
        }
        Ok(TypeExpr {
            name,
            args,
            span: Span::new(span.start, self.last_end()),
        })
    }

    /// `event Name(header)` or `event Name` with an indented body.
    fn parse_event(&mut self) -> Result<EventDecl> {
        let start = self.expect(&Token::Event, "`event`")?.start;
        let (name, _) = self.expect_ident("event name")?;

        if self.check(&Token::LParen) {
            let mut event = self.parse_event_header(name)?;
            event.span.start = start;
            self.expect_newline()?;
            return Ok(event);
        }

        self.expect_newline()?;
        let mut roles = Vec::new();
        let mut payload = None;
        if self.eat(&Token::Indent) {
            while !self.eat(&Token::Dedent) {
                self.parse_event_line(&mut roles, &mut payload)?;
                self.expect_newline()?;
            }
        }
        Ok(EventDecl {
            name,
            roles,
            payload,
            span: Span::new(start, self.last_end()),
        })
    }

    /// A line of an event body: `Type name` payload, `role<A, B>` or a bare `A, B` list.
    fn parse_event_line(
        &mut self,
        roles: &mut Vec<RoleDecl>,
        payload: &mut Option<Field>,
    ) -> Result<()> {
        let head = self.parse_type()?;
        if matches!(self.peek(), Some(Token::Ident(_))) {
            return self.set_payload(head, payload);
        }
        if !head.args.is_empty() {
            roles.push(self.role(head)?);
            return Ok(());
        }

        let start = head.span.start;
        let mut components = vec![head.name];
        while self.eat(&Token::Comma) {
            components.push(self.expect_ident("component name")?.0);
        }
        roles.push(RoleDecl {
            name: None,
            components,
            span: Span::new(start, self.last_end()),
        });
        Ok(())
    }

    fn set_payload(&mut self, ty: TypeExpr, payload: &mut Option<Field>) -> Result<()> {
        if payload.is_some() {
            return Err(self.error_at("an event has at most one payload", ty.span));
        }
        let (name, span) = self.expect_ident("parameter name")?;
        *payload = Some(Field {
            span: Span::new(ty.span.start, span.end),
            ty,
            name,
        });
        Ok(())
    }

    /// `Name(role<A>, ..., Type param)`, the name being already consumed.
    fn parse_event_header(&mut self, name: String) -> Result<EventDecl> {
        let start = self.expect(&Token::LParen, "`(`")?.start;
        let mut roles = Vec::new();
        let mut payload = None;
        if !self.eat(&Token::RParen) {
            loop {
                let head = self.parse_type()?;
                if matches!(self.peek(), Some(Token::Ident(_))) {
                    self.set_payload(head, &mut payload)?;
                } else if head.args.is_empty() {
                    return Err(self.error(format!(
                        "expected `<components>` or a parameter name after `{}`",
                        head.name
                    )));
                } else {
                    roles.push(self.role(head)?);
                }
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::RParen, "`,` or `)`")?;
        }
        Ok(EventDecl {
            name,
            roles,
            payload,
            span: Span::new(start, self.last_end()),
        })
    }

    fn parse_system(&mut self) -> Result<SystemDecl> {
        let start = self.expect(&Token::System, "`system`")?.start;
        let (name, _) = self.expect_ident("system name")?;

        self.expect(&Token::LParen, "`(`")?;
        let mut params = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                let head = self.parse_type()?;
                if head.args.is_empty() {
                    return Err(self.error_at("expected `name<components>`", head.span));
                }
                params.push(self.role(head)?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::RParen, "`,` or `)`")?;
        }

        self.expect(&Token::Event, "`event`")?;
        let (event_name, _) = self.expect_ident("event name")?;
        let event = self.parse_event_header(event_name)?;
        let span = Span::new(start, self.last_end());
        self.expect_newline()?;
        let body = self.parse_block()?;

        Ok(SystemDecl {
            name,
            params,
            event,
            body,
            span,
        })
    }

    // Statements

    fn parse_block(&mut self) -> Result<Vec<Stmt>> {
        self.expect(&Token::Indent, "an indented block")?;
        let mut stmts = Vec::new();
        while !self.eat(&Token::Dedent) {
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        match self.peek() {
            Some(Token::If) => self.parse_if(),
            Some(Token::While) => self.parse_while(),
            Some(Token::Emit) => self.parse_emit(),
            Some(Token::Ident(_)) if self.at_declaration() => self.parse_declaration(),
            _ => {
                let expr = self.parse_expr()?;
                if self.check(&Token::Assign) {
                    let Some(target) = expr.as_place() else {
                        return Err(self.error_at("cannot assign to this expression", expr.span()));
                    };
                    self.pos += 1;
                    let value = self.parse_expr()?;
                    let span = Span::new(target.span.start, value.span().end);
                    self.expect_newline()?;
                    return Ok(Stmt::Assign {
                        target,
                        value,
                        span,
                    });
                }
                self.expect_newline()?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    /// `Type name = ...` starts with two identifiers, or with `Optional<`.
    fn at_declaration(&self) -> bool {
        match (self.peek(), self.peek_at(1)) {
            (Some(Token::Ident(_)), Some(Token::Ident(_))) => true,
            (Some(Token::Ident("Optional")), Some(Token::Lt)) => true,
            _ => false,
        }
    }

    fn parse_declaration(&mut self) -> Result<Stmt> {
        let ty = self.parse_type()?;
        let (name, _) = self.expect_ident("variable name")?;
        self.expect(&Token::Assign, "`=`")?;
        let value = self.parse_expr()?;
        let span = Span::new(ty.span.start, value.span().end);
        self.expect_newline()?;
        Ok(Stmt::Declare {
            ty,
            name,
            value,
            span,
        })
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        let start = self.expect(&Token::If, "`if`")?.start;
        let cond = self.parse_expr()?;
        let span = Span::new(start, cond.span().end);
        self.expect_newline()?;
        let then = self.parse_block()?;

        let otherwise = if self.eat(&Token::Else) {
            if self.check(&Token::If) {
                vec![self.parse_if()?]
            } else {
                self.expect_newline()?;
                self.parse_block()?
            }
        } else {
            Vec::new()
        };

        Ok(Stmt::If {
            cond,
            then,
            otherwise,
            span,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt> {
        let start = self.expect(&Token::While, "`while`")?.start;
        let cond = self.parse_expr()?;
        let span = Span::new(start, cond.span().end);
        self.expect_newline()?;
        let body = self.parse_block()?;
        Ok(Stmt::While { cond, body, span })
    }

    fn parse_emit(&mut self) -> Result<Stmt> {
        let start = self.expect(&Token::Emit, "`emit`")?.start;
        let (event, _) = self.expect_ident("event name")?;
        self.expect(&Token::LParen, "`(`")?;
        let args = self.parse_args()?;
        let span = Span::new(start, self.last_end());
        self.expect_newline()?;
        Ok(Stmt::Emit { event, args, span })
    }

    /// Comma-separated expressions up to the closing `)`; the `(` is already consumed.
    fn parse_args(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen, "`,` or `)`")?;
        Ok(args)
    }

    // Expressions, lowest precedence first

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::OrOr) || self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_equality()?;
        while self.eat(&Token::AndAnd) || self.eat(&Token::And) {
            let right = self.parse_equality()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        self.parse_binary(Self::parse_comparison, EQUALITY)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        self.parse_binary(Self::parse_additive, COMPARISON)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        self.parse_binary(Self::parse_multiplicative, ADDITIVE)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        self.parse_binary(Self::parse_unary, MULTIPLICATIVE)
    }

    fn parse_binary(
        &mut self,
        operand: fn(&mut Self) -> Result<Expr>,
        ops: &[(Token<'static>, BinaryOp)],
    ) -> Result<Expr> {
        let mut left = operand(self)?;
        while let Some(op) = ops
            .iter()
            .find(|(token, _)| self.check(token))
            .map(|&(_, op)| op)
        {
            self.pos += 1;
            let right = operand(self)?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let start = self.span().start;
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Bang | Token::Not) => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        self.pos += 1;
        let operand = self.parse_unary()?;
        let span = Span::new(start, operand.span().end);
        Ok(Expr::Unary(op, Box::new(operand), span))
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        while self.eat(&Token::Dot) {
            let (field, span) = self.expect_ident("field name")?;
            let span = Span::new(expr.span().start, span.end);
            expr = Expr::Field(Box::new(expr), field, span);
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let span = self.span();
        let literal = match self.peek() {
            Some(Token::Number(n)) => Some(Value::Number(*n)),
            Some(Token::String(s)) => Some(Value::String((*s).to_string())),
            Some(Token::True) => Some(Value::Boolean(true)),
            Some(Token::False) => Some(Value::Boolean(false)),
            _ => None,
        };
        if let Some(value) = literal {
            self.pos += 1;
            return Ok(Expr::Literal(value, span));
        }

        if let Some(Token::Ident(_)) = self.peek() {
            let (name, span) = self.expect_ident("identifier")?;
            if self.eat(&Token::LParen) {
                let args = self.parse_args()?;
                return Ok(Expr::Call(name, args, Span::new(span.start, self.last_end())));
            }
            return Ok(Expr::Var(name, span));
        }

        if self.eat(&Token::LParen) {
            let first = self.parse_expr()?;
            if !self.eat(&Token::Comma) {
                self.expect(&Token::RParen, "`)`")?;
                return Ok(first);
            }
            let second = self.parse_expr()?;
            self.expect(&Token::Comma, "`,` between vector components")?;
            let third = self.parse_expr()?;
            self.expect(&Token::RParen, "`)` after vector components")?;
            let span = Span::new(span.start, self.last_end());
            return Ok(vector(first, second, third, span));
        }

        Err(self.error("expected an expression"))
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let span = Span::new(left.span().start, right.span().end);
    Expr::Binary(op, Box::new(left), Box::new(right), span)
}

/// A vector of three number literals folds into a single literal.
fn vector(x: Expr, y: Expr, z: Expr, span: Span) -> Expr {
    if let (
        Expr::Literal(Value::Number(x), _),
        Expr::Literal(Value::Number(y), _),
        Expr::Literal(Value::Number(z), _),
    ) = (&x, &y, &z)
    {
        return Expr::Literal(Value::Vec3(DVec3::new(*x, *y, *z)), span);
    }
    Expr::Vector(Box::new([x, y, z]), span)
}

/// `name<A, B>` as a role. Fails with the span of a nested type argument.
fn role_from_type(ty: TypeExpr) -> std::result::Result<RoleDecl, Span> {
    let mut components = Vec::with_capacity(ty.args.len());
    for arg in ty.args {
        if !arg.args.is_empty() {
            return Err(arg.span);
        }
        components.push(arg.name);
    }
    Ok(RoleDecl {
        name: Some(ty.name),
        components,
        span: ty.span,
    })
}
