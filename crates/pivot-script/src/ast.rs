//! Abstract syntax tree for Pivot scripts.
//!
//! The tree owns its strings so that compiled systems can share it behind an `Arc`
//! independently of the source text.

use std::fmt;

use pivot_data::Value;

use crate::lexer::Span;

/// A parsed script file.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Component(ComponentDecl),
    Event(EventDecl),
    System(SystemDecl),
}

/// A type as written: a name with optional type arguments (`Optional<String>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeExpr {
    pub name: String,
    pub args: Vec<TypeExpr>,
    pub span: Span,
}

/// `Type name`, as found in component bodies and payload parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub ty: TypeExpr,
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComponentBody {
    /// `component Name = Type`
    Alias(TypeExpr),
    /// Indented `Type field` lines.
    Fields(Vec<Field>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDecl {
    pub name: String,
    pub body: ComponentBody,
    pub span: Span,
}

/// An entity slot: `name<A, B>` in headers, or a bare `A, B` list in event bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDecl {
    pub name: Option<String>,
    pub components: Vec<String>,
    pub span: Span,
}

/// An event contract, either declared on its own or in a system header.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDecl {
    pub name: String,
    pub roles: Vec<RoleDecl>,
    pub payload: Option<Field>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemDecl {
    pub name: String,
    pub params: Vec<RoleDecl>,
    pub event: EventDecl,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// An assignable location: a variable followed by field names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Place {
    pub root: String,
    pub path: Vec<String>,
    pub span: Span,
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root)?;
        for field in &self.path {
            write!(f, ".{field}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign {
        target: Place,
        value: Expr,
        span: Span,
    },
    /// `Type name = value`
    Declare {
        ty: TypeExpr,
        name: String,
        value: Expr,
        span: Span,
    },
    Expr(Expr),
    If {
        cond: Expr,
        then: Vec<Stmt>,
        otherwise: Vec<Stmt>,
        span: Span,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
        span: Span,
    },
    /// `emit Name(entity..., payload)`
    Emit {
        event: String,
        args: Vec<Expr>,
        span: Span,
    },
}

impl Stmt {
    pub const fn span(&self) -> Span {
        match self {
            Self::Assign { span, .. }
            | Self::Declare { span, .. }
            | Self::If { span, .. }
            | Self::While { span, .. }
            | Self::Emit { span, .. } => *span,
            Self::Expr(expr) => expr.span(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::LtEq => "<=",
            Self::GtEq => ">=",
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "not",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value, Span),
    Var(String, Span),
    Field(Box<Expr>, String, Span),
    Unary(UnaryOp, Box<Expr>, Span),
    Binary(BinaryOp, Box<Expr>, Box<Expr>, Span),
    Call(String, Vec<Expr>, Span),
    /// `(x, y, z)` with non-literal parts.
    Vector(Box<[Expr; 3]>, Span),
}

impl Expr {
    pub const fn span(&self) -> Span {
        match self {
            Self::Literal(_, span)
            | Self::Var(_, span)
            | Self::Field(_, _, span)
            | Self::Unary(_, _, span)
            | Self::Binary(_, _, _, span)
            | Self::Call(_, _, span)
            | Self::Vector(_, span) => *span,
        }
    }

    /// The variable and field names of a `a.b.c` chain.
    pub fn as_place(&self) -> Option<Place> {
        match self {
            Self::Var(name, span) => Some(Place {
                root: name.clone(),
                path: Vec::new(),
                span: *span,
            }),
            Self::Field(base, field, span) => {
                let mut place = base.as_place()?;
                place.path.push(field.clone());
                place.span = *span;
                Some(place)
            }
            _ => None,
        }
    }
}
