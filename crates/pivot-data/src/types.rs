//! Schemas mirroring the shape of [`Value`](crate::Value).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Tag of a scalar value kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BasicType {
    /// Double-precision number.
    Number,
    /// Signed integer. Never coerced to or from `Number`.
    Integer,
    /// UTF-8 text.
    String,
    /// `True` / `False`.
    Boolean,
    /// Three double-precision components.
    Vec3,
}

impl BasicType {
    /// Name used in scripts and diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Number => "Number",
            Self::Integer => "Integer",
            Self::String => "String",
            Self::Boolean => "Boolean",
            Self::Vec3 => "Vector3",
        }
    }

    /// Resolve a script type name. `Vec3` is accepted as an alias of `Vector3`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Number" => Some(Self::Number),
            "Integer" => Some(Self::Integer),
            "String" => Some(Self::String),
            "Boolean" => Some(Self::Boolean),
            "Vector3" | "Vec3" => Some(Self::Vec3),
            _ => None,
        }
    }
}

impl fmt::Display for BasicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Field name to field type. Ordered by key so equality ignores declaration order.
pub type RecordType = BTreeMap<String, Type>;

/// Structural schema of a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Basic(BasicType),
    Record(RecordType),
    Optional(Box<Type>),
}

impl Type {
    /// Build a record type from `(field, type)` pairs.
    pub fn record<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Self)>,
        K: Into<String>,
    {
        Self::Record(fields.into_iter().map(|(k, t)| (k.into(), t)).collect())
    }

    /// The record type with no fields, used as the payload of events that carry no data.
    #[must_use]
    pub fn empty_record() -> Self {
        Self::Record(RecordType::new())
    }

    /// Wrap a type in an optional.
    #[must_use]
    pub fn optional(inner: Self) -> Self {
        Self::Optional(Box::new(inner))
    }

    /// The scalar tag, if this is a basic type.
    #[must_use]
    pub const fn basic(&self) -> Option<BasicType> {
        match self {
            Self::Basic(basic) => Some(*basic),
            _ => None,
        }
    }

    /// Type of a record field, if this is a record type that has it.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Self> {
        match self {
            Self::Record(fields) => fields.get(name),
            _ => None,
        }
    }
}

impl From<BasicType> for Type {
    fn from(basic: BasicType) -> Self {
        Self::Basic(basic)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic(basic) => write!(f, "{basic}"),
            Self::Record(fields) => {
                write!(f, "Record {{")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " {name}: {ty}")?;
                }
                if !fields.is_empty() {
                    write!(f, " ")?;
                }
                write!(f, "}}")
            }
            Self::Optional(inner) => write!(f, "Optional<{inner}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_equality_ignores_order() {
        let a = Type::record([
            ("x", Type::Basic(BasicType::Number)),
            ("name", Type::Basic(BasicType::String)),
        ]);
        let b = Type::record([
            ("name", Type::Basic(BasicType::String)),
            ("x", Type::Basic(BasicType::Number)),
        ]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_number_and_integer_differ() {
        assert_ne!(
            Type::Basic(BasicType::Number),
            Type::Basic(BasicType::Integer)
        );
    }

    #[test]
    fn test_display() {
        let ty = Type::record([
            ("b", Type::Basic(BasicType::Boolean)),
            ("hp", Type::optional(Type::Basic(BasicType::Integer))),
        ]);
        assert_eq!(ty.to_string(), "Record { b: Boolean, hp: Optional<Integer> }");
        assert_eq!(Type::empty_record().to_string(), "Record {}");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(BasicType::from_name("Vec3"), Some(BasicType::Vec3));
        assert_eq!(BasicType::from_name("Vector3"), Some(BasicType::Vec3));
        assert_eq!(BasicType::from_name("number"), None);
    }
}
