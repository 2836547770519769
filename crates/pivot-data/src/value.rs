//! Tagged runtime values.

use std::collections::BTreeMap;
use std::fmt;

use glam::DVec3;

use crate::{BasicType, DataError, DataResult, Type};

/// Field name to field value. Ordered by key so equality ignores insertion order.
pub type Record = BTreeMap<String, Value>;

/// A runtime value.
///
/// `Number` and `Integer` are distinct kinds: nothing converts between them implicitly.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Integer(i64),
    String(String),
    Boolean(bool),
    Vec3(DVec3),
    Record(Record),
    /// An optional carries its inner type so that an empty optional still has a type.
    Optional {
        inner: Type,
        value: Option<Box<Value>>,
    },
}

impl Value {
    /// An optional holding `value`.
    #[must_use]
    pub fn some(value: Self) -> Self {
        Self::Optional {
            inner: value.type_of(),
            value: Some(Box::new(value)),
        }
    }

    /// An empty optional of the given inner type.
    #[must_use]
    pub const fn none(inner: Type) -> Self {
        Self::Optional { inner, value: None }
    }

    /// Compute the structural type of this value.
    #[must_use]
    pub fn type_of(&self) -> Type {
        match self {
            Self::Record(record) => Type::Record(
                record
                    .iter()
                    .map(|(name, value)| (name.clone(), value.type_of()))
                    .collect(),
            ),
            Self::Optional { inner, .. } => Type::optional(inner.clone()),
            Self::Number(_) => Type::Basic(BasicType::Number),
            Self::Integer(_) => Type::Basic(BasicType::Integer),
            Self::String(_) => Type::Basic(BasicType::String),
            Self::Boolean(_) => Type::Basic(BasicType::Boolean),
            Self::Vec3(_) => Type::Basic(BasicType::Vec3),
        }
    }

    /// The scalar tag of this value, or `None` for records and optionals.
    #[must_use]
    pub const fn basic_type(&self) -> Option<BasicType> {
        match self {
            Self::Number(_) => Some(BasicType::Number),
            Self::Integer(_) => Some(BasicType::Integer),
            Self::String(_) => Some(BasicType::String),
            Self::Boolean(_) => Some(BasicType::Boolean),
            Self::Vec3(_) => Some(BasicType::Vec3),
            Self::Record(_) | Self::Optional { .. } => None,
        }
    }

    /// The default value of a schema: zeroes, empty text, `false`, empty optionals.
    #[must_use]
    pub fn default_for(ty: &Type) -> Self {
        match ty {
            Type::Basic(BasicType::Number) => Self::Number(0.0),
            Type::Basic(BasicType::Integer) => Self::Integer(0),
            Type::Basic(BasicType::String) => Self::String(String::new()),
            Type::Basic(BasicType::Boolean) => Self::Boolean(false),
            Type::Basic(BasicType::Vec3) => Self::Vec3(DVec3::ZERO),
            Type::Record(fields) => Self::Record(
                fields
                    .iter()
                    .map(|(name, ty)| (name.clone(), Self::default_for(ty)))
                    .collect(),
            ),
            Type::Optional(inner) => Self::none((**inner).clone()),
        }
    }

    /// Check that this value has exactly the type `expected`.
    pub fn check(&self, expected: &Type) -> DataResult<()> {
        let found = self.type_of();
        if &found == expected {
            Ok(())
        } else {
            Err(DataError::TypeMismatch {
                expected: expected.clone(),
                found,
            })
        }
    }

    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_vec3(&self) -> Option<DVec3> {
        match self {
            Self::Vec3(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Field of a record value.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Self> {
        self.as_record()?.get(name)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<DVec3> for Value {
    fn from(v: DVec3) -> Self {
        Self::Vec3(v)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::String(s) => f.write_str(s),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Vec3(v) => write!(f, "({}, {}, {})", v.x, v.y, v.z),
            Self::Record(record) => {
                write!(f, "{{")?;
                for (i, (name, value)) in record.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                write!(f, "}}")
            }
            Self::Optional { value: Some(v), .. } => write!(f, "{v}"),
            Self::Optional { value: None, .. } => write!(f, "none"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(xp: f64) -> Value {
        let mut record = Record::new();
        record.insert("xp".into(), Value::Number(xp));
        record.insert("name".into(), Value::from("hero"));
        Value::Record(record)
    }

    #[test]
    fn test_type_of_record() {
        let ty = stats(1.0).type_of();
        assert_eq!(
            ty,
            Type::record([
                ("name", Type::Basic(BasicType::String)),
                ("xp", Type::Basic(BasicType::Number)),
            ])
        );
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(stats(3.0), stats(3.0));
        assert_ne!(stats(3.0), stats(4.0));
        assert_ne!(Value::Number(1.0), Value::Integer(1));
    }

    #[test]
    fn test_empty_optional_keeps_type() {
        let none = Value::none(Type::Basic(BasicType::String));
        assert_eq!(
            none.type_of(),
            Type::optional(Type::Basic(BasicType::String))
        );
        assert_eq!(Value::some(Value::from("a")).type_of(), none.type_of());
    }

    #[test]
    fn test_default_matches_type() {
        let ty = Type::record([
            ("pos", Type::Basic(BasicType::Vec3)),
            ("tag", Type::optional(Type::Basic(BasicType::String))),
            ("count", Type::Basic(BasicType::Integer)),
        ]);
        let value = Value::default_for(&ty);
        assert!(value.check(&ty).is_ok());
        assert_eq!(value.field("count"), Some(&Value::Integer(0)));
    }

    #[test]
    fn test_check_reports_mismatch() {
        let err = Value::Boolean(true)
            .check(&Type::Basic(BasicType::Number))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "type mismatch: expected Number, found Boolean"
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Number(42.0).to_string(), "42");
        assert_eq!(Value::Vec3(DVec3::new(1.0, 2.5, 3.0)).to_string(), "(1, 2.5, 3)");
        assert_eq!(stats(2.0).to_string(), "{name: hero, xp: 2}");
    }
}
