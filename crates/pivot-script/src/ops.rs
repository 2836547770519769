//! Operator semantics.
//!
//! Operators are total only over the kinds listed below; every other pairing is an
//! [`ScriptError::InvalidOperation`] naming both operand types. `Number` and `Integer`
//! never mix.
//!
//! | operator            | operands                          |
//! |---------------------|-----------------------------------|
//! | `==` `!=`           | Number, String, Boolean, Vector3  |
//! | `<` `>` `<=` `>=`   | Number, String                    |
//! | `+`                 | Number, String, Vector3           |
//! | `-` `*` `/`         | Number, Vector3                   |
//! | `%`                 | Integer                           |
//! | `and` `or`          | Boolean                           |

use pivot_data::{DVec3, Value};

use crate::ast::{BinaryOp, UnaryOp};
use crate::error::{ScriptError, ScriptResult};

/// Apply a binary operator.
pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> ScriptResult<Value> {
    use Value::{Boolean, Integer, Number, String as Text, Vec3};

    let value = match (op, left, right) {
        (BinaryOp::Eq | BinaryOp::NotEq, Number(_), Number(_))
        | (BinaryOp::Eq | BinaryOp::NotEq, Text(_), Text(_))
        | (BinaryOp::Eq | BinaryOp::NotEq, Boolean(_), Boolean(_))
        | (BinaryOp::Eq | BinaryOp::NotEq, Vec3(_), Vec3(_)) => {
            Boolean((left == right) == (op == BinaryOp::Eq))
        }

        (BinaryOp::Lt, Number(l), Number(r)) => Boolean(l < r),
        (BinaryOp::Gt, Number(l), Number(r)) => Boolean(l > r),
        (BinaryOp::LtEq, Number(l), Number(r)) => Boolean(l <= r),
        (BinaryOp::GtEq, Number(l), Number(r)) => Boolean(l >= r),
        (BinaryOp::Lt, Text(l), Text(r)) => Boolean(l < r),
        (BinaryOp::Gt, Text(l), Text(r)) => Boolean(l > r),
        (BinaryOp::LtEq, Text(l), Text(r)) => Boolean(l <= r),
        (BinaryOp::GtEq, Text(l), Text(r)) => Boolean(l >= r),

        (BinaryOp::Add, Number(l), Number(r)) => Number(l + r),
        (BinaryOp::Add, Text(l), Text(r)) => Text(format!("{l}{r}")),
        (BinaryOp::Add, Vec3(l), Vec3(r)) => Vec3(*l + *r),
        (BinaryOp::Sub, Number(l), Number(r)) => Number(l - r),
        (BinaryOp::Sub, Vec3(l), Vec3(r)) => Vec3(*l - *r),
        (BinaryOp::Mul, Number(l), Number(r)) => Number(l * r),
        (BinaryOp::Mul, Vec3(l), Vec3(r)) => Vec3(*l * *r),
        (BinaryOp::Div, Number(l), Number(r)) => Number(divide(*l, *r)?),
        (BinaryOp::Div, Vec3(l), Vec3(r)) => Vec3(divide_vec3(*l, *r)?),
        (BinaryOp::Mod, Integer(l), Integer(r)) => {
            if *r == 0 {
                return Err(ScriptError::ModuloByZero);
            }
            Integer(l.wrapping_rem(*r))
        }

        (BinaryOp::And, Boolean(l), Boolean(r)) => Boolean(*l && *r),
        (BinaryOp::Or, Boolean(l), Boolean(r)) => Boolean(*l || *r),

        _ => {
            return Err(ScriptError::InvalidOperation {
                op: op.symbol(),
                left: left.type_of(),
                right: right.type_of(),
            });
        }
    };
    Ok(value)
}

/// Apply a unary operator.
pub fn unary(op: UnaryOp, operand: &Value) -> ScriptResult<Value> {
    match (op, operand) {
        (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
        (UnaryOp::Neg, Value::Integer(i)) => Ok(Value::Integer(i.wrapping_neg())),
        (UnaryOp::Neg, Value::Vec3(v)) => Ok(Value::Vec3(-*v)),
        (UnaryOp::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
        _ => Err(ScriptError::InvalidUnary {
            op: op.symbol(),
            operand: operand.type_of(),
        }),
    }
}

#[allow(clippy::float_cmp)]
fn divide(left: f64, right: f64) -> ScriptResult<f64> {
    if right == 0.0 {
        return Err(ScriptError::DivisionByZero);
    }
    Ok(left / right)
}

fn divide_vec3(left: DVec3, right: DVec3) -> ScriptResult<DVec3> {
    Ok(DVec3::new(
        divide(left.x, right.x)?,
        divide(left.y, right.y)?,
        divide(left.z, right.z)?,
    ))
}

#[cfg(test)]
mod tests {
    use pivot_data::{BasicType, Type};
    use pivot_ecs::ErrorKind;

    use super::*;

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    #[test]
    fn test_number_arithmetic() {
        assert_eq!(binary(BinaryOp::Add, &num(2.0), &num(3.0)).unwrap(), num(5.0));
        assert_eq!(binary(BinaryOp::Sub, &num(2.0), &num(3.0)).unwrap(), num(-1.0));
        assert_eq!(binary(BinaryOp::Mul, &num(2.0), &num(3.0)).unwrap(), num(6.0));
        assert_eq!(binary(BinaryOp::Div, &num(3.0), &num(2.0)).unwrap(), num(1.5));
    }

    #[test]
    fn test_string_concatenation() {
        let joined = binary(BinaryOp::Add, &Value::from("a"), &Value::from("b")).unwrap();
        assert_eq!(joined, Value::from("ab"));

        let err = binary(BinaryOp::Sub, &Value::from("a"), &Value::from("b")).unwrap_err();
        assert!(matches!(err, ScriptError::InvalidOperation { op: "-", .. }));
    }

    #[test]
    fn test_vector_componentwise() {
        let a = Value::Vec3(DVec3::new(1.0, 2.0, 3.0));
        let b = Value::Vec3(DVec3::new(4.0, 5.0, 6.0));
        assert_eq!(
            binary(BinaryOp::Add, &a, &b).unwrap(),
            Value::Vec3(DVec3::new(5.0, 7.0, 9.0))
        );
        assert_eq!(
            binary(BinaryOp::Mul, &a, &b).unwrap(),
            Value::Vec3(DVec3::new(4.0, 10.0, 18.0))
        );
        assert_eq!(binary(BinaryOp::Eq, &a, &a).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_division_by_zero() {
        let err = binary(BinaryOp::Div, &num(1.0), &num(0.0)).unwrap_err();
        assert_eq!(err.to_string(), "Cannot divide by zero.");
        assert_eq!(err.kind(), ErrorKind::RuntimeOperation);

        let a = Value::Vec3(DVec3::ONE);
        let b = Value::Vec3(DVec3::new(1.0, 0.0, 1.0));
        assert!(matches!(
            binary(BinaryOp::Div, &a, &b),
            Err(ScriptError::DivisionByZero)
        ));
    }

    #[test]
    fn test_modulo_integers_only() {
        assert_eq!(
            binary(BinaryOp::Mod, &Value::Integer(7), &Value::Integer(3)).unwrap(),
            Value::Integer(1)
        );
        let err = binary(BinaryOp::Mod, &Value::Integer(7), &Value::Integer(0)).unwrap_err();
        assert_eq!(err.to_string(), "Cannot modulo by zero.");
        assert!(binary(BinaryOp::Mod, &num(7.0), &num(3.0)).is_err());
    }

    #[test]
    fn test_mismatched_kinds() {
        let err = binary(BinaryOp::Add, &num(1.0), &Value::Boolean(true)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
        assert_eq!(
            err.to_string(),
            "invalid operation `+` between Number and Boolean"
        );
        assert!(binary(BinaryOp::Eq, &num(1.0), &Value::Integer(1)).is_err());
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(binary(BinaryOp::Lt, &num(1.0), &num(2.0)).unwrap(), Value::Boolean(true));
        assert_eq!(
            binary(BinaryOp::GtEq, &Value::from("b"), &Value::from("a")).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            binary(BinaryOp::NotEq, &Value::Boolean(true), &Value::Boolean(true)).unwrap(),
            Value::Boolean(false)
        );
        assert!(binary(BinaryOp::Lt, &Value::Boolean(true), &Value::Boolean(false)).is_err());
    }

    #[test]
    fn test_logic_requires_booleans() {
        let t = Value::Boolean(true);
        let f = Value::Boolean(false);
        assert_eq!(binary(BinaryOp::And, &t, &f).unwrap(), f);
        assert_eq!(binary(BinaryOp::Or, &t, &f).unwrap(), t);
        assert!(binary(BinaryOp::And, &t, &num(1.0)).is_err());
    }

    #[test]
    fn test_unary() {
        assert_eq!(unary(UnaryOp::Neg, &num(2.0)).unwrap(), num(-2.0));
        assert_eq!(
            unary(UnaryOp::Not, &Value::Boolean(false)).unwrap(),
            Value::Boolean(true)
        );
        let err = unary(UnaryOp::Not, &num(1.0)).unwrap_err();
        assert!(matches!(
            err,
            ScriptError::InvalidUnary { operand: Type::Basic(BasicType::Number), .. }
        ));
    }
}
