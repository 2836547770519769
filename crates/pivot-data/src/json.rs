//! Interchange encoding of values as JSON documents.
//!
//! Numbers, strings and booleans map onto their JSON equivalents, a 3-vector is an
//! array of exactly three numbers and a record is an object. Documents that carry
//! a fraction or exponent decode to `Number`, plain integers to `Integer`.

use glam::DVec3;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value as Json};

use crate::{BasicType, DataError, DataResult, Record, Type, Value};

impl Value {
    /// Encode into a JSON document.
    ///
    /// A filled optional encodes as its inner value and an empty one as `null`, so only
    /// [`Value::from_json_typed`] restores optionals; [`Value::from_json`] yields the bare
    /// inner value.
    pub fn to_json(&self) -> DataResult<Json> {
        Ok(match self {
            Self::Number(n) => Json::Number(finite(*n)?),
            Self::Integer(i) => Json::from(*i),
            Self::String(s) => Json::String(s.clone()),
            Self::Boolean(b) => Json::Bool(*b),
            Self::Vec3(v) => Json::Array(vec![
                Json::Number(finite(v.x)?),
                Json::Number(finite(v.y)?),
                Json::Number(finite(v.z)?),
            ]),
            Self::Record(record) => {
                let mut object = Map::new();
                for (name, value) in record {
                    object.insert(name.clone(), value.to_json()?);
                }
                Json::Object(object)
            }
            Self::Optional { value: Some(v), .. } => v.to_json()?,
            Self::Optional { value: None, .. } => Json::Null,
        })
    }

    /// Decode a JSON document without a schema.
    ///
    /// `null` is rejected since the inner type of an empty optional cannot be inferred;
    /// use [`Value::from_json_typed`] when a schema is at hand.
    pub fn from_json(json: &Json) -> DataResult<Self> {
        match json {
            Json::Bool(b) => Ok(Self::Boolean(*b)),
            Json::String(s) => Ok(Self::String(s.clone())),
            Json::Number(n) => decode_number(n),
            Json::Array(items) => decode_vec3(items).map(Self::Vec3),
            Json::Object(object) => {
                let mut record = Record::new();
                for (name, item) in object {
                    record.insert(name.clone(), Self::from_json(item)?);
                }
                Ok(Self::Record(record))
            }
            Json::Null => Err(DataError::Decode(
                "null has no type without a schema".to_string(),
            )),
        }
    }

    /// Decode a JSON document against a schema.
    ///
    /// Integer documents are accepted where a `Number` is expected, `null` (or a missing
    /// record field) where an optional is expected.
    pub fn from_json_typed(json: &Json, ty: &Type) -> DataResult<Self> {
        match ty {
            Type::Basic(basic) => decode_basic(json, *basic),
            Type::Optional(inner) => match json {
                Json::Null => Ok(Self::none((**inner).clone())),
                other => Ok(Self::Optional {
                    inner: (**inner).clone(),
                    value: Some(Box::new(Self::from_json_typed(other, inner)?)),
                }),
            },
            Type::Record(fields) => {
                let Json::Object(object) = json else {
                    return Err(unexpected(json, ty));
                };
                if let Some(extra) = object.keys().find(|key| !fields.contains_key(*key)) {
                    return Err(DataError::Decode(format!("unknown field `{extra}` for {ty}")));
                }
                let mut record = Record::new();
                for (name, field_ty) in fields {
                    let value = match (object.get(name), field_ty) {
                        (Some(item), _) => Self::from_json_typed(item, field_ty)?,
                        (None, Type::Optional(inner)) => Self::none((**inner).clone()),
                        (None, _) => {
                            return Err(DataError::Decode(format!("missing field `{name}`")));
                        }
                    };
                    record.insert(name.clone(), value);
                }
                Ok(Self::Record(record))
            }
        }
    }
}

fn finite(n: f64) -> DataResult<Number> {
    Number::from_f64(n).ok_or(DataError::NonFinite(n))
}

fn decode_number(n: &Number) -> DataResult<Value> {
    if n.is_f64() {
        n.as_f64()
            .map(Value::Number)
            .ok_or_else(|| DataError::Decode(format!("bad number {n}")))
    } else if let Some(i) = n.as_i64() {
        Ok(Value::Integer(i))
    } else {
        Err(DataError::Decode(format!("integer {n} out of range")))
    }
}

fn decode_vec3(items: &[Json]) -> DataResult<DVec3> {
    let [x, y, z] = items else {
        return Err(DataError::Decode(format!(
            "expected an array of 3 numbers, found {} elements",
            items.len()
        )));
    };
    let component = |item: &Json| {
        item.as_f64()
            .ok_or_else(|| DataError::Decode(format!("vector component {item} is not a number")))
    };
    Ok(DVec3::new(component(x)?, component(y)?, component(z)?))
}

fn decode_basic(json: &Json, basic: BasicType) -> DataResult<Value> {
    let ty = Type::Basic(basic);
    match (basic, json) {
        (BasicType::Number, Json::Number(n)) => n
            .as_f64()
            .map(Value::Number)
            .ok_or_else(|| unexpected(json, &ty)),
        (BasicType::Integer, Json::Number(n)) => n
            .as_i64()
            .map(Value::Integer)
            .ok_or_else(|| unexpected(json, &ty)),
        (BasicType::String, Json::String(s)) => Ok(Value::String(s.clone())),
        (BasicType::Boolean, Json::Bool(b)) => Ok(Value::Boolean(*b)),
        (BasicType::Vec3, Json::Array(items)) => decode_vec3(items).map(Value::Vec3),
        _ => Err(unexpected(json, &ty)),
    }
}

fn unexpected(json: &Json, ty: &Type) -> DataError {
    DataError::Decode(format!("expected {ty}, found {json}"))
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = Json::deserialize(deserializer)?;
        Self::from_json(&json).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn roundtrip(value: &Value) -> Value {
        Value::from_json(&value.to_json().unwrap()).unwrap()
    }

    #[test]
    fn test_roundtrip_scalars_and_records() {
        let mut inventory = Record::new();
        inventory.insert("gold".into(), Value::Number(69.0));
        inventory.insert("owner".into(), Value::from("Thrax"));
        inventory.insert("open".into(), Value::Boolean(false));
        inventory.insert("at".into(), Value::Vec3(DVec3::new(1.5, -2.0, 0.25)));
        let value = Value::Record(inventory);

        assert_eq!(roundtrip(&value), value);
        assert_eq!(roundtrip(&Value::Number(42.0)), Value::Number(42.0));
        assert_eq!(roundtrip(&Value::Integer(-7)), Value::Integer(-7));
    }

    #[test]
    fn test_decode_shapes() {
        assert_eq!(Value::from_json(&json!(1.5)).unwrap(), Value::Number(1.5));
        assert_eq!(Value::from_json(&json!(3)).unwrap(), Value::Integer(3));
        assert_eq!(
            Value::from_json(&json!([0, 1, 2.5])).unwrap(),
            Value::Vec3(DVec3::new(0.0, 1.0, 2.5))
        );
    }

    #[test]
    fn test_decode_rejects_other_array_lengths() {
        assert!(Value::from_json(&json!([1, 2])).is_err());
        assert!(Value::from_json(&json!([1, 2, 3, 4])).is_err());
        assert!(Value::from_json(&json!(["a", 2, 3])).is_err());
        assert!(Value::from_json(&json!(null)).is_err());
    }

    #[test]
    fn test_optionals_need_a_schema() {
        let ty = Type::record([("title", Type::optional(Type::Basic(BasicType::String)))]);
        let mut record = Record::new();
        record.insert("title".into(), Value::some(Value::from("slayer")));
        let value = Value::Record(record);
        let json = value.to_json().unwrap();
        assert_eq!(json, json!({ "title": "slayer" }));

        let untyped = Value::from_json(&json).unwrap();
        assert_eq!(untyped.field("title"), Some(&Value::from("slayer")));
        assert_eq!(Value::from_json_typed(&json, &ty).unwrap(), value);
    }

    #[test]
    fn test_non_finite_is_not_encodable() {
        assert!(matches!(
            Value::Number(f64::NAN).to_json(),
            Err(DataError::NonFinite(_))
        ));
    }

    #[test]
    fn test_typed_decode() {
        let ty = Type::record([
            ("xp", Type::Basic(BasicType::Number)),
            ("title", Type::optional(Type::Basic(BasicType::String))),
        ]);
        let value = Value::from_json_typed(&json!({ "xp": 42 }), &ty).unwrap();
        assert_eq!(value.field("xp"), Some(&Value::Number(42.0)));
        assert!(value.check(&ty).is_ok());

        let titled = Value::from_json_typed(&json!({ "xp": 1.0, "title": "sir" }), &ty).unwrap();
        assert_eq!(titled.field("title"), Some(&Value::some(Value::from("sir"))));

        assert!(Value::from_json_typed(&json!({ "xp": 1, "hp": 2 }), &ty).is_err());
        assert!(Value::from_json_typed(&json!({ "title": "sir" }), &ty).is_err());
    }

    #[test]
    fn test_serde_impls() {
        let value = Value::Vec3(DVec3::new(1.0, 2.0, 3.0));
        let text = serde_json::to_string(&value).unwrap();
        assert_eq!(text, "[1.0,2.0,3.0]");
        let back: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back, value);
    }
}
