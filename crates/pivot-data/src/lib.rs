//! Value and Type model for the Pivot runtime.
//!
//! Every piece of component data, event payload and script literal is a [`Value`].
//! Every schema (component layout, event payload contract) is a [`Type`], which mirrors
//! the shape of a `Value` and is only ever used for checking.
//!
//! # Example
//!
//! ```
//! use pivot_data::{BasicType, Record, Type, Value};
//!
//! let mut stats = Record::new();
//! stats.insert("xp".to_string(), Value::Number(42.0));
//! let value = Value::Record(stats);
//!
//! let ty = value.type_of();
//! assert_eq!(ty, Type::record([("xp", Type::Basic(BasicType::Number))]));
//! assert_eq!(Value::default_for(&ty).type_of(), ty);
//! ```

mod error;
mod json;
mod types;
mod value;

pub use error::{DataError, DataResult};
pub use glam::DVec3;
pub use types::{BasicType, RecordType, Type};
pub use value::{Record, Value};
