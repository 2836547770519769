//! Pivot script - declare components, events and systems in an indentation-based language.
//!
//! A script is parsed, checked and compiled into descriptions registered in the host's
//! [`Indexes`](pivot_ecs::Indexes). System bodies run through a tree-walking interpreter
//! whenever a scene dispatches their event.
//!
//! ```
//! use pivot_data::{Record, Value};
//! use pivot_ecs::{Indexes, Scene};
//! use pivot_script::Engine;
//!
//! let source = "\
//! component C
//!     Boolean b
//!
//! system S(anyEntity<C>) event Tick(Number deltaTime)
//!     anyEntity.C.b = True
//! ";
//!
//! let mut indexes = Indexes::new();
//! Engine::new().load_str(source, &mut indexes).unwrap();
//!
//! let mut scene = Scene::new("main");
//! scene.register_system("S", &indexes).unwrap();
//! let entity = scene.create_entity().unwrap();
//! let c = indexes.components.get("C").unwrap();
//! let mut value = Record::new();
//! value.insert("b".into(), Value::Boolean(false));
//! let id = scene.insert(entity, c, Value::Record(value)).unwrap();
//!
//! scene
//!     .send_event(&indexes.events, "Tick", Value::Number(0.016), vec![entity])
//!     .unwrap();
//! let c = scene.get_component(entity, id).unwrap().unwrap();
//! assert_eq!(c.field("b"), Some(&Value::Boolean(true)));
//! ```

pub mod ast;
pub mod lexer;
pub mod parser;

mod builtins;
mod check;
mod engine;
mod error;
mod interpreter;
mod ops;

pub use builtins::{BUILTINS, Builtins, KeyQueryFn, PrintFn};
pub use check::Schemas;
pub use engine::{Engine, LoadSummary};
pub use error::{ParseError, ScriptError, ScriptResult};
pub use interpreter::{CompiledSystem, InterpreterConfig};
pub use parser::parse;
