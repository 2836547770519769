//! Host functions callable from scripts.

use std::fmt;
use std::sync::Arc;

use pivot_data::{Record, Value};
use tracing::info;

use crate::error::{ScriptError, ScriptResult};

/// Names a script may call.
pub const BUILTINS: &[&str] = &["print", "isPressed"];

pub type PrintFn = Arc<dyn Fn(&str) + Send + Sync>;
pub type KeyQueryFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Host hooks behind the builtins.
///
/// `print` logs through `tracing` and `isPressed` reports every key as pressed unless
/// the host installs its own hooks. A host without an input source should replace the
/// key query.
#[derive(Clone)]
pub struct Builtins {
    print: PrintFn,
    is_pressed: KeyQueryFn,
}

impl Default for Builtins {
    fn default() -> Self {
        Self {
            print: Arc::new(|line| info!(target: "pivot::script", "{line}")),
            is_pressed: Arc::new(|_| true),
        }
    }
}

impl fmt::Debug for Builtins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtins").finish_non_exhaustive()
    }
}

impl Builtins {
    pub fn with_print(mut self, print: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.print = Arc::new(print);
        self
    }

    pub fn with_is_pressed(
        mut self,
        is_pressed: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.is_pressed = Arc::new(is_pressed);
        self
    }

    pub fn contains(name: &str) -> bool {
        BUILTINS.contains(&name)
    }

    /// Call a builtin by name from the system `system`.
    pub fn call(&self, system: &str, name: &str, args: &[Value]) -> ScriptResult<Value> {
        match name {
            "print" => {
                let line = args
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                (self.print)(&line);
                Ok(Value::Record(Record::new()))
            }
            "isPressed" => match args {
                [Value::String(key)] => Ok(Value::Boolean((self.is_pressed)(key))),
                _ => Err(ScriptError::BuiltinArguments {
                    name: name.to_string(),
                    reason: "expected a single String key".to_string(),
                }),
            },
            _ => Err(ScriptError::UnknownFunction {
                name: name.to_string(),
                system: system.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn test_print_joins_with_spaces() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let builtins = Builtins::default()
            .with_print(move |line| sink.lock().unwrap().push(line.to_string()));

        let result = builtins
            .call("S", "print", &[Value::from("xp"), Value::Number(2542.0), Value::Boolean(true)])
            .unwrap();

        assert_eq!(result, Value::Record(Record::new()));
        assert_eq!(*lines.lock().unwrap(), vec!["xp 2542 true".to_string()]);
    }

    #[test]
    fn test_is_pressed() {
        assert_eq!(
            Builtins::default().call("S", "isPressed", &[Value::from("W")]).unwrap(),
            Value::Boolean(true)
        );

        let builtins = Builtins::default().with_is_pressed(|key| key == "W");
        assert_eq!(
            builtins.call("S", "isPressed", &[Value::from("W")]).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            builtins.call("S", "isPressed", &[Value::from("S")]).unwrap(),
            Value::Boolean(false)
        );
        assert!(matches!(
            builtins.call("S", "isPressed", &[Value::Number(1.0)]),
            Err(ScriptError::BuiltinArguments { .. })
        ));
    }

    #[test]
    fn test_unknown_function() {
        let err = Builtins::default().call("S", "spawn", &[]).unwrap_err();
        assert_eq!(err.to_string(), "unknown function `spawn` in system `S`");
    }
}
