//! Load-time checks: type resolution and name binding in system bodies.

use hashbrown::{HashMap, HashSet};
use pivot_data::{BasicType, Type};
use pivot_ecs::EventIndex;

use crate::ast::{Expr, Place, Stmt, SystemDecl, TypeExpr};
use crate::builtins::Builtins;
use crate::error::{ScriptError, ScriptResult};

/// Component schemas by name, used to resolve written types.
#[derive(Debug, Clone, Default)]
pub struct Schemas {
    components: HashMap<String, Type>,
}

impl Schemas {
    pub fn insert(&mut self, name: impl Into<String>, ty: Type) {
        self.components.insert(name.into(), ty);
    }

    pub fn get(&self, name: &str) -> Option<&Type> {
        self.components.get(name)
    }

    /// Resolve a written type: a basic type, `Optional<T>`, or a component name.
    pub fn resolve(&self, ty: &TypeExpr, source: &str) -> ScriptResult<Type> {
        let unknown = || ScriptError::UnknownType {
            name: written(ty),
            line: ty.span.line_col(source).0,
        };
        match (ty.name.as_str(), ty.args.as_slice()) {
            ("Optional", [inner]) => Ok(Type::optional(self.resolve(inner, source)?)),
            (name, []) => BasicType::from_name(name)
                .map(Type::Basic)
                .or_else(|| self.components.get(name).cloned())
                .ok_or_else(unknown),
            _ => Err(unknown()),
        }
    }
}

fn written(ty: &TypeExpr) -> String {
    if ty.args.is_empty() {
        return ty.name.clone();
    }
    let args: Vec<String> = ty.args.iter().map(written).collect();
    format!("{}<{}>", ty.name, args.join(", "))
}

/// Check the bindings of a system body against the events known at load time.
pub fn check_system(
    system: &SystemDecl,
    events: &EventIndex,
    schemas: &Schemas,
    source: &str,
) -> ScriptResult<()> {
    let mut checker = Checker {
        system,
        events,
        schemas,
        source,
        entities: HashMap::new(),
        locals: HashSet::new(),
    };
    checker.bind()?;
    checker.block(&system.body)
}

struct Checker<'a> {
    system: &'a SystemDecl,
    events: &'a EventIndex,
    schemas: &'a Schemas,
    source: &'a str,
    /// Entity bindings and the components each declares.
    entities: HashMap<&'a str, &'a [String]>,
    /// Flat scope: a local is visible after its first assignment anywhere in the body.
    locals: HashSet<&'a str>,
}

impl<'a> Checker<'a> {
    fn bind(&mut self) -> ScriptResult<()> {
        let system = self.system;
        for role in system.params.iter().chain(&system.event.roles) {
            let Some(name) = role.name.as_deref() else {
                continue;
            };
            if self.entities.insert(name, role.components.as_slice()).is_some() {
                return Err(self.duplicate(name));
            }
        }
        if let Some(payload) = &system.event.payload {
            if self.entities.contains_key(payload.name.as_str()) {
                return Err(self.duplicate(&payload.name));
            }
            self.locals.insert(&payload.name);
        }
        Ok(())
    }

    fn block(&mut self, stmts: &'a [Stmt]) -> ScriptResult<()> {
        for stmt in stmts {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &'a Stmt) -> ScriptResult<()> {
        match stmt {
            Stmt::Assign { target, value, .. } => {
                self.expr(value)?;
                self.place(target)
            }
            Stmt::Declare {
                ty, name, value, ..
            } => {
                self.schemas.resolve(ty, self.source)?;
                self.expr(value)?;
                if self.entities.contains_key(name.as_str()) {
                    return Err(self.duplicate(name));
                }
                self.locals.insert(name);
                Ok(())
            }
            Stmt::Expr(expr) => self.expr(expr),
            Stmt::If {
                cond,
                then,
                otherwise,
                ..
            } => {
                self.expr(cond)?;
                self.block(then)?;
                self.block(otherwise)
            }
            Stmt::While { cond, body, .. } => {
                self.expr(cond)?;
                self.block(body)
            }
            Stmt::Emit { event, args, .. } => self.emit(event, args),
        }
    }

    fn place(&mut self, place: &'a Place) -> ScriptResult<()> {
        if let Some(&components) = self.entities.get(place.root.as_str()) {
            return match place.path.first() {
                Some(component) => self.component(&place.root, components, component),
                None => Err(ScriptError::EntityAsValue {
                    name: place.root.clone(),
                }),
            };
        }
        if place.path.is_empty() {
            self.locals.insert(&place.root);
            Ok(())
        } else {
            self.variable(&place.root)
        }
    }

    fn expr(&self, expr: &'a Expr) -> ScriptResult<()> {
        match expr {
            Expr::Literal(..) => Ok(()),
            Expr::Var(name, _) => self.variable(name),
            Expr::Field(base, field, _) => {
                if let Expr::Var(root, _) = &**base {
                    if let Some(&components) = self.entities.get(root.as_str()) {
                        return self.component(root, components, field);
                    }
                }
                self.expr(base)
            }
            Expr::Unary(_, operand, _) => self.expr(operand),
            Expr::Binary(_, left, right, _) => {
                self.expr(left)?;
                self.expr(right)
            }
            Expr::Call(name, args, _) => {
                if !Builtins::contains(name) {
                    return Err(ScriptError::UnknownFunction {
                        name: name.clone(),
                        system: self.system.name.clone(),
                    });
                }
                args.iter().try_for_each(|arg| self.expr(arg))
            }
            Expr::Vector(parts, _) => parts.iter().try_for_each(|part| self.expr(part)),
        }
    }

    fn variable(&self, name: &str) -> ScriptResult<()> {
        if self.entities.contains_key(name) {
            return Err(ScriptError::EntityAsValue {
                name: name.to_string(),
            });
        }
        if self.locals.contains(name) {
            Ok(())
        } else {
            Err(ScriptError::UnknownVariable {
                name: name.to_string(),
                system: self.system.name.clone(),
            })
        }
    }

    fn component(&self, binding: &str, declared: &[String], component: &str) -> ScriptResult<()> {
        if declared.iter().any(|c| c == component) {
            Ok(())
        } else {
            Err(ScriptError::UndeclaredComponent {
                binding: binding.to_string(),
                component: component.to_string(),
                system: self.system.name.clone(),
            })
        }
    }

    /// `emit Name(entity..., payload)`: one entity binding per role, then the payload
    /// unless the event carries none.
    fn emit(&self, event: &str, args: &'a [Expr]) -> ScriptResult<()> {
        let invalid = |reason: String| ScriptError::InvalidEmit {
            event: event.to_string(),
            system: self.system.name.clone(),
            reason,
        };
        let description = self
            .events
            .get(event)
            .ok_or_else(|| invalid("unregistered event".to_string()))?;

        let roles = description.roles.len();
        if args.len() != roles && args.len() != roles + 1 {
            return Err(invalid(format!(
                "expected {roles} entities and a payload, found {} arguments",
                args.len()
            )));
        }
        for arg in args.iter().take(roles) {
            match arg {
                Expr::Var(name, _) if self.entities.contains_key(name.as_str()) => {}
                _ => return Err(invalid("entity arguments must be entity bindings".to_string())),
            }
        }
        match args.get(roles) {
            Some(payload) => self.expr(payload),
            None if description.payload == Type::empty_record() => Ok(()),
            None => Err(invalid(format!(
                "missing payload of type {}",
                description.payload
            ))),
        }
    }

    fn duplicate(&self, name: &str) -> ScriptError {
        ScriptError::DuplicateBinding {
            name: name.to_string(),
            system: self.system.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pivot_ecs::{ComponentDescription, ComponentIndex, EventDescription, Role};

    use super::*;
    use crate::ast::Item;
    use crate::parser::parse;

    fn check(source: &str) -> ScriptResult<()> {
        let mut components = ComponentIndex::new();
        components
            .register(ComponentDescription::new(
                "C",
                Type::record([("b", Type::Basic(BasicType::Boolean))]),
            ))
            .unwrap();
        let mut events = EventIndex::new();
        events
            .register(
                EventDescription {
                    name: "Loot".into(),
                    roles: vec![Role::new("to", ["C"])],
                    payload: Type::Basic(BasicType::Number),
                },
                &components,
            )
            .unwrap();
        events
            .register(
                EventDescription {
                    name: "Ping".into(),
                    roles: Vec::new(),
                    payload: Type::empty_record(),
                },
                &components,
            )
            .unwrap();

        let mut schemas = Schemas::default();
        schemas.insert("C", Type::record([("b", Type::Basic(BasicType::Boolean))]));

        let script = parse(source).unwrap();
        for item in &script.items {
            if let Item::System(system) = item {
                check_system(system, &events, &schemas, source)?;
            }
        }
        Ok(())
    }

    #[test]
    fn test_valid_body() {
        check(
            "system S(e<C>) event Tick(Number dt)\n\tNumber total = dt * 2\n\tif e.C.b\n\t\temit Loot(e, total)\n\temit Ping()\n",
        )
        .unwrap();
    }

    #[test]
    fn test_undeclared_component() {
        let err = check("system S(e<C>) event Tick()\n\te.Stats.xp = 1\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "entity `e` does not declare component `Stats` in system `S`"
        );
    }

    #[test]
    fn test_unknown_variable() {
        let err = check("system S(e<C>) event Tick()\n\te.C.b = flag\n").unwrap_err();
        assert!(matches!(err, ScriptError::UnknownVariable { name, .. } if name == "flag"));
    }

    #[test]
    fn test_assignment_introduces_local() {
        check("system S(e<C>) event Tick()\n\tflag = True\n\te.C.b = flag\n").unwrap();
    }

    #[test]
    fn test_entity_is_not_a_value() {
        let err = check("system S(e<C>) event Tick()\n\tprint(e)\n").unwrap_err();
        assert!(matches!(err, ScriptError::EntityAsValue { .. }));
    }

    #[test]
    fn test_duplicate_binding() {
        let err = check("system S(e<C>) event Tick(e<C>)\n\tprint(1)\n").unwrap_err();
        assert!(matches!(err, ScriptError::DuplicateBinding { name, .. } if name == "e"));
    }

    #[test]
    fn test_unknown_function() {
        let err = check("system S(e<C>) event Tick()\n\tspawn(1)\n").unwrap_err();
        assert!(matches!(err, ScriptError::UnknownFunction { .. }));
    }

    #[test]
    fn test_emit_contract() {
        let missing = check("system S(e<C>) event Tick()\n\temit Loot(e)\n").unwrap_err();
        assert!(missing.to_string().contains("missing payload of type Number"));

        let unknown = check("system S(e<C>) event Tick()\n\temit Nope()\n").unwrap_err();
        assert!(unknown.to_string().contains("unregistered event"));

        let not_entity = check("system S(e<C>) event Tick()\n\temit Loot(1, 2)\n").unwrap_err();
        assert!(not_entity.to_string().contains("entity bindings"));
    }

    #[test]
    fn test_unknown_type_reports_line() {
        let err = check("system S(e<C>) event Tick()\n\tprint(1)\n\tReal r = 1\n").unwrap_err();
        assert_eq!(err.to_string(), "unknown type `Real` at line 3");
    }

    #[test]
    fn test_resolve() {
        let mut schemas = Schemas::default();
        schemas.insert("Stats", Type::record([("xp", Type::Basic(BasicType::Number))]));
        let script = parse("event E(Optional<Stats> a)\n").unwrap();
        let Item::Event(event) = &script.items[0] else {
            panic!("expected an event");
        };
        let payload = event.payload.as_ref().unwrap();
        assert_eq!(
            schemas.resolve(&payload.ty, "").unwrap(),
            Type::optional(Type::record([("xp", Type::Basic(BasicType::Number))]))
        );
    }
}
