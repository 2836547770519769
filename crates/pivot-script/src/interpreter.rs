//! Tree-walking execution of system bodies.
//!
//! Component values are copied in on read and written back through the
//! [`ArrayCombination`] at the end of each assigning statement, so a script never holds
//! a live reference into storage.

use std::sync::Arc;

use hashbrown::HashMap;
use pivot_data::{BasicType, DVec3, Record, Type, Value};
use pivot_ecs::{
    ArrayCombination, ComponentId, EcsError, Entity, Event, EventIndex, EventWithComponent,
};
use tracing::trace;

use crate::ast::{Expr, Place, Stmt, SystemDecl};
use crate::builtins::Builtins;
use crate::check::Schemas;
use crate::error::{ScriptError, ScriptResult};
use crate::ops;

/// Limits applied to every system run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// Statements and loop iterations one system invocation may execute. `None` is unbounded.
    pub step_budget: Option<u64>,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            step_budget: Some(1_000_000),
        }
    }
}

/// A checked system body, ready to run against a scene.
#[derive(Debug, Clone)]
pub struct CompiledSystem {
    decl: Arc<SystemDecl>,
    source: Arc<str>,
    schemas: Arc<Schemas>,
    events: Arc<EventIndex>,
    builtins: Builtins,
    config: InterpreterConfig,
}

impl CompiledSystem {
    pub fn new(
        decl: Arc<SystemDecl>,
        source: Arc<str>,
        schemas: Arc<Schemas>,
        events: Arc<EventIndex>,
        builtins: Builtins,
        config: InterpreterConfig,
    ) -> Self {
        Self {
            decl,
            source,
            schemas,
            events,
            builtins,
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.decl.name
    }

    /// Run the body once for every combination of entities matching the parameters.
    ///
    /// Returns the events emitted, in emission order.
    pub fn run(
        &self,
        combination: &mut ArrayCombination<'_>,
        event: &EventWithComponent,
    ) -> ScriptResult<Vec<Event>> {
        let mut candidates = Vec::with_capacity(self.decl.params.len());
        for param in &self.decl.params {
            let mut ids = Vec::with_capacity(param.components.len());
            for component in &param.components {
                ids.push(component_id(combination, &self.decl.name, component)?);
            }
            let entities = combination.matching_entities(&ids);
            if entities.is_empty() {
                trace!(system = %self.decl.name, "no matching entities");
                return Ok(Vec::new());
            }
            candidates.push(entities);
        }

        let mut exec = Exec {
            system: self,
            combination,
            entities: HashMap::new(),
            locals: HashMap::new(),
            steps: 0,
            emitted: Vec::new(),
        };

        // Odometer over the cartesian product of the candidate lists
        let mut cursor = vec![0_usize; candidates.len()];
        loop {
            exec.reset(event, &candidates, &cursor);
            exec.block(&self.decl.body)?;

            let mut i = cursor.len();
            loop {
                if i == 0 {
                    return Ok(exec.emitted);
                }
                i -= 1;
                cursor[i] += 1;
                if cursor[i] < candidates[i].len() {
                    break;
                }
                cursor[i] = 0;
            }
        }
    }
}

fn component_id(
    combination: &ArrayCombination<'_>,
    system: &str,
    component: &str,
) -> ScriptResult<ComponentId> {
    combination.component_id(component).ok_or_else(|| {
        ScriptError::Ecs(EcsError::UnregisteredComponent {
            component: component.to_string(),
            owner: system.to_string(),
        })
    })
}

/// State of one system invocation.
struct Exec<'s, 'c, 'a> {
    system: &'s CompiledSystem,
    combination: &'c mut ArrayCombination<'a>,
    entities: HashMap<&'s str, Entity>,
    locals: HashMap<String, Value>,
    steps: u64,
    emitted: Vec<Event>,
}

impl<'s> Exec<'s, '_, '_> {
    /// Bind the event roles, the payload and the current parameter combination.
    fn reset(&mut self, event: &EventWithComponent, candidates: &[Vec<Entity>], cursor: &[usize]) {
        let system = self.system;
        let decl = &*system.decl;
        self.entities.clear();
        self.locals.clear();

        for (i, role) in decl.event.roles.iter().enumerate() {
            if let (Some(name), Some(entity)) = (role.name.as_deref(), event.entity(i)) {
                self.entities.insert(name, entity);
            }
        }
        for ((param, entities), &at) in decl.params.iter().zip(candidates).zip(cursor) {
            if let Some(name) = param.name.as_deref() {
                self.entities.insert(name, entities[at]);
            }
        }
        if let Some(payload) = &decl.event.payload {
            self.locals
                .insert(payload.name.clone(), event.event.payload.clone());
        }
    }

    fn step(&mut self) -> ScriptResult<()> {
        self.steps += 1;
        match self.system.config.step_budget {
            Some(budget) if self.steps > budget => Err(ScriptError::StepBudgetExceeded {
                system: self.system.decl.name.clone(),
                budget,
            }),
            _ => Ok(()),
        }
    }

    fn block(&mut self, stmts: &'s [Stmt]) -> ScriptResult<()> {
        for stmt in stmts {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &'s Stmt) -> ScriptResult<()> {
        self.step()?;
        match stmt {
            Stmt::Assign { target, value, .. } => {
                let value = self.eval(value)?;
                self.assign(target, value)
            }
            Stmt::Declare {
                ty, name, value, ..
            } => {
                let ty = self.system.schemas.resolve(ty, &self.system.source)?;
                let value = coerce(self.eval(value)?, &ty, name)?;
                self.locals.insert(name.clone(), value);
                Ok(())
            }
            Stmt::Expr(expr) => {
                self.eval(expr)?;
                Ok(())
            }
            Stmt::If {
                cond,
                then,
                otherwise,
                ..
            } => {
                if self.condition(cond)? {
                    self.block(then)
                } else {
                    self.block(otherwise)
                }
            }
            Stmt::While { cond, body, .. } => {
                while self.condition(cond)? {
                    self.block(body)?;
                    self.step()?;
                }
                Ok(())
            }
            Stmt::Emit { event, args, .. } => self.emit(event, args),
        }
    }

    fn condition(&mut self, cond: &'s Expr) -> ScriptResult<bool> {
        let value = self.eval(cond)?;
        value
            .as_boolean()
            .ok_or_else(|| ScriptError::ConditionNotBoolean {
                found: value.type_of(),
            })
    }

    fn assign(&mut self, target: &Place, value: Value) -> ScriptResult<()> {
        if let Some(&entity) = self.entities.get(target.root.as_str()) {
            let Some((component, path)) = target.path.split_first() else {
                return Err(ScriptError::EntityAsValue {
                    name: target.root.clone(),
                });
            };
            let id = component_id(self.combination, &self.system.decl.name, component)?;
            let mut current = self.component(entity, id, component)?;
            set_path(&mut current, path, value, target)?;
            self.combination.set(entity, id, current)?;
            return Ok(());
        }

        match self.locals.get_mut(target.root.as_str()) {
            Some(local) => set_path(local, &target.path, value, target),
            None if target.path.is_empty() => {
                self.locals.insert(target.root.clone(), value);
                Ok(())
            }
            None => Err(self.unknown_variable(&target.root)),
        }
    }

    fn component(&self, entity: Entity, id: ComponentId, name: &str) -> ScriptResult<Value> {
        self.combination.get(entity, id).cloned().ok_or_else(|| {
            ScriptError::Ecs(EcsError::MissingComponent {
                entity,
                component: name.to_string(),
            })
        })
    }

    fn eval(&mut self, expr: &'s Expr) -> ScriptResult<Value> {
        match expr {
            Expr::Literal(value, _) => Ok(value.clone()),
            Expr::Var(name, _) => {
                if self.entities.contains_key(name.as_str()) {
                    return Err(ScriptError::EntityAsValue { name: name.clone() });
                }
                self.locals
                    .get(name)
                    .cloned()
                    .ok_or_else(|| self.unknown_variable(name))
            }
            Expr::Field(base, field, _) => {
                if let Expr::Var(root, _) = &**base {
                    if let Some(&entity) = self.entities.get(root.as_str()) {
                        let id = component_id(self.combination, &self.system.decl.name, field)?;
                        return self.component(entity, id, field);
                    }
                }
                let base = self.eval(base)?;
                field_of(&base, field)
            }
            Expr::Unary(op, operand, _) => {
                let operand = self.eval(operand)?;
                ops::unary(*op, &operand)
            }
            Expr::Binary(op, left, right, _) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                ops::binary(*op, &left, &right)
            }
            Expr::Call(name, args, _) => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                self.system
                    .builtins
                    .call(&self.system.decl.name, name, &values)
            }
            Expr::Vector(parts, _) => {
                let [x, y, z] = &**parts;
                let x = self.number(x)?;
                let y = self.number(y)?;
                let z = self.number(z)?;
                Ok(Value::Vec3(DVec3::new(x, y, z)))
            }
        }
    }

    fn number(&mut self, expr: &'s Expr) -> ScriptResult<f64> {
        let value = self.eval(expr)?;
        value
            .as_number()
            .ok_or_else(|| ScriptError::VectorComponent {
                found: value.type_of(),
            })
    }

    fn emit(&mut self, event: &str, args: &'s [Expr]) -> ScriptResult<()> {
        let invalid = |reason: &str| ScriptError::InvalidEmit {
            event: event.to_string(),
            system: self.system.decl.name.clone(),
            reason: reason.to_string(),
        };
        let description = self
            .system
            .events
            .get(event)
            .ok_or_else(|| invalid("unregistered event"))?;
        let roles = description.roles.len();
        let payload_type = description.payload.clone();

        let mut entities = Vec::with_capacity(roles);
        for arg in args.iter().take(roles) {
            let entity = match arg {
                Expr::Var(name, _) => self.entities.get(name.as_str()).copied(),
                _ => None,
            };
            let entity =
                entity.ok_or_else(|| invalid("entity arguments must be entity bindings"))?;
            entities.push(entity);
        }

        let payload = match args.get(roles) {
            Some(expr) => coerce(self.eval(expr)?, &payload_type, event)?,
            None => Value::Record(Record::new()),
        };
        trace!(system = %self.system.decl.name, event, "event emitted");
        self.emitted.push(Event::new(event, entities, payload));
        Ok(())
    }

    fn unknown_variable(&self, name: &str) -> ScriptError {
        ScriptError::UnknownVariable {
            name: name.to_string(),
            system: self.system.decl.name.clone(),
        }
    }
}

/// `value` as a `expected`; a plain value is wrapped into an optional of its type.
fn coerce(value: Value, expected: &Type, target: &str) -> ScriptResult<Value> {
    let found = value.type_of();
    if &found == expected {
        return Ok(value);
    }
    if let Type::Optional(inner) = expected {
        if found == **inner {
            return Ok(Value::some(value));
        }
    }
    Err(ScriptError::AssignmentType {
        target: target.to_string(),
        expected: expected.clone(),
        found,
    })
}

/// Replace the value at `path` below `slot`, keeping the slot's type.
fn set_path(slot: &mut Value, path: &[String], value: Value, target: &Place) -> ScriptResult<()> {
    let Some((field, rest)) = path.split_first() else {
        let expected = slot.type_of();
        *slot = coerce(value, &expected, &target.to_string())?;
        return Ok(());
    };

    if let Value::Record(record) = &mut *slot {
        if let Some(child) = record.get_mut(field.as_str()) {
            return set_path(child, rest, value, target);
        }
    }
    if let (Value::Vec3(vector), true) = (&mut *slot, rest.is_empty()) {
        if let Some(axis) = axis_mut(vector, field) {
            *axis = value.as_number().ok_or_else(|| ScriptError::AssignmentType {
                target: target.to_string(),
                expected: Type::Basic(BasicType::Number),
                found: value.type_of(),
            })?;
            return Ok(());
        }
    }
    Err(ScriptError::UnknownField {
        field: field.clone(),
        ty: slot.type_of(),
    })
}

fn field_of(value: &Value, field: &str) -> ScriptResult<Value> {
    let found = match value {
        Value::Record(record) => record.get(field).cloned(),
        Value::Vec3(vector) => match field {
            "x" => Some(Value::Number(vector.x)),
            "y" => Some(Value::Number(vector.y)),
            "z" => Some(Value::Number(vector.z)),
            _ => None,
        },
        _ => None,
    };
    found.ok_or_else(|| ScriptError::UnknownField {
        field: field.to_string(),
        ty: value.type_of(),
    })
}

fn axis_mut<'v>(vector: &'v mut DVec3, axis: &str) -> Option<&'v mut f64> {
    match axis {
        "x" => Some(&mut vector.x),
        "y" => Some(&mut vector.y),
        "z" => Some(&mut vector.z),
        _ => None,
    }
}
