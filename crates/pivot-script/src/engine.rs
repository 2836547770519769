//! Loading scripts into the host's indexes.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use pivot_data::{RecordType, Type};
use pivot_ecs::{ComponentDescription, EventDescription, Indexes, Role, SystemDescription};
use tracing::{debug, info};

use crate::ast::{ComponentBody, ComponentDecl, EventDecl, Item, RoleDecl, Script, SystemDecl};
use crate::builtins::Builtins;
use crate::check::{Schemas, check_system};
use crate::error::{ScriptError, ScriptResult};
use crate::interpreter::{CompiledSystem, InterpreterConfig};
use crate::parser::parse;

/// Names registered by one load, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub components: Vec<String>,
    /// Events declared explicitly or through a system header.
    pub events: Vec<String>,
    pub systems: Vec<String>,
}

/// Compiles scripts into component, event and system descriptions.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    builtins: Builtins,
    config: InterpreterConfig,
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins(mut self, builtins: Builtins) -> Self {
        self.builtins = builtins;
        self
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Read and load a script file. See [`Engine::load_str`].
    pub fn load_file(
        &self,
        path: impl AsRef<Path>,
        indexes: &mut Indexes,
    ) -> ScriptResult<LoadSummary> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "loading script");
        self.load_str(&source, indexes)
    }

    /// Parse a script and register everything it declares.
    ///
    /// Loading is all or nothing: declarations are registered into a copy of `indexes`
    /// that replaces it only when the whole script is valid.
    pub fn load_str(&self, source: &str, indexes: &mut Indexes) -> ScriptResult<LoadSummary> {
        let script = parse(source)?;
        let mut staged = indexes.clone();
        let summary = self.register(&script, source, &mut staged)?;
        *indexes = staged;

        info!(
            components = summary.components.len(),
            events = summary.events.len(),
            systems = summary.systems.len(),
            "script loaded"
        );
        Ok(summary)
    }

    fn register(
        &self,
        script: &Script,
        source: &str,
        indexes: &mut Indexes,
    ) -> ScriptResult<LoadSummary> {
        let mut summary = LoadSummary::default();
        let mut schemas = Schemas::default();
        for description in indexes.components.iter() {
            schemas.insert(description.name.clone(), description.ty.clone());
        }

        // Components first, in source order, so later items can name them
        for item in &script.items {
            if let Item::Component(decl) = item {
                let ty = component_type(decl, &schemas, source)?;
                indexes
                    .register_component(ComponentDescription::new(decl.name.clone(), ty.clone()))?;
                schemas.insert(decl.name.clone(), ty);
                summary.components.push(decl.name.clone());
            }
        }

        for item in &script.items {
            if let Item::Event(decl) = item {
                indexes.register_event(event_description(decl, &schemas, source)?)?;
                summary.events.push(decl.name.clone());
            }
        }

        // System headers declare their event when nobody else did
        let mut listeners = Vec::new();
        for item in &script.items {
            if let Item::System(decl) = item {
                let listener = event_description(&decl.event, &schemas, source)?;
                match indexes.events.get(&listener.name) {
                    Some(declared) => declared.check_compatible(&listener)?,
                    None => {
                        indexes.register_event(listener.clone())?;
                        summary.events.push(listener.name.clone());
                    }
                }
                listeners.push((decl, listener));
            }
        }

        let source: Arc<str> = Arc::from(source);
        let schemas = Arc::new(schemas);
        let events = Arc::new(indexes.events.clone());
        for (decl, listener) in listeners {
            check_system(decl, &events, &schemas, &source)?;
            let compiled = CompiledSystem::new(
                Arc::new(decl.clone()),
                Arc::clone(&source),
                Arc::clone(&schemas),
                Arc::clone(&events),
                self.builtins.clone(),
                self.config,
            );
            indexes.register_system(system_description(decl, listener, compiled))?;
            debug!(system = %decl.name, "system compiled");
            summary.systems.push(decl.name.clone());
        }

        Ok(summary)
    }
}

fn component_type(decl: &ComponentDecl, schemas: &Schemas, source: &str) -> ScriptResult<Type> {
    match &decl.body {
        ComponentBody::Alias(ty) => schemas.resolve(ty, source),
        ComponentBody::Fields(fields) => {
            let mut record = RecordType::new();
            for field in fields {
                record.insert(field.name.clone(), schemas.resolve(&field.ty, source)?);
            }
            Ok(Type::Record(record))
        }
    }
}

fn event_description(
    decl: &EventDecl,
    schemas: &Schemas,
    source: &str,
) -> ScriptResult<EventDescription> {
    let payload = match &decl.payload {
        Some(field) => schemas.resolve(&field.ty, source)?,
        None => Type::empty_record(),
    };
    Ok(EventDescription {
        name: decl.name.clone(),
        roles: decl.roles.iter().map(role).collect(),
        payload,
    })
}

fn role(decl: &RoleDecl) -> Role {
    Role::new(decl.name.clone().unwrap_or_default(), decl.components.iter().cloned())
}

fn system_description(
    decl: &SystemDecl,
    listener: EventDescription,
    compiled: CompiledSystem,
) -> SystemDescription {
    SystemDescription::new(
        decl.name.clone(),
        decl.params.iter().map(role).collect(),
        Some(listener),
        move |_, combination, event| compiled.run(combination, event).map_err(Into::into),
    )
}

#[cfg(test)]
mod tests {
    use pivot_data::BasicType;
    use pivot_ecs::ErrorKind;

    use super::*;

    const STATS: &str = "\
component Stats
    Number xp
    Optional<String> title
component Speed = Number
";

    #[test]
    fn test_registers_declarations() {
        let mut indexes = Indexes::new();
        let summary = Engine::new()
            .load_str(
                &format!(
                    "{STATS}event Kill\n    Stats\n    String monster\nsystem Reward(p<Stats>) event Kill(e<Stats>, String monster)\n    p.Stats.xp = p.Stats.xp + 1\n"
                ),
                &mut indexes,
            )
            .unwrap();

        assert_eq!(summary.components, vec!["Stats", "Speed"]);
        assert_eq!(summary.events, vec!["Kill"]);
        assert_eq!(summary.systems, vec!["Reward"]);
        assert_eq!(
            indexes.components.get("Speed").unwrap().ty,
            Type::Basic(BasicType::Number)
        );
        assert_eq!(
            indexes.components.get("Stats").unwrap().ty,
            Type::record([
                ("title", Type::optional(Type::Basic(BasicType::String))),
                ("xp", Type::Basic(BasicType::Number)),
            ])
        );
        let kill = indexes.events.get("Kill").unwrap();
        assert_eq!(kill.payload, Type::Basic(BasicType::String));
        assert_eq!(kill.roles[0].components, vec!["Stats"]);
    }

    #[test]
    fn test_header_declares_event() {
        let mut indexes = Indexes::new();
        let summary = Engine::new()
            .load_str(
                &format!("{STATS}system Tick(p<Stats>) event Tick()\n    p.Stats.xp = 0\n"),
                &mut indexes,
            )
            .unwrap();
        assert_eq!(summary.events, vec!["Tick"]);
        assert_eq!(indexes.events.get("Tick").unwrap().payload, Type::empty_record());
    }

    #[test]
    fn test_contradicting_header() {
        let mut indexes = Indexes::new();
        let err = Engine::new()
            .load_str(
                &format!(
                    "{STATS}event Tick(Number dt)\nsystem S(p<Stats>) event Tick(String dt)\n    print(dt)\n"
                ),
                &mut indexes,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(indexes.components.is_empty());
    }

    #[test]
    fn test_failed_load_registers_nothing() {
        let mut indexes = Indexes::new();
        let err = Engine::new()
            .load_str(
                &format!("{STATS}system S(p<Stats>) event Tick()\n    p.Missing.x = 1\n"),
                &mut indexes,
            )
            .unwrap_err();
        assert!(matches!(err, ScriptError::UndeclaredComponent { .. }));
        assert!(indexes.components.is_empty());
        assert!(indexes.events.is_empty());
        assert!(indexes.systems.is_empty());
    }

    #[test]
    fn test_duplicate_component_across_loads() {
        let engine = Engine::new();
        let mut indexes = Indexes::new();
        engine.load_str(STATS, &mut indexes).unwrap();
        let err = engine.load_str("component Speed = Integer\n", &mut indexes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Registration);
        assert_eq!(err.to_string(), "component `Speed` is already registered");
    }

    #[test]
    fn test_later_load_sees_earlier_components() {
        let engine = Engine::new();
        let mut indexes = Indexes::new();
        engine.load_str(STATS, &mut indexes).unwrap();
        engine
            .load_str("component Hero\n    Stats stats\n    Speed speed\n", &mut indexes)
            .unwrap();
        assert!(indexes.components.contains("Hero"));
    }

    #[test]
    fn test_unknown_type() {
        let err = Engine::new()
            .load_str("component C\n    Real r\n", &mut Indexes::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "unknown type `Real` at line 2");
    }

    #[test]
    fn test_missing_file() {
        let err = Engine::new()
            .load_file("does/not/exist.pivot", &mut Indexes::new())
            .unwrap_err();
        assert!(matches!(err, ScriptError::Io { .. }));
    }
}
