// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::rc::Rc;

use serde_json::Value;

use crate::config::InstanceInfo;
use crate::errors::EvalError;
use crate::expression::{Bindings, Dynamic, ExpressionInterpreter, Helpers, NativeFunction, ScriptLogger};
use crate::path;
use crate::topology::{FactoryHandle, SharedFactory, TopologyFactory};
use crate::traits::ExpressionEngine;

/// Entity defaults taken from the instance being synchronized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceDefaults {
    pub domain: String,
    pub layer: String,
    pub environment: String,
}

impl From<&InstanceInfo> for InstanceDefaults {
    fn from(instance: &InstanceInfo) -> Self {
        Self {
            domain: instance.domain.clone(),
            layer: instance.layer.clone(),
            environment: instance.environment.clone(),
        }
    }
}

/// State shared by every interpreter of one synchronization pass: the
/// factory, the datasources registered so far and the instance settings.
pub struct TopologyContext {
    factory: SharedFactory,
    datasources: Vec<(String, Dynamic)>,
    conf: Value,
    defaults: InstanceDefaults,
    engine: Rc<dyn ExpressionEngine>,
}

impl TopologyContext {
    pub fn new(factory: SharedFactory, instance: &InstanceInfo) -> Self {
        Self {
            factory,
            datasources: Vec::new(),
            conf: instance.conf_value(),
            defaults: InstanceDefaults::from(instance),
            engine: Rc::new(ExpressionInterpreter::new()),
        }
    }

    /// Replace the expression engine, e.g. with an instrumented one in tests.
    pub fn with_engine(mut self, engine: Rc<dyn ExpressionEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn factory(&self) -> &SharedFactory {
        &self.factory
    }

    pub fn engine(&self) -> &dyn ExpressionEngine {
        self.engine.as_ref()
    }

    pub fn conf(&self) -> &Value {
        &self.conf
    }

    pub fn defaults(&self) -> &InstanceDefaults {
        &self.defaults
    }

    pub fn has_datasource(&self, name: &str) -> bool {
        self.datasources.iter().any(|(key, _)| key == name)
    }

    pub fn datasource(&self, name: &str) -> Option<&Dynamic> {
        self.datasources
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, datasource)| datasource)
    }

    /// Register a datasource unless the name is already taken.
    pub fn register_datasource(&mut self, name: impl Into<String>, datasource: Dynamic) -> bool {
        let name = name.into();
        if self.has_datasource(&name) {
            return false;
        }
        self.datasources.push((name, datasource));
        true
    }

    /// Symbol table for evaluating against `item`.
    ///
    /// Entity slots (`component`, `event`, `metric`, `health`) start as
    /// `None`; the interpreter that owns an entity rebinds its slot.
    pub fn bindings(&self, item: &Rc<Value>, source: &str) -> Bindings {
        let mut bindings = Bindings::new();
        bindings.bind("factory", Dynamic::object(FactoryHandle::new(self.factory.clone())));
        bindings.bind("item", item.as_ref().clone());
        for slot in ["component", "metric", "event", "health"] {
            bindings.bind(slot, Dynamic::null());
        }

        let target = Rc::clone(item);
        bindings.bind_function(NativeFunction::new("jpath", move |args| {
            let query = args.required_str("jpath", 0, "path")?;
            let default = args.value(1, "default")?.unwrap_or(Value::Null);
            path::resolve(&query, &target, default)
                .map(Dynamic::Value)
                .map_err(EvalError::from)
        }));
        bindings.bind_function(NativeFunction::new("uid", |args| {
            let integration = args.required_str("uid", 0, "integration")?;
            let kind = args.required_str("uid", 1, "type")?;
            let name = args.required_str("uid", 2, "name")?;
            Ok(Dynamic::Value(Value::String(TopologyFactory::get_uid(
                &integration,
                &kind,
                &name,
            ))))
        }));

        for (name, datasource) in &self.datasources {
            bindings.bind(name.clone(), datasource.clone());
        }
        bindings.bind("helpers", Dynamic::object(Helpers));
        bindings.bind("log", Dynamic::object(ScriptLogger::new(source)));
        bindings
    }
}
