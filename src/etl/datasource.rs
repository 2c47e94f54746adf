// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Datasource classes and their instantiation.
//!
//! A datasource declares a `module` and `cls`; the pair selects a constructor
//! from [`DataSourceClasses`]. The `init` expression calls that constructor
//! with `conf` (the instance configuration) and every datasource registered
//! before it in scope. The resulting object is bound by name for all later
//! expressions of the pass.
//!
//! Callers add their own collaborators (an HTTP client, a fixture replay)
//! with [`DataSourceClasses::register`]. Two document-backed classes are
//! built in under [`BUILTIN_MODULE`].

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::Context;
use serde_json::Value;

use crate::config::DataSourceSpec;
use crate::errors::{ConfigError, EtlError, EtlResult, EvalError};
use crate::etl::context::TopologyContext;
use crate::etl::scope::Scope;
use crate::expression::{CallArgs, Dynamic, NativeFunction};
use crate::observability::messages::etl::DataSourceRegistered;
use crate::observability::messages::StructuredLog;
use crate::path::{self, CompiledPath};
use crate::traits::HostObject;

pub const BUILTIN_MODULE: &str = "etl.builtin";

/// Constructors available to datasource `init` expressions, keyed by module and class.
#[derive(Clone, Default)]
pub struct DataSourceClasses {
    classes: HashMap<(String, String), NativeFunction>,
}

impl DataSourceClasses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `FileDataSource` and `StaticDataSource`.
    pub fn with_builtins() -> Self {
        let mut classes = Self::new();
        classes.register(
            BUILTIN_MODULE,
            NativeFunction::new("FileDataSource", |args| {
                let path = args.required_str("FileDataSource", 0, "path")?;
                Ok(Dynamic::object(DocumentSource::from_file(&path)?))
            }),
        );
        classes.register(
            BUILTIN_MODULE,
            NativeFunction::new("StaticDataSource", |args| {
                let document = args.required_value("StaticDataSource", 0, "value")?;
                Ok(Dynamic::object(DocumentSource::new("StaticDataSource", document)))
            }),
        );
        classes
    }

    /// Register `constructor` under its own name as the class name.
    pub fn register(&mut self, module: impl Into<String>, constructor: NativeFunction) {
        let key = (module.into(), constructor.name().to_string());
        self.classes.insert(key, constructor);
    }

    pub fn get(&self, module: &str, cls: &str) -> Option<&NativeFunction> {
        self.classes.get(&(module.to_string(), cls.to_string()))
    }
}

impl std::fmt::Debug for DataSourceClasses {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self
            .classes
            .keys()
            .map(|(module, cls)| format!("{}.{}", module, cls))
            .collect();
        keys.sort();
        f.debug_tuple("DataSourceClasses").field(&keys).finish()
    }
}

/// A datasource answering queries from one in-memory document.
pub struct DocumentSource {
    class: &'static str,
    document: Value,
}

impl DocumentSource {
    pub fn new(class: &'static str, document: Value) -> Self {
        Self { class, document }
    }

    /// Load a YAML or JSON document.
    pub fn from_file(path: &str) -> Result<Self, EvalError> {
        let text = fs::read_to_string(Path::new(path))
            .with_context(|| format!("failed to read datasource file '{}'", path))?;
        let document: Value = serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse datasource file '{}'", path))?;
        Ok(Self::new("FileDataSource", document))
    }
}

impl HostObject for DocumentSource {
    fn type_name(&self) -> &str {
        self.class
    }

    fn get_attr(&self, name: &str) -> Result<Dynamic, EvalError> {
        Err(EvalError::attribute(self.class, name))
    }

    fn call_method(&mut self, name: &str, args: CallArgs) -> Result<Dynamic, EvalError> {
        match name {
            "data" => {
                args.expect_at_most(name, 0)?;
                Ok(Dynamic::Value(self.document.clone()))
            }
            "get" => {
                let query = args.required_str(name, 0, "path")?;
                let default = args.value(1, "default")?.unwrap_or(Value::Null);
                Ok(Dynamic::Value(path::resolve(&query, &self.document, default)?))
            }
            "list" => {
                let query = args.required_str(name, 0, "path")?;
                let matches = CompiledPath::compile(&query)?.find(&self.document);
                let items = match matches.as_slice() {
                    [Value::Array(items)] => items.clone(),
                    _ => matches.into_iter().cloned().collect(),
                };
                Ok(Dynamic::Value(Value::Array(items)))
            }
            _ => Err(EvalError::attribute(self.class, name)),
        }
    }

    fn to_value(&self) -> Option<Value> {
        Some(self.document.clone())
    }
}

pub struct DataSourceInterpreter<'a> {
    classes: &'a DataSourceClasses,
}

impl<'a> DataSourceInterpreter<'a> {
    pub fn new(classes: &'a DataSourceClasses) -> Self {
        Self { classes }
    }

    /// Instantiate `spec` and bind it by name. A name that is already bound is left alone.
    pub fn interpret(&self, ctx: &mut TopologyContext, spec: &DataSourceSpec) -> EtlResult<()> {
        if ctx.has_datasource(&spec.name) {
            return Ok(());
        }
        let class = self
            .classes
            .get(&spec.module, &spec.cls)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownDataSourceClass {
                datasource: spec.name.clone(),
                module: spec.module.clone(),
                cls: spec.cls.clone(),
            })?;

        let instance = {
            let mut scope = Scope::new(ctx, Rc::new(Value::Null), format!("datasource '{}'", spec.name));
            scope.bind("conf", ctx.conf().clone());
            scope.bind(spec.cls.clone(), class);
            scope
                .run_code(Some(&spec.init), "init")
                .map_err(|source| EtlError::DataSourceInit {
                    datasource: spec.name.clone(),
                    cls: spec.cls.clone(),
                    source,
                })?
        };

        ctx.register_datasource(spec.name.clone(), instance);
        DataSourceRegistered {
            name: &spec.name,
            module: &spec.module,
            cls: &spec.cls,
        }
        .log();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstanceInfo;
    use crate::topology::shared_factory;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn context() -> TopologyContext {
        let instance: InstanceInfo =
            serde_yaml::from_str("domain: Lab\netl: {}\nprism_url: https://prism.local\n").unwrap();
        TopologyContext::new(shared_factory(), &instance)
    }

    fn spec(name: &str, cls: &str, init: &str) -> DataSourceSpec {
        DataSourceSpec {
            name: name.to_string(),
            module: BUILTIN_MODULE.to_string(),
            cls: cls.to_string(),
            init: init.to_string(),
        }
    }

    fn evaluate(ctx: &TopologyContext, expression: &str) -> Value {
        let mut scope = Scope::new(ctx, Rc::new(Value::Null), "test");
        scope.run_for_value(Some(expression), "test").unwrap()
    }

    #[test]
    fn test_file_datasource_queries() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "vms:\n  - name: a\n    host: h1\n  - name: b\n    host: h2\ncluster:\n  name: c1\n"
        )
        .unwrap();

        let classes = DataSourceClasses::with_builtins();
        let mut ctx = context();
        let init = format!("FileDataSource('{}')", file.path().display());
        DataSourceInterpreter::new(&classes)
            .interpret(&mut ctx, &spec("inventory", "FileDataSource", &init))
            .unwrap();

        assert_eq!(evaluate(&ctx, "inventory.get('$.cluster.name')"), json!("c1"));
        assert_eq!(evaluate(&ctx, "inventory.get('$.missing', 'none')"), json!("none"));
        assert_eq!(evaluate(&ctx, "len(inventory.list('$.vms'))"), json!(2));
        assert_eq!(evaluate(&ctx, "inventory.list('$.vms[*].host')"), json!(["h1", "h2"]));
        assert_eq!(evaluate(&ctx, "inventory.list('$.cluster')"), json!([{"name": "c1"}]));
    }

    #[test]
    fn test_init_sees_conf_and_earlier_datasources() {
        let classes = DataSourceClasses::with_builtins();
        let mut ctx = context();
        let interpreter = DataSourceInterpreter::new(&classes);
        interpreter
            .interpret(
                &mut ctx,
                &spec("settings", "StaticDataSource", "StaticDataSource({'url': conf['prism_url']})"),
            )
            .unwrap();
        interpreter
            .interpret(
                &mut ctx,
                &spec("derived", "StaticDataSource", "StaticDataSource([settings.get('$.url'), conf['domain']])"),
            )
            .unwrap();

        assert_eq!(
            evaluate(&ctx, "derived.data()"),
            json!(["https://prism.local", "Lab"])
        );
    }

    #[test]
    fn test_unknown_class_and_failed_init() {
        let classes = DataSourceClasses::with_builtins();
        let mut ctx = context();
        let interpreter = DataSourceInterpreter::new(&classes);

        let err = interpreter
            .interpret(&mut ctx, &spec("client", "NutanixClient", "NutanixClient(conf)"))
            .unwrap_err();
        assert!(matches!(
            err,
            EtlError::Config(ConfigError::UnknownDataSourceClass { .. })
        ));

        let err = interpreter
            .interpret(&mut ctx, &spec("files", "FileDataSource", "FileDataSource('/no/such/file.yaml')"))
            .unwrap_err();
        match err {
            EtlError::DataSourceInit { datasource, source, .. } => {
                assert_eq!(datasource, "files");
                assert_eq!(source.source_name, "datasource 'files'");
                assert!(matches!(source.cause, EvalError::External(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!ctx.has_datasource("files"));
    }
}
