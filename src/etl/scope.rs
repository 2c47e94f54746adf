// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Evaluation scope shared by every interpreter.
//!
//! A [`Scope`] owns one symbol table for the duration of one unit of work
//! (one item through one template, one query, one processor), so names
//! assigned by an earlier field expression are visible to later ones.
//!
//! Raw configured values go through [`Scope::get_value`]:
//! * missing: the caller's default
//! * `$.` prefix: a path query against the current item
//! * `|` prefix: an expression; a `None` result falls back to the default
//! * anything else: the literal text

use std::rc::Rc;

use serde_json::{Map, Value};

use crate::config::{DictSpec, ListSpec};
use crate::errors::{EvaluationError, TemplateError};
use crate::etl::context::TopologyContext;
use crate::expression::{truthy, type_name, Bindings, Dynamic};
use crate::path;
use crate::topology::handles::parse_timestamp;

pub struct Scope<'a> {
    ctx: &'a TopologyContext,
    item: Rc<Value>,
    bindings: Bindings,
    source_name: String,
    template_name: Option<String>,
}

impl<'a> Scope<'a> {
    /// Scope for a query, processor or datasource; `source_name` reads like
    /// `query 'vms'` in error messages.
    pub fn new(ctx: &'a TopologyContext, item: Rc<Value>, source_name: impl Into<String>) -> Self {
        let source_name = source_name.into();
        let bindings = ctx.bindings(&item, &source_name);
        Self {
            ctx,
            item,
            bindings,
            source_name,
            template_name: None,
        }
    }

    pub fn for_template(ctx: &'a TopologyContext, item: Rc<Value>, template_name: &str) -> Self {
        let mut scope = Self::new(ctx, item, template_name);
        scope.template_name = Some(template_name.to_string());
        scope
    }

    pub fn context(&self) -> &'a TopologyContext {
        self.ctx
    }

    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Dynamic>) {
        self.bindings.bind(name, value);
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Errors raised after this point name the entity instead of the template.
    pub fn set_source_name(&mut self, source_name: impl Into<String>) {
        self.source_name = source_name.into();
    }

    fn template(&self) -> &str {
        self.template_name.as_deref().unwrap_or(&self.source_name)
    }

    fn failure_source(&self) -> String {
        match &self.template_name {
            Some(_) => format!("template '{}'", self.source_name),
            None => self.source_name.clone(),
        }
    }

    fn evaluation_error(&self, property: &str, expression: &str, cause: crate::errors::EvalError) -> EvaluationError {
        EvaluationError {
            property: property.to_string(),
            source_name: self.failure_source(),
            expression: expression.to_string(),
            cause,
        }
    }

    /// Run a code snippet; a leading `|` marker is optional. Missing code is `None`.
    pub fn run_code(&mut self, code: Option<&str>, property: &str) -> Result<Dynamic, EvaluationError> {
        let code = match code {
            Some(code) => code.trim(),
            None => return Ok(Dynamic::null()),
        };
        let code = code.strip_prefix('|').unwrap_or(code);
        let engine = self.ctx.engine();
        engine
            .evaluate(code, &mut self.bindings)
            .map_err(|cause| self.evaluation_error(property, code, cause))
    }

    /// Run a snippet whose result must be plain data.
    pub fn run_for_value(&mut self, code: Option<&str>, property: &str) -> Result<Value, EvaluationError> {
        let result = self.run_code(code, property)?;
        result.into_value().map_err(|cause| {
            self.evaluation_error(property, code.unwrap_or_default().trim(), cause)
        })
    }

    pub fn get_value(
        &mut self,
        expression: Option<&str>,
        name: &str,
        default: Value,
    ) -> Result<Value, TemplateError> {
        let expression = match expression {
            Some(expression) => expression,
            None => return Ok(default),
        };
        if expression.starts_with("$.") {
            return path::resolve(expression, &self.item, default).map_err(|source| {
                TemplateError::Path {
                    field: name.to_string(),
                    source_name: self.source_name.clone(),
                    template: self.template().to_string(),
                    expression: expression.to_string(),
                    source,
                }
            });
        }
        if expression.starts_with('|') {
            let result = self.run_for_value(Some(expression), name)?;
            return Ok(if result.is_null() { default } else { result });
        }
        Ok(Value::String(expression.to_string()))
    }

    /// Resolve an element of a literal list or dict; only strings are expressions.
    fn resolve_raw(&mut self, raw: &Value, name: &str) -> Result<Value, TemplateError> {
        match raw {
            Value::String(expression) => self.get_value(Some(expression), name, Value::Null),
            other => Ok(other.clone()),
        }
    }

    pub fn is_active(&mut self, selector: Option<&str>) -> Result<bool, TemplateError> {
        match selector {
            None => Ok(true),
            Some(selector) => Ok(truthy(&self.get_value(Some(selector), "selector", Value::Null)?)),
        }
    }

    fn mismatch(&self, value: &Value, name: &str, expected: &'static str) -> TemplateError {
        TemplateError::TypeMismatch {
            field: name.to_string(),
            expected,
            actual: type_name(value),
            source_name: self.source_name.clone(),
            template: self.template().to_string(),
        }
    }

    pub fn assert_string(&self, value: Value, name: &str) -> Result<Option<String>, TemplateError> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Err(self.mismatch(&other, name, "str")),
        }
    }

    /// Floats also accept integers and numeric strings.
    pub fn assert_float(&self, value: Value, name: &str) -> Result<Option<f64>, TemplateError> {
        match &value {
            Value::Null => Ok(None),
            Value::Number(n) => n.as_f64().map(Some).ok_or_else(|| self.mismatch(&value, name, "float")),
            Value::Bool(b) => Ok(Some(if *b { 1.0 } else { 0.0 })),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| self.mismatch(&value, name, "float")),
            _ => Err(self.mismatch(&value, name, "float")),
        }
    }

    pub fn assert_list(&self, value: Value, name: &str) -> Result<Option<Vec<Value>>, TemplateError> {
        match value {
            Value::Null => Ok(None),
            Value::Array(items) => Ok(Some(items)),
            other => Err(self.mismatch(&other, name, "list")),
        }
    }

    pub fn assert_dict(&self, value: Value, name: &str) -> Result<Option<Map<String, Value>>, TemplateError> {
        match value {
            Value::Null => Ok(None),
            Value::Object(map) => Ok(Some(map)),
            other => Err(self.mismatch(&other, name, "dict")),
        }
    }

    pub fn string_property(
        &mut self,
        expression: Option<&str>,
        name: &str,
        default: Option<&str>,
    ) -> Result<Option<String>, TemplateError> {
        let default = default.map(|d| Value::String(d.to_string())).unwrap_or(Value::Null);
        let value = self.get_value(expression, name, default)?;
        self.assert_string(value, name)
    }

    pub fn float_property(
        &mut self,
        expression: Option<&str>,
        name: &str,
        default: Option<f64>,
    ) -> Result<Option<f64>, TemplateError> {
        let default = default.map(Value::from).unwrap_or(Value::Null);
        let value = self.get_value(expression, name, default)?;
        self.assert_float(value, name)
    }

    /// Either one expression yielding a list, or a list of per-element
    /// values; every element must resolve to a string.
    pub fn list_property(&mut self, spec: Option<&ListSpec>, name: &str) -> Result<Vec<String>, TemplateError> {
        let raw = match spec {
            None => return Ok(Vec::new()),
            Some(ListSpec::Expression(expression)) => {
                let value = self.get_value(Some(expression), name, Value::Array(Vec::new()))?;
                self.assert_list(value, name)?.unwrap_or_default()
            }
            Some(ListSpec::Items(items)) => items.clone(),
        };
        let mut values = Vec::with_capacity(raw.len());
        for element in &raw {
            let resolved = self.resolve_raw(element, name)?;
            if let Some(text) = self.assert_string(resolved, name)? {
                values.push(text);
            }
        }
        Ok(values)
    }

    /// Either one expression yielding a dict, or literal entries; each entry
    /// value is resolved under the name `"{name}:{key}"`.
    pub fn dict_property(
        &mut self,
        spec: Option<&DictSpec>,
        name: &str,
    ) -> Result<Map<String, Value>, TemplateError> {
        let entries = match spec {
            None => return Ok(Map::new()),
            Some(DictSpec::Expression(expression)) => {
                let value = self.get_value(Some(expression), name, Value::Object(Map::new()))?;
                self.assert_dict(value, name)?.unwrap_or_default()
            }
            Some(DictSpec::Entries(entries)) => entries.clone(),
        };
        let mut result = Map::new();
        for (key, raw) in &entries {
            let value = self.resolve_raw(raw, &format!("{}:{}", name, key))?;
            result.insert(key.clone(), value);
        }
        Ok(result)
    }

    pub fn timestamp_property(
        &mut self,
        expression: Option<&str>,
        name: &str,
    ) -> Result<Option<chrono::DateTime<chrono::Utc>>, TemplateError> {
        let value = self.get_value(expression, name, Value::Null)?;
        if value.is_null() {
            return Ok(None);
        }
        parse_timestamp(&value)
            .map(Some)
            .ok_or_else(|| self.mismatch(&value, name, "timestamp"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstanceInfo;
    use crate::topology::shared_factory;
    use serde_json::json;

    fn context() -> TopologyContext {
        let instance: InstanceInfo = serde_yaml::from_str("etl: {}\n").unwrap();
        TopologyContext::new(shared_factory(), &instance)
    }

    fn item() -> Rc<Value> {
        Rc::new(json!({
            "name": "web-1",
            "cores": 4,
            "tags": ["a", "b"],
            "nested": {"zone": "eu"}
        }))
    }

    #[test]
    fn test_value_dispatch() {
        struct TestCase {
            name: &'static str,
            expression: Option<&'static str>,
            expected: Value,
        }

        let cases = vec![
            TestCase { name: "missing uses default", expression: None, expected: json!("dflt") },
            TestCase { name: "path", expression: Some("$.nested.zone"), expected: json!("eu") },
            TestCase { name: "path miss uses default", expression: Some("$.absent"), expected: json!("dflt") },
            TestCase { name: "code", expression: Some("|item['cores'] * 2"), expected: json!(8) },
            TestCase { name: "code None uses default", expression: Some("|None"), expected: json!("dflt") },
            TestCase { name: "literal", expression: Some("vm"), expected: json!("vm") },
        ];

        let ctx = context();
        for case in cases {
            let mut scope = Scope::for_template(&ctx, item(), "vm");
            let value = scope.get_value(case.expression, "field", json!("dflt")).unwrap();
            assert_eq!(value, case.expected, "{}", case.name);
        }
    }

    #[test]
    fn test_assignments_persist_within_scope() {
        let ctx = context();
        let mut scope = Scope::for_template(&ctx, item(), "vm");
        scope.run_code(Some("|zone = item['nested']['zone']"), "processor").unwrap();
        let value = scope.get_value(Some("|zone.upper()"), "layer", Value::Null).unwrap();
        assert_eq!(value, json!("EU"));
    }

    #[test]
    fn test_type_assertions() {
        let ctx = context();
        let mut scope = Scope::for_template(&ctx, item(), "vm");

        assert_eq!(scope.float_property(Some("$.cores"), "value", None).unwrap(), Some(4.0));
        assert_eq!(scope.float_property(Some("2.5"), "value", None).unwrap(), Some(2.5));
        assert_eq!(scope.float_property(None, "value", Some(0.0)).unwrap(), Some(0.0));

        let err = scope.string_property(Some("$.cores"), "name", None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected str type for 'name', but was int for 'vm' on `vm`"
        );
        assert!(matches!(
            scope.float_property(Some("many"), "value", None),
            Err(TemplateError::TypeMismatch { expected: "float", .. })
        ));
        assert!(matches!(
            scope.list_property(Some(&ListSpec::Expression("$.name".into())), "labels"),
            Err(TemplateError::TypeMismatch { expected: "list", .. })
        ));
    }

    #[test]
    fn test_list_and_dict_properties() {
        let ctx = context();
        let mut scope = Scope::for_template(&ctx, item(), "vm");

        let from_expression = scope
            .list_property(Some(&ListSpec::Expression("$.tags[*]".into())), "labels")
            .unwrap();
        assert_eq!(from_expression, vec!["a", "b"]);

        let per_element = scope
            .list_property(
                Some(&ListSpec::Items(vec![json!("env:prod"), json!("|'name:' + item['name']")])),
                "labels",
            )
            .unwrap();
        assert_eq!(per_element, vec!["env:prod", "name:web-1"]);

        let mut entries = Map::new();
        entries.insert("cores".into(), json!("$.cores"));
        entries.insert("fixed".into(), json!(true));
        let dict = scope
            .dict_property(Some(&DictSpec::Entries(entries)), "custom_properties")
            .unwrap();
        assert_eq!(Value::Object(dict), json!({"cores": 4, "fixed": true}));
    }

    #[test]
    fn test_evaluation_error_names_source() {
        let ctx = context();
        let mut scope = Scope::new(&ctx, Rc::new(Value::Null), "query 'vms'");
        let err = scope.run_code(Some("|undefined_name + 1"), "query").unwrap_err();
        assert_eq!(err.property, "query");
        assert_eq!(err.source_name, "query 'vms'");
        assert_eq!(err.expression, "undefined_name + 1");
    }
}
