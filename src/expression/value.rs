// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Runtime values and the symbol table seen by expressions.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::errors::EvalError;
use crate::traits::HostObject;

/// Shared handle to a host object bound into the symbol table.
pub type ObjectRef = Rc<RefCell<dyn HostObject>>;

type NativeFn = dyn Fn(CallArgs) -> Result<Dynamic, EvalError>;

/// A named native callable (`uid`, `jpath`, a datasource class, a builtin).
#[derive(Clone)]
pub struct NativeFunction {
    name: String,
    func: Rc<NativeFn>,
}

impl NativeFunction {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(CallArgs) -> Result<Dynamic, EvalError> + 'static,
    {
        Self {
            name: name.into(),
            func: Rc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: CallArgs) -> Result<Dynamic, EvalError> {
        (self.func)(args)
    }
}

/// A value produced or consumed by an expression.
#[derive(Clone)]
pub enum Dynamic {
    Value(Value),
    Object(ObjectRef),
    Function(NativeFunction),
}

impl Dynamic {
    pub fn null() -> Self {
        Dynamic::Value(Value::Null)
    }

    pub fn object<T: HostObject + 'static>(object: T) -> Self {
        Dynamic::Object(Rc::new(RefCell::new(object)))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Dynamic::Value(Value::Null))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Dynamic::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Convert to plain data. Host objects convert through their data view.
    pub fn into_value(self) -> Result<Value, EvalError> {
        match self {
            Dynamic::Value(value) => Ok(value),
            Dynamic::Object(object) => {
                let object = object.try_borrow().map_err(|_| borrow_error())?;
                object.to_value().ok_or_else(|| {
                    EvalError::type_error(format!(
                        "'{}' object cannot be used as a value",
                        object.type_name()
                    ))
                })
            }
            Dynamic::Function(function) => Err(EvalError::type_error(format!(
                "function '{}' cannot be used as a value",
                function.name()
            ))),
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Dynamic::Value(value) => truthy(value),
            Dynamic::Object(_) | Dynamic::Function(_) => true,
        }
    }

    pub fn type_name(&self) -> String {
        match self {
            Dynamic::Value(value) => type_name(value).to_string(),
            Dynamic::Object(object) => match object.try_borrow() {
                Ok(object) => object.type_name().to_string(),
                Err(_) => "object".to_string(),
            },
            Dynamic::Function(_) => "function".to_string(),
        }
    }
}

impl From<Value> for Dynamic {
    fn from(value: Value) -> Self {
        Dynamic::Value(value)
    }
}

impl fmt::Debug for Dynamic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dynamic::Value(value) => write!(f, "Value({})", value),
            Dynamic::Object(object) => match object.try_borrow() {
                Ok(object) => write!(f, "Object({})", object.type_name()),
                Err(_) => write!(f, "Object(<in use>)"),
            },
            Dynamic::Function(function) => write!(f, "Function({})", function.name()),
        }
    }
}

/// A host object is already borrowed by the call that is running.
pub(crate) fn borrow_error() -> EvalError {
    EvalError::type_error("object is already in use by the current call")
}

/// Name of a value's kind as it appears in type errors.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "None",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Text rendering used by `str()` and f-strings.
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Positional and keyword arguments of one call.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    pub positional: Vec<Dynamic>,
    pub named: Vec<(String, Dynamic)>,
}

impl CallArgs {
    pub fn new(positional: Vec<Dynamic>) -> Self {
        Self {
            positional,
            named: Vec::new(),
        }
    }

    pub fn from_values(values: Vec<Value>) -> Self {
        Self::new(values.into_iter().map(Dynamic::Value).collect())
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Argument at `index`, or the keyword argument called `name`.
    pub fn get(&self, index: usize, name: &str) -> Option<&Dynamic> {
        self.positional.get(index).or_else(|| {
            self.named
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value)
        })
    }

    pub fn value(&self, index: usize, name: &str) -> Result<Option<Value>, EvalError> {
        match self.get(index, name) {
            Some(arg) => arg.clone().into_value().map(Some),
            None => Ok(None),
        }
    }

    pub fn required_value(&self, function: &str, index: usize, name: &str) -> Result<Value, EvalError> {
        self.value(index, name)?
            .ok_or_else(|| EvalError::arguments(function, format!("missing required argument '{}'", name)))
    }

    pub fn required_str(&self, function: &str, index: usize, name: &str) -> Result<String, EvalError> {
        match self.required_value(function, index, name)? {
            Value::String(s) => Ok(s),
            other => Err(EvalError::arguments(
                function,
                format!("argument '{}' must be str, not {}", name, type_name(&other)),
            )),
        }
    }

    pub fn optional_str(&self, function: &str, index: usize, name: &str) -> Result<Option<String>, EvalError> {
        match self.value(index, name)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(EvalError::arguments(
                function,
                format!("argument '{}' must be str, not {}", name, type_name(&other)),
            )),
        }
    }

    pub fn bool_or(&self, index: usize, name: &str, default: bool) -> Result<bool, EvalError> {
        Ok(self.get(index, name).map(Dynamic::truthy).unwrap_or(default))
    }

    /// Reject calls carrying more arguments than `max`.
    pub fn expect_at_most(&self, function: &str, max: usize) -> Result<(), EvalError> {
        if self.len() > max {
            return Err(EvalError::arguments(
                function,
                format!("takes at most {} arguments ({} given)", max, self.len()),
            ));
        }
        Ok(())
    }
}

/// Ordered symbol table handed to the expression engine for one evaluation.
///
/// Later bindings with the same name replace earlier ones in place, keeping
/// the original position.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    entries: Vec<(String, Dynamic)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Dynamic>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn bind_function(&mut self, function: NativeFunction) {
        let name = function.name().to_string();
        self.bind(name, Dynamic::Function(function));
    }

    pub fn get(&self, name: &str) -> Option<&Dynamic> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Dynamic> {
        self.entries
            .iter_mut()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Dynamic> {
        let position = self.entries.iter().position(|(key, _)| key == name)?;
        Some(self.entries.remove(position).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }
}

impl From<ObjectRef> for Dynamic {
    fn from(object: ObjectRef) -> Self {
        Dynamic::Object(object)
    }
}

impl From<NativeFunction> for Dynamic {
    fn from(function: NativeFunction) -> Self {
        Dynamic::Function(function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness_table() {
        let cases = vec![
            (json!(null), false),
            (json!(false), false),
            (json!(0), false),
            (json!(0.0), false),
            (json!(""), false),
            (json!([]), false),
            (json!({}), false),
            (json!(true), true),
            (json!(3), true),
            (json!("x"), true),
            (json!([1]), true),
            (json!({"a": 1}), true),
        ];

        for (value, expected) in cases {
            assert_eq!(truthy(&value), expected, "truthiness of {}", value);
        }
    }

    #[test]
    fn test_bindings_replace_keeps_position() {
        let mut bindings = Bindings::new();
        bindings.bind("item", json!(1));
        bindings.bind("factory", json!(2));
        bindings.bind("item", json!(3));

        let names: Vec<&str> = bindings.names().collect();
        assert_eq!(names, vec!["item", "factory"]);
        assert_eq!(bindings.get("item").and_then(|d| d.as_value()), Some(&json!(3)));
    }

    #[test]
    fn test_call_args_keyword_fallback() {
        let args = CallArgs {
            positional: vec![Dynamic::Value(json!("vm-1"))],
            named: vec![("raise_not_found".to_string(), Dynamic::Value(json!(false)))],
        };

        assert_eq!(args.required_str("get_component_by_name", 0, "name").unwrap(), "vm-1");
        assert!(!args.bool_or(1, "raise_not_found", true).unwrap());
        assert!(args.bool_or(2, "other", true).unwrap());
    }

    struct Sensor;

    impl HostObject for Sensor {
        fn type_name(&self) -> &str {
            "Sensor"
        }

        fn get_attr(&self, name: &str) -> Result<Dynamic, EvalError> {
            Err(EvalError::attribute("Sensor", name))
        }

        fn call_method(&mut self, name: &str, _args: CallArgs) -> Result<Dynamic, EvalError> {
            Err(EvalError::attribute("Sensor", name))
        }

        fn to_value(&self) -> Option<Value> {
            Some(json!({"kind": "sensor"}))
        }
    }

    #[test]
    fn test_object_in_use_is_an_error_not_a_panic() {
        let object: ObjectRef = Rc::new(RefCell::new(Sensor));
        let _busy = object.borrow_mut();
        let dynamic = Dynamic::Object(object.clone());

        assert_eq!(dynamic.type_name(), "object");
        assert_eq!(format!("{:?}", dynamic), "Object(<in use>)");
        assert!(matches!(dynamic.into_value(), Err(EvalError::Type(_))));
    }

    #[test]
    fn test_idle_object_converts_through_its_data_view() {
        let dynamic = Dynamic::object(Sensor);
        assert_eq!(dynamic.type_name(), "Sensor");
        assert_eq!(dynamic.into_value().unwrap(), json!({"kind": "sensor"}));
    }

    #[test]
    fn test_display_matches_keyword_spelling() {
        assert_eq!(display(&json!(null)), "None");
        assert_eq!(display(&json!(true)), "True");
        assert_eq!(display(&json!("text")), "text");
        assert_eq!(display(&json!(1.5)), "1.5");
    }
}
