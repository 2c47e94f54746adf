// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The `helpers` object: collection utilities for templates and processors.

use serde_json::{Map, Value};

use crate::errors::EvalError;
use crate::expression::builtins::{iterate, key_string};
use crate::expression::ops::values_equal;
use crate::expression::value::{type_name, CallArgs, Dynamic};
use crate::traits::HostObject;

#[derive(Debug, Default, Clone, Copy)]
pub struct Helpers;

const METHODS: &[&str] = &[
    "get",
    "has",
    "flatten",
    "uniq",
    "pick",
    "omit",
    "keys",
    "values",
    "snake_case",
    "find",
    "filter_by",
    "map_key",
];

impl HostObject for Helpers {
    fn type_name(&self) -> &str {
        "helpers"
    }

    fn get_attr(&self, name: &str) -> Result<Dynamic, EvalError> {
        Err(EvalError::attribute(self.type_name(), name))
    }

    fn call_method(&mut self, name: &str, args: CallArgs) -> Result<Dynamic, EvalError> {
        if !METHODS.contains(&name) {
            return Err(EvalError::attribute(self.type_name(), name));
        }
        let result = match name {
            "get" => {
                let target = args.required_value(name, 0, "obj")?;
                let path = args.required_value(name, 1, "path")?;
                let default = args.value(2, "default")?.unwrap_or(Value::Null);
                lookup(&target, &path)?.unwrap_or(default)
            }
            "has" => {
                let target = args.required_value(name, 0, "obj")?;
                let path = args.required_value(name, 1, "path")?;
                Value::Bool(lookup(&target, &path)?.is_some())
            }
            "flatten" => {
                let items = list_arg(&args, name, 0, "array")?;
                let mut flat = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Array(inner) => flat.extend(inner),
                        other => flat.push(other),
                    }
                }
                Value::Array(flat)
            }
            "uniq" => {
                let items = list_arg(&args, name, 0, "array")?;
                let mut unique: Vec<Value> = Vec::with_capacity(items.len());
                for item in items {
                    if !unique.iter().any(|seen| values_equal(seen, &item)) {
                        unique.push(item);
                    }
                }
                Value::Array(unique)
            }
            "pick" | "omit" => {
                let source = dict_arg(&args, name, 0, "obj")?;
                let keys = key_list(&args, name)?;
                let keep = name == "pick";
                Value::Object(
                    source
                        .into_iter()
                        .filter(|(key, _)| keys.contains(key) == keep)
                        .collect(),
                )
            }
            "keys" => Value::Array(
                dict_arg(&args, name, 0, "obj")?
                    .into_iter()
                    .map(|(key, _)| Value::String(key))
                    .collect(),
            ),
            "values" => Value::Array(
                dict_arg(&args, name, 0, "obj")?
                    .into_iter()
                    .map(|(_, value)| value)
                    .collect(),
            ),
            "snake_case" => Value::String(snake_case(&args.required_str(name, 0, "text")?)),
            "find" => {
                let items = list_arg(&args, name, 0, "collection")?;
                let matcher = dict_arg(&args, name, 1, "matcher")?;
                items
                    .into_iter()
                    .find(|item| matches(item, &matcher))
                    .unwrap_or(Value::Null)
            }
            "filter_by" => {
                let items = list_arg(&args, name, 0, "collection")?;
                let matcher = dict_arg(&args, name, 1, "matcher")?;
                Value::Array(items.into_iter().filter(|item| matches(item, &matcher)).collect())
            }
            "map_key" => {
                let items = list_arg(&args, name, 0, "collection")?;
                let path = args.required_value(name, 1, "key")?;
                let mut mapped = Vec::with_capacity(items.len());
                for item in items {
                    mapped.push(lookup(&item, &path)?.unwrap_or(Value::Null));
                }
                Value::Array(mapped)
            }
            _ => return Err(EvalError::attribute(self.type_name(), name)),
        };
        Ok(Dynamic::Value(result))
    }
}

fn list_arg(args: &CallArgs, function: &str, index: usize, name: &str) -> Result<Vec<Value>, EvalError> {
    match args.required_value(function, index, name)? {
        Value::Null => Ok(Vec::new()),
        other => iterate(Dynamic::Value(other)),
    }
}

fn dict_arg(args: &CallArgs, function: &str, index: usize, name: &str) -> Result<Map<String, Value>, EvalError> {
    match args.required_value(function, index, name)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(EvalError::arguments(
            function,
            format!("argument '{}' must be dict, not {}", name, type_name(&other)),
        )),
    }
}

/// Keys given either as one list or as the remaining positional arguments.
fn key_list(args: &CallArgs, function: &str) -> Result<Vec<String>, EvalError> {
    let mut keys = Vec::new();
    for arg in args.positional.iter().skip(1) {
        match arg.clone().into_value()? {
            Value::Array(items) => {
                for item in &items {
                    keys.push(key_string(item)?);
                }
            }
            other => keys.push(key_string(&other)?),
        }
    }
    if keys.is_empty() {
        if let Some(value) = args.value(usize::MAX, "keys")? {
            for item in &iterate(Dynamic::Value(value))? {
                keys.push(key_string(item)?);
            }
        }
    }
    if keys.is_empty() {
        return Err(EvalError::arguments(function, "expected at least one key"));
    }
    Ok(keys)
}

/// Walk a dotted path (`a.b.0.c`) or a list of segments.
fn lookup(target: &Value, path: &Value) -> Result<Option<Value>, EvalError> {
    let segments: Vec<String> = match path {
        Value::String(p) => p.split('.').map(str::to_string).collect(),
        Value::Array(parts) => parts.iter().map(key_string).collect::<Result<_, _>>()?,
        other => vec![key_string(other)?],
    };
    let mut current = target;
    for segment in &segments {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return Ok(None),
        }
    }
    Ok(Some(current.clone()))
}

fn matches(item: &Value, matcher: &Map<String, Value>) -> bool {
    match item {
        Value::Object(map) => matcher
            .iter()
            .all(|(key, expected)| map.get(key).map(|v| values_equal(v, expected)).unwrap_or(false)),
        _ => false,
    }
}

/// `"Host Name"`, `"hostName"` and `"host-name"` all become `"host_name"`.
pub fn snake_case(text: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut previous_lower = false;
    for c in text.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            previous_lower = false;
            continue;
        }
        if c.is_uppercase() && previous_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        previous_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words.join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(name: &str, values: Vec<Value>) -> Value {
        Helpers
            .call_method(name, CallArgs::from_values(values))
            .unwrap()
            .into_value()
            .unwrap()
    }

    #[test]
    fn test_get_and_has() {
        let doc = json!({"spec": {"resources": [{"name": "disk"}]}});
        assert_eq!(call("get", vec![doc.clone(), json!("spec.resources.0.name")]), json!("disk"));
        assert_eq!(call("get", vec![doc.clone(), json!("spec.missing"), json!("n/a")]), json!("n/a"));
        assert_eq!(call("has", vec![doc, json!("spec.resources")]), json!(true));
    }

    #[test]
    fn test_collection_helpers() {
        assert_eq!(call("flatten", vec![json!([[1, 2], 3, [4]])]), json!([1, 2, 3, 4]));
        assert_eq!(call("uniq", vec![json!(["a", "b", "a"])]), json!(["a", "b"]));
        assert_eq!(call("pick", vec![json!({"a": 1, "b": 2}), json!("a")]), json!({"a": 1}));
        assert_eq!(call("omit", vec![json!({"a": 1, "b": 2}), json!(["a"])]), json!({"b": 2}));

        let hosts = json!([{"name": "h1", "state": "up"}, {"name": "h2", "state": "down"}]);
        assert_eq!(call("find", vec![hosts.clone(), json!({"state": "down"})]), json!({"name": "h2", "state": "down"}));
        assert_eq!(call("filter_by", vec![hosts.clone(), json!({"state": "up"})]).as_array().map(Vec::len), Some(1));
        assert_eq!(call("map_key", vec![hosts, json!("name")]), json!(["h1", "h2"]));
    }

    #[test]
    fn test_snake_case() {
        let cases = vec![
            ("Host Name", "host_name"),
            ("hostName", "host_name"),
            ("host-name", "host_name"),
            ("VM 01", "vm_01"),
        ];
        for (input, expected) in cases {
            assert_eq!(snake_case(input), expected, "snake_case({})", input);
        }
    }

    #[test]
    fn test_unknown_helper() {
        let err = Helpers.call_method("explode", CallArgs::default()).unwrap_err();
        assert!(matches!(err, EvalError::Attribute { .. }));
    }
}
