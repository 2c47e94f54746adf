// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Global functions and the methods available on plain values.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::errors::EvalError;
use crate::expression::ops::{self, as_f64, as_i64, float_value, values_equal};
use crate::expression::value::{display, truthy, type_name, CallArgs, Dynamic, NativeFunction};
use crate::expression::MAX_SEQUENCE_LEN;

type Builtin = fn(CallArgs) -> Result<Dynamic, EvalError>;

const GLOBALS: &[(&str, Builtin)] = &[
    ("len", builtin_len),
    ("str", builtin_str),
    ("int", builtin_int),
    ("float", builtin_float),
    ("bool", builtin_bool),
    ("list", builtin_list),
    ("dict", builtin_dict),
    ("sorted", builtin_sorted),
    ("min", builtin_min),
    ("max", builtin_max),
    ("sum", builtin_sum),
    ("any", builtin_any),
    ("all", builtin_all),
    ("range", builtin_range),
    ("abs", builtin_abs),
    ("round", builtin_round),
    ("enumerate", builtin_enumerate),
    ("zip", builtin_zip),
];

const MUTATING_METHODS: &[&str] = &[
    "append",
    "extend",
    "insert",
    "pop",
    "remove",
    "clear",
    "update",
    "setdefault",
];

/// Resolve a global builtin by name.
pub fn global(name: &str) -> Option<Dynamic> {
    GLOBALS
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(builtin, func)| Dynamic::Function(NativeFunction::new(*builtin, *func)))
}

pub fn is_mutating_method(name: &str) -> bool {
    MUTATING_METHODS.contains(&name)
}

/// Text form of any runtime value, as `str()` and f-strings render it.
pub fn render(value: &Dynamic) -> String {
    match value {
        Dynamic::Value(value) => display(value),
        Dynamic::Object(object) => match object.try_borrow() {
            Ok(object) => match object.to_value() {
                Some(value) => display(&value),
                None => format!("<{}>", object.type_name()),
            },
            Err(_) => "<object>".to_string(),
        },
        Dynamic::Function(function) => format!("<function {}>", function.name()),
    }
}

/// Elements visited by `for` in comprehensions and by list-consuming builtins.
pub fn iterate(value: Dynamic) -> Result<Vec<Value>, EvalError> {
    match value.into_value()? {
        Value::Array(items) => Ok(items),
        Value::Object(map) => Ok(map.into_iter().map(|(key, _)| Value::String(key)).collect()),
        Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
        other => Err(EvalError::type_error(format!(
            "'{}' object is not iterable",
            type_name(&other)
        ))),
    }
}

/// Dictionary key for a scalar value.
pub fn key_string(key: &Value) -> Result<String, EvalError> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(_) | Value::Bool(_) | Value::Null => Ok(display(key)),
        other => Err(EvalError::type_error(format!(
            "unhashable type: '{}'",
            type_name(other)
        ))),
    }
}

/// Resolve `receiver.name` on a plain value. Dict keys read as attributes.
pub fn value_attribute(receiver: &Value, name: &str) -> Result<Dynamic, EvalError> {
    match receiver {
        Value::Object(map) => Ok(Dynamic::Value(map.get(name).cloned().unwrap_or(Value::Null))),
        other => Err(EvalError::attribute(type_name(other), name)),
    }
}

fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let resolved = if index < 0 { len as i64 + index } else { index };
    if resolved >= 0 && (resolved as usize) < len {
        Some(resolved as usize)
    } else {
        None
    }
}

fn index_of(key: &Value, len: usize) -> Result<usize, EvalError> {
    let index = as_i64(key).ok_or_else(|| {
        EvalError::type_error(format!("indices must be integers, not {}", type_name(key)))
    })?;
    normalize_index(index, len).ok_or(EvalError::Index { index, len })
}

pub fn get_index(container: &Value, key: &Value) -> Result<Value, EvalError> {
    match container {
        Value::Array(items) => Ok(items[index_of(key, items.len())?].clone()),
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            Ok(Value::String(chars[index_of(key, chars.len())?].to_string()))
        }
        Value::Object(map) => {
            let key = key_string(key)?;
            map.get(&key).cloned().ok_or(EvalError::Key(key))
        }
        other => Err(EvalError::type_error(format!(
            "'{}' object is not subscriptable",
            type_name(other)
        ))),
    }
}

pub fn get_index_mut<'a>(container: &'a mut Value, key: &Value) -> Result<&'a mut Value, EvalError> {
    match container {
        Value::Array(items) => {
            let index = index_of(key, items.len())?;
            Ok(&mut items[index])
        }
        Value::Object(map) => {
            let key = key_string(key)?;
            match map.get_mut(&key) {
                Some(slot) => Ok(slot),
                None => Err(EvalError::Key(key)),
            }
        }
        other => Err(EvalError::type_error(format!(
            "'{}' object does not support item assignment",
            type_name(other)
        ))),
    }
}

pub fn set_index(container: &mut Value, key: &Value, value: Value) -> Result<(), EvalError> {
    match container {
        Value::Object(map) => {
            map.insert(key_string(key)?, value);
            Ok(())
        }
        _ => {
            *get_index_mut(container, key)? = value;
            Ok(())
        }
    }
}

fn slice_bounds(start: Option<i64>, stop: Option<i64>, len: usize) -> (usize, usize) {
    let clamp = |bound: i64| -> usize {
        let resolved = if bound < 0 { len as i64 + bound } else { bound };
        resolved.clamp(0, len as i64) as usize
    };
    let start = start.map(clamp).unwrap_or(0);
    let stop = stop.map(clamp).unwrap_or(len);
    (start, stop.max(start))
}

pub fn slice(container: &Value, start: Option<i64>, stop: Option<i64>) -> Result<Value, EvalError> {
    match container {
        Value::Array(items) => {
            let (from, to) = slice_bounds(start, stop, items.len());
            Ok(Value::Array(items[from..to].to_vec()))
        }
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let (from, to) = slice_bounds(start, stop, chars.len());
            Ok(Value::String(chars[from..to].iter().collect()))
        }
        other => Err(EvalError::type_error(format!(
            "'{}' object is not subscriptable",
            type_name(other)
        ))),
    }
}

fn string_arg(args: &CallArgs, function: &str, index: usize, name: &str) -> Result<String, EvalError> {
    args.required_str(function, index, name)
}

fn string_or_list_matches(
    text: &str,
    pattern: Value,
    function: &str,
    check: fn(&str, &str) -> bool,
) -> Result<bool, EvalError> {
    match pattern {
        Value::String(p) => Ok(check(text, &p)),
        Value::Array(patterns) => Ok(patterns
            .iter()
            .any(|p| p.as_str().map(|p| check(text, p)).unwrap_or(false))),
        other => Err(EvalError::arguments(
            function,
            format!("argument must be str or list of str, not {}", type_name(&other)),
        )),
    }
}

/// Call a non-mutating method on a plain value.
pub fn call_value_method(receiver: &Value, name: &str, args: CallArgs) -> Result<Dynamic, EvalError> {
    let result = match (receiver, name) {
        (Value::String(s), "lower") => Value::String(s.to_lowercase()),
        (Value::String(s), "upper") => Value::String(s.to_uppercase()),
        (Value::String(s), "strip") | (Value::String(s), "lstrip") | (Value::String(s), "rstrip") => {
            let chars: Option<Vec<char>> = args
                .optional_str(name, 0, "chars")?
                .map(|c| c.chars().collect());
            let matches = |c: char| match &chars {
                Some(set) => set.contains(&c),
                None => c.is_whitespace(),
            };
            let stripped = match name {
                "lstrip" => s.trim_start_matches(matches),
                "rstrip" => s.trim_end_matches(matches),
                _ => s.trim_matches(matches),
            };
            Value::String(stripped.to_string())
        }
        (Value::String(s), "startswith") => {
            let prefix = args.required_value(name, 0, "prefix")?;
            Value::Bool(string_or_list_matches(s, prefix, name, |t, p| t.starts_with(p))?)
        }
        (Value::String(s), "endswith") => {
            let suffix = args.required_value(name, 0, "suffix")?;
            Value::Bool(string_or_list_matches(s, suffix, name, |t, p| t.ends_with(p))?)
        }
        (Value::String(s), "replace") => {
            let old = string_arg(&args, name, 0, "old")?;
            let new = string_arg(&args, name, 1, "new")?;
            Value::String(s.replace(&old, &new))
        }
        (Value::String(s), "split") => {
            let parts: Vec<Value> = match args.optional_str(name, 0, "sep")? {
                Some(sep) if sep.is_empty() => {
                    return Err(EvalError::arguments(name, "empty separator"));
                }
                Some(sep) => s.split(sep.as_str()).map(|p| Value::String(p.to_string())).collect(),
                None => s.split_whitespace().map(|p| Value::String(p.to_string())).collect(),
            };
            Value::Array(parts)
        }
        (Value::String(s), "join") => {
            let items = iterate(Dynamic::Value(args.required_value(name, 0, "iterable")?))?;
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(part) => parts.push(part),
                    other => {
                        return Err(EvalError::type_error(format!(
                            "sequence item: expected str instance, {} found",
                            type_name(&other)
                        )))
                    }
                }
            }
            Value::String(parts.join(s))
        }
        (Value::String(s), "find") => {
            let needle = string_arg(&args, name, 0, "sub")?;
            match s.find(&needle) {
                Some(byte) => Value::from(s[..byte].chars().count() as i64),
                None => Value::from(-1),
            }
        }
        (Value::String(s), "title") => Value::String(title_case(s)),
        (Value::String(s), "isdigit") => {
            Value::Bool(!s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
        }
        (Value::Array(items), "index") => {
            let needle = args.required_value(name, 0, "value")?;
            match items.iter().position(|x| values_equal(x, &needle)) {
                Some(index) => Value::from(index as i64),
                None => return Err(EvalError::type_error(format!("{} is not in list", display(&needle)))),
            }
        }
        (Value::Array(items), "count") => {
            let needle = args.required_value(name, 0, "value")?;
            Value::from(items.iter().filter(|x| values_equal(x, &needle)).count() as i64)
        }
        (Value::Array(_), "copy") | (Value::Object(_), "copy") => receiver.clone(),
        (Value::Object(map), "get") => {
            let key = key_string(&args.required_value(name, 0, "key")?)?;
            match map.get(&key) {
                Some(value) => value.clone(),
                None => args.value(1, "default")?.unwrap_or(Value::Null),
            }
        }
        (Value::Object(map), "keys") => {
            Value::Array(map.keys().map(|k| Value::String(k.clone())).collect())
        }
        (Value::Object(map), "values") => Value::Array(map.values().cloned().collect()),
        (Value::Object(map), "items") => Value::Array(
            map.iter()
                .map(|(k, v)| Value::Array(vec![Value::String(k.clone()), v.clone()]))
                .collect(),
        ),
        (Value::Object(map), _) if map.contains_key(name) => {
            return Err(EvalError::type_error(format!("'{}' value is not callable", name)));
        }
        (other, _) => return Err(EvalError::attribute(type_name(other), name)),
    };
    Ok(Dynamic::Value(result))
}

/// Call a method that may modify `receiver` in place.
pub fn call_mutating_method(receiver: &mut Value, name: &str, args: CallArgs) -> Result<Dynamic, EvalError> {
    match receiver {
        Value::Array(items) => match name {
            "append" => {
                items.push(args.required_value(name, 0, "object")?);
                Ok(Dynamic::null())
            }
            "extend" => {
                let extra = iterate(Dynamic::Value(args.required_value(name, 0, "iterable")?))?;
                items.extend(extra);
                Ok(Dynamic::null())
            }
            "insert" => {
                let index = as_i64(&args.required_value(name, 0, "index")?)
                    .ok_or_else(|| EvalError::arguments(name, "index must be an integer"))?;
                let len = items.len() as i64;
                let position = if index < 0 { (len + index).max(0) } else { index.min(len) };
                items.insert(position as usize, args.required_value(name, 1, "object")?);
                Ok(Dynamic::null())
            }
            "pop" => {
                if items.is_empty() {
                    return Err(EvalError::Index { index: -1, len: 0 });
                }
                let index = match args.value(0, "index")? {
                    Some(key) => index_of(&key, items.len())?,
                    None => items.len() - 1,
                };
                Ok(Dynamic::Value(items.remove(index)))
            }
            "remove" => {
                let needle = args.required_value(name, 0, "value")?;
                match items.iter().position(|x| values_equal(x, &needle)) {
                    Some(index) => {
                        items.remove(index);
                        Ok(Dynamic::null())
                    }
                    None => Err(EvalError::type_error(format!("{} is not in list", display(&needle)))),
                }
            }
            "clear" => {
                items.clear();
                Ok(Dynamic::null())
            }
            _ => call_value_method(receiver, name, args),
        },
        Value::Object(map) => match name {
            "update" => {
                if let Some(other) = args.value(0, "other")? {
                    match other {
                        Value::Object(other) => map.extend(other),
                        other => {
                            return Err(EvalError::arguments(
                                name,
                                format!("argument must be dict, not {}", type_name(&other)),
                            ))
                        }
                    }
                }
                for (key, value) in args.named.iter().filter(|(key, _)| key != "other") {
                    map.insert(key.clone(), value.clone().into_value()?);
                }
                Ok(Dynamic::null())
            }
            "pop" => {
                let key = key_string(&args.required_value(name, 0, "key")?)?;
                match map.remove(&key) {
                    Some(value) => Ok(Dynamic::Value(value)),
                    None => match args.value(1, "default")? {
                        Some(default) => Ok(Dynamic::Value(default)),
                        None => Err(EvalError::Key(key)),
                    },
                }
            }
            "setdefault" => {
                let key = key_string(&args.required_value(name, 0, "key")?)?;
                let default = args.value(1, "default")?.unwrap_or(Value::Null);
                Ok(Dynamic::Value(map.entry(key).or_insert(default).clone()))
            }
            "clear" => {
                map.clear();
                Ok(Dynamic::null())
            }
            _ => call_value_method(receiver, name, args),
        },
        _ => call_value_method(receiver, name, args),
    }
}

fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut boundary = true;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if boundary {
                result.extend(c.to_uppercase());
            } else {
                result.extend(c.to_lowercase());
            }
            boundary = false;
        } else {
            result.push(c);
            boundary = true;
        }
    }
    result
}

fn single_value(args: &CallArgs, function: &str) -> Result<Value, EvalError> {
    args.expect_at_most(function, 1)?;
    args.required_value(function, 0, "x")
}

/// Sequence for aggregate builtins: `f(xs)` or `f(a, b, ...)`.
fn aggregate_items(args: &CallArgs, function: &str) -> Result<Vec<Value>, EvalError> {
    if args.positional.len() > 1 {
        args.positional.iter().map(|a| a.clone().into_value()).collect()
    } else {
        iterate(Dynamic::Value(args.required_value(function, 0, "iterable")?))
    }
}

fn builtin_len(args: CallArgs) -> Result<Dynamic, EvalError> {
    let value = single_value(&args, "len")?;
    let len = match &value {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        other => {
            return Err(EvalError::type_error(format!(
                "object of type '{}' has no len()",
                type_name(other)
            )))
        }
    };
    Ok(Dynamic::Value(Value::from(len as i64)))
}

fn builtin_str(args: CallArgs) -> Result<Dynamic, EvalError> {
    args.expect_at_most("str", 1)?;
    let text = match args.get(0, "object") {
        Some(value) => render(value),
        None => String::new(),
    };
    Ok(Dynamic::Value(Value::String(text)))
}

fn builtin_int(args: CallArgs) -> Result<Dynamic, EvalError> {
    let value = single_value(&args, "int")?;
    let result = match &value {
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| {
            EvalError::type_error(format!("invalid literal for int() with base 10: '{}'", s))
        })?,
        other => match as_i64(other) {
            Some(i) => i,
            None => match as_f64(other) {
                Some(f) if f.is_finite() => f.trunc() as i64,
                _ => {
                    return Err(EvalError::type_error(format!(
                        "int() argument must be a string or a number, not '{}'",
                        type_name(other)
                    )))
                }
            },
        },
    };
    Ok(Dynamic::Value(Value::from(result)))
}

fn builtin_float(args: CallArgs) -> Result<Dynamic, EvalError> {
    let value = single_value(&args, "float")?;
    let result = match &value {
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
            EvalError::type_error(format!("could not convert string to float: '{}'", s))
        })?,
        other => as_f64(other).ok_or_else(|| {
            EvalError::type_error(format!(
                "float() argument must be a string or a number, not '{}'",
                type_name(other)
            ))
        })?,
    };
    Ok(Dynamic::Value(float_value(result)?))
}

fn builtin_bool(args: CallArgs) -> Result<Dynamic, EvalError> {
    args.expect_at_most("bool", 1)?;
    let result = args.get(0, "x").map(Dynamic::truthy).unwrap_or(false);
    Ok(Dynamic::Value(Value::Bool(result)))
}

fn builtin_list(args: CallArgs) -> Result<Dynamic, EvalError> {
    args.expect_at_most("list", 1)?;
    let items = match args.get(0, "iterable") {
        Some(value) => iterate(value.clone())?,
        None => Vec::new(),
    };
    Ok(Dynamic::Value(Value::Array(items)))
}

fn builtin_dict(args: CallArgs) -> Result<Dynamic, EvalError> {
    let mut map = Map::new();
    if let Some(source) = args.positional.first() {
        match source.clone().into_value()? {
            Value::Object(existing) => map.extend(existing),
            Value::Array(pairs) => {
                for pair in pairs {
                    match pair {
                        Value::Array(kv) if kv.len() == 2 => {
                            map.insert(key_string(&kv[0])?, kv[1].clone());
                        }
                        _ => {
                            return Err(EvalError::type_error(
                                "dictionary update sequence element must be a pair",
                            ))
                        }
                    }
                }
            }
            other => {
                return Err(EvalError::type_error(format!(
                    "'{}' object is not iterable",
                    type_name(&other)
                )))
            }
        }
    }
    for (key, value) in &args.named {
        map.insert(key.clone(), value.clone().into_value()?);
    }
    Ok(Dynamic::Value(Value::Object(map)))
}

fn sort_values(items: &mut [Value]) -> Result<(), EvalError> {
    let mut failure = None;
    items.sort_by(|a, b| match ops::compare(a, b) {
        Ok(ordering) => ordering,
        Err(err) => {
            failure.get_or_insert(err);
            Ordering::Equal
        }
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn builtin_sorted(args: CallArgs) -> Result<Dynamic, EvalError> {
    let mut items = iterate(Dynamic::Value(args.required_value("sorted", 0, "iterable")?))?;
    sort_values(&mut items)?;
    if args.bool_or(usize::MAX, "reverse", false)? {
        items.reverse();
    }
    Ok(Dynamic::Value(Value::Array(items)))
}

fn extreme(args: CallArgs, function: &str, wanted: Ordering) -> Result<Dynamic, EvalError> {
    let items = aggregate_items(&args, function)?;
    let mut best: Option<Value> = None;
    for item in items {
        best = match best {
            None => Some(item),
            Some(current) => {
                if ops::compare(&item, &current)? == wanted {
                    Some(item)
                } else {
                    Some(current)
                }
            }
        };
    }
    match best {
        Some(value) => Ok(Dynamic::Value(value)),
        None => match args.value(usize::MAX, "default")? {
            Some(default) => Ok(Dynamic::Value(default)),
            None => Err(EvalError::arguments(function, "arg is an empty sequence")),
        },
    }
}

fn builtin_min(args: CallArgs) -> Result<Dynamic, EvalError> {
    extreme(args, "min", Ordering::Less)
}

fn builtin_max(args: CallArgs) -> Result<Dynamic, EvalError> {
    extreme(args, "max", Ordering::Greater)
}

fn builtin_sum(args: CallArgs) -> Result<Dynamic, EvalError> {
    let items = iterate(Dynamic::Value(args.required_value("sum", 0, "iterable")?))?;
    let mut total = args.value(1, "start")?.unwrap_or(Value::from(0));
    for item in items {
        total = ops::binary(crate::expression::ast::BinaryOp::Add, total, item)?;
    }
    Ok(Dynamic::Value(total))
}

fn builtin_any(args: CallArgs) -> Result<Dynamic, EvalError> {
    let items = iterate(Dynamic::Value(single_value(&args, "any")?))?;
    Ok(Dynamic::Value(Value::Bool(items.iter().any(truthy))))
}

fn builtin_all(args: CallArgs) -> Result<Dynamic, EvalError> {
    let items = iterate(Dynamic::Value(single_value(&args, "all")?))?;
    Ok(Dynamic::Value(Value::Bool(items.iter().all(truthy))))
}

fn builtin_range(args: CallArgs) -> Result<Dynamic, EvalError> {
    args.expect_at_most("range", 3)?;
    let mut bounds = Vec::with_capacity(3);
    for arg in &args.positional {
        let value = arg.clone().into_value()?;
        bounds.push(as_i64(&value).ok_or_else(|| {
            EvalError::arguments("range", format!("'{}' object cannot be interpreted as an integer", type_name(&value)))
        })?);
    }
    let (start, stop, step) = match bounds.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => return Err(EvalError::arguments("range", "expected 1 to 3 integer arguments")),
    };
    if step == 0 {
        return Err(EvalError::arguments("range", "arg 3 must not be zero"));
    }
    let mut items = Vec::new();
    let mut current = Some(start);
    while let Some(value) = current.filter(|c| (step > 0 && *c < stop) || (step < 0 && *c > stop)) {
        if items.len() == MAX_SEQUENCE_LEN {
            return Err(EvalError::arguments(
                "range",
                format!("result exceeds the maximum length of {}", MAX_SEQUENCE_LEN),
            ));
        }
        items.push(Value::from(value));
        current = value.checked_add(step);
    }
    Ok(Dynamic::Value(Value::Array(items)))
}

fn builtin_abs(args: CallArgs) -> Result<Dynamic, EvalError> {
    let value = single_value(&args, "abs")?;
    let result = match as_i64(&value) {
        Some(i) => match i.checked_abs() {
            Some(a) => Value::from(a),
            None => float_value((i as f64).abs())?,
        },
        None => match as_f64(&value) {
            Some(f) => float_value(f.abs())?,
            None => {
                return Err(EvalError::type_error(format!(
                    "bad operand type for abs(): '{}'",
                    type_name(&value)
                )))
            }
        },
    };
    Ok(Dynamic::Value(result))
}

/// Round half to even.
fn round_half_even(x: f64) -> f64 {
    let rounded = x.round();
    if (x - x.trunc()).abs() == 0.5 {
        2.0 * (x / 2.0).round()
    } else {
        rounded
    }
}

fn builtin_round(args: CallArgs) -> Result<Dynamic, EvalError> {
    let value = args.required_value("round", 0, "number")?;
    let number = as_f64(&value).ok_or_else(|| {
        EvalError::type_error(format!("type {} doesn't define __round__ method", type_name(&value)))
    })?;
    match args.value(1, "ndigits")? {
        None | Some(Value::Null) => Ok(Dynamic::Value(Value::from(round_half_even(number) as i64))),
        Some(digits) => {
            let digits = as_i64(&digits)
                .ok_or_else(|| EvalError::arguments("round", "ndigits must be an integer"))?;
            let scale = 10f64.powi(digits as i32);
            Ok(Dynamic::Value(float_value(round_half_even(number * scale) / scale)?))
        }
    }
}

fn builtin_enumerate(args: CallArgs) -> Result<Dynamic, EvalError> {
    let items = iterate(Dynamic::Value(args.required_value("enumerate", 0, "iterable")?))?;
    let start = match args.value(1, "start")? {
        Some(value) => as_i64(&value).ok_or_else(|| EvalError::arguments("enumerate", "start must be an integer"))?,
        None => 0,
    };
    let pairs = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| Value::Array(vec![Value::from(start + i as i64), item]))
        .collect();
    Ok(Dynamic::Value(Value::Array(pairs)))
}

fn builtin_zip(args: CallArgs) -> Result<Dynamic, EvalError> {
    let mut columns = Vec::with_capacity(args.positional.len());
    for arg in &args.positional {
        columns.push(iterate(arg.clone())?);
    }
    let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
    let zipped = (0..rows)
        .map(|row| Value::Array(columns.iter().map(|column| column[row].clone()).collect()))
        .collect();
    Ok(Dynamic::Value(Value::Array(zipped)))
}
