// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! JSON path queries over item payloads.
//!
//! Supported syntax:
//! - `$` root element (must appear first)
//! - `.key` or `['key']` member access
//! - `..key` recursive member search, in document order
//! - `[n]` array index, negative counts from the end
//! - `[start:stop]` array slice
//! - `[*]` or `.*` every array element or object value

use serde_json::Value;

use crate::errors::PathError;

/// A single step in a compiled path.
#[derive(Debug, Clone, PartialEq)]
pub enum PathStep {
    Root,
    Member(String),
    Recursive(String),
    Index(i64),
    Slice(Option<i64>, Option<i64>),
    Wildcard,
}

/// A compiled path expression, e.g. `$.entities[*].status.name`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPath {
    pub steps: Vec<PathStep>,
}

impl CompiledPath {
    pub fn compile(path: &str) -> Result<Self, PathError> {
        let fail = |message: String| PathError {
            path: path.to_string(),
            message,
        };
        let trimmed = path.trim();
        let chars: Vec<char> = trimmed.chars().collect();
        if chars.first() != Some(&'$') {
            return Err(fail("path must start with '$'".to_string()));
        }
        let mut steps = vec![PathStep::Root];
        let mut pos = 1;

        while pos < chars.len() {
            match chars[pos] {
                '.' => {
                    pos += 1;
                    let recursive = chars.get(pos) == Some(&'.');
                    if recursive {
                        pos += 1;
                    }
                    if chars.get(pos) == Some(&'*') && !recursive {
                        steps.push(PathStep::Wildcard);
                        pos += 1;
                        continue;
                    }
                    let start = pos;
                    while pos < chars.len() && chars[pos] != '.' && chars[pos] != '[' {
                        pos += 1;
                    }
                    if pos == start {
                        return Err(fail(format!("empty member name at position {}", start)));
                    }
                    let name: String = chars[start..pos].iter().collect::<String>().trim().to_string();
                    if recursive {
                        steps.push(PathStep::Recursive(name));
                    } else {
                        steps.push(PathStep::Member(name));
                    }
                }
                '[' => {
                    pos += 1;
                    let close = chars[pos..]
                        .iter()
                        .position(|c| *c == ']')
                        .map(|offset| pos + offset)
                        .ok_or_else(|| fail("unclosed bracket".to_string()))?;
                    let inner: String = chars[pos..close].iter().collect();
                    steps.push(bracket_step(inner.trim()).map_err(fail)?);
                    pos = close + 1;
                }
                c if c.is_whitespace() => pos += 1,
                other => {
                    return Err(fail(format!("unexpected character '{}' at position {}", other, pos)));
                }
            }
        }
        Ok(Self { steps })
    }

    /// All matches in document order.
    pub fn find<'a>(&self, target: &'a Value) -> Vec<&'a Value> {
        let mut current: Vec<&'a Value> = Vec::new();
        for step in &self.steps {
            current = match step {
                PathStep::Root => vec![target],
                PathStep::Member(name) => current
                    .into_iter()
                    .filter_map(|v| v.as_object().and_then(|map| map.get(name)))
                    .collect(),
                PathStep::Recursive(name) => {
                    let mut found = Vec::new();
                    for v in current {
                        collect_recursive(v, name, &mut found);
                    }
                    found
                }
                PathStep::Index(index) => current
                    .into_iter()
                    .filter_map(|v| {
                        let items = v.as_array()?;
                        let resolved = if *index < 0 { items.len() as i64 + index } else { *index };
                        usize::try_from(resolved).ok().and_then(|i| items.get(i))
                    })
                    .collect(),
                PathStep::Slice(start, stop) => current
                    .into_iter()
                    .filter_map(Value::as_array)
                    .flat_map(|items| {
                        let (from, to) = slice_range(*start, *stop, items.len());
                        items[from..to].iter()
                    })
                    .collect(),
                PathStep::Wildcard => current
                    .into_iter()
                    .flat_map(|v| -> Box<dyn Iterator<Item = &'a Value> + 'a> {
                        match v {
                            Value::Array(items) => Box::new(items.iter()),
                            Value::Object(map) => Box::new(map.values()),
                            _ => Box::new(std::iter::empty()),
                        }
                    })
                    .collect(),
            };
        }
        current
    }
}

fn bracket_step(inner: &str) -> Result<PathStep, String> {
    if inner == "*" {
        return Ok(PathStep::Wildcard);
    }
    if let Some(quote) = inner.chars().next().filter(|c| *c == '\'' || *c == '"') {
        if inner.len() < 2 || !inner.ends_with(quote) {
            return Err("unclosed quoted member".to_string());
        }
        return Ok(PathStep::Member(inner[1..inner.len() - 1].to_string()));
    }
    if let Some((start, stop)) = inner.split_once(':') {
        let bound = |text: &str| -> Result<Option<i64>, String> {
            let text = text.trim();
            if text.is_empty() {
                Ok(None)
            } else {
                text.parse::<i64>()
                    .map(Some)
                    .map_err(|_| format!("invalid slice bound '{}'", text))
            }
        };
        return Ok(PathStep::Slice(bound(start)?, bound(stop)?));
    }
    inner
        .parse::<i64>()
        .map(PathStep::Index)
        .map_err(|_| format!("invalid array index '{}'", inner))
}

fn slice_range(start: Option<i64>, stop: Option<i64>, len: usize) -> (usize, usize) {
    let clamp = |bound: i64| -> usize {
        let resolved = if bound < 0 { len as i64 + bound } else { bound };
        resolved.clamp(0, len as i64) as usize
    };
    let from = start.map(clamp).unwrap_or(0);
    let to = stop.map(clamp).unwrap_or(len);
    (from, to.max(from))
}

fn collect_recursive<'a>(value: &'a Value, name: &str, found: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            if let Some(hit) = map.get(name) {
                found.push(hit);
            }
            for child in map.values() {
                collect_recursive(child, name, found);
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_recursive(child, name, found);
            }
        }
        _ => {}
    }
}

/// Evaluate `path` against `target`.
///
/// No match yields `default`, exactly one match yields that value, and two or
/// more yield a list in document order.
pub fn resolve(path: &str, target: &Value, default: Value) -> Result<Value, PathError> {
    let compiled = CompiledPath::compile(path)?;
    let mut matches = compiled.find(target);
    Ok(match matches.len() {
        0 => default,
        1 => matches.remove(0).clone(),
        _ => Value::Array(matches.into_iter().cloned().collect()),
    })
}
