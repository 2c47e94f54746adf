// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::rc::Rc;

use serde_json::{Map, Value};

use crate::errors::EvalError;
use crate::expression::ast::{
    CompareOp, Comprehension, Expr, FPart, Statement, Subscript, Target, UnaryOp,
};
use crate::expression::builtins::{self, iterate, key_string, render};
use crate::expression::ops;
use crate::expression::parser::parse_program;
use crate::expression::value::{borrow_error, type_name, Bindings, CallArgs, Dynamic, ObjectRef};
use crate::traits::ExpressionEngine;

/// The restricted-grammar interpreter used for every snippet in ETL models.
///
/// A program is a sequence of statements; its value is the value of the final
/// statement when that statement is an expression, and `None` otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpressionInterpreter;

impl ExpressionInterpreter {
    pub fn new() -> Self {
        Self
    }
}

impl ExpressionEngine for ExpressionInterpreter {
    fn evaluate(&self, expression: &str, bindings: &mut Bindings) -> Result<Dynamic, EvalError> {
        let program = parse_program(expression)?;
        let mut frame = Frame {
            bindings,
            scopes: Vec::new(),
        };
        frame.run(&program)
    }
}

type Scope = Vec<(String, Dynamic)>;

struct Frame<'b> {
    bindings: &'b mut Bindings,
    /// Comprehension variables, innermost last.
    scopes: Vec<Scope>,
}

fn object_attr(object: &ObjectRef, name: &str) -> Result<Dynamic, EvalError> {
    object.try_borrow().map_err(|_| borrow_error())?.get_attr(name)
}

/// Arguments that are the receiver itself are passed as plain data, since the
/// receiver is mutably borrowed for the duration of the call.
fn detach_receiver(receiver: &ObjectRef, args: CallArgs) -> Result<CallArgs, EvalError> {
    let detach = |arg: Dynamic| -> Result<Dynamic, EvalError> {
        let is_receiver = matches!(
            &arg,
            Dynamic::Object(object) if Rc::as_ptr(object) as *const () == Rc::as_ptr(receiver) as *const ()
        );
        if is_receiver {
            arg.into_value().map(Dynamic::Value)
        } else {
            Ok(arg)
        }
    };
    let positional = args.positional.into_iter().map(detach).collect::<Result<_, _>>()?;
    let named = args
        .named
        .into_iter()
        .map(|(key, value)| detach(value).map(|value| (key, value)))
        .collect::<Result<_, _>>()?;
    Ok(CallArgs { positional, named })
}

fn object_value(value: Dynamic) -> Result<Value, EvalError> {
    value.into_value()
}

impl<'b> Frame<'b> {
    fn run(&mut self, program: &[Statement]) -> Result<Dynamic, EvalError> {
        let mut last = Dynamic::null();
        for statement in program {
            last = match statement {
                Statement::Expr(expr) => self.eval(expr)?,
                Statement::Assign { target, value } => {
                    let value = self.eval(value)?;
                    self.assign(target, value)?;
                    Dynamic::null()
                }
            };
        }
        Ok(last)
    }

    fn lookup(&self, name: &str) -> Result<Dynamic, EvalError> {
        for scope in self.scopes.iter().rev() {
            if let Some((_, value)) = scope.iter().rev().find(|(key, _)| key == name) {
                return Ok(value.clone());
            }
        }
        if let Some(value) = self.bindings.get(name) {
            return Ok(value.clone());
        }
        builtins::global(name).ok_or_else(|| EvalError::UnknownName(name.to_string()))
    }

    fn lookup_mut(&mut self, name: &str) -> Option<&mut Dynamic> {
        for scope in self.scopes.iter_mut().rev() {
            if let Some((_, value)) = scope.iter_mut().rev().find(|(key, _)| key == name) {
                return Some(value);
            }
        }
        self.bindings.get_mut(name)
    }

    fn eval(&mut self, expr: &Expr) -> Result<Dynamic, EvalError> {
        match expr {
            Expr::Literal(value) => Ok(Dynamic::Value(value.clone())),
            Expr::FString(parts) => {
                let mut text = String::new();
                for part in parts {
                    match part {
                        FPart::Text(literal) => text.push_str(literal),
                        FPart::Expr(inner) => text.push_str(&render(&self.eval(inner)?)),
                    }
                }
                Ok(Dynamic::Value(Value::String(text)))
            }
            Expr::Name(name) => self.lookup(name),
            Expr::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(object_value(self.eval(item)?)?);
                }
                Ok(Dynamic::Value(Value::Array(values)))
            }
            Expr::Dict(pairs) => {
                let mut map = Map::new();
                for (key, value) in pairs {
                    let key = key_string(&object_value(self.eval(key)?)?)?;
                    let value = object_value(self.eval(value)?)?;
                    map.insert(key, value);
                }
                Ok(Dynamic::Value(Value::Object(map)))
            }
            Expr::ListComp { element, clause } => {
                let mut values = Vec::new();
                self.comprehension(clause, &mut |frame: &mut Frame<'b>| {
                    values.push(object_value(frame.eval(element)?)?);
                    Ok(())
                })?;
                Ok(Dynamic::Value(Value::Array(values)))
            }
            Expr::DictComp { key, value, clause } => {
                let mut map = Map::new();
                self.comprehension(clause, &mut |frame: &mut Frame<'b>| {
                    let k = key_string(&object_value(frame.eval(key)?)?)?;
                    let v = object_value(frame.eval(value)?)?;
                    map.insert(k, v);
                    Ok(())
                })?;
                Ok(Dynamic::Value(Value::Object(map)))
            }
            Expr::Attribute { target, name } => match self.eval(target)? {
                Dynamic::Object(object) => object_attr(&object, name),
                Dynamic::Value(value) => builtins::value_attribute(&value, name),
                Dynamic::Function(_) => Err(EvalError::attribute("function", name.as_str())),
            },
            Expr::Index { target, index } => {
                let container = object_value(self.eval(target)?)?;
                match index {
                    Subscript::Single(key) => {
                        let key = object_value(self.eval(key)?)?;
                        builtins::get_index(&container, &key).map(Dynamic::Value)
                    }
                    Subscript::Slice { start, stop } => {
                        let start = self.slice_bound(start.as_deref())?;
                        let stop = self.slice_bound(stop.as_deref())?;
                        builtins::slice(&container, start, stop).map(Dynamic::Value)
                    }
                }
            }
            Expr::Call {
                callee,
                args,
                kwargs,
            } => {
                let call_args = self.eval_args(args, kwargs)?;
                match callee.as_ref() {
                    Expr::Attribute { target, name } => self.call_method(target, name, call_args),
                    other => match self.eval(other)? {
                        Dynamic::Function(function) => function.call(call_args),
                        not_callable => Err(EvalError::type_error(format!(
                            "'{}' object is not callable",
                            not_callable.type_name()
                        ))),
                    },
                }
            }
            Expr::Unary { op, operand } => {
                let value = object_value(self.eval(operand)?)?;
                let result = match op {
                    UnaryOp::Neg => ops::negate(value)?,
                    UnaryOp::Pos => ops::positive(value)?,
                };
                Ok(Dynamic::Value(result))
            }
            Expr::Binary { op, left, right } => {
                let left = object_value(self.eval(left)?)?;
                let right = object_value(self.eval(right)?)?;
                ops::binary(*op, left, right).map(Dynamic::Value)
            }
            Expr::Compare { first, rest } => {
                let mut left = self.eval(first)?;
                for (op, right) in rest {
                    let right = self.eval(right)?;
                    if !compare(*op, &left, &right)? {
                        return Ok(Dynamic::Value(Value::Bool(false)));
                    }
                    left = right;
                }
                Ok(Dynamic::Value(Value::Bool(true)))
            }
            Expr::And(left, right) => {
                let left = self.eval(left)?;
                if !left.truthy() {
                    return Ok(left);
                }
                self.eval(right)
            }
            Expr::Or(left, right) => {
                let left = self.eval(left)?;
                if left.truthy() {
                    return Ok(left);
                }
                self.eval(right)
            }
            Expr::Not(operand) => {
                let value = self.eval(operand)?;
                Ok(Dynamic::Value(Value::Bool(!value.truthy())))
            }
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if self.eval(condition)?.truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
        }
    }

    fn slice_bound(&mut self, bound: Option<&Expr>) -> Result<Option<i64>, EvalError> {
        match bound {
            None => Ok(None),
            Some(expr) => {
                let value = object_value(self.eval(expr)?)?;
                match value {
                    Value::Null => Ok(None),
                    other => ops::as_i64(&other).map(Some).ok_or_else(|| {
                        EvalError::type_error(format!(
                            "slice indices must be integers or None, not {}",
                            type_name(&other)
                        ))
                    }),
                }
            }
        }
    }

    fn eval_args(&mut self, args: &[Expr], kwargs: &[(String, Expr)]) -> Result<CallArgs, EvalError> {
        let mut positional = Vec::with_capacity(args.len());
        for arg in args {
            positional.push(self.eval(arg)?);
        }
        let mut named = Vec::with_capacity(kwargs.len());
        for (name, arg) in kwargs {
            named.push((name.clone(), self.eval(arg)?));
        }
        Ok(CallArgs { positional, named })
    }

    fn call_method(&mut self, target: &Expr, name: &str, args: CallArgs) -> Result<Dynamic, EvalError> {
        match self.eval(target)? {
            Dynamic::Object(object) => {
                let args = detach_receiver(&object, args)?;
                object
                    .try_borrow_mut()
                    .map_err(|_| borrow_error())?
                    .call_method(name, args)
            }
            Dynamic::Function(_) => Err(EvalError::attribute("function", name)),
            Dynamic::Value(mut value) => {
                if !builtins::is_mutating_method(name) {
                    return builtins::call_value_method(&value, name, args);
                }
                if !target.is_place() {
                    return builtins::call_mutating_method(&mut value, name, args);
                }
                let mut args = Some(args);
                self.with_place(target, &mut |slot: &mut Value| {
                    builtins::call_mutating_method(slot, name, args.take().unwrap_or_default())
                })
            }
        }
    }

    /// Run `apply` against the storage behind a place expression.
    ///
    /// Attributes of host objects are read, modified, and written back.
    fn with_place(
        &mut self,
        place: &Expr,
        apply: &mut dyn FnMut(&mut Value) -> Result<Dynamic, EvalError>,
    ) -> Result<Dynamic, EvalError> {
        match place {
            Expr::Name(name) => match self.lookup_mut(name) {
                Some(Dynamic::Value(slot)) => apply(slot),
                Some(other) => Err(EvalError::type_error(format!(
                    "'{}' object cannot be modified in place",
                    other.type_name()
                ))),
                None => Err(EvalError::UnknownName(name.clone())),
            },
            Expr::Index {
                target,
                index: Subscript::Single(key),
            } => {
                let key = object_value(self.eval(key)?)?;
                self.with_place(target, &mut |container: &mut Value| {
                    let slot = builtins::get_index_mut(container, &key)?;
                    apply(slot)
                })
            }
            Expr::Attribute { target, name } => match self.eval(target)? {
                Dynamic::Object(object) => {
                    let mut value = object_value(object_attr(&object, name)?)?;
                    let result = apply(&mut value)?;
                    object
                        .try_borrow_mut()
                        .map_err(|_| borrow_error())?
                        .set_attr(name, value)?;
                    Ok(result)
                }
                Dynamic::Value(Value::Object(_)) => self.with_place(target, &mut |container: &mut Value| {
                    match container {
                        Value::Object(map) => apply(map.entry(name.clone()).or_insert(Value::Null)),
                        other => Err(EvalError::attribute(type_name(other), name.as_str())),
                    }
                }),
                other => Err(EvalError::attribute(other.type_name(), name.as_str())),
            },
            other => {
                let mut value = object_value(self.eval(other)?)?;
                apply(&mut value)
            }
        }
    }

    fn assign(&mut self, target: &Expr, value: Dynamic) -> Result<(), EvalError> {
        match target {
            Expr::Name(name) => {
                self.bindings.bind(name.clone(), value);
                Ok(())
            }
            Expr::Attribute {
                target: receiver,
                name,
            } => match self.eval(receiver)? {
                Dynamic::Object(object) => {
                    let value = object_value(value)?;
                    object
                        .try_borrow_mut()
                        .map_err(|_| borrow_error())?
                        .set_attr(name, value)
                }
                Dynamic::Value(Value::Object(_)) if receiver.is_place() => {
                    let mut value = Some(object_value(value)?);
                    self.with_place(receiver, &mut |container: &mut Value| match container {
                        Value::Object(map) => {
                            map.insert(name.clone(), value.take().unwrap_or(Value::Null));
                            Ok(Dynamic::null())
                        }
                        other => Err(EvalError::attribute(type_name(other), name.as_str())),
                    })
                    .map(|_| ())
                }
                other => Err(EvalError::type_error(format!(
                    "cannot set attribute '{}' on '{}'",
                    name,
                    other.type_name()
                ))),
            },
            Expr::Index {
                target: container,
                index: Subscript::Single(key),
            } => {
                let key = object_value(self.eval(key)?)?;
                let mut value = Some(object_value(value)?);
                self.with_place(container, &mut |slot: &mut Value| {
                    builtins::set_index(slot, &key, value.take().unwrap_or(Value::Null))?;
                    Ok(Dynamic::null())
                })
                .map(|_| ())
            }
            _ => Err(EvalError::syntax("cannot assign to expression", 0)),
        }
    }

    fn comprehension(
        &mut self,
        clause: &Comprehension,
        each: &mut dyn FnMut(&mut Frame<'b>) -> Result<(), EvalError>,
    ) -> Result<(), EvalError> {
        let items = iterate(self.eval(&clause.iter)?)?;
        self.scopes.push(Vec::new());
        let result = self.comprehension_body(clause, items, each);
        self.scopes.pop();
        result
    }

    fn comprehension_body(
        &mut self,
        clause: &Comprehension,
        items: Vec<Value>,
        each: &mut dyn FnMut(&mut Frame<'b>) -> Result<(), EvalError>,
    ) -> Result<(), EvalError> {
        'items: for item in items {
            self.bind_target(&clause.target, item)?;
            for condition in &clause.conditions {
                if !self.eval(condition)?.truthy() {
                    continue 'items;
                }
            }
            each(self)?;
        }
        Ok(())
    }

    fn bind_target(&mut self, target: &Target, item: Value) -> Result<(), EvalError> {
        let scope = match self.scopes.last_mut() {
            Some(scope) => scope,
            None => return Err(EvalError::type_error("comprehension scope missing")),
        };
        let mut set = |name: &str, value: Value| match scope.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = Dynamic::Value(value),
            None => scope.push((name.to_string(), Dynamic::Value(value))),
        };
        match target {
            Target::Name(name) => set(name, item),
            Target::Tuple(names) => match item {
                Value::Array(values) if values.len() == names.len() => {
                    for (name, value) in names.iter().zip(values) {
                        set(name, value);
                    }
                }
                other => {
                    return Err(EvalError::type_error(format!(
                        "cannot unpack {} into {} names",
                        type_name(&other),
                        names.len()
                    )))
                }
            },
        }
        Ok(())
    }
}

fn compare(op: CompareOp, left: &Dynamic, right: &Dynamic) -> Result<bool, EvalError> {
    match op {
        CompareOp::Eq => Ok(dynamic_equal(left, right, false)),
        CompareOp::Ne => Ok(!dynamic_equal(left, right, false)),
        CompareOp::Is => Ok(dynamic_equal(left, right, true)),
        CompareOp::IsNot => Ok(!dynamic_equal(left, right, true)),
        CompareOp::In | CompareOp::NotIn => {
            let container = object_value(right.clone())?;
            let item = object_value(left.clone())?;
            let found = ops::contains(&container, &item)?;
            Ok(if op == CompareOp::In { found } else { !found })
        }
        CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => {
            let ordering = ops::compare(
                &object_value(left.clone())?,
                &object_value(right.clone())?,
            )?;
            Ok(match op {
                CompareOp::Lt => ordering.is_lt(),
                CompareOp::Le => ordering.is_le(),
                CompareOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            })
        }
    }
}

fn dynamic_equal(left: &Dynamic, right: &Dynamic, identity: bool) -> bool {
    match (left, right) {
        (Dynamic::Value(a), Dynamic::Value(b)) => {
            if identity {
                ops::values_identical(a, b)
            } else {
                ops::values_equal(a, b)
            }
        }
        (Dynamic::Object(a), Dynamic::Object(b)) => {
            Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
        }
        (Dynamic::Function(a), Dynamic::Function(b)) => a.name() == b.name(),
        _ => false,
    }
}
