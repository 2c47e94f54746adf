// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::Value;

use crate::errors::EvalError;
use crate::expression::{CallArgs, Dynamic};

/// A native object exposed to expressions by name.
///
/// The factory, the entity currently being built, the logger, the helper
/// library and every datasource reach expressions through this trait. Method
/// names are resolved at evaluation time, so the core assumes no fixed
/// interface beyond attribute access and method calls.
pub trait HostObject {
    /// Name used in error messages, e.g. `'Component' has no attribute 'x'`.
    fn type_name(&self) -> &str;

    fn get_attr(&self, name: &str) -> Result<Dynamic, EvalError>;

    fn set_attr(&mut self, name: &str, _value: Value) -> Result<(), EvalError> {
        Err(EvalError::type_error(format!(
            "cannot set attribute '{}' on '{}'",
            name,
            self.type_name()
        )))
    }

    fn call_method(&mut self, name: &str, args: CallArgs) -> Result<Dynamic, EvalError>;

    /// Plain-data view of the object, when it has one.
    fn to_value(&self) -> Option<Value> {
        None
    }
}
