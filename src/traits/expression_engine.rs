// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::EvalError;
use crate::expression::{Bindings, Dynamic};

/// A sandboxed evaluator for the snippets embedded in ETL configuration.
///
/// Template, query and datasource interpreters only talk to this trait, so
/// the grammar behind it can be swapped without touching them. Every call is
/// independent: an error is attributable to the expression passed in and to
/// nothing evaluated before it.
pub trait ExpressionEngine {
    /// Evaluate `expression` against `bindings`.
    ///
    /// Assignments made by the expression land in `bindings`; side effects on
    /// host objects (the factory, the entity being built) are intentional.
    fn evaluate(&self, expression: &str, bindings: &mut Bindings) -> Result<Dynamic, EvalError>;
}
