// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while interpreting a template against one item.

use crate::errors::{EvaluationError, PathError, TopologyError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    /// A required entity field resolved to nothing.
    #[error("Template {template} {field} is required.")]
    MissingField {
        template: String,
        field: &'static str,
    },

    /// A closed-enum field resolved to a value outside the enum.
    #[error("Template {template} {field} '{value}' not allowed. Valid values {allowed:?}.")]
    InvalidChoice {
        template: String,
        field: &'static str,
        value: String,
        allowed: &'static [&'static str],
    },

    /// A resolved value has the wrong shape for its field.
    #[error("Expected {expected} type for '{field}', but was {actual} for '{source_name}' on `{template}`")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        actual: &'static str,
        source_name: String,
        template: String,
    },

    /// A `$.` path could not be compiled.
    #[error(
        "Failed to evaluate property '{field}' for '{source_name}' on template `{template}`. Expression |\n {expression} \n |.\n Errors:\n {source}"
    )]
    Path {
        field: String,
        source_name: String,
        template: String,
        expression: String,
        #[source]
        source: PathError,
    },

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Topology(#[from] TopologyError),
}
