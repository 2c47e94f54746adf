// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised by the expression engine and the path resolver.
//!
//! `EvalError` is what the restricted grammar raises for a single expression.
//! `EvaluationError` wraps it with the context needed to find the offending
//! configuration: which property was being evaluated, on which entity or
//! template, and the raw expression text.

use crate::errors::TopologyError;
use thiserror::Error;

/// Failure inside the restricted expression grammar.
#[derive(Error, Debug)]
pub enum EvalError {
    /// The expression text could not be tokenized or parsed.
    #[error("syntax error at offset {position}: {message}")]
    Syntax { message: String, position: usize },

    /// A name was referenced that is not bound in the symbol table.
    #[error("name '{0}' is not defined")]
    UnknownName(String),

    /// An operation was applied to a value of the wrong kind.
    #[error("type error: {0}")]
    Type(String),

    /// A mapping lookup used a key that does not exist.
    #[error("key error: '{0}'")]
    Key(String),

    /// A sequence lookup was out of range.
    #[error("index error: index {index} out of range for length {len}")]
    Index { index: i64, len: usize },

    /// An attribute or method does not exist on the receiver.
    #[error("'{type_name}' has no attribute '{attribute}'")]
    Attribute { type_name: String, attribute: String },

    /// A callable received the wrong arguments.
    #[error("{function}() {message}")]
    Arguments { function: String, message: String },

    #[error("division by zero")]
    DivisionByZero,

    /// A path query embedded in an expression failed to compile.
    #[error("path error: {0}")]
    Path(#[from] PathError),

    /// A graph operation invoked from the expression was rejected.
    #[error("{0}")]
    Topology(#[from] TopologyError),

    /// A datasource or other external collaborator failed.
    #[error("{0}")]
    External(#[from] anyhow::Error),
}

impl EvalError {
    pub fn syntax(message: impl Into<String>, position: usize) -> Self {
        Self::Syntax {
            message: message.into(),
            position,
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }

    pub fn arguments(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Arguments {
            function: function.into(),
            message: message.into(),
        }
    }

    pub fn attribute(type_name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::Attribute {
            type_name: type_name.into(),
            attribute: attribute.into(),
        }
    }
}

/// An expression failure with its configuration context attached.
#[derive(Error, Debug)]
#[error(
    "Failed to evaluate property '{property}' on `{source_name}`. Expression |\n {expression} \n |.\n Errors:\n {cause}"
)]
pub struct EvaluationError {
    pub property: String,
    pub source_name: String,
    pub expression: String,
    #[source]
    pub cause: EvalError,
}

/// Failure to compile a path query.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid path '{path}': {message}")]
pub struct PathError {
    pub path: String,
    pub message: String,
}
