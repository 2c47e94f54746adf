// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Restricted expression language embedded in ETL models.
//!
//! Selectors, spec values, processors, queries and datasource initializers
//! are all evaluated here. The grammar is a small Python-flavoured subset:
//! literals, f-strings, lists and dicts with comprehensions, conditional
//! expressions, boolean and comparison operators, arithmetic, attribute
//! access, indexing, calls with keyword arguments and assignments. Anything
//! outside that subset is a syntax error, and only the names placed into
//! [`Bindings`] (plus the global builtins) are reachable.

pub mod ast;
pub mod builtins;
pub mod helpers;
pub mod interpreter;
pub mod lexer;
pub mod logger;
pub mod ops;
pub mod parser;
pub mod value;

/// Longest string or list that repetition or `range()` may build.
pub const MAX_SEQUENCE_LEN: usize = 1 << 18;

pub use helpers::Helpers;
pub use interpreter::ExpressionInterpreter;
pub use logger::ScriptLogger;
pub use value::{display, truthy, type_name, Bindings, CallArgs, Dynamic, NativeFunction, ObjectRef};
