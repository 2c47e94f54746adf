// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Interpreters binding ETL configuration to items and the factory.

pub mod context;
pub mod datasource;
pub mod query;
pub mod scope;
pub mod templates;

pub use context::{InstanceDefaults, TopologyContext};
pub use datasource::{DataSourceClasses, DataSourceInterpreter, DocumentSource, BUILTIN_MODULE};
pub use query::{ProcessorInterpreter, QueryInterpreter, QueryProcessorInterpreter};
pub use scope::Scope;
pub use templates::{interpreter_for, TemplateInterpreter};
