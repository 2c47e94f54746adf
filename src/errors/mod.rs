// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod evaluation;
mod template;
mod topology;

pub use config::{ConfigError, ValidationError};
pub use evaluation::{EvalError, EvaluationError, PathError};
pub use template::TemplateError;
pub use topology::TopologyError;

use thiserror::Error;

/// Any failure that aborts a synchronization pass.
#[derive(Error, Debug)]
pub enum EtlError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error("Template '{0}' not found.")]
    TemplateNotFound(String),

    #[error("Failed to create class instance '{cls}' for datasource '{datasource}'. Message: {source}")]
    DataSourceInit {
        datasource: String,
        cls: String,
        #[source]
        source: EvaluationError,
    },
}

pub type EtlResult<T> = Result<T, EtlError>;
