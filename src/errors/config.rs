// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while validating merged ETL models
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A query references a template that no loaded model defines
    UnresolvedTemplateRef {
        /// The query holding the reference
        query: String,
        /// The template name that couldn't be resolved
        template: String,
    },
    /// A template name was defined twice within one kind across the merged models
    DuplicateTemplate {
        /// Template kind (component, event, metric, health)
        kind: &'static str,
        /// The duplicate template name
        name: String,
        /// Model source that carried the ignored definition
        source: String,
    },
    /// A template carries both a structured `spec` and a free-form `code` body
    TemplateBodyConflict {
        /// The offending template
        template: String,
    },
    /// A template carries neither `spec` nor `code`
    TemplateBodyMissing {
        /// The offending template
        template: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::UnresolvedTemplateRef { query, template } => {
                write!(
                    f,
                    "Query '{}' references template '{}' which does not exist",
                    query, template
                )
            }
            ValidationError::DuplicateTemplate { kind, name, source } => {
                write!(
                    f,
                    "{} template '{}' already defined [{}]. Template names must be unique",
                    kind, name, source
                )
            }
            ValidationError::TemplateBodyConflict { template } => {
                write!(
                    f,
                    "Template {} cannot have both spec and code properties",
                    template
                )
            }
            ValidationError::TemplateBodyMissing { template } => {
                write!(
                    f,
                    "Template {} must have either spec or code properties defined",
                    template
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors raised while loading instance configuration and ETL model files.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid YAML/JSON document of the expected shape.
    #[error("Failed to parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A model document lacks the top-level `etl` key.
    #[error("ETL document '{path}' has no top-level 'etl' key")]
    MissingEtl { path: PathBuf },

    /// A ref uses a prefix other than the supported ones.
    #[error("ETL ref '{0}' not supported. Must be one of 'module_dir://', 'module_file://', 'file://'")]
    UnsupportedRef(String),

    /// A ref chain loops back onto a file that is still being loaded.
    #[error("ETL ref cycle detected: {}", .0.join(" -> "))]
    CyclicRef(Vec<String>),

    /// A datasource names a class that was never registered.
    #[error("Failed to load class '{cls}' from module '{module}' for datasource '{datasource}'")]
    UnknownDataSourceClass {
        datasource: String,
        module: String,
        cls: String,
    },

    /// The merged models failed validation.
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
