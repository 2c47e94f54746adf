// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Graph invariant violations raised by the topology factory.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    #[error("Component cannot be None.")]
    NullComponent,

    #[error("Component '{uid}' is invalid: {reason}")]
    InvalidComponent { uid: String, reason: String },

    #[error("Component '{0}' already exists.")]
    DuplicateComponent(String),

    #[error("Relation '{0}' already exists.")]
    DuplicateRelation(String),

    #[error("Health event '{0}' already exists.")]
    DuplicateHealth(String),

    #[error("Component {0} not found.")]
    ComponentNotFound(String),

    #[error("More than 1 result found for Component {0} search.")]
    AmbiguousComponent(String),

    #[error("Unresolved relation targets: {}", .0.join(", "))]
    UnresolvedRelations(Vec<String>),
}
