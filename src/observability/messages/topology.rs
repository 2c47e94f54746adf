// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the entity graph.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Relation intents were materialized into edges.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use topology_etl::observability::messages::topology::RelationsResolved;
///
/// let msg = RelationsResolved { intents: 4, created: 3, unresolved: 1 };
/// assert_eq!(msg.to_string(), "Resolved relations: intents=4, created=3, unresolved=1");
/// ```
pub struct RelationsResolved {
    pub intents: usize,
    pub created: usize,
    pub unresolved: usize,
}

impl Display for RelationsResolved {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Resolved relations: intents={}, created={}, unresolved={}",
            self.intents, self.created, self.unresolved
        )
    }
}

impl StructuredLog for RelationsResolved {
    fn log(&self) {
        tracing::info!(
            intents = self.intents,
            created = self.created,
            unresolved = self.unresolved,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("resolve_relations", span_name = name, intents = self.intents)
    }
}

/// A relation intent pointed at an edge that already exists.
///
/// # Log Level
/// `debug!` - Per-relation detail
pub struct RelationAlreadyMaterialized<'a> {
    pub key: &'a str,
}

impl Display for RelationAlreadyMaterialized<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Relation '{}' already materialized", self.key)
    }
}

impl StructuredLog for RelationAlreadyMaterialized<'_> {
    fn log(&self) {
        tracing::debug!(relation = self.key, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("relation", span_name = name, relation = self.key)
    }
}

/// A synchronization pass finished and the graph is ready to publish.
///
/// # Log Level
/// `info!` - Important operational event
pub struct SyncCompleted<'a> {
    pub instance: &'a str,
    pub components: usize,
    pub relations: usize,
    pub health: usize,
    pub events: usize,
    pub metrics: usize,
    pub duration: std::time::Duration,
}

impl Display for SyncCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Sync of '{}' completed: components={}, relations={}, health={}, events={}, metrics={}, duration={:?}",
            self.instance,
            self.components,
            self.relations,
            self.health,
            self.events,
            self.metrics,
            self.duration
        )
    }
}

impl StructuredLog for SyncCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            instance = self.instance,
            components = self.components,
            relations = self.relations,
            health = self.health,
            events = self.events,
            metrics = self.metrics,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("sync", span_name = name, instance = self.instance)
    }
}

/// Health states by severity, logged before publishing.
///
/// # Log Level
/// `info!` - Important operational event
pub struct HealthSummary {
    pub critical: usize,
    pub deviating: usize,
    pub clear: usize,
}

impl Display for HealthSummary {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Critical -> {}, Deviating -> {}, Clear -> {}",
            self.critical, self.deviating, self.clear
        )
    }
}

impl StructuredLog for HealthSummary {
    fn log(&self) {
        tracing::info!(
            critical = self.critical,
            deviating = self.deviating,
            clear = self.clear,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("health", span_name = name, critical = self.critical)
    }
}
