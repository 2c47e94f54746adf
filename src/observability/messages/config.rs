// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for ETL model loading.
//!
//! This module contains message types for logging events related to:
//! * Loading model documents and their refs
//! * Indexing templates across merged models
//! * Duplicate template names

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// An ETL model document was loaded.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use topology_etl::observability::messages::config::ModelLoaded;
///
/// let msg = ModelLoaded {
///     source: "resources/etl/hosts.yaml",
///     datasources: 1,
///     queries: 2,
///     templates: 3,
/// };
///
/// assert!(msg.to_string().contains("hosts.yaml"));
/// ```
pub struct ModelLoaded<'a> {
    pub source: &'a str,
    pub datasources: usize,
    pub queries: usize,
    pub templates: usize,
}

impl Display for ModelLoaded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Loaded ETL model from {}: datasources={}, queries={}, templates={}",
            self.source, self.datasources, self.queries, self.templates
        )
    }
}

impl StructuredLog for ModelLoaded<'_> {
    fn log(&self) {
        tracing::info!(
            source = self.source,
            datasources = self.datasources,
            queries = self.queries,
            templates = self.templates,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("model_loaded", span_name = name, source = self.source)
    }
}

/// Templates of one model were added to the lookup.
///
/// # Log Level
/// `info!` - Important operational event
pub struct TemplatesIndexed<'a> {
    pub source: &'a str,
    pub components: usize,
    pub events: usize,
    pub metrics: usize,
    pub health: usize,
}

impl Display for TemplatesIndexed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Loading templates from {}: components={}, events={}, metrics={}, health={}",
            self.source, self.components, self.events, self.metrics, self.health
        )
    }
}

impl StructuredLog for TemplatesIndexed<'_> {
    fn log(&self) {
        tracing::info!(
            source = self.source,
            components = self.components,
            events = self.events,
            metrics = self.metrics,
            health = self.health,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("templates_indexed", span_name = name, source = self.source)
    }
}

/// A template name was already taken within its kind; the later definition is dropped.
///
/// # Log Level
/// `warn!` - Configuration smell, processing continues
///
/// # Example
/// ```
/// use topology_etl::observability::messages::config::DuplicateTemplateIgnored;
///
/// let msg = DuplicateTemplateIgnored {
///     kind: "component",
///     name: "vm",
///     source: "override.yaml",
/// };
///
/// assert_eq!(
///     msg.to_string(),
///     "component template 'vm' already defined [override.yaml]. Template names must be unique. Ignoring..."
/// );
/// ```
pub struct DuplicateTemplateIgnored<'a> {
    pub kind: &'a str,
    pub name: &'a str,
    pub source: &'a str,
}

impl Display for DuplicateTemplateIgnored<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} template '{}' already defined [{}]. Template names must be unique. Ignoring...",
            self.kind, self.name, self.source
        )
    }
}

impl StructuredLog for DuplicateTemplateIgnored<'_> {
    fn log(&self) {
        tracing::warn!(
            kind = self.kind,
            template = self.name,
            source = self.source,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::WARN,
            "duplicate_template",
            span_name = name,
            kind = self.kind,
            template = self.name,
        )
    }
}
