// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for ETL processing.
//!
//! This module contains message types for logging events related to:
//! * Datasource instantiation
//! * Query execution and per-query counters
//! * Template interpretation of individual items

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A datasource was instantiated and registered under its name.
///
/// # Log Level
/// `info!` - Important operational event
pub struct DataSourceRegistered<'a> {
    pub name: &'a str,
    pub module: &'a str,
    pub cls: &'a str,
}

impl Display for DataSourceRegistered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Datasource '{}' registered ({}.{})",
            self.name, self.module, self.cls
        )
    }
}

impl StructuredLog for DataSourceRegistered<'_> {
    fn log(&self) {
        tracing::info!(
            datasource = self.name,
            module = self.module,
            cls = self.cls,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("datasource", span_name = name, datasource = self.name)
    }
}

/// A query produced no items.
///
/// # Log Level
/// `warn!` - Soft warning, processing continues
///
/// # Example
/// ```
/// use topology_etl::observability::messages::etl::QueryReturnedNoResults;
///
/// let msg = QueryReturnedNoResults { query: "hosts" };
/// assert_eq!(
///     msg.to_string(),
///     "Query hosts returned no results! Check query logic in template."
/// );
/// ```
pub struct QueryReturnedNoResults<'a> {
    pub query: &'a str,
}

impl Display for QueryReturnedNoResults<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Query {} returned no results! Check query logic in template.",
            self.query
        )
    }
}

impl StructuredLog for QueryReturnedNoResults<'_> {
    fn log(&self) {
        tracing::warn!(query = self.query, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(tracing::Level::WARN, "query_empty", span_name = name, query = self.query)
    }
}

/// No template claimed any item of a query.
///
/// # Log Level
/// `warn!` - Soft warning, processing continues
pub struct QueryItemsUnprocessed<'a> {
    pub query: &'a str,
    pub items: usize,
}

impl Display for QueryItemsUnprocessed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Unprocessed Count for Query {} is 0 ({} items returned)",
            self.query, self.items
        )
    }
}

impl StructuredLog for QueryItemsUnprocessed<'_> {
    fn log(&self) {
        tracing::warn!(query = self.query, items = self.items, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(tracing::Level::WARN, "query_unprocessed", span_name = name, query = self.query)
    }
}

/// Item counts per query for one model.
///
/// # Log Level
/// `info!` - Important operational event
pub struct QueryCounters<'a> {
    pub source: &'a str,
    pub counters: &'a [(String, usize)],
}

impl Display for QueryCounters<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Query Template Processing Counters for {}:", self.source)?;
        for (query, count) in self.counters {
            write!(f, " Query_`{}`_Items={}", query, count)?;
        }
        Ok(())
    }
}

impl StructuredLog for QueryCounters<'_> {
    fn log(&self) {
        tracing::info!(source = self.source, queries = self.counters.len(), "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("query_counters", span_name = name, source = self.source)
    }
}

/// A template's selector rejected an item.
///
/// # Log Level
/// `debug!` - Per-item detail
pub struct TemplateSkipped<'a> {
    pub template: &'a str,
    pub query: &'a str,
}

impl Display for TemplateSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Template '{}' not active for item of query '{}'",
            self.template, self.query
        )
    }
}

impl StructuredLog for TemplateSkipped<'_> {
    fn log(&self) {
        tracing::debug!(template = self.template, query = self.query, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("template_skipped", span_name = name, template = self.template)
    }
}

/// Interpreting an item failed. The payload is logged before the error propagates.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct ItemInterpretationFailed<'a> {
    pub template: &'a str,
    pub query: &'a str,
    pub item: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ItemInterpretationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Template '{}' failed for item of query '{}': {}\n{}",
            self.template, self.query, self.error, self.item
        )
    }
}

impl StructuredLog for ItemInterpretationFailed<'_> {
    fn log(&self) {
        tracing::error!(
            template = self.template,
            query = self.query,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "item_failed",
            span_name = name,
            template = self.template,
            query = self.query,
        )
    }
}

/// Processing of one merged model, used as a span around its queries.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ModelProcessing<'a> {
    pub source: &'a str,
    pub queries: usize,
    pub processors: usize,
}

impl Display for ModelProcessing<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Processing ETL model {}: queries={}, processors={}",
            self.source, self.queries, self.processors
        )
    }
}

impl StructuredLog for ModelProcessing<'_> {
    fn log(&self) {
        tracing::info!(
            source = self.source,
            queries = self.queries,
            processors = self.processors,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "etl_model",
            span_name = name,
            source = self.source,
            queries = self.queries,
        )
    }
}
